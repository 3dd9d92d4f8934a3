use pipeline_video::{config, logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers.max(1));
        logger::log_info(&format!("[CONFIG] Using {workers} worker threads"));
    } else {
        logger::log_info("[CONFIG] Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let (listener, state) = server::bootstrap(&cfg).await?;
    let addr = listener.local_addr()?;

    logger::log_server_start(&addr, &cfg);
    logger::log_info(&format!(
        "[INFO] Open files as http://{addr}/<absolute path> or {}://<absolute path>",
        cfg.scheme.name
    ));

    server::run(listener, state, server::shutdown_signal()).await?;
    Ok(())
}
