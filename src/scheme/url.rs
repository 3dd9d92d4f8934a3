//! Scheme URL parsing
//!
//! Turns `pipeline-video://<percent-encoded path>` into a raw filesystem
//! path. Existence and size are checked downstream.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("URL does not start with {expected}://")]
    SchemeMismatch { expected: String },
    #[error("path is not valid percent-encoded UTF-8")]
    InvalidEncoding,
}

/// Extract the filesystem path from a scheme URL
///
/// Any number of slashes may follow the scheme, so `scheme://path` and
/// `scheme:///path` are equivalent. A drive-letter path (`C:\...`, `C:/...`)
/// is returned as is; anything else is rooted at `/`.
///
/// # Examples
/// ```
/// use pipeline_video::scheme::url::parse_scheme_url;
///
/// let path = parse_scheme_url("pipeline-video:///home/me/My%20Clip.mp4", "pipeline-video");
/// assert_eq!(path.unwrap(), "/home/me/My Clip.mp4");
///
/// let path = parse_scheme_url("pipeline-video:///C:/Videos/a.mp4", "pipeline-video");
/// assert_eq!(path.unwrap(), "C:/Videos/a.mp4");
/// ```
pub fn parse_scheme_url(url: &str, scheme: &str) -> Result<String, ParseError> {
    let rest = strip_scheme(url, scheme).ok_or_else(|| ParseError::SchemeMismatch {
        expected: scheme.to_string(),
    })?;

    let encoded = rest.trim_start_matches('/');
    // Query and fragment are not part of the path; literal '?' and '#'
    // in file names arrive percent-encoded.
    let encoded = encoded
        .find(|c| c == '?' || c == '#')
        .map_or(encoded, |pos| &encoded[..pos]);

    let decoded = urlencoding::decode(encoded).map_err(|_| ParseError::InvalidEncoding)?;

    if has_drive_letter(&decoded) || decoded.starts_with('/') {
        Ok(decoded.into_owned())
    } else {
        Ok(format!("/{decoded}"))
    }
}

/// Strip `<scheme>://`, comparing the scheme case-insensitively
fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let (name, rest) = url.split_once(':')?;
    if !name.eq_ignore_ascii_case(scheme) {
        return None;
    }
    rest.starts_with("//").then_some(rest)
}

/// `X:` followed by nothing, `\` or `/`
fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes.get(2), None | Some(b'\\' | b'/'))
}
