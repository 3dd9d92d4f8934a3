//! HTTP Range resolution module
//!
//! Resolves an optional `Range` header against the actual file size.
//!
//! Resolution walks four states:
//! - `NoRange`: header absent, or present but not matching the grammar
//! - `HeaderPresent`: header matched `bytes=<start>-<end>?`
//! - `Valid`: the window lies inside the file
//! - `RangeNotSatisfiable`: the window does not
//!
//! A header that does not match the grammar degrades to full content
//! rather than failing the request, so playback keeps working for
//! non-conformant clients.

/// Inclusive byte window `[start, end]` inside a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteWindow {
    pub start: u64,
    pub end: u64,
}

impl ByteWindow {
    /// Window covering a whole non-empty file
    #[inline]
    pub const fn full(file_size: u64) -> Self {
        Self {
            start: 0,
            end: file_size.saturating_sub(1),
        }
    }

    /// Number of bytes in the window (always > 0)
    #[inline]
    pub const fn chunk_size(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Outcome of resolving a Range header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeResolution {
    /// No usable Range header: deliver the whole file (200)
    Full(ByteWindow),
    /// Valid range: deliver the window (206)
    Partial(ByteWindow),
    /// Range outside the file (416), carried for diagnostics
    NotSatisfiable { start: u64, end: u64, file_size: u64 },
}

/// Resolve a Range header against `file_size`
///
/// `file_size` must be non-zero; empty files are rejected before resolution.
///
/// # Examples
/// ```
/// use pipeline_video::http::range::{resolve_range, ByteWindow, RangeResolution};
///
/// let result = resolve_range(Some("bytes=100-199"), 1000);
/// assert_eq!(result, RangeResolution::Partial(ByteWindow { start: 100, end: 199 }));
///
/// // Malformed header behaves like an absent one
/// let result = resolve_range(Some("bytes=abc"), 1000);
/// assert_eq!(result, RangeResolution::Full(ByteWindow { start: 0, end: 999 }));
/// ```
pub fn resolve_range(range_header: Option<&str>, file_size: u64) -> RangeResolution {
    debug_assert!(file_size > 0, "empty files have no byte windows");

    // NoRange
    let Some(header) = range_header else {
        return RangeResolution::Full(ByteWindow::full(file_size));
    };

    // HeaderPresent, grammar mismatch falls back to NoRange
    let Some((start, end)) = match_byte_range(header) else {
        return RangeResolution::Full(ByteWindow::full(file_size));
    };
    let end = end.unwrap_or(file_size - 1);

    if start >= file_size || end >= file_size || start > end {
        return RangeResolution::NotSatisfiable {
            start,
            end,
            file_size,
        };
    }

    RangeResolution::Partial(ByteWindow { start, end })
}

/// Find the first `bytes=<digits>-<digits>?` in the header value
///
/// Trailing text after a match is ignored, so for a multi-range header
/// only the first range is honoured.
fn match_byte_range(header: &str) -> Option<(u64, Option<u64>)> {
    const UNIT: &str = "bytes=";

    let mut rest = header;
    while let Some(pos) = rest.find(UNIT) {
        let candidate = &rest[pos + UNIT.len()..];
        if let Some(found) = match_spec(candidate) {
            return Some(found);
        }
        rest = candidate;
    }
    None
}

/// Match `<start>-<end>?` at the beginning of `spec`
fn match_spec(spec: &str) -> Option<(u64, Option<u64>)> {
    let (start_str, rest) = split_digits(spec);
    if start_str.is_empty() {
        return None;
    }
    let rest = rest.strip_prefix('-')?;
    let (end_str, _) = split_digits(rest);

    let start = parse_bound(start_str);
    let end = (!end_str.is_empty()).then(|| parse_bound(end_str));
    Some((start, end))
}

/// Parse a non-empty digit run, saturating at `u64::MAX`
///
/// Bounds beyond any file size still match the grammar and resolve to 416.
fn parse_bound(digits: &str) -> u64 {
    digits.parse().unwrap_or(u64::MAX)
}

/// Split a leading run of ASCII digits off `s`
fn split_digits(s: &str) -> (&str, &str) {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    s.split_at(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u64 = 1000;

    fn partial(start: u64, end: u64) -> RangeResolution {
        RangeResolution::Partial(ByteWindow { start, end })
    }

    fn full() -> RangeResolution {
        RangeResolution::Full(ByteWindow::full(SIZE))
    }

    #[test]
    fn test_no_range() {
        assert_eq!(resolve_range(None, SIZE), full());
        assert_eq!(ByteWindow::full(SIZE).chunk_size(), SIZE);
    }

    #[test]
    fn test_standard_range() {
        let result = resolve_range(Some("bytes=100-199"), SIZE);
        assert_eq!(result, partial(100, 199));
        if let RangeResolution::Partial(window) = result {
            assert_eq!(window.chunk_size(), 100);
        }
    }

    #[test]
    fn test_open_range() {
        assert_eq!(resolve_range(Some("bytes=900-"), SIZE), partial(900, 999));
        assert_eq!(resolve_range(Some("bytes=0-"), SIZE), partial(0, 999));
    }

    #[test]
    fn test_single_byte_ranges() {
        assert_eq!(resolve_range(Some("bytes=0-0"), SIZE), partial(0, 0));
        assert_eq!(resolve_range(Some("bytes=999-999"), SIZE), partial(999, 999));
        assert_eq!(resolve_range(Some("bytes=0-0"), 1), partial(0, 0));
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            resolve_range(Some("bytes=1000-1005"), SIZE),
            RangeResolution::NotSatisfiable {
                start: 1000,
                end: 1005,
                file_size: SIZE
            }
        );
        // end past the file is rejected, not clamped
        assert!(matches!(
            resolve_range(Some("bytes=0-1000"), SIZE),
            RangeResolution::NotSatisfiable { .. }
        ));
        // inverted window
        assert!(matches!(
            resolve_range(Some("bytes=500-100"), SIZE),
            RangeResolution::NotSatisfiable { .. }
        ));
        // open-ended start past the end reports the defaulted end
        assert_eq!(
            resolve_range(Some("bytes=2000-"), SIZE),
            RangeResolution::NotSatisfiable {
                start: 2000,
                end: 999,
                file_size: SIZE
            }
        );
    }

    #[test]
    fn test_malformed_falls_back_to_full() {
        for header in [
            "bytes=abc",
            "bytes=a-b",
            "bytes=-500",
            "bytes=",
            "bytes 0-9",
            "items=0-9",
            "",
        ] {
            assert_eq!(resolve_range(Some(header), SIZE), full(), "header {header:?}");
        }
    }

    #[test]
    fn test_oversized_bounds_not_satisfiable() {
        assert_eq!(
            resolve_range(Some("bytes=99999999999999999999999-"), SIZE),
            RangeResolution::NotSatisfiable {
                start: u64::MAX,
                end: 999,
                file_size: SIZE
            }
        );
        assert_eq!(
            resolve_range(Some("bytes=0-99999999999999999999999"), SIZE),
            RangeResolution::NotSatisfiable {
                start: 0,
                end: u64::MAX,
                file_size: SIZE
            }
        );
        // u64::MAX itself parses and is rejected the same way
        assert!(matches!(
            resolve_range(Some("bytes=18446744073709551615-"), SIZE),
            RangeResolution::NotSatisfiable { .. }
        ));
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(resolve_range(Some("bytes=0-9,20-29"), SIZE), partial(0, 9));
        assert_eq!(resolve_range(Some("bytes=10-19xyz"), SIZE), partial(10, 19));
        // an unusable first occurrence does not hide a later one
        assert_eq!(
            resolve_range(Some("bytes=x; bytes=5-6"), SIZE),
            partial(5, 6)
        );
    }
}
