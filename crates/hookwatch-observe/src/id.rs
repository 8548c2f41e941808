//! Session id handling for file names
//!
//! Session ids arrive from hook callers and are embedded in log file names.
//! Only the final path component survives, so an id like `../../etc/passwd`
//! can never address a file outside the log directory.

use crate::error::{ObserveError, ObserveResult};

/// Reduce a session id to a single safe file name component.
///
/// Both `/` and `\` are treated as separators regardless of platform.
/// Ids that reduce to nothing, `.` or `..` are rejected.
pub fn sanitize_session_id(session_id: &str) -> ObserveResult<String> {
    let base = session_id
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim_matches('\0');

    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(ObserveError::InvalidSessionId(session_id.to_string()));
    }

    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ids_pass_through() {
        assert_eq!(sanitize_session_id("abc-123").unwrap(), "abc-123");
        assert_eq!(
            sanitize_session_id("6f1e2c9a-0b8d-4c77-9e0a-123456789abc").unwrap(),
            "6f1e2c9a-0b8d-4c77-9e0a-123456789abc"
        );
    }

    #[test]
    fn test_path_components_are_stripped() {
        assert_eq!(sanitize_session_id("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_session_id("/abs/path/s1").unwrap(), "s1");
        assert_eq!(sanitize_session_id("..\\..\\windows\\s2").unwrap(), "s2");
    }

    #[test]
    fn test_traversal_only_ids_are_rejected() {
        for id in ["", ".", "..", "../", "a/..", "foo/", "\\", "bad\0id"] {
            assert!(
                matches!(
                    sanitize_session_id(id),
                    Err(ObserveError::InvalidSessionId(_))
                ),
                "{id:?} should be rejected"
            );
        }
    }
}
