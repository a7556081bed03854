// src/version.rs

//! Version ordering
//!
//! Versions are opaque tokens ordered byte-wise, so `"9" > "10"` and
//! `"1.10" < "1.9"`. This is a known defect kept for compatibility with
//! existing registry stores and installed manifests; callers must not
//! assume semantic ordering.

use std::cmp::Ordering;

/// Compare two version tokens byte-wise
pub fn compare(a: &str, b: &str) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

/// True when `available` sorts strictly after `installed`
pub fn is_newer(available: &str, installed: &str) -> bool {
    compare(available, installed) == Ordering::Greater
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ordering() {
        assert!(is_newer("1.1", "1.0"));
        assert!(!is_newer("1.0", "1.0"));
        assert!(!is_newer("1.0", "1.1"));
    }

    #[test]
    fn test_bytewise_not_semantic() {
        // Byte-wise comparison: '9' (0x39) sorts after '1' (0x31)
        assert!(is_newer("9", "10"));
        assert!(!is_newer("1.10", "1.9"));
        assert_eq!(compare("2.0", "2.0-1"), Ordering::Less);
    }

    #[test]
    fn test_empty_installed_version() {
        assert!(is_newer("1.0", ""));
        assert!(!is_newer("", ""));
    }
}
