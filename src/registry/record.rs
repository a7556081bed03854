// src/registry/record.rs

//! Line-record parser shared by the registry store and the upstream feed
//!
//! Both files use the same format: one package per line, five fields
//! separated by whitespace:
//!
//! ```text
//! name version content_hash source_locator status_code
//! ```

use super::{PackageRecord, PackageStatus};
use thiserror::Error;

/// Longest accepted package name
pub const NAME_MAX_LEN: usize = 49;

/// Longest accepted version token
pub const VERSION_MAX_LEN: usize = 19;

/// Longest accepted content hash
pub const HASH_MAX_LEN: usize = 64;

/// Longest accepted source locator
pub const LOCATOR_MAX_LEN: usize = 255;

/// Why a line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid status code '{0}'")]
    Status(String),

    #[error("invalid package name '{0}'")]
    Name(String),

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{0} must be a single non-empty token")]
    Token(&'static str),

    #[error("duplicate package name '{0}'")]
    Duplicate(String),
}

/// A rejected line and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source text
    pub line_number: usize,
    pub content: String,
    pub reason: LineError,
}

/// Result of parsing a whole store or feed
#[derive(Debug, Default, Clone)]
pub struct ParsedRecords {
    pub records: Vec<PackageRecord>,
    pub skipped: Vec<SkippedLine>,
}

/// Check that a name can key the registry and name a directory
pub fn validate_name(name: &str) -> Result<(), LineError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(LineError::Name(name.to_string()));
    }
    if name.len() > NAME_MAX_LEN {
        return Err(LineError::TooLong {
            field: "name",
            max: NAME_MAX_LEN,
        });
    }
    Ok(())
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), LineError> {
    if value.len() > max {
        Err(LineError::TooLong { field, max })
    } else {
        Ok(())
    }
}

fn check_token(field: &'static str, value: &str) -> Result<(), LineError> {
    if value.is_empty() || value.contains(char::is_whitespace) {
        Err(LineError::Token(field))
    } else {
        Ok(())
    }
}

/// Check every field of a record so that it survives a store round trip
pub fn validate(record: &PackageRecord) -> Result<(), LineError> {
    check_token("name", &record.name)?;
    check_token("version", &record.version)?;
    check_token("content hash", &record.content_hash)?;
    check_token("source locator", &record.source_locator)?;

    validate_name(&record.name)?;
    check_len("version", &record.version, VERSION_MAX_LEN)?;
    check_len("content hash", &record.content_hash, HASH_MAX_LEN)?;
    check_len("source locator", &record.source_locator, LOCATOR_MAX_LEN)
}

/// Parse one record line
pub fn parse_line(line: &str) -> Result<PackageRecord, LineError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let &[name, version, content_hash, source_locator, status] = fields.as_slice() else {
        return Err(LineError::FieldCount(fields.len()));
    };

    let status = status
        .parse::<u8>()
        .ok()
        .and_then(PackageStatus::from_code)
        .ok_or_else(|| LineError::Status(status.to_string()))?;

    let record = PackageRecord::new(
        name.to_string(),
        version.to_string(),
        content_hash.to_string(),
        source_locator.to_string(),
        status,
    );
    validate(&record)?;
    Ok(record)
}

/// Parse every line of `text`, collecting rejects instead of failing
///
/// Blank lines are ignored without a report.
pub fn parse_records(text: &str) -> ParsedRecords {
    parse_records_with(text, |_| Ok(()))
}

/// Like [`parse_records`], with an extra check applied to every well-formed
/// record in line order; a record the check rejects is skipped with its reason
pub fn parse_records_with(
    text: &str,
    mut accept: impl FnMut(&PackageRecord) -> Result<(), LineError>,
) -> ParsedRecords {
    let mut parsed = ParsedRecords::default();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line).and_then(|record| accept(&record).map(|()| record)) {
            Ok(record) => parsed.records.push(record),
            Err(reason) => parsed.skipped.push(SkippedLine {
                line_number: index + 1,
                content: line.to_string(),
                reason,
            }),
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn test_parse_valid_line() {
        let line = format!("foo 1.0 {} https://example/foo.tar.gz 3", HASH);
        let record = parse_line(&line).unwrap();
        assert_eq!(record.name, "foo");
        assert_eq!(record.version, "1.0");
        assert_eq!(record.content_hash, HASH);
        assert_eq!(record.source_locator, "https://example/foo.tar.gz");
        assert_eq!(record.status, PackageStatus::Optional);
        assert!(!record.present_upstream);
    }

    #[test]
    fn test_field_count_mismatch() {
        assert_eq!(parse_line("foo 1.0 abc"), Err(LineError::FieldCount(3)));
        assert_eq!(
            parse_line("foo 1.0 abc /tmp/foo.tar 2 extra"),
            Err(LineError::FieldCount(6))
        );
    }

    #[test]
    fn test_bad_status_code() {
        assert_eq!(
            parse_line("foo 1.0 abc /tmp/foo.tar 9"),
            Err(LineError::Status("9".to_string()))
        );
        assert_eq!(
            parse_line("foo 1.0 abc /tmp/foo.tar x"),
            Err(LineError::Status("x".to_string()))
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("gcc-13").is_ok());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert_eq!(
            validate_name(&"x".repeat(NAME_MAX_LEN + 1)),
            Err(LineError::TooLong {
                field: "name",
                max: NAME_MAX_LEN
            })
        );
    }

    #[test]
    fn test_validate_rejects_embedded_whitespace() {
        let record = PackageRecord::new(
            "foo".to_string(),
            "1 .0".to_string(),
            "abc".to_string(),
            "/p/foo.tar".to_string(),
            PackageStatus::Manual,
        );
        assert_eq!(validate(&record), Err(LineError::Token("version")));
    }

    #[test]
    fn test_parse_records_skips_and_reports() {
        let text = format!(
            "foo 1.0 {h} /pkgs/foo.tar 0\n\nbroken line\nbar 2.1 {h} /pkgs/bar.tar 5\n",
            h = HASH
        );
        let parsed = parse_records(&text);

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].status, PackageStatus::Manual);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line_number, 3);
        assert_eq!(parsed.skipped[0].content, "broken line");
        assert_eq!(parsed.skipped[0].reason, LineError::FieldCount(2));
    }

    #[test]
    fn test_parse_records_with_rejects_in_line_order() {
        let text = format!(
            "foo 1.0 {h} /pkgs/foo.tar 0\nbar 1.0 {h} /pkgs/bar.tar 0\nbroken\n",
            h = HASH
        );
        let parsed = parse_records_with(&text, |record| {
            if record.name == "bar" {
                Err(LineError::Duplicate(record.name.clone()))
            } else {
                Ok(())
            }
        });

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "foo");
        let lines: Vec<usize> = parsed.skipped.iter().map(|s| s.line_number).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(parsed.skipped[0].reason, LineError::Duplicate("bar".to_string()));
    }

    #[test]
    fn test_tabs_and_repeated_spaces_tolerated() {
        let record = parse_line("foo\t1.0  abc   /pkgs/foo.tar 1").unwrap();
        assert_eq!(record.version, "1.0");
        assert_eq!(record.status, PackageStatus::SecurityUpdate);
    }
}
