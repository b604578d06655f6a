//! Accumulated comparison differences.

use serde::Serialize;
use std::fmt;

/// An ordered list of human-readable differences between an output file
/// and its reference. An empty report means the files match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompareReport {
    differences: Vec<String>,
}

impl CompareReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, difference: impl Into<String>) {
        self.differences.push(difference.into());
    }

    pub fn is_match(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn differences(&self) -> &[String] {
        &self.differences
    }

    /// Fold another report's differences into this one.
    pub fn merge(&mut self, other: CompareReport) {
        self.differences.extend(other.differences);
    }
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.differences.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_report_matches() {
        let report = CompareReport::new();
        assert!(report.is_match());
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn test_differences_joined_by_newlines() {
        let mut report = CompareReport::new();
        report.push("Page count differs: 2 vs 3");
        report.push("Text differs on page 1");
        assert!(!report.is_match());
        assert_eq!(
            report.to_string(),
            "Page count differs: 2 vs 3\nText differs on page 1"
        );
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut first = CompareReport::new();
        first.push("a");
        let mut second = CompareReport::new();
        second.push("b");
        second.push("c");
        first.merge(second);
        assert_eq!(first.differences(), &["a", "b", "c"]);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut report = CompareReport::new();
        report.push("x");
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"differences":["x"]}"#);
    }
}
