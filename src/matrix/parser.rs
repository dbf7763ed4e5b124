//! Run description parsing.
//!
//! Matrix runs label themselves with a free-text description of the form
//! `"<axis-1> / <axis-2> (<outcome>)"`, for example
//! `"rhel-7.2-x86_64 / stable-2.1 (passed)"`.

use regex::Regex;

use super::{ConfigurationKey, ParseError};

const DESCRIPTION_PATTERN: &str = r"(.*) / (.*) \((.*)\)";

/// A successfully parsed run description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescription {
    pub key: ConfigurationKey,
    pub outcome: String,
}

pub struct DescriptionParser {
    pattern: Regex,
}

impl Default for DescriptionParser {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DESCRIPTION_PATTERN).expect("description pattern is valid"),
        }
    }
}

impl DescriptionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&self, description: Option<&str>) -> Result<ParsedDescription, ParseError> {
        let text = match description {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ParseError::MissingDescription),
        };

        let caps = self
            .pattern
            .captures(text)
            .ok_or_else(|| ParseError::Unrecognized {
                description: text.to_string(),
            })?;

        Ok(ParsedDescription {
            key: ConfigurationKey::new(&caps[1], &caps[2]),
            outcome: caps[3].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform_version_outcome() {
        let parsed = DescriptionParser::new()
            .parse(Some("rhel-7.2-x86_64 / stable-2.1 (passed)"))
            .unwrap();
        assert_eq!(parsed.key, ConfigurationKey::new("rhel-7.2-x86_64", "stable-2.1"));
        assert_eq!(parsed.outcome, "passed");
    }

    #[test]
    fn test_parse_outcome_with_spaces() {
        let parsed = DescriptionParser::new()
            .parse(Some("ubuntu-14.04-x86_64 / devel (failed 3 of 120)"))
            .unwrap();
        assert_eq!(parsed.key.axis1, "ubuntu-14.04-x86_64");
        assert_eq!(parsed.key.axis2, "devel");
        assert_eq!(parsed.outcome, "failed 3 of 120");
    }

    #[test]
    fn test_parse_rejects_free_text() {
        let err = DescriptionParser::new().parse(Some("bad input")).unwrap_err();
        assert_eq!(
            err,
            ParseError::Unrecognized {
                description: "bad input".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_missing_outcome() {
        let parser = DescriptionParser::new();
        assert!(parser.parse(Some("centos-7 / devel")).is_err());
        assert!(parser.parse(Some("centos-7 devel (passed)")).is_err());
    }

    #[test]
    fn test_parse_absent_or_empty() {
        let parser = DescriptionParser::new();
        assert_eq!(parser.parse(None), Err(ParseError::MissingDescription));
        assert_eq!(parser.parse(Some("")), Err(ParseError::MissingDescription));
    }
}
