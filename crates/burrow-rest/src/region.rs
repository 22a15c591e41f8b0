//! Service regions and the region-mismatch error
//!
//! A region pairs a human name with the REST endpoint serving it. The
//! mismatch error is pure formatting for "you asked for a region the
//! service does not offer"; region selection itself happens in the
//! embedding application.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::url::sanitize_raw_url;

/// A service region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl fmt::Display for Region {
    /// Renders `"name" @ "url"`. The URL is always sanitized, since
    /// region URLs can be user-supplied.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.url.is_empty()) {
            (false, false) => write!(
                f,
                r#""{}" @ "{}""#,
                self.name,
                sanitize_raw_url(&self.url)
            ),
            (false, true) => write!(f, r#""{}""#, self.name),
            _ => write!(f, r#""{}""#, sanitize_raw_url(&self.url)),
        }
    }
}

/// The requested region is not one the service offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMismatchError {
    /// Rendered list of the regions the service does offer.
    pub available: String,
    /// Closest known region to the requested one, if any.
    pub suggestion: Option<Region>,
    /// The region that was requested.
    pub specified: Region,
}

impl fmt::Display for RegionMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {}.", self.specified)?;

        if let Some(suggestion) = &self.suggestion {
            write!(f, " Did you mean {suggestion}?")?;
        }

        if !self.available.is_empty() {
            write!(f, " Available: {}", self.available)?;
        }

        Ok(())
    }
}

impl std::error::Error for RegionMismatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(name: &str, url: &str) -> Region {
        Region {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn display_with_name_and_url() {
        let region = region("eu-central", "https://api.eu-central.burrow.example/rest/v1");
        assert_eq!(
            region.to_string(),
            r#""eu-central" @ "https://api.eu-central.burrow.example/rest/v1""#
        );
    }

    #[test]
    fn display_with_name_only() {
        assert_eq!(region("eu-central", "").to_string(), r#""eu-central""#);
    }

    #[test]
    fn display_with_url_only() {
        assert_eq!(
            region("", "https://api.burrow.example/rest/v1").to_string(),
            r#""https://api.burrow.example/rest/v1""#
        );
    }

    #[test]
    fn display_sanitizes_the_url() {
        let region = region("staging", "https://api.burrow.example/rest/v1?access_key=secret");
        assert!(!region.to_string().contains("secret"));
    }

    #[test]
    fn mismatch_with_suggestion_and_catalog() {
        let err = RegionMismatchError {
            available: r#""eu-central", "us-west""#.to_string(),
            suggestion: Some(region("eu-central", "")),
            specified: region("eu-centrall", ""),
        };

        assert_eq!(
            err.to_string(),
            r#"Unknown "eu-centrall". Did you mean "eu-central"? Available: "eu-central", "us-west""#
        );
    }

    #[test]
    fn mismatch_bare() {
        let err = RegionMismatchError {
            specified: region("mars-1", ""),
            ..Default::default()
        };

        assert_eq!(err.to_string(), r#"Unknown "mars-1"."#);
    }
}
