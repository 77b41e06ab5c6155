//! Salesforce REST API version

use std::fmt;
use std::str::FromStr;

use common::ArgumentError;

/// Validated API version such as `44.0`. Always rendered with one decimal
/// place, so `ApiVersion::new(44.0)` becomes `v44.0` in service paths.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ApiVersion(f64);

impl ApiVersion {
    pub fn new(version: f64) -> Result<Self, ArgumentError> {
        if !version.is_finite() || version <= 0.0 {
            return Err(ArgumentError::new(
                "api_version",
                format!("must be a positive number, got {version}"),
            ));
        }
        Ok(Self(version))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// `services/data/v<version>`
    pub fn data_root(&self) -> String {
        format!("services/data/v{self}")
    }

    /// `services/data/v<version>/tooling`
    pub fn tooling_root(&self) -> String {
        format!("{}/tooling", self.data_root())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl FromStr for ApiVersion {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let version = trimmed
            .parse::<f64>()
            .map_err(|e| ArgumentError::new("api_version", format!("'{s}' is not a number: {e}")))?;
        Self::new(version)
    }
}
