//! Names of external dependencies

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MeterError, MeterResult};

/// Stable, case-sensitive name of one external collaborator, e.g. `"OpenMeter"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DependencyName(String);

impl DependencyName {
    /// Create a dependency name, rejecting empty or blank names
    pub fn new(name: impl Into<String>) -> MeterResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MeterError::invalid_field(
                "dependency_name",
                "Dependency name must not be empty",
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DependencyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DependencyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for DependencyName {
    type Err = MeterError;

    fn from_str(s: &str) -> MeterResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for DependencyName {
    type Error = MeterError;

    fn try_from(value: String) -> MeterResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for DependencyName {
    type Error = MeterError;

    fn try_from(value: &str) -> MeterResult<Self> {
        Self::new(value)
    }
}

impl From<DependencyName> for String {
    fn from(name: DependencyName) -> Self {
        name.0
    }
}
