use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::RunError;

/// Delivery-run data-shape generation. Selects the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SchemaVersion {
    /// Ration-count model: normal and veggie rations per delivery.
    V200,
    /// Standard and alternate meals and groceries, with alternate type tags.
    V300,
}

impl SchemaVersion {
    pub fn token(self) -> &'static str {
        match self {
            SchemaVersion::V200 => "2-0-0",
            SchemaVersion::V300 => "3-0-0",
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2-0-0" => Ok(SchemaVersion::V200),
            "3-0-0" => Ok(SchemaVersion::V300),
            other => Err(RunError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = RunError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Run-wide directives from the control block of the delivery-run file.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlBlock {
    pub version: SchemaVersion,
    #[serde(default)]
    pub on_call_ops_manager: Option<OpsManager>,
    #[serde(default)]
    pub backup_drivers: Vec<String>,
    #[serde(default)]
    pub split_restaurants: Vec<SplitRestaurant>,
}

impl ControlBlock {
    pub fn new(version: SchemaVersion) -> Self {
        ControlBlock {
            version,
            on_call_ops_manager: None,
            backup_drivers: Vec::new(),
            split_restaurants: Vec::new(),
        }
    }

    /// Cleanup assignment for a split restaurant, by restaurant name.
    pub fn split_restaurant(&self, name: &str) -> Option<&SplitRestaurant> {
        self.split_restaurants
            .iter()
            .find(|split| split.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpsManager {
    pub user_name: String,
    #[serde(default)]
    pub phone: String,
}

/// A restaurant served by more than one driver, and who cleans up after it.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitRestaurant {
    pub name: String,
    pub cleanup_driver: String,
}
