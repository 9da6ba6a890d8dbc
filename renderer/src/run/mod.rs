//! The delivery-run object graph consumed by the renderer.
//!
//! Collaborators build and audit the graph before rendering; the renderer
//! only reads it. Runs can also be loaded from TOML.

pub mod control;
pub mod delivery;
pub mod driver;
pub mod restaurant;

use std::path::Path;

use serde::Deserialize;

pub use control::{ControlBlock, OpsManager, SchemaVersion, SplitRestaurant};
pub use delivery::Delivery;
pub use driver::{Driver, Stop};
pub use restaurant::Restaurant;

use crate::error::RunError;

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryRun {
    pub control: ControlBlock,
    #[serde(default)]
    pub restaurants: Vec<Restaurant>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

impl DeliveryRun {
    pub fn new(control: ControlBlock) -> Self {
        DeliveryRun {
            control,
            restaurants: Vec::new(),
            drivers: Vec::new(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, RunError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, RunError> {
        let text = std::fs::read_to_string(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn version(&self) -> SchemaVersion {
        self.control.version
    }

    /// Run-wide restaurant by name.
    pub fn restaurant(&self, name: &str) -> Option<&Restaurant> {
        self.restaurants
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn driver(&self, user_name: &str) -> Option<&Driver> {
        self.drivers
            .iter()
            .find(|d| d.user_name.eq_ignore_ascii_case(user_name))
    }
}
