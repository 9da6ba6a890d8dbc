use serde::Deserialize;

/// A pickup location as it appears on a driver's route.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Restaurant {
    pub name: String,
    pub address: String,
    pub emoji: String,
    pub details: String,
    pub start_time: String,
    pub closing_time: String,
    /// Orders this driver picks up here.
    pub orders: u32,
    /// User names of every driver picking up here.
    pub drivers: Vec<String>,
}

impl Restaurant {
    pub fn new(name: impl Into<String>) -> Self {
        Restaurant {
            name: name.into(),
            ..Restaurant::default()
        }
    }

    /// More than one driver picks up at this restaurant.
    pub fn is_split(&self) -> bool {
        self.drivers.len() > 1
    }
}
