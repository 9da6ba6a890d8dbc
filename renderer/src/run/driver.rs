use serde::Deserialize;

use crate::run::delivery::Delivery;
use crate::run::restaurant::Restaurant;

/// One stop on a driver's itinerary, by index into the driver's own lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stop {
    Pickup(usize),
    Delivery(usize),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Driver {
    pub user_name: String,
    pub name: String,
    pub phone: String,
    /// Start time computed upstream; falls back to the first pickup's.
    pub start_time: Option<String>,
    pub warnings: Vec<String>,
    pub pickups: Vec<Restaurant>,
    pub deliveries: Vec<Delivery>,
    /// Explicit stop order. Empty means every pickup, then every delivery.
    pub itinerary: Vec<Stop>,
}

impl Driver {
    pub fn new(user_name: impl Into<String>) -> Self {
        Driver {
            user_name: user_name.into(),
            ..Driver::default()
        }
    }

    pub fn first_pickup(&self) -> Option<&Restaurant> {
        self.pickups.first()
    }

    pub fn start_time(&self) -> &str {
        self.start_time
            .as_deref()
            .or_else(|| self.first_pickup().map(|r| r.start_time.as_str()))
            .unwrap_or_default()
    }

    /// Ordered stops. Entries pointing past the end of a list are dropped.
    pub fn stops(&self) -> Vec<Stop> {
        if self.itinerary.is_empty() {
            return (0..self.pickups.len())
                .map(Stop::Pickup)
                .chain((0..self.deliveries.len()).map(Stop::Delivery))
                .collect();
        }
        self.itinerary
            .iter()
            .copied()
            .filter(|stop| match *stop {
                Stop::Pickup(i) => i < self.pickups.len(),
                Stop::Delivery(i) => i < self.deliveries.len(),
            })
            .collect()
    }

    /// This driver's deliveries picked up at `restaurant`.
    pub fn deliveries_from<'a>(
        &'a self,
        restaurant: &'a str,
    ) -> impl Iterator<Item = &'a Delivery> + 'a {
        self.deliveries.iter().filter(move |d| d.is_from(restaurant))
    }

    pub fn has_condo(&self) -> bool {
        self.deliveries.iter().any(|d| d.is_condo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_itinerary_is_pickups_then_deliveries() {
        let mut driver = Driver::new("alice");
        driver.pickups = vec![Restaurant::new("A"), Restaurant::new("B")];
        driver.deliveries = vec![Delivery::new("Bob", "A")];
        assert_eq!(
            driver.stops(),
            vec![Stop::Pickup(0), Stop::Pickup(1), Stop::Delivery(0)]
        );
    }

    #[test]
    fn explicit_itinerary_drops_dangling_stops() {
        let mut driver = Driver::new("alice");
        driver.pickups = vec![Restaurant::new("A")];
        driver.deliveries = vec![Delivery::new("Bob", "A")];
        driver.itinerary = vec![Stop::Delivery(0), Stop::Pickup(3), Stop::Pickup(0)];
        assert_eq!(driver.stops(), vec![Stop::Delivery(0), Stop::Pickup(0)]);
    }

    #[test]
    fn start_time_falls_back_to_first_pickup() {
        let mut driver = Driver::new("alice");
        assert_eq!(driver.start_time(), "");
        let mut pickup = Restaurant::new("A");
        pickup.start_time = "5:10".into();
        driver.pickups.push(pickup);
        assert_eq!(driver.start_time(), "5:10");
        driver.start_time = Some("4:55".into());
        assert_eq!(driver.start_time(), "4:55");
    }
}
