use serde::Deserialize;

/// One consumer drop-off.
///
/// Quantities for both schema generations live side by side; the resolver
/// for the run's version decides which ones templates may see.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub name: String,
    pub user_name: String,
    pub phone: String,
    pub alt_phone: String,
    pub address: String,
    pub city: String,
    pub is_condo: bool,
    pub details: String,
    /// Name of the restaurant the order is picked up from.
    pub restaurant: String,

    // 2-0-0
    pub normal_rations: u32,
    pub veggie_rations: u32,

    // 3-0-0
    pub standard_meals: u32,
    pub alternate_meals: u32,
    pub alternate_meal_type: String,
    pub standard_groceries: u32,
    pub alternate_groceries: u32,
    pub alternate_grocery_type: String,
}

impl Delivery {
    pub fn new(name: impl Into<String>, restaurant: impl Into<String>) -> Self {
        Delivery {
            name: name.into(),
            restaurant: restaurant.into(),
            ..Delivery::default()
        }
    }

    /// An alternate phone is on file: populated and not "none".
    pub fn has_alt_phone(&self) -> bool {
        let alt = self.alt_phone.trim();
        !alt.is_empty() && !alt.eq_ignore_ascii_case("none")
    }

    pub fn is_from(&self, restaurant: &str) -> bool {
        self.restaurant.eq_ignore_ascii_case(restaurant)
    }
}
