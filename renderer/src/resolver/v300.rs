//! Schema 3-0-0: standard and alternate meals and groceries, alternates
//! tagged with a type such as "veggie" or "halal".

use crate::error::ResolveError;
use crate::resolver::{Env, Item, Resolve, total};
use crate::run::{Delivery, SchemaVersion};
use crate::scope::Binding;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct V300;

/// The two alternate-tagged quantities.
#[derive(Debug, Clone, Copy)]
enum Alternate {
    Meals,
    Groceries,
}

impl Alternate {
    fn from_list(list: &str) -> Option<Self> {
        match list {
            "alternatemeals" => Some(Alternate::Meals),
            "alternategroceries" => Some(Alternate::Groceries),
            _ => None,
        }
    }

    fn count(self, delivery: &Delivery) -> u32 {
        match self {
            Alternate::Meals => delivery.alternate_meals,
            Alternate::Groceries => delivery.alternate_groceries,
        }
    }

    fn tag(self, delivery: &Delivery) -> &str {
        match self {
            Alternate::Meals => delivery.alternate_meal_type.trim(),
            Alternate::Groceries => delivery.alternate_grocery_type.trim(),
        }
    }

    /// Distinct tags with a non-zero count, in first-seen order.
    fn tags<'run>(self, deliveries: &[&'run Delivery]) -> Vec<&'run str> {
        let mut tags: Vec<&'run str> = Vec::new();
        for delivery in deliveries.iter().copied() {
            let tag = self.tag(delivery);
            if self.count(delivery) == 0 || tag.is_empty() {
                continue;
            }
            if !tags.iter().any(|seen| seen.eq_ignore_ascii_case(tag)) {
                tags.push(tag);
            }
        }
        tags
    }

    fn count_for(self, deliveries: &[&Delivery], tag: &str) -> u32 {
        deliveries
            .iter()
            .filter(|d| self.tag(d).eq_ignore_ascii_case(tag))
            .map(|d| self.count(d))
            .sum()
    }
}

impl Resolve for V300 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::V300
    }

    fn version_field<'run>(
        &self,
        list: &str,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Value<'run>, ResolveError>> {
        let name = format!("{}.{}", list, field);
        let list = list.to_ascii_lowercase();
        let field = field.to_ascii_lowercase();
        let delivery = || env.delivery(&name);
        let here = || env.deliveries_here(&name);
        let sum = |quantity: fn(&Delivery) -> u32| here().map(|h| total(&h, quantity));

        if let Some(alternate) = Alternate::from_list(&list) {
            let value: Result<Value<'run>, ResolveError> = match field.as_str() {
                "type" => env.alternate_type(&name).map(Value::text),
                "count" => env.alternate_type(&name).and_then(|tag| {
                    here().map(|h| alternate.count_for(&h, tag).into())
                }),
                _ => return None,
            };
            return Some(value);
        }

        let value: Result<Value<'run>, ResolveError> = match (list.as_str(), field.as_str()) {
            ("consumer", "standardmeals") => delivery().map(|d| d.standard_meals.into()),
            ("consumer", "alternatemeals") => delivery().map(|d| d.alternate_meals.into()),
            ("consumer", "alternatemealtype") => {
                delivery().map(|d| Value::text(&d.alternate_meal_type))
            }
            ("consumer", "standardgroceries") => delivery().map(|d| d.standard_groceries.into()),
            ("consumer", "alternategroceries") => {
                delivery().map(|d| d.alternate_groceries.into())
            }
            ("consumer", "alternategrocerytype") => {
                delivery().map(|d| Value::text(&d.alternate_grocery_type))
            }
            ("pickup", "standardmeals") => sum(|d| d.standard_meals).map(Value::from),
            ("pickup", "alternatemeals") => sum(|d| d.alternate_meals).map(Value::from),
            ("pickup", "standardgroceries") => sum(|d| d.standard_groceries).map(Value::from),
            ("pickup", "alternategroceries") => sum(|d| d.alternate_groceries).map(Value::from),
            ("pickup", "anystandardmeals") => sum(|d| d.standard_meals).map(|n| (n > 0).into()),
            ("pickup", "anyalternatemeals") => sum(|d| d.alternate_meals).map(|n| (n > 0).into()),
            ("pickup", "anystandardgroceries") => {
                sum(|d| d.standard_groceries).map(|n| (n > 0).into())
            }
            ("pickup", "anyalternategroceries") => {
                sum(|d| d.alternate_groceries).map(|n| (n > 0).into())
            }
            _ => return None,
        };
        Some(value)
    }

    fn version_collection<'run>(
        &self,
        name: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Vec<Item<'run>>, ResolveError>> {
        let alternate = Alternate::from_list(&name.to_ascii_lowercase())?;
        let items = env.deliveries_here(name).map(|here| {
            alternate
                .tags(&here)
                .into_iter()
                .map(|tag| vec![Binding::AlternateType(tag)])
                .collect()
        });
        Some(items)
    }

    fn version_collections(&self) -> &'static [&'static str] {
        &["alternatemeals", "alternategroceries"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{ControlBlock, DeliveryRun, Driver, Restaurant};
    use crate::scope::Scopes;

    fn delivery(meals: u32, tag: &str, restaurant: &str) -> Delivery {
        let mut d = Delivery::new("x", restaurant);
        d.alternate_meals = meals;
        d.alternate_meal_type = tag.to_string();
        d
    }

    fn run() -> DeliveryRun {
        let mut run = DeliveryRun::new(ControlBlock::new(SchemaVersion::V300));
        let mut alice = Driver::new("alice");
        alice.pickups.push(Restaurant::new("A"));
        alice.deliveries = vec![
            delivery(1, "veggie", "A"),
            delivery(2, "halal", "A"),
            delivery(0, "kosher", "A"),
            delivery(3, "Veggie", "A"),
            delivery(4, "vegan", "B"),
        ];
        run.drivers.push(alice);
        run
    }

    #[test]
    fn alternate_tags_are_distinct_and_ordered() {
        let run = run();
        let driver = &run.drivers[0];
        let mut scopes = Scopes::new();
        let root = scopes.root("driver alice");
        scopes.bind(root, Binding::Driver(driver));
        scopes.bind(root, Binding::Pickup(&driver.pickups[0]));
        let env = Env::new(&run, &scopes, root);

        let items = V300.collection("AlternateMeals", &env).unwrap();
        let tags: Vec<&str> = items
            .iter()
            .filter_map(|item| match item[0] {
                Binding::AlternateType(tag) => Some(tag),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["veggie", "halal"]);

        let child = scopes.child(root, "AlternateMeals[0]");
        scopes.bind(child, items[0][0]);
        let env = Env::new(&run, &scopes, child);
        assert_eq!(V300.field("AlternateMeals", "Count", &env), Ok(Value::Number(4)));
        assert_eq!(V300.field("alternatemeals", "type", &env), Ok(Value::text("veggie")));
        assert_eq!(V300.field("Pickup", "AlternateMeals", &env), Ok(Value::Number(10)));
        assert_eq!(V300.field("Pickup", "AnyStandardMeals", &env), Ok(Value::Boolean(false)));
    }

    #[test]
    fn alternates_need_a_pickup() {
        let run = run();
        let mut scopes = Scopes::new();
        let root = scopes.root("driver alice");
        scopes.bind(root, Binding::Driver(&run.drivers[0]));
        let env = Env::new(&run, &scopes, root);
        assert!(matches!(
            V300.collection("AlternateGroceries", &env),
            Err(ResolveError::Unbound { binding: "pickup restaurant", .. })
        ));
    }
}
