//! Versioned reference resolution.
//!
//! Each schema generation names its own quantities. A resolver answers for
//! its version's names first and falls back to the vocabulary both versions
//! share; anything left over is an unknown reference.

mod common;
mod v200;
mod v300;

pub use v200::V200;
pub use v300::V300;

use crate::error::{RefKind, ResolveError};
use crate::run::{
    Delivery, DeliveryRun, Driver, Restaurant, SchemaVersion, SplitRestaurant, Stop,
};
use crate::scope::{Binding, BindingKind, ScopeId, Scopes};
use crate::value::Value;

/// One collection element: the bindings a child scope receives for it.
pub type Item<'run> = Vec<Binding<'run>>;

/// Where a reference is being resolved: the run, and a scope in a pass.
#[derive(Clone, Copy)]
pub struct Env<'a, 'run> {
    pub run: &'run DeliveryRun,
    pub scopes: &'a Scopes<'run>,
    pub at: ScopeId,
}

impl<'a, 'run> Env<'a, 'run> {
    pub fn new(run: &'run DeliveryRun, scopes: &'a Scopes<'run>, at: ScopeId) -> Self {
        Env { run, scopes, at }
    }

    pub fn driver(&self, name: &str) -> Result<&'run Driver, ResolveError> {
        self.scopes
            .driver(self.at)
            .ok_or_else(|| unbound(name, BindingKind::Driver))
    }

    pub fn delivery(&self, name: &str) -> Result<&'run Delivery, ResolveError> {
        self.scopes
            .delivery(self.at)
            .ok_or_else(|| unbound(name, BindingKind::Delivery))
    }

    pub fn pickup(&self, name: &str) -> Result<&'run Restaurant, ResolveError> {
        self.scopes
            .pickup(self.at)
            .ok_or_else(|| unbound(name, BindingKind::Pickup))
    }

    pub fn split_restaurant(&self, name: &str) -> Result<&'run SplitRestaurant, ResolveError> {
        self.scopes
            .split_restaurant(self.at)
            .ok_or_else(|| unbound(name, BindingKind::SplitRestaurant))
    }

    pub fn backup_driver(&self, name: &str) -> Result<&'run str, ResolveError> {
        self.scopes
            .backup_driver(self.at)
            .ok_or_else(|| unbound(name, BindingKind::BackupDriver))
    }

    pub fn alternate_type(&self, name: &str) -> Result<&'run str, ResolveError> {
        self.scopes
            .alternate_type(self.at)
            .ok_or_else(|| unbound(name, BindingKind::AlternateType))
    }

    pub fn itinerary_stop(&self, name: &str) -> Result<Stop, ResolveError> {
        self.scopes
            .itinerary_stop(self.at)
            .ok_or_else(|| unbound(name, BindingKind::ItineraryStop))
    }

    /// The bound driver's deliveries picked up at the bound restaurant.
    pub fn deliveries_here(&self, name: &str) -> Result<Vec<&'run Delivery>, ResolveError> {
        let driver = self.driver(name)?;
        let pickup = self.pickup(name)?;
        Ok(driver.deliveries_from(&pickup.name).collect())
    }
}

pub(crate) fn unbound(name: &str, kind: BindingKind) -> ResolveError {
    ResolveError::Unbound {
        name: name.to_string(),
        binding: kind.describe(),
    }
}

/// Resolution for one schema version.
pub trait Resolve {
    fn version(&self) -> SchemaVersion;

    /// List fields only this version knows. `None` when the name is not one
    /// of them.
    fn version_field<'run>(
        &self,
        list: &str,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Value<'run>, ResolveError>>;

    /// Collections only this version knows.
    fn version_collection<'run>(
        &self,
        name: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Vec<Item<'run>>, ResolveError>>;

    /// Lower-case names of this version's own collections.
    fn version_collections(&self) -> &'static [&'static str];

    fn unknown(&self, kind: RefKind, name: impl Into<String>) -> ResolveError {
        ResolveError::Unknown {
            kind,
            name: name.into(),
            version: self.version().token(),
        }
    }

    fn is_collection(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        common::COLLECTIONS.contains(&name.as_str())
            || self.version_collections().contains(&name.as_str())
    }

    /// `${Name}`, as text or as an `IF` subject. A bare collection name
    /// resolves to its element count.
    fn simple<'run>(
        &self,
        name: &str,
        kind: RefKind,
        env: &Env<'_, 'run>,
    ) -> Result<Value<'run>, ResolveError> {
        if let Some(value) = common::simple(name, env) {
            return value;
        }
        if self.is_collection(name) {
            let items = self.collection(name, env)?;
            return Ok(Value::Number(u32::try_from(items.len()).unwrap_or(u32::MAX)));
        }
        Err(self.unknown(kind, name))
    }

    /// `${Struct.Field}` over a run-wide structure.
    fn structure<'run>(
        &self,
        name: &str,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Result<Value<'run>, ResolveError> {
        common::structure(name, field, env)
            .unwrap_or_else(|| Err(self.unknown(RefKind::Field, format!("{}.{}", name, field))))
    }

    /// `${List.Field}` against the element bound for `list`.
    fn field<'run>(
        &self,
        list: &str,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Result<Value<'run>, ResolveError> {
        if list.eq_ignore_ascii_case("itinerary") {
            return self.itinerary_field(field, env);
        }
        self.version_field(list, field, env)
            .or_else(|| common::field(list, field, env))
            .unwrap_or_else(|| Err(self.unknown(RefKind::Field, format!("{}.{}", list, field))))
    }

    /// Itinerary stops answer `IsPickup`/`IsDelivery` themselves and hand
    /// everything else to the Pickup or Consumer vocabulary. A field that only
    /// the other kind of stop has renders empty.
    fn itinerary_field<'run>(
        &self,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Result<Value<'run>, ResolveError> {
        let name = format!("Itinerary.{}", field);
        let stop = env.itinerary_stop(&name)?;
        match field.to_ascii_lowercase().as_str() {
            "ispickup" => return Ok(matches!(stop, Stop::Pickup(_)).into()),
            "isdelivery" => return Ok(matches!(stop, Stop::Delivery(_)).into()),
            _ => {}
        }

        let (own, other) = match stop {
            Stop::Pickup(_) => ("Pickup", "Consumer"),
            Stop::Delivery(_) => ("Consumer", "Pickup"),
        };
        match self.field(own, field, env) {
            Err(ResolveError::Unknown { .. }) => match self.field(other, field, env) {
                Err(ResolveError::Unknown { .. }) => Err(self.unknown(RefKind::Field, name)),
                _ => Ok(Value::text("")),
            },
            result => result,
        }
    }

    /// The elements of a collection, in order.
    fn collection<'run>(
        &self,
        name: &str,
        env: &Env<'_, 'run>,
    ) -> Result<Vec<Item<'run>>, ResolveError> {
        self.version_collection(name, env)
            .or_else(|| common::collection(name, env))
            .unwrap_or_else(|| Err(self.unknown(RefKind::Collection, name)))
    }
}

/// The resolver chosen for a run, once, from its schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolver {
    V200(V200),
    V300(V300),
}

impl Resolver {
    pub fn for_version(version: SchemaVersion) -> Self {
        match version {
            SchemaVersion::V200 => Resolver::V200(V200),
            SchemaVersion::V300 => Resolver::V300(V300),
        }
    }

    pub fn for_run(run: &DeliveryRun) -> Self {
        Resolver::for_version(run.version())
    }
}

impl Resolve for Resolver {
    fn version(&self) -> SchemaVersion {
        match self {
            Resolver::V200(r) => r.version(),
            Resolver::V300(r) => r.version(),
        }
    }

    fn version_field<'run>(
        &self,
        list: &str,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Value<'run>, ResolveError>> {
        match self {
            Resolver::V200(r) => r.version_field(list, field, env),
            Resolver::V300(r) => r.version_field(list, field, env),
        }
    }

    fn version_collection<'run>(
        &self,
        name: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Vec<Item<'run>>, ResolveError>> {
        match self {
            Resolver::V200(r) => r.version_collection(name, env),
            Resolver::V300(r) => r.version_collection(name, env),
        }
    }

    fn version_collections(&self) -> &'static [&'static str] {
        match self {
            Resolver::V200(r) => r.version_collections(),
            Resolver::V300(r) => r.version_collections(),
        }
    }
}

/// Sum a quantity over deliveries, stopping at `u32::MAX`.
pub(crate) fn total(deliveries: &[&Delivery], quantity: impl Fn(&Delivery) -> u32) -> u32 {
    deliveries
        .iter()
        .fold(0u32, |sum, d| sum.saturating_add(quantity(d)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::ControlBlock;

    fn run(version: SchemaVersion) -> DeliveryRun {
        let mut run = DeliveryRun::new(ControlBlock::new(version));
        let mut alice = Driver::new("alice");
        alice.pickups.push(Restaurant::new("Bopshop"));
        let mut carol = Delivery::new("Carol", "Bopshop");
        carol.normal_rations = 2;
        carol.standard_meals = 3;
        alice.deliveries.push(carol);
        run.drivers.push(alice);
        run
    }

    fn in_consumer<T>(
        run: &DeliveryRun,
        f: impl FnOnce(&Env<'_, '_>) -> T,
    ) -> T {
        let mut scopes = Scopes::new();
        let root = scopes.root("test");
        let driver = &run.drivers[0];
        scopes.bind(root, Binding::Driver(driver));
        scopes.bind(root, Binding::Pickup(&driver.pickups[0]));
        scopes.bind(root, Binding::Delivery(&driver.deliveries[0]));
        f(&Env::new(run, &scopes, root))
    }

    #[test]
    fn version_fields_do_not_leak() {
        let old = run(SchemaVersion::V200);
        let resolver = Resolver::for_run(&old);
        in_consumer(&old, |env| {
            assert_eq!(
                resolver.field("consumer", "NormalRations", env),
                Ok(Value::Number(2))
            );
            assert!(matches!(
                resolver.field("Consumer", "StandardMeals", env),
                Err(ResolveError::Unknown { version: "2-0-0", .. })
            ));
        });

        let new = run(SchemaVersion::V300);
        let resolver = Resolver::for_run(&new);
        in_consumer(&new, |env| {
            assert_eq!(
                resolver.field("Consumer", "standardmeals", env),
                Ok(Value::Number(3))
            );
            assert!(matches!(
                resolver.field("Consumer", "VeggieRations", env),
                Err(ResolveError::Unknown { kind: RefKind::Field, .. })
            ));
            assert!(resolver.is_collection("alternatemeals"));
        });
        assert!(!Resolver::for_run(&old).is_collection("AlternateMeals"));
    }

    #[test]
    fn shared_names_resolve_in_both_versions() {
        for version in [SchemaVersion::V200, SchemaVersion::V300] {
            let run = run(version);
            let resolver = Resolver::for_run(&run);
            in_consumer(&run, |env| {
                assert_eq!(
                    resolver.simple("DRIVER", RefKind::Scalar, env),
                    Ok(Value::text("alice"))
                );
                assert_eq!(
                    resolver.field("Consumer", "Name", env),
                    Ok(Value::text("Carol"))
                );
                assert_eq!(
                    resolver.simple("Consumer", RefKind::Predicate, env),
                    Ok(Value::Number(1))
                );
            });
        }
    }

    #[test]
    fn unknown_names_carry_their_kind() {
        let run = run(SchemaVersion::V300);
        let resolver = Resolver::for_run(&run);
        in_consumer(&run, |env| {
            assert_eq!(
                resolver.simple("Nope", RefKind::Predicate, env),
                Err(ResolveError::Unknown {
                    kind: RefKind::Predicate,
                    name: "Nope".into(),
                    version: "3-0-0",
                })
            );
            assert!(matches!(
                resolver.collection("Nope", env),
                Err(ResolveError::Unknown { kind: RefKind::Collection, .. })
            ));
        });
    }

    #[test]
    fn pickup_totals_stop_at_the_largest_count() {
        let mut bob = Delivery::new("Bob", "Bopshop");
        bob.normal_rations = u32::MAX;
        let mut carol = Delivery::new("Carol", "Bopshop");
        carol.normal_rations = 2;
        assert_eq!(total(&[&bob, &carol], |d| d.normal_rations), u32::MAX);
        assert_eq!(total(&[&carol, &carol], |d| d.normal_rations), 4);
        assert_eq!(total(&[], |d| d.normal_rations), 0);
    }
}
