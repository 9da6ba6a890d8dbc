//! Names every schema version understands.

use crate::error::ResolveError;
use crate::resolver::{Env, Item};
use crate::run::{Restaurant, Stop};
use crate::scope::Binding;
use crate::value::Value;

pub(super) const COLLECTIONS: &[&str] = &[
    "consumer",
    "pickup",
    "itinerary",
    "driver",
    "splitrestaurant",
    "backupdriver",
];

type Resolved<'run> = Option<Result<Value<'run>, ResolveError>>;

pub(super) fn simple<'run>(name: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    let driver = || env.driver(name);
    let first = || driver().map(|d| d.first_pickup());
    let value: Result<Value<'run>, ResolveError> = match name.to_ascii_lowercase().as_str() {
        "driver" => driver().map(|d| Value::text(&d.user_name)),
        "drivername" => driver().map(|d| Value::text(&d.name)),
        "driverphone" => driver().map(|d| Value::text(&d.phone)),
        "starttime" => driver().map(|d| Value::text(d.start_time())),
        "firstrestaurant" => first().map(|r| Value::text(r.map_or("", |r| r.name.as_str()))),
        "firstrestaurantstarttime" => {
            first().map(|r| Value::text(r.map_or("", |r| r.start_time.as_str())))
        }
        "firstrestaurantclosingtime" => {
            first().map(|r| Value::text(r.map_or("", |r| r.closing_time.as_str())))
        }
        "warnings" => driver().map(|d| Value::owned(d.warnings.join("\n"))),
        "haswarnings" => driver().map(|d| (!d.warnings.is_empty()).into()),
        "anycondo" | "iscondo" => driver().map(|d| d.has_condo().into()),
        "backupdriver" => env.backup_driver(name).map(Value::text),
        "hasbackupdriver" => Ok(env.scopes.backup_driver(env.at).is_some().into()),
        _ => return None,
    };
    Some(value)
}

pub(super) fn structure<'run>(name: &str, field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    if !name.eq_ignore_ascii_case("oncallopsmanager") {
        return None;
    }
    let manager = || {
        env.run
            .control
            .on_call_ops_manager
            .as_ref()
            .ok_or_else(|| ResolveError::Unbound {
                name: format!("{}.{}", name, field),
                binding: "on-call ops manager in the control block",
            })
    };
    let value: Result<Value<'run>, ResolveError> = match field.to_ascii_lowercase().as_str() {
        "username" => manager().map(|m| Value::text(&m.user_name)),
        "phone" => manager().map(|m| Value::text(&m.phone)),
        _ => return None,
    };
    Some(value)
}

pub(super) fn field<'run>(list: &str, field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    match list.to_ascii_lowercase().as_str() {
        "consumer" => consumer(field, env),
        "pickup" => pickup(field, env),
        "driver" => driver(field, env),
        "splitrestaurant" => split_restaurant(field, env),
        "backupdriver" => backup_driver(field, env),
        _ => None,
    }
}

fn consumer<'run>(field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    let name = format!("Consumer.{}", field);
    let delivery = || env.delivery(&name);
    let value: Result<Value<'run>, ResolveError> = match field.to_ascii_lowercase().as_str() {
        "name" => delivery().map(|d| Value::text(&d.name)),
        "username" => delivery().map(|d| Value::text(&d.user_name)),
        "phone" => delivery().map(|d| Value::text(&d.phone)),
        "altphone" => delivery().map(|d| Value::text(&d.alt_phone)),
        "address" => delivery().map(|d| Value::text(&d.address)),
        "city" => delivery().map(|d| Value::text(&d.city)),
        "details" => delivery().map(|d| Value::text(&d.details)),
        "restaurant" => delivery().map(|d| Value::text(&d.restaurant)),
        "restaurantemoji" => delivery().map(|d| {
            let icon = env
                .scopes
                .driver(env.at)
                .and_then(|driver| driver.pickups.iter().find(|r| d.is_from(&r.name)))
                .map(|r| emoji(r, env))
                .or_else(|| env.run.restaurant(&d.restaurant).map(|r| r.emoji.as_str()))
                .unwrap_or_default();
            Value::text(icon)
        }),
        "iscondo" => delivery().map(|d| d.is_condo.into()),
        "hasaltphone" => delivery().map(|d| d.has_alt_phone().into()),
        "hasdetails" => delivery().map(|d| (!d.details.trim().is_empty()).into()),
        _ => return None,
    };
    Some(value)
}

fn pickup<'run>(field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    let name = format!("Pickup.{}", field);
    let restaurant = || env.pickup(&name);
    let value: Result<Value<'run>, ResolveError> = match field.to_ascii_lowercase().as_str() {
        "name" => restaurant().map(|r| Value::text(&r.name)),
        "address" => restaurant().map(|r| Value::text(&r.address)),
        "emoji" => restaurant().map(|r| Value::text(emoji(r, env))),
        "details" => restaurant().map(|r| Value::text(&r.details)),
        "starttime" => restaurant().map(|r| Value::text(&r.start_time)),
        "closingtime" => restaurant().map(|r| Value::text(&r.closing_time)),
        "orders" => restaurant().map(|r| r.orders.into()),
        "hasdetails" => restaurant().map(|r| (!r.details.trim().is_empty()).into()),
        "issplit" => restaurant().map(|r| is_split(r, env).into()),
        "cleanupdriver" => {
            restaurant().map(|r| Value::text(cleanup_driver(r, env).unwrap_or_default()))
        }
        "iscleanupdriver" => restaurant().and_then(|r| {
            let driver = env.driver(&name)?;
            Ok(cleanup_driver(r, env)
                .is_some_and(|cleanup| cleanup.eq_ignore_ascii_case(&driver.user_name))
                .into())
        }),
        _ => return None,
    };
    Some(value)
}

fn driver<'run>(field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    let name = format!("Driver.{}", field);
    let driver = || env.driver(&name);
    let value: Result<Value<'run>, ResolveError> = match field.to_ascii_lowercase().as_str() {
        "username" => driver().map(|d| Value::text(&d.user_name)),
        "name" => driver().map(|d| Value::text(&d.name)),
        "phone" => driver().map(|d| Value::text(&d.phone)),
        "starttime" => driver().map(|d| Value::text(d.start_time())),
        "firstrestaurant" => {
            driver().map(|d| Value::text(d.first_pickup().map_or("", |r| r.name.as_str())))
        }
        _ => return None,
    };
    Some(value)
}

fn split_restaurant<'run>(field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    let name = format!("SplitRestaurant.{}", field);
    let split = || env.split_restaurant(&name);
    let value: Result<Value<'run>, ResolveError> = match field.to_ascii_lowercase().as_str() {
        "name" => split().map(|s| Value::text(&s.name)),
        "emoji" => split().map(|s| {
            Value::text(env.run.restaurant(&s.name).map_or("", |r| r.emoji.as_str()))
        }),
        "cleanupdriver" => split().map(|s| Value::text(&s.cleanup_driver)),
        _ => return None,
    };
    Some(value)
}

fn backup_driver<'run>(field: &str, env: &Env<'_, 'run>) -> Resolved<'run> {
    let name = format!("BackupDriver.{}", field);
    match field.to_ascii_lowercase().as_str() {
        "username" => Some(env.backup_driver(&name).map(Value::text)),
        _ => None,
    }
}

/// A route entry may leave the emoji blank; the run-wide list has it.
fn emoji<'run>(restaurant: &'run Restaurant, env: &Env<'_, 'run>) -> &'run str {
    if !restaurant.emoji.is_empty() {
        return &restaurant.emoji;
    }
    env.run
        .restaurant(&restaurant.name)
        .map_or("", |r| r.emoji.as_str())
}

fn is_split(restaurant: &Restaurant, env: &Env<'_, '_>) -> bool {
    restaurant.is_split()
        || env.run.restaurant(&restaurant.name).is_some_and(Restaurant::is_split)
        || env.run.control.split_restaurant(&restaurant.name).is_some()
}

fn cleanup_driver<'run>(restaurant: &Restaurant, env: &Env<'_, 'run>) -> Option<&'run str> {
    env.run
        .control
        .split_restaurant(&restaurant.name)
        .map(|split| split.cleanup_driver.as_str())
}

pub(super) fn collection<'run>(
    name: &str,
    env: &Env<'_, 'run>,
) -> Option<Result<Vec<Item<'run>>, ResolveError>> {
    let items: Result<Vec<Item<'run>>, ResolveError> = match name.to_ascii_lowercase().as_str() {
        "consumer" => env.driver(name).map(|driver| {
            // Inside a Pickup, only the orders collected there.
            let here = env.scopes.pickup(env.at);
            driver
                .deliveries
                .iter()
                .filter(|d| here.is_none_or(|r| d.is_from(&r.name)))
                .map(|d| vec![Binding::Delivery(d)])
                .collect()
        }),
        "pickup" => env.driver(name).map(|driver| {
            driver
                .pickups
                .iter()
                .map(|r| vec![Binding::Pickup(r)])
                .collect()
        }),
        "itinerary" => env.driver(name).map(|driver| {
            driver
                .stops()
                .into_iter()
                .filter_map(|stop| {
                    let entity = match stop {
                        Stop::Pickup(i) => Binding::Pickup(driver.pickups.get(i)?),
                        Stop::Delivery(i) => Binding::Delivery(driver.deliveries.get(i)?),
                    };
                    Some(vec![Binding::ItineraryStop(stop), entity])
                })
                .collect()
        }),
        "driver" => Ok(env
            .run
            .drivers
            .iter()
            .map(|d| vec![Binding::Driver(d)])
            .collect()),
        "splitrestaurant" => Ok(env
            .run
            .control
            .split_restaurants
            .iter()
            .map(|s| vec![Binding::SplitRestaurant(s)])
            .collect()),
        "backupdriver" => Ok(env
            .run
            .control
            .backup_drivers
            .iter()
            .map(|b| vec![Binding::BackupDriver(b.as_str())])
            .collect()),
        _ => return None,
    };
    Some(items)
}
