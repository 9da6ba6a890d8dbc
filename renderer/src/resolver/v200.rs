//! Schema 2-0-0: every delivery carries normal and veggie ration counts.

use crate::error::ResolveError;
use crate::resolver::{Env, Item, Resolve, total};
use crate::run::SchemaVersion;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct V200;

impl Resolve for V200 {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::V200
    }

    fn version_field<'run>(
        &self,
        list: &str,
        field: &str,
        env: &Env<'_, 'run>,
    ) -> Option<Result<Value<'run>, ResolveError>> {
        let name = format!("{}.{}", list, field);
        let field = field.to_ascii_lowercase();
        let value: Result<Value<'run>, ResolveError> =
            match (list.to_ascii_lowercase().as_str(), field.as_str()) {
                ("consumer", "normalrations") => env.delivery(&name).map(|d| d.normal_rations.into()),
                ("consumer", "veggierations") => env.delivery(&name).map(|d| d.veggie_rations.into()),
                ("pickup", "normalrations") => env
                    .deliveries_here(&name)
                    .map(|here| total(&here, |d| d.normal_rations).into()),
                ("pickup", "veggierations") => env
                    .deliveries_here(&name)
                    .map(|here| total(&here, |d| d.veggie_rations).into()),
                ("pickup", "anynormalrations") => env
                    .deliveries_here(&name)
                    .map(|here| (total(&here, |d| d.normal_rations) > 0).into()),
                ("pickup", "anyveggierations") => env
                    .deliveries_here(&name)
                    .map(|here| (total(&here, |d| d.veggie_rations) > 0).into()),
                _ => return None,
            };
        Some(value)
    }

    fn version_collection<'run>(
        &self,
        _name: &str,
        _env: &Env<'_, 'run>,
    ) -> Option<Result<Vec<Item<'run>>, ResolveError>> {
        None
    }

    fn version_collections(&self) -> &'static [&'static str] {
        &[]
    }
}
