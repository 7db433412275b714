//! Analytics event names and property bags.

use serde_json::{Map, Value};

pub const START_BEGIN: &str = "start_begin";
pub const START_END: &str = "start_end";
pub const SELECTED_SERVICE: &str = "selected_service";

/// Free-form event properties.
pub type Props = Map<String, Value>;

/// Build a property bag from `(key, value)` pairs.
pub fn props<I, K, V>(pairs: I) -> Props
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
