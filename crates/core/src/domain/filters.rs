use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter keys the inventory store acts on. Anything else coming back from
/// the model is carried through the mapping and ignored at query time.
pub const RECOGNIZED_FILTER_KEYS: &[&str] = &[
    "brand",
    "model",
    "year_min",
    "year_max",
    "fuel",
    "price_min",
    "price_max",
    "color",
    "transmission",
];

/// A single filter value as extracted from the model reply.
///
/// Untagged so that `"Toyota"`, `2020`, `["red", "blue"]` and `true` all
/// deserialize directly from the model's JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Lenient conversion from arbitrary model JSON. Nulls, objects and
    /// mixed-type lists that cannot be salvaged yield `None`.
    pub fn from_json(value: &Value) -> Option<FilterValue> {
        match value {
            Value::Bool(flag) => Some(FilterValue::Flag(*flag)),
            Value::Number(number) => number.as_f64().map(FilterValue::Number),
            Value::String(text) => Some(FilterValue::Text(text.clone())),
            Value::Array(items) => {
                let texts = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text.clone()),
                        Value::Number(number) => Some(number.to_string()),
                        _ => None,
                    })
                    .collect::<Vec<_>>();
                (!texts.is_empty()).then_some(FilterValue::List(texts))
            }
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Numeric view used for the year/price bound keys. Text that parses as
    /// a number counts; the model sometimes quotes numerals.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FilterValue::Number(number) => Some(*number),
            FilterValue::Text(text) => text.trim().parse::<f64>().ok(),
            FilterValue::Flag(_) | FilterValue::List(_) => None,
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Flag(flag) => write!(formatter, "{flag}"),
            FilterValue::Number(number) => write!(formatter, "{number}"),
            FilterValue::Text(text) => write!(formatter, "{text}"),
            FilterValue::List(items) => write!(formatter, "{}", items.join(", ")),
        }
    }
}

/// The accumulated search constraints for one query cycle.
///
/// Ordered map so prompt serialization and display are deterministic.
pub type FilterMap = BTreeMap<String, FilterValue>;

/// Merge analyzer output into the active mapping. Overwrite wins on key
/// collision; nothing is ever removed here.
pub fn merge_filters(active: &mut FilterMap, new_filters: FilterMap) {
    active.extend(new_filters);
}

/// Build a mapping from a JSON object, dropping entries whose values have
/// no filter representation.
pub fn filters_from_json(object: &serde_json::Map<String, Value>) -> FilterMap {
    object
        .iter()
        .filter_map(|(key, value)| {
            FilterValue::from_json(value).map(|filter| (key.clone(), filter))
        })
        .collect()
}
