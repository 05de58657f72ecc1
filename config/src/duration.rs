//! humantime durations (`1m`, `90days`) in configuration values.

use serde::{
    de,
    Deserialize,
    Deserializer,
};
use std::time::Duration;

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let value = String::deserialize(deserializer)?;
    humantime::parse_duration(&value).map_err(|e| de::Error::custom(format!("invalid duration {value:?}: {e}")))
}

pub(crate) fn deserialize_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Duration>, D::Error> {
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|value| {
            humantime::parse_duration(value)
                .map_err(|e| de::Error::custom(format!("invalid duration {value:?}: {e}")))
        })
        .collect()
}

pub(crate) fn format(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}
