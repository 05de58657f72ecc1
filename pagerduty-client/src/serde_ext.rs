use serde::{
    Deserialize,
    Deserializer,
};

/// PagerDuty sends `null` for plenty of optional objects and strings; treat
/// those like absent fields.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
