//! Lenient deserialisation helpers for documents written by older clients.

use serde::{Deserialize, Deserializer};

/// Deserialise an explicit `null` as the type's default value.
///
/// Combine with `#[serde(default)]` so both an absent field and a `null`
/// field become an empty collection instead of a decoding failure.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
