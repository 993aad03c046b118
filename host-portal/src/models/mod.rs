pub mod accommodation;
pub mod host_request;
pub mod session;
pub mod timestamp;

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default. The backend sends `null` for
/// empty collections on some endpoints.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
