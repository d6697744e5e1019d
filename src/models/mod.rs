//! Wire-level data model shared by the REST client and the scheduling core.

pub mod appointment;
pub mod enums;
pub mod filters;
pub mod user;

pub use appointment::{Appointment, AppointmentDraft, AppointmentExtra, AppointmentPatch};
pub use enums::{Priority, Progress, SortBy, ViewMode};
pub use filters::{AgendaFilter, ListQuery};
pub use user::{AccountUpdate, JwtResponse, UserAccount, UserLogin, UserRegister};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}

/// Treats an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    use serde::Deserialize;
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a string enum, mapping unknown or non-string values to `None`.
pub(crate) fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr,
{
    use serde::Deserialize;
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse().ok()))
}
