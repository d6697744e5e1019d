use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Priority, Progress};
use super::{lenient_enum, null_as_default};
use crate::schedule::interval::TimeSlot;
use crate::schedule::time::{format_wire, parse_wire};

// ─── Appointment ──────────────────────────────────────────────────────────────

/// A booked client appointment as returned by the backend.
///
/// Time fields are kept exactly as received; a record with an unparseable
/// timestamp still deserializes and is simply left out of scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "uuid")]
    pub id: String,
    #[serde(rename = "name", default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(rename = "lastname", default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(rename = "telephone", default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "time_from", default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(rename = "time_to", default, deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(rename = "datetime", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(
        rename = "added_description",
        default,
        deserialize_with = "null_as_default"
    )]
    pub extra: AppointmentExtra,
    #[serde(rename = "user_uuid", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl Appointment {
    /// Materialize a draft under a server-assigned id.
    pub fn from_draft(id: impl Into<String>, draft: &AppointmentDraft) -> Self {
        Self {
            id: id.into(),
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            phone: draft.phone.clone(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            start_time: draft.start_time.clone(),
            end_time: draft.end_time.clone(),
            created_at: draft.created_at.clone(),
            extra: draft.extra.clone(),
            owner_id: None,
        }
    }

    /// "First Last", skipping empty parts.
    pub fn contact_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_wire(&self.start_time)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        parse_wire(&self.end_time)
    }

    /// The booked window, or `None` when either bound is unparseable or the
    /// window is empty.
    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::new(self.starts_at()?, self.ends_at()?).ok()
    }

    pub fn priority(&self) -> Option<Priority> {
        self.extra.priority
    }

    /// Replace the booked window, keeping every other field.
    pub fn with_slot(mut self, slot: TimeSlot) -> Self {
        self.start_time = format_wire(slot.start());
        self.end_time = format_wire(slot.end());
        self
    }
}

// ─── Extensible attributes ────────────────────────────────────────────────────

/// Free-form attributes attached to an appointment (`added_description`).
///
/// Known keys are typed; anything else is kept in `other` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentExtra {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_enum"
    )]
    pub priority: Option<Priority>,
    #[serde(
        default,
        skip_serializing_if = "BTreeSet::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_enum"
    )]
    pub progress: Option<Progress>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

// ─── Create / update payloads ─────────────────────────────────────────────────

/// Body of `POST /clients/add`: an appointment without an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    #[serde(rename = "name")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "telephone")]
    pub phone: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "time_from")]
    pub start_time: String,
    #[serde(rename = "time_to")]
    pub end_time: String,
    #[serde(rename = "datetime", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "added_description", default)]
    pub extra: AppointmentExtra,
}

impl AppointmentDraft {
    pub fn slot(&self) -> Option<TimeSlot> {
        TimeSlot::new(parse_wire(&self.start_time)?, parse_wire(&self.end_time)?).ok()
    }
}

/// Body of `PUT /clients/{id}`. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPatch {
    #[serde(rename = "name", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "lastname", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "telephone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "time_from", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(rename = "time_to", default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(rename = "datetime", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(
        rename = "added_description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub extra: Option<AppointmentExtra>,
}

impl AppointmentPatch {
    /// Patch that moves an appointment and touches nothing else.
    pub fn reschedule(slot: TimeSlot) -> Self {
        Self {
            start_time: Some(format_wire(slot.start())),
            end_time: Some(format_wire(slot.end())),
            ..Self::default()
        }
    }

    /// Full replacement of every editable field.
    pub fn replace_with(draft: &AppointmentDraft) -> Self {
        Self {
            first_name: Some(draft.first_name.clone()),
            last_name: Some(draft.last_name.clone()),
            phone: Some(draft.phone.clone()),
            title: Some(draft.title.clone()),
            description: Some(draft.description.clone()),
            start_time: Some(draft.start_time.clone()),
            end_time: Some(draft.end_time.clone()),
            created_at: draft.created_at.clone(),
            extra: Some(draft.extra.clone()),
        }
    }

    pub fn touches_schedule(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    /// The record as it would look after the backend applied this patch.
    pub fn apply_to(&self, current: &Appointment) -> Appointment {
        let mut next = current.clone();
        if let Some(v) = &self.first_name {
            next.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            next.last_name = v.clone();
        }
        if let Some(v) = &self.phone {
            next.phone = v.clone();
        }
        if let Some(v) = &self.title {
            next.title = v.clone();
        }
        if let Some(v) = &self.description {
            next.description = v.clone();
        }
        if let Some(v) = &self.start_time {
            next.start_time = v.clone();
        }
        if let Some(v) = &self.end_time {
            next.end_time = v.clone();
        }
        if let Some(v) = &self.created_at {
            next.created_at = Some(v.clone());
        }
        if let Some(v) = &self.extra {
            next.extra = v.clone();
        }
        next
    }
}
