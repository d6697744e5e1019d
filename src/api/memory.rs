//! In-process backend with the same contract as the REST one.

use std::sync::Mutex;

use super::error::ApiError;
use super::types::{ClientPage, Pagination};
use super::AppointmentBackend;
use crate::models::{Appointment, AppointmentDraft, AppointmentPatch, ListQuery};
use crate::schedule::find_conflicts;
use crate::schedule::time::parse_wire;

const DEFAULT_PER_PAGE: u32 = 100;

/// Appointments held in memory, with server-side overlap enforcement.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    records: Mutex<Vec<Appointment>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        Self {
            records: Mutex::new(appointments),
        }
    }

    /// Copy of every stored record.
    pub fn snapshot(&self) -> Vec<Appointment> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Appointment>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reject_overlap(records: &[Appointment], candidate: &Appointment) -> Result<(), ApiError> {
        let slot = candidate.slot().ok_or_else(|| ApiError::Status {
            status: 422,
            body: "time_from must be before time_to".into(),
        })?;
        let clashes = find_conflicts(&slot, records, Some(candidate.id.as_str()));
        if clashes.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Conflict(format!(
                "overlaps appointment {}",
                clashes[0].id
            )))
        }
    }
}

fn matches_query(appt: &Appointment, query: &ListQuery) -> bool {
    let from = query.from.as_deref().and_then(parse_wire);
    let to = query.to.as_deref().and_then(parse_wire);
    let in_range = match appt.starts_at() {
        Some(start) => from.map_or(true, |f| start >= f) && to.map_or(true, |t| start <= t),
        None => from.is_none() && to.is_none(),
    };
    let needle = query.search.as_deref().map(str::trim).unwrap_or_default().to_lowercase();
    let found = needle.is_empty()
        || [&appt.first_name, &appt.last_name, &appt.title]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
    in_range && found
}

impl AppointmentBackend for InMemoryBackend {
    async fn list(&self, query: &ListQuery) -> Result<ClientPage, ApiError> {
        let mut hits: Vec<Appointment> = self
            .lock()
            .iter()
            .filter(|a| matches_query(a, query))
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.starts_at());

        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).max(1);
        let page = query.page.unwrap_or(1).max(1);
        let total = hits.len();
        let total_pages = total.div_ceil(per_page as usize) as u32;
        let clients = hits
            .into_iter()
            .skip((page as usize - 1) * per_page as usize)
            .take(per_page as usize)
            .collect();

        Ok(ClientPage {
            clients,
            pagination: Pagination {
                total: total as u64,
                total_pages,
            },
        })
    }

    async fn get(&self, id: &str) -> Result<Appointment, ApiError> {
        self.lock()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn create(&self, draft: &AppointmentDraft) -> Result<Appointment, ApiError> {
        let appt = Appointment::from_draft(uuid::Uuid::new_v4().to_string(), draft);
        let mut records = self.lock();
        Self::reject_overlap(&records, &appt)?;
        records.push(appt.clone());
        Ok(appt)
    }

    async fn update(&self, id: &str, patch: &AppointmentPatch) -> Result<Appointment, ApiError> {
        let mut records = self.lock();
        let index = records
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let next = patch.apply_to(&records[index]);
        if patch.touches_schedule() {
            Self::reject_overlap(&records, &next)?;
        }
        records[index] = next.clone();
        Ok(next)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|a| a.id != id);
        if records.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
