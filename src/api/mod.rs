//! Appointment backend access.
//!
//! `AppointmentBackend` is the seam the service talks to. `ApiClient` is the
//! HTTP implementation; `InMemoryBackend` keeps records in process and
//! enforces the same no-overlap rule, for tests and offline demos.

use std::future::Future;

pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use memory::InMemoryBackend;
pub use types::{ClientPage, Pagination};

use crate::models::{Appointment, AppointmentDraft, AppointmentPatch, ListQuery};

/// Appointment CRUD as exposed by the backend.
///
/// The backend is authoritative for overlaps: `create` and `update` fail
/// with `ApiError::Conflict` when the window collides with another record.
pub trait AppointmentBackend: Send + Sync {
    /// One page of appointments matching `query`.
    fn list(&self, query: &ListQuery) -> impl Future<Output = Result<ClientPage, ApiError>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = Result<Appointment, ApiError>> + Send;

    /// Create a record; the backend assigns the id.
    fn create(
        &self,
        draft: &AppointmentDraft,
    ) -> impl Future<Output = Result<Appointment, ApiError>> + Send;

    fn update(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> impl Future<Output = Result<Appointment, ApiError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}
