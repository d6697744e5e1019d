//! Calendar operations: state transitions plus backend calls.
//!
//! Each operation runs the local checks against `ScheduleState`, talks to
//! the backend, and applies the result only once the backend confirmed it.
//! The state mutex is taken in short synchronous sections and never held
//! across an await.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::api::AppointmentBackend;
use crate::error::{ErrorKind, ScheduleError};
use crate::models::{Appointment, AppointmentDraft, AppointmentPatch, ListQuery, ViewMode};
use crate::schedule::time::format_wire;
use crate::schedule::{BookingForm, NavDirection, Reschedule, ScheduleGrid, TimeSlot};
use crate::state::{FetchOutcome, FetchTicket, ScheduleState};

pub struct ScheduleService<B> {
    backend: B,
    state: Mutex<ScheduleState>,
    per_page: u32,
}

/// Log a failed operation once, at the level its kind deserves.
fn report<T>(operation: &'static str, result: Result<T, ScheduleError>) -> Result<T, ScheduleError> {
    if let Err(e) = &result {
        match e.kind() {
            ErrorKind::Validation | ErrorKind::Conflict => {
                tracing::info!(operation, error = %e, "Operation rejected")
            }
            ErrorKind::Auth => tracing::warn!(operation, "Operation requires login"),
            ErrorKind::Network => tracing::warn!(operation, error = %e, "Operation failed"),
        }
    }
    result
}

fn window_of(appt: &Appointment) -> Result<TimeSlot, ScheduleError> {
    appt.slot()
        .ok_or_else(|| ScheduleError::validation("time_to", "End time must be after start time"))
}

impl<B: AppointmentBackend> ScheduleService<B> {
    pub fn new(backend: B, state: ScheduleState, per_page: u32) -> Self {
        Self {
            backend,
            state: Mutex::new(state),
            per_page: per_page.max(1),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScheduleState>, ScheduleError> {
        self.state.lock().map_err(|_| ScheduleError::LockPoisoned)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<ScheduleState, ScheduleError> {
        Ok(self.lock()?.clone())
    }

    pub fn grid(&self) -> Result<ScheduleGrid, ScheduleError> {
        Ok(self.lock()?.grid())
    }

    // ═══════════════════════════════════════════════════════
    // Fetching
    // ═══════════════════════════════════════════════════════

    /// Fetch the visible range. Only the newest request may touch state.
    ///
    /// A superseded request returns `Ok(FetchOutcome::Stale)` whether it
    /// succeeded or failed, except that auth failures always surface.
    pub async fn refresh(&self) -> Result<FetchOutcome, ScheduleError> {
        let (ticket, tz) = {
            let mut state = self.lock()?;
            (state.begin_fetch(), state.timezone())
        };
        tracing::debug!(
            generation = ticket.generation(),
            view = %ticket.view,
            first = %ticket.range.first,
            last = %ticket.range.last,
            "Fetching appointments"
        );

        let fetched = self.fetch_range(&ticket, tz).await;

        let mut state = self.lock()?;
        match fetched {
            Ok(Some(appointments)) => {
                let count = appointments.len();
                let outcome = state.apply_fetch(&ticket, appointments);
                if outcome == FetchOutcome::Applied {
                    tracing::debug!(count, "Appointments loaded");
                }
                Ok(outcome)
            }
            Ok(None) => Ok(FetchOutcome::Stale),
            Err(e) => {
                let outcome = state.fail_fetch(&ticket);
                drop(state);
                if outcome == FetchOutcome::Stale && e.kind() != ErrorKind::Auth {
                    tracing::debug!(error = %e, "Ignoring failure of superseded fetch");
                    return Ok(FetchOutcome::Stale);
                }
                report("refresh", Err(e))
            }
        }
    }

    /// Every page of the ticket's range, or `None` once the ticket went stale.
    async fn fetch_range(
        &self,
        ticket: &FetchTicket,
        tz: chrono_tz::Tz,
    ) -> Result<Option<Vec<Appointment>>, ScheduleError> {
        let (from, to) = ticket.range.utc_bounds(tz);
        let mut query = ListQuery {
            from: Some(format_wire(from)),
            to: Some(format_wire(to)),
            page: Some(1),
            per_page: Some(self.per_page),
            search: None,
        };
        let mut appointments: Vec<Appointment> = Vec::new();
        let mut seen = HashSet::new();

        loop {
            let page_no = query.page.unwrap_or(1);
            let page = self.backend.list(&query).await?;
            let last = page.is_last(page_no);
            let before = appointments.len();
            appointments.extend(page.clients.into_iter().filter(|a| seen.insert(a.id.clone())));
            // A page with nothing new means the backend is not paging.
            let done = last || appointments.len() == before;
            if done {
                return Ok(Some(appointments));
            }
            if !self.lock()?.is_current(ticket) {
                tracing::debug!(page = page_no, "Fetch superseded between pages");
                return Ok(None);
            }
            query.page = Some(page_no + 1);
        }
    }

    // ═══════════════════════════════════════════════════════
    // Navigation
    // ═══════════════════════════════════════════════════════

    pub async fn navigate(&self, direction: NavDirection) -> Result<FetchOutcome, ScheduleError> {
        self.lock()?.navigate(direction);
        self.refresh().await
    }

    pub async fn set_view(&self, view: ViewMode) -> Result<FetchOutcome, ScheduleError> {
        self.lock()?.set_view(view);
        self.refresh().await
    }

    pub async fn go_to(&self, date: NaiveDate) -> Result<FetchOutcome, ScheduleError> {
        self.lock()?.go_to(date);
        self.refresh().await
    }

    // ═══════════════════════════════════════════════════════
    // Mutations
    // ═══════════════════════════════════════════════════════

    /// Refetch after a confirmed mutation. The mutation stands either way,
    /// but a rejected session is returned so the caller asks for a login.
    async fn refresh_after(&self, operation: &'static str) -> Result<(), ScheduleError> {
        match self.refresh().await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::Auth => {
                tracing::warn!(operation, "Saved, but the session expired before reloading");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "Saved, but reloading the view failed");
                Ok(())
            }
        }
    }

    /// Create an appointment after the local overlap pre-check.
    pub async fn book(&self, draft: &AppointmentDraft) -> Result<Appointment, ScheduleError> {
        report("book", self.book_inner(draft).await)
    }

    async fn book_inner(&self, draft: &AppointmentDraft) -> Result<Appointment, ScheduleError> {
        let slot = draft
            .slot()
            .ok_or_else(|| ScheduleError::validation("time_to", "End time must be after start time"))?;
        self.lock()?.check_booking(&slot, None)?;

        let created = self.backend.create(draft).await?;
        tracing::info!(id = %created.id, start = %created.start_time, "Appointment booked");
        self.lock()?.apply_saved(created.clone());
        self.refresh_after("book").await?;
        Ok(created)
    }

    /// Validate a booking form and create the appointment.
    pub async fn submit(&self, form: &BookingForm) -> Result<Appointment, ScheduleError> {
        let tz = self.lock()?.timezone();
        let draft = report("submit", form.to_draft(tz))?;
        self.book(&draft).await
    }

    /// Replace every editable field of `id` with the form's content.
    pub async fn edit(&self, id: &str, form: &BookingForm) -> Result<Appointment, ScheduleError> {
        let tz = self.lock()?.timezone();
        let draft = report("edit", form.to_draft(tz))?;
        self.update(id, &AppointmentPatch::replace_with(&draft)).await
    }

    /// Partial update. Time changes are pre-checked with the record itself
    /// excluded.
    pub async fn update(&self, id: &str, patch: &AppointmentPatch) -> Result<Appointment, ScheduleError> {
        report("update", self.update_inner(id, patch).await)
    }

    async fn update_inner(&self, id: &str, patch: &AppointmentPatch) -> Result<Appointment, ScheduleError> {
        if patch.touches_schedule() {
            let loaded = self.lock()?.find(id).cloned();
            let current = match loaded {
                Some(appt) => appt,
                None => self.backend.get(id).await?,
            };
            let next = patch.apply_to(&current);
            let slot = window_of(&next)?;
            self.lock()?.check_booking(&slot, Some(id))?;
        }

        let updated = self.backend.update(id, patch).await?;
        tracing::info!(id = %updated.id, "Appointment updated");
        self.lock()?.apply_saved(updated.clone());
        self.refresh_after("update").await?;
        Ok(updated)
    }

    async fn commit_move(&self, plan: Reschedule) -> Result<Appointment, ScheduleError> {
        let moved = self.backend.update(&plan.id, &plan.patch()).await?;
        tracing::info!(
            id = %plan.id,
            from = %plan.from.start(),
            to = %plan.to.start(),
            "Appointment rescheduled"
        );
        self.lock()?.apply_saved(moved.clone());
        self.refresh_after("reschedule").await?;
        Ok(moved)
    }

    /// Drag onto an hour row (day/week view).
    pub async fn drop_at_hour(&self, id: &str, date: NaiveDate, hour: u32) -> Result<Appointment, ScheduleError> {
        let plan = report("drop_at_hour", self.lock().and_then(|s| s.plan_drop(id, date, hour)))?;
        report("drop_at_hour", self.commit_move(plan).await)
    }

    /// Drag onto a month-view day.
    pub async fn drop_on_day(&self, id: &str, date: NaiveDate) -> Result<Appointment, ScheduleError> {
        let plan = report("drop_on_day", self.lock().and_then(|s| s.plan_day_drop(id, date)))?;
        report("drop_on_day", self.commit_move(plan).await)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ScheduleError> {
        report("delete", self.delete_inner(id).await)
    }

    async fn delete_inner(&self, id: &str) -> Result<(), ScheduleError> {
        self.backend.delete(id).await?;
        tracing::info!(id, "Appointment deleted");
        self.lock()?.apply_removed(id);
        self.refresh_after("delete").await?;
        Ok(())
    }
}
