//! Explicit calendar state with request generations.
//!
//! `ScheduleState` holds what the calendar screen shows: the view, its
//! anchor date, and the appointments of the last applied fetch. Every
//! mutation is a plain method; no I/O happens here.
//!
//! Range fetches follow "latest request wins". `begin_fetch` hands out a
//! ticket with a fresh generation; `apply_fetch` and `fail_fetch` only act
//! when that ticket is still the newest one issued.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::ScheduleError;
use crate::models::{AgendaFilter, Appointment, ViewMode};
use crate::schedule::{
    self, bucket, ensure_available, fetch_range, DateRange, GridOptions, NavDirection, Reschedule,
    ScheduleGrid, TimeSlot,
};

/// Proof that a fetch was requested for a given view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub range: DateRange,
    pub view: ViewMode,
    pub anchor: NaiveDate,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a fetch result handed back to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Result replaced the current appointments.
    Applied,
    /// A newer fetch was issued since; result dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ScheduleState {
    view: ViewMode,
    anchor: NaiveDate,
    tz: Tz,
    options: GridOptions,
    appointments: Vec<Appointment>,
    generation: u64,
    /// Range of the last applied fetch, `None` until one succeeds.
    loaded: Option<DateRange>,
}

impl ScheduleState {
    pub fn new(view: ViewMode, anchor: NaiveDate, tz: Tz, options: GridOptions) -> Self {
        Self {
            view,
            anchor,
            tz,
            options,
            appointments: Vec::new(),
            generation: 0,
            loaded: None,
        }
    }

    // ── Read access ─────────────────────────────────────────

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn loaded_range(&self) -> Option<DateRange> {
        self.loaded
    }

    /// Range the current view needs.
    pub fn visible_range(&self) -> DateRange {
        fetch_range(self.view, self.anchor)
    }

    pub fn find(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn grid(&self) -> ScheduleGrid {
        bucket(&self.appointments, self.view, self.anchor, self.tz, &self.options)
    }

    pub fn day_agenda(&self, date: NaiveDate) -> Vec<&Appointment> {
        schedule::day_agenda(&self.appointments, date, self.tz)
    }

    pub fn list(&self, filter: &AgendaFilter) -> Vec<&Appointment> {
        schedule::filter_agenda(&self.appointments, filter, self.tz)
    }

    // ── Navigation ──────────────────────────────────────────
    //
    // These only move the view. The caller starts a fetch afterwards.

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn go_to(&mut self, date: NaiveDate) {
        self.anchor = date;
    }

    pub fn navigate(&mut self, direction: NavDirection) {
        self.anchor = schedule::navigate(self.view, self.anchor, direction);
    }

    // ── Fetch generations ───────────────────────────────────

    /// Start a fetch for the current view. Any earlier ticket becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
            range: self.visible_range(),
            view: self.view,
            anchor: self.anchor,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation
    }

    pub fn apply_fetch(&mut self, ticket: &FetchTicket, appointments: Vec<Appointment>) -> FetchOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(
                generation = ticket.generation,
                latest = self.generation,
                "Discarding stale fetch result"
            );
            return FetchOutcome::Stale;
        }
        self.appointments = appointments;
        self.loaded = Some(ticket.range);
        FetchOutcome::Applied
    }

    /// Record a failed fetch. The latest failure empties the view so stale
    /// data from another range is never shown.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket) -> FetchOutcome {
        if !self.is_current(ticket) {
            return FetchOutcome::Stale;
        }
        self.appointments.clear();
        self.loaded = None;
        FetchOutcome::Applied
    }

    // ── Booking checks ──────────────────────────────────────

    /// Local pre-check before a create (`exclude_id = None`) or an edit.
    pub fn check_booking(&self, slot: &TimeSlot, exclude_id: Option<&str>) -> Result<(), ScheduleError> {
        ensure_available(slot, &self.appointments, exclude_id)
    }

    fn require(&self, id: &str) -> Result<&Appointment, ScheduleError> {
        self.find(id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))
    }

    /// Plan a drop onto an hour row and check it against loaded appointments.
    pub fn plan_drop(&self, id: &str, date: NaiveDate, hour: u32) -> Result<Reschedule, ScheduleError> {
        let appt = self.require(id)?;
        let plan = schedule::plan_hour_drop(appt, date, hour, self.tz)?;
        self.check_booking(&plan.to, Some(id))?;
        Ok(plan)
    }

    /// Plan a drop onto a month-view day and check it.
    pub fn plan_day_drop(&self, id: &str, date: NaiveDate) -> Result<Reschedule, ScheduleError> {
        let appt = self.require(id)?;
        let plan = schedule::plan_day_drop(appt, date, self.tz)?;
        self.check_booking(&plan.to, Some(id))?;
        Ok(plan)
    }

    // ── Confirmed mutations ─────────────────────────────────
    //
    // Called only after the backend confirmed the change.

    /// Insert or replace a saved record.
    pub fn apply_saved(&mut self, appt: Appointment) {
        match self.appointments.iter_mut().find(|a| a.id == appt.id) {
            Some(existing) => *existing = appt,
            None => self.appointments.push(appt),
        }
    }

    pub fn apply_removed(&mut self, id: &str) -> bool {
        let before = self.appointments.len();
        self.appointments.retain(|a| a.id != id);
        self.appointments.len() != before
    }
}
