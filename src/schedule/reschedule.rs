//! Drag-and-drop rescheduling.
//!
//! A drop computes a new window with the original duration. Whether the
//! window is free is decided by the caller with the same overlap check used
//! for form submissions.

use chrono::{NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use super::interval::TimeSlot;
use super::time::{from_local, to_local, TimeError};
use crate::error::ScheduleError;
use crate::models::{Appointment, AppointmentPatch};

/// A planned move of one appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reschedule {
    pub id: String,
    pub from: TimeSlot,
    pub to: TimeSlot,
}

impl Reschedule {
    /// Update body for the move: only the two timestamps.
    pub fn patch(&self) -> AppointmentPatch {
        AppointmentPatch::reschedule(self.to)
    }
}

fn current_slot(appt: &Appointment) -> Result<TimeSlot, ScheduleError> {
    appt.slot().ok_or_else(|| {
        ScheduleError::validation("time", format!("Appointment {} has no valid time window", appt.id))
    })
}

fn plan(appt: &Appointment, date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<Reschedule, ScheduleError> {
    let from = current_slot(appt)?;
    let start = from_local(date, time, tz)?;
    let to = TimeSlot::starting_at(start, from.duration())?;
    Ok(Reschedule {
        id: appt.id.clone(),
        from,
        to,
    })
}

/// Drop onto an hour row of the day/week view.
///
/// The new start is `target_date` at `target_hour` with the appointment's
/// original local minute; seconds are cleared.
pub fn plan_hour_drop(
    appt: &Appointment,
    target_date: NaiveDate,
    target_hour: u32,
    tz: Tz,
) -> Result<Reschedule, ScheduleError> {
    let from = current_slot(appt)?;
    let minute = to_local(from.start(), tz).minute();
    let time = NaiveTime::from_hms_opt(target_hour, minute, 0)
        .ok_or(TimeError::HourOutOfRange(target_hour))?;
    plan(appt, target_date, time, tz)
}

/// Drop onto a month-view day: same local time of day, new date.
pub fn plan_day_drop(
    appt: &Appointment,
    target_date: NaiveDate,
    tz: Tz,
) -> Result<Reschedule, ScheduleError> {
    let from = current_slot(appt)?;
    let local = to_local(from.start(), tz);
    let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)
        .ok_or(TimeError::HourOutOfRange(local.hour()))?;
    plan(appt, target_date, time, tz)
}
