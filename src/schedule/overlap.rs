//! Booking availability: can a window be taken without colliding?

use crate::error::ScheduleError;
use crate::models::Appointment;

use super::interval::TimeSlot;

/// Appointments whose window overlaps `candidate`.
///
/// `exclude_id` removes the record being edited so it never conflicts with
/// itself. Records with unparseable or empty windows cannot collide and are
/// skipped.
pub fn find_conflicts<'a>(
    candidate: &TimeSlot,
    appointments: &'a [Appointment],
    exclude_id: Option<&str>,
) -> Vec<&'a Appointment> {
    appointments
        .iter()
        .filter(|a| exclude_id != Some(a.id.as_str()))
        .filter(|a| a.slot().is_some_and(|slot| slot.overlaps(candidate)))
        .collect()
}

pub fn is_slot_available(
    candidate: &TimeSlot,
    appointments: &[Appointment],
    exclude_id: Option<&str>,
) -> bool {
    find_conflicts(candidate, appointments, exclude_id).is_empty()
}

/// Local pre-check run before any create/update request.
pub fn ensure_available(
    candidate: &TimeSlot,
    appointments: &[Appointment],
    exclude_id: Option<&str>,
) -> Result<(), ScheduleError> {
    let conflicts = find_conflicts(candidate, appointments, exclude_id);
    if conflicts.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = conflicts.iter().map(|a| a.id.clone()).collect();
    tracing::debug!(
        start = %candidate.start(),
        end = %candidate.end(),
        conflicts = ?ids,
        "Slot rejected by local overlap check"
    );
    Err(ScheduleError::local_conflict(ids))
}
