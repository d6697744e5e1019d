//! Scheduling core: calendar grid, overlap checks, drag-reschedule.
//!
//! Everything here is a pure function of its inputs. Network access and
//! mutable state live in `crate::state` and `crate::service`.

pub mod agenda;
pub mod form;
pub mod grid;
pub mod interval;
pub mod overlap;
pub mod reschedule;
pub mod time;

pub use agenda::{day_agenda, filter_agenda};
pub use form::{BookingForm, ProfileForm, RegistrationForm};
pub use grid::{
    block_layout, bucket, fetch_range, navigate, visible_dates, BlockLayout, DateRange, DayCell,
    GridOptions, HourCell, NavDirection, ScheduleGrid,
};
pub use interval::{intervals_overlap, TimeSlot};
pub use overlap::{ensure_available, find_conflicts, is_slot_available};
pub use reschedule::{plan_day_drop, plan_hour_drop, Reschedule};
