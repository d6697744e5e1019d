//! Form input → validated request bodies.
//!
//! Validation collects every failing field instead of stopping at the first,
//! so the UI can mark them all at once. Nothing here reaches the network.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use regex::Regex;

use super::interval::TimeSlot;
use super::time::{format_wire, from_local};
use crate::error::{FieldError, ScheduleError};
use crate::models::{AccountUpdate, AppointmentDraft, AppointmentExtra, UserRegister};

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_CHARS: usize = 9;
const MIN_TITLE_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn require_min(errors: &mut Vec<FieldError>, field: &str, value: &str, min: usize, label: &str) {
    if char_len(value) < min {
        errors.push(FieldError::new(
            field,
            format!("{label} must be at least {min} characters"),
        ));
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), ScheduleError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ScheduleError::Validation(errors))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Booking
// ═══════════════════════════════════════════════════════════════════════════

/// The create/edit appointment form. Times are local to the display zone.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingForm {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub title: String,
    pub description: String,
    pub extra: AppointmentExtra,
}

impl BookingForm {
    /// Empty form pre-filled with a date and hour, as opened from a grid click.
    pub fn at(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            date,
            start,
            end,
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            title: String::new(),
            description: String::new(),
            extra: AppointmentExtra::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut errors = Vec::new();
        require_min(&mut errors, "name", &self.first_name, MIN_NAME_CHARS, "First name");
        require_min(&mut errors, "lastname", &self.last_name, MIN_NAME_CHARS, "Last name");
        if char_len(&self.phone) < MIN_PHONE_CHARS {
            errors.push(FieldError::new(
                "telephone",
                format!("Phone number must be at least {MIN_PHONE_CHARS} characters"),
            ));
        }
        require_min(&mut errors, "title", &self.title, MIN_TITLE_CHARS, "Title");
        if self.start >= self.end {
            errors.push(FieldError::new("time_to", "End time must be after start time"));
        }
        finish(errors)
    }

    /// The booked window in UTC.
    pub fn slot(&self, tz: Tz) -> Result<TimeSlot, ScheduleError> {
        let start = from_local(self.date, self.start, tz)?;
        let end = from_local(self.date, self.end, tz)?;
        Ok(TimeSlot::new(start, end)?)
    }

    /// Validate and build the request body.
    pub fn to_draft(&self, tz: Tz) -> Result<AppointmentDraft, ScheduleError> {
        self.validate()?;
        let slot = self.slot(tz)?;
        Ok(AppointmentDraft {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            start_time: format_wire(slot.start()),
            end_time: format_wire(slot.end()),
            created_at: None,
            extra: self.extra.clone(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq)]
pub struct RegistrationForm {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("lastname", &self.lastname)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut errors = Vec::new();
        require_min(&mut errors, "name", &self.name, MIN_NAME_CHARS, "First name");
        require_min(&mut errors, "lastname", &self.lastname, MIN_NAME_CHARS, "Last name");
        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid e-mail address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.push(FieldError::new(
                "password",
                format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }
        if self.password != self.confirm_password {
            errors.push(FieldError::new("confirm_password", "Passwords do not match"));
        }
        finish(errors)
    }

    pub fn into_request(self) -> Result<UserRegister, ScheduleError> {
        self.validate()?;
        Ok(UserRegister {
            name: self.name.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Profile settings
// ═══════════════════════════════════════════════════════════════════════════

/// Settings page: display name and e-mail of the logged-in account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut errors = Vec::new();
        require_min(&mut errors, "name", &self.name, MIN_NAME_CHARS, "Name");
        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid e-mail address"));
        }
        finish(errors)
    }

    pub fn into_request(self) -> Result<AccountUpdate, ScheduleError> {
        self.validate()?;
        Ok(AccountUpdate {
            name: Some(self.name.trim().to_string()),
            email: Some(self.email.trim().to_string()),
            ..Default::default()
        })
    }
}
