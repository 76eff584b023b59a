use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::booking::{
    Birthday, BirthdayInput, BookingForm, BookingRequest, BookingType, Contact, Party, MAX_ADULTS,
    MAX_KIDS, MIN_ADULTS, MIN_KIDS,
};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex pattern")
});

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("Invalid phone regex pattern"));

/// Inclusive range of dates the event runs on. Open ends are unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl EventWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Suffixes such as `@gmail.com`, matched case-insensitively.
    pub allowed_email_domains: Vec<String>,
    pub email_domain_message: String,
    /// Selectable exit slots (`HH:MM`). Empty accepts any well-formed time.
    pub exit_times: Vec<String>,
    pub event_window: EventWindow,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            allowed_email_domains: vec![
                "@gmail.com".to_string(),
                "@yahoo.com".to_string(),
                "@hotmail.com".to_string(),
            ],
            email_domain_message: "Please use a Gmail, Yahoo, or Hotmail email address.".to_string(),
            exit_times: ["16:00", "17:00", "18:00", "19:00", "20:00"]
                .iter()
                .map(|slot| slot.to_string())
                .collect(),
            event_window: EventWindow::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Checks every field of the form and builds the typed booking.
///
/// All failing fields are reported, one message per field. `today` is the
/// visitor's local date; the visit must be strictly after it.
pub fn validate(
    form: &BookingForm,
    today: NaiveDate,
    rules: &ValidationRules,
) -> Result<BookingRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    if form.name.chars().count() < 2 {
        errors.push(FieldError::new("name", "Name must be at least 2 characters."));
    }

    if let Some(message) = check_email(form.email.expose(), rules) {
        errors.push(FieldError::new("email", message));
    }

    if !PHONE_PATTERN.is_match(form.phone.expose()) {
        errors.push(FieldError::new("phone", "Phone number must be exactly 10 digits"));
    }

    let visit_date = match parse_visit_date(&form.visit_date) {
        None => {
            errors.push(FieldError::new("visitDate", "Visit date is required"));
            None
        }
        Some(date) if date <= today => {
            errors.push(FieldError::new(
                "visitDate",
                "Visit date must be at least one day after today.",
            ));
            None
        }
        Some(date) if !rules.event_window.contains(date) => {
            errors.push(FieldError::new(
                "visitDate",
                "Visit date must fall within the event dates.",
            ));
            None
        }
        Some(date) => Some(date),
    };

    let party = match BookingType::parse(&form.booking_type) {
        None => {
            errors.push(FieldError::new("bookingType", "Please select a booking type."));
            None
        }
        Some(booking_type) => check_party(booking_type, form, &mut errors),
    };

    if form.exit_time.trim().is_empty() {
        errors.push(FieldError::new("exitTime", "Exit time is required"));
    } else if !exit_time_allowed(&form.exit_time, rules) {
        errors.push(FieldError::new("exitTime", "Please select a valid exit time"));
    }

    let birthday = match form.birthday.as_ref().map(check_birthday) {
        Some(Err(message)) => {
            errors.push(FieldError::new("birthday", message));
            None
        }
        Some(Ok(birthday)) => birthday,
        None => None,
    };

    match (errors.is_empty(), party, visit_date) {
        (true, Some(party), Some(visit_date)) => Ok(BookingRequest {
            contact: Contact {
                name: form.name.clone(),
                email: form.email.clone(),
                phone: form.phone.clone(),
            },
            party,
            food: form.resolved_food(),
            package: form.resolved_package(),
            exit_time: form.exit_time.clone(),
            visit_date,
            birthday,
        }),
        _ => Err(errors),
    }
}

fn check_email(email: &str, rules: &ValidationRules) -> Option<String> {
    if !EMAIL_PATTERN.is_match(email) {
        return Some("Please enter a valid email address.".to_string());
    }

    let lowered = email.to_lowercase();
    let allowed = rules
        .allowed_email_domains
        .iter()
        .any(|domain| lowered.ends_with(&domain.to_lowercase()));

    if allowed {
        None
    } else {
        Some(rules.email_domain_message.clone())
    }
}

/// Accepts a calendar date (`2025-06-21`) or a full RFC 3339 timestamp.
pub fn parse_visit_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Local).date_naive())
    })
}

fn check_party(
    booking_type: BookingType,
    form: &BookingForm,
    errors: &mut Vec<FieldError>,
) -> Option<Party> {
    // Individual counts are fixed, whatever the disabled inputs held.
    if booking_type == BookingType::Individual {
        return Some(Party::Individual);
    }

    let mut valid = true;

    if form.adults_count < MIN_ADULTS {
        errors.push(FieldError::new("adultsCount", "At least 1 adult is required"));
        valid = false;
    } else if form.adults_count > MAX_ADULTS {
        errors.push(FieldError::new("adultsCount", "Maximum 50 adults allowed"));
        valid = false;
    }

    if form.kids_count < MIN_KIDS {
        errors.push(FieldError::new("kidsCount", "Cannot be negative"));
        valid = false;
    } else if form.kids_count > MAX_KIDS {
        errors.push(FieldError::new("kidsCount", "Maximum 100 kids allowed"));
        valid = false;
    }

    if !valid {
        return None;
    }

    let adults = form.adults_count as u32;
    let kids = form.kids_count as u32;

    Some(match booking_type {
        BookingType::School => Party::School { adults, kids },
        _ => Party::Group { adults, kids },
    })
}

fn exit_time_allowed(exit_time: &str, rules: &ValidationRules) -> bool {
    if NaiveTime::parse_from_str(exit_time, "%H:%M").is_err() {
        return false;
    }
    rules.exit_times.is_empty() || rules.exit_times.iter().any(|slot| slot == exit_time)
}

fn check_birthday(input: &BirthdayInput) -> Result<Option<Birthday>, &'static str> {
    const MESSAGE: &str = "Please select both month and day.";

    match (input.month, input.day) {
        (None, None) => Ok(None),
        (Some(month), Some(day)) if (1..=12).contains(&month) && (1..=31).contains(&day) => {
            Ok(Some(Birthday {
                month: month as u8,
                day: day as u8,
            }))
        }
        _ => Err(MESSAGE),
    }
}
