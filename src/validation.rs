use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use lazy_regex::regex_is_match;
use serde::Deserialize;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::{EventCategory, INPUT_FORMAT};

/// Reset tokens are 32 random bytes, hex encoded.
pub fn reset_token(token: &str) -> bool {
    regex_is_match!(r"^[0-9a-f]{64}$", token)
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Empty form fields become `None`.
pub fn optional_text(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Parses the value of a `datetime-local` input. The site works in UTC.
pub fn datetime_local(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| Error::AppError(format!("{field} is not a valid date and time.")))
}

/// Form fields shared by event creation and editing.
#[derive(Debug, Deserialize, Validate)]
pub struct EventForm {
    #[validate(length(min = 3, max = 200, message = "Title must be at least 3 characters"))]
    pub title: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    #[validate(length(min = 3, max = 200, message = "Location must be at least 3 characters"))]
    pub location: String,
    pub start_date_time: String,
    pub end_date_time: String,
    #[validate(range(min = 1, message = "Number of attendees must be positive"))]
    pub max_attendees: i32,
    pub category: EventCategory,
}

/// An event form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub max_attendees: i32,
    pub category: EventCategory,
}

impl EventForm {
    /// Validates fields and the time window. New events must start in the
    /// future; existing ones may be edited after they began.
    pub fn into_input(mut self, now: DateTime<Utc>, is_new: bool) -> Result<EventInput> {
        // Length limits apply to what gets stored.
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.location = self.location.trim().to_string();
        self.validate()?;
        let start_date_time = datetime_local("Start time", &self.start_date_time)?;
        let end_date_time = datetime_local("End time", &self.end_date_time)?;
        if end_date_time <= start_date_time {
            return Err(Error::AppError(
                "The event must end after it starts.".to_string(),
            ));
        }
        if is_new && start_date_time <= now {
            return Err(Error::AppError(
                "The event must start in the future.".to_string(),
            ));
        }
        Ok(EventInput {
            title: self.title,
            description: self.description,
            location: self.location,
            start_date_time,
            end_date_time,
            max_attendees: self.max_attendees,
            category: self.category,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn form() -> EventForm {
        EventForm {
            title: "River cleanup".to_string(),
            description: "Collect plastic from the riverbank".to_string(),
            location: "Hue".to_string(),
            start_date_time: "2030-05-01T08:00".to_string(),
            end_date_time: "2030-05-01T11:30".to_string(),
            max_attendees: 15,
            category: EventCategory::Environment,
        }
    }

    #[test]
    fn valid_event_form() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let input = form().into_input(now, true).unwrap();
        assert_eq!(
            input.start_date_time,
            Utc.with_ymd_and_hms(2030, 5, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(input.end_date_time - input.start_date_time, Duration::minutes(210));
    }

    #[test]
    fn short_fields_are_rejected() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut short = form();
        short.description = "too short".to_string();
        assert!(matches!(
            short.into_input(now, true),
            Err(Error::ValidationError(_))
        ));

        let mut empty = form();
        empty.max_attendees = 0;
        assert!(matches!(
            empty.into_input(now, true),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn padding_does_not_count_towards_lengths() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut padded = form();
        padded.title = "  ab  ".to_string();
        assert!(matches!(
            padded.into_input(now, true),
            Err(Error::ValidationError(_))
        ));

        let mut blank = form();
        blank.description = " ".repeat(12);
        assert!(blank.into_input(now, true).is_err());

        let mut short_location = form();
        short_location.location = " x  ".to_string();
        assert!(short_location.into_input(now, true).is_err());

        let mut spaced = form();
        spaced.title = "  River cleanup ".to_string();
        let input = spaced.into_input(now, true).unwrap();
        assert_eq!(input.title, "River cleanup");
    }

    #[test]
    fn time_window_rules() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let mut backwards = form();
        backwards.end_date_time = "2030-05-01T07:00".to_string();
        assert!(matches!(
            backwards.into_input(now, true),
            Err(Error::AppError(_))
        ));

        let later = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        assert!(form().into_input(later, true).is_err());
        // Editing a past event is still allowed.
        assert!(form().into_input(later, false).is_ok());
    }

    #[test]
    fn datetime_formats() {
        assert!(datetime_local("Start", "2030-05-01T08:00:30").is_ok());
        assert!(datetime_local("Start", "01/05/2030 08:00").is_err());
    }

    #[test]
    fn small_helpers() {
        assert!(reset_token(&"0f".repeat(32)));
        assert!(!reset_token(&"0F".repeat(32)));
        assert_eq!(normalize_email(" Ana@Example.COM "), "ana@example.com");
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(optional_text(Some(" Ana ".to_string())), Some("Ana".to_string()));
    }
}
