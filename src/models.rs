use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display format for dates in pages.
const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";
/// Format accepted and produced by `<input type="datetime-local">`.
pub const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Declares a Postgres enum type that is also usable in forms, query strings
/// and templates.
macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $type_name:literal {
            $($(#[$vmeta:meta])* $variant:ident => ($raw:literal, $label:literal),)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, sqlx::Type)]
        #[sqlx(type_name = $type_name, rename_all = "SCREAMING_SNAKE_CASE")]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Value used in the database and in form fields.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $raw,)+
                }
            }

            /// Human readable name.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($raw => Ok($name::$variant),)+
                    _ => Err(format!("unknown {} \"{}\"", stringify!($name), s)),
                }
            }
        }
    };
}

db_enum! {
    /// Site-wide role of an account.
    Role, "user_role" {
        Volunteer => ("VOLUNTEER", "Volunteer"),
        EventManager => ("EVENT_MANAGER", "Event manager"),
        Admin => ("ADMIN", "Administrator"),
    }
}

db_enum! {
    AccountStatus, "account_status" {
        Active => ("ACTIVE", "Active"),
        /// Cannot log in; existing sessions are rejected.
        Locked => ("LOCKED", "Locked"),
    }
}

db_enum! {
    EventCategory, "event_category" {
        Environment => ("ENVIRONMENT", "Environment"),
        Education => ("EDUCATION", "Education"),
        Healthcare => ("HEALTHCARE", "Healthcare"),
        Community => ("COMMUNITY", "Community"),
    }
}

db_enum! {
    /// Approval state of an event. Only published events are listed publicly.
    EventStatus, "event_status" {
        PendingApproval => ("PENDING_APPROVAL", "Pending approval"),
        Published => ("PUBLISHED", "Published"),
        Rejected => ("REJECTED", "Rejected"),
    }
}

db_enum! {
    RegistrationStatus, "registration_status" {
        Pending => ("PENDING", "Pending"),
        Approved => ("APPROVED", "Approved"),
        Rejected => ("REJECTED", "Rejected"),
        Completed => ("COMPLETED", "Completed"),
    }
}

impl EventStatus {
    pub fn is_published(&self) -> bool {
        *self == EventStatus::Published
    }
}

/// Account as shown to admins. The password hash is never selected into this.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }

    pub fn is_locked(&self) -> bool {
        self.status == AccountStatus::Locked
    }

    pub fn joined_display(&self) -> String {
        self.created_at.format("%d/%m/%Y").to_string()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub max_attendees: i32,
    pub category: EventCategory,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_date_time <= now
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.start_date_time >= now
    }

    pub fn start_display(&self) -> String {
        self.start_date_time.format(DISPLAY_FORMAT).to_string()
    }

    pub fn end_display(&self) -> String {
        self.end_date_time.format(DISPLAY_FORMAT).to_string()
    }

    pub fn start_input(&self) -> String {
        self.start_date_time.format(INPUT_FORMAT).to_string()
    }

    pub fn end_input(&self) -> String {
        self.end_date_time.format(INPUT_FORMAT).to_string()
    }
}

/// Event joined with the name of whoever created it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventListing {
    #[sqlx(flatten)]
    pub event: Event,
    pub creator_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub href: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn created_display(&self) -> String {
        self.created_at.format(DISPLAY_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn event_at(start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::nil(),
            creator_id: Uuid::nil(),
            title: "Beach cleanup".to_string(),
            description: "Pick up litter along the shore".to_string(),
            location: "Da Nang".to_string(),
            start_date_time: start,
            end_date_time: end,
            max_attendees: 20,
            category: EventCategory::Environment,
            status: EventStatus::Published,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn enum_strings_match_database_values() {
        assert_eq!(Role::EventManager.as_str(), "EVENT_MANAGER");
        assert_eq!(
            "PENDING_APPROVAL".parse::<EventStatus>(),
            Ok(EventStatus::PendingApproval)
        );
        assert!("pending".parse::<RegistrationStatus>().is_err());
        for category in EventCategory::ALL {
            assert_eq!(category.as_str().parse::<EventCategory>(), Ok(*category));
        }
    }

    #[test]
    fn event_time_helpers() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        let event = event_at(start, end);

        assert!(event.is_upcoming(start));
        assert!(!event.has_ended(start));
        assert!(event.has_ended(end));
        assert_eq!(event.start_display(), "01/03/2025 08:00");
        assert_eq!(event.end_input(), "2025-03-01T12:30");
    }
}
