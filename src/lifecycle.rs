//! Event approval and registration state machines.
//!
//! Both are small enough to be plain functions over the status enums. Handlers
//! call these before writing, so the rules are testable without a database.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::app_state::CurrentUser;
use crate::error::{Error, Result};
use crate::models::{Event, EventStatus, RegistrationStatus};

/// Who is editing an event. An admin editing their own event counts as an
/// admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editor {
    Creator,
    Admin,
}

impl Editor {
    /// Callers must already have checked that the user may edit the event.
    pub fn of(user: &CurrentUser) -> Editor {
        if user.role.is_admin() {
            Editor::Admin
        } else {
            Editor::Creator
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Edit(Editor),
    Review(ReviewDecision),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTransition {
    pub next: EventStatus,
    pub notify_creator: bool,
}

/// Status of an event after an action is applied to it.
pub fn event_transition(current: EventStatus, action: EventAction) -> EventTransition {
    use EventAction::*;
    use EventStatus::*;

    let (next, notify_creator) = match (current, action) {
        // Edits by the creator to live events need a fresh review.
        (Published, Edit(Editor::Creator)) => (PendingApproval, false),
        (status, Edit(_)) => (status, false),
        (_, Review(ReviewDecision::Approve)) => (Published, true),
        (_, Review(ReviewDecision::Reject)) => (Rejected, true),
    };
    EventTransition {
        next,
        notify_creator,
    }
}

/// Message sent to an event's creator after review.
pub fn review_notice(decision: ReviewDecision, event_title: &str) -> String {
    match decision {
        ReviewDecision::Approve => {
            format!("Your event \"{event_title}\" has been approved and is now public.")
        }
        ReviewDecision::Reject => {
            format!("Your event \"{event_title}\" was not approved.")
        }
    }
}

/// Checks whether a registration may move to `status` for an event ending at
/// `event_end`.
pub fn check_registration_update(
    status: RegistrationStatus,
    event_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    if status == RegistrationStatus::Completed && event_end > now {
        return Err(Error::AppError(
            "A registration can't be marked completed before the event has ended.".to_string(),
        ));
    }
    Ok(())
}

/// Message for the volunteer when their registration changes, if any.
pub fn registration_notice(status: RegistrationStatus, event_title: &str) -> Option<String> {
    match status {
        RegistrationStatus::Approved => Some(format!(
            "Congratulations! You have been approved to join \"{event_title}\"."
        )),
        RegistrationStatus::Rejected => Some(format!(
            "Sorry, your registration for \"{event_title}\" was declined."
        )),
        RegistrationStatus::Completed => Some(format!(
            "You completed \"{event_title}\". Thank you for your contribution!"
        )),
        RegistrationStatus::Pending => None,
    }
}

/// Checks whether a volunteer may sign up for an event that already has
/// `active_registrations` non-rejected sign-ups. Checked in order: unpublished
/// (404), ended (400), already registered (409), full (400).
pub fn check_can_register(
    event: &Event,
    already_registered: bool,
    active_registrations: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    if !event.status.is_published() {
        return Err(Error::not_found("Event"));
    }
    if event.has_ended(now) {
        return Err(Error::AppError("This event has already ended.".to_string()));
    }
    if already_registered {
        return Err(Error::Conflict(
            "You have already registered for this event.".to_string(),
        ));
    }
    if active_registrations >= i64::from(event.max_attendees) {
        return Err(Error::AppError("This event is full.".to_string()));
    }
    Ok(())
}

/// Volunteers may withdraw a pending or approved registration. Rejected and
/// completed ones stay, so a rejection can't be undone by signing up again.
pub fn check_can_cancel(status: RegistrationStatus) -> Result<()> {
    match status {
        RegistrationStatus::Pending | RegistrationStatus::Approved => Ok(()),
        RegistrationStatus::Rejected => Err(Error::AppError(
            "Rejected registrations can't be cancelled.".to_string(),
        )),
        RegistrationStatus::Completed => Err(Error::AppError(
            "Completed registrations can't be cancelled.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::models::{EventCategory, Role};
    use crate::permissions::tests::user_with;

    fn event(status: EventStatus, end: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::nil(),
            creator_id: Uuid::nil(),
            title: "Tree planting".to_string(),
            description: "Plant trees in the park".to_string(),
            location: "Hanoi".to_string(),
            start_date_time: end - Duration::hours(3),
            end_date_time: end,
            max_attendees: 2,
            category: EventCategory::Environment,
            status,
            created_at: end - Duration::days(7),
            updated_at: end - Duration::days(7),
        }
    }

    #[test]
    fn creator_edit_of_published_event_needs_review() {
        let transition = event_transition(
            EventStatus::Published,
            EventAction::Edit(Editor::Creator),
        );
        assert_eq!(transition.next, EventStatus::PendingApproval);
        assert!(!transition.notify_creator);
    }

    #[test]
    fn admin_edit_keeps_status() {
        for status in EventStatus::ALL {
            let transition = event_transition(*status, EventAction::Edit(Editor::Admin));
            assert_eq!(transition.next, *status);
        }
    }

    #[test]
    fn creator_edit_of_unpublished_event_keeps_status() {
        for status in [EventStatus::PendingApproval, EventStatus::Rejected] {
            let transition = event_transition(status, EventAction::Edit(Editor::Creator));
            assert_eq!(transition.next, status);
        }
    }

    #[test]
    fn reviews_notify_creator() {
        let approve = event_transition(
            EventStatus::PendingApproval,
            EventAction::Review(ReviewDecision::Approve),
        );
        assert_eq!(approve.next, EventStatus::Published);
        assert!(approve.notify_creator);

        let reject = event_transition(
            EventStatus::Published,
            EventAction::Review(ReviewDecision::Reject),
        );
        assert_eq!(reject.next, EventStatus::Rejected);
        assert!(reject.notify_creator);
    }

    #[test]
    fn editor_classification() {
        let manager = user_with(Role::EventManager);
        let admin = user_with(Role::Admin);
        assert_eq!(Editor::of(&manager), Editor::Creator);
        assert_eq!(Editor::of(&admin), Editor::Admin);
    }

    #[test]
    fn completion_waits_for_event_end() {
        let now = Utc::now();
        assert!(matches!(
            check_registration_update(RegistrationStatus::Completed, now + Duration::minutes(1), now),
            Err(Error::AppError(_))
        ));
        assert!(check_registration_update(RegistrationStatus::Completed, now, now).is_ok());
        assert!(check_registration_update(
            RegistrationStatus::Approved,
            now + Duration::days(1),
            now
        )
        .is_ok());
    }

    #[test]
    fn notices() {
        assert!(registration_notice(RegistrationStatus::Pending, "x").is_none());
        assert!(registration_notice(RegistrationStatus::Approved, "Tree planting")
            .unwrap()
            .contains("\"Tree planting\""));
        assert!(review_notice(ReviewDecision::Reject, "x").contains("not approved"));
    }

    #[test]
    fn registration_rules() {
        let now = Utc::now();
        let open = event(EventStatus::Published, now + Duration::days(2));
        assert!(check_can_register(&open, false, 0, now).is_ok());
        assert!(matches!(
            check_can_register(&open, false, 2, now),
            Err(Error::AppError(_))
        ));
        // Already registered wins over full, but not over ended.
        assert!(matches!(
            check_can_register(&open, true, 2, now),
            Err(Error::Conflict(_))
        ));

        let pending = event(EventStatus::PendingApproval, now + Duration::days(2));
        assert!(matches!(
            check_can_register(&pending, false, 0, now),
            Err(Error::NotFound(_))
        ));

        let over = event(EventStatus::Published, now - Duration::hours(1));
        assert!(matches!(
            check_can_register(&over, true, 0, now),
            Err(Error::AppError(_))
        ));

        assert!(check_can_cancel(RegistrationStatus::Pending).is_ok());
        assert!(check_can_cancel(RegistrationStatus::Approved).is_ok());
        assert!(check_can_cancel(RegistrationStatus::Rejected).is_err());
        assert!(check_can_cancel(RegistrationStatus::Completed).is_err());
    }
}
