/// Code related to verifying user permissions.
use uuid::Uuid;

use crate::app_state::CurrentUser;
use crate::error::{Error, Result};
use crate::models::{AccountStatus, Event, Role};

impl Role {
    /// Event managers and administrators may create events.
    pub fn can_create_events(&self) -> bool {
        matches!(self, Role::EventManager | Role::Admin)
    }

    /// Administrators approve events and manage users.
    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

/// Whether the user may edit, delete, or manage registrations of an event
/// created by `creator_id`.
pub fn can_manage(user: &CurrentUser, creator_id: Uuid) -> bool {
    user.id == creator_id || user.role.is_admin()
}

pub fn can_manage_event(user: &CurrentUser, event: &Event) -> bool {
    can_manage(user, event.creator_id)
}

/// Whether a user may see an event that isn't published yet.
pub fn can_view_event(user: Option<&CurrentUser>, event: &Event) -> bool {
    event.status.is_published() || user.is_some_and(|user| can_manage_event(user, event))
}

pub fn require_event_creator_role(user: &CurrentUser) -> Result<()> {
    if user.role.can_create_events() {
        Ok(())
    } else {
        Err(Error::AuthorizationError(
            "Only event managers can create events.".to_string(),
        ))
    }
}

pub fn require_admin(user: &CurrentUser) -> Result<()> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(Error::AuthorizationError(
            "This page is for administrators only.".to_string(),
        ))
    }
}

pub fn require_manage(user: &CurrentUser, creator_id: Uuid) -> Result<()> {
    if can_manage(user, creator_id) {
        Ok(())
    } else {
        Err(Error::forbidden())
    }
}

/// Validates an admin's change to an account. Admins can't lock or demote
/// themselves.
pub fn check_account_update(
    admin: &CurrentUser,
    target_id: Uuid,
    role: Option<Role>,
    status: Option<AccountStatus>,
) -> Result<()> {
    if role.is_none() && status.is_none() {
        return Err(Error::AppError("Nothing to update.".to_string()));
    }
    if admin.id == target_id
        && (role.is_some_and(|role| !role.is_admin()) || status == Some(AccountStatus::Locked))
    {
        return Err(Error::AppError(
            "You can't lock or demote your own account.".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn user_with(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            name: None,
            role,
            unread_notifications: 0,
        }
    }

    #[test]
    fn roles() {
        assert!(!Role::Volunteer.can_create_events());
        assert!(Role::EventManager.can_create_events());
        assert!(Role::Admin.can_create_events());
        assert!(Role::Admin.is_admin());
        assert!(!Role::EventManager.is_admin());
    }

    #[test]
    fn only_creator_or_admin_can_manage() {
        let creator = user_with(Role::EventManager);
        let other_manager = user_with(Role::EventManager);
        let admin = user_with(Role::Admin);

        assert!(can_manage(&creator, creator.id));
        assert!(!can_manage(&other_manager, creator.id));
        assert!(can_manage(&admin, creator.id));
        assert!(matches!(
            require_manage(&other_manager, creator.id),
            Err(Error::AuthorizationError(_))
        ));
    }

    #[test]
    fn volunteers_cannot_create_or_administer() {
        let volunteer = user_with(Role::Volunteer);
        assert!(require_event_creator_role(&volunteer).is_err());
        assert!(require_admin(&volunteer).is_err());
        assert!(require_admin(&user_with(Role::Admin)).is_ok());
    }

    #[test]
    fn admins_cannot_lock_themselves_out() {
        let admin = user_with(Role::Admin);
        let other = Uuid::new_v4();

        assert!(check_account_update(&admin, other, Some(Role::Volunteer), None).is_ok());
        assert!(check_account_update(&admin, other, None, Some(AccountStatus::Locked)).is_ok());
        assert!(check_account_update(&admin, admin.id, Some(Role::EventManager), None).is_err());
        assert!(check_account_update(&admin, admin.id, None, Some(AccountStatus::Locked)).is_err());
        assert!(check_account_update(&admin, admin.id, Some(Role::Admin), None).is_ok());
        assert!(check_account_update(&admin, other, None, None).is_err());
    }
}
