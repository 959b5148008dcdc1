use super::notifications;
use crate::lifecycle::{EventAction, ReviewDecision};
use crate::routes::prelude::*;

/// Add admin-only routes. Every handler checks the admin role itself.
pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope
        .service(pending_events)
        .service(review_event)
        .service(list_users)
        .service(update_user)
}

#[derive(Template)]
#[template(path = "admin/events.html")]
struct PendingEventsTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    events: &'a Vec<EventListing>,
}

/// Events waiting for approval, oldest first.
#[get("/events")]
async fn pending_events(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_admin(&user)?;

    let events: Vec<EventListing> = sqlx::query_as(
        r#"
        select event.*, account.name as creator_name
        from event
          join account on account.id = event.creator_id
        where event.status = 'PENDING_APPROVAL'
        order by event.created_at asc
        "#,
    )
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch pending events")?;

    Ok(PendingEventsTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        events: &events,
    }
    .to_response())
}

#[derive(Debug, Deserialize)]
struct ReviewForm {
    decision: ReviewDecision,
}

#[post("/events/{event_id}/review")]
async fn review_event(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    form: web::Form<ReviewForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_admin(&user)?;
    let decision = form.into_inner().decision;

    let mut transaction = app_state
        .db_pool
        .begin()
        .await
        .context("Failed to create transaction")?;

    let (creator_id, title, status): (Uuid, String, EventStatus) = sqlx::query_as(
        r#"
        select creator_id, title, status
        from event
        where id = $1
        for update
        "#,
    )
    .bind(event_id)
    .fetch_optional(&mut *transaction)
    .await
    .context("Failed to fetch event")?
    .ok_or_else(|| Error::not_found("Event"))?;

    let transition = lifecycle::event_transition(status, EventAction::Review(decision));
    sqlx::query("update event set status = $1 where id = $2")
        .bind(transition.next)
        .bind(event_id)
        .execute(&mut *transaction)
        .await
        .context("Failed to update event status")?;

    if transition.notify_creator {
        let href = format!("/events/{event_id}");
        notifications::create(
            &mut *transaction,
            app_state.new_id(),
            creator_id,
            &lifecycle::review_notice(decision, &title),
            Some(&href),
        )
        .await
        .context("Failed to notify event creator")?;
    }

    transaction.commit().await.context("Failed to commit")?;
    info!(
        "Event {event_id} reviewed by {}: {} -> {}",
        user.id,
        status.as_str(),
        transition.next.as_str()
    );

    Ok(see_other("/admin/events".to_string()))
}

#[derive(Template)]
#[template(path = "admin/users.html")]
struct UsersTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    users: &'a Vec<Account>,
}

impl<'a> UsersTemplate<'a> {
    fn roles(&self) -> &'static [Role] {
        Role::ALL
    }

    fn is_self(&self, account: &Account) -> bool {
        self.current_user
            .as_ref()
            .is_some_and(|user| user.id == account.id)
    }
}

#[get("/users")]
async fn list_users(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_admin(&user)?;

    let users: Vec<Account> = sqlx::query_as(
        r#"
        select id, email, name, role, status, created_at
        from account
        order by created_at desc
        "#,
    )
    .fetch_all(&app_state.db_pool)
    .await
    .context("Failed to fetch users")?;

    Ok(UsersTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        users: &users,
    }
    .to_response())
}

#[derive(Debug, Deserialize)]
struct UpdateUserForm {
    role: Option<Role>,
    status: Option<AccountStatus>,
}

/// Change an account's role or lock/unlock it.
#[post("/users/{user_id}")]
async fn update_user(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    form: web::Form<UpdateUserForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (user_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_admin(&user)?;
    let UpdateUserForm { role, status } = form.into_inner();
    permissions::check_account_update(&user, user_id, role, status)?;

    let updated = sqlx::query(
        r#"
        update account
        set role = coalesce($1, role), status = coalesce($2, status)
        where id = $3
        "#,
    )
    .bind(role)
    .bind(status)
    .bind(user_id)
    .execute(&app_state.db_pool)
    .await
    .context("Failed to update user")?
    .rows_affected();
    if updated == 0 {
        return Err(Error::not_found("User"));
    }
    info!(
        "Account {user_id} updated by {}: role={:?} status={:?}",
        user.id, role, status
    );

    Ok(see_other("/admin/users".to_string()))
}
