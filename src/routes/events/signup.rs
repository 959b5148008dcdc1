use super::{event_url, fetch_event_for_update};
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(register).service(cancel)
}

/// Sign the current user up for an event. The event row is locked while
/// counting, so two sign-ups can't both take the last place.
#[post("/{event_id}/register")]
async fn register(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let session_info = app_state.require_session(&request).await?;
    let user_id = session_info.account_id();

    let mut transaction = app_state
        .db_pool
        .begin()
        .await
        .context("Failed to create transaction")?;

    let event = fetch_event_for_update(&mut *transaction, event_id).await?;
    if !event.status.is_published() {
        return Err(Error::not_found("Event"));
    }

    let (already_registered, active_registrations): (bool, i64) = sqlx::query_as(
        r#"
        select
          coalesce(bool_or(user_id = $2), false),
          count(*) filter (where status <> 'REJECTED')
        from registration
        where event_id = $1
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *transaction)
    .await
    .context("Failed to count registrations")?;
    lifecycle::check_can_register(
        &event,
        already_registered,
        active_registrations,
        Utc::now(),
    )?;

    sqlx::query(
        r#"
        insert into registration (id, user_id, event_id)
        values ($1, $2, $3)
        "#,
    )
    .bind(app_state.new_id())
    .bind(user_id)
    .bind(event_id)
    .execute(&mut *transaction)
    .await
    .map_err(|err| conflict_on_unique(err, "You have already registered for this event."))?;

    transaction.commit().await.context("Failed to commit")?;
    info!("User {user_id} registered for event {event_id}");

    Ok(see_other(event_url(event_id)))
}

/// Withdraw the current user's registration.
#[post("/{event_id}/cancel")]
async fn cancel(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let session_info = app_state.require_session(&request).await?;
    let user_id = session_info.account_id();

    let (registration_id, status): (Uuid, RegistrationStatus) = sqlx::query_as(
        r#"
        select id, status
        from registration
        where event_id = $1 and user_id = $2
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(&app_state.db_pool)
    .await
    .context("Failed to fetch registration")?
    .ok_or_else(|| Error::NotFound("You are not registered for this event.".to_string()))?;
    lifecycle::check_can_cancel(status)?;

    sqlx::query("delete from registration where id = $1")
        .bind(registration_id)
        .execute(&app_state.db_pool)
        .await
        .context("Failed to cancel registration")?;
    info!("User {user_id} cancelled registration for event {event_id}");

    Ok(see_other(event_url(event_id)))
}
