use super::notifications;
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(update_registration)
}

#[derive(Debug, Deserialize)]
struct UpdateRegistrationForm {
    status: RegistrationStatus,
}

/// Registration joined with the event fields needed to authorize and apply a
/// status change.
#[derive(sqlx::FromRow)]
struct RegistrationContext {
    user_id: Uuid,
    event_id: Uuid,
    status: RegistrationStatus,
    creator_id: Uuid,
    title: String,
    end_date_time: chrono::DateTime<Utc>,
}

/// Approve, reject, complete, or reset a registration. Only the event's
/// creator or an admin may do this.
#[post("/{registration_id}")]
async fn update_registration(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    form: web::Form<UpdateRegistrationForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (registration_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    let new_status = form.into_inner().status;

    let mut transaction = app_state
        .db_pool
        .begin()
        .await
        .context("Failed to create transaction")?;

    let registration: RegistrationContext = sqlx::query_as(
        r#"
        select
          registration.user_id, registration.event_id, registration.status,
          event.creator_id, event.title, event.end_date_time
        from registration
          join event on event.id = registration.event_id
        where registration.id = $1
        for update of registration
        "#,
    )
    .bind(registration_id)
    .fetch_optional(&mut *transaction)
    .await
    .context("Failed to fetch registration")?
    .ok_or_else(|| Error::not_found("Registration"))?;

    permissions::require_manage(&user, registration.creator_id)?;
    lifecycle::check_registration_update(new_status, registration.end_date_time, Utc::now())?;

    sqlx::query("update registration set status = $1 where id = $2")
        .bind(new_status)
        .bind(registration_id)
        .execute(&mut *transaction)
        .await
        .context("Failed to update registration")?;

    if let Some(message) = lifecycle::registration_notice(new_status, &registration.title) {
        let href = format!("/events/{}", registration.event_id);
        notifications::create(
            &mut *transaction,
            app_state.new_id(),
            registration.user_id,
            &message,
            Some(&href),
        )
        .await
        .context("Failed to notify volunteer")?;
    }

    transaction.commit().await.context("Failed to commit")?;
    info!(
        "Registration {registration_id} {} -> {} by {}",
        registration.status.as_str(),
        new_status.as_str(),
        user.id
    );

    Ok(see_other(format!("/events/{}/manage", registration.event_id)))
}
