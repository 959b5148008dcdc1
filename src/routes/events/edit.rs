use super::{event_url, fetch_event, fetch_event_for_update, EventFormTemplate};
use crate::lifecycle::{Editor, EventAction};
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope
        .service(edit_event_form)
        .service(edit_event_submit)
        .service(delete_event)
}

#[get("/{event_id}/edit")]
async fn edit_event_form(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;

    let event = fetch_event(&app_state.db_pool, event_id).await?;
    permissions::require_manage(&user, event.creator_id)?;

    let action = format!("/events/{event_id}/edit");
    let transition =
        lifecycle::event_transition(event.status, EventAction::Edit(Editor::of(&user)));
    Ok(EventFormTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        heading: "Edit event",
        action: &action,
        event: Some(&event),
        needs_review_warning: transition.next != event.status,
    }
    .to_response())
}

#[post("/{event_id}/edit")]
async fn edit_event_submit(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    form: web::Form<validation::EventForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    let input = form.into_inner().into_input(Utc::now(), false)?;

    let mut transaction = app_state
        .db_pool
        .begin()
        .await
        .context("Failed to create transaction")?;

    let event = fetch_event_for_update(&mut *transaction, event_id).await?;
    permissions::require_manage(&user, event.creator_id)?;
    let transition =
        lifecycle::event_transition(event.status, EventAction::Edit(Editor::of(&user)));

    sqlx::query(
        r#"
        update event
        set title = $1, description = $2, location = $3,
            start_date_time = $4, end_date_time = $5, max_attendees = $6,
            category = $7, status = $8, updated_at = now()
        where id = $9
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.location)
    .bind(input.start_date_time)
    .bind(input.end_date_time)
    .bind(input.max_attendees)
    .bind(input.category)
    .bind(transition.next)
    .bind(event_id)
    .execute(&mut *transaction)
    .await
    .context("Failed to update event")?;

    transaction.commit().await.context("Failed to commit")?;
    if transition.next != event.status {
        info!(
            "Event {event_id} edited by {}; status {} -> {}",
            user.id,
            event.status.as_str(),
            transition.next.as_str()
        );
    } else {
        info!("Event {event_id} edited by {}", user.id);
    }

    Ok(see_other(event_url(event_id)))
}

#[post("/{event_id}/delete")]
async fn delete_event(
    app_state: web::Data<AppState>,
    path: web::Path<(Uuid,)>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let (event_id,) = path.into_inner();
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;

    let event = fetch_event(&app_state.db_pool, event_id).await?;
    permissions::require_manage(&user, event.creator_id)?;

    sqlx::query("delete from event where id = $1")
        .bind(event_id)
        .execute(&app_state.db_pool)
        .await
        .context("Failed to delete event")?;
    info!("Event {event_id} deleted by {}", user.id);

    Ok(MessagePageTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        page_title: &Some("Event deleted"),
        message: format!("\"{}\" has been deleted.", event.title).as_str(),
    }
    .to_response())
}
