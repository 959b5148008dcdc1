use super::{event_url, EventFormTemplate};
use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(create_event_form).service(create_event_submit)
}

#[get("/new")]
async fn create_event_form(
    app_state: web::Data<AppState>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_event_creator_role(&user)?;

    Ok(EventFormTemplate {
        config: &app_state.config,
        current_user: &Some(user),
        heading: "Create a new event",
        action: "/events/new",
        event: None,
        needs_review_warning: false,
    }
    .to_response())
}

#[post("/new")]
async fn create_event_submit(
    app_state: web::Data<AppState>,
    form: web::Form<validation::EventForm>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let SessionInfo { user, .. } = app_state.require_session(&request).await?;
    permissions::require_event_creator_role(&user)?;
    let input = form.into_inner().into_input(Utc::now(), true)?;

    let (event_id,): (Uuid,) = sqlx::query_as(
        r#"
        insert into event (
          id, creator_id, title, description, location,
          start_date_time, end_date_time, max_attendees, category, status
        )
        values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        returning id
        "#,
    )
    .bind(app_state.new_id())
    .bind(user.id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.location)
    .bind(input.start_date_time)
    .bind(input.end_date_time)
    .bind(input.max_attendees)
    .bind(input.category)
    .bind(EventStatus::PendingApproval)
    .fetch_one(&app_state.db_pool)
    .await
    .context("Failed to create event")?;
    info!("User {} created event {event_id}", user.id);

    Ok(see_other(event_url(event_id)))
}
