mod edit;
mod manage;
mod new;
mod signup;
mod view;

use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    // `/new` must come before the `/{event_id}` routes.
    let scope = new::add_routes(scope);
    let scope = edit::add_routes(scope);
    let scope = signup::add_routes(scope);
    let scope = manage::add_routes(scope);
    view::add_routes(scope)
}

/// Form page shared by event creation and editing.
#[derive(Template)]
#[template(path = "events/form.html")]
struct EventFormTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    heading: &'a str,
    action: &'a str,
    event: Option<&'a Event>,
    /// Shown when saving will send a published event back for review.
    needs_review_warning: bool,
}

impl<'a> EventFormTemplate<'a> {
    fn categories(&self) -> &'static [EventCategory] {
        EventCategory::ALL
    }

    fn is_category(&self, category: &EventCategory) -> bool {
        self.event.is_some_and(|event| event.category == *category)
    }
}

/// Look up an event, or fail with 404.
async fn fetch_event<'c, E: sqlx::Executor<'c, Database = sqlx::Postgres>>(
    db: E,
    event_id: Uuid,
) -> Result<Event> {
    sqlx::query_as("select * from event where id = $1")
        .bind(event_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch event")?
        .ok_or_else(|| Error::not_found("Event"))
}

/// Same as [`fetch_event`], but locks the row for the rest of the
/// transaction.
async fn fetch_event_for_update<'c, E: sqlx::Executor<'c, Database = sqlx::Postgres>>(
    db: E,
    event_id: Uuid,
) -> Result<Event> {
    sqlx::query_as("select * from event where id = $1 for update")
        .bind(event_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch event")?
        .ok_or_else(|| Error::not_found("Event"))
}

fn event_url(event_id: Uuid) -> String {
    format!("/events/{event_id}")
}
