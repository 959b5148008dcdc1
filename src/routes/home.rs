use crate::routes::prelude::*;

pub fn add_routes(scope: actix_web::Scope) -> actix_web::Scope {
    scope.service(index).service(stylesheet)
}

#[derive(Debug, Deserialize)]
struct EventFilters {
    category: Option<String>,
    sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortBy {
    StartDateTime,
    Title,
}

impl SortBy {
    fn parse(value: Option<&str>) -> SortBy {
        match value {
            Some("title") => SortBy::Title,
            _ => SortBy::StartDateTime,
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            SortBy::Title => "event.title asc",
            SortBy::StartDateTime => "event.start_date_time asc",
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    config: &'a AppConfig,
    current_user: &'a Option<CurrentUser>,
    events: &'a Vec<EventListing>,
    category: Option<EventCategory>,
    sort_by_title: bool,
}

impl<'a> IndexTemplate<'a> {
    fn categories(&self) -> &'static [EventCategory] {
        EventCategory::ALL
    }

    fn is_category(&self, category: &EventCategory) -> bool {
        self.category.as_ref() == Some(category)
    }
}

/// Upcoming published events, optionally filtered by category.
#[get("/")]
async fn index(
    app_state: web::Data<AppState>,
    filters: web::Query<EventFilters>,
    request: HttpRequest,
) -> Result<impl Responder> {
    let current_user = app_state.current_user(&request).await;
    // An unknown category is treated as no filter, like an empty one.
    let category = filters
        .category
        .as_deref()
        .and_then(|category| category.parse::<EventCategory>().ok());
    let sort_by = SortBy::parse(filters.sort_by.as_deref());

    let query = format!(
        r#"
        select event.*, account.name as creator_name
        from event
          join account on account.id = event.creator_id
        where event.status = 'PUBLISHED'
          and event.start_date_time >= $1
          and ($2::event_category is null or event.category = $2)
        order by {}
        "#,
        sort_by.order_clause()
    );
    let events: Vec<EventListing> = sqlx::query_as(&query)
        .bind(Utc::now())
        .bind(category)
        .fetch_all(&app_state.db_pool)
        .await
        .context("Failed to fetch upcoming events")?;

    Ok(IndexTemplate {
        config: &app_state.config,
        current_user: &current_user,
        events: &events,
        category,
        sort_by_title: sort_by == SortBy::Title,
    }
    .to_response())
}

#[get("/style.css")]
async fn stylesheet() -> impl Responder {
    HttpResponse::Ok()
        .content_type(mime::TEXT_CSS_UTF_8.as_ref())
        .body(include_str!("../../static/style.css"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_defaults_to_start_time() {
        assert_eq!(SortBy::parse(None), SortBy::StartDateTime);
        assert_eq!(SortBy::parse(Some("startDateTime")), SortBy::StartDateTime);
        assert_eq!(SortBy::parse(Some("title")), SortBy::Title);
        assert_eq!(SortBy::Title.order_clause(), "event.title asc");
    }
}
