//! Route handlers.
//!
//! POST handlers follow post-redirect-get: success flashes a notice and
//! redirects to a listing, a rejected submission flashes the error and
//! redirects back to the form.

use crate::session::{session_cookie, session_token, CurrentUser, FlashKind};
use crate::views;
use crate::{run_blocking, AppState};
use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use chrono::{NaiveDate, Utc};
use museum_core::analytics::Report;
use museum_core::store::{NewArtefact, NewConservationRecord, NewExhibit, NewVisitor};
use museum_core::validate::{optional, parse_optional_date, parse_price, required};
use museum_core::{authenticate, Action, Database, Error, Result};
use serde::{Deserialize, Serialize};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_id(value: &str, field: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("{} must be a number", field)))
}

/// Render a page for the current user, consuming pending flashes
async fn page(state: &AppState, user: &CurrentUser, title: &str, body: &str) -> Response {
    let flashes = state.sessions.take_flashes(&user.token).await;
    views::layout(title, Some(&user.actor), &flashes, body).into_response()
}

/// Redirect to the dashboard with the denial message unless the action is allowed
async fn guard(state: &AppState, user: &CurrentUser, action: Action) -> Option<Response> {
    match state.policy.check(&user.actor, action) {
        Ok(()) => None,
        Err(e) => {
            state
                .sessions
                .flash(&user.token, FlashKind::Error, e.to_string())
                .await;
            Some(Redirect::to("/dashboard").into_response())
        }
    }
}

fn internal_error(e: Error) -> Response {
    tracing::error!("Request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// Finish a form submission
async fn finish<T>(
    state: &AppState,
    user: &CurrentUser,
    result: Result<T>,
    success: &str,
    on_success: &str,
    on_error: &str,
) -> Response {
    match result {
        Ok(_) => {
            state
                .sessions
                .flash(&user.token, FlashKind::Success, success)
                .await;
            Redirect::to(on_success).into_response()
        }
        Err(e) if e.is_user_facing() => {
            state
                .sessions
                .flash(&user.token, FlashKind::Error, e.to_string())
                .await;
            Redirect::to(on_error).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// Load the database and render it into a page
async fn render_with_db(
    state: &AppState,
    user: &CurrentUser,
    title: &str,
    render: impl FnOnce(&Database) -> String,
) -> Response {
    match state.read().await {
        Ok(db) => {
            let body = render(&db);
            page(state, user, title, &body).await
        }
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Session pages
// ============================================================================

pub async fn index(state: State<AppState>, headers: HeaderMap) -> Redirect {
    let logged_in = match session_token(&headers) {
        Some(token) => state.sessions.actor(&token).await.is_some(),
        None => false,
    };
    if logged_in {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Liveness probe
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

impl LoginQuery {
    /// Only same-site absolute paths are followed after login
    fn safe_next(&self) -> Option<&str> {
        self.next
            .as_deref()
            .filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
) -> Html<String> {
    let flashes = match session_token(&headers) {
        Some(token) => state.sessions.take_flashes(&token).await,
        None => Vec::new(),
    };
    views::layout("Log in", None, &flashes, &views::login(query.safe_next(), None))
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let path = std::sync::Arc::clone(&state.db_path);
    let username = form.username.trim().to_string();
    let password = form.password;
    let outcome = run_blocking(move || {
        let db = Database::load(&path)?;
        authenticate(&db, &username, &password)
    })
    .await;

    match outcome {
        Ok(actor) => {
            if let Some(old) = session_token(&headers) {
                state.sessions.remove(&old).await;
            }
            let welcome = format!("Welcome, {} ({})", actor.username, actor.role);
            let token = state.sessions.create(actor).await;
            state
                .sessions
                .flash(&token, FlashKind::Success, welcome)
                .await;

            let target = query.safe_next().unwrap_or("/dashboard");
            ([(SET_COOKIE, session_cookie(&token))], Redirect::to(target)).into_response()
        }
        Err(e @ Error::AuthenticationFailed) => views::layout(
            "Log in",
            None,
            &[],
            &views::login(query.safe_next(), Some(&e.to_string())),
        )
        .into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Redirect {
    if let Some(token) = session_token(&headers) {
        state.sessions.logout(&token).await;
    }
    Redirect::to("/login")
}

pub async fn dashboard(State(state): State<AppState>, user: CurrentUser) -> Response {
    // Denied actions land here, so a missing permission cannot redirect
    if state.policy.check(&user.actor, Action::ViewReports).is_err() {
        let body = views::dashboard_without_reports();
        return page(&state, &user, "Dashboard", &body).await;
    }
    render_with_db(&state, &user, "Dashboard", |db| {
        views::dashboard(&Report::build(db, today()))
    })
    .await
}

// ============================================================================
// Artefacts and exhibits
// ============================================================================

pub async fn artefacts(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::ListRecords).await {
        return denied;
    }
    render_with_db(&state, &user, "Artefacts", views::artefacts).await
}

pub async fn artefact_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddArtefact).await {
        return denied;
    }
    page(&state, &user, "New artefact", &views::artefact_form()).await
}

#[derive(Debug, Deserialize)]
pub struct ArtefactForm {
    #[serde(default)]
    name: String,
    description: Option<String>,
    material: Option<String>,
    acquisition_date: Option<String>,
}

pub async fn create_artefact(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ArtefactForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddArtefact).await {
        return denied;
    }
    let result = match parse_optional_date(form.acquisition_date.as_deref()) {
        Ok(acquisition_date) => {
            let new = NewArtefact {
                name: form.name,
                description: optional(form.description.as_deref()),
                material: optional(form.material.as_deref()),
                acquisition_date,
            };
            state.update(move |db| db.create_artefact(new)).await
        }
        Err(e) => Err(e),
    };
    finish(&state, &user, result, "Artefact created.", "/artefacts", "/artefacts/new").await
}

pub async fn exhibits(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::ListRecords).await {
        return denied;
    }
    render_with_db(&state, &user, "Exhibits", views::exhibits).await
}

pub async fn exhibit_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddExhibit).await {
        return denied;
    }
    page(&state, &user, "New exhibit", &views::exhibit_form()).await
}

#[derive(Debug, Deserialize)]
pub struct ExhibitForm {
    #[serde(default)]
    title: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

pub async fn create_exhibit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ExhibitForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddExhibit).await {
        return denied;
    }
    let parsed = (|| -> Result<NewExhibit> {
        Ok(NewExhibit {
            title: required(&form.title, "Title")?,
            start_date: parse_optional_date(form.start_date.as_deref())?,
            end_date: parse_optional_date(form.end_date.as_deref())?,
        })
    })();
    let result = match parsed {
        Ok(new) => state.update(move |db| db.create_exhibit(new)).await,
        Err(e) => Err(e),
    };
    finish(&state, &user, result, "Exhibit created.", "/exhibits", "/exhibits/new").await
}

pub async fn link_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::LinkArtefact).await {
        return denied;
    }
    render_with_db(&state, &user, "Link artefact to exhibit", views::link_form).await
}

#[derive(Debug, Deserialize)]
pub struct LinkForm {
    #[serde(default)]
    exhibit_id: String,
    #[serde(default)]
    artefact_id: String,
}

pub async fn link_artefact(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<LinkForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::LinkArtefact).await {
        return denied;
    }
    let ids = parse_id(&form.exhibit_id, "Exhibit")
        .and_then(|e| parse_id(&form.artefact_id, "Artefact").map(|a| (e, a)));
    let result = match ids {
        Ok((exhibit_id, artefact_id)) => {
            state
                .update(move |db| db.link_artefact_to_exhibit(artefact_id, exhibit_id))
                .await
        }
        Err(e) => Err(e),
    };
    finish(
        &state,
        &user,
        result,
        "Linked artefact to exhibit.",
        "/exhibits",
        "/exhibits/link-artefact",
    )
    .await
}

// ============================================================================
// Visitors, visits, tickets, feedback
// ============================================================================

pub async fn visitors(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::ListRecords).await {
        return denied;
    }
    render_with_db(&state, &user, "Visitors", views::visitors).await
}

pub async fn visitor_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddVisitor).await {
        return denied;
    }
    page(&state, &user, "New visitor", &views::visitor_form()).await
}

#[derive(Debug, Deserialize)]
pub struct VisitorForm {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
    age_band: Option<String>,
    region: Option<String>,
    membership_type: Option<String>,
}

pub async fn create_visitor(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VisitorForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddVisitor).await {
        return denied;
    }
    let new = NewVisitor {
        full_name: form.full_name,
        email: form.email,
        age_band: optional(form.age_band.as_deref()),
        region: optional(form.region.as_deref()),
        membership_type: optional(form.membership_type.as_deref()),
    };
    let result = state.update(move |db| db.create_visitor(new)).await;
    finish(&state, &user, result, "Visitor created.", "/visitors", "/visitors/new").await
}

pub async fn visit_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::RecordVisit).await {
        return denied;
    }
    render_with_db(&state, &user, "Record visit", views::visit_form).await
}

#[derive(Debug, Deserialize)]
pub struct VisitForm {
    #[serde(default)]
    visitor_id: String,
    #[serde(default)]
    exhibit_id: String,
    visit_date: Option<String>,
}

pub async fn record_visit(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<VisitForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::RecordVisit).await {
        return denied;
    }
    let parsed = (|| -> Result<(u64, u64, NaiveDate)> {
        let visitor_id = parse_id(&form.visitor_id, "Visitor")?;
        let exhibit_id = parse_id(&form.exhibit_id, "Exhibit")?;
        let date = parse_optional_date(form.visit_date.as_deref())?.unwrap_or_else(today);
        Ok((visitor_id, exhibit_id, date))
    })();
    let result = match parsed {
        Ok((visitor_id, exhibit_id, date)) => {
            state
                .update(move |db| db.record_visit(visitor_id, exhibit_id, date))
                .await
        }
        Err(e) => Err(e),
    };
    finish(&state, &user, result, "Visit recorded.", "/dashboard", "/visits/record").await
}

pub async fn ticket_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::SellTicket).await {
        return denied;
    }
    page(&state, &user, "Sell ticket", &views::ticket_form()).await
}

#[derive(Debug, Deserialize)]
pub struct TicketForm {
    #[serde(default)]
    visitor_id: String,
    #[serde(default)]
    ticket_type: String,
    #[serde(default)]
    price: String,
    purchase_date: Option<String>,
}

pub async fn record_ticket(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<TicketForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::SellTicket).await {
        return denied;
    }
    let parsed = (|| -> Result<(u64, u64, NaiveDate)> {
        let visitor_id = parse_id(&form.visitor_id, "Visitor")?;
        let price = parse_price(&form.price)?;
        let date = parse_optional_date(form.purchase_date.as_deref())?.unwrap_or_else(today);
        Ok((visitor_id, price, date))
    })();
    let result = match parsed {
        Ok((visitor_id, price, date)) => {
            let ticket_type = form.ticket_type;
            state
                .update(move |db| db.record_ticket_purchase(visitor_id, &ticket_type, price, date))
                .await
        }
        Err(e) => Err(e),
    };
    finish(
        &state,
        &user,
        result,
        "Ticket purchase recorded.",
        "/dashboard",
        "/tickets/record",
    )
    .await
}

pub async fn feedback_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::LeaveFeedback).await {
        return denied;
    }
    render_with_db(&state, &user, "Leave feedback", views::feedback_form).await
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    visitor_id: String,
    #[serde(default)]
    exhibit_id: String,
    #[serde(default)]
    rating: String,
    comments: Option<String>,
}

pub async fn record_feedback(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<FeedbackForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::LeaveFeedback).await {
        return denied;
    }
    let parsed = (|| -> Result<(u64, u64, i64)> {
        let visitor_id = parse_id(&form.visitor_id, "Visitor")?;
        let exhibit_id = parse_id(&form.exhibit_id, "Exhibit")?;
        let rating: i64 = form
            .rating
            .trim()
            .parse()
            .map_err(|_| Error::Validation("Rating must be between 1 and 5".into()))?;
        Ok((visitor_id, exhibit_id, rating))
    })();
    let result = match parsed {
        Ok((visitor_id, exhibit_id, rating)) => {
            let comments = optional(form.comments.as_deref());
            state
                .update(move |db| db.record_feedback(visitor_id, exhibit_id, rating, comments))
                .await
        }
        Err(e) => Err(e),
    };
    finish(
        &state,
        &user,
        result,
        "Feedback recorded.",
        "/dashboard",
        "/feedback/record",
    )
    .await
}

// ============================================================================
// Conservation
// ============================================================================

pub async fn conservation_form(State(state): State<AppState>, user: CurrentUser) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddConservation).await {
        return denied;
    }
    render_with_db(&state, &user, "New conservation record", views::conservation_form).await
}

#[derive(Debug, Deserialize)]
pub struct ConservationForm {
    #[serde(default)]
    artefact_id: String,
    #[serde(default)]
    condition: String,
    treatment: Option<String>,
    due_date: Option<String>,
    notes: Option<String>,
}

pub async fn create_conservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ConservationForm>,
) -> Response {
    if let Some(denied) = guard(&state, &user, Action::AddConservation).await {
        return denied;
    }
    let parsed = (|| -> Result<NewConservationRecord> {
        Ok(NewConservationRecord {
            artefact_id: parse_id(&form.artefact_id, "Artefact")?,
            condition: form.condition.clone(),
            treatment: optional(form.treatment.as_deref()),
            due_date: parse_optional_date(form.due_date.as_deref())?,
            notes: optional(form.notes.as_deref()),
        })
    })();
    let result = match parsed {
        Ok(new) => state.update(move |db| db.add_conservation_record(new)).await,
        Err(e) => Err(e),
    };
    finish(
        &state,
        &user,
        result,
        "Conservation record added.",
        "/dashboard",
        "/conservation/new",
    )
    .await
}
