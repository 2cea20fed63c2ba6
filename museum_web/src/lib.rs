#![forbid(unsafe_code)]

//! Browser front end for the HeritagePlus museum system.
//!
//! Serves HTML pages over the same database file the CLI uses. Staff log in
//! with their store credentials; the session cookie maps to an in-memory
//! [`Actor`](museum_core::Actor).

use axum::routing::get;
use axum::Router;
use museum_core::{AccessPolicy, Database, Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

mod handlers;
pub mod session;
mod views;

pub use session::{Flash, FlashKind, SessionStore, SESSION_COOKIE};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
    policy: Arc<AccessPolicy>,
    sessions: SessionStore,
}

impl AppState {
    pub fn new(db_path: PathBuf, policy: AccessPolicy) -> Self {
        Self {
            db_path: Arc::new(db_path),
            policy: Arc::new(policy),
            sessions: SessionStore::default(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Load the database on the blocking pool
    pub async fn read(&self) -> Result<Database> {
        let path = Arc::clone(&self.db_path);
        run_blocking(move || Database::load(&path)).await
    }

    /// Run a locked load-modify-save on the blocking pool
    pub async fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.db_path);
        run_blocking(move || Database::update(&path, f)).await
    }
}

/// File locking and password hashing block, so they run off the async workers
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?
}

/// Build the router with all pages
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/artefacts", get(handlers::artefacts))
        .route(
            "/artefacts/new",
            get(handlers::artefact_form).post(handlers::create_artefact),
        )
        .route("/exhibits", get(handlers::exhibits))
        .route(
            "/exhibits/new",
            get(handlers::exhibit_form).post(handlers::create_exhibit),
        )
        .route(
            "/exhibits/link-artefact",
            get(handlers::link_form).post(handlers::link_artefact),
        )
        .route("/visitors", get(handlers::visitors))
        .route(
            "/visitors/new",
            get(handlers::visitor_form).post(handlers::create_visitor),
        )
        .route(
            "/visits/record",
            get(handlers::visit_form).post(handlers::record_visit),
        )
        .route(
            "/tickets/record",
            get(handlers::ticket_form).post(handlers::record_ticket),
        )
        .route(
            "/feedback/record",
            get(handlers::feedback_form).post(handlers::record_feedback),
        )
        .route(
            "/conservation/new",
            get(handlers::conservation_form).post(handlers::create_conservation),
        )
        .with_state(state)
}
