#![forbid(unsafe_code)]

//! Core domain model and business logic for the HeritagePlus museum system.
//!
//! This crate provides:
//! - Domain types (artefacts, exhibits, visitors, visits, tickets, feedback)
//! - Persistence (locked JSON database, CSV import/export)
//! - Authentication, password hashing and role-based access
//! - Reports and seasonal-naive visit forecasting

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod validate;
pub mod passwords;
pub mod access;
pub mod store;
pub mod analytics;
pub mod forecast;
pub mod csv_io;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use access::{authenticate, require_role, AccessPolicy, Action, Actor, CredentialStore};
pub use passwords::{hash_password, verify_password};
pub use store::{seed_default_admin, Database};
pub use analytics::Report;
pub use forecast::{seasonal_naive_forecast, ForecastMethod, ForecastPoint};
pub use csv_io::{export_visits_csv, import_artefacts_csv};
