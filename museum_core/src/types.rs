//! Core domain types for the HeritagePlus museum system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Collection records (artefacts, exhibits, conservation records)
//! - Visitor-facing records (visitors, visits, tickets, feedback)
//! - Staff users and their roles
//! - Calendar months for visit analytics

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Collection Types
// ============================================================================

/// A catalogued object in the collection
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Artefact {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub material: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    /// Maintained by the store whenever a conservation record is added
    pub last_conservation_date: Option<NaiveDate>,
}

/// An exhibition, optionally bounded by dates
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exhibit {
    pub id: u64,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Many-to-many link between exhibits and the artefacts they show
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ExhibitArtefact {
    pub exhibit_id: u64,
    pub artefact_id: u64,
}

/// Condition assessment and planned treatment for an artefact
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConservationRecord {
    pub id: u64,
    pub artefact_id: u64,
    pub condition: String,
    pub treatment: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Visitor Types
// ============================================================================

/// A registered visitor. Demographics are kept deliberately coarse.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Visitor {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    pub age_band: Option<String>,
    pub region: Option<String>,
    pub membership_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: u64,
    pub visitor_id: u64,
    pub exhibit_id: u64,
    pub visit_date: NaiveDate,
}

/// A ticket sale. Prices are held in pence to avoid float rounding.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TicketPurchase {
    pub id: u64,
    pub visitor_id: u64,
    pub ticket_type: String,
    pub price_pence: u64,
    pub purchase_date: NaiveDate,
}

impl TicketPurchase {
    /// Price formatted as pounds with two decimals, e.g. `12.50`
    pub fn price_display(&self) -> String {
        format_pence(self.price_pence)
    }
}

/// Format a pence amount as `pounds.pence`
pub fn format_pence(pence: u64) -> String {
    format!("{}.{:02}", pence / 100, pence % 100)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: u64,
    pub visitor_id: u64,
    pub exhibit_id: u64,
    /// 1..=5
    pub rating: u8,
    pub comments: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

// ============================================================================
// Staff Types
// ============================================================================

/// Access level of a staff user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Curator,
    FrontDesk,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Curator, Role::FrontDesk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Curator => "curator",
            Role::FrontDesk => "front_desk",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Unknown role '{}' (expected admin, curator or front_desk)",
                    name
                ))
            })
    }
}

/// A staff account. The role is stored as text so that a hand-edited store
/// with an unknown role fails authentication instead of failing to load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Calendar Month Types
// ============================================================================

/// A calendar month, printed and parsed as `YYYY-MM`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns None unless `month` is in 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month, rolling December into January of the next year
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The same calendar month one year earlier
    pub fn year_before(self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("Invalid year-month '{}' (expected YYYY-MM)", s));

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Number of visits observed in one calendar month
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyCount {
    pub month: YearMonth,
    pub count: u64,
}

impl MonthlyCount {
    pub fn new(month: YearMonth, count: u64) -> Self {
        Self { month, count }
    }
}
