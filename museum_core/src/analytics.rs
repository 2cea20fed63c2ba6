//! Reporting queries over the museum database.

use crate::forecast::{seasonal_naive_forecast, ForecastPoint};
use crate::store::Database;
use crate::{MonthlyCount, YearMonth};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Months forecast by [`Report::build`]
pub const REPORT_FORECAST_MONTHS: i64 = 3;

/// Visitors listed in the report's leaderboard
pub const REPORT_TOP_VISITORS: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExhibitVisits {
    pub exhibit_id: u64,
    pub title: String,
    pub visit_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopVisitor {
    pub visitor_id: u64,
    pub full_name: String,
    pub email: String,
    pub visits: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExhibitRating {
    pub exhibit_id: u64,
    pub title: String,
    pub avg_rating: f64,
    pub num_feedback: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConservationDue {
    pub artefact_id: u64,
    pub name: String,
    pub due_date: NaiveDate,
    pub condition: String,
}

/// Visits per exhibit within an optional inclusive date range.
///
/// Exhibits without visits in range are omitted. Sorted by count descending,
/// then exhibit id.
pub fn visit_counts_by_exhibit(
    db: &Database,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<ExhibitVisits> {
    let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
    for visit in db.visits() {
        if start.is_some_and(|s| visit.visit_date < s) || end.is_some_and(|e| visit.visit_date > e)
        {
            continue;
        }
        *counts.entry(visit.exhibit_id).or_default() += 1;
    }

    let mut rows: Vec<ExhibitVisits> = db
        .exhibits()
        .iter()
        .filter_map(|exhibit| {
            counts.get(&exhibit.id).map(|&visit_count| ExhibitVisits {
                exhibit_id: exhibit.id,
                title: exhibit.title.clone(),
                visit_count,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.visit_count
            .cmp(&a.visit_count)
            .then(a.exhibit_id.cmp(&b.exhibit_id))
    });
    rows
}

/// The `limit` visitors with the most visits
pub fn top_visitors(db: &Database, limit: usize) -> Vec<TopVisitor> {
    let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
    for visit in db.visits() {
        *counts.entry(visit.visitor_id).or_default() += 1;
    }

    let mut rows: Vec<TopVisitor> = db
        .visitors()
        .iter()
        .filter_map(|visitor| {
            counts.get(&visitor.id).map(|&visits| TopVisitor {
                visitor_id: visitor.id,
                full_name: visitor.full_name.clone(),
                email: visitor.email.clone(),
                visits,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.visits.cmp(&a.visits).then(a.visitor_id.cmp(&b.visitor_id)));
    rows.truncate(limit);
    rows
}

/// Mean feedback rating per exhibit, highest first
pub fn average_rating_by_exhibit(db: &Database) -> Vec<ExhibitRating> {
    let mut totals: BTreeMap<u64, (u64, u64)> = BTreeMap::new();
    for fb in db.feedback() {
        let entry = totals.entry(fb.exhibit_id).or_default();
        entry.0 += u64::from(fb.rating);
        entry.1 += 1;
    }

    let mut rows: Vec<ExhibitRating> = db
        .exhibits()
        .iter()
        .filter_map(|exhibit| {
            totals.get(&exhibit.id).map(|&(sum, n)| ExhibitRating {
                exhibit_id: exhibit.id,
                title: exhibit.title.clone(),
                avg_rating: sum as f64 / n as f64,
                num_feedback: n,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.avg_rating
            .total_cmp(&a.avg_rating)
            .then(a.exhibit_id.cmp(&b.exhibit_id))
    });
    rows
}

/// Conservation records due on or before `today + within_days`, soonest first
pub fn conservation_due_soon(
    db: &Database,
    today: NaiveDate,
    within_days: i64,
) -> Vec<ConservationDue> {
    // A window past the calendar's end means no cutoff
    let cutoff = Duration::try_days(within_days)
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(if within_days < 0 { NaiveDate::MIN } else { NaiveDate::MAX });
    let mut rows: Vec<ConservationDue> = db
        .conservation_records()
        .iter()
        .filter_map(|record| {
            let due_date = record.due_date.filter(|d| *d <= cutoff)?;
            let artefact = db.artefact(record.artefact_id).ok()?;
            Some(ConservationDue {
                artefact_id: artefact.id,
                name: artefact.name.clone(),
                due_date,
                condition: record.condition.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.artefact_id.cmp(&b.artefact_id)));
    rows
}

/// Visit totals per calendar month, ascending
pub fn monthly_visit_counts(db: &Database) -> Vec<MonthlyCount> {
    let mut counts: BTreeMap<YearMonth, u64> = BTreeMap::new();
    for visit in db.visits() {
        *counts.entry(YearMonth::from_date(visit.visit_date)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(month, count)| MonthlyCount::new(month, count))
        .collect()
}

/// Everything shown on the reports screen
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub generated_on: NaiveDate,
    pub visits_by_exhibit: Vec<ExhibitVisits>,
    pub top_visitors: Vec<TopVisitor>,
    pub ratings: Vec<ExhibitRating>,
    pub conservation_due: Vec<ConservationDue>,
    pub monthly_visits: Vec<MonthlyCount>,
    pub forecast: Vec<ForecastPoint>,
}

impl Report {
    pub fn build(db: &Database, today: NaiveDate) -> Self {
        let monthly_visits = monthly_visit_counts(db);
        let forecast = seasonal_naive_forecast(&monthly_visits, REPORT_FORECAST_MONTHS);
        Self {
            generated_on: today,
            visits_by_exhibit: visit_counts_by_exhibit(db, None, None),
            top_visitors: top_visitors(db, REPORT_TOP_VISITORS),
            ratings: average_rating_by_exhibit(db),
            conservation_due: conservation_due_soon(db, today, 30),
            monthly_visits,
            forecast,
        }
    }
}
