//! HTML rendering. All interpolated text goes through [`escape`].

use crate::session::Flash;
use axum::response::Html;
use museum_core::analytics::Report;
use museum_core::{Actor, Artefact, Database, Exhibit};
use std::fmt::Write;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn opt(value: Option<&str>) -> String {
    escape(value.unwrap_or(""))
}

fn opt_date(value: Option<chrono::NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

const NAV: &[(&str, &str)] = &[
    ("/dashboard", "Dashboard"),
    ("/artefacts", "Artefacts"),
    ("/exhibits", "Exhibits"),
    ("/visitors", "Visitors"),
    ("/visits/record", "Record visit"),
    ("/tickets/record", "Sell ticket"),
    ("/feedback/record", "Feedback"),
    ("/conservation/new", "Conservation"),
];

/// Wrap a page body with the shared header, navigation and flashes
pub fn layout(title: &str, actor: Option<&Actor>, flashes: &[Flash], body: &str) -> Html<String> {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>{} | HeritagePlus</title></head>\n<body>\n",
        escape(title)
    );

    if let Some(actor) = actor {
        html.push_str("<nav>");
        for (href, label) in NAV {
            let _ = write!(html, "<a href=\"{}\">{}</a> ", href, label);
        }
        let _ = write!(
            html,
            "<span class=\"user\">{} ({})</span> <a href=\"/logout\">Log out</a></nav>\n",
            escape(&actor.username),
            actor.role
        );
    }

    for flash in flashes {
        let _ = writeln!(
            html,
            "<p class=\"flash {}\">{}</p>",
            flash.kind.css_class(),
            escape(&flash.message)
        );
    }

    let _ = write!(html, "<h1>{}</h1>\n{}\n</body>\n</html>\n", escape(title), body);
    Html(html)
}

struct Field<'a> {
    name: &'a str,
    label: &'a str,
    kind: &'a str,
    required: bool,
}

const fn field<'a>(name: &'a str, label: &'a str, kind: &'a str, required: bool) -> Field<'a> {
    Field {
        name,
        label,
        kind,
        required,
    }
}

fn input(html: &mut String, f: &Field<'_>) {
    let _ = writeln!(
        html,
        "<label>{} <input type=\"{}\" name=\"{}\"{}></label><br>",
        f.label,
        f.kind,
        f.name,
        if f.required { " required" } else { "" }
    );
}

fn select(html: &mut String, name: &str, label: &str, options: &[(u64, String)]) {
    let _ = write!(html, "<label>{} <select name=\"{}\">", label, name);
    for (id, text) in options {
        let _ = write!(html, "<option value=\"{}\">{}</option>", id, escape(text));
    }
    html.push_str("</select></label><br>\n");
}

fn form(action: &str, build: impl FnOnce(&mut String)) -> String {
    let mut html = format!("<form method=\"post\" action=\"{}\">\n", escape(action));
    build(&mut html);
    html.push_str("<button type=\"submit\">Save</button>\n</form>");
    html
}

fn exhibit_options(exhibits: &[Exhibit]) -> Vec<(u64, String)> {
    exhibits.iter().map(|e| (e.id, e.title.clone())).collect()
}

fn artefact_options(artefacts: &[Artefact]) -> Vec<(u64, String)> {
    artefacts.iter().map(|a| (a.id, a.name.clone())).collect()
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "<p>None yet.</p>".into();
    }
    let mut html = String::from("<table>\n<tr>");
    for h in headers {
        let _ = write!(html, "<th>{}</th>", h);
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", cell);
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

pub fn login(next: Option<&str>, error: Option<&str>) -> String {
    let action = match next {
        Some(next) => format!("/login?next={}", next),
        None => "/login".into(),
    };
    let mut html = String::new();
    if let Some(error) = error {
        let _ = writeln!(html, "<p class=\"flash error\">{}</p>", escape(error));
    }
    html.push_str(&form(&action, |h| {
        input(h, &field("username", "Username", "text", true));
        input(h, &field("password", "Password", "password", true));
    }));
    html
}

/// Dashboard for roles that may not view reports
pub fn dashboard_without_reports() -> String {
    "<p>Reports are not available for your role. Use the links above to get started.</p>\n".into()
}

pub fn dashboard(report: &Report) -> String {
    let mut html = String::new();

    html.push_str("<h2>Visits by exhibit</h2>\n");
    html.push_str(&table(
        &["Exhibit", "Visits"],
        report
            .visits_by_exhibit
            .iter()
            .map(|r| vec![escape(&r.title), r.visit_count.to_string()])
            .collect(),
    ));

    html.push_str("\n<h2>Average rating</h2>\n");
    html.push_str(&table(
        &["Exhibit", "Rating", "Reviews"],
        report
            .ratings
            .iter()
            .map(|r| {
                vec![
                    escape(&r.title),
                    format!("{:.2}", r.avg_rating),
                    r.num_feedback.to_string(),
                ]
            })
            .collect(),
    ));

    html.push_str("\n<h2>Conservation due in 30 days</h2>\n");
    html.push_str(&table(
        &["Artefact", "Due", "Condition"],
        report
            .conservation_due
            .iter()
            .map(|r| vec![escape(&r.name), r.due_date.to_string(), escape(&r.condition)])
            .collect(),
    ));

    html.push_str("\n<h2>Monthly visits</h2>\n");
    html.push_str(&table(
        &["Month", "Visits"],
        report
            .monthly_visits
            .iter()
            .map(|m| vec![m.month.to_string(), m.count.to_string()])
            .collect(),
    ));

    html.push_str("\n<h2>Forecast (next 3 months)</h2>\n");
    html.push_str(&table(
        &["Month", "Predicted visits", "Method"],
        report
            .forecast
            .iter()
            .map(|p| {
                vec![
                    p.month.to_string(),
                    p.predicted_visits.to_string(),
                    p.method.to_string(),
                ]
            })
            .collect(),
    ));
    html
}

pub fn artefacts(db: &Database) -> String {
    let mut html = String::from("<p><a href=\"/artefacts/new\">Add artefact</a></p>\n");
    html.push_str(&table(
        &["Id", "Name", "Material", "Acquired", "Last conserved"],
        db.artefacts()
            .iter()
            .map(|a| {
                vec![
                    a.id.to_string(),
                    escape(&a.name),
                    opt(a.material.as_deref()),
                    opt_date(a.acquisition_date),
                    opt_date(a.last_conservation_date),
                ]
            })
            .collect(),
    ));
    html
}

pub fn artefact_form() -> String {
    form("/artefacts/new", |h| {
        input(h, &field("name", "Name", "text", true));
        input(h, &field("description", "Description", "text", false));
        input(h, &field("material", "Material", "text", false));
        input(h, &field("acquisition_date", "Acquisition date", "date", false));
    })
}

pub fn exhibits(db: &Database) -> String {
    let mut html = String::from(
        "<p><a href=\"/exhibits/new\">Add exhibit</a> \
         <a href=\"/exhibits/link-artefact\">Link artefact</a></p>\n",
    );
    html.push_str(&table(
        &["Id", "Title", "Start", "End", "Artefacts"],
        db.exhibits()
            .iter()
            .map(|e| {
                let names: Vec<String> = db
                    .artefacts_in_exhibit(e.id)
                    .iter()
                    .map(|a| escape(&a.name))
                    .collect();
                vec![
                    e.id.to_string(),
                    escape(&e.title),
                    opt_date(e.start_date),
                    opt_date(e.end_date),
                    names.join(", "),
                ]
            })
            .collect(),
    ));
    html
}

pub fn exhibit_form() -> String {
    form("/exhibits/new", |h| {
        input(h, &field("title", "Title", "text", true));
        input(h, &field("start_date", "Start date", "date", false));
        input(h, &field("end_date", "End date", "date", false));
    })
}

pub fn link_form(db: &Database) -> String {
    form("/exhibits/link-artefact", |h| {
        select(h, "exhibit_id", "Exhibit", &exhibit_options(db.exhibits()));
        select(h, "artefact_id", "Artefact", &artefact_options(db.artefacts()));
    })
}

pub fn visitors(db: &Database) -> String {
    let mut html = String::from("<p><a href=\"/visitors/new\">Add visitor</a></p>\n");
    html.push_str(&table(
        &["Id", "Name", "Email", "Membership", "Visits"],
        db.visitors()
            .iter()
            .map(|v| {
                let visits = db.visits().iter().filter(|x| x.visitor_id == v.id).count();
                vec![
                    v.id.to_string(),
                    escape(&v.full_name),
                    escape(&v.email),
                    opt(v.membership_type.as_deref()),
                    visits.to_string(),
                ]
            })
            .collect(),
    ));
    html
}

pub fn visitor_form() -> String {
    form("/visitors/new", |h| {
        input(h, &field("full_name", "Full name", "text", true));
        input(h, &field("email", "Email", "email", true));
        input(h, &field("age_band", "Age band", "text", false));
        input(h, &field("region", "Region", "text", false));
        input(h, &field("membership_type", "Membership type", "text", false));
    })
}

pub fn visit_form(db: &Database) -> String {
    form("/visits/record", |h| {
        input(h, &field("visitor_id", "Visitor id", "number", true));
        select(h, "exhibit_id", "Exhibit", &exhibit_options(db.exhibits()));
        input(h, &field("visit_date", "Visit date (default today)", "date", false));
    })
}

pub fn ticket_form() -> String {
    form("/tickets/record", |h| {
        input(h, &field("visitor_id", "Visitor id", "number", true));
        input(h, &field("ticket_type", "Ticket type", "text", false));
        input(h, &field("price", "Price", "text", true));
        input(h, &field("purchase_date", "Purchase date (default today)", "date", false));
    })
}

pub fn feedback_form(db: &Database) -> String {
    form("/feedback/record", |h| {
        input(h, &field("visitor_id", "Visitor id", "number", true));
        select(h, "exhibit_id", "Exhibit", &exhibit_options(db.exhibits()));
        input(h, &field("rating", "Rating (1-5)", "number", true));
        input(h, &field("comments", "Comments", "text", false));
    })
}

pub fn conservation_form(db: &Database) -> String {
    form("/conservation/new", |h| {
        select(h, "artefact_id", "Artefact", &artefact_options(db.artefacts()));
        input(h, &field("condition", "Condition", "text", true));
        input(h, &field("treatment", "Treatment", "text", false));
        input(h, &field("due_date", "Due date", "date", false));
        input(h, &field("notes", "Notes", "text", false));
    })
}
