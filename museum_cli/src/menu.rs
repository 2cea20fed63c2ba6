//! Interactive numbered menu.

use crate::prompt::Prompt;
use crate::{print_report, today, Session};
use museum_core::analytics::Report;
use museum_core::store::{NewArtefact, NewConservationRecord, NewExhibit, NewVisitor};
use museum_core::validate::{parse_date, parse_optional_date, parse_price};
use museum_core::{Action, Result};
use std::io::BufRead;

const MENU: &str = "\nMenu:
1) Add artefact
2) Add exhibit
3) Add visitor
4) Record visit
5) Sell ticket
6) Leave feedback
7) Add conservation record
8) Reports (analytics + forecast)
9) Exit";

/// Run the menu until the user exits or input ends.
///
/// Validation, integrity and permission failures are printed and the menu
/// continues; anything else ends the session with an error.
pub fn run<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    let actor = session.actor();
    println!("Logged in as {} ({})", actor.username, actor.role);

    loop {
        println!("{}", MENU);
        let Some(choice) = prompt.try_ask("Choose: ")? else {
            println!();
            return Ok(());
        };

        let outcome = match choice.as_str() {
            "1" => add_artefact(session, prompt),
            "2" => add_exhibit(session, prompt),
            "3" => add_visitor(session, prompt),
            "4" => record_visit(session, prompt),
            "5" => sell_ticket(session, prompt),
            "6" => leave_feedback(session, prompt),
            "7" => add_conservation(session, prompt),
            "8" => reports(session),
            "9" => {
                println!("Bye!");
                return Ok(());
            }
            _ => {
                println!("Invalid choice.");
                Ok(())
            }
        };

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_user_facing() => println!("Error: {}", e),
            Err(e) => return Err(e),
        }
    }
}

fn add_artefact<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::AddArtefact)?;
    let name = prompt.ask("Name: ")?;
    let description = prompt.ask_optional("Description (optional): ")?;
    let material = prompt.ask_optional("Material (optional): ")?;
    let acquired = prompt.ask_optional("Acquisition date YYYY-MM-DD (optional): ")?;

    let artefact = session.add_artefact(NewArtefact {
        name,
        description,
        material,
        acquisition_date: parse_optional_date(acquired.as_deref())?,
    })?;
    println!("Artefact created with id={}", artefact.id);
    Ok(())
}

fn add_exhibit<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::AddExhibit)?;
    let title = prompt.ask("Title: ")?;
    let start = prompt.ask_optional("Start date YYYY-MM-DD (optional): ")?;
    let end = prompt.ask_optional("End date YYYY-MM-DD (optional): ")?;

    let exhibit = session.add_exhibit(NewExhibit {
        title,
        start_date: parse_optional_date(start.as_deref())?,
        end_date: parse_optional_date(end.as_deref())?,
    })?;
    println!("Exhibit created with id={}", exhibit.id);
    Ok(())
}

fn add_visitor<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::AddVisitor)?;
    let full_name = prompt.ask("Full name: ")?;
    let email = prompt.ask("Email: ")?;
    museum_core::validate::validate_email(&email)?;
    let age_band = prompt.ask_optional("Age band (optional): ")?;
    let region = prompt.ask_optional("Region (optional): ")?;
    let membership_type = prompt.ask_optional("Membership type (optional): ")?;

    let visitor = session.add_visitor(NewVisitor {
        full_name,
        email,
        age_band,
        region,
        membership_type,
    })?;
    println!("Visitor created with id={}", visitor.id);
    Ok(())
}

fn record_visit<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::RecordVisit)?;
    let visitor_id = prompt.ask_id("Visitor id: ")?;
    let exhibit_id = prompt.ask_id("Exhibit id: ")?;
    let date = parse_date(&prompt.ask("Visit date YYYY-MM-DD: ")?)?;

    let visit = session.record_visit(visitor_id, exhibit_id, date)?;
    println!("Visit recorded with id={}", visit.id);
    Ok(())
}

fn sell_ticket<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::SellTicket)?;
    let visitor_id = prompt.ask_id("Visitor id: ")?;
    let ticket_type = prompt.ask("Ticket type (Adult/Student/Member): ")?;
    let price = parse_price(&prompt.ask("Price: ")?)?;

    let ticket = session.sell_ticket(visitor_id, &ticket_type, price)?;
    println!("Ticket purchase recorded with id={}", ticket.id);
    Ok(())
}

fn leave_feedback<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::LeaveFeedback)?;
    let visitor_id = prompt.ask_id("Visitor id: ")?;
    let exhibit_id = prompt.ask_id("Exhibit id: ")?;
    let answer = prompt.ask("Rating (1-5): ")?;
    let rating: i64 = answer.parse().map_err(|_| {
        museum_core::Error::Validation("Rating must be between 1 and 5".into())
    })?;
    museum_core::validate::validate_rating(rating)?;
    let comments = prompt.ask_optional("Comments (optional): ")?;

    let feedback = session.leave_feedback(visitor_id, exhibit_id, rating, comments)?;
    println!("Feedback recorded with id={}", feedback.id);
    Ok(())
}

fn add_conservation<R: BufRead>(session: &Session, prompt: &mut Prompt<R>) -> Result<()> {
    session.guard(Action::AddConservation)?;
    let artefact_id = prompt.ask_id("Artefact id: ")?;
    let condition = prompt.ask("Condition (e.g. Good/Fair/Poor): ")?;
    let treatment = prompt.ask_optional("Treatment (optional): ")?;
    let due = prompt.ask_optional("Due date YYYY-MM-DD (optional): ")?;
    let due_date = parse_optional_date(due.as_deref())?;
    let notes = prompt.ask_optional("Notes (optional): ")?;

    let record = session.add_conservation(NewConservationRecord {
        artefact_id,
        condition,
        treatment,
        due_date,
        notes,
    })?;
    println!("Conservation record created with id={}", record.id);
    Ok(())
}

fn reports(session: &Session) -> Result<()> {
    let db = session.load_for(Action::ViewReports)?;
    print_report(&Report::build(&db, today()));
    Ok(())
}
