use clap::{Parser, Subcommand};
use museum_core::analytics::{conservation_due_soon, Report};
use museum_core::config::database_path;
use museum_core::store::{NewArtefact, NewConservationRecord, NewExhibit, NewVisitor};
use museum_core::validate::{optional, parse_optional_date, parse_price};
use museum_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod menu;
mod prompt;

use prompt::Prompt;

#[derive(Parser)]
#[command(name = "heritage")]
#[command(about = "HeritagePlus museum management system", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (defaults to $XDG_CONFIG_HOME/heritage/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Staff username (prompted if absent)
    #[arg(short, long, global = true, env = "HERITAGE_USER")]
    username: Option<String>,

    /// Staff password (prompted if absent)
    #[arg(long, global = true, env = "HERITAGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and the configured admin user
    Init,

    /// Interactive menu (default)
    Menu,

    /// Manage the artefact catalogue
    Artefact {
        #[command(subcommand)]
        command: ArtefactCommand,
    },

    /// Manage exhibits
    Exhibit {
        #[command(subcommand)]
        command: ExhibitCommand,
    },

    /// Manage visitors
    Visitor {
        #[command(subcommand)]
        command: VisitorCommand,
    },

    /// Record visits
    Visit {
        #[command(subcommand)]
        command: VisitCommand,
    },

    /// Sell tickets
    Ticket {
        #[command(subcommand)]
        command: TicketCommand,
    },

    /// Collect visitor feedback
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommand,
    },

    /// Conservation records
    Conservation {
        #[command(subcommand)]
        command: ConservationCommand,
    },

    /// Print analytics and the visit forecast
    Report,

    /// Forecast monthly visits
    Forecast {
        /// Number of months to forecast (at most 1200)
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(i64).range(0..=MAX_FORECAST_MONTHS))]
        months: i64,
    },

    /// Import records from CSV
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },

    /// Export records to CSV
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },

    /// Manage staff accounts
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
}

#[derive(Subcommand)]
enum ArtefactCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        material: Option<String>,
        /// Acquisition date (YYYY-MM-DD)
        #[arg(long)]
        acquired: Option<String>,
    },
    List,
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
enum ExhibitCommand {
    Add {
        #[arg(long)]
        title: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    List,
    /// Show an artefact in an exhibit
    Link {
        #[arg(long)]
        artefact: u64,
        #[arg(long)]
        exhibit: u64,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
enum VisitorCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        age_band: Option<String>,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        membership: Option<String>,
    },
    List,
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
enum VisitCommand {
    Record {
        #[arg(long)]
        visitor: u64,
        #[arg(long)]
        exhibit: u64,
        /// Visit date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum TicketCommand {
    Sell {
        #[arg(long)]
        visitor: u64,
        /// Ticket type, e.g. Adult, Student, Member
        #[arg(long = "type", default_value = "standard")]
        ticket_type: String,
        /// Price in pounds, e.g. 12.50
        #[arg(long, allow_hyphen_values = true)]
        price: String,
    },
}

#[derive(Subcommand)]
enum FeedbackCommand {
    Add {
        #[arg(long)]
        visitor: u64,
        #[arg(long)]
        exhibit: u64,
        /// Rating from 1 to 5
        #[arg(long, allow_negative_numbers = true)]
        rating: i64,
        #[arg(long)]
        comments: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConservationCommand {
    Add {
        #[arg(long)]
        artefact: u64,
        /// Condition, e.g. Good, Fair, Poor
        #[arg(long)]
        condition: String,
        #[arg(long)]
        treatment: Option<String>,
        /// Due date of the next check (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Records due within a number of days
    List {
        #[arg(long, default_value_t = 30)]
        within_days: i64,
    },
}

#[derive(Subcommand)]
enum ImportCommand {
    Artefacts { path: PathBuf },
}

/// Upper bound on `forecast --months`
const MAX_FORECAST_MONTHS: i64 = 1200;

#[derive(Subcommand)]
enum ExportCommand {
    Visits { path: PathBuf },
}

#[derive(Subcommand)]
enum UserCommand {
    Add {
        username: String,
        /// admin, curator or front_desk
        #[arg(long)]
        role: String,
        /// Password for the new account (prompted if absent)
        #[arg(long, env = "HERITAGE_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    museum_core::logging::init_with_level(&config.logging.level);

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let db_path = database_path(&data_dir);
    tracing::debug!("Using database {:?}", db_path);
    let mut prompt = Prompt::stdin();

    let command = cli.command.unwrap_or(Commands::Menu);
    if let Commands::Init = command {
        return cmd_init(&db_path, &config);
    }

    let actor = login(&db_path, cli.username, cli.password, &mut prompt)?;
    let session = Session {
        db_path,
        policy: config.access.clone(),
        actor,
    };

    match command {
        Commands::Init => cmd_init(&session.db_path, &config),
        Commands::Menu => menu::run(&session, &mut prompt),
        Commands::Artefact { command } => cmd_artefact(&session, command),
        Commands::Exhibit { command } => cmd_exhibit(&session, command),
        Commands::Visitor { command } => cmd_visitor(&session, command),
        Commands::Visit {
            command:
                VisitCommand::Record {
                    visitor,
                    exhibit,
                    date,
                },
        } => {
            let date = parse_optional_date(date.as_deref())?.unwrap_or_else(today);
            let visit = session.record_visit(visitor, exhibit, date)?;
            println!("✓ Visit recorded with id={}", visit.id);
            Ok(())
        }
        Commands::Ticket {
            command:
                TicketCommand::Sell {
                    visitor,
                    ticket_type,
                    price,
                },
        } => {
            let ticket = session.sell_ticket(visitor, &ticket_type, parse_price(&price)?)?;
            println!(
                "✓ Ticket purchase recorded with id={} ({} at {})",
                ticket.id,
                ticket.ticket_type,
                ticket.price_display()
            );
            Ok(())
        }
        Commands::Feedback {
            command:
                FeedbackCommand::Add {
                    visitor,
                    exhibit,
                    rating,
                    comments,
                },
        } => {
            let feedback =
                session.leave_feedback(visitor, exhibit, rating, optional(comments.as_deref()))?;
            println!("✓ Feedback recorded with id={}", feedback.id);
            Ok(())
        }
        Commands::Conservation { command } => cmd_conservation(&session, command),
        Commands::Report => {
            let db = session.load_for(Action::ViewReports)?;
            print_report(&Report::build(&db, today()));
            Ok(())
        }
        Commands::Forecast { months } => {
            let db = session.load_for(Action::ViewReports)?;
            let series = museum_core::analytics::monthly_visit_counts(&db);
            let points = seasonal_naive_forecast(&series, months);
            if points.is_empty() {
                println!("No visit history to forecast from.");
            }
            for point in points {
                println!(
                    "{}: {} ({})",
                    point.month, point.predicted_visits, point.method
                );
            }
            Ok(())
        }
        Commands::Import {
            command: ImportCommand::Artefacts { path },
        } => {
            session.guard(Action::ImportArtefacts)?;
            let count = Database::update(&session.db_path, |db| import_artefacts_csv(db, &path))?;
            println!("✓ Imported {} artefacts", count);
            Ok(())
        }
        Commands::Export {
            command: ExportCommand::Visits { path },
        } => {
            let db = session.load_for(Action::ExportVisits)?;
            let count = export_visits_csv(&db, &path)?;
            println!("✓ Exported {} visits to {}", count, path.display());
            Ok(())
        }
        Commands::User {
            command:
                UserCommand::Add {
                    username,
                    role,
                    new_password,
                },
        } => {
            session.guard(Action::ManageUsers)?;
            let role: Role = role.parse()?;
            let password = match new_password {
                Some(p) => p,
                None => prompt.ask_secret("New user's password: ")?,
            };
            let user = Database::update(&session.db_path, |db| {
                db.create_user(&username, &password, role)
            })?;
            println!("✓ User {} created ({})", user.username, user.role);
            Ok(())
        }
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

fn cmd_init(db_path: &Path, config: &Config) -> Result<()> {
    let created = Database::update(db_path, |db| seed_default_admin(db, &config.security))?;
    if created {
        println!(
            "✓ Created admin user '{}' in {}",
            config.security.admin_username,
            db_path.display()
        );
    } else {
        println!(
            "Admin user '{}' already exists in {}",
            config.security.admin_username,
            db_path.display()
        );
    }
    Ok(())
}

fn login(
    db_path: &Path,
    username: Option<String>,
    password: Option<String>,
    prompt: &mut Prompt<impl std::io::BufRead>,
) -> Result<Actor> {
    let db = Database::load(db_path)?;
    if db.users().is_empty() {
        return Err(Error::Store(format!(
            "No staff accounts in {}; run `heritage init` first",
            db_path.display()
        )));
    }

    let username = match username {
        Some(u) => u,
        None => {
            println!("=== HeritagePlus Museum System ===");
            prompt.ask("Username: ")?
        }
    };
    let password = match password {
        Some(p) => p,
        None => prompt.ask_secret("Password: ")?,
    };
    authenticate(&db, &username, &password)
}

/// An authenticated user working against one database file
pub struct Session {
    db_path: PathBuf,
    policy: AccessPolicy,
    actor: Actor,
}

impl Session {
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn guard(&self, action: Action) -> Result<()> {
        self.policy.check(&self.actor, action)
    }

    /// Read the database after checking the actor may perform `action`
    pub fn load_for(&self, action: Action) -> Result<Database> {
        self.guard(action)?;
        Database::load(&self.db_path)
    }

    pub fn add_artefact(&self, new: NewArtefact) -> Result<Artefact> {
        self.guard(Action::AddArtefact)?;
        Database::update(&self.db_path, |db| db.create_artefact(new))
    }

    pub fn add_exhibit(&self, new: NewExhibit) -> Result<Exhibit> {
        self.guard(Action::AddExhibit)?;
        Database::update(&self.db_path, |db| db.create_exhibit(new))
    }

    pub fn link_artefact(&self, artefact_id: u64, exhibit_id: u64) -> Result<()> {
        self.guard(Action::LinkArtefact)?;
        Database::update(&self.db_path, |db| {
            db.link_artefact_to_exhibit(artefact_id, exhibit_id)
        })
    }

    pub fn add_visitor(&self, new: NewVisitor) -> Result<Visitor> {
        self.guard(Action::AddVisitor)?;
        Database::update(&self.db_path, |db| db.create_visitor(new))
    }

    pub fn record_visit(
        &self,
        visitor_id: u64,
        exhibit_id: u64,
        date: chrono::NaiveDate,
    ) -> Result<Visit> {
        self.guard(Action::RecordVisit)?;
        Database::update(&self.db_path, |db| {
            db.record_visit(visitor_id, exhibit_id, date)
        })
    }

    pub fn sell_ticket(
        &self,
        visitor_id: u64,
        ticket_type: &str,
        price_pence: u64,
    ) -> Result<TicketPurchase> {
        self.guard(Action::SellTicket)?;
        Database::update(&self.db_path, |db| {
            db.record_ticket_purchase(visitor_id, ticket_type, price_pence, today())
        })
    }

    pub fn leave_feedback(
        &self,
        visitor_id: u64,
        exhibit_id: u64,
        rating: i64,
        comments: Option<String>,
    ) -> Result<Feedback> {
        self.guard(Action::LeaveFeedback)?;
        Database::update(&self.db_path, |db| {
            db.record_feedback(visitor_id, exhibit_id, rating, comments)
        })
    }

    pub fn add_conservation(&self, new: NewConservationRecord) -> Result<ConservationRecord> {
        self.guard(Action::AddConservation)?;
        Database::update(&self.db_path, |db| db.add_conservation_record(new))
    }
}

fn cmd_artefact(session: &Session, command: ArtefactCommand) -> Result<()> {
    match command {
        ArtefactCommand::Add {
            name,
            description,
            material,
            acquired,
        } => {
            let artefact = session.add_artefact(NewArtefact {
                name,
                description: optional(description.as_deref()),
                material: optional(material.as_deref()),
                acquisition_date: parse_optional_date(acquired.as_deref())?,
            })?;
            println!("✓ Artefact created with id={}", artefact.id);
        }
        ArtefactCommand::List => {
            let db = session.load_for(Action::ListRecords)?;
            for a in db.artefacts() {
                println!(
                    "{:>4}  {}  [{}]  last conserved: {}",
                    a.id,
                    a.name,
                    a.material.as_deref().unwrap_or("-"),
                    a.last_conservation_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "never".into())
                );
            }
        }
        ArtefactCommand::Delete { id } => {
            session.guard(Action::DeleteRecords)?;
            let artefact = Database::update(&session.db_path, |db| db.delete_artefact(id))?;
            println!("✓ Deleted artefact {} ({})", artefact.id, artefact.name);
        }
    }
    Ok(())
}

fn cmd_exhibit(session: &Session, command: ExhibitCommand) -> Result<()> {
    match command {
        ExhibitCommand::Add { title, start, end } => {
            let exhibit = session.add_exhibit(NewExhibit {
                title,
                start_date: parse_optional_date(start.as_deref())?,
                end_date: parse_optional_date(end.as_deref())?,
            })?;
            println!("✓ Exhibit created with id={}", exhibit.id);
        }
        ExhibitCommand::List => {
            let db = session.load_for(Action::ListRecords)?;
            for e in db.exhibits() {
                let dates = match (e.start_date, e.end_date) {
                    (Some(s), Some(end)) => format!("{} to {}", s, end),
                    (Some(s), None) => format!("from {}", s),
                    (None, Some(end)) => format!("until {}", end),
                    (None, None) => "undated".into(),
                };
                println!(
                    "{:>4}  {}  ({}, {} artefacts)",
                    e.id,
                    e.title,
                    dates,
                    db.artefacts_in_exhibit(e.id).len()
                );
            }
        }
        ExhibitCommand::Link { artefact, exhibit } => {
            session.link_artefact(artefact, exhibit)?;
            println!("✓ Linked artefact {} to exhibit {}", artefact, exhibit);
        }
        ExhibitCommand::Delete { id } => {
            session.guard(Action::DeleteRecords)?;
            let exhibit = Database::update(&session.db_path, |db| db.delete_exhibit(id))?;
            println!("✓ Deleted exhibit {} ({})", exhibit.id, exhibit.title);
        }
    }
    Ok(())
}

fn cmd_visitor(session: &Session, command: VisitorCommand) -> Result<()> {
    match command {
        VisitorCommand::Add {
            name,
            email,
            age_band,
            region,
            membership,
        } => {
            let visitor = session.add_visitor(NewVisitor {
                full_name: name,
                email,
                age_band: optional(age_band.as_deref()),
                region: optional(region.as_deref()),
                membership_type: optional(membership.as_deref()),
            })?;
            println!("✓ Visitor created with id={}", visitor.id);
        }
        VisitorCommand::List => {
            let db = session.load_for(Action::ListRecords)?;
            for v in db.visitors() {
                println!(
                    "{:>4}  {} <{}>  {}",
                    v.id,
                    v.full_name,
                    v.email,
                    v.membership_type.as_deref().unwrap_or("")
                );
            }
        }
        VisitorCommand::Delete { id } => {
            session.guard(Action::DeleteRecords)?;
            let visitor = Database::update(&session.db_path, |db| db.delete_visitor(id))?;
            println!("✓ Deleted visitor {} ({})", visitor.id, visitor.full_name);
        }
    }
    Ok(())
}

fn cmd_conservation(session: &Session, command: ConservationCommand) -> Result<()> {
    match command {
        ConservationCommand::Add {
            artefact,
            condition,
            treatment,
            due,
            notes,
        } => {
            let record = session.add_conservation(NewConservationRecord {
                artefact_id: artefact,
                condition,
                treatment: optional(treatment.as_deref()),
                due_date: parse_optional_date(due.as_deref())?,
                notes: optional(notes.as_deref()),
            })?;
            println!("✓ Conservation record created with id={}", record.id);
        }
        ConservationCommand::List { within_days } => {
            let db = session.load_for(Action::ListRecords)?;
            let due = conservation_due_soon(&db, today(), within_days);
            if due.is_empty() {
                println!("Nothing due in the next {} days.", within_days);
            }
            for row in due {
                println!(
                    "{}: due {} (condition: {})",
                    row.name, row.due_date, row.condition
                );
            }
        }
    }
    Ok(())
}

pub fn print_report(report: &Report) {
    println!("\n-- Top exhibits by visits --");
    for row in &report.visits_by_exhibit {
        println!("{}: {}", row.title, row.visit_count);
    }

    println!("\n-- Top visitors --");
    for row in &report.top_visitors {
        println!("{} ({}): {}", row.full_name, row.email, row.visits);
    }

    println!("\n-- Average rating by exhibit --");
    for row in &report.ratings {
        println!(
            "{}: {:.2} ({} reviews)",
            row.title, row.avg_rating, row.num_feedback
        );
    }

    println!("\n-- Conservation due in 30 days --");
    for row in &report.conservation_due {
        println!(
            "{}: due {} (condition: {})",
            row.name, row.due_date, row.condition
        );
    }

    println!("\n-- Forecast (next 3 months visits) --");
    for point in &report.forecast {
        println!(
            "{}: {} ({})",
            point.month, point.predicted_visits, point.method
        );
    }
}
