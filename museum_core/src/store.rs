//! On-disk museum database with file locking.
//!
//! The whole database is one JSON document. Reads take a shared lock on the
//! file; writers hold an exclusive lock on a sidecar `.lock` file for the
//! complete load-modify-save cycle and replace the document atomically.
//!
//! Relational rules (references, uniqueness, checks, cascades) are enforced
//! by the mutating methods on [`Database`], which are the only way to change
//! the tables.

use crate::access::{CredentialRecord, CredentialStore};
use crate::config::SecurityConfig;
use crate::passwords::hash_password;
use crate::validate::{validate_email, validate_rating};
use crate::{
    Artefact, ConservationRecord, Error, Exhibit, ExhibitArtefact, Feedback, Result, Role,
    TicketPurchase, User, Visit, Visitor,
};
use chrono::{NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Last id handed out per table. Ids are never reused, even after deletes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct IdCounters {
    artefact: u64,
    exhibit: u64,
    visitor: u64,
    visit: u64,
    ticket: u64,
    feedback: u64,
    conservation: u64,
    user: u64,
}

fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

/// Fields supplied when cataloguing an artefact
#[derive(Clone, Debug, Default)]
pub struct NewArtefact {
    pub name: String,
    pub description: Option<String>,
    pub material: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default)]
pub struct NewExhibit {
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default)]
pub struct NewVisitor {
    pub full_name: String,
    pub email: String,
    pub age_band: Option<String>,
    pub region: Option<String>,
    pub membership_type: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewConservationRecord {
    pub artefact_id: u64,
    pub condition: String,
    pub treatment: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// All museum tables
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    next_ids: IdCounters,
    #[serde(default)]
    artefacts: Vec<Artefact>,
    #[serde(default)]
    exhibits: Vec<Exhibit>,
    #[serde(default)]
    exhibit_artefacts: Vec<ExhibitArtefact>,
    #[serde(default)]
    visitors: Vec<Visitor>,
    #[serde(default)]
    visits: Vec<Visit>,
    #[serde(default)]
    tickets: Vec<TicketPurchase>,
    #[serde(default)]
    feedback: Vec<Feedback>,
    #[serde(default)]
    conservation_records: Vec<ConservationRecord>,
    #[serde(default)]
    users: Vec<User>,
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

// ============================================================================
// Persistence
// ============================================================================

impl Database {
    /// Load the database from a file with shared locking
    ///
    /// Returns an empty database if the file doesn't exist. A file that
    /// exists but cannot be parsed is an error; it is never replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No database at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let db = serde_json::from_str::<Database>(&contents)
            .map_err(|e| Error::Store(format!("Failed to parse database {:?}: {}", path, e)))?;
        tracing::debug!("Loaded database from {:?}", path);
        Ok(db)
    }

    /// Save the database to a file
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved database to {:?}", path);
        Ok(())
    }

    /// Load, modify and save under an exclusive lock.
    ///
    /// Concurrent writers (other processes included) are serialised. If `f`
    /// fails, nothing is written and its error is returned.
    pub fn update<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        lock.lock_exclusive()?;

        let mut db = Self::load(path)?;
        let out = f(&mut db)?;
        db.save(path)?;

        lock.unlock()?;
        Ok(out)
    }
}

// ============================================================================
// Read access
// ============================================================================

impl Database {
    pub fn artefacts(&self) -> &[Artefact] {
        &self.artefacts
    }

    pub fn exhibits(&self) -> &[Exhibit] {
        &self.exhibits
    }

    pub fn exhibit_artefacts(&self) -> &[ExhibitArtefact] {
        &self.exhibit_artefacts
    }

    pub fn visitors(&self) -> &[Visitor] {
        &self.visitors
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn tickets(&self) -> &[TicketPurchase] {
        &self.tickets
    }

    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }

    pub fn conservation_records(&self) -> &[ConservationRecord] {
        &self.conservation_records
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn artefact(&self, id: u64) -> Result<&Artefact> {
        self.artefacts
            .iter()
            .find(|a| a.id == id)
            .ok_or(Error::NotFound { entity: "artefact", id })
    }

    pub fn exhibit(&self, id: u64) -> Result<&Exhibit> {
        self.exhibits
            .iter()
            .find(|e| e.id == id)
            .ok_or(Error::NotFound { entity: "exhibit", id })
    }

    pub fn visitor(&self, id: u64) -> Result<&Visitor> {
        self.visitors
            .iter()
            .find(|v| v.id == id)
            .ok_or(Error::NotFound { entity: "visitor", id })
    }

    /// Artefacts shown in an exhibit, in id order
    pub fn artefacts_in_exhibit(&self, exhibit_id: u64) -> Vec<&Artefact> {
        self.artefacts
            .iter()
            .filter(|a| {
                self.exhibit_artefacts
                    .iter()
                    .any(|l| l.exhibit_id == exhibit_id && l.artefact_id == a.id)
            })
            .collect()
    }

    fn require_reference<T>(found: Result<T>, what: &str) -> Result<T> {
        found.map_err(|e| match e {
            Error::NotFound { entity, id } => {
                Error::Integrity(format!("{} refers to unknown {} {}", what, entity, id))
            }
            other => other,
        })
    }
}

// ============================================================================
// Writes
// ============================================================================

impl Database {
    pub fn create_artefact(&mut self, new: NewArtefact) -> Result<Artefact> {
        let name = non_blank(&new.name, "Name")?;
        let artefact = Artefact {
            id: next_id(&mut self.next_ids.artefact),
            name,
            description: new.description,
            material: new.material,
            acquisition_date: new.acquisition_date,
            last_conservation_date: None,
        };
        tracing::info!("Created artefact {} ({})", artefact.id, artefact.name);
        self.artefacts.push(artefact.clone());
        Ok(artefact)
    }

    pub fn create_exhibit(&mut self, new: NewExhibit) -> Result<Exhibit> {
        let title = non_blank(&new.title, "Title")?;
        if let (Some(start), Some(end)) = (new.start_date, new.end_date) {
            if end < start {
                return Err(Error::Integrity(format!(
                    "exhibit end date {} is before start date {}",
                    end, start
                )));
            }
        }
        let exhibit = Exhibit {
            id: next_id(&mut self.next_ids.exhibit),
            title,
            start_date: new.start_date,
            end_date: new.end_date,
        };
        tracing::info!("Created exhibit {} ({})", exhibit.id, exhibit.title);
        self.exhibits.push(exhibit.clone());
        Ok(exhibit)
    }

    pub fn link_artefact_to_exhibit(&mut self, artefact_id: u64, exhibit_id: u64) -> Result<()> {
        Self::require_reference(self.artefact(artefact_id), "link")?;
        Self::require_reference(self.exhibit(exhibit_id), "link")?;
        let link = ExhibitArtefact {
            exhibit_id,
            artefact_id,
        };
        if self.exhibit_artefacts.contains(&link) {
            return Err(Error::Integrity(format!(
                "artefact {} is already linked to exhibit {}",
                artefact_id, exhibit_id
            )));
        }
        self.exhibit_artefacts.push(link);
        tracing::info!("Linked artefact {} to exhibit {}", artefact_id, exhibit_id);
        Ok(())
    }

    pub fn create_visitor(&mut self, new: NewVisitor) -> Result<Visitor> {
        let full_name = non_blank(&new.full_name, "Full name")?;
        let email = new.email.trim().to_string();
        validate_email(&email)?;
        if self
            .visitors
            .iter()
            .any(|v| v.email.eq_ignore_ascii_case(&email))
        {
            return Err(Error::Integrity(format!(
                "a visitor with email {} already exists",
                email
            )));
        }
        let visitor = Visitor {
            id: next_id(&mut self.next_ids.visitor),
            full_name,
            email,
            age_band: new.age_band,
            region: new.region,
            membership_type: new.membership_type,
        };
        tracing::info!("Created visitor {}", visitor.id);
        self.visitors.push(visitor.clone());
        Ok(visitor)
    }

    /// Record a visit. Visits dated after today (UTC) are rejected.
    pub fn record_visit(
        &mut self,
        visitor_id: u64,
        exhibit_id: u64,
        visit_date: NaiveDate,
    ) -> Result<Visit> {
        Self::require_reference(self.visitor(visitor_id), "visit")?;
        Self::require_reference(self.exhibit(exhibit_id), "visit")?;
        if visit_date > Utc::now().date_naive() {
            return Err(Error::Integrity("visit_date cannot be in the future".into()));
        }
        let visit = Visit {
            id: next_id(&mut self.next_ids.visit),
            visitor_id,
            exhibit_id,
            visit_date,
        };
        tracing::info!(
            "Recorded visit {} (visitor {}, exhibit {}, {})",
            visit.id,
            visitor_id,
            exhibit_id,
            visit_date
        );
        self.visits.push(visit.clone());
        Ok(visit)
    }

    pub fn record_ticket_purchase(
        &mut self,
        visitor_id: u64,
        ticket_type: &str,
        price_pence: u64,
        purchase_date: NaiveDate,
    ) -> Result<TicketPurchase> {
        Self::require_reference(self.visitor(visitor_id), "ticket purchase")?;
        let ticket_type = match ticket_type.trim() {
            "" => "standard".to_string(),
            t => t.to_string(),
        };
        let ticket = TicketPurchase {
            id: next_id(&mut self.next_ids.ticket),
            visitor_id,
            ticket_type,
            price_pence,
            purchase_date,
        };
        tracing::info!(
            "Recorded ticket {} ({} at {})",
            ticket.id,
            ticket.ticket_type,
            ticket.price_display()
        );
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    pub fn record_feedback(
        &mut self,
        visitor_id: u64,
        exhibit_id: u64,
        rating: i64,
        comments: Option<String>,
    ) -> Result<Feedback> {
        let rating = validate_rating(rating)?;
        Self::require_reference(self.visitor(visitor_id), "feedback")?;
        Self::require_reference(self.exhibit(exhibit_id), "feedback")?;
        let feedback = Feedback {
            id: next_id(&mut self.next_ids.feedback),
            visitor_id,
            exhibit_id,
            rating,
            comments,
            submitted_at: Utc::now(),
        };
        tracing::info!("Recorded feedback {} for exhibit {}", feedback.id, exhibit_id);
        self.feedback.push(feedback.clone());
        Ok(feedback)
    }

    /// Add a conservation record and stamp the artefact's last conservation date
    pub fn add_conservation_record(
        &mut self,
        new: NewConservationRecord,
    ) -> Result<ConservationRecord> {
        let condition = non_blank(&new.condition, "Condition")?;
        Self::require_reference(self.artefact(new.artefact_id), "conservation record")?;

        let record = ConservationRecord {
            id: next_id(&mut self.next_ids.conservation),
            artefact_id: new.artefact_id,
            condition,
            treatment: new.treatment,
            due_date: new.due_date,
            notes: new.notes,
            recorded_at: Utc::now(),
        };
        if let Some(artefact) = self.artefacts.iter_mut().find(|a| a.id == record.artefact_id) {
            artefact.last_conservation_date = Some(record.recorded_at.date_naive());
        }
        tracing::info!(
            "Added conservation record {} for artefact {}",
            record.id,
            record.artefact_id
        );
        self.conservation_records.push(record.clone());
        Ok(record)
    }

    /// Create a staff user with a freshly hashed password
    pub fn create_user(&mut self, username: &str, password: &str, role: Role) -> Result<User> {
        let username = non_blank(username, "Username")?;
        if password.is_empty() {
            return Err(Error::Validation("Password is required".into()));
        }
        if self.users.iter().any(|u| u.username == username) {
            return Err(Error::Integrity(format!("user {} already exists", username)));
        }
        let user = User {
            id: next_id(&mut self.next_ids.user),
            username,
            password_hash: hash_password(password)?,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        };
        tracing::info!("Created user {} ({})", user.username, user.role);
        self.users.push(user.clone());
        Ok(user)
    }

    /// Delete an artefact with its conservation records and exhibit links
    pub fn delete_artefact(&mut self, id: u64) -> Result<Artefact> {
        let pos = self
            .artefacts
            .iter()
            .position(|a| a.id == id)
            .ok_or(Error::NotFound { entity: "artefact", id })?;
        let artefact = self.artefacts.remove(pos);
        self.conservation_records.retain(|r| r.artefact_id != id);
        self.exhibit_artefacts.retain(|l| l.artefact_id != id);
        tracing::info!("Deleted artefact {}", id);
        Ok(artefact)
    }

    /// Delete an exhibit with its artefact links, visits and feedback
    pub fn delete_exhibit(&mut self, id: u64) -> Result<Exhibit> {
        let pos = self
            .exhibits
            .iter()
            .position(|e| e.id == id)
            .ok_or(Error::NotFound { entity: "exhibit", id })?;
        let exhibit = self.exhibits.remove(pos);
        self.exhibit_artefacts.retain(|l| l.exhibit_id != id);
        self.visits.retain(|v| v.exhibit_id != id);
        self.feedback.retain(|f| f.exhibit_id != id);
        tracing::info!("Deleted exhibit {}", id);
        Ok(exhibit)
    }

    /// Delete a visitor with their visits, tickets and feedback
    pub fn delete_visitor(&mut self, id: u64) -> Result<Visitor> {
        let pos = self
            .visitors
            .iter()
            .position(|v| v.id == id)
            .ok_or(Error::NotFound { entity: "visitor", id })?;
        let visitor = self.visitors.remove(pos);
        self.visits.retain(|v| v.visitor_id != id);
        self.tickets.retain(|t| t.visitor_id != id);
        self.feedback.retain(|f| f.visitor_id != id);
        tracing::info!("Deleted visitor {}", id);
        Ok(visitor)
    }
}

fn non_blank(value: &str, field: &str) -> Result<String> {
    crate::validate::required(value, field)
}

impl CredentialStore for Database {
    fn find_credential(&self, username: &str) -> Option<CredentialRecord> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .map(|u| CredentialRecord {
                username: u.username.clone(),
                password_hash: u.password_hash.clone(),
                role: u.role.clone(),
            })
    }
}

/// Create the configured administrator if no user has that username.
///
/// Returns true if a user was created.
pub fn seed_default_admin(db: &mut Database, security: &SecurityConfig) -> Result<bool> {
    if db.find_credential(&security.admin_username).is_some() {
        tracing::debug!("Admin user {} already present", security.admin_username);
        return Ok(false);
    }
    db.create_user(&security.admin_username, &security.admin_password, Role::Admin)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::authenticate;
    use chrono::Duration;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn db_with_basics() -> (Database, u64, u64, u64) {
        let mut db = Database::default();
        let artefact = db
            .create_artefact(NewArtefact {
                name: "Bronze Age Torc".into(),
                material: Some("gold".into()),
                ..Default::default()
            })
            .unwrap();
        let exhibit = db
            .create_exhibit(NewExhibit {
                title: "Treasures".into(),
                ..Default::default()
            })
            .unwrap();
        let visitor = db
            .create_visitor(NewVisitor {
                full_name: "Alice".into(),
                email: "alice@example.com".into(),
                ..Default::default()
            })
            .unwrap();
        (db, artefact.id, exhibit.id, visitor.id)
    }

    #[test]
    fn test_ids_are_sequential_and_not_reused() {
        let (mut db, first, _, _) = db_with_basics();
        db.delete_artefact(first).unwrap();
        let next = db
            .create_artefact(NewArtefact {
                name: "Amphora".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(next.id, 2);
    }

    #[test]
    fn test_future_visit_rejected() {
        let (mut db, _, exhibit, visitor) = db_with_basics();
        let err = db
            .record_visit(visitor, exhibit, today() + Duration::days(2))
            .unwrap_err();
        assert!(err.to_string().to_lowercase().contains("future"));
        assert!(db.visits().is_empty());

        assert!(db.record_visit(visitor, exhibit, today()).is_ok());
    }

    #[test]
    fn test_visit_requires_existing_references() {
        let (mut db, _, exhibit, visitor) = db_with_basics();
        assert!(matches!(
            db.record_visit(99, exhibit, today()),
            Err(Error::Integrity(_))
        ));
        assert!(matches!(
            db.record_visit(visitor, 99, today()),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (mut db, _, _, _) = db_with_basics();
        let err = db
            .create_visitor(NewVisitor {
                full_name: "Other Alice".into(),
                email: "ALICE@example.com".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));

        let err = db
            .create_visitor(NewVisitor {
                full_name: "Bob".into(),
                email: "not-an-email".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_exhibit_date_check() {
        let mut db = Database::default();
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let err = db
            .create_exhibit(NewExhibit {
                title: "Backwards".into(),
                start_date: Some(start),
                end_date: Some(start - Duration::days(1)),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));

        assert!(db
            .create_exhibit(NewExhibit {
                title: "One day".into(),
                start_date: Some(start),
                end_date: Some(start),
            })
            .is_ok());
    }

    #[test]
    fn test_feedback_rating_range() {
        let (mut db, _, exhibit, visitor) = db_with_basics();
        assert!(matches!(
            db.record_feedback(visitor, exhibit, 6, None),
            Err(Error::Validation(_))
        ));
        let fb = db
            .record_feedback(visitor, exhibit, 4, Some("Lovely".into()))
            .unwrap();
        assert_eq!(fb.rating, 4);
    }

    #[test]
    fn test_conservation_updates_artefact() {
        let (mut db, artefact, _, _) = db_with_basics();
        assert!(db.artefact(artefact).unwrap().last_conservation_date.is_none());

        let record = db
            .add_conservation_record(NewConservationRecord {
                artefact_id: artefact,
                condition: "Fair".into(),
                treatment: Some("Surface clean".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            db.artefact(artefact).unwrap().last_conservation_date,
            Some(record.recorded_at.date_naive())
        );

        assert!(matches!(
            db.add_conservation_record(NewConservationRecord {
                artefact_id: 42,
                condition: "Poor".into(),
                ..Default::default()
            }),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_link_artefact_rejects_duplicates() {
        let (mut db, artefact, exhibit, _) = db_with_basics();
        db.link_artefact_to_exhibit(artefact, exhibit).unwrap();
        assert!(db.link_artefact_to_exhibit(artefact, exhibit).is_err());
        assert_eq!(db.artefacts_in_exhibit(exhibit).len(), 1);
    }

    #[test]
    fn test_delete_cascades() {
        let (mut db, artefact, exhibit, visitor) = db_with_basics();
        db.link_artefact_to_exhibit(artefact, exhibit).unwrap();
        db.record_visit(visitor, exhibit, today()).unwrap();
        db.record_feedback(visitor, exhibit, 5, None).unwrap();
        db.record_ticket_purchase(visitor, "Adult", 1200, today()).unwrap();

        db.delete_exhibit(exhibit).unwrap();
        assert!(db.exhibit_artefacts().is_empty());
        assert!(db.visits().is_empty());
        assert!(db.feedback().is_empty());
        assert_eq!(db.tickets().len(), 1);

        db.delete_visitor(visitor).unwrap();
        assert!(db.tickets().is_empty());

        assert!(matches!(
            db.delete_visitor(visitor),
            Err(Error::NotFound { entity: "visitor", .. })
        ));
    }

    #[test]
    fn test_blank_ticket_type_defaults_to_standard() {
        let (mut db, _, _, visitor) = db_with_basics();
        let ticket = db.record_ticket_purchase(visitor, "  ", 0, today()).unwrap();
        assert_eq!(ticket.ticket_type, "standard");
    }

    #[test]
    fn test_seed_default_admin_is_idempotent() {
        let mut db = Database::default();
        let security = SecurityConfig::default();

        assert!(seed_default_admin(&mut db, &security).unwrap());
        assert!(!seed_default_admin(&mut db, &security).unwrap());
        assert_eq!(db.users().len(), 1);

        let actor = authenticate(&db, "admin", "admin123").unwrap();
        assert_eq!(actor.role, Role::Admin);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("museum.json");

        let (db, artefact, _, _) = db_with_basics();
        db.save(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.artefacts().len(), 1);
        assert_eq!(loaded.artefact(artefact).unwrap().name, "Bronze Age Torc");
        assert_eq!(loaded.visitors()[0].email, "alice@example.com");
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(db.artefacts().is_empty());
        assert!(db.users().is_empty());
    }

    #[test]
    fn test_corrupted_database_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("museum.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(Database::load(&path), Err(Error::Store(_))));
        // The corrupt file is left for inspection
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ invalid json }");
    }

    #[test]
    fn test_update_persists_and_returns_value() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("museum.json");

        let created = Database::update(&path, |db| {
            db.create_artefact(NewArtefact {
                name: "Mask".into(),
                ..Default::default()
            })
        })
        .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(Database::load(&path).unwrap().artefacts().len(), 1);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("museum.json");

        let result = Database::update(&path, |db| {
            db.create_artefact(NewArtefact {
                name: "Kept in memory only".into(),
                ..Default::default()
            })?;
            db.create_artefact(NewArtefact::default())
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_updates_are_serialised() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("museum.json");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    Database::update(&path, |db| {
                        db.create_artefact(NewArtefact {
                            name: format!("Artefact {}", i),
                            ..Default::default()
                        })
                    })
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let db = Database::load(&path).unwrap();
        assert_eq!(db.artefacts().len(), 8);
        let mut ids: Vec<u64> = db.artefacts().iter().map(|a| a.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("museum.json");
        Database::default().save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "museum.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only museum.json, found extras: {:?}",
            extras
        );
    }
}
