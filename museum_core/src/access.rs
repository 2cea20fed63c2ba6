//! Authentication and role-based authorization.
//!
//! Authentication checks a username/password against a [`CredentialStore`]
//! and yields an [`Actor`]. Authorization checks an actor's role against the
//! roles an [`AccessPolicy`] permits for an [`Action`].

use crate::passwords::{hash_password, verify_password};
use crate::{Error, Result, Role};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An authenticated caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }
}

/// What a credential store returns for a username
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// Username lookup capability used by [`authenticate`]
pub trait CredentialStore {
    fn find_credential(&self, username: &str) -> Option<CredentialRecord>;
}

/// Checked in place of a stored hash when the username is unknown, so
/// unknown users cost the same verify as real ones
static UNKNOWN_USER_HASH: Lazy<String> =
    Lazy::new(|| hash_password("unknown-user-placeholder").unwrap_or_default());

/// Verify a username and password.
///
/// Unknown users, wrong passwords, malformed stored hashes and unknown stored
/// roles all produce the same [`Error::AuthenticationFailed`].
pub fn authenticate<S: CredentialStore + ?Sized>(
    store: &S,
    username: &str,
    password: &str,
) -> Result<Actor> {
    let actor = match store.find_credential(username) {
        Some(record) => {
            if verify_password(password, &record.password_hash) {
                record
                    .role
                    .parse::<Role>()
                    .ok()
                    .map(|role| Actor::new(record.username, role))
            } else {
                None
            }
        }
        None => {
            verify_password(password, &UNKNOWN_USER_HASH);
            None
        }
    };

    match actor {
        Some(actor) => {
            tracing::info!("Authenticated {} ({})", actor.username, actor.role);
            Ok(actor)
        }
        None => {
            tracing::warn!("Failed login attempt");
            Err(Error::AuthenticationFailed)
        }
    }
}

/// Fail with [`Error::PermissionDenied`] unless the actor's role is allowed
pub fn require_role(actor: &Actor, allowed: &BTreeSet<Role>) -> Result<()> {
    if allowed.contains(&actor.role) {
        return Ok(());
    }
    tracing::debug!(
        "Denied {} ({}); requires one of {:?}",
        actor.username,
        actor.role,
        allowed
    );
    Err(Error::PermissionDenied {
        required: allowed.iter().copied().collect(),
        actual: actor.role,
    })
}

// ============================================================================
// Access Policy
// ============================================================================

/// Every guarded operation in the system
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AddArtefact,
    LinkArtefact,
    AddExhibit,
    AddVisitor,
    RecordVisit,
    SellTicket,
    LeaveFeedback,
    AddConservation,
    ViewReports,
    ListRecords,
    ImportArtefacts,
    ExportVisits,
    DeleteRecords,
    ManageUsers,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::AddArtefact,
        Action::LinkArtefact,
        Action::AddExhibit,
        Action::AddVisitor,
        Action::RecordVisit,
        Action::SellTicket,
        Action::LeaveFeedback,
        Action::AddConservation,
        Action::ViewReports,
        Action::ListRecords,
        Action::ImportArtefacts,
        Action::ExportVisits,
        Action::DeleteRecords,
        Action::ManageUsers,
    ];

    /// Roles allowed when the policy has no override
    pub fn default_roles(&self) -> BTreeSet<Role> {
        use Role::*;
        let roles: &[Role] = match self {
            Action::AddArtefact
            | Action::LinkArtefact
            | Action::AddExhibit
            | Action::AddConservation
            | Action::ViewReports
            | Action::ImportArtefacts
            | Action::ExportVisits => &[Admin, Curator],
            Action::AddVisitor | Action::RecordVisit | Action::SellTicket => &[Admin, FrontDesk],
            Action::LeaveFeedback | Action::ListRecords => &[Admin, Curator, FrontDesk],
            Action::DeleteRecords | Action::ManageUsers => &[Admin],
        };
        roles.iter().copied().collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::AddArtefact => "add_artefact",
            Action::LinkArtefact => "link_artefact",
            Action::AddExhibit => "add_exhibit",
            Action::AddVisitor => "add_visitor",
            Action::RecordVisit => "record_visit",
            Action::SellTicket => "sell_ticket",
            Action::LeaveFeedback => "leave_feedback",
            Action::AddConservation => "add_conservation",
            Action::ViewReports => "view_reports",
            Action::ListRecords => "list_records",
            Action::ImportArtefacts => "import_artefacts",
            Action::ExportVisits => "export_visits",
            Action::DeleteRecords => "delete_records",
            Action::ManageUsers => "manage_users",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from actions to permitted roles.
///
/// Deserializes from a TOML table such as `add_visitor = ["admin", "curator"]`;
/// actions not listed keep their default roles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy {
    overrides: BTreeMap<Action, BTreeSet<Role>>,
}

impl AccessPolicy {
    pub fn with_override(mut self, action: Action, roles: impl IntoIterator<Item = Role>) -> Self {
        self.overrides.insert(action, roles.into_iter().collect());
        self
    }

    /// Effective role set for an action
    pub fn roles_for(&self, action: Action) -> BTreeSet<Role> {
        self.overrides
            .get(&action)
            .cloned()
            .unwrap_or_else(|| action.default_roles())
    }

    pub fn allows(&self, actor: &Actor, action: Action) -> bool {
        self.roles_for(action).contains(&actor.role)
    }

    /// Fail with [`Error::PermissionDenied`] unless the actor may perform the action
    pub fn check(&self, actor: &Actor, action: Action) -> Result<()> {
        require_role(actor, &self.roles_for(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passwords::{hash_password_with, HashScheme};
    use std::collections::HashMap;

    struct MemoryStore(HashMap<String, CredentialRecord>);

    impl MemoryStore {
        fn with_user(username: &str, password: &str, role: &str) -> Self {
            let mut users = HashMap::new();
            users.insert(
                username.to_string(),
                CredentialRecord {
                    username: username.into(),
                    password_hash: hash_password_with(HashScheme::Pbkdf2, password).unwrap(),
                    role: role.into(),
                },
            );
            Self(users)
        }
    }

    impl CredentialStore for MemoryStore {
        fn find_credential(&self, username: &str) -> Option<CredentialRecord> {
            self.0.get(username).cloned()
        }
    }

    fn roles(list: &[Role]) -> BTreeSet<Role> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_authenticate_success() {
        let store = MemoryStore::with_user("real_user", "hunter2", "curator");
        let actor = authenticate(&store, "real_user", "hunter2").unwrap();
        assert_eq!(actor, Actor::new("real_user", Role::Curator));
    }

    #[test]
    fn test_unknown_user_still_verifies_a_hash() {
        let store = MemoryStore::with_user("real_user", "hunter2", "curator");
        assert!(matches!(
            authenticate(&store, "ghost", "hunter2"),
            Err(Error::AuthenticationFailed)
        ));
        let placeholder = Lazy::get(&UNKNOWN_USER_HASH).expect("placeholder hash was used");
        assert_eq!(HashScheme::of(placeholder), Some(HashScheme::preferred()));
        assert!(verify_password("unknown-user-placeholder", placeholder));
    }

    #[test]
    fn test_authentication_failures_are_indistinguishable() {
        let store = MemoryStore::with_user("real_user", "hunter2", "admin");

        let unknown = authenticate(&store, "nosuch", "x").unwrap_err();
        let wrong = authenticate(&store, "real_user", "wrong_password").unwrap_err();

        assert!(matches!(unknown, Error::AuthenticationFailed));
        assert!(matches!(wrong, Error::AuthenticationFailed));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_corrupt_credential_fails_authentication() {
        let mut store = MemoryStore::with_user("bob", "pw", "admin");
        store.0.get_mut("bob").unwrap().password_hash = "garbage$not-a-real-hash".into();
        assert!(matches!(
            authenticate(&store, "bob", "pw"),
            Err(Error::AuthenticationFailed)
        ));

        let store = MemoryStore::with_user("eve", "pw", "superuser");
        assert!(matches!(
            authenticate(&store, "eve", "pw"),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_require_role() {
        let allowed = roles(&[Role::Admin, Role::Curator]);

        let front_desk = Actor::new("a", Role::FrontDesk);
        match require_role(&front_desk, &allowed) {
            Err(Error::PermissionDenied { required, actual }) => {
                assert_eq!(required, vec![Role::Admin, Role::Curator]);
                assert_eq!(actual, Role::FrontDesk);
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }

        let admin = Actor::new("a", Role::Admin);
        assert!(require_role(&admin, &allowed).is_ok());
    }

    #[test]
    fn test_default_policy() {
        let policy = AccessPolicy::default();
        let curator = Actor::new("c", Role::Curator);
        let desk = Actor::new("d", Role::FrontDesk);

        assert!(policy.allows(&curator, Action::AddArtefact));
        assert!(!policy.allows(&desk, Action::AddArtefact));
        assert!(policy.allows(&desk, Action::SellTicket));
        assert!(!policy.allows(&curator, Action::SellTicket));
        assert!(policy.allows(&desk, Action::LeaveFeedback));
        assert!(!policy.allows(&curator, Action::DeleteRecords));
        assert!(policy.check(&desk, Action::ViewReports).is_err());
    }

    #[test]
    fn test_policy_override_from_toml() {
        let policy: AccessPolicy =
            toml::from_str(r#"add_visitor = ["admin", "front_desk", "curator"]"#).unwrap();
        let curator = Actor::new("c", Role::Curator);
        assert!(policy.allows(&curator, Action::AddVisitor));
        // Untouched actions keep defaults
        assert!(!policy.allows(&curator, Action::SellTicket));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::AddConservation.to_string(), "add_conservation");
        assert_eq!(Action::ALL.len(), 14);
    }
}
