use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Repository permission level as reported by the GraphQL API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admin => "ADMIN",
            Self::Maintain => "MAINTAIN",
            Self::Write => "WRITE",
            Self::Triage => "TRIAGE",
            Self::Read => "READ",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaboratorEdge {
    pub name: Option<String>,
    pub login: String,
    pub permission: Permission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub collaborators: Vec<CollaboratorEdge>,
    /// Set once the last collaborator page for this repository was merged.
    pub collaborators_complete: bool,
}

impl RepositoryRecord {
    pub fn new(name: String, collaborators: Vec<CollaboratorEdge>) -> Self {
        Self {
            name,
            collaborators,
            collaborators_complete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamlIdentity {
    pub login: String,
    pub name_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SamlIdentityPage {
    pub identities: Vec<SamlIdentity>,
}

impl SamlIdentityPage {
    /// Looks up the nameId linked to `login`.
    ///
    /// Every identity is scanned and the last match wins, so a login linked
    /// twice resolves to its most recent identity in page order.
    pub fn name_id_for(&self, login: &str) -> Option<&str> {
        self.identities
            .iter()
            .rev()
            .find(|identity| identity.login == login)
            .map(|identity| identity.name_id.as_str())
    }
}

/// Everything collected for one organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationResult {
    pub login: String,
    pub repositories: Vec<RepositoryRecord>,
    pub saml: Option<SamlIdentityPage>,
}

impl OrganizationResult {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            repositories: Vec::new(),
            saml: None,
        }
    }

    pub fn last_repository_mut(&mut self) -> Option<&mut RepositoryRecord> {
        self.repositories.last_mut()
    }

    pub fn collaborator_count(&self) -> usize {
        self.repositories.iter().map(|r| r.collaborators.len()).sum()
    }
}

/// Per-run state owned by the orchestration loop.
///
/// Results are keyed by organization login in the order organizations were
/// processed. `None` marks an organization that yielded nothing.
#[derive(Debug, Default)]
pub struct RunContext {
    pub enterprise: Option<String>,
    pub results: IndexMap<String, Option<OrganizationResult>>,
}

impl RunContext {
    pub fn new(enterprise: Option<String>) -> Self {
        Self {
            enterprise,
            results: IndexMap::new(),
        }
    }
}
