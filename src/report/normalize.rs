use log::info;
use serde::Serialize;

use crate::collector::types::Permission;
use crate::collector::RunContext;

/// One (organization, repository, collaborator) row of the report.
///
/// `enterprise` is present only for enterprise runs and `saml_identity` only
/// when SAML enrichment applied to the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlattenedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    pub organization: String,
    pub repository: String,
    pub name: Option<String>,
    pub login: String,
    #[serde(rename = "samlIdentity", skip_serializing_if = "Option::is_none")]
    pub saml_identity: Option<String>,
    pub permission: Permission,
}

impl FlattenedRecord {
    /// Present fields as (column, value) pairs, in output order.
    ///
    /// A missing display name is rendered as an empty value, not `null`. The
    /// JSON output keeps it as `null`.
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        let mut columns = Vec::with_capacity(7);
        if let Some(enterprise) = &self.enterprise {
            columns.push(("enterprise", enterprise.clone()));
        }
        columns.push(("organization", self.organization.clone()));
        columns.push(("repository", self.repository.clone()));
        columns.push(("name", self.name.clone().unwrap_or_default()));
        columns.push(("login", self.login.clone()));
        if let Some(saml_identity) = &self.saml_identity {
            columns.push(("samlIdentity", saml_identity.clone()));
        }
        columns.push(("permission", self.permission.to_string()));
        columns
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub saml_identities: bool,
}

/// Flattens the collected results into report rows.
///
/// Rows follow organization order, then repository insertion order, then
/// collaborator order. Repositories without collaborators produce no rows.
pub fn normalize(context: &RunContext, options: NormalizeOptions) -> Vec<FlattenedRecord> {
    info!("⚛  Normalizing result.");
    let mut records = Vec::new();

    for (organization, result) in &context.results {
        let Some(result) = result else {
            continue;
        };

        let saml = if options.saml_identities {
            if result.saml.is_none() {
                info!(
                    "⏸  No SAML Identities found for {organization}, SAML SSO is either not configured or no member accounts are linked to your SAML IdP"
                );
            }
            result.saml.as_ref()
        } else {
            None
        };

        for repository in &result.repositories {
            for collaborator in &repository.collaborators {
                let saml_identity = saml.map(|page| {
                    page.name_id_for(&collaborator.login)
                        .unwrap_or_default()
                        .to_string()
                });

                records.push(FlattenedRecord {
                    enterprise: context.enterprise.clone(),
                    organization: organization.clone(),
                    repository: repository.name.clone(),
                    name: collaborator.name.clone(),
                    login: collaborator.login.clone(),
                    saml_identity,
                    permission: collaborator.permission,
                });
            }
        }
    }

    records
}
