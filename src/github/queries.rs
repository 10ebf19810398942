//! Fixed GraphQL documents used by the collector, with their variables and
//! response shapes.

use serde::{Deserialize, Serialize};

use super::executor::{execute_query, GraphQLExecutor};
use crate::collector::types::Permission;
use crate::error::{AuditError, Result};

/// Returned when the token lacks push access to an archived repository.
pub const ARCHIVED_REPOSITORY_MESSAGE: &str =
    "Must have push access to view repository collaborators.";

/// Returned when the token is not authorized for a SAML-enforced organization.
pub const SAML_ENFORCEMENT_MESSAGE: &str = "Resource protected by organization SAML enforcement. You must grant your personal token access to this organization.";

pub const DEFAULT_COLLABORATORS_PAGE_SIZE: u32 = 100;

/// One repository per call; the repository cursor stays pinned while the
/// collaborator axis is drained.
pub const ORGANIZATION_QUERY: &str = r#"
query OrganizationCollaborators($organization: String!, $collaboratorsCursor: String, $repositoriesCursor: String, $collaboratorsPageSize: Int!) {
  organization(login: $organization) {
    repositories(first: 1, after: $repositoriesCursor) {
      pageInfo {
        startCursor
        endCursor
        hasNextPage
      }
      nodes {
        name
        collaborators(first: $collaboratorsPageSize, after: $collaboratorsCursor, affiliation: ALL) {
          pageInfo {
            endCursor
            hasNextPage
          }
          edges {
            node {
              name
              login
            }
            permission
          }
        }
      }
    }
  }
}
"#;

pub const SAML_QUERY: &str = r#"
query OrganizationSamlIdentities($organization: String!, $samlCursor: String) {
  organization(login: $organization) {
    samlIdentityProvider {
      externalIdentities(first: 100, after: $samlCursor) {
        pageInfo {
          startCursor
          endCursor
          hasNextPage
        }
        edges {
          node {
            samlIdentity {
              nameId
            }
            user {
              login
            }
          }
        }
      }
    }
  }
}
"#;

/// Single page of member organizations; see [`fetch_enterprise_organizations`].
pub const ENTERPRISE_QUERY: &str = r#"
query EnterpriseOrganizations($enterprise: String!) {
  enterprise(slug: $enterprise) {
    organizations(first: 100) {
      pageInfo {
        hasNextPage
      }
      nodes {
        login
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationVariables<'a> {
    pub organization: &'a str,
    pub collaborators_cursor: Option<&'a str>,
    pub repositories_cursor: Option<&'a str>,
    pub collaborators_page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlVariables<'a> {
    pub organization: &'a str,
    pub saml_cursor: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct EnterpriseVariables<'a> {
    pub enterprise: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationData {
    pub organization: Option<OrganizationNode>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationNode {
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode {
    pub name: String,
    pub collaborators: Option<CollaboratorConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<CollaboratorEdgeNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollaboratorEdgeNode {
    pub node: UserNode,
    pub permission: Permission,
}

#[derive(Debug, Deserialize)]
pub struct UserNode {
    pub name: Option<String>,
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct SamlData {
    pub organization: Option<SamlOrganizationNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlOrganizationNode {
    pub saml_identity_provider: Option<SamlIdentityProviderNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlIdentityProviderNode {
    pub external_identities: ExternalIdentityConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentityConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub edges: Vec<ExternalIdentityEdge>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalIdentityEdge {
    pub node: ExternalIdentityNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentityNode {
    pub saml_identity: Option<SamlIdentityNode>,
    pub user: Option<LoginNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlIdentityNode {
    pub name_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct EnterpriseData {
    pub enterprise: Option<EnterpriseNode>,
}

#[derive(Debug, Deserialize)]
pub struct EnterpriseNode {
    pub organizations: EnterpriseOrganizationConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseOrganizationConnection {
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<LoginNode>,
}

/// Result of one organization query, with the two recoverable API failures
/// split out so callers match on them exhaustively.
#[derive(Debug)]
pub enum OrganizationPageOutcome {
    Page(RepositoryConnection),
    /// Collaborators of an archived repository could not be read. The cursor
    /// points past that repository.
    ArchivedRepository {
        repository: String,
        next_cursor: Option<String>,
    },
    /// The token is not authorized for this SAML-enforced organization.
    Unauthorized,
}

pub async fn fetch_organization_page<E>(
    executor: &E,
    organization: &str,
    collaborators_cursor: Option<&str>,
    repositories_cursor: Option<&str>,
    collaborators_page_size: u32,
) -> Result<OrganizationPageOutcome>
where
    E: GraphQLExecutor + ?Sized,
{
    let variables = OrganizationVariables {
        organization,
        collaborators_cursor,
        repositories_cursor,
        collaborators_page_size,
    };

    match execute_query::<_, _, OrganizationData>(
        executor,
        ORGANIZATION_QUERY,
        "OrganizationCollaborators",
        variables,
    )
    .await
    {
        Ok(data) => Ok(data.organization.map_or_else(
            || {
                OrganizationPageOutcome::Page(RepositoryConnection {
                    page_info: PageInfo::default(),
                    nodes: Vec::new(),
                })
            },
            |org| OrganizationPageOutcome::Page(org.repositories),
        )),
        Err(error) => classify_failure(error),
    }
}

/// Maps the two sentinel GraphQL messages onto their outcomes. Anything else
/// is returned unchanged as an error.
fn classify_failure(error: AuditError) -> Result<OrganizationPageOutcome> {
    let AuditError::GraphQL { messages, data } = error else {
        return Err(error);
    };

    if messages.iter().any(|m| m == SAML_ENFORCEMENT_MESSAGE) {
        return Ok(OrganizationPageOutcome::Unauthorized);
    }

    if messages.iter().any(|m| m == ARCHIVED_REPOSITORY_MESSAGE) {
        let skipped = data
            .clone()
            .and_then(|value| serde_json::from_value::<OrganizationData>(value).ok())
            .and_then(|data| data.organization)
            .and_then(|org| {
                let next_cursor = org.repositories.page_info.end_cursor;
                org.repositories
                    .nodes
                    .into_iter()
                    .next()
                    .map(|repo| (repo.name, next_cursor))
            });

        if let Some((repository, next_cursor)) = skipped {
            return Ok(OrganizationPageOutcome::ArchivedRepository {
                repository,
                next_cursor,
            });
        }
    }

    Err(AuditError::GraphQL { messages, data })
}

pub async fn fetch_saml_page<E>(
    executor: &E,
    organization: &str,
    saml_cursor: Option<&str>,
) -> Result<Option<ExternalIdentityConnection>>
where
    E: GraphQLExecutor + ?Sized,
{
    let data: SamlData = execute_query(
        executor,
        SAML_QUERY,
        "OrganizationSamlIdentities",
        SamlVariables {
            organization,
            saml_cursor,
        },
    )
    .await?;

    Ok(data
        .organization
        .and_then(|org| org.saml_identity_provider)
        .map(|provider| provider.external_identities))
}

/// Member organization logins of an enterprise.
///
/// Only the first 100 organizations are returned; `truncated` reports whether
/// the API had more.
pub async fn fetch_enterprise_organizations<E>(
    executor: &E,
    enterprise: &str,
) -> Result<(Vec<String>, bool)>
where
    E: GraphQLExecutor + ?Sized,
{
    let data: EnterpriseData = execute_query(
        executor,
        ENTERPRISE_QUERY,
        "EnterpriseOrganizations",
        EnterpriseVariables { enterprise },
    )
    .await?;

    let organizations = data.enterprise.map(|e| e.organizations).ok_or_else(|| {
        AuditError::InvalidInput(format!("Enterprise '{enterprise}' not found"))
    })?;

    let truncated = organizations.page_info.has_next_page;
    let logins = organizations.nodes.into_iter().map(|n| n.login).collect();

    Ok((logins, truncated))
}
