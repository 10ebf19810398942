use log::{info, warn};

use super::types::{CollaboratorEdge, OrganizationResult, RepositoryRecord};
use super::Collector;
use crate::error::AuditError;
use crate::github::queries::{
    fetch_organization_page, CollaboratorConnection, OrganizationPageOutcome, PageInfo,
};
use crate::github::GraphQLExecutor;

/// Cursors for the two pagination axes of an organization crawl.
///
/// `tracked_repositories` is the repository cursor that was used to request
/// the repository currently being drained. Collaborator continuation pages
/// re-request that same position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorState {
    pub repositories: Option<String>,
    pub collaborators: Option<String>,
    pub tracked_repositories: Option<String>,
}

impl CursorState {
    fn next_collaborator_page(&mut self, end_cursor: String) {
        self.collaborators = Some(end_cursor);
        self.repositories = self.tracked_repositories.clone();
    }

    fn next_repository(&mut self, end_cursor: Option<String>) {
        self.collaborators = None;
        self.repositories = end_cursor;
    }
}

/// An organization crawl stopped by an API failure.
///
/// `partial` holds every repository merged before the failing request.
#[derive(Debug)]
pub struct Interrupted {
    pub partial: Option<OrganizationResult>,
    pub error: AuditError,
}

fn into_edges(connection: Option<CollaboratorConnection>) -> (Vec<CollaboratorEdge>, PageInfo) {
    let Some(connection) = connection else {
        return (Vec::new(), PageInfo::default());
    };

    let edges = connection
        .edges
        .into_iter()
        .map(|edge| CollaboratorEdge {
            name: edge.node.name,
            login: edge.node.login,
            permission: edge.permission,
        })
        .collect();

    (edges, connection.page_info)
}

impl<E> Collector<'_, E>
where
    E: GraphQLExecutor + ?Sized,
{
    /// Walks every repository of `organization` and every collaborator page
    /// of each repository, merging the pages into one result.
    ///
    /// Returns `Ok(None)` when the organization has no readable repositories
    /// or the token is not authorized for it. Archived repositories whose
    /// collaborators cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Any API failure other than the two recoverable ones above, returned as
    /// [`Interrupted`] together with the result collected so far.
    pub async fn collect(
        &self,
        organization: &str,
    ) -> Result<Option<OrganizationResult>, Interrupted> {
        let mut state = CursorState::default();
        let mut result: Option<OrganizationResult> = None;

        loop {
            let outcome = match fetch_organization_page(
                self.executor,
                organization,
                state.collaborators.as_deref(),
                state.repositories.as_deref(),
                self.collaborators_page_size,
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(error) => {
                    return Err(Interrupted {
                        partial: result,
                        error,
                    })
                }
            };

            let repositories = match outcome {
                OrganizationPageOutcome::Page(repositories) => repositories,
                OrganizationPageOutcome::ArchivedRepository {
                    repository,
                    next_cursor,
                } => {
                    info!("⏸  Skipping archived repository {repository}");
                    if next_cursor.is_none() {
                        warn!("No cursor past archived repository {repository}, stopping {organization}");
                        return Ok(result);
                    }
                    state.next_repository(next_cursor);
                    continue;
                }
                OrganizationPageOutcome::Unauthorized => {
                    info!("⏸  The token you use isn't authorized to be used with {organization}");
                    return Ok(None);
                }
            };

            let repository_page_info = repositories.page_info;
            let Some(current) = repositories.nodes.into_iter().next() else {
                if result.is_none() {
                    info!(
                        "⏸  No data found for {organization}, probably you don't have the right permission"
                    );
                }
                return Ok(result);
            };

            let (edges, collaborator_page_info) = into_edges(current.collaborators);
            let accumulated = result.get_or_insert_with(|| OrganizationResult::new(organization));

            match accumulated.last_repository_mut() {
                Some(last) if last.name == current.name => last.collaborators.extend(edges),
                previous => {
                    if let Some(previous) = previous {
                        previous.collaborators_complete = true;
                    }
                    state.tracked_repositories = state.repositories.clone();
                    accumulated
                        .repositories
                        .push(RepositoryRecord::new(current.name, edges));
                }
            }

            let Some(repository) = accumulated.last_repository_mut() else {
                return Ok(result);
            };

            if collaborator_page_info.has_next_page {
                if let Some(end_cursor) = collaborator_page_info.end_cursor {
                    info!(
                        "⏳ Still scanning {}, current member count: {}",
                        repository.name,
                        repository.collaborators.len()
                    );
                    state.next_collaborator_page(end_cursor);
                    continue;
                }
                warn!(
                    "Collaborator page for {} has no end cursor, treating it as complete",
                    repository.name
                );
            }

            repository.collaborators_complete = true;
            info!(
                "✅ Finished scanning {}, total number of members: {}",
                repository.name,
                repository.collaborators.len()
            );

            if repository_page_info.has_next_page {
                if repository_page_info.end_cursor.is_some() {
                    state.next_repository(repository_page_info.end_cursor);
                    continue;
                }
                warn!("Repository page for {organization} has no end cursor, stopping");
            }

            return Ok(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::Permission;
    use crate::github::executor::testing::{
        archived_failure, empty_repository_page, repository_page, saml_enforcement_failure,
        ScriptedExecutor,
    };

    fn collector(executor: &ScriptedExecutor) -> Collector<'_, ScriptedExecutor> {
        Collector::new(executor, 100)
    }

    fn names(result: &OrganizationResult) -> Vec<&str> {
        result.repositories.iter().map(|r| r.name.as_str()).collect()
    }

    fn logins(record: &RepositoryRecord) -> Vec<&str> {
        record
            .collaborators
            .iter()
            .map(|c| c.login.as_str())
            .collect()
    }

    fn cursors(executor: &ScriptedExecutor) -> Vec<(Option<String>, Option<String>)> {
        executor
            .calls()
            .iter()
            .map(|call| {
                let cursor = |key: &str| call.variables[key].as_str().map(str::to_owned);
                (cursor("repositoriesCursor"), cursor("collaboratorsCursor"))
            })
            .collect()
    }

    fn some(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[tokio::test]
    async fn test_collects_two_repositories_with_collaborator_pages() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page(
                "alpha",
                &[("a1", "ADMIN"), ("a2", "READ")],
                None,
                "r1",
                true,
            ))
            .respond(repository_page("beta", &[("b1", "WRITE")], Some("c1"), "r2", false))
            .respond(repository_page("beta", &[("b2", "TRIAGE")], None, "r2", false));

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();

        assert_eq!(result.login, "acme");
        assert_eq!(names(&result), vec!["alpha", "beta"]);
        assert_eq!(logins(&result.repositories[0]), vec!["a1", "a2"]);
        assert_eq!(logins(&result.repositories[1]), vec!["b1", "b2"]);
        assert_eq!(
            result.repositories[1].collaborators[1].permission,
            Permission::Triage
        );
        assert!(result.repositories.iter().all(|r| r.collaborators_complete));
        assert_eq!(result.collaborator_count(), 4);

        // The beta continuation re-requests the cursor that produced beta.
        assert_eq!(
            cursors(&executor),
            vec![(None, None), (some("r1"), None), (some("r1"), some("c1"))]
        );
    }

    #[tokio::test]
    async fn test_first_repository_continuation_keeps_null_cursor() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page("alpha", &[("a1", "ADMIN")], Some("c1"), "r1", true))
            .respond(repository_page("alpha", &[("a2", "READ")], Some("c2"), "r1", true))
            .respond(repository_page("alpha", &[("a3", "READ")], None, "r1", true))
            .respond(repository_page("beta", &[("b1", "READ")], None, "r2", false));

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();

        assert_eq!(names(&result), vec!["alpha", "beta"]);
        assert_eq!(logins(&result.repositories[0]), vec!["a1", "a2", "a3"]);
        assert_eq!(
            cursors(&executor),
            vec![
                (None, None),
                (None, some("c1")),
                (None, some("c2")),
                (some("r1"), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_tracked_cursor_is_the_one_before_the_current_repository() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page("alpha", &[("a1", "ADMIN")], None, "r1", true))
            .respond(repository_page("beta", &[("b1", "READ")], None, "r2", true))
            .respond(repository_page("gamma", &[("g1", "READ")], Some("c1"), "r3", true))
            .respond(repository_page("gamma", &[("g2", "READ")], None, "r3", false));

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();

        assert_eq!(names(&result), vec!["alpha", "beta", "gamma"]);
        assert_eq!(logins(&result.repositories[2]), vec!["g1", "g2"]);
        assert_eq!(cursors(&executor)[3], (some("r2"), some("c1")));
    }

    #[tokio::test]
    async fn test_skips_archived_repository() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page("alpha", &[("a1", "ADMIN")], None, "r1", true))
            .fail(archived_failure("legacy", "r2", true))
            .respond(repository_page("gamma", &[("g1", "READ")], None, "r3", false));

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();

        assert_eq!(names(&result), vec!["alpha", "gamma"]);
        assert_eq!(
            cursors(&executor),
            vec![(None, None), (some("r1"), None), (some("r2"), None)]
        );
    }

    #[tokio::test]
    async fn test_archived_first_repository() {
        let executor = ScriptedExecutor::new()
            .fail(archived_failure("legacy", "r1", true))
            .respond(repository_page("alpha", &[("a1", "ADMIN")], Some("c1"), "r2", false))
            .respond(repository_page("alpha", &[("a2", "READ")], None, "r2", false));

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();

        assert_eq!(names(&result), vec!["alpha"]);
        assert_eq!(logins(&result.repositories[0]), vec!["a1", "a2"]);
        assert_eq!(cursors(&executor)[2], (some("r1"), some("c1")));
    }

    #[tokio::test]
    async fn test_archived_last_repository_keeps_collected_data() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page("alpha", &[("a1", "ADMIN")], None, "r1", true))
            .fail(archived_failure("legacy", "r2", false))
            .respond(empty_repository_page());

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();

        assert_eq!(names(&result), vec!["alpha"]);
        assert_eq!(executor.remaining(), 0);
    }

    #[tokio::test]
    async fn test_empty_organization_yields_none() {
        let executor = ScriptedExecutor::new().respond(empty_repository_page());

        let result = collector(&executor).collect("empty-org").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_organization_yields_none() {
        let executor = ScriptedExecutor::new().fail(saml_enforcement_failure());

        let result = collector(&executor).collect("locked").await.unwrap();
        assert!(result.is_none());
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_other_failures_keep_partial_result() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page("alpha", &[("a1", "ADMIN")], None, "r1", true))
            .fail(AuditError::Api {
                status: 401,
                message: "Bad credentials".into(),
            });

        let interrupted = collector(&executor).collect("acme").await.unwrap_err();
        assert!(matches!(
            interrupted.error,
            AuditError::Api { status: 401, .. }
        ));
        assert_eq!(names(&interrupted.partial.unwrap()), vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_missing_end_cursor_does_not_loop() {
        let mut page = repository_page("alpha", &[("a1", "ADMIN")], None, "r1", true);
        page["organization"]["repositories"]["pageInfo"]["endCursor"] = serde_json::Value::Null;
        let executor = ScriptedExecutor::new().respond(page);

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();
        assert_eq!(names(&result), vec!["alpha"]);
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_repository_without_collaborator_access() {
        let mut page = repository_page("alpha", &[], None, "r1", false);
        page["organization"]["repositories"]["nodes"][0]["collaborators"] =
            serde_json::Value::Null;
        let executor = ScriptedExecutor::new().respond(page);

        let result = collector(&executor).collect("acme").await.unwrap().unwrap();
        assert_eq!(names(&result), vec!["alpha"]);
        assert!(result.repositories[0].collaborators.is_empty());
    }
}
