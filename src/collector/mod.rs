mod engine;
mod saml;
pub mod types;

use log::{error, info, warn};

use crate::error::Result;
use crate::github::queries::fetch_enterprise_organizations;
use crate::github::GraphQLExecutor;
use crate::output::OrganizationProgress;

pub use engine::Interrupted;
pub use types::RunContext;

/// What to collect, and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Organization(String),
    Enterprise(String),
}

/// Drives the organization crawl against a [`GraphQLExecutor`].
pub struct Collector<'a, E: ?Sized> {
    executor: &'a E,
    collaborators_page_size: u32,
}

impl<'a, E> Collector<'a, E>
where
    E: GraphQLExecutor + ?Sized,
{
    pub fn new(executor: &'a E, collaborators_page_size: u32) -> Self {
        Self {
            executor,
            collaborators_page_size,
        }
    }

    /// Expands the target into the list of organization logins to crawl.
    ///
    /// # Errors
    ///
    /// Returns an error if the enterprise lookup fails.
    pub async fn resolve_organizations(&self, target: &Target) -> Result<Vec<String>> {
        match target {
            Target::Organization(login) => Ok(vec![login.clone()]),
            Target::Enterprise(slug) => {
                let (organizations, truncated) =
                    fetch_enterprise_organizations(self.executor, slug).await?;
                if truncated {
                    warn!(
                        "Enterprise {slug} has more than {} organizations, only the first page is audited",
                        organizations.len()
                    );
                }
                info!(
                    "Found {} organizations in enterprise {slug}",
                    organizations.len()
                );
                Ok(organizations)
            }
        }
    }

    /// Collects every organization in order, storing each result in `context`.
    ///
    /// A failing organization is logged and keeps whatever was collected
    /// before the failure; the run moves on to the next one.
    pub async fn run(&self, context: &mut RunContext, organizations: &[String], saml: bool) {
        for login in organizations {
            let progress = OrganizationProgress::start(login);
            info!("🔍 Start collecting for organization {login}.");
            context.results.insert(login.clone(), None);

            let (mut result, failed) = match self.collect(login).await {
                Ok(result) => (result, false),
                Err(Interrupted { partial, error }) => {
                    error!("❌ Failed collecting for organization {login}: {error}");
                    (partial, true)
                }
            };

            if saml {
                if let Some(result) = result.as_mut() {
                    result.saml = self.collect_saml(login).await;
                }
            }

            match &result {
                _ if failed => progress.fail(login),
                Some(collected) => {
                    info!(
                        "✅ Finished collecting for organization {login}, total number of repos: {}",
                        collected.repositories.len()
                    );
                    progress.finish(login, collected.repositories.len());
                }
                None => progress.skip(login),
            }

            context.results.insert(login.clone(), result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use crate::report::{normalize, NormalizeOptions};
    use crate::github::executor::testing::{
        empty_repository_page, enterprise_page, repository_page, saml_page, ScriptedExecutor,
    };

    #[tokio::test]
    async fn test_organization_target_needs_no_lookup() {
        let executor = ScriptedExecutor::new();
        let organizations = Collector::new(&executor, 100)
            .resolve_organizations(&Target::Organization("acme".into()))
            .await
            .unwrap();

        assert_eq!(organizations, vec!["acme".to_string()]);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_truncated_enterprise_audits_first_page() {
        let mut page = enterprise_page(&["acme", "globex"]);
        page["enterprise"]["organizations"]["pageInfo"]["hasNextPage"] = true.into();
        let executor = ScriptedExecutor::new().respond(page);

        let organizations = Collector::new(&executor, 100)
            .resolve_organizations(&Target::Enterprise("megacorp".into()))
            .await
            .unwrap();

        assert_eq!(organizations, vec!["acme".to_string(), "globex".to_string()]);
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_enterprise_run_continues_after_empty_organization() {
        let executor = ScriptedExecutor::new()
            .respond(enterprise_page(&["empty-org", "acme"]))
            .respond(empty_repository_page())
            .respond(repository_page("alpha", &[("octocat", "ADMIN")], None, "r1", false));
        let collector = Collector::new(&executor, 100);

        let organizations = collector
            .resolve_organizations(&Target::Enterprise("megacorp".into()))
            .await
            .unwrap();
        let mut context = RunContext::new(Some("megacorp".into()));
        collector.run(&mut context, &organizations, false).await;

        let keys: Vec<_> = context.results.keys().cloned().collect();
        assert_eq!(keys, vec!["empty-org".to_string(), "acme".to_string()]);
        assert!(context.results["empty-org"].is_none());
        assert_eq!(
            context.results["acme"].as_ref().unwrap().collaborator_count(),
            1
        );

        let records = normalize(&context, NormalizeOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].enterprise.as_deref(), Some("megacorp"));
        assert_eq!(records[0].organization, "acme");
    }

    #[tokio::test]
    async fn test_acme_end_to_end_records() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page(
                "alpha",
                &[("a1", "ADMIN"), ("a2", "WRITE")],
                None,
                "r1",
                true,
            ))
            .respond(repository_page("beta", &[("b1", "READ")], Some("c1"), "r2", false))
            .respond(repository_page("beta", &[("b2", "MAINTAIN")], None, "r2", false));
        let collector = Collector::new(&executor, 100);
        let mut context = RunContext::default();

        collector.run(&mut context, &["acme".to_string()], false).await;
        let records = normalize(&context, NormalizeOptions::default());

        let rows: Vec<_> = records
            .iter()
            .map(|r| (r.repository.as_str(), r.login.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![("alpha", "a1"), ("alpha", "a2"), ("beta", "b1"), ("beta", "b2")]
        );
    }

    #[tokio::test]
    async fn test_failed_organization_does_not_stop_the_run() {
        let executor = ScriptedExecutor::new()
            .fail(AuditError::NoResponseData)
            .respond(repository_page("alpha", &[("octocat", "ADMIN")], None, "r1", false));
        let collector = Collector::new(&executor, 100);
        let mut context = RunContext::default();

        collector
            .run(&mut context, &["broken".to_string(), "acme".to_string()], false)
            .await;

        assert!(context.results["broken"].is_none());
        assert!(context.results["acme"].is_some());
    }

    #[tokio::test]
    async fn test_interrupted_organization_keeps_collected_repositories() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page(
                "alpha",
                &[("a1", "ADMIN"), ("a2", "WRITE")],
                None,
                "r1",
                true,
            ))
            .respond(repository_page("beta", &[("b1", "READ")], None, "r2", true))
            .fail(AuditError::ApiErrorAfterRetries {
                status: 502,
                retries: 3,
            });
        let collector = Collector::new(&executor, 100);
        let mut context = RunContext::default();

        collector.run(&mut context, &["acme".to_string()], false).await;

        let acme = context.results["acme"].as_ref().unwrap();
        assert_eq!(acme.repositories.len(), 2);
        let records = normalize(&context, NormalizeOptions::default());
        let logins: Vec<_> = records.iter().map(|r| r.login.as_str()).collect();
        assert_eq!(logins, vec!["a1", "a2", "b1"]);
    }

    #[tokio::test]
    async fn test_saml_is_collected_after_repositories() {
        let executor = ScriptedExecutor::new()
            .respond(repository_page("alpha", &[("octocat", "ADMIN")], None, "r1", false))
            .respond(saml_page(&[("octocat", "octo@acme.test")], None));
        let collector = Collector::new(&executor, 100);
        let mut context = RunContext::default();

        collector.run(&mut context, &["acme".to_string()], true).await;

        let operations: Vec<_> = executor.calls().into_iter().map(|c| c.operation).collect();
        assert_eq!(
            operations,
            vec!["OrganizationCollaborators", "OrganizationSamlIdentities"]
        );
        let saml = context.results["acme"].as_ref().unwrap().saml.as_ref().unwrap();
        assert_eq!(saml.name_id_for("octocat"), Some("octo@acme.test"));
    }

    #[tokio::test]
    async fn test_saml_is_not_requested_for_skipped_organizations() {
        let executor = ScriptedExecutor::new().respond(empty_repository_page());
        let collector = Collector::new(&executor, 100);
        let mut context = RunContext::default();

        collector.run(&mut context, &["empty-org".to_string()], true).await;

        assert_eq!(executor.calls().len(), 1);
        assert!(context.results["empty-org"].is_none());
    }
}
