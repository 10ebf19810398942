use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};
use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::Token;
use crate::collector::{Collector, RunContext, Target};
use crate::config::Config;
use crate::error::AuditError;
use crate::github::{ClientOptions, GitHubClient};
use crate::output::print_summary;
use crate::report::{
    normalize, post_issue, stage_artifact, write_files, ArtifactEnvironment, NormalizeOptions,
};

#[derive(Parser)]
#[command(name = "collab-audit")]
#[command(author, version, about = "Repository collaborator audit for GitHub organizations", long_about = None)]
pub struct Cli {
    /// Personal access token (falls back to GITHUB_TOKEN)
    #[arg(short, long, env = "TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Organization to audit
    #[arg(short, long, env = "ORGANIZATION")]
    organization: Option<String>,

    /// Enterprise whose member organizations are audited
    #[arg(short, long, env = "ENTERPRISE")]
    enterprise: Option<String>,

    /// Add the linked SAML identity to every record
    #[arg(long, env = "SAML_IDENTITIES", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    saml_identities: bool,

    /// Post the report to an issue on --repository and close it
    #[arg(long, env = "ISSUE", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
    issue: bool,

    /// Repository receiving the report issue (owner/name)
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving raw-data.json and raw-data.csv
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,
}

/// Effective settings after merging the command line over the config file.
#[derive(Debug)]
pub struct Settings {
    pub token: Token,
    pub target: Target,
    pub api_url: String,
    pub collaborators_page_size: u32,
    pub client_options: ClientOptions,
    pub output_dir: PathBuf,
    pub saml_identities: bool,
    pub issue_repository: Option<String>,
}

impl Settings {
    /// Validates inputs before any network call.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] when both or neither of
    /// organization and enterprise are set, when no token is available, or
    /// when issue posting is enabled without a repository.
    pub fn resolve(
        cli: &Cli,
        config: &Config,
        fallback_token: Option<String>,
    ) -> std::result::Result<Self, AuditError> {
        let organization = cli
            .organization
            .clone()
            .or_else(|| config.github.organization.clone())
            .filter(|o| !o.is_empty());
        let enterprise = cli
            .enterprise
            .clone()
            .or_else(|| config.github.enterprise.clone())
            .filter(|e| !e.is_empty());

        let target = match (organization, enterprise) {
            (Some(_), Some(_)) => {
                return Err(AuditError::InvalidInput(
                    "The organization and enterprise parameter are mutually exclusive.".into(),
                ))
            }
            (Some(organization), None) => Target::Organization(organization),
            (None, Some(enterprise)) => Target::Enterprise(enterprise),
            (None, None) => {
                return Err(AuditError::InvalidInput(
                    "Either an organization or an enterprise is required.".into(),
                ))
            }
        };

        let token = cli
            .token
            .clone()
            .or_else(|| config.github.token.clone())
            .or(fallback_token)
            .filter(|t| !t.is_empty())
            .map(Token::from)
            .ok_or_else(|| AuditError::InvalidInput("A GitHub token is required.".into()))?;

        let issue = cli.issue || config.report.issue;
        let repository = cli
            .repository
            .clone()
            .or_else(|| config.report.repository.clone());
        let issue_repository = if issue {
            Some(repository.ok_or_else(|| {
                AuditError::InvalidInput(
                    "Posting to an issue requires a repository (owner/name).".into(),
                )
            })?)
        } else {
            None
        };

        Ok(Self {
            token,
            target,
            api_url: cli
                .api_url
                .clone()
                .unwrap_or_else(|| config.github.api_url.clone()),
            collaborators_page_size: config.github.collaborators_page_size.clamp(1, 100),
            client_options: ClientOptions {
                timeout: Duration::from_secs(config.github.request_timeout_secs),
                max_retries: config.github.max_retries,
                retry_delay: Duration::from_secs(config.github.retry_delay_secs),
            },
            output_dir: cli
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.report.output_dir)),
            saml_identities: cli.saml_identities || config.report.saml_identities,
            issue_repository,
        })
    }

    fn enterprise(&self) -> Option<&str> {
        match &self.target {
            Target::Enterprise(slug) => Some(slug),
            Target::Organization(_) => None,
        }
    }
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = Settings::resolve(self, &config, std::env::var("GITHUB_TOKEN").ok())?;

        let client = GitHubClient::new(
            &settings.api_url,
            settings.token.clone(),
            settings.client_options.clone(),
        )?;
        let collector = Collector::new(&client, settings.collaborators_page_size);
        let mut context = RunContext::new(settings.enterprise().map(str::to_owned));

        let organizations = collector.resolve_organizations(&settings.target).await?;
        collector
            .run(&mut context, &organizations, settings.saml_identities)
            .await;

        Self::publish(&client, &context, &settings).await
    }

    async fn publish(client: &GitHubClient, context: &RunContext, settings: &Settings) -> Result<()> {
        let records = normalize(
            context,
            NormalizeOptions {
                saml_identities: settings.saml_identities,
            },
        );
        print_summary(context, records.len());

        if records.is_empty() {
            error!("⚠️  No data collected. Stopping action");
            return Err(AuditError::NoData.into());
        }

        let (files, csv) = write_files(&settings.output_dir, &records)?;
        stage_artifact(&files, &settings.output_dir, &ArtifactEnvironment::from_env())?;

        match &settings.issue_repository {
            Some(repository) => {
                let number =
                    post_issue(client, repository, context.enterprise.as_deref(), &csv).await?;
                info!("Report posted to {repository}#{number} and closed");
            }
            None => info!("Skipping posting result to issue."),
        }

        Ok(())
    }
}
