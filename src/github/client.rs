use std::time::Duration;

use async_trait::async_trait;
use graphql_client::{QueryBody, Response as GraphQLResponse};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::executor::GraphQLExecutor;
use crate::auth::Token;
use crate::error::{AuditError, Result};

/// Transport settings for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(10),
        }
    }
}

pub struct GitHubClient {
    client: Client,
    api_url: Url,
    graphql_url: Url,
    token: Token,
    options: ClientOptions,
}

#[derive(Debug, Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueUpdate<'a> {
    state: &'a str,
}

/// The subset of the REST issue payload we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Token, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("collab-audit/", env!("CARGO_PKG_VERSION")))
            .timeout(options.timeout)
            .build()
            .map_err(|e| AuditError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Keep a trailing slash so joins append instead of replacing the last segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };

        let api_url = Url::parse(&normalized)
            .map_err(|e| AuditError::Config(format!("Invalid base URL: {e}")))?;

        let graphql_url = api_url
            .join("graphql")
            .map_err(|e| AuditError::Config(format!("Invalid GraphQL URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            graphql_url,
            token,
            options,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(self.token.as_str())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }

    /// Sends the request built by `build`, retrying on network errors,
    /// rate limits and server errors up to the configured limit.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let max_retries = self.options.max_retries;
        let delay = self.options.retry_delay;
        let mut retry_count = 0;

        loop {
            let response = match self.auth_request(build()).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                    if retry_count >= max_retries {
                        return Err(e.into());
                    }
                    warn!(
                        "Network error ({e}), retrying in {}s ({}/{max_retries})...",
                        delay.as_secs(),
                        retry_count + 1,
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();

            if status == 429 || status.is_server_error() {
                if retry_count >= max_retries {
                    return Err(AuditError::ApiErrorAfterRetries {
                        status: status.as_u16(),
                        retries: max_retries,
                    });
                }

                warn!(
                    "GitHub API error (status {status}). Waiting {} seconds before retry {}/{max_retries}...",
                    delay.as_secs(),
                    retry_count + 1,
                );

                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read error response".to_string());
                return Err(AuditError::Api {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            return Ok(response);
        }
    }

    fn issues_url(&self, owner: &str, repo: &str, number: Option<u64>) -> Result<Url> {
        let path = match number {
            Some(number) => format!("repos/{owner}/{repo}/issues/{number}"),
            None => format!("repos/{owner}/{repo}/issues"),
        };
        self.api_url
            .join(&path)
            .map_err(|e| AuditError::Config(format!("Invalid issues URL: {e}")))
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<Issue> {
        let url = self.issues_url(owner, repo, None)?;
        let payload = NewIssue { title, body };

        let response = self
            .send_with_retry(|| self.client.post(url.clone()).json(&payload))
            .await?;

        Ok(response.json().await?)
    }

    pub async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue> {
        let url = self.issues_url(owner, repo, Some(number))?;
        let payload = IssueUpdate { state: "closed" };

        let response = self
            .send_with_retry(|| self.client.patch(url.clone()).json(&payload))
            .await?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl GraphQLExecutor for GitHubClient {
    async fn execute(&self, body: &QueryBody<Value>) -> Result<Value> {
        debug!("Executing GraphQL operation {}", body.operation_name);

        let response = self
            .send_with_retry(|| self.client.post(self.graphql_url.clone()).json(body))
            .await?;

        let response_body: GraphQLResponse<Value> = response.json().await?;

        if let Some(errors) = response_body.errors.filter(|errors| !errors.is_empty()) {
            return Err(AuditError::GraphQL {
                messages: errors.into_iter().map(|e| e.message).collect(),
                data: response_body.data.filter(|data| !data.is_null()),
            });
        }

        response_body
            .data
            .filter(|data| !data.is_null())
            .ok_or(AuditError::NoResponseData)
    }
}
