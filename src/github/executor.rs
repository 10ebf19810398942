use async_trait::async_trait;
use graphql_client::QueryBody;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Executes a GraphQL document and hands back the raw `data` object.
///
/// Implementations return [`crate::error::AuditError::GraphQL`] when the
/// response carries errors, keeping any partial data alongside the messages.
#[async_trait]
pub trait GraphQLExecutor: Send + Sync {
    async fn execute(&self, body: &QueryBody<Value>) -> Result<Value>;
}

/// Builds the request body for one of the catalog queries, runs it and
/// deserializes the data into `T`.
pub async fn execute_query<E, V, T>(
    executor: &E,
    query: &'static str,
    operation_name: &'static str,
    variables: V,
) -> Result<T>
where
    E: GraphQLExecutor + ?Sized,
    V: Serialize,
    T: DeserializeOwned,
{
    let body = QueryBody {
        variables: serde_json::to_value(variables)?,
        query,
        operation_name,
    };

    let data = executor.execute(&body).await?;
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
pub mod testing {
    //! Scripted executor and response builders shared by the collector tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use graphql_client::QueryBody;
    use serde_json::{json, Value};

    use super::GraphQLExecutor;
    use crate::error::{AuditError, Result};
    use crate::github::queries::{ARCHIVED_REPOSITORY_MESSAGE, SAML_ENFORCEMENT_MESSAGE};

    /// A recorded call: operation name and the variables it was sent with.
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub operation: String,
        pub variables: Value,
    }

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedExecutor {
        responses: Mutex<VecDeque<Result<Value>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, data: Value) -> Self {
            self.responses.lock().unwrap().push_back(Ok(data));
            self
        }

        pub fn fail(self, error: AuditError) -> Self {
            self.responses.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn remaining(&self) -> usize {
            self.responses.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GraphQLExecutor for ScriptedExecutor {
        async fn execute(&self, body: &QueryBody<Value>) -> Result<Value> {
            self.calls.lock().unwrap().push(RecordedCall {
                operation: body.operation_name.to_string(),
                variables: body.variables.clone(),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected call to {}", body.operation_name))
        }
    }

    /// Organization page holding a single repository.
    pub fn repository_page(
        repository: &str,
        collaborators: &[(&str, &str)],
        collaborators_next: Option<&str>,
        repositories_end: &str,
        repositories_next: bool,
    ) -> Value {
        let edges: Vec<Value> = collaborators
            .iter()
            .map(|(login, permission)| {
                json!({
                    "node": { "name": format!("{login} name"), "login": login },
                    "permission": permission,
                })
            })
            .collect();

        json!({
            "organization": {
                "repositories": {
                    "pageInfo": {
                        "startCursor": repositories_end,
                        "endCursor": repositories_end,
                        "hasNextPage": repositories_next,
                    },
                    "nodes": [{
                        "name": repository,
                        "collaborators": {
                            "pageInfo": {
                                "endCursor": collaborators_next,
                                "hasNextPage": collaborators_next.is_some(),
                            },
                            "edges": edges,
                        },
                    }],
                },
            },
        })
    }

    pub fn empty_repository_page() -> Value {
        json!({
            "organization": {
                "repositories": {
                    "pageInfo": { "startCursor": null, "endCursor": null, "hasNextPage": false },
                    "nodes": [],
                },
            },
        })
    }

    pub fn archived_failure(repository: &str, end_cursor: &str, has_next: bool) -> AuditError {
        AuditError::GraphQL {
            messages: vec![ARCHIVED_REPOSITORY_MESSAGE.to_string()],
            data: Some(json!({
                "organization": {
                    "repositories": {
                        "pageInfo": {
                            "startCursor": end_cursor,
                            "endCursor": end_cursor,
                            "hasNextPage": has_next,
                        },
                        "nodes": [{ "name": repository, "collaborators": null }],
                    },
                },
            })),
        }
    }

    pub fn saml_enforcement_failure() -> AuditError {
        AuditError::GraphQL {
            messages: vec![SAML_ENFORCEMENT_MESSAGE.to_string()],
            data: Some(json!({ "organization": null })),
        }
    }

    pub fn saml_page(identities: &[(&str, &str)], next: Option<&str>) -> Value {
        let edges: Vec<Value> = identities
            .iter()
            .map(|(login, name_id)| {
                json!({
                    "node": {
                        "samlIdentity": { "nameId": name_id },
                        "user": { "login": login },
                    },
                })
            })
            .collect();

        json!({
            "organization": {
                "samlIdentityProvider": {
                    "externalIdentities": {
                        "pageInfo": {
                            "startCursor": null,
                            "endCursor": next,
                            "hasNextPage": next.is_some(),
                        },
                        "edges": edges,
                    },
                },
            },
        })
    }

    pub fn enterprise_page(logins: &[&str]) -> Value {
        let nodes: Vec<Value> = logins.iter().map(|login| json!({ "login": login })).collect();
        json!({
            "enterprise": {
                "organizations": {
                    "pageInfo": { "hasNextPage": false },
                    "nodes": nodes,
                },
            },
        })
    }
}
