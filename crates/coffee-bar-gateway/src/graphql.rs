use std::fmt;

use async_trait::async_trait;
use coffee_bar_core::CoreError;
use serde::Deserialize;
use serde_json::json;

use crate::session::AccessTokenCell;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlRequest {
    pub operation: &'static str,
    pub query: String,
    pub variables: serde_json::Value,
}

impl GraphqlRequest {
    pub fn new(
        operation: &'static str,
        query: impl Into<String>,
        variables: serde_json::Value,
    ) -> Self {
        Self {
            operation,
            query: query.into(),
            variables,
        }
    }
}

/// Failure reported by the server inside a well-formed GraphQL envelope.
/// Transport-level failures use [`CoreError::DependencyUnavailable`].
pub(crate) fn server_error(message: impl Into<String>) -> CoreError {
    CoreError::Mutation(message.into())
}

#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, request: GraphqlRequest) -> Result<serde_json::Value, CoreError>;
}

#[derive(Clone)]
pub struct ReqwestGraphqlTransport {
    endpoint: String,
    tokens: AccessTokenCell,
    client: reqwest::Client,
}

impl fmt::Debug for ReqwestGraphqlTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReqwestGraphqlTransport")
            .field("endpoint", &self.endpoint)
            .field("tokens", &self.tokens)
            .field("client", &self.client)
            .finish()
    }
}

impl ReqwestGraphqlTransport {
    pub fn new(endpoint: impl Into<String>, tokens: AccessTokenCell) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .user_agent("coffee-bar/gateway")
            .build()
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to initialize gateway HTTP client: {err}"
                ))
            })?;

        Ok(Self {
            endpoint: endpoint.into(),
            tokens,
            client,
        })
    }
}

#[async_trait]
impl GraphqlTransport for ReqwestGraphqlTransport {
    async fn execute(&self, request: GraphqlRequest) -> Result<serde_json::Value, CoreError> {
        let mut builder = self.client.post(&self.endpoint).json(&json!({
            "operationName": request.operation,
            "query": request.query,
            "variables": request.variables,
        }));
        if let Some(token) = self.tokens.current() {
            builder = builder.bearer_auth(token.expose());
        }

        let response = builder.send().await.map_err(|err| {
            CoreError::DependencyUnavailable(format!("failed to call the gateway: {err}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            CoreError::DependencyUnavailable(format!(
                "failed to read response from the gateway: {err}"
            ))
        })?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CoreError::Identity(format!(
                "gateway rejected the access token: {}",
                truncate_for_error(&body)
            )));
        }
        if !status.is_success() {
            return Err(CoreError::DependencyUnavailable(format!(
                "gateway returned HTTP {}: {}",
                status,
                truncate_for_error(&body)
            )));
        }

        parse_envelope(&body)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponseEnvelope {
    data: Option<serde_json::Value>,
    errors: Option<Vec<GraphqlErrorPayload>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorPayload {
    message: String,
}

pub(crate) fn parse_envelope(body: &str) -> Result<serde_json::Value, CoreError> {
    let envelope: GraphqlResponseEnvelope = serde_json::from_str(body).map_err(|err| {
        CoreError::DependencyUnavailable(format!("failed to parse gateway response JSON: {err}"))
    })?;

    if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
        let message = errors
            .into_iter()
            .map(|error| error.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(server_error(message));
    }

    envelope.data.ok_or_else(|| {
        CoreError::DependencyUnavailable(
            "gateway response did not include a data payload.".to_owned(),
        )
    })
}

pub(crate) fn truncate_for_error(body: &str) -> String {
    const MAX_LEN: usize = 200;
    if body.chars().count() <= MAX_LEN {
        body.to_owned()
    } else {
        format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
    }
}
