use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use fusion_supergraph::TransportEntry;
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::{
    executors::{
        common::{SubgraphExecutionRequest, SubgraphExecutor},
        error::SubgraphExecutorError,
    },
    response::subgraph_response::SubgraphResponse,
};

pub const HTTP_TRANSPORT_KIND: &str = "http";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLRequestBody<'a> {
    query: &'a str,
    variables: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation_name: Option<&'a str>,
}

/// Sends GraphQL-over-HTTP POST requests to one subgraph.
pub struct HttpSubgraphExecutor {
    subgraph_name: String,
    endpoint: String,
    headers: HeaderMap,
    timeout: Option<Duration>,
    http_client: Arc<reqwest::Client>,
}

impl HttpSubgraphExecutor {
    pub fn new(
        subgraph_name: impl Into<String>,
        endpoint: impl Into<String>,
        http_client: Arc<reqwest::Client>,
    ) -> Self {
        Self {
            subgraph_name: subgraph_name.into(),
            endpoint: endpoint.into(),
            headers: HeaderMap::new(),
            timeout: None,
            http_client,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_transport(
        entry: &TransportEntry,
        http_client: Arc<reqwest::Client>,
    ) -> Result<Self, SubgraphExecutorError> {
        let headers = transport_headers(entry)?;
        let timeout = transport_timeout(entry)?;

        Ok(Self::new(&entry.subgraph, &entry.location, http_client)
            .with_headers(headers)
            .with_timeout(timeout))
    }
}

fn invalid_option(entry: &TransportEntry, option: &str, reason: String) -> SubgraphExecutorError {
    SubgraphExecutorError::InvalidTransportOption {
        subgraph: entry.subgraph.clone(),
        option: option.to_string(),
        reason,
    }
}

fn transport_headers(entry: &TransportEntry) -> Result<HeaderMap, SubgraphExecutorError> {
    let mut headers = HeaderMap::with_capacity(entry.headers.len());
    for (name, value) in &entry.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| invalid_option(entry, "headers", e.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| invalid_option(entry, "headers", e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Reads the `timeout` option: a humantime string (`"5s"`) or a number of milliseconds.
fn transport_timeout(entry: &TransportEntry) -> Result<Option<Duration>, SubgraphExecutorError> {
    match entry.options.get("timeout") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => humantime::parse_duration(text)
            .map(Some)
            .map_err(|e| invalid_option(entry, "timeout", e.to_string())),
        Some(Value::Number(millis)) => millis
            .as_u64()
            .map(|millis| Some(Duration::from_millis(millis)))
            .ok_or_else(|| {
                invalid_option(
                    entry,
                    "timeout",
                    "expected a non-negative number of milliseconds".to_string(),
                )
            }),
        Some(other) => Err(invalid_option(
            entry,
            "timeout",
            format!("expected a duration, got {}", other),
        )),
    }
}

#[async_trait]
impl SubgraphExecutor for HttpSubgraphExecutor {
    async fn execute(
        &self,
        execution_request: SubgraphExecutionRequest,
    ) -> Result<SubgraphResponse, SubgraphExecutorError> {
        let body = GraphQLRequestBody {
            query: &execution_request.query,
            variables: &execution_request.variables,
            operation_name: execution_request.operation_name.as_deref(),
        };

        trace!(
            subgraph = self.subgraph_name.as_str(),
            endpoint = self.endpoint.as_str(),
            "sending subgraph request"
        );

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .headers(execution_request.headers)
            .json(&body);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| match self.timeout {
            Some(timeout) if e.is_timeout() => SubgraphExecutorError::RequestTimeout(timeout),
            _ => SubgraphExecutorError::RequestFailure(self.subgraph_name.clone(), e.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(
                subgraph = self.subgraph_name.as_str(),
                status = status.as_u16(),
                "subgraph responded with an error status"
            );
            return Err(SubgraphExecutorError::UnexpectedStatus(
                self.subgraph_name.clone(),
                status.as_u16(),
            ));
        }

        response
            .json::<SubgraphResponse>()
            .await
            .map_err(|e| {
                SubgraphExecutorError::ResponseParseFailure(self.subgraph_name.clone(), e.to_string())
            })
    }
}
