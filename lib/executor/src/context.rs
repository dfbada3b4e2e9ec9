use http::HeaderMap;
use serde_json::{Map, Value};

/// Per-request data handed to every subgraph call of one execution.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Headers of the incoming client request.
    pub headers: HeaderMap,
    /// Free-form values set by the host or by hooks before execution starts.
    pub extensions: Map<String, Value>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            headers,
            extensions: Map::new(),
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }
}
