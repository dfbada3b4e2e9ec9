use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::graphql_error::GraphQLError;

/// The parsed body of one subgraph call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubgraphResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl SubgraphResponse {
    pub fn with_data(data: Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn from_graphql_error(error: GraphQLError) -> Self {
        Self {
            errors: Some(vec![error]),
            ..Default::default()
        }
    }
}
