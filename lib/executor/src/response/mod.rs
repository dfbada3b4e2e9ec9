pub mod graphql_error;
pub mod merge;
pub mod response;
pub mod subgraph_response;
