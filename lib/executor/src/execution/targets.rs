use serde_json::Value;

use crate::response::graphql_error::GraphQLErrorPathSegment;

pub type ResponsePath = Vec<GraphQLErrorPathSegment>;

/// Concrete paths of every object reached by following `path` from `data`.
/// Lists are expanded item by item; nulls and scalars end the walk.
pub fn collect_targets(data: &Value, path: &[String]) -> Vec<ResponsePath> {
    let mut targets = vec![];
    let mut current = vec![];
    walk(data, path, &mut current, &mut targets);
    targets
}

fn walk(value: &Value, rest: &[String], current: &mut ResponsePath, into: &mut Vec<ResponsePath>) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                current.push(GraphQLErrorPathSegment::Index(index));
                walk(item, rest, current, into);
                current.pop();
            }
        }
        Value::Object(map) => match rest.split_first() {
            None => into.push(current.clone()),
            Some((key, rest)) => {
                if let Some(child) = map.get(key) {
                    current.push(GraphQLErrorPathSegment::String(key.clone()));
                    walk(child, rest, current, into);
                    current.pop();
                }
            }
        },
        _ => {}
    }
}

pub fn value_at<'v>(data: &'v Value, path: &[GraphQLErrorPathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(data, |value, segment| match segment {
        GraphQLErrorPathSegment::String(key) => value.get(key),
        GraphQLErrorPathSegment::Index(index) => value.get(index),
    })
}

pub fn value_at_mut<'v>(
    data: &'v mut Value,
    path: &[GraphQLErrorPathSegment],
) -> Option<&'v mut Value> {
    path.iter().try_fold(data, |value, segment| match segment {
        GraphQLErrorPathSegment::String(key) => value.get_mut(key),
        GraphQLErrorPathSegment::Index(index) => value.get_mut(index),
    })
}

/// Follows response keys from a subgraph's `data` down to the resolved value.
pub fn extract_result(data: Value, result_path: &[String]) -> Value {
    let mut current = data;
    for key in result_path {
        current = match current {
            Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
            _ => return Value::Null,
        };
    }
    current
}

/// Removes internal `__variable_*` aliases from the whole tree.
pub fn strip_internal_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.starts_with("__variable_"));
            map.values_mut().for_each(strip_internal_fields);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_internal_fields),
        _ => {}
    }
}
