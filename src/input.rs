//! Request body extraction shared by every write endpoint.

use axum::{
    extract::{FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::{Map, Value};

use crate::response;

/// The submitted fields of a JSON or form-encoded body, normalized:
/// strings are trimmed and empty strings become `null`.
#[derive(Debug, Clone, Default)]
pub struct Input(pub Map<String, Value>);

impl Input {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl From<Map<String, Value>> for Input {
    fn from(fields: Map<String, Value>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(key, value)| (key, normalize(value)))
            .collect();
        Input(fields)
    }
}

impl<S> FromRequest<S> for Input
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let fields = if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            match value {
                Value::Object(map) => map,
                _ => {
                    return Err(response::failure(
                        StatusCode::BAD_REQUEST,
                        None,
                        "The request body must be a JSON object.",
                    )
                    .into_response());
                }
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            from_pairs(pairs)
        } else {
            Map::new()
        };

        Ok(Input::from(fields))
    }
}

/// Fold form pairs into a field map. `tags[]=1&tags[]=2` and `tags[0]=1`
/// both collect into the array `tags`.
fn from_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut fields = Map::new();

    for (key, value) in pairs {
        match array_key(&key) {
            Some(name) => {
                let slot = fields
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(items) => items.push(Value::String(value)),
                    other => *other = Value::Array(vec![Value::String(value)]),
                }
            }
            None => {
                fields.insert(key, Value::String(value));
            }
        }
    }

    fields
}

fn array_key(key: &str) -> Option<&str> {
    let (name, rest) = key.split_once('[')?;
    let index = rest.strip_suffix(']')?;
    if name.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(name)
}

fn normalize(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}
