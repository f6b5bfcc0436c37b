//! Explicit per-field validation.
//!
//! A [`Validator`] walks the submitted [`Input`] one field at a time. Each
//! check appends human-readable failures under the field name and returns the
//! typed value only when the field passed, so handlers build their write
//! models from the return values and call [`Validator::finish`] once.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::input::Input;
use crate::store;

/// Field name to ordered failure messages, serialized as a JSON object in the
/// order the fields were first reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message.into()),
            None => self.fields.push((field.to_string(), vec![message.into()])),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// How a field's absence is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-null.
    Required,
    /// Checked only when present; `null` then fails the type check.
    Sometimes,
    /// Checked only when present; `null` then fails as missing.
    SometimesRequired,
}

pub struct Validator<'a> {
    input: &'a Input,
    errors: ValidationErrors,
}

impl<'a> Validator<'a> {
    pub fn new(input: &'a Input) -> Self {
        Self {
            input,
            errors: ValidationErrors::default(),
        }
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// `Err` with the collected failures, if any.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// `Ok(value)` when every check passed and the handler could build its
    /// value. A missing value with no reported failure still yields an error
    /// rather than an empty success.
    pub fn finish_with<T>(mut self, value: Option<T>) -> Result<T, ValidationErrors> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => {
                if self.errors.is_empty() {
                    self.fail("request", "The given data was invalid.");
                }
                Err(self.errors)
            }
        }
    }

    /// Resolve presence rules. `Some(value)` means the remaining checks run.
    fn present(&mut self, field: &str, presence: Presence) -> Option<&'a Value> {
        let input = self.input;
        match (input.get(field), presence) {
            (None, Presence::Sometimes | Presence::SometimesRequired) => None,
            (None | Some(Value::Null), Presence::Required)
            | (Some(Value::Null), Presence::SometimesRequired) => {
                self.fail(field, format!("The {} field is required.", attribute(field)));
                None
            }
            (Some(value), _) => Some(value),
        }
    }

    /// A string of at most `max` characters.
    pub fn string(&mut self, field: &str, presence: Presence, max: Option<usize>) -> Option<String> {
        let value = self.present(field, presence)?;

        let Value::String(s) = value else {
            self.fail(field, format!("The {} must be a string.", attribute(field)));
            return None;
        };

        if let Some(max) = max {
            if s.chars().count() > max {
                self.fail(
                    field,
                    format!("The {} must not be greater than {max} characters.", attribute(field)),
                );
                return None;
            }
        }

        Some(s.clone())
    }

    /// A string shaped like `local@domain`.
    pub fn email(&mut self, field: &str, value: &str) -> bool {
        if is_email(value) {
            return true;
        }
        self.fail(field, format!("The {} must be a valid email address.", attribute(field)));
        false
    }

    /// An id that names an existing row of `table`.
    pub async fn existing_id(
        &mut self,
        conn: &mut SqliteConnection,
        field: &str,
        presence: Presence,
        table: &'static str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let Some(value) = self.present(field, presence) else {
            return Ok(None);
        };
        self.check_exists(conn, field, value, table).await
    }

    /// An optional array whose every member names an existing row of `table`.
    /// Member failures are reported as `field.N`. Duplicates are collapsed.
    pub async fn existing_ids(
        &mut self,
        conn: &mut SqliteConnection,
        field: &str,
        table: &'static str,
    ) -> Result<Option<Vec<i64>>, sqlx::Error> {
        let Some(value) = self.present(field, Presence::Sometimes) else {
            return Ok(None);
        };

        let Value::Array(items) = value else {
            self.fail(field, format!("The {} must be an array.", attribute(field)));
            return Ok(None);
        };

        let mut ids = Vec::with_capacity(items.len());
        let mut all_valid = true;
        for (index, item) in items.iter().enumerate() {
            let member = format!("{field}.{index}");
            match self.check_exists(conn, &member, item, table).await? {
                Some(id) if !ids.contains(&id) => ids.push(id),
                Some(_) => {}
                None => all_valid = false,
            }
        }

        Ok(all_valid.then_some(ids))
    }

    /// Fails when `value` is already stored in `table.column` by a row other than `ignore_id`.
    pub async fn unique(
        &mut self,
        conn: &mut SqliteConnection,
        field: &str,
        value: &str,
        table: &'static str,
        column: &'static str,
        ignore_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        if store::is_taken(conn, table, column, value, ignore_id).await? {
            self.fail(field, format!("The {} has already been taken.", attribute(field)));
            return Ok(false);
        }
        Ok(true)
    }

    async fn check_exists(
        &mut self,
        conn: &mut SqliteConnection,
        field: &str,
        value: &Value,
        table: &'static str,
    ) -> Result<Option<i64>, sqlx::Error> {
        if let Some(id) = as_id(value) {
            if store::exists(conn, table, id).await? {
                return Ok(Some(id));
            }
        }
        self.fail(field, format!("The selected {} is invalid.", attribute(field)));
        Ok(None)
    }
}

/// Field names are shown to users with underscores as spaces.
fn attribute(field: &str) -> String {
    field.replace('_', " ")
}

/// Ids arrive as JSON integers or, from forms, as digit strings.
fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}
