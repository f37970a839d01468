//! Command responses
//!
//! The server answers every command with a [`Response`] listing one work item
//! per target. Accessors return [`CommandError`] when a piece the caller
//! needs is missing, so callers can chain them with `?`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// A field value: either a reference to another item or a plain JSON value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Item {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_type: Option<String>,
    },
    Value(serde_json::Value),
}

impl Field {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Value(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Booleans, also accepting the strings "true" and "false"
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Field::Value(serde_json::Value::Bool(b)) => Some(*b),
            Field::Value(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    /// Id of the referenced item
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Field::Item { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Outcome recorded for a work item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ItemResult>,
}

impl WorkItem {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Command text as echoed by the server
    #[serde(default)]
    pub command: String,
    pub exit_code: i32,
    #[serde(default)]
    pub work_items: Vec<WorkItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl Response {
    /// Fails when the server reported an exception or a non-zero exit code
    pub fn ensure_success(&self, command: &str) -> Result<(), CommandError> {
        if let Some(exception) = &self.exception {
            return Err(CommandError::new(exception.clone(), self.exit_code, command));
        }
        if self.exit_code != 0 {
            return Err(CommandError::new(
                format!("command exited with code {}", self.exit_code),
                self.exit_code,
                command,
            ));
        }
        Ok(())
    }

    pub fn work_item(&self, id: &str) -> Option<&WorkItem> {
        self.work_items.iter().find(|item| item.id == id)
    }

    /// Id of the item stored in `fields[field]` of the result for work item `id`
    pub fn result_item_id(
        &self,
        id: &str,
        field_name: &str,
        command: &str,
    ) -> Result<String, CommandError> {
        let missing = |what: String| CommandError::new(what, self.exit_code, command);

        let item = self
            .work_item(id)
            .ok_or_else(|| missing(format!("response has no work item for '{}'", id)))?;
        let result = item
            .result
            .as_ref()
            .ok_or_else(|| missing(format!("work item '{}' has no result", id)))?;
        let field = result.fields.get(field_name).ok_or_else(|| {
            missing(format!("result of '{}' has no '{}' field", id, field_name))
        })?;

        field.item_id().map(str::to_string).ok_or_else(|| {
            missing(format!("field '{}' of '{}' is not an item", field_name, id))
        })
    }
}
