use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input for creating a habit. The store fills in everything else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
}

/// Reasons a habit form is rejected before it reaches a store
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please give your habit a name")]
    MissingName,

    #[error("Please add a description to help you stay motivated")]
    MissingDescription,

    #[error("Please pick a color")]
    MissingColor,

    #[error("Please enter a valid target count (minimum 1)")]
    InvalidTarget,
}

impl NewHabit {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            color: color.into(),
            target_count: None,
        }
    }

    pub fn with_target_count(mut self, target_count: u32) -> Self {
        self.target_count = Some(target_count);
        self
    }

    /// Checks the form rules and returns a trimmed copy.
    pub fn validate(&self) -> Result<Self, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::MissingDescription);
        }
        let color = self.color.trim();
        if color.is_empty() {
            return Err(ValidationError::MissingColor);
        }
        if self.target_count == Some(0) {
            return Err(ValidationError::InvalidTarget);
        }

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            target_count: self.target_count,
        })
    }
}
