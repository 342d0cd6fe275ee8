use std::str::FromStr;

use formweave_core::AppError;
use serde::{Deserialize, Serialize};

/// Render surface selected for a whole form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Editable inputs.
    #[default]
    Edit,
    /// Compact single-line cell rendering.
    List,
    /// Read-only detail rendering.
    View,
}

impl RenderMode {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::List => "list",
            Self::View => "view",
        }
    }

    /// Returns whether values can be changed and submitted in this mode.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Edit)
    }
}

impl FromStr for RenderMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::Edit),
            "list" => Ok(Self::List),
            "view" => Ok(Self::View),
            _ => Err(AppError::Validation(format!(
                "unknown render mode '{value}'"
            ))),
        }
    }
}
