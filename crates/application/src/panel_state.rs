use std::collections::BTreeMap;

use formweave_core::{AppError, AppResult};
use formweave_domain::ModelPath;
use serde_json::Value;

/// Visibility of a row panel body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expansion {
    /// Only the row header is rendered.
    #[default]
    Collapsed,
    /// Row content is rendered.
    Expanded,
}

/// Edit sub-state of a row panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditState {
    /// Row values render read-only.
    #[default]
    ReadOnly,
    /// Row values are being edited.
    Editing,
}

/// State machine of one repeater row panel.
#[derive(Debug, Clone)]
pub struct PanelState {
    expansion: Expansion,
    edit: EditState,
    snapshot: Option<BTreeMap<ModelPath, Value>>,
}

impl PanelState {
    /// Returns a collapsed, read-only panel.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            expansion: Expansion::Collapsed,
            edit: EditState::ReadOnly,
            snapshot: None,
        }
    }

    /// Returns the expansion state.
    #[must_use]
    pub fn expansion(&self) -> Expansion {
        self.expansion
    }

    /// Returns the edit sub-state.
    #[must_use]
    pub fn edit_state(&self) -> EditState {
        self.edit
    }

    /// Returns whether the body is rendered.
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expansion == Expansion::Expanded
    }

    /// Returns whether the row is being edited.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.edit == EditState::Editing
    }

    /// Flips between collapsed and expanded.
    ///
    /// A panel being edited cannot collapse.
    pub fn toggle(&mut self) -> AppResult<Expansion> {
        self.expansion = match (self.expansion, self.edit) {
            (Expansion::Expanded, EditState::Editing) => {
                return Err(AppError::Conflict(
                    "cannot collapse a row while it is being edited".to_owned(),
                ));
            }
            (Expansion::Expanded, EditState::ReadOnly) => Expansion::Collapsed,
            (Expansion::Collapsed, _) => Expansion::Expanded,
        };
        Ok(self.expansion)
    }

    /// Enters editing, forcing the panel open and remembering row values.
    pub fn begin_edit(&mut self, row_values: BTreeMap<ModelPath, Value>) -> AppResult<()> {
        if self.is_editing() {
            return Err(AppError::Conflict("row is already being edited".to_owned()));
        }
        self.expansion = Expansion::Expanded;
        self.edit = EditState::Editing;
        self.snapshot = Some(row_values);
        Ok(())
    }

    /// Leaves editing and returns the values to restore.
    pub fn cancel_edit(&mut self) -> AppResult<BTreeMap<ModelPath, Value>> {
        if !self.is_editing() {
            return Err(AppError::Conflict("row is not being edited".to_owned()));
        }
        self.edit = EditState::ReadOnly;
        Ok(self.snapshot.take().unwrap_or_default())
    }

    /// Leaves editing after a successful row validation.
    pub fn save_edit(&mut self) -> AppResult<()> {
        if !self.is_editing() {
            return Err(AppError::Conflict("row is not being edited".to_owned()));
        }
        self.edit = EditState::ReadOnly;
        self.snapshot = None;
        Ok(())
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of saving a row being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSave {
    /// Row values are valid and editing ended.
    Saved,
    /// Row stays in editing; the listed paths failed validation.
    Invalid {
        /// Paths of the row that failed validation.
        invalid_paths: Vec<ModelPath>,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use formweave_domain::ModelPath;
    use serde_json::json;

    use super::{EditState, Expansion, PanelState};

    #[test]
    fn begin_edit_forces_expansion_and_blocks_collapse() {
        let mut panel = PanelState::default();
        assert_eq!(panel.expansion(), Expansion::Collapsed);

        assert!(panel.begin_edit(BTreeMap::new()).is_ok());
        assert!(panel.is_expanded());
        assert_eq!(panel.edit_state(), EditState::Editing);
        assert!(panel.toggle().is_err());
        assert!(panel.begin_edit(BTreeMap::new()).is_err());

        assert!(panel.save_edit().is_ok());
        assert!(matches!(panel.toggle(), Ok(Expansion::Collapsed)));
    }

    #[test]
    fn cancel_edit_returns_the_snapshot() {
        let mut panel = PanelState::default();
        let path = ModelPath::root().key("rows").index(0).key("street");
        let snapshot = BTreeMap::from([(path.clone(), json!("Main"))]);

        assert!(panel.begin_edit(snapshot).is_ok());
        let restored = panel.cancel_edit();
        assert!(restored.is_ok());
        assert_eq!(
            restored.unwrap_or_else(|_| unreachable!()).get(&path),
            Some(&json!("Main"))
        );
        assert!(panel.is_expanded());
        assert!(!panel.is_editing());
        assert!(panel.cancel_edit().is_err());
    }
}
