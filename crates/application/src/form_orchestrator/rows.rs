use std::collections::BTreeSet;

use formweave_core::{AppError, AppResult};
use formweave_domain::{ComplexType, ModelPath};
use tracing::info;

use crate::field_mount::{FieldMount, write_value};
use crate::panel_state::{Expansion, PanelState, RowSave};
use crate::render_model::RowKey;

use super::FormOrchestrator;
use super::plan::{LayoutItem, Planner, collect_subtree};

impl FormOrchestrator {
    /// Appends a row to the repeater addressed by path or field id.
    pub fn add_row(&mut self, target: &str) -> AppResult<RowKey> {
        self.ensure_editable()?;
        let composite = self.resolve_target(target)?;
        let field = self.mounts[composite].field().clone();
        let composite_path = self.mounts[composite].path().clone();

        let next_index = match self.plan.composite_mut(composite) {
            Some(LayoutItem::Composite {
                complex_type: ComplexType::Repeater,
                next_index,
                ..
            }) => *next_index,
            _ => {
                return Err(AppError::Validation(format!(
                    "field '{}' is not a repeater",
                    field.id()
                )));
            }
        };

        let base_index = self.mounts.len();
        let (row, planned) =
            Planner::new(&self.structure, &mut self.next_row_key, base_index)
                .plan_row(&field, &composite_path, next_index);
        let key = row.key;

        for (offset, planned_mount) in planned.into_iter().enumerate() {
            let mut mount = FieldMount::new(planned_mount.spec)
                .with_resync(base_index + offset, self.resync.clone());
            mount.mount(&mut self.store, self.structure.model(), &self.registry);
            self.mounts.push(mount);
            self.mount_rows.push(planned_mount.row);
            self.visible.push(true);
        }

        if let Some(LayoutItem::Composite {
            rows, next_index, ..
        }) = self.plan.composite_mut(composite)
        {
            rows.push(row);
            *next_index += 1;
        }

        info!(field_id = %field.id(), row = %key, index = next_index, "repeater row added");
        self.after_change();
        Ok(key)
    }

    /// Removes a repeater row and destroys its mounts.
    ///
    /// Model entries of the row stay in the store until
    /// [`Self::cleanup_orphaned_entries`].
    pub fn remove_row(&mut self, key: RowKey) -> AppResult<()> {
        self.ensure_editable()?;
        let (composite, complex_type, _) = self
            .plan
            .row(key)
            .ok_or_else(|| AppError::NotFound(format!("no {key}")))?;
        if complex_type != ComplexType::Repeater {
            return Err(AppError::Validation(format!("{key} cannot be removed")));
        }

        let Some(LayoutItem::Composite { rows, .. }) = self.plan.composite_mut(composite) else {
            return Err(AppError::NotFound(format!("no {key}")));
        };
        let position = rows
            .iter()
            .position(|row| row.key == key)
            .ok_or_else(|| AppError::NotFound(format!("no {key}")))?;
        let removed = rows.remove(position);

        let mut mounts = Vec::new();
        let mut row_keys = vec![removed.key];
        collect_subtree(&removed.children, &mut mounts, &mut row_keys);
        for index in mounts {
            self.mounts[index].destroy(&mut self.store);
        }
        for row_key in row_keys {
            self.panels.remove(&row_key);
        }

        info!(row = %key, path = %removed.path, "repeater row removed");
        self.after_change();
        Ok(())
    }

    /// Removes entries no live mount is bound to; returns their paths.
    pub fn cleanup_orphaned_entries(&mut self) -> Vec<ModelPath> {
        let live: BTreeSet<&ModelPath> = self
            .mounts
            .iter()
            .filter(|mount| !mount.is_destroyed() && !mount.is_structural())
            .map(FieldMount::path)
            .collect();
        let orphaned: Vec<ModelPath> = self
            .store
            .entries()
            .map(|entry| entry.path())
            .filter(|path| !live.contains(path))
            .cloned()
            .collect();

        for path in &orphaned {
            self.store.remove(path);
        }
        if !orphaned.is_empty() {
            info!(removed = orphaned.len(), "orphaned model entries removed");
        }
        orphaned
    }

    /// Returns the panel state of a repeater row.
    #[must_use]
    pub fn row_panel(&self, key: RowKey) -> Option<&PanelState> {
        self.plan
            .row(key)
            .filter(|(_, complex_type, _)| *complex_type == ComplexType::Repeater)
            .map(|_| self.panels.get(&key).unwrap_or(&DEFAULT_PANEL))
    }

    /// Returns the keys of the rows of a repeater or complex field.
    pub fn row_keys(&mut self, target: &str) -> AppResult<Vec<RowKey>> {
        let composite = self.resolve_target(target)?;
        match self.plan.composite_mut(composite) {
            Some(LayoutItem::Composite { rows, .. }) => Ok(rows.iter().map(|row| row.key).collect()),
            _ => Err(AppError::Validation(format!("field '{target}' has no rows"))),
        }
    }

    /// Expands or collapses a repeater row.
    pub fn toggle_row(&mut self, key: RowKey) -> AppResult<Expansion> {
        self.ensure_panel(key)?;
        self.panels.entry(key).or_default().toggle()
    }

    /// Starts editing a repeater row.
    pub fn begin_row_edit(&mut self, key: RowKey) -> AppResult<()> {
        self.ensure_editable()?;
        let row_path = self.ensure_panel(key)?;
        let snapshot = self.store.values_under(&row_path);
        self.panels.entry(key).or_default().begin_edit(snapshot)
    }

    /// Leaves editing and restores the values captured at edit entry.
    pub fn cancel_row_edit(&mut self, key: RowKey) -> AppResult<()> {
        self.ensure_panel(key)?;
        let snapshot = self.panels.entry(key).or_default().cancel_edit()?;
        for (path, value) in snapshot {
            let validators = self
                .store
                .entry(&path)
                .map(|entry| entry.validators().to_vec())
                .unwrap_or_default();
            write_value(&mut self.store, &path, &validators, value);
        }
        self.after_change();
        Ok(())
    }

    /// Validates a row and leaves editing when it is valid.
    pub fn save_row_edit(&mut self, key: RowKey) -> AppResult<RowSave> {
        let row_path = self.ensure_panel(key)?;
        if !self.panels.get(&key).is_some_and(PanelState::is_editing) {
            return Err(AppError::Conflict(format!("{key} is not being edited")));
        }

        self.after_change();
        let invalid_paths = self.store.validate_under(&row_path);
        if !invalid_paths.is_empty() {
            return Ok(RowSave::Invalid { invalid_paths });
        }
        self.panels.entry(key).or_default().save_edit()?;
        Ok(RowSave::Saved)
    }

    fn ensure_panel(&self, key: RowKey) -> AppResult<ModelPath> {
        match self.plan.row(key) {
            Some((_, ComplexType::Repeater, row)) => Ok(row.path.clone()),
            Some(_) => Err(AppError::Validation(format!("{key} has no panel"))),
            None => Err(AppError::NotFound(format!("no {key}"))),
        }
    }
}

static DEFAULT_PANEL: PanelState = PanelState::new();
