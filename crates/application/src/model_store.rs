use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use formweave_core::{AppError, AppResult};
use formweave_domain::{ModelPath, ModelSnapshot, PathSegment};
use serde_json::{Map, Value};
use tracing::debug;

use crate::field_validators::{FieldValidator, run_validators};

/// Structural storage type of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryShape {
    /// String, number, or boolean.
    Scalar,
    /// JSON array.
    List,
    /// JSON object.
    Group,
}

impl EntryShape {
    /// Returns the shape of a non-null value.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(_) => Some(Self::List),
            Value::Object(_) => Some(Self::Group),
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(Self::Scalar),
        }
    }

    /// Returns whether `value` can be stored without recreating the entry.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        Self::of(value).is_none_or(|shape| shape == self)
    }
}

/// Stored value of one model path with validation state.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    path: ModelPath,
    value: Value,
    shape: EntryShape,
    validators: Vec<FieldValidator>,
    errors: Vec<String>,
    dirty: bool,
    touched: bool,
    enabled: bool,
    owner: Option<String>,
}

impl ModelEntry {
    fn new(
        path: ModelPath,
        default: Value,
        is_array: bool,
        validators: Vec<FieldValidator>,
    ) -> Self {
        let (value, shape) = if is_array {
            let value = match default {
                Value::Array(_) => default,
                Value::Null => Value::Array(Vec::new()),
                scalar => {
                    debug!(path = %path, "wrapping scalar default of list entry");
                    Value::Array(vec![scalar])
                }
            };
            (value, EntryShape::List)
        } else {
            let shape = EntryShape::of(&default).unwrap_or(EntryShape::Scalar);
            (default, shape)
        };

        let errors = run_validators(&validators, &value);
        Self {
            path,
            value,
            shape,
            validators,
            errors,
            dirty: false,
            touched: false,
            enabled: true,
            owner: None,
        }
    }

    /// Returns the entry path.
    #[must_use]
    pub fn path(&self) -> &ModelPath {
        &self.path
    }

    /// Returns the current transport value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the storage shape.
    #[must_use]
    pub fn shape(&self) -> EntryShape {
        self.shape
    }

    /// Returns the validators run on every write.
    #[must_use]
    pub fn validators(&self) -> &[FieldValidator] {
        &self.validators
    }

    /// Returns current validation messages.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Returns whether the value passed every validator.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns whether the value changed since creation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the user interacted with the field.
    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    /// Returns whether the entry takes part in validation.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the field id of the mount that last bound the entry.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn revalidate(&mut self) {
        self.errors = run_validators(&self.validators, &self.value);
    }
}

/// Handle returned by [`ModelStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Callback notified with the new value of one path.
pub type ValueListener = Box<dyn FnMut(&ModelPath, &Value) + Send>;

/// Point-in-time copy of every entry and the flat submission document.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    entries: BTreeMap<ModelPath, ModelEntry>,
    raw_document: Map<String, Value>,
}

impl StoreSnapshot {
    /// Returns the number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no entry was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single source of truth for every field value of one form session.
#[derive(Default)]
pub struct ModelStore {
    entries: BTreeMap<ModelPath, ModelEntry>,
    listeners: BTreeMap<ModelPath, Vec<(SubscriptionId, ValueListener)>>,
    next_subscription: u64,
    raw_document: Map<String, Value>,
}

impl ModelStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a first default in the seed document, matching keys
    /// case-insensitively.
    #[must_use]
    pub fn get_model_field_value(seed: &Value, path: &ModelPath) -> Option<Value> {
        path.lookup_case_insensitive(seed)
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// Returns the entry at `path`, creating it with `default` when absent.
    ///
    /// An existing entry is returned unchanged.
    pub fn get_or_create(
        &mut self,
        path: &ModelPath,
        default: Value,
        is_array: bool,
        validators: Vec<FieldValidator>,
    ) -> &ModelEntry {
        self.entries.entry(path.clone()).or_insert_with(|| {
            debug!(path = %path, "created model entry");
            ModelEntry::new(path.clone(), default, is_array, validators)
        })
    }

    /// Returns the entry at `path`.
    #[must_use]
    pub fn entry(&self, path: &ModelPath) -> Option<&ModelEntry> {
        self.entries.get(path)
    }

    /// Returns whether an entry exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &ModelPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the store holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns every entry in path order.
    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.values()
    }

    /// Stores a new value, revalidates, and notifies listeners of `path`.
    ///
    /// Validation failures never error; they are recorded on the entry.
    pub fn set_value(&mut self, path: &ModelPath, value: Value) -> AppResult<()> {
        let entry = self
            .entries
            .get_mut(path)
            .ok_or_else(|| AppError::NotFound(format!("no model entry at '{path}'")))?;

        if !entry.shape.accepts(&value) {
            return Err(AppError::Conflict(format!(
                "value at '{path}' does not match the stored {:?} shape",
                entry.shape
            )));
        }

        entry.value = value;
        entry.dirty = true;
        entry.revalidate();
        let value = entry.value.clone();
        self.notify(path, &value);

        Ok(())
    }

    /// Discards the entry at `path` and creates a fresh one.
    ///
    /// Listeners and ownership of the path survive the recreation.
    pub fn remove_and_recreate(
        &mut self,
        path: &ModelPath,
        new_default: Value,
        validators: Vec<FieldValidator>,
    ) -> &ModelEntry {
        let previous = self.entries.remove(path);
        let is_array = new_default.is_array();
        let mut entry = ModelEntry::new(path.clone(), new_default, is_array, validators);
        if let Some(previous) = previous {
            debug!(
                path = %path,
                previous_shape = ?previous.shape,
                shape = ?entry.shape,
                "recreated model entry"
            );
            entry.owner = previous.owner;
            entry.touched = previous.touched;
            entry.enabled = previous.enabled;
            entry.dirty = true;
        }

        let value = entry.value.clone();
        self.notify(path, &value);

        match self.entries.entry(path.clone()) {
            Entry::Vacant(vacant) => vacant.insert(entry),
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                occupied.into_mut()
            }
        }
    }

    /// Removes the entry at `path`; listeners stay registered.
    pub fn remove(&mut self, path: &ModelPath) -> Option<ModelEntry> {
        self.entries.remove(path)
    }

    /// Registers a listener for value changes of `path`.
    pub fn subscribe(&mut self, path: &ModelPath, listener: ValueListener) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners
            .entry(path.clone())
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes a listener; returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.listeners.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|(candidate, _)| *candidate != id);
            removed |= listeners.len() != before;
            !listeners.is_empty()
        });
        removed
    }

    fn notify(&mut self, path: &ModelPath, value: &Value) {
        if let Some(listeners) = self.listeners.get_mut(path) {
            for (_, listener) in listeners.iter_mut() {
                listener(path, value);
            }
        }
    }

    /// Records the field id of the mount bound to `path`.
    pub fn set_owner(&mut self, path: &ModelPath, owner: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.owner = Some(owner.into());
        }
    }

    /// Includes or excludes `path` from validation.
    pub fn set_enabled(&mut self, path: &ModelPath, enabled: bool) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.enabled = enabled;
        }
    }

    /// Marks `path` as touched so its errors surface.
    pub fn touch(&mut self, path: &ModelPath) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.touched = true;
        }
    }

    /// Marks every entry as touched.
    pub fn mark_all_touched(&mut self) {
        for entry in self.entries.values_mut() {
            entry.touched = true;
        }
    }

    /// Revalidates every enabled entry; returns whether all are valid.
    pub fn validate_all(&mut self) -> bool {
        let mut valid = true;
        for entry in self.entries.values_mut().filter(|entry| entry.enabled) {
            entry.revalidate();
            valid &= entry.is_valid();
        }
        valid
    }

    /// Revalidates and touches enabled entries under `prefix`; returns the
    /// invalid paths.
    pub fn validate_under(&mut self, prefix: &ModelPath) -> Vec<ModelPath> {
        let mut invalid = Vec::new();
        for entry in self
            .entries
            .values_mut()
            .filter(|entry| entry.enabled && entry.path.starts_with(prefix))
        {
            entry.revalidate();
            entry.touched = true;
            if !entry.is_valid() {
                invalid.push(entry.path.clone());
            }
        }
        invalid
    }

    /// Returns enabled entries that failed validation.
    #[must_use]
    pub fn invalid_paths(&self) -> Vec<ModelPath> {
        self.entries
            .values()
            .filter(|entry| entry.enabled && !entry.is_valid())
            .map(|entry| entry.path.clone())
            .collect()
    }

    /// Returns whether any entry changed since creation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.entries.values().any(ModelEntry::is_dirty)
    }

    /// Returns a path to value copy of every entry.
    #[must_use]
    pub fn value_map(&self) -> BTreeMap<ModelPath, Value> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.clone(), entry.value.clone()))
            .collect()
    }

    /// Returns values of every entry under `prefix`.
    #[must_use]
    pub fn values_under(&self, prefix: &ModelPath) -> BTreeMap<ModelPath, Value> {
        self.entries
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, entry)| (path.clone(), entry.value.clone()))
            .collect()
    }

    /// Returns entry paths under `prefix`.
    #[must_use]
    pub fn paths_under(&self, prefix: &ModelPath) -> Vec<ModelPath> {
        self.entries
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Writes `value` into the flat submission document at `id`.
    pub fn mirror_raw(&mut self, id: impl Into<String>, value: Value) {
        self.raw_document.insert(id.into(), value);
    }

    /// Returns the flat submission document.
    #[must_use]
    pub fn raw_document(&self) -> &Map<String, Value> {
        &self.raw_document
    }

    /// Copies every entry and the submission document.
    #[must_use]
    pub fn capture(&self) -> StoreSnapshot {
        StoreSnapshot {
            entries: self.entries.clone(),
            raw_document: self.raw_document.clone(),
        }
    }

    /// Replaces the store content with `snapshot`.
    ///
    /// Entries created after the capture are dropped. Listeners of every
    /// path whose value differs are notified.
    pub fn restore(&mut self, snapshot: &StoreSnapshot) {
        let previous = std::mem::replace(&mut self.entries, snapshot.entries.clone());
        self.raw_document = snapshot.raw_document.clone();

        let changed: Vec<(ModelPath, Value)> = self
            .entries
            .iter()
            .filter(|(path, entry)| {
                previous
                    .get(*path)
                    .is_none_or(|before| before.value != entry.value)
            })
            .map(|(path, entry)| (path.clone(), entry.value.clone()))
            .collect();
        for (path, value) in changed {
            self.notify(&path, &value);
        }
    }
}

impl ModelSnapshot for ModelStore {
    /// Resolves `path` through the deepest entry addressing it or one of its
    /// ancestors.
    fn value_at(&self, path: &ModelPath) -> Option<&Value> {
        if let Some(entry) = self.entries.get(path) {
            return Some(&entry.value);
        }

        let mut ancestor = path.parent();
        while let Some(prefix) = ancestor {
            if let Some(entry) = self.entries.get(&prefix) {
                let rest = path.strip_prefix(&prefix)?;
                return rest
                    .segments()
                    .iter()
                    .try_fold(&entry.value, |current, segment| match segment {
                        PathSegment::Key(key) => current.as_object()?.get(key),
                        PathSegment::Index(index) => current.as_array()?.get(*index),
                    });
            }
            ancestor = prefix.parent();
        }

        None
    }
}

#[cfg(test)]
mod tests;
