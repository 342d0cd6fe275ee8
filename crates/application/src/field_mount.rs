use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use formweave_core::{AppError, AppResult};
use formweave_domain::{FieldNode, InputOption, ModelPath, RenderMode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::field_registry::FieldTypeRegistry;
use crate::field_validators::{FieldValidator, derive_validators};
use crate::field_widget::{FieldWidget, NativeValue, WidgetBinding};
use crate::model_store::{ModelStore, SubscriptionId};
use crate::render_model::{RenderedField, RenderedNode};

/// Lifecycle state of one field mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    /// Created, nothing bound yet.
    Unmounted,
    /// Model entry resolved.
    ControlBound,
    /// Widget instantiated and initialized from the entry.
    WidgetLoaded,
    /// Widget changes flow into the model store.
    Subscribed,
    /// Field type has no registered widget.
    Placeholder,
    /// Torn down; the model entry is kept.
    Destroyed,
}

/// Everything a mount needs to know about its field.
#[derive(Debug, Clone)]
pub struct MountSpec {
    /// Schema node of the field.
    pub field: FieldNode,
    /// Absolute model path of the value.
    pub path: ModelPath,
    /// Prefix visibility leaves resolve against first.
    pub scope: ModelPath,
    /// Resolved choice options.
    pub options: Vec<InputOption>,
    /// Row-local seed used when the document has no value at `path`.
    pub fallback_seed: Option<Value>,
    /// Repeater and complex regions bind no entry of their own.
    pub structural: bool,
    /// Whether values are mirrored into the flat submission document.
    pub mirror_raw: bool,
}

impl MountSpec {
    /// Creates the spec of a top-level scalar field.
    #[must_use]
    pub fn scalar(field: FieldNode, path: ModelPath, options: Vec<InputOption>) -> Self {
        Self {
            field,
            path,
            scope: ModelPath::root(),
            options,
            fallback_seed: None,
            structural: false,
            mirror_raw: true,
        }
    }
}

/// Indices of mounts whose model entry changed since the last drain.
///
/// Store listeners push into it; the owner of the mounts drains it and
/// reloads only those widgets.
#[derive(Debug, Clone, Default)]
pub struct ResyncQueue(Arc<Mutex<BTreeSet<usize>>>);

impl ResyncQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, index: usize) {
        if let Ok(mut pending) = self.0.lock() {
            pending.insert(index);
        }
    }

    fn forget(&self, index: usize) {
        if let Ok(mut pending) = self.0.lock() {
            pending.remove(&index);
        }
    }

    /// Takes every queued index in ascending order.
    #[must_use]
    pub fn drain(&self) -> Vec<usize> {
        self.0
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending).into_iter().collect())
            .unwrap_or_default()
    }
}

/// Runtime unit binding one field node to one widget and one model entry.
pub struct FieldMount {
    spec: MountSpec,
    state: MountState,
    widget: Option<Box<dyn FieldWidget>>,
    validators: Vec<FieldValidator>,
    readiness_emitted: bool,
    resync: Option<(usize, ResyncQueue)>,
    subscription: Option<SubscriptionId>,
}

impl FieldMount {
    /// Creates an unmounted field mount.
    #[must_use]
    pub fn new(spec: MountSpec) -> Self {
        let validators = if spec.structural {
            Vec::new()
        } else {
            derive_validators(spec.field.field_type(), spec.field.metadata(), &spec.options)
        };

        Self {
            spec,
            state: MountState::Unmounted,
            widget: None,
            validators,
            readiness_emitted: false,
            resync: None,
            subscription: None,
        }
    }

    /// Queues `index` on `queue` whenever the bound entry changes.
    #[must_use]
    pub fn with_resync(mut self, index: usize, queue: ResyncQueue) -> Self {
        self.resync = Some((index, queue));
        self
    }

    /// Returns the flat field identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.spec.field.id()
    }

    /// Returns the mount description.
    #[must_use]
    pub fn spec(&self) -> &MountSpec {
        &self.spec
    }

    /// Returns the bound model path.
    #[must_use]
    pub fn path(&self) -> &ModelPath {
        &self.spec.path
    }

    /// Returns the visibility scope.
    #[must_use]
    pub fn scope(&self) -> &ModelPath {
        &self.spec.scope
    }

    /// Returns the schema node.
    #[must_use]
    pub fn field(&self) -> &FieldNode {
        &self.spec.field
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> MountState {
        self.state
    }

    /// Returns whether widget changes reach the model store.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state == MountState::Subscribed
    }

    /// Returns whether the mount was torn down.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state == MountState::Destroyed
    }

    /// Returns whether this is a repeater or complex region.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.spec.structural
    }

    /// Returns the widget, once loaded.
    #[must_use]
    pub fn widget(&self) -> Option<&dyn FieldWidget> {
        self.widget.as_deref()
    }

    /// Returns derived validators.
    #[must_use]
    pub fn validators(&self) -> &[FieldValidator] {
        &self.validators
    }

    /// Runs binding, widget loading and subscription.
    ///
    /// Returns `true` when this call emitted the mount's readiness signal.
    /// Readiness is emitted once per mount, on the placeholder path too.
    pub fn mount(
        &mut self,
        store: &mut ModelStore,
        seed: &Value,
        registry: &FieldTypeRegistry,
    ) -> bool {
        if self.state != MountState::Unmounted {
            warn!(field_id = %self.id(), state = ?self.state, "field mount already mounted");
            return false;
        }

        let widget = registry
            .resolve(self.spec.field.field_type())
            .map(|factory| factory());

        if !self.spec.structural {
            let (built_in, is_array) = widget
                .as_ref()
                .map(|widget| (widget.default_transport(), widget.is_array()))
                .unwrap_or((Value::Null, false));
            self.bind_control(store, seed, built_in, is_array);
            self.state = MountState::ControlBound;
        }

        let Some(mut widget) = widget else {
            warn!(
                field_id = %self.id(),
                field_type = %self.spec.field.field_type(),
                "unregistered field type, rendering placeholder"
            );
            if !self.spec.structural {
                store.set_enabled(&self.spec.path, false);
            }
            self.state = MountState::Placeholder;
            return self.emit_readiness();
        };

        widget.bind(WidgetBinding {
            id: self.id().to_owned(),
            label: self.spec.field.display_name().to_owned(),
            metadata: self.spec.field.metadata().clone(),
            options: self.spec.options.clone(),
        });
        if !self.spec.structural {
            let stored = store
                .entry(&self.spec.path)
                .map(|entry| entry.value().clone())
                .unwrap_or_default();
            let native = native_or_null(widget.as_ref(), &stored, self.id());
            widget.set_value(native);
        }
        self.widget = Some(widget);
        self.state = MountState::WidgetLoaded;

        if !self.spec.structural
            && let Some((index, queue)) = self.resync.clone()
        {
            let id = store.subscribe(
                &self.spec.path,
                Box::new(move |_: &ModelPath, _: &Value| queue.push(index)),
            );
            self.subscription = Some(id);
        }
        self.state = MountState::Subscribed;
        debug!(field_id = %self.id(), path = %self.spec.path, "field mount subscribed");
        self.emit_readiness()
    }

    fn emit_readiness(&mut self) -> bool {
        if self.readiness_emitted {
            return false;
        }
        self.readiness_emitted = true;
        true
    }

    fn bind_control(&self, store: &mut ModelStore, seed: &Value, built_in: Value, is_array: bool) {
        let path = &self.spec.path;
        let id = self.spec.field.id();
        let existing = store
            .entry(path)
            .map(|entry| (entry.value().clone(), entry.owner() == Some(id)));

        let resolved = match &existing {
            Some((value, true)) => value.clone(),
            _ => ModelStore::get_model_field_value(seed, path)
                .or_else(|| self.spec.fallback_seed.clone().filter(|value| !value.is_null()))
                .or_else(|| {
                    self.spec
                        .field
                        .metadata()
                        .default_value()
                        .filter(|value| !value.is_null())
                        .cloned()
                })
                .unwrap_or(built_in),
        };

        store.get_or_create(path, resolved.clone(), is_array, self.validators.clone());
        if let Some((previous, false)) = existing
            && previous != resolved
        {
            debug!(field_id = %id, path = %path, "overwriting value bound by an earlier mount");
            write_value(store, path, &self.validators, resolved);
        }
        store.set_owner(path, id);

        if self.spec.mirror_raw {
            let current = store
                .entry(path)
                .map(|entry| entry.value().clone())
                .unwrap_or_default();
            store.mirror_raw(id, current);
        }
    }

    /// Applies a user edit to the widget.
    ///
    /// Edits on destroyed or placeholder mounts are ignored.
    pub fn input(&mut self, value: NativeValue) {
        if let Some(widget) = self.widget.as_mut() {
            widget.input(value);
        }
    }

    /// Converts a transport value with the widget and applies it as an edit.
    pub fn input_transport(&mut self, value: &Value) -> AppResult<()> {
        let widget = self.widget.as_mut().ok_or_else(|| {
            AppError::Conflict(format!("field '{}' has no loaded widget", self.spec.field.id()))
        })?;
        let native = widget.from_transport(value)?;
        widget.input(native);
        Ok(())
    }

    /// Drains widget changes in emission order into the model store.
    ///
    /// Returns the number of changes applied. Changes drained while the
    /// mount is not subscribed are discarded.
    pub fn flush_changes(&mut self, store: &mut ModelStore) -> usize {
        let Some(widget) = self.widget.as_mut() else {
            return 0;
        };
        let changes = widget.take_changes();
        if self.state != MountState::Subscribed || self.spec.structural {
            if !changes.is_empty() {
                debug!(
                    field_id = %self.spec.field.id(),
                    discarded = changes.len(),
                    "discarding changes of inactive field mount"
                );
            }
            return 0;
        }

        let mut applied = 0;
        for native in changes {
            let transport = match widget.to_transport(&native) {
                Ok(transport) => transport,
                Err(error) => {
                    warn!(
                        field_id = %self.spec.field.id(),
                        error = %error,
                        "widget value could not be converted, resetting widget"
                    );
                    widget.set_value(NativeValue::Null);
                    continue;
                }
            };

            write_value(store, &self.spec.path, &self.validators, transport.clone());
            if self.spec.mirror_raw {
                store.mirror_raw(self.spec.field.id(), transport);
            }
            applied += 1;
        }

        // The widget already shows what it just wrote.
        if applied > 0
            && let Some((index, queue)) = &self.resync
        {
            queue.forget(*index);
        }
        applied
    }

    /// Reloads the widget value from the model store without emitting.
    pub fn sync_from_store(&mut self, store: &ModelStore) {
        if self.spec.structural || self.state != MountState::Subscribed {
            return;
        }
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        let stored = store
            .entry(&self.spec.path)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        let native = native_or_null(widget.as_ref(), &stored, self.spec.field.id());
        widget.set_value(native);
    }

    /// Renders the widget surface with touched validation errors.
    #[must_use]
    pub fn render_field(&self, mode: RenderMode, store: &ModelStore) -> Option<RenderedField> {
        let widget = self.widget.as_ref()?;
        let mut rendered = widget.render(mode);
        if let Some(entry) = store.entry(&self.spec.path)
            && !self.spec.structural
            && entry.is_touched()
        {
            rendered.errors = entry.errors().to_vec();
        }
        Some(rendered)
    }

    /// Renders a scalar field or its placeholder.
    #[must_use]
    pub fn render(&self, mode: RenderMode, store: &ModelStore) -> RenderedNode {
        match self.render_field(mode, store) {
            Some(field) => RenderedNode::Field(field),
            None => self.placeholder(),
        }
    }

    /// Returns the placeholder shown for an unregistered field type.
    #[must_use]
    pub fn placeholder(&self) -> RenderedNode {
        RenderedNode::Placeholder {
            id: self.id().to_owned(),
            message: format!(
                "unregistered field type '{}'",
                self.spec.field.field_type()
            ),
        }
    }

    /// Unsubscribes and disposes the widget; the model entry is kept.
    pub fn destroy(&mut self, store: &mut ModelStore) {
        if self.state == MountState::Destroyed {
            return;
        }
        self.state = MountState::Destroyed;
        if let Some(id) = self.subscription.take() {
            store.unsubscribe(id);
        }
        if let Some(widget) = self.widget.as_mut() {
            widget.dispose();
        }
        debug!(field_id = %self.spec.field.id(), path = %self.spec.path, "field mount destroyed");
    }
}

fn native_or_null(widget: &dyn FieldWidget, stored: &Value, field_id: &str) -> NativeValue {
    widget.from_transport(stored).unwrap_or_else(|error| {
        warn!(
            field_id = %field_id,
            error = %error,
            "stored value could not be converted, showing empty value"
        );
        NativeValue::Null
    })
}

pub(crate) fn write_value(
    store: &mut ModelStore,
    path: &ModelPath,
    validators: &[FieldValidator],
    value: Value,
) {
    match store.set_value(path, value.clone()) {
        Ok(()) => {}
        Err(AppError::Conflict(reason)) => {
            debug!(path = %path, reason = %reason, "replacing model entry after shape change");
            store.remove_and_recreate(path, value.clone(), validators.to_vec());
            if let Err(error) = store.set_value(path, value) {
                warn!(path = %path, error = %error, "value rejected after entry replacement");
            }
        }
        Err(AppError::NotFound(_)) => {
            store.get_or_create(path, value.clone(), value.is_array(), validators.to_vec());
            if let Err(error) = store.set_value(path, value) {
                warn!(path = %path, error = %error, "value rejected by recreated entry");
            }
        }
        Err(error) => warn!(path = %path, error = %error, "value rejected by model store"),
    }
}

#[cfg(test)]
mod tests;
