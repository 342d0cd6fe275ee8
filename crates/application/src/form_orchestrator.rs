mod plan;
mod render;
mod rows;
mod submit;

use std::collections::BTreeMap;
use std::sync::Arc;

use formweave_core::{AppError, AppResult, FormSessionId};
use formweave_domain::{
    ComplexType, FormStructure, ModelPath, ModelSnapshot, PathSegment, RenderMode,
    evaluate_in_scope,
};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::field_mount::{FieldMount, MountState, ResyncQueue};
use crate::field_registry::FieldTypeRegistry;
use crate::field_widget::NativeValue;
use crate::form_ports::{FormStructureSource, SubmitSink};
use crate::initialization_barrier::{BarrierProgress, InitializationBarrier};
use crate::model_store::{ModelStore, StoreSnapshot};
use crate::panel_state::PanelState;
use crate::render_model::RowKey;

use plan::{FormPlan, LayoutItem, PlannedMount, Planner, RowLayout};

pub use plan::count_field_nodes;

/// Drives one editing session of a server-described form.
///
/// Owns the model store, every field mount, the initialization barrier and
/// the row panels. All work is synchronous except submission.
pub struct FormOrchestrator {
    session_id: FormSessionId,
    structure: FormStructure,
    registry: FieldTypeRegistry,
    sink: Arc<dyn SubmitSink>,
    mode: RenderMode,
    store: ModelStore,
    plan: FormPlan,
    mounts: Vec<FieldMount>,
    mount_rows: Vec<Option<RowKey>>,
    visible: Vec<bool>,
    barrier: InitializationBarrier,
    initialize_started: bool,
    panels: BTreeMap<RowKey, PanelState>,
    next_row_key: u64,
    generation: u64,
    submitting: bool,
    upload_signal: Option<watch::Receiver<bool>>,
    baseline: Option<StoreSnapshot>,
    resync: ResyncQueue,
}

impl FormOrchestrator {
    /// Plans the form; nothing is mounted until [`Self::initialize`].
    #[must_use]
    pub fn new(
        structure: FormStructure,
        registry: FieldTypeRegistry,
        mode: RenderMode,
        sink: Arc<dyn SubmitSink>,
    ) -> Self {
        let mut next_row_key = 0;
        let (plan, planned) = Planner::new(&structure, &mut next_row_key, 0).plan_root();
        let target = planned.len();

        let mut orchestrator = Self {
            session_id: FormSessionId::new(),
            structure,
            registry,
            sink,
            mode,
            store: ModelStore::new(),
            plan: FormPlan::default(),
            mounts: Vec::new(),
            mount_rows: Vec::new(),
            visible: Vec::new(),
            barrier: InitializationBarrier::new(target),
            initialize_started: false,
            panels: BTreeMap::new(),
            next_row_key,
            generation: 0,
            submitting: false,
            upload_signal: None,
            baseline: None,
            resync: ResyncQueue::new(),
        };
        orchestrator.install(plan, planned);
        orchestrator
    }

    /// Loads the structure from `source`, then plans and initializes.
    pub async fn load(
        source: &dyn FormStructureSource,
        registry: FieldTypeRegistry,
        mode: RenderMode,
        sink: Arc<dyn SubmitSink>,
    ) -> AppResult<Self> {
        let structure = source.load().await?;
        let mut orchestrator = Self::new(structure, registry, mode, sink);
        orchestrator.initialize();
        Ok(orchestrator)
    }

    fn install(&mut self, plan: FormPlan, planned: Vec<PlannedMount>) {
        self.plan = plan;
        self.mounts = Vec::with_capacity(planned.len());
        self.mount_rows = Vec::with_capacity(planned.len());
        for (index, PlannedMount { spec, row }) in planned.into_iter().enumerate() {
            self.mounts
                .push(FieldMount::new(spec).with_resync(index, self.resync.clone()));
            self.mount_rows.push(row);
        }
        self.visible = vec![true; self.mounts.len()];
        let stale = self.resync.drain();
        if !stale.is_empty() {
            debug!(session_id = %self.session_id, dropped = stale.len(), "dropped pending widget resyncs");
        }
    }

    /// Mounts every field in document pre-order and counts readiness.
    ///
    /// The consolidated refresh and the completion callbacks run once the
    /// last planned mount reported readiness.
    pub fn initialize(&mut self) {
        if self.initialize_started {
            warn!(session_id = %self.session_id, "form already initialized");
            return;
        }
        self.initialize_started = true;
        info!(
            session_id = %self.session_id,
            field_mounts = self.barrier.target(),
            mode = self.mode.as_str(),
            "initializing form"
        );

        if self.barrier.complete_if_empty() {
            self.complete_initialization();
            return;
        }

        for index in 0..self.mounts.len() {
            let ready = self.mounts[index].mount(&mut self.store, self.structure.model(), &self.registry);
            if ready && self.barrier.signal(index) == BarrierProgress::Completed {
                self.complete_initialization();
            }
        }
    }

    fn complete_initialization(&mut self) {
        self.refresh();
        self.baseline = Some(self.store.capture());
        info!(
            session_id = %self.session_id,
            generation = self.generation,
            entries = self.store.len(),
            "form initialized"
        );
        self.barrier.fire();
    }

    /// Registers a callback run once when initialization completes.
    ///
    /// Runs immediately when the form is already initialized.
    pub fn on_initialized(&mut self, callback: impl FnOnce() + Send + 'static) {
        if let Some(callback) = self.barrier.on_complete(Box::new(callback)) {
            callback();
        }
    }

    /// Re-evaluates visibility, resyncs widgets of changed entries and bumps
    /// the render generation.
    pub fn refresh(&mut self) {
        self.after_change();
        self.generation += 1;
        debug!(session_id = %self.session_id, generation = self.generation, "form refreshed");
    }

    fn after_change(&mut self) {
        self.apply_resyncs();
        self.assemble_composites();
        self.evaluate_visibility();
    }

    /// Reloads the widgets whose entries were written since the last pass.
    fn apply_resyncs(&mut self) {
        for index in self.resync.drain() {
            if let Some(mount) = self.mounts.get_mut(index) {
                mount.sync_from_store(&self.store);
            }
        }
    }

    fn evaluate_visibility(&mut self) {
        let live = LiveModel {
            store: &self.store,
            composites: self.composite_values(),
        };
        let mut visible = vec![false; self.mounts.len()];
        for item in self.plan.items() {
            self.mark_visible(item, true, &live, &mut visible);
        }

        let mut bound: BTreeMap<ModelPath, bool> = BTreeMap::new();
        for (index, mount) in self.mounts.iter().enumerate() {
            if mount.is_structural() || mount.state() != MountState::Subscribed {
                continue;
            }
            *bound.entry(mount.path().clone()).or_default() |= visible[index];
        }
        let paths: Vec<ModelPath> = self.store.entries().map(|entry| entry.path().clone()).collect();
        for path in paths {
            let enabled = bound.get(&path).copied().unwrap_or(false);
            self.store.set_enabled(&path, enabled);
        }

        self.visible = visible;
    }

    fn mark_visible(
        &self,
        item: &LayoutItem,
        inherited: bool,
        live: &LiveModel<'_>,
        visible: &mut [bool],
    ) {
        match item {
            LayoutItem::Section { children, .. } => {
                for child in children {
                    self.mark_visible(child, inherited, live, visible);
                }
            }
            LayoutItem::Field { mount } => {
                visible[*mount] = inherited && self.condition_holds(*mount, live);
            }
            LayoutItem::Composite { mount, rows, .. } => {
                let shown = inherited && self.condition_holds(*mount, live);
                visible[*mount] = shown;
                for row in rows {
                    for child in &row.children {
                        self.mark_visible(child, shown, live, visible);
                    }
                }
            }
            LayoutItem::Missing { .. } => {}
        }
    }

    fn condition_holds(&self, index: usize, live: &LiveModel<'_>) -> bool {
        let mount = &self.mounts[index];
        let field = mount.field();
        field.metadata().visible()
            && field
                .visibility()
                .is_none_or(|condition| evaluate_in_scope(condition, live, mount.scope()))
    }

    /// Assembles every live repeater and complex field, nested ones included,
    /// keyed by its model path.
    fn composite_values(&self) -> BTreeMap<ModelPath, Value> {
        let mut composites = BTreeMap::new();
        for item in self.plan.items() {
            self.collect_composites(item, &mut composites);
        }
        composites
    }

    fn collect_composites(&self, item: &LayoutItem, composites: &mut BTreeMap<ModelPath, Value>) {
        match item {
            LayoutItem::Section { children, .. } => {
                for child in children {
                    self.collect_composites(child, composites);
                }
            }
            LayoutItem::Composite {
                mount,
                complex_type,
                rows,
                ..
            } => {
                let value = self.assemble_composite(*complex_type, rows);
                composites.insert(self.mounts[*mount].path().clone(), value);
                for row in rows {
                    for child in &row.children {
                        self.collect_composites(child, composites);
                    }
                }
            }
            LayoutItem::Field { .. } | LayoutItem::Missing { .. } => {}
        }
    }

    /// Mirrors top-level repeater and complex values, assembled from live
    /// rows, into the flat submission document.
    fn assemble_composites(&mut self) {
        let mut assembled = Vec::new();
        for item in self.plan.items() {
            self.collect_top_level(item, &mut assembled);
        }
        for (id, value) in assembled {
            self.store.mirror_raw(id, value);
        }
    }

    fn collect_top_level(&self, item: &LayoutItem, assembled: &mut Vec<(String, Value)>) {
        match item {
            LayoutItem::Section { children, .. } => {
                for child in children {
                    self.collect_top_level(child, assembled);
                }
            }
            LayoutItem::Composite {
                mount,
                complex_type,
                rows,
                mirror: true,
                ..
            } => {
                let value = self.assemble_composite(*complex_type, rows);
                assembled.push((self.mounts[*mount].id().to_owned(), value));
            }
            LayoutItem::Field { .. } | LayoutItem::Composite { .. } | LayoutItem::Missing { .. } => {}
        }
    }

    fn assemble_composite(
        &self,
        complex_type: ComplexType,
        rows: &[RowLayout],
    ) -> Value {
        match complex_type {
            ComplexType::Repeater => {
                Value::Array(rows.iter().map(|row| self.assemble_row(row)).collect())
            }
            ComplexType::ComplexType => rows
                .first()
                .map(|row| self.assemble_row(row))
                .unwrap_or(Value::Null),
        }
    }

    fn assemble_row(&self, row: &RowLayout) -> Value {
        let mut value = Value::Object(Map::new());
        self.collect_row_values(&row.children, &row.path, &mut value);
        value
    }

    fn collect_row_values(&self, items: &[LayoutItem], base: &ModelPath, target: &mut Value) {
        for item in items {
            match item {
                LayoutItem::Section { children, .. } => {
                    self.collect_row_values(children, base, target);
                }
                LayoutItem::Field { mount } => {
                    let mount = &self.mounts[*mount];
                    let Some(relative) = mount.path().strip_prefix(base) else {
                        continue;
                    };
                    let value = self
                        .store
                        .entry(mount.path())
                        .map(|entry| entry.value().clone())
                        .unwrap_or_default();
                    insert_at(target, &relative, value);
                }
                LayoutItem::Composite {
                    mount,
                    complex_type,
                    rows,
                    ..
                } => {
                    let Some(relative) = self.mounts[*mount].path().strip_prefix(base) else {
                        continue;
                    };
                    let value = self.assemble_composite(*complex_type, rows);
                    insert_at(target, &relative, value);
                }
                LayoutItem::Missing { .. } => {}
            }
        }
    }

    fn resolve_target(&self, target: &str) -> AppResult<usize> {
        let path = ModelPath::parse(target).ok();
        let live = || {
            self.mounts
                .iter()
                .enumerate()
                .filter(|(_, mount)| !mount.is_destroyed())
        };

        live()
            .find(|(_, mount)| path.as_ref().is_some_and(|path| mount.path() == path))
            .or_else(|| live().find(|(_, mount)| mount.id() == target))
            .map(|(index, _)| index)
            .ok_or_else(|| AppError::NotFound(format!("no mounted field '{target}'")))
    }

    fn ensure_editable(&self) -> AppResult<()> {
        if !self.mode.is_editable() {
            return Err(AppError::Validation(format!(
                "form is read-only in {} mode",
                self.mode.as_str()
            )));
        }
        if !self.barrier.is_completed() {
            return Err(AppError::Conflict("form is still initializing".to_owned()));
        }
        Ok(())
    }

    fn ensure_field_editable(&self, index: usize) -> AppResult<()> {
        let mount = &self.mounts[index];
        if mount.is_structural() {
            return Err(AppError::Validation(format!(
                "field '{}' holds rows, edit its row fields instead",
                mount.id()
            )));
        }
        if mount.field().metadata().read_only() {
            return Err(AppError::Validation(format!("field '{}' is read-only", mount.id())));
        }
        if let Some(key) = self.mount_rows[index]
            && !self.panels.get(&key).is_some_and(PanelState::is_editing)
        {
            return Err(AppError::Conflict(format!("{key} is not being edited")));
        }
        Ok(())
    }

    /// Applies a user edit to the field addressed by path or field id.
    pub fn input(&mut self, target: &str, value: NativeValue) -> AppResult<()> {
        self.ensure_editable()?;
        let index = self.resolve_target(target)?;
        self.ensure_field_editable(index)?;

        let mount = &mut self.mounts[index];
        mount.input(value);
        let applied = mount.flush_changes(&mut self.store);
        debug!(field_id = %mount.id(), path = %mount.path(), applied, "field edited");

        self.after_change();
        Ok(())
    }

    /// Applies a user edit given in transport form.
    pub fn input_transport(&mut self, target: &str, value: &Value) -> AppResult<()> {
        self.ensure_editable()?;
        let index = self.resolve_target(target)?;
        self.ensure_field_editable(index)?;

        let mount = &mut self.mounts[index];
        mount.input_transport(value)?;
        let applied = mount.flush_changes(&mut self.store);
        debug!(field_id = %mount.id(), path = %mount.path(), applied, "field edited");

        self.after_change();
        Ok(())
    }

    /// Marks a field as touched so its validation errors render.
    pub fn touch(&mut self, target: &str) -> AppResult<()> {
        let index = self.resolve_target(target)?;
        let path = self.mounts[index].path().clone();
        self.store.touch(&path);
        Ok(())
    }

    /// Destroys and recreates every live mount; store values survive.
    pub fn remount(&mut self) {
        for index in 0..self.mounts.len() {
            if self.mounts[index].is_destroyed() {
                continue;
            }
            self.mounts[index].destroy(&mut self.store);
            let mut mount = FieldMount::new(self.mounts[index].spec().clone())
                .with_resync(index, self.resync.clone());
            mount.mount(&mut self.store, self.structure.model(), &self.registry);
            self.mounts[index] = mount;
        }
        info!(session_id = %self.session_id, "form remounted");
        self.refresh();
    }

    /// Restores every value to its state at initialization completion and
    /// rebuilds rows from the schema.
    pub fn cancel(&mut self) -> AppResult<()> {
        let baseline = self
            .baseline
            .clone()
            .ok_or_else(|| AppError::Conflict("form is still initializing".to_owned()))?;

        for mount in &mut self.mounts {
            mount.destroy(&mut self.store);
        }
        self.store.restore(&baseline);
        self.panels.clear();

        let (plan, planned) =
            Planner::new(&self.structure, &mut self.next_row_key, 0).plan_root();
        self.install(plan, planned);
        for mount in &mut self.mounts {
            mount.mount(&mut self.store, self.structure.model(), &self.registry);
        }

        info!(session_id = %self.session_id, "form changes cancelled");
        self.refresh();
        Ok(())
    }

    /// Returns the editing session id.
    #[must_use]
    pub fn session_id(&self) -> FormSessionId {
        self.session_id
    }

    /// Returns the active render mode.
    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Switches the render surface.
    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
        self.generation += 1;
    }

    /// Returns the form structure.
    #[must_use]
    pub fn structure(&self) -> &FormStructure {
        &self.structure
    }

    /// Returns the model store.
    #[must_use]
    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Returns the stored value at `path`.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&Value> {
        let path = ModelPath::parse(path).ok()?;
        self.store.entry(&path).map(|entry| entry.value())
    }

    /// Returns whether any value changed since initialization.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Returns whether the initialization barrier completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.barrier.is_completed()
    }

    /// Returns distinct readiness signals received and the barrier target.
    #[must_use]
    pub fn readiness(&self) -> (usize, usize) {
        (self.barrier.ready_count(), self.barrier.target())
    }

    /// Returns the number of consolidated render passes.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns whether the field addressed by path or id is shown.
    #[must_use]
    pub fn is_visible(&self, target: &str) -> bool {
        self.resolve_target(target)
            .is_ok_and(|index| self.visible.get(index).copied().unwrap_or(false))
    }
}

/// Store entries overlaid with the assembled composite values.
struct LiveModel<'a> {
    store: &'a ModelStore,
    composites: BTreeMap<ModelPath, Value>,
}

impl ModelSnapshot for LiveModel<'_> {
    fn value_at(&self, path: &ModelPath) -> Option<&Value> {
        if let Some(value) = self.store.value_at(path) {
            return Some(value);
        }

        let mut candidate = Some(path.clone());
        while let Some(prefix) = candidate {
            if let Some(value) = self.composites.get(&prefix) {
                return path.strip_prefix(&prefix)?.lookup(value);
            }
            candidate = prefix.parent();
        }
        None
    }
}

fn insert_at(target: &mut Value, relative: &ModelPath, value: Value) {
    let mut current = target;
    for segment in relative.segments() {
        current = match segment {
            PathSegment::Key(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                let Value::Object(object) = current else {
                    return;
                };
                object.entry(key.clone()).or_insert(Value::Null)
            }
            PathSegment::Index(index) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                let Value::Array(items) = current else {
                    return;
                };
                if items.len() <= *index {
                    items.resize(*index + 1, Value::Null);
                }
                &mut items[*index]
            }
        };
    }
    *current = value;
}
