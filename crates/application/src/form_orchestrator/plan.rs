use formweave_core::NonEmptyString;
use formweave_domain::{ComplexType, FieldNode, FormStructure, ModelPath, Node, NodeType};
use serde_json::Value;
use tracing::warn;

use crate::field_mount::MountSpec;
use crate::render_model::RowKey;

/// Planned layout position of schema content.
#[derive(Debug, Clone)]
pub(super) enum LayoutItem {
    Section {
        node_type: NodeType,
        name: String,
        label: String,
        children: Vec<LayoutItem>,
    },
    Field {
        mount: usize,
    },
    Composite {
        mount: usize,
        complex_type: ComplexType,
        rows: Vec<RowLayout>,
        next_index: usize,
        mirror: bool,
    },
    Missing {
        name: String,
        message: String,
    },
}

/// One expanded repeater row or complex-type body.
#[derive(Debug, Clone)]
pub(super) struct RowLayout {
    pub(super) key: RowKey,
    pub(super) path: ModelPath,
    pub(super) children: Vec<LayoutItem>,
}

/// Root content split into tab pages and everything else.
#[derive(Debug, Clone, Default)]
pub(super) struct FormPlan {
    pub(super) tabs: Vec<LayoutItem>,
    pub(super) non_tab_content: Vec<LayoutItem>,
}

impl FormPlan {
    pub(super) fn items(&self) -> impl Iterator<Item = &LayoutItem> {
        self.tabs.iter().chain(self.non_tab_content.iter())
    }

    pub(super) fn composite_mut(&mut self, mount: usize) -> Option<&mut LayoutItem> {
        if let Some(found) = find_composite_mut(&mut self.tabs, mount) {
            return Some(found);
        }
        find_composite_mut(&mut self.non_tab_content, mount)
    }

    pub(super) fn row(&self, key: RowKey) -> Option<(usize, ComplexType, &RowLayout)> {
        find_row(&self.tabs, key).or_else(|| find_row(&self.non_tab_content, key))
    }
}

/// Mount spec plus the innermost repeater row that owns it.
pub(super) struct PlannedMount {
    pub(super) spec: MountSpec,
    pub(super) row: Option<RowKey>,
}

#[derive(Debug, Clone)]
struct Context {
    prefix: ModelPath,
    scope: ModelPath,
    fallback: Option<Value>,
    mirror: bool,
    row: Option<RowKey>,
}

impl Context {
    fn root() -> Self {
        Self {
            prefix: ModelPath::root(),
            scope: ModelPath::root(),
            fallback: None,
            mirror: true,
            row: None,
        }
    }

    fn member_seed(&self, name: &str) -> Option<Value> {
        self.fallback
            .as_ref()
            .and_then(|fallback| fallback.get(name))
            .filter(|value| !value.is_null())
            .cloned()
    }
}

/// Expands the schema into mount specs in document pre-order.
pub(super) struct Planner<'a> {
    structure: &'a FormStructure,
    next_row_key: &'a mut u64,
    base_index: usize,
    mounts: Vec<PlannedMount>,
    expanding: Vec<String>,
}

impl<'a> Planner<'a> {
    pub(super) fn new(structure: &'a FormStructure, next_row_key: &'a mut u64, base_index: usize) -> Self {
        Self {
            structure,
            next_row_key,
            base_index,
            mounts: Vec::new(),
            expanding: Vec::new(),
        }
    }

    /// Plans the whole document.
    pub(super) fn plan_root(mut self) -> (FormPlan, Vec<PlannedMount>) {
        let structure = self.structure;
        let context = Context::root();
        let mut plan = FormPlan::default();

        for child in structure.structure().children() {
            let item = self.plan_node(child, &context);
            if child.node_type() == NodeType::Tab {
                plan.tabs.push(item);
            } else {
                plan.non_tab_content.push(item);
            }
        }

        if !plan.tabs.is_empty() && !plan.non_tab_content.is_empty() {
            warn!(
                tabs = plan.tabs.len(),
                non_tab_content = plan.non_tab_content.len(),
                "root mixes tab and non-tab content"
            );
        }

        (plan, self.mounts)
    }

    /// Plans one additional repeater row of `field` at `index`.
    pub(super) fn plan_row(
        mut self,
        field: &FieldNode,
        composite_path: &ModelPath,
        index: usize,
    ) -> (RowLayout, Vec<PlannedMount>) {
        let row = match field.sub_schema() {
            Some(sub_schema) => self.plan_row_body(
                sub_schema,
                composite_path.index(index),
                None,
                None,
                ComplexType::Repeater,
            ),
            None => RowLayout {
                key: self.allocate_row_key(),
                path: composite_path.index(index),
                children: Vec::new(),
            },
        };
        (row, self.mounts)
    }

    fn plan_nodes(&mut self, nodes: &[Node], context: &Context) -> Vec<LayoutItem> {
        nodes
            .iter()
            .map(|node| self.plan_node(node, context))
            .collect()
    }

    fn plan_node(&mut self, node: &Node, context: &Context) -> LayoutItem {
        match node {
            Node::Root(layout) | Node::Tab(layout) | Node::Container(layout) => LayoutItem::Section {
                node_type: node.node_type(),
                name: layout.name().as_str().to_owned(),
                label: layout.display_name().to_owned(),
                children: self.plan_nodes(layout.children(), context),
            },
            Node::Field(field) => self.plan_field(field, context),
            Node::SubType(sub_type) => {
                self.plan_sub_type(sub_type.name(), sub_type.foreign_type(), context)
            }
        }
    }

    fn plan_sub_type(
        &mut self,
        name: &NonEmptyString,
        foreign_key: &str,
        context: &Context,
    ) -> LayoutItem {
        let structure = self.structure;
        let Some(foreign) = structure.foreign_type(foreign_key) else {
            warn!(sub_type = %name, foreign_type = %foreign_key, "unknown foreign type");
            return LayoutItem::Missing {
                name: name.as_str().to_owned(),
                message: format!("unknown foreign type '{foreign_key}'"),
            };
        };
        if self.expanding.iter().any(|active| active == foreign_key) {
            warn!(sub_type = %name, foreign_type = %foreign_key, "recursive foreign type");
            return LayoutItem::Missing {
                name: name.as_str().to_owned(),
                message: format!("recursive foreign type '{foreign_key}'"),
            };
        }

        let nested = Context {
            prefix: context.prefix.key(name.as_str()),
            scope: context.scope.clone(),
            fallback: context.member_seed(name.as_str()),
            mirror: context.mirror,
            row: context.row,
        };

        self.expanding.push(foreign_key.to_owned());
        let children = self.plan_body(foreign, &nested);
        self.expanding.pop();

        LayoutItem::Section {
            node_type: NodeType::SubType,
            name: name.as_str().to_owned(),
            label: name.as_str().to_owned(),
            children,
        }
    }

    /// Layout bodies contribute their children; a field or sub-type body is
    /// planned as itself.
    fn plan_body(&mut self, body: &Node, context: &Context) -> Vec<LayoutItem> {
        match body {
            Node::Root(layout) | Node::Tab(layout) | Node::Container(layout) => {
                self.plan_nodes(layout.children(), context)
            }
            Node::Field(_) | Node::SubType(_) => self.plan_nodes(std::slice::from_ref(body), context),
        }
    }

    fn plan_field(&mut self, field: &FieldNode, context: &Context) -> LayoutItem {
        let path = context.prefix.key(field.name().as_str());

        let Some(complex_type) = field.complex_type() else {
            let spec = MountSpec {
                field: field.clone(),
                path,
                scope: context.scope.clone(),
                options: self.structure.resolve_options(field.metadata()),
                fallback_seed: context.member_seed(field.name().as_str()),
                structural: false,
                mirror_raw: context.mirror,
            };
            return LayoutItem::Field {
                mount: self.push(spec, context.row),
            };
        };

        let spec = MountSpec {
            field: field.clone(),
            path: path.clone(),
            scope: context.scope.clone(),
            options: Vec::new(),
            fallback_seed: None,
            structural: true,
            mirror_raw: false,
        };
        let mount = self.push(spec, context.row);

        let Some(sub_schema) = field.sub_schema() else {
            warn!(field_id = %field.id(), "composite field without sub-schema");
            return LayoutItem::Composite {
                mount,
                complex_type,
                rows: Vec::new(),
                next_index: 0,
                mirror: context.mirror,
            };
        };

        let rows = match complex_type {
            ComplexType::Repeater => {
                let member = context.member_seed(field.name().as_str());
                let row_seeds = row_seeds(self.structure.model(), &path, field.items(), member.as_ref());
                row_seeds
                    .into_iter()
                    .enumerate()
                    .map(|(index, seed)| {
                        self.plan_row_body(
                            sub_schema,
                            path.index(index),
                            seed,
                            None,
                            ComplexType::Repeater,
                        )
                    })
                    .collect::<Vec<_>>()
            }
            ComplexType::ComplexType => {
                let seed = field
                    .items()
                    .first()
                    .cloned()
                    .or_else(|| context.member_seed(field.name().as_str()));
                vec![self.plan_row_body(
                    sub_schema,
                    path.clone(),
                    seed,
                    context.row,
                    ComplexType::ComplexType,
                )]
            }
        };

        LayoutItem::Composite {
            mount,
            complex_type,
            next_index: rows.len(),
            rows,
            mirror: context.mirror,
        }
    }

    fn plan_row_body(
        &mut self,
        sub_schema: &Node,
        row_path: ModelPath,
        seed: Option<Value>,
        enclosing_row: Option<RowKey>,
        complex_type: ComplexType,
    ) -> RowLayout {
        let key = self.allocate_row_key();
        let row = match complex_type {
            ComplexType::Repeater => Some(key),
            ComplexType::ComplexType => enclosing_row,
        };
        let context = Context {
            prefix: row_path.clone(),
            scope: row_path.clone(),
            fallback: seed,
            mirror: false,
            row,
        };

        RowLayout {
            key,
            path: row_path,
            children: self.plan_body(sub_schema, &context),
        }
    }

    fn allocate_row_key(&mut self) -> RowKey {
        *self.next_row_key += 1;
        RowKey(*self.next_row_key)
    }

    fn push(&mut self, spec: MountSpec, row: Option<RowKey>) -> usize {
        self.mounts.push(PlannedMount { spec, row });
        self.base_index + self.mounts.len() - 1
    }
}

/// Row count is the larger of the seeded array and the schema items; each
/// row is seeded from its schema item, else from the enclosing row's data.
fn row_seeds(
    model: &Value,
    path: &ModelPath,
    items: &[Value],
    member: Option<&Value>,
) -> Vec<Option<Value>> {
    let seeded = path
        .lookup_case_insensitive(model)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let enclosing = member.and_then(Value::as_array);
    let count = seeded
        .max(items.len())
        .max(enclosing.map_or(0, Vec::len));

    (0..count)
        .map(|index| {
            items
                .get(index)
                .or_else(|| enclosing.and_then(|rows| rows.get(index)))
                .cloned()
        })
        .collect()
}

/// Counts the field mounts the expanded schema produces.
#[must_use]
pub fn count_field_nodes(structure: &FormStructure) -> usize {
    let mut next_row_key = 0;
    let (_, mounts) = Planner::new(structure, &mut next_row_key, 0).plan_root();
    mounts.len()
}

pub(super) fn find_composite_mut(items: &mut [LayoutItem], mount: usize) -> Option<&mut LayoutItem> {
    for item in items.iter_mut() {
        if matches!(item, LayoutItem::Composite { mount: candidate, .. } if *candidate == mount) {
            return Some(item);
        }
        match item {
            LayoutItem::Section { children, .. } => {
                if let Some(found) = find_composite_mut(children, mount) {
                    return Some(found);
                }
            }
            LayoutItem::Composite { rows, .. } => {
                for row in rows.iter_mut() {
                    if let Some(found) = find_composite_mut(&mut row.children, mount) {
                        return Some(found);
                    }
                }
            }
            LayoutItem::Field { .. } | LayoutItem::Missing { .. } => {}
        }
    }
    None
}

/// Returns the composite mount, its kind, and the row with `key`.
pub(super) fn find_row(items: &[LayoutItem], key: RowKey) -> Option<(usize, ComplexType, &RowLayout)> {
    items.iter().find_map(|item| match item {
        LayoutItem::Section { children, .. } => find_row(children, key),
        LayoutItem::Composite {
            mount,
            complex_type,
            rows,
            ..
        } => rows.iter().find_map(|row| {
            if row.key == key {
                Some((*mount, *complex_type, row))
            } else {
                find_row(&row.children, key)
            }
        }),
        LayoutItem::Field { .. } | LayoutItem::Missing { .. } => None,
    })
}

/// Collects mount indexes and row keys below `items`.
pub(super) fn collect_subtree(items: &[LayoutItem], mounts: &mut Vec<usize>, rows: &mut Vec<RowKey>) {
    for item in items {
        match item {
            LayoutItem::Section { children, .. } => collect_subtree(children, mounts, rows),
            LayoutItem::Field { mount } => mounts.push(*mount),
            LayoutItem::Composite {
                mount, rows: nested, ..
            } => {
                mounts.push(*mount);
                for row in nested {
                    rows.push(row.key);
                    collect_subtree(&row.children, mounts, rows);
                }
            }
            LayoutItem::Missing { .. } => {}
        }
    }
}
