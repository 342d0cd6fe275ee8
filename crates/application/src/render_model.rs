use std::fmt::{Display, Formatter};

use formweave_domain::{ComplexType, NodeType, RenderMode};
use serde::Serialize;

use crate::field_widget::WidgetCore;

/// Stable key of one repeater row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowKey(pub u64);

impl Display for RowKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "row-{}", self.0)
    }
}

/// Render output of one widget surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedField {
    /// Flat field identifier.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Surface the field was rendered with.
    pub mode: RenderMode,
    /// Input control descriptor.
    pub input_kind: &'static str,
    /// Rendered value text.
    pub text: String,
    /// Placeholder shown for empty values.
    pub placeholder: Option<String>,
    /// Tooltip text.
    pub tooltip: Option<String>,
    /// Whether a value is required.
    pub required: bool,
    /// Whether edits are blocked.
    pub read_only: bool,
    /// Inline validation messages, filled once the field is touched.
    pub errors: Vec<String>,
}

impl RenderedField {
    /// Builds a rendered field from widget state.
    #[must_use]
    pub fn from_widget(
        core: &WidgetCore,
        mode: RenderMode,
        input_kind: &'static str,
        text: String,
    ) -> Self {
        let metadata = core.metadata();
        Self {
            id: core.id().to_owned(),
            label: core.label().to_owned(),
            mode,
            input_kind,
            text,
            placeholder: metadata.placeholder().map(str::to_owned),
            tooltip: metadata.tooltip().map(str::to_owned),
            required: metadata.required(),
            read_only: metadata.read_only() || mode != RenderMode::Edit,
            errors: Vec::new(),
        }
    }
}

/// One rendered repeater row or complex-type body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedRow {
    /// Row key.
    pub key: RowKey,
    /// Model path prefix of the row.
    pub path: String,
    /// Whether the row panel is expanded.
    pub expanded: bool,
    /// Whether the row panel is being edited.
    pub editing: bool,
    /// Row content; empty while collapsed.
    pub children: Vec<RenderedNode>,
}

/// Rendered schema node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedNode {
    /// Tab, container, or expanded sub-type.
    Section {
        /// Layout node type.
        node_type: NodeType,
        /// Local name.
        name: String,
        /// Display label.
        label: String,
        /// Visible children.
        children: Vec<RenderedNode>,
    },
    /// Scalar field.
    Field(RenderedField),
    /// Repeater or complex-type field with its rows.
    Composite {
        /// Rendered region header.
        field: RenderedField,
        /// Structural kind.
        complex_type: ComplexType,
        /// Rows in order.
        rows: Vec<RenderedRow>,
    },
    /// Field whose type has no registered widget.
    Placeholder {
        /// Flat field identifier.
        id: String,
        /// Visible explanation.
        message: String,
    },
    /// Schema reference that could not be expanded.
    Missing {
        /// Local name.
        name: String,
        /// Visible explanation.
        message: String,
    },
}

/// Render model of the whole form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedForm {
    /// Active render surface.
    pub mode: RenderMode,
    /// Number of consolidated render passes so far.
    pub generation: u64,
    /// Whether the initialization barrier completed.
    pub initialized: bool,
    /// Whether submission is blocked by an in-flight submit or upload.
    pub submitting: bool,
    /// Root tabs.
    pub tabs: Vec<RenderedNode>,
    /// Root content outside tabs.
    pub non_tab_content: Vec<RenderedNode>,
}

impl RenderedForm {
    /// Returns the rendered field with the given flat identifier.
    #[must_use]
    pub fn find_field(&self, id: &str) -> Option<&RenderedField> {
        fn search<'a>(nodes: &'a [RenderedNode], id: &str) -> Option<&'a RenderedField> {
            nodes.iter().find_map(|node| match node {
                RenderedNode::Field(field) => (field.id == id).then_some(field),
                RenderedNode::Section { children, .. } => search(children, id),
                RenderedNode::Composite { field, rows, .. } => {
                    if field.id == id {
                        return Some(field);
                    }
                    rows.iter().find_map(|row| search(&row.children, id))
                }
                RenderedNode::Placeholder { .. } | RenderedNode::Missing { .. } => None,
            })
        }

        search(&self.tabs, id).or_else(|| search(&self.non_tab_content, id))
    }

    /// Returns whether any placeholder for `id` was rendered.
    #[must_use]
    pub fn has_placeholder(&self, id: &str) -> bool {
        fn search(nodes: &[RenderedNode], id: &str) -> bool {
            nodes.iter().any(|node| match node {
                RenderedNode::Placeholder { id: placeholder_id, .. } => placeholder_id == id,
                RenderedNode::Section { children, .. } => search(children, id),
                RenderedNode::Composite { rows, .. } => {
                    rows.iter().any(|row| search(&row.children, id))
                }
                RenderedNode::Field(_) | RenderedNode::Missing { .. } => false,
            })
        }

        search(&self.tabs, id) || search(&self.non_tab_content, id)
    }
}

fn write_nodes(
    formatter: &mut Formatter<'_>,
    nodes: &[RenderedNode],
    depth: usize,
) -> std::fmt::Result {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            RenderedNode::Section {
                node_type,
                label,
                children,
                ..
            } => {
                writeln!(formatter, "{indent}[{}] {label}", node_type.as_str())?;
                write_nodes(formatter, children, depth + 1)?;
            }
            RenderedNode::Field(field) => write_field(formatter, field, &indent)?,
            RenderedNode::Composite { field, rows, .. } => {
                write_field(formatter, field, &indent)?;
                for row in rows {
                    let marker = match (row.expanded, row.editing) {
                        (_, true) => "editing",
                        (true, false) => "expanded",
                        (false, false) => "collapsed",
                    };
                    writeln!(formatter, "{indent}  - {} ({marker})", row.path)?;
                    write_nodes(formatter, &row.children, depth + 2)?;
                }
            }
            RenderedNode::Placeholder { message, .. } | RenderedNode::Missing { message, .. } => {
                writeln!(formatter, "{indent}! {message}")?;
            }
        }
    }

    Ok(())
}

fn write_field(formatter: &mut Formatter<'_>, field: &RenderedField, indent: &str) -> std::fmt::Result {
    let required = if field.required { "*" } else { "" };
    let text = if field.text.is_empty() {
        field.placeholder.clone().unwrap_or_default()
    } else {
        field.text.clone()
    };
    writeln!(formatter, "{indent}{}{required}: {text}", field.label)?;
    for error in &field.errors {
        writeln!(formatter, "{indent}  ^ {error}")?;
    }

    Ok(())
}

impl Display for RenderedForm {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            formatter,
            "form ({} mode, generation {}{})",
            self.mode.as_str(),
            self.generation,
            if self.submitting { ", submitting" } else { "" }
        )?;
        write_nodes(formatter, &self.tabs, 1)?;
        write_nodes(formatter, &self.non_tab_content, 1)
    }
}

