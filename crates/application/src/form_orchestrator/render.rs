use formweave_domain::ComplexType;

use crate::render_model::{RenderedForm, RenderedNode, RenderedRow};

use super::FormOrchestrator;
use super::plan::{LayoutItem, RowLayout};

impl FormOrchestrator {
    /// Builds the render model of the current generation.
    ///
    /// Hidden fields are left out; collapsed repeater rows render their
    /// header only.
    #[must_use]
    pub fn render(&self) -> RenderedForm {
        RenderedForm {
            mode: self.mode,
            generation: self.generation,
            initialized: self.barrier.is_completed(),
            submitting: self.is_submitting(),
            tabs: self.render_items(&self.plan.tabs, true),
            non_tab_content: self.render_items(&self.plan.non_tab_content, true),
        }
    }

    fn render_items(&self, items: &[LayoutItem], editable: bool) -> Vec<RenderedNode> {
        items
            .iter()
            .filter_map(|item| self.render_item(item, editable))
            .collect()
    }

    fn render_item(&self, item: &LayoutItem, editable: bool) -> Option<RenderedNode> {
        match item {
            LayoutItem::Section {
                node_type,
                name,
                label,
                children,
            } => Some(RenderedNode::Section {
                node_type: *node_type,
                name: name.clone(),
                label: label.clone(),
                children: self.render_items(children, editable),
            }),
            LayoutItem::Field { mount } => {
                if !self.visible.get(*mount).copied().unwrap_or(false) {
                    return None;
                }
                let mut node = self.mounts[*mount].render(self.mode, &self.store);
                if let RenderedNode::Field(field) = &mut node
                    && !editable
                {
                    field.read_only = true;
                }
                Some(node)
            }
            LayoutItem::Composite {
                mount,
                complex_type,
                rows,
                ..
            } => {
                if !self.visible.get(*mount).copied().unwrap_or(false) {
                    return None;
                }
                let mount = &self.mounts[*mount];
                let Some(mut field) = mount.render_field(self.mode, &self.store) else {
                    return Some(mount.placeholder());
                };
                field.read_only |= !editable;
                Some(RenderedNode::Composite {
                    field,
                    complex_type: *complex_type,
                    rows: rows
                        .iter()
                        .map(|row| self.render_row(*complex_type, row, editable))
                        .collect(),
                })
            }
            LayoutItem::Missing { name, message } => Some(RenderedNode::Missing {
                name: name.clone(),
                message: message.clone(),
            }),
        }
    }

    fn render_row(&self, complex_type: ComplexType, row: &RowLayout, editable: bool) -> RenderedRow {
        let (expanded, editing) = match complex_type {
            ComplexType::ComplexType => (true, editable),
            ComplexType::Repeater => self
                .panels
                .get(&row.key)
                .map_or((false, false), |panel| (panel.is_expanded(), panel.is_editing())),
        };
        let children = if expanded {
            let editable = match complex_type {
                ComplexType::ComplexType => editable,
                ComplexType::Repeater => editable && editing,
            };
            self.render_items(&row.children, editable)
        } else {
            Vec::new()
        };

        RenderedRow {
            key: row.key,
            path: row.path.to_string(),
            expanded,
            editing,
            children,
        }
    }
}
