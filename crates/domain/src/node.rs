use formweave_core::NonEmptyString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::field_metadata::FieldMetadata;
use crate::visibility::VisibilityCondition;

/// Discriminant of one schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Document root.
    Root,
    /// Tab page at the root level.
    Tab,
    /// Layout grouping without its own value.
    Container,
    /// Value-bearing field.
    Field,
    /// Inline expansion of a named foreign type.
    SubType,
}

impl NodeType {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Tab => "Tab",
            Self::Container => "Container",
            Self::Field => "Field",
            Self::SubType => "SubType",
        }
    }
}

/// Structural kind of a field whose value is composed of nested fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplexType {
    /// Ordered list of rows sharing one sub-schema.
    Repeater,
    /// Single nested object described by a sub-schema.
    ComplexType,
}

/// Pure layout node (root, tab, or container).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    name: NonEmptyString,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    children: Vec<Node>,
}

impl LayoutNode {
    /// Creates a layout node.
    #[must_use]
    pub fn new(name: NonEmptyString, children: Vec<Node>) -> Self {
        Self {
            name,
            display_name: None,
            attributes: Map::new(),
            children,
        }
    }

    /// Returns a copy with a display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Returns the local name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the display name, falling back to the local name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|display_name| !display_name.trim().is_empty())
            .unwrap_or_else(|| self.name.as_str())
    }

    /// Returns free-form attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns ordered child nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// Value-bearing field node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    name: NonEmptyString,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    field_type: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    metadata: FieldMetadata,
    #[serde(default)]
    visibility: Option<VisibilityCondition>,
    #[serde(default)]
    complex_type: Option<ComplexType>,
    #[serde(default)]
    sub_schema: Option<Box<Node>>,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    children: Vec<Node>,
}

impl FieldNode {
    /// Creates a scalar field node.
    #[must_use]
    pub fn new(
        name: NonEmptyString,
        display_name: impl Into<String>,
        field_type: impl Into<String>,
        metadata: FieldMetadata,
    ) -> Self {
        Self {
            name,
            display_name: display_name.into(),
            field_type: field_type.into(),
            attributes: Map::new(),
            metadata,
            visibility: None,
            complex_type: None,
            sub_schema: None,
            items: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns a copy with a visibility condition.
    #[must_use]
    pub fn with_visibility(mut self, visibility: VisibilityCondition) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Returns a copy turned into a structural field over `sub_schema`.
    #[must_use]
    pub fn with_complex_type(
        mut self,
        complex_type: ComplexType,
        sub_schema: Node,
        items: Vec<Value>,
    ) -> Self {
        self.complex_type = Some(complex_type);
        self.sub_schema = Some(Box::new(sub_schema));
        self.items = items;
        self
    }

    /// Returns a copy with one free-form attribute set.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Returns the local name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the flat identifier used in the submission document.
    #[must_use]
    pub fn id(&self) -> &str {
        self.attributes
            .get("id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.name.as_str())
    }

    /// Returns the label, falling back to the local name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.name.as_str()
        } else {
            self.display_name.as_str()
        }
    }

    /// Returns the registry key of the widget implementation.
    #[must_use]
    pub fn field_type(&self) -> &str {
        self.field_type.as_str()
    }

    /// Returns free-form attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns field metadata.
    #[must_use]
    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    /// Returns the visibility condition tree.
    #[must_use]
    pub fn visibility(&self) -> Option<&VisibilityCondition> {
        self.visibility.as_ref()
    }

    /// Returns the structural kind when the field is composite.
    #[must_use]
    pub fn complex_type(&self) -> Option<ComplexType> {
        self.complex_type
    }

    /// Returns the sub-schema of a composite field.
    #[must_use]
    pub fn sub_schema(&self) -> Option<&Node> {
        self.sub_schema.as_deref()
    }

    /// Returns seed row instances of a repeater.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Returns child nodes; ignored for value binding.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// Node referencing a shared type published in `foreignTypes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTypeNode {
    name: NonEmptyString,
    foreign_type: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    children: Vec<Node>,
}

impl SubTypeNode {
    /// Creates a sub-type reference.
    #[must_use]
    pub fn new(name: NonEmptyString, foreign_type: impl Into<String>) -> Self {
        Self {
            name,
            foreign_type: foreign_type.into(),
            attributes: Map::new(),
            children: Vec::new(),
        }
    }

    /// Returns the local name, used as the path prefix of expanded fields.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the key into the form's `foreignTypes` map.
    #[must_use]
    pub fn foreign_type(&self) -> &str {
        self.foreign_type.as_str()
    }

    /// Returns free-form attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns child nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// One element of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType")]
pub enum Node {
    /// Document root.
    #[serde(alias = "root")]
    Root(LayoutNode),
    /// Tab page.
    #[serde(alias = "tab")]
    Tab(LayoutNode),
    /// Layout container.
    #[serde(alias = "container")]
    Container(LayoutNode),
    /// Value-bearing field.
    #[serde(alias = "field")]
    Field(FieldNode),
    /// Foreign type expansion.
    #[serde(alias = "subType", alias = "subtype")]
    SubType(SubTypeNode),
}

impl Node {
    /// Returns the node discriminant.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Root(_) => NodeType::Root,
            Self::Tab(_) => NodeType::Tab,
            Self::Container(_) => NodeType::Container,
            Self::Field(_) => NodeType::Field,
            Self::SubType(_) => NodeType::SubType,
        }
    }

    /// Returns the local name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        match self {
            Self::Root(node) | Self::Tab(node) | Self::Container(node) => node.name(),
            Self::Field(node) => node.name(),
            Self::SubType(node) => node.name(),
        }
    }

    /// Returns free-form attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        match self {
            Self::Root(node) | Self::Tab(node) | Self::Container(node) => node.attributes(),
            Self::Field(node) => node.attributes(),
            Self::SubType(node) => node.attributes(),
        }
    }

    /// Returns ordered child nodes.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Root(node) | Self::Tab(node) | Self::Container(node) => node.children(),
            Self::Field(node) => node.children(),
            Self::SubType(node) => node.children(),
        }
    }

    /// Returns whether the node may be the target of a value binding.
    #[must_use]
    pub fn is_bindable(&self) -> bool {
        matches!(self, Self::Field(_))
    }

    /// Returns the field payload when this is a field node.
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldNode> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Visits this node and its layout descendants in document pre-order.
    ///
    /// Field children and sub-schemas are not descended into.
    pub fn walk<'a>(&'a self, visitor: &mut impl FnMut(&'a Node)) {
        visitor(self);
        if self.is_bindable() {
            return;
        }
        for child in self.children() {
            child.walk(visitor);
        }
    }

    /// Counts field nodes reachable through layout nodes.
    #[must_use]
    pub fn field_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if node.is_bindable() {
                count += 1;
            }
        });
        count
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ComplexType, Node, NodeType};

    fn sample_tree() -> Node {
        let node = serde_json::from_value(json!({
            "nodeType": "Root",
            "name": "root",
            "children": [
                {
                    "nodeType": "Tab",
                    "name": "general",
                    "children": [
                        {"nodeType": "Field", "name": "first_name", "fieldType": "text"},
                        {
                            "nodeType": "Container",
                            "name": "row",
                            "children": [
                                {"nodeType": "field", "name": "age", "fieldType": "number",
                                 "attributes": {"id": "contact_age"}}
                            ]
                        }
                    ]
                },
                {
                    "nodeType": "Field",
                    "name": "addresses",
                    "fieldType": "repeater",
                    "complexType": "Repeater",
                    "subSchema": {
                        "nodeType": "Container",
                        "name": "address",
                        "children": [{"nodeType": "Field", "name": "street", "fieldType": "text"}]
                    },
                    "items": [{"street": "Main"}],
                    "unknownKey": 1
                }
            ]
        }));
        assert!(node.is_ok());
        node.unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn nodes_deserialize_as_tagged_union() {
        let root = sample_tree();
        assert_eq!(root.node_type(), NodeType::Root);
        assert_eq!(root.children()[0].node_type(), NodeType::Tab);

        let repeater = root.children()[1].as_field();
        assert!(repeater.is_some());
        let repeater = repeater.unwrap_or_else(|| unreachable!());
        assert_eq!(repeater.complex_type(), Some(ComplexType::Repeater));
        assert_eq!(repeater.items().len(), 1);
        assert!(repeater.sub_schema().is_some());
        assert!(repeater.metadata().visible());
    }

    #[test]
    fn field_count_walks_layout_nodes_in_pre_order() {
        let root = sample_tree();
        assert_eq!(root.field_count(), 3);

        let mut names = Vec::new();
        root.walk(&mut |node| names.push(node.name().as_str().to_owned()));
        assert_eq!(
            names,
            vec!["root", "general", "first_name", "row", "age", "addresses"]
        );
    }

    #[test]
    fn field_id_prefers_attribute_over_name() {
        let root = sample_tree();
        let mut ids = Vec::new();
        root.walk(&mut |node| {
            if let Some(field) = node.as_field() {
                ids.push(field.id().to_owned());
            }
        });
        assert_eq!(ids, vec!["first_name", "contact_age", "addresses"]);
    }

    #[test]
    fn only_field_nodes_are_bindable() {
        let root = sample_tree();
        let mut bindable = Vec::new();
        root.walk(&mut |node| bindable.push((node.node_type(), node.is_bindable())));

        for (node_type, is_bindable) in bindable {
            assert_eq!(is_bindable, node_type == NodeType::Field);
        }
    }

    #[test]
    fn blank_node_names_are_rejected() {
        let node: Result<Node, _> = serde_json::from_value(json!({
            "nodeType": "Field",
            "name": "  ",
            "fieldType": "text"
        }));
        assert!(node.is_err());
    }
}
