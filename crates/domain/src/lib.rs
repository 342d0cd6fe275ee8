//! Schema model of server-described forms.

#![forbid(unsafe_code)]

mod field_metadata;
mod form_structure;
mod model_path;
mod node;
mod render_mode;
mod visibility;

pub use field_metadata::{FieldMetadata, FieldWidth, InputOption};
pub use form_structure::FormStructure;
pub use model_path::{ModelPath, PathSegment};
pub use node::{ComplexType, FieldNode, LayoutNode, Node, NodeType, SubTypeNode};
pub use render_mode::RenderMode;
pub use visibility::{
    ConditionGroup, ConditionLeaf, ConditionOperator, LogicalRule, ModelSnapshot,
    VisibilityCondition, evaluate, evaluate_in_scope,
};
