use std::cmp::Ordering;
use std::str::FromStr;

use formweave_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model_path::ModelPath;

/// Read-only view of the live model used for condition evaluation.
pub trait ModelSnapshot {
    /// Returns the value stored at `path`.
    fn value_at(&self, path: &ModelPath) -> Option<&Value>;
}

impl ModelSnapshot for Value {
    fn value_at(&self, path: &ModelPath) -> Option<&Value> {
        path.lookup(self)
    }
}

/// Combinator of a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalRule {
    /// Every condition must hold.
    #[serde(alias = "and", alias = "And")]
    And,
    /// At least one condition must hold.
    #[serde(alias = "or", alias = "Or")]
    Or,
}

/// Comparison applied by a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    /// Loose equality.
    Equals,
    /// Loose inequality.
    NotEquals,
    /// Value present and not empty.
    Exists,
    /// Value absent, null, or empty.
    NotExists,
    /// Ordered greater-than.
    GreaterThan,
    /// Ordered greater-than-or-equal.
    GreaterThanOrEqual,
    /// Ordered less-than.
    LessThan,
    /// Ordered less-than-or-equal.
    LessThanOrEqual,
    /// Case-insensitive substring or array membership.
    Contains,
    /// Membership of the model value in the condition array.
    In,
}

impl ConditionOperator {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Exists => "exists",
            Self::NotExists => "notExists",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::Contains => "contains",
            Self::In => "in",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "==" => Ok(Self::Equals),
            "notequals" | "neq" | "!=" => Ok(Self::NotEquals),
            "exists" | "isnotempty" | "notempty" => Ok(Self::Exists),
            "notexists" | "isempty" | "empty" => Ok(Self::NotExists),
            "greaterthan" | "gt" => Ok(Self::GreaterThan),
            "greaterthanorequal" | "gte" => Ok(Self::GreaterThanOrEqual),
            "lessthan" | "lt" => Ok(Self::LessThan),
            "lessthanorequal" | "lte" => Ok(Self::LessThanOrEqual),
            "contains" => Ok(Self::Contains),
            "in" => Ok(Self::In),
            _ => Err(AppError::Validation(format!(
                "unknown condition operator '{value}'"
            ))),
        }
    }
}

/// Comparison of one model path against a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLeaf {
    property: String,
    operator: String,
    #[serde(default)]
    value: Value,
}

impl ConditionLeaf {
    /// Creates a leaf condition.
    #[must_use]
    pub fn new(property: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            operator: operator.into(),
            value,
        }
    }

    /// Returns the referenced model path as written in the schema.
    #[must_use]
    pub fn property(&self) -> &str {
        self.property.as_str()
    }

    /// Returns the operator as written in the schema.
    #[must_use]
    pub fn operator(&self) -> &str {
        self.operator.as_str()
    }

    /// Returns the comparison literal.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Group of conditions combined by one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    rule: LogicalRule,
    #[serde(default = "default_show")]
    show: bool,
    conditions: Vec<VisibilityCondition>,
}

fn default_show() -> bool {
    true
}

impl ConditionGroup {
    /// Creates a condition group.
    #[must_use]
    pub fn new(rule: LogicalRule, show: bool, conditions: Vec<VisibilityCondition>) -> Self {
        Self {
            rule,
            show,
            conditions,
        }
    }

    /// Returns the combinator.
    #[must_use]
    pub fn rule(&self) -> LogicalRule {
        self.rule
    }

    /// Returns whether a match shows (`true`) or hides (`false`) the field.
    #[must_use]
    pub fn show(&self) -> bool {
        self.show
    }

    /// Returns nested conditions.
    #[must_use]
    pub fn conditions(&self) -> &[VisibilityCondition] {
        &self.conditions
    }
}

/// Recursive visibility rule attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisibilityCondition {
    /// Internal node.
    Group(ConditionGroup),
    /// Leaf comparison.
    Leaf(ConditionLeaf),
}

impl VisibilityCondition {
    /// Creates a leaf condition.
    #[must_use]
    pub fn leaf(property: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        Self::Leaf(ConditionLeaf::new(property, operator, value))
    }

    /// Creates an AND group that shows the field on match.
    #[must_use]
    pub fn all(conditions: Vec<VisibilityCondition>) -> Self {
        Self::Group(ConditionGroup::new(LogicalRule::And, true, conditions))
    }

    /// Creates an OR group that shows the field on match.
    #[must_use]
    pub fn any(conditions: Vec<VisibilityCondition>) -> Self {
        Self::Group(ConditionGroup::new(LogicalRule::Or, true, conditions))
    }

    /// Returns whether every leaf names a known operator and a parseable
    /// property.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Leaf(leaf) => {
                leaf.operator().parse::<ConditionOperator>().is_ok()
                    && ModelPath::parse(leaf.property()).is_ok()
            }
            Self::Group(group) => group.conditions().iter().all(Self::is_well_formed),
        }
    }
}

/// Evaluates a condition tree against the live model.
#[must_use]
pub fn evaluate(condition: &VisibilityCondition, snapshot: &impl ModelSnapshot) -> bool {
    evaluate_in_scope(condition, snapshot, &ModelPath::root())
}

/// Evaluates a condition tree, resolving leaf properties relative to
/// `scope` first and absolutely second.
///
/// A tree with any malformed leaf evaluates to `false`, hide groups
/// included.
#[must_use]
pub fn evaluate_in_scope(
    condition: &VisibilityCondition,
    snapshot: &impl ModelSnapshot,
    scope: &ModelPath,
) -> bool {
    condition.is_well_formed() && evaluate_node(condition, snapshot, scope)
}

fn evaluate_node(
    condition: &VisibilityCondition,
    snapshot: &impl ModelSnapshot,
    scope: &ModelPath,
) -> bool {
    match condition {
        VisibilityCondition::Leaf(leaf) => evaluate_leaf(leaf, snapshot, scope),
        VisibilityCondition::Group(group) => {
            let matched = match group.rule() {
                LogicalRule::And => group
                    .conditions()
                    .iter()
                    .all(|nested| evaluate_node(nested, snapshot, scope)),
                LogicalRule::Or => group
                    .conditions()
                    .iter()
                    .any(|nested| evaluate_node(nested, snapshot, scope)),
            };

            if group.show() { matched } else { !matched }
        }
    }
}

fn evaluate_leaf(leaf: &ConditionLeaf, snapshot: &impl ModelSnapshot, scope: &ModelPath) -> bool {
    let Ok(operator) = leaf.operator().parse::<ConditionOperator>() else {
        return false;
    };
    let Ok(property) = ModelPath::parse(leaf.property()) else {
        return false;
    };

    let scoped = (!scope.is_root())
        .then(|| snapshot.value_at(&scope.join(&property)))
        .flatten();
    let current = scoped.or_else(|| snapshot.value_at(&property));

    leaf_matches(operator, current, leaf.value())
}

fn leaf_matches(operator: ConditionOperator, current: Option<&Value>, expected: &Value) -> bool {
    let current_or_null = current.unwrap_or(&Value::Null);
    match operator {
        ConditionOperator::Equals => loosely_equal(current_or_null, expected),
        ConditionOperator::NotEquals => !loosely_equal(current_or_null, expected),
        ConditionOperator::Exists => !is_empty(current),
        ConditionOperator::NotExists => is_empty(current),
        ConditionOperator::GreaterThan => compare(current_or_null, expected).is_some_and(Ordering::is_gt),
        ConditionOperator::GreaterThanOrEqual => {
            compare(current_or_null, expected).is_some_and(Ordering::is_ge)
        }
        ConditionOperator::LessThan => compare(current_or_null, expected).is_some_and(Ordering::is_lt),
        ConditionOperator::LessThanOrEqual => {
            compare(current_or_null, expected).is_some_and(Ordering::is_le)
        }
        ConditionOperator::Contains => match current_or_null {
            Value::Array(items) => items.iter().any(|item| loosely_equal(item, expected)),
            Value::String(text) => expected
                .as_str()
                .is_some_and(|needle| text.to_lowercase().contains(needle.to_lowercase().as_str())),
            _ => false,
        },
        ConditionOperator::In => expected
            .as_array()
            .is_some_and(|candidates| {
                candidates
                    .iter()
                    .any(|candidate| loosely_equal(current_or_null, candidate))
            }),
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(object)) => object.is_empty(),
        Some(_) => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }

    match (left, right) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            matches!((as_number(left), as_number(right)), (Some(a), Some(b)) if a == b)
        }
        (Value::Bool(flag), Value::String(text)) | (Value::String(text), Value::Bool(flag)) => {
            text.eq_ignore_ascii_case(if *flag { "true" } else { "false" })
        }
        _ => false,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(left_number), Some(right_number)) = (as_number(left), as_number(right)) {
        return left_number.partial_cmp(&right_number);
    }

    if let (Some(left_text), Some(right_text)) = (left.as_str(), right.as_str()) {
        return Some(left_text.cmp(right_text));
    }

    None
}
