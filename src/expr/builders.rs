//! Constructors for expression trees.
//!
//! Small functions that build [`ConditionNode`] values bottom-up, plus helpers
//! for the gating idioms that recur across generated jobs.

use super::{ComparisonOp, ConditionNode};

/// Event payload fields that can carry a command mention.
pub const MENTION_BODY_PROPERTIES: [&str; 3] = [
    "github.event.issue.body",
    "github.event.comment.body",
    "github.event.pull_request.body",
];

pub fn expression(text: impl Into<String>) -> ConditionNode {
    ConditionNode::Expression {
        text: text.into(),
        description: None,
    }
}

/// An opaque expression carrying a description (rendered as a comment in
/// multiline disjunctions).
pub fn described(text: impl Into<String>, description: impl Into<String>) -> ConditionNode {
    ConditionNode::Expression {
        text: text.into(),
        description: Some(description.into()),
    }
}

pub fn property(path: impl Into<String>) -> ConditionNode {
    ConditionNode::Property(path.into())
}

pub fn string(value: impl Into<String>) -> ConditionNode {
    ConditionNode::StringLiteral(value.into())
}

pub fn boolean(value: bool) -> ConditionNode {
    ConditionNode::BooleanLiteral(value)
}

pub fn number(value: f64) -> ConditionNode {
    ConditionNode::NumberLiteral(value)
}

pub fn compare(left: ConditionNode, op: ComparisonOp, right: ConditionNode) -> ConditionNode {
    ConditionNode::Comparison {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

pub fn equals(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    compare(left, ComparisonOp::Eq, right)
}

pub fn not_equals(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    compare(left, ComparisonOp::NotEq, right)
}

pub fn and(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode::And(Box::new(left), Box::new(right))
}

pub fn or(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode::Or(Box::new(left), Box::new(right))
}

pub fn not(inner: ConditionNode) -> ConditionNode {
    ConditionNode::Not(Box::new(inner))
}

/// Left fold of `nodes` with `&&`. Returns `None` for an empty input.
pub fn and_all(nodes: impl IntoIterator<Item = ConditionNode>) -> Option<ConditionNode> {
    nodes.into_iter().reduce(and)
}

/// Single-line n-ary disjunction.
pub fn any_of(terms: Vec<ConditionNode>) -> ConditionNode {
    ConditionNode::Disjunction {
        terms,
        multiline: false,
    }
}

/// Multiline n-ary disjunction, one term per line.
pub fn any_of_multiline(terms: Vec<ConditionNode>) -> ConditionNode {
    ConditionNode::Disjunction {
        terms,
        multiline: true,
    }
}

pub fn call(name: impl Into<String>, args: Vec<ConditionNode>) -> ConditionNode {
    ConditionNode::FunctionCall {
        name: name.into(),
        args,
    }
}

pub fn contains(array: ConditionNode, value: ConditionNode) -> ConditionNode {
    ConditionNode::Contains {
        array: Box::new(array),
        value: Box::new(value),
    }
}

pub fn ternary(
    condition: ConditionNode,
    if_true: ConditionNode,
    if_false: ConditionNode,
) -> ConditionNode {
    ConditionNode::Ternary {
        condition: Box::new(condition),
        if_true: Box::new(if_true),
        if_false: Box::new(if_false),
    }
}

// ============================================================================
// Gating idioms
// ============================================================================

/// `github.event_name == '<event>'`
pub fn event_type_equals(event: &str) -> ConditionNode {
    equals(property("github.event_name"), string(event))
}

/// `contains(<labels_property>, '<label>')`
pub fn labels_contain(labels_property: &str, label: &str) -> ConditionNode {
    contains(property(labels_property), string(label))
}

/// `startsWith(github.ref, '<prefix>')`
pub fn ref_starts_with(prefix: &str) -> ConditionNode {
    call("startsWith", vec![property("github.ref"), string(prefix)])
}

/// True when `mention` appears in the issue body, comment body, or PR body.
pub fn mention_in_any(mention: &str) -> ConditionNode {
    any_of(
        MENTION_BODY_PROPERTIES
            .iter()
            .map(|body| contains(property(*body), string(mention)))
            .collect(),
    )
}

/// True when any of the listed properties is set (`a || b || c`).
pub fn any_property_set(properties: &[&str]) -> ConditionNode {
    any_of(properties.iter().map(|p| property(*p)).collect())
}
