//! Expression AST for the CI platform's `${{ }}` expression language.
//!
//! Guard conditions in the generated pipeline are built as [`ConditionNode`]
//! trees by the small constructors in [`builders`] and rendered to text once.
//!
//! # Rendering rules
//!
//! - String literals are single-quoted, with embedded quotes doubled (`'it''s'`).
//! - `And`, `Or` and `Not` parenthesize every operand, so the rendered text never
//!   depends on operator precedence or nesting depth.
//! - A [`ConditionNode::Disjunction`] renders one term bare, several terms joined
//!   by ` || `, or in multiline mode one term per line with each term except the
//!   last suffixed by ` ||` and optionally preceded by a `# description` comment.
//!
//! Rendering is pure: the same tree always renders to the same text.

pub mod builders;

#[cfg(test)]
mod tests;

use std::fmt;

/// Comparison operators supported by the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl ComparisonOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Gt => ">",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::GtEq => ">=",
        }
    }
}

/// A node of a boolean/value expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// Raw expression text, rendered verbatim.
    Expression {
        text: String,
        description: Option<String>,
    },
    /// A context property access such as `github.event_name`.
    Property(String),
    StringLiteral(String),
    BooleanLiteral(bool),
    NumberLiteral(f64),
    Comparison {
        left: Box<ConditionNode>,
        op: ComparisonOp,
        right: Box<ConditionNode>,
    },
    And(Box<ConditionNode>, Box<ConditionNode>),
    Or(Box<ConditionNode>, Box<ConditionNode>),
    Not(Box<ConditionNode>),
    /// Flat n-ary `||` that avoids deep right-nesting.
    Disjunction {
        terms: Vec<ConditionNode>,
        multiline: bool,
    },
    FunctionCall {
        name: String,
        args: Vec<ConditionNode>,
    },
    Contains {
        array: Box<ConditionNode>,
        value: Box<ConditionNode>,
    },
    Ternary {
        condition: Box<ConditionNode>,
        if_true: Box<ConditionNode>,
        if_false: Box<ConditionNode>,
    },
}

impl ConditionNode {
    /// Render the tree in the platform's expression syntax.
    pub fn render(&self) -> String {
        match self {
            ConditionNode::Expression { text, .. } => text.clone(),
            ConditionNode::Property(path) => path.clone(),
            ConditionNode::StringLiteral(value) => render_string_literal(value),
            ConditionNode::BooleanLiteral(value) => value.to_string(),
            ConditionNode::NumberLiteral(value) => render_number(*value),
            ConditionNode::Comparison { left, op, right } => {
                format!("{} {} {}", left.render(), op.as_str(), right.render())
            }
            ConditionNode::And(left, right) => {
                format!("({}) && ({})", left.render(), right.render())
            }
            ConditionNode::Or(left, right) => {
                format!("({}) || ({})", left.render(), right.render())
            }
            ConditionNode::Not(inner) => format!("!({})", inner.render()),
            ConditionNode::Disjunction { terms, multiline } => {
                render_disjunction(terms, *multiline)
            }
            ConditionNode::FunctionCall { name, args } => render_call(name, args),
            ConditionNode::Contains { array, value } => {
                format!("contains({}, {})", array.render(), value.render())
            }
            ConditionNode::Ternary {
                condition,
                if_true,
                if_false,
            } => format!(
                "{} ? {} : {}",
                condition.render(),
                if_true.render(),
                if_false.render()
            ),
        }
    }

    /// Human-readable description attached to an opaque expression, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            ConditionNode::Expression { description, .. } => description.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn render_call(name: &str, args: &[ConditionNode]) -> String {
    let args: Vec<String> = args.iter().map(ConditionNode::render).collect();
    format!("{}({})", name, args.join(", "))
}

fn render_disjunction(terms: &[ConditionNode], multiline: bool) -> String {
    match terms {
        // The empty disjunction is the identity of `||`.
        [] => "false".to_string(),
        [only] => only.render(),
        _ if !multiline => terms
            .iter()
            .map(ConditionNode::render)
            .collect::<Vec<_>>()
            .join(" || "),
        _ => {
            let last = terms.len() - 1;
            let mut lines = Vec::with_capacity(terms.len() * 2);
            for (i, term) in terms.iter().enumerate() {
                if let Some(description) = term.description() {
                    lines.push(format!("# {}", description));
                }
                if i < last {
                    lines.push(format!("{} ||", term.render()));
                } else {
                    lines.push(term.render());
                }
            }
            lines.join("\n")
        }
    }
}
