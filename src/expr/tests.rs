//! Tests for expression rendering and builders.

use super::builders::*;
use super::{ComparisonOp, ConditionNode};

#[test]
fn test_literals() {
    assert_eq!(string("issues").render(), "'issues'");
    assert_eq!(string("it's").render(), "'it''s'");
    assert_eq!(boolean(true).render(), "true");
    assert_eq!(boolean(false).render(), "false");
    assert_eq!(number(3.0).render(), "3");
    assert_eq!(number(-2.0).render(), "-2");
    assert_eq!(number(1.5).render(), "1.5");
}

#[test]
fn test_comparison_operators() {
    let ops = [
        (ComparisonOp::Eq, "=="),
        (ComparisonOp::NotEq, "!="),
        (ComparisonOp::Lt, "<"),
        (ComparisonOp::Gt, ">"),
        (ComparisonOp::LtEq, "<="),
        (ComparisonOp::GtEq, ">="),
    ];
    for (op, text) in ops {
        let node = compare(property("a"), op, number(1.0));
        assert_eq!(node.render(), format!("a {} 1", text));
    }
}

#[test]
fn test_and_or_not_parenthesize_every_operand() {
    let node = and(property("a"), or(property("b"), not(property("c"))));
    assert_eq!(node.render(), "(a) && ((b) || (!(c)))");
}

#[test]
fn test_deep_nesting_preserves_grouping() {
    // ((a || b) && c) || d
    let node = or(and(or(property("a"), property("b")), property("c")), property("d"));
    assert_eq!(node.render(), "(((a) || (b)) && (c)) || (d)");

    // a || (b && (c || d)) differs from the tree above
    let other = or(property("a"), and(property("b"), or(property("c"), property("d"))));
    assert_eq!(other.render(), "(a) || ((b) && ((c) || (d)))");
    assert_ne!(node.render(), other.render());
}

#[test]
fn test_disjunction_single_term_renders_bare() {
    let node = any_of(vec![property("github.event.issue.number")]);
    assert_eq!(node.render(), "github.event.issue.number");

    let node = any_of_multiline(vec![property("x")]);
    assert_eq!(node.render(), "x");
}

#[test]
fn test_disjunction_single_line() {
    let node = any_of(vec![property("a"), property("b"), property("c")]);
    assert_eq!(node.render(), "a || b || c");
}

#[test]
fn test_disjunction_multiline_with_descriptions() {
    let node = any_of_multiline(vec![
        described("github.event.issue.number", "issue context"),
        expression("github.event.pull_request.number"),
        described("github.event.discussion.number", "discussion context"),
    ]);
    let expected = "# issue context\n\
                    github.event.issue.number ||\n\
                    github.event.pull_request.number ||\n\
                    # discussion context\n\
                    github.event.discussion.number";
    assert_eq!(node.render(), expected);
}

#[test]
fn test_empty_disjunction_is_false() {
    assert_eq!(any_of(Vec::new()).render(), "false");
}

#[test]
fn test_function_call_contains_and_ternary() {
    let node = call("startsWith", vec![property("github.ref"), string("refs/tags/")]);
    assert_eq!(node.render(), "startsWith(github.ref, 'refs/tags/')");

    let node = contains(property("github.event.issue.labels.*.name"), string("bug"));
    assert_eq!(node.render(), "contains(github.event.issue.labels.*.name, 'bug')");

    let node = ternary(property("a"), string("yes"), string("no"));
    assert_eq!(node.render(), "a ? 'yes' : 'no'");
}

#[test]
fn test_gating_idioms() {
    assert_eq!(
        event_type_equals("issues").render(),
        "github.event_name == 'issues'"
    );
    assert_eq!(
        labels_contain("github.event.pull_request.labels.*.name", "ready").render(),
        "contains(github.event.pull_request.labels.*.name, 'ready')"
    );
    assert_eq!(
        ref_starts_with("refs/heads/release/").render(),
        "startsWith(github.ref, 'refs/heads/release/')"
    );
    assert_eq!(
        mention_in_any("/triage").render(),
        "contains(github.event.issue.body, '/triage') || \
         contains(github.event.comment.body, '/triage') || \
         contains(github.event.pull_request.body, '/triage')"
    );
}

#[test]
fn test_and_all_folds_left() {
    assert!(and_all(Vec::new()).is_none());
    let single = and_all(vec![property("a")]).unwrap();
    assert_eq!(single.render(), "a");
    let three = and_all(vec![property("a"), property("b"), property("c")]).unwrap();
    assert_eq!(three.render(), "((a) && (b)) && (c)");
}

#[test]
fn test_rendering_is_idempotent() {
    let node = and(
        expression("github.repository == 'octo/repo'"),
        not(any_of_multiline(vec![
            event_type_equals("issues"),
            event_type_equals("issue_comment"),
        ])),
    );
    let first = node.render();
    let second = node.render();
    assert_eq!(first, second);
    assert_eq!(node.to_string(), first);
}

#[test]
fn test_description_only_on_expressions() {
    assert_eq!(described("a", "why").description(), Some("why"));
    assert_eq!(property("a").description(), None);
    assert!(matches!(expression("a"), ConditionNode::Expression { .. }));
}
