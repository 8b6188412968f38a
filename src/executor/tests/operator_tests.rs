//! Tests for binary operators

use super::helpers::{error_of, num, op, output_of, run, text};
use crate::executor::{errors, BinaryOpKind, Node, Value};

fn eval(node: Node) -> Value {
    run(node).result.unwrap()
}

#[test]
fn test_integer_arithmetic() {
    assert_eq!(eval(op(BinaryOpKind::Sum, num(2), num(3))), Value::Int(5));
    assert_eq!(eval(op(BinaryOpKind::Sub, num(2), num(3))), Value::Int(-1));
    assert_eq!(eval(op(BinaryOpKind::Mul, num(4), num(3))), Value::Int(12));
}

#[test]
fn test_division_is_real() {
    assert_eq!(eval(op(BinaryOpKind::Div, num(7), num(2))), Value::Float(3.5));
    assert_eq!(output_of(Node::print(op(BinaryOpKind::Div, num(4), num(2)))), "2.0\n");
}

#[test]
fn test_division_by_zero() {
    let err = error_of(op(BinaryOpKind::Div, num(1), num(0)));
    assert_eq!(err.kind(), errors::ZERO_DIVISION);
}

#[test]
fn test_mixed_int_float_arithmetic() {
    let half = op(BinaryOpKind::Div, num(1), num(2));
    assert_eq!(eval(op(BinaryOpKind::Sum, half, num(1))), Value::Float(1.5));
}

#[test]
fn test_integer_overflow_is_an_error() {
    let err = error_of(op(
        BinaryOpKind::Sum,
        Node::number_text(i64::MAX.to_string()),
        num(1),
    ));
    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
}

#[test]
fn test_string_concatenation_and_repeat() {
    assert_eq!(eval(op(BinaryOpKind::Sum, text("ab"), text("cd"))), Value::str("abcd"));
    assert_eq!(eval(op(BinaryOpKind::Mul, text("ab"), num(3))), Value::str("ababab"));
}

#[test]
fn test_huge_repeat_is_an_error() {
    let count = || Node::number_text(i64::MAX.to_string());

    let err = error_of(op(BinaryOpKind::Mul, text("ab"), count()));
    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
    assert!(err.to_string().contains("too long"));

    let items = Node::array(vec![num(1), num(2), num(3)]);
    let err = error_of(op(BinaryOpKind::Mul, items, count()));
    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
}

#[test]
fn test_repeat_empty_string_any_count() {
    assert_eq!(eval(op(BinaryOpKind::Mul, text(""), num(1_000_000))), Value::str(""));
}

#[test]
fn test_array_concatenation() {
    let program = Node::print(op(
        BinaryOpKind::Sum,
        Node::array(vec![num(1)]),
        Node::array(vec![text("a")]),
    ));
    assert_eq!(output_of(program), "[1, 'a']\n");
}

#[test]
fn test_adding_string_and_int_fails() {
    let err = error_of(op(BinaryOpKind::Sum, num(1), text("a")));

    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
    assert!(err.to_string().contains("'int' and 'str'"));
}

#[test]
fn test_comparisons() {
    assert_eq!(eval(op(BinaryOpKind::LessThan, num(1), num(2))), Value::Bool(true));
    assert_eq!(eval(op(BinaryOpKind::GreaterThan, num(1), num(2))), Value::Bool(false));
    assert_eq!(eval(op(BinaryOpKind::GreaterEqual, num(2), num(2))), Value::Bool(true));
    assert_eq!(eval(op(BinaryOpKind::LessEqual, num(3), num(2))), Value::Bool(false));
    assert_eq!(eval(op(BinaryOpKind::LessThan, text("a"), text("b"))), Value::Bool(true));
}

#[test]
fn test_equality_across_types() {
    assert_eq!(eval(op(BinaryOpKind::Equal, num(1), num(1))), Value::Bool(true));
    assert_eq!(eval(op(BinaryOpKind::Equal, num(1), text("1"))), Value::Bool(false));
    assert_eq!(eval(op(BinaryOpKind::NotEqual, num(1), text("1"))), Value::Bool(true));

    // 2 / 1 is the float 2.0, equal to the integer 2
    let two = op(BinaryOpKind::Div, num(2), num(1));
    assert_eq!(eval(op(BinaryOpKind::Equal, two, num(2))), Value::Bool(true));
}

#[test]
fn test_ordering_mismatched_types_fails() {
    let err = error_of(op(BinaryOpKind::LessThan, text("a"), num(1)));
    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
}

#[test]
fn test_operands_evaluated_left_to_right() {
    let program = Node::block([
        op(
            BinaryOpKind::Sum,
            Node::assign("x", num(1)),
            Node::assign("x", num(2)),
        ),
        Node::print(Node::var("x")),
    ]);
    assert_eq!(output_of(program), "2\n");
}
