//! Operator semantics over already evaluated operands.

use std::sync::Arc;

use crate::{
    ast::{InfixOperator, PostfixOperator, PrefixOperator},
    object::{Closure, Object},
};

use super::evaluator::{failure, raise, ControlFlow, EvalResult};

/// Largest number of elements `a..b` may produce.
const RANGE_LIMIT: i128 = 10_000_000;

pub fn eval_prefix(operator: PrefixOperator, right: &Object) -> EvalResult {
    match (operator, right) {
        (PrefixOperator::Bang, value) => Ok(Object::Boolean(!value.is_truthy())),
        (PrefixOperator::Minus, Object::Integer(value)) => value
            .checked_neg()
            .map(Object::Integer)
            .ok_or_else(|| failure(format!("integer overflow: -{}", value))),
        (PrefixOperator::Minus, Object::Float(value)) => Ok(Object::Float(-value)),
        (operator, value) => raise(format!(
            "unknown operator: {}{}",
            operator,
            value.object_type()
        )),
    }
}

pub fn eval_postfix(operator: PostfixOperator, current: &Object) -> EvalResult {
    match (operator, current) {
        (PostfixOperator::Increment, Object::Integer(value)) => value
            .checked_add(1)
            .map(Object::Integer)
            .ok_or_else(|| failure(format!("integer overflow: {}++", value))),
        (PostfixOperator::Decrement, Object::Integer(value)) => value
            .checked_sub(1)
            .map(Object::Integer)
            .ok_or_else(|| failure(format!("integer overflow: {}--", value))),
        (PostfixOperator::Increment, Object::Float(value)) => Ok(Object::Float(value + 1.0)),
        (PostfixOperator::Decrement, Object::Float(value)) => Ok(Object::Float(value - 1.0)),
        (operator, value) => raise(format!(
            "unknown operator: {}{}",
            value.object_type(),
            operator
        )),
    }
}

/// Binary operators other than the short-circuiting pair, which the
/// evaluator handles before the right operand exists.
pub fn eval_infix(operator: InfixOperator, left: &Object, right: &Object) -> EvalResult {
    let result = match (left, right) {
        (Object::Integer(l), Object::Integer(r)) => return integer_infix(operator, *l, *r),
        (Object::Integer(l), Object::Float(r)) => float_infix(operator, *l as f64, *r),
        (Object::Float(l), Object::Integer(r)) => float_infix(operator, *l, *r as f64),
        (Object::Float(l), Object::Float(r)) => float_infix(operator, *l, *r),
        (Object::String(l), Object::String(r)) => string_infix(operator, l, r),
        (Object::String(text), Object::Regexp(regexp)) => match operator {
            InfixOperator::Matches => Some(Object::Boolean(regexp.is_match(text))),
            InfixOperator::NotMatches => Some(Object::Boolean(!regexp.is_match(text))),
            _ => None,
        },
        _ => None,
    };
    if let Some(result) = result {
        return Ok(result);
    }

    match operator {
        InfixOperator::Equal => Ok(Object::Boolean(objects_equal(left, right))),
        InfixOperator::NotEqual => Ok(Object::Boolean(!objects_equal(left, right))),
        InfixOperator::And => Ok(Object::Boolean(left.is_truthy() && right.is_truthy())),
        InfixOperator::Or => Ok(Object::Boolean(left.is_truthy() || right.is_truthy())),
        _ if left.object_type() != right.object_type() => raise(format!(
            "type mismatch: {} {} {}",
            left.object_type(),
            operator,
            right.object_type()
        )),
        _ => Err(unknown_operator(left, operator, right)),
    }
}

fn unknown_operator(left: &Object, operator: InfixOperator, right: &Object) -> ControlFlow {
    failure(format!(
        "unknown operator: {} {} {}",
        left.object_type(),
        operator,
        right.object_type()
    ))
}

fn integer_infix(operator: InfixOperator, l: i64, r: i64) -> EvalResult {
    let checked = |value: Option<i64>| {
        value
            .map(Object::Integer)
            .ok_or_else(|| failure(format!("integer overflow: {} {} {}", l, operator, r)))
    };
    match operator {
        InfixOperator::Plus => checked(l.checked_add(r)),
        InfixOperator::Minus => checked(l.checked_sub(r)),
        InfixOperator::Multiply => checked(l.checked_mul(r)),
        InfixOperator::Divide if r == 0 => raise("division by zero"),
        InfixOperator::Divide => checked(l.checked_div(r)),
        InfixOperator::Modulo if r == 0 => raise("modulo by zero"),
        InfixOperator::Modulo => checked(l.checked_rem(r)),
        InfixOperator::Power if r < 0 => Ok(Object::Float((l as f64).powf(r as f64))),
        InfixOperator::Power => checked(u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp))),
        InfixOperator::Less => Ok(Object::Boolean(l < r)),
        InfixOperator::LessEqual => Ok(Object::Boolean(l <= r)),
        InfixOperator::Greater => Ok(Object::Boolean(l > r)),
        InfixOperator::GreaterEqual => Ok(Object::Boolean(l >= r)),
        InfixOperator::Equal => Ok(Object::Boolean(l == r)),
        InfixOperator::NotEqual => Ok(Object::Boolean(l != r)),
        InfixOperator::And | InfixOperator::Or => Ok(Object::Boolean(true)),
        InfixOperator::Range if i128::from(r) - i128::from(l) >= RANGE_LIMIT => {
            raise(format!("range too large: {}..{}", l, r))
        }
        InfixOperator::Range => Ok(Object::array((l..=r).map(Object::Integer).collect())),
        InfixOperator::Matches | InfixOperator::NotMatches => Err(unknown_operator(
            &Object::Integer(l),
            operator,
            &Object::Integer(r),
        )),
    }
}

fn float_infix(operator: InfixOperator, l: f64, r: f64) -> Option<Object> {
    let value = match operator {
        InfixOperator::Plus => Object::Float(l + r),
        InfixOperator::Minus => Object::Float(l - r),
        InfixOperator::Multiply => Object::Float(l * r),
        InfixOperator::Divide => Object::Float(l / r),
        InfixOperator::Modulo => Object::Float(l % r),
        InfixOperator::Power => Object::Float(l.powf(r)),
        InfixOperator::Less => Object::Boolean(l < r),
        InfixOperator::LessEqual => Object::Boolean(l <= r),
        InfixOperator::Greater => Object::Boolean(l > r),
        InfixOperator::GreaterEqual => Object::Boolean(l >= r),
        InfixOperator::Equal => Object::Boolean(l == r),
        InfixOperator::NotEqual => Object::Boolean(l != r),
        _ => return None,
    };
    Some(value)
}

fn string_infix(operator: InfixOperator, l: &Arc<str>, r: &Arc<str>) -> Option<Object> {
    let value = match operator {
        InfixOperator::Plus => Object::from(format!("{}{}", l, r)),
        InfixOperator::Equal => Object::Boolean(l == r),
        InfixOperator::NotEqual => Object::Boolean(l != r),
        InfixOperator::Less => Object::Boolean(l < r),
        InfixOperator::LessEqual => Object::Boolean(l <= r),
        InfixOperator::Greater => Object::Boolean(l > r),
        InfixOperator::GreaterEqual => Object::Boolean(l >= r),
        _ => return None,
    };
    Some(value)
}

pub fn eval_index(left: &Object, index: &Object) -> EvalResult {
    match (left, index) {
        (Object::Array(array), Object::Integer(position)) => usize::try_from(*position)
            .ok()
            .and_then(|position| array.elements.get(position))
            .cloned()
            .ok_or_else(|| {
                failure(format!(
                    "index out of range: {} (length {})",
                    position,
                    array.len()
                ))
            }),
        (Object::Hash(hash), key) => match hash.get(key) {
            Ok(value) => Ok(value.cloned().unwrap_or(Object::Null)),
            Err(key_type) => raise(format!("unusable as hash key: {}", key_type)),
        },
        (Object::String(text), Object::Integer(position)) => char_at(text, *position),
        (Object::DocString(doc), Object::Integer(position)) => char_at(doc.value(), *position),
        _ => raise(format!(
            "index operator not supported: {}[{}]",
            left.object_type(),
            index.object_type()
        )),
    }
}

fn char_at(text: &str, position: i64) -> EvalResult {
    usize::try_from(position)
        .ok()
        .and_then(|position| text.chars().nth(position))
        .map(|c| Object::from(c.to_string()))
        .ok_or_else(|| {
            failure(format!(
                "index out of range: {} (length {})",
                position,
                text.chars().count()
            ))
        })
}

/// Script level `==`: scalars by value, containers and functions by identity.
pub fn objects_equal(left: &Object, right: &Object) -> bool {
    match (left, right) {
        (Object::Null, Object::Null) => true,
        (Object::Boolean(a), Object::Boolean(b)) => a == b,
        (Object::Integer(a), Object::Integer(b)) => a == b,
        (Object::Float(a), Object::Float(b)) => a == b,
        (Object::Integer(a), Object::Float(b)) | (Object::Float(b), Object::Integer(a)) => {
            *a as f64 == *b
        }
        (Object::String(a), Object::String(b)) => a == b,
        (Object::DocString(a), Object::DocString(b)) => a.value() == b.value(),
        (Object::Regexp(a), Object::Regexp(b)) => {
            a.pattern() == b.pattern() && a.flags() == b.flags()
        }
        (Object::Array(a), Object::Array(b)) => Arc::ptr_eq(a, b),
        (Object::Hash(a), Object::Hash(b)) => Arc::ptr_eq(a, b),
        (Object::Function(a), Object::Function(b)) => Closure::ptr_eq(a, b),
        (Object::Builtin(a), Object::Builtin(b)) => a.name() == b.name(),
        (Object::Error(a), Object::Error(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectType, Regexp};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn error_message(result: EvalResult) -> String {
        match result {
            Err(ControlFlow::Error(error)) => error.message.clone(),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        let cases = vec![
            (InfixOperator::Plus, 7, 2, Object::from(9)),
            (InfixOperator::Minus, 7, 2, Object::from(5)),
            (InfixOperator::Multiply, 7, 2, Object::from(14)),
            (InfixOperator::Divide, 7, 2, Object::from(3)),
            (InfixOperator::Modulo, 7, 2, Object::from(1)),
            (InfixOperator::Power, 2, 10, Object::from(1024)),
            (InfixOperator::Power, 2, -1, Object::from(0.5)),
            (InfixOperator::Less, 1, 2, Object::from(true)),
            (InfixOperator::GreaterEqual, 1, 2, Object::from(false)),
        ];
        for (operator, l, r, expected) in cases {
            let result = eval_infix(operator, &Object::from(l), &Object::from(r)).unwrap();
            assert_eq!(result, expected, "{} {} {}", l, operator, r);
        }
    }

    #[test]
    fn test_arithmetic_failures_are_errors() {
        let zero = Object::from(0);
        assert_eq!(
            error_message(eval_infix(InfixOperator::Divide, &Object::from(1), &zero)),
            "division by zero"
        );
        assert_eq!(
            error_message(eval_infix(InfixOperator::Modulo, &Object::from(1), &zero)),
            "modulo by zero"
        );
        assert!(error_message(eval_infix(
            InfixOperator::Plus,
            &Object::from(i64::MAX),
            &Object::from(1)
        ))
        .starts_with("integer overflow"));
        assert!(error_message(eval_prefix(PrefixOperator::Minus, &Object::from(i64::MIN)))
            .starts_with("integer overflow"));
    }

    #[test]
    fn test_mixed_numbers_promote_to_float() {
        assert_eq!(
            eval_infix(InfixOperator::Plus, &Object::from(1), &Object::from(0.5)).unwrap(),
            Object::from(1.5)
        );
        assert_eq!(
            eval_infix(InfixOperator::Equal, &Object::from(2.0), &Object::from(2)).unwrap(),
            Object::from(true)
        );
    }

    #[test]
    fn test_strings_and_regexps() {
        assert_eq!(
            eval_infix(InfixOperator::Plus, &Object::from("foo"), &Object::from("bar")).unwrap(),
            Object::from("foobar")
        );
        assert_eq!(
            error_message(eval_infix(
                InfixOperator::Minus,
                &Object::from("a"),
                &Object::from("b")
            )),
            "unknown operator: STRING - STRING"
        );

        let regexp = Object::Regexp(Arc::new(Regexp::new("^co", "i").unwrap()));
        assert_eq!(
            eval_infix(InfixOperator::Matches, &Object::from("Cozy"), &regexp).unwrap(),
            Object::from(true)
        );
        assert_eq!(
            eval_infix(InfixOperator::NotMatches, &Object::from("Cozy"), &regexp).unwrap(),
            Object::from(false)
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            error_message(eval_infix(
                InfixOperator::Plus,
                &Object::from(1),
                &Object::from("a")
            )),
            "type mismatch: INTEGER + STRING"
        );
        assert_eq!(
            eval_infix(InfixOperator::Equal, &Object::from(1), &Object::from("1")).unwrap(),
            Object::from(false)
        );
    }

    #[test]
    fn test_range_is_inclusive() {
        assert_eq!(
            eval_infix(InfixOperator::Range, &Object::from(1), &Object::from(3)).unwrap(),
            Object::array(vec![Object::from(1), Object::from(2), Object::from(3)])
        );
        assert_eq!(
            eval_infix(InfixOperator::Range, &Object::from(3), &Object::from(1)).unwrap(),
            Object::array(vec![])
        );
    }

    #[test]
    fn test_containers_compare_by_identity() {
        let array = Object::array(vec![Object::from(1)]);
        let same_contents = Object::array(vec![Object::from(1)]);
        assert!(objects_equal(&array, &array.clone()));
        assert!(!objects_equal(&array, &same_contents));
    }

    #[test]
    fn test_indexing() {
        let array = Object::array(vec![Object::from("a"), Object::from("b")]);
        assert_eq!(eval_index(&array, &Object::from(1)).unwrap(), Object::from("b"));
        assert_eq!(
            error_message(eval_index(&array, &Object::from(2))),
            "index out of range: 2 (length 2)"
        );
        assert!(eval_index(&array, &Object::from(-1)).is_err());

        let mut hash = crate::object::Hash::new();
        hash.insert(Object::from("k"), Object::from(1)).unwrap();
        let hash = Object::hash(hash);
        assert_eq!(eval_index(&hash, &Object::from("k")).unwrap(), Object::from(1));
        assert_eq!(eval_index(&hash, &Object::from("x")).unwrap(), Object::Null);
        assert_eq!(
            error_message(eval_index(&hash, &Object::array(vec![]))),
            "unusable as hash key: ARRAY"
        );

        assert_eq!(
            eval_index(&Object::from("héllo"), &Object::from(1)).unwrap(),
            Object::from("é")
        );
    }

    #[test]
    fn test_postfix() {
        assert_eq!(
            eval_postfix(PostfixOperator::Increment, &Object::from(1)).unwrap(),
            Object::from(2)
        );
        assert_eq!(
            eval_postfix(PostfixOperator::Decrement, &Object::from(1.5)).unwrap(),
            Object::from(0.5)
        );
        assert!(eval_postfix(PostfixOperator::Increment, &Object::from("a")).is_err());
    }

    fn number() -> impl Strategy<Value = Object> {
        prop_oneof![
            (-1_000_000i64..1_000_000).prop_map(Object::Integer),
            (-1.0e6f64..1.0e6).prop_map(Object::Float),
        ]
    }

    fn arithmetic() -> impl Strategy<Value = InfixOperator> {
        prop_oneof![
            Just(InfixOperator::Plus),
            Just(InfixOperator::Minus),
            Just(InfixOperator::Multiply),
            Just(InfixOperator::Divide),
        ]
    }

    proptest! {
        #[test]
        fn prop_mixed_arithmetic_is_float_iff_an_operand_is(
            l in number(),
            operator in arithmetic(),
            r in number(),
        ) {
            prop_assume!(!(operator == InfixOperator::Divide && matches!(r, Object::Integer(0))));
            let result = eval_infix(operator, &l, &r).unwrap();
            let any_float = matches!(l, Object::Float(_)) || matches!(r, Object::Float(_));
            let expected = if any_float { ObjectType::Float } else { ObjectType::Integer };
            prop_assert_eq!(result.object_type(), expected);
        }

        #[test]
        fn prop_checked_addition_matches_i64(l in any::<i64>(), r in any::<i64>()) {
            let result = eval_infix(InfixOperator::Plus, &Object::from(l), &Object::from(r));
            match l.checked_add(r) {
                Some(sum) => prop_assert_eq!(result.unwrap(), Object::from(sum)),
                None => prop_assert!(result.is_err()),
            }
        }

        #[test]
        fn prop_division_never_panics(l in any::<i64>(), r in any::<i64>()) {
            let _ = eval_infix(InfixOperator::Divide, &Object::from(l), &Object::from(r));
            let _ = eval_infix(InfixOperator::Modulo, &Object::from(l), &Object::from(r));
        }

        #[test]
        fn prop_comparison_agrees_with_i64(l in any::<i64>(), r in any::<i64>()) {
            let less = eval_infix(InfixOperator::Less, &Object::from(l), &Object::from(r)).unwrap();
            prop_assert_eq!(less, Object::from(l < r));
        }

        #[test]
        fn prop_bang_is_negated_truthiness(value in any::<i64>(), flag in any::<bool>()) {
            for object in [Object::from(value), Object::from(flag), Object::Null] {
                let negated = eval_prefix(PrefixOperator::Bang, &object).unwrap();
                prop_assert_eq!(negated, Object::from(!object.is_truthy()));
            }
        }
    }
}
