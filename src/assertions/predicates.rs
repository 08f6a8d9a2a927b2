//! The standard assertion predicates.
//!
//! Every predicate shares the [`PredicateFn`](super::PredicateFn) calling convention:
//! positional arguments followed by an optional message that replaces the assertion
//! name in the diagnostic label.

use std::panic::{self, AssertUnwindSafe};

use regex::Regex;

use super::stack;
use crate::context::TestContext;
use crate::errors::TestError;
use crate::fingerprint::fingerprint;
use crate::value::Value;

// ============================================================================
// HELPERS
// ============================================================================

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Label used in the diagnostic: the caller's message if given, else the predicate name.
fn label(args: &[Value], arity: usize, name: &str) -> String {
    match args.get(arity) {
        Some(Value::Undefined) | None => name.to_string(),
        Some(message) => message.coerce_string(),
    }
}

fn failure(ctx: &TestContext, index: u32, name: &str, label: String, detail: String) -> TestError {
    TestError::Assertion {
        index,
        assertion: name.to_string(),
        message: format!("at assertion #{index}: {label}: {detail}"),
        stack: stack::capture(ctx.stack_policy(), ctx.call_site()),
    }
}

/// Counts the assertion, then fails with `detail` unless `holds`.
fn check(
    ctx: &mut TestContext,
    args: &[Value],
    arity: usize,
    name: &str,
    holds: impl FnOnce(&[Value]) -> bool,
    detail: impl FnOnce(&[Value]) -> String,
) -> Result<Value, TestError> {
    let index = ctx.next_assertion();
    if holds(args) {
        return Ok(Value::Undefined);
    }
    Err(failure(ctx, index, name, label(args, arity, name), detail(args)))
}

fn pattern_matches(pattern: &Value, actual: &Value) -> Result<bool, String> {
    let source = pattern.coerce_string();
    Regex::new(&source)
        .map(|re| re.is_match(&actual.coerce_string()))
        .map_err(|e| format!("({source}) is not a valid pattern: {e}"))
}

fn match_check(ctx: &mut TestContext, args: &[Value], name: &str, expect_match: bool) -> Result<Value, TestError> {
    let index = ctx.next_assertion();
    let (pattern, actual) = (arg(args, 0), arg(args, 1));
    let detail = match pattern_matches(&pattern, &actual) {
        Ok(matched) if matched == expect_match => return Ok(Value::Undefined),
        Ok(true) => format!("({actual}) matches ({pattern})"),
        Ok(false) => format!("({actual}) does not match ({pattern})"),
        Err(invalid) => invalid,
    };
    Err(failure(ctx, index, name, label(args, 2, name), detail))
}

// ============================================================================
// PREDICATES
// ============================================================================

pub fn assert_true(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertTrue", |a| arg(a, 0).is_truthy(), |a| {
        format!("({}) does not evaluate to true", arg(a, 0))
    })
}

pub fn assert_false(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertFalse", |a| !arg(a, 0).is_truthy(), |a| {
        format!("({}) does not evaluate to false", arg(a, 0))
    })
}

pub fn assert_equal(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertEqual",
        |a| fingerprint(&arg(a, 0)) == fingerprint(&arg(a, 1)),
        |a| format!("({}) is not equal to ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_not_equal(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertNotEqual",
        |a| fingerprint(&arg(a, 0)) != fingerprint(&arg(a, 1)),
        |a| format!("({}) is equal to ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_identical(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertIdentical",
        |a| arg(a, 0).identical(&arg(a, 1)),
        |a| format!("({}) is not identical to ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_not_identical(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertNotIdentical",
        |a| !arg(a, 0).identical(&arg(a, 1)),
        |a| format!("({}) is identical to ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_match(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    match_check(ctx, args, "assertMatch", true)
}

pub fn assert_not_match(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    match_check(ctx, args, "assertNotMatch", false)
}

pub fn assert_type_of(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertTypeOf",
        |a| arg(a, 1).type_of() == arg(a, 0).coerce_string(),
        |a| format!("({}) is not of type ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_not_type_of(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertNotTypeOf",
        |a| arg(a, 1).type_of() != arg(a, 0).coerce_string(),
        |a| format!("({}) is of type ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_instance_of(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertInstanceOf",
        |a| arg(a, 1).instance_of(&arg(a, 0).coerce_string()),
        |a| format!("({}) is not an instance of ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_not_instance_of(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(
        ctx,
        args,
        2,
        "assertNotInstanceOf",
        |a| !arg(a, 1).instance_of(&arg(a, 0).coerce_string()),
        |a| format!("({}) is an instance of ({})", arg(a, 1), arg(a, 0)),
    )
}

pub fn assert_null(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertNull", |a| arg(a, 0).is_null(), |a| {
        format!("({}) is not null", arg(a, 0))
    })
}

pub fn assert_not_null(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertNotNull", |a| !arg(a, 0).is_null(), |a| {
        format!("({}) is null", arg(a, 0))
    })
}

pub fn assert_undefined(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertUndefined", |a| arg(a, 0).is_undefined(), |a| {
        format!("({}) is not undefined", arg(a, 0))
    })
}

pub fn assert_not_undefined(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertNotUndefined", |a| !arg(a, 0).is_undefined(), |a| {
        format!("({}) is undefined", arg(a, 0))
    })
}

pub fn assert_nan(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertNaN", |a| arg(a, 0).is_nan(), |a| {
        format!("({}) is not NaN", arg(a, 0))
    })
}

pub fn assert_not_nan(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    check(ctx, args, 1, "assertNotNaN", |a| !arg(a, 0).is_nan(), |a| {
        format!("({}) is NaN", arg(a, 0))
    })
}

/// Passes iff calling the function argument raises (returns an error or panics).
pub fn assert_exception(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    let index = ctx.next_assertion();
    let target = arg(args, 0);
    if let Value::Function(callable) = &target {
        let call_site = ctx.call_site().cloned();
        let raised = callable.call_guarded(ctx, &[]).is_err();
        if let Some(site) = call_site {
            ctx.set_call_site(site);
        }
        if raised {
            return Ok(Value::Undefined);
        }
    }
    let name = "assertException";
    Err(failure(
        ctx,
        index,
        name,
        label(args, 1, name),
        format!("({target}) does not raise an exception or not a function"),
    ))
}

/// Raises unconditionally. Does not count as an assertion.
pub fn fail(ctx: &mut TestContext, args: &[Value]) -> Result<Value, TestError> {
    let message = match args.first() {
        Some(Value::Undefined) | None => "fail(): invoked without message".to_string(),
        Some(message) => message.coerce_string(),
    };
    Err(TestError::raised(message).with_stack(stack::capture(ctx.stack_policy(), ctx.call_site())))
}

/// Typed form of [`assert_exception`] for closures that cannot be stored as callables.
pub(super) fn assert_raises<T>(
    ctx: &mut TestContext,
    body: impl FnOnce(&mut TestContext) -> Result<T, TestError>,
) -> Result<(), TestError> {
    let index = ctx.next_assertion();
    let call_site = ctx.call_site().cloned();
    let raised = !matches!(panic::catch_unwind(AssertUnwindSafe(|| body(ctx))), Ok(Ok(_)));
    if let Some(site) = call_site {
        ctx.set_call_site(site);
    }
    if raised {
        return Ok(());
    }
    Err(failure(
        ctx,
        index,
        "assertException",
        "assertException".to_string(),
        "(closure) does not raise an exception".to_string(),
    ))
}
