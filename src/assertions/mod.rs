//! # Assertion Catalog
//!
//! A fixed registry of named check predicates. Tests reach them three ways:
//!
//! - **Typed methods** on [`TestContext`] (`ctx.assert_equal(1, 1)?`)
//! - **By name** through [`TestContext::call`] (`ctx.call("assertEqual", &[..])?`)
//! - **Attached** to a scope object with [`attach_assertions`], for suites whose
//!   helpers look functions up in the scope
//!
//! Every predicate except `fail` bumps the per-test assertion counter before it
//! evaluates, so diagnostics can say which assertion of the test went wrong.

use std::panic::Location;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::context::TestContext;
use crate::errors::TestError;
use crate::value::{Callable, Object, Value};

pub mod predicates;
pub mod stack;

/// Calling convention of every catalog entry.
pub type PredicateFn = fn(&mut TestContext, &[Value]) -> Result<Value, TestError>;

static STANDARD: Lazy<Catalog> = Lazy::new(Catalog::build_standard);

/// Registry of named predicates, inspectable at runtime.
#[derive(Clone, Default)]
pub struct Catalog {
    predicates: IndexMap<&'static str, PredicateFn>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.predicates.keys()).finish()
    }
}

impl Catalog {
    /// The process-wide standard catalog.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    fn build_standard() -> Self {
        let mut catalog = Catalog::default();
        catalog.register("assertException", predicates::assert_exception);
        catalog.register("assertTrue", predicates::assert_true);
        catalog.register("assertFalse", predicates::assert_false);
        catalog.register("assertIdentical", predicates::assert_identical);
        catalog.register("assertNotIdentical", predicates::assert_not_identical);
        catalog.register("assertEqual", predicates::assert_equal);
        catalog.register("assertNotEqual", predicates::assert_not_equal);
        catalog.register("assertMatch", predicates::assert_match);
        catalog.register("assertNotMatch", predicates::assert_not_match);
        catalog.register("assertTypeOf", predicates::assert_type_of);
        catalog.register("assertNotTypeOf", predicates::assert_not_type_of);
        catalog.register("assertInstanceOf", predicates::assert_instance_of);
        catalog.register("assertNotInstanceOf", predicates::assert_not_instance_of);
        catalog.register("assertNull", predicates::assert_null);
        catalog.register("assertNotNull", predicates::assert_not_null);
        catalog.register("assertUndefined", predicates::assert_undefined);
        catalog.register("assertNotUndefined", predicates::assert_not_undefined);
        catalog.register("assertNaN", predicates::assert_nan);
        catalog.register("assertNotNaN", predicates::assert_not_nan);
        catalog.register("fail", predicates::fail);
        catalog
    }

    pub fn register(&mut self, name: &'static str, predicate: PredicateFn) {
        self.predicates.insert(name, predicate);
    }

    pub fn get(&self, name: &str) -> Option<PredicateFn> {
        self.predicates.get(name).copied()
    }

    pub fn has(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Predicate names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.predicates.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Injects every standard predicate into `scope` as a function property.
pub fn attach_assertions(scope: &Object) {
    for (name, predicate) in &Catalog::standard().predicates {
        let predicate = *predicate;
        scope.set(*name, Value::Function(Callable::new(name, predicate)));
    }
}

// ============================================================================
// TYPED ENTRY POINTS
// ============================================================================

impl TestContext {
    #[track_caller]
    fn evaluate(&mut self, predicate: PredicateFn, args: &[Value]) -> Result<(), TestError> {
        self.set_call_site(Location::caller());
        predicate(self, args).map(|_| ())
    }

    #[track_caller]
    pub fn assert_true(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_true, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_false(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_false, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_equal(&mut self, expected: impl Into<Value>, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_equal, &[expected.into(), actual.into()])
    }

    #[track_caller]
    pub fn assert_not_equal(&mut self, expected: impl Into<Value>, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_equal, &[expected.into(), actual.into()])
    }

    #[track_caller]
    pub fn assert_identical(&mut self, expected: impl Into<Value>, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_identical, &[expected.into(), actual.into()])
    }

    #[track_caller]
    pub fn assert_not_identical(&mut self, expected: impl Into<Value>, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_identical, &[expected.into(), actual.into()])
    }

    #[track_caller]
    pub fn assert_match(&mut self, pattern: &str, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_match, &[Value::from(pattern), actual.into()])
    }

    #[track_caller]
    pub fn assert_not_match(&mut self, pattern: &str, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_match, &[Value::from(pattern), actual.into()])
    }

    #[track_caller]
    pub fn assert_type_of(&mut self, type_name: &str, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_type_of, &[Value::from(type_name), actual.into()])
    }

    #[track_caller]
    pub fn assert_not_type_of(&mut self, type_name: &str, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_type_of, &[Value::from(type_name), actual.into()])
    }

    #[track_caller]
    pub fn assert_instance_of(&mut self, class: &str, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_instance_of, &[Value::from(class), actual.into()])
    }

    #[track_caller]
    pub fn assert_not_instance_of(&mut self, class: &str, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_instance_of, &[Value::from(class), actual.into()])
    }

    #[track_caller]
    pub fn assert_null(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_null, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_not_null(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_null, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_undefined(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_undefined, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_not_undefined(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_undefined, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_nan(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_nan, &[actual.into()])
    }

    #[track_caller]
    pub fn assert_not_nan(&mut self, actual: impl Into<Value>) -> Result<(), TestError> {
        self.evaluate(predicates::assert_not_nan, &[actual.into()])
    }

    /// Passes iff `body` returns an error or panics.
    #[track_caller]
    pub fn assert_exception<T>(
        &mut self,
        body: impl FnOnce(&mut TestContext) -> Result<T, TestError>,
    ) -> Result<(), TestError> {
        self.set_call_site(Location::caller());
        predicates::assert_raises(self, body)
    }

    /// Raises unconditionally with `message`.
    #[track_caller]
    pub fn fail<T>(&mut self, message: &str) -> Result<T, TestError> {
        self.set_call_site(Location::caller());
        match predicates::fail(self, &[Value::from(message)]) {
            Err(err) => Err(err),
            Ok(_) => Err(TestError::raised(message)),
        }
    }
}
