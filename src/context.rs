use std::panic::Location;

use crate::assertions::stack::{CallSite, StackPolicy};
use crate::assertions::Catalog;
use crate::errors::TestError;
use crate::value::{Object, Value};

/// Explicit per-test execution context.
///
/// Carries the shared suite scope, the assertion ordinal used in diagnostics, and the
/// call site of the assertion currently being evaluated. A fresh context is created for
/// every test case, so numbering restarts at zero.
pub struct TestContext {
    scope: Object,
    test_name: String,
    counter: u32,
    stack: StackPolicy,
    call_site: Option<CallSite>,
}

impl TestContext {
    pub fn new(scope: Object, test_name: impl Into<String>, stack: StackPolicy) -> Self {
        Self {
            scope,
            test_name: test_name.into(),
            counter: 0,
            stack,
            call_site: None,
        }
    }

    /// A context over a fresh, empty scope.
    pub fn detached(test_name: impl Into<String>) -> Self {
        Self::new(Object::new(), test_name, StackPolicy::default())
    }

    /// The suite scope shared by all fixtures and tests of a suite.
    pub fn scope(&self) -> &Object {
        &self.scope
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Number of assertions evaluated so far in this test.
    pub fn assertion_count(&self) -> u32 {
        self.counter
    }

    pub fn stack_policy(&self) -> &StackPolicy {
        &self.stack
    }

    pub(crate) fn next_assertion(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    pub(crate) fn call_site(&self) -> Option<&CallSite> {
        self.call_site.as_ref()
    }

    pub(crate) fn set_call_site(&mut self, site: impl Into<CallSite>) {
        self.call_site = Some(site.into());
    }

    /// Invokes a function by bare name.
    ///
    /// The scope is consulted first, so helpers and assertions attached with
    /// [`attach_assertions`](crate::assertions::attach_assertions) shadow the catalog.
    #[track_caller]
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, TestError> {
        self.call_from(Location::caller(), name, args)
    }

    /// Like [`call`](Self::call), but diagnostics point at `site` instead of the Rust caller.
    pub fn call_from(
        &mut self,
        site: impl Into<CallSite>,
        name: &str,
        args: &[Value],
    ) -> Result<Value, TestError> {
        self.set_call_site(site);
        if let Some(Value::Function(callable)) = self.scope.get(name) {
            return callable.call(self, args);
        }
        match Catalog::standard().get(name) {
            Some(predicate) => predicate(self, args),
            None => Err(TestError::raised(format!("{name} is not a function"))),
        }
    }
}
