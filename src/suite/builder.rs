use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::context::TestContext;
use crate::errors::TestError;
use crate::suite::{FixtureKind, Suite};
use crate::value::{Callable, Object, Value};

/// Collects named suite members in registration order.
///
/// Members are classified only when the suite is built, by the same naming rule the
/// mapping form uses: `test*` names are tests, the four fixture names are fixtures,
/// and everything else stays a scope helper.
///
/// ```rust
/// use tapsuite::suite::SuiteBuilder;
/// let suite = SuiteBuilder::named("arith")
///     .define("testAdd", |ctx| ctx.assert_equal(4, 2 + 2))
///     .set_up(|ctx| { ctx.scope().set("ready", true.into()); Ok(()) })
///     .build();
/// assert_eq!(suite.test_names(), vec!["testAdd"]);
/// ```
#[derive(Debug, Default)]
pub struct SuiteBuilder {
    name: Option<String>,
    scope: Object,
    members: IndexMap<String, Callable>,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Uses `scope` as the suite scope instead of a fresh object.
    pub fn with_scope(mut self, scope: Object) -> Self {
        self.scope = scope;
        self
    }

    pub fn scope(&self) -> &Object {
        &self.scope
    }

    /// Registers a member under `name`. A name registered twice keeps its first body.
    pub fn define<F>(&mut self, name: &str, body: F) -> &mut Self
    where
        F: Fn(&mut TestContext) -> Result<(), TestError> + 'static,
    {
        self.define_callable(Callable::test(name, body))
    }

    /// Registers an existing callable under its own name.
    pub fn define_callable(&mut self, callable: Callable) -> &mut Self {
        self.members
            .entry(callable.name().to_string())
            .or_insert(callable);
        self
    }

    pub fn set_up<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut TestContext) -> Result<(), TestError> + 'static,
    {
        self.define(FixtureKind::SetUp.as_str(), body)
    }

    pub fn tear_down<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut TestContext) -> Result<(), TestError> + 'static,
    {
        self.define(FixtureKind::TearDown.as_str(), body)
    }

    pub fn set_up_all<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut TestContext) -> Result<(), TestError> + 'static,
    {
        self.define(FixtureKind::SetUpAll.as_str(), body)
    }

    pub fn tear_down_all<F>(&mut self, body: F) -> &mut Self
    where
        F: Fn(&mut TestContext) -> Result<(), TestError> + 'static,
    {
        self.define(FixtureKind::TearDownAll.as_str(), body)
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.keys().map(String::as_str).collect()
    }

    /// Classifies the registered members into a [`Suite`].
    ///
    /// Every member, including non-test helpers, is also published in the scope so
    /// that tests can reach helpers through [`TestContext::call`].
    pub fn build(&mut self) -> Suite {
        let mut suite = Suite::new(self.name.clone(), self.scope.clone());
        for (name, callable) in &self.members {
            if !suite.scope.contains_key(name) {
                suite.scope.set(name.clone(), Value::Function(callable.clone()));
            }
            suite.register(name, callable.clone());
        }
        suite
    }
}

/// A named function that declares the members of one suite.
///
/// Compiling a composite runs its declaration function against a fresh
/// [`SuiteBuilder`] and names the resulting suite after the composite.
#[derive(Clone)]
pub struct Composite {
    name: String,
    declare: Rc<dyn Fn(&mut SuiteBuilder)>,
}

impl Composite {
    pub fn new<F>(name: impl Into<String>, declare: F) -> Self
    where
        F: Fn(&mut SuiteBuilder) + 'static,
    {
        Self {
            name: name.into(),
            declare: Rc::new(declare),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn expand(&self) -> Suite {
        let mut builder = SuiteBuilder::named(self.name.clone());
        (self.declare)(&mut builder);
        builder.build()
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composite({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_registration_order_and_first_body() {
        let mut builder = SuiteBuilder::named("ordered");
        builder
            .define("testB", |_| Ok(()))
            .define("testA", |_| Ok(()))
            .define("testB", |ctx| ctx.fail("shadowed"))
            .define("helper", |_| Ok(()))
            .tear_down(|_| Ok(()));
        let suite = builder.build();
        assert_eq!(suite.name.as_deref(), Some("ordered"));
        assert_eq!(suite.test_names(), vec!["testB", "testA"]);
        assert!(suite.fixtures.tear_down.is_some());
        assert!(suite.scope.get("helper").is_some());
    }

    #[test]
    fn composite_names_the_suite() {
        let composite = Composite::new("inventory", |s| {
            s.define("testCount", |ctx| ctx.assert_equal(1, 1));
            s.set_up_all(|_| Ok(()));
        });
        let suite = composite.expand();
        assert_eq!(suite.name.as_deref(), Some("inventory"));
        assert_eq!(suite.test_names(), vec!["testCount"]);
        assert!(suite.fixtures.set_up_all.is_some());
    }
}
