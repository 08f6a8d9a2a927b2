//! # Suites
//!
//! The canonical suite record and the naming rule that decides which callables are
//! tests and which are fixtures. Descriptors of every accepted shape are normalized into
//! a [`Suite`] by the [`compiler`].

use std::fmt;

use crate::value::{Callable, Object};

pub mod builder;
pub mod compiler;

pub use builder::{Composite, SuiteBuilder};
pub use compiler::{compile, Compiler, Descriptor, Entry, Environment};

/// Lifecycle callables run around test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    SetUp,
    TearDown,
    SetUpAll,
    TearDownAll,
}

impl FixtureKind {
    pub const ALL: [FixtureKind; 4] = [
        FixtureKind::SetUp,
        FixtureKind::TearDown,
        FixtureKind::SetUpAll,
        FixtureKind::TearDownAll,
    ];

    /// The member name that registers this fixture.
    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureKind::SetUp => "setUp",
            FixtureKind::TearDown => "tearDown",
            FixtureKind::SetUpAll => "setUpAll",
            FixtureKind::TearDownAll => "tearDownAll",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a named member of a suite descriptor becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Test,
    Fixture(FixtureKind),
}

/// Names starting with `test` are tests; the four fixture names are fixtures;
/// anything else is not a suite member.
pub fn classify(name: &str) -> Option<Member> {
    if name.starts_with("test") {
        return Some(Member::Test);
    }
    FixtureKind::from_name(name).map(Member::Fixture)
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub body: Callable,
}

#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub set_up: Option<Callable>,
    pub tear_down: Option<Callable>,
    pub set_up_all: Option<Callable>,
    pub tear_down_all: Option<Callable>,
}

impl Fixtures {
    pub fn get(&self, kind: FixtureKind) -> Option<&Callable> {
        self.slot(kind).as_ref()
    }

    fn slot(&self, kind: FixtureKind) -> &Option<Callable> {
        match kind {
            FixtureKind::SetUp => &self.set_up,
            FixtureKind::TearDown => &self.tear_down,
            FixtureKind::SetUpAll => &self.set_up_all,
            FixtureKind::TearDownAll => &self.tear_down_all,
        }
    }

    fn slot_mut(&mut self, kind: FixtureKind) -> &mut Option<Callable> {
        match kind {
            FixtureKind::SetUp => &mut self.set_up,
            FixtureKind::TearDown => &mut self.tear_down,
            FixtureKind::SetUpAll => &mut self.set_up_all,
            FixtureKind::TearDownAll => &mut self.tear_down_all,
        }
    }
}

/// A named, ordered collection of test cases plus fixtures sharing one scope.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: Option<String>,
    /// Execution context shared by every fixture and test of the suite.
    pub scope: Object,
    pub tests: Vec<TestCase>,
    pub fixtures: Fixtures,
}

impl Suite {
    pub fn new(name: Option<String>, scope: Object) -> Self {
        Self {
            name,
            scope,
            tests: Vec::new(),
            fixtures: Fixtures::default(),
        }
    }

    /// Adds `callable` under `name` if the naming rule makes it a member.
    ///
    /// Returns false when the name is not a member name or is already taken; the
    /// first registration of a name wins.
    pub fn register(&mut self, name: &str, callable: Callable) -> bool {
        match classify(name) {
            Some(Member::Test) if !self.has_test(name) => {
                self.tests.push(TestCase {
                    name: name.to_string(),
                    body: callable,
                });
                true
            }
            Some(Member::Fixture(kind)) => {
                let slot = self.fixtures.slot_mut(kind);
                if slot.is_some() {
                    return false;
                }
                *slot = Some(callable);
                true
            }
            _ => false,
        }
    }

    pub fn has_test(&self, name: &str) -> bool {
        self.tests.iter().any(|t| t.name == name)
    }

    pub fn test_names(&self) -> Vec<&str> {
        self.tests.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn fixture(&self, kind: FixtureKind) -> Option<&Callable> {
        self.fixtures.get(kind)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
