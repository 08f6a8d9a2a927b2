//! # Suite Compilation
//!
//! Normalizes every accepted suite descriptor into a canonical [`Suite`]:
//!
//! | Descriptor              | Members                                              |
//! |-------------------------|------------------------------------------------------|
//! | [`Descriptor::Suite`]   | passed through unchanged                             |
//! | [`Descriptor::Mapping`] | name → callable pairs, classified by name            |
//! | [`Descriptor::List`]    | callables (own name) or names resolved in the env    |
//! | [`Descriptor::Composite`] | members declared through a [`SuiteBuilder`]        |
//! | [`Descriptor::Dynamic`] | a [`Value`] dispatched onto one of the forms above    |
//!
//! Classification is the same everywhere: see [`classify`](super::classify).

use indexmap::IndexMap;

use crate::errors::CompileError;
use crate::suite::{Composite, Suite};
use crate::value::{Callable, Object, Value};

/// One element of the list form.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Registered under its own name.
    Callable(Callable),
    /// Looked up in the compiler's [`Environment`] and registered under this name;
    /// dropped if unknown.
    Name(String),
}

impl From<Callable> for Entry {
    fn from(callable: Callable) -> Self {
        Entry::Callable(callable)
    }
}

impl From<&str> for Entry {
    fn from(name: &str) -> Self {
        Entry::Name(name.to_string())
    }
}

impl From<String> for Entry {
    fn from(name: String) -> Self {
        Entry::Name(name)
    }
}

/// A description of a suite in any of the accepted shapes.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Suite(Suite),
    Composite(Composite),
    List(Vec<Entry>),
    Mapping(Vec<(String, Callable)>),
    Dynamic(Value),
}

impl Descriptor {
    /// Builds the mapping form from `(name, callable)` pairs.
    pub fn mapping<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Callable)>,
    {
        Descriptor::Mapping(pairs.into_iter().map(|(k, c)| (k.into(), c)).collect())
    }

    /// Builds the list form from callables and names.
    pub fn list<E, I>(entries: I) -> Self
    where
        E: Into<Entry>,
        I: IntoIterator<Item = E>,
    {
        Descriptor::List(entries.into_iter().map(Into::into).collect())
    }
}

impl From<Suite> for Descriptor {
    fn from(suite: Suite) -> Self {
        Descriptor::Suite(suite)
    }
}

impl From<Composite> for Descriptor {
    fn from(composite: Composite) -> Self {
        Descriptor::Composite(composite)
    }
}

impl From<Value> for Descriptor {
    fn from(value: Value) -> Self {
        Descriptor::Dynamic(value)
    }
}

impl From<Object> for Descriptor {
    fn from(object: Object) -> Self {
        Descriptor::Dynamic(Value::Object(object))
    }
}

impl From<Vec<Entry>> for Descriptor {
    fn from(entries: Vec<Entry>) -> Self {
        Descriptor::List(entries)
    }
}

/// Named callables the list form resolves bare names against.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    callables: IndexMap<String, Callable>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callable` under its own name.
    pub fn register(&mut self, callable: Callable) -> &mut Self {
        let name = callable.name().to_string();
        self.register_as(name, callable)
    }

    pub fn register_as(&mut self, name: impl Into<String>, callable: Callable) -> &mut Self {
        self.callables.insert(name.into(), callable);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&Callable> {
        self.callables.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.callables.keys().map(String::as_str).collect()
    }
}

/// Compiles descriptors against an environment.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    environment: Environment,
    name: Option<String>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(environment: &Environment) -> Self {
        Self {
            environment: environment.clone(),
            name: None,
        }
    }

    /// Names suites that would otherwise be unnamed.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn compile(&self, descriptor: impl Into<Descriptor>) -> Result<Suite, CompileError> {
        let mut suite = match descriptor.into() {
            Descriptor::Suite(suite) => return Ok(suite),
            Descriptor::Composite(composite) => composite.expand(),
            Descriptor::List(entries) => self.compile_list(entries, Object::new()),
            Descriptor::Mapping(pairs) => compile_mapping(pairs, Object::new()),
            Descriptor::Dynamic(value) => self.compile_value(value)?,
        };
        if suite.name.is_none() {
            suite.name = self.name.clone();
        }
        Ok(suite)
    }

    fn compile_value(&self, value: Value) -> Result<Suite, CompileError> {
        match value {
            Value::Object(object) if object.is_array() => {
                let entries = object
                    .entries()
                    .into_iter()
                    .enumerate()
                    .map(|(index, (_, item))| list_entry(index, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.compile_list(entries, Object::new()))
            }
            Value::Object(object) => {
                let pairs = object
                    .entries()
                    .into_iter()
                    .filter_map(|(name, item)| match item {
                        Value::Function(callable) => Some((name, callable)),
                        _ => None,
                    })
                    .collect();
                Ok(compile_mapping(pairs, object))
            }
            Value::Function(callable) => Ok(self.compile_list(vec![Entry::Callable(callable)], Object::new())),
            Value::String(name) => Ok(self.compile_list(vec![Entry::Name(name)], Object::new())),
            other => Err(CompileError::UnsupportedDescriptor {
                found: other.type_of(),
            }),
        }
    }

    fn compile_list(&self, entries: Vec<Entry>, scope: Object) -> Suite {
        let mut suite = Suite::new(None, scope);
        for entry in entries {
            let (name, callable) = match entry {
                Entry::Callable(callable) => (callable.name().to_string(), callable),
                Entry::Name(name) => match self.environment.resolve(&name) {
                    Some(callable) => (name, callable.clone()),
                    None => continue,
                },
            };
            if !suite.scope.contains_key(&name) {
                suite.scope.set(name.clone(), Value::Function(callable.clone()));
            }
            suite.register(&name, callable);
        }
        suite
    }
}

fn list_entry(index: usize, item: Value) -> Result<Entry, CompileError> {
    match item {
        Value::Function(callable) => Ok(Entry::Callable(callable)),
        Value::String(name) => Ok(Entry::Name(name)),
        other => Err(CompileError::InvalidListElement {
            index,
            found: other.type_of(),
        }),
    }
}

fn compile_mapping(pairs: Vec<(String, Callable)>, scope: Object) -> Suite {
    let mut suite = Suite::new(None, scope);
    for (name, callable) in pairs {
        if !suite.scope.contains_key(&name) {
            suite.scope.set(name.clone(), Value::Function(callable.clone()));
        }
        suite.register(&name, callable);
    }
    suite
}

/// Compiles `descriptor` with an empty environment.
pub fn compile(descriptor: impl Into<Descriptor>) -> Result<Suite, CompileError> {
    Compiler::new().compile(descriptor)
}
