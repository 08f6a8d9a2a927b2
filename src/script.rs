//! # Script Suites
//!
//! Declarative suites written in YAML (or JSON, which YAML accepts), so a suite can be
//! authored without Rust code. A script compiles to the mapping form: its scope object
//! gets the standard assertions attached and one function per step list.
//!
//! ```yaml
//! name: arithmetic
//! scope:
//!   limit: 3
//! setUp:
//!   - set: { total: 0 }
//! testLimit:
//!   - assertEqual: [3, { $scope: limit }]
//!   - assertTrue: [true, "custom label"]
//! testHelper:
//!   - call: checkLimit
//! checkLimit:
//!   - assertNotNull: { $scope: limit }
//! testBusy:
//!   - raise: { code: 1457, message: cluster did not answer }
//! ```
//!
//! Top-level keys `name` and `scope` are reserved. Every other key names a step list.
//! Each step is a single-key map:
//!
//! | Step                  | Effect                                                 |
//! |-----------------------|--------------------------------------------------------|
//! | `<assertion>: args`   | calls the assertion; a non-list value is one argument  |
//! | `set: {k: v, ..}`     | writes values into the scope                           |
//! | `call: name`          | calls a scope function by name                         |
//! | `fail: message`       | fails unconditionally                                  |
//! | `raise: {code, message}` | raises an error carrying an error code              |
//!
//! An argument of the form `{ $scope: key }` is read from the scope when the step runs.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use miette::{NamedSource, SourceSpan};
use serde_json::{Map, Value as Json};

use crate::assertions::stack::CallSite;
use crate::assertions::{attach_assertions, Catalog};
use crate::context::TestContext;
use crate::errors::{ScriptError, TestError};
use crate::suite::{Compiler, Suite};
use crate::value::{Callable, Object, Value};

const SCOPE_REF: &str = "$scope";
const RESERVED: [&str; 2] = ["name", "scope"];
const STEP_HELP: &str = "a step is a single-key map: set, call, fail, raise, or an assertion name such as assertEqual";

#[derive(Debug, Clone)]
enum Arg {
    Literal(Json),
    ScopeRef(String),
}

impl Arg {
    fn parse(json: Json) -> Self {
        if let Json::Object(map) = &json {
            if map.len() == 1 {
                if let Some(Json::String(key)) = map.get(SCOPE_REF) {
                    return Arg::ScopeRef(key.clone());
                }
            }
        }
        Arg::Literal(json)
    }

    fn resolve(&self, scope: &Object) -> Value {
        match self {
            Arg::Literal(json) => Value::from(json.clone()),
            Arg::ScopeRef(key) => scope.get(key).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    Assert { name: String, args: Vec<Arg> },
    Set(Vec<(String, Json)>),
    Call(String),
    Fail(Option<String>),
    Raise { code: Option<u32>, message: String },
}

impl Step {
    /// Runs the step. Diagnostics point at `site`, the step's position in the script.
    fn execute(&self, site: &CallSite, ctx: &mut TestContext) -> Result<(), TestError> {
        match self {
            Step::Assert { name, args } => {
                let args: Vec<Value> = args.iter().map(|a| a.resolve(ctx.scope())).collect();
                ctx.call_from(site.clone(), name, &args).map(|_| ())
            }
            Step::Set(pairs) => {
                for (key, json) in pairs {
                    ctx.scope().set(key.clone(), Value::from(json.clone()));
                }
                Ok(())
            }
            Step::Call(name) => {
                let test_name = Value::from(ctx.test_name());
                ctx.call_from(site.clone(), name, &[test_name]).map(|_| ())
            }
            Step::Fail(message) => {
                let message = message.clone().map_or(Value::Undefined, Value::from);
                ctx.call_from(site.clone(), "fail", &[message]).map(|_| ())
            }
            Step::Raise { code: Some(code), message } => Err(TestError::with_code(*code, message.clone())),
            Step::Raise { code: None, message } => Err(TestError::raised(message.clone())),
        }
    }
}

/// Reads and compiles a script suite. The file stem names the suite unless the script
/// sets `name`.
pub fn load_suite(path: &Path) -> Result<Suite, ScriptError> {
    let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let fallback = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    compile_script(&path.display().to_string(), &fallback, &text)
}

/// Compiles script `text`, naming the suite `name` unless the script sets `name`.
pub fn parse_suite(name: &str, text: &str) -> Result<Suite, ScriptError> {
    compile_script(name, name, text)
}

fn compile_script(source_name: &str, fallback: &str, text: &str) -> Result<Suite, ScriptError> {
    let document: Json = serde_yaml::from_str(text).map_err(|err| ScriptError::Syntax {
        message: err.to_string(),
        src: NamedSource::new(source_name, text.to_string()),
        span: err.location().map(|l| SourceSpan::from((l.index(), 1))),
    })?;
    let Json::Object(members) = document else {
        return Err(shape(fallback, "a script suite must be a mapping of names to step lists"));
    };

    let suite_name = match members.get("name") {
        None => fallback.to_string(),
        Some(Json::String(name)) => name.clone(),
        Some(_) => return Err(shape(fallback, "`name` must be a string")),
    };

    let scope = Object::new();
    attach_assertions(&scope);
    match members.get("scope") {
        None | Some(Json::Null) => {}
        Some(Json::Object(values)) => {
            for (key, json) in values {
                scope.set(key.clone(), Value::from(json.clone()));
            }
        }
        Some(_) => return Err(shape(&suite_name, "`scope` must be a mapping")),
    }

    for (member, steps) in members {
        if RESERVED.contains(&member.as_str()) {
            continue;
        }
        let context = format!("{suite_name}.{member}");
        let steps = Rc::new(parse_steps(&context, steps)?);
        let callable = Callable::new(&member, move |ctx, _args| {
            for (site, step) in steps.iter() {
                step.execute(site, ctx)?;
            }
            Ok(Value::Undefined)
        });
        scope.set(member, Value::Function(callable));
    }

    Ok(Compiler::new().named(suite_name).compile(scope)?)
}

fn parse_steps(context: &str, steps: Json) -> Result<Vec<(CallSite, Step)>, ScriptError> {
    let Json::Array(items) = steps else {
        return Err(shape(context, "expected a list of steps"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let position = format!("{context}[{i}]");
            let step = parse_step(&position, item)?;
            Ok((CallSite::from(position), step))
        })
        .collect()
}

fn parse_step(context: &str, item: Json) -> Result<Step, ScriptError> {
    let (keyword, body) = match item {
        Json::Object(map) if map.len() == 1 => single_entry(map),
        Json::String(keyword) => (keyword, Json::Null),
        _ => return Err(shape(context, "expected a single-key map")),
    };

    match keyword.as_str() {
        "set" => match body {
            Json::Object(values) => Ok(Step::Set(values.into_iter().collect())),
            _ => Err(shape(context, "`set` takes a mapping of scope keys to values")),
        },
        "call" => match body {
            Json::String(name) => Ok(Step::Call(name)),
            _ => Err(shape(context, "`call` takes a function name")),
        },
        "fail" => match body {
            Json::Null => Ok(Step::Fail(None)),
            Json::String(message) => Ok(Step::Fail(Some(message))),
            other => Ok(Step::Fail(Some(Value::from(other).to_string()))),
        },
        "raise" => parse_raise(context, body),
        name if Catalog::standard().has(name) => {
            let args = match body {
                Json::Array(items) => items.into_iter().map(Arg::parse).collect(),
                Json::Null => Vec::new(),
                other => vec![Arg::parse(other)],
            };
            Ok(Step::Assert {
                name: name.to_string(),
                args,
            })
        }
        other => Err(shape(context, &format!("unknown step `{other}`"))),
    }
}

fn parse_raise(context: &str, body: Json) -> Result<Step, ScriptError> {
    match body {
        Json::String(message) => Ok(Step::Raise { code: None, message }),
        Json::Object(mut fields) => {
            let message = match fields.remove("message") {
                Some(Json::String(message)) => message,
                Some(other) => Value::from(other).to_string(),
                None => "raised".to_string(),
            };
            let code = match fields.remove("code") {
                None | Some(Json::Null) => None,
                Some(Json::Number(n)) => match n.as_u64().and_then(|c| u32::try_from(c).ok()) {
                    Some(code) => Some(code),
                    None => return Err(shape(context, "`code` must be a non-negative integer")),
                },
                Some(_) => return Err(shape(context, "`code` must be a non-negative integer")),
            };
            Ok(Step::Raise { code, message })
        }
        _ => Err(shape(context, "`raise` takes a message or a {code, message} mapping")),
    }
}

fn single_entry(map: Map<String, Json>) -> (String, Json) {
    map.into_iter()
        .next()
        .unwrap_or_else(|| (String::new(), Json::Null))
}

fn shape(context: &str, message: &str) -> ScriptError {
    ScriptError::Shape {
        context: context.to_string(),
        message: message.to_string(),
        help: Some(STEP_HELP.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_are_not_members() {
        let suite = parse_suite(
            "fallback",
            "name: arithmetic\nscope:\n  limit: 3\ntestLimit:\n  - assertEqual: [3, {$scope: limit}]\nhelper: []\n",
        )
        .unwrap();
        assert_eq!(suite.name.as_deref(), Some("arithmetic"));
        assert_eq!(suite.test_names(), vec!["testLimit"]);
        assert!(suite.scope.get("helper").is_some_and(|h| h.type_of() == "function"));
        assert!(suite.scope.get("assertEqual").is_some());
    }

    #[test]
    fn fallback_name_is_used() {
        let suite = parse_suite("plain", "testA:\n  - assertTrue: true\n").unwrap();
        assert_eq!(suite.name.as_deref(), Some("plain"));
    }

    #[test]
    fn steps_execute_against_the_scope() {
        let suite = parse_suite(
            "s",
            "setUp:\n  - set: {ready: true}\ntestReady:\n  - assertTrue: {$scope: ready}\n  - call: check\ncheck:\n  - assertEqual: [true, {$scope: ready}]\n",
        )
        .unwrap();
        let mut ctx = TestContext::new(suite.scope.clone(), "testReady", Default::default());
        assert!(suite.fixtures.set_up.as_ref().unwrap().call(&mut ctx, &[]).is_ok());
        assert!(suite.tests[0].body.call(&mut ctx, &[]).is_ok());
        assert_eq!(ctx.assertion_count(), 2);
    }

    #[test]
    fn raise_carries_code() {
        let suite = parse_suite("s", "testBusy:\n  - raise: {code: 1457, message: busy}\n").unwrap();
        let mut ctx = TestContext::new(suite.scope.clone(), "testBusy", Default::default());
        let err = suite.tests[0].body.call(&mut ctx, &[]).unwrap_err();
        assert_eq!(err.code(), Some(1457));
        assert_eq!(err.message(), "busy");
    }

    #[test]
    fn assertion_diagnostics_point_into_the_script() {
        let suite = parse_suite("s", "testA:\n  - assertTrue: true\n  - assertNull: 1\n").unwrap();
        let mut ctx = TestContext::new(suite.scope.clone(), "testA", Default::default());
        let err = suite.tests[0].body.call(&mut ctx, &[]).unwrap_err();
        assert_eq!(err.stack(), "at s.testA[1]\n");
        assert!(err.report().ends_with("\nat s.testA[1]"));
    }

    #[test]
    fn malformed_scripts_are_rejected() {
        assert!(matches!(parse_suite("s", "testA: [unclosed"), Err(ScriptError::Syntax { .. })));
        assert!(matches!(parse_suite("s", "- just\n- a list\n"), Err(ScriptError::Shape { .. })));
        let err = parse_suite("s", "testA:\n  - assertEverything: 1\n").unwrap_err();
        assert!(err.to_string().contains("s.testA[0]: unknown step `assertEverything`"));
        assert!(matches!(parse_suite("s", "testA: 3\n"), Err(ScriptError::Shape { .. })));
    }
}
