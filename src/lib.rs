//! # tapsuite
//!
//! Compiles test suites given in several shapes into one canonical [`Suite`], runs
//! them through a fixture lifecycle, and reports results as TAP plus a leveled log.
//!
//! ```rust
//! use tapsuite::{SuiteBuilder, TestRunner};
//!
//! let mut suite = SuiteBuilder::named("arith");
//! suite
//!     .define("testAdd", |ctx| ctx.assert_equal(4, 2 + 2))
//!     .define("testObjects", |ctx| {
//!         let a = tapsuite::Value::object([("x", 1.into())]);
//!         let b = tapsuite::Value::object([("x", 1.into())]);
//!         ctx.assert_equal(a, b)
//!     });
//!
//! let results = TestRunner::new().run_suite(suite.build()).unwrap();
//! assert_eq!((results.total, results.passed, results.failed), (2, 2, 0));
//! ```

pub use crate::assertions::{attach_assertions, Catalog};
pub use crate::config::{OutputFormat, RunConfig, SkipPolicy};
pub use crate::context::TestContext;
pub use crate::errors::{CompileError, ConfigError, ErrorCategory, ScriptError, TestError};
pub use crate::fingerprint::fingerprint;
pub use crate::report::{LogLevel, ReportingBus, ResultsObserver};
pub use crate::runner::{TestResults, TestRunner};
pub use crate::suite::{compile, Composite, Descriptor, Environment, Suite, SuiteBuilder};
pub use crate::value::{Callable, Object, Value};

pub mod assertions;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod fingerprint;
pub mod report;
pub mod runner;
pub mod script;
pub mod suite;
pub mod value;
