//! Error types for suite compilation, test execution, configuration and script loading.
//!
//! Everything a test stage can raise is a [`TestError`]. The runner catches these at the
//! stage boundary and turns them into diagnostics; only [`CompileError`] ever reaches the
//! caller of [`TestRunner::run`](crate::runner::TestRunner::run).

use std::any::Any;
use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

// ============================================================================
// COMPILATION
// ============================================================================

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum CompileError {
    #[error("argument must be a function, array, object, string or suite, got {found}")]
    #[diagnostic(
        code(tapsuite::compile::descriptor),
        help("build the suite with `SuiteBuilder`, a mapping of names to callables, or a list of callables")
    )]
    UnsupportedDescriptor { found: &'static str },

    #[error("list element {index} must be a function or a function name, got {found}")]
    #[diagnostic(code(tapsuite::compile::list_element))]
    InvalidListElement { index: usize, found: &'static str },
}

// ============================================================================
// TEST EXECUTION
// ============================================================================

/// Infrastructure failures that make a test inconclusive rather than failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A cluster operation did not answer in time.
    ClusterTimeout,
    /// A resource lock could not be acquired in time.
    LockTimeout,
}

impl ErrorCategory {
    pub const fn code(self) -> u32 {
        match self {
            ErrorCategory::ClusterTimeout => 1457,
            ErrorCategory::LockTimeout => 18,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            ErrorCategory::ClusterTimeout => "operation timed out",
            ErrorCategory::LockTimeout => "resource lock contention",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        [ErrorCategory::ClusterTimeout, ErrorCategory::LockTimeout]
            .into_iter()
            .find(|c| c.code() == code)
    }
}

/// An error raised by a test body, a fixture, or an assertion.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum TestError {
    /// A catalog predicate did not hold.
    #[error("{message}")]
    #[diagnostic(code(tapsuite::assertion))]
    Assertion {
        index: u32,
        assertion: String,
        message: String,
        stack: String,
    },

    /// Anything else: `fail()`, user errors, normalized strings, panics.
    #[error("{message}")]
    #[diagnostic(code(tapsuite::raised))]
    Raised {
        message: String,
        code: Option<u32>,
        stack: String,
    },
}

impl TestError {
    pub fn raised(message: impl Into<String>) -> Self {
        TestError::Raised {
            message: message.into(),
            code: None,
            stack: String::new(),
        }
    }

    /// An error carrying a numeric error code, as reported by an external service.
    pub fn with_code(code: u32, message: impl Into<String>) -> Self {
        TestError::Raised {
            message: message.into(),
            code: Some(code),
            stack: String::new(),
        }
    }

    pub fn transient(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::with_code(category.code(), message)
    }

    /// Collects the message of an error and its sources.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::raised(message)
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::raised(format!("panicked: {detail}"))
    }

    pub fn with_stack(self, stack: impl Into<String>) -> Self {
        let stack = stack.into();
        match self {
            TestError::Assertion { index, assertion, message, .. } => TestError::Assertion {
                index,
                assertion,
                message,
                stack,
            },
            TestError::Raised { message, code, .. } => TestError::Raised { message, code, stack },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TestError::Assertion { message, .. } | TestError::Raised { message, .. } => message,
        }
    }

    pub fn stack(&self) -> &str {
        match self {
            TestError::Assertion { stack, .. } | TestError::Raised { stack, .. } => stack,
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            TestError::Raised { code, .. } => *code,
            TestError::Assertion { .. } => None,
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.code().and_then(ErrorCategory::from_code)
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, TestError::Assertion { .. })
    }

    /// Message followed by the filtered stack, as written into diagnostics.
    pub fn report(&self) -> String {
        let stack = self.stack().trim_end();
        if stack.is_empty() {
            self.message().to_string()
        } else {
            format!("{}\n{}", self.message(), stack)
        }
    }
}

impl From<String> for TestError {
    fn from(message: String) -> Self {
        TestError::raised(message)
    }
}

impl From<&str> for TestError {
    fn from(message: &str) -> Self {
        TestError::raised(message)
    }
}

impl From<std::io::Error> for TestError {
    fn from(err: std::io::Error) -> Self {
        TestError::from_error(&err)
    }
}

impl From<serde_json::Error> for TestError {
    fn from(err: serde_json::Error) -> Self {
        TestError::from_error(&err)
    }
}

// ============================================================================
// CONFIGURATION AND SCRIPTS
// ============================================================================

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file '{}'", path.display())]
    #[diagnostic(code(tapsuite::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}'", path.display())]
    #[diagnostic(code(tapsuite::config::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error, Diagnostic)]
pub enum ScriptError {
    #[error("failed to read script suite '{}'", path.display())]
    #[diagnostic(code(tapsuite::script::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed script suite: {message}")]
    #[diagnostic(code(tapsuite::script::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("{context}: {message}")]
    #[diagnostic(code(tapsuite::script::shape))]
    Shape {
        context: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),
}
