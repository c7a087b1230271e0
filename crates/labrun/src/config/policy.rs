//! Allow/deny policy for submissions
//!
//! The policy decides which builtins a submission can see once it runs and
//! which names, attributes and calls get it rejected before it runs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Builtins exposed inside the restricted namespace
pub const DEFAULT_ALLOWED_BUILTINS: &[&str] = &[
    "print",
    "range",
    "len",
    "int",
    "float",
    "str",
    "bool",
    "list",
    "dict",
    "set",
    "tuple",
    "sum",
    "min",
    "max",
    "abs",
    "enumerate",
    "zip",
    "sorted",
    "round",
];

/// Bare names that grant OS, process, network or interpreter-escape access
pub const DEFAULT_DENIED_NAMES: &[&str] = &[
    "open",
    "exec",
    "eval",
    "__import__",
    "compile",
    "input",
    "os",
    "sys",
    "subprocess",
    "shutil",
    "socket",
    "pathlib",
    "requests",
    "urllib",
    "ctypes",
    "multiprocessing",
];

/// Attribute names that walk the object model towards privileged callables
pub const DEFAULT_DENIED_ATTRIBUTES: &[&str] = &[
    "__class__",
    "__mro__",
    "__subclasses__",
    "__globals__",
    "__getattribute__",
    "__getattr__",
    "__setattr__",
    "__dict__",
    "__call__",
    "__code__",
];

/// Builtins no configuration may expose, whatever the deny-lists say
pub const FORBIDDEN_BUILTINS: &[&str] = &[
    "open",
    "exec",
    "eval",
    "compile",
    "input",
    "__import__",
    "getattr",
    "setattr",
    "delattr",
    "hasattr",
    "globals",
    "locals",
    "vars",
    "dir",
    "type",
    "object",
    "super",
    "classmethod",
    "staticmethod",
    "property",
    "breakpoint",
    "help",
    "memoryview",
    "exit",
    "quit",
];

/// Callees rejected when invoked by bare name
pub const DEFAULT_DYNAMIC_EVAL: &[&str] = &["exec", "eval"];

/// Rejection reasons, part of the compatibility contract with lesson pages
pub const IMPORT_REASON: &str = "Use of import is not allowed in this lab.";
pub const ATTRIBUTE_REASON: &str = "Access to dunder/private attributes is not allowed.";
pub const DYNAMIC_EVAL_REASON: &str = "Use of exec/eval is not allowed.";

/// Immutable allow/deny configuration
///
/// Loaded once with the rest of [`Config`](crate::Config) and handed by
/// reference to the validator and the harness composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Builtins available to the submission at run time
    #[serde(default = "default_allowed_builtins")]
    pub allowed_builtins: Vec<String>,

    /// Bare names rejected on sight
    #[serde(default = "default_denied_names")]
    pub denied_names: BTreeSet<String>,

    /// Attribute names rejected on sight, in addition to any `__`-prefixed name
    #[serde(default = "default_denied_attributes")]
    pub denied_attributes: BTreeSet<String>,

    /// Bare-name callees rejected with the exec/eval reason
    #[serde(default = "default_dynamic_eval")]
    pub dynamic_eval: BTreeSet<String>,
}

impl Policy {
    /// Check whether a bare name reference is forbidden
    pub fn is_denied_name(&self, name: &str) -> bool {
        self.denied_names.contains(name)
    }

    /// Check whether an attribute access is forbidden
    ///
    /// Any name starting with a double underscore is denied, listed or not.
    pub fn is_denied_attribute(&self, attr: &str) -> bool {
        attr.starts_with("__") || self.denied_attributes.contains(attr)
    }

    /// Check whether a bare-name call is a dynamic evaluation primitive
    pub fn is_dynamic_eval(&self, callee: &str) -> bool {
        self.dynamic_eval.contains(callee)
    }

    /// Reason reported for a denied bare name
    pub fn name_reason(name: &str) -> String {
        format!("Use of '{name}' is not allowed in this lab.")
    }

    /// Validate that the policy cannot hand a submission a denied primitive
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.denied_names.is_empty() {
            return Err(ConfigError::Invalid(
                "policy.denied_names must not be empty".to_string(),
            ));
        }

        for name in &self.allowed_builtins {
            if !is_identifier(name) {
                return Err(ConfigError::Invalid(format!(
                    "allowed builtin '{name}' is not an identifier"
                )));
            }
            if name.starts_with('_') {
                return Err(ConfigError::Invalid(format!(
                    "allowed builtin '{name}' must not start with an underscore"
                )));
            }
            if FORBIDDEN_BUILTINS.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "builtin '{name}' cannot be exposed to submissions"
                )));
            }
            if self.is_denied_name(name) || self.is_dynamic_eval(name) {
                return Err(ConfigError::Invalid(format!(
                    "builtin '{name}' is both allowed and denied"
                )));
            }
        }

        Ok(())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_builtins: default_allowed_builtins(),
            denied_names: default_denied_names(),
            denied_attributes: default_denied_attributes(),
            dynamic_eval: default_dynamic_eval(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

fn owned<C: FromIterator<String>>(names: &[&str]) -> C {
    names.iter().map(|s| (*s).to_owned()).collect()
}

fn default_allowed_builtins() -> Vec<String> {
    owned(DEFAULT_ALLOWED_BUILTINS)
}

fn default_denied_names() -> BTreeSet<String> {
    owned(DEFAULT_DENIED_NAMES)
}

fn default_denied_attributes() -> BTreeSet<String> {
    owned(DEFAULT_DENIED_ATTRIBUTES)
}

fn default_dynamic_eval() -> BTreeSet<String> {
    owned(DEFAULT_DYNAMIC_EVAL)
}
