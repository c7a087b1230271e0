//! Static gate for submissions
//!
//! Source is parsed through the runtime and its syntax facts are checked
//! against the [`Policy`]. Nothing is ever executed here.

use tracing::debug;

use crate::config::{ATTRIBUTE_REASON, DYNAMIC_EVAL_REASON, IMPORT_REASON, Policy};
use crate::runtime::{ScriptRuntime, SyntaxNode};
use crate::types::ValidationVerdict;

/// Validates submissions against a fixed policy
#[derive(Debug, Clone, Copy)]
pub struct StaticValidator<'a> {
    policy: &'a Policy,
}

impl<'a> StaticValidator<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy }
    }

    /// Parse `source` and decide whether it may run
    pub fn validate(&self, runtime: &dyn ScriptRuntime, source: &str) -> ValidationVerdict {
        let nodes = match runtime.parse(source) {
            Ok(nodes) => nodes,
            Err(e) => {
                debug!(error = %e, "submission failed to parse");
                return ValidationVerdict::reject(format!("SyntaxError: {e}"));
            }
        };

        match nodes.iter().find_map(|node| self.check(node)) {
            Some(reason) => {
                debug!(%reason, "submission rejected");
                ValidationVerdict::reject(reason)
            }
            None => ValidationVerdict::accept(),
        }
    }

    /// Rejection reason for a single syntax fact, if it is forbidden
    fn check(&self, node: &SyntaxNode) -> Option<String> {
        match node {
            SyntaxNode::Import => Some(IMPORT_REASON.to_string()),
            SyntaxNode::Attribute(attr) if self.policy.is_denied_attribute(attr) => {
                Some(ATTRIBUTE_REASON.to_string())
            }
            SyntaxNode::Name(name) if self.policy.is_denied_name(name) => {
                Some(Policy::name_reason(name))
            }
            SyntaxNode::Call {
                callee: Some(callee),
            } if self.policy.is_dynamic_eval(callee) => Some(DYNAMIC_EVAL_REASON.to_string()),
            _ => None,
        }
    }
}

/// Validate `source` with `runtime` against `policy`
pub fn validate(runtime: &dyn ScriptRuntime, policy: &Policy, source: &str) -> ValidationVerdict {
    StaticValidator::new(policy).validate(runtime, source)
}
