use thiserror::Error;

use crate::{
    context::{Context, Ptr},
    contract_err,
    operation::Operation,
    result::Result,
    value::Value,
};

#[derive(Debug, Error)]
#[error("rewrite supplies {found} replacement values, but {expected} were expected")]
pub struct ResultsCountUnexpectedErr {
    pub expected: usize,
    pub found: usize,
}

/// The outcome of one successful match: the operations that replace the
/// matched one, and the values that replace its results.
///
/// A rewrite always removes the matched operation. The new operations are
/// freshly built and not yet inserted anywhere; the rewrite engine inserts
/// them in place of the matched operation (after rewriting them in turn).
/// Whether `new_results` matches the number of results of the matched
/// operation is only checked when the action is applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewriteAction {
    /// New operations that replace the one matched.
    pub new_ops: Vec<Ptr<Operation>>,
    /// SSA values that replace the matched operation's results.
    pub new_results: Vec<Value>,
}

impl RewriteAction {
    /// Replace the matched operation with `new_ops`. Its results are
    /// replaced by the results of the last new operation, if any.
    pub fn new(ctx: &Context, new_ops: Vec<Ptr<Operation>>) -> RewriteAction {
        let new_results = new_ops
            .last()
            .map(|last| last.deref(ctx).results().collect())
            .unwrap_or_default();
        RewriteAction {
            new_ops,
            new_results,
        }
    }

    /// Replace the matched operation with `new_ops`, and its results with
    /// `new_results`.
    pub fn with_results(new_ops: Vec<Ptr<Operation>>, new_results: Vec<Value>) -> RewriteAction {
        RewriteAction {
            new_ops,
            new_results,
        }
    }

    /// Same as [Self::with_results], when the caller knows how many
    /// results are needed. Fails if `new_results` has a different length.
    pub fn checked(
        new_ops: Vec<Ptr<Operation>>,
        new_results: Vec<Value>,
        expected: usize,
    ) -> Result<RewriteAction> {
        if new_results.len() != expected {
            return contract_err!(ResultsCountUnexpectedErr {
                expected,
                found: new_results.len(),
            });
        }
        Ok(Self::with_results(new_ops, new_results))
    }

    /// Remove the matched operation, without a replacement.
    /// Only valid if it has no results.
    pub fn erase() -> RewriteAction {
        RewriteAction::default()
    }

    /// Remove the matched operation, forwarding existing values in place of its results.
    pub fn replace_with_values(values: Vec<Value>) -> RewriteAction {
        Self::with_results(vec![], values)
    }
}
