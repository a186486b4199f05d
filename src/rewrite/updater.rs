//! Bookkeeping of superseded SSA values during one walk.

use log::trace;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    context::{Context, Ptr},
    contract_err,
    operation::Operation,
    result::Result,
    value::Value,
};

use super::action::RewriteAction;

#[derive(Debug, Error)]
#[error("{opid} has {expected} results, but its rewrite supplies {found} replacements")]
pub struct ResultCountMismatchErr {
    pub opid: String,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Error)]
#[error("replacing {from} with {to} would make the substitution chain cyclic")]
pub struct SubstitutionCycleErr {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Error)]
#[error("{from} is already replaced by {existing}, cannot replace it by {to}")]
pub struct ConflictingSubstitutionErr {
    pub from: String,
    pub existing: String,
    pub to: String,
}

/// Maps the results of matched operations to the values replacing them.
///
/// Entries are only ever added. A replacement may itself be replaced later
/// in the walk (a rewrite cascading into another one), so [Self::resolve]
/// follows the chain of substitutions to its end.
#[derive(Debug, Default, Clone)]
pub struct OperandUpdater {
    substitutions: FxHashMap<Value, Value>,
}

impl OperandUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the results of `op` are replaced, positionally, by
    /// the `new_results` of `action`.
    /// Nothing is recorded if `op` has no results.
    pub fn record_substitution(
        &mut self,
        ctx: &Context,
        op: Ptr<Operation>,
        action: &RewriteAction,
    ) -> Result<()> {
        let (opid, results) = {
            let opref = op.deref(ctx);
            (opref.get_opid(), opref.results().collect::<Vec<_>>())
        };
        if results.is_empty() {
            return Ok(());
        }
        if results.len() != action.new_results.len() {
            return contract_err!(ResultCountMismatchErr {
                opid: opid.to_string(),
                expected: results.len(),
                found: action.new_results.len(),
            });
        }
        for (from, to) in results.into_iter().zip(action.new_results.iter().copied()) {
            self.insert(from, to)?;
        }
        Ok(())
    }

    fn insert(&mut self, from: Value, to: Value) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if let Some(&existing) = self.substitutions.get(&from) {
            if existing == to {
                return Ok(());
            }
            return contract_err!(ConflictingSubstitutionErr {
                from: format!("{:?}", from),
                existing: format!("{:?}", existing),
                to: format!("{:?}", to),
            });
        }
        if self.resolve(to) == from {
            return contract_err!(SubstitutionCycleErr {
                from: format!("{:?}", from),
                to: format!("{:?}", to),
            });
        }
        trace!("Substituting {:?} with {:?}", from, to);
        self.substitutions.insert(from, to);
        Ok(())
    }

    /// The current replacement of `value`, or `value` itself if it has
    /// not been replaced.
    pub fn resolve(&self, value: Value) -> Value {
        let mut current = value;
        while let Some(&next) = self.substitutions.get(&current) {
            current = next;
        }
        current
    }

    /// The operands of `op`, each replaced by its current replacement.
    pub fn live_operands(&self, ctx: &Context, op: Ptr<Operation>) -> Vec<Value> {
        op.deref(ctx)
            .operands()
            .map(|opd| self.resolve(opd))
            .collect()
    }

    /// Replace the operands of `op` with [Self::live_operands].
    pub fn rebind_operands(&self, ctx: &Context, op: Ptr<Operation>) {
        let live = self.live_operands(ctx, op);
        Operation::set_operands(op, ctx, live);
    }

    /// Number of values replaced so far.
    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        arith::{self, AddIOp},
        context::Context,
        op::Op,
        operation::Operation,
        r#type::Type,
        result::ErrorKind,
        rewrite::RewriteAction,
        value::Value,
    };

    use super::{
        ConflictingSubstitutionErr, OperandUpdater, ResultCountMismatchErr, SubstitutionCycleErr,
    };

    fn constants(ctx: &mut Context, n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| arith::constant(ctx, Type::i32(), i as i64).get_result(ctx))
            .collect()
    }

    #[test]
    fn resolve_follows_chain() {
        let ctx = &mut Context::new();
        let vals = constants(ctx, 3);
        let (a, b, c) = (vals[0], vals[1], vals[2]);
        let a_op = a.get_defining_op(ctx).unwrap();
        let b_op = b.get_defining_op(ctx).unwrap();

        let mut updater = OperandUpdater::new();
        updater
            .record_substitution(ctx, a_op, &RewriteAction::replace_with_values(vec![b]))
            .unwrap();
        assert_eq!(updater.resolve(a), b);
        updater
            .record_substitution(ctx, b_op, &RewriteAction::replace_with_values(vec![c]))
            .unwrap();
        assert_eq!(updater.resolve(a), c);
        assert_eq!(updater.resolve(b), c);
        assert_eq!(updater.resolve(c), c);
        assert_eq!(updater.len(), 2);
    }

    #[test]
    fn zero_results_records_nothing() {
        let ctx = &mut Context::new();
        let vals = constants(ctx, 1);
        let op = Operation::new(ctx, AddIOp::OPID, vec![], vec![vals[0], vals[0]], 0);
        let mut updater = OperandUpdater::new();
        updater
            .record_substitution(ctx, op, &RewriteAction::replace_with_values(vals.clone()))
            .unwrap();
        assert!(updater.is_empty());
    }

    #[test]
    fn every_mismatched_count_fails() {
        let ctx = &mut Context::new();
        let pool = constants(ctx, 4);
        for k in 1..=3 {
            let op = Operation::new(ctx, AddIOp::OPID, vec![Type::i32(); k], vec![], 0);
            for supplied in (0..=4).filter(|n| *n != k) {
                let mut updater = OperandUpdater::new();
                let action = RewriteAction::replace_with_values(pool[..supplied].to_vec());
                let err = updater.record_substitution(ctx, op, &action).unwrap_err();
                assert_eq!(err.kind, ErrorKind::ContractViolation);
                let typed = err.err.downcast_ref::<ResultCountMismatchErr>().unwrap();
                assert_eq!((typed.expected, typed.found), (k, supplied));
                assert!(updater.is_empty());
            }
        }
    }

    #[test]
    fn cycles_and_conflicts_are_rejected() {
        let ctx = &mut Context::new();
        let vals = constants(ctx, 3);
        let (a, b, c) = (vals[0], vals[1], vals[2]);
        let a_op = a.get_defining_op(ctx).unwrap();
        let b_op = b.get_defining_op(ctx).unwrap();

        let mut updater = OperandUpdater::new();
        // Forwarding a value to itself is not a substitution.
        updater
            .record_substitution(ctx, a_op, &RewriteAction::replace_with_values(vec![a]))
            .unwrap();
        assert!(updater.is_empty());

        updater
            .record_substitution(ctx, a_op, &RewriteAction::replace_with_values(vec![b]))
            .unwrap();
        let err = updater
            .record_substitution(ctx, b_op, &RewriteAction::replace_with_values(vec![a]))
            .unwrap_err();
        assert!(err.err.is::<SubstitutionCycleErr>());
        let err = updater
            .record_substitution(ctx, a_op, &RewriteAction::replace_with_values(vec![c]))
            .unwrap_err();
        assert!(err.err.is::<ConflictingSubstitutionErr>());
        assert_eq!(updater.resolve(a), b);
    }

    #[test]
    fn rebind_preserves_order_and_arity() {
        let ctx = &mut Context::new();
        let vals = constants(ctx, 3);
        let (a, b, c) = (vals[0], vals[1], vals[2]);
        let add = AddIOp::new(ctx, a, b);
        let a_op = a.get_defining_op(ctx).unwrap();

        let mut updater = OperandUpdater::new();
        updater
            .record_substitution(ctx, a_op, &RewriteAction::replace_with_values(vec![c]))
            .unwrap();
        assert_eq!(updater.live_operands(ctx, add.get_operation()), vec![c, b]);
        // Nothing changes until the operands are rebound.
        assert_eq!(
            add.get_operation().deref(ctx).operands().collect::<Vec<_>>(),
            vec![a, b]
        );
        updater.rebind_operands(ctx, add.get_operation());
        assert_eq!(
            add.get_operation().deref(ctx).operands().collect::<Vec<_>>(),
            vec![c, b]
        );
    }
}
