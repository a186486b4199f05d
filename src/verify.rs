//! Generic structural verification of an IR tree.
//!
//! Checks that
//!   - every operand is defined before its use: by an earlier operation in
//!     the same block, as an argument of the block, or likewise in an
//!     enclosing block,
//!   - parent back references (op -> block -> region -> op) are consistent,
//!   - values know where they are defined,
//!   - every operation passes the verifier registered for its kind.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{
    context::{Context, Ptr},
    operation::Operation,
    result::Result,
    value::{DefSite, Value},
    verify_err,
};

#[derive(Debug, Error)]
#[error("operand {opd_idx} of {opid} is not defined before its use")]
pub struct UndefinedValueErr {
    pub opid: String,
    pub opd_idx: usize,
}

#[derive(Debug, Error)]
#[error("inconsistent IR links: {0}")]
pub struct BrokenLinkErr(pub String);

type Scopes = Vec<FxHashSet<Value>>;

/// Verify `op` and everything nested in it.
pub fn verify_ssa(ctx: &Context, op: Ptr<Operation>) -> Result<()> {
    let mut scopes: Scopes = vec![FxHashSet::default()];
    verify_op(ctx, op, &mut scopes)
}

fn in_scope(scopes: &Scopes, value: &Value) -> bool {
    scopes.iter().any(|scope| scope.contains(value))
}

fn verify_op(ctx: &Context, op: Ptr<Operation>, scopes: &mut Scopes) -> Result<()> {
    let (opid, operands, results, regions) = {
        let opref = op.deref(ctx);
        (
            opref.get_opid(),
            opref.operands().collect::<Vec<_>>(),
            opref.results().collect::<Vec<_>>(),
            opref.regions().collect::<Vec<_>>(),
        )
    };

    for (opd_idx, opd) in operands.iter().enumerate() {
        if !opd.is_live(ctx) || !in_scope(scopes, opd) {
            return verify_err!(UndefinedValueErr {
                opid: opid.to_string(),
                opd_idx,
            });
        }
    }

    for (res_idx, res) in results.iter().enumerate() {
        if res.get_def(ctx) != (DefSite::OpResult { op, res_idx }) {
            return verify_err!(BrokenLinkErr(format!(
                "result {res_idx} of {opid} does not point back to it"
            )));
        }
    }

    if let Some(verifier) = ctx.ops.get(&opid) {
        verifier(ctx, op)?;
    }

    for region in regions {
        if region.deref(ctx).get_parent_op() != Some(op) {
            return verify_err!(BrokenLinkErr(format!(
                "a region of {opid} does not point back to it"
            )));
        }
        let blocks: Vec<_> = region.deref(ctx).iter().collect();
        for block in blocks {
            let (parent, args, ops) = {
                let blockref = block.deref(ctx);
                (
                    blockref.get_parent_region(),
                    blockref.arguments().collect::<Vec<_>>(),
                    blockref.iter().collect::<Vec<_>>(),
                )
            };
            if parent != Some(region) {
                return verify_err!(BrokenLinkErr(format!(
                    "a block in a region of {opid} does not point back to it"
                )));
            }
            for (arg_idx, arg) in args.iter().enumerate() {
                if arg.get_def(ctx) != (DefSite::BlockArgument { block, arg_idx }) {
                    return verify_err!(BrokenLinkErr(format!(
                        "argument {arg_idx} of a block in {opid} does not point back to it"
                    )));
                }
            }
            scopes.push(args.into_iter().collect());
            for nested in ops {
                if nested.deref(ctx).get_container() != Some(block) {
                    return verify_err!(BrokenLinkErr(format!(
                        "an operation in a block of {opid} does not point back to it"
                    )));
                }
                verify_op(ctx, nested, scopes)?;
                let nested_results: Vec<_> = nested.deref(ctx).results().collect();
                scopes
                    .last_mut()
                    .expect("Scope stack cannot be empty")
                    .extend(nested_results);
            }
            scopes.pop();
        }
    }
    Ok(())
}
