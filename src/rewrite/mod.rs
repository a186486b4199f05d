//! Pattern driven rewriting of an IR tree.
//!
//! A [RewritePattern] looks at one operation at a time and may propose a
//! [RewriteAction]: new operations to take its place, and the values that
//! replace its results. A [PatternRewriteWalker] offers every operation of a
//! module to the pattern, splices in the replacements, and keeps uses of
//! replaced values up to date through an [OperandUpdater].
//!
//! ```
//! use ssa_rewrite::{
//!     arith::{self, AddIOp, ConstantOp},
//!     builtin::ops::ModuleOp,
//!     context::Context,
//!     op::Op,
//!     operation::Operation,
//!     r#type::Type,
//!     rewrite::{op_type_rewrite_pattern, PatternRewriteWalker, RewriteAction},
//! };
//!
//! let ctx = &mut Context::new();
//! let module = ModuleOp::new(ctx, "m");
//! let one = arith::constant(ctx, Type::i32(), 1);
//! let one_res = one.get_result(ctx);
//! let twice = AddIOp::new(ctx, one_res, one_res);
//! module.append_operation(ctx, one.get_operation());
//! module.append_operation(ctx, twice.get_operation());
//!
//! // Fold additions of constants.
//! let fold = op_type_rewrite_pattern(|ctx, _add: AddIOp, opds| {
//!     let mut sum = 0;
//!     for opd in opds {
//!         let Some(value) = opd
//!             .get_defining_op(ctx)
//!             .and_then(|def| Operation::get_op::<ConstantOp>(def, ctx))
//!             .and_then(|constant| constant.get_value(ctx))
//!         else {
//!             return Ok(None);
//!         };
//!         sum += value.value();
//!     }
//!     let folded = arith::constant(ctx, Type::i32(), sum);
//!     Ok(Some(RewriteAction::new(ctx, vec![folded.get_operation()])))
//! });
//!
//! let mut walker = PatternRewriteWalker::new(fold);
//! let module = walker.rewrite_module(ctx, module).unwrap();
//! assert_eq!(walker.num_rewrites(), 1);
//! let tail = module.get_body(ctx).deref(ctx).get_tail().unwrap();
//! let folded = Operation::get_op::<ConstantOp>(tail, ctx).unwrap();
//! assert_eq!(folded.get_value(ctx).unwrap().value(), 2);
//! ```

pub mod action;
pub mod pattern;
pub mod updater;
pub mod walker;

pub use action::RewriteAction;
pub use pattern::{
    op_type_rewrite_pattern, AnonymousRewritePattern, OpTypeRewritePattern, RewritePattern,
    RewritePatternSet,
};
pub use updater::OperandUpdater;
pub use walker::{PatternRewriteWalker, WalkerConfig};
