//! A pattern driven rewrite engine for an SSA-form IR.
//!
//! The IR ([Operation](operation::Operation)s holding
//! [Region](region::Region)s of [BasicBlock](basic_block::BasicBlock)s)
//! lives in a [Context](context::Context). The [rewrite] module offers each
//! operation of a module to a [RewritePattern](rewrite::RewritePattern),
//! splicing in whatever the pattern proposes.

#![forbid(unsafe_code)]

pub mod arith;
pub mod attribute;
pub mod basic_block;
pub mod builtin;
pub mod common_traits;
pub mod context;
pub mod op;
pub mod operation;
pub mod printable;
pub mod region;
pub mod result;
pub mod rewrite;
pub mod r#type;
pub mod value;
pub mod verify;
