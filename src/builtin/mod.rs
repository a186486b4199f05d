//! Builtin dialect: [Op](crate::op::Op)s and [Attribute](crate::attribute::Attribute)s

pub mod attributes;
pub mod ops;

use crate::context::Context;

/// Register the builtin dialect's ops in `ctx`.
pub fn register(ctx: &mut Context) {
    ops::register(ctx);
}
