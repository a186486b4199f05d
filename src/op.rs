//! An [Op] is a typed view over an [Operation] of one specific kind.
//!
//! Every [Operation] carries an [OpId] naming its kind. Concrete ops are
//! thin `Copy` wrappers around a `Ptr<Operation>` and can only be obtained
//! (via [Operation::get_op]) from an operation of the matching kind.
//! Rewrite patterns use this to be written against one kind of operation
//! while the rewrite engine handles all of them uniformly.

use std::fmt;

use crate::{
    common_traits::Verify,
    context::{Context, Ptr},
    operation::Operation,
    result::Result,
};

/// Name of an operation kind: a dialect name and an op name within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId {
    pub dialect: &'static str,
    pub name: &'static str,
}

impl OpId {
    pub const fn new(dialect: &'static str, name: &'static str) -> OpId {
        OpId { dialect, name }
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

crate::impl_printable_for_display!(OpId);

/// Kind specific verification, registered in the [Context].
pub type OpVerifier = fn(&Context, Ptr<Operation>) -> Result<()>;

/// A typed view over an [Operation].
pub trait Op: Copy + Sized {
    /// The kind of operations this wraps.
    fn get_opid_static() -> OpId;

    /// Wrap `op` without checking its kind. Use [Operation::get_op] instead.
    fn wrap_operation(op: Ptr<Operation>) -> Self;

    /// Get the underlying [Operation].
    fn get_operation(&self) -> Ptr<Operation>;

    /// Kind of this op.
    fn get_opid(&self) -> OpId {
        Self::get_opid_static()
    }
}

/// Register the verifier of `O` in `ctx`. It is run by
/// [Operation]'s [Verify] implementation on every operation of kind `O`,
/// in addition to the generic SSA checks.
pub fn register_op<O: Op + Verify>(ctx: &mut Context) {
    fn verify_as<O: Op + Verify>(ctx: &Context, op: Ptr<Operation>) -> Result<()> {
        O::wrap_operation(op).verify(ctx)
    }
    ctx.ops.insert(O::get_opid_static(), verify_as::<O>);
}

/// Declare an [Op] wrapper struct for the given dialect and op name.
///
/// ```
/// use ssa_rewrite::{declare_op, op::Op};
/// declare_op!(
///     /// An example op.
///     ExampleOp, "test", "example"
/// );
/// assert_eq!(ExampleOp::get_opid_static().to_string(), "test.example");
/// ```
#[macro_export]
macro_rules! declare_op {
    ($(#[$attr:meta])* $op_name:ident, $dialect:literal, $name:literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $op_name {
            op: $crate::context::Ptr<$crate::operation::Operation>,
        }

        impl $op_name {
            /// Kind of this op.
            pub const OPID: $crate::op::OpId = $crate::op::OpId::new($dialect, $name);
        }

        impl $crate::op::Op for $op_name {
            fn get_opid_static() -> $crate::op::OpId {
                Self::OPID
            }

            fn wrap_operation(op: $crate::context::Ptr<$crate::operation::Operation>) -> Self {
                $op_name { op }
            }

            fn get_operation(&self) -> $crate::context::Ptr<$crate::operation::Operation> {
                self.op
            }
        }
    };
}
