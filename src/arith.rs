//! Arith dialect: integer constants and arithmetic.

use thiserror::Error;

use crate::{
    builtin::{attributes::IntegerAttr, ops::verify_shape},
    common_traits::Verify,
    context::Context,
    declare_op,
    op::{register_op, Op},
    operation::Operation,
    r#type::{Type, Typed},
    result::Result,
    value::Value,
    verify_err,
};

/// Attribute key for the value of a [ConstantOp].
pub const ATTR_KEY_VALUE: &str = "value";

declare_op!(
    /// An integer constant.
    /// See MLIR's [arith.constant](https://mlir.llvm.org/docs/Dialects/ArithOps/#arithconstant-arithconstantop).
    ConstantOp, "arith", "constant"
);

impl ConstantOp {
    pub fn new(ctx: &mut Context, value: IntegerAttr) -> ConstantOp {
        let ty = value.get_type(ctx);
        let op = Operation::new(ctx, Self::OPID, vec![ty], vec![], 0);
        op.deref_mut(ctx).attributes.set(ATTR_KEY_VALUE, value);
        ConstantOp { op }
    }

    /// Get the constant's value.
    pub fn get_value(&self, ctx: &Context) -> Option<IntegerAttr> {
        self.op
            .deref(ctx)
            .attributes
            .get::<IntegerAttr>(ATTR_KEY_VALUE)
            .cloned()
    }

    pub fn get_result(&self, ctx: &Context) -> Value {
        self.op.deref(ctx).get_result(0).expect("Constant has one result")
    }
}

#[derive(Error, Debug)]
#[error("constant value does not match its result type")]
pub struct ConstantTypeErr;

impl Verify for ConstantOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_shape(ctx, self.op, Some(0), 1, 0, false)?;
        match self.get_value(ctx) {
            Some(value) if value.get_type(ctx) == self.get_result(ctx).get_type(ctx) => Ok(()),
            _ => verify_err!(ConstantTypeErr),
        }
    }
}

declare_op!(
    /// Integer addition.
    /// See MLIR's [arith.addi](https://mlir.llvm.org/docs/Dialects/ArithOps/#arithaddi-arithaddiop).
    AddIOp, "arith", "addi"
);

impl AddIOp {
    pub fn new(ctx: &mut Context, lhs: Value, rhs: Value) -> AddIOp {
        let ty = lhs.get_type(ctx);
        let op = Operation::new(ctx, Self::OPID, vec![ty], vec![lhs, rhs], 0);
        AddIOp { op }
    }

    pub fn get_result(&self, ctx: &Context) -> Value {
        self.op.deref(ctx).get_result(0).expect("Addition has one result")
    }
}

#[derive(Error, Debug)]
#[error("operands and result of an integer addition must have the same integer type")]
pub struct AddITypeErr;

impl Verify for AddIOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_shape(ctx, self.op, Some(2), 1, 0, false)?;
        let opref = self.op.deref(ctx);
        let res_ty = self.get_result(ctx).get_type(ctx);
        if !res_ty.is_integer() || opref.operands().any(|opd| opd.get_type(ctx) != res_ty) {
            return verify_err!(AddITypeErr);
        }
        Ok(())
    }
}

/// Get an integer constant of type `ty`.
pub fn constant(ctx: &mut Context, ty: Type, value: i64) -> ConstantOp {
    ConstantOp::new(ctx, IntegerAttr::new(ty, value))
}

/// Register the arith ops' verifiers.
pub fn register(ctx: &mut Context) {
    register_op::<ConstantOp>(ctx);
    register_op::<AddIOp>(ctx);
}

#[cfg(test)]
mod tests {
    use crate::{
        arith, common_traits::Verify, context::Context, op::Op, r#type::Type, result::ErrorKind,
    };

    use super::{AddIOp, AddITypeErr};

    #[test]
    fn mismatched_addition_fails() {
        let ctx = &mut Context::new();
        arith::register(ctx);
        let narrow = arith::constant(ctx, Type::i32(), 1).get_result(ctx);
        let wide = arith::constant(ctx, Type::i64(), 2).get_result(ctx);
        let add = AddIOp::new(ctx, narrow, wide);
        let err = add.verify(ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VerificationFailed);
        assert!(err.err.is::<AddITypeErr>());
        assert_eq!(add.get_opid().to_string(), "arith.addi");
    }
}
