use thiserror::Error;

use crate::{
    basic_block::BasicBlock,
    common_traits::Verify,
    context::{Context, Ptr},
    declare_op,
    operation::Operation,
    r#type::{Type, Typed},
    region::Region,
    result::Result,
    value::Value,
    verify_err,
};

use super::attributes::{StringAttr, TypeAttr};

/// Attribute key for the symbol name of [ModuleOp] and [FuncOp].
pub const ATTR_KEY_SYM_NAME: &str = "sym_name";
/// Attribute key for the function type of [FuncOp].
pub const ATTR_KEY_FUNC_TYPE: &str = "function_type";

#[derive(Error, Debug)]
#[error("{opid} must have exactly {expected} {what}, but has {found}")]
pub struct ShapeVerifyErr {
    pub opid: String,
    pub expected: usize,
    pub what: &'static str,
    pub found: usize,
}

/// Check the number of operands, results and regions (with one block each,
/// when `single_block` is set) of an operation.
pub(crate) fn verify_shape(
    ctx: &Context,
    op: Ptr<Operation>,
    num_operands: Option<usize>,
    num_results: usize,
    num_regions: usize,
    single_block: bool,
) -> Result<()> {
    let opref = op.deref(ctx);
    let err = |expected, what, found| {
        verify_err!(ShapeVerifyErr {
            opid: opref.get_opid().to_string(),
            expected,
            what,
            found,
        })
    };
    if let Some(num_operands) = num_operands {
        if opref.get_num_operands() != num_operands {
            return err(num_operands, "operands", opref.get_num_operands());
        }
    }
    if opref.get_num_results() != num_results {
        return err(num_results, "results", opref.get_num_results());
    }
    if opref.get_num_regions() != num_regions {
        return err(num_regions, "regions", opref.get_num_regions());
    }
    if single_block {
        for region in opref.regions() {
            let num_blocks = region.deref(ctx).get_num_blocks();
            if num_blocks != 1 {
                return err(1, "block per region", num_blocks);
            }
        }
    }
    Ok(())
}

#[derive(Error, Debug)]
#[error("{0} must have a symbol name")]
pub struct SymbolNameMissingErr(pub String);

fn symbol_name(ctx: &Context, op: Ptr<Operation>) -> Option<String> {
    op.deref(ctx)
        .attributes
        .get::<StringAttr>(ATTR_KEY_SYM_NAME)
        .map(|name| name.value().to_string())
}

declare_op!(
    /// Represents a module, a top level container operation.
    ///
    /// See MLIR's [builtin.module](https://mlir.llvm.org/docs/Dialects/Builtin/#builtinmodule-mlirmoduleop).
    /// It contains a single region containing a single block which can contain
    /// any operations and does not have a terminator.
    /// A module is the root that a whole-program rewrite must start from and end with.
    ModuleOp, "builtin", "module"
);

impl ModuleOp {
    /// Create a new [ModuleOp].
    /// The underlying [Operation] is not linked to a [BasicBlock].
    /// The returned module has a single [Region] with a single [BasicBlock].
    pub fn new(ctx: &mut Context, name: &str) -> ModuleOp {
        let op = Operation::new(ctx, Self::OPID, vec![], vec![], 1);
        op.deref_mut(ctx)
            .attributes
            .set(ATTR_KEY_SYM_NAME, StringAttr::new(name));
        let region = op.deref(ctx).get_region(0).expect("Module has one region");
        let block = BasicBlock::new(ctx, None, vec![]);
        Region::append_block(region, ctx, block);
        ModuleOp { op }
    }

    /// Get the module's name.
    pub fn get_symbol_name(&self, ctx: &Context) -> Option<String> {
        symbol_name(ctx, self.op)
    }

    /// The single block of this module.
    pub fn get_body(&self, ctx: &Context) -> Ptr<BasicBlock> {
        let region = self
            .op
            .deref(ctx)
            .get_region(0)
            .expect("Module has one region");
        region.deref(ctx).get_entry().expect("Module has one block")
    }

    /// Add an [Operation] at the end of the module's body.
    pub fn append_operation(&self, ctx: &Context, op: Ptr<Operation>) {
        BasicBlock::append_operation(self.get_body(ctx), ctx, op);
    }
}

impl Verify for ModuleOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_shape(ctx, self.op, Some(0), 0, 1, true)?;
        if self.get_symbol_name(ctx).is_none() {
            return verify_err!(SymbolNameMissingErr(Self::OPID.to_string()));
        }
        Ok(())
    }
}

declare_op!(
    /// An operation with a name containing a single SSA region.
    /// The arguments of the entry block are the function's parameters.
    /// See MLIR's [func.func](https://mlir.llvm.org/docs/Dialects/Func/#funcfunc-mlirfuncfuncop).
    FuncOp, "builtin", "func"
);

impl FuncOp {
    /// Create a new [FuncOp] of type `inputs -> results`.
    /// The returned function has a single region with an empty `entry` block,
    /// whose arguments have the input types.
    pub fn new(ctx: &mut Context, name: &str, inputs: Vec<Type>, results: Vec<Type>) -> FuncOp {
        let arg_types = inputs.clone();
        let ty = Type::function(inputs, results);
        let op = Operation::new(ctx, Self::OPID, vec![], vec![], 1);
        {
            let attributes = &mut op.deref_mut(ctx).attributes;
            attributes.set(ATTR_KEY_SYM_NAME, StringAttr::new(name));
            attributes.set(ATTR_KEY_FUNC_TYPE, TypeAttr::new(ty));
        }
        let region = op.deref(ctx).get_region(0).expect("Function has one region");
        let body = BasicBlock::new(ctx, Some("entry"), arg_types);
        Region::append_block(region, ctx, body);
        FuncOp { op }
    }

    /// Get the function's name.
    pub fn get_symbol_name(&self, ctx: &Context) -> Option<String> {
        symbol_name(ctx, self.op)
    }

    /// Get the entry block of this function.
    pub fn get_entry_block(&self, ctx: &Context) -> Ptr<BasicBlock> {
        let region = self
            .op
            .deref(ctx)
            .get_region(0)
            .expect("Function has one region");
        region
            .deref(ctx)
            .get_entry()
            .expect("Function has an entry block")
    }

    /// Get the i'th function parameter.
    pub fn get_argument(&self, ctx: &Context, idx: usize) -> Option<Value> {
        self.get_entry_block(ctx).deref(ctx).get_argument(idx)
    }
}

impl Typed for FuncOp {
    fn get_type(&self, ctx: &Context) -> Type {
        self.op
            .deref(ctx)
            .attributes
            .get::<TypeAttr>(ATTR_KEY_FUNC_TYPE)
            .map_or(Type::Unit, |ty| ty.get_type(ctx))
    }
}

#[derive(Error, Debug)]
#[error("function does not have function type")]
pub struct FuncOpTypeErr;

#[derive(Error, Debug)]
#[error("function parameter {0} does not match the function's type")]
pub struct FuncOpArgTypeErr(pub usize);

impl Verify for FuncOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_shape(ctx, self.op, Some(0), 0, 1, false)?;
        if self.get_symbol_name(ctx).is_none() {
            return verify_err!(SymbolNameMissingErr(Self::OPID.to_string()));
        }
        let Type::Function { inputs, .. } = self.get_type(ctx) else {
            return verify_err!(FuncOpTypeErr);
        };
        let entry = self.get_entry_block(ctx);
        let args: Vec<_> = entry.deref(ctx).arguments().collect();
        if args.len() != inputs.len() {
            return verify_err!(FuncOpArgTypeErr(args.len()));
        }
        for (idx, (arg, ty)) in args.iter().zip(inputs.iter()).enumerate() {
            if arg.get_type(ctx) != *ty {
                return verify_err!(FuncOpArgTypeErr(idx));
            }
        }
        Ok(())
    }
}

declare_op!(
    /// Return from a [FuncOp], with the given values.
    ReturnOp, "builtin", "return"
);

impl ReturnOp {
    pub fn new(ctx: &mut Context, values: Vec<Value>) -> ReturnOp {
        let op = Operation::new(ctx, Self::OPID, vec![], values, 0);
        ReturnOp { op }
    }
}

#[derive(Error, Debug)]
#[error("return value {0} does not match the enclosing function's result type")]
pub struct ReturnTypeErr(pub usize);

impl Verify for ReturnOp {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_shape(ctx, self.op, None, 0, 0, false)?;
        let opref = self.op.deref(ctx);
        let Some(func) = opref
            .get_parent_op(ctx)
            .and_then(|parent| Operation::get_op::<FuncOp>(parent, ctx))
        else {
            return Ok(());
        };
        let Type::Function { results, .. } = func.get_type(ctx) else {
            return Ok(());
        };
        let operands: Vec<_> = opref.operands().collect();
        if operands.len() != results.len() {
            return verify_err!(ReturnTypeErr(operands.len()));
        }
        for (idx, (opd, ty)) in operands.iter().zip(results.iter()).enumerate() {
            if opd.get_type(ctx) != *ty {
                return verify_err!(ReturnTypeErr(idx));
            }
        }
        Ok(())
    }
}

/// Register the builtin ops' verifiers.
pub fn register(ctx: &mut Context) {
    crate::op::register_op::<ModuleOp>(ctx);
    crate::op::register_op::<FuncOp>(ctx);
    crate::op::register_op::<ReturnOp>(ctx);
}
