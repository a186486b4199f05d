use ssa_rewrite::{
    arith::{self, AddIOp, ConstantOp},
    basic_block::BasicBlock,
    builtin::{
        self,
        ops::{FuncOp, ModuleOp, ReturnOp},
    },
    context::{Context, Ptr},
    declare_op, impl_verify_succ,
    op::{register_op, Op},
    operation::Operation,
    printable::Printable,
    r#type::Type,
    region::Region,
    rewrite::{op_type_rewrite_pattern, RewriteAction, RewritePattern},
    value::Value,
};

pub fn init_env_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A context with all dialects registered.
pub fn setup_context() -> Context {
    init_env_logger();
    let mut ctx = Context::new();
    builtin::register(&mut ctx);
    arith::register(&mut ctx);
    register_op::<AOp>(&mut ctx);
    register_op::<BOp>(&mut ctx);
    register_op::<COp>(&mut ctx);
    register_op::<UseOp>(&mut ctx);
    register_op::<WrapOp>(&mut ctx);
    ctx
}

declare_op!(
    /// Produces an `i32` out of nothing.
    AOp, "test", "a"
);
declare_op!(BOp, "test", "b");
declare_op!(COp, "test", "c");
declare_op!(
    /// Uses its operands, produces nothing.
    UseOp, "test", "use"
);
declare_op!(
    /// Holds one region with one block.
    WrapOp, "test", "wrap"
);
declare_op!(
    /// Produces any number of `i32`s.
    MultiOp, "test", "multi"
);

impl_verify_succ!(AOp);
impl_verify_succ!(BOp);
impl_verify_succ!(COp);
impl_verify_succ!(UseOp);
impl_verify_succ!(WrapOp);

/// Create an op of kind `O` with a single `i32` result and no operands.
pub fn producer<O: Op>(ctx: &mut Context) -> O {
    let op = Operation::new(ctx, O::get_opid_static(), vec![Type::i32()], vec![], 0);
    O::wrap_operation(op)
}

/// The first result of `op`.
pub fn result_of<O: Op>(ctx: &Context, op: O) -> Value {
    op.get_operation()
        .deref(ctx)
        .get_result(0)
        .expect("Op has no results")
}

impl UseOp {
    pub fn new(ctx: &mut Context, operands: Vec<Value>) -> UseOp {
        let op = Operation::new(ctx, Self::OPID, vec![], operands, 0);
        UseOp { op }
    }
}

impl WrapOp {
    pub fn new(ctx: &mut Context) -> WrapOp {
        let op = Operation::new(ctx, Self::OPID, vec![], vec![], 1);
        let region = op.deref(ctx).get_region(0).unwrap();
        let body = BasicBlock::new(ctx, Some("body"), vec![]);
        Region::append_block(region, ctx, body);
        WrapOp { op }
    }

    pub fn get_body(&self, ctx: &Context) -> Ptr<BasicBlock> {
        let region = self.op.deref(ctx).get_region(0).unwrap();
        let body = region.deref(ctx).get_entry().unwrap();
        body
    }
}

impl MultiOp {
    pub fn new(ctx: &mut Context, num_results: usize) -> MultiOp {
        let op = Operation::new(ctx, Self::OPID, vec![Type::i32(); num_results], vec![], 0);
        MultiOp { op }
    }
}

/// Append `op` at the end of `block`.
pub fn append<O: Op>(block: Ptr<BasicBlock>, op: O, ctx: &Context) -> O {
    BasicBlock::append_operation(block, ctx, op.get_operation());
    op
}

pub fn print_module(ctx: &Context, module: ModuleOp) -> String {
    module.get_operation().disp(ctx).to_string()
}

// Create a module "m", with a function `f(x: i32) -> i32 { return x + 0 }`.
pub fn add_zero_module(ctx: &mut Context) -> (ModuleOp, FuncOp) {
    let module = ModuleOp::new(ctx, "m");
    let func = FuncOp::new(ctx, "f", vec![Type::i32()], vec![Type::i32()]);
    module.append_operation(ctx, func.get_operation());
    let entry = func.get_entry_block(ctx);
    let x = func.get_argument(ctx, 0).unwrap();
    x.set_name(ctx, "x");

    let zero = arith::constant(ctx, Type::i32(), 0);
    let zero_res = zero.get_result(ctx);
    append(entry, zero, ctx);
    let sum = AddIOp::new(ctx, x, zero_res);
    let sum_res = sum.get_result(ctx);
    append(entry, sum, ctx);
    let ret = ReturnOp::new(ctx, vec![sum_res]);
    append(entry, ret, ctx);
    (module, func)
}

/// Replace `a + 0` with `a`.
pub fn add_zero_pattern() -> impl RewritePattern {
    op_type_rewrite_pattern(|ctx, _add: AddIOp, opds| {
        let is_zero = opds[1]
            .get_defining_op(ctx)
            .and_then(|def| Operation::get_op::<ConstantOp>(def, ctx))
            .and_then(|constant| constant.get_value(ctx))
            .is_some_and(|value| value.value() == 0);
        if !is_zero {
            return Ok(None);
        }
        Ok(Some(RewriteAction::replace_with_values(vec![opds[0]])))
    })
}
