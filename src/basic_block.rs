use std::fmt;

use crate::{
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    indented_block,
    operation::Operation,
    printable::{self, fmt_indented_newline, Printable},
    r#type::{Type, Typed},
    region::Region,
    value::{DefSite, Value},
};

/// A basic block contains a list of [Operation]s. It may have arguments.
pub struct BasicBlock {
    pub(crate) self_ptr: Ptr<BasicBlock>,
    pub(crate) label: Option<String>,
    pub(crate) args: Vec<Value>,
    pub(crate) ops: Vec<Ptr<Operation>>,
    pub(crate) parent_region: Option<Ptr<Region>>,
}

impl BasicBlock {
    /// Create a new, empty block with fresh arguments of the given types.
    /// The block is not attached to any region.
    pub fn new(ctx: &mut Context, label: Option<&str>, arg_types: Vec<Type>) -> Ptr<BasicBlock> {
        let block = Self::alloc_empty(ctx, label);
        let args: Vec<Value> = arg_types
            .into_iter()
            .enumerate()
            .map(|(arg_idx, ty)| Value::new(ctx, ty, DefSite::BlockArgument { block, arg_idx }))
            .collect();
        block.deref_mut(ctx).args = args;
        block
    }

    /// Create a new, empty block whose arguments are the existing values `args`.
    /// The values keep their identity: every use of them now refers to an
    /// argument of the new block.
    pub fn with_arguments(
        ctx: &mut Context,
        label: Option<&str>,
        args: Vec<Value>,
    ) -> Ptr<BasicBlock> {
        let block = Self::alloc_empty(ctx, label);
        for (arg_idx, arg) in args.iter().enumerate() {
            arg.set_def(ctx, DefSite::BlockArgument { block, arg_idx });
        }
        block.deref_mut(ctx).args = args;
        block
    }

    fn alloc_empty(ctx: &mut Context, label: Option<&str>) -> Ptr<BasicBlock> {
        let f = |self_ptr: Ptr<BasicBlock>| BasicBlock {
            self_ptr,
            label: label.map(str::to_string),
            args: vec![],
            ops: vec![],
            parent_region: None,
        };
        Self::alloc(ctx, f)
    }

    /// A label for this block, if one was given.
    pub fn get_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the idx'th argument.
    pub fn get_argument(&self, idx: usize) -> Option<Value> {
        self.args.get(idx).copied()
    }

    /// Get an iterator over the arguments of this block.
    pub fn arguments(&self) -> impl Iterator<Item = Value> + '_ {
        self.args.iter().copied()
    }

    pub fn get_num_arguments(&self) -> usize {
        self.args.len()
    }

    /// Iterate over the operations of this block, in order.
    pub fn iter(&self) -> impl Iterator<Item = Ptr<Operation>> + '_ {
        self.ops.iter().copied()
    }

    pub fn get_num_ops(&self) -> usize {
        self.ops.len()
    }

    /// The last operation in this block, if any.
    pub fn get_tail(&self) -> Option<Ptr<Operation>> {
        self.ops.last().copied()
    }

    /// Get the region that contains this block.
    pub fn get_parent_region(&self) -> Option<Ptr<Region>> {
        self.parent_region
    }

    /// Append `op` to the end of this block.
    pub fn append_operation(ptr: Ptr<Self>, ctx: &Context, op: Ptr<Operation>) {
        Operation::insert_at_back(op, ptr, ctx);
    }

    /// Append `op` to the end of this block, taking it out of whichever
    /// block it was listed in. That block itself is left untouched.
    pub(crate) fn adopt_operation(ptr: Ptr<Self>, ctx: &Context, op: Ptr<Operation>) {
        op.deref_mut(ctx).container = Some(ptr);
        ptr.deref_mut(ctx).ops.push(op);
    }

    /// Deallocate only this block, leaving its operations and arguments alone.
    pub(crate) fn dealloc_shell(ptr: Ptr<Self>, ctx: &mut Context) {
        {
            let mut block = ptr.deref_mut(ctx);
            block.ops.clear();
            block.args.clear();
        }
        ArenaObj::dealloc(ptr, ctx);
    }
}

impl ArenaObj for BasicBlock {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.basic_blocks
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.basic_blocks
    }

    fn get_self_ptr(&self) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context) {
        let (ops, args) = {
            let mut block = ptr.deref_mut(ctx);
            (std::mem::take(&mut block.ops), std::mem::take(&mut block.args))
        };
        for op in ops {
            ArenaObj::dealloc(op, ctx);
        }
        for arg in args {
            arg.dealloc(ctx);
        }
    }
}

impl Printable for BasicBlock {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "^{}(", state.block_label(ctx, self.self_ptr))?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx != 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "%{}: {}",
                state.define_value(ctx, *arg),
                arg.get_type(ctx)
            )?;
        }
        write!(f, "):")?;
        indented_block!(state, {
            for op in &self.ops {
                fmt_indented_newline(state, f)?;
                op.fmt(ctx, state, f)?;
            }
        });
        Ok(())
    }
}

impl Printable for Ptr<BasicBlock> {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.deref(ctx).fmt(ctx, state, f)
    }
}
