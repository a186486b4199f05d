//! SSA values: results of operations and arguments of blocks.
//!
//! Every value lives in its own arena slot in the [Context], so a [Value]
//! is a stable handle whose equality is identity. Two values of the same
//! type are still distinct. Bookkeeping keyed by [Value] therefore never
//! needs to look at the IR it refers to.

use std::fmt;

use crate::{
    basic_block::BasicBlock,
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    operation::Operation,
    printable::{self, Printable},
    r#type::{Type, Typed},
};

/// Where a value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefSite {
    /// `res_idx`'th result of `op`.
    OpResult { op: Ptr<Operation>, res_idx: usize },
    /// `arg_idx`'th argument of `block`.
    BlockArgument {
        block: Ptr<BasicBlock>,
        arg_idx: usize,
    },
}

/// Storage for an SSA value.
pub struct ValueData {
    self_ptr: Ptr<ValueData>,
    ty: Type,
    def: DefSite,
    name: Option<String>,
}

impl ArenaObj for ValueData {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.values
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.values
    }

    fn get_self_ptr(&self) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(_ptr: Ptr<Self>, _ctx: &mut Context) {}
}

/// Handle to an SSA value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value(Ptr<ValueData>);

impl Value {
    pub(crate) fn new(ctx: &mut Context, ty: Type, def: DefSite) -> Value {
        Value(ValueData::alloc(ctx, |self_ptr| ValueData {
            self_ptr,
            ty,
            def,
            name: None,
        }))
    }

    pub(crate) fn dealloc(self, ctx: &mut Context) {
        ValueData::dealloc(self.0, ctx);
    }

    /// Re-point the definition of this value. Used when a block adopts
    /// arguments of another block.
    pub(crate) fn set_def(&self, ctx: &Context, def: DefSite) {
        self.0.deref_mut(ctx).def = def;
    }

    /// Where is this value defined?
    pub fn get_def(&self, ctx: &Context) -> DefSite {
        self.0.deref(ctx).def
    }

    /// Get the operation that defines this value, if it's an operation result.
    pub fn get_defining_op(&self, ctx: &Context) -> Option<Ptr<Operation>> {
        match self.get_def(ctx) {
            DefSite::OpResult { op, .. } => Some(op),
            DefSite::BlockArgument { .. } => None,
        }
    }

    /// Get the block in which this value is defined, if any.
    pub fn get_parent_block(&self, ctx: &Context) -> Option<Ptr<BasicBlock>> {
        match self.get_def(ctx) {
            DefSite::OpResult { op, .. } => op.deref(ctx).get_container(),
            DefSite::BlockArgument { block, .. } => Some(block),
        }
    }

    /// Index of this value among the results / arguments of its definer.
    pub fn get_def_index(&self, ctx: &Context) -> usize {
        match self.get_def(ctx) {
            DefSite::OpResult { res_idx, .. } => res_idx,
            DefSite::BlockArgument { arg_idx, .. } => arg_idx,
        }
    }

    /// Is this value still allocated?
    pub fn is_live(&self, ctx: &Context) -> bool {
        self.0.is_live(ctx)
    }

    /// A name given to this value for printing, if any.
    pub fn given_name(&self, ctx: &Context) -> Option<String> {
        self.0.deref(ctx).name.clone()
    }

    /// Give this value a name, used when printing it.
    pub fn set_name(&self, ctx: &Context, name: &str) {
        self.0.deref_mut(ctx).name = Some(name.to_string());
    }
}

impl Typed for Value {
    fn get_type(&self, ctx: &Context) -> Type {
        self.0.deref(ctx).ty.clone()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.make_name("Value"))
    }
}

impl Printable for Value {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "%{}", state.use_value(ctx, *self))
    }
}
