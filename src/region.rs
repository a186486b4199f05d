//! Regions are containers for [BasicBlock]s within an [Operation].

use std::fmt;

use crate::{
    basic_block::BasicBlock,
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    indented_block,
    operation::Operation,
    printable::{self, fmt_indented_newline, Printable},
};

/// A region is an ordered list of basic blocks contained in an Operation.
/// The first block, called the entry block is special. Its arguments
/// are considered to be the arguments to the region.
/// See [MLIR Region description](https://mlir.llvm.org/docs/LangRef/#regions).
pub struct Region {
    pub(crate) self_ptr: Ptr<Region>,
    pub(crate) parent_op: Option<Ptr<Operation>>,
    pub(crate) blocks: Vec<Ptr<BasicBlock>>,
}

impl Region {
    /// Create a new, empty Region that is not attached to any [Operation].
    /// Use [Operation::add_region] to attach it.
    pub fn new(ctx: &mut Context) -> Ptr<Region> {
        let f = |self_ptr: Ptr<Region>| Region {
            self_ptr,
            parent_op: None,
            blocks: vec![],
        };
        Self::alloc(ctx, f)
    }

    /// Get the operation that contains this region.
    pub fn get_parent_op(&self) -> Option<Ptr<Operation>> {
        self.parent_op
    }

    /// Append `block` to the end of this region.
    /// The block must not already be in a region.
    pub fn append_block(ptr: Ptr<Self>, ctx: &Context, block: Ptr<BasicBlock>) {
        assert!(
            block.deref(ctx).get_parent_region().is_none(),
            "Block is already in a region"
        );
        block.deref_mut(ctx).parent_region = Some(ptr);
        ptr.deref_mut(ctx).blocks.push(block);
    }

    /// Iterate over the blocks of this region, in order.
    pub fn iter(&self) -> impl Iterator<Item = Ptr<BasicBlock>> + '_ {
        self.blocks.iter().copied()
    }

    /// Get the idx'th block.
    pub fn get_block(&self, idx: usize) -> Option<Ptr<BasicBlock>> {
        self.blocks.get(idx).copied()
    }

    /// The entry block of this region, if it has any block.
    pub fn get_entry(&self) -> Option<Ptr<BasicBlock>> {
        self.blocks.first().copied()
    }

    pub fn get_num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Deallocate only the region and its blocks, leaving the operations
    /// they list and the block arguments alone. Used to reclaim a region
    /// whose contents have all moved elsewhere.
    pub(crate) fn dealloc_shell(ptr: Ptr<Self>, ctx: &mut Context) {
        let blocks = std::mem::take(&mut ptr.deref_mut(ctx).blocks);
        for block in blocks {
            BasicBlock::dealloc_shell(block, ctx);
        }
        ArenaObj::dealloc(ptr, ctx);
    }
}

impl ArenaObj for Region {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.regions
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.regions
    }

    fn get_self_ptr(&self) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context) {
        let blocks = std::mem::take(&mut ptr.deref_mut(ctx).blocks);
        for block in blocks {
            ArenaObj::dealloc(block, ctx);
        }
    }
}

impl Printable for Region {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{{")?;
        for block in self.iter() {
            indented_block!(state, {
                fmt_indented_newline(state, f)?;
                block.fmt(ctx, state, f)?;
            });
        }
        fmt_indented_newline(state, f)?;
        write!(f, "}}")
    }
}

impl Printable for Ptr<Region> {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.deref(ctx).fmt(ctx, state, f)
    }
}
