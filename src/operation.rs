//! An [Operation] is the basic unit of computation in the IR.
//!
//! It consumes values (operands, not owned), defines values (results,
//! owned), carries named [attributes](crate::attribute) and may own
//! [Region]s. Results are created together with the operation and never
//! change afterwards. Operands and the list of regions may be replaced.

use std::fmt;

use crate::{
    attribute::AttributeDict,
    basic_block::BasicBlock,
    common_traits::Verify,
    context::{private::ArenaObj, ArenaCell, Context, Ptr},
    op::{Op, OpId},
    printable::{self, Printable},
    r#type::{Type, Typed},
    region::Region,
    result::Result,
    value::{DefSite, Value},
    verify::verify_ssa,
};

/// An operation in the IR.
pub struct Operation {
    pub(crate) self_ptr: Ptr<Operation>,
    pub(crate) opid: OpId,
    pub(crate) operands: Vec<Value>,
    pub(crate) results: Vec<Value>,
    pub(crate) regions: Vec<Ptr<Region>>,
    /// Named attributes of this operation.
    pub attributes: AttributeDict,
    pub(crate) container: Option<Ptr<BasicBlock>>,
}

impl Operation {
    /// Create a new, unlinked (i.e., not in a basic block) operation.
    /// One result is created for every entry in `result_types`, and
    /// `num_regions` empty regions are attached.
    pub fn new(
        ctx: &mut Context,
        opid: OpId,
        result_types: Vec<Type>,
        operands: Vec<Value>,
        num_regions: usize,
    ) -> Ptr<Operation> {
        let f = |self_ptr: Ptr<Operation>| Operation {
            self_ptr,
            opid,
            operands,
            results: vec![],
            regions: vec![],
            attributes: AttributeDict::default(),
            container: None,
        };
        let newop = Self::alloc(ctx, f);

        let results: Vec<Value> = result_types
            .into_iter()
            .enumerate()
            .map(|(res_idx, ty)| Value::new(ctx, ty, DefSite::OpResult { op: newop, res_idx }))
            .collect();
        newop.deref_mut(ctx).results = results;

        for _ in 0..num_regions {
            let region = Region::new(ctx);
            Self::add_region(newop, ctx, region);
        }
        newop
    }

    /// Get the kind of this operation.
    pub fn get_opid(&self) -> OpId {
        self.opid
    }

    /// Get a [Ptr] to self.
    pub fn get_self_ptr(&self) -> Ptr<Operation> {
        self.self_ptr
    }

    /// View `ptr` as the concrete [Op] `O`, if it is of that kind.
    pub fn get_op<O: Op>(ptr: Ptr<Self>, ctx: &Context) -> Option<O> {
        (ptr.deref(ctx).opid == O::get_opid_static()).then(|| O::wrap_operation(ptr))
    }

    /// Is `ptr` an operation of the concrete [Op] kind `O`?
    pub fn isa<O: Op>(ptr: Ptr<Self>, ctx: &Context) -> bool {
        ptr.deref(ctx).opid == O::get_opid_static()
    }

    /// Get number of results.
    pub fn get_num_results(&self) -> usize {
        self.results.len()
    }

    /// Get the idx'th result.
    pub fn get_result(&self, idx: usize) -> Option<Value> {
        self.results.get(idx).copied()
    }

    /// Get an iterator over the results of this operation.
    pub fn results(&self) -> impl Iterator<Item = Value> + '_ {
        self.results.iter().copied()
    }

    /// Get number of operands.
    pub fn get_num_operands(&self) -> usize {
        self.operands.len()
    }

    /// Get the idx'th operand.
    pub fn get_operand(&self, idx: usize) -> Option<Value> {
        self.operands.get(idx).copied()
    }

    /// Get an iterator over the operands of this operation.
    pub fn operands(&self) -> impl Iterator<Item = Value> + '_ {
        self.operands.iter().copied()
    }

    /// Replace the list of operands. The arity may not change.
    pub(crate) fn set_operands(ptr: Ptr<Self>, ctx: &Context, operands: Vec<Value>) {
        let mut op = ptr.deref_mut(ctx);
        assert!(
            op.operands.len() == operands.len(),
            "Operand list replacement must preserve arity"
        );
        op.operands = operands;
    }

    /// Get number of regions.
    pub fn get_num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Get the idx'th region.
    pub fn get_region(&self, idx: usize) -> Option<Ptr<Region>> {
        self.regions.get(idx).copied()
    }

    /// Get an iterator over the regions of this operation.
    pub fn regions(&self) -> impl Iterator<Item = Ptr<Region>> + '_ {
        self.regions.iter().copied()
    }

    /// Attach a new region (at the end) to this operation.
    /// The region must not already be attached to an operation.
    pub fn add_region(ptr: Ptr<Self>, ctx: &mut Context, region: Ptr<Region>) {
        assert!(
            region.deref(ctx).get_parent_op().is_none(),
            "Region is already attached to an operation"
        );
        region.deref_mut(ctx).parent_op = Some(ptr);
        ptr.deref_mut(ctx).regions.push(region);
    }

    /// Replace the list of regions of this operation with `new_regions`,
    /// all at once. The detached regions are returned to the caller,
    /// and are otherwise left untouched.
    pub fn replace_regions(
        ptr: Ptr<Self>,
        ctx: &mut Context,
        new_regions: Vec<Ptr<Region>>,
    ) -> Vec<Ptr<Region>> {
        let old_regions = std::mem::take(&mut ptr.deref_mut(ctx).regions);
        for region in &old_regions {
            region.deref_mut(ctx).parent_op = None;
        }
        for region in new_regions {
            Self::add_region(ptr, ctx, region);
        }
        old_regions
    }

    /// Get the block that contains this operation.
    pub fn get_container(&self) -> Option<Ptr<BasicBlock>> {
        self.container
    }

    /// Get the operation that contains this operation.
    pub fn get_parent_op(&self, ctx: &Context) -> Option<Ptr<Operation>> {
        self.container?
            .deref(ctx)
            .get_parent_region()?
            .deref(ctx)
            .get_parent_op()
    }

    /// Insert this operation at the end of `block`.
    /// The operation must not already be in a block.
    pub fn insert_at_back(ptr: Ptr<Self>, block: Ptr<BasicBlock>, ctx: &Context) {
        assert!(
            ptr.deref(ctx).container.is_none(),
            "Operation is already in a block"
        );
        ptr.deref_mut(ctx).container = Some(block);
        block.deref_mut(ctx).ops.push(ptr);
    }

    /// Unlink this operation from its block (if any), and deallocate it along
    /// with its results and everything its regions hold.
    /// Its results must have no uses left.
    pub fn erase(ptr: Ptr<Self>, ctx: &mut Context) {
        let container = ptr.deref(ctx).container;
        if let Some(block) = container {
            if block.is_live(ctx) {
                block.deref_mut(ctx).ops.retain(|op| *op != ptr);
            }
        }
        ArenaObj::dealloc(ptr, ctx);
    }
}

impl ArenaObj for Operation {
    fn get_arena(ctx: &Context) -> &ArenaCell<Self> {
        &ctx.operations
    }

    fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self> {
        &mut ctx.operations
    }

    fn get_self_ptr(&self) -> Ptr<Self> {
        self.self_ptr
    }

    fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context) {
        let (results, regions) = {
            let op = ptr.deref(ctx);
            (op.results.clone(), op.regions.clone())
        };
        for region in regions {
            ArenaObj::dealloc(region, ctx);
        }
        for res in results {
            res.dealloc(ctx);
        }
    }
}

impl Verify for Operation {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_ssa(ctx, self.self_ptr)
    }
}

impl Verify for Ptr<Operation> {
    fn verify(&self, ctx: &Context) -> Result<()> {
        verify_ssa(ctx, *self)
    }
}

impl Printable for Operation {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if !self.results.is_empty() {
            let names: Vec<_> = self
                .results
                .iter()
                .map(|res| format!("%{}", state.define_value(ctx, *res)))
                .collect();
            write!(f, "{} = ", names.join(", "))?;
        }
        write!(f, "{}(", self.opid)?;
        printable::fmt_iter(
            self.operands.iter(),
            ctx,
            state,
            printable::ListSeparator::CharSpace(','),
            f,
        )?;
        write!(f, ")")?;
        if !self.attributes.is_empty() {
            write!(f, " {}", self.attributes.print(ctx, state))?;
        }
        if !self.results.is_empty() {
            let types: Vec<_> = self
                .results
                .iter()
                .map(|res| res.get_type(ctx).to_string())
                .collect();
            write!(f, " : {}", types.join(", "))?;
        }
        for region in &self.regions {
            write!(f, " ")?;
            region.fmt(ctx, state, f)?;
        }
        Ok(())
    }
}

impl Printable for Ptr<Operation> {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.deref(ctx).fmt(ctx, state, f)
    }
}
