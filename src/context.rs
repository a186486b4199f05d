//! [Context] and [Ptr] together provide memory management for the IR.

use std::{
    any::TypeId,
    cell::{Ref, RefCell, RefMut},
    fmt,
    hash::Hash,
    marker::PhantomData,
};

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::{
    basic_block::BasicBlock,
    op::{OpId, OpVerifier},
    operation::Operation,
    region::Region,
    value::ValueData,
};

slotmap::new_key_type! {
    /// Index of an object in one of the [Context] arenas.
    pub struct ArenaIndex;
}

pub type ArenaCell<T> = SlotMap<ArenaIndex, RefCell<T>>;

/// A context stores all IR data of this compilation session.
#[derive(Default)]
pub struct Context {
    /// Allocation pool for [Operation]s.
    pub(crate) operations: ArenaCell<Operation>,
    /// Allocation pool for [BasicBlock]s.
    pub(crate) basic_blocks: ArenaCell<BasicBlock>,
    /// Allocation pool for [Region]s.
    pub(crate) regions: ArenaCell<Region>,
    /// Allocation pool for SSA values (operation results and block arguments).
    pub(crate) values: ArenaCell<ValueData>,
    /// Verifiers of registered [Op](crate::op::Op)s.
    pub(crate) ops: FxHashMap<OpId, OpVerifier>,
}

impl Context {
    pub fn new() -> Context {
        Self::default()
    }

    /// Number of live [Operation]s in this context.
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    /// Number of live [Region]s in this context.
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    /// Number of live [BasicBlock]s in this context.
    pub fn num_blocks(&self) -> usize {
        self.basic_blocks.len()
    }

    /// Number of live SSA values in this context.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}

pub(crate) mod private {
    use std::{cell::RefCell, marker::PhantomData};

    use super::{ArenaCell, ArenaIndex, Context, Ptr};

    /// An IR object owned by Context
    pub trait ArenaObj
    where
        Self: Sized,
    {
        /// Get the arena that has allocated this object.
        fn get_arena(ctx: &Context) -> &ArenaCell<Self>;
        /// Get the arena that has allocated this object.
        fn get_arena_mut(ctx: &mut Context) -> &mut ArenaCell<Self>;
        /// Get a Ptr to self.
        fn get_self_ptr(&self) -> Ptr<Self>;
        /// If this object contains any ArenaObj itself, it must dealloc()
        /// all of those sub-objects. This is called when self is deallocated.
        fn dealloc_sub_objects(ptr: Ptr<Self>, ctx: &mut Context);

        /// Allocates object on the arena, given a creator function.
        fn alloc<T: FnOnce(Ptr<Self>) -> Self>(ctx: &mut Context, f: T) -> Ptr<Self> {
            let creator = |idx: ArenaIndex| {
                RefCell::new(f(Ptr::<Self> {
                    idx,
                    _dummy: PhantomData,
                }))
            };
            Ptr::<Self> {
                idx: Self::get_arena_mut(ctx).insert_with_key(creator),
                _dummy: PhantomData,
            }
        }

        /// Deallocates this object from the arena.
        fn dealloc(ptr: Ptr<Self>, ctx: &mut Context) {
            Self::dealloc_sub_objects(ptr, ctx);
            Self::get_arena_mut(ctx).remove(ptr.idx);
        }
    }
}

pub(crate) use private::ArenaObj;

/// Pointer to an IR Object owned by Context.
pub struct Ptr<T: ArenaObj> {
    pub(crate) idx: ArenaIndex,
    pub(crate) _dummy: PhantomData<T>,
}

impl<'a, T: ArenaObj> Ptr<T> {
    /// Return a [Ref] to the pointee.
    /// This borrows from a RefCell and the borrow is live
    /// as long as the returned Ref lives.
    ///
    /// Panics if the pointee has been deallocated.
    pub fn deref(&self, ctx: &'a Context) -> Ref<'a, T> {
        T::get_arena(ctx)
            .get(self.idx)
            .expect("Dangling Ptr: object has been deallocated")
            .borrow()
    }

    /// Return a RefMut to the pointee.
    /// This mutably borrows from a RefCell and the borrow is live
    /// as long as the returned RefMut lives.
    pub fn deref_mut(&self, ctx: &'a Context) -> RefMut<'a, T> {
        T::get_arena(ctx)
            .get(self.idx)
            .expect("Dangling Ptr: object has been deallocated")
            .borrow_mut()
    }

    /// Try and return a Ref to the pointee.
    /// Returns [None] if the pointee is deallocated or already mutably borrowed.
    pub fn try_deref(&self, ctx: &'a Context) -> Option<Ref<'a, T>> {
        T::get_arena(ctx).get(self.idx)?.try_borrow().ok()
    }

    /// Is the pointee still allocated?
    pub fn is_live(&self, ctx: &Context) -> bool {
        T::get_arena(ctx).contains_key(self.idx)
    }

    /// Create a unique (to the arena) name based on the arena index.
    pub(crate) fn make_name(&self, name_base: &str) -> String {
        let raw = slotmap::Key::data(&self.idx).as_ffi();
        format!("{}_{}_{}", name_base, raw & 0xffff_ffff, raw >> 32)
    }
}

impl<T: ArenaObj> Clone for Ptr<T> {
    fn clone(&self) -> Ptr<T> {
        *self
    }
}

impl<T: ArenaObj> Copy for Ptr<T> {}

impl<T: ArenaObj> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T: ArenaObj> Eq for Ptr<T> {}

impl<T: ArenaObj + 'static> Hash for Ptr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        TypeId::of::<T>().hash(state);
        self.idx.hash(state);
    }
}

impl<T: ArenaObj> fmt::Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.make_name("Ptr"))
    }
}
