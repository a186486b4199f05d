//! Attributes are non-SSA data stored in [Operation](crate::operation::Operation)s.
//!
//! See [MLIR Attributes](https://mlir.llvm.org/docs/LangRef/#attributes).
//! Attribute objects are boxed trait objects, not wrapped with [Ptr](crate::context::Ptr).
//! They are clonable (via [dyn_clone]) so that a rewrite pattern can copy
//! the attributes of a matched operation onto its replacement.
//!
//! [AttrObj]s can be downcast to their concrete types using
//! [downcast_rs](https://docs.rs/downcast-rs/1/downcast_rs/index.html).

use std::fmt;

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::DynClone;
use rustc_hash::FxHashMap;

use crate::{
    context::Context,
    printable::{self, Printable},
};

/// Basic functionality that every attribute in the IR must implement.
pub trait Attribute: Printable + fmt::Debug + Downcast + DynClone {
    /// Is self equal to an other Attribute?
    fn eq_attr(&self, other: &dyn Attribute) -> bool;
}
impl_downcast!(Attribute);
dyn_clone::clone_trait_object!(Attribute);

/// [Attribute] objects are boxed and stored in the IR.
pub type AttrObj = Box<dyn Attribute>;

impl PartialEq for AttrObj {
    fn eq(&self, other: &Self) -> bool {
        (**self).eq_attr(&**other)
    }
}

impl Eq for AttrObj {}

impl Printable for AttrObj {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        Printable::fmt(self.as_ref(), ctx, state, f)
    }
}

/// Implement [Attribute] for a type that is [Clone], [PartialEq] and [Printable].
#[macro_export]
macro_rules! impl_attr {
    ($attr_name:ty) => {
        impl $crate::attribute::Attribute for $attr_name {
            fn eq_attr(&self, other: &dyn $crate::attribute::Attribute) -> bool {
                other
                    .downcast_ref::<Self>()
                    .is_some_and(|other| other == self)
            }
        }
    };
}

/// A dictionary of attributes, keyed by name.
#[derive(Default, Clone, PartialEq, Eq, Debug)]
pub struct AttributeDict(pub FxHashMap<&'static str, AttrObj>);

impl AttributeDict {
    /// Get reference to attribute value that is mapped to key `k`.
    pub fn get<T: Attribute>(&self, k: &str) -> Option<&T> {
        self.0.get(k).and_then(|ao| ao.downcast_ref::<T>())
    }

    /// Get reference to attribute value that is mapped to key `k`.
    pub fn get_attr(&self, k: &str) -> Option<&AttrObj> {
        self.0.get(k)
    }

    /// Set the attribute value of key `k`.
    pub fn set<T: Attribute>(&mut self, k: &'static str, v: T) {
        self.0.insert(k, Box::new(v));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries sorted by key.
    pub fn sorted(&self) -> Vec<(&'static str, &AttrObj)> {
        let mut entries: Vec<_> = self.0.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }
}

impl Printable for AttributeDict {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "[")?;
        for (idx, (key, val)) in self.sorted().into_iter().enumerate() {
            if idx != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key} = {}", val.print(ctx, state))?;
        }
        write!(f, "]")
    }
}
