use std::fmt;

use crate::{
    context::Context,
    impl_attr,
    printable::{self, Printable},
    r#type::{Type, Typed},
};

/// An attribute containing a string.
/// Similar to MLIR's [StringAttr](https://mlir.llvm.org/docs/Dialects/Builtin/#stringattr).
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct StringAttr(String);

impl StringAttr {
    /// Create a new [StringAttr].
    pub fn new(value: &str) -> Self {
        StringAttr(value.to_string())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<StringAttr> for String {
    fn from(value: StringAttr) -> Self {
        value.0
    }
}

impl Printable for StringAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl_attr!(StringAttr);

/// An integer constant, with its integer type.
/// Similar to MLIR's [IntegerAttr](https://mlir.llvm.org/docs/Dialects/Builtin/#integerattr).
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct IntegerAttr {
    ty: Type,
    val: i64,
}

impl IntegerAttr {
    /// Create a new [IntegerAttr].
    pub fn new(ty: Type, val: i64) -> Self {
        IntegerAttr { ty, val }
    }

    pub fn value(&self) -> i64 {
        self.val
    }
}

impl Typed for IntegerAttr {
    fn get_type(&self, _ctx: &Context) -> Type {
        self.ty.clone()
    }
}

impl Printable for IntegerAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "<{}: {}>", self.val, self.ty)
    }
}

impl_attr!(IntegerAttr);

/// An attribute holding a [Type].
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct TypeAttr(Type);

impl TypeAttr {
    pub fn new(ty: Type) -> Self {
        TypeAttr(ty)
    }
}

impl Typed for TypeAttr {
    fn get_type(&self, _ctx: &Context) -> Type {
        self.0.clone()
    }
}

impl Printable for TypeAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_attr!(TypeAttr);
