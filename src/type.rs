//! Types attached to SSA [Value](crate::value::Value)s.
//!
//! Types are plain values compared structurally. The IR does not
//! unique them in the [Context], since the rewrite engine only ever
//! forwards them.

use std::fmt;

use crate::context::Context;

/// Signedness semantics of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signed,
    Unsigned,
    Signless,
}

/// A type tag of an SSA value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// An integer of a fixed bit width.
    Integer { width: u32, signedness: Signedness },
    /// The type of a function: input types to result types.
    Function { inputs: Vec<Type>, results: Vec<Type> },
    /// The empty type.
    Unit,
}

impl Type {
    /// Get an integer type.
    pub fn integer(width: u32, signedness: Signedness) -> Type {
        Type::Integer { width, signedness }
    }

    /// Signless 32 bit integer.
    pub fn i32() -> Type {
        Self::integer(32, Signedness::Signless)
    }

    /// Signless 64 bit integer.
    pub fn i64() -> Type {
        Self::integer(64, Signedness::Signless)
    }

    /// Get a function type.
    pub fn function(inputs: Vec<Type>, results: Vec<Type>) -> Type {
        Type::Function { inputs, results }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Integer { .. })
    }
}

/// An object that has a [Type].
pub trait Typed {
    fn get_type(&self, ctx: &Context) -> Type;
}

impl Typed for Type {
    fn get_type(&self, _ctx: &Context) -> Type {
        self.clone()
    }
}

fn fmt_type_list(tys: &[Type], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (idx, ty) in tys.iter().enumerate() {
        if idx != 0 {
            write!(f, ", ")?;
        }
        write!(f, "{ty}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer { width, signedness } => {
                let prefix = match signedness {
                    Signedness::Signed => "si",
                    Signedness::Unsigned => "ui",
                    Signedness::Signless => "i",
                };
                write!(f, "{prefix}{width}")
            }
            Type::Function { inputs, results } => {
                fmt_type_list(inputs, f)?;
                write!(f, " -> ")?;
                fmt_type_list(results, f)
            }
            Type::Unit => write!(f, "()"),
        }
    }
}

crate::impl_printable_for_display!(Type);
