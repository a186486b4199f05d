//! Utility traits such as [Verify].

use crate::{context::Context, result::Result};

/// Check and ensure correctness.
pub trait Verify {
    fn verify(&self, ctx: &Context) -> Result<()>;
}

/// Implement [Verify] for a type that is always valid.
#[macro_export]
macro_rules! impl_verify_succ {
    ($op_name:path) => {
        impl $crate::common_traits::Verify for $op_name {
            fn verify(&self, _ctx: &$crate::context::Context) -> $crate::result::Result<()> {
                Ok(())
            }
        }
    };
}
