use std::marker::PhantomData;

use crate::{
    context::{Context, Ptr},
    op::Op,
    operation::Operation,
    result::Result,
    value::Value,
};

use super::action::RewriteAction;

/// A side-effect free rewrite pattern, matching on one operation at a time.
///
/// Implementations must not modify `op` or anything nested in it.
/// The context is mutable only so that replacement operations can be built.
/// Replacements are expected to be newly created, detached operations.
/// An operation that is already in the IR may be listed as well, `op`
/// included: it then stays alive wherever it ends up.
pub trait RewritePattern {
    /// Match `op`, and optionally return a rewrite to be performed.
    /// `live_operands` are the current values of `op`'s operands: earlier
    /// rewrites in the walk may have replaced the values `op` still refers to.
    /// Returns `Ok(None)` if the pattern does not match. Errors abort the walk.
    fn match_and_rewrite(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
        live_operands: &[Value],
    ) -> Result<Option<RewriteAction>>;
}

impl<P: RewritePattern + ?Sized> RewritePattern for Box<P> {
    fn match_and_rewrite(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
        live_operands: &[Value],
    ) -> Result<Option<RewriteAction>> {
        (**self).match_and_rewrite(ctx, op, live_operands)
    }
}

impl<P: RewritePattern + ?Sized> RewritePattern for &mut P {
    fn match_and_rewrite(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
        live_operands: &[Value],
    ) -> Result<Option<RewriteAction>> {
        (**self).match_and_rewrite(ctx, op, live_operands)
    }
}

/// A rewrite pattern encoded by a closure.
pub struct AnonymousRewritePattern<F> {
    func: F,
}

impl<F> AnonymousRewritePattern<F>
where
    F: FnMut(&mut Context, Ptr<Operation>, &[Value]) -> Result<Option<RewriteAction>>,
{
    pub fn new(func: F) -> Self {
        AnonymousRewritePattern { func }
    }
}

impl<F> RewritePattern for AnonymousRewritePattern<F>
where
    F: FnMut(&mut Context, Ptr<Operation>, &[Value]) -> Result<Option<RewriteAction>>,
{
    fn match_and_rewrite(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
        live_operands: &[Value],
    ) -> Result<Option<RewriteAction>> {
        (self.func)(ctx, op, live_operands)
    }
}

/// A rewrite pattern that only looks at operations of kind `O`.
/// Any other operation is reported as not matching, without calling `func`.
///
/// ```
/// use ssa_rewrite::{
///     arith::ConstantOp, context::Context,
///     rewrite::{op_type_rewrite_pattern, RewriteAction, RewritePattern},
/// };
/// // Remove every constant, forwarding nothing in its place.
/// let mut pattern = op_type_rewrite_pattern(|_ctx, _op: ConstantOp, _opds| {
///     Ok(Some(RewriteAction::erase()))
/// });
/// # let _ = &mut pattern as &mut dyn RewritePattern;
/// ```
pub struct OpTypeRewritePattern<O: Op, F> {
    func: F,
    _op: PhantomData<fn(O)>,
}

impl<O, F> OpTypeRewritePattern<O, F>
where
    O: Op,
    F: FnMut(&mut Context, O, &[Value]) -> Result<Option<RewriteAction>>,
{
    pub fn new(func: F) -> Self {
        OpTypeRewritePattern {
            func,
            _op: PhantomData,
        }
    }
}

impl<O, F> RewritePattern for OpTypeRewritePattern<O, F>
where
    O: Op,
    F: FnMut(&mut Context, O, &[Value]) -> Result<Option<RewriteAction>>,
{
    fn match_and_rewrite(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
        live_operands: &[Value],
    ) -> Result<Option<RewriteAction>> {
        match Operation::get_op::<O>(op, ctx) {
            Some(typed_op) => (self.func)(ctx, typed_op, live_operands),
            None => Ok(None),
        }
    }
}

/// Build an [OpTypeRewritePattern], taking the op kind from `func`'s signature.
pub fn op_type_rewrite_pattern<O, F>(func: F) -> OpTypeRewritePattern<O, F>
where
    O: Op,
    F: FnMut(&mut Context, O, &[Value]) -> Result<Option<RewriteAction>>,
{
    OpTypeRewritePattern::new(func)
}

/// A pattern made of other patterns. Each operation is offered to the
/// member patterns in the order they were added, and the first match wins.
#[derive(Default)]
pub struct RewritePatternSet<'a> {
    patterns: Vec<Box<dyn RewritePattern + 'a>>,
}

impl<'a> RewritePatternSet<'a> {
    pub fn new() -> Self {
        Self { patterns: vec![] }
    }

    /// Add a pattern, with a lower priority than the ones already added.
    pub fn add<P: RewritePattern + 'a>(&mut self, pattern: P) -> &mut Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl RewritePattern for RewritePatternSet<'_> {
    fn match_and_rewrite(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
        live_operands: &[Value],
    ) -> Result<Option<RewriteAction>> {
        for pattern in self.patterns.iter_mut() {
            if let Some(action) = pattern.match_and_rewrite(ctx, op, live_operands)? {
                return Ok(Some(action));
            }
        }
        Ok(None)
    }
}
