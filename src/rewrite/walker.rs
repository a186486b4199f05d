//! Drive a [RewritePattern] over a whole IR tree.

use log::{debug, trace};
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{
    basic_block::BasicBlock,
    builtin::ops::ModuleOp,
    context::{Context, Ptr},
    contract_err,
    op::Op,
    operation::Operation,
    region::Region,
    result::Result,
    value::{DefSite, Value},
};

use super::{pattern::RewritePattern, updater::OperandUpdater};

#[derive(Debug, Error)]
#[error(
    "rewriting the root must produce exactly one builtin.module, but produced [{}]",
    .found.join(", ")
)]
pub struct RootNotModuleErr {
    /// Kinds of the operations the root was rewritten into.
    pub found: Vec<String>,
}

/// Options of a [PatternRewriteWalker].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Rewrite the regions of an operation before offering the operation
    /// itself to the pattern. Otherwise regions are rewritten afterwards,
    /// and only if the operation was not replaced.
    pub walk_regions_first: bool,
    /// Once a module is successfully rewritten, deallocate the operations
    /// that were replaced and the regions and blocks that were rebuilt.
    pub reclaim_discarded: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        WalkerConfig {
            walk_regions_first: false,
            reclaim_discarded: true,
        }
    }
}

/// An edit to an object that existed before the walk started.
enum Undo {
    Container {
        op: Ptr<Operation>,
        prev: Option<Ptr<BasicBlock>>,
    },
    Def {
        value: Value,
        prev: DefSite,
    },
    Operands {
        op: Ptr<Operation>,
        prev: Vec<Value>,
    },
    Regions {
        op: Ptr<Operation>,
        prev: Vec<Ptr<Region>>,
    },
}

/// Everything a walk did to the IR, so that a failed walk can be undone.
#[derive(Default)]
struct Journal {
    /// The operation the walk started at.
    root: Option<Ptr<Operation>>,
    undo: Vec<Undo>,
    /// Regions built by the walk.
    new_regions: Vec<Ptr<Region>>,
    /// Replacement operations that were detached when the pattern returned them.
    created_ops: Vec<Ptr<Operation>>,
}

impl Journal {
    fn note_created(&mut self, ctx: &Context, new_ops: &[Ptr<Operation>]) {
        for &op in new_ops {
            if Some(op) != self.root && op.deref(ctx).get_container().is_none() {
                self.created_ops.push(op);
            }
        }
    }

    /// Restore every edited object, then deallocate what the walk built.
    fn roll_back(self, ctx: &mut Context) {
        debug!(
            "Rolling back {} edit(s), {} new region(s) and {} new operation(s)",
            self.undo.len(),
            self.new_regions.len(),
            self.created_ops.len()
        );
        for undo in self.undo.into_iter().rev() {
            match undo {
                Undo::Container { op, prev } => op.deref_mut(ctx).container = prev,
                Undo::Def { value, prev } => value.set_def(ctx, prev),
                Undo::Operands { op, prev } => Operation::set_operands(op, ctx, prev),
                Undo::Regions { op, prev } => {
                    Operation::replace_regions(op, ctx, prev);
                }
            }
        }
        for region in self.new_regions {
            if region.is_live(ctx) {
                Region::dealloc_shell(region, ctx);
            }
        }
        for op in self.created_ops.into_iter().rev() {
            if op.is_live(ctx) {
                Operation::erase(op, ctx);
            }
        }
    }
}

/// Applies a [RewritePattern] to every operation of an IR tree, once,
/// in a single depth-first pass.
///
/// Operations created by a rewrite are offered to the pattern again right
/// away, so a pattern that keeps matching its own output never terminates.
/// Every region that is walked is rebuilt: the rewritten operation gets
/// new [Region]s and [BasicBlock]s, holding the surviving and the new
/// operations. Block arguments are carried over to the new blocks as is.
///
/// A walk that fails leaves the IR as it was before the walk. Replacement
/// operations handed over by the pattern are deallocated in that case.
pub struct PatternRewriteWalker<P: RewritePattern> {
    pattern: P,
    config: WalkerConfig,
    updater: OperandUpdater,
    num_rewrites: usize,
    matched_ops: Vec<Ptr<Operation>>,
    /// Matched operations that did not come back as a replacement.
    replaced_ops: FxHashSet<Ptr<Operation>>,
    discarded_regions: Vec<Ptr<Region>>,
    journal: Journal,
}

impl<P: RewritePattern> PatternRewriteWalker<P> {
    /// A walker with the default [WalkerConfig].
    pub fn new(pattern: P) -> Self {
        Self::with_config(pattern, WalkerConfig::default())
    }

    pub fn with_config(pattern: P, config: WalkerConfig) -> Self {
        PatternRewriteWalker {
            pattern,
            config,
            updater: OperandUpdater::new(),
            num_rewrites: 0,
            matched_ops: vec![],
            replaced_ops: FxHashSet::default(),
            discarded_regions: vec![],
            journal: Journal::default(),
        }
    }

    /// Set [WalkerConfig::walk_regions_first].
    pub fn walk_regions_first(mut self, walk_regions_first: bool) -> Self {
        self.config.walk_regions_first = walk_regions_first;
        self
    }

    /// Set [WalkerConfig::reclaim_discarded].
    pub fn reclaim_discarded(mut self, reclaim_discarded: bool) -> Self {
        self.config.reclaim_discarded = reclaim_discarded;
        self
    }

    pub fn config(&self) -> WalkerConfig {
        self.config
    }

    /// Number of matches so far, in the current or last walk.
    pub fn num_rewrites(&self) -> usize {
        self.num_rewrites
    }

    /// Substitutions recorded so far, in the current or last walk.
    pub fn updater(&self) -> &OperandUpdater {
        &self.updater
    }

    /// Take back the pattern.
    pub fn into_pattern(self) -> P {
        self.pattern
    }

    /// Rewrite `module` and everything nested in it.
    /// The rewrite must leave a single module in place of `module`,
    /// which is returned. Any error aborts the walk.
    pub fn rewrite_module(&mut self, ctx: &mut Context, module: ModuleOp) -> Result<ModuleOp> {
        self.updater = OperandUpdater::new();
        self.num_rewrites = 0;
        self.matched_ops.clear();
        self.replaced_ops.clear();
        self.discarded_regions.clear();

        debug!(
            "Rewriting module {}",
            module.get_symbol_name(ctx).unwrap_or_default()
        );
        let root = module.get_operation();
        let new_module = self.atomically(ctx, root, |walker, ctx| {
            let rewritten = walker.walk_op(ctx, root)?;
            let new_module = match rewritten.as_slice() {
                [root] => Operation::get_op::<ModuleOp>(*root, ctx),
                _ => None,
            };
            match new_module {
                Some(new_module) => Ok(new_module),
                None => contract_err!(RootNotModuleErr {
                    found: rewritten
                        .iter()
                        .map(|op| op.deref(ctx).get_opid().to_string())
                        .collect(),
                }),
            }
        })?;

        if self.config.reclaim_discarded {
            self.reclaim(ctx);
        }
        debug!(
            "Rewrote module {} with {} rewrite(s)",
            new_module.get_symbol_name(ctx).unwrap_or_default(),
            self.num_rewrites
        );
        Ok(new_module)
    }

    /// Rewrite `op`, and return the operations replacing it, in order.
    /// An operation that is not matched is returned as the only replacement
    /// of itself, with its operands and regions updated.
    pub fn rewrite_op(
        &mut self,
        ctx: &mut Context,
        op: Ptr<Operation>,
    ) -> Result<Vec<Ptr<Operation>>> {
        self.atomically(ctx, op, |walker, ctx| walker.walk_op(ctx, op))
    }

    /// Replace every region of `op` with a new one, holding the rewritten
    /// contents of the old region.
    pub fn rewrite_op_regions(&mut self, ctx: &mut Context, op: Ptr<Operation>) -> Result<()> {
        self.atomically(ctx, op, |walker, ctx| walker.walk_op_regions(ctx, op))
    }

    /// Run `walk` from `root`. If it fails, undo everything it did to the IR
    /// and to the walker's own bookkeeping.
    fn atomically<T>(
        &mut self,
        ctx: &mut Context,
        root: Ptr<Operation>,
        walk: impl FnOnce(&mut Self, &mut Context) -> Result<T>,
    ) -> Result<T> {
        let updater = self.updater.clone();
        let num_rewrites = self.num_rewrites;
        let num_matched = self.matched_ops.len();
        let num_discarded = self.discarded_regions.len();
        self.journal = Journal {
            root: Some(root),
            ..Journal::default()
        };

        let res = walk(self, ctx);
        let journal = std::mem::take(&mut self.journal);
        if res.is_err() {
            self.updater = updater;
            self.num_rewrites = num_rewrites;
            for op in self.matched_ops.drain(num_matched..) {
                self.replaced_ops.remove(&op);
            }
            self.discarded_regions.truncate(num_discarded);
            journal.roll_back(ctx);
        }
        res
    }

    fn walk_op(&mut self, ctx: &mut Context, op: Ptr<Operation>) -> Result<Vec<Ptr<Operation>>> {
        if self.config.walk_regions_first {
            self.walk_op_regions(ctx, op)?;
        }

        let live_operands = self.updater.live_operands(ctx, op);
        trace!("Offering {} to the pattern", op.deref(ctx).get_opid());
        let Some(action) = self.pattern.match_and_rewrite(ctx, op, &live_operands)? else {
            let operands: Vec<_> = op.deref(ctx).operands().collect();
            if operands != live_operands {
                self.journal.undo.push(Undo::Operands {
                    op,
                    prev: operands,
                });
                self.updater.rebind_operands(ctx, op);
            }
            // Matched earlier, and handed back by the pattern.
            self.replaced_ops.remove(&op);
            if !self.config.walk_regions_first {
                self.walk_op_regions(ctx, op)?;
            }
            return Ok(vec![op]);
        };

        debug!(
            "Replacing {} with {} operation(s)",
            op.deref(ctx).get_opid(),
            action.new_ops.len()
        );
        self.journal.note_created(ctx, &action.new_ops);
        self.updater.record_substitution(ctx, op, &action)?;
        self.num_rewrites += 1;
        self.matched_ops.push(op);
        self.replaced_ops.insert(op);

        let mut replacements = vec![];
        for new_op in action.new_ops {
            replacements.extend(self.walk_op(ctx, new_op)?);
        }
        Ok(replacements)
    }

    fn walk_op_regions(&mut self, ctx: &mut Context, op: Ptr<Operation>) -> Result<()> {
        let old_regions: Vec<_> = op.deref(ctx).regions().collect();
        if old_regions.is_empty() {
            return Ok(());
        }

        let mut new_regions = Vec::with_capacity(old_regions.len());
        for old_region in &old_regions {
            let new_region = Region::new(ctx);
            self.journal.new_regions.push(new_region);
            let old_blocks: Vec<_> = old_region.deref(ctx).iter().collect();
            for old_block in old_blocks {
                let (label, args, old_ops) = {
                    let blockref = old_block.deref(ctx);
                    (
                        blockref.get_label().map(str::to_string),
                        blockref.arguments().collect::<Vec<_>>(),
                        blockref.iter().collect::<Vec<_>>(),
                    )
                };
                for &arg in &args {
                    let prev = arg.get_def(ctx);
                    self.journal.undo.push(Undo::Def { value: arg, prev });
                }
                let new_block = BasicBlock::with_arguments(ctx, label.as_deref(), args);
                Region::append_block(new_region, ctx, new_block);
                for old_op in old_ops {
                    for new_op in self.walk_op(ctx, old_op)? {
                        let prev = new_op.deref(ctx).get_container();
                        self.journal.undo.push(Undo::Container { op: new_op, prev });
                        BasicBlock::adopt_operation(new_block, ctx, new_op);
                    }
                }
            }
            new_regions.push(new_region);
        }

        let discarded = Operation::replace_regions(op, ctx, new_regions);
        self.journal.undo.push(Undo::Regions {
            op,
            prev: discarded.clone(),
        });
        self.discarded_regions.extend(discarded);
        Ok(())
    }

    /// Deallocate what the last walk left behind.
    fn reclaim(&mut self, ctx: &mut Context) {
        let matched_ops = std::mem::take(&mut self.matched_ops);
        let replaced_ops = std::mem::take(&mut self.replaced_ops);
        let discarded_regions = std::mem::take(&mut self.discarded_regions);
        debug!(
            "Reclaiming {} replaced operation(s) and {} rebuilt region(s)",
            replaced_ops.len(),
            discarded_regions.len()
        );
        // Replaced operations may still be listed in the discarded blocks.
        for op in matched_ops {
            if replaced_ops.contains(&op) && op.is_live(ctx) {
                Operation::erase(op, ctx);
            }
        }
        for region in discarded_regions {
            if region.is_live(ctx) {
                Region::dealloc_shell(region, ctx);
            }
        }
    }
}
