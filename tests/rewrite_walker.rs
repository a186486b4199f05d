use expect_test::expect;
use ssa_rewrite::{
    arg_err,
    builtin::ops::{ModuleOp, ReturnOp},
    common_traits::Verify,
    context::Context,
    op::Op,
    operation::Operation,
    result::{ErrorKind, Result},
    rewrite::{
        updater::ResultCountMismatchErr, walker::RootNotModuleErr, AnonymousRewritePattern,
        PatternRewriteWalker, RewriteAction, RewritePattern, RewritePatternSet,
    },
};

use crate::common::{
    add_zero_module, add_zero_pattern, append, print_module, producer, result_of, setup_context,
    AOp, BOp, COp, MultiOp, UseOp, WrapOp,
};

mod common;

fn arena_counts(ctx: &Context) -> [usize; 4] {
    [
        ctx.num_operations(),
        ctx.num_regions(),
        ctx.num_blocks(),
        ctx.num_values(),
    ]
}

/// `f(x) = x + 0` in a module, next to a region holding `test.a` and its use.
fn nested_module(ctx: &mut Context) -> ModuleOp {
    let (module, _) = add_zero_module(ctx);
    let wrap = WrapOp::new(ctx);
    module.append_operation(ctx, wrap.get_operation());
    let body = wrap.get_body(ctx);
    let a = append(body, producer::<AOp>(ctx), ctx);
    let a_res = result_of(ctx, a);
    let use_op = UseOp::new(ctx, vec![a_res]);
    append(body, use_op, ctx);
    module
}

fn never_match() -> impl RewritePattern {
    AnonymousRewritePattern::new(|_ctx, _op, _opds| Ok(None))
}

#[test]
fn x_plus_zero_is_x() -> Result<()> {
    let ctx = &mut setup_context();
    let (module, func) = add_zero_module(ctx);
    module.get_operation().verify(ctx)?;
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            builtin.func() [function_type = (i32) -> (i32), sym_name = "f"] {
              ^entry(%x: i32):
                %0 = arith.constant() [value = <0: i32>] : i32
                %1 = arith.addi(%x, %0) : i32
                builtin.return(%1)
            }
        }"#]]
    .assert_eq(&print_module(ctx, module));

    let entry = func.get_entry_block(ctx);
    let add = entry.deref(ctx).iter().nth(1).unwrap();

    let mut walker = PatternRewriteWalker::new(add_zero_pattern());
    let module = walker.rewrite_module(ctx, module)?;
    module.get_operation().verify(ctx)?;
    assert_eq!(walker.num_rewrites(), 1);
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            builtin.func() [function_type = (i32) -> (i32), sym_name = "f"] {
              ^entry(%x: i32):
                %0 = arith.constant() [value = <0: i32>] : i32
                builtin.return(%x)
            }
        }"#]]
    .assert_eq(&print_module(ctx, module));

    // The return now uses the function's argument, and the addition is gone.
    let ret = func.get_entry_block(ctx).deref(ctx).get_tail().unwrap();
    assert!(Operation::isa::<ReturnOp>(ret, ctx));
    assert_eq!(ret.deref(ctx).get_operand(0), func.get_argument(ctx, 0));
    assert!(!add.is_live(ctx));
    Ok(())
}

#[test]
fn x_plus_zero_regions_first() -> Result<()> {
    let ctx = &mut setup_context();
    let (module, _) = add_zero_module(ctx);
    let mut walker = PatternRewriteWalker::new(add_zero_pattern()).walk_regions_first(true);
    let module = walker.rewrite_module(ctx, module)?;
    module.get_operation().verify(ctx)?;
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            builtin.func() [function_type = (i32) -> (i32), sym_name = "f"] {
              ^entry(%x: i32):
                %0 = arith.constant() [value = <0: i32>] : i32
                builtin.return(%x)
            }
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

#[test]
fn no_match_keeps_structure() -> Result<()> {
    for walk_regions_first in [false, true] {
        let ctx = &mut setup_context();
        let module = nested_module(ctx);
        module.get_operation().verify(ctx)?;
        let before = print_module(ctx, module);
        let ops_before = ctx.num_operations();

        let mut walker =
            PatternRewriteWalker::new(never_match()).walk_regions_first(walk_regions_first);
        let rewritten = walker.rewrite_module(ctx, module)?;
        rewritten.get_operation().verify(ctx)?;
        assert_eq!(rewritten, module);
        assert_eq!(walker.num_rewrites(), 0);
        assert!(walker.updater().is_empty());
        assert_eq!(ctx.num_operations(), ops_before);
        assert_eq!(print_module(ctx, rewritten), before);
    }

    let ctx = &mut setup_context();
    let module = nested_module(ctx);
    PatternRewriteWalker::new(never_match()).rewrite_module(ctx, module)?;
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            builtin.func() [function_type = (i32) -> (i32), sym_name = "f"] {
              ^entry(%x: i32):
                %0 = arith.constant() [value = <0: i32>] : i32
                %1 = arith.addi(%x, %0) : i32
                builtin.return(%1)
            }
            test.wrap() {
              ^body():
                %2 = test.a() : i32
                test.use(%2)
            }
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

#[test]
fn walks_are_deterministic() -> Result<()> {
    let run = || -> Result<String> {
        let ctx = &mut setup_context();
        let module = nested_module(ctx);
        let module = PatternRewriteWalker::new(add_zero_pattern()).rewrite_module(ctx, module)?;
        Ok(print_module(ctx, module))
    };
    let first = run()?;
    assert_eq!(first, run()?);

    // Rewriting the output again changes nothing more.
    let ctx = &mut setup_context();
    let module = nested_module(ctx);
    let mut walker = PatternRewriteWalker::new(add_zero_pattern());
    let module = walker.rewrite_module(ctx, module)?;
    let module = walker.rewrite_module(ctx, module)?;
    assert_eq!(walker.num_rewrites(), 0);
    assert_eq!(print_module(ctx, module), first);
    Ok(())
}

#[test]
fn result_count_must_match() {
    for k in 1..=3 {
        for supplied in 0..=4 {
            let ctx = &mut setup_context();
            let module = ModuleOp::new(ctx, "m");
            let body = module.get_body(ctx);
            let a = append(body, producer::<AOp>(ctx), ctx);
            let a_res = result_of(ctx, a);
            let multi = append(body, MultiOp::new(ctx, k), ctx);
            let multi_results: Vec<_> = multi.get_operation().deref(ctx).results().collect();
            let use_op = append(body, UseOp::new(ctx, multi_results), ctx);

            let mut walker =
                PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
                    if !Operation::isa::<MultiOp>(op, ctx) {
                        return Ok(None);
                    }
                    Ok(Some(RewriteAction::replace_with_values(vec![a_res; supplied])))
                }));
            let res = walker.rewrite_module(ctx, module);

            if supplied == k {
                res.unwrap();
                let operands: Vec<_> = use_op.get_operation().deref(ctx).operands().collect();
                assert_eq!(operands, vec![a_res; k]);
                continue;
            }
            let err = res.unwrap_err();
            assert_eq!(err.kind, ErrorKind::ContractViolation);
            let typed = err.err.downcast_ref::<ResultCountMismatchErr>().unwrap();
            assert_eq!(typed.opid, "test.multi");
            assert_eq!((typed.expected, typed.found), (k, supplied));
        }
    }
}

#[test]
fn replacement_reaches_later_uses() -> Result<()> {
    let ctx = &mut setup_context();
    let module = ModuleOp::new(ctx, "m");
    let body = module.get_body(ctx);
    let a = append(body, producer::<AOp>(ctx), ctx);
    let a_res = result_of(ctx, a);
    let use_op = append(body, UseOp::new(ctx, vec![a_res]), ctx);

    let mut walker = PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
        if !Operation::isa::<AOp>(op, ctx) {
            return Ok(None);
        }
        let b = producer::<BOp>(ctx);
        Ok(Some(RewriteAction::new(ctx, vec![b.get_operation()])))
    }));
    let module = walker.rewrite_module(ctx, module)?;
    module.get_operation().verify(ctx)?;

    let first = module.get_body(ctx).deref(ctx).iter().next().unwrap();
    let b = Operation::get_op::<BOp>(first, ctx).unwrap();
    assert_eq!(
        use_op.get_operation().deref(ctx).get_operand(0),
        Some(result_of(ctx, b))
    );
    assert!(!a.get_operation().is_live(ctx));
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            %0 = test.b() : i32
            test.use(%0)
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

#[test]
fn erase_unused_ops() -> Result<()> {
    let ctx = &mut setup_context();
    let module = ModuleOp::new(ctx, "m");
    let body = module.get_body(ctx);
    let a = append(body, producer::<AOp>(ctx), ctx);
    let a_res = result_of(ctx, a);
    let use1 = append(body, UseOp::new(ctx, vec![a_res]), ctx);
    let use2 = append(body, UseOp::new(ctx, vec![a_res, a_res]), ctx);

    let mut walker = PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
        Ok(Operation::isa::<UseOp>(op, ctx).then(RewriteAction::erase))
    }));
    let module = walker.rewrite_module(ctx, module)?;
    module.get_operation().verify(ctx)?;
    assert_eq!(walker.num_rewrites(), 2);
    assert!(!use1.get_operation().is_live(ctx));
    assert!(!use2.get_operation().is_live(ctx));
    assert_eq!(ctx.num_operations(), 2);
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            %0 = test.a() : i32
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

#[test]
fn cascading_rewrites_resolve_to_the_last() -> Result<()> {
    let ctx = &mut setup_context();
    let module = ModuleOp::new(ctx, "m");
    let body = module.get_body(ctx);
    let a = append(body, producer::<AOp>(ctx), ctx);
    let a_res = result_of(ctx, a);
    let use_op = append(body, UseOp::new(ctx, vec![a_res]), ctx);

    // a -> b, then b -> c, as two separate patterns.
    let mut patterns = RewritePatternSet::new();
    patterns
        .add(AnonymousRewritePattern::new(|ctx, op, _opds| {
            if !Operation::isa::<AOp>(op, ctx) {
                return Ok(None);
            }
            let b = producer::<BOp>(ctx);
            Ok(Some(RewriteAction::new(ctx, vec![b.get_operation()])))
        }))
        .add(AnonymousRewritePattern::new(|ctx, op, _opds| {
            if !Operation::isa::<BOp>(op, ctx) {
                return Ok(None);
            }
            let c = producer::<COp>(ctx);
            Ok(Some(RewriteAction::new(ctx, vec![c.get_operation()])))
        }));

    let mut walker = PatternRewriteWalker::new(patterns);
    let module = walker.rewrite_module(ctx, module)?;
    module.get_operation().verify(ctx)?;
    assert_eq!(walker.num_rewrites(), 2);

    let ops: Vec<_> = module.get_body(ctx).deref(ctx).iter().collect();
    assert_eq!(ops.len(), 2);
    let c = Operation::get_op::<COp>(ops[0], ctx).unwrap();
    let c_res = result_of(ctx, c);
    // The use skips the intermediate b entirely.
    assert_eq!(walker.updater().resolve(a_res), c_res);
    assert_eq!(use_op.get_operation().deref(ctx).get_operand(0), Some(c_res));
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            %0 = test.c() : i32
            test.use(%0)
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

fn offered_kinds(walk_regions_first: bool) -> Result<Vec<String>> {
    let ctx = &mut setup_context();
    let module = ModuleOp::new(ctx, "m");
    let wrap = append(module.get_body(ctx), WrapOp::new(ctx), ctx);
    append(wrap.get_body(ctx), producer::<AOp>(ctx), ctx);

    let mut offered = vec![];
    let recorder = AnonymousRewritePattern::new(|ctx, op, _opds| {
        offered.push(op.deref(ctx).get_opid().to_string());
        Ok(None)
    });
    PatternRewriteWalker::new(recorder)
        .walk_regions_first(walk_regions_first)
        .rewrite_module(ctx, module)?;
    Ok(offered)
}

#[test]
fn traversal_order() -> Result<()> {
    assert_eq!(
        offered_kinds(false)?,
        vec!["builtin.module", "test.wrap", "test.a"]
    );
    assert_eq!(
        offered_kinds(true)?,
        vec!["test.a", "test.wrap", "builtin.module"]
    );
    Ok(())
}

/// Removes every `test.use`, and every `test.wrap` whose body is empty.
fn erase_uses_then_empty_wraps(ctx: &mut Context, walk_regions_first: bool) -> Result<ModuleOp> {
    let module = ModuleOp::new(ctx, "m");
    let outer = append(module.get_body(ctx), WrapOp::new(ctx), ctx);
    append(outer.get_body(ctx), UseOp::new(ctx, vec![]), ctx);

    let mut walker = PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
        if Operation::isa::<UseOp>(op, ctx) {
            return Ok(Some(RewriteAction::erase()));
        }
        let empty_wrap = Operation::get_op::<WrapOp>(op, ctx)
            .is_some_and(|wrap| wrap.get_body(ctx).deref(ctx).get_num_ops() == 0);
        Ok(empty_wrap.then(RewriteAction::erase))
    }))
    .walk_regions_first(walk_regions_first);
    walker.rewrite_module(ctx, module)
}

#[test]
fn regions_first_sees_simplified_regions() -> Result<()> {
    let ctx = &mut setup_context();
    let module = erase_uses_then_empty_wraps(ctx, true)?;
    module.get_operation().verify(ctx)?;
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
        }"#]]
    .assert_eq(&print_module(ctx, module));

    let ctx = &mut setup_context();
    let module = erase_uses_then_empty_wraps(ctx, false)?;
    module.get_operation().verify(ctx)?;
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            test.wrap() {
              ^body():
            }
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

#[test]
fn splitting_the_root_fails() {
    let ctx = &mut setup_context();
    let module = ModuleOp::new(ctx, "m");
    let mut walker = PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
        let is_original = Operation::get_op::<ModuleOp>(op, ctx)
            .is_some_and(|module| module.get_symbol_name(ctx).as_deref() == Some("m"));
        if !is_original {
            return Ok(None);
        }
        let first = ModuleOp::new(ctx, "m1").get_operation();
        let second = ModuleOp::new(ctx, "m2").get_operation();
        Ok(Some(RewriteAction::new(ctx, vec![first, second])))
    }));
    let err = walker.rewrite_module(ctx, module).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContractViolation);
    let typed = err.err.downcast_ref::<RootNotModuleErr>().unwrap();
    assert_eq!(typed.found, vec!["builtin.module", "builtin.module"]);
}

#[test]
fn pattern_errors_abort_the_walk() {
    let ctx = &mut setup_context();
    let module = nested_module(ctx);
    let mut walker = PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
        if Operation::isa::<AOp>(op, ctx) {
            return arg_err!("cannot rewrite {}", op.deref(ctx).get_opid());
        }
        Ok(None)
    }));
    let before = print_module(ctx, module);
    let counts_before = arena_counts(ctx);
    let err = walker.rewrite_module(ctx, module).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
    assert_eq!(err.err.to_string(), "cannot rewrite test.a");

    module.get_operation().verify(ctx).unwrap();
    assert_eq!(print_module(ctx, module), before);
    assert_eq!(arena_counts(ctx), counts_before);
}

// Rewrites done before the failure are undone too, and what they built is freed.
#[test]
fn failed_walk_leaves_the_ir_untouched() {
    for walk_regions_first in [false, true] {
        let ctx = &mut setup_context();
        let (module, _) = add_zero_module(ctx);
        let body = module.get_body(ctx);
        let b = append(body, producer::<BOp>(ctx), ctx);
        let b_res = result_of(ctx, b);
        append(body, UseOp::new(ctx, vec![b_res]), ctx);
        let wrap = append(body, WrapOp::new(ctx), ctx);
        append(wrap.get_body(ctx), producer::<AOp>(ctx), ctx);

        let before = print_module(ctx, module);
        let counts_before = arena_counts(ctx);

        let mut patterns = RewritePatternSet::new();
        patterns
            .add(add_zero_pattern())
            .add(AnonymousRewritePattern::new(|ctx, op, _opds| {
                if !Operation::isa::<BOp>(op, ctx) {
                    return Ok(None);
                }
                let c = producer::<COp>(ctx);
                Ok(Some(RewriteAction::new(ctx, vec![c.get_operation()])))
            }))
            .add(AnonymousRewritePattern::new(|ctx, op, _opds| {
                if Operation::isa::<AOp>(op, ctx) {
                    return arg_err!("cannot rewrite {}", op.deref(ctx).get_opid());
                }
                Ok(None)
            }));
        let mut walker =
            PatternRewriteWalker::new(patterns).walk_regions_first(walk_regions_first);
        let err = walker.rewrite_module(ctx, module).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        module.get_operation().verify(ctx).unwrap();
        assert_eq!(print_module(ctx, module), before);
        assert_eq!(arena_counts(ctx), counts_before);
        assert_eq!(b.get_operation().deref(ctx).get_container(), Some(body));
        assert_eq!(walker.num_rewrites(), 0);
        assert!(walker.updater().is_empty());
    }
}

// A pattern may hand the matched operation back, next to new ones.
#[test]
fn matched_op_handed_back_is_kept() -> Result<()> {
    let ctx = &mut setup_context();
    let module = ModuleOp::new(ctx, "m");
    let body = module.get_body(ctx);
    let a = append(body, producer::<AOp>(ctx), ctx);
    let a_res = result_of(ctx, a);
    append(body, UseOp::new(ctx, vec![a_res]), ctx);

    let mut seen = false;
    let mut walker = PatternRewriteWalker::new(AnonymousRewritePattern::new(|ctx, op, _opds| {
        if seen || !Operation::isa::<AOp>(op, ctx) {
            return Ok(None);
        }
        seen = true;
        let b = producer::<BOp>(ctx);
        Ok(Some(RewriteAction::new(ctx, vec![b.get_operation(), op])))
    }));
    let module = walker.rewrite_module(ctx, module)?;
    assert_eq!(walker.num_rewrites(), 1);
    assert!(a.get_operation().is_live(ctx));
    module.get_operation().verify(ctx)?;
    expect![[r#"
        builtin.module() [sym_name = "m"] {
          ^bb0():
            %0 = test.b() : i32
            %1 = test.a() : i32
            test.use(%1)
        }"#]]
    .assert_eq(&print_module(ctx, module));
    Ok(())
}

#[test]
fn rebuilt_regions_do_not_alias_old_ones() -> Result<()> {
    let ctx = &mut setup_context();
    let (module, func) = add_zero_module(ctx);
    let old_module_region = module.get_operation().deref(ctx).get_region(0).unwrap();
    let old_entry = func.get_entry_block(ctx);
    let old_ops: Vec<_> = old_entry.deref(ctx).iter().collect();

    let mut walker = PatternRewriteWalker::new(add_zero_pattern()).reclaim_discarded(false);
    let module = walker.rewrite_module(ctx, module)?;

    let new_entry = func.get_entry_block(ctx);
    assert_ne!(new_entry, old_entry);
    assert_ne!(
        module.get_operation().deref(ctx).get_region(0),
        Some(old_module_region)
    );
    // The discarded block still holds exactly what it held, the addition included.
    assert!(old_entry.is_live(ctx));
    assert_eq!(old_entry.deref(ctx).iter().collect::<Vec<_>>(), old_ops);
    assert!(old_ops[1].is_live(ctx));
    // Block arguments move over to the new block unchanged.
    assert_eq!(
        old_entry.deref(ctx).get_argument(0),
        new_entry.deref(ctx).get_argument(0)
    );
    Ok(())
}
