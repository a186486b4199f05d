//! IR objects that are to be printed must implement [Printable].
//!
//! Values and blocks that have no name of their own are numbered in the
//! order they are first printed. Printed IR therefore only depends on the
//! structure of the IR and not on where its objects live in the [Context].

use std::{
    cell::RefCell,
    fmt::{self, Display},
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::{basic_block::BasicBlock, context::{Context, Ptr}, value::Value};

struct StateInner {
    // Number of spaces per indentation
    indent_width: u16,
    // Current indentation
    cur_indent: u16,
    // Names handed out to values so far.
    value_names: FxHashMap<Value, String>,
    next_value_num: usize,
    // Labels handed out to blocks so far.
    block_labels: FxHashMap<Ptr<BasicBlock>, String>,
    next_block_num: usize,
}

impl Default for StateInner {
    fn default() -> Self {
        Self {
            indent_width: 2,
            cur_indent: 0,
            value_names: FxHashMap::default(),
            next_value_num: 0,
            block_labels: FxHashMap::default(),
            next_block_num: 0,
        }
    }
}

/// A light weight reference counted wrapper around a state for [Printable].
#[derive(Default)]
pub struct State(Rc<RefCell<StateInner>>);

impl State {
    /// Get another handle to the same underlying state.
    pub fn share(&self) -> Self {
        State(Rc::clone(&self.0))
    }

    /// Number of spaces per indentation
    pub fn get_indent_width(&self) -> u16 {
        self.0.as_ref().borrow().indent_width
    }

    /// Set the current indentation width
    pub fn set_indent_width(&self, indent_width: u16) {
        self.0.as_ref().borrow_mut().indent_width = indent_width;
    }

    /// What's the indentation we're at right now?
    pub fn get_current_indent(&self) -> u16 {
        self.0.as_ref().borrow().cur_indent
    }

    /// Increase the current indentation by [Self::get_indent_width]
    pub fn push_indent(&self) {
        let mut inner = self.0.as_ref().borrow_mut();
        inner.cur_indent += inner.indent_width;
    }

    /// Decrease the current indentation by [Self::get_indent_width].
    pub fn pop_indent(&self) {
        let mut inner = self.0.as_ref().borrow_mut();
        inner.cur_indent -= inner.indent_width;
    }

    /// Name `value` at its definition. Debug names are preferred,
    /// anything else gets the next free number.
    pub fn define_value(&self, ctx: &Context, value: Value) -> String {
        let mut inner = self.0.as_ref().borrow_mut();
        if let Some(name) = inner.value_names.get(&value) {
            return name.clone();
        }
        let name = match value.given_name(ctx) {
            Some(name) => name,
            None => {
                inner.next_value_num += 1;
                (inner.next_value_num - 1).to_string()
            }
        };
        inner.value_names.insert(value, name.clone());
        name
    }

    /// Name of `value` at a use. Values not (yet) defined in this
    /// print are shown with their debug name, or as unknown.
    pub fn use_value(&self, ctx: &Context, value: Value) -> String {
        let inner = self.0.as_ref().borrow();
        inner
            .value_names
            .get(&value)
            .cloned()
            .or_else(|| value.given_name(ctx))
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    /// Label of `block`, allocating one if it has none yet.
    pub fn block_label(&self, ctx: &Context, block: Ptr<BasicBlock>) -> String {
        let mut inner = self.0.as_ref().borrow_mut();
        if let Some(label) = inner.block_labels.get(&block) {
            return label.clone();
        }
        let label = match block.deref(ctx).get_label() {
            Some(label) => label.to_string(),
            None => {
                inner.next_block_num += 1;
                format!("bb{}", inner.next_block_num - 1)
            }
        };
        inner.block_labels.insert(block, label.clone());
        label
    }
}

/// All statements in the block are indented during [fmt](Printable::fmt).
/// Simply wraps the block with [State::push_indent] and [State::pop_indent].
#[macro_export]
macro_rules! indented_block {
    ($state:ident, { $($tt:tt)* }) => {
        $state.push_indent();
        $($tt)*
        $state.pop_indent();
    }
}

/// An object that implements [Display].
struct Displayable<'t, 'c, T: Printable + ?Sized> {
    t: &'t T,
    ctx: &'c Context,
    state: State,
}

impl<T: Printable + ?Sized> Display for Displayable<'_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.t.fmt(self.ctx, &self.state, f)
    }
}

/// Easy printing of IR objects.
///
/// [disp](Self::disp) calls [print](Self::print) with a default [State],
/// but otherwise, are both equivalent.
///
/// Example:
/// ```
/// use ssa_rewrite::{context::Context, printable::{State, Printable}};
/// use std::fmt;
/// struct S {
///     i: i64,
/// }
/// impl Printable for S {
///     fn fmt(&self, _ctx: &Context, _state: &State, f: &mut fmt::Formatter<'_>)
///     -> fmt::Result
///     {
///         write!(f, "{}", self.i)
///     }
/// }
///
/// let ctx = Context::new();
/// assert!(S { i: 108 }.disp(&ctx).to_string() == "108");
/// let state = State::default();
/// assert!(S { i: 0 }.print(&ctx, &state).to_string() == "0");
/// ```
pub trait Printable {
    fn fmt(&self, ctx: &Context, state: &State, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Get a [Display]'able object from the given [Context] and default [State].
    fn disp<'t, 'c>(&'t self, ctx: &'c Context) -> Box<dyn Display + 'c>
    where
        't: 'c,
    {
        self.print(ctx, &State::default())
    }

    /// Get a [Display]'able object from the given [Context] and [State].
    fn print<'t, 'c>(&'t self, ctx: &'c Context, state: &State) -> Box<dyn Display + 'c>
    where
        't: 'c,
    {
        Box::new(Displayable {
            t: self,
            ctx,
            state: state.share(),
        })
    }
}

/// Implement [Printable] for a type that already implements [Display].
#[macro_export]
macro_rules! impl_printable_for_display {
    ($ty_name:ty) => {
        impl $crate::printable::Printable for $ty_name {
            fn fmt(
                &self,
                _ctx: &$crate::context::Context,
                _state: &$crate::printable::State,
                f: &mut std::fmt::Formatter<'_>,
            ) -> std::fmt::Result {
                write!(f, "{}", self)
            }
        }
    };
}

impl_printable_for_display!(&str);
impl_printable_for_display!(String);
impl_printable_for_display!(usize);
impl_printable_for_display!(i64);

impl<T: Printable + ?Sized> Printable for &T {
    fn fmt(&self, ctx: &Context, state: &State, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (*self).fmt(ctx, state, f)
    }
}

#[derive(Clone, Copy)]
/// When printing lists, how must they be separated
pub enum ListSeparator {
    /// No separator
    None,
    /// Newline
    Newline,
    /// Single character
    Char(char),
    /// Single character followed by a space
    CharSpace(char),
}

impl Printable for ListSeparator {
    fn fmt(&self, _ctx: &Context, state: &State, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSeparator::None => Ok(()),
            ListSeparator::Newline => fmt_indented_newline(state, f),
            ListSeparator::Char(c) => write!(f, "{c}"),
            ListSeparator::CharSpace(c) => write!(f, "{c} "),
        }
    }
}

/// Iterate over [Item](Iterator::Item)s in an [Iterator] and print them.
pub fn fmt_iter<I>(
    mut iter: I,
    ctx: &Context,
    state: &State,
    sep: ListSeparator,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result
where
    I: Iterator,
    I::Item: Printable,
{
    if let Some(first) = iter.next() {
        first.fmt(ctx, state, f)?;
    }
    for item in iter {
        sep.fmt(ctx, state, f)?;
        item.fmt(ctx, state, f)?;
    }
    Ok(())
}

/// Print a new line followed by indentation as per current state.
pub fn fmt_indented_newline(state: &State, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let align = state.get_current_indent().into();
    write!(f, "\n{:>align$}", "")?;
    Ok(())
}
