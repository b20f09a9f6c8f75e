//! The scripting language: tokens, expressions and whole scripts.
//!
//! [`Script`] runs Praat scripts against an object list; [`Formula`] is the
//! cell-by-cell expression used by `Formula` commands.

mod expr;
mod lexer;
mod script;

pub use expr::{evaluate, is_call, parse, BinOp, Expr, Formula, Scope, Val, Variables};
pub use script::{FieldKind, FormField, Script};
