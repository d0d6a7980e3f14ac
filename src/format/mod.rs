//! The prompt template language.
//!
//! A template mixes literal text, `$variable` references and conditional
//! groups. [`compile`] turns a template into an [`Ast`], [`Renderer`] walks
//! the tree against module results and produces styled [`Segment`]s.
//!
//! # Syntax
//!
//! ```text
//! on [$symbol$branch](bold purple) (@$region)
//! ```
//!
//! - `$name` / `${name}` substitutes a variable or expands a module.
//! - `[...](style)` is a group painted with `style`; `[...]` and `(...)` are
//!   groups that inherit the surrounding style.
//! - A group disappears when it references variables and all of them are
//!   absent.
//! - `\$ \[ \] \( \) \\` produce the literal character.

pub mod ast;
pub mod cache;
pub mod parser;
pub mod render;

pub use ast::{interpolate_style, style_variables, Ast, Group, Node};
pub use cache::FormatCache;
pub use parser::{compile, FormatError, FormatErrorKind};
pub use render::{paint_all, plain_text, Renderer, Segment, MAX_EXPANSION_DEPTH};
