//! Pattern-directed rewriting of Java test sources.
//!
//! Sources are parsed into a lossless tree ([`tree`]) attributed against a
//! bundled classpath ([`classpath`]). Recipes ([`recipe`], [`rules`]) visit
//! the tree ([`visitor`]), build replacements from typed templates
//! ([`template`]) and queue import edits ([`imports`]). Printing an untouched
//! tree gives back the input byte for byte.

pub mod classpath;
pub mod context;
pub mod diff;
pub mod error;
pub mod imports;
pub mod matcher;
pub mod parse;
pub mod precondition;
pub mod recipe;
pub mod rules;
pub mod search;
pub mod sources;
pub mod template;
pub mod tree;
pub mod visitor;

#[cfg(test)]
mod tests;

pub use context::{Diagnostic, ExecutionContext, Severity};
pub use diff::{unified_diff, DiffStats};
pub use error::{RecipeError, Result, RewriteError};
pub use parse::JavaParser;
pub use recipe::{Recipe, RecipeRegistry, RecipeRun, RecipeRunner, RunConfig};
