//! <div align=center>
//!   <p><strong>railplate: the template engine behind RailHub Pictures' locomotive pages</strong></p>
//! </div>
//!
//! railplate interprets the small EJS-flavored template dialect used by
//! the RailHub Pictures locomotive detail pages: `<%= expr %>` output
//! placeholders, `<% if (…) { %> … <% } else { %> … <% } %>`
//! conditionals and `<% list.forEach((item, i) => { %> … <% }) %>`
//! loops, evaluated against a per-request context tree.  Rendering is a
//! pure function from `(template, context)` to `String`.
//!
//! ```ejs
//! <% units.forEach((unit, i) => { %>
//!   <li><%= formatRailroadName(unit.railroad) %> <%= unit.road_number %></li>
//! <% }) %>
//! ```
//!
//! # Usage
//!
//! Compile a [`Template`] once and render it with a context built by
//! the [`context!`] macro (or any [`serde`] serializable value):
//!
//! ```
//! use railplate::{context, Template};
//!
//! let tmpl = Template::new("Hello <%= name %>!").unwrap();
//! println!("{}", tmpl.render(context!(name => "John")).unwrap());
//! ```
//!
//! ```plain
//! Hello John!
//! ```
//!
//! # Degradation and errors
//!
//! The engine is deliberately forgiving: a missing field, an unknown
//! helper call or a loop over something that is not a list all render
//! as empty output, never as an error.  The single hard failure mode
//! is a structural defect (a block marker with no matching closer)
//! which surfaces as an [`Error`] at compile time so the caller can
//! substitute the static fallback page.  [`render_or_fallback`]
//! packages that recovery contract.
//!
//! # Helper transforms
//!
//! Templates cannot call arbitrary code.  The closed set of recognized
//! calls lives in [`helpers`]: reporting-mark display labels, model
//! family prefixes, `encodeURIComponent` and the `new Date()` clock
//! shapes.  Anything else resolves to the empty string.
//!
//! # Conditions
//!
//! A condition is a flat chain of comparisons (`>`, `<`, `===`, `==`),
//! `.length` checks and truthiness tests.  When both `&&` and `||`
//! appear, the first connective seen fixes the combinator for the
//! whole chain; there is no precedence.  This mirrors the behavior of
//! the system this engine replaces; templates relying on mixed
//! connectives should be rewritten rather than trusted.

#![deny(missing_docs)]

mod ast;
mod context;
mod error;
mod eval;
mod lexer;
mod parser;
mod template;
mod tokens;
mod utils;

pub mod fallback;
pub mod helpers;
pub mod pagination;
pub mod value;

pub use self::error::{Error, ErrorKind};
pub use self::fallback::{fallback_page, render_or_fallback};
pub use self::template::Template;

/// Re-export for convenience.
pub use self::value::Value;

use serde::Serialize;

/// Compiles and renders a template in one step.
///
/// ```
/// use railplate::context;
///
/// let html = railplate::render(
///     "<%= unit.model %>",
///     context! { unit => context! { model => "SD40-2" } },
/// )
/// .unwrap();
/// assert_eq!(html, "SD40-2");
/// ```
pub fn render<S: Serialize>(source: &str, ctx: S) -> Result<String, Error> {
    Template::new(source)?.render(ctx)
}
