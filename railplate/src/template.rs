use std::fmt;

use serde::Serialize;

use crate::ast;
use crate::error::Error;
use crate::eval;
use crate::parser::parse;
use crate::value::Value;

/// Represents a compiled template.
///
/// Compilation is the only step that can fail: an unbalanced or
/// mismatched block marker surfaces here (or from
/// [`render`](crate::render)) as an [`Error`].  A compiled template
/// renders any number of contexts without further failure modes; every
/// lookup or helper miss inside a render becomes empty output instead.
///
/// ```
/// use railplate::{context, Template};
///
/// let tmpl = Template::new("<h1><%= unit.railroad %> <%= unit.road_number %></h1>").unwrap();
/// let html = tmpl
///     .render(context! { unit => context! { railroad => "UP", road_number => 844 } })
///     .unwrap();
/// assert_eq!(html, "<h1>UP 844</h1>");
/// ```
pub struct Template<'source> {
    source: &'source str,
    ast: ast::Stmt<'source>,
}

impl<'source> fmt::Debug for Template<'source> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .finish()
    }
}

impl<'source> Template<'source> {
    /// Compiles a template from its source.
    pub fn new(source: &'source str) -> Result<Template<'source>, Error> {
        Ok(Template {
            source,
            ast: parse(source, "<template>")?,
        })
    }

    /// Renders the template against a context.
    ///
    /// The context can be any serializable value; the
    /// [`context!`](crate::context!) macro is the usual way to build
    /// one.
    pub fn render<S: Serialize>(&self, ctx: S) -> Result<String, Error> {
        Ok(eval::eval(&self.ast, Value::from_serialize(&ctx)))
    }

    /// Returns the source the template was compiled from.
    pub fn source(&self) -> &'source str {
        self.source
    }
}
