//! Turns a token stream into a statement tree.
//!
//! The parser is strict about block structure and deliberately lenient
//! about everything else.  A statement marker it does not recognize
//! (including one whose condition or loop header is malformed) renders
//! as nothing, exactly like the unmatched markers of the system this
//! engine replaces.  Only an unbalanced or mismatched block closer is
//! a hard error, because the caller can recover from that solely by
//! abandoning the template.
//!
//! Conditions carry no operator precedence: the first `&&` or `||`
//! seen fixes the combinator for the whole flat chain.  This is a
//! compatibility decision, not an oversight; see the crate docs.

use crate::ast::{self, Spanned};
use crate::error::{Error, ErrorKind};
use crate::helpers::Clock;
use crate::lexer::tokenize;
use crate::tokens::{Span, Token};
use crate::value::Value;

macro_rules! syntax_error {
    ($msg:expr) => {{
        return Err(Error::new(ErrorKind::SyntaxError, $msg));
    }};
    ($msg:expr, $($tt:tt)*) => {{
        return Err(Error::new(ErrorKind::SyntaxError, format!($msg, $($tt)*)));
    }};
}

macro_rules! expect_token {
    ($parser:expr, $expectation:expr) => {{
        match $parser.stream.next()? {
            Some(rv) => Ok(rv),
            None => Err(Error::new(
                ErrorKind::SyntaxError,
                format!("unexpected end of input, expected {}", $expectation),
            )),
        }
    }};
    ($parser:expr, $match:pat, $expectation:expr) => {{
        match $parser.stream.next()? {
            Some((token, span)) if matches!(token, $match) => Ok((token, span)),
            Some((token, _)) => Err(Error::new(
                ErrorKind::SyntaxError,
                format!("unexpected {}, expected {}", token, $expectation),
            )),
            None => Err(Error::new(
                ErrorKind::SyntaxError,
                format!("unexpected end of input, expected {}", $expectation),
            )),
        }
    }};
    ($parser:expr, $match:pat => $target:expr, $expectation:expr) => {{
        match $parser.stream.next()? {
            Some(($match, span)) => Ok(($target, span)),
            Some((token, _)) => Err(Error::new(
                ErrorKind::SyntaxError,
                format!("unexpected {}, expected {}", token, $expectation),
            )),
            None => Err(Error::new(
                ErrorKind::SyntaxError,
                format!("unexpected end of input, expected {}", $expectation),
            )),
        }
    }};
}

struct TokenStream<'a> {
    iter: Box<dyn Iterator<Item = Result<(Token<'a>, Span), Error>> + 'a>,
    current: Option<Result<(Token<'a>, Span), Error>>,
    current_span: Span,
}

impl<'a> TokenStream<'a> {
    /// Tokenize a template.
    pub fn new(source: &'a str) -> TokenStream<'a> {
        TokenStream {
            iter: (Box::new(tokenize(source)) as Box<dyn Iterator<Item = _>>),
            current: None,
            current_span: Span::default(),
        }
    }

    /// Advance the stream.
    pub fn next(&mut self) -> Result<Option<(Token<'a>, Span)>, Error> {
        let rv = self.current.take();
        self.current = self.iter.next();
        if let Some(Ok((_, span))) = rv {
            self.current_span = span;
        }
        rv.transpose()
    }

    /// Look at the current token.
    pub fn current(&mut self) -> Result<Option<(&Token<'a>, Span)>, Error> {
        if self.current.is_none() {
            self.next()?;
        }
        match self.current {
            Some(Ok(ref tok)) => Ok(Some((&tok.0, tok.1))),
            Some(Err(_)) => Err(self.current.take().unwrap().unwrap_err()),
            None => Ok(None),
        }
    }

    /// Expands the span.
    pub fn expand_span(&self, mut span: Span) -> Span {
        span.end_line = self.current_span.end_line;
        span.end_col = self.current_span.end_col;
        span
    }

    /// Returns the last seen span.
    pub fn current_span(&self) -> Span {
        self.current_span
    }
}

struct Parser<'a> {
    stream: TokenStream<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser {
            stream: TokenStream::new(source),
        }
    }

    /// True when the current token ends or leaves the marker.
    fn at_marker_end(&mut self) -> Result<bool, Error> {
        Ok(matches!(
            self.stream.current()?,
            None | Some((Token::BlockEnd, _)) | Some((Token::VariableEnd, _))
        ))
    }

    fn parse_expr(&mut self) -> Result<ast::Expr<'a>, Error> {
        if self.at_marker_end()? {
            syntax_error!("unexpected end of marker, expected expression");
        }
        let (token, span) = expect_token!(self, "expression")?;
        macro_rules! const_val {
            ($expr:expr) => {
                ast::Expr::Const(Spanned::new(
                    ast::Const {
                        value: Value::from($expr),
                    },
                    span,
                ))
            };
        }

        match token {
            Token::Ident("true") => Ok(const_val!(true)),
            Token::Ident("false") => Ok(const_val!(false)),
            Token::Ident("null") => Ok(const_val!(())),
            Token::Ident("undefined") => Ok(const_val!(Value::UNDEFINED)),
            Token::Ident("new") => self.parse_date_call(span),
            Token::Ident(name) => {
                if matches!(self.stream.current()?, Some((Token::ParenOpen, _))) {
                    let args = self.parse_call_args()?;
                    Ok(ast::Expr::Call(Spanned::new(
                        ast::Call { name, args },
                        self.stream.expand_span(span),
                    )))
                } else {
                    let mut segments = vec![name];
                    while matches!(self.stream.current()?, Some((Token::Dot, _))) {
                        self.stream.next()?;
                        let (seg, _) =
                            expect_token!(self, Token::Ident(name) => name, "identifier")?;
                        if matches!(self.stream.current()?, Some((Token::ParenOpen, _))) {
                            // method-style call; resolved against the
                            // closed helper set at evaluation time
                            let args = self.parse_call_args()?;
                            return Ok(ast::Expr::Call(Spanned::new(
                                ast::Call { name: seg, args },
                                self.stream.expand_span(span),
                            )));
                        }
                        segments.push(seg);
                    }
                    Ok(ast::Expr::Path(Spanned::new(
                        ast::PathRef { segments },
                        self.stream.expand_span(span),
                    )))
                }
            }
            Token::Str(val) => Ok(const_val!(val)),
            Token::Int(val) => Ok(const_val!(val)),
            Token::Float(val) => Ok(const_val!(val)),
            token => syntax_error!("unexpected {}", token),
        }
    }

    /// Parses the `new Date().<method>()` clock shapes.
    fn parse_date_call(&mut self, span: Span) -> Result<ast::Expr<'a>, Error> {
        expect_token!(self, Token::Ident("Date"), "`Date`")?;
        expect_token!(self, Token::ParenOpen, "`(`")?;
        expect_token!(self, Token::ParenClose, "`)`")?;
        expect_token!(self, Token::Dot, "`.`")?;
        let (method, _) = expect_token!(self, Token::Ident(name) => name, "identifier")?;
        expect_token!(self, Token::ParenOpen, "`(`")?;
        expect_token!(self, Token::ParenClose, "`)`")?;
        Ok(match Clock::from_method(method) {
            Some(kind) => ast::Expr::Clock(Spanned::new(
                ast::ClockCall { kind },
                self.stream.expand_span(span),
            )),
            // unknown Date methods resolve to the empty string
            None => ast::Expr::Call(Spanned::new(
                ast::Call {
                    name: method,
                    args: Vec::new(),
                },
                self.stream.expand_span(span),
            )),
        })
    }

    fn parse_call_args(&mut self) -> Result<Vec<ast::Expr<'a>>, Error> {
        expect_token!(self, Token::ParenOpen, "`(`")?;
        let mut args = Vec::new();
        loop {
            if matches!(self.stream.current()?, Some((Token::ParenClose, _))) {
                break;
            }
            if self.at_marker_end()? {
                syntax_error!("unexpected end of marker, expected `)`");
            }
            if !args.is_empty() {
                expect_token!(self, Token::Comma, "`,`")?;
            }
            args.push(self.parse_expr()?);
        }
        self.stream.next()?;
        Ok(args)
    }

    fn parse_cond(&mut self) -> Result<ast::Cond<'a>, Error> {
        let mut atoms = vec![self.parse_cond_atom()?];
        // the first connective fixes the combinator for the whole
        // chain; `a && b || c` folds the same way as `a && b && c`
        let mut conjunctive = None;
        loop {
            match self.stream.current()? {
                Some((Token::And, _)) => {
                    conjunctive.get_or_insert(true);
                }
                Some((Token::Or, _)) => {
                    conjunctive.get_or_insert(false);
                }
                _ => break,
            }
            self.stream.next()?;
            atoms.push(self.parse_cond_atom()?);
        }
        Ok(match conjunctive {
            None => ast::Cond::Single(atoms.into_iter().next().unwrap()),
            Some(true) => ast::Cond::All(atoms),
            Some(false) => ast::Cond::Any(atoms),
        })
    }

    fn parse_cond_atom(&mut self) -> Result<ast::CondAtom<'a>, Error> {
        let left = self.parse_expr()?;
        let op = match self.stream.current()? {
            Some((Token::Gt, _)) => ast::CmpOp::Gt,
            Some((Token::Lt, _)) => ast::CmpOp::Lt,
            Some((Token::StrictEq, _)) => ast::CmpOp::StrictEq,
            Some((Token::LooseEq, _)) => ast::CmpOp::LooseEq,
            _ => return Ok(ast::CondAtom::Truthy(left)),
        };
        self.stream.next()?;
        let right = self.parse_expr()?;
        Ok(ast::CondAtom::Compare { op, left, right })
    }

    /// Parses one statement marker.  Returns `None` for markers that
    /// render as nothing.
    fn parse_stmt(&mut self) -> Result<Option<ast::Stmt<'a>>, Error> {
        let span = self.stream.current_span();
        match self.stream.current()? {
            Some((Token::Ident("if"), _)) => {
                self.stream.next()?;
                self.parse_if_stmt(span)
            }
            Some((Token::Ident(_), _)) => self.parse_loop_stmt(span),
            // anything else is a marker the engine does not recognize
            _ => {
                self.skip_marker()?;
                Ok(None)
            }
        }
    }

    /// Parses `(cond) { %>`, the tail of an `if` opener.
    fn parse_if_header(&mut self) -> Result<ast::Cond<'a>, Error> {
        expect_token!(self, Token::ParenOpen, "`(`")?;
        let cond = self.parse_cond()?;
        expect_token!(self, Token::ParenClose, "`)`")?;
        expect_token!(self, Token::BraceOpen, "`{`")?;
        expect_token!(self, Token::BlockEnd, "end of statement marker")?;
        Ok(cond)
    }

    fn parse_if_stmt(&mut self, span: Span) -> Result<Option<ast::Stmt<'a>>, Error> {
        let cond = match self.parse_if_header() {
            Ok(cond) => cond,
            Err(_) => {
                // a malformed condition in a marker that still opens a
                // block turns into a constant-false conditional so the
                // body and its closer stay balanced; a marker that does
                // not open a block renders as nothing
                if !self.resync_opener()? {
                    return Ok(None);
                }
                ast::Cond::Single(ast::CondAtom::Truthy(ast::Expr::Const(Spanned::new(
                    ast::Const {
                        value: Value::from(false),
                    },
                    span,
                ))))
            }
        };
        let true_body = self.subparse(&|tok| matches!(tok, Token::BraceClose))?;
        expect_token!(self, Token::BraceClose, "`}`")?;
        let false_body = match self.stream.current()? {
            Some((Token::Ident("else"), _)) => {
                self.stream.next()?;
                expect_token!(self, Token::BraceOpen, "`{`")?;
                expect_token!(self, Token::BlockEnd, "end of statement marker")?;
                let rv = self.subparse(&|tok| matches!(tok, Token::BraceClose))?;
                expect_token!(self, Token::BraceClose, "`}`")?;
                rv
            }
            Some((Token::BlockEnd, _)) => Vec::new(),
            Some((token, _)) => {
                syntax_error!("unexpected {} in `if` closer, expected `else` or `%>`", token)
            }
            None => syntax_error!("unexpected end of input, expected end of `if` block"),
        };
        Ok(Some(ast::Stmt::IfCond(Spanned::new(
            ast::IfCond {
                cond,
                true_body,
                false_body,
            },
            self.stream.expand_span(span),
        ))))
    }

    /// Parses the whole loop opener, `source.forEach((item, i) => { %>`.
    /// `Ok(None)` means the marker is not a loop at all.
    #[allow(clippy::type_complexity)]
    fn parse_loop_header(
        &mut self,
    ) -> Result<Option<(Vec<&'a str>, &'a str, Option<&'a str>)>, Error> {
        let (first, _) = expect_token!(self, Token::Ident(name) => name, "identifier")?;
        let mut segments = vec![first];
        loop {
            if !matches!(self.stream.current()?, Some((Token::Dot, _))) {
                return Ok(None);
            }
            self.stream.next()?;
            let (seg, _) = expect_token!(self, Token::Ident(name) => name, "identifier")?;
            if seg == "forEach" && matches!(self.stream.current()?, Some((Token::ParenOpen, _))) {
                break;
            }
            segments.push(seg);
        }
        expect_token!(self, Token::ParenOpen, "`(`")?;
        expect_token!(self, Token::ParenOpen, "`(`")?;
        let (item_var, _) = expect_token!(self, Token::Ident(name) => name, "identifier")?;
        let index_var = if matches!(self.stream.current()?, Some((Token::Comma, _))) {
            self.stream.next()?;
            Some(expect_token!(self, Token::Ident(name) => name, "identifier")?.0)
        } else {
            None
        };
        expect_token!(self, Token::ParenClose, "`)`")?;
        expect_token!(self, Token::Arrow, "`=>`")?;
        expect_token!(self, Token::BraceOpen, "`{`")?;
        expect_token!(self, Token::BlockEnd, "end of statement marker")?;
        Ok(Some((segments, item_var, index_var)))
    }

    fn parse_loop_body(&mut self) -> Result<Vec<ast::Stmt<'a>>, Error> {
        let body = self.subparse(&|tok| matches!(tok, Token::BraceClose))?;
        expect_token!(self, Token::BraceClose, "`}`")?;
        expect_token!(self, Token::ParenClose, "`)`")?;
        Ok(body)
    }

    fn parse_loop_stmt(&mut self, span: Span) -> Result<Option<ast::Stmt<'a>>, Error> {
        match self.parse_loop_header() {
            Ok(Some((source, item_var, index_var))) => {
                let body = self.parse_loop_body()?;
                Ok(Some(ast::Stmt::ForEach(Spanned::new(
                    ast::ForEach {
                        source,
                        item_var,
                        index_var,
                        body,
                    },
                    self.stream.expand_span(span),
                ))))
            }
            Ok(None) => {
                self.skip_marker()?;
                Ok(None)
            }
            Err(_) => {
                // malformed loop header: keep the block balanced but
                // give it nothing to iterate
                if !self.resync_opener()? {
                    return Ok(None);
                }
                let body = self.parse_loop_body()?;
                Ok(Some(ast::Stmt::ForEach(Spanned::new(
                    ast::ForEach {
                        source: Vec::new(),
                        item_var: "",
                        index_var: None,
                        body,
                    },
                    self.stream.expand_span(span),
                ))))
            }
        }
    }

    /// After a failed block header, decides whether the marker still
    /// opens a block (it ends in `{ %>`).  Consumes the marker end
    /// when it does.
    fn resync_opener(&mut self) -> Result<bool, Error> {
        let mut opener = false;
        loop {
            match self.stream.current()? {
                None => return Ok(false),
                Some((Token::BlockEnd, _)) | Some((Token::VariableEnd, _)) => {
                    if opener {
                        self.stream.next()?;
                    }
                    return Ok(opener);
                }
                Some((Token::BraceOpen, _)) => {
                    opener = true;
                    self.stream.next()?;
                }
                Some(_) => {
                    opener = false;
                    self.stream.next()?;
                }
            }
        }
    }

    /// Skips the remaining tokens of an unrecognized statement marker,
    /// leaving the marker end for the caller.
    fn skip_marker(&mut self) -> Result<(), Error> {
        while !self.at_marker_end()? {
            self.stream.next()?;
        }
        Ok(())
    }

    /// Consumes up to and including the end of an output marker.
    fn skip_expr_marker(&mut self) -> Result<(), Error> {
        loop {
            match self.stream.current()? {
                None => return Ok(()),
                Some((Token::VariableEnd, _)) | Some((Token::BlockEnd, _)) => {
                    self.stream.next()?;
                    return Ok(());
                }
                Some(_) => {
                    self.stream.next()?;
                }
            }
        }
    }

    fn subparse(
        &mut self,
        end_check: &dyn Fn(&Token) -> bool,
    ) -> Result<Vec<ast::Stmt<'a>>, Error> {
        let mut rv = Vec::new();
        while let Some((token, span)) = self.stream.next()? {
            match token {
                Token::TemplateData(raw) => {
                    rv.push(ast::Stmt::EmitRaw(Spanned::new(ast::EmitRaw { raw }, span)))
                }
                Token::VariableStart => {
                    match self.parse_expr() {
                        Ok(expr) => {
                            // a placeholder with trailing garbage is
                            // unrecognized as a whole and emits nothing
                            if matches!(self.stream.current()?, Some((Token::VariableEnd, _))) {
                                rv.push(ast::Stmt::EmitExpr(Spanned::new(
                                    ast::EmitExpr { expr },
                                    self.stream.expand_span(span),
                                )));
                            }
                        }
                        Err(err) if err.kind() != ErrorKind::SyntaxError => return Err(err),
                        Err(_) => {}
                    }
                    self.skip_expr_marker()?;
                }
                Token::BlockStart => {
                    match self.stream.current()? {
                        None => syntax_error!("unexpected end of input, expected statement"),
                        Some((tok, _)) if end_check(tok) => return Ok(rv),
                        Some(_) => {}
                    }
                    if let Some(stmt) = self.parse_stmt()? {
                        rv.push(stmt);
                    }
                    expect_token!(self, Token::BlockEnd, "end of statement marker")?;
                }
                _ => unreachable!("lexer produced garbage"),
            }
        }
        Ok(rv)
    }

    pub fn parse(&mut self) -> Result<ast::Stmt<'a>, Error> {
        // start the stream
        self.stream.next()?;
        let span = self.stream.current_span();
        Ok(ast::Stmt::Template(Spanned::new(
            ast::Template {
                children: self.subparse(&|_| false)?,
            },
            self.stream.expand_span(span),
        )))
    }
}

/// Parses a template.
pub fn parse<'source>(source: &'source str, name: &str) -> Result<ast::Stmt<'source>, Error> {
    let mut parser = Parser::new(source);
    parser.parse().map_err(|mut err| {
        if err.line().is_none() {
            err.set_location(name, parser.stream.current_span().start_line)
        }
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ast::Stmt<'_> {
        parse(source, "<test>").unwrap()
    }

    #[test]
    fn test_parse_emit() {
        let root = parse_ok("<h1><%= unit.road_number %></h1>");
        if let ast::Stmt::Template(tmpl) = &root {
            assert_eq!(tmpl.children.len(), 3);
        } else {
            panic!("expected template root");
        }
    }

    #[test]
    fn test_parse_if_else() {
        let root = parse_ok("<% if (units.length > 1) { %>X<% } else { %>Y<% } %>");
        if let ast::Stmt::Template(tmpl) = &root {
            assert_eq!(tmpl.children.len(), 1);
            if let ast::Stmt::IfCond(cond) = &tmpl.children[0] {
                assert_eq!(cond.true_body.len(), 1);
                assert_eq!(cond.false_body.len(), 1);
            } else {
                panic!("expected if statement");
            }
        } else {
            panic!("expected template root");
        }
    }

    #[test]
    fn test_parse_for_each() {
        let root = parse_ok("<% photos.forEach((photo, i) => { %><%= photo.id %><% }) %>");
        if let ast::Stmt::Template(tmpl) = &root {
            if let ast::Stmt::ForEach(stmt) = &tmpl.children[0] {
                assert_eq!(stmt.source, vec!["photos"]);
                assert_eq!(stmt.item_var, "photo");
                assert_eq!(stmt.index_var, Some("i"));
                assert_eq!(stmt.body.len(), 1);
            } else {
                panic!("expected forEach statement");
            }
        } else {
            panic!("expected template root");
        }
    }

    #[test]
    fn test_unbalanced_if_is_an_error() {
        let err = parse("<% if (unit.retired) { %>retired", "<test>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_mismatched_closer_is_an_error() {
        let err = parse("<% if (unit.retired) { %>retired<% }) %>", "<test>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_unrecognized_marker_parses_to_nothing() {
        let root = parse_ok("a<% include header %>b");
        if let ast::Stmt::Template(tmpl) = &root {
            assert_eq!(tmpl.children.len(), 2);
        } else {
            panic!("expected template root");
        }
    }
}
