use std::borrow::Cow;

use crate::error::{Error, ErrorKind};
use crate::tokens::{Span, Token};
use crate::utils::{memchr, memstr, unescape};

enum LexerState {
    Template,
    InVariable,
    InBlock,
}

/// Finds the start of the next `<%` marker in the template data.
fn find_marker(a: &str) -> Option<usize> {
    let bytes = a.as_bytes();
    let mut offset = 0;
    loop {
        let idx = memchr(&bytes[offset..], b'<')?;
        if bytes.get(offset + idx + 1).copied() == Some(b'%') {
            return Some(offset + idx);
        }
        offset += idx + 1;
    }
}

/// Tokenizes the template source.
///
/// Outside of markers everything is emitted as raw
/// [`TemplateData`](Token::TemplateData).  Inside `<%= … %>` and
/// `<% … %>` markers the EJS expression subset is tokenized;
/// `<%# … %>` comments are skipped entirely.
pub fn tokenize(input: &str) -> impl Iterator<Item = Result<(Token<'_>, Span), Error>> {
    let mut rest = input;
    let mut stack = vec![LexerState::Template];
    let mut failed = false;
    let mut current_line = 1;
    let mut current_col = 0;

    macro_rules! syntax_error {
        ($msg:expr) => {{
            failed = true;
            return Some(Err(Error::new(ErrorKind::SyntaxError, $msg)));
        }};
    }

    macro_rules! span {
        ($start:expr) => {{
            let (start_line, start_col) = $start;
            Span {
                start_line,
                start_col,
                end_line: current_line,
                end_col: current_col,
            }
        }};
    }

    macro_rules! loc {
        () => {
            (current_line, current_col)
        };
    }

    macro_rules! advance {
        ($bytes:expr) => {{
            let (skipped, new_rest) = rest.split_at($bytes);
            for c in skipped.chars() {
                match c {
                    '\n' => {
                        current_line += 1;
                        current_col = 0;
                    }
                    _ => current_col += 1,
                }
            }
            rest = new_rest;
            skipped
        }};
    }

    macro_rules! eat_string {
        ($delim:expr) => {{
            let old_loc = loc!();
            let mut escaped = false;
            let mut has_escapes = false;
            let str_len = rest
                .as_bytes()
                .iter()
                .skip(1)
                .take_while(|&&c| match (escaped, c) {
                    (true, _) => {
                        escaped = false;
                        true
                    }
                    (_, b'\\') => {
                        escaped = true;
                        has_escapes = true;
                        true
                    }
                    (_, $delim) | (_, b'\r') | (_, b'\n') => false,
                    _ => true,
                })
                .count();
            if escaped || rest.as_bytes().get(str_len + 1) != Some(&$delim) {
                syntax_error!("unexpected end of string");
            }
            let s = advance!(str_len + 2);
            if has_escapes {
                return Some(Ok((
                    Token::Str(Cow::Owned(match unescape(&s[1..s.len() - 1]) {
                        Ok(unescaped) => unescaped,
                        Err(err) => return Some(Err(err)),
                    })),
                    span!(old_loc),
                )));
            } else {
                return Some(Ok((
                    Token::Str(Cow::Borrowed(&s[1..s.len() - 1])),
                    span!(old_loc),
                )));
            }
        }};
    }

    macro_rules! eat_number {
        () => {{
            let old_loc = loc!();
            let mut is_float = false;
            let num_len = rest
                .as_bytes()
                .iter()
                .take_while(|&&c| {
                    if !is_float && c == b'.' {
                        is_float = true;
                        true
                    } else {
                        c.is_ascii_digit()
                    }
                })
                .count();
            let num = advance!(num_len);
            if is_float {
                return Some(Ok((
                    Token::Float(match num.parse::<f64>() {
                        Ok(val) => val,
                        Err(_) => syntax_error!("invalid float"),
                    }),
                    span!(old_loc),
                )));
            } else {
                return Some(Ok((
                    Token::Int(match num.parse::<i64>() {
                        Ok(val) => val,
                        Err(_) => syntax_error!("invalid integer"),
                    }),
                    span!(old_loc),
                )));
            }
        }};
    }

    std::iter::from_fn(move || loop {
        if rest.is_empty() || failed {
            return None;
        }

        let old_loc = loc!();
        match stack.last() {
            Some(LexerState::Template) => {
                match rest.get(..3) {
                    Some("<%#") => {
                        if let Some(comment_end) = memstr(rest.as_bytes(), b"%>") {
                            advance!(comment_end + 2);
                            continue;
                        } else {
                            syntax_error!("unexpected end of comment");
                        }
                    }
                    Some("<%=") => {
                        advance!(3);
                        stack.push(LexerState::InVariable);
                        return Some(Ok((Token::VariableStart, span!(old_loc))));
                    }
                    _ => {}
                }
                if rest.get(..2) == Some("<%") {
                    advance!(2);
                    stack.push(LexerState::InBlock);
                    return Some(Ok((Token::BlockStart, span!(old_loc))));
                }

                let lead = match find_marker(rest) {
                    Some(start) => advance!(start),
                    None => advance!(rest.len()),
                };
                return Some(Ok((Token::TemplateData(lead), span!(old_loc))));
            }
            Some(&LexerState::InBlock) | Some(&LexerState::InVariable) => {
                // in markers whitespace is ignored, skip it.
                match rest
                    .as_bytes()
                    .iter()
                    .position(|&x| !x.is_ascii_whitespace())
                {
                    Some(0) => {}
                    None => {
                        advance!(rest.len());
                        continue;
                    }
                    Some(offset) => {
                        advance!(offset);
                        continue;
                    }
                }

                // look out for the end of markers
                if rest.get(..2) == Some("%>") {
                    let was_block = matches!(stack.last(), Some(&LexerState::InBlock));
                    stack.pop();
                    advance!(2);
                    return Some(Ok((
                        if was_block {
                            Token::BlockEnd
                        } else {
                            Token::VariableEnd
                        },
                        span!(old_loc),
                    )));
                }

                // multi character operators
                if rest.get(..3) == Some("===") {
                    advance!(3);
                    return Some(Ok((Token::StrictEq, span!(old_loc))));
                }
                let op = match rest.as_bytes().get(..2) {
                    Some(b"==") => Some(Token::LooseEq),
                    Some(b"&&") => Some(Token::And),
                    Some(b"||") => Some(Token::Or),
                    Some(b"=>") => Some(Token::Arrow),
                    _ => None,
                };
                if let Some(op) = op {
                    advance!(2);
                    return Some(Ok((op, span!(old_loc))));
                }

                // single character operators (and strings)
                let op = match rest.as_bytes().first() {
                    Some(b'.') => Some(Token::Dot),
                    Some(b',') => Some(Token::Comma),
                    Some(b'>') => Some(Token::Gt),
                    Some(b'<') => Some(Token::Lt),
                    Some(b'(') => Some(Token::ParenOpen),
                    Some(b')') => Some(Token::ParenClose),
                    Some(b'{') => Some(Token::BraceOpen),
                    Some(b'}') => Some(Token::BraceClose),
                    Some(b'\'') => eat_string!(b'\''),
                    Some(b'"') => eat_string!(b'"'),
                    Some(c) if c.is_ascii_digit() => eat_number!(),
                    _ => None,
                };
                if let Some(op) = op {
                    advance!(1);
                    return Some(Ok((op, span!(old_loc))));
                }

                // identifiers
                let ident_len = rest
                    .as_bytes()
                    .iter()
                    .enumerate()
                    .take_while(|&(idx, &c)| {
                        if c == b'_' || c == b'$' {
                            true
                        } else if idx == 0 {
                            c.is_ascii_alphabetic()
                        } else {
                            c.is_ascii_alphanumeric()
                        }
                    })
                    .count();
                if ident_len > 0 {
                    let ident = advance!(ident_len);
                    return Some(Ok((Token::Ident(ident), span!(old_loc))));
                }

                // syntax error
                syntax_error!("unexpected character");
            }
            None => panic!("empty lexer state"),
        }
    })
}

#[test]
fn test_find_marker() {
    assert!(find_marker("<").is_none());
    assert!(find_marker("foo").is_none());
    assert!(find_marker("foo <").is_none());
    assert_eq!(find_marker("foo <%"), Some(4));
    assert_eq!(find_marker("foo <a href><%="), Some(12));
}

#[test]
fn test_tokenize_output_marker() {
    let tokens: Result<Vec<_>, _> = tokenize("<h1><%= unit.road_number %></h1>").collect();
    let tokens = tokens.unwrap().into_iter().map(|x| x.0).collect::<Vec<_>>();
    insta::assert_debug_snapshot!(&tokens, @r###"
    [
        TEMPLATE_DATA("<h1>"),
        VARIABLE_START,
        IDENT(unit),
        DOT,
        IDENT(road_number),
        VARIABLE_END,
        TEMPLATE_DATA("</h1>"),
    ]
    "###);
}

#[test]
fn test_tokenize_comment() {
    let tokens: Result<Vec<_>, _> = tokenize("a<%# ignored %>b").collect();
    let tokens = tokens.unwrap().into_iter().map(|x| x.0).collect::<Vec<_>>();
    insta::assert_debug_snapshot!(&tokens, @r###"
    [
        TEMPLATE_DATA("a"),
        TEMPLATE_DATA("b"),
    ]
    "###);
}

#[test]
fn test_tokenize_condition_operators() {
    let tokens: Result<Vec<_>, _> = tokenize("<% if (units.length > 1 && ok) { %>").collect();
    let tokens = tokens.unwrap().into_iter().map(|x| x.0).collect::<Vec<_>>();
    insta::assert_debug_snapshot!(&tokens, @r###"
    [
        BLOCK_START,
        IDENT(if),
        PAREN_OPEN,
        IDENT(units),
        DOT,
        IDENT(length),
        GT,
        INT(1),
        AND,
        IDENT(ok),
        PAREN_CLOSE,
        BRACE_OPEN,
        BLOCK_END,
    ]
    "###);
}
