use std::borrow::Cow;
use std::fmt;

/// Represents a token in the stream.
pub enum Token<'a> {
    /// Raw template data outside of any marker.
    TemplateData(&'a str),
    /// Start of an output marker (`<%=`).
    VariableStart,
    /// End of an output marker (`%>`).
    VariableEnd,
    /// Start of a statement marker (`<%`).
    BlockStart,
    /// End of a statement marker (`%>`).
    BlockEnd,
    /// An identifier.
    Ident(&'a str),
    /// A string literal.
    Str(Cow<'a, str>),
    /// An integer literal (limited to i64).
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A dot operator (`.`)
    Dot,
    /// The comma operator (`,`)
    Comma,
    /// The arrow of a callback (`=>`)
    Arrow,
    /// `===` operator
    StrictEq,
    /// `==` operator
    LooseEq,
    /// `>` operator
    Gt,
    /// `<` operator
    Lt,
    /// `&&` operator
    And,
    /// `||` operator
    Or,
    /// Open Parenthesis
    ParenOpen,
    /// Close Parenthesis
    ParenClose,
    /// Open Brace
    BraceOpen,
    /// Close Brace
    BraceClose,
}

impl<'a> fmt::Debug for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::TemplateData(s) => write!(f, "TEMPLATE_DATA({s:?})"),
            Token::VariableStart => write!(f, "VARIABLE_START"),
            Token::VariableEnd => write!(f, "VARIABLE_END"),
            Token::BlockStart => write!(f, "BLOCK_START"),
            Token::BlockEnd => write!(f, "BLOCK_END"),
            Token::Ident(i) => write!(f, "IDENT({i})"),
            Token::Str(s) => write!(f, "STR({s:?})"),
            Token::Int(i) => write!(f, "INT({i:?})"),
            Token::Float(v) => write!(f, "FLOAT({v:?})"),
            Token::Dot => write!(f, "DOT"),
            Token::Comma => write!(f, "COMMA"),
            Token::Arrow => write!(f, "ARROW"),
            Token::StrictEq => write!(f, "STRICT_EQ"),
            Token::LooseEq => write!(f, "LOOSE_EQ"),
            Token::Gt => write!(f, "GT"),
            Token::Lt => write!(f, "LT"),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::ParenOpen => write!(f, "PAREN_OPEN"),
            Token::ParenClose => write!(f, "PAREN_CLOSE"),
            Token::BraceOpen => write!(f, "BRACE_OPEN"),
            Token::BraceClose => write!(f, "BRACE_CLOSE"),
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::TemplateData(_) => write!(f, "template-data"),
            Token::VariableStart => write!(f, "start of output marker"),
            Token::VariableEnd => write!(f, "end of output marker"),
            Token::BlockStart => write!(f, "start of statement marker"),
            Token::BlockEnd => write!(f, "end of statement marker"),
            Token::Ident(_) => write!(f, "identifier"),
            Token::Str(_) => write!(f, "string"),
            Token::Int(_) => write!(f, "integer"),
            Token::Float(_) => write!(f, "float"),
            Token::Dot => write!(f, "`.`"),
            Token::Comma => write!(f, "`,`"),
            Token::Arrow => write!(f, "`=>`"),
            Token::StrictEq => write!(f, "`===`"),
            Token::LooseEq => write!(f, "`==`"),
            Token::Gt => write!(f, "`>`"),
            Token::Lt => write!(f, "`<`"),
            Token::And => write!(f, "`&&`"),
            Token::Or => write!(f, "`||`"),
            Token::ParenOpen => write!(f, "`(`"),
            Token::ParenClose => write!(f, "`)`"),
            Token::BraceOpen => write!(f, "`{{`"),
            Token::BraceClose => write!(f, "`}}`"),
        }
    }
}

/// Token span information
#[derive(Clone, Copy, Default)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " @ {}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}
