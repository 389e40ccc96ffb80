/// Token types produced by the Smalltalk lexer.
use crate::span::Span;

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Integer literal, e.g. `42`, `-7`, `16rFF`.
    Integer(i64),
    /// Floating-point literal, e.g. `3.14`, `1.5e10`.
    Float(f64),
    /// String literal. Holds the raw lexeme *including* its quote
    /// delimiters; [`StringConstant`](crate::ast::StringConstant)
    /// homogenizes it.
    String(std::string::String),
    /// Symbol literal without the leading `#`, e.g. `#at:put:` → `at:put:`.
    Symbol(std::string::String),
    /// Quoted symbol literal, raw lexeme without the `#`, e.g. `'hello world'`.
    QuotedSymbol(std::string::String),
    /// Character literal, e.g. `$a`.
    Character(char),

    /// An identifier, e.g. `factorial`, `Transcript`.
    Identifier(std::string::String),
    /// A keyword (identifier + colon), e.g. `at:`, `put:`.
    Keyword(std::string::String),
    /// A block argument declaration, e.g. `:each`.
    BlockArg(std::string::String),
    /// A binary selector composed of operator characters, e.g. `+`, `>>`, `~=`.
    Binary(std::string::String),

    /// Assignment operator `:=`.
    Assign,
    /// `^` — return operator.
    Caret,
    /// `#(` — literal array opener.
    LiteralArrayStart,

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `|` — temporaries delimiter, also the binary selector `|`.
    Pipe,
    /// `.` — statement separator.
    Dot,
    /// `;` — cascade separator.
    Semicolon,

    /// End of input.
    Eof,
    /// An unrecognized character or malformed token.
    Error(std::string::String),
}

impl TokenKind {
    /// Human-readable name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Symbol(_) | Self::QuotedSymbol(_) => "symbol",
            Self::Character(_) => "character",
            Self::Identifier(_) => "identifier",
            Self::Keyword(_) => "keyword",
            Self::BlockArg(_) => "block argument",
            Self::Binary(_) => "binary selector",
            Self::Assign => "`:=`",
            Self::Caret => "`^`",
            Self::LiteralArrayStart => "`#(`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::Pipe => "`|`",
            Self::Dot => "`.`",
            Self::Semicolon => "`;`",
            Self::Eof => "end of input",
            Self::Error(_) => "error",
        }
    }

    /// Whether a token of this kind can end an operand. A `-` directly
    /// after such a token is a binary selector, not a negative literal.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            Self::Integer(_)
                | Self::Float(_)
                | Self::String(_)
                | Self::Symbol(_)
                | Self::QuotedSymbol(_)
                | Self::Character(_)
                | Self::Identifier(_)
                | Self::RParen
                | Self::RBracket
                | Self::RBrace
        )
    }
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn line(&self) -> usize {
        self.span.line()
    }
}
