/// Lexer for Smalltalk source text.
///
/// The [`Lexer`] walks a `&str` and implements [`Iterator`] over
/// [`Token`]s, tracking byte offset, line and column for every token. The
/// final token is always [`TokenKind::Eof`].
///
/// # Literal syntax
///
/// | Syntax            | Token                          |
/// |-------------------|--------------------------------|
/// | `"…"`             | comment, skipped               |
/// | `'it''s'`         | [`TokenKind::String`] (raw)    |
/// | `#foo`, `#at:put:`| [`TokenKind::Symbol`]          |
/// | `#'a b'`          | [`TokenKind::QuotedSymbol`]    |
/// | `$a`              | [`TokenKind::Character`]       |
/// | `16rFF`, `-3`     | [`TokenKind::Integer`]         |
/// | `1.5e3`           | [`TokenKind::Float`]           |
/// | `#(`              | [`TokenKind::LiteralArrayStart`] |
///
/// String lexemes are passed on raw, quotes and doubled quotes included;
/// an unterminated string still produces a token so the AST constructor can
/// report it as a malformed literal on the right line.
use crate::span::{Pos, Span};
use crate::token::{Token, TokenKind};

const BINARY_CHARS: &[char] = &[
    '+', '-', '*', '/', '\\', '<', '>', '=', '~', '@', '%', '&', '?', ',', '!',
];

fn is_binary_char(c: char) -> bool {
    BINARY_CHARS.contains(&c)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    last_ends_operand: bool,
    emitted_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            last_ends_operand: false,
            emitted_eof: false,
        }
    }

    fn pos(&self) -> Pos {
        Pos::new(self.offset, self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.source[self.offset..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    // ───────────────────────────────────────────────────────────
    //  Whitespace and "comments"
    // ───────────────────────────────────────────────────────────

    /// Skip whitespace and comments. Returns an error token for an
    /// unterminated comment.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('"') => {
                    let start = self.pos();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('"') => break,
                            Some(_) => {}
                            None => {
                                let span = Span::new(start, self.pos());
                                return Some(Token::new(
                                    TokenKind::Error(
                                        "unterminated comment".into(),
                                    ),
                                    span,
                                ));
                            }
                        }
                    }
                }
                _ => return None,
            }
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Literals
    // ───────────────────────────────────────────────────────────

    /// Lex a quote-delimited lexeme, returning it raw (delimiters and
    /// doubled quotes preserved).
    fn lex_quoted(&mut self) -> String {
        let mut raw = String::new();
        if let Some(open) = self.advance() {
            raw.push(open);
        }
        loop {
            match self.advance() {
                None => break,
                Some('\'') => {
                    raw.push('\'');
                    if self.peek() == Some('\'') {
                        self.advance();
                        raw.push('\'');
                        continue;
                    }
                    break;
                }
                Some(c) => raw.push(c),
            }
        }
        raw
    }

    fn lex_number(&mut self, negative: bool) -> TokenKind {
        let digits = self.take_while(|c| c.is_ascii_digit());
        let sign: i64 = if negative { -1 } else { 1 };

        if self.peek() == Some('r')
            && self
                .peek_ahead(1)
                .is_some_and(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        {
            let radix = match digits.parse::<u32>() {
                Ok(radix) if (2..=36).contains(&radix) => radix,
                _ => return TokenKind::Error(format!("invalid radix {digits}")),
            };
            self.advance();
            let body = self.take_while(|c| {
                (c.is_ascii_digit() || c.is_ascii_uppercase())
                    && c.to_digit(radix).is_some()
            });
            return match i64::from_str_radix(&body, radix) {
                Ok(value) => TokenKind::Integer(sign * value),
                Err(_) => TokenKind::Error(format!(
                    "invalid radix literal {digits}r{body}"
                )),
            };
        }

        let mut text = digits;
        let mut is_float = false;
        if self.peek() == Some('.')
            && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            is_float = true;
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        let has_exponent = self.peek() == Some('e')
            && match self.peek_ahead(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('-') => {
                    self.peek_ahead(2).is_some_and(|c| c.is_ascii_digit())
                }
                _ => false,
            };
        let mut exponent = String::new();
        if has_exponent {
            self.advance();
            if self.peek() == Some('-') {
                self.advance();
                exponent.push('-');
            }
            exponent.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        if !is_float && !exponent.starts_with('-') {
            let scale = match exponent.parse::<u32>() {
                Ok(e) => 10i64.checked_pow(e),
                Err(_) if exponent.is_empty() => Some(1),
                Err(_) => None,
            };
            let value = text
                .parse::<i64>()
                .ok()
                .zip(scale)
                .and_then(|(v, s)| v.checked_mul(s));
            return match value {
                Some(v) => TokenKind::Integer(sign * v),
                None => {
                    let minus = if negative { "-" } else { "" };
                    let written = if exponent.is_empty() {
                        format!("{minus}{text}")
                    } else {
                        format!("{minus}{text}e{exponent}")
                    };
                    TokenKind::Error(format!(
                        "integer literal {written} out of range"
                    ))
                }
            };
        }

        if !exponent.is_empty() {
            text.push('e');
            text.push_str(&exponent);
        }
        match text.parse::<f64>() {
            Ok(v) => TokenKind::Float(sign as f64 * v),
            Err(_) => TokenKind::Error(format!("invalid float literal {text}")),
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let name = self.take_while(is_identifier_char);
        if self.peek() == Some(':') && self.peek_ahead(1) != Some('=') {
            self.advance();
            return TokenKind::Keyword(format!("{name}:"));
        }
        TokenKind::Identifier(name)
    }

    fn lex_hash(&mut self) -> TokenKind {
        self.advance(); // `#`
        match self.peek() {
            Some('(') => {
                self.advance();
                TokenKind::LiteralArrayStart
            }
            Some('\'') => TokenKind::QuotedSymbol(self.lex_quoted()),
            Some(c) if is_identifier_start(c) => TokenKind::Symbol(
                self.take_while(|c| is_identifier_char(c) || c == ':'),
            ),
            Some(c) if is_binary_char(c) || c == '|' => TokenKind::Symbol(
                self.take_while(|c| is_binary_char(c) || c == '|'),
            ),
            _ => TokenKind::Error("expected symbol after `#`".into()),
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Main entry point
    // ───────────────────────────────────────────────────────────

    pub fn next_token(&mut self) -> Token {
        if let Some(error) = self.skip_trivia() {
            return self.finish(error);
        }
        let start = self.pos();
        let Some(c) = self.peek() else {
            return self.finish(Token::new(TokenKind::Eof, Span::point(start)));
        };

        let kind = match c {
            c if c.is_ascii_digit() => self.lex_number(false),
            '-' if !self.last_ends_operand
                && self.peek_ahead(1).is_some_and(|d| d.is_ascii_digit()) =>
            {
                self.advance();
                self.lex_number(true)
            }
            c if is_identifier_start(c) => self.lex_identifier(),
            '\'' => TokenKind::String(self.lex_quoted()),
            '$' => {
                self.advance();
                match self.advance() {
                    Some(ch) => TokenKind::Character(ch),
                    None => TokenKind::Error(
                        "expected character after `$`".into(),
                    ),
                }
            }
            '#' => self.lex_hash(),
            ':' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        TokenKind::Assign
                    }
                    Some(c) if is_identifier_start(c) => {
                        TokenKind::BlockArg(self.take_while(is_identifier_char))
                    }
                    _ => TokenKind::Error("unexpected `:`".into()),
                }
            }
            c if is_binary_char(c) => {
                TokenKind::Binary(self.take_while(is_binary_char))
            }
            _ => {
                self.advance();
                match c {
                    '^' => TokenKind::Caret,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '|' => TokenKind::Pipe,
                    '.' => TokenKind::Dot,
                    ';' => TokenKind::Semicolon,
                    other => {
                        TokenKind::Error(format!("unexpected character {other:?}"))
                    }
                }
            }
        };

        let span = Span::new(start, self.pos());
        self.finish(Token::new(kind, span))
    }

    fn finish(&mut self, token: Token) -> Token {
        self.last_ends_operand = token.kind.ends_operand();
        if token.is_eof() {
            self.emitted_eof = true;
        }
        token
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        Some(self.next_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(kinds("-7 42 16rFF 2r1010 1e3"), vec![
            TokenKind::Integer(-7),
            TokenKind::Integer(42),
            TokenKind::Integer(255),
            TokenKind::Integer(10),
            TokenKind::Integer(1000),
            TokenKind::Eof,
        ]);
        assert_eq!(kinds("3.25 1.5e2"), vec![
            TokenKind::Float(3.25),
            TokenKind::Float(150.0),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn oversized_integers_are_reported_as_written() {
        assert_eq!(kinds("1e400"), vec![
            TokenKind::Error("integer literal 1e400 out of range".into()),
            TokenKind::Eof,
        ]);
        assert_eq!(kinds("-99999999999999999999"), vec![
            TokenKind::Error("integer literal -99999999999999999999 out of range".into()),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn minus_after_operand_is_binary() {
        assert_eq!(kinds("x-1"), vec![
            TokenKind::Identifier("x".into()),
            TokenKind::Binary("-".into()),
            TokenKind::Integer(1),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn keeps_string_lexeme_raw() {
        assert_eq!(kinds("'it''s'"), vec![
            TokenKind::String("'it''s'".into()),
            TokenKind::Eof,
        ]);
        assert_eq!(kinds("'open"), vec![
            TokenKind::String("'open".into()),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn lexes_symbols_keywords_and_block_args() {
        assert_eq!(kinds("#at:put: #+ #'a b' at: [:each | each] x := $c"), vec![
            TokenKind::Symbol("at:put:".into()),
            TokenKind::Symbol("+".into()),
            TokenKind::QuotedSymbol("'a b'".into()),
            TokenKind::Keyword("at:".into()),
            TokenKind::LBracket,
            TokenKind::BlockArg("each".into()),
            TokenKind::Pipe,
            TokenKind::Identifier("each".into()),
            TokenKind::RBracket,
            TokenKind::Identifier("x".into()),
            TokenKind::Assign,
            TokenKind::Character('c'),
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn skips_comments_and_tracks_lines() {
        let tokens: Vec<Token> =
            Lexer::new("\"a comment\"\nfoo\n  bar").collect();
        assert_eq!(tokens[0].kind, TokenKind::Identifier("foo".into()));
        assert_eq!(tokens[0].line(), 2);
        assert_eq!(tokens[1].line(), 3);
        assert_eq!(tokens[1].span.start.column, 3);
    }

    #[test]
    fn unterminated_comment_is_an_error_token() {
        assert!(matches!(kinds("\"never closed")[0], TokenKind::Error(_)));
    }
}
