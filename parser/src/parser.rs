use crate::ast::{
    ArrayConstant, BlockNode, CharacterConstant, ClassNode, DoItNode, Expr,
    ExprKind, ExtensionNode, Item, Literal, Message, MethodNode, Node, Number,
    NumberConstant, PseudoVariable, SourceFile, Special, SpecialConstant,
    Statement, StringConstant, SymbolConstant,
};
use crate::lexer::Lexer;
use crate::span::{Pos, Span};
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// A quoted lexeme whose delimiters or inner quotes don't pair up.
    #[error("line {line}: malformed literal {lexeme}")]
    MalformedLiteral { lexeme: String, line: usize },
    #[error("{span}: {message}")]
    Syntax { message: String, span: Span },
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::MalformedLiteral { line, .. } => *line,
            Self::Syntax { span, .. } => span.line(),
        }
    }
}

/// Recursive-descent parser over the whole token stream of one source text.
///
/// The token vector always ends in [`TokenKind::Eof`], so lookahead past the
/// end keeps answering `Eof`.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let mut tokens: Vec<Token> = Lexer::new(source).collect();
        if tokens.last().is_none_or(|t| !t.is_eof()) {
            tokens.push(Token::new(TokenKind::Eof, Span::point(Pos::origin())));
        }
        Self { tokens, pos: 0 }
    }

    // ───────────────────────────────────────────────────────────
    //  Token plumbing
    // ───────────────────────────────────────────────────────────

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<Token, ParseError> {
        if self.check(expected) {
            return Ok(self.advance());
        }
        Err(self.unexpected(expected.name()))
    }

    fn expect_identifier(&mut self) -> Result<(String, usize), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let line = self.advance().line();
                Ok((name, line))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match &token.kind {
            TokenKind::Error(message) => ParseError::new(message.clone(), token.span),
            found => ParseError::new(
                format!("expected {expected}, found {}", found.name()),
                token.span,
            ),
        }
    }

    fn is_identifier(&self, n: usize, name: &str) -> bool {
        matches!(&self.peek_at(n).kind, TokenKind::Identifier(id) if id == name)
    }

    fn is_binary(&self, n: usize, op: &str) -> bool {
        matches!(&self.peek_at(n).kind, TokenKind::Binary(b) if b == op)
    }

    fn adjacent(&self, n: usize) -> bool {
        self.peek_at(n).span.end.offset == self.peek_at(n + 1).span.start.offset
    }

    // ───────────────────────────────────────────────────────────
    //  Entry points
    // ───────────────────────────────────────────────────────────

    /// Parse a whole file: class definitions, extensions and do-its, in
    /// source order.
    pub fn parse_file(&mut self) -> Result<SourceFile, ParseError> {
        let mut file = SourceFile::default();
        loop {
            while matches!(self.peek_kind(), TokenKind::Dot)
                || self.is_binary(0, "!")
            {
                self.advance();
            }
            if self.peek().is_eof() {
                return Ok(file);
            }
            let item = if self.at_class_definition() {
                Item::Class(self.parse_class()?)
            } else if let Some(class_side) = self.at_extension() {
                Item::Extension(self.parse_extension(class_side)?)
            } else {
                Item::DoIt(self.parse_top_level_do_it()?)
            };
            file.items.push(item);
        }
    }

    /// Parse `pattern statements` with no surrounding brackets, e.g.
    /// `at: i put: v ^ items at: i put: v`.
    pub fn parse_method(&mut self) -> Result<MethodNode, ParseError> {
        let (selector, parameters, line) = self.parse_pattern()?;
        let temporaries = self.parse_body_header()?;
        let statements = self.parse_statements(&TokenKind::Eof)?;
        self.expect(&TokenKind::Eof)?;
        Ok(MethodNode::new(selector, parameters, temporaries, statements, line))
    }

    /// Parse the whole source as one run of statements.
    pub fn parse_do_it(&mut self) -> Result<DoItNode, ParseError> {
        let line = self.peek().line();
        let temporaries = self.parse_temporaries()?;
        let statements = self.parse_statements(&TokenKind::Eof)?;
        self.expect(&TokenKind::Eof)?;
        Ok(DoItNode::new(temporaries, statements, line))
    }

    /// Parse a single expression that must span the whole source.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        self.expect(&TokenKind::Eof)?;
        Ok(expr)
    }

    // ───────────────────────────────────────────────────────────
    //  Definitions
    // ───────────────────────────────────────────────────────────

    /// `Super subclass: Name [`
    fn at_class_definition(&self) -> bool {
        matches!(self.peek_at(0).kind, TokenKind::Identifier(_))
            && matches!(&self.peek_at(1).kind, TokenKind::Keyword(k) if k == "subclass:")
            && matches!(self.peek_at(2).kind, TokenKind::Identifier(_))
            && matches!(self.peek_at(3).kind, TokenKind::LBracket)
    }

    /// `Name extend [` or `Name class extend [`; answers whether the
    /// extension is class-side.
    fn at_extension(&self) -> Option<bool> {
        if !matches!(self.peek_at(0).kind, TokenKind::Identifier(_)) {
            return None;
        }
        if self.is_identifier(1, "extend") && self.check_at(2, &TokenKind::LBracket) {
            return Some(false);
        }
        if self.is_identifier(1, "class")
            && self.is_identifier(2, "extend")
            && self.check_at(3, &TokenKind::LBracket)
        {
            return Some(true);
        }
        None
    }

    fn check_at(&self, n: usize, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek_at(n).kind) == std::mem::discriminant(kind)
    }

    fn parse_class(&mut self) -> Result<ClassNode, ParseError> {
        let (superclass, line) = self.expect_identifier()?;
        self.advance(); // subclass:
        let (name, _) = self.expect_identifier()?;
        self.expect(&TokenKind::LBracket)?;

        let mut class = ClassNode::new(name, superclass, line);
        loop {
            match self.peek_kind().clone() {
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(class);
                }
                TokenKind::Pipe => {
                    let names = self.parse_temporaries()?;
                    class.instance_variables.extend(names);
                }
                TokenKind::Binary(op) if op == "<" => self.skip_pragma()?,
                _ if self.is_identifier(0, &class.name)
                    && self.is_identifier(1, "class")
                    && self.is_binary(2, ">>") =>
                {
                    self.pos += 3;
                    let method = self.parse_bracketed_method()?;
                    class.class_methods.push(method);
                }
                _ => {
                    let method = self.parse_bracketed_method()?;
                    class.methods.push(method);
                }
            }
        }
    }

    fn parse_extension(&mut self, class_side: bool) -> Result<ExtensionNode, ParseError> {
        let (class_name, line) = self.expect_identifier()?;
        self.pos += if class_side { 2 } else { 1 };
        self.expect(&TokenKind::LBracket)?;

        let mut extension = ExtensionNode::new(class_name, line);
        loop {
            match self.peek_kind().clone() {
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(extension);
                }
                TokenKind::Binary(op) if op == "<" => self.skip_pragma()?,
                _ => {
                    let method = self.parse_bracketed_method()?;
                    if class_side {
                        extension.class_methods.push(method);
                    } else {
                        extension.methods.push(method);
                    }
                }
            }
        }
    }

    fn parse_bracketed_method(&mut self) -> Result<MethodNode, ParseError> {
        let (selector, parameters, line) = self.parse_pattern()?;
        self.expect(&TokenKind::LBracket)?;
        let temporaries = self.parse_body_header()?;
        let statements = self.parse_statements(&TokenKind::RBracket)?;
        self.expect(&TokenKind::RBracket)?;
        Ok(MethodNode::new(selector, parameters, temporaries, statements, line))
    }

    /// Unary, binary or keyword message pattern.
    fn parse_pattern(&mut self) -> Result<(String, Vec<String>, usize), ParseError> {
        let line = self.peek().line();
        match self.peek_kind().clone() {
            TokenKind::Identifier(selector) => {
                self.advance();
                Ok((selector, Vec::new(), line))
            }
            TokenKind::Binary(op) => {
                self.advance();
                let (parameter, _) = self.expect_identifier()?;
                Ok((op, vec![parameter], line))
            }
            TokenKind::Pipe => {
                self.advance();
                let (parameter, _) = self.expect_identifier()?;
                Ok(("|".into(), vec![parameter], line))
            }
            TokenKind::Keyword(_) => {
                let mut selector = String::new();
                let mut parameters = Vec::new();
                while let TokenKind::Keyword(part) = self.peek_kind().clone() {
                    self.advance();
                    selector.push_str(&part);
                    parameters.push(self.expect_identifier()?.0);
                }
                Ok((selector, parameters, line))
            }
            _ => Err(self.unexpected("message pattern")),
        }
    }

    /// Pragmas and temporaries, in any order, ahead of a method body.
    fn parse_body_header(&mut self) -> Result<Vec<String>, ParseError> {
        let mut temporaries = Vec::new();
        loop {
            match self.peek_kind().clone() {
                TokenKind::Binary(op) if op == "<" => self.skip_pragma()?,
                TokenKind::Pipe => temporaries.extend(self.parse_temporaries()?),
                _ => return Ok(temporaries),
            }
        }
    }

    /// `<comment: 'text'>`, `<primitive: 60>` and the like carry nothing
    /// the compiler uses.
    fn skip_pragma(&mut self) -> Result<(), ParseError> {
        let open = self.advance();
        loop {
            if self.is_binary(0, ">") {
                self.advance();
                return Ok(());
            }
            if self.peek().is_eof() {
                return Err(ParseError::new("unterminated pragma", open.span));
            }
            self.advance();
        }
    }

    // ───────────────────────────────────────────────────────────
    //  Statements
    // ───────────────────────────────────────────────────────────

    /// `| a b c |`, or nothing.
    fn parse_temporaries(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        if !self.check(&TokenKind::Pipe) {
            return Ok(names);
        }
        self.advance();
        while let TokenKind::Identifier(name) = self.peek_kind().clone() {
            self.advance();
            names.push(name);
        }
        self.expect(&TokenKind::Pipe)?;
        Ok(names)
    }

    fn parse_top_level_do_it(&mut self) -> Result<DoItNode, ParseError> {
        let line = self.peek().line();
        let temporaries = self.parse_temporaries()?;
        let mut statements = Vec::new();
        loop {
            if self.peek().is_eof()
                || self.at_class_definition()
                || self.at_extension().is_some()
            {
                break;
            }
            statements.push(self.parse_statement()?);
            if self.check(&TokenKind::Dot) || self.is_binary(0, "!") {
                self.advance();
            } else if !(self.peek().is_eof()
                || self.at_class_definition()
                || self.at_extension().is_some())
            {
                return Err(self.unexpected("`.`"));
            }
        }
        Ok(DoItNode::new(temporaries, statements, line))
    }

    /// Statements separated by `.` up to (not including) `terminator`.
    fn parse_statements(&mut self, terminator: &TokenKind) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.check(&TokenKind::Dot) {
                self.advance();
            }
            if self.check(terminator) {
                return Ok(statements);
            }
            statements.push(self.parse_statement()?);
            if self.check(&TokenKind::Dot) {
                continue;
            }
            if self.check(terminator) {
                return Ok(statements);
            }
            return Err(self.unexpected(&format!("`.` or {}", terminator.name())));
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        if self.check(&TokenKind::Caret) {
            let line = self.advance().line();
            return Ok(Statement::ret(self.expression()?, line));
        }
        Ok(Statement::expression(self.expression()?))
    }

    // ───────────────────────────────────────────────────────────
    //  Expressions
    // ───────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, ParseError> {
        if let (TokenKind::Identifier(target), TokenKind::Assign) =
            (&self.peek_at(0).kind, &self.peek_at(1).kind)
        {
            let target = target.clone();
            let line = self.advance().line();
            self.advance();
            if PseudoVariable::from_name(&target).is_some() {
                return Err(ParseError::new(
                    format!("cannot assign to {target}"),
                    self.peek().span,
                ));
            }
            let value = self.expression()?;
            return Ok(Expr::new(
                ExprKind::Assignment {
                    target,
                    value: Box::new(value),
                },
                line,
            ));
        }
        self.cascade()
    }

    fn cascade(&mut self) -> Result<Expr, ParseError> {
        let expr = self.keyword_send()?;
        if !self.check(&TokenKind::Semicolon) {
            return Ok(expr);
        }
        let line = expr.line();
        let ExprKind::Send { receiver, message } = expr.kind else {
            return Err(ParseError::new("expected cascade message", self.peek().span));
        };
        let mut messages = vec![message];
        while self.check(&TokenKind::Semicolon) {
            self.advance();
            messages.push(self.cascade_message()?);
        }
        Ok(Expr::new(ExprKind::Cascade { receiver, messages }, line))
    }

    /// One message of a cascade part, sent to the cascade receiver.
    fn cascade_message(&mut self) -> Result<Message, ParseError> {
        let line = self.peek().line();
        match self.peek_kind().clone() {
            TokenKind::Identifier(selector) => {
                self.advance();
                Ok(Message::new(selector, Vec::new(), line))
            }
            TokenKind::Binary(_) | TokenKind::Pipe => {
                let selector = self.binary_selector()?;
                let argument = self.unary_send()?;
                Ok(Message::new(selector, vec![argument], line))
            }
            TokenKind::Keyword(_) => {
                let (selector, arguments) = self.keyword_parts()?;
                Ok(Message::new(selector, arguments, line))
            }
            _ => Err(self.unexpected("cascade message")),
        }
    }

    fn keyword_send(&mut self) -> Result<Expr, ParseError> {
        let receiver = self.binary_send()?;
        if !matches!(self.peek_kind(), TokenKind::Keyword(_)) {
            return Ok(receiver);
        }
        let line = self.peek().line();
        let (selector, arguments) = self.keyword_parts()?;
        Ok(send(receiver, Message::new(selector, arguments, line)))
    }

    fn keyword_parts(&mut self) -> Result<(String, Vec<Expr>), ParseError> {
        let mut selector = String::new();
        let mut arguments = Vec::new();
        while let TokenKind::Keyword(part) = self.peek_kind().clone() {
            self.advance();
            selector.push_str(&part);
            arguments.push(self.binary_send()?);
        }
        Ok((selector, arguments))
    }

    fn binary_send(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary_send()?;
        while matches!(self.peek_kind(), TokenKind::Binary(_) | TokenKind::Pipe) {
            let line = self.peek().line();
            let selector = self.binary_selector()?;
            let argument = self.unary_send()?;
            expr = send(expr, Message::new(selector, vec![argument], line));
        }
        Ok(expr)
    }

    fn binary_selector(&mut self) -> Result<String, ParseError> {
        match self.advance().kind {
            TokenKind::Binary(op) => Ok(op),
            TokenKind::Pipe => Ok("|".into()),
            _ => Err(self.unexpected("binary selector")),
        }
    }

    fn unary_send(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while let TokenKind::Identifier(selector) = self.peek_kind().clone() {
            // `x foo := 3` never happens; an identifier after an operand is
            // always a unary selector
            let line = self.advance().line();
            expr = send(expr, Message::new(selector, Vec::new(), line));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        let line = token.line();
        let kind = match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                match PseudoVariable::from_name(&name) {
                    Some(pseudo) => ExprKind::Pseudo(pseudo),
                    None => ExprKind::Variable(name),
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => ExprKind::Block(self.block()?),
            TokenKind::LBrace => {
                self.advance();
                let mut elements = Vec::new();
                loop {
                    while self.check(&TokenKind::Dot) {
                        self.advance();
                    }
                    if self.check(&TokenKind::RBrace) {
                        break;
                    }
                    elements.push(self.expression()?);
                    if !self.check(&TokenKind::Dot) && !self.check(&TokenKind::RBrace) {
                        return Err(self.unexpected("`.` or `}`"));
                    }
                }
                self.advance();
                ExprKind::Brace(elements)
            }
            TokenKind::LiteralArrayStart => {
                self.advance();
                ExprKind::Literal(Literal::Array(self.literal_array(line)?))
            }
            _ => match self.scalar_literal()? {
                Some(literal) => ExprKind::Literal(literal),
                None => return Err(self.unexpected("expression")),
            },
        };
        Ok(Expr::new(kind, line))
    }

    /// Number, string, symbol or character literal at the current token.
    fn scalar_literal(&mut self) -> Result<Option<Literal>, ParseError> {
        let token = self.peek().clone();
        let line = token.line();
        let literal = match token.kind {
            TokenKind::Integer(v) => {
                Literal::Number(NumberConstant::new(Number::Integer(v), line))
            }
            TokenKind::Float(v) => {
                Literal::Number(NumberConstant::new(Number::Float(v), line))
            }
            TokenKind::String(raw) => Literal::String(StringConstant::new(&raw, line)?),
            TokenKind::Symbol(name) => Literal::Symbol(SymbolConstant::new(name, line)),
            TokenKind::QuotedSymbol(raw) => {
                Literal::Symbol(SymbolConstant::from_quoted(&raw, line)?)
            }
            TokenKind::Character(c) => {
                Literal::Character(CharacterConstant::new(c, line))
            }
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(literal))
    }

    /// Contents of `#( … )` after the opener, through the closing `)`.
    fn literal_array(&mut self, line: usize) -> Result<ArrayConstant, ParseError> {
        let mut elements = Vec::new();
        loop {
            let token = self.peek().clone();
            let element_line = token.line();
            let element = match token.kind {
                TokenKind::RParen => {
                    self.advance();
                    return Ok(ArrayConstant::new(elements, line));
                }
                TokenKind::LParen | TokenKind::LiteralArrayStart => {
                    self.advance();
                    Literal::Array(self.literal_array(element_line)?)
                }
                TokenKind::Identifier(name) => {
                    self.advance();
                    match name.as_str() {
                        "nil" => Literal::Special(SpecialConstant::new(Special::Nil, element_line)),
                        "true" => Literal::Special(SpecialConstant::new(Special::True, element_line)),
                        "false" => {
                            Literal::Special(SpecialConstant::new(Special::False, element_line))
                        }
                        _ => Literal::Symbol(SymbolConstant::new(name, element_line)),
                    }
                }
                TokenKind::Keyword(first) => {
                    self.advance();
                    let mut selector = first;
                    while self.pos > 0 && self.adjacent_previous() {
                        match self.peek_kind().clone() {
                            TokenKind::Keyword(part) => {
                                self.advance();
                                selector.push_str(&part);
                            }
                            _ => break,
                        }
                    }
                    Literal::Symbol(SymbolConstant::new(selector, element_line))
                }
                TokenKind::Binary(op) if op == "-" && self.adjacent(0) => {
                    self.advance();
                    match self.advance().kind {
                        TokenKind::Integer(v) => {
                            Literal::Number(NumberConstant::new(Number::Integer(-v), element_line))
                        }
                        TokenKind::Float(v) => {
                            Literal::Number(NumberConstant::new(Number::Float(-v), element_line))
                        }
                        _ => Literal::Symbol(SymbolConstant::new("-", element_line)),
                    }
                }
                TokenKind::Binary(op) => {
                    self.advance();
                    Literal::Symbol(SymbolConstant::new(op, element_line))
                }
                TokenKind::Pipe => {
                    self.advance();
                    Literal::Symbol(SymbolConstant::new("|", element_line))
                }
                TokenKind::Eof => {
                    return Err(ParseError::new("unterminated literal array", token.span));
                }
                _ => match self.scalar_literal()? {
                    Some(literal) => literal,
                    None => return Err(self.unexpected("literal")),
                },
            };
            elements.push(element);
        }
    }

    /// Whether the current token starts right where the previous one ended.
    fn adjacent_previous(&self) -> bool {
        self.tokens[self.pos - 1].span.end.offset == self.peek().span.start.offset
    }

    /// `[ :a :b | | t | statements ]`
    fn block(&mut self) -> Result<BlockNode, ParseError> {
        let line = self.advance().line();
        let mut parameters = Vec::new();
        while let TokenKind::BlockArg(name) = self.peek_kind().clone() {
            self.advance();
            parameters.push(name);
        }
        if !parameters.is_empty() {
            if self.check(&TokenKind::Pipe) {
                self.advance();
            } else if !self.check(&TokenKind::RBracket) {
                return Err(self.unexpected("`|`"));
            }
        }
        let temporaries = self.parse_temporaries()?;
        let statements = self.parse_statements(&TokenKind::RBracket)?;
        self.expect(&TokenKind::RBracket)?;
        Ok(BlockNode::new(parameters, temporaries, statements, line))
    }
}

fn send(receiver: Expr, message: Message) -> Expr {
    let line = receiver.line();
    Expr::new(
        ExprKind::Send {
            receiver: Box::new(receiver),
            message,
        },
        line,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArrayElement, StatementKind};

    fn expr(source: &str) -> Expr {
        Parser::new(source).parse_expression().expect("parse")
    }

    fn selector_of(expr: &Expr) -> &str {
        match &expr.kind {
            ExprKind::Send { message, .. } => &message.selector,
            other => panic!("not a send: {other:?}"),
        }
    }

    #[test]
    fn unary_binds_tighter_than_binary_tighter_than_keyword() {
        let e = expr("a foo + b bar max: c baz");
        assert_eq!(selector_of(&e), "max:");
        let ExprKind::Send { receiver, message } = &e.kind else {
            unreachable!()
        };
        assert_eq!(selector_of(receiver), "+");
        assert_eq!(selector_of(&message.arguments[0]), "baz");
    }

    #[test]
    fn keyword_parts_join_into_one_selector() {
        let e = expr("dict at: 1 put: 2");
        assert_eq!(selector_of(&e), "at:put:");
    }

    #[test]
    fn cascade_shares_the_receiver() {
        let e = expr("Transcript show: 'a'; cr; show: 'b'");
        let ExprKind::Cascade { receiver, messages } = &e.kind else {
            panic!("not a cascade: {e:?}")
        };
        assert_eq!(receiver.kind, ExprKind::Variable("Transcript".into()));
        let selectors: Vec<&str> =
            messages.iter().map(|m| m.selector.as_str()).collect();
        assert_eq!(selectors, vec!["show:", "cr", "show:"]);
    }

    #[test]
    fn blocks_take_parameters_and_temporaries() {
        let e = expr("[:x :y | | t | t := x + y. ^t]");
        let ExprKind::Block(block) = &e.kind else {
            panic!("not a block")
        };
        assert_eq!(block.parameters, vec!["x", "y"]);
        assert_eq!(block.temporaries, vec!["t"]);
        assert_eq!(block.statements.len(), 2);
        assert!(block.statements[1].is_return());
    }

    #[test]
    fn literal_arrays_nest_and_index_their_elements() {
        let e = expr("#(1 -2 foo at:put: #bar (nil true) $a 'str')");
        let ExprKind::Literal(Literal::Array(array)) = &e.kind else {
            panic!("not an array")
        };
        let elements = array.elements();
        assert_eq!(elements.len(), 8);
        assert!(matches!(&elements[1], Literal::Number(n) if n.value() == Number::Integer(-2)));
        assert!(matches!(&elements[2], Literal::Symbol(s) if s.value() == "foo"));
        assert!(matches!(&elements[3], Literal::Symbol(s) if s.value() == "at:put:"));
        assert!(matches!(&elements[5], Literal::Array(a) if a.elements().len() == 2));
        for (i, element) in elements.iter().enumerate() {
            assert_eq!(element.index(), i);
        }
    }

    #[test]
    fn statements_record_their_lines() {
        let doit = Parser::new("| a |\na := 1.\n\n^a").parse_do_it().unwrap();
        assert_eq!(doit.temporaries, vec!["a"]);
        assert_eq!(doit.statements[0].line(), 2);
        assert_eq!(doit.statements[1].line(), 4);
        assert!(matches!(doit.statements[1].kind, StatementKind::Return(_)));
    }

    #[test]
    fn class_definitions_extensions_and_do_its() {
        let source = r#"
Object subclass: Animal [
    | name sound |
    <comment: 'An animal'>
    Animal class >> named: aString [ ^self new setName: aString ]
    setName: aString [ name := aString ]
    speak [ ^name, ' says ', sound ]
    = other [ ^name = other name ]
]

Animal extend [ name [ ^name ] ]
Animal class extend [ default [ ^self named: 'x' ] ]

Transcript showCr: 'loaded'.
"#;
        let file = Parser::new(source).parse_file().unwrap();
        assert_eq!(file.items.len(), 4);
        let Item::Class(class) = &file.items[0] else {
            panic!("expected class")
        };
        assert_eq!(class.name, "Animal");
        assert_eq!(class.superclass, "Object");
        assert_eq!(class.instance_variables, vec!["name", "sound"]);
        assert_eq!(class.class_methods[0].selector, "named:");
        let selectors: Vec<&str> =
            class.methods.iter().map(|m| m.selector.as_str()).collect();
        assert_eq!(selectors, vec!["setName:", "speak", "="]);
        assert!(matches!(&file.items[1], Item::Extension(e) if e.methods.len() == 1));
        assert!(matches!(&file.items[2], Item::Extension(e) if e.class_methods.len() == 1));
        assert!(matches!(&file.items[3], Item::DoIt(d) if d.statements.len() == 1));
    }

    #[test]
    fn method_source_without_brackets() {
        let method = Parser::new("at: i put: v | old | old := v. ^old")
            .parse_method()
            .unwrap();
        assert_eq!(method.selector, "at:put:");
        assert_eq!(method.parameters, vec!["i", "v"]);
        assert_eq!(method.temporaries, vec!["old"]);
    }

    #[test]
    fn malformed_string_surfaces_as_malformed_literal() {
        let err = Parser::new("x := 'oops").parse_do_it().unwrap_err();
        assert!(matches!(err, ParseError::MalformedLiteral { line: 1, .. }));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let err = Parser::new("\n\nfoo bar: ]").parse_do_it().unwrap_err();
        assert_eq!(err.line(), 3);
        assert!(err.to_string().contains("expected expression"));
    }

    #[test]
    fn pseudo_variables_cannot_be_assigned() {
        assert!(Parser::new("self := 3").parse_expression().is_err());
    }
}
