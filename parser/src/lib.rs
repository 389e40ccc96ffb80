//! # Parser
//!
//! Lexer, parser and AST for the bracket syntax of Redline Smalltalk source
//! files.
//!
//! ## Architecture
//!
//! ```text
//!  &str
//!    │
//!    ▼
//!  ┌────────┐    Token stream     ┌────────┐    SourceFile / DoItNode / …
//!  │ Lexer  │ ──────────────────▶ │ Parser │ ──────────────────▶
//!  └────────┘  (impl Iterator)    └────────┘
//! ```
//!
//! Downstream passes walk the tree through [`NodeVisitor`]: every node's
//! `accept` dispatches to exactly one visitor operation.
//!
//! ```rust
//! use parser::{Item, Parser};
//!
//! let source = "Object subclass: Point [ |x y| x [ ^x ] ]\nPoint new x.";
//! let file = Parser::new(source).parse_file().unwrap();
//! assert!(matches!(file.items[0], Item::Class(_)));
//! assert!(matches!(file.items[1], Item::DoIt(_)));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod token;
pub mod visitor;

pub use ast::{
    ArrayConstant, ArrayElement, BlockNode, CharacterConstant, ClassNode,
    DoItNode, Expr, ExprKind, ExtensionNode, Item, Literal, Message,
    MethodNode, Node, Number, NumberConstant, PseudoVariable, SourceFile,
    Special, SpecialConstant, Statement, StatementKind, StringConstant,
    SymbolConstant,
};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser};
pub use span::{Pos, Span};
pub use token::{Token, TokenKind};
pub use visitor::NodeVisitor;

/// Parse a complete source file.
pub fn parse_file(source: &str) -> Result<SourceFile, ParseError> {
    let file = Parser::new(source).parse_file()?;
    log::trace!("parsed {} top-level items", file.items.len());
    Ok(file)
}

/// Parse source text as a single do-it.
pub fn parse_do_it(source: &str) -> Result<DoItNode, ParseError> {
    Parser::new(source).parse_do_it()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_between_items_are_ignored() {
        let file = parse_file(
            "\"a counter\"\nObject subclass: Counter [ |n| ]\n\"bump it\"\nCounter new.",
        )
        .unwrap();
        assert_eq!(file.items.len(), 2);
    }

    #[test]
    fn empty_source_has_no_items() {
        assert!(parse_file("").unwrap().items.is_empty());
        assert!(parse_do_it("  \"only a comment\" ").unwrap().statements.is_empty());
    }

    #[test]
    fn unterminated_comment_reports_an_error() {
        let err = parse_do_it("1 + \"never").unwrap_err();
        assert!(err.to_string().contains("unterminated comment"));
    }

    #[test]
    fn do_its_split_around_definitions() {
        let file = parse_file(
            "x := 1.\nObject subclass: A [ ]\ny := 2.\nz := 3",
        )
        .unwrap();
        assert_eq!(file.items.len(), 3);
        assert!(matches!(&file.items[2], Item::DoIt(d) if d.statements.len() == 2));
    }
}
