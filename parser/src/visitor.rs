use crate::ast::{
    ArrayElement, BlockNode, Expr, ExprKind, Literal, Message, Node, Number,
    PseudoVariable, Special, Statement, StatementKind,
};

/// Double dispatch over AST node kinds.
///
/// Each node's `accept` calls exactly one of these operations and passes the
/// node's own state (value, array index, line, children). Composite
/// operations receive their children by reference and decide themselves
/// whether and in which order to `accept` them. None of the operations has
/// a default body, so a new node kind is a compile error in every visitor
/// until it is handled.
pub trait NodeVisitor {
    type Error;

    fn visit_string_constant(
        &mut self,
        value: &str,
        index: usize,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_symbol_constant(
        &mut self,
        value: &str,
        index: usize,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_number_constant(
        &mut self,
        value: Number,
        index: usize,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_character_constant(
        &mut self,
        value: char,
        index: usize,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_special_constant(
        &mut self,
        value: Special,
        index: usize,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_array_constant(
        &mut self,
        elements: &[Literal],
        index: usize,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_variable(&mut self, name: &str, line: usize)
    -> Result<(), Self::Error>;

    fn visit_pseudo_variable(
        &mut self,
        variable: PseudoVariable,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_assignment(
        &mut self,
        target: &str,
        value: &Expr,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_message_send(
        &mut self,
        receiver: &Expr,
        message: &Message,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_cascade(
        &mut self,
        receiver: &Expr,
        messages: &[Message],
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_block(
        &mut self,
        block: &BlockNode,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_brace_array(
        &mut self,
        elements: &[Expr],
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_expression_statement(
        &mut self,
        expr: &Expr,
        line: usize,
    ) -> Result<(), Self::Error>;

    fn visit_return_statement(
        &mut self,
        expr: &Expr,
        line: usize,
    ) -> Result<(), Self::Error>;
}

impl Literal {
    pub fn accept<V: NodeVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        let (index, line) = (self.index(), self.line());
        match self {
            Self::String(c) => visitor.visit_string_constant(c.value(), index, line),
            Self::Symbol(c) => visitor.visit_symbol_constant(c.value(), index, line),
            Self::Number(c) => visitor.visit_number_constant(c.value(), index, line),
            Self::Character(c) => {
                visitor.visit_character_constant(c.value(), index, line)
            }
            Self::Special(c) => visitor.visit_special_constant(c.value(), index, line),
            Self::Array(c) => visitor.visit_array_constant(c.elements(), index, line),
        }
    }
}

impl Expr {
    pub fn accept<V: NodeVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        let line = self.line();
        match &self.kind {
            ExprKind::Literal(literal) => literal.accept(visitor),
            ExprKind::Variable(name) => visitor.visit_variable(name, line),
            ExprKind::Pseudo(variable) => visitor.visit_pseudo_variable(*variable, line),
            ExprKind::Assignment { target, value } => {
                visitor.visit_assignment(target, value, line)
            }
            ExprKind::Send { receiver, message } => {
                visitor.visit_message_send(receiver, message, line)
            }
            ExprKind::Cascade { receiver, messages } => {
                visitor.visit_cascade(receiver, messages, line)
            }
            ExprKind::Block(block) => visitor.visit_block(block, line),
            ExprKind::Brace(elements) => visitor.visit_brace_array(elements, line),
        }
    }
}

impl Statement {
    pub fn accept<V: NodeVisitor>(&self, visitor: &mut V) -> Result<(), V::Error> {
        let line = self.line();
        match &self.kind {
            StatementKind::Expression(expr) => {
                visitor.visit_expression_statement(expr, line)
            }
            StatementKind::Return(expr) => visitor.visit_return_statement(expr, line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;

    /// Records one line per visit and walks children depth-first.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl NodeVisitor for Recorder {
        type Error = ();

        fn visit_string_constant(&mut self, value: &str, index: usize, line: usize) -> Result<(), ()> {
            self.events.push(format!("string {value} @{index} L{line}"));
            Ok(())
        }

        fn visit_symbol_constant(&mut self, value: &str, index: usize, line: usize) -> Result<(), ()> {
            self.events.push(format!("symbol {value} @{index} L{line}"));
            Ok(())
        }

        fn visit_number_constant(&mut self, value: Number, index: usize, _line: usize) -> Result<(), ()> {
            self.events.push(format!("number {value:?} @{index}"));
            Ok(())
        }

        fn visit_character_constant(&mut self, value: char, index: usize, _line: usize) -> Result<(), ()> {
            self.events.push(format!("char {value} @{index}"));
            Ok(())
        }

        fn visit_special_constant(&mut self, value: Special, index: usize, _line: usize) -> Result<(), ()> {
            self.events.push(format!("special {value:?} @{index}"));
            Ok(())
        }

        fn visit_array_constant(&mut self, elements: &[Literal], index: usize, _line: usize) -> Result<(), ()> {
            self.events.push(format!("array {} @{index}", elements.len()));
            elements.iter().try_for_each(|e| e.accept(self))
        }

        fn visit_variable(&mut self, name: &str, _line: usize) -> Result<(), ()> {
            self.events.push(format!("var {name}"));
            Ok(())
        }

        fn visit_pseudo_variable(&mut self, variable: PseudoVariable, _line: usize) -> Result<(), ()> {
            self.events.push(format!("pseudo {variable:?}"));
            Ok(())
        }

        fn visit_assignment(&mut self, target: &str, value: &Expr, _line: usize) -> Result<(), ()> {
            self.events.push(format!("assign {target}"));
            value.accept(self)
        }

        fn visit_message_send(&mut self, receiver: &Expr, message: &Message, _line: usize) -> Result<(), ()> {
            self.events.push(format!("send {}", message.selector));
            receiver.accept(self)?;
            message.arguments.iter().try_for_each(|a| a.accept(self))
        }

        fn visit_cascade(&mut self, receiver: &Expr, messages: &[Message], _line: usize) -> Result<(), ()> {
            self.events.push(format!("cascade {}", messages.len()));
            receiver.accept(self)
        }

        fn visit_block(&mut self, block: &BlockNode, _line: usize) -> Result<(), ()> {
            self.events.push(format!("block {}", block.parameters.len()));
            block.statements.iter().try_for_each(|s| s.accept(self))
        }

        fn visit_brace_array(&mut self, elements: &[Expr], _line: usize) -> Result<(), ()> {
            self.events.push(format!("brace {}", elements.len()));
            Ok(())
        }

        fn visit_expression_statement(&mut self, expr: &Expr, _line: usize) -> Result<(), ()> {
            self.events.push("statement".into());
            expr.accept(self)
        }

        fn visit_return_statement(&mut self, expr: &Expr, line: usize) -> Result<(), ()> {
            self.events.push(format!("return L{line}"));
            expr.accept(self)
        }
    }

    fn record(source: &str) -> Vec<String> {
        let method = Parser::new(source).parse_do_it().expect("parse");
        let mut recorder = Recorder::default();
        for statement in &method.statements {
            statement.accept(&mut recorder).unwrap();
        }
        recorder.events
    }

    #[test]
    fn return_of_string_dispatches_once_per_node() {
        assert_eq!(record("^'abc'"), vec!["return L1", "string abc @0 L1"]);
    }

    #[test]
    fn array_elements_report_their_index() {
        assert_eq!(record("#(1 'two' #three $4 nil)"), vec![
            "statement",
            "array 5 @0",
            "number Integer(1) @0",
            "string two @1 L1",
            "symbol three @2 L1",
            "char 4 @3",
            "special Nil @4",
        ]);
    }

    #[test]
    fn sends_visit_receiver_then_arguments() {
        assert_eq!(record("x := 3 max: y"), vec![
            "statement",
            "assign x",
            "send max:",
            "number Integer(3) @0",
            "var y",
        ]);
    }
}
