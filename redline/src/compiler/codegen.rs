use bytecode::Instruction;
use parser::ast::{
    BlockNode, ClassNode, DoItNode, Expr, ExprKind, ExtensionNode, Literal, Message,
    MethodNode, Node, Number, PseudoVariable, Special, Statement, StatementKind,
};
use parser::NodeVisitor;

use super::{CodeEmitter, CompileError, Constant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Method,
    Block,
    DoIt,
}

/// Names visible in one code object: arguments first, then temporaries.
/// Each scope is one runtime context and owns one constant pool.
#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    arguments: usize,
    names: Vec<String>,
    constants: Vec<Constant>,
}

impl Scope {
    fn new(
        kind: ScopeKind,
        parameters: &[String],
        temporaries: &[String],
        line: usize,
    ) -> Result<Self, CompileError> {
        let names: Vec<String> = parameters.iter().chain(temporaries).cloned().collect();
        if names.len() > usize::from(u16::MAX) {
            return Err(CompileError::TooManyTemporaries { line });
        }
        Ok(Self {
            kind,
            arguments: parameters.len(),
            names,
            constants: Vec::new(),
        })
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.names.iter().rposition(|n| n == name)
    }
}

#[derive(Debug, Clone, Copy)]
enum Variable {
    Local { depth: u16, idx: u16, argument: bool },
    InstVar(u16),
    Global,
}

/// Walks the AST and drives a [`CodeEmitter`].
///
/// Variables resolve innermost first: temporaries and arguments of the
/// current code object, those of enclosing blocks and the home method (by
/// context depth), instance variables, then globals. Constants are
/// registered in the order they are first needed, so indices ascend.
pub struct CodeGenerator<E: CodeEmitter> {
    emitter: E,
    scopes: Vec<Scope>,
    instance_variables: Vec<String>,
    literal_arrays: Vec<Vec<Constant>>,
}

impl<E: CodeEmitter> CodeGenerator<E> {
    pub fn new(emitter: E) -> Self {
        Self {
            emitter,
            scopes: Vec::new(),
            instance_variables: Vec::new(),
            literal_arrays: Vec::new(),
        }
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    // ── Public API ──────────────────────────────────────────────

    /// Compile a class definition. `inherited` lists the instance variables
    /// the superclass already defines.
    pub fn compile_class(
        &mut self,
        class: &ClassNode,
        inherited: &[String],
    ) -> Result<(), CompileError> {
        self.emitter.begin_class(
            &class.name,
            &class.superclass,
            &class.instance_variables,
            class.line(),
        )?;
        let mut instance_variables = inherited.to_vec();
        for name in &class.instance_variables {
            if !instance_variables.contains(name) {
                instance_variables.push(name.clone());
            }
        }
        self.compile_methods(&class.methods, &class.class_methods, instance_variables)?;
        self.emitter.end_class()
    }

    /// Compile an extension of an existing class whose instance variables
    /// are `instance_variables`.
    pub fn compile_extension(
        &mut self,
        extension: &ExtensionNode,
        instance_variables: &[String],
    ) -> Result<(), CompileError> {
        self.emitter
            .begin_extension(&extension.class_name, extension.line())?;
        self.compile_methods(
            &extension.methods,
            &extension.class_methods,
            instance_variables.to_vec(),
        )?;
        self.emitter.end_extension()
    }

    /// Compile a single method for `class_name` as a one-method extension.
    pub fn compile_method(
        &mut self,
        class_name: &str,
        class_side: bool,
        method: &MethodNode,
        instance_variables: &[String],
    ) -> Result<(), CompileError> {
        self.emitter.begin_extension(class_name, method.line())?;
        self.instance_variables = if class_side {
            Vec::new()
        } else {
            instance_variables.to_vec()
        };
        self.method(method, class_side)?;
        self.emitter.end_extension()
    }

    pub fn compile_do_it(&mut self, do_it: &DoItNode) -> Result<(), CompileError> {
        self.instance_variables.clear();
        let scope = Scope::new(ScopeKind::DoIt, &[], &do_it.temporaries, do_it.line())?;
        self.emitter.begin_do_it(scope.names.len(), do_it.line())?;
        self.scopes.push(scope);
        let result = self.value_body(&do_it.statements, do_it.line(), Instruction::ReturnTop);
        self.scopes.pop();
        result?;
        self.emitter.end_do_it()
    }

    // ── Definitions ─────────────────────────────────────────────

    fn compile_methods(
        &mut self,
        methods: &[MethodNode],
        class_methods: &[MethodNode],
        instance_variables: Vec<String>,
    ) -> Result<(), CompileError> {
        self.instance_variables = instance_variables;
        for method in methods {
            self.method(method, false)?;
        }
        // class-side methods see no instance variables
        self.instance_variables.clear();
        for method in class_methods {
            self.method(method, true)?;
        }
        Ok(())
    }

    fn method(&mut self, method: &MethodNode, class_side: bool) -> Result<(), CompileError> {
        let line = method.line();
        let scope = Scope::new(
            ScopeKind::Method,
            &method.parameters,
            &method.temporaries,
            line,
        )?;
        self.emitter.begin_method(
            &method.selector,
            class_side,
            method.parameters.len(),
            scope.names.len(),
            line,
        )?;
        self.scopes.push(scope);
        let result = self.method_body(&method.statements, line);
        self.scopes.pop();
        result?;
        self.emitter.end_method()
    }

    /// Statements of a method; falls through to `^self`.
    fn method_body(&mut self, statements: &[Statement], line: usize) -> Result<(), CompileError> {
        for statement in statements {
            statement.accept(self)?;
        }
        match statements.last() {
            Some(last) if last.is_return() => Ok(()),
            last => {
                let line = last.map_or(line, Node::line);
                self.emit(Instruction::PushSelf, line)?;
                self.emit(Instruction::ReturnTop, line)
            }
        }
    }

    /// Statements of a block or do-it, answering the last expression.
    fn value_body(
        &mut self,
        statements: &[Statement],
        line: usize,
        terminator: Instruction,
    ) -> Result<(), CompileError> {
        let Some((last, rest)) = statements.split_last() else {
            self.emit(Instruction::PushNil, line)?;
            return self.emit(terminator, line);
        };
        for statement in rest {
            statement.accept(self)?;
        }
        match &last.kind {
            StatementKind::Return(_) => last.accept(self),
            StatementKind::Expression(expr) => {
                expr.accept(self)?;
                self.emit(terminator, last.line())
            }
        }
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn emit(&mut self, instruction: Instruction, line: usize) -> Result<(), CompileError> {
        self.emitter.emit(instruction, line)
    }

    fn scope_mut(&mut self, line: usize) -> Result<&mut Scope, CompileError> {
        self.scopes.last_mut().ok_or(CompileError::Misplaced {
            what: "expression",
            expected: "a method, block or do-it",
            line,
        })
    }

    /// Index of `constant` in the current pool, registering it on first use.
    fn constant(&mut self, constant: Constant, line: usize) -> Result<u16, CompileError> {
        let scope = self.scope_mut(line)?;
        if let Some(index) = scope.constants.iter().position(|c| *c == constant) {
            return Ok(index as u16);
        }
        let index = u16::try_from(scope.constants.len())
            .map_err(|_| CompileError::TooManyLiterals { line })?;
        scope.constants.push(constant.clone());
        self.emitter.register_constant(index, constant)?;
        Ok(index)
    }

    /// Push a literal, or collect it when inside a literal array.
    fn literal(&mut self, constant: Constant, index: usize, line: usize) -> Result<(), CompileError> {
        if let Some(elements) = self.literal_arrays.last_mut() {
            debug_assert_eq!(elements.len(), index, "array elements arrive in index order");
            elements.push(constant);
            return Ok(());
        }
        let idx = self.constant(constant, line)?;
        self.emit(Instruction::PushConstant { idx }, line)
    }

    fn resolve(&self, name: &str) -> Result<Variable, CompileError> {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(idx) = scope.find(name) {
                return Ok(Variable::Local {
                    depth: depth as u16,
                    idx: idx as u16,
                    argument: idx < scope.arguments,
                });
            }
        }
        if let Some(idx) = self.instance_variables.iter().rposition(|n| n == name) {
            let idx = u16::try_from(idx).map_err(|_| CompileError::TooManyTemporaries { line: 0 })?;
            return Ok(Variable::InstVar(idx));
        }
        Ok(Variable::Global)
    }

    fn at_top_level(&self) -> bool {
        self.scopes
            .first()
            .is_some_and(|scope| scope.kind == ScopeKind::DoIt)
    }

    fn send(&mut self, message: &Message, to_super: bool) -> Result<(), CompileError> {
        let line = message.line();
        for argument in &message.arguments {
            argument.accept(self)?;
        }
        let argc = u8::try_from(message.arguments.len()).map_err(|_| {
            CompileError::TooManyArguments {
                selector: message.selector.clone(),
                line,
            }
        })?;
        let selector_idx = self.constant(Constant::Symbol(message.selector.clone()), line)?;
        let instruction = if to_super {
            Instruction::SuperSend { selector_idx, argc }
        } else {
            Instruction::Send { selector_idx, argc }
        };
        self.emit(instruction, line)
    }
}

fn is_super(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Pseudo(PseudoVariable::Super))
}

impl<E: CodeEmitter> NodeVisitor for CodeGenerator<E> {
    type Error = CompileError;

    fn visit_string_constant(&mut self, value: &str, index: usize, line: usize) -> Result<(), CompileError> {
        self.literal(Constant::String(value.to_string()), index, line)
    }

    fn visit_symbol_constant(&mut self, value: &str, index: usize, line: usize) -> Result<(), CompileError> {
        self.literal(Constant::Symbol(value.to_string()), index, line)
    }

    fn visit_number_constant(&mut self, value: Number, index: usize, line: usize) -> Result<(), CompileError> {
        let constant = match value {
            Number::Integer(v) => Constant::Integer(v),
            Number::Float(v) => Constant::Float(v),
        };
        self.literal(constant, index, line)
    }

    fn visit_character_constant(&mut self, value: char, index: usize, line: usize) -> Result<(), CompileError> {
        self.literal(Constant::Character(value), index, line)
    }

    fn visit_special_constant(&mut self, value: Special, index: usize, line: usize) -> Result<(), CompileError> {
        let constant = match value {
            Special::Nil => Constant::Nil,
            Special::True => Constant::True,
            Special::False => Constant::False,
        };
        self.literal(constant, index, line)
    }

    fn visit_array_constant(&mut self, elements: &[Literal], index: usize, line: usize) -> Result<(), CompileError> {
        self.literal_arrays.push(Vec::with_capacity(elements.len()));
        let result = elements.iter().try_for_each(|element| element.accept(self));
        let folded = self.literal_arrays.pop().unwrap_or_default();
        result?;
        self.literal(Constant::Array(folded), index, line)
    }

    fn visit_variable(&mut self, name: &str, line: usize) -> Result<(), CompileError> {
        let instruction = match self.resolve(name)? {
            Variable::Local { depth: 0, idx, .. } => Instruction::PushTemp { idx },
            Variable::Local { depth, idx, .. } => Instruction::PushOuterTemp { depth, idx },
            Variable::InstVar(idx) => Instruction::PushInstVar { idx },
            Variable::Global => {
                let name_idx = self.constant(Constant::Symbol(name.to_string()), line)?;
                Instruction::PushGlobal { name_idx }
            }
        };
        self.emit(instruction, line)
    }

    fn visit_pseudo_variable(&mut self, variable: PseudoVariable, line: usize) -> Result<(), CompileError> {
        let instruction = match variable {
            PseudoVariable::SelfRef | PseudoVariable::Super => Instruction::PushSelf,
            PseudoVariable::Nil => Instruction::PushNil,
            PseudoVariable::True => Instruction::PushTrue,
            PseudoVariable::False => Instruction::PushFalse,
            PseudoVariable::ThisContext => {
                return Err(CompileError::Unsupported {
                    construct: "thisContext",
                    line,
                });
            }
        };
        self.emit(instruction, line)
    }

    fn visit_assignment(&mut self, target: &str, value: &Expr, line: usize) -> Result<(), CompileError> {
        value.accept(self)?;
        let instruction = match self.resolve(target)? {
            Variable::Local { argument: true, .. } => {
                return Err(CompileError::ReadOnlyAssignment {
                    name: target.to_string(),
                    line,
                });
            }
            Variable::Local { depth: 0, idx, .. } => Instruction::StoreTemp { idx },
            Variable::Local { depth, idx, .. } => Instruction::StoreOuterTemp { depth, idx },
            Variable::InstVar(idx) => Instruction::StoreInstVar { idx },
            Variable::Global if self.at_top_level() => {
                let name_idx = self.constant(Constant::Symbol(target.to_string()), line)?;
                Instruction::StoreGlobal { name_idx }
            }
            Variable::Global => {
                return Err(CompileError::UndefinedVariable {
                    name: target.to_string(),
                    line,
                });
            }
        };
        self.emit(instruction, line)
    }

    fn visit_message_send(&mut self, receiver: &Expr, message: &Message, _line: usize) -> Result<(), CompileError> {
        receiver.accept(self)?;
        self.send(message, is_super(receiver))
    }

    fn visit_cascade(&mut self, receiver: &Expr, messages: &[Message], _line: usize) -> Result<(), CompileError> {
        let to_super = is_super(receiver);
        receiver.accept(self)?;
        let Some((last, rest)) = messages.split_last() else {
            return Ok(());
        };
        for message in rest {
            self.emit(Instruction::Dup, message.line())?;
            self.send(message, to_super)?;
            self.emit(Instruction::Pop, message.line())?;
        }
        self.send(last, to_super)
    }

    fn visit_block(&mut self, block: &BlockNode, line: usize) -> Result<(), CompileError> {
        let scope = Scope::new(ScopeKind::Block, &block.parameters, &block.temporaries, line)?;
        self.emitter
            .begin_block(block.parameters.len(), scope.names.len(), line)?;
        self.scopes.push(scope);
        let result = self.value_body(&block.statements, line, Instruction::BlockReturn);
        self.scopes.pop();
        result?;
        let block_idx = self.emitter.end_block()?;
        self.emit(Instruction::PushBlock { block_idx }, line)
    }

    fn visit_brace_array(&mut self, elements: &[Expr], line: usize) -> Result<(), CompileError> {
        for element in elements {
            element.accept(self)?;
        }
        let count = u16::try_from(elements.len()).map_err(|_| CompileError::TooManyLiterals { line })?;
        self.emit(Instruction::MakeArray { count }, line)
    }

    fn visit_expression_statement(&mut self, expr: &Expr, line: usize) -> Result<(), CompileError> {
        expr.accept(self)?;
        self.emit(Instruction::Pop, line)
    }

    fn visit_return_statement(&mut self, expr: &Expr, line: usize) -> Result<(), CompileError> {
        expr.accept(self)?;
        self.emit(Instruction::ReturnTop, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Definition, ProgramBuilder};
    use parser::Parser;

    /// Records every emitter call.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        blocks: u16,
    }

    impl CodeEmitter for Recorder {
        fn begin_class(&mut self, name: &str, superclass: &str, ivars: &[String], _: usize) -> Result<(), CompileError> {
            self.events.push(format!("class {superclass} {name} {ivars:?}"));
            Ok(())
        }

        fn end_class(&mut self) -> Result<(), CompileError> {
            self.events.push("end class".into());
            Ok(())
        }

        fn begin_extension(&mut self, class_name: &str, _: usize) -> Result<(), CompileError> {
            self.events.push(format!("extend {class_name}"));
            Ok(())
        }

        fn end_extension(&mut self) -> Result<(), CompileError> {
            self.events.push("end extend".into());
            Ok(())
        }

        fn begin_method(&mut self, selector: &str, class_side: bool, args: usize, temps: usize, _: usize) -> Result<(), CompileError> {
            self.events
                .push(format!("method {selector} {class_side} {args}/{temps}"));
            Ok(())
        }

        fn end_method(&mut self) -> Result<(), CompileError> {
            self.events.push("end method".into());
            Ok(())
        }

        fn begin_block(&mut self, args: usize, temps: usize, _: usize) -> Result<(), CompileError> {
            self.events.push(format!("block {args}/{temps}"));
            Ok(())
        }

        fn end_block(&mut self) -> Result<u16, CompileError> {
            self.events.push("end block".into());
            self.blocks += 1;
            Ok(self.blocks - 1)
        }

        fn begin_do_it(&mut self, temps: usize, _: usize) -> Result<(), CompileError> {
            self.events.push(format!("doIt {temps}"));
            Ok(())
        }

        fn end_do_it(&mut self) -> Result<(), CompileError> {
            self.events.push("end doIt".into());
            Ok(())
        }

        fn register_constant(&mut self, index: u16, constant: Constant) -> Result<(), CompileError> {
            self.events.push(format!("const {index} {constant:?}"));
            Ok(())
        }

        fn emit(&mut self, instruction: Instruction, _: usize) -> Result<(), CompileError> {
            self.events.push(instruction.to_string());
            Ok(())
        }
    }

    fn method_events(source: &str, ivars: &[String]) -> Vec<String> {
        let method = Parser::new(source).parse_method().unwrap();
        let mut generator = CodeGenerator::new(Recorder::default());
        generator.compile_method("Foo", false, &method, ivars).unwrap();
        generator.into_emitter().events
    }

    fn do_it_events(source: &str) -> Vec<String> {
        let do_it = Parser::new(source).parse_do_it().unwrap();
        let mut generator = CodeGenerator::new(Recorder::default());
        generator.compile_do_it(&do_it).unwrap();
        generator.into_emitter().events
    }

    #[test]
    fn returning_a_string_registers_one_constant() {
        let events = method_events("answer ^'abc'", &[]);
        assert_eq!(
            events,
            vec![
                "extend Foo",
                "method answer false 0/0",
                "const 0 String(\"abc\")",
                "PushConstant 0",
                "ReturnTop",
                "end method",
                "end extend",
            ]
        );
    }

    #[test]
    fn methods_fall_through_to_self() {
        let events = method_events("touch count := 1", &["count".to_string()]);
        assert_eq!(
            &events[2..events.len() - 2],
            &[
                "const 0 Integer(1)",
                "PushConstant 0",
                "StoreInstVar i0",
                "Pop",
                "PushSelf",
                "ReturnTop",
            ]
        );
    }

    #[test]
    fn literal_array_elements_fold_into_one_constant() {
        let events = do_it_events("#(1 $a foo #(true nil))");
        assert!(events.contains(&format!(
            "const 0 {:?}",
            Constant::Array(vec![
                Constant::Integer(1),
                Constant::Character('a'),
                Constant::Symbol("foo".into()),
                Constant::Array(vec![Constant::True, Constant::Nil]),
            ])
        )));
    }

    #[test]
    fn blocks_reach_outer_temporaries_by_depth() {
        let events = do_it_events("| n | n := 0. [:x | n := n + x]");
        let block = events.iter().position(|e| e == "block 1/1").unwrap();
        assert_eq!(
            &events[block + 1..block + 7],
            &[
                "PushOuterTemp ^1 t0",
                "PushTemp t0",
                "const 0 Symbol(\"+\")",
                "Send #0 1",
                "StoreOuterTemp ^1 t0",
                "BlockReturn",
            ]
        );
    }

    #[test]
    fn cascades_duplicate_the_receiver() {
        let events = do_it_events("Transcript show: 'a'; cr");
        let sends: Vec<&str> = events
            .iter()
            .map(String::as_str)
            .filter(|e| !e.starts_with("const"))
            .collect();
        assert_eq!(
            sends,
            vec![
                "doIt 0",
                "PushGlobal #0",
                "Dup",
                "PushConstant 1",
                "Send #2 1",
                "Pop",
                "Send #3 0",
                "ReturnTop",
                "end doIt",
            ]
        );
    }

    #[test]
    fn super_sends_are_marked() {
        let events = method_events("init super init", &[]);
        assert!(events.contains(&"SuperSend #0 0".to_string()));
    }

    #[test]
    fn assigning_an_argument_is_an_error() {
        let method = Parser::new("at: i i := 2").parse_method().unwrap();
        let mut generator = CodeGenerator::new(Recorder::default());
        let err = generator.compile_method("Foo", false, &method, &[]).unwrap_err();
        assert!(matches!(err, CompileError::ReadOnlyAssignment { ref name, .. } if name == "i"));
    }

    #[test]
    fn undeclared_assignment_is_global_only_at_top_level() {
        let events = do_it_events("Answer := 42");
        assert!(events.contains(&"StoreGlobal #1".to_string()));

        let method = Parser::new("foo answer := 42").parse_method().unwrap();
        let mut generator = CodeGenerator::new(Recorder::default());
        assert!(matches!(
            generator.compile_method("Foo", false, &method, &[]),
            Err(CompileError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn this_context_is_rejected() {
        let do_it = Parser::new("thisContext").parse_do_it().unwrap();
        let mut generator = CodeGenerator::new(Recorder::default());
        assert!(matches!(
            generator.compile_do_it(&do_it),
            Err(CompileError::Unsupported { construct: "thisContext", .. })
        ));
    }

    #[test]
    fn class_definitions_build_a_program() {
        let source = "Object subclass: Animal [ | name | name [ ^name ] Animal class >> named: n [ ^self new ] ]";
        let file = parser::parse_file(source).unwrap();
        let parser::Item::Class(class) = &file.items[0] else {
            panic!("expected a class");
        };
        let mut generator = CodeGenerator::new(ProgramBuilder::new());
        generator.compile_class(class, &[]).unwrap();
        let program = generator.into_emitter().finish().unwrap();
        let [Definition::Class(desc)] = program.definitions.as_slice() else {
            panic!("expected one class");
        };
        assert_eq!(desc.instance_variables, vec!["name"]);
        assert_eq!(desc.methods[0].name, "name");
        assert_eq!(desc.class_methods[0].name, "named:");
        assert_eq!(desc.class_methods[0].arg_count, 1);
    }
}
