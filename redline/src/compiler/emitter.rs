use bytecode::{BytecodeBuilder, Instruction, SourceMapBuilder};

use super::CompileError;

// ── Output types ────────────────────────────────────────────────────

/// A literal in a code object's constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Integer(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Character(char),
    Nil,
    True,
    False,
    Array(Vec<Constant>),
}

/// Compiled form of a method, a do-it or a block literal.
#[derive(Debug, Clone)]
pub struct CodeDesc {
    /// Selector for methods, `doIt` for do-its, `[] in Owner>>selector` for
    /// blocks.
    pub name: String,
    pub bytecode: Vec<u8>,
    pub constants: Vec<Constant>,
    pub blocks: Vec<CodeDesc>,
    pub arg_count: usize,
    /// Arguments plus temporaries.
    pub temp_count: usize,
    pub source_map: Vec<u8>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ClassDesc {
    pub name: String,
    pub superclass: String,
    pub instance_variables: Vec<String>,
    pub methods: Vec<CodeDesc>,
    pub class_methods: Vec<CodeDesc>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ExtensionDesc {
    pub class_name: String,
    pub methods: Vec<CodeDesc>,
    pub class_methods: Vec<CodeDesc>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum Definition {
    Class(ClassDesc),
    Extension(ExtensionDesc),
    DoIt(CodeDesc),
}

/// Everything compiled from one source unit, in source order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub definitions: Vec<Definition>,
}

// ── Emitter capability ──────────────────────────────────────────────

/// The class/method builder the code generator drives.
///
/// Calls nest: methods inside a class or extension, blocks inside a method,
/// do-it or block. Constants for the innermost open code object must be
/// registered with consecutive indices starting at 0.
pub trait CodeEmitter {
    fn begin_class(
        &mut self,
        name: &str,
        superclass: &str,
        instance_variables: &[String],
        line: usize,
    ) -> Result<(), CompileError>;
    fn end_class(&mut self) -> Result<(), CompileError>;

    fn begin_extension(&mut self, class_name: &str, line: usize) -> Result<(), CompileError>;
    fn end_extension(&mut self) -> Result<(), CompileError>;

    fn begin_method(
        &mut self,
        selector: &str,
        class_side: bool,
        arg_count: usize,
        temp_count: usize,
        line: usize,
    ) -> Result<(), CompileError>;
    fn end_method(&mut self) -> Result<(), CompileError>;

    fn begin_block(
        &mut self,
        arg_count: usize,
        temp_count: usize,
        line: usize,
    ) -> Result<(), CompileError>;
    /// Close the innermost block and answer its index among the blocks of
    /// the enclosing code object.
    fn end_block(&mut self) -> Result<u16, CompileError>;

    fn begin_do_it(&mut self, temp_count: usize, line: usize) -> Result<(), CompileError>;
    fn end_do_it(&mut self) -> Result<(), CompileError>;

    fn register_constant(&mut self, index: u16, constant: Constant) -> Result<(), CompileError>;
    fn emit(&mut self, instruction: Instruction, line: usize) -> Result<(), CompileError>;
}

// ── ProgramBuilder ──────────────────────────────────────────────────

struct CodeFrame {
    name: String,
    arg_count: usize,
    temp_count: usize,
    line: usize,
    class_side: bool,
    builder: BytecodeBuilder,
    constants: Vec<Constant>,
    blocks: Vec<CodeDesc>,
    source_map: SourceMapBuilder,
}

impl CodeFrame {
    fn new(name: String, arg_count: usize, temp_count: usize, line: usize) -> Self {
        Self {
            name,
            arg_count,
            temp_count,
            line,
            class_side: false,
            builder: BytecodeBuilder::new(),
            constants: Vec::new(),
            blocks: Vec::new(),
            source_map: SourceMapBuilder::new(),
        }
    }

    fn finish(self) -> CodeDesc {
        CodeDesc {
            name: self.name,
            bytecode: self.builder.into_bytes(),
            constants: self.constants,
            blocks: self.blocks,
            arg_count: self.arg_count,
            temp_count: self.temp_count,
            source_map: self.source_map.finish(),
            line: self.line,
        }
    }
}

enum OpenDefinition {
    Class(ClassDesc),
    Extension(ExtensionDesc),
}

impl OpenDefinition {
    fn name(&self) -> &str {
        match self {
            Self::Class(class) => &class.name,
            Self::Extension(extension) => &extension.class_name,
        }
    }

    fn add_method(&mut self, code: CodeDesc, class_side: bool) {
        let (methods, class_methods) = match self {
            Self::Class(class) => (&mut class.methods, &mut class.class_methods),
            Self::Extension(ext) => (&mut ext.methods, &mut ext.class_methods),
        };
        if class_side {
            class_methods.push(code);
        } else {
            methods.push(code);
        }
    }
}

/// Encodes with [`BytecodeBuilder`], records a pc→line source map per code
/// object and collects the results into a [`Program`].
#[derive(Default)]
pub struct ProgramBuilder {
    program: Program,
    open: Option<OpenDefinition>,
    frames: Vec<CodeFrame>,
    /// `Class>>selector` of the method being built, names its blocks.
    owner: String,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished program. Fails if a definition is still open.
    pub fn finish(self) -> Result<Program, CompileError> {
        if let Some(frame) = self.frames.last() {
            return Err(CompileError::Misplaced {
                what: "unterminated code",
                expected: "a finished program",
                line: frame.line,
            });
        }
        if self.open.is_some() {
            return Err(CompileError::Misplaced {
                what: "unterminated class",
                expected: "a finished program",
                line: 0,
            });
        }
        Ok(self.program)
    }

    fn frame(&mut self, what: &'static str, line: usize) -> Result<&mut CodeFrame, CompileError> {
        self.frames.last_mut().ok_or(CompileError::Misplaced {
            what,
            expected: "a method, block or do-it",
            line,
        })
    }

    fn close_definition(&mut self) -> Result<(), CompileError> {
        if !self.frames.is_empty() {
            return Err(CompileError::Misplaced {
                what: "end of definition",
                expected: "a finished method",
                line: self.frames.last().map_or(0, |f| f.line),
            });
        }
        let definition = match self.open.take() {
            Some(OpenDefinition::Class(class)) => Definition::Class(class),
            Some(OpenDefinition::Extension(ext)) => Definition::Extension(ext),
            None => {
                return Err(CompileError::Misplaced {
                    what: "end of definition",
                    expected: "a class or extension",
                    line: 0,
                });
            }
        };
        self.program.definitions.push(definition);
        Ok(())
    }
}

impl CodeEmitter for ProgramBuilder {
    fn begin_class(
        &mut self,
        name: &str,
        superclass: &str,
        instance_variables: &[String],
        line: usize,
    ) -> Result<(), CompileError> {
        if self.open.is_some() || !self.frames.is_empty() {
            return Err(CompileError::Misplaced {
                what: "class definition",
                expected: "the top level",
                line,
            });
        }
        self.open = Some(OpenDefinition::Class(ClassDesc {
            name: name.to_string(),
            superclass: superclass.to_string(),
            instance_variables: instance_variables.to_vec(),
            methods: Vec::new(),
            class_methods: Vec::new(),
            line,
        }));
        Ok(())
    }

    fn end_class(&mut self) -> Result<(), CompileError> {
        self.close_definition()
    }

    fn begin_extension(&mut self, class_name: &str, line: usize) -> Result<(), CompileError> {
        if self.open.is_some() || !self.frames.is_empty() {
            return Err(CompileError::Misplaced {
                what: "class extension",
                expected: "the top level",
                line,
            });
        }
        self.open = Some(OpenDefinition::Extension(ExtensionDesc {
            class_name: class_name.to_string(),
            methods: Vec::new(),
            class_methods: Vec::new(),
            line,
        }));
        Ok(())
    }

    fn end_extension(&mut self) -> Result<(), CompileError> {
        self.close_definition()
    }

    fn begin_method(
        &mut self,
        selector: &str,
        class_side: bool,
        arg_count: usize,
        temp_count: usize,
        line: usize,
    ) -> Result<(), CompileError> {
        let Some(open) = &self.open else {
            return Err(CompileError::Misplaced {
                what: "method",
                expected: "a class or extension",
                line,
            });
        };
        if !self.frames.is_empty() {
            return Err(CompileError::Misplaced {
                what: "method",
                expected: "a class or extension",
                line,
            });
        }
        let side = if class_side { " class" } else { "" };
        self.owner = format!("{}{side}>>{selector}", open.name());
        let mut frame = CodeFrame::new(selector.to_string(), arg_count, temp_count, line);
        frame.class_side = class_side;
        self.frames.push(frame);
        Ok(())
    }

    fn end_method(&mut self) -> Result<(), CompileError> {
        if self.frames.len() != 1 {
            return Err(CompileError::Misplaced {
                what: "end of method",
                expected: "a method",
                line: self.frames.last().map_or(0, |f| f.line),
            });
        }
        let Some(frame) = self.frames.pop() else {
            unreachable!("checked above");
        };
        let class_side = frame.class_side;
        let code = frame.finish();
        log::trace!("compiled {} ({} bytes)", self.owner, code.bytecode.len());
        match &mut self.open {
            Some(open) => {
                open.add_method(code, class_side);
                Ok(())
            }
            None => Err(CompileError::Misplaced {
                what: "method",
                expected: "a class or extension",
                line: code.line,
            }),
        }
    }

    fn begin_block(
        &mut self,
        arg_count: usize,
        temp_count: usize,
        line: usize,
    ) -> Result<(), CompileError> {
        self.frame("block", line)?;
        let name = format!("[] in {}", self.owner);
        self.frames.push(CodeFrame::new(name, arg_count, temp_count, line));
        Ok(())
    }

    fn end_block(&mut self) -> Result<u16, CompileError> {
        if self.frames.len() < 2 {
            return Err(CompileError::Misplaced {
                what: "end of block",
                expected: "a block",
                line: self.frames.last().map_or(0, |f| f.line),
            });
        }
        let Some(frame) = self.frames.pop() else {
            unreachable!("checked above");
        };
        let line = frame.line;
        let code = frame.finish();
        let parent = self.frame("block", line)?;
        let index = u16::try_from(parent.blocks.len())
            .map_err(|_| CompileError::TooManyLiterals { line })?;
        parent.blocks.push(code);
        Ok(index)
    }

    fn begin_do_it(&mut self, temp_count: usize, line: usize) -> Result<(), CompileError> {
        if self.open.is_some() || !self.frames.is_empty() {
            return Err(CompileError::Misplaced {
                what: "do-it",
                expected: "the top level",
                line,
            });
        }
        self.owner = "UndefinedObject>>doIt".to_string();
        self.frames
            .push(CodeFrame::new("doIt".to_string(), 0, temp_count, line));
        Ok(())
    }

    fn end_do_it(&mut self) -> Result<(), CompileError> {
        if self.frames.len() != 1 || self.open.is_some() {
            return Err(CompileError::Misplaced {
                what: "end of do-it",
                expected: "a do-it",
                line: self.frames.last().map_or(0, |f| f.line),
            });
        }
        let Some(frame) = self.frames.pop() else {
            unreachable!("checked above");
        };
        self.program.definitions.push(Definition::DoIt(frame.finish()));
        Ok(())
    }

    fn register_constant(&mut self, index: u16, constant: Constant) -> Result<(), CompileError> {
        let frame = self.frame("constant", 0)?;
        let expected = frame.constants.len();
        if usize::from(index) != expected {
            return Err(CompileError::ConstantOutOfOrder {
                expected,
                found: index.into(),
            });
        }
        frame.constants.push(constant);
        Ok(())
    }

    fn emit(&mut self, instruction: Instruction, line: usize) -> Result<(), CompileError> {
        let frame = self.frame("instruction", line)?;
        frame
            .source_map
            .add(frame.builder.current_offset() as u32, line as u32);
        frame.builder.emit(instruction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn do_it_collects_constants_and_bytecode() {
        let mut builder = ProgramBuilder::new();
        builder.begin_do_it(0, 1).unwrap();
        builder
            .register_constant(0, Constant::String("abc".into()))
            .unwrap();
        builder
            .emit(Instruction::PushConstant { idx: 0 }, 1)
            .unwrap();
        builder.emit(Instruction::ReturnTop, 1).unwrap();
        builder.end_do_it().unwrap();

        let program = builder.finish().unwrap();
        let [Definition::DoIt(code)] = program.definitions.as_slice() else {
            panic!("expected one do-it");
        };
        assert_eq!(code.name, "doIt");
        assert_eq!(code.constants, vec![Constant::String("abc".into())]);
        assert_eq!(code.bytecode.len(), 4);
    }

    #[test]
    fn constants_must_arrive_in_order() {
        let mut builder = ProgramBuilder::new();
        builder.begin_do_it(0, 1).unwrap();
        let err = builder.register_constant(1, Constant::Nil).unwrap_err();
        assert_eq!(
            err,
            CompileError::ConstantOutOfOrder {
                expected: 0,
                found: 1
            }
        );
    }

    #[test]
    fn blocks_are_named_after_their_method() {
        let mut builder = ProgramBuilder::new();
        builder.begin_class("Animal", "Object", &[], 1).unwrap();
        builder.begin_method("speak", false, 0, 0, 2).unwrap();
        builder.begin_block(0, 0, 2).unwrap();
        builder.emit(Instruction::PushNil, 2).unwrap();
        builder.emit(Instruction::BlockReturn, 2).unwrap();
        assert_eq!(builder.end_block().unwrap(), 0);
        builder.emit(Instruction::PushBlock { block_idx: 0 }, 2).unwrap();
        builder.emit(Instruction::ReturnTop, 2).unwrap();
        builder.end_method().unwrap();
        builder.end_class().unwrap();

        let program = builder.finish().unwrap();
        let [Definition::Class(class)] = program.definitions.as_slice() else {
            panic!("expected one class");
        };
        assert_eq!(class.methods.len(), 1);
        assert_eq!(class.methods[0].blocks[0].name, "[] in Animal>>speak");
    }

    #[test]
    fn methods_need_an_open_class() {
        let mut builder = ProgramBuilder::new();
        assert!(matches!(
            builder.begin_method("foo", false, 0, 0, 3),
            Err(CompileError::Misplaced { line: 3, .. })
        ));
    }
}
