/// Abstract syntax tree for Smalltalk source.
///
/// Every node records the source line it started on. The line is fixed at
/// construction and only readable afterwards.
///
/// # Literal leaves
///
/// Literal constants ([`StringConstant`], [`SymbolConstant`],
/// [`NumberConstant`], [`CharacterConstant`], [`SpecialConstant`],
/// [`ArrayConstant`]) carry their homogenized value plus an `index`. The
/// index is only meaningful for a constant nested inside a literal array:
/// [`ArrayConstant::new`] numbers its elements in source order, and that
/// numbering is the order in which code generation registers them.
use crate::parser::ParseError;

/// Anything that remembers the source line it came from.
pub trait Node {
    fn line(&self) -> usize;
}

/// A literal that can sit inside a literal array.
pub trait ArrayElement: Node {
    /// Position inside the enclosing literal array, `0` when unset.
    fn index(&self) -> usize;
    /// Assigned once, by the array-literal builder.
    fn set_index(&mut self, index: usize);
}

macro_rules! literal_node {
    ($ty:ident) => {
        impl Node for $ty {
            fn line(&self) -> usize {
                self.line
            }
        }

        impl ArrayElement for $ty {
            fn index(&self) -> usize {
                self.index.unwrap_or(0)
            }

            fn set_index(&mut self, index: usize) {
                debug_assert!(
                    self.index.is_none(),
                    "array element index assigned twice"
                );
                self.index = Some(index);
            }
        }
    };
}

/// Strip the outer quotes of a quoted lexeme and collapse doubled quotes.
fn homogenize(lexeme: &str, line: usize) -> Result<String, ParseError> {
    let malformed = || ParseError::MalformedLiteral {
        lexeme: lexeme.to_string(),
        line,
    };
    let inner = lexeme
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .ok_or_else(malformed)?;

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        // a quote inside the delimiters only ever appears doubled
        if c == '\'' && chars.next() != Some('\'') {
            return Err(malformed());
        }
        value.push(c);
    }
    Ok(value)
}

// ── Literal leaves ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct StringConstant {
    value: String,
    line: usize,
    index: Option<usize>,
}

impl StringConstant {
    /// Build from the raw lexeme, delimiters included: `'it''s'` → `it's`.
    pub fn new(lexeme: &str, line: usize) -> Result<Self, ParseError> {
        Ok(Self {
            value: homogenize(lexeme, line)?,
            line,
            index: None,
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

literal_node!(StringConstant);

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolConstant {
    value: String,
    line: usize,
    index: Option<usize>,
}

impl SymbolConstant {
    pub fn new(value: impl Into<String>, line: usize) -> Self {
        Self {
            value: value.into(),
            line,
            index: None,
        }
    }

    /// Build from a quoted symbol lexeme such as `'hello world'`.
    pub fn from_quoted(lexeme: &str, line: usize) -> Result<Self, ParseError> {
        Ok(Self::new(homogenize(lexeme, line)?, line))
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

literal_node!(SymbolConstant);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberConstant {
    value: Number,
    line: usize,
    index: Option<usize>,
}

impl NumberConstant {
    pub fn new(value: Number, line: usize) -> Self {
        Self {
            value,
            line,
            index: None,
        }
    }

    pub fn value(&self) -> Number {
        self.value
    }
}

literal_node!(NumberConstant);

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterConstant {
    value: char,
    line: usize,
    index: Option<usize>,
}

impl CharacterConstant {
    pub fn new(value: char, line: usize) -> Self {
        Self {
            value,
            line,
            index: None,
        }
    }

    pub fn value(&self) -> char {
        self.value
    }
}

literal_node!(CharacterConstant);

/// `nil`, `true` and `false` as they appear inside literal arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Nil,
    True,
    False,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialConstant {
    value: Special,
    line: usize,
    index: Option<usize>,
}

impl SpecialConstant {
    pub fn new(value: Special, line: usize) -> Self {
        Self {
            value,
            line,
            index: None,
        }
    }

    pub fn value(&self) -> Special {
        self.value
    }
}

literal_node!(SpecialConstant);

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayConstant {
    elements: Vec<Literal>,
    line: usize,
    index: Option<usize>,
}

impl ArrayConstant {
    /// The array-literal builder: takes ownership of the elements and
    /// assigns each its position.
    pub fn new(mut elements: Vec<Literal>, line: usize) -> Self {
        for (index, element) in elements.iter_mut().enumerate() {
            element.set_index(index);
        }
        Self {
            elements,
            line,
            index: None,
        }
    }

    pub fn elements(&self) -> &[Literal] {
        &self.elements
    }
}

literal_node!(ArrayConstant);

/// A literal constant of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(StringConstant),
    Symbol(SymbolConstant),
    Number(NumberConstant),
    Character(CharacterConstant),
    Special(SpecialConstant),
    Array(ArrayConstant),
}

impl Literal {
    fn element(&self) -> &dyn ArrayElement {
        match self {
            Self::String(c) => c,
            Self::Symbol(c) => c,
            Self::Number(c) => c,
            Self::Character(c) => c,
            Self::Special(c) => c,
            Self::Array(c) => c,
        }
    }

    fn element_mut(&mut self) -> &mut dyn ArrayElement {
        match self {
            Self::String(c) => c,
            Self::Symbol(c) => c,
            Self::Number(c) => c,
            Self::Character(c) => c,
            Self::Special(c) => c,
            Self::Array(c) => c,
        }
    }
}

impl Node for Literal {
    fn line(&self) -> usize {
        self.element().line()
    }
}

impl ArrayElement for Literal {
    fn index(&self) -> usize {
        self.element().index()
    }

    fn set_index(&mut self, index: usize) {
        self.element_mut().set_index(index);
    }
}

// ── Expressions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoVariable {
    SelfRef,
    Super,
    Nil,
    True,
    False,
    ThisContext,
}

impl PseudoVariable {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "self" => Some(Self::SelfRef),
            "super" => Some(Self::Super),
            "nil" => Some(Self::Nil),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "thisContext" => Some(Self::ThisContext),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    line: usize,
}

impl Expr {
    pub fn new(kind: ExprKind, line: usize) -> Self {
        Self { kind, line }
    }
}

impl Node for Expr {
    fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// A named variable: temporary, argument, instance variable or global.
    Variable(String),
    Pseudo(PseudoVariable),
    Assignment {
        target: String,
        value: Box<Expr>,
    },
    /// Unary, binary or keyword send.
    Send {
        receiver: Box<Expr>,
        message: Message,
    },
    /// `receiver m1; m2; m3` — every message goes to the same receiver.
    Cascade {
        receiver: Box<Expr>,
        messages: Vec<Message>,
    },
    Block(BlockNode),
    /// `{ a. b. c }` — an array built at run time.
    Brace(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub selector: String,
    pub arguments: Vec<Expr>,
    line: usize,
}

impl Message {
    pub fn new(selector: impl Into<String>, arguments: Vec<Expr>, line: usize) -> Self {
        Self {
            selector: selector.into(),
            arguments,
            line,
        }
    }
}

impl Node for Message {
    fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub parameters: Vec<String>,
    pub temporaries: Vec<String>,
    pub statements: Vec<Statement>,
    line: usize,
}

impl BlockNode {
    pub fn new(
        parameters: Vec<String>,
        temporaries: Vec<String>,
        statements: Vec<Statement>,
        line: usize,
    ) -> Self {
        Self {
            parameters,
            temporaries,
            statements,
            line,
        }
    }
}

impl Node for BlockNode {
    fn line(&self) -> usize {
        self.line
    }
}

// ── Statements and definitions ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Expression(Expr),
    /// `^ expr`
    Return(Expr),
}

impl Statement {
    pub fn expression(expr: Expr) -> Self {
        let line = expr.line();
        Self {
            kind: StatementKind::Expression(expr),
            line,
        }
    }

    pub fn ret(expr: Expr, line: usize) -> Self {
        Self {
            kind: StatementKind::Return(expr),
            line,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, StatementKind::Return(_))
    }
}

impl Node for Statement {
    fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub selector: String,
    pub parameters: Vec<String>,
    pub temporaries: Vec<String>,
    pub statements: Vec<Statement>,
    line: usize,
}

impl MethodNode {
    pub fn new(
        selector: impl Into<String>,
        parameters: Vec<String>,
        temporaries: Vec<String>,
        statements: Vec<Statement>,
        line: usize,
    ) -> Self {
        Self {
            selector: selector.into(),
            parameters,
            temporaries,
            statements,
            line,
        }
    }
}

impl Node for MethodNode {
    fn line(&self) -> usize {
        self.line
    }
}

/// `Superclass subclass: Name [ | ivars | methods ]`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub name: String,
    pub superclass: String,
    pub instance_variables: Vec<String>,
    pub methods: Vec<MethodNode>,
    pub class_methods: Vec<MethodNode>,
    line: usize,
}

impl ClassNode {
    pub fn new(name: impl Into<String>, superclass: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.into(),
            instance_variables: Vec::new(),
            methods: Vec::new(),
            class_methods: Vec::new(),
            line,
        }
    }
}

impl Node for ClassNode {
    fn line(&self) -> usize {
        self.line
    }
}

/// `Name extend [ methods ]` or `Name class extend [ methods ]`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub class_name: String,
    pub methods: Vec<MethodNode>,
    pub class_methods: Vec<MethodNode>,
    line: usize,
}

impl ExtensionNode {
    pub fn new(class_name: impl Into<String>, line: usize) -> Self {
        Self {
            class_name: class_name.into(),
            methods: Vec::new(),
            class_methods: Vec::new(),
            line,
        }
    }
}

impl Node for ExtensionNode {
    fn line(&self) -> usize {
        self.line
    }
}

/// A run of top-level statements, executed with `nil` as receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct DoItNode {
    pub temporaries: Vec<String>,
    pub statements: Vec<Statement>,
    line: usize,
}

impl DoItNode {
    pub fn new(temporaries: Vec<String>, statements: Vec<Statement>, line: usize) -> Self {
        Self {
            temporaries,
            statements,
            line,
        }
    }
}

impl Node for DoItNode {
    fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Class(ClassNode),
    Extension(ExtensionNode),
    DoIt(DoItNode),
}

/// A whole source file, items in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub items: Vec<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_constant_strips_quotes_and_collapses_escapes() {
        let s = StringConstant::new("'it''s'", 3).unwrap();
        assert_eq!(s.value(), "it's");
        assert_eq!(s.line(), 3);
        assert_eq!(StringConstant::new("''", 1).unwrap().value(), "");
        assert_eq!(
            StringConstant::new("'''quoted'''", 1).unwrap().value(),
            "'quoted'"
        );
    }

    #[test]
    fn malformed_string_lexemes_fail_with_their_line() {
        for lexeme in ["'open", "closed'", "'", "abc", "'a'b'"] {
            match StringConstant::new(lexeme, 7) {
                Err(ParseError::MalformedLiteral { line, lexeme: l }) => {
                    assert_eq!(line, 7);
                    assert_eq!(l, lexeme);
                }
                other => panic!("expected malformed literal, got {other:?}"),
            }
        }
    }

    #[test]
    fn index_defaults_to_zero_and_is_stable_once_assigned() {
        let lone = StringConstant::new("'a'", 1).unwrap();
        assert_eq!(lone.index(), 0);

        let array = ArrayConstant::new(
            vec![
                Literal::Number(NumberConstant::new(Number::Integer(1), 1)),
                Literal::String(StringConstant::new("'two'", 1).unwrap()),
                Literal::Symbol(SymbolConstant::new("three", 1)),
            ],
            1,
        );
        let indices: Vec<usize> =
            array.elements().iter().map(|e| e.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        // re-reading never changes it
        assert_eq!(array.elements()[2].index(), 2);
        assert_eq!(array.elements()[2].index(), 2);
    }

    #[test]
    fn quoted_symbols_are_homogenized() {
        let sym = SymbolConstant::from_quoted("'hello world'", 2).unwrap();
        assert_eq!(sym.value(), "hello world");
    }
}
