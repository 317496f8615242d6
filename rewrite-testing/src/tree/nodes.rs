use std::path::PathBuf;
use std::sync::Arc;

use super::types::{ClassType, JavaType, MethodType, Primitive, Symbol, TypeKind};
use super::{Container, Id, LeftPadded, Padded, Space};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub id: Id,
    pub source_path: PathBuf,
    /// `after` is the trivia in front of the terminating `;`.
    pub package: Option<Padded<Arc<Package>>>,
    pub imports: Vec<Padded<Arc<Import>>>,
    pub classes: Vec<Arc<ClassDeclaration>>,
    /// Trivia after the last token.
    pub eof: Space,
}

impl CompilationUnit {
    pub fn with_imports(&self, imports: Vec<Padded<Arc<Import>>>) -> Self {
        Self {
            imports,
            ..self.clone()
        }
    }

    pub fn with_classes(&self, classes: Vec<Arc<ClassDeclaration>>) -> Self {
        Self {
            classes,
            ..self.clone()
        }
    }

    pub fn package_name(&self) -> Option<String> {
        self.package
            .as_ref()
            .map(|p| qualified_name(&p.element.name).unwrap_or_default())
    }

    pub fn print(&self) -> String {
        let mut printer = super::Printer::new();
        printer.compilation_unit(self);
        printer.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: Id,
    pub prefix: Space,
    pub name: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub id: Id,
    pub prefix: Space,
    /// Present for `import static`; the trivia in front of `static`.
    pub static_prefix: Option<Space>,
    /// The imported name; the last segment is `*` for on-demand imports.
    pub qualid: Arc<FieldAccess>,
}

impl Import {
    pub fn is_static(&self) -> bool {
        self.static_prefix.is_some()
    }

    pub fn is_wildcard(&self) -> bool {
        self.qualid.name.element.name == "*"
    }

    /// Dotted name as written, `*` included.
    pub fn name(&self) -> String {
        qualified_name(&Expression::FieldAccess(self.qualid.clone())).unwrap_or_default()
    }

    /// The type a static import draws from, or the imported type itself.
    /// `None` for package wildcards.
    pub fn type_name(&self) -> Option<String> {
        if self.is_static() {
            qualified_name(&self.qualid.target)
        } else if self.is_wildcard() {
            None
        } else {
            Some(self.name())
        }
    }

    /// Member name of a static import (`*` for static wildcards).
    pub fn member(&self) -> Option<&str> {
        self.is_static().then(|| self.qualid.name.element.name.as_str())
    }

    pub fn package_name(&self) -> String {
        if !self.is_static() && self.is_wildcard() {
            qualified_name(&self.qualid.target).unwrap_or_default()
        } else {
            super::package_of(&self.type_name().unwrap_or_default())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKeyword {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    pub id: Id,
    pub prefix: Space,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub id: Id,
    pub prefix: Space,
    pub leading_annotations: Vec<Arc<Annotation>>,
    pub modifiers: Vec<Modifier>,
    /// Trivia in front of the `class` / `interface` keyword.
    pub keyword_prefix: Space,
    pub keyword: ClassKeyword,
    pub name: Arc<Identifier>,
    pub extends: Option<LeftPadded<TypeTree>>,
    /// `implements` list; for interfaces the `extends` list.
    pub implements: Option<Container<TypeTree>>,
    pub body: Arc<Block>,
    pub ty: Option<Arc<ClassType>>,
}

impl ClassDeclaration {
    pub fn with_leading_annotations(&self, leading_annotations: Vec<Arc<Annotation>>) -> Self {
        Self {
            leading_annotations,
            ..self.clone()
        }
    }

    pub fn with_modifiers(&self, modifiers: Vec<Modifier>) -> Self {
        Self {
            modifiers,
            ..self.clone()
        }
    }

    pub fn with_keyword_prefix(&self, keyword_prefix: Space) -> Self {
        Self {
            keyword_prefix,
            ..self.clone()
        }
    }

    pub fn with_prefix(&self, prefix: Space) -> Self {
        Self {
            prefix,
            ..self.clone()
        }
    }

    pub fn with_body(&self, body: Arc<Block>) -> Self {
        Self {
            body,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self.keyword {
            ClassKeyword::Class => TypeKind::Class,
            ClassKeyword::Interface => TypeKind::Interface,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    pub id: Id,
    pub prefix: Space,
    pub leading_annotations: Vec<Arc<Annotation>>,
    pub modifiers: Vec<Modifier>,
    /// `None` for constructors.
    pub return_type: Option<TypeTree>,
    pub name: Arc<Identifier>,
    pub parameters: Container<Arc<VariableDeclarations>>,
    /// `before` is the trivia in front of `throws`.
    pub throws: Option<Container<TypeTree>>,
    /// `None` for abstract and interface methods.
    pub body: Option<Arc<Block>>,
    pub method_type: Option<Arc<MethodType>>,
}

impl MethodDeclaration {
    pub fn with_leading_annotations(&self, leading_annotations: Vec<Arc<Annotation>>) -> Self {
        Self {
            leading_annotations,
            ..self.clone()
        }
    }

    pub fn with_modifiers(&self, modifiers: Vec<Modifier>) -> Self {
        Self {
            modifiers,
            ..self.clone()
        }
    }

    pub fn with_body(&self, body: Option<Arc<Block>>) -> Self {
        Self {
            body,
            ..self.clone()
        }
    }

    pub fn with_prefix(&self, prefix: Space) -> Self {
        Self {
            prefix,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarations {
    pub id: Id,
    pub prefix: Space,
    pub leading_annotations: Vec<Arc<Annotation>>,
    pub modifiers: Vec<Modifier>,
    /// `None` for untyped lambda parameters.
    pub type_expr: Option<TypeTree>,
    /// Trivia in front of `...` for varargs parameters.
    pub varargs: Option<Space>,
    pub variables: Vec<Padded<Arc<NamedVariable>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedVariable {
    pub id: Id,
    pub prefix: Space,
    pub name: Arc<Identifier>,
    /// `before` is the trivia in front of `=`.
    pub initializer: Option<LeftPadded<Expression>>,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: Id,
    pub prefix: Space,
    /// `Identifier` or `FieldAccess`.
    pub annotation_type: Expression,
    pub arguments: Option<Container<Expression>>,
}

impl Annotation {
    pub fn with_prefix(&self, prefix: Space) -> Self {
        Self {
            prefix,
            ..self.clone()
        }
    }

    pub fn ty(&self) -> &JavaType {
        self.annotation_type.ty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: Id,
    pub prefix: Space,
    /// `after` is the trivia in front of a terminating `;`, if any.
    pub statements: Vec<Padded<Statement>>,
    /// Trivia in front of the closing brace.
    pub end: Space,
}

impl Block {
    pub fn with_statements(&self, statements: Vec<Padded<Statement>>) -> Self {
        Self {
            statements,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    VariableDeclarations(Arc<VariableDeclarations>),
    Block(Arc<Block>),
    Class(Arc<ClassDeclaration>),
    Method(Arc<MethodDeclaration>),
    Return(Arc<Return>),
    If(Arc<If>),
    While(Arc<WhileLoop>),
    For(Arc<ForLoop>),
    ForEach(Arc<ForEachLoop>),
    Try(Arc<Try>),
    Throw(Arc<Throw>),
    Empty(Arc<Empty>),
    DoWhile(Arc<DoWhileLoop>),
    Switch(Arc<Switch>),
    Break(Arc<Break>),
    Continue(Arc<Continue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub id: Id,
    pub prefix: Space,
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Throw {
    pub id: Id,
    pub prefix: Space,
    pub exception: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Empty {
    pub id: Id,
    pub prefix: Space,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Break {
    pub id: Id,
    pub prefix: Space,
    pub label: Option<Arc<Identifier>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Continue {
    pub id: Id,
    pub prefix: Space,
    pub label: Option<Arc<Identifier>>,
}

/// `( expression )` of a control statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlParentheses {
    pub prefix: Space,
    pub tree: Padded<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub id: Id,
    pub prefix: Space,
    pub condition: ControlParentheses,
    pub then_part: Padded<Statement>,
    pub else_part: Option<Else>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Else {
    pub id: Id,
    pub prefix: Space,
    pub body: Padded<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub id: Id,
    pub prefix: Space,
    pub condition: ControlParentheses,
    pub body: Padded<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub id: Id,
    pub prefix: Space,
    pub control: ForControl,
    pub body: Padded<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForControl {
    pub prefix: Space,
    pub init: Padded<Option<Statement>>,
    pub condition: Padded<Option<Expression>>,
    pub update: Vec<Padded<Expression>>,
    /// Trivia in front of `)`.
    pub end: Space,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForEachLoop {
    pub id: Id,
    pub prefix: Space,
    pub control: ForEachControl,
    pub body: Padded<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForEachControl {
    pub prefix: Space,
    /// `after` is the trivia in front of `:`.
    pub variable: Padded<Arc<VariableDeclarations>>,
    pub iterable: Padded<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileLoop {
    pub id: Id,
    pub prefix: Space,
    pub body: Padded<Statement>,
    /// Trivia in front of `while`.
    pub while_prefix: Space,
    pub condition: ControlParentheses,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Switch {
    pub id: Id,
    pub prefix: Space,
    pub selector: ControlParentheses,
    /// Trivia in front of `{`.
    pub body_prefix: Space,
    pub cases: Vec<Arc<Case>>,
    /// Trivia in front of `}`.
    pub end: Space,
}

/// One `case` or `default` group of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub id: Id,
    pub prefix: Space,
    /// Empty for `default`. `after` is the trivia in front of the next `,`.
    pub labels: Vec<Padded<Expression>>,
    /// Trivia in front of `:` or `->`.
    pub separator: Space,
    pub body: CaseBody,
}

impl Case {
    pub fn is_default(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseBody {
    /// `case A:` and the statements up to the next label.
    Statements(Vec<Padded<Statement>>),
    /// `case A ->` and its single expression statement, block or throw.
    Rule(Padded<Statement>),
}

/// `( resource; resource )` of a try-with-resources.
#[derive(Debug, Clone, PartialEq)]
pub struct TryResources {
    pub prefix: Space,
    /// Variable declarations or expressions; `after` is the trivia in front
    /// of the `;` that follows, or of `)` for an unterminated last resource.
    pub resources: Vec<Padded<Statement>>,
    /// Whether the last resource is followed by `;`.
    pub terminated: bool,
    /// Trivia in front of `)`.
    pub end: Space,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Try {
    pub id: Id,
    pub prefix: Space,
    pub resources: Option<TryResources>,
    pub body: Arc<Block>,
    pub catches: Vec<Catch>,
    pub finally: Option<LeftPadded<Arc<Block>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub id: Id,
    pub prefix: Space,
    /// Trivia in front of `(`.
    pub parameter_prefix: Space,
    pub parameter: Padded<Arc<VariableDeclarations>>,
    pub body: Arc<Block>,
}

impl Statement {
    pub fn id(&self) -> Id {
        match self {
            Statement::Expression(e) => e.id(),
            Statement::VariableDeclarations(n) => n.id,
            Statement::Block(n) => n.id,
            Statement::Class(n) => n.id,
            Statement::Method(n) => n.id,
            Statement::Return(n) => n.id,
            Statement::If(n) => n.id,
            Statement::While(n) => n.id,
            Statement::For(n) => n.id,
            Statement::ForEach(n) => n.id,
            Statement::Try(n) => n.id,
            Statement::Throw(n) => n.id,
            Statement::Empty(n) => n.id,
            Statement::DoWhile(n) => n.id,
            Statement::Switch(n) => n.id,
            Statement::Break(n) => n.id,
            Statement::Continue(n) => n.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Expression(e) => e.kind(),
            Statement::VariableDeclarations(_) => "variable declarations",
            Statement::Block(_) => "block",
            Statement::Class(_) => "class declaration",
            Statement::Method(_) => "method declaration",
            Statement::Return(_) => "return",
            Statement::If(_) => "if",
            Statement::While(_) => "while loop",
            Statement::For(_) => "for loop",
            Statement::ForEach(_) => "for-each loop",
            Statement::Try(_) => "try",
            Statement::Throw(_) => "throw",
            Statement::Empty(_) => "empty statement",
            Statement::DoWhile(_) => "do-while loop",
            Statement::Switch(_) => "switch",
            Statement::Break(_) => "break",
            Statement::Continue(_) => "continue",
        }
    }

    pub fn prefix(&self) -> &Space {
        match self {
            Statement::Expression(e) => e.prefix(),
            Statement::VariableDeclarations(n) => &n.prefix,
            Statement::Block(n) => &n.prefix,
            Statement::Class(n) => &n.prefix,
            Statement::Method(n) => &n.prefix,
            Statement::Return(n) => &n.prefix,
            Statement::If(n) => &n.prefix,
            Statement::While(n) => &n.prefix,
            Statement::For(n) => &n.prefix,
            Statement::ForEach(n) => &n.prefix,
            Statement::Try(n) => &n.prefix,
            Statement::Throw(n) => &n.prefix,
            Statement::Empty(n) => &n.prefix,
            Statement::DoWhile(n) => &n.prefix,
            Statement::Switch(n) => &n.prefix,
            Statement::Break(n) => &n.prefix,
            Statement::Continue(n) => &n.prefix,
        }
    }

    pub fn with_prefix(&self, prefix: Space) -> Statement {
        fn set<T: Clone>(node: &Arc<T>, f: impl FnOnce(&mut T)) -> Arc<T> {
            let mut copy = (**node).clone();
            f(&mut copy);
            Arc::new(copy)
        }
        match self {
            Statement::Expression(e) => Statement::Expression(e.with_prefix(prefix)),
            Statement::VariableDeclarations(n) => Statement::VariableDeclarations(set(n, |c| c.prefix = prefix)),
            Statement::Block(n) => Statement::Block(set(n, |c| c.prefix = prefix)),
            Statement::Class(n) => Statement::Class(set(n, |c| c.prefix = prefix)),
            Statement::Method(n) => Statement::Method(set(n, |c| c.prefix = prefix)),
            Statement::Return(n) => Statement::Return(set(n, |c| c.prefix = prefix)),
            Statement::If(n) => Statement::If(set(n, |c| c.prefix = prefix)),
            Statement::While(n) => Statement::While(set(n, |c| c.prefix = prefix)),
            Statement::For(n) => Statement::For(set(n, |c| c.prefix = prefix)),
            Statement::ForEach(n) => Statement::ForEach(set(n, |c| c.prefix = prefix)),
            Statement::Try(n) => Statement::Try(set(n, |c| c.prefix = prefix)),
            Statement::Throw(n) => Statement::Throw(set(n, |c| c.prefix = prefix)),
            Statement::Empty(n) => Statement::Empty(set(n, |c| c.prefix = prefix)),
            Statement::DoWhile(n) => Statement::DoWhile(set(n, |c| c.prefix = prefix)),
            Statement::Switch(n) => Statement::Switch(set(n, |c| c.prefix = prefix)),
            Statement::Break(n) => Statement::Break(set(n, |c| c.prefix = prefix)),
            Statement::Continue(n) => Statement::Continue(set(n, |c| c.prefix = prefix)),
        }
    }

    /// Whether the statement is terminated by `;` when printed.
    pub fn needs_semicolon(&self) -> bool {
        match self {
            Statement::Expression(_)
            | Statement::VariableDeclarations(_)
            | Statement::Return(_)
            | Statement::Throw(_)
            | Statement::Empty(_)
            | Statement::DoWhile(_)
            | Statement::Break(_)
            | Statement::Continue(_) => true,
            Statement::Method(m) => m.body.is_none(),
            _ => false,
        }
    }

    pub fn ptr_eq(&self, other: &Statement) -> bool {
        match (self, other) {
            (Statement::Expression(a), Statement::Expression(b)) => a.ptr_eq(b),
            (Statement::VariableDeclarations(a), Statement::VariableDeclarations(b)) => Arc::ptr_eq(a, b),
            (Statement::Block(a), Statement::Block(b)) => Arc::ptr_eq(a, b),
            (Statement::Class(a), Statement::Class(b)) => Arc::ptr_eq(a, b),
            (Statement::Method(a), Statement::Method(b)) => Arc::ptr_eq(a, b),
            (Statement::Return(a), Statement::Return(b)) => Arc::ptr_eq(a, b),
            (Statement::If(a), Statement::If(b)) => Arc::ptr_eq(a, b),
            (Statement::While(a), Statement::While(b)) => Arc::ptr_eq(a, b),
            (Statement::For(a), Statement::For(b)) => Arc::ptr_eq(a, b),
            (Statement::ForEach(a), Statement::ForEach(b)) => Arc::ptr_eq(a, b),
            (Statement::Try(a), Statement::Try(b)) => Arc::ptr_eq(a, b),
            (Statement::Throw(a), Statement::Throw(b)) => Arc::ptr_eq(a, b),
            (Statement::Empty(a), Statement::Empty(b)) => Arc::ptr_eq(a, b),
            (Statement::DoWhile(a), Statement::DoWhile(b)) => Arc::ptr_eq(a, b),
            (Statement::Switch(a), Statement::Switch(b)) => Arc::ptr_eq(a, b),
            (Statement::Break(a), Statement::Break(b)) => Arc::ptr_eq(a, b),
            (Statement::Continue(a), Statement::Continue(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn print(&self) -> String {
        let mut printer = super::Printer::new();
        printer.statement(self);
        printer.finish()
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Arc<Identifier>),
    Literal(Arc<Literal>),
    FieldAccess(Arc<FieldAccess>),
    MethodInvocation(Arc<MethodInvocation>),
    NewClass(Arc<NewClass>),
    NewArray(Arc<NewArray>),
    Lambda(Arc<Lambda>),
    MemberReference(Arc<MemberReference>),
    Binary(Arc<Binary>),
    Unary(Arc<Unary>),
    Assignment(Arc<Assignment>),
    Ternary(Arc<Ternary>),
    Parentheses(Arc<Parentheses>),
    ArrayAccess(Arc<ArrayAccess>),
    TypeCast(Arc<TypeCast>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub id: Id,
    pub prefix: Space,
    pub name: String,
    pub ty: JavaType,
    pub symbol: Option<Symbol>,
}

impl Identifier {
    pub fn new(prefix: Space, name: impl Into<String>) -> Self {
        Self {
            id: Id::next(),
            prefix,
            name: name.into(),
            ty: JavaType::Unknown,
            symbol: None,
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Char(char),
    String(String),
    Int(i64),
    Long(i64),
    Float(f64),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub id: Id,
    pub prefix: Space,
    pub value: LiteralValue,
    /// Source spelling, escapes and suffixes included.
    pub source: String,
    pub ty: JavaType,
}

impl Literal {
    pub fn is_string(&self, value: &str) -> bool {
        matches!(&self.value, LiteralValue::String(s) if s == value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub id: Id,
    pub prefix: Space,
    pub target: Expression,
    /// `before` is the trivia in front of `.`.
    pub name: LeftPadded<Arc<Identifier>>,
    pub ty: JavaType,
}

impl FieldAccess {
    pub fn simple_name(&self) -> &str {
        &self.name.element.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    pub id: Id,
    pub prefix: Space,
    /// Receiver; `after` is the trivia in front of `.`.
    pub select: Option<Padded<Expression>>,
    pub name: Arc<Identifier>,
    pub arguments: Container<Expression>,
    pub method_type: Option<Arc<MethodType>>,
}

impl MethodInvocation {
    pub fn simple_name(&self) -> &str {
        &self.name.name
    }

    pub fn arguments(&self) -> Vec<&Expression> {
        self.arguments.iter().collect()
    }

    pub fn ty(&self) -> &JavaType {
        self.method_type
            .as_ref()
            .map_or(&JavaType::Unknown, |m| &m.return_type)
    }

    pub fn with_name(&self, name: Arc<Identifier>) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn with_arguments(&self, arguments: Container<Expression>) -> Self {
        Self {
            arguments,
            ..self.clone()
        }
    }

    pub fn with_method_type(&self, method_type: Option<Arc<MethodType>>) -> Self {
        Self {
            method_type,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClass {
    pub id: Id,
    pub prefix: Space,
    pub clazz: TypeTree,
    pub arguments: Container<Expression>,
    /// Anonymous class body.
    pub body: Option<Arc<Block>>,
    pub ty: JavaType,
}

/// `[ index ]`, with trivia in front of both brackets.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDimension {
    pub prefix: Space,
    pub index: Padded<Option<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewArray {
    pub id: Id,
    pub prefix: Space,
    /// `None` for a bare `{ .. }` initializer.
    pub element_type: Option<TypeTree>,
    pub dimensions: Vec<ArrayDimension>,
    pub initializer: Option<Container<Expression>>,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub id: Id,
    pub prefix: Space,
    pub parenthesized: bool,
    pub parameters: Container<Arc<VariableDeclarations>>,
    /// Trivia in front of `->`.
    pub arrow: Space,
    pub body: LambdaBody,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expression(Expression),
    Block(Arc<Block>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberReference {
    pub id: Id,
    pub prefix: Space,
    pub containing: Expression,
    /// `before` is the trivia in front of `::`.
    pub reference: LeftPadded<Arc<Identifier>>,
    pub ty: JavaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    InstanceOf,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::UnsignedShiftRight => ">>>",
            BinaryOp::Addition => "+",
            BinaryOp::Subtraction => "-",
            BinaryOp::Multiplication => "*",
            BinaryOp::Division => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::InstanceOf => "instanceof",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::BitOr => 3,
            BinaryOp::BitXor => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::Equal | BinaryOp::NotEqual => 6,
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual
            | BinaryOp::InstanceOf => 7,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::UnsignedShiftRight => 8,
            BinaryOp::Addition | BinaryOp::Subtraction => 9,
            BinaryOp::Multiplication | BinaryOp::Division | BinaryOp::Modulo => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub id: Id,
    pub prefix: Space,
    pub left: Expression,
    pub operator: LeftPadded<BinaryOp>,
    /// For `instanceof`, a `FieldAccess`/`Identifier` naming the type.
    pub right: Expression,
    pub ty: JavaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negative,
    Positive,
    Complement,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negative => "-",
            UnaryOp::Positive => "+",
            UnaryOp::Complement => "~",
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostIncrement | UnaryOp::PostDecrement)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub id: Id,
    pub prefix: Space,
    /// For postfix operators `before` is the trivia in front of the operator.
    pub operator: LeftPadded<UnaryOp>,
    pub expression: Expression,
    pub ty: JavaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShiftLeftAssign,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubtractAssign => "-=",
            AssignOp::MultiplyAssign => "*=",
            AssignOp::DivideAssign => "/=",
            AssignOp::ModuloAssign => "%=",
            AssignOp::AndAssign => "&=",
            AssignOp::OrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::ShiftLeftAssign => "<<=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::AddAssign,
            "-=" => AssignOp::SubtractAssign,
            "*=" => AssignOp::MultiplyAssign,
            "/=" => AssignOp::DivideAssign,
            "%=" => AssignOp::ModuloAssign,
            "&=" => AssignOp::AndAssign,
            "|=" => AssignOp::OrAssign,
            "^=" => AssignOp::XorAssign,
            "<<=" => AssignOp::ShiftLeftAssign,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: Id,
    pub prefix: Space,
    pub variable: Expression,
    pub operator: LeftPadded<AssignOp>,
    pub value: Expression,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ternary {
    pub id: Id,
    pub prefix: Space,
    pub condition: Expression,
    pub true_part: LeftPadded<Expression>,
    pub false_part: LeftPadded<Expression>,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parentheses {
    pub id: Id,
    pub prefix: Space,
    pub tree: Padded<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayAccess {
    pub id: Id,
    pub prefix: Space,
    pub indexed: Expression,
    pub dimension: ArrayDimension,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeCast {
    pub id: Id,
    pub prefix: Space,
    /// `after` is the trivia in front of `)`.
    pub clazz: Padded<TypeTree>,
    pub expression: Expression,
    pub ty: JavaType,
}

macro_rules! for_each_expression {
    ($value:expr, $node:ident => $body:expr) => {
        match $value {
            Expression::Identifier($node) => $body,
            Expression::Literal($node) => $body,
            Expression::FieldAccess($node) => $body,
            Expression::MethodInvocation($node) => $body,
            Expression::NewClass($node) => $body,
            Expression::NewArray($node) => $body,
            Expression::Lambda($node) => $body,
            Expression::MemberReference($node) => $body,
            Expression::Binary($node) => $body,
            Expression::Unary($node) => $body,
            Expression::Assignment($node) => $body,
            Expression::Ternary($node) => $body,
            Expression::Parentheses($node) => $body,
            Expression::ArrayAccess($node) => $body,
            Expression::TypeCast($node) => $body,
        }
    };
}

impl Expression {
    pub fn id(&self) -> Id {
        for_each_expression!(self, n => n.id)
    }

    pub fn prefix(&self) -> &Space {
        for_each_expression!(self, n => &n.prefix)
    }

    pub fn with_prefix(&self, prefix: Space) -> Expression {
        macro_rules! set {
            ($variant:ident, $node:expr) => {{
                let mut copy = (**$node).clone();
                copy.prefix = prefix;
                Expression::$variant(Arc::new(copy))
            }};
        }
        match self {
            Expression::Identifier(n) => set!(Identifier, n),
            Expression::Literal(n) => set!(Literal, n),
            Expression::FieldAccess(n) => set!(FieldAccess, n),
            Expression::MethodInvocation(n) => set!(MethodInvocation, n),
            Expression::NewClass(n) => set!(NewClass, n),
            Expression::NewArray(n) => set!(NewArray, n),
            Expression::Lambda(n) => set!(Lambda, n),
            Expression::MemberReference(n) => set!(MemberReference, n),
            Expression::Binary(n) => set!(Binary, n),
            Expression::Unary(n) => set!(Unary, n),
            Expression::Assignment(n) => set!(Assignment, n),
            Expression::Ternary(n) => set!(Ternary, n),
            Expression::Parentheses(n) => set!(Parentheses, n),
            Expression::ArrayAccess(n) => set!(ArrayAccess, n),
            Expression::TypeCast(n) => set!(TypeCast, n),
        }
    }

    /// Attributed static type; `Unknown` where attribution is missing.
    pub fn ty(&self) -> &JavaType {
        match self {
            Expression::MethodInvocation(n) => n.ty(),
            Expression::Parentheses(n) => n.tree.element.ty(),
            Expression::Identifier(n) => &n.ty,
            Expression::Literal(n) => &n.ty,
            Expression::FieldAccess(n) => &n.ty,
            Expression::NewClass(n) => &n.ty,
            Expression::NewArray(n) => &n.ty,
            Expression::Lambda(n) => &n.ty,
            Expression::MemberReference(n) => &n.ty,
            Expression::Binary(n) => &n.ty,
            Expression::Unary(n) => &n.ty,
            Expression::Assignment(n) => &n.ty,
            Expression::Ternary(n) => &n.ty,
            Expression::ArrayAccess(n) => &n.ty,
            Expression::TypeCast(n) => &n.ty,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Identifier(_) => "identifier",
            Expression::Literal(_) => "literal",
            Expression::FieldAccess(_) => "field access",
            Expression::MethodInvocation(_) => "method invocation",
            Expression::NewClass(_) => "new class",
            Expression::NewArray(_) => "new array",
            Expression::Lambda(_) => "lambda",
            Expression::MemberReference(_) => "member reference",
            Expression::Binary(_) => "binary",
            Expression::Unary(_) => "unary",
            Expression::Assignment(_) => "assignment",
            Expression::Ternary(_) => "ternary",
            Expression::Parentheses(_) => "parentheses",
            Expression::ArrayAccess(_) => "array access",
            Expression::TypeCast(_) => "type cast",
        }
    }

    pub fn ptr_eq(&self, other: &Expression) -> bool {
        match (self, other) {
            (Expression::Identifier(a), Expression::Identifier(b)) => Arc::ptr_eq(a, b),
            (Expression::Literal(a), Expression::Literal(b)) => Arc::ptr_eq(a, b),
            (Expression::FieldAccess(a), Expression::FieldAccess(b)) => Arc::ptr_eq(a, b),
            (Expression::MethodInvocation(a), Expression::MethodInvocation(b)) => Arc::ptr_eq(a, b),
            (Expression::NewClass(a), Expression::NewClass(b)) => Arc::ptr_eq(a, b),
            (Expression::NewArray(a), Expression::NewArray(b)) => Arc::ptr_eq(a, b),
            (Expression::Lambda(a), Expression::Lambda(b)) => Arc::ptr_eq(a, b),
            (Expression::MemberReference(a), Expression::MemberReference(b)) => Arc::ptr_eq(a, b),
            (Expression::Binary(a), Expression::Binary(b)) => Arc::ptr_eq(a, b),
            (Expression::Unary(a), Expression::Unary(b)) => Arc::ptr_eq(a, b),
            (Expression::Assignment(a), Expression::Assignment(b)) => Arc::ptr_eq(a, b),
            (Expression::Ternary(a), Expression::Ternary(b)) => Arc::ptr_eq(a, b),
            (Expression::Parentheses(a), Expression::Parentheses(b)) => Arc::ptr_eq(a, b),
            (Expression::ArrayAccess(a), Expression::ArrayAccess(b)) => Arc::ptr_eq(a, b),
            (Expression::TypeCast(a), Expression::TypeCast(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_literal(&self) -> Option<&Arc<Literal>> {
        match self {
            Expression::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_method_invocation(&self) -> Option<&Arc<MethodInvocation>> {
        match self {
            Expression::MethodInvocation(m) => Some(m),
            _ => None,
        }
    }

    pub fn print(&self) -> String {
        let mut printer = super::Printer::new();
        printer.expression(self);
        printer.finish()
    }
}

/// Dotted name of an `Identifier`/`FieldAccess` chain, or `None` for
/// anything else.
pub fn qualified_name(expression: &Expression) -> Option<String> {
    match expression {
        Expression::Identifier(id) => Some(id.name.clone()),
        Expression::FieldAccess(fa) => {
            let target = qualified_name(&fa.target)?;
            Some(format!("{}.{}", target, fa.name.element.name))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Type trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TypeTree {
    /// `Identifier` or `FieldAccess` naming a class.
    Named(Expression),
    Primitive(Arc<PrimitiveTree>),
    Parameterized(Arc<ParameterizedType>),
    Array(Arc<ArrayType>),
    Wildcard(Arc<Wildcard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveTree {
    pub id: Id,
    pub prefix: Space,
    pub primitive: Primitive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedType {
    pub id: Id,
    pub prefix: Space,
    pub clazz: Expression,
    /// Empty for the diamond `<>`.
    pub type_arguments: Container<TypeTree>,
    pub ty: JavaType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub id: Id,
    pub prefix: Space,
    pub element: TypeTree,
    /// Trivia in front of `[` and `]`.
    pub open: Space,
    pub close: Space,
    pub ty: JavaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardBound {
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wildcard {
    pub id: Id,
    pub prefix: Space,
    pub bound: Option<LeftPadded<WildcardBound>>,
    pub bounded: Option<TypeTree>,
}

impl TypeTree {
    pub fn id(&self) -> Id {
        match self {
            TypeTree::Named(e) => e.id(),
            TypeTree::Primitive(n) => n.id,
            TypeTree::Parameterized(n) => n.id,
            TypeTree::Array(n) => n.id,
            TypeTree::Wildcard(n) => n.id,
        }
    }

    pub fn prefix(&self) -> &Space {
        match self {
            TypeTree::Named(e) => e.prefix(),
            TypeTree::Primitive(n) => &n.prefix,
            TypeTree::Parameterized(n) => &n.prefix,
            TypeTree::Array(n) => &n.prefix,
            TypeTree::Wildcard(n) => &n.prefix,
        }
    }

    pub fn with_prefix(&self, prefix: Space) -> TypeTree {
        match self {
            TypeTree::Named(e) => TypeTree::Named(e.with_prefix(prefix)),
            TypeTree::Primitive(n) => TypeTree::Primitive(Arc::new(PrimitiveTree {
                prefix,
                ..(**n).clone()
            })),
            TypeTree::Parameterized(n) => TypeTree::Parameterized(Arc::new(ParameterizedType {
                prefix,
                ..(**n).clone()
            })),
            TypeTree::Array(n) => TypeTree::Array(Arc::new(ArrayType {
                prefix,
                ..(**n).clone()
            })),
            TypeTree::Wildcard(n) => TypeTree::Wildcard(Arc::new(Wildcard {
                prefix,
                ..(**n).clone()
            })),
        }
    }

    pub fn ty(&self) -> JavaType {
        match self {
            TypeTree::Named(e) => e.ty().clone(),
            TypeTree::Primitive(n) => JavaType::Primitive(n.primitive),
            TypeTree::Parameterized(n) => n.ty.clone(),
            TypeTree::Array(n) => n.ty.clone(),
            TypeTree::Wildcard(_) => JavaType::Unknown,
        }
    }

    pub fn ptr_eq(&self, other: &TypeTree) -> bool {
        match (self, other) {
            (TypeTree::Named(a), TypeTree::Named(b)) => a.ptr_eq(b),
            (TypeTree::Primitive(a), TypeTree::Primitive(b)) => Arc::ptr_eq(a, b),
            (TypeTree::Parameterized(a), TypeTree::Parameterized(b)) => Arc::ptr_eq(a, b),
            (TypeTree::Array(a), TypeTree::Array(b)) => Arc::ptr_eq(a, b),
            (TypeTree::Wildcard(a), TypeTree::Wildcard(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
