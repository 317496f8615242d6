//! Lossless syntax tree for Java test sources.
//!
//! Nodes are immutable and `Arc`-shared. A node stores the whitespace and
//! comments in front of it in its `prefix`; trivia in front of delimiters
//! lives in the [`Padded`], [`LeftPadded`] and [`Container`] wrappers, so that
//! printing a parsed tree gives back the input byte for byte.

mod nodes;
mod print;
mod types;

pub use nodes::*;
pub use print::{locate, Printer};
pub use types::{package_of, ClassType, JavaType, MethodType, Primitive, Symbol, TypeKind};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a node. Copies made with `with_*` keep the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Id(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whitespace and comments, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Space(String);

impl Space {
    pub const EMPTY: Space = Space(String::new());

    pub fn new(text: impl Into<String>) -> Self {
        Space(text.into())
    }

    pub fn single() -> Self {
        Space(" ".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_newline(&self) -> bool {
        self.0.contains('\n')
    }

    /// Whether the trivia contains an empty line.
    pub fn has_blank_line(&self) -> bool {
        self.0.matches('\n').count() >= 2
    }

    /// Text after the last newline, i.e. the indentation of the next token.
    pub fn indent(&self) -> &str {
        match self.0.rfind('\n') {
            Some(nl) => &self.0[nl + 1..],
            None => "",
        }
    }

    /// The comments, and whatever follows them, with leading whitespace dropped.
    pub fn comments(&self) -> &str {
        self.0.trim_start()
    }

    /// This space's leading whitespace kept, with `other`'s comments appended.
    pub fn absorb(&self, other: &Space) -> Space {
        Space(format!("{}{}", self.0, other.comments()))
    }

    /// Same indentation, preceded by exactly one newline.
    pub fn on_own_line(&self) -> Space {
        Space(format!("\n{}", self.indent()))
    }

    /// Same indentation, preceded by a blank line.
    pub fn after_blank_line(&self) -> Space {
        Space(format!("\n\n{}", self.indent()))
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An element followed by the trivia in front of its trailing delimiter.
#[derive(Debug, Clone, PartialEq)]
pub struct Padded<T> {
    pub element: T,
    pub after: Space,
}

impl<T> Padded<T> {
    pub fn new(element: T) -> Self {
        Self {
            element,
            after: Space::EMPTY,
        }
    }

    pub fn with_element<U>(&self, element: U) -> Padded<U> {
        Padded {
            element,
            after: self.after.clone(),
        }
    }
}

/// An element preceded by a keyword or operator and the trivia in front of it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeftPadded<T> {
    pub before: Space,
    pub element: T,
}

impl<T> LeftPadded<T> {
    pub fn new(element: T) -> Self {
        Self {
            before: Space::EMPTY,
            element,
        }
    }

    pub fn with_element<U>(&self, element: U) -> LeftPadded<U> {
        LeftPadded {
            before: self.before.clone(),
            element,
        }
    }
}

/// A delimited, comma separated list: `before` precedes the opening
/// delimiter and `end` precedes the closing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Container<T> {
    pub before: Space,
    pub elements: Vec<Padded<T>>,
    pub end: Space,
}

impl<T> Container<T> {
    pub fn empty() -> Self {
        Self {
            before: Space::EMPTY,
            elements: Vec::new(),
            end: Space::EMPTY,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter().map(|p| &p.element)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index).map(|p| &p.element)
    }

    /// Replace every element, keeping the trivia around the delimiters.
    pub fn with_elements(&self, elements: Vec<T>) -> Container<T> {
        let mut padded: Vec<Padded<T>> = Vec::with_capacity(elements.len());
        for (i, element) in elements.into_iter().enumerate() {
            let after = self
                .elements
                .get(i)
                .map(|p| p.after.clone())
                .unwrap_or_default();
            padded.push(Padded { element, after });
        }
        Container {
            before: self.before.clone(),
            elements: padded,
            end: self.end.clone(),
        }
    }
}

/// Any node the cursor can point at.
#[derive(Debug, Clone)]
pub enum Tree {
    CompilationUnit(std::sync::Arc<CompilationUnit>),
    Import(std::sync::Arc<Import>),
    Class(std::sync::Arc<ClassDeclaration>),
    Method(std::sync::Arc<MethodDeclaration>),
    Annotation(std::sync::Arc<Annotation>),
    Block(std::sync::Arc<Block>),
    VariableDeclarations(std::sync::Arc<VariableDeclarations>),
    Statement(Statement),
    Expression(Expression),
    TypeTree(TypeTree),
}

impl Tree {
    pub fn id(&self) -> Id {
        match self {
            Tree::CompilationUnit(n) => n.id,
            Tree::Import(n) => n.id,
            Tree::Class(n) => n.id,
            Tree::Method(n) => n.id,
            Tree::Annotation(n) => n.id,
            Tree::Block(n) => n.id,
            Tree::VariableDeclarations(n) => n.id,
            Tree::Statement(n) => n.id(),
            Tree::Expression(n) => n.id(),
            Tree::TypeTree(n) => n.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Tree::CompilationUnit(_) => "compilation unit",
            Tree::Import(_) => "import",
            Tree::Class(_) => "class declaration",
            Tree::Method(_) => "method declaration",
            Tree::Annotation(_) => "annotation",
            Tree::Block(_) => "block",
            Tree::VariableDeclarations(_) => "variable declarations",
            Tree::Statement(s) => s.kind(),
            Tree::Expression(e) => e.kind(),
            Tree::TypeTree(_) => "type tree",
        }
    }

    pub fn into_expression(self) -> Option<Expression> {
        match self {
            Tree::Expression(e) => Some(e),
            Tree::Statement(Statement::Expression(e)) => Some(e),
            _ => None,
        }
    }

    pub fn into_statement(self) -> Option<Statement> {
        match self {
            Tree::Statement(s) => Some(s),
            Tree::Expression(e) => Some(Statement::Expression(e)),
            Tree::Block(b) => Some(Statement::Block(b)),
            Tree::Class(c) => Some(Statement::Class(c)),
            Tree::Method(m) => Some(Statement::Method(m)),
            Tree::VariableDeclarations(v) => Some(Statement::VariableDeclarations(v)),
            _ => None,
        }
    }

    pub fn into_block(self) -> Option<std::sync::Arc<Block>> {
        match self {
            Tree::Block(b) | Tree::Statement(Statement::Block(b)) => Some(b),
            _ => None,
        }
    }

    pub fn into_annotation(self) -> Option<std::sync::Arc<Annotation>> {
        match self {
            Tree::Annotation(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_class(self) -> Option<std::sync::Arc<ClassDeclaration>> {
        match self {
            Tree::Class(c) | Tree::Statement(Statement::Class(c)) => Some(c),
            _ => None,
        }
    }

    pub fn into_method(self) -> Option<std::sync::Arc<MethodDeclaration>> {
        match self {
            Tree::Method(m) | Tree::Statement(Statement::Method(m)) => Some(m),
            _ => None,
        }
    }

    pub fn print(&self) -> String {
        let mut printer = Printer::new();
        printer.tree(self);
        printer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_is_text_after_last_newline() {
        let space = Space::new("\n\n    ");
        assert_eq!(space.indent(), "    ");
        assert!(space.has_blank_line());
        assert_eq!(space.on_own_line().as_str(), "\n    ");
        assert_eq!(Space::new("  ").indent(), "");
    }

    #[test]
    fn absorb_keeps_own_whitespace_and_other_comments() {
        let removed = Space::new("\n\n");
        assert_eq!(removed.absorb(&Space::new("\n/* keep */ ")).as_str(), "\n\n/* keep */ ");
        assert_eq!(removed.absorb(&Space::new("\n")).as_str(), "\n\n");
        assert_eq!(Space::EMPTY.absorb(&Space::new("\n// note\n")).as_str(), "// note\n");
    }

    #[test]
    fn container_with_elements_keeps_delimiter_trivia() {
        let container = Container {
            before: Space::new(" "),
            elements: vec![
                Padded { element: 1, after: Space::new(" ") },
                Padded { element: 2, after: Space::EMPTY },
            ],
            end: Space::new(" "),
        };
        let replaced = container.with_elements(vec![3, 4, 5]);
        assert_eq!(replaced.elements[0].after.as_str(), " ");
        assert!(replaced.elements[2].after.is_empty());
        assert_eq!(replaced.end.as_str(), " ");
        assert_eq!(replaced.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Id::next(), Id::next());
    }
}
