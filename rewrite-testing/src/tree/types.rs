//! Type attribution carried by the tree.
//!
//! Class types are self-describing: each one holds its supertypes, so
//! assignability can be answered from the tree alone without going back to
//! the classpath that produced it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    /// Type of the `null` literal.
    Null,
}

impl Primitive {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "void" => Self::Void,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Void => "void",
            Self::Null => "null",
        }
    }

    /// Fully qualified name of the wrapper class.
    pub fn boxed(self) -> Option<&'static str> {
        Some(match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Char => "java.lang.Character",
            Self::Short => "java.lang.Short",
            Self::Int => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Float => "java.lang.Float",
            Self::Double => "java.lang.Double",
            Self::Void | Self::Null => return None,
        })
    }

    pub fn unboxed(fqn: &str) -> Option<Self> {
        Some(match fqn {
            "java.lang.Boolean" => Self::Boolean,
            "java.lang.Byte" => Self::Byte,
            "java.lang.Character" => Self::Char,
            "java.lang.Short" => Self::Short,
            "java.lang.Integer" => Self::Int,
            "java.lang.Long" => Self::Long,
            "java.lang.Float" => Self::Float,
            "java.lang.Double" => Self::Double,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Char | Self::Short | Self::Int | Self::Long | Self::Float | Self::Double
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Primitive widening conversion (JLS 5.1.2), identity included.
    pub fn widens_to(self, target: Primitive) -> bool {
        use Primitive::*;
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Annotation,
    Enum,
}

/// A declared class, interface or annotation type.
#[derive(Debug)]
pub struct ClassType {
    pub fqn: String,
    pub kind: TypeKind,
    /// Direct supertypes; `java.lang.Object` is implied for everything else.
    pub supertypes: Vec<Arc<ClassType>>,
    /// Single abstract method interface, usable as a lambda target.
    pub functional: bool,
}

impl ClassType {
    pub fn new(fqn: impl Into<String>, kind: TypeKind, supertypes: Vec<Arc<ClassType>>) -> Self {
        Self {
            fqn: fqn.into(),
            kind,
            supertypes,
            functional: false,
        }
    }

    pub fn simple_name(&self) -> &str {
        self.fqn.rsplit('.').next().unwrap_or(&self.fqn)
    }

    /// Package part of the name, guessed from lower-case leading segments.
    pub fn package_name(&self) -> String {
        package_of(&self.fqn)
    }

    /// Whether this type is `fqn` or has it somewhere above it.
    pub fn is_subtype_of(&self, fqn: &str) -> bool {
        if self.fqn == fqn || fqn == "java.lang.Object" {
            return true;
        }
        self.supertypes.iter().any(|s| s.is_subtype_of(fqn))
    }

    /// Walk this type and every supertype, nearest first, each once.
    pub fn ancestors(self: &Arc<Self>) -> Vec<Arc<ClassType>> {
        let mut out: Vec<Arc<ClassType>> = Vec::new();
        let mut queue = std::collections::VecDeque::from([self.clone()]);
        while let Some(next) = queue.pop_front() {
            if out.iter().any(|seen| seen.fqn == next.fqn) {
                continue;
            }
            queue.extend(next.supertypes.iter().cloned());
            out.push(next);
        }
        out
    }
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.fqn == other.fqn
    }
}

impl Eq for ClassType {}

/// Static type of an expression or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JavaType {
    #[default]
    Unknown,
    Primitive(Primitive),
    Class(Arc<ClassType>),
    Array(Box<JavaType>),
}

impl JavaType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn class(&self) -> Option<&Arc<ClassType>> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn fqn(&self) -> Option<&str> {
        self.class().map(|c| c.fqn.as_str())
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// `double`, `float` or their wrappers.
    pub fn is_floating(&self) -> bool {
        match self {
            Self::Primitive(p) => p.is_floating(),
            Self::Class(c) => Primitive::unboxed(&c.fqn).is_some_and(Primitive::is_floating),
            _ => false,
        }
    }

    pub fn is_functional(&self) -> bool {
        matches!(self, Self::Class(c) if c.functional)
    }

    fn is_reference(&self) -> bool {
        matches!(self, Self::Class(_) | Self::Array(_) | Self::Primitive(Primitive::Null))
    }

    /// Strict invocation compatibility: identity, widening and subtyping.
    pub fn is_subtype_of(&self, target: &JavaType) -> bool {
        match (self, target) {
            (Self::Unknown, _) | (_, Self::Unknown) => false,
            (Self::Primitive(Primitive::Null), t) => t.is_reference() && !matches!(t, Self::Primitive(_)),
            (Self::Primitive(a), Self::Primitive(b)) => a.widens_to(*b),
            (Self::Class(a), Self::Class(b)) => a.is_subtype_of(&b.fqn),
            (Self::Array(_), Self::Class(b)) => {
                matches!(b.fqn.as_str(), "java.lang.Object" | "java.lang.Cloneable" | "java.io.Serializable")
            }
            (Self::Array(a), Self::Array(b)) => match (a.as_ref(), b.as_ref()) {
                (Self::Primitive(x), Self::Primitive(y)) => x == y,
                (x, y) => x.is_subtype_of(y),
            },
            _ => false,
        }
    }

    /// Loose invocation compatibility: strict plus boxing and unboxing.
    pub fn is_assignable_to(&self, target: &JavaType) -> bool {
        if self.is_subtype_of(target) {
            return true;
        }
        match (self, target) {
            (Self::Primitive(p), Self::Class(c)) => match p.boxed() {
                Some(boxed) => boxed_is_subtype(boxed, *p, &c.fqn),
                None => false,
            },
            (Self::Class(c), Self::Primitive(p)) => {
                Primitive::unboxed(&c.fqn).is_some_and(|unboxed| unboxed.widens_to(*p))
            }
            _ => false,
        }
    }

    /// Source spelling usable in a declaration, fully qualified.
    pub fn declaration_name(&self) -> String {
        match self {
            Self::Unknown | Self::Primitive(Primitive::Null) => "java.lang.Object".to_string(),
            Self::Primitive(p) => p.keyword().to_string(),
            Self::Class(c) => c.fqn.clone(),
            Self::Array(component) => format!("{}[]", component.declaration_name()),
        }
    }
}

fn boxed_is_subtype(boxed: &str, primitive: Primitive, target: &str) -> bool {
    boxed == target
        || matches!(target, "java.lang.Object" | "java.io.Serializable" | "java.lang.Comparable")
        || (primitive.is_numeric() && primitive != Primitive::Char && target == "java.lang.Number")
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("<unknown>"),
            Self::Primitive(p) => f.write_str(p.keyword()),
            Self::Class(c) => f.write_str(&c.fqn),
            Self::Array(component) => write!(f, "{component}[]"),
        }
    }
}

/// Resolved signature of an invoked method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodType {
    pub declaring_type: Arc<ClassType>,
    pub name: String,
    pub parameter_types: Vec<JavaType>,
    pub return_type: JavaType,
    pub is_static: bool,
    pub varargs: bool,
}

impl MethodType {
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_parameter_types(&self, parameter_types: Vec<JavaType>) -> Self {
        Self {
            parameter_types,
            varargs: false,
            ..self.clone()
        }
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.declaring_type.fqn, self.name)?;
        for (i, param) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// What a name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Type(Arc<ClassType>),
    Variable {
        name: String,
        /// Declaring class for fields, `None` for locals and parameters.
        owner: Option<Arc<ClassType>>,
        ty: JavaType,
        is_static: bool,
    },
}

/// Package of a fully qualified name: the leading lower-case segments.
pub fn package_of(fqn: &str) -> String {
    fqn.split('.')
        .take_while(|segment| segment.chars().next().is_some_and(|c| c.is_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(fqn: &str, supers: Vec<Arc<ClassType>>) -> Arc<ClassType> {
        Arc::new(ClassType::new(fqn, TypeKind::Class, supers))
    }

    #[test]
    fn widening_follows_jls_order() {
        assert!(Primitive::Int.widens_to(Primitive::Double));
        assert!(Primitive::Char.widens_to(Primitive::Int));
        assert!(!Primitive::Double.widens_to(Primitive::Float));
        assert!(!Primitive::Short.widens_to(Primitive::Char));
    }

    #[test]
    fn subtyping_walks_supertypes_transitively() {
        let base = class("org.example.Base", vec![]);
        let mid = class("org.example.Mid", vec![base]);
        let leaf = JavaType::Class(class("org.example.Leaf", vec![mid]));
        let object = JavaType::Class(class("java.lang.Object", vec![]));
        assert!(leaf.is_subtype_of(&JavaType::Class(class("org.example.Base", vec![]))));
        assert!(leaf.is_subtype_of(&object));
        assert!(!object.is_subtype_of(&leaf));
    }

    #[test]
    fn boxing_only_in_loose_phase() {
        let int = JavaType::Primitive(Primitive::Int);
        let integer = JavaType::Class(class("java.lang.Integer", vec![]));
        let object = JavaType::Class(class("java.lang.Object", vec![]));
        assert!(!int.is_subtype_of(&object));
        assert!(int.is_assignable_to(&object));
        assert!(integer.is_assignable_to(&JavaType::Primitive(Primitive::Long)));
    }

    #[test]
    fn arrays_by_component() {
        let doubles = JavaType::Array(Box::new(JavaType::Primitive(Primitive::Double)));
        let floats = JavaType::Array(Box::new(JavaType::Primitive(Primitive::Float)));
        assert!(doubles.is_subtype_of(&doubles));
        assert!(!floats.is_subtype_of(&doubles));
        let strings = JavaType::Array(Box::new(JavaType::Class(class("java.lang.String", vec![]))));
        let objects = JavaType::Array(Box::new(JavaType::Class(class("java.lang.Object", vec![]))));
        assert!(strings.is_subtype_of(&objects));
        assert!(JavaType::Primitive(Primitive::Null).is_subtype_of(&strings));
    }

    #[test]
    fn unknown_is_never_compatible() {
        let object = JavaType::Class(class("java.lang.Object", vec![]));
        assert!(!JavaType::Unknown.is_assignable_to(&object));
    }

    #[test]
    fn package_is_guessed_from_lowercase_segments() {
        assert_eq!(package_of("org.junit.jupiter.api.Assertions"), "org.junit.jupiter.api");
        assert_eq!(package_of("java.util.Map.Entry"), "java.util");
    }
}
