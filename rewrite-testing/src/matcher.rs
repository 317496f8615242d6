//! Signature patterns for invocations, types and annotations.
//!
//! A [`MethodMatcher`] is built from a pattern such as
//! `org.junit.jupiter.api.Assertions assertEquals(..)` and answers whether an
//! attributed invocation calls a matching method. Matching never looks at
//! source text: an invocation without a resolved method type is rejected.

use std::sync::Arc;

use crate::error::MatcherError;
use crate::parse::type_symbol;
use crate::tree::{qualified_name, Annotation, ClassType, Expression, JavaType, MethodInvocation, MethodType};

/// Matches fully qualified type names.
///
/// Supported forms:
/// - `java.lang.String`: exactly that type
/// - `org.mockito.*`: any type in `org.mockito` or one of its sub-packages
/// - `org..Assert*`: `..` spans any number of segments, `*` any run of
///   characters within one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMatcher {
    pattern: String,
    kind: TypePattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypePattern {
    Exact(String),
    Package(String),
    Glob(Vec<String>),
}

impl TypeMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let invalid = |reason: &str| MatcherError::InvalidTypePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty type"));
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_alphanumeric() || matches!(c, '.' | '*' | '_' | '$' | '[' | ']')))
        {
            return Err(invalid(&format!("unexpected character '{c}'")));
        }
        if trimmed.starts_with('.') && !trimmed.starts_with("..") || trimmed.ends_with("..") {
            return Err(invalid("dangling '.'"));
        }

        let kind = if !trimmed.contains('*') && !trimmed.contains("..") {
            TypePattern::Exact(trimmed.to_string())
        } else if let Some(package) = trimmed.strip_suffix(".*").filter(|p| !p.contains('*') && !p.contains("..")) {
            TypePattern::Package(package.to_string())
        } else {
            TypePattern::Glob(split_glob(trimmed))
        };
        Ok(Self {
            pattern: trimmed.to_string(),
            kind,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `fqn` itself matches, without looking at supertypes.
    pub fn matches_name(&self, fqn: &str) -> bool {
        match &self.kind {
            TypePattern::Exact(name) => name == fqn,
            TypePattern::Package(package) => {
                fqn.strip_prefix(package.as_str()).is_some_and(|rest| rest.starts_with('.'))
            }
            TypePattern::Glob(segments) => {
                let name: Vec<&str> = fqn.split('.').collect();
                let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
                glob_segments(&segments, &name)
            }
        }
    }

    /// Whether the type or, with `allow_subtypes`, any of its supertypes
    /// matches.
    pub fn matches_class(&self, ty: &Arc<ClassType>, allow_subtypes: bool) -> bool {
        if allow_subtypes {
            ty.ancestors().iter().any(|a| self.matches_name(&a.fqn))
        } else {
            self.matches_name(&ty.fqn)
        }
    }

    pub fn matches_type(&self, ty: &JavaType) -> bool {
        match ty {
            JavaType::Class(c) => self.matches_name(&c.fqn),
            JavaType::Unknown => false,
            other => self.matches_name(&other.declaration_name()),
        }
    }
}

fn split_glob(pattern: &str) -> Vec<String> {
    // `a..b` becomes ["a", "..", "b"]
    let mut out = Vec::new();
    for (i, part) in pattern.split("..").enumerate() {
        if i > 0 {
            out.push("..".to_string());
        }
        out.extend(part.split('.').filter(|s| !s.is_empty()).map(str::to_string));
    }
    out
}

fn glob_segments(pattern: &[&str], name: &[&str]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((&"..", rest)) => (0..=name.len()).any(|skip| glob_segments(rest, &name[skip..])),
        Some((head, rest)) => match name.split_first() {
            Some((segment, tail)) => glob_word(head, segment) && glob_segments(rest, tail),
            None => false,
        },
    }
}

/// `*` matches any run of characters.
fn glob_word(pattern: &str, word: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == word,
        Some((prefix, rest)) => {
            let Some(remaining) = word.strip_prefix(prefix) else {
                return false;
            };
            (0..=remaining.len())
                .filter(|i| remaining.is_char_boundary(*i))
                .any(|i| glob_word(rest, &remaining[i..]))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgPattern {
    /// `*`: exactly one argument of any type.
    Any,
    /// `..`: zero or more arguments.
    Rest,
    Type(TypeMatcher),
}

/// Predicate over method invocations built from
/// `"<type> <name>(<args>)"`.
///
/// - `<type>` is a [`TypeMatcher`] pattern; it matches the declaring type of
///   the resolved method, the static type of the receiver, or any of their
///   supertypes.
/// - `<name>` is a simple name; `*` globs are allowed.
/// - `<args>` is a comma separated list of types, `*` (one argument) and at
///   most one `..` (any number of arguments), checked against the declared
///   parameter types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatcher {
    pattern: String,
    declaring: TypeMatcher,
    name: String,
    arguments: Vec<ArgPattern>,
}

impl MethodMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let invalid = |reason: &str| MatcherError::InvalidMethodPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = pattern.trim();
        let (declaring, rest) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid("expected '<type> <name>(<args>)'"))?;
        let rest = rest.trim_start();
        let open = rest.find('(').ok_or_else(|| invalid("missing '('"))?;
        let args = rest[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing ')' at the end"))?;
        let name = rest[..open].trim();
        if name.is_empty() {
            return Err(invalid("missing method name"));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '*' | '<' | '>')) {
            return Err(invalid("invalid method name"));
        }

        let declaring = TypeMatcher::new(declaring).map_err(|e| invalid(&e.to_string()))?;

        let mut arguments = Vec::new();
        if !args.trim().is_empty() {
            for arg in args.split(',').map(str::trim) {
                arguments.push(match arg {
                    "" => return Err(invalid("empty argument")),
                    "*" => ArgPattern::Any,
                    ".." => ArgPattern::Rest,
                    ty => ArgPattern::Type(TypeMatcher::new(ty).map_err(|e| invalid(&e.to_string()))?),
                });
            }
        }
        if arguments.iter().filter(|a| **a == ArgPattern::Rest).count() > 1 {
            return Err(invalid("at most one '..' is allowed"));
        }

        Ok(Self {
            pattern: trimmed.to_string(),
            declaring,
            name: name.to_string(),
            arguments,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the invocation calls a method this pattern describes.
    pub fn matches(&self, invocation: &MethodInvocation) -> bool {
        let Some(method) = &invocation.method_type else {
            return false;
        };
        let receiver = invocation
            .select
            .as_ref()
            .and_then(|s| type_symbol(&s.element).or_else(|| s.element.ty().class().cloned()));
        self.matches_method(method, receiver.as_ref())
    }

    pub fn matches_method(&self, method: &MethodType, receiver: Option<&Arc<ClassType>>) -> bool {
        if !glob_word(&self.name, &method.name) {
            return false;
        }
        let declared = self.declaring.matches_class(&method.declaring_type, true);
        let received = receiver.is_some_and(|r| self.declaring.matches_class(r, true));
        if !declared && !received {
            return false;
        }
        match_arguments(&self.arguments, &method.parameter_types)
    }
}

fn match_arguments(patterns: &[ArgPattern], params: &[JavaType]) -> bool {
    match patterns.split_first() {
        None => params.is_empty(),
        Some((ArgPattern::Rest, rest)) => (0..=params.len()).any(|skip| match_arguments(rest, &params[skip..])),
        Some((head, rest)) => match params.split_first() {
            Some((param, tail)) => {
                let ok = match head {
                    ArgPattern::Any => true,
                    ArgPattern::Type(t) => t.matches_type(param),
                    ArgPattern::Rest => false,
                };
                ok && match_arguments(rest, tail)
            }
            None => false,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AnnotationArgument {
    /// `Foo.class`
    ClassLiteral(TypeMatcher),
    /// Any other single value, compared by its source text.
    Source(String),
}

/// Matches annotations written as `@<type>` or `@<type>(<value>)`, for
/// example `@org.junit.runner.RunWith(org.junit.runners.JUnit4.class)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationMatcher {
    pattern: String,
    annotation_type: TypeMatcher,
    argument: Option<AnnotationArgument>,
}

impl AnnotationMatcher {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        let invalid = |reason: &str| MatcherError::InvalidAnnotationPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = pattern.trim();
        let body = trimmed.strip_prefix('@').ok_or_else(|| invalid("must start with '@'"))?;
        let (name, argument) = match body.split_once('(') {
            Some((name, rest)) => {
                let value = rest.strip_suffix(')').ok_or_else(|| invalid("missing ')'"))?.trim();
                let value = value.strip_prefix("value").map_or(value, |v| {
                    v.trim_start().strip_prefix('=').map_or(value, str::trim)
                });
                let argument = match value.strip_suffix(".class") {
                    Some(class) => AnnotationArgument::ClassLiteral(
                        TypeMatcher::new(class).map_err(|e| invalid(&e.to_string()))?,
                    ),
                    None if value.is_empty() => return Err(invalid("empty argument")),
                    None => AnnotationArgument::Source(value.to_string()),
                };
                (name, Some(argument))
            }
            None => (body, None),
        };
        let annotation_type = TypeMatcher::new(name).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            pattern: trimmed.to_string(),
            annotation_type,
            argument,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        let Some(ty) = annotation.ty().class() else {
            return false;
        };
        if !self.annotation_type.matches_class(ty, false) {
            return false;
        }
        let Some(expected) = &self.argument else {
            return true;
        };
        let Some(arguments) = &annotation.arguments else {
            return false;
        };
        let [value] = arguments.elements.as_slice() else {
            return false;
        };
        let value = match &value.element {
            Expression::Assignment(pair) if qualified_name(&pair.variable).as_deref() == Some("value") => &pair.value,
            other => other,
        };
        match expected {
            AnnotationArgument::ClassLiteral(class) => match value {
                Expression::FieldAccess(fa) if fa.simple_name() == "class" => {
                    type_symbol(&fa.target).is_some_and(|t| class.matches_name(&t.fqn))
                }
                _ => false,
            },
            AnnotationArgument::Source(text) => value.print().trim() == text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::parse::JavaParser;
    use crate::tree::{Primitive, Statement, TypeKind};

    fn class(fqn: &str, supertypes: Vec<Arc<ClassType>>) -> Arc<ClassType> {
        Arc::new(ClassType::new(fqn, TypeKind::Class, supertypes))
    }

    fn method(owner: &Arc<ClassType>, name: &str, params: Vec<JavaType>) -> MethodType {
        MethodType {
            declaring_type: owner.clone(),
            name: name.into(),
            parameter_types: params,
            return_type: JavaType::Primitive(Primitive::Void),
            is_static: true,
            varargs: false,
        }
    }

    fn string() -> JavaType {
        JavaType::Class(class("java.lang.String", vec![]))
    }

    #[test]
    fn type_patterns() {
        let exact = TypeMatcher::new("org.mockito.Mockito").unwrap();
        assert!(exact.matches_name("org.mockito.Mockito"));
        assert!(!exact.matches_name("org.mockito.BDDMockito"));

        let package = TypeMatcher::new("org.mockito.*").unwrap();
        assert!(package.matches_name("org.mockito.Mockito"));
        assert!(package.matches_name("org.mockito.junit.MockitoJUnitRunner"));
        assert!(!package.matches_name("org.mockitox.Foo"));
        assert!(!package.matches_name("org.mockito"));

        let glob = TypeMatcher::new("org..Abstract*Assert").unwrap();
        assert!(glob.matches_name("org.assertj.core.api.AbstractStringAssert"));
        assert!(!glob.matches_name("org.assertj.core.api.StringAssert"));
    }

    #[test]
    fn invalid_patterns_are_reported() {
        assert!(matches!(
            MethodMatcher::new("org.junit.Assert assertEquals"),
            Err(MatcherError::InvalidMethodPattern { .. })
        ));
        assert!(MethodMatcher::new("A m(.., ..)").is_err());
        assert!(MethodMatcher::new("A m(int,)").is_err());
        assert!(MethodMatcher::new("A (int)").is_err());
        assert!(TypeMatcher::new("a b").is_err());
        assert!(AnnotationMatcher::new("RunWith").is_err());
    }

    #[test]
    fn arguments_unify_with_wildcards() {
        let owner = class("org.junit.jupiter.api.Assertions", vec![]);
        let int = JavaType::Primitive(Primitive::Int);
        let call = method(&owner, "assertEquals", vec![int.clone(), int.clone(), string()]);

        let any = MethodMatcher::new("org.junit.jupiter.api.Assertions assertEquals(..)").unwrap();
        assert!(any.matches_method(&call, None));
        let exact =
            MethodMatcher::new("org.junit.jupiter.api.Assertions assertEquals(int, int, java.lang.String)").unwrap();
        assert!(exact.matches_method(&call, None));
        let tail = MethodMatcher::new("org.junit.jupiter.api.Assertions assert*(*, .., java.lang.String)").unwrap();
        assert!(tail.matches_method(&call, None));
        let two = MethodMatcher::new("org.junit.jupiter.api.Assertions assertEquals(*, *)").unwrap();
        assert!(!two.matches_method(&call, None));
    }

    #[test]
    fn declaring_type_may_be_a_subtype() {
        let base = class("org.assertj.core.api.AbstractAssert", vec![]);
        let string_assert = class("org.assertj.core.api.AbstractStringAssert", vec![base.clone()]);
        let call = method(&string_assert, "isEqualTo", vec![string()]);
        let on_base = MethodMatcher::new("org.assertj.core.api.AbstractAssert isEqualTo(..)").unwrap();
        assert!(on_base.matches_method(&call, None));
        let on_other = MethodMatcher::new("org.assertj.core.api.ObjectAssert isEqualTo(..)").unwrap();
        assert!(!on_other.matches_method(&call, None));
    }

    #[test]
    fn unattributed_invocations_never_match() {
        let ctx = ExecutionContext::new();
        let parser = JavaParser::builder()
            .classpath_from_resources(&ctx, &["junit-jupiter-api-5.9"])
            .build()
            .unwrap();
        let cu = parser
            .parse(
                "T.java",
                "import static org.junit.jupiter.api.Assertions.*;\n\
                 class T { void t(int a) { assertEquals(a, 1); assertEquals(missing, 1); } }\n",
            )
            .unwrap();
        let Statement::Method(m) = &cu.classes[0].body.statements[0].element else {
            panic!("method expected");
        };
        let calls: Vec<_> = m
            .body
            .as_ref()
            .unwrap()
            .statements
            .iter()
            .filter_map(|s| match &s.element {
                Statement::Expression(e) => e.as_method_invocation().cloned(),
                _ => None,
            })
            .collect();
        let matcher = MethodMatcher::new("org.junit.jupiter.api.Assertions assertEquals(..)").unwrap();
        assert!(matcher.matches(&calls[0]));
        assert!(!matcher.matches(&calls[1]));
    }

    #[test]
    fn annotation_with_class_literal() {
        let ctx = ExecutionContext::new();
        let parser = JavaParser::builder()
            .classpath_from_resources(&ctx, &["junit-4.13"])
            .build()
            .unwrap();
        let cu = parser
            .parse(
                "T.java",
                "import org.junit.runner.RunWith;\nimport org.junit.runners.JUnit4;\n@RunWith(JUnit4.class)\nclass T {}\n",
            )
            .unwrap();
        let annotation = &cu.classes[0].leading_annotations[0];
        assert!(AnnotationMatcher::new("@org.junit.runner.RunWith").unwrap().matches(annotation));
        assert!(AnnotationMatcher::new("@org.junit.runner.RunWith(org.junit.runners.JUnit4.class)")
            .unwrap()
            .matches(annotation));
        assert!(!AnnotationMatcher::new("@org.junit.runner.RunWith(org.junit.runners.Suite.class)")
            .unwrap()
            .matches(annotation));
    }
}
