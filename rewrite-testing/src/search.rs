//! Read-only queries over an attributed unit.
//!
//! These back the recipe preconditions and a few rules. Each search is a
//! visitor that never changes the tree.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::MatcherError;
use crate::matcher::{AnnotationMatcher, MethodMatcher, TypeMatcher};
use crate::tree::{
    Annotation, ClassType, CompilationUnit, Expression, JavaType, MethodInvocation, TypeTree,
};
use crate::visitor::{visit, walk_annotation, walk_expression, walk_method_invocation, JavaVisitor, VisitCx};

/// Does the unit mention a type matching a pattern?
///
/// Imports count as mentions, so a unit that only imports a type still
/// uses it.
#[derive(Debug, Clone)]
pub struct UsesType {
    matcher: TypeMatcher,
    allow_subtypes: bool,
}

impl UsesType {
    /// # Arguments
    /// * `pattern` - a fully qualified name or glob, e.g. `org.mockito.*`
    /// * `allow_subtypes` - also accept types whose supertypes match
    pub fn new(pattern: &str, allow_subtypes: bool) -> Result<Self, MatcherError> {
        Ok(Self {
            matcher: TypeMatcher::new(pattern)?,
            allow_subtypes,
        })
    }

    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    pub fn check(&self, cu: &Arc<CompilationUnit>, ctx: &ExecutionContext) -> bool {
        let imported = cu.imports.iter().map(|p| &p.element).any(|import| {
            match import.qualid.target.ty().class().filter(|_| import.is_static()) {
                Some(owner) => self.matches_class(owner),
                None => self.matcher.matches_name(&import.type_name().unwrap_or_else(|| import.name())),
            }
        });
        if imported {
            return true;
        }
        let mut search = FindType {
            uses: self,
            found: false,
        };
        let mut cx = VisitCx::new(ctx, "search.UsesType");
        visit(&mut search, cu, &mut cx);
        search.found
    }

    fn matches_class(&self, ty: &Arc<ClassType>) -> bool {
        self.matcher.matches_class(ty, self.allow_subtypes)
    }

    fn matches_type(&self, ty: &JavaType) -> bool {
        match ty {
            JavaType::Class(class) => self.matches_class(class),
            JavaType::Array(element) => self.matches_type(element),
            _ => false,
        }
    }
}

struct FindType<'u> {
    uses: &'u UsesType,
    found: bool,
}

impl JavaVisitor for FindType<'_> {
    fn visit_expression(&mut self, expression: &Expression, cx: &mut VisitCx) -> Expression {
        if self.found {
            return expression.clone();
        }
        if self.uses.matches_type(expression.ty()) {
            self.found = true;
            return expression.clone();
        }
        walk_expression(self, expression, cx)
    }

    fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
        if let Some(method) = &invocation.method_type {
            if self.uses.matches_class(&method.declaring_type) {
                self.found = true;
            }
        }
        Expression::MethodInvocation(walk_method_invocation(self, invocation, cx))
    }

    fn visit_type_tree(&mut self, tree: &TypeTree, _cx: &mut VisitCx) -> TypeTree {
        if self.uses.matches_type(&tree.ty()) {
            self.found = true;
        }
        tree.clone()
    }
}

/// Does the unit invoke a method matching a signature pattern?
#[derive(Debug, Clone)]
pub struct UsesMethod {
    matcher: MethodMatcher,
}

impl UsesMethod {
    pub fn new(pattern: &str) -> Result<Self, MatcherError> {
        Ok(Self {
            matcher: MethodMatcher::new(pattern)?,
        })
    }

    pub fn from_matcher(matcher: MethodMatcher) -> Self {
        Self { matcher }
    }

    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    pub fn check(&self, cu: &Arc<CompilationUnit>, ctx: &ExecutionContext) -> bool {
        !find_method_invocations(cu, &self.matcher, ctx).is_empty()
    }
}

struct CollectInvocations<F> {
    keep: F,
    found: Vec<Arc<MethodInvocation>>,
}

impl<F: FnMut(&MethodInvocation) -> bool> JavaVisitor for CollectInvocations<F> {
    fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
        if (self.keep)(invocation) {
            self.found.push(invocation.clone());
        }
        Expression::MethodInvocation(walk_method_invocation(self, invocation, cx))
    }
}

fn collect_invocations(
    cu: &Arc<CompilationUnit>,
    ctx: &ExecutionContext,
    keep: impl FnMut(&MethodInvocation) -> bool,
) -> Vec<Arc<MethodInvocation>> {
    let mut search = CollectInvocations {
        keep,
        found: Vec::new(),
    };
    let mut cx = VisitCx::new(ctx, "search");
    visit(&mut search, cu, &mut cx);
    search.found
}

/// Invocations matching `matcher`, in source order.
pub fn find_method_invocations(
    cu: &Arc<CompilationUnit>,
    matcher: &MethodMatcher,
    ctx: &ExecutionContext,
) -> Vec<Arc<MethodInvocation>> {
    collect_invocations(cu, ctx, |m| matcher.matches(m))
}

/// Invocations the attributor could not resolve to a method.
pub fn find_missing_types(cu: &Arc<CompilationUnit>, ctx: &ExecutionContext) -> Vec<Arc<MethodInvocation>> {
    collect_invocations(cu, ctx, |m| m.method_type.is_none())
}

struct CollectAnnotations<'m> {
    matcher: &'m AnnotationMatcher,
    found: Vec<Arc<Annotation>>,
}

impl JavaVisitor for CollectAnnotations<'_> {
    fn visit_annotation(&mut self, annotation: &Arc<Annotation>, cx: &mut VisitCx) -> Arc<Annotation> {
        if self.matcher.matches(annotation) {
            self.found.push(annotation.clone());
        }
        walk_annotation(self, annotation, cx)
    }
}

/// Annotations matching `matcher` anywhere in the unit.
pub fn find_annotations(
    cu: &Arc<CompilationUnit>,
    matcher: &AnnotationMatcher,
    ctx: &ExecutionContext,
) -> Vec<Arc<Annotation>> {
    let mut search = CollectAnnotations {
        matcher,
        found: Vec::new(),
    };
    let mut cx = VisitCx::new(ctx, "search.FindAnnotations");
    visit(&mut search, cu, &mut cx);
    search.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::JavaParser;

    fn parse(ctx: &ExecutionContext, resources: &[&str], source: &str) -> Arc<CompilationUnit> {
        JavaParser::builder()
            .classpath_from_resources(ctx, resources)
            .build()
            .unwrap()
            .parse("S.java", source)
            .unwrap()
    }

    #[test]
    fn uses_type_sees_imports_and_attribution() {
        let ctx = ExecutionContext::new();
        let imported = parse(&ctx, &["mockito-core-5"], "import org.mockito.Mock;\nclass A {}\n");
        assert!(UsesType::new("org.mockito.*", false).unwrap().check(&imported, &ctx));

        let qualified = parse(
            &ctx,
            &["mockito-core-5"],
            "class A { Object o = org.mockito.Mockito.mock(Object.class); }\n",
        );
        assert!(UsesType::new("org.mockito.Mockito", false).unwrap().check(&qualified, &ctx));

        let wildcard = parse(&ctx, &["mockito-core-5"], "import org.mockito.*;\nclass A {}\n");
        assert!(UsesType::new("org.mockito.*", false).unwrap().check(&wildcard, &ctx));

        let none = parse(&ctx, &["mockito-core-5"], "class A { String s; }\n");
        assert!(!UsesType::new("org.mockito.*", false).unwrap().check(&none, &ctx));
    }

    #[test]
    fn uses_type_with_subtypes() {
        let ctx = ExecutionContext::new();
        let cu = parse(&ctx, &[], "class A { StringBuilder b; }\n");
        assert!(!UsesType::new("java.lang.CharSequence", false).unwrap().check(&cu, &ctx));
        assert!(UsesType::new("java.lang.CharSequence", true).unwrap().check(&cu, &ctx));
    }

    #[test]
    fn uses_method_requires_attribution() {
        let ctx = ExecutionContext::new();
        let source = "import static org.junit.jupiter.api.Assertions.assertEquals;\nclass A { void t() { assertEquals(1, 2); } }\n";
        let cu = parse(&ctx, &["junit-jupiter-api-5.9"], source);
        let uses = UsesMethod::new("org.junit.jupiter.api.Assertions assertEquals(..)").unwrap();
        assert!(uses.check(&cu, &ctx));

        let unattributed = parse(&ctx, &[], source);
        assert!(!uses.check(&unattributed, &ctx));
    }

    #[test]
    fn missing_types_lists_unresolved_calls() {
        let ctx = ExecutionContext::new();
        let cu = parse(
            &ctx,
            &["mockito-core-5"],
            "import static org.mockito.Mockito.*;\nclass A { void t() { when(x); String s = \"a\".trim(); } }\n",
        );
        let missing = find_missing_types(&cu, &ctx);
        let names: Vec<_> = missing.iter().map(|m| m.simple_name().to_string()).collect();
        assert_eq!(names, vec!["when"]);
    }

    #[test]
    fn annotations_are_found_by_runner() {
        let ctx = ExecutionContext::new();
        let cu = parse(
            &ctx,
            &["junit-4.13"],
            "import org.junit.runner.RunWith;\nimport org.junit.runners.JUnit4;\n@RunWith(JUnit4.class)\nclass A {}\n",
        );
        let junit4 = AnnotationMatcher::new("@org.junit.runner.RunWith(org.junit.runners.JUnit4.class)").unwrap();
        let suite = AnnotationMatcher::new("@org.junit.runner.RunWith(org.junit.runners.Suite.class)").unwrap();
        assert_eq!(find_annotations(&cu, &junit4, &ctx).len(), 1);
        assert!(find_annotations(&cu, &suite, &ctx).is_empty());
    }
}
