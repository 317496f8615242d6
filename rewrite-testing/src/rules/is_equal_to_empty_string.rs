use std::sync::Arc;

use tracing::debug;

use super::assert_that::ASSERTJ_CLASSPATH;
use crate::error::RecipeError;
use crate::matcher::MethodMatcher;
use crate::precondition::Precondition;
use crate::recipe::{Options, Recipe, RecipeDescriptor};
use crate::search::UsesMethod;
use crate::tree::{Container, Expression, MethodInvocation, MethodType};
use crate::visitor::{walk_method_invocation, JavaVisitor, VisitCx};

const IS_EQUAL_TO: &str = "org.assertj.core.api.AbstractStringAssert isEqualTo(java.lang.String)";

/// `assertThat(s).isEqualTo("")` becomes `assertThat(s).isEmpty()`.
#[derive(Debug)]
pub struct IsEqualToEmptyString {
    descriptor: RecipeDescriptor,
    matcher: MethodMatcher,
    precondition: Precondition,
}

impl IsEqualToEmptyString {
    pub const ID: &'static str = "testing.assertj.IsEqualToEmptyString";

    pub fn descriptor() -> RecipeDescriptor {
        RecipeDescriptor::new(
            Self::ID,
            "Convert `assertThat(String).isEqualTo(\"\")` to `isEmpty()`",
            "Adopt idiomatic AssertJ assertion for empty Strings.",
        )
    }

    pub fn new() -> Result<Self, RecipeError> {
        let matcher = MethodMatcher::new(IS_EQUAL_TO)?;
        Ok(Self {
            descriptor: Self::descriptor(),
            precondition: Precondition::UsesMethod(UsesMethod::from_matcher(matcher.clone())),
            matcher,
        })
    }

    pub(crate) fn from_options(_options: &Options) -> Result<Arc<dyn Recipe>, RecipeError> {
        Ok(Arc::new(Self::new()?))
    }
}

impl Recipe for IsEqualToEmptyString {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn precondition(&self) -> Option<&Precondition> {
        Some(&self.precondition)
    }

    fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
        Some(Box::new(EmptyStringVisitor { matcher: &self.matcher }))
    }
}

struct EmptyStringVisitor<'r> {
    matcher: &'r MethodMatcher,
}

impl JavaVisitor for EmptyStringVisitor<'_> {
    fn is_iso(&self) -> bool {
        true
    }

    fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
        let m = walk_method_invocation(self, invocation, cx);
        let empty_literal = match m.arguments().as_slice() {
            [only] => only.as_literal().is_some_and(|l| l.is_string("")),
            _ => false,
        };
        if !empty_literal || !self.matcher.matches(&m) {
            return Expression::MethodInvocation(m);
        }

        let method_type = m
            .method_type
            .as_ref()
            .map(|t| Arc::new(rebind_is_empty(&m, t, cx)));
        let rewritten = m
            .with_name(Arc::new(m.name.with_name("isEmpty")))
            .with_arguments(Container {
                before: m.arguments.before.clone(),
                ..Container::empty()
            })
            .with_method_type(method_type);
        Expression::MethodInvocation(Arc::new(rewritten))
    }
}

/// `isEmpty()` as the receiver's type declares it, or the matched
/// `isEqualTo` renamed when the receiver's classpath lacks it.
fn rebind_is_empty(m: &MethodInvocation, is_equal_to: &MethodType, cx: &VisitCx) -> MethodType {
    let resolved = m.select.as_ref().and_then(|select| {
        let classpath = cx.ctx().classpath(&[ASSERTJ_CLASSPATH]).ok()?;
        classpath.resolve_method(select.element.ty(), "isEmpty", &[])
    });
    resolved.unwrap_or_else(|| {
        debug!("isEmpty() not found on receiver, renaming isEqualTo");
        is_equal_to.with_name("isEmpty").with_parameter_types(Vec::new())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::rules::testing::rewrite;

    #[test]
    fn empty_string_becomes_is_empty() {
        let ctx = ExecutionContext::new();
        let recipe = IsEqualToEmptyString::new().unwrap();
        let before = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String s) {
        assertThat(s).isEqualTo("");
        assertThat(s)
            .isEqualTo( "" );
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String s) {
        assertThat(s).isEmpty();
        assertThat(s)
            .isEmpty();
    }
}
"#;
        assert_eq!(rewrite(&recipe, &ctx, before), after);
    }

    #[test]
    fn other_arguments_are_left_alone() {
        let ctx = ExecutionContext::new();
        let recipe = IsEqualToEmptyString::new().unwrap();
        let source = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String s, Object o) {
        assertThat(s).isEqualTo("x");
        assertThat(o).isEqualTo("");
    }
}
"#;
        assert_eq!(rewrite(&recipe, &ctx, source), source);
    }

    #[test]
    fn rebinds_method_type() {
        let ctx = ExecutionContext::new();
        let recipe = IsEqualToEmptyString::new().unwrap();
        let cu = crate::rules::testing::parse(
            &ctx,
            "import static org.assertj.core.api.Assertions.assertThat;\nclass ATest { void t(String s) { assertThat(s).isEqualTo(\"\"); } }\n",
        );
        let out = crate::recipe::apply(&recipe, &cu, &ctx).unwrap().unit;
        let found = crate::search::find_method_invocations(
            &out,
            &MethodMatcher::new("org.assertj.core.api.AbstractCharSequenceAssert isEmpty()").unwrap(),
            &ctx,
        );
        assert_eq!(found.len(), 1);
        let method = found[0].method_type.as_ref().unwrap();
        assert!(method.parameter_types.is_empty());
        assert_eq!(method.name, "isEmpty");
        assert_eq!(method.declaring_type.fqn, "org.assertj.core.api.AbstractCharSequenceAssert");
    }
}
