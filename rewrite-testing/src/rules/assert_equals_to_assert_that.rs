use std::sync::Arc;

use super::assert_that::{Conversion, ConvertToAssertThat};
use crate::error::RecipeError;
use crate::precondition::Precondition;
use crate::recipe::{Options, Recipe, RecipeDescriptor};
use crate::visitor::JavaVisitor;

/// `assertEquals(expected, actual[, delta][, message])` becomes an AssertJ
/// `assertThat(actual)` chain ending in `isEqualTo` or `isCloseTo`.
#[derive(Debug)]
pub struct JUnitAssertEqualsToAssertThat {
    descriptor: RecipeDescriptor,
    conversion: Conversion,
}

impl JUnitAssertEqualsToAssertThat {
    pub const ID: &'static str = "testing.assertj.JUnitAssertEqualsToAssertThat";

    pub fn descriptor() -> RecipeDescriptor {
        RecipeDescriptor::new(
            Self::ID,
            "JUnit `assertEquals` to AssertJ",
            "Convert JUnit-style `assertEquals()` to AssertJ's `assertThat().isEqualTo()`.",
        )
    }

    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: Self::descriptor(),
            conversion: Conversion::new("assertEquals", "isEqualTo", "isCloseTo", "#{any()}")?,
        })
    }

    pub(crate) fn from_options(_options: &Options) -> Result<Arc<dyn Recipe>, RecipeError> {
        Ok(Arc::new(Self::new()?))
    }
}

impl Recipe for JUnitAssertEqualsToAssertThat {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn precondition(&self) -> Option<&Precondition> {
        Some(&self.conversion.precondition)
    }

    fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
        Some(Box::new(ConvertToAssertThat {
            conversion: &self.conversion,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecutionContext, Severity};
    use crate::rules::testing::{parse, rewrite};

    fn recipe() -> JUnitAssertEqualsToAssertThat {
        JUnitAssertEqualsToAssertThat::new().unwrap()
    }

    #[test]
    fn two_arguments() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(String expected, String actual) {
        assertEquals(expected, actual);
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String expected, String actual) {
        assertThat(actual).isEqualTo(expected);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn string_message() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(int n) {
        assertEquals(1, n, "must be one");
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(int n) {
        assertThat(n).as("must be one").isEqualTo(1);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn supplier_message() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(int n) {
        assertEquals(1, n, () -> "must be one");
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(int n) {
        assertThat(n).as(() -> "must be one").isEqualTo(1);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn delta_uses_within() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(double x) {
        assertEquals(1.0, x, 0.01);
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;
import static org.assertj.core.api.Assertions.within;

class ATest {
    void test(double x) {
        assertThat(x).isCloseTo(1.0, within(0.01));
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn delta_and_message() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(double x) {
        assertEquals(1.0, x, 0.01, "close enough");
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;
import static org.assertj.core.api.Assertions.within;

class ATest {
    void test(double x) {
        assertThat(x).as("close enough").isCloseTo(1.0, within(0.01));
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn qualified_call_keeps_other_assertions_import() {
        let ctx = ExecutionContext::new();
        let before = r#"import org.junit.jupiter.api.Assertions;

class ATest {
    void test(String s) {
        Assertions.assertEquals("a", s);
        Assertions.assertTrue(s.isEmpty());
    }
}
"#;
        let after = r#"import org.junit.jupiter.api.Assertions;

import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String s) {
        assertThat(s).isEqualTo("a");
        Assertions.assertTrue(s.isEmpty());
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn unattributed_call_is_kept_with_debug_diagnostic() {
        let ctx = ExecutionContext::new();
        let source = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(int n) {
        assertEquals(1, n, unknown());
    }
}
"#;
        let cu = parse(&ctx, source);
        let out = crate::recipe::apply(&recipe(), &cu, &ctx).unwrap().unit;
        assert_eq!(out.print(), source);
        let diagnostics = ctx.take_diagnostics();
        assert!(diagnostics
            .iter()
            .any(|d| d.severity == Severity::Debug && d.recipe == JUnitAssertEqualsToAssertThat::ID));
    }

    #[test]
    fn other_assertions_are_ignored() {
        let ctx = ExecutionContext::new();
        let source = r#"import static org.junit.jupiter.api.Assertions.assertTrue;

class ATest {
    void test(boolean b) {
        assertTrue(b);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, source), source);
    }
}
