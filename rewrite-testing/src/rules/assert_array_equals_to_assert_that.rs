use std::sync::Arc;

use super::assert_that::{Conversion, ConvertToAssertThat};
use crate::error::RecipeError;
use crate::precondition::Precondition;
use crate::recipe::{Options, Recipe, RecipeDescriptor};
use crate::visitor::JavaVisitor;

/// `assertArrayEquals(expected, actual[, delta][, message])` becomes
/// `assertThat(actual).containsExactly(expected)`, with `within(delta)` for
/// floating point arrays.
#[derive(Debug)]
pub struct JUnitAssertArrayEqualsToAssertThat {
    descriptor: RecipeDescriptor,
    conversion: Conversion,
}

impl JUnitAssertArrayEqualsToAssertThat {
    pub const ID: &'static str = "testing.assertj.JUnitAssertArrayEqualsToAssertThat";

    pub fn descriptor() -> RecipeDescriptor {
        RecipeDescriptor::new(
            Self::ID,
            "JUnit `assertArrayEquals` to AssertJ",
            "Convert JUnit-style `assertArrayEquals()` to AssertJ's `assertThat().containsExactly()`.",
        )
    }

    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: Self::descriptor(),
            conversion: Conversion::new(
                "assertArrayEquals",
                "containsExactly",
                "containsExactly",
                "#{anyArray()}",
            )?,
        })
    }

    pub(crate) fn from_options(_options: &Options) -> Result<Arc<dyn Recipe>, RecipeError> {
        Ok(Arc::new(Self::new()?))
    }
}

impl Recipe for JUnitAssertArrayEqualsToAssertThat {
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

    fn recipe() -> JUnitAssertArrayEqualsToAssertThat {
        JUnitAssertArrayEqualsToAssertThat::new().unwrap()
    }

    #[test]
    fn exact_arrays() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertArrayEquals;

class ATest {
    void test(int[] expected, int[] actual) {
        assertArrayEquals(expected, actual);
        assertArrayEquals(expected, actual, "same ints");
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(int[] expected, int[] actual) {
        assertThat(actual).containsExactly(expected);
        assertThat(actual).as("same ints").containsExactly(expected);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn delta_with_supplier_message() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertArrayEquals;

class ATest {
    void test(double[] expected, double[] actual) {
        assertArrayEquals(expected, actual, 0.01, () -> "msg");
    }
}
"#;
        let after = r#"import static org.assertj.core.api.Assertions.assertThat;
import static org.assertj.core.api.Assertions.within;

class ATest {
    void test(double[] expected, double[] actual) {
        assertThat(actual).as(() -> "msg").containsExactly(expected, within(0.01));
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn non_array_operand_is_a_template_warning() {
        let ctx = ExecutionContext::new();
        let source = r#"import static org.junit.jupiter.api.Assertions.assertArrayEquals;

class ATest {
    void test(double[] actual) {
        assertArrayEquals(null, actual);
    }
}
"#;
        let cu = parse(&ctx, source);
        let out = crate::recipe::apply(&recipe(), &cu, &ctx).unwrap().unit;
        assert_eq!(out.print(), source);
        assert!(ctx
            .take_diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains("assertArrayEquals")));
    }
}
