#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;

    use crate::context::ExecutionContext;
    use crate::parse::JavaParser;
    use crate::recipe::{RecipeRegistry, RecipeRunner, DEFAULT_CLASSPATH};
    use crate::tree::{CompilationUnit, Expression, MethodInvocation};
    use crate::visitor::{visit, walk_method_invocation, JavaVisitor, VisitCx};

    const EMPTY_STRING: &str = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String s) {
        assertThat(s).isEqualTo("");
    }
}
"#;

    const ASSERT_EQUALS: &str = r#"import org.junit.jupiter.api.Test;

import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    @Test
    void test() {
        String expected = "a";
        String actual = "a";
        assertEquals(expected, actual);
    }
}
"#;

    const ASSERT_EQUALS_MESSAGE: &str = r#"import org.junit.jupiter.api.Test;

import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    @Test
    void test(int n) {
        assertEquals(1, n, "must be one");
    }
}
"#;

    const ASSERT_EQUALS_DELTA: &str = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(double x) {
        assertEquals(1.0, x, 0.01);
    }
}
"#;

    const ASSERT_ARRAY_EQUALS: &str = r#"import static org.junit.jupiter.api.Assertions.assertArrayEquals;

class ATest {
    void test(double[] expected, double[] actual) {
        assertArrayEquals(expected, actual, 0.01, () -> "msg");
    }
}
"#;

    const ASSERT_EQUALS_SUPPLIER: &str = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(int n) {
        assertEquals(1, n, () -> "must be one");
    }
}
"#;

    const ASSERT_EQUALS_DELTA_MESSAGE: &str = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(double x) {
        assertEquals(1.0, x, 0.01, "close enough");
    }
}
"#;

    const RUN_WITH: &str = r#"package org.example;

import org.junit.Test;
import org.junit.runner.RunWith;
import org.junit.runners.JUnit4;

@RunWith(JUnit4.class)
public class ATest {

    @Test
    public void test() {
    }
}
"#;

    const MOCKITO: &str = r#"import org.mockito.ArgumentCaptor;
import org.mockito.InOrder;

import static org.mockito.Mockito.*;

class ATest {
    void test() {
        when(x);
    }
}
"#;

    fn parse(ctx: &ExecutionContext, source: &str) -> Arc<CompilationUnit> {
        JavaParser::builder()
            .classpath_from_resources(ctx, &DEFAULT_CLASSPATH)
            .build()
            .unwrap()
            .parse("src/test/java/org/example/ATest.java", source)
            .unwrap()
    }

    /// Run `recipe` to a fixed point over a single unit.
    fn run_unit(recipe: &str, ctx: &ExecutionContext, source: &str) -> Arc<CompilationUnit> {
        let registry = RecipeRegistry::builtin().unwrap();
        let recipe = registry.build(recipe, ctx).unwrap();
        let run = RecipeRunner::new(vec![recipe]).run(vec![parse(ctx, source)], ctx);
        assert!(run.errors().next().is_none(), "unexpected errors: {:?}", run.results);
        run.results[0].after.clone()
    }

    fn run(recipe: &str, ctx: &ExecutionContext, source: &str) -> String {
        run_unit(recipe, ctx, source).print()
    }

    #[derive(Default)]
    struct Signatures(Vec<(String, Option<String>)>);

    impl JavaVisitor for Signatures {
        fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
            let signature = invocation
                .method_type
                .as_ref()
                .map(|t| format!("{t} -> {}", t.return_type));
            self.0.push((invocation.simple_name().to_string(), signature));
            Expression::MethodInvocation(walk_method_invocation(self, invocation, cx))
        }
    }

    /// Name and resolved signature of every invocation, in source order.
    fn signatures(ctx: &ExecutionContext, cu: &Arc<CompilationUnit>) -> Vec<(String, Option<String>)> {
        let mut collect = Signatures::default();
        visit(&mut collect, cu, &mut VisitCx::for_unit(ctx, "signatures", cu));
        collect.0
    }

    fn junit4_ctx() -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.set_option(
            "testing.junit5.RemoveObsoleteRunners",
            "obsoleteRunners",
            serde_yaml::from_str("[org.junit.runners.JUnit4]").unwrap(),
        );
        ctx
    }

    #[test]
    fn test_empty_string_becomes_is_empty() {
        let ctx = ExecutionContext::new();
        let after = run("testing.assertj.IsEqualToEmptyString", &ctx, EMPTY_STRING);
        assert_eq!(after, EMPTY_STRING.replace(r#"isEqualTo("")"#, "isEmpty()"));
    }

    #[test]
    fn test_assert_equals_two_arguments() {
        let ctx = ExecutionContext::new();
        let expected = r#"import org.junit.jupiter.api.Test;

import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    @Test
    void test() {
        String expected = "a";
        String actual = "a";
        assertThat(actual).isEqualTo(expected);
    }
}
"#;
        assert_eq!(run("testing.assertj.JUnitAssertEqualsToAssertThat", &ctx, ASSERT_EQUALS), expected);
    }

    #[test]
    fn test_assert_equals_with_message() {
        let ctx = ExecutionContext::new();
        let after = run("testing.assertj.JUnitAssertEqualsToAssertThat", &ctx, ASSERT_EQUALS_MESSAGE);
        assert!(after.contains(r#"assertThat(n).as("must be one").isEqualTo(1);"#));
        assert!(after.contains("import static org.assertj.core.api.Assertions.assertThat;"));
        assert!(!after.contains("assertEquals"));
    }

    #[test]
    fn test_assert_equals_with_delta() {
        let ctx = ExecutionContext::new();
        let expected = r#"import static org.assertj.core.api.Assertions.assertThat;
import static org.assertj.core.api.Assertions.within;

class ATest {
    void test(double x) {
        assertThat(x).isCloseTo(1.0, within(0.01));
    }
}
"#;
        assert_eq!(run("testing.assertj.JUnitAssertEqualsToAssertThat", &ctx, ASSERT_EQUALS_DELTA), expected);
    }

    #[test]
    fn test_assert_array_equals_with_delta_and_supplier() {
        let ctx = ExecutionContext::new();
        let after = run("testing.assertj.JUnitAssertArrayEqualsToAssertThat", &ctx, ASSERT_ARRAY_EQUALS);
        assert!(after.contains(r#"assertThat(actual).as(() -> "msg").containsExactly(expected, within(0.01));"#));
        assert!(after.contains("import static org.assertj.core.api.Assertions.within;"));
    }

    #[test]
    fn test_obsolete_runner_removed() {
        let ctx = junit4_ctx();
        let expected = r#"package org.example;

import org.junit.Test;

public class ATest {

    @Test
    public void test() {
    }
}
"#;
        assert_eq!(run("testing.junit5.RemoveObsoleteRunners", &ctx, RUN_WITH), expected);
    }

    #[test]
    fn test_mockito_wildcard_kept_for_unresolved_call() {
        let ctx = ExecutionContext::new();
        let expected = r#"import static org.mockito.Mockito.*;

class ATest {
    void test() {
        when(x);
    }
}
"#;
        assert_eq!(run("testing.mockito.CleanupMockitoImports", &ctx, MOCKITO), expected);
    }

    #[test]
    fn test_composite_chains_conversions() {
        let ctx = ExecutionContext::new();
        let before = r#"import static org.junit.jupiter.api.Assertions.assertEquals;

class ATest {
    void test(String s) {
        assertEquals("", s);
    }
}
"#;
        let expected = r#"import static org.assertj.core.api.Assertions.assertThat;

class ATest {
    void test(String s) {
        assertThat(s).isEmpty();
    }
}
"#;
        assert_eq!(run("testing.assertj.JUnitToAssertj", &ctx, before), expected);
    }

    #[test]
    fn test_untouched_sources_print_identically() {
        let ctx = ExecutionContext::new();
        for source in [
            EMPTY_STRING,
            ASSERT_EQUALS,
            ASSERT_EQUALS_MESSAGE,
            ASSERT_EQUALS_DELTA,
            ASSERT_EQUALS_SUPPLIER,
            ASSERT_EQUALS_DELTA_MESSAGE,
            ASSERT_ARRAY_EQUALS,
            RUN_WITH,
            MOCKITO,
        ] {
            assert_eq!(parse(&ctx, source).print(), source);
        }
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let cases = [
            ("testing.assertj.JUnitToAssertj", EMPTY_STRING),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS_MESSAGE),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS_DELTA),
            ("testing.assertj.JUnitToAssertj", ASSERT_ARRAY_EQUALS),
            ("testing.junit5.RemoveObsoleteRunners", RUN_WITH),
            ("testing.mockito.CleanupMockitoImports", MOCKITO),
        ];
        for (recipe, source) in cases {
            let ctx = junit4_ctx();
            let once = run(recipe, &ctx, source);
            assert_ne!(once, source, "{recipe} did not change its scenario");
            assert_eq!(run(recipe, &ctx, &once), once, "{recipe} is not idempotent");
        }
    }

    #[test]
    fn test_rewritten_invocations_keep_their_types_when_reparsed() {
        let ctx = ExecutionContext::new();
        let cases = [
            ("testing.assertj.IsEqualToEmptyString", EMPTY_STRING, "isEmpty"),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS, "isEqualTo"),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS_MESSAGE, "as"),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS_SUPPLIER, "as"),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS_DELTA, "within"),
            ("testing.assertj.JUnitToAssertj", ASSERT_EQUALS_DELTA_MESSAGE, "isCloseTo"),
            ("testing.assertj.JUnitToAssertj", ASSERT_ARRAY_EQUALS, "containsExactly"),
        ];
        for (recipe, source, expected_call) in cases {
            let rewritten = run_unit(recipe, &ctx, source);
            let printed = rewritten.print();
            assert_ne!(printed, source, "{recipe} did not rewrite:\n{source}");

            let before = signatures(&ctx, &rewritten);
            assert!(before.iter().any(|(name, _)| name == expected_call), "no {expected_call} in:\n{printed}");
            for (name, signature) in &before {
                assert!(signature.is_some(), "{name} is unattributed in:\n{printed}");
            }
            assert_eq!(before, signatures(&ctx, &parse(&ctx, &printed)), "types changed in:\n{printed}");
        }
    }

    #[test]
    fn test_run_reports_cycles_and_changed_units() {
        let ctx = ExecutionContext::new();
        let registry = RecipeRegistry::builtin().unwrap();
        let recipe = registry.build("testing.assertj.JUnitToAssertj", &ctx).unwrap();
        let units = vec![parse(&ctx, ASSERT_EQUALS), parse(&ctx, RUN_WITH)];
        let run = RecipeRunner::new(vec![recipe]).run(units, &ctx);
        assert_eq!(run.changed().count(), 1);
        assert_eq!(run.cycles, 2);
        assert_eq!(run.results[0].recipes, vec!["testing.assertj.JUnitToAssertj"]);
        assert!(!run.results[1].is_changed());
    }
}
