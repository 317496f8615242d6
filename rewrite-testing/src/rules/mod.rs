//! The bundled recipes.

mod assert_array_equals_to_assert_that;
mod assert_equals_to_assert_that;
mod assert_that;
mod cleanup_mockito_imports;
mod is_equal_to_empty_string;
mod remove_obsolete_runners;

pub use assert_array_equals_to_assert_that::JUnitAssertArrayEqualsToAssertThat;
pub use assert_equals_to_assert_that::JUnitAssertEqualsToAssertThat;
pub use cleanup_mockito_imports::CleanupMockitoImports;
pub use is_equal_to_empty_string::IsEqualToEmptyString;
pub use remove_obsolete_runners::RemoveObsoleteRunners;

use crate::recipe::RecipeRegistry;

pub fn register_all(registry: &mut RecipeRegistry) {
    registry.register(IsEqualToEmptyString::descriptor(), IsEqualToEmptyString::from_options);
    registry.register(
        JUnitAssertEqualsToAssertThat::descriptor(),
        JUnitAssertEqualsToAssertThat::from_options,
    );
    registry.register(
        JUnitAssertArrayEqualsToAssertThat::descriptor(),
        JUnitAssertArrayEqualsToAssertThat::from_options,
    );
    registry.register(RemoveObsoleteRunners::descriptor(), RemoveObsoleteRunners::from_options);
    registry.register(CleanupMockitoImports::descriptor(), CleanupMockitoImports::from_options);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::context::ExecutionContext;
    use crate::parse::JavaParser;
    use crate::recipe::{apply, Recipe, DEFAULT_CLASSPATH};
    use crate::tree::CompilationUnit;

    pub fn parse(ctx: &ExecutionContext, source: &str) -> Arc<CompilationUnit> {
        JavaParser::builder()
            .classpath_from_resources(ctx, &DEFAULT_CLASSPATH)
            .build()
            .unwrap()
            .parse("src/test/java/ATest.java", source)
            .unwrap()
    }

    /// Apply `recipe` once and print the result.
    pub fn rewrite(recipe: &dyn Recipe, ctx: &ExecutionContext, source: &str) -> String {
        let cu = parse(ctx, source);
        apply(recipe, &cu, ctx).unwrap().unit.print()
    }
}
