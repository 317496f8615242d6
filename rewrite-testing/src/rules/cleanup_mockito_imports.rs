use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::RecipeError;
use crate::precondition::Precondition;
use crate::recipe::{Options, Recipe, RecipeDescriptor};
use crate::search::find_missing_types;
use crate::tree::CompilationUnit;
use crate::visitor::{JavaVisitor, VisitCx};

/// Static methods a `org.mockito.Mockito.*` import may be providing to calls
/// the attributor could not resolve.
const MOCKITO_METHODS: [&str; 26] = [
    "mock",
    "mockingDetails",
    "spy",
    "stub",
    "when",
    "verify",
    "reset",
    "verifyNoMoreInteractions",
    "verifyZeroInteractions",
    "stubVoid",
    "doThrow",
    "doCallRealMethod",
    "doAnswer",
    "doNothing",
    "doReturn",
    "inOrder",
    "ignoreStubs",
    "times",
    "never",
    "atLeastOnce",
    "atLeast",
    "atMost",
    "calls",
    "only",
    "timeout",
    "after",
];

/// Queues removal of every Mockito import; the import manager keeps the ones
/// still referenced. Imports that may feed unresolved calls are left out.
#[derive(Debug)]
pub struct CleanupMockitoImports {
    descriptor: RecipeDescriptor,
    precondition: Precondition,
}

impl CleanupMockitoImports {
    pub const ID: &'static str = "testing.mockito.CleanupMockitoImports";

    pub fn descriptor() -> RecipeDescriptor {
        RecipeDescriptor::new(
            Self::ID,
            "Cleanup Mockito imports",
            "Removes unused `org.mockito` import symbols, unless its possible they are associated with method invocations having null or unknown type information.",
        )
        .with_effort(Duration::from_secs(5 * 60))
    }

    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: Self::descriptor(),
            precondition: Precondition::uses_type("org.mockito.*", false)?,
        })
    }

    pub(crate) fn from_options(_options: &Options) -> Result<Arc<dyn Recipe>, RecipeError> {
        Ok(Arc::new(Self::new()?))
    }
}

impl Recipe for CleanupMockitoImports {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn precondition(&self) -> Option<&Precondition> {
        Some(&self.precondition)
    }

    fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
        Some(Box::new(CleanupVisitor))
    }
}

struct CleanupVisitor;

impl JavaVisitor for CleanupVisitor {
    fn visit_compilation_unit(&mut self, cu: &Arc<CompilationUnit>, cx: &mut VisitCx) -> Arc<CompilationUnit> {
        let missing = find_missing_types(cu, cx.ctx());
        let unresolved: HashSet<&str> = missing.iter().map(|m| m.simple_name()).collect();

        for import in cu.imports.iter().map(|p| &p.element) {
            if !import.package_name().starts_with("org.mockito") {
                continue;
            }
            let Some(type_name) = import.type_name() else {
                cx.maybe_remove_import(&import.name());
                continue;
            };
            match import.member() {
                Some("*") => {
                    if MOCKITO_METHODS.iter().any(|m| unresolved.contains(m)) {
                        debug!(import = %import.name(), "kept for unresolved Mockito calls");
                    } else {
                        cx.maybe_remove_import(&type_name);
                    }
                }
                Some(member) => {
                    if !unresolved.contains(member) {
                        cx.maybe_remove_import(&format!("{type_name}.{member}"));
                    }
                }
                None => cx.maybe_remove_import(&type_name),
            }
        }
        cu.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::rules::testing::{parse, rewrite};

    fn recipe() -> CleanupMockitoImports {
        CleanupMockitoImports::new().unwrap()
    }

    #[test]
    fn wildcard_kept_for_unresolved_call() {
        let ctx = ExecutionContext::new();
        let before = r#"import org.mockito.InOrder;
import org.mockito.Mock;

import static org.mockito.Mockito.*;

class ATest {
    @Mock
    Object service;

    void test() {
        when(x);
    }
}
"#;
        let after = r#"import org.mockito.Mock;

import static org.mockito.Mockito.*;

class ATest {
    @Mock
    Object service;

    void test() {
        when(x);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn unused_static_imports_are_removed() {
        let ctx = ExecutionContext::new();
        let before = r#"import java.util.List;

import static org.mockito.Mockito.mock;
import static org.mockito.Mockito.verify;

class ATest {
    void test() {
        List list = mock(List.class);
    }
}
"#;
        let after = r#"import java.util.List;

import static org.mockito.Mockito.mock;

class ATest {
    void test() {
        List list = mock(List.class);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn unused_package_wildcard_is_removed() {
        let ctx = ExecutionContext::new();
        let before = r#"import java.util.List;
import org.mockito.*;

class ATest {
    List<String> names;
}
"#;
        let after = r#"import java.util.List;

class ATest {
    List<String> names;
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, before), after);
    }

    #[test]
    fn package_wildcard_kept_while_its_types_are_used() {
        let ctx = ExecutionContext::new();
        let source = r#"import org.mockito.*;

class ATest {
    @Mock
    Object service;
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, source), source);
    }

    #[test]
    fn static_member_kept_for_unresolved_call_of_same_name() {
        let ctx = ExecutionContext::new();
        let source = r#"import static org.mockito.Mockito.verify;

class ATest {
    void test() {
        verify(unknown);
    }
}
"#;
        assert_eq!(rewrite(&recipe(), &ctx, source), source);
    }

    #[test]
    fn skipped_without_mockito() {
        let ctx = ExecutionContext::new();
        let cu = parse(&ctx, "import java.util.List;\nclass ATest { List l; }\n");
        let applied = crate::recipe::apply(&recipe(), &cu, &ctx).unwrap();
        assert_eq!(applied.state, crate::recipe::UnitState::Skipped);
        assert!(Arc::ptr_eq(&applied.unit, &cu));
    }
}
