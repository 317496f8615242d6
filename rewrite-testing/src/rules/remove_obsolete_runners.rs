use std::sync::Arc;

use tracing::debug;

use crate::error::RecipeError;
use crate::matcher::AnnotationMatcher;
use crate::recipe::{OptionDescriptor, OptionKind, Options, Recipe, RecipeDescriptor};
use crate::tree::{Annotation, ClassDeclaration, Space};
use crate::visitor::{walk_class_declaration, JavaVisitor, VisitCx};

const RUN_WITH: &str = "org.junit.runner.RunWith";
const OBSOLETE_RUNNERS: &str = "obsoleteRunners";

/// Drops `@RunWith(<runner>.class)` from classes for each listed runner.
#[derive(Debug)]
pub struct RemoveObsoleteRunners {
    descriptor: RecipeDescriptor,
    runners: Vec<(String, AnnotationMatcher)>,
}

impl RemoveObsoleteRunners {
    pub const ID: &'static str = "testing.junit5.RemoveObsoleteRunners";

    pub fn descriptor() -> RecipeDescriptor {
        RecipeDescriptor::new(
            Self::ID,
            "Remove JUnit 4 `@RunWith` annotations that do not require an `@ExtendsWith` replacement",
            "Some JUnit 4 `@RunWith` annotations do not require replacement with an equivalent JUnit Jupiter `@ExtendsWith` annotation. This can be used to remove those runners that either do not have a JUnit Jupiter equivalent or do not require a replacement as part of JUnit 4 to 5 migration.",
        )
        .with_option(
            OptionDescriptor::new(OBSOLETE_RUNNERS, "Obsolete Runners", OptionKind::StringList)
                .description("The fully qualified class names of the JUnit 4 runners to be removed.")
                .example("org.junit.runners.JUnit4")
                .required(),
        )
    }

    /// # Arguments
    /// * `runners` - fully qualified runner class names
    pub fn new<I, S>(runners: I) -> Result<Self, RecipeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let runners = runners
            .into_iter()
            .map(|runner| {
                let runner = runner.into();
                let matcher = AnnotationMatcher::new(&format!("@{RUN_WITH}({runner}.class)"))?;
                Ok::<_, RecipeError>((runner, matcher))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            descriptor: Self::descriptor(),
            runners,
        })
    }

    pub(crate) fn from_options(options: &Options) -> Result<Arc<dyn Recipe>, RecipeError> {
        let runners = options
            .string_list(OBSOLETE_RUNNERS)
            .ok_or_else(|| RecipeError::MissingOption {
                recipe: Self::ID.to_string(),
                option: OBSOLETE_RUNNERS.to_string(),
            })?;
        Ok(Arc::new(Self::new(runners)?))
    }

    fn obsolete_runner(&self, annotation: &Annotation) -> Option<&str> {
        self.runners
            .iter()
            .find(|(_, matcher)| matcher.matches(annotation))
            .map(|(runner, _)| runner.as_str())
    }
}

impl Recipe for RemoveObsoleteRunners {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
        Some(Box::new(RemoveRunnersVisitor { recipe: self }))
    }
}

struct RemoveRunnersVisitor<'r> {
    recipe: &'r RemoveObsoleteRunners,
}

impl JavaVisitor for RemoveRunnersVisitor<'_> {
    fn visit_class_declaration(&mut self, class: &Arc<ClassDeclaration>, cx: &mut VisitCx) -> Arc<ClassDeclaration> {
        let class = walk_class_declaration(self, class, cx);

        let mut kept = Vec::with_capacity(class.leading_annotations.len());
        // Whitespace in front of the first removed annotation plus any comments
        // of the ones after it; owed to whatever follows.
        let mut inherited: Option<Space> = None;
        for annotation in &class.leading_annotations {
            if let Some(runner) = self.recipe.obsolete_runner(annotation) {
                debug!(class = %class.name.name, runner, "removing obsolete runner");
                cx.maybe_remove_import(runner);
                inherited = Some(match inherited {
                    Some(space) => space.absorb(&annotation.prefix),
                    None => annotation.prefix.clone(),
                });
                continue;
            }
            match inherited.take() {
                Some(space) => kept.push(Arc::new(annotation.with_prefix(space.absorb(&annotation.prefix)))),
                None => kept.push(annotation.clone()),
            }
        }
        if kept.len() == class.leading_annotations.len() {
            return class;
        }
        cx.maybe_remove_import(RUN_WITH);

        let mut rewritten = class.with_leading_annotations(kept);
        if let Some(space) = inherited {
            match rewritten.modifiers.first_mut() {
                Some(first) => first.prefix = space.absorb(&first.prefix),
                None => rewritten.keyword_prefix = space.absorb(&rewritten.keyword_prefix),
            }
        }
        Arc::new(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::rules::testing::rewrite;

    fn recipe(runners: &[&str]) -> RemoveObsoleteRunners {
        RemoveObsoleteRunners::new(runners.iter().copied()).unwrap()
    }

    #[test]
    fn removes_listed_runner_and_its_imports() {
        let ctx = ExecutionContext::new();
        let before = r#"import org.junit.Test;
import org.junit.runner.RunWith;
import org.junit.runners.JUnit4;

@RunWith(JUnit4.class)
public class ATest {
    @Test
    public void test() {
    }
}
"#;
        let after = r#"import org.junit.Test;

public class ATest {
    @Test
    public void test() {
    }
}
"#;
        assert_eq!(rewrite(&recipe(&["org.junit.runners.JUnit4"]), &ctx, before), after);
    }

    #[test]
    fn next_annotation_takes_over_position() {
        let ctx = ExecutionContext::new();
        let before = r#"import org.junit.runner.RunWith;
import org.junit.runners.JUnit4;

@RunWith(JUnit4.class)
@Deprecated
class ATest {
}
"#;
        let after = r#"@Deprecated
class ATest {
}
"#;
        assert_eq!(rewrite(&recipe(&["org.junit.runners.JUnit4"]), &ctx, before), after);
    }

    #[test]
    fn comment_before_class_keyword_survives() {
        let ctx = ExecutionContext::new();
        let before = "@org.junit.runner.RunWith(org.junit.runners.JUnit4.class)\n/* keep */ final class ATest {\n}\n";
        assert_eq!(
            rewrite(&recipe(&["org.junit.runners.JUnit4"]), &ctx, before),
            "/* keep */ final class ATest {\n}\n"
        );

        let no_modifiers = "@org.junit.runner.RunWith(org.junit.runners.JUnit4.class)\n// keep\nclass ATest {\n}\n";
        assert_eq!(
            rewrite(&recipe(&["org.junit.runners.JUnit4"]), &ctx, no_modifiers),
            "// keep\nclass ATest {\n}\n"
        );
    }

    #[test]
    fn comment_before_next_annotation_survives() {
        let ctx = ExecutionContext::new();
        let before = r#"import org.junit.runner.RunWith;
import org.junit.runners.JUnit4;

/** Docs. */
@RunWith(JUnit4.class)
// keep
@Deprecated
public class ATest {
}
"#;
        let after = r#"/** Docs. */
// keep
@Deprecated
public class ATest {
}
"#;
        assert_eq!(rewrite(&recipe(&["org.junit.runners.JUnit4"]), &ctx, before), after);
    }

    #[test]
    fn unlisted_runner_is_kept() {
        let ctx = ExecutionContext::new();
        let source = r#"import org.junit.runner.RunWith;
import org.junit.runners.Suite;

@RunWith(Suite.class)
public class ATest {
}
"#;
        assert_eq!(rewrite(&recipe(&["org.junit.runners.JUnit4"]), &ctx, source), source);
    }

    #[test]
    fn built_from_options() {
        let registry = crate::recipe::RecipeRegistry::builtin().unwrap();
        let mut ctx = ExecutionContext::new();
        ctx.set_option(
            RemoveObsoleteRunners::ID,
            OBSOLETE_RUNNERS,
            serde_yaml::Value::String("org.junit.runners.JUnit4".into()),
        );
        let recipe = registry.build(RemoveObsoleteRunners::ID, &ctx).unwrap();
        let source = "import org.junit.runner.RunWith;\nimport org.junit.runners.JUnit4;\n\n@RunWith(JUnit4.class)\nclass ATest {}\n";
        assert_eq!(rewrite(recipe.as_ref(), &ctx, source), "class ATest {}\n");
    }
}
