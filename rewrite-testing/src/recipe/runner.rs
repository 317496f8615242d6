use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, trace};

use super::Recipe;
use crate::context::{Diagnostic, ExecutionContext};
use crate::diff::{unified_diff, DiffStats};
use crate::error::{ParseError, RewriteError};
use crate::imports;
use crate::parse::JavaParser;
use crate::tree::CompilationUnit;
use crate::visitor::{visit, VisitCx};

/// How far one recipe got on one unit.
///
/// The states are ordered: a unit only reaches `ImportsFinalized` after its
/// visitor ran, and `Done` after the queued import edits were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitState {
    /// The precondition rejected the unit.
    Skipped,
    Enabled,
    Visited,
    ImportsFinalized,
    Done,
}

/// The outcome of [`apply`].
#[derive(Debug, Clone)]
pub struct Applied {
    pub unit: Arc<CompilationUnit>,
    pub state: UnitState,
}

impl Applied {
    fn skipped(unit: &Arc<CompilationUnit>) -> Self {
        Self {
            unit: unit.clone(),
            state: UnitState::Skipped,
        }
    }
}

/// Run one recipe (and, for composites, its children in order) on one unit.
///
/// Import edits queued by a visitor are applied once, right after that
/// visitor's traversal, even when the traversal itself changed nothing.
pub fn apply(recipe: &dyn Recipe, cu: &Arc<CompilationUnit>, ctx: &ExecutionContext) -> Result<Applied, RewriteError> {
    if ctx.is_cancelled() {
        return Err(RewriteError::Cancelled);
    }
    if let Some(precondition) = recipe.precondition() {
        if !precondition.check(cu, ctx) {
            trace!(recipe = recipe.id(), path = %cu.source_path.display(), "precondition not met");
            return Ok(Applied::skipped(cu));
        }
    }

    let mut state = UnitState::Enabled;
    let mut unit = cu.clone();
    if let Some(mut visitor) = recipe.visitor() {
        let mut cx = VisitCx::for_unit(ctx, recipe.id(), &unit);
        let visited = visit(visitor.as_mut(), &unit, &mut cx);
        if let Some(fatal) = cx.take_fatal() {
            return Err(fatal);
        }
        if ctx.is_cancelled() {
            return Err(RewriteError::Cancelled);
        }
        advance(recipe, &mut state, UnitState::Visited);

        let requests = cx.take_imports();
        unit = if requests.is_empty() {
            visited
        } else {
            imports::finalize(&visited, &requests, ctx)
        };
        advance(recipe, &mut state, UnitState::ImportsFinalized);
    }

    for child in recipe.recipe_list() {
        unit = apply(child.as_ref(), &unit, ctx)?.unit;
    }
    if state != UnitState::Enabled || !recipe.recipe_list().is_empty() {
        advance(recipe, &mut state, UnitState::Done);
    }
    if !Arc::ptr_eq(&unit, cu) {
        debug!(recipe = recipe.id(), path = %cu.source_path.display(), "changed");
    }
    Ok(Applied { unit, state })
}

fn advance(recipe: &dyn Recipe, state: &mut UnitState, next: UnitState) {
    trace!(recipe = recipe.id(), from = ?*state, to = ?next, "unit state");
    *state = next;
}

/// One source unit after a run.
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub before: Arc<CompilationUnit>,
    pub after: Arc<CompilationUnit>,
    /// Ids of the recipes that changed the unit, in the order they did.
    pub recipes: Vec<String>,
    pub error: Option<RewriteError>,
}

impl UnitResult {
    pub fn source_path(&self) -> &Path {
        &self.before.source_path
    }

    pub fn is_changed(&self) -> bool {
        !Arc::ptr_eq(&self.before, &self.after)
    }

    pub fn diff(&self) -> (String, DiffStats) {
        unified_diff(self.source_path(), &self.before.print(), &self.after.print(), 3)
    }
}

/// Result of [`RecipeRunner::run`].
#[derive(Debug, Clone, Default)]
pub struct RecipeRun {
    pub results: Vec<UnitResult>,
    /// Cycles executed, including the last one that changed nothing.
    pub cycles: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecipeRun {
    pub fn changed(&self) -> impl Iterator<Item = &UnitResult> {
        self.results.iter().filter(|r| r.is_changed())
    }

    pub fn errors(&self) -> impl Iterator<Item = (&Path, &RewriteError)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.source_path(), e)))
    }
}

/// Runs a list of recipes over many units until nothing changes.
#[derive(Debug, Clone)]
pub struct RecipeRunner {
    recipes: Vec<Arc<dyn Recipe>>,
    max_cycles: usize,
}

impl RecipeRunner {
    pub fn new(recipes: Vec<Arc<dyn Recipe>>) -> Self {
        Self { recipes, max_cycles: 3 }
    }

    pub fn max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles.max(1);
        self
    }

    /// Units are processed in parallel; each unit runs the recipe list in
    /// order. A unit whose visitor fails fatally keeps its input tree and
    /// reports the error; other units continue.
    pub fn run(&self, units: Vec<Arc<CompilationUnit>>, ctx: &ExecutionContext) -> RecipeRun {
        let mut results: Vec<UnitResult> = units
            .into_iter()
            .map(|unit| UnitResult {
                before: unit.clone(),
                after: unit,
                recipes: Vec::new(),
                error: None,
            })
            .collect();

        let mut cycles = 0;
        while cycles < self.max_cycles {
            cycles += 1;
            let changed = results
                .par_iter_mut()
                .filter(|r| r.error.is_none())
                .map(|result| self.cycle(result, ctx))
                .filter(|changed| *changed)
                .count();
            debug!(cycle = cycles, changed, "cycle finished");
            if changed == 0 || ctx.is_cancelled() {
                break;
            }
        }

        let mut diagnostics = Vec::new();
        for diagnostic in ctx.take_diagnostics() {
            if !diagnostics.contains(&diagnostic) {
                diagnostics.push(diagnostic);
            }
        }
        let run = RecipeRun {
            results,
            cycles,
            diagnostics,
        };
        info!(
            units = run.results.len(),
            changed = run.changed().count(),
            errors = run.errors().count(),
            cycles,
            "run finished"
        );
        run
    }

    /// One pass of every recipe over one unit; whether anything changed.
    fn cycle(&self, result: &mut UnitResult, ctx: &ExecutionContext) -> bool {
        let start = result.after.clone();
        for recipe in &self.recipes {
            let input = result.after.clone();
            match apply(recipe.as_ref(), &input, ctx) {
                Ok(applied) => {
                    if !Arc::ptr_eq(&applied.unit, &input) {
                        if !result.recipes.iter().any(|r| r == recipe.id()) {
                            result.recipes.push(recipe.id().to_string());
                        }
                        result.after = applied.unit;
                    }
                }
                Err(error) => {
                    result.after = result.before.clone();
                    result.recipes.clear();
                    result.error = Some(error);
                    return false;
                }
            }
        }
        !Arc::ptr_eq(&start, &result.after)
    }
}

/// Parse `(path, text)` pairs in parallel, keeping input order.
pub fn parse_sources(
    parser: &JavaParser,
    sources: &[(PathBuf, String)],
) -> Vec<Result<Arc<CompilationUnit>, ParseError>> {
    sources
        .par_iter()
        .map(|(path, text)| parser.parse(path, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{CompositeRecipe, RecipeDescriptor};
    use crate::tree::{Expression, Identifier, Statement};
    use crate::visitor::{walk_expression, JavaVisitor};

    #[derive(Debug)]
    struct RenameIdentifier {
        descriptor: RecipeDescriptor,
        from: &'static str,
        to: &'static str,
    }

    struct Rename<'r>(&'r RenameIdentifier);

    impl JavaVisitor for Rename<'_> {
        fn visit_identifier(&mut self, identifier: &Arc<Identifier>, _cx: &mut VisitCx) -> Expression {
            if identifier.name == self.0.from {
                return Expression::Identifier(Arc::new(identifier.with_name(self.0.to)));
            }
            Expression::Identifier(identifier.clone())
        }
    }

    impl Recipe for RenameIdentifier {
        fn descriptor(&self) -> &RecipeDescriptor {
            &self.descriptor
        }

        fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
            Some(Box::new(Rename(self)))
        }
    }

    fn rename(from: &'static str, to: &'static str) -> Arc<dyn Recipe> {
        Arc::new(RenameIdentifier {
            descriptor: RecipeDescriptor::new(format!("test.Rename{from}"), "Rename", ""),
            from,
            to,
        })
    }

    #[derive(Debug)]
    struct Breaker(RecipeDescriptor);

    struct BreakStatements;

    impl JavaVisitor for BreakStatements {
        fn is_iso(&self) -> bool {
            true
        }

        fn visit_expression(&mut self, expression: &Expression, cx: &mut VisitCx) -> Expression {
            if let Expression::Identifier(_) = expression {
                return Expression::Literal(Arc::new(crate::tree::Literal {
                    id: crate::tree::Id::next(),
                    prefix: expression.prefix().clone(),
                    value: crate::tree::LiteralValue::Null,
                    source: "null".into(),
                    ty: crate::tree::JavaType::Unknown,
                }));
            }
            walk_expression(self, expression, cx)
        }
    }

    impl Recipe for Breaker {
        fn descriptor(&self) -> &RecipeDescriptor {
            &self.0
        }

        fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
            Some(Box::new(BreakStatements))
        }
    }

    fn units(ctx: &ExecutionContext, sources: &[(&str, &str)]) -> Vec<Arc<CompilationUnit>> {
        let parser = JavaParser::builder().classpath_from_resources(ctx, &["junit-4.13"]).build().unwrap();
        let sources: Vec<(PathBuf, String)> = sources
            .iter()
            .map(|(path, text)| (PathBuf::from(path), text.to_string()))
            .collect();
        parse_sources(&parser, &sources).into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn runs_to_fixed_point() {
        let ctx = ExecutionContext::new();
        let input = units(&ctx, &[("A.java", "class A { int a = b; }\n"), ("B.java", "class B {}\n")]);
        // c -> d only finds work in the second cycle, after b -> c ran.
        let run = RecipeRunner::new(vec![rename("c", "d"), rename("b", "c")]).run(input, &ctx);
        assert_eq!(run.results[0].after.print(), "class A { int a = d; }\n");
        assert!(run.results[0].is_changed());
        assert!(!run.results[1].is_changed());
        assert_eq!(run.cycles, 3);
        assert_eq!(run.results[0].recipes, vec!["test.Renameb", "test.Renamec"]);
    }

    #[test]
    fn max_cycles_bounds_the_run() {
        let ctx = ExecutionContext::new();
        let input = units(&ctx, &[("A.java", "class A { int a = b; }\n")]);
        let run = RecipeRunner::new(vec![rename("c", "d"), rename("b", "c")])
            .max_cycles(1)
            .run(input, &ctx);
        assert_eq!(run.cycles, 1);
        assert_eq!(run.results[0].after.print(), "class A { int a = c; }\n");
    }

    #[test]
    fn fatal_error_keeps_unit_and_continues_others() {
        let ctx = ExecutionContext::new();
        let input = units(
            &ctx,
            &[("A.java", "class A { void t() { int y = x; } }\n"), ("B.java", "class B { int a = b; }\n")],
        );
        let breaker: Arc<dyn Recipe> = Arc::new(Breaker(RecipeDescriptor::new("test.Breaker", "Break", "")));
        let run = RecipeRunner::new(vec![rename("b", "c"), breaker]).run(input, &ctx);
        let errors: Vec<_> = run.errors().collect();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0].1, RewriteError::InvariantViolation { .. }));
        assert!(!run.results[0].is_changed());
        assert!(!run.results[1].is_changed());
    }

    #[test]
    fn composite_runs_children_and_reports_done() {
        let ctx = ExecutionContext::new();
        let input = units(&ctx, &[("A.java", "class A { int a = b; }\n")]);
        let composite = CompositeRecipe::new(
            RecipeDescriptor::new("test.Both", "Both", ""),
            vec![rename("b", "c"), rename("c", "d")],
        );
        let applied = apply(&composite, &input[0], &ctx).unwrap();
        assert_eq!(applied.state, UnitState::Done);
        assert_eq!(applied.unit.print(), "class A { int a = d; }\n");
    }

    #[test]
    fn cancelled_run_reports_cancellation() {
        let ctx = ExecutionContext::new();
        let input = units(&ctx, &[("A.java", "class A { int a = b; }\n")]);
        ctx.cancel();
        let run = RecipeRunner::new(vec![rename("b", "c")]).run(input, &ctx);
        assert!(matches!(run.results[0].error, Some(RewriteError::Cancelled)));
        assert!(!run.results[0].is_changed());
    }

    #[test]
    fn statements_are_untouched_without_match() {
        let ctx = ExecutionContext::new();
        let input = units(&ctx, &[("A.java", "class A { void t() { int a = 1; } }\n")]);
        let applied = apply(rename("zzz", "y").as_ref(), &input[0], &ctx).unwrap();
        assert!(Arc::ptr_eq(&applied.unit, &input[0]));
        assert_eq!(applied.state, UnitState::Done);
        assert!(matches!(
            &applied.unit.classes[0].body.statements[0].element,
            Statement::Method(_)
        ));
    }
}
