//! Depth-first tree rewriting.
//!
//! A [`JavaVisitor`] overrides the `visit_*` methods for the node kinds it is
//! interested in and calls the matching `walk_*` function to continue into
//! the children. Walkers rebuild a node only when one of its children came
//! back as a different `Arc`, so an unchanged subtree keeps its identity and
//! its exact formatting.
//!
//! # Example
//!
//! ```ignore
//! struct Rename;
//!
//! impl JavaVisitor for Rename {
//!     fn visit_method_invocation(&mut self, m: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
//!         let m = walk_method_invocation(self, m, cx);
//!         // inspect or replace `m`
//!         Expression::MethodInvocation(m)
//!     }
//! }
//! ```

mod cursor;

pub use cursor::Cursor;

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::context::{Diagnostic, ExecutionContext, Severity};
use crate::error::RewriteError;
use crate::imports::ImportRequests;
use crate::tree::*;

/// Per-unit state handed to every visit: the execution context, the cursor,
/// queued import edits and the fatal-error slot.
pub struct VisitCx<'a> {
    ctx: &'a ExecutionContext,
    cursor: Cursor,
    imports: ImportRequests,
    recipe: String,
    unit: Option<Arc<CompilationUnit>>,
    fatal: Option<RewriteError>,
}

impl<'a> VisitCx<'a> {
    pub fn new(ctx: &'a ExecutionContext, recipe: impl Into<String>) -> Self {
        Self {
            ctx,
            cursor: Cursor::default(),
            imports: ImportRequests::default(),
            recipe: recipe.into(),
            unit: None,
            fatal: None,
        }
    }

    /// Context for visiting `unit`; diagnostics get its path and byte ranges.
    pub fn for_unit(ctx: &'a ExecutionContext, recipe: impl Into<String>, unit: &Arc<CompilationUnit>) -> Self {
        Self {
            unit: Some(unit.clone()),
            ..Self::new(ctx, recipe)
        }
    }

    pub fn ctx(&self) -> &'a ExecutionContext {
        self.ctx
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn recipe(&self) -> &str {
        &self.recipe
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.unit.as_ref().map(|u| u.source_path.as_path())
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }

    /// Queue an import of `type_name`, or of its static `member`.
    pub fn maybe_add_import(&mut self, type_name: &str, member: Option<&str>, only_if_referenced: bool) {
        self.imports.add(type_name, member, only_if_referenced);
    }

    /// Queue removal of the import of a type (`a.B`) or static member
    /// (`a.B.m`), applied only if nothing references it anymore.
    pub fn maybe_remove_import(&mut self, name: &str) {
        self.imports.remove(name);
    }

    pub fn imports(&self) -> &ImportRequests {
        &self.imports
    }

    pub(crate) fn take_imports(&mut self) -> ImportRequests {
        std::mem::take(&mut self.imports)
    }

    /// Record a diagnostic about the node `at` (if any) in the current unit.
    pub fn report(&self, severity: Severity, message: impl Into<String>, at: Option<Id>) {
        let range = match (&self.unit, at) {
            (Some(unit), Some(id)) => locate(unit, id),
            _ => None,
        };
        self.ctx.report(Diagnostic {
            severity,
            recipe: self.recipe.clone(),
            message: message.into(),
            source_path: self.source_path().map(Path::to_path_buf),
            range,
        });
    }

    /// Abort the visit of this unit. Only the first failure is kept.
    pub fn fail(&mut self, error: RewriteError) {
        warn!(recipe = %self.recipe, "{error}");
        self.fatal.get_or_insert(error);
    }

    pub fn failed(&self) -> bool {
        self.fatal.is_some()
    }

    pub(crate) fn take_fatal(&mut self) -> Option<RewriteError> {
        self.fatal.take()
    }

    fn halted(&self) -> bool {
        self.fatal.is_some() || self.ctx.is_cancelled()
    }
}

/// Per-kind hooks. Every default delegates to the matching `walk_*`
/// function, which plays the role of a `super` call.
pub trait JavaVisitor {
    /// Iso visitors promise to return each expression and statement as the
    /// same kind; a kind change is a fatal error for the unit.
    fn is_iso(&self) -> bool {
        false
    }

    fn visit_compilation_unit(&mut self, cu: &Arc<CompilationUnit>, cx: &mut VisitCx) -> Arc<CompilationUnit> {
        walk_compilation_unit(self, cu, cx)
    }

    fn visit_import(&mut self, import: &Arc<Import>, _cx: &mut VisitCx) -> Arc<Import> {
        import.clone()
    }

    fn visit_class_declaration(&mut self, class: &Arc<ClassDeclaration>, cx: &mut VisitCx) -> Arc<ClassDeclaration> {
        walk_class_declaration(self, class, cx)
    }

    fn visit_annotation(&mut self, annotation: &Arc<Annotation>, cx: &mut VisitCx) -> Arc<Annotation> {
        walk_annotation(self, annotation, cx)
    }

    fn visit_method_declaration(
        &mut self,
        method: &Arc<MethodDeclaration>,
        cx: &mut VisitCx,
    ) -> Arc<MethodDeclaration> {
        walk_method_declaration(self, method, cx)
    }

    fn visit_variable_declarations(
        &mut self,
        decls: &Arc<VariableDeclarations>,
        cx: &mut VisitCx,
    ) -> Arc<VariableDeclarations> {
        walk_variable_declarations(self, decls, cx)
    }

    fn visit_block(&mut self, block: &Arc<Block>, cx: &mut VisitCx) -> Arc<Block> {
        walk_block(self, block, cx)
    }

    fn visit_statement(&mut self, statement: &Statement, cx: &mut VisitCx) -> Statement {
        walk_statement(self, statement, cx)
    }

    fn visit_expression(&mut self, expression: &Expression, cx: &mut VisitCx) -> Expression {
        walk_expression(self, expression, cx)
    }

    fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
        Expression::MethodInvocation(walk_method_invocation(self, invocation, cx))
    }

    fn visit_identifier(&mut self, identifier: &Arc<Identifier>, _cx: &mut VisitCx) -> Expression {
        Expression::Identifier(identifier.clone())
    }

    fn visit_literal(&mut self, literal: &Arc<Literal>, _cx: &mut VisitCx) -> Expression {
        Expression::Literal(literal.clone())
    }

    fn visit_field_access(&mut self, field_access: &Arc<FieldAccess>, cx: &mut VisitCx) -> Expression {
        Expression::FieldAccess(walk_field_access(self, field_access, cx))
    }

    fn visit_new_class(&mut self, new_class: &Arc<NewClass>, cx: &mut VisitCx) -> Expression {
        Expression::NewClass(walk_new_class(self, new_class, cx))
    }

    fn visit_lambda(&mut self, lambda: &Arc<Lambda>, cx: &mut VisitCx) -> Expression {
        Expression::Lambda(walk_lambda(self, lambda, cx))
    }

    fn visit_type_tree(&mut self, tree: &TypeTree, cx: &mut VisitCx) -> TypeTree {
        walk_type_tree(self, tree, cx)
    }
}

/// Visit a whole compilation unit.
pub fn visit<V: JavaVisitor + ?Sized>(
    visitor: &mut V,
    cu: &Arc<CompilationUnit>,
    cx: &mut VisitCx,
) -> Arc<CompilationUnit> {
    enter(cx, Tree::CompilationUnit(cu.clone()), cu, |cx| visitor.visit_compilation_unit(cu, cx))
}

// ---------------------------------------------------------------------------
// Identity tracking
// ---------------------------------------------------------------------------

/// Identity comparison used to decide whether a parent must be rebuilt.
pub trait SameNode {
    fn same(&self, other: &Self) -> bool;
}

impl<T> SameNode for Arc<T> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl SameNode for Expression {
    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl SameNode for Statement {
    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl SameNode for TypeTree {
    fn same(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: SameNode> SameNode for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

#[derive(Default)]
struct Rebuild {
    changed: bool,
}

impl Rebuild {
    fn node<T: SameNode>(&mut self, before: &T, after: T) -> T {
        if !before.same(&after) {
            self.changed = true;
        }
        after
    }

    fn padded<T: SameNode>(&mut self, before: &Padded<T>, f: impl FnOnce(&T) -> T) -> Padded<T> {
        let element = f(&before.element);
        Padded {
            element: self.node(&before.element, element),
            after: before.after.clone(),
        }
    }

    fn left<T: SameNode>(&mut self, before: &LeftPadded<T>, f: impl FnOnce(&T) -> T) -> LeftPadded<T> {
        let element = f(&before.element);
        LeftPadded {
            before: before.before.clone(),
            element: self.node(&before.element, element),
        }
    }

    fn option<T: SameNode>(&mut self, before: &Option<T>, f: impl FnOnce(&T) -> T) -> Option<T> {
        let after = before.as_ref().map(f);
        match (before, after) {
            (Some(b), Some(a)) => Some(self.node(b, a)),
            _ => None,
        }
    }

    fn list<T: SameNode>(&mut self, before: &[T], mut f: impl FnMut(&T) -> T) -> Vec<T> {
        before
            .iter()
            .map(|b| {
                let a = f(b);
                self.node(b, a)
            })
            .collect()
    }

    fn container<T: SameNode>(&mut self, before: &Container<T>, mut f: impl FnMut(&T) -> T) -> Container<T> {
        let elements = before.elements.iter().map(|p| self.padded(p, &mut f)).collect();
        Container {
            before: before.before.clone(),
            elements,
            end: before.end.clone(),
        }
    }
}

fn rebuilt<T: Clone>(original: &Arc<T>, changed: bool, f: impl FnOnce(&mut T)) -> Arc<T> {
    if !changed {
        return original.clone();
    }
    let mut copy = (**original).clone();
    f(&mut copy);
    Arc::new(copy)
}

// ---------------------------------------------------------------------------
// Entry helpers: cursor, cancellation and iso checks
// ---------------------------------------------------------------------------

fn enter<R: Clone>(cx: &mut VisitCx, tree: Tree, original: &R, f: impl FnOnce(&mut VisitCx) -> R) -> R {
    if cx.halted() {
        return original.clone();
    }
    cx.cursor.push(tree);
    let result = f(cx);
    cx.cursor.pop();
    result
}

pub(crate) fn expression<V: JavaVisitor + ?Sized>(v: &mut V, e: &Expression, cx: &mut VisitCx) -> Expression {
    enter(cx, Tree::Expression(e.clone()), e, |cx| {
        let result = v.visit_expression(e, cx);
        if v.is_iso() && result.kind() != e.kind() {
            let violation = RewriteError::InvariantViolation {
                recipe: cx.recipe.clone(),
                expected: e.kind(),
                actual: result.kind(),
            };
            cx.fail(violation);
            return e.clone();
        }
        result
    })
}

pub(crate) fn statement<V: JavaVisitor + ?Sized>(v: &mut V, s: &Statement, cx: &mut VisitCx) -> Statement {
    enter(cx, Tree::Statement(s.clone()), s, |cx| {
        let result = v.visit_statement(s, cx);
        if v.is_iso() && result.kind() != s.kind() {
            let violation = RewriteError::InvariantViolation {
                recipe: cx.recipe.clone(),
                expected: s.kind(),
                actual: result.kind(),
            };
            cx.fail(violation);
            return s.clone();
        }
        result
    })
}

fn type_tree<V: JavaVisitor + ?Sized>(v: &mut V, t: &TypeTree, cx: &mut VisitCx) -> TypeTree {
    enter(cx, Tree::TypeTree(t.clone()), t, |cx| v.visit_type_tree(t, cx))
}

fn block<V: JavaVisitor + ?Sized>(v: &mut V, b: &Arc<Block>, cx: &mut VisitCx) -> Arc<Block> {
    enter(cx, Tree::Block(b.clone()), b, |cx| v.visit_block(b, cx))
}

pub(crate) fn annotation<V: JavaVisitor + ?Sized>(v: &mut V, a: &Arc<Annotation>, cx: &mut VisitCx) -> Arc<Annotation> {
    enter(cx, Tree::Annotation(a.clone()), a, |cx| v.visit_annotation(a, cx))
}

fn variables<V: JavaVisitor + ?Sized>(
    v: &mut V,
    d: &Arc<VariableDeclarations>,
    cx: &mut VisitCx,
) -> Arc<VariableDeclarations> {
    enter(cx, Tree::VariableDeclarations(d.clone()), d, |cx| v.visit_variable_declarations(d, cx))
}

// ---------------------------------------------------------------------------
// Walkers
// ---------------------------------------------------------------------------

pub fn walk_compilation_unit<V: JavaVisitor + ?Sized>(
    v: &mut V,
    cu: &Arc<CompilationUnit>,
    cx: &mut VisitCx,
) -> Arc<CompilationUnit> {
    let mut r = Rebuild::default();
    let imports = r.list(&cu.imports, |p| {
        let import = enter(cx, Tree::Import(p.element.clone()), &p.element, |cx| v.visit_import(&p.element, cx));
        if Arc::ptr_eq(&import, &p.element) {
            p.clone()
        } else {
            p.with_element(import)
        }
    });
    let classes = r.list(&cu.classes, |c| {
        enter(cx, Tree::Class(c.clone()), c, |cx| v.visit_class_declaration(c, cx))
    });
    rebuilt(cu, r.changed, |n| {
        n.imports = imports;
        n.classes = classes;
    })
}

impl<T> SameNode for Padded<Arc<T>> {
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.element, &other.element) && self.after == other.after
    }
}

pub fn walk_class_declaration<V: JavaVisitor + ?Sized>(
    v: &mut V,
    class: &Arc<ClassDeclaration>,
    cx: &mut VisitCx,
) -> Arc<ClassDeclaration> {
    let mut r = Rebuild::default();
    let annotations = r.list(&class.leading_annotations, |a| annotation(v, a, cx));
    let extends = r.option(&class.extends, |e| {
        let mut inner = Rebuild::default();
        let out = inner.left(e, |t| type_tree(v, t, cx));
        if inner.changed {
            out
        } else {
            e.clone()
        }
    });
    let implements = class.implements.as_ref().map(|c| r.container(c, |t| type_tree(v, t, cx)));
    let body = r.node(&class.body, block(v, &class.body, cx));
    rebuilt(class, r.changed, |n| {
        n.leading_annotations = annotations;
        n.extends = extends;
        n.implements = implements;
        n.body = body;
    })
}

impl<T: SameNode> SameNode for LeftPadded<T> {
    fn same(&self, other: &Self) -> bool {
        self.element.same(&other.element) && self.before == other.before
    }
}

pub fn walk_annotation<V: JavaVisitor + ?Sized>(
    v: &mut V,
    annotation: &Arc<Annotation>,
    cx: &mut VisitCx,
) -> Arc<Annotation> {
    let mut r = Rebuild::default();
    let annotation_type = r.node(&annotation.annotation_type, expression(v, &annotation.annotation_type, cx));
    let arguments = annotation
        .arguments
        .as_ref()
        .map(|a| r.container(a, |e| expression(v, e, cx)));
    rebuilt(annotation, r.changed, |n| {
        n.annotation_type = annotation_type;
        n.arguments = arguments;
    })
}

pub fn walk_method_declaration<V: JavaVisitor + ?Sized>(
    v: &mut V,
    method: &Arc<MethodDeclaration>,
    cx: &mut VisitCx,
) -> Arc<MethodDeclaration> {
    let mut r = Rebuild::default();
    let annotations = r.list(&method.leading_annotations, |a| annotation(v, a, cx));
    let return_type = r.option(&method.return_type, |t| type_tree(v, t, cx));
    let parameters = r.container(&method.parameters, |p| variables(v, p, cx));
    let throws = method.throws.as_ref().map(|t| r.container(t, |t| type_tree(v, t, cx)));
    let body = r.option(&method.body, |b| block(v, b, cx));
    rebuilt(method, r.changed, |n| {
        n.leading_annotations = annotations;
        n.return_type = return_type;
        n.parameters = parameters;
        n.throws = throws;
        n.body = body;
    })
}

pub fn walk_variable_declarations<V: JavaVisitor + ?Sized>(
    v: &mut V,
    decls: &Arc<VariableDeclarations>,
    cx: &mut VisitCx,
) -> Arc<VariableDeclarations> {
    let mut r = Rebuild::default();
    let annotations = r.list(&decls.leading_annotations, |a| annotation(v, a, cx));
    let type_expr = r.option(&decls.type_expr, |t| type_tree(v, t, cx));
    let variables = r.list(&decls.variables, |p| {
        let var = &p.element;
        let mut inner = Rebuild::default();
        let initializer = var
            .initializer
            .as_ref()
            .map(|i| inner.left(i, |e| expression(v, e, cx)));
        if inner.changed {
            p.with_element(Arc::new(NamedVariable {
                initializer,
                ..(**var).clone()
            }))
        } else {
            p.clone()
        }
    });
    rebuilt(decls, r.changed, |n| {
        n.leading_annotations = annotations;
        n.type_expr = type_expr;
        n.variables = variables;
    })
}

pub fn walk_block<V: JavaVisitor + ?Sized>(v: &mut V, b: &Arc<Block>, cx: &mut VisitCx) -> Arc<Block> {
    let mut r = Rebuild::default();
    let statements = r.list(&b.statements, |p| {
        let out = statement(v, &p.element, cx);
        if out.ptr_eq(&p.element) {
            p.clone()
        } else {
            p.with_element(out)
        }
    });
    rebuilt(b, r.changed, |n| n.statements = statements)
}

impl SameNode for Padded<Statement> {
    fn same(&self, other: &Self) -> bool {
        self.element.ptr_eq(&other.element) && self.after == other.after
    }
}

/// Dispatch a statement to its typed hook, or walk its children.
pub fn walk_statement<V: JavaVisitor + ?Sized>(v: &mut V, s: &Statement, cx: &mut VisitCx) -> Statement {
    let mut r = Rebuild::default();
    match s {
        Statement::Expression(e) => Statement::Expression(r.node(e, expression(v, e, cx))),
        Statement::VariableDeclarations(d) => Statement::VariableDeclarations(v.visit_variable_declarations(d, cx)),
        Statement::Block(b) => Statement::Block(v.visit_block(b, cx)),
        Statement::Class(c) => Statement::Class(v.visit_class_declaration(c, cx)),
        Statement::Method(m) => Statement::Method(v.visit_method_declaration(m, cx)),
        Statement::Return(n) => {
            let e = r.option(&n.expression, |e| expression(v, e, cx));
            Statement::Return(rebuilt(n, r.changed, |n| n.expression = e))
        }
        Statement::Throw(n) => {
            let e = r.node(&n.exception, expression(v, &n.exception, cx));
            Statement::Throw(rebuilt(n, r.changed, |n| n.exception = e))
        }
        Statement::If(n) => {
            let condition = r.padded(&n.condition.tree, |e| expression(v, e, cx));
            let then_part = r.padded(&n.then_part, |s| statement(v, s, cx));
            let else_part = n.else_part.as_ref().map(|e| Else {
                body: r.padded(&e.body, |s| statement(v, s, cx)),
                ..e.clone()
            });
            Statement::If(rebuilt(n, r.changed, |n| {
                n.condition.tree = condition;
                n.then_part = then_part;
                n.else_part = else_part;
            }))
        }
        Statement::While(n) => {
            let condition = r.padded(&n.condition.tree, |e| expression(v, e, cx));
            let body = r.padded(&n.body, |s| statement(v, s, cx));
            Statement::While(rebuilt(n, r.changed, |n| {
                n.condition.tree = condition;
                n.body = body;
            }))
        }
        Statement::For(n) => {
            let init = r.padded(&n.control.init, |s| s.as_ref().map(|s| statement(v, s, cx)));
            let condition = r.padded(&n.control.condition, |e| e.as_ref().map(|e| expression(v, e, cx)));
            let update = r.list(&n.control.update, |p| p.with_element(expression(v, &p.element, cx)));
            let body = r.padded(&n.body, |s| statement(v, s, cx));
            Statement::For(rebuilt(n, r.changed, |n| {
                n.control.init = init;
                n.control.condition = condition;
                n.control.update = update;
                n.body = body;
            }))
        }
        Statement::ForEach(n) => {
            let variable = r.padded(&n.control.variable, |d| variables(v, d, cx));
            let iterable = r.padded(&n.control.iterable, |e| expression(v, e, cx));
            let body = r.padded(&n.body, |s| statement(v, s, cx));
            Statement::ForEach(rebuilt(n, r.changed, |n| {
                n.control.variable = variable;
                n.control.iterable = iterable;
                n.body = body;
            }))
        }
        Statement::Try(n) => {
            let resources = n.resources.as_ref().map(|res| TryResources {
                resources: r.list(&res.resources, |p| p.with_element(statement(v, &p.element, cx))),
                ..res.clone()
            });
            let body = r.node(&n.body, block(v, &n.body, cx));
            let catches = n
                .catches
                .iter()
                .map(|c| Catch {
                    parameter: r.padded(&c.parameter, |d| variables(v, d, cx)),
                    body: r.node(&c.body, block(v, &c.body, cx)),
                    ..c.clone()
                })
                .collect();
            let finally = n.finally.as_ref().map(|f| r.left(f, |b| block(v, b, cx)));
            Statement::Try(rebuilt(n, r.changed, |n| {
                n.resources = resources;
                n.body = body;
                n.catches = catches;
                n.finally = finally;
            }))
        }
        Statement::DoWhile(n) => {
            let body = r.padded(&n.body, |s| statement(v, s, cx));
            let condition = r.padded(&n.condition.tree, |e| expression(v, e, cx));
            Statement::DoWhile(rebuilt(n, r.changed, |n| {
                n.body = body;
                n.condition.tree = condition;
            }))
        }
        Statement::Switch(n) => {
            let selector = r.padded(&n.selector.tree, |e| expression(v, e, cx));
            let cases = r.list(&n.cases, |c| case(v, c, cx));
            Statement::Switch(rebuilt(n, r.changed, |n| {
                n.selector.tree = selector;
                n.cases = cases;
            }))
        }
        Statement::Empty(_) | Statement::Break(_) | Statement::Continue(_) => s.clone(),
    }
}

fn case<V: JavaVisitor + ?Sized>(v: &mut V, c: &Arc<Case>, cx: &mut VisitCx) -> Arc<Case> {
    let mut r = Rebuild::default();
    let labels = r.list(&c.labels, |p| p.with_element(expression(v, &p.element, cx)));
    let body = match &c.body {
        CaseBody::Statements(statements) => {
            CaseBody::Statements(r.list(statements, |p| p.with_element(statement(v, &p.element, cx))))
        }
        CaseBody::Rule(body) => CaseBody::Rule(r.padded(body, |s| statement(v, s, cx))),
    };
    rebuilt(c, r.changed, |n| {
        n.labels = labels;
        n.body = body;
    })
}

impl SameNode for Padded<Expression> {
    fn same(&self, other: &Self) -> bool {
        self.element.ptr_eq(&other.element) && self.after == other.after
    }
}

/// Dispatch an expression to its typed hook, or walk its children.
pub fn walk_expression<V: JavaVisitor + ?Sized>(v: &mut V, e: &Expression, cx: &mut VisitCx) -> Expression {
    let mut r = Rebuild::default();
    match e {
        Expression::MethodInvocation(m) => v.visit_method_invocation(m, cx),
        Expression::Identifier(id) => v.visit_identifier(id, cx),
        Expression::Literal(l) => v.visit_literal(l, cx),
        Expression::FieldAccess(fa) => v.visit_field_access(fa, cx),
        Expression::NewClass(n) => v.visit_new_class(n, cx),
        Expression::Lambda(l) => v.visit_lambda(l, cx),
        Expression::NewArray(n) => {
            let element_type = r.option(&n.element_type, |t| type_tree(v, t, cx));
            let dimensions = n
                .dimensions
                .iter()
                .map(|d| ArrayDimension {
                    index: r.padded(&d.index, |i| i.as_ref().map(|i| expression(v, i, cx))),
                    prefix: d.prefix.clone(),
                })
                .collect();
            let initializer = n.initializer.as_ref().map(|i| r.container(i, |e| expression(v, e, cx)));
            Expression::NewArray(rebuilt(n, r.changed, |n| {
                n.element_type = element_type;
                n.dimensions = dimensions;
                n.initializer = initializer;
            }))
        }
        Expression::MemberReference(n) => {
            let containing = r.node(&n.containing, expression(v, &n.containing, cx));
            Expression::MemberReference(rebuilt(n, r.changed, |n| n.containing = containing))
        }
        Expression::Binary(n) => {
            let left = r.node(&n.left, expression(v, &n.left, cx));
            let right = r.node(&n.right, expression(v, &n.right, cx));
            Expression::Binary(rebuilt(n, r.changed, |n| {
                n.left = left;
                n.right = right;
            }))
        }
        Expression::Unary(n) => {
            let operand = r.node(&n.expression, expression(v, &n.expression, cx));
            Expression::Unary(rebuilt(n, r.changed, |n| n.expression = operand))
        }
        Expression::Assignment(n) => {
            let variable = r.node(&n.variable, expression(v, &n.variable, cx));
            let value = r.node(&n.value, expression(v, &n.value, cx));
            Expression::Assignment(rebuilt(n, r.changed, |n| {
                n.variable = variable;
                n.value = value;
            }))
        }
        Expression::Ternary(n) => {
            let condition = r.node(&n.condition, expression(v, &n.condition, cx));
            let true_part = r.left(&n.true_part, |e| expression(v, e, cx));
            let false_part = r.left(&n.false_part, |e| expression(v, e, cx));
            Expression::Ternary(rebuilt(n, r.changed, |n| {
                n.condition = condition;
                n.true_part = true_part;
                n.false_part = false_part;
            }))
        }
        Expression::Parentheses(n) => {
            let tree = r.padded(&n.tree, |e| expression(v, e, cx));
            Expression::Parentheses(rebuilt(n, r.changed, |n| n.tree = tree))
        }
        Expression::ArrayAccess(n) => {
            let indexed = r.node(&n.indexed, expression(v, &n.indexed, cx));
            let index = r.padded(&n.dimension.index, |i| i.as_ref().map(|i| expression(v, i, cx)));
            Expression::ArrayAccess(rebuilt(n, r.changed, |n| {
                n.indexed = indexed;
                n.dimension.index = index;
            }))
        }
        Expression::TypeCast(n) => {
            let clazz = r.padded(&n.clazz, |t| type_tree(v, t, cx));
            let operand = r.node(&n.expression, expression(v, &n.expression, cx));
            Expression::TypeCast(rebuilt(n, r.changed, |n| {
                n.clazz = clazz;
                n.expression = operand;
            }))
        }
    }
}

pub fn walk_method_invocation<V: JavaVisitor + ?Sized>(
    v: &mut V,
    m: &Arc<MethodInvocation>,
    cx: &mut VisitCx,
) -> Arc<MethodInvocation> {
    let mut r = Rebuild::default();
    let select = m.select.as_ref().map(|s| r.padded(s, |e| expression(v, e, cx)));
    let arguments = r.container(&m.arguments, |e| expression(v, e, cx));
    rebuilt(m, r.changed, |n| {
        n.select = select;
        n.arguments = arguments;
    })
}

pub fn walk_field_access<V: JavaVisitor + ?Sized>(
    v: &mut V,
    fa: &Arc<FieldAccess>,
    cx: &mut VisitCx,
) -> Arc<FieldAccess> {
    let mut r = Rebuild::default();
    let target = r.node(&fa.target, expression(v, &fa.target, cx));
    rebuilt(fa, r.changed, |n| n.target = target)
}

pub fn walk_new_class<V: JavaVisitor + ?Sized>(v: &mut V, n: &Arc<NewClass>, cx: &mut VisitCx) -> Arc<NewClass> {
    let mut r = Rebuild::default();
    let clazz = r.node(&n.clazz, type_tree(v, &n.clazz, cx));
    let arguments = r.container(&n.arguments, |e| expression(v, e, cx));
    let body = r.option(&n.body, |b| block(v, b, cx));
    rebuilt(n, r.changed, |n| {
        n.clazz = clazz;
        n.arguments = arguments;
        n.body = body;
    })
}

pub fn walk_lambda<V: JavaVisitor + ?Sized>(v: &mut V, l: &Arc<Lambda>, cx: &mut VisitCx) -> Arc<Lambda> {
    let mut r = Rebuild::default();
    let parameters = r.container(&l.parameters, |p| variables(v, p, cx));
    let body = match &l.body {
        LambdaBody::Expression(e) => LambdaBody::Expression(r.node(e, expression(v, e, cx))),
        LambdaBody::Block(b) => LambdaBody::Block(r.node(b, block(v, b, cx))),
    };
    rebuilt(l, r.changed, |n| {
        n.parameters = parameters;
        n.body = body;
    })
}

pub fn walk_type_tree<V: JavaVisitor + ?Sized>(v: &mut V, t: &TypeTree, cx: &mut VisitCx) -> TypeTree {
    let mut r = Rebuild::default();
    match t {
        TypeTree::Primitive(_) => t.clone(),
        TypeTree::Named(e) => TypeTree::Named(r.node(e, expression(v, e, cx))),
        TypeTree::Parameterized(n) => {
            let clazz = r.node(&n.clazz, expression(v, &n.clazz, cx));
            let arguments = r.container(&n.type_arguments, |a| type_tree(v, a, cx));
            TypeTree::Parameterized(rebuilt(n, r.changed, |n| {
                n.clazz = clazz;
                n.type_arguments = arguments;
            }))
        }
        TypeTree::Array(n) => {
            let element = r.node(&n.element, type_tree(v, &n.element, cx));
            TypeTree::Array(rebuilt(n, r.changed, |n| n.element = element))
        }
        TypeTree::Wildcard(n) => {
            let bounded = r.option(&n.bounded, |b| type_tree(v, b, cx));
            TypeTree::Wildcard(rebuilt(n, r.changed, |n| n.bounded = bounded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::JavaParser;

    fn parse(source: &str) -> Arc<CompilationUnit> {
        JavaParser::builder().build().unwrap().parse("T.java", source).unwrap()
    }

    struct Noop;
    impl JavaVisitor for Noop {}

    struct UpperLiterals;
    impl JavaVisitor for UpperLiterals {
        fn visit_literal(&mut self, literal: &Arc<Literal>, _cx: &mut VisitCx) -> Expression {
            match &literal.value {
                LiteralValue::String(s) if s.chars().any(|c| c.is_lowercase()) => {
                    let upper = s.to_uppercase();
                    Expression::Literal(Arc::new(Literal {
                        value: LiteralValue::String(upper.clone()),
                        source: format!("\"{upper}\""),
                        ..(**literal).clone()
                    }))
                }
                _ => Expression::Literal(literal.clone()),
            }
        }
    }

    struct LiteralToIdentifier;
    impl JavaVisitor for LiteralToIdentifier {
        fn is_iso(&self) -> bool {
            true
        }

        fn visit_literal(&mut self, literal: &Arc<Literal>, _cx: &mut VisitCx) -> Expression {
            Expression::Identifier(Arc::new(Identifier::new(literal.prefix.clone(), "x")))
        }
    }

    struct Depth(Vec<String>);
    impl JavaVisitor for Depth {
        fn visit_method_invocation(&mut self, m: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
            let method = cx.cursor().first_enclosing_method().map(|m| m.name.name.clone());
            self.0.push(format!("{}@{}", m.simple_name(), method.unwrap_or_default()));
            Expression::MethodInvocation(walk_method_invocation(self, m, cx))
        }
    }

    const SOURCE: &str = "class T {\n  void a() { f(\"x\", 1); }\n  void b() { int n = 2; }\n}\n";

    #[test]
    fn unchanged_tree_keeps_identity() {
        let cu = parse(SOURCE);
        let ctx = ExecutionContext::new();
        let mut cx = VisitCx::for_unit(&ctx, "noop", &cu);
        let out = visit(&mut Noop, &cu, &mut cx);
        assert!(Arc::ptr_eq(&cu, &out));
    }

    #[test]
    fn only_changed_path_is_rebuilt() {
        let cu = parse(SOURCE);
        let ctx = ExecutionContext::new();
        let mut cx = VisitCx::for_unit(&ctx, "upper", &cu);
        let out = visit(&mut UpperLiterals, &cu, &mut cx);
        assert!(!Arc::ptr_eq(&cu, &out));
        assert_eq!(out.print(), SOURCE.replace("\"x\"", "\"X\""));
        let before = &cu.classes[0].body.statements;
        let after = &out.classes[0].body.statements;
        assert!(!before[0].element.ptr_eq(&after[0].element));
        assert!(before[1].element.ptr_eq(&after[1].element));
    }

    #[test]
    fn iso_kind_change_is_fatal() {
        let cu = parse(SOURCE);
        let ctx = ExecutionContext::new();
        let mut cx = VisitCx::for_unit(&ctx, "bad", &cu);
        let out = visit(&mut LiteralToIdentifier, &cu, &mut cx);
        assert!(matches!(cx.take_fatal(), Some(RewriteError::InvariantViolation { .. })));
        assert_eq!(out.print(), SOURCE);
    }

    #[test]
    fn cursor_sees_enclosing_method() {
        let cu = parse(SOURCE);
        let ctx = ExecutionContext::new();
        let mut cx = VisitCx::for_unit(&ctx, "depth", &cu);
        let mut visitor = Depth(Vec::new());
        visit(&mut visitor, &cu, &mut cx);
        assert_eq!(visitor.0, vec!["f@a"]);
        assert_eq!(cx.cursor().depth(), 0);
    }

    #[test]
    fn cancelled_context_returns_input() {
        let cu = parse(SOURCE);
        let ctx = ExecutionContext::new();
        ctx.cancel();
        let mut cx = VisitCx::for_unit(&ctx, "upper", &cu);
        let out = visit(&mut UpperLiterals, &cu, &mut cx);
        assert!(Arc::ptr_eq(&cu, &out));
    }

    #[test]
    fn diagnostics_carry_range() {
        let cu = parse(SOURCE);
        let ctx = ExecutionContext::new();
        let cx = VisitCx::for_unit(&ctx, "r", &cu);
        let Statement::Method(m) = &cu.classes[0].body.statements[0].element else {
            panic!("method expected");
        };
        cx.report(Severity::Debug, "here", Some(m.name.id));
        let diagnostic = &ctx.diagnostics()[0];
        let range = diagnostic.range.clone().unwrap();
        assert_eq!(&SOURCE[range], "a");
        assert_eq!(diagnostic.source_path.as_deref(), Some(Path::new("T.java")));
    }
}
