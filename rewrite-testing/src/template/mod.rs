//! Code templates with typed placeholders.
//!
//! A template is a Java fragment such as `assertThat(#{any()}).isEqualTo(#{any()})`.
//! Applying it parses the fragment inside a synthetic compilation unit with
//! the real parser, attributes it against the template's own classpath and
//! splices the bound arguments in place of the placeholders. Parsed fragments
//! are cached on the [`ExecutionContext`] by text, argument types and
//! classpath, so each distinct shape is parsed once per run.

mod placeholder;

pub use placeholder::Placeholder;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::classpath::Classpath;
use crate::context::ExecutionContext;
use crate::error::TemplateError;
use crate::parse::JavaParser;
use crate::search::find_missing_types;
use crate::tree::*;
use crate::visitor::{self, Cursor, JavaVisitor, VisitCx};

use placeholder::{parameter_index, parameter_name, substitute};

/// Where a template result goes, relative to the target tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates {
    /// Replace an expression, statement or annotation.
    Replace,
    /// Insert before a statement; the result is the enclosing block.
    Before,
    /// Insert after a statement; the result is the enclosing block.
    After,
    FirstStatement,
    LastStatement,
    /// Prepend an annotation to a class or method declaration.
    AddAnnotation,
}

impl Coordinates {
    pub fn name(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Before => "before",
            Self::After => "after",
            Self::FirstStatement => "first_statement",
            Self::LastStatement => "last_statement",
            Self::AddAnnotation => "add_annotation",
        }
    }
}

/// Position inside a block for [`JavaTemplate::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Before(Id),
    After(Id),
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Expression,
    Statements,
    Annotation,
}

impl Shape {
    fn name(self) -> &'static str {
        match self {
            Self::Expression => "expression",
            Self::Statements => "statement",
            Self::Annotation => "annotation",
        }
    }
}

#[derive(Debug)]
enum Fragment {
    Expression(Expression),
    Statements(Vec<Statement>),
    Annotation(Arc<Annotation>),
}

/// A parsed and attributed template fragment, before argument substitution.
#[derive(Debug)]
pub struct CompiledTemplate {
    fragment: Fragment,
}

#[derive(Debug, Clone)]
pub struct JavaTemplate {
    code: String,
    parameterized: String,
    placeholders: Vec<Placeholder>,
    imports: Vec<String>,
    static_imports: Vec<String>,
    classpath: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct JavaTemplateBuilder {
    code: String,
    imports: Vec<String>,
    static_imports: Vec<String>,
    classpath: Vec<String>,
}

impl JavaTemplateBuilder {
    /// Types the fragment refers to by simple name.
    pub fn imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    /// Static members the fragment calls unqualified, as `a.B.member`.
    pub fn static_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_imports.extend(imports.into_iter().map(Into::into));
        self
    }

    /// Bundled classpath resources the fragment is attributed against.
    pub fn classpath<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classpath.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<JavaTemplate, TemplateError> {
        let (parameterized, placeholders) = substitute(&self.code)?;
        Ok(JavaTemplate {
            code: self.code,
            parameterized,
            placeholders,
            imports: self.imports,
            static_imports: self.static_imports,
            classpath: self.classpath,
        })
    }
}

impl JavaTemplate {
    pub fn builder(code: impl Into<String>) -> JavaTemplateBuilder {
        JavaTemplateBuilder {
            code: code.into(),
            imports: Vec::new(),
            static_imports: Vec::new(),
            classpath: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Apply at `coordinates` relative to `target`.
    ///
    /// # Arguments
    /// * `cx` - the current visit; `Before`/`After` find the enclosing block
    ///   through its cursor
    /// * `target` - the tree the coordinates refer to
    /// * `args` - one attributed expression per placeholder, in order
    ///
    /// # Returns
    /// The replacement for `target`, or for the enclosing block when
    /// inserting next to a statement.
    pub fn apply(
        &self,
        cx: &VisitCx,
        target: &Tree,
        coordinates: Coordinates,
        args: &[Expression],
    ) -> Result<Tree, TemplateError> {
        let unsupported = || TemplateError::UnsupportedCoordinate {
            mode: coordinates.name(),
            target: target.kind(),
        };
        match (coordinates, target) {
            (Coordinates::Replace, Tree::Expression(e)) => self.replace_expression(cx, e, args).map(Tree::Expression),
            (Coordinates::Replace, Tree::Statement(s)) => self.replace_statement(cx, s, args).map(Tree::Statement),
            (Coordinates::Replace, Tree::Annotation(a)) => self.replace_annotation(cx, a, args).map(Tree::Annotation),
            (Coordinates::Before | Coordinates::After, Tree::Statement(s)) => {
                let id = s.id();
                let block = enclosing_block(cx.cursor(), id).ok_or(TemplateError::DetachedStatement(id))?;
                let at = if coordinates == Coordinates::Before {
                    Insertion::Before(id)
                } else {
                    Insertion::After(id)
                };
                self.insert(cx, &block, at, args).map(Tree::Block)
            }
            (Coordinates::FirstStatement | Coordinates::LastStatement, Tree::Block(b)) => {
                self.insert(cx, b, edge(coordinates), args).map(Tree::Block)
            }
            (Coordinates::FirstStatement | Coordinates::LastStatement, Tree::Statement(Statement::Block(b))) => self
                .insert(cx, b, edge(coordinates), args)
                .map(|b| Tree::Statement(Statement::Block(b))),
            (Coordinates::AddAnnotation, Tree::Class(c)) => self.annotate_class(cx, c, args).map(Tree::Class),
            (Coordinates::AddAnnotation, Tree::Statement(Statement::Class(c))) => self
                .annotate_class(cx, c, args)
                .map(|c| Tree::Statement(Statement::Class(c))),
            (Coordinates::AddAnnotation, Tree::Method(m)) => self.annotate_method(cx, m, args).map(Tree::Method),
            (Coordinates::AddAnnotation, Tree::Statement(Statement::Method(m))) => self
                .annotate_method(cx, m, args)
                .map(|m| Tree::Statement(Statement::Method(m))),
            _ => Err(unsupported()),
        }
    }

    /// Replace an expression; the result keeps the target's prefix.
    pub fn replace_expression(
        &self,
        cx: &VisitCx,
        target: &Expression,
        args: &[Expression],
    ) -> Result<Expression, TemplateError> {
        let compiled = self.compile(cx.ctx(), Shape::Expression, args)?;
        let Fragment::Expression(fragment) = &compiled.fragment else {
            return Err(self.unexpected(Shape::Expression));
        };
        let result = Substitute::new(args).expression(cx, fragment);
        Ok(result.with_prefix(target.prefix().clone()))
    }

    pub fn replace_statement(
        &self,
        cx: &VisitCx,
        target: &Statement,
        args: &[Expression],
    ) -> Result<Statement, TemplateError> {
        let mut statements = self.statements(cx, args)?;
        if statements.len() != 1 {
            return Err(self.unexpected(Shape::Statements));
        }
        let statement = statements.remove(0);
        Ok(statement.with_prefix(target.prefix().clone()))
    }

    pub fn replace_annotation(
        &self,
        cx: &VisitCx,
        target: &Arc<Annotation>,
        args: &[Expression],
    ) -> Result<Arc<Annotation>, TemplateError> {
        let annotation = self.annotation(cx, args)?;
        Ok(Arc::new(annotation.with_prefix(target.prefix.clone())))
    }

    /// Insert the template's statements into `block`.
    pub fn insert(
        &self,
        cx: &VisitCx,
        block: &Arc<Block>,
        at: Insertion,
        args: &[Expression],
    ) -> Result<Arc<Block>, TemplateError> {
        let position = |id: Id| {
            block
                .statements
                .iter()
                .position(|s| s.element.id() == id)
                .ok_or(TemplateError::DetachedStatement(id))
        };
        let default_prefix = || Space::new(format!("\n{}    ", block.end.indent()));
        let (index, prefix) = match at {
            Insertion::Before(id) => {
                let index = position(id)?;
                (index, block.statements[index].element.prefix().on_own_line())
            }
            Insertion::After(id) => {
                let index = position(id)?;
                (index + 1, block.statements[index].element.prefix().on_own_line())
            }
            Insertion::First => (
                0,
                block
                    .statements
                    .first()
                    .map_or_else(default_prefix, |s| s.element.prefix().on_own_line()),
            ),
            Insertion::Last => (
                block.statements.len(),
                block
                    .statements
                    .last()
                    .map_or_else(default_prefix, |s| s.element.prefix().on_own_line()),
            ),
        };

        let inserted = self
            .statements(cx, args)?
            .into_iter()
            .map(|s| Padded::new(s.with_prefix(prefix.clone())));
        let mut statements = block.statements.clone();
        statements.splice(index..index, inserted);
        Ok(Arc::new(block.with_statements(statements)))
    }

    fn annotate_class(
        &self,
        cx: &VisitCx,
        class: &Arc<ClassDeclaration>,
        args: &[Expression],
    ) -> Result<Arc<ClassDeclaration>, TemplateError> {
        let annotation = self.annotation(cx, args)?;
        let own_line = class.prefix.on_own_line();
        let mut class = (**class).clone();
        if let Some(first) = class.leading_annotations.first_mut() {
            *first = Arc::new(first.with_prefix(own_line));
        } else if let Some(first) = class.modifiers.first_mut() {
            first.prefix = own_line;
        } else {
            class.keyword_prefix = own_line;
        }
        class
            .leading_annotations
            .insert(0, Arc::new(annotation.with_prefix(Space::EMPTY)));
        Ok(Arc::new(class))
    }

    fn annotate_method(
        &self,
        cx: &VisitCx,
        method: &Arc<MethodDeclaration>,
        args: &[Expression],
    ) -> Result<Arc<MethodDeclaration>, TemplateError> {
        let annotation = self.annotation(cx, args)?;
        let own_line = method.prefix.on_own_line();
        let mut method = (**method).clone();
        if let Some(first) = method.leading_annotations.first_mut() {
            *first = Arc::new(first.with_prefix(own_line));
        } else if let Some(first) = method.modifiers.first_mut() {
            first.prefix = own_line;
        } else if let Some(return_type) = &method.return_type {
            method.return_type = Some(return_type.with_prefix(own_line));
        } else {
            method.name = Arc::new(Identifier {
                prefix: own_line,
                ..(*method.name).clone()
            });
        }
        method
            .leading_annotations
            .insert(0, Arc::new(annotation.with_prefix(Space::EMPTY)));
        Ok(Arc::new(method))
    }

    fn statements(&self, cx: &VisitCx, args: &[Expression]) -> Result<Vec<Statement>, TemplateError> {
        let compiled = self.compile(cx.ctx(), Shape::Statements, args)?;
        let Fragment::Statements(fragment) = &compiled.fragment else {
            return Err(self.unexpected(Shape::Statements));
        };
        let mut substitution = Substitute::new(args);
        Ok(fragment.iter().map(|s| substitution.statement(cx, s)).collect())
    }

    fn annotation(&self, cx: &VisitCx, args: &[Expression]) -> Result<Annotation, TemplateError> {
        let compiled = self.compile(cx.ctx(), Shape::Annotation, args)?;
        let Fragment::Annotation(fragment) = &compiled.fragment else {
            return Err(self.unexpected(Shape::Annotation));
        };
        Ok((*Substitute::new(args).annotation(cx, fragment)).clone())
    }

    fn unexpected(&self, shape: Shape) -> TemplateError {
        TemplateError::UnexpectedShape {
            code: self.code.clone(),
            expected: shape.name(),
        }
    }

    fn compile(
        &self,
        ctx: &ExecutionContext,
        shape: Shape,
        args: &[Expression],
    ) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if args.len() != self.placeholders.len() {
            return Err(TemplateError::ArgumentCount {
                expected: self.placeholders.len(),
                actual: args.len(),
            });
        }
        let classpath = ctx.classpath(&self.classpath)?;
        let bindings = self.bind(&classpath, args)?;
        let key = self.cache_key(shape, &classpath, args);
        ctx.template(key, || self.parse(ctx, shape, &classpath, &bindings))
            .map_err(TemplateError::Cached)
    }

    /// Check each argument against its placeholder and type the parameter
    /// that stands in for it.
    fn bind(&self, classpath: &Classpath, args: &[Expression]) -> Result<HashMap<String, JavaType>, TemplateError> {
        let mut bindings = HashMap::with_capacity(args.len());
        for (index, (placeholder, arg)) in self.placeholders.iter().zip(args).enumerate() {
            let actual = arg.ty().clone();
            let mismatch = |expected: String| TemplateError::PlaceholderType {
                index,
                placeholder: placeholder.describe(),
                expected,
                actual: actual.to_string(),
            };
            match placeholder {
                Placeholder::Any => {}
                Placeholder::AnyArray => {
                    if !actual.is_array() {
                        return Err(mismatch("an array".to_string()));
                    }
                }
                Placeholder::AnyOf(name) => {
                    let expected = self.resolve_placeholder_type(classpath, name)?;
                    if !actual.is_assignable_to(&expected) {
                        return Err(mismatch(expected.to_string()));
                    }
                }
            }
            bindings.insert(parameter_name(index), actual);
        }
        Ok(bindings)
    }

    /// `T` in `#{any(T)}`: fully qualified, or simple and visible through the
    /// template's imports or `java.lang`.
    fn resolve_placeholder_type(&self, classpath: &Classpath, name: &str) -> Result<JavaType, TemplateError> {
        let base = name.trim_end_matches("[]");
        let dimensions = &name[base.len()..];
        let mut candidates = vec![base.to_string()];
        if !base.contains('.') {
            let suffix = format!(".{base}");
            candidates.extend(self.imports.iter().filter(|i| i.ends_with(&suffix)).cloned());
            candidates.push(format!("java.lang.{base}"));
        }
        candidates
            .iter()
            .map(|candidate| classpath.resolve_type_name(&format!("{candidate}{dimensions}")))
            .find(|ty| !ty.is_unknown())
            .ok_or_else(|| TemplateError::UnresolvedType(name.to_string()))
    }

    fn cache_key(&self, shape: Shape, classpath: &Classpath, args: &[Expression]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        let mut field = |text: &str| {
            hasher.update(text.as_bytes());
            hasher.update(&[0]);
        };
        field(shape.name());
        field(&self.code);
        field(classpath.key());
        for import in &self.imports {
            field(import);
        }
        field("static");
        for import in &self.static_imports {
            field(import);
        }
        for arg in args {
            field(&arg.ty().to_string());
        }
        hasher.finalize()
    }

    fn synthetic_source(&self, shape: Shape) -> String {
        let mut source = String::new();
        for import in &self.imports {
            source.push_str(&format!("import {import};\n"));
        }
        for import in &self.static_imports {
            source.push_str(&format!("import static {import};\n"));
        }
        let code = self.parameterized.trim();
        match shape {
            Shape::Annotation => source.push_str(&format!("{code}\nclass __Template {{}}\n")),
            Shape::Expression => {
                source.push_str(&format!(
                    "class __Template {{\nvoid __template() {{\nObject __expr = {code};\n}}\n}}\n"
                ));
            }
            Shape::Statements => {
                let terminator = if code.ends_with(';') || code.ends_with('}') { "" } else { ";" };
                source.push_str(&format!(
                    "class __Template {{\nvoid __template() {{\n{code}{terminator}\n}}\n}}\n"
                ));
            }
        }
        source
    }

    fn parse(
        &self,
        ctx: &ExecutionContext,
        shape: Shape,
        classpath: &Arc<Classpath>,
        bindings: &HashMap<String, JavaType>,
    ) -> Result<CompiledTemplate, TemplateError> {
        let source = self.synthetic_source(shape);
        let parser = JavaParser::new(classpath.clone());
        let cu = Arc::new(parser.parse_with_bindings(Path::new("__Template.java"), &source, bindings)?);

        if let Some(site) = find_missing_types(&cu, ctx).first() {
            return Err(TemplateError::Unattributed {
                code: self.code.clone(),
                site: Expression::MethodInvocation(site.clone()).print().trim().to_string(),
            });
        }
        let fragment = extract(shape, &cu).ok_or_else(|| self.unexpected(shape))?;
        debug!(template = %self.code, shape = shape.name(), classpath = classpath.key(), "compiled template");
        Ok(CompiledTemplate { fragment })
    }
}

fn edge(coordinates: Coordinates) -> Insertion {
    if coordinates == Coordinates::FirstStatement {
        Insertion::First
    } else {
        Insertion::Last
    }
}

fn enclosing_block(cursor: &Cursor, id: Id) -> Option<Arc<Block>> {
    cursor.value().into_iter().chain(cursor.ancestors()).find_map(|tree| match tree {
        Tree::Block(b) | Tree::Statement(Statement::Block(b)) if b.statements.iter().any(|s| s.element.id() == id) => {
            Some(b.clone())
        }
        _ => None,
    })
}

fn extract(shape: Shape, cu: &CompilationUnit) -> Option<Fragment> {
    let class = cu.classes.first()?;
    if shape == Shape::Annotation {
        return class.leading_annotations.first().cloned().map(Fragment::Annotation);
    }
    let body = class.body.statements.iter().find_map(|s| match &s.element {
        Statement::Method(m) => m.body.clone(),
        _ => None,
    })?;
    match shape {
        Shape::Expression => match &body.statements.first()?.element {
            Statement::VariableDeclarations(d) => d
                .variables
                .first()?
                .element
                .initializer
                .as_ref()
                .map(|init| Fragment::Expression(init.element.clone())),
            _ => None,
        },
        _ => {
            let statements: Vec<Statement> = body.statements.iter().map(|s| s.element.clone()).collect();
            (!statements.is_empty()).then_some(Fragment::Statements(statements))
        }
    }
}

/// Swaps placeholder parameters for the bound arguments.
struct Substitute<'a> {
    args: &'a [Expression],
}

impl<'a> Substitute<'a> {
    fn new(args: &'a [Expression]) -> Self {
        Self { args }
    }

    fn expression(&mut self, cx: &VisitCx, e: &Expression) -> Expression {
        visitor::expression(self, e, &mut VisitCx::new(cx.ctx(), cx.recipe()))
    }

    fn statement(&mut self, cx: &VisitCx, s: &Statement) -> Statement {
        visitor::statement(self, s, &mut VisitCx::new(cx.ctx(), cx.recipe()))
    }

    fn annotation(&mut self, cx: &VisitCx, a: &Arc<Annotation>) -> Arc<Annotation> {
        visitor::annotation(self, a, &mut VisitCx::new(cx.ctx(), cx.recipe()))
    }
}

impl JavaVisitor for Substitute<'_> {
    fn visit_identifier(&mut self, identifier: &Arc<Identifier>, cx: &mut VisitCx) -> Expression {
        let Some(arg) = parameter_index(&identifier.name).and_then(|i| self.args.get(i)) else {
            return Expression::Identifier(identifier.clone());
        };
        if binds_tighter_than(cx.cursor(), arg) {
            return Expression::Parentheses(Arc::new(Parentheses {
                id: Id::next(),
                prefix: identifier.prefix.clone(),
                tree: Padded::new(arg.with_prefix(Space::EMPTY)),
            }));
        }
        arg.with_prefix(identifier.prefix.clone())
    }
}

/// Whether `arg` needs parentheses where the cursor's parent uses it as an
/// operand or a receiver.
fn binds_tighter_than(cursor: &Cursor, arg: &Expression) -> bool {
    let loose = matches!(
        arg,
        Expression::Binary(_)
            | Expression::Ternary(_)
            | Expression::Assignment(_)
            | Expression::Lambda(_)
            | Expression::TypeCast(_)
            | Expression::Unary(_)
    );
    if !loose {
        return false;
    }
    matches!(
        cursor.parent(),
        Some(Tree::Expression(
            Expression::MethodInvocation(_)
                | Expression::FieldAccess(_)
                | Expression::MemberReference(_)
                | Expression::Binary(_)
                | Expression::Unary(_)
        ))
    ) && !is_argument(cursor)
}

/// Whether the current node is an argument of the parent invocation rather
/// than its receiver.
fn is_argument(cursor: &Cursor) -> bool {
    let Some(Tree::Expression(current)) = cursor.value() else {
        return false;
    };
    match cursor.parent() {
        Some(Tree::Expression(Expression::MethodInvocation(m))) => m.arguments.iter().any(|a| a.ptr_eq(current)),
        _ => false,
    }
}
