use std::ops::Range;
use std::sync::Arc;

use super::nodes::*;
use super::{ClassKeyword, Container, Id, Space, Tree};

/// Writes trees back to source.
///
/// Printing only concatenates stored trivia and tokens, so an unmodified
/// parse prints byte for byte. When a target id is set the printer also
/// records where that node's text (prefix excluded) lands in the output.
pub struct Printer {
    out: String,
    target: Option<Id>,
    found: Option<Range<usize>>,
}

/// Byte range of the node `id` in the printed unit.
pub fn locate(cu: &CompilationUnit, id: Id) -> Option<Range<usize>> {
    let mut printer = Printer {
        out: String::new(),
        target: Some(id),
        found: None,
    };
    printer.compilation_unit(cu);
    printer.found
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            target: None,
            found: None,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn space(&mut self, space: &Space) {
        self.out.push_str(space.as_str());
    }

    fn token(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn node(&mut self, id: Id, prefix: &Space, body: impl FnOnce(&mut Self)) {
        self.space(prefix);
        let start = self.out.len();
        body(self);
        if self.target == Some(id) && self.found.is_none() {
            self.found = Some(start..self.out.len());
        }
    }

    fn container<T>(
        &mut self,
        container: &Container<T>,
        open: &str,
        close: &str,
        mut element: impl FnMut(&mut Self, &T),
    ) {
        self.space(&container.before);
        self.token(open);
        for (i, padded) in container.elements.iter().enumerate() {
            if i > 0 {
                self.token(",");
            }
            element(self, &padded.element);
            self.space(&padded.after);
        }
        self.space(&container.end);
        self.token(close);
    }

    pub fn tree(&mut self, tree: &Tree) {
        match tree {
            Tree::CompilationUnit(cu) => self.compilation_unit(cu),
            Tree::Import(i) => self.import(i),
            Tree::Class(c) => self.class_declaration(c),
            Tree::Method(m) => self.method_declaration(m),
            Tree::Annotation(a) => self.annotation(a),
            Tree::Block(b) => self.block(b),
            Tree::VariableDeclarations(v) => self.variable_declarations(v),
            Tree::Statement(s) => self.statement(s),
            Tree::Expression(e) => self.expression(e),
            Tree::TypeTree(t) => self.type_tree(t),
        }
    }

    pub fn compilation_unit(&mut self, cu: &CompilationUnit) {
        let start = self.out.len();
        if let Some(package) = &cu.package {
            let pkg = &package.element;
            self.node(pkg.id, &pkg.prefix, |p| {
                p.token("package");
                p.expression(&pkg.name);
            });
            self.space(&package.after);
            self.token(";");
        }
        for import in &cu.imports {
            self.import(&import.element);
            self.space(&import.after);
            self.token(";");
        }
        for class in &cu.classes {
            self.class_declaration(class);
        }
        self.space(&cu.eof);
        if self.target == Some(cu.id) && self.found.is_none() {
            self.found = Some(start..self.out.len());
        }
    }

    pub fn import(&mut self, import: &Import) {
        self.node(import.id, &import.prefix, |p| {
            p.token("import");
            if let Some(static_prefix) = &import.static_prefix {
                p.space(static_prefix);
                p.token("static");
            }
            p.field_access(&import.qualid);
        });
    }

    fn modifiers(&mut self, annotations: &[Arc<Annotation>], modifiers: &[Modifier]) {
        for annotation in annotations {
            self.annotation(annotation);
        }
        for modifier in modifiers {
            self.node(modifier.id, &modifier.prefix, |p| p.token(&modifier.keyword));
        }
    }

    pub fn class_declaration(&mut self, class: &ClassDeclaration) {
        self.node(class.id, &class.prefix, |p| {
            p.modifiers(&class.leading_annotations, &class.modifiers);
            p.space(&class.keyword_prefix);
            p.token(match class.keyword {
                ClassKeyword::Class => "class",
                ClassKeyword::Interface => "interface",
            });
            p.identifier(&class.name);
            if let Some(extends) = &class.extends {
                p.space(&extends.before);
                p.token("extends");
                p.type_tree(&extends.element);
            }
            if let Some(implements) = &class.implements {
                let keyword = match class.keyword {
                    ClassKeyword::Class => "implements",
                    ClassKeyword::Interface => "extends",
                };
                p.container(implements, keyword, "", |p, t| p.type_tree(t));
            }
            p.block(&class.body);
        });
    }

    pub fn method_declaration(&mut self, method: &MethodDeclaration) {
        self.node(method.id, &method.prefix, |p| {
            p.modifiers(&method.leading_annotations, &method.modifiers);
            if let Some(return_type) = &method.return_type {
                p.type_tree(return_type);
            }
            p.identifier(&method.name);
            p.container(&method.parameters, "(", ")", |p, v| p.variable_declarations(v));
            if let Some(throws) = &method.throws {
                p.container(throws, "throws", "", |p, t| p.type_tree(t));
            }
            if let Some(body) = &method.body {
                p.block(body);
            }
        });
    }

    pub fn variable_declarations(&mut self, decls: &VariableDeclarations) {
        self.node(decls.id, &decls.prefix, |p| {
            p.modifiers(&decls.leading_annotations, &decls.modifiers);
            if let Some(type_expr) = &decls.type_expr {
                p.type_tree(type_expr);
            }
            if let Some(varargs) = &decls.varargs {
                p.space(varargs);
                p.token("...");
            }
            for (i, variable) in decls.variables.iter().enumerate() {
                if i > 0 {
                    p.token(",");
                }
                let var = &variable.element;
                p.node(var.id, &var.prefix, |p| {
                    p.identifier(&var.name);
                    if let Some(init) = &var.initializer {
                        p.space(&init.before);
                        p.token("=");
                        p.expression(&init.element);
                    }
                });
                p.space(&variable.after);
            }
        });
    }

    pub fn annotation(&mut self, annotation: &Annotation) {
        self.node(annotation.id, &annotation.prefix, |p| {
            p.token("@");
            p.expression(&annotation.annotation_type);
            if let Some(args) = &annotation.arguments {
                p.container(args, "(", ")", |p, e| p.expression(e));
            }
        });
    }

    pub fn block(&mut self, block: &Block) {
        self.node(block.id, &block.prefix, |p| {
            p.token("{");
            for statement in &block.statements {
                p.padded_statement(&statement.element, &statement.after);
            }
            p.space(&block.end);
            p.token("}");
        });
    }

    fn padded_statement(&mut self, statement: &Statement, after: &Space) {
        self.statement(statement);
        self.space(after);
        if statement.needs_semicolon() {
            self.token(";");
        }
    }

    pub fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(e) => self.expression(e),
            Statement::VariableDeclarations(v) => self.variable_declarations(v),
            Statement::Block(b) => self.block(b),
            Statement::Class(c) => self.class_declaration(c),
            Statement::Method(m) => self.method_declaration(m),
            Statement::Return(r) => self.node(r.id, &r.prefix, |p| {
                p.token("return");
                if let Some(e) = &r.expression {
                    p.expression(e);
                }
            }),
            Statement::Throw(t) => self.node(t.id, &t.prefix, |p| {
                p.token("throw");
                p.expression(&t.exception);
            }),
            Statement::Empty(e) => self.node(e.id, &e.prefix, |_| {}),
            Statement::Break(b) => self.node(b.id, &b.prefix, |p| {
                p.token("break");
                if let Some(label) = &b.label {
                    p.identifier(label);
                }
            }),
            Statement::Continue(c) => self.node(c.id, &c.prefix, |p| {
                p.token("continue");
                if let Some(label) = &c.label {
                    p.identifier(label);
                }
            }),
            Statement::DoWhile(d) => self.node(d.id, &d.prefix, |p| {
                p.token("do");
                p.padded_statement(&d.body.element, &d.body.after);
                p.space(&d.while_prefix);
                p.token("while");
                p.control_parentheses(&d.condition);
            }),
            Statement::Switch(sw) => self.node(sw.id, &sw.prefix, |p| {
                p.token("switch");
                p.control_parentheses(&sw.selector);
                p.space(&sw.body_prefix);
                p.token("{");
                for case in &sw.cases {
                    p.case(case);
                }
                p.space(&sw.end);
                p.token("}");
            }),
            Statement::If(i) => self.node(i.id, &i.prefix, |p| {
                p.token("if");
                p.control_parentheses(&i.condition);
                p.padded_statement(&i.then_part.element, &i.then_part.after);
                if let Some(else_part) = &i.else_part {
                    p.node(else_part.id, &else_part.prefix, |p| {
                        p.token("else");
                        p.padded_statement(&else_part.body.element, &else_part.body.after);
                    });
                }
            }),
            Statement::While(w) => self.node(w.id, &w.prefix, |p| {
                p.token("while");
                p.control_parentheses(&w.condition);
                p.padded_statement(&w.body.element, &w.body.after);
            }),
            Statement::For(f) => self.node(f.id, &f.prefix, |p| {
                p.token("for");
                let control = &f.control;
                p.space(&control.prefix);
                p.token("(");
                if let Some(init) = &control.init.element {
                    p.statement(init);
                }
                p.space(&control.init.after);
                p.token(";");
                if let Some(condition) = &control.condition.element {
                    p.expression(condition);
                }
                p.space(&control.condition.after);
                p.token(";");
                for (i, update) in control.update.iter().enumerate() {
                    if i > 0 {
                        p.token(",");
                    }
                    p.expression(&update.element);
                    p.space(&update.after);
                }
                p.space(&control.end);
                p.token(")");
                p.padded_statement(&f.body.element, &f.body.after);
            }),
            Statement::ForEach(f) => self.node(f.id, &f.prefix, |p| {
                p.token("for");
                let control = &f.control;
                p.space(&control.prefix);
                p.token("(");
                p.variable_declarations(&control.variable.element);
                p.space(&control.variable.after);
                p.token(":");
                p.expression(&control.iterable.element);
                p.space(&control.iterable.after);
                p.token(")");
                p.padded_statement(&f.body.element, &f.body.after);
            }),
            Statement::Try(t) => self.node(t.id, &t.prefix, |p| {
                p.token("try");
                if let Some(resources) = &t.resources {
                    p.try_resources(resources);
                }
                p.block(&t.body);
                for catch in &t.catches {
                    p.node(catch.id, &catch.prefix, |p| {
                        p.token("catch");
                        p.space(&catch.parameter_prefix);
                        p.token("(");
                        p.variable_declarations(&catch.parameter.element);
                        p.space(&catch.parameter.after);
                        p.token(")");
                        p.block(&catch.body);
                    });
                }
                if let Some(finally) = &t.finally {
                    p.space(&finally.before);
                    p.token("finally");
                    p.block(&finally.element);
                }
            }),
        }
    }

    fn try_resources(&mut self, resources: &TryResources) {
        self.space(&resources.prefix);
        self.token("(");
        let last = resources.resources.len().saturating_sub(1);
        for (i, resource) in resources.resources.iter().enumerate() {
            self.statement(&resource.element);
            self.space(&resource.after);
            if i < last || resources.terminated {
                self.token(";");
            }
        }
        self.space(&resources.end);
        self.token(")");
    }

    fn case(&mut self, case: &Case) {
        self.node(case.id, &case.prefix, |p| {
            if case.is_default() {
                p.token("default");
            } else {
                p.token("case");
            }
            for (i, label) in case.labels.iter().enumerate() {
                if i > 0 {
                    p.token(",");
                }
                p.expression(&label.element);
                p.space(&label.after);
            }
            p.space(&case.separator);
            match &case.body {
                CaseBody::Statements(statements) => {
                    p.token(":");
                    for statement in statements {
                        p.padded_statement(&statement.element, &statement.after);
                    }
                }
                CaseBody::Rule(body) => {
                    p.token("->");
                    p.padded_statement(&body.element, &body.after);
                }
            }
        });
    }

    fn control_parentheses(&mut self, control: &ControlParentheses) {
        self.space(&control.prefix);
        self.token("(");
        self.expression(&control.tree.element);
        self.space(&control.tree.after);
        self.token(")");
    }

    fn identifier(&mut self, identifier: &Identifier) {
        self.node(identifier.id, &identifier.prefix, |p| p.token(&identifier.name));
    }

    fn field_access(&mut self, fa: &FieldAccess) {
        self.node(fa.id, &fa.prefix, |p| {
            p.expression(&fa.target);
            p.space(&fa.name.before);
            p.token(".");
            p.identifier(&fa.name.element);
        });
    }

    fn array_dimension(&mut self, dimension: &ArrayDimension) {
        self.space(&dimension.prefix);
        self.token("[");
        if let Some(index) = &dimension.index.element {
            self.expression(index);
        }
        self.space(&dimension.index.after);
        self.token("]");
    }

    pub fn expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier(i) => self.identifier(i),
            Expression::Literal(l) => self.node(l.id, &l.prefix, |p| p.token(&l.source)),
            Expression::FieldAccess(fa) => self.field_access(fa),
            Expression::MethodInvocation(mi) => self.node(mi.id, &mi.prefix, |p| {
                if let Some(select) = &mi.select {
                    p.expression(&select.element);
                    p.space(&select.after);
                    p.token(".");
                }
                p.identifier(&mi.name);
                p.container(&mi.arguments, "(", ")", |p, e| p.expression(e));
            }),
            Expression::NewClass(nc) => self.node(nc.id, &nc.prefix, |p| {
                p.token("new");
                p.type_tree(&nc.clazz);
                p.container(&nc.arguments, "(", ")", |p, e| p.expression(e));
                if let Some(body) = &nc.body {
                    p.block(body);
                }
            }),
            Expression::NewArray(na) => self.node(na.id, &na.prefix, |p| {
                if let Some(element_type) = &na.element_type {
                    p.token("new");
                    p.type_tree(element_type);
                }
                for dimension in &na.dimensions {
                    p.array_dimension(dimension);
                }
                if let Some(init) = &na.initializer {
                    p.container(init, "{", "}", |p, e| p.expression(e));
                }
            }),
            Expression::Lambda(l) => self.node(l.id, &l.prefix, |p| {
                if l.parenthesized {
                    p.container(&l.parameters, "(", ")", |p, v| p.variable_declarations(v));
                } else {
                    for param in &l.parameters.elements {
                        p.variable_declarations(&param.element);
                        p.space(&param.after);
                    }
                }
                p.space(&l.arrow);
                p.token("->");
                match &l.body {
                    LambdaBody::Expression(e) => p.expression(e),
                    LambdaBody::Block(b) => p.block(b),
                }
            }),
            Expression::MemberReference(mr) => self.node(mr.id, &mr.prefix, |p| {
                p.expression(&mr.containing);
                p.space(&mr.reference.before);
                p.token("::");
                p.identifier(&mr.reference.element);
            }),
            Expression::Binary(b) => self.node(b.id, &b.prefix, |p| {
                p.expression(&b.left);
                p.space(&b.operator.before);
                p.token(b.operator.element.symbol());
                p.expression(&b.right);
            }),
            Expression::Unary(u) => self.node(u.id, &u.prefix, |p| {
                if u.operator.element.is_postfix() {
                    p.expression(&u.expression);
                    p.space(&u.operator.before);
                    p.token(u.operator.element.symbol());
                } else {
                    p.space(&u.operator.before);
                    p.token(u.operator.element.symbol());
                    p.expression(&u.expression);
                }
            }),
            Expression::Assignment(a) => self.node(a.id, &a.prefix, |p| {
                p.expression(&a.variable);
                p.space(&a.operator.before);
                p.token(a.operator.element.symbol());
                p.expression(&a.value);
            }),
            Expression::Ternary(t) => self.node(t.id, &t.prefix, |p| {
                p.expression(&t.condition);
                p.space(&t.true_part.before);
                p.token("?");
                p.expression(&t.true_part.element);
                p.space(&t.false_part.before);
                p.token(":");
                p.expression(&t.false_part.element);
            }),
            Expression::Parentheses(paren) => self.node(paren.id, &paren.prefix, |p| {
                p.token("(");
                p.expression(&paren.tree.element);
                p.space(&paren.tree.after);
                p.token(")");
            }),
            Expression::ArrayAccess(a) => self.node(a.id, &a.prefix, |p| {
                p.expression(&a.indexed);
                p.array_dimension(&a.dimension);
            }),
            Expression::TypeCast(c) => self.node(c.id, &c.prefix, |p| {
                p.token("(");
                p.type_tree(&c.clazz.element);
                p.space(&c.clazz.after);
                p.token(")");
                p.expression(&c.expression);
            }),
        }
    }

    pub fn type_tree(&mut self, tree: &TypeTree) {
        match tree {
            TypeTree::Named(e) => self.expression(e),
            TypeTree::Primitive(prim) => {
                self.node(prim.id, &prim.prefix, |p| p.token(prim.primitive.keyword()))
            }
            TypeTree::Parameterized(pt) => self.node(pt.id, &pt.prefix, |p| {
                p.expression(&pt.clazz);
                p.container(&pt.type_arguments, "<", ">", |p, t| p.type_tree(t));
            }),
            TypeTree::Array(at) => self.node(at.id, &at.prefix, |p| {
                p.type_tree(&at.element);
                p.space(&at.open);
                p.token("[");
                p.space(&at.close);
                p.token("]");
            }),
            TypeTree::Wildcard(w) => self.node(w.id, &w.prefix, |p| {
                p.token("?");
                if let Some(bound) = &w.bound {
                    p.space(&bound.before);
                    p.token(match bound.element {
                        WildcardBound::Extends => "extends",
                        WildcardBound::Super => "super",
                    });
                }
                if let Some(bounded) = &w.bounded {
                    p.type_tree(bounded);
                }
            }),
        }
    }
}
