//! Type attribution of a freshly parsed compilation unit.
//!
//! Runs in two steps: the declarations of the unit are collected into local
//! class types first, then the tree is walked once and every expression,
//! invocation and name gets its type. Nodes are updated in place with
//! `Arc::make_mut`; a fresh parse holds the only reference to each of them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::classpath::{select_overload, ArgShape, Candidate, Classpath, FieldInfo, ReturnType};
use crate::tree::{
    qualified_name, Annotation, BinaryOp, Block, Case, CaseBody, ClassDeclaration, ClassType, CompilationUnit,
    Expression, FieldAccess, Identifier, Import, JavaType, Lambda, LambdaBody, LiteralValue, MethodDeclaration,
    MethodInvocation, Modifier, Primitive, Statement, Symbol, TypeKind, TypeTree, UnaryOp, VariableDeclarations,
};

/// Attribute `cu` against `classpath`. `bindings` gives names that are in
/// scope everywhere with a fixed type.
pub(crate) fn attribute(cu: &mut CompilationUnit, classpath: &Classpath, bindings: &HashMap<String, JavaType>) {
    let mut attributor = Attributor::new(cu, classpath, bindings);
    for import in &mut cu.imports {
        attributor.import(Arc::make_mut(&mut import.element));
    }
    for class in &mut cu.classes {
        attributor.class_declaration(Arc::make_mut(class));
    }
}

struct LocalType {
    ty: Arc<ClassType>,
    fields: HashMap<String, (JavaType, bool)>,
    methods: Vec<Candidate>,
}

#[derive(Default)]
struct ImportScope {
    single: HashMap<String, String>,
    on_demand: Vec<String>,
    /// `(type, member)` of single static imports.
    static_single: Vec<(String, String)>,
    static_on_demand: Vec<String>,
}

struct Attributor<'a> {
    classpath: &'a Classpath,
    bindings: &'a HashMap<String, JavaType>,
    package: Option<String>,
    imports: ImportScope,
    local_names: HashSet<String>,
    local_simple: HashMap<String, String>,
    locals: HashMap<String, LocalType>,
    scopes: Vec<HashMap<String, JavaType>>,
    class_stack: Vec<Arc<ClassType>>,
    return_types: Vec<JavaType>,
}

struct Declared<'t> {
    fqn: String,
    decl: &'t ClassDeclaration,
}

impl<'a> Attributor<'a> {
    fn new(cu: &CompilationUnit, classpath: &'a Classpath, bindings: &'a HashMap<String, JavaType>) -> Self {
        let mut imports = ImportScope::default();
        for import in cu.imports.iter().map(|p| &p.element) {
            match (import.is_static(), import.is_wildcard(), import.type_name()) {
                (true, true, Some(owner)) => imports.static_on_demand.push(owner),
                (true, false, Some(owner)) => {
                    let member = import.member().unwrap_or_default().to_string();
                    imports.static_single.push((owner, member));
                }
                (false, true, _) => imports.on_demand.push(import.package_name()),
                (false, false, Some(name)) => {
                    let simple = name.rsplit('.').next().unwrap_or(&name).to_string();
                    imports.single.entry(simple).or_insert(name);
                }
                _ => {}
            }
        }

        let mut attributor = Self {
            classpath,
            bindings,
            package: cu.package_name(),
            imports,
            local_names: HashSet::new(),
            local_simple: HashMap::new(),
            locals: HashMap::new(),
            scopes: Vec::new(),
            class_stack: Vec::new(),
            return_types: Vec::new(),
        };

        let mut declared = Vec::new();
        for class in &cu.classes {
            let fqn = attributor.qualify(None, &class.name.name);
            collect_declarations(class, fqn, &mut declared);
        }
        for d in &declared {
            attributor.local_names.insert(d.fqn.clone());
            attributor
                .local_simple
                .entry(d.decl.name.name.clone())
                .or_insert_with(|| d.fqn.clone());
        }

        let mut built = HashMap::new();
        let by_name: HashMap<&str, &ClassDeclaration> =
            declared.iter().map(|d| (d.fqn.as_str(), d.decl)).collect();
        for d in &declared {
            attributor.build_local_type(&d.fqn, &by_name, &mut built, &mut HashSet::new());
        }
        for d in &declared {
            if let Some(ty) = built.get(&d.fqn) {
                let local = attributor.collect_members(d.decl, ty.clone());
                attributor.locals.insert(d.fqn.clone(), local);
            }
        }
        attributor
    }

    fn qualify(&self, outer: Option<&str>, name: &str) -> String {
        match (outer, &self.package) {
            (Some(outer), _) => format!("{outer}.{name}"),
            (None, Some(package)) if !package.is_empty() => format!("{package}.{name}"),
            _ => name.to_string(),
        }
    }

    fn build_local_type(
        &self,
        fqn: &str,
        decls: &HashMap<&str, &ClassDeclaration>,
        built: &mut HashMap<String, Arc<ClassType>>,
        in_progress: &mut HashSet<String>,
    ) -> Option<Arc<ClassType>> {
        if let Some(ty) = built.get(fqn) {
            return Some(ty.clone());
        }
        let decl = decls.get(fqn)?;
        if !in_progress.insert(fqn.to_string()) {
            return None;
        }
        let mut supertypes = Vec::new();
        for name in supertype_names(decl) {
            let Some(super_fqn) = self.resolve_type_fqn(&name) else {
                continue;
            };
            let resolved = if decls.contains_key(super_fqn.as_str()) {
                self.build_local_type(&super_fqn, decls, built, in_progress)
            } else {
                self.class_type(&super_fqn)
            };
            supertypes.extend(resolved);
        }
        if supertypes.is_empty() {
            supertypes.push(self.object_type());
        }
        let ty = Arc::new(ClassType::new(fqn, decl.kind(), supertypes));
        built.insert(fqn.to_string(), ty.clone());
        in_progress.remove(fqn);
        Some(ty)
    }

    fn collect_members(&self, decl: &ClassDeclaration, ty: Arc<ClassType>) -> LocalType {
        let interface = decl.kind() == TypeKind::Interface;
        let mut fields = HashMap::new();
        let mut methods = Vec::new();
        for statement in decl.body.statements.iter().map(|p| &p.element) {
            match statement {
                Statement::VariableDeclarations(v) => {
                    let declared = v.type_expr.as_ref().map(|t| self.type_of(t)).unwrap_or_default();
                    let is_static = interface || has_modifier(&v.modifiers, "static");
                    for var in &v.variables {
                        fields.insert(var.element.name.name.clone(), (declared.clone(), is_static));
                    }
                }
                Statement::Method(m) => {
                    let Some(return_type) = &m.return_type else {
                        continue;
                    };
                    let params = m
                        .parameters
                        .iter()
                        .map(|p| self.parameter_type(p))
                        .collect();
                    methods.push(Candidate {
                        declaring: ty.clone(),
                        name: m.name.name.clone(),
                        params,
                        returns: ReturnType::Type(self.type_of(return_type)),
                        is_static: has_modifier(&m.modifiers, "static"),
                        varargs: m.parameters.iter().last().is_some_and(|p| p.varargs.is_some()),
                    });
                }
                _ => {}
            }
        }
        LocalType { ty, fields, methods }
    }

    fn parameter_type(&self, param: &VariableDeclarations) -> JavaType {
        let ty = param.type_expr.as_ref().map(|t| self.type_of(t)).unwrap_or_default();
        match ty {
            JavaType::Unknown => JavaType::Unknown,
            ty if param.varargs.is_some() => JavaType::Array(Box::new(ty)),
            ty => ty,
        }
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    fn type_exists(&self, fqn: &str) -> bool {
        self.local_names.contains(fqn) || self.classpath.contains(fqn)
    }

    fn object_type(&self) -> Arc<ClassType> {
        self.classpath
            .object_type()
            .unwrap_or_else(|| Arc::new(ClassType::new("java.lang.Object", TypeKind::Class, Vec::new())))
    }

    fn class_type(&self, fqn: &str) -> Option<Arc<ClassType>> {
        if let Some(local) = self.locals.get(fqn) {
            return Some(local.ty.clone());
        }
        if let Some(ty) = self.classpath.class_type(fqn) {
            return Some(ty);
        }
        // Explicitly imported types off the classpath are still known by name.
        self.imports
            .single
            .values()
            .any(|imported| imported == fqn)
            .then(|| Arc::new(ClassType::new(fqn, TypeKind::Class, vec![self.object_type()])))
    }

    fn resolve_simple(&self, simple: &str) -> Option<String> {
        if let Some(fqn) = self.local_simple.get(simple) {
            return Some(fqn.clone());
        }
        if let Some(fqn) = self.imports.single.get(simple) {
            return Some(fqn.clone());
        }
        let same_package = self.qualify(None, simple);
        if self.type_exists(&same_package) {
            return Some(same_package);
        }
        for package in &self.imports.on_demand {
            let candidate = format!("{package}.{simple}");
            if self.type_exists(&candidate) {
                return Some(candidate);
            }
        }
        let lang = format!("java.lang.{simple}");
        self.type_exists(&lang).then_some(lang)
    }

    /// Fully qualified name for a simple, nested or qualified type name.
    fn resolve_type_fqn(&self, name: &str) -> Option<String> {
        let Some((head, rest)) = name.split_once('.') else {
            return self.resolve_simple(name);
        };
        if let Some(outer) = self.resolve_simple(head) {
            let nested = format!("{outer}.{rest}");
            if self.type_exists(&nested) {
                return Some(nested);
            }
        }
        self.type_exists(name).then(|| name.to_string())
    }

    fn resolve_class(&self, name: &str) -> Option<Arc<ClassType>> {
        self.resolve_type_fqn(name).and_then(|fqn| self.class_type(&fqn))
    }

    fn type_of(&self, tree: &TypeTree) -> JavaType {
        match tree {
            TypeTree::Primitive(p) => JavaType::Primitive(p.primitive),
            TypeTree::Named(name) => qualified_name(name)
                .and_then(|n| self.resolve_class(&n))
                .map_or(JavaType::Unknown, JavaType::Class),
            TypeTree::Parameterized(p) => self.type_of(&TypeTree::Named(p.clazz.clone())),
            TypeTree::Array(a) => match self.type_of(&a.element) {
                JavaType::Unknown => JavaType::Unknown,
                element => JavaType::Array(Box::new(element)),
            },
            TypeTree::Wildcard(_) => JavaType::Unknown,
        }
    }

    fn is_variable(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains_key(name))
            || self.bindings.contains_key(name)
            || self.class_stack.iter().any(|c| self.field(c, name).is_some())
    }

    fn declare(&mut self, name: &str, ty: JavaType) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    fn methods(&self, owner: &Arc<ClassType>, name: &str, static_only: bool) -> Vec<Candidate> {
        let mut found = Vec::new();
        for ancestor in owner.ancestors() {
            match self.locals.get(&ancestor.fqn) {
                Some(local) => found.extend(local.methods.iter().filter(|m| m.name == name).cloned()),
                None => found.extend(self.classpath.declared_methods(&ancestor, name)),
            }
        }
        if static_only {
            found.retain(|m| m.is_static);
        }
        found
    }

    fn field(&self, owner: &Arc<ClassType>, name: &str) -> Option<FieldInfo> {
        owner.ancestors().into_iter().find_map(|ancestor| match self.locals.get(&ancestor.fqn) {
            Some(local) => local.fields.get(name).map(|(ty, is_static)| FieldInfo {
                owner: ancestor.clone(),
                ty: ty.clone(),
                is_static: *is_static,
            }),
            None => self.classpath.declared_field(&ancestor, name),
        })
    }

    fn static_import_owners(&self, member: &str) -> Vec<Arc<ClassType>> {
        let single = self
            .imports
            .static_single
            .iter()
            .filter(|(_, m)| m == member)
            .filter_map(|(owner, _)| self.class_type(owner));
        let on_demand = self
            .imports
            .static_on_demand
            .iter()
            .filter_map(|owner| self.class_type(owner));
        single.chain(on_demand).collect()
    }

    fn unqualified_candidates(&self, name: &str) -> (Vec<Candidate>, Option<JavaType>) {
        for class in self.class_stack.iter().rev() {
            let found = self.methods(class, name, false);
            if !found.is_empty() {
                return (found, Some(JavaType::Class(class.clone())));
            }
        }
        let single: Vec<Candidate> = self
            .imports
            .static_single
            .iter()
            .filter(|(_, m)| m == name)
            .filter_map(|(owner, _)| self.class_type(owner))
            .flat_map(|owner| self.methods(&owner, name, true))
            .collect();
        if !single.is_empty() {
            return (single, None);
        }
        let on_demand = self
            .imports
            .static_on_demand
            .iter()
            .filter_map(|owner| self.class_type(owner))
            .flat_map(|owner| self.methods(&owner, name, true))
            .collect();
        (on_demand, None)
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn class_declaration(&mut self, decl: &mut ClassDeclaration) {
        let outer = self.class_stack.last().map(|c| c.fqn.clone());
        let fqn = self.qualify(outer.as_deref(), &decl.name.name);
        let ty = match self.locals.get(&fqn) {
            Some(local) => local.ty.clone(),
            None => {
                // Local classes declared inside method bodies.
                let mut built = HashMap::new();
                let decls = HashMap::from([(fqn.as_str(), &*decl)]);
                self.local_names.insert(fqn.clone());
                let ty = self
                    .build_local_type(&fqn, &decls, &mut built, &mut HashSet::new())
                    .unwrap_or_else(|| Arc::new(ClassType::new(fqn.clone(), decl.kind(), Vec::new())));
                let local = self.collect_members(decl, ty.clone());
                self.locals.insert(fqn.clone(), local);
                self.local_simple.insert(decl.name.name.clone(), fqn.clone());
                ty
            }
        };

        self.annotations(&mut decl.leading_annotations);
        if let Some(extends) = &mut decl.extends {
            self.type_tree(&mut extends.element);
        }
        if let Some(implements) = &mut decl.implements {
            for tree in &mut implements.elements {
                self.type_tree(&mut tree.element);
            }
        }
        Arc::make_mut(&mut decl.name).ty = JavaType::Class(ty.clone());
        decl.ty = Some(ty.clone());

        self.class_stack.push(ty);
        self.class_body(Arc::make_mut(&mut decl.body));
        self.class_stack.pop();
    }

    fn class_body(&mut self, body: &mut Block) {
        for member in &mut body.statements {
            match &mut member.element {
                Statement::VariableDeclarations(fields) => {
                    self.variable_declarations(Arc::make_mut(fields), false);
                }
                Statement::Method(method) => self.method_declaration(Arc::make_mut(method)),
                Statement::Class(class) => self.class_declaration(Arc::make_mut(class)),
                other => self.statement(other),
            }
        }
    }

    fn method_declaration(&mut self, method: &mut MethodDeclaration) {
        self.annotations(&mut method.leading_annotations);
        let return_type = match &mut method.return_type {
            Some(tree) => self.type_tree(tree),
            None => JavaType::Primitive(Primitive::Void),
        };
        if let Some(throws) = &mut method.throws {
            for tree in &mut throws.elements {
                self.type_tree(&mut tree.element);
            }
        }

        self.scopes.push(HashMap::new());
        let mut parameter_types = Vec::with_capacity(method.parameters.len());
        for param in &mut method.parameters.elements {
            parameter_types.push(self.variable_declarations(Arc::make_mut(&mut param.element), true));
        }
        if let Some(owner) = self.class_stack.last() {
            method.method_type = Some(Arc::new(crate::tree::MethodType {
                declaring_type: owner.clone(),
                name: method.name.name.clone(),
                parameter_types,
                return_type: return_type.clone(),
                is_static: has_modifier(&method.modifiers, "static"),
                varargs: method.parameters.iter().last().is_some_and(|p| p.varargs.is_some()),
            }));
        }
        self.return_types.push(return_type);
        if let Some(body) = &mut method.body {
            self.block(Arc::make_mut(body));
        }
        self.return_types.pop();
        self.scopes.pop();
    }

    /// Attribute declarations, declaring each name in the current scope when
    /// `declare` is set. Returns the declared type.
    fn variable_declarations(&mut self, decls: &mut VariableDeclarations, declare: bool) -> JavaType {
        self.annotations(&mut decls.leading_annotations);
        let mut declared = match &mut decls.type_expr {
            Some(tree) => self.type_tree(tree),
            None => JavaType::Unknown,
        };
        if decls.varargs.is_some() && !declared.is_unknown() {
            declared = JavaType::Array(Box::new(declared));
        }
        let inferred = declared.is_unknown()
            && matches!(&decls.type_expr, Some(TypeTree::Named(Expression::Identifier(id))) if id.name == "var");

        for padded in &mut decls.variables {
            let var = Arc::make_mut(&mut padded.element);
            let mut ty = declared.clone();
            if let Some(init) = &mut var.initializer {
                let expected = (!inferred).then_some(&declared);
                self.expression(&mut init.element, expected);
                if inferred {
                    ty = init.element.ty().clone();
                }
            }
            var.ty = ty.clone();
            let name = Arc::make_mut(&mut var.name);
            name.ty = ty.clone();
            name.symbol = Some(Symbol::Variable {
                name: name.name.clone(),
                owner: None,
                ty: ty.clone(),
                is_static: false,
            });
            if declare {
                let name = name.name.clone();
                self.declare(&name, ty);
            }
        }
        declared
    }

    fn annotations(&mut self, annotations: &mut [Arc<Annotation>]) {
        for annotation in annotations {
            self.annotation(Arc::make_mut(annotation));
        }
    }

    fn annotation(&mut self, annotation: &mut Annotation) {
        let ty = qualified_name(&annotation.annotation_type).and_then(|n| self.resolve_class(&n));
        self.type_name(&mut annotation.annotation_type, ty);
        if let Some(arguments) = &mut annotation.arguments {
            for argument in &mut arguments.elements {
                match &mut argument.element {
                    // `name = value` pairs: the name is an element, not a variable.
                    Expression::Assignment(pair) => {
                        let pair = Arc::make_mut(pair);
                        self.expression(&mut pair.value, None);
                    }
                    value => self.expression(value, None),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Type trees
    // -----------------------------------------------------------------------

    fn type_tree(&mut self, tree: &mut TypeTree) -> JavaType {
        let ty = self.type_of(tree);
        match tree {
            TypeTree::Primitive(_) => {}
            TypeTree::Named(name) => self.type_name(name, ty.class().cloned()),
            TypeTree::Parameterized(p) => {
                let p = Arc::make_mut(p);
                p.ty = ty.clone();
                self.type_name(&mut p.clazz, ty.class().cloned());
                for argument in &mut p.type_arguments.elements {
                    self.type_tree(&mut argument.element);
                }
            }
            TypeTree::Array(a) => {
                let a = Arc::make_mut(a);
                a.ty = ty.clone();
                self.type_tree(&mut a.element);
            }
            TypeTree::Wildcard(w) => {
                if let Some(bounded) = &mut Arc::make_mut(w).bounded {
                    self.type_tree(bounded);
                }
            }
        }
        ty
    }

    /// Mark an `Identifier`/`FieldAccess` chain naming a type, including any
    /// outer types it is qualified with.
    fn type_name(&mut self, name: &mut Expression, ty: Option<Arc<ClassType>>) {
        let Some(ty) = ty else {
            return;
        };
        match name {
            Expression::Identifier(id) => {
                let id = Arc::make_mut(id);
                id.ty = JavaType::Class(ty.clone());
                id.symbol = Some(Symbol::Type(ty));
            }
            Expression::FieldAccess(fa) => self.qualified_type(Arc::make_mut(fa), ty),
            _ => {}
        }
    }

    /// Imported types are attributed so import edits can see their supertypes.
    fn import(&mut self, import: &mut Import) {
        let Some(ty) = import.type_name().and_then(|name| self.class_type(&name)) else {
            return;
        };
        let whole_name = !import.is_static();
        let qualid = Arc::make_mut(&mut import.qualid);
        if whole_name {
            self.qualified_type(qualid, ty);
        } else {
            self.type_name(&mut qualid.target, Some(ty));
        }
    }

    fn qualified_type(&mut self, fa: &mut FieldAccess, ty: Arc<ClassType>) {
        fa.ty = JavaType::Class(ty.clone());
        let member = Arc::make_mut(&mut fa.name.element);
        member.ty = JavaType::Class(ty.clone());
        member.symbol = Some(Symbol::Type(ty));
        let outer = qualified_name(&fa.target).and_then(|n| self.resolve_class(&n));
        self.type_name(&mut fa.target, outer);
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn block(&mut self, block: &mut Block) {
        self.with_scope(|this| {
            for statement in &mut block.statements {
                this.statement(&mut statement.element);
            }
        });
    }

    fn statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Expression(e) => self.expression(e, None),
            Statement::VariableDeclarations(v) => {
                self.variable_declarations(Arc::make_mut(v), true);
            }
            Statement::Block(b) => self.block(Arc::make_mut(b)),
            Statement::Class(c) => self.class_declaration(Arc::make_mut(c)),
            Statement::Method(m) => self.method_declaration(Arc::make_mut(m)),
            Statement::Return(r) => {
                let expected = self.return_types.last().cloned();
                if let Some(e) = &mut Arc::make_mut(r).expression {
                    self.expression(e, expected.as_ref());
                }
            }
            Statement::If(n) => {
                let n = Arc::make_mut(n);
                self.expression(&mut n.condition.tree.element, None);
                self.with_scope(|this| this.statement(&mut n.then_part.element));
                if let Some(else_part) = &mut n.else_part {
                    self.with_scope(|this| this.statement(&mut else_part.body.element));
                }
            }
            Statement::While(n) => {
                let n = Arc::make_mut(n);
                self.expression(&mut n.condition.tree.element, None);
                self.with_scope(|this| this.statement(&mut n.body.element));
            }
            Statement::For(n) => {
                let n = Arc::make_mut(n);
                self.with_scope(|this| {
                    if let Some(init) = &mut n.control.init.element {
                        this.statement(init);
                    }
                    if let Some(condition) = &mut n.control.condition.element {
                        this.expression(condition, None);
                    }
                    for update in &mut n.control.update {
                        this.expression(&mut update.element, None);
                    }
                    this.statement(&mut n.body.element);
                });
            }
            Statement::ForEach(n) => {
                let n = Arc::make_mut(n);
                self.with_scope(|this| {
                    this.expression(&mut n.control.iterable.element, None);
                    let element = match n.control.iterable.element.ty() {
                        JavaType::Array(component) => (**component).clone(),
                        JavaType::Class(_) => JavaType::Class(this.object_type()),
                        _ => JavaType::Unknown,
                    };
                    let variable = Arc::make_mut(&mut n.control.variable.element);
                    let declared = this.variable_declarations(variable, true);
                    if declared.is_unknown() {
                        for var in &variable.variables {
                            this.declare(&var.element.name.name, element.clone());
                        }
                    }
                    this.statement(&mut n.body.element);
                });
            }
            Statement::Try(n) => {
                let n = Arc::make_mut(n);
                self.with_scope(|this| {
                    for resource in n.resources.iter_mut().flat_map(|r| r.resources.iter_mut()) {
                        this.statement(&mut resource.element);
                    }
                    this.block(Arc::make_mut(&mut n.body));
                });
                for catch in &mut n.catches {
                    self.with_scope(|this| {
                        this.variable_declarations(Arc::make_mut(&mut catch.parameter.element), true);
                        this.block(Arc::make_mut(&mut catch.body));
                    });
                }
                if let Some(finally) = &mut n.finally {
                    self.block(Arc::make_mut(&mut finally.element));
                }
            }
            Statement::Throw(n) => self.expression(&mut Arc::make_mut(n).exception, None),
            Statement::DoWhile(n) => {
                let n = Arc::make_mut(n);
                self.with_scope(|this| this.statement(&mut n.body.element));
                self.expression(&mut n.condition.tree.element, None);
            }
            Statement::Switch(n) => {
                let n = Arc::make_mut(n);
                self.expression(&mut n.selector.tree.element, None);
                let selector = n.selector.tree.element.ty().class().cloned();
                // Locals declared under one label stay in scope for the labels after it.
                self.with_scope(|this| {
                    for case in &mut n.cases {
                        this.case(Arc::make_mut(case), selector.as_ref());
                    }
                });
            }
            Statement::Empty(_) | Statement::Break(_) | Statement::Continue(_) => {}
        }
    }

    fn case(&mut self, case: &mut Case, selector: Option<&Arc<ClassType>>) {
        for label in &mut case.labels {
            match (&mut label.element, selector) {
                (Expression::Identifier(id), Some(owner)) => {
                    let id = Arc::make_mut(id);
                    match self.field(owner, &id.name).filter(|f| f.is_static) {
                        Some(constant) => {
                            id.ty = constant.ty.clone();
                            id.symbol = Some(Symbol::Variable {
                                name: id.name.clone(),
                                owner: Some(constant.owner),
                                ty: constant.ty,
                                is_static: true,
                            });
                        }
                        None => self.identifier(id),
                    }
                }
                (label, _) => self.expression(label, None),
            }
        }
        match &mut case.body {
            CaseBody::Statements(statements) => {
                for statement in statements {
                    self.statement(&mut statement.element);
                }
            }
            CaseBody::Rule(body) => self.with_scope(|this| this.statement(&mut body.element)),
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expression(&mut self, expression: &mut Expression, expected: Option<&JavaType>) {
        match expression {
            Expression::Identifier(id) => self.identifier(Arc::make_mut(id)),
            Expression::Literal(literal) => {
                let literal = Arc::make_mut(literal);
                literal.ty = self.literal_type(&literal.value);
            }
            Expression::FieldAccess(fa) => self.field_access(Arc::make_mut(fa)),
            Expression::MethodInvocation(m) => self.method_invocation(Arc::make_mut(m)),
            Expression::NewClass(n) => {
                let n = Arc::make_mut(n);
                let ty = self.type_tree(&mut n.clazz);
                for argument in &mut n.arguments.elements {
                    self.expression(&mut argument.element, None);
                }
                if let Some(body) = &mut n.body {
                    let anonymous = ty.class().cloned().unwrap_or_else(|| self.object_type());
                    self.class_stack.push(anonymous);
                    self.class_body(Arc::make_mut(body));
                    self.class_stack.pop();
                }
                n.ty = ty;
            }
            Expression::NewArray(n) => {
                let n = Arc::make_mut(n);
                let mut ty = match &mut n.element_type {
                    Some(tree) => self.type_tree(tree),
                    None => expected.cloned().unwrap_or_default(),
                };
                if n.element_type.is_some() && !ty.is_unknown() {
                    for _ in 0..n.dimensions.len().max(1) {
                        ty = JavaType::Array(Box::new(ty));
                    }
                }
                for dimension in &mut n.dimensions {
                    if let Some(index) = &mut dimension.index.element {
                        self.expression(index, None);
                    }
                }
                let component = match &ty {
                    JavaType::Array(component) => Some((**component).clone()),
                    _ => None,
                };
                if let Some(initializer) = &mut n.initializer {
                    for element in &mut initializer.elements {
                        self.expression(&mut element.element, component.as_ref());
                    }
                }
                n.ty = ty;
            }
            Expression::Lambda(lambda) => self.lambda(Arc::make_mut(lambda), expected),
            Expression::MemberReference(reference) => {
                let reference = Arc::make_mut(reference);
                self.expression(&mut reference.containing, None);
                reference.ty = expected.filter(|t| t.is_functional()).cloned().unwrap_or_default();
            }
            Expression::Binary(binary) => {
                let binary = Arc::make_mut(binary);
                self.expression(&mut binary.left, None);
                if binary.operator.element == BinaryOp::InstanceOf {
                    let ty = qualified_name(&binary.right).and_then(|n| self.resolve_class(&n));
                    self.type_name(&mut binary.right, ty);
                } else {
                    self.expression(&mut binary.right, None);
                }
                binary.ty = self.binary_type(binary.operator.element, binary.left.ty(), binary.right.ty());
            }
            Expression::Unary(unary) => {
                let unary = Arc::make_mut(unary);
                self.expression(&mut unary.expression, None);
                unary.ty = match unary.operator.element {
                    UnaryOp::Not => JavaType::Primitive(Primitive::Boolean),
                    UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                        unary.expression.ty().clone()
                    }
                    _ => unboxed(unary.expression.ty())
                        .filter(|p| p.is_numeric())
                        .map_or(JavaType::Unknown, |p| JavaType::Primitive(promote(p, Primitive::Int))),
                };
            }
            Expression::Assignment(assignment) => {
                let assignment = Arc::make_mut(assignment);
                self.expression(&mut assignment.variable, None);
                let target = assignment.variable.ty().clone();
                self.expression(&mut assignment.value, Some(&target));
                assignment.ty = target;
            }
            Expression::Ternary(ternary) => {
                let ternary = Arc::make_mut(ternary);
                self.expression(&mut ternary.condition, None);
                self.expression(&mut ternary.true_part.element, expected);
                self.expression(&mut ternary.false_part.element, expected);
                ternary.ty = conditional_type(ternary.true_part.element.ty(), ternary.false_part.element.ty());
            }
            Expression::Parentheses(parens) => {
                self.expression(&mut Arc::make_mut(parens).tree.element, expected);
            }
            Expression::ArrayAccess(access) => {
                let access = Arc::make_mut(access);
                self.expression(&mut access.indexed, None);
                if let Some(index) = &mut access.dimension.index.element {
                    self.expression(index, None);
                }
                access.ty = match access.indexed.ty() {
                    JavaType::Array(component) => (**component).clone(),
                    _ => JavaType::Unknown,
                };
            }
            Expression::TypeCast(cast) => {
                let cast = Arc::make_mut(cast);
                cast.ty = self.type_tree(&mut cast.clazz.element);
                self.expression(&mut cast.expression, None);
            }
        }
    }

    fn literal_type(&self, value: &LiteralValue) -> JavaType {
        match value {
            LiteralValue::Null => JavaType::Primitive(Primitive::Null),
            LiteralValue::Boolean(_) => JavaType::Primitive(Primitive::Boolean),
            LiteralValue::Char(_) => JavaType::Primitive(Primitive::Char),
            LiteralValue::Int(_) => JavaType::Primitive(Primitive::Int),
            LiteralValue::Long(_) => JavaType::Primitive(Primitive::Long),
            LiteralValue::Float(_) => JavaType::Primitive(Primitive::Float),
            LiteralValue::Double(_) => JavaType::Primitive(Primitive::Double),
            LiteralValue::String(_) => self.classpath.resolve_type_name("java.lang.String"),
        }
    }

    fn binary_type(&self, op: BinaryOp, left: &JavaType, right: &JavaType) -> JavaType {
        use BinaryOp::*;
        let boolean = JavaType::Primitive(Primitive::Boolean);
        match op {
            Or | And | Equal | NotEqual | LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual
            | InstanceOf => boolean,
            Addition if [left, right].iter().any(|t| t.fqn() == Some("java.lang.String")) => {
                self.classpath.resolve_type_name("java.lang.String")
            }
            BitAnd | BitOr | BitXor if unboxed(left) == Some(Primitive::Boolean) => boolean,
            ShiftLeft | ShiftRight | UnsignedShiftRight => unboxed(left)
                .filter(|p| p.is_numeric())
                .map_or(JavaType::Unknown, |p| JavaType::Primitive(promote(p, Primitive::Int))),
            _ => match (unboxed(left), unboxed(right)) {
                (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => JavaType::Primitive(promote(a, b)),
                _ => JavaType::Unknown,
            },
        }
    }

    fn identifier(&mut self, id: &mut Identifier) {
        let (ty, symbol) = self.resolve_identifier(&id.name);
        id.ty = ty;
        id.symbol = symbol;
    }

    fn resolve_identifier(&self, name: &str) -> (JavaType, Option<Symbol>) {
        let variable = |ty: JavaType, owner: Option<Arc<ClassType>>, is_static: bool| {
            let symbol = Symbol::Variable {
                name: name.to_string(),
                owner,
                ty: ty.clone(),
                is_static,
            };
            (ty, Some(symbol))
        };

        match name {
            "this" => {
                return self
                    .class_stack
                    .last()
                    .map_or((JavaType::Unknown, None), |c| (JavaType::Class(c.clone()), None));
            }
            "super" => {
                let parent = self.class_stack.last().and_then(|c| c.supertypes.first().cloned());
                return parent.map_or((JavaType::Unknown, None), |c| (JavaType::Class(c), None));
            }
            _ => {}
        }
        if let Some(ty) = self.scopes.iter().rev().find_map(|s| s.get(name)) {
            return variable(ty.clone(), None, false);
        }
        if let Some(ty) = self.bindings.get(name) {
            return variable(ty.clone(), None, false);
        }
        for class in self.class_stack.iter().rev() {
            if let Some(field) = self.field(class, name) {
                return variable(field.ty, Some(field.owner), field.is_static);
            }
        }
        for owner in self.static_import_owners(name) {
            if let Some(field) = self.field(&owner, name).filter(|f| f.is_static) {
                return variable(field.ty, Some(field.owner), true);
            }
        }
        match self.resolve_class(name) {
            Some(ty) => (JavaType::Class(ty.clone()), Some(Symbol::Type(ty))),
            None => (JavaType::Unknown, None),
        }
    }

    fn field_access(&mut self, fa: &mut FieldAccess) {
        let leftmost_is_variable = leftmost_name(&fa.target).is_some_and(|n| self.is_variable(n));
        if !leftmost_is_variable {
            let dotted = qualified_name(&fa.target).map(|t| format!("{t}.{}", fa.name.element.name));
            if let Some(ty) = dotted.and_then(|d| self.resolve_class(&d)) {
                self.qualified_type(fa, ty);
                return;
            }
        }

        self.expression(&mut fa.target, None);
        let name = fa.name.element.name.clone();
        let mut symbol = None;
        let ty = if name == "class" {
            self.classpath.resolve_type_name("java.lang.Class")
        } else if name == "length" && fa.target.ty().is_array() {
            JavaType::Primitive(Primitive::Int)
        } else {
            let (owner, static_only) = match type_symbol(&fa.target) {
                Some(ty) => (Some(ty), true),
                None => (fa.target.ty().class().cloned(), false),
            };
            match owner.and_then(|o| self.field(&o, &name)) {
                Some(field) if field.is_static || !static_only => {
                    symbol = Some(Symbol::Variable {
                        name: name.clone(),
                        owner: Some(field.owner),
                        ty: field.ty.clone(),
                        is_static: field.is_static,
                    });
                    field.ty
                }
                _ => JavaType::Unknown,
            }
        };
        let member = Arc::make_mut(&mut fa.name.element);
        member.ty = ty.clone();
        member.symbol = symbol;
        fa.ty = ty;
    }

    fn method_invocation(&mut self, m: &mut MethodInvocation) {
        let name = m.name.name.clone();
        let (candidates, receiver) = match &mut m.select {
            Some(select) => {
                self.expression(&mut select.element, None);
                match type_symbol(&select.element) {
                    Some(owner) => (self.methods(&owner, &name, true), None),
                    None => match select.element.ty() {
                        JavaType::Class(owner) => {
                            (self.methods(owner, &name, false), Some(select.element.ty().clone()))
                        }
                        JavaType::Array(_) => (self.methods(&self.object_type(), &name, false), None),
                        _ => (Vec::new(), None),
                    },
                }
            }
            None => self.unqualified_candidates(&name),
        };

        let mut shapes = Vec::with_capacity(m.arguments.len());
        for argument in &mut m.arguments.elements {
            match &argument.element {
                Expression::Lambda(_) | Expression::MemberReference(_) => shapes.push(ArgShape::Functional),
                _ => {
                    self.expression(&mut argument.element, None);
                    shapes.push(ArgShape::Typed(argument.element.ty().clone()));
                }
            }
        }

        let method_type = select_overload(&candidates, &shapes).map(|c| c.method_type(receiver.as_ref()));
        if method_type.is_none() {
            trace!(method = %name, candidates = candidates.len(), "invocation left unattributed");
        }
        for (index, argument) in m.arguments.elements.iter_mut().enumerate() {
            if matches!(argument.element, Expression::Lambda(_) | Expression::MemberReference(_)) {
                let expected = method_type.as_ref().and_then(|mt| parameter_at(mt, index));
                self.expression(&mut argument.element, expected.as_ref());
            }
        }
        m.method_type = method_type.map(Arc::new);
    }

    fn lambda(&mut self, lambda: &mut Lambda, expected: Option<&JavaType>) {
        lambda.ty = expected.filter(|t| t.is_functional()).cloned().unwrap_or_default();
        self.with_scope(|this| {
            for param in &mut lambda.parameters.elements {
                this.variable_declarations(Arc::make_mut(&mut param.element), true);
            }
            match &mut lambda.body {
                LambdaBody::Expression(e) => this.expression(e, None),
                LambdaBody::Block(b) => {
                    this.return_types.push(JavaType::Unknown);
                    this.block(Arc::make_mut(b));
                    this.return_types.pop();
                }
            }
        });
    }
}

fn collect_declarations<'t>(decl: &'t ClassDeclaration, fqn: String, out: &mut Vec<Declared<'t>>) {
    for member in decl.body.statements.iter().map(|p| &p.element) {
        if let Statement::Class(nested) = member {
            collect_declarations(nested, format!("{fqn}.{}", nested.name.name), out);
        }
    }
    out.push(Declared { fqn, decl });
}

fn supertype_names(decl: &ClassDeclaration) -> Vec<String> {
    let extends = decl.extends.iter().map(|e| &e.element);
    let implements = decl.implements.iter().flat_map(|c| c.iter());
    extends.chain(implements).filter_map(type_tree_name).collect()
}

fn type_tree_name(tree: &TypeTree) -> Option<String> {
    match tree {
        TypeTree::Named(name) => qualified_name(name),
        TypeTree::Parameterized(p) => qualified_name(&p.clazz),
        _ => None,
    }
}

fn has_modifier(modifiers: &[Modifier], keyword: &str) -> bool {
    modifiers.iter().any(|m| m.keyword == keyword)
}

fn leftmost_name(expression: &Expression) -> Option<&str> {
    match expression {
        Expression::Identifier(id) => Some(&id.name),
        Expression::FieldAccess(fa) => leftmost_name(&fa.target),
        _ => None,
    }
}

/// The type a name expression refers to, when it names a type rather than a
/// value.
pub(crate) fn type_symbol(expression: &Expression) -> Option<Arc<ClassType>> {
    let symbol = match expression {
        Expression::Identifier(id) => id.symbol.as_ref(),
        Expression::FieldAccess(fa) => fa.name.element.symbol.as_ref(),
        _ => None,
    };
    match symbol {
        Some(Symbol::Type(ty)) => Some(ty.clone()),
        _ => None,
    }
}

fn parameter_at(method: &crate::tree::MethodType, index: usize) -> Option<JavaType> {
    let last = method.parameter_types.len().checked_sub(1)?;
    if method.varargs && index >= last {
        return match &method.parameter_types[last] {
            JavaType::Array(component) => Some((**component).clone()),
            other => Some(other.clone()),
        };
    }
    method.parameter_types.get(index).cloned()
}

fn unboxed(ty: &JavaType) -> Option<Primitive> {
    match ty {
        JavaType::Primitive(p) => Some(*p),
        JavaType::Class(c) => Primitive::unboxed(&c.fqn),
        _ => None,
    }
}

/// Binary numeric promotion (JLS 5.6.2).
fn promote(a: Primitive, b: Primitive) -> Primitive {
    use Primitive::*;
    if a == Double || b == Double {
        Double
    } else if a == Float || b == Float {
        Float
    } else if a == Long || b == Long {
        Long
    } else {
        Int
    }
}

fn conditional_type(a: &JavaType, b: &JavaType) -> JavaType {
    match (a, b) {
        (JavaType::Primitive(Primitive::Null), other) | (other, JavaType::Primitive(Primitive::Null)) => other.clone(),
        (a, b) if a == b => a.clone(),
        _ => match (unboxed(a), unboxed(b)) {
            (Some(x), Some(y)) if x.is_numeric() && y.is_numeric() => JavaType::Primitive(promote(x, y)),
            _ => a.clone(),
        },
    }
}
