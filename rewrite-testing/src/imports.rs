//! Import edits queued during a visit and applied once per unit.
//!
//! Rules never edit the import list directly. They queue intents through
//! [`VisitCx::maybe_add_import`](crate::visitor::VisitCx::maybe_add_import)
//! and [`VisitCx::maybe_remove_import`](crate::visitor::VisitCx::maybe_remove_import);
//! after the traversal [`finalize`] checks the intents against the symbols the
//! final tree actually references.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::ExecutionContext;
use crate::tree::{
    package_of, ClassType, CompilationUnit, Expression, FieldAccess, Id, Identifier, Import, JavaType, LeftPadded,
    MethodInvocation, Padded, Space, Symbol,
};
use crate::visitor::{visit, walk_method_invocation, JavaVisitor, VisitCx};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddImport {
    pub type_name: String,
    /// Static member, `None` for a type import.
    pub member: Option<String>,
    pub only_if_referenced: bool,
}

impl AddImport {
    pub fn name(&self) -> String {
        match &self.member {
            Some(member) => format!("{}.{member}", self.type_name),
            None => self.type_name.clone(),
        }
    }
}

/// Add and remove intents for one unit, in request order.
#[derive(Debug, Clone, Default)]
pub struct ImportRequests {
    adds: Vec<AddImport>,
    removes: Vec<String>,
}

impl ImportRequests {
    pub fn add(&mut self, type_name: &str, member: Option<&str>, only_if_referenced: bool) {
        let request = AddImport {
            type_name: type_name.to_string(),
            member: member.map(str::to_string),
            only_if_referenced,
        };
        if !self.adds.contains(&request) {
            self.adds.push(request);
        }
    }

    pub fn remove(&mut self, name: &str) {
        if !self.removes.iter().any(|r| r == name) {
            self.removes.push(name.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }

    pub fn adds(&self) -> &[AddImport] {
        &self.adds
    }

    pub fn removes(&self) -> &[String] {
        &self.removes
    }
}

/// Symbols the unit uses without qualification.
#[derive(Debug, Default)]
struct References {
    types: HashMap<String, Arc<ClassType>>,
    /// `(declaring type, member)` of unqualified static fields and calls.
    statics: Vec<(Arc<ClassType>, String)>,
}

impl References {
    fn collect(cu: &Arc<CompilationUnit>, ctx: &ExecutionContext) -> Self {
        let mut collector = CollectReferences::default();
        let mut cx = VisitCx::new(ctx, "imports");
        visit(&mut collector, cu, &mut cx);
        collector.0
    }

    fn uses_type(&self, fqn: &str) -> bool {
        self.types.contains_key(fqn)
    }

    fn static_uses<'r>(
        &'r self,
        type_name: &'r str,
        owner: Option<&'r Arc<ClassType>>,
    ) -> impl Iterator<Item = &'r str> + 'r {
        self.statics
            .iter()
            .filter(move |(declaring, _)| {
                declaring.fqn == type_name || owner.is_some_and(|o| o.is_subtype_of(&declaring.fqn))
            })
            .map(|(_, member)| member.as_str())
    }
}

#[derive(Default)]
struct CollectReferences(References);

impl JavaVisitor for CollectReferences {
    fn visit_identifier(&mut self, identifier: &Arc<Identifier>, _cx: &mut VisitCx) -> Expression {
        match &identifier.symbol {
            Some(Symbol::Type(ty)) => {
                self.0.types.entry(ty.fqn.clone()).or_insert_with(|| ty.clone());
            }
            Some(Symbol::Variable {
                owner: Some(owner),
                is_static: true,
                name,
                ..
            }) => self.0.statics.push((owner.clone(), name.clone())),
            _ => {}
        }
        Expression::Identifier(identifier.clone())
    }

    fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
        if let (None, Some(method)) = (&invocation.select, &invocation.method_type) {
            if method.is_static {
                self.0.statics.push((method.declaring_type.clone(), method.name.clone()));
            }
        }
        Expression::MethodInvocation(walk_method_invocation(self, invocation, cx))
    }
}

/// Apply `requests` to `cu`: adds first, then removes, so a removal sees the
/// imports added in the same pass.
pub(crate) fn finalize(
    cu: &Arc<CompilationUnit>,
    requests: &ImportRequests,
    ctx: &ExecutionContext,
) -> Arc<CompilationUnit> {
    if requests.is_empty() {
        return cu.clone();
    }
    let references = References::collect(cu, ctx);
    let mut edit = ImportEdit {
        imports: cu.imports.clone(),
        package: cu.package_name(),
        class_prefix: cu.classes.first().map(|c| c.prefix.clone()),
        changed: false,
    };
    for add in requests.adds() {
        edit.add(add, &references);
    }
    for name in requests.removes() {
        edit.remove(name, &references);
    }
    if !edit.changed {
        return cu.clone();
    }

    let mut classes = cu.classes.clone();
    if let (Some(first), Some(prefix)) = (classes.first_mut(), edit.class_prefix) {
        if first.prefix != prefix {
            *first = Arc::new(first.with_prefix(prefix));
        }
    }
    Arc::new(CompilationUnit {
        imports: edit.imports,
        classes,
        ..(**cu).clone()
    })
}

struct ImportEdit {
    imports: Vec<Padded<Arc<Import>>>,
    package: Option<String>,
    class_prefix: Option<Space>,
    changed: bool,
}

impl ImportEdit {
    fn add(&mut self, add: &AddImport, references: &References) {
        if add.member.is_none() && self.implicitly_visible(&add.type_name) {
            return;
        }
        if self.covers(add) {
            return;
        }
        let referenced = match &add.member {
            Some(member) => references.static_uses(&add.type_name, None).any(|m| m == member),
            None => references.uses_type(&add.type_name),
        };
        if add.only_if_referenced && !referenced {
            debug!(import = %add.name(), "not referenced, skipping add");
            return;
        }
        debug!(import = %add.name(), "adding import");
        self.insert(import_node(&add.name(), add.member.is_some()));
    }

    /// `java.lang` and same-package top-level types need no import.
    fn implicitly_visible(&self, type_name: &str) -> bool {
        let package = package_of(type_name);
        let top_level = !package.is_empty() && !type_name[package.len() + 1..].contains('.');
        top_level && (package == "java.lang" || self.package.as_deref() == Some(package.as_str()))
    }

    fn covers(&self, add: &AddImport) -> bool {
        self.imports.iter().map(|p| &p.element).any(|import| match &add.member {
            Some(member) => {
                import.is_static()
                    && import.type_name().as_deref() == Some(add.type_name.as_str())
                    && matches!(import.member(), Some(m) if m == member || m == "*")
            }
            None => {
                !import.is_static()
                    && if import.is_wildcard() {
                        import.package_name() == package_of(&add.type_name)
                    } else {
                        import.name() == add.type_name
                    }
            }
        })
    }

    fn insert(&mut self, node: Padded<Arc<Import>>) {
        let is_static = node.element.is_static();
        let name = node.element.name();
        let group: Vec<usize> = (0..self.imports.len())
            .filter(|&i| self.imports[i].element.is_static() == is_static)
            .collect();
        let position = match group.iter().find(|&&i| self.imports[i].element.name() > name) {
            Some(&i) => i,
            None => match group.last() {
                Some(&i) => i + 1,
                None if is_static => self.imports.len(),
                None => self
                    .imports
                    .iter()
                    .position(|p| p.element.is_static())
                    .unwrap_or(self.imports.len()),
            },
        };

        let prefix = if self.imports.is_empty() {
            self.first_import_prefix()
        } else if group.first() == Some(&position) || (group.is_empty() && position < self.imports.len()) {
            // The new import leads its group; the old leader moves down.
            let displaced = self.imports[position].element.prefix.clone();
            let separator = if group.is_empty() { "\n\n" } else { "\n" };
            self.set_prefix(position, Space::new(separator));
            displaced
        } else if group.is_empty() {
            Space::new("\n\n")
        } else {
            Space::new("\n")
        };
        self.imports.insert(position, with_prefix(&node, prefix));
        self.changed = true;
    }

    /// Prefix for the first import of a unit that had none; the first class
    /// moves down behind a blank line.
    fn first_import_prefix(&mut self) -> Space {
        let class_prefix = self.class_prefix.clone().unwrap_or_default();
        if self.package.is_some() {
            if !class_prefix.has_blank_line() {
                self.class_prefix = Some(Space::new(format!("\n{}", class_prefix.as_str())));
            }
            Space::new("\n\n")
        } else {
            self.class_prefix = Some(Space::new("\n\n"));
            class_prefix
        }
    }

    fn remove(&mut self, name: &str, references: &References) {
        let as_type = self
            .imports
            .iter()
            .any(|p| p.element.type_name().as_deref() == Some(name));
        let mut i = 0;
        while i < self.imports.len() {
            let import = self.imports[i].element.clone();
            let unused = if as_type {
                self.type_import_unused(&import, name, references)
            } else if let Some(package) = name.strip_suffix(".*").filter(|_| !import.is_static()) {
                import.is_wildcard()
                    && import.package_name() == package
                    && !self.package_wildcard_needed(&import, references)
            } else {
                self.member_import_unused(&import, name, references)
            };
            if unused {
                debug!(import = %import.name(), "removing import");
                self.drop_at(i);
            } else {
                i += 1;
            }
        }
    }

    fn type_import_unused(&self, import: &Import, type_name: &str, references: &References) -> bool {
        if import.type_name().as_deref() != Some(type_name) {
            return !import.is_static()
                && import.is_wildcard()
                && import.package_name() == package_of(type_name)
                && !self.package_wildcard_needed(import, references);
        }
        if import.is_static() {
            !self.static_needed(import, references)
        } else {
            !references.uses_type(type_name)
        }
    }

    fn member_import_unused(&self, import: &Import, name: &str, references: &References) -> bool {
        let Some((type_name, member)) = name.rsplit_once('.') else {
            return false;
        };
        import.is_static()
            && import.member() == Some(member)
            && import.type_name().as_deref() == Some(type_name)
            && !self.static_needed(import, references)
    }

    /// A static import is needed while a member it provides is used; a
    /// static wildcard only for members no single import provides.
    fn static_needed(&self, import: &Import, references: &References) -> bool {
        let Some(type_name) = import.type_name() else {
            return true;
        };
        let owner = import_owner(import);
        let mut uses = references.static_uses(&type_name, owner.as_ref());
        match import.member() {
            Some("*") => uses.any(|member| !self.has_single_static(member)),
            Some(member) => uses.any(|m| m == member),
            None => true,
        }
    }

    fn has_single_static(&self, member: &str) -> bool {
        self.imports
            .iter()
            .any(|p| p.element.is_static() && p.element.member() == Some(member))
    }

    fn package_wildcard_needed(&self, import: &Import, references: &References) -> bool {
        let package = import.package_name();
        references.types.values().any(|ty| {
            ty.package_name() == package
                && !self
                    .imports
                    .iter()
                    .any(|p| !p.element.is_static() && p.element.name() == ty.fqn)
        })
    }

    /// Remove the import at `index`. A removed group leader hands its prefix
    /// to the next import; the last import hands it to the first class.
    fn drop_at(&mut self, index: usize) {
        let removed = self.imports.remove(index);
        let prefix = removed.element.prefix.clone();
        if index < self.imports.len() {
            if index == 0 || prefix.has_blank_line() {
                let merged = prefix.absorb(&self.imports[index].element.prefix);
                self.set_prefix(index, merged);
            }
        } else if self.imports.is_empty() && self.package.is_none() {
            self.class_prefix = self.class_prefix.as_ref().map(|class| prefix.absorb(class));
        }
        self.changed = true;
    }

    fn set_prefix(&mut self, index: usize, prefix: Space) {
        let updated = with_prefix(&self.imports[index], prefix);
        self.imports[index] = updated;
    }
}

fn import_owner(import: &Import) -> Option<Arc<ClassType>> {
    import.qualid.target.ty().class().cloned()
}

fn with_prefix(import: &Padded<Arc<Import>>, prefix: Space) -> Padded<Arc<Import>> {
    import.with_element(Arc::new(Import {
        prefix,
        ..(*import.element).clone()
    }))
}

/// `import [static] <name>;` with single spaces.
fn import_node(name: &str, is_static: bool) -> Padded<Arc<Import>> {
    let mut segments = name.split('.');
    let mut qualid = Expression::Identifier(Arc::new(Identifier::new(
        Space::EMPTY,
        segments.next().unwrap_or_default(),
    )));
    for segment in segments {
        qualid = Expression::FieldAccess(Arc::new(FieldAccess {
            id: Id::next(),
            prefix: Space::EMPTY,
            target: qualid,
            name: LeftPadded::new(Arc::new(Identifier::new(Space::EMPTY, segment))),
            ty: JavaType::Unknown,
        }));
    }
    let qualid = match qualid.with_prefix(Space::single()) {
        Expression::FieldAccess(fa) => fa,
        // A single segment only reaches here for malformed requests.
        other => Arc::new(FieldAccess {
            id: Id::next(),
            prefix: Space::single(),
            target: other,
            name: LeftPadded::new(Arc::new(Identifier::new(Space::EMPTY, "*"))),
            ty: JavaType::Unknown,
        }),
    };
    Padded::new(Arc::new(Import {
        id: Id::next(),
        prefix: Space::EMPTY,
        static_prefix: is_static.then(Space::single),
        qualid,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::JavaParser;

    fn parse(source: &str) -> (ExecutionContext, Arc<CompilationUnit>) {
        let ctx = ExecutionContext::new();
        let parser = JavaParser::builder()
            .classpath_from_resources(&ctx, &["junit-jupiter-api-5.9", "assertj-core-3.24", "mockito-core-5"])
            .build()
            .unwrap();
        let cu = parser.parse("ImportTest.java", source).unwrap();
        (ctx, cu)
    }

    fn apply(source: &str, requests: impl FnOnce(&mut ImportRequests)) -> String {
        let (ctx, cu) = parse(source);
        let mut queued = ImportRequests::default();
        requests(&mut queued);
        finalize(&cu, &queued, &ctx).print()
    }

    #[test]
    fn requests_are_deduplicated() {
        let mut requests = ImportRequests::default();
        requests.add("a.B", None, true);
        requests.add("a.B", None, true);
        requests.remove("a.C");
        requests.remove("a.C");
        assert_eq!(requests.adds().len(), 1);
        assert_eq!(requests.removes().len(), 1);
    }

    #[test]
    fn unused_static_import_is_removed() {
        let source = "package p;\n\nimport static org.junit.jupiter.api.Assertions.assertEquals;\n\nclass A {\n}\n";
        let out = apply(source, |r| r.remove("org.junit.jupiter.api.Assertions"));
        assert_eq!(out, "package p;\n\nclass A {\n}\n");
    }

    #[test]
    fn used_static_import_is_kept() {
        let source = "import static org.junit.jupiter.api.Assertions.assertEquals;\n\nclass A {\n  void t() { assertEquals(1, 2); }\n}\n";
        let out = apply(source, |r| r.remove("org.junit.jupiter.api.Assertions"));
        assert_eq!(out, source);
    }

    #[test]
    fn static_import_is_added_in_order() {
        let source = "import java.util.List;\n\nimport static org.junit.jupiter.api.Assertions.assertEquals;\n\nclass A {\n  List<String> l;\n  void t() { assertEquals(1, 2); }\n}\n";
        let out = apply(source, |r| r.add("org.assertj.core.api.Assertions", Some("assertThat"), false));
        assert_eq!(
            out,
            "import java.util.List;\n\nimport static org.assertj.core.api.Assertions.assertThat;\nimport static org.junit.jupiter.api.Assertions.assertEquals;\n\nclass A {\n  List<String> l;\n  void t() { assertEquals(1, 2); }\n}\n"
        );
    }

    #[test]
    fn first_import_after_package_gets_blank_line() {
        let source = "package p;\n\nclass A {\n}\n";
        let out = apply(source, |r| r.add("org.assertj.core.api.Assertions", Some("assertThat"), false));
        assert_eq!(
            out,
            "package p;\n\nimport static org.assertj.core.api.Assertions.assertThat;\n\nclass A {\n}\n"
        );
    }

    #[test]
    fn statics_follow_regular_imports() {
        let source = "import java.util.List;\n\nclass A {\n  List<String> l;\n}\n";
        let out = apply(source, |r| r.add("org.assertj.core.api.Assertions", Some("within"), false));
        assert_eq!(
            out,
            "import java.util.List;\n\nimport static org.assertj.core.api.Assertions.within;\n\nclass A {\n  List<String> l;\n}\n"
        );
    }

    #[test]
    fn unreferenced_add_is_skipped() {
        let source = "class A {\n}\n";
        let out = apply(source, |r| r.add("org.assertj.core.api.Assertions", Some("assertThat"), true));
        assert_eq!(out, source);
    }

    #[test]
    fn java_lang_is_never_imported() {
        let source = "class A {\n  String s;\n}\n";
        let out = apply(source, |r| r.add("java.lang.String", None, false));
        assert_eq!(out, source);
    }

    #[test]
    fn static_wildcard_kept_while_member_used() {
        let source = "import static org.mockito.Mockito.*;\n\nclass A {\n  void t() { Object o = any(); }\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.Mockito"));
        assert_eq!(out, source);
    }

    #[test]
    fn static_wildcard_removed_when_unused() {
        let source = "import java.util.List;\nimport static org.mockito.Mockito.*;\n\nclass A {\n  List<String> l;\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.Mockito"));
        assert_eq!(out, "import java.util.List;\n\nclass A {\n  List<String> l;\n}\n");
    }

    #[test]
    fn package_wildcard_removed_by_name() {
        let source = "import java.util.List;\nimport org.mockito.*;\n\nclass A {\n  List<String> l;\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.*"));
        assert_eq!(out, "import java.util.List;\n\nclass A {\n  List<String> l;\n}\n");
    }

    #[test]
    fn member_removal_targets_single_import() {
        let source = "import static org.mockito.Mockito.mock;\nimport static org.mockito.Mockito.verify;\n\nclass A {\n  void t() { mock(Object.class); }\n}\n";
        let out = apply(source, |r| {
            r.remove("org.mockito.Mockito.mock");
            r.remove("org.mockito.Mockito.verify");
        });
        assert_eq!(
            out,
            "import static org.mockito.Mockito.mock;\n\nclass A {\n  void t() { mock(Object.class); }\n}\n"
        );
    }

    #[test]
    fn removed_leader_hands_prefix_to_next() {
        let source = "// header\nimport org.mockito.Mock;\nimport java.util.List;\n\nclass A {\n  List<String> l;\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.Mock"));
        assert_eq!(out, "// header\nimport java.util.List;\n\nclass A {\n  List<String> l;\n}\n");
    }

    #[test]
    fn removing_every_import_keeps_header() {
        let source = "// header\nimport org.mockito.Mock;\n\nclass A {\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.Mock"));
        assert_eq!(out, "// header\nclass A {\n}\n");
    }

    #[test]
    fn removing_every_import_keeps_class_comments() {
        let source = "import org.mockito.Mock;\n\n/** Docs. */\nclass A {\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.Mock"));
        assert_eq!(out, "/** Docs. */\nclass A {\n}\n");
    }

    #[test]
    fn removed_leader_keeps_comment_of_next() {
        let source = "import org.mockito.Mock;\n// lists\nimport java.util.List;\n\nclass A {\n  List<String> l;\n}\n";
        let out = apply(source, |r| r.remove("org.mockito.Mock"));
        assert_eq!(out, "// lists\nimport java.util.List;\n\nclass A {\n  List<String> l;\n}\n");
    }
}
