//! Type stubs standing in for the jars a test source compiles against.
//!
//! Stubs ship as YAML resources bundled into the binary and are selected by
//! name. `java-base` is always part of a classpath.

mod resolve;

pub use resolve::{select_overload, ArgShape, Candidate, ReturnType};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::ClasspathError;
use crate::tree::{ClassType, JavaType, MethodType, Primitive, TypeKind};

pub const JAVA_BASE: &str = "java-base";

const RESOURCES: &[(&str, &str)] = &[
    (JAVA_BASE, include_str!("../../resources/classpath/java-base.yml")),
    (
        "junit-jupiter-api-5.9",
        include_str!("../../resources/classpath/junit-jupiter-api-5.9.yml"),
    ),
    ("junit-4.13", include_str!("../../resources/classpath/junit-4.13.yml")),
    (
        "assertj-core-3.24",
        include_str!("../../resources/classpath/assertj-core-3.24.yml"),
    ),
    (
        "mockito-core-5",
        include_str!("../../resources/classpath/mockito-core-5.yml"),
    ),
];

#[derive(Debug, Clone, Deserialize)]
pub struct TypeStub {
    pub fqn: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub functional: bool,
    #[serde(default)]
    pub methods: Vec<MethodStub>,
    #[serde(default)]
    pub fields: Vec<FieldStub>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodStub {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    /// Type name, `void`, or `SELF` for the receiver's own type.
    #[serde(default = "void")]
    pub returns: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub varargs: bool,
}

fn void() -> String {
    "void".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldStub {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

#[derive(Debug, Deserialize)]
struct Resource {
    types: Vec<TypeStub>,
}

/// A resolved field: declaring type, field type, static flag.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub owner: Arc<ClassType>,
    pub ty: JavaType,
    pub is_static: bool,
}

#[derive(Debug)]
pub struct Classpath {
    key: String,
    stubs: HashMap<String, TypeStub>,
    class_types: HashMap<String, Arc<ClassType>>,
}

impl Classpath {
    /// Names of every bundled resource.
    pub fn resource_names() -> Vec<&'static str> {
        RESOURCES.iter().map(|(name, _)| *name).collect()
    }

    /// Load bundled resources by name; `java-base` is implied.
    pub fn from_resources<S: AsRef<str>>(names: &[S]) -> Result<Self, ClasspathError> {
        let mut selected: Vec<&str> = vec![JAVA_BASE];
        for name in names {
            let name = name.as_ref();
            if !selected.contains(&name) {
                selected.push(name);
            }
        }

        let mut stubs = Vec::new();
        for name in &selected {
            let (_, text) = RESOURCES
                .iter()
                .find(|(resource, _)| resource == name)
                .ok_or_else(|| ClasspathError::UnknownResource {
                    name: name.to_string(),
                    known: Self::resource_names().iter().map(|s| s.to_string()).collect(),
                })?;
            let resource: Resource =
                serde_yaml::from_str(text).map_err(|source| ClasspathError::InvalidResource {
                    name: name.to_string(),
                    source,
                })?;
            debug!(resource = %name, types = resource.types.len(), "loaded classpath resource");
            stubs.extend(resource.types);
        }
        Self::from_stubs(selected.join("+"), stubs)
    }

    pub fn from_stubs(key: impl Into<String>, stubs: Vec<TypeStub>) -> Result<Self, ClasspathError> {
        let mut by_name = HashMap::with_capacity(stubs.len());
        for stub in stubs {
            if by_name.contains_key(&stub.fqn) {
                return Err(ClasspathError::DuplicateType(stub.fqn));
            }
            by_name.insert(stub.fqn.clone(), stub);
        }

        let mut class_types = HashMap::with_capacity(by_name.len());
        let mut in_progress = HashSet::new();
        for fqn in by_name.keys() {
            build_class_type(fqn, &by_name, &mut class_types, &mut in_progress);
        }

        Ok(Self {
            key: key.into(),
            stubs: by_name,
            class_types,
        })
    }

    /// Identifies the resource selection, for cache keys.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.stubs.contains_key(fqn)
    }

    pub fn class_type(&self, fqn: &str) -> Option<Arc<ClassType>> {
        self.class_types.get(fqn).cloned()
    }

    pub fn object_type(&self) -> Option<Arc<ClassType>> {
        self.class_type("java.lang.Object")
    }

    /// Type of a stub type name: primitives, `T[]`, fully qualified classes.
    pub fn resolve_type_name(&self, name: &str) -> JavaType {
        if let Some(component) = name.strip_suffix("[]") {
            return match self.resolve_type_name(component) {
                JavaType::Unknown => JavaType::Unknown,
                resolved => JavaType::Array(Box::new(resolved)),
            };
        }
        if let Some(primitive) = Primitive::from_keyword(name) {
            return JavaType::Primitive(primitive);
        }
        self.class_type(name).map_or(JavaType::Unknown, JavaType::Class)
    }

    /// Methods named `name` declared directly on `owner`.
    pub fn declared_methods(&self, owner: &Arc<ClassType>, name: &str) -> Vec<Candidate> {
        let Some(stub) = self.stubs.get(&owner.fqn) else {
            return Vec::new();
        };
        stub.methods
            .iter()
            .filter(|m| m.name == name)
            .map(|m| Candidate {
                declaring: owner.clone(),
                name: m.name.clone(),
                params: m.params.iter().map(|p| self.resolve_type_name(p)).collect(),
                returns: if m.returns == "SELF" {
                    ReturnType::SelfType
                } else {
                    ReturnType::Type(self.resolve_type_name(&m.returns))
                },
                is_static: m.is_static,
                varargs: m.varargs,
            })
            .collect()
    }

    /// The overload of `name` an invocation with `args` on `receiver` binds to,
    /// searching the receiver's ancestors nearest first.
    pub fn resolve_method(&self, receiver: &JavaType, name: &str, args: &[ArgShape]) -> Option<MethodType> {
        let owner = receiver.class()?;
        let candidates: Vec<Candidate> = owner
            .ancestors()
            .iter()
            .flat_map(|ancestor| self.declared_methods(ancestor, name))
            .collect();
        select_overload(&candidates, args).map(|c| c.method_type(Some(receiver)))
    }

    pub fn declared_field(&self, owner: &Arc<ClassType>, name: &str) -> Option<FieldInfo> {
        let stub = self.stubs.get(&owner.fqn)?;
        let field = stub.fields.iter().find(|f| f.name == name)?;
        Some(FieldInfo {
            owner: owner.clone(),
            ty: self.resolve_type_name(&field.ty),
            is_static: field.is_static,
        })
    }

    /// Whether `fqn` declares a method or field called `member`.
    pub fn has_member(&self, fqn: &str, member: &str) -> bool {
        self.stubs.get(fqn).is_some_and(|stub| {
            stub.methods.iter().any(|m| m.name == member) || stub.fields.iter().any(|f| f.name == member)
        })
    }
}

fn build_class_type(
    fqn: &str,
    stubs: &HashMap<String, TypeStub>,
    built: &mut HashMap<String, Arc<ClassType>>,
    in_progress: &mut HashSet<String>,
) -> Arc<ClassType> {
    if let Some(existing) = built.get(fqn) {
        return existing.clone();
    }
    let Some(stub) = stubs.get(fqn) else {
        return Arc::new(ClassType::new(fqn, TypeKind::Class, Vec::new()));
    };
    if !in_progress.insert(fqn.to_string()) {
        return Arc::new(ClassType::new(fqn, stub.kind, Vec::new()));
    }

    let mut supertypes: Vec<Arc<ClassType>> = stub
        .supertypes
        .iter()
        .map(|s| build_class_type(s, stubs, built, in_progress))
        .collect();
    if fqn != "java.lang.Object" && supertypes.is_empty() {
        supertypes.push(build_class_type("java.lang.Object", stubs, built, in_progress));
    }

    let mut class_type = ClassType::new(fqn, stub.kind, supertypes);
    class_type.functional = stub.functional;
    let class_type = Arc::new(class_type);
    in_progress.remove(fqn);
    built.insert(fqn.to_string(), class_type.clone());
    class_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bundled_resource_loads() {
        let names = Classpath::resource_names();
        let classpath = Classpath::from_resources(&names).unwrap();
        assert!(classpath.contains("org.junit.jupiter.api.Assertions"));
        assert!(classpath.contains("org.assertj.core.api.AbstractStringAssert"));
        assert!(classpath.contains("org.mockito.Mockito"));
        assert!(classpath.contains("org.junit.runners.JUnit4"));
    }

    #[test]
    fn java_base_is_always_present() {
        let classpath = Classpath::from_resources(&["assertj-core-3.24"]).unwrap();
        assert!(classpath.contains("java.lang.String"));
        assert_eq!(classpath.key(), "java-base+assertj-core-3.24");
    }

    #[test]
    fn resolve_method_searches_ancestors() {
        let classpath = Classpath::from_resources(&["assertj-core-3.24"]).unwrap();
        let receiver = classpath.resolve_type_name("org.assertj.core.api.AbstractStringAssert");
        let is_empty = classpath.resolve_method(&receiver, "isEmpty", &[]).unwrap();
        assert_eq!(is_empty.declaring_type.fqn, "org.assertj.core.api.AbstractCharSequenceAssert");
        assert!(is_empty.parameter_types.is_empty());
        assert!(classpath.resolve_method(&receiver, "noSuchMethod", &[]).is_none());
        assert!(classpath.resolve_method(&JavaType::Unknown, "isEmpty", &[]).is_none());
    }

    #[test]
    fn unknown_resource_is_an_error() {
        let err = Classpath::from_resources(&["junit-3"]).unwrap_err();
        assert!(matches!(err, ClasspathError::UnknownResource { ref name, .. } if name == "junit-3"));
    }

    #[test]
    fn class_types_know_their_ancestry() {
        let classpath = Classpath::from_resources(&["assertj-core-3.24"]).unwrap();
        let string_assert = classpath.class_type("org.assertj.core.api.AbstractStringAssert").unwrap();
        assert!(string_assert.is_subtype_of("org.assertj.core.api.AbstractAssert"));
        assert!(string_assert.is_subtype_of("java.lang.Object"));
        let supplier = classpath.class_type("java.util.function.Supplier").unwrap();
        assert!(supplier.functional);
    }

    #[test]
    fn type_names_resolve_to_java_types() {
        let classpath = Classpath::from_resources::<&str>(&[]).unwrap();
        assert_eq!(
            classpath.resolve_type_name("double[]"),
            JavaType::Array(Box::new(JavaType::Primitive(Primitive::Double)))
        );
        assert_eq!(classpath.resolve_type_name("java.lang.String").fqn(), Some("java.lang.String"));
        assert!(classpath.resolve_type_name("com.example.Missing").is_unknown());
    }

    #[test]
    fn duplicate_stub_is_rejected() {
        let stub = TypeStub {
            fqn: "a.B".into(),
            kind: TypeKind::Class,
            supertypes: vec![],
            functional: false,
            methods: vec![],
            fields: vec![],
        };
        let err = Classpath::from_stubs("dup", vec![stub.clone(), stub]).unwrap_err();
        assert!(matches!(err, ClasspathError::DuplicateType(ref fqn) if fqn == "a.B"));
    }
}
