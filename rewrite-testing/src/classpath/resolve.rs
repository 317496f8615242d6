//! Overload selection (JLS 15.12.2, minus inference).

use std::sync::Arc;

use crate::tree::{ClassType, JavaType, MethodType};

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnType {
    Type(JavaType),
    /// Fluent APIs: the static type of the receiver.
    SelfType,
}

/// A method that could be the target of an invocation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub declaring: Arc<ClassType>,
    pub name: String,
    pub params: Vec<JavaType>,
    pub returns: ReturnType,
    pub is_static: bool,
    pub varargs: bool,
}

impl Candidate {
    pub fn method_type(&self, receiver: Option<&JavaType>) -> MethodType {
        let return_type = match &self.returns {
            ReturnType::Type(ty) => ty.clone(),
            ReturnType::SelfType => match receiver {
                Some(ty @ JavaType::Class(_)) => ty.clone(),
                _ => JavaType::Class(self.declaring.clone()),
            },
        };
        MethodType {
            declaring_type: self.declaring.clone(),
            name: self.name.clone(),
            parameter_types: self.params.clone(),
            return_type,
            is_static: self.is_static,
            varargs: self.varargs,
        }
    }

    fn same_signature(&self, other: &Candidate) -> bool {
        self.params == other.params
    }
}

/// What overload selection needs to know about an argument.
#[derive(Debug, Clone)]
pub enum ArgShape {
    Typed(JavaType),
    /// Lambda or method reference: fits any functional interface.
    Functional,
}

#[derive(Clone, Copy, PartialEq)]
enum Phase {
    Strict,
    Loose,
    Varargs,
}

fn compatible(arg: &ArgShape, param: &JavaType, phase: Phase) -> bool {
    match arg {
        ArgShape::Functional => param.is_functional(),
        ArgShape::Typed(ty) if phase == Phase::Strict => ty.is_subtype_of(param),
        ArgShape::Typed(ty) => ty.is_assignable_to(param),
    }
}

fn applicable(candidate: &Candidate, args: &[ArgShape], phase: Phase) -> bool {
    if phase != Phase::Varargs {
        return candidate.params.len() == args.len()
            && args.iter().zip(&candidate.params).all(|(a, p)| compatible(a, p, phase));
    }
    if !candidate.varargs {
        return false;
    }
    let Some((JavaType::Array(component), fixed)) = candidate.params.split_last() else {
        return false;
    };
    args.len() >= fixed.len()
        && args.iter().zip(fixed).all(|(a, p)| compatible(a, p, Phase::Loose))
        && args[fixed.len()..].iter().all(|a| compatible(a, component, Phase::Loose))
}

/// Parameter type at `index` as seen by the phase, expanding varargs.
fn param_at(candidate: &Candidate, index: usize, phase: Phase) -> Option<&JavaType> {
    if phase == Phase::Varargs && index + 1 >= candidate.params.len() {
        return match candidate.params.last() {
            Some(JavaType::Array(component)) => Some(component),
            other => other,
        };
    }
    candidate.params.get(index)
}

fn more_specific(a: &Candidate, b: &Candidate, arity: usize, phase: Phase) -> bool {
    (0..arity).all(|i| match (param_at(a, i, phase), param_at(b, i, phase)) {
        (Some(x), Some(y)) => x == y || x.is_subtype_of(y),
        _ => false,
    })
}

/// Candidates nearest the receiver shadow identical signatures further up;
/// callers pass them in that order.
pub fn select_overload<'c>(candidates: &'c [Candidate], args: &[ArgShape]) -> Option<&'c Candidate> {
    let mut visible: Vec<&Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !visible.iter().any(|seen| seen.same_signature(candidate)) {
            visible.push(candidate);
        }
    }

    for phase in [Phase::Strict, Phase::Loose, Phase::Varargs] {
        let applicable: Vec<&Candidate> = visible
            .iter()
            .copied()
            .filter(|c| applicable(c, args, phase))
            .collect();
        match applicable.as_slice() {
            [] => continue,
            [only] => return Some(only),
            many => {
                let best = many.iter().find(|a| {
                    many.iter()
                        .all(|b| std::ptr::eq(**a, *b) || more_specific(a, b, args.len(), phase))
                });
                // Ambiguous calls fall back to declaration order.
                return Some(best.copied().unwrap_or(many[0]));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Primitive, TypeKind};

    fn class(fqn: &str, supers: Vec<Arc<ClassType>>) -> Arc<ClassType> {
        Arc::new(ClassType::new(fqn, TypeKind::Class, supers))
    }

    fn candidate(owner: &Arc<ClassType>, params: Vec<JavaType>, varargs: bool) -> Candidate {
        Candidate {
            declaring: owner.clone(),
            name: "check".into(),
            params,
            returns: ReturnType::Type(JavaType::Primitive(Primitive::Void)),
            is_static: true,
            varargs,
        }
    }

    fn prim(p: Primitive) -> JavaType {
        JavaType::Primitive(p)
    }

    #[test]
    fn strict_phase_beats_boxing() {
        let object = class("java.lang.Object", vec![]);
        let owner = class("org.example.Checks", vec![]);
        let candidates = vec![
            candidate(&owner, vec![JavaType::Class(object.clone()), JavaType::Class(object)], false),
            candidate(&owner, vec![prim(Primitive::Long), prim(Primitive::Long)], false),
        ];
        let args = [ArgShape::Typed(prim(Primitive::Int)), ArgShape::Typed(prim(Primitive::Int))];
        let chosen = select_overload(&candidates, &args).unwrap();
        assert_eq!(chosen.params[0], prim(Primitive::Long));
    }

    #[test]
    fn most_specific_wins() {
        let object = class("java.lang.Object", vec![]);
        let string = class("java.lang.String", vec![object.clone()]);
        let owner = class("org.example.Checks", vec![]);
        let candidates = vec![
            candidate(&owner, vec![JavaType::Class(object)], false),
            candidate(&owner, vec![JavaType::Class(string.clone())], false),
        ];
        let chosen = select_overload(&candidates, &[ArgShape::Typed(JavaType::Class(string))]).unwrap();
        assert_eq!(chosen.params[0].fqn(), Some("java.lang.String"));
    }

    #[test]
    fn varargs_only_when_nothing_else_applies() {
        let object = class("java.lang.Object", vec![]);
        let string = class("java.lang.String", vec![object.clone()]);
        let owner = class("org.example.Checks", vec![]);
        let objects = JavaType::Array(Box::new(JavaType::Class(object)));
        let candidates = vec![candidate(&owner, vec![JavaType::Class(string.clone()), objects], true)];
        let args = [
            ArgShape::Typed(JavaType::Class(string.clone())),
            ArgShape::Typed(prim(Primitive::Int)),
            ArgShape::Typed(JavaType::Class(string)),
        ];
        assert!(select_overload(&candidates, &args).is_some());
    }

    #[test]
    fn lambdas_need_a_functional_parameter() {
        let mut supplier = ClassType::new("java.util.function.Supplier", TypeKind::Interface, vec![]);
        supplier.functional = true;
        let supplier = Arc::new(supplier);
        let string = class("java.lang.String", vec![]);
        let owner = class("org.example.Checks", vec![]);
        let candidates = vec![
            candidate(&owner, vec![JavaType::Class(string)], false),
            candidate(&owner, vec![JavaType::Class(supplier)], false),
        ];
        let chosen = select_overload(&candidates, &[ArgShape::Functional]).unwrap();
        assert_eq!(chosen.params[0].fqn(), Some("java.util.function.Supplier"));
    }

    #[test]
    fn unknown_arguments_match_nothing() {
        let object = class("java.lang.Object", vec![]);
        let owner = class("org.example.Checks", vec![]);
        let candidates = vec![candidate(&owner, vec![JavaType::Class(object)], false)];
        assert!(select_overload(&candidates, &[ArgShape::Typed(JavaType::Unknown)]).is_none());
    }

    #[test]
    fn self_return_takes_receiver_type() {
        let owner = class("org.example.AbstractAssert", vec![]);
        let sub = JavaType::Class(class("org.example.StringAssert", vec![owner.clone()]));
        let mut fluent = candidate(&owner, vec![], false);
        fluent.returns = ReturnType::SelfType;
        assert_eq!(fluent.method_type(Some(&sub)).return_type, sub);
        assert_eq!(
            fluent.method_type(None).return_type.fqn(),
            Some("org.example.AbstractAssert")
        );
    }
}
