//! File-level gates evaluated before a recipe's visitor runs.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::context::ExecutionContext;
use crate::error::MatcherError;
use crate::search::{UsesMethod, UsesType};
use crate::tree::CompilationUnit;

#[derive(Debug, Clone)]
pub enum Precondition {
    UsesType(UsesType),
    UsesMethod(UsesMethod),
    And(Vec<Precondition>),
    Or(Vec<Precondition>),
    Not(Box<Precondition>),
}

impl Precondition {
    pub fn uses_type(pattern: &str, allow_subtypes: bool) -> Result<Self, MatcherError> {
        UsesType::new(pattern, allow_subtypes).map(Self::UsesType)
    }

    pub fn uses_method(pattern: &str) -> Result<Self, MatcherError> {
        UsesMethod::new(pattern).map(Self::UsesMethod)
    }

    pub fn and(self, other: Precondition) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Precondition) -> Self {
        match self {
            Self::Or(mut any) => {
                any.push(other);
                Self::Or(any)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Whether the guarded visitor should run on `cu`. A cancelled run
    /// answers `false` everywhere.
    pub fn check(&self, cu: &Arc<CompilationUnit>, ctx: &ExecutionContext) -> bool {
        if ctx.is_cancelled() {
            return false;
        }
        let result = match self {
            Self::UsesType(uses) => uses.check(cu, ctx),
            Self::UsesMethod(uses) => uses.check(cu, ctx),
            Self::And(all) => all.iter().all(|p| p.check(cu, ctx)),
            Self::Or(any) => any.iter().any(|p| p.check(cu, ctx)),
            Self::Not(inner) => !inner.check(cu, ctx) && !ctx.is_cancelled(),
        };
        trace!(precondition = %self, path = %cu.source_path.display(), result, "checked");
        result
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, op: &str, parts: &[Precondition]| {
            f.write_str("(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{part}")?;
            }
            f.write_str(")")
        };
        match self {
            Self::UsesType(uses) => write!(f, "UsesType({})", uses.pattern()),
            Self::UsesMethod(uses) => write!(f, "UsesMethod({})", uses.pattern()),
            Self::And(all) => join(f, "and", all),
            Self::Or(any) => join(f, "or", any),
            Self::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::JavaParser;

    fn unit(ctx: &ExecutionContext) -> Arc<CompilationUnit> {
        JavaParser::builder()
            .classpath_from_resources(ctx, &["mockito-core-5"])
            .build()
            .unwrap()
            .parse("P.java", "import org.mockito.Mock;\nclass P { String s = \"x\".trim(); }\n")
            .unwrap()
    }

    #[test]
    fn combinators() {
        let ctx = ExecutionContext::new();
        let cu = unit(&ctx);
        let mockito = Precondition::uses_type("org.mockito.*", false).unwrap();
        let jupiter = Precondition::uses_type("org.junit.jupiter.*", false).unwrap();
        let trim = Precondition::uses_method("java.lang.String trim()").unwrap();

        assert!(mockito.check(&cu, &ctx));
        assert!(!jupiter.check(&cu, &ctx));
        assert!(trim.check(&cu, &ctx));
        assert!(mockito.clone().and(trim.clone()).check(&cu, &ctx));
        assert!(!mockito.clone().and(jupiter.clone()).check(&cu, &ctx));
        assert!(jupiter.clone().or(mockito.clone()).check(&cu, &ctx));
        assert!(jupiter.clone().not().check(&cu, &ctx));
    }

    #[test]
    fn cancelled_context_fails_every_check() {
        let ctx = ExecutionContext::new();
        let cu = unit(&ctx);
        ctx.cancel();
        let mockito = Precondition::uses_type("org.mockito.*", false).unwrap();
        assert!(!mockito.check(&cu, &ctx));
        assert!(!mockito.not().check(&cu, &ctx));
    }

    #[test]
    fn display_nests() {
        let p = Precondition::uses_type("a.B", false)
            .unwrap()
            .and(Precondition::uses_method("a.B m(..)").unwrap().not());
        assert_eq!(p.to_string(), "(UsesType(a.B) and not UsesMethod(a.B m(..)))");
    }
}
