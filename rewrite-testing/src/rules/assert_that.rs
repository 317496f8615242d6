//! Conversion of JUnit Jupiter equality assertions to AssertJ chains, shared
//! by the `assertEquals` and `assertArrayEquals` rules.

use std::sync::Arc;

use tracing::debug;

use crate::context::Severity;
use crate::error::{RecipeError, TemplateError};
use crate::matcher::MethodMatcher;
use crate::precondition::Precondition;
use crate::template::JavaTemplate;
use crate::tree::{Expression, MethodInvocation};
use crate::visitor::{walk_method_invocation, JavaVisitor, VisitCx};

pub(super) const JUPITER_ASSERTIONS: &str = "org.junit.jupiter.api.Assertions";
const ASSERTJ_ASSERTIONS: &str = "org.assertj.core.api.Assertions";
pub(super) const ASSERTJ_CLASSPATH: &str = "assertj-core-3.24";
const SUPPLIER: &str = "java.util.function.Supplier";

/// How one JUnit assertion maps onto AssertJ.
#[derive(Debug)]
pub(super) struct Conversion {
    /// Simple name of the JUnit method, e.g. `assertEquals`.
    pub method: &'static str,
    /// AssertJ method for the exact comparison.
    pub exact: &'static str,
    /// AssertJ method taking an `Offset` for the delta comparison.
    pub close: &'static str,
    /// Placeholder for the actual and expected operands.
    pub operand: &'static str,
    pub matcher: MethodMatcher,
    pub precondition: Precondition,
}

impl Conversion {
    pub fn new(
        method: &'static str,
        exact: &'static str,
        close: &'static str,
        operand: &'static str,
    ) -> Result<Self, RecipeError> {
        let matcher = MethodMatcher::new(&format!("{JUPITER_ASSERTIONS} {method}(..)"))?;
        Ok(Self {
            method,
            exact,
            close,
            operand,
            matcher,
            precondition: Precondition::uses_type(JUPITER_ASSERTIONS, false)?,
        })
    }

    /// Work out the AssertJ chain for `args`, or why the site is left alone.
    fn plan(&self, args: &[&Expression]) -> Result<Plan, Skip> {
        let op = self.operand;
        match *args {
            [expected, actual] => Ok(Plan {
                code: format!("assertThat({op}).{}({op})", self.exact),
                args: vec![actual.clone(), expected.clone()],
                within: false,
            }),
            [expected, actual, third] => {
                let ty = third.ty();
                if ty.is_unknown() {
                    return Err(Skip::Unattributed(third.print().trim().to_string()));
                }
                if ty.is_floating() {
                    Ok(Plan {
                        code: format!("assertThat({op}).{}({op}, within(#{{any()}}))", self.close),
                        args: vec![actual.clone(), expected.clone(), third.clone()],
                        within: true,
                    })
                } else {
                    Ok(Plan {
                        code: format!("assertThat({op}).as({}).{}({op})", message_placeholder(third), self.exact),
                        args: vec![actual.clone(), third.clone(), expected.clone()],
                        within: false,
                    })
                }
            }
            [expected, actual, delta, message] => {
                if let Some(unknown) = [delta, message].into_iter().find(|e| e.ty().is_unknown()) {
                    return Err(Skip::Unattributed(unknown.print().trim().to_string()));
                }
                Ok(Plan {
                    code: format!(
                        "assertThat({op}).as({}).{}({op}, within(#{{any()}}))",
                        message_placeholder(message),
                        self.close
                    ),
                    args: vec![actual.clone(), message.clone(), expected.clone(), delta.clone()],
                    within: true,
                })
            }
            _ => Err(Skip::Arity(args.len())),
        }
    }
}

fn message_placeholder(message: &Expression) -> String {
    if message.ty().fqn() == Some("java.lang.String") {
        "#{any(String)}".to_string()
    } else {
        format!("#{{any({SUPPLIER})}}")
    }
}

struct Plan {
    code: String,
    args: Vec<Expression>,
    within: bool,
}

impl Plan {
    fn template(&self) -> Result<JavaTemplate, TemplateError> {
        let mut static_imports = vec![format!("{ASSERTJ_ASSERTIONS}.assertThat")];
        if self.within {
            static_imports.push(format!("{ASSERTJ_ASSERTIONS}.within"));
        }
        JavaTemplate::builder(self.code.as_str())
            .imports([SUPPLIER])
            .static_imports(static_imports)
            .classpath([ASSERTJ_CLASSPATH])
            .build()
    }
}

enum Skip {
    Unattributed(String),
    Arity(usize),
}

/// Rewrites every invocation matched by a [`Conversion`] in place.
pub(super) struct ConvertToAssertThat<'r> {
    pub conversion: &'r Conversion,
}

impl ConvertToAssertThat<'_> {
    fn convert(&self, m: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Option<Expression> {
        let name = self.conversion.method;
        if m.method_type.is_none() {
            cx.report(
                Severity::Debug,
                format!("`{name}` call has no type attribution; left unchanged"),
                Some(m.id),
            );
            return None;
        }
        if !self.conversion.matcher.matches(m) {
            return None;
        }

        let plan = match self.conversion.plan(&m.arguments()) {
            Ok(plan) => plan,
            Err(Skip::Unattributed(argument)) => {
                cx.report(
                    Severity::Debug,
                    format!("argument `{argument}` of `{name}` has no type attribution; left unchanged"),
                    Some(m.id),
                );
                return None;
            }
            Err(Skip::Arity(n)) => {
                debug!(method = name, arity = n, "no AssertJ form for this arity");
                return None;
            }
        };

        let target = Expression::MethodInvocation(m.clone());
        let replaced = plan
            .template()
            .and_then(|template| template.replace_expression(cx, &target, &plan.args));
        match replaced {
            Ok(expression) => {
                cx.maybe_add_import(ASSERTJ_ASSERTIONS, Some("assertThat"), false);
                if plan.within {
                    cx.maybe_add_import(ASSERTJ_ASSERTIONS, Some("within"), false);
                }
                cx.maybe_remove_import(JUPITER_ASSERTIONS);
                Some(expression)
            }
            Err(err) => {
                cx.report(
                    Severity::Warning,
                    format!("could not convert `{name}` to AssertJ: {err}"),
                    Some(m.id),
                );
                None
            }
        }
    }
}

impl JavaVisitor for ConvertToAssertThat<'_> {
    fn is_iso(&self) -> bool {
        true
    }

    fn visit_method_invocation(&mut self, invocation: &Arc<MethodInvocation>, cx: &mut VisitCx) -> Expression {
        let m = walk_method_invocation(self, invocation, cx);
        if m.simple_name() != self.conversion.method {
            return Expression::MethodInvocation(m);
        }
        self.convert(&m, cx).unwrap_or(Expression::MethodInvocation(m))
    }
}
