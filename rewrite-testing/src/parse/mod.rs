//! Java front end: lexer, lossless parser and type attribution.

mod attribute;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::classpath::Classpath;
use crate::context::ExecutionContext;
use crate::error::{ClasspathError, ParseError};
use crate::tree::{CompilationUnit, JavaType};

pub(crate) use attribute::type_symbol;

/// Parses sources into attributed compilation units against one classpath.
#[derive(Debug, Clone)]
pub struct JavaParser {
    classpath: Arc<Classpath>,
}

#[derive(Debug)]
pub struct JavaParserBuilder {
    classpath: Result<Option<Arc<Classpath>>, Arc<ClasspathError>>,
}

impl JavaParserBuilder {
    /// Bind to the named classpath resources, loading them through the
    /// context cache.
    pub fn classpath_from_resources<S: AsRef<str>>(mut self, ctx: &ExecutionContext, resources: &[S]) -> Self {
        self.classpath = ctx.classpath(resources).map(Some);
        self
    }

    pub fn classpath(mut self, classpath: Arc<Classpath>) -> Self {
        self.classpath = Ok(Some(classpath));
        self
    }

    /// Without a classpath the parser resolves against `java-base` only.
    pub fn build(self) -> Result<JavaParser, Arc<ClasspathError>> {
        let classpath = match self.classpath? {
            Some(classpath) => classpath,
            None => Arc::new(Classpath::from_resources::<&str>(&[]).map_err(Arc::new)?),
        };
        Ok(JavaParser { classpath })
    }
}

impl JavaParser {
    pub fn builder() -> JavaParserBuilder {
        JavaParserBuilder { classpath: Ok(None) }
    }

    pub fn new(classpath: Arc<Classpath>) -> Self {
        Self { classpath }
    }

    pub fn classpath(&self) -> &Arc<Classpath> {
        &self.classpath
    }

    pub fn parse(&self, path: impl AsRef<Path>, source: &str) -> Result<Arc<CompilationUnit>, ParseError> {
        self.parse_with_bindings(path.as_ref(), source, &HashMap::new())
            .map(Arc::new)
    }

    /// Parse with extra names in scope everywhere, typed as given.
    pub(crate) fn parse_with_bindings(
        &self,
        path: &Path,
        source: &str,
        bindings: &HashMap<String, JavaType>,
    ) -> Result<CompilationUnit, ParseError> {
        let mut cu = parser::parse_compilation_unit(path, source)?;
        attribute::attribute(&mut cu, &self.classpath, bindings);
        debug!(path = %path.display(), classpath = self.classpath.key(), "parsed");
        Ok(cu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_context_cache() {
        let ctx = ExecutionContext::new();
        let a = JavaParser::builder()
            .classpath_from_resources(&ctx, &["junit-4.13"])
            .build()
            .unwrap();
        let b = JavaParser::builder()
            .classpath_from_resources(&ctx, &["junit-4.13"])
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(a.classpath(), b.classpath()));
    }

    #[test]
    fn builder_reports_unknown_resource() {
        let ctx = ExecutionContext::new();
        let err = JavaParser::builder()
            .classpath_from_resources(&ctx, &["junit-3"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("junit-3"));
    }

    #[test]
    fn parse_round_trips_and_attributes() {
        let parser = JavaParser::builder().build().unwrap();
        let source = "class A {\n  // keep\n  String s = \"x\" + 1;\n}\n";
        let cu = parser.parse("A.java", source).unwrap();
        assert_eq!(cu.print(), source);
        assert_eq!(cu.classes[0].ty.as_ref().unwrap().fqn, "A");
    }

    #[test]
    fn parse_error_has_position() {
        let parser = JavaParser::builder().build().unwrap();
        let err = parser.parse("B.java", "class B {\n  int x = ;\n}\n").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
