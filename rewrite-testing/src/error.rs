//! Error types for each concern of the rewriter.
//!
//! Library code returns these enums; the binary wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = RewriteError> = std::result::Result<T, E>;

/// Failure to lex or parse a Java source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}:{line}:{column}: {message}", .path.display())]
pub struct ParseError {
    pub path: PathBuf,
    /// Byte offset of the offending token.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn at(path: &std::path::Path, source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
        Self {
            path: path.to_path_buf(),
            offset,
            line,
            column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("unknown classpath resource '{name}' (known: {})", .known.join(", "))]
    UnknownResource { name: String, known: Vec<String> },

    #[error("invalid classpath resource '{name}': {source}")]
    InvalidResource {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("type '{0}' is declared twice on the classpath")]
    DuplicateType(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatcherError {
    #[error("invalid method pattern '{pattern}': {reason}")]
    InvalidMethodPattern { pattern: String, reason: String },

    #[error("invalid type pattern '{pattern}': {reason}")]
    InvalidTypePattern { pattern: String, reason: String },

    #[error("invalid annotation pattern '{pattern}': {reason}")]
    InvalidAnnotationPattern { pattern: String, reason: String },
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("malformed placeholder at byte {offset} in template `{code}`")]
    MalformedPlaceholder { code: String, offset: usize },

    #[error("template expects {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("argument {index} has type {actual}, which does not satisfy #{{{placeholder}}} (expected {expected})")]
    PlaceholderType {
        index: usize,
        placeholder: String,
        expected: String,
        actual: String,
    },

    #[error("placeholder type '{0}' cannot be resolved against the template classpath")]
    UnresolvedType(String),

    #[error("template `{code}` did not produce a {expected}")]
    UnexpectedShape { code: String, expected: &'static str },

    #[error("template `{code}` could not be fully attributed: {site}")]
    Unattributed { code: String, site: String },

    #[error("coordinate {mode} is not supported on {target}")]
    UnsupportedCoordinate {
        mode: &'static str,
        target: &'static str,
    },

    #[error("statement {0:?} is not inside the enclosing block")]
    DetachedStatement(crate::tree::Id),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Classpath(#[from] std::sync::Arc<ClasspathError>),

    /// A failure remembered by the template cache.
    #[error(transparent)]
    Cached(std::sync::Arc<TemplateError>),
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error(
        "unknown recipe '{id}'{}",
        .suggestion.as_ref().map_or(String::new(), |s| format!(" (did you mean '{s}'?)"))
    )]
    UnknownRecipe {
        id: String,
        suggestion: Option<String>,
    },

    #[error("recipe '{recipe}' requires option '{option}'")]
    MissingOption { recipe: String, option: String },

    #[error("recipe '{recipe}' option '{option}': {reason}")]
    InvalidOption {
        recipe: String,
        option: String,
        reason: String,
    },

    #[error("recipe '{recipe}' has no option named '{option}'")]
    UnknownOption { recipe: String, option: String },

    #[error("recipe '{0}' includes itself")]
    Cycle(String),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid recipe configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Matcher(#[from] MatcherError),
}

/// Failure to gather or write the files of a run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error("invalid path pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error("classpath: {0}")]
    Classpath(#[from] std::sync::Arc<ClasspathError>),
}

/// Failure of a unit during a run.
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    #[error("recipe '{recipe}' changed a {expected} into a {actual} in an iso visitor")]
    InvariantViolation {
        recipe: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("classpath: {0}")]
    Classpath(std::sync::Arc<ClasspathError>),

    #[error("run cancelled")]
    Cancelled,
}

impl From<ClasspathError> for RewriteError {
    fn from(err: ClasspathError) -> Self {
        Self::Classpath(std::sync::Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parse_error_reports_line_and_column() {
        let source = "class A {\n  int x = ;\n}";
        let offset = source.find(';').unwrap();
        let err = ParseError::at(Path::new("A.java"), source, offset, "expected expression");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 11);
        assert_eq!(err.to_string(), "A.java:2:11: expected expression");
    }

    #[test]
    fn unknown_recipe_mentions_suggestion() {
        let err = RecipeError::UnknownRecipe {
            id: "testing.assertj.IsEqualToEmptyStrin".into(),
            suggestion: Some("testing.assertj.IsEqualToEmptyString".into()),
        };
        assert!(err.to_string().contains("did you mean 'testing.assertj.IsEqualToEmptyString'"));
    }
}
