//! State shared by every unit of one run.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classpath::Classpath;
use crate::error::{ClasspathError, TemplateError};
use crate::template::CompiledTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub recipe: String,
    pub message: String,
    pub source_path: Option<PathBuf>,
    /// Byte range of the offending node in the unit as it was visited.
    pub range: Option<Range<usize>>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] ", self.severity, self.recipe)?;
        if let Some(path) = &self.source_path {
            write!(f, "{}", path.display())?;
            if let Some(range) = &self.range {
                write!(f, "@{}..{}", range.start, range.end)?;
            }
            f.write_str(": ")?;
        }
        f.write_str(&self.message)
    }
}

pub type OptionValues = HashMap<String, serde_yaml::Value>;

type ClasspathSlot = Arc<OnceLock<Result<Arc<Classpath>, Arc<ClasspathError>>>>;
type TemplateSlot = Arc<OnceLock<Result<Arc<CompiledTemplate>, Arc<TemplateError>>>>;

/// Options, cancellation, diagnostics, messages and caches for one run.
///
/// Shared by reference across the worker threads; every cache slot is
/// initialized at most once.
#[derive(Default)]
pub struct ExecutionContext {
    options: HashMap<String, OptionValues>,
    cancelled: AtomicBool,
    diagnostics: Mutex<Vec<Diagnostic>>,
    messages: DashMap<String, Arc<dyn Any + Send + Sync>>,
    classpaths: DashMap<String, ClasspathSlot>,
    templates: DashMap<blake3::Hash, TemplateSlot>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Option values per recipe id, as read from configuration.
    pub fn with_options(mut self, options: HashMap<String, OptionValues>) -> Self {
        self.options = options;
        self
    }

    pub fn set_option(&mut self, recipe: &str, name: &str, value: serde_yaml::Value) {
        self.options
            .entry(recipe.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn options_for(&self, recipe: &str) -> Option<&OptionValues> {
        self.options.get(recipe)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning | Severity::Error => warn!("{diagnostic}"),
            _ => debug!("{diagnostic}"),
        }
        self.diagnostics.lock().push(diagnostic);
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }

    /// Store `value` under `key` unless something is already there; returns
    /// whatever ends up stored.
    pub fn put_message<T: Any + Send + Sync>(&self, key: &str, value: T) -> Option<Arc<T>> {
        let stored = self
            .messages
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(value) as Arc<dyn Any + Send + Sync>)
            .clone();
        stored.downcast::<T>().ok()
    }

    pub fn message<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let stored = self.messages.get(key)?.clone();
        stored.downcast::<T>().ok()
    }

    /// Classpath for a resource selection, loaded once per run.
    pub fn classpath<S: AsRef<str>>(&self, resources: &[S]) -> Result<Arc<Classpath>, Arc<ClasspathError>> {
        let key = resources.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("+");
        let slot = self.classpaths.entry(key).or_default().clone();
        slot.get_or_init(|| Classpath::from_resources(resources).map(Arc::new).map_err(Arc::new))
            .clone()
    }

    pub(crate) fn template<F>(&self, key: blake3::Hash, compile: F) -> Result<Arc<CompiledTemplate>, Arc<TemplateError>>
    where
        F: FnOnce() -> Result<CompiledTemplate, TemplateError>,
    {
        let slot = self.templates.entry(key).or_default().clone();
        slot.get_or_init(|| compile().map(Arc::new).map_err(Arc::new)).clone()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.is_cancelled())
            .field("diagnostics", &self.diagnostics.lock().len())
            .field("classpaths", &self.classpaths.len())
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_put_if_absent() {
        let ctx = ExecutionContext::new();
        assert_eq!(*ctx.put_message("seen", 1u32).unwrap(), 1);
        assert_eq!(*ctx.put_message("seen", 2u32).unwrap(), 1);
        assert_eq!(*ctx.message::<u32>("seen").unwrap(), 1);
        assert!(ctx.message::<String>("seen").is_none());
    }

    #[test]
    fn classpaths_are_loaded_once() {
        let ctx = ExecutionContext::new();
        let first = ctx.classpath(&["assertj-core-3.24"]).unwrap();
        let second = ctx.classpath(&["assertj-core-3.24"]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_classpath_error_is_remembered() {
        let ctx = ExecutionContext::new();
        assert!(ctx.classpath(&["nope"]).is_err());
        assert!(ctx.classpath(&["nope"]).is_err());
    }

    #[test]
    fn diagnostics_accumulate_and_drain() {
        let ctx = ExecutionContext::new();
        ctx.report(Diagnostic {
            severity: Severity::Warning,
            recipe: "r".into(),
            message: "m".into(),
            source_path: None,
            range: None,
        });
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.take_diagnostics().len(), 1);
        assert!(ctx.diagnostics().is_empty());
    }
}
