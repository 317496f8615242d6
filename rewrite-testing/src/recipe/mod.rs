//! Recipes: named, described rewrites with options.
//!
//! A [`Recipe`] either contributes a visitor (optionally gated by a
//! [`Precondition`]) or groups other recipes. The [`RecipeRegistry`] knows
//! every recipe by id, validates option values against each recipe's
//! [`OptionDescriptor`]s and instantiates recipes for a run.

mod config;
mod runner;

pub use config::{DeclarativeRecipe, RecipeReference, RunConfig, DEFAULT_CLASSPATH};
pub use runner::{apply, parse_sources, Applied, RecipeRun, RecipeRunner, UnitResult, UnitState};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ExecutionContext, OptionValues};
use crate::error::RecipeError;
use crate::precondition::Precondition;
use crate::visitor::JavaVisitor;

/// Effort saved per occurrence when a recipe does not say otherwise.
pub const DEFAULT_EFFORT: Duration = Duration::from_secs(5 * 60);

const BUNDLED_RECIPES: &str = include_str!("../../resources/recipes.yml");

/// Metadata shown by `list` and used to validate options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub estimated_effort_per_occurrence: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDescriptor>,
    /// Ids of the recipes a composite runs, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipe_list: Vec<String>,
}

impl RecipeDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            estimated_effort_per_occurrence: DEFAULT_EFFORT,
            options: Vec::new(),
            recipe_list: Vec::new(),
        }
    }

    pub fn with_effort(mut self, effort: Duration) -> Self {
        self.estimated_effort_per_occurrence = effort;
        self
    }

    pub fn with_option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "values")]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    StringList,
    Enumeration(Vec<String>),
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Boolean => f.write_str("boolean"),
            Self::StringList => f.write_str("list of strings"),
            Self::Enumeration(values) => write!(f, "one of {}", values.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
}

impl OptionDescriptor {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            example: None,
            kind,
            required: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether `value` is acceptable for this option's kind. A single string
    /// is accepted where a list is expected.
    fn accepts(&self, value: &serde_yaml::Value) -> bool {
        use serde_yaml::Value;
        match (&self.kind, value) {
            (OptionKind::String, Value::String(_)) => true,
            (OptionKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (OptionKind::Boolean, Value::Bool(_)) => true,
            (OptionKind::StringList, Value::String(_)) => true,
            (OptionKind::StringList, Value::Sequence(items)) => items.iter().all(Value::is_string),
            (OptionKind::Enumeration(values), Value::String(s)) => values.contains(s),
            _ => false,
        }
    }
}

/// Validated option values of one recipe instance.
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: OptionValues,
}

impl Options {
    /// Check `values` against `descriptor`: every name must be declared,
    /// every required option present and every value of the declared kind.
    pub fn validate(descriptor: &RecipeDescriptor, values: OptionValues) -> Result<Self, RecipeError> {
        for (name, value) in &values {
            let option = descriptor
                .options
                .iter()
                .find(|o| &o.name == name)
                .ok_or_else(|| RecipeError::UnknownOption {
                    recipe: descriptor.id.clone(),
                    option: name.clone(),
                })?;
            if !option.accepts(value) {
                return Err(RecipeError::InvalidOption {
                    recipe: descriptor.id.clone(),
                    option: name.clone(),
                    reason: format!("expected {}", option.kind),
                });
            }
        }
        if let Some(missing) = descriptor
            .options
            .iter()
            .find(|o| o.required && !values.contains_key(&o.name))
        {
            return Err(RecipeError::MissingOption {
                recipe: descriptor.id.clone(),
                option: missing.name.clone(),
            });
        }
        Ok(Self { values })
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.values.get(name)?.as_str()
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.values.get(name)?.as_i64()
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.values.get(name)?.as_bool()
    }

    pub fn string_list(&self, name: &str) -> Option<Vec<String>> {
        match self.values.get(name)? {
            serde_yaml::Value::String(s) => Some(vec![s.clone()]),
            serde_yaml::Value::Sequence(items) => {
                Some(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            }
            _ => None,
        }
    }
}

/// A named rewrite.
pub trait Recipe: Send + Sync + fmt::Debug {
    fn descriptor(&self) -> &RecipeDescriptor;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    /// File-level gate; the visitor only runs on units it accepts.
    fn precondition(&self) -> Option<&Precondition> {
        None
    }

    /// A fresh visitor for one unit. Composites have none.
    fn visitor(&self) -> Option<Box<dyn JavaVisitor + '_>> {
        None
    }

    /// Recipes run after this one's own visitor, in order.
    fn recipe_list(&self) -> &[Arc<dyn Recipe>] {
        &[]
    }
}

/// A recipe that only groups others.
#[derive(Debug)]
pub struct CompositeRecipe {
    descriptor: RecipeDescriptor,
    recipes: Vec<Arc<dyn Recipe>>,
}

impl CompositeRecipe {
    pub fn new(descriptor: RecipeDescriptor, recipes: Vec<Arc<dyn Recipe>>) -> Self {
        Self { descriptor, recipes }
    }
}

impl Recipe for CompositeRecipe {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn recipe_list(&self) -> &[Arc<dyn Recipe>] {
        &self.recipes
    }
}

pub type RecipeFactory = fn(&Options) -> Result<Arc<dyn Recipe>, RecipeError>;

#[derive(Clone)]
enum Entry {
    Builtin(RecipeFactory),
    Declarative(DeclarativeRecipe),
}

/// Every recipe known to a run, by id.
#[derive(Clone, Default)]
pub struct RecipeRegistry {
    descriptors: BTreeMap<String, RecipeDescriptor>,
    entries: HashMap<String, Entry>,
}

impl fmt::Debug for RecipeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.descriptors.keys()).finish()
    }
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled rules plus the bundled composites.
    pub fn builtin() -> Result<Self, RecipeError> {
        let mut registry = Self::new();
        crate::rules::register_all(&mut registry);
        for recipe in serde_yaml::from_str::<Vec<DeclarativeRecipe>>(BUNDLED_RECIPES)? {
            registry.declare(recipe);
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: RecipeDescriptor, factory: RecipeFactory) {
        debug!(recipe = %descriptor.id, "registered");
        self.entries.insert(descriptor.id.clone(), Entry::Builtin(factory));
        self.descriptors.insert(descriptor.id.clone(), descriptor);
    }

    /// Add a composite declared in configuration. Its children are resolved
    /// when it is built, so declaration order does not matter.
    pub fn declare(&mut self, recipe: DeclarativeRecipe) {
        debug!(recipe = %recipe.id, "declared");
        self.descriptors.insert(recipe.id.clone(), recipe.descriptor());
        self.entries.insert(recipe.id.clone(), Entry::Declarative(recipe));
    }

    /// Descriptors sorted by id.
    pub fn descriptors(&self) -> impl Iterator<Item = &RecipeDescriptor> {
        self.descriptors.values()
    }

    pub fn descriptor(&self, id: &str) -> Result<&RecipeDescriptor, RecipeError> {
        self.descriptors.get(id).ok_or_else(|| self.unknown(id))
    }

    /// Instantiate `id` with the option values configured on `ctx`.
    pub fn build(&self, id: &str, ctx: &ExecutionContext) -> Result<Arc<dyn Recipe>, RecipeError> {
        self.build_with(id, OptionValues::new(), ctx, &mut Vec::new())
    }

    fn build_with(
        &self,
        id: &str,
        inline: OptionValues,
        ctx: &ExecutionContext,
        stack: &mut Vec<String>,
    ) -> Result<Arc<dyn Recipe>, RecipeError> {
        if stack.iter().any(|s| s == id) {
            return Err(RecipeError::Cycle(id.to_string()));
        }
        let descriptor = self.descriptor(id)?;
        let entry = self.entries.get(id).ok_or_else(|| self.unknown(id))?;

        let mut values = ctx.options_for(id).cloned().unwrap_or_default();
        values.extend(inline);

        match entry {
            Entry::Builtin(factory) => factory(&Options::validate(descriptor, values)?),
            Entry::Declarative(declared) => {
                Options::validate(descriptor, values)?;
                stack.push(id.to_string());
                let children = declared
                    .recipe_list
                    .iter()
                    .map(|child| self.build_with(&child.id, child.options.clone(), ctx, stack))
                    .collect::<Result<Vec<_>, _>>()?;
                stack.pop();
                Ok(Arc::new(CompositeRecipe::new(descriptor.clone(), children)))
            }
        }
    }

    fn unknown(&self, id: &str) -> RecipeError {
        let suggestion = self
            .descriptors
            .keys()
            .map(|known| (strsim::jaro_winkler(id, known), known))
            .filter(|(score, _)| *score > 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, known)| known.clone());
        RecipeError::UnknownRecipe {
            id: id.to_string(),
            suggestion,
        }
    }
}
