use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{RecipeDescriptor, RecipeRegistry, DEFAULT_EFFORT};
use crate::context::{ExecutionContext, OptionValues};
use crate::error::RecipeError;

/// Classpath resources source units are attributed against by default.
pub const DEFAULT_CLASSPATH: [&str; 4] = ["junit-4.13", "junit-jupiter-api-5.9", "assertj-core-3.24", "mockito-core-5"];

/// A composite recipe declared in YAML.
///
/// ```yaml
/// - id: com.example.Cleanup
///   display_name: Test cleanup
///   recipe_list:
///     - testing.assertj.IsEqualToEmptyString
///     - id: testing.junit5.RemoveObsoleteRunners
///       options: { obsoleteRunners: [org.junit.runners.JUnit4] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarativeRecipe {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub recipe_list: Vec<RecipeReference>,
}

impl DeclarativeRecipe {
    pub fn descriptor(&self) -> RecipeDescriptor {
        RecipeDescriptor {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            estimated_effort_per_occurrence: DEFAULT_EFFORT,
            options: Vec::new(),
            recipe_list: self.recipe_list.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

/// One entry of a `recipe_list`: a bare id or an id with inline options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReferenceRepr")]
pub struct RecipeReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: OptionValues,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceRepr {
    Id(String),
    WithOptions {
        id: String,
        #[serde(default)]
        options: OptionValues,
    },
}

impl From<ReferenceRepr> for RecipeReference {
    fn from(repr: ReferenceRepr) -> Self {
        match repr {
            ReferenceRepr::Id(id) => Self {
                id,
                options: OptionValues::new(),
            },
            ReferenceRepr::WithOptions { id, options } => Self { id, options },
        }
    }
}

/// Everything a run needs besides the sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Recipe ids to run, in order.
    pub recipes: Vec<String>,
    /// Option values keyed by recipe id, then option name.
    pub options: HashMap<String, OptionValues>,
    /// Classpath resources for attributing the sources.
    pub classpath: Vec<String>,
    pub max_cycles: usize,
    /// Glob patterns of source paths to leave alone.
    pub exclude: Vec<String>,
    /// Additional composite recipes.
    pub declared: Vec<DeclarativeRecipe>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recipes: Vec::new(),
            options: HashMap::new(),
            classpath: DEFAULT_CLASSPATH.iter().map(|s| s.to_string()).collect(),
            max_cycles: 3,
            exclude: Vec::new(),
            declared: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml(text: &str) -> Result<Self, RecipeError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Set one option from `recipe.id.optionName=value` syntax; the value is
    /// read as YAML so lists can be given inline.
    pub fn set_option(&mut self, assignment: &str) -> Result<(), RecipeError> {
        let invalid = |reason: &str| RecipeError::InvalidOption {
            recipe: String::new(),
            option: assignment.to_string(),
            reason: reason.to_string(),
        };
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| invalid("expected <recipe>.<option>=<value>"))?;
        let (recipe, name) = key
            .rsplit_once('.')
            .filter(|(recipe, name)| !recipe.is_empty() && !name.is_empty())
            .ok_or_else(|| invalid("expected <recipe>.<option>=<value>"))?;
        let value: serde_yaml::Value = serde_yaml::from_str(value)?;
        self.options
            .entry(recipe.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new().with_options(self.options.clone())
    }

    /// The bundled recipes plus the ones declared here.
    pub fn registry(&self) -> Result<RecipeRegistry, RecipeError> {
        let mut registry = RecipeRegistry::builtin()?;
        for recipe in &self.declared {
            registry.declare(recipe.clone());
        }
        Ok(registry)
    }

    pub fn exclusions(&self) -> Result<Vec<glob::Pattern>, RecipeError> {
        self.exclude
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|e| RecipeError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    pub fn is_excluded(exclusions: &[glob::Pattern], path: &Path) -> bool {
        exclusions.iter().any(|p| p.matches_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_full_config() {
        let config = RunConfig::from_yaml(
            r#"
recipes: [com.example.Cleanup]
options:
  testing.junit5.RemoveObsoleteRunners:
    obsoleteRunners: [org.junit.runners.JUnit4]
classpath: [junit-4.13]
max_cycles: 2
exclude: ["**/generated/**"]
declared:
  - id: com.example.Cleanup
    display_name: Cleanup
    recipe_list:
      - testing.assertj.IsEqualToEmptyString
      - id: testing.junit5.RemoveObsoleteRunners
        options: { obsoleteRunners: org.junit.runners.JUnit4 }
"#,
        )
        .unwrap();
        assert_eq!(config.recipes, vec!["com.example.Cleanup"]);
        assert_eq!(config.max_cycles, 2);
        assert_eq!(config.declared[0].recipe_list.len(), 2);
        assert_eq!(config.declared[0].recipe_list[0].id, "testing.assertj.IsEqualToEmptyString");
        assert!(config.declared[0].recipe_list[0].options.is_empty());
        assert_eq!(config.declared[0].recipe_list[1].options.len(), 1);

        let registry = config.registry().unwrap();
        let recipe = registry.build("com.example.Cleanup", &config.context()).unwrap();
        assert_eq!(recipe.recipe_list().len(), 2);

        let exclusions = config.exclusions().unwrap();
        assert!(RunConfig::is_excluded(&exclusions, Path::new("src/generated/A.java")));
        assert!(!RunConfig::is_excluded(&exclusions, Path::new("src/test/A.java")));
    }

    #[test]
    fn defaults_cover_bundled_classpath() {
        let config = RunConfig::from_yaml("recipes: [testing.assertj.JUnitToAssertj]\n").unwrap();
        assert_eq!(config.max_cycles, 3);
        assert_eq!(config.classpath.len(), DEFAULT_CLASSPATH.len());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            RunConfig::from_yaml("recipe: [x]\n"),
            Err(RecipeError::Config(_))
        ));
    }

    #[test]
    fn options_from_command_line() {
        let mut config = RunConfig::default();
        config
            .set_option("testing.junit5.RemoveObsoleteRunners.obsoleteRunners=[org.junit.runners.JUnit4]")
            .unwrap();
        let values = &config.options["testing.junit5.RemoveObsoleteRunners"];
        assert!(values["obsoleteRunners"].is_sequence());
        assert!(matches!(
            config.set_option("noequals"),
            Err(RecipeError::InvalidOption { .. })
        ));
    }
}
