use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rewrite_testing::recipe::RecipeDescriptor;
use rewrite_testing::sources::{run_files, write_changes};
use rewrite_testing::{DiffStats, RecipeRegistry, RunConfig, Severity};

#[derive(Parser)]
#[command(name = "rewrite-testing")]
#[command(about = "Migrate Java test sources from JUnit assertions to AssertJ and tidy Mockito imports")]
#[command(long_about = "Pattern-directed rewriter for Java test sources.

Sources are parsed into a lossless tree, attributed against a bundled
classpath and rewritten by recipes until nothing changes. Only the edited
regions differ from the input; everything else is printed back verbatim.

COMMON USE CASES:
  Convert JUnit Jupiter assertions to AssertJ (dry run, prints a diff):
    rewrite-testing run --recipe testing.assertj.JUnitToAssertj src/test/java

  Drop @RunWith(JUnit4.class) and write the result:
    rewrite-testing run --recipe testing.junit5.RemoveObsoleteRunners \\
        --option testing.junit5.RemoveObsoleteRunners.obsoleteRunners=org.junit.runners.JUnit4 \\
        src/test/java --apply")]
#[command(after_help = "For detailed help on any command, use: rewrite-testing <COMMAND> --help")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available recipes and their options
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = ListFormat::Text)]
        format: ListFormat,
    },

    /// Run recipes over Java sources
    #[command(after_help = "EXAMPLES:
    # Preview the AssertJ migration of one module
    rewrite-testing run --recipe testing.assertj.JUnitToAssertj module/src/test/java

    # Several recipes, with settings from a file
    rewrite-testing run --config rewrite.yml --recipe testing.mockito.CleanupMockitoImports 'src/**/*Test.java'

CONFIG FILE (YAML):
    recipes: [testing.assertj.JUnitToAssertj]
    options:
      testing.junit5.RemoveObsoleteRunners:
        obsoleteRunners: [org.junit.runners.JUnit4]
    exclude: ['**/generated/**']
    max_cycles: 3")]
    Run {
        /// Recipe ids to run, in order (appended to the config file's list)
        #[arg(short, long = "recipe")]
        recipes: Vec<String>,

        /// YAML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Option value as <recipe>.<option>=<value>; the value is read as YAML
        #[arg(short, long = "option")]
        options: Vec<String>,

        /// Exclude paths matching these glob patterns (can be used multiple times)
        #[arg(long)]
        exclude: Vec<String>,

        /// Files, directories or glob patterns
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write changes (default is dry-run)
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { format } => {
            let registry = RecipeRegistry::builtin().context("Failed to load bundled recipes")?;
            let descriptors: Vec<&RecipeDescriptor> = registry.descriptors().collect();
            match format {
                ListFormat::Json => println!("{}", serde_json::to_string_pretty(&descriptors)?),
                ListFormat::Text => print_descriptors(&descriptors),
            }
        }

        Commands::Run { recipes, config, options, exclude, paths, apply } => {
            let mut run_config = match &config {
                Some(path) => {
                    let text = std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read config {}", path.display()))?;
                    RunConfig::from_yaml(&text)
                        .with_context(|| format!("Invalid config {}", path.display()))?
                }
                None => RunConfig::default(),
            };
            run_config.recipes.extend(recipes);
            run_config.exclude.extend(exclude);
            for option in &options {
                run_config
                    .set_option(option)
                    .with_context(|| format!("Invalid --option {option}"))?;
            }
            if run_config.recipes.is_empty() {
                bail!("No recipes given; pass --recipe or list them in a config file");
            }

            execute_run(&run_config, &paths, apply)?;
        }
    }

    Ok(())
}

fn print_descriptors(descriptors: &[&RecipeDescriptor]) {
    for descriptor in descriptors {
        println!("{}", descriptor.id);
        println!("    {}", descriptor.display_name);
        for child in &descriptor.recipe_list {
            println!("    - {child}");
        }
        for option in &descriptor.options {
            let required = if option.required { " (required)" } else { "" };
            println!("    --option {}.{}=<{:?}>{required}", descriptor.id, option.name, option.kind);
            if !option.description.is_empty() {
                println!("        {}", option.description);
            }
        }
    }
}

fn execute_run(config: &RunConfig, paths: &[PathBuf], apply: bool) -> Result<()> {
    let outcome = run_files(config, paths).context("Failed to run recipes")?;
    let run = &outcome.run;

    let mut total = DiffStats::default();
    for result in run.changed() {
        let (diff, stats) = result.diff();
        print!("{diff}");
        total.add(&stats);
    }

    for diagnostic in run.diagnostics.iter().filter(|d| d.severity > Severity::Debug) {
        eprintln!("{diagnostic}");
    }
    for error in &outcome.parse_errors {
        eprintln!("error: {error}");
    }
    for (path, error) in run.errors() {
        eprintln!("error: {}: {error}", path.display());
    }

    if total.is_empty() {
        println!("No changes");
    } else {
        println!("\n{total}");
    }

    if apply {
        let written = write_changes(run).context("Failed to write changes")?;
        println!("Wrote {written} file(s)");
    } else if !total.is_empty() {
        println!("Dry run; pass --apply to write changes");
    }

    let failed = outcome.parse_errors.len() + run.errors().count();
    if failed > 0 {
        bail!("{failed} file(s) could not be processed");
    }
    Ok(())
}
