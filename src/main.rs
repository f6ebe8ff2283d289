//! buildcfg CLI
//!
//! Entry point for the `buildcfg` command-line tool invoked by the app's
//! build scripts.

use clap::{Parser, Subcommand, ValueEnum};
use mobile_buildcfg::config::{parse_override, ProjectConfig, PROJECT_CONFIG_FILE, TABLE_VERSION};
use mobile_buildcfg::{
    logging, BuildConfigError, ConfigResolver, JsonFilePublisher, Pipeline, PipelineInputs,
    PublishedConfig, RawProperties,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "buildcfg")]
#[command(about = "Resolve mobile app build configuration", version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Properties,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration for one build type
    Resolve {
        /// Build type: debug, profile or release
        #[arg(long, short = 't')]
        build_type: String,

        /// Properties file (missing file is not an error)
        #[arg(long, short = 'p', default_value = "local.properties")]
        properties: PathBuf,

        /// Project config file (default: buildcfg.toml)
        #[arg(long, short = 'c')]
        project: Option<PathBuf>,

        /// Override a parameter (repeatable), e.g. -P app.versionCode=42
        #[arg(short = 'P', value_name = "KEY=VALUE", value_parser = parse_override)]
        overrides: Vec<(String, String)>,

        /// Output format on stdout
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Also write the JSON snapshot to this file
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Print the defaults table
    Defaults {
        /// Project config file (default: buildcfg.toml)
        #[arg(long, short = 'c')]
        project: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::Resolve {
            build_type,
            properties,
            project,
            overrides,
            format,
            out,
        } => run_resolve(build_type, properties, project, overrides, format, out),
        Commands::Defaults { project, json } => run_defaults(project, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn load_project(path: Option<PathBuf>) -> Result<ProjectConfig, BuildConfigError> {
    match path {
        // An explicit path must exist
        Some(path) => Ok(ProjectConfig::from_file(&path)?),
        None => Ok(ProjectConfig::load_optional(&PathBuf::from(PROJECT_CONFIG_FILE))?),
    }
}

fn run_resolve(
    build_type: String,
    properties: PathBuf,
    project: Option<PathBuf>,
    overrides: Vec<(String, String)>,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<(), BuildConfigError> {
    let project = load_project(project)?;
    let resolver = ConfigResolver::new(project.defaults_table()?);
    let selector = project.variant_selector()?;

    let inputs = PipelineInputs::new(build_type)
        .with_properties_path(properties)
        .with_overrides(RawProperties::from_pairs(overrides));

    let file_publisher = out.map(JsonFilePublisher::new);
    let mut pipeline = Pipeline::new(resolver, selector);
    if let Some(ref publisher) = file_publisher {
        pipeline = pipeline.with_publisher(publisher);
    }

    let published = pipeline.run(&inputs)?;
    print_published(&published, format)
}

fn print_published(published: &PublishedConfig, format: OutputFormat) -> Result<(), BuildConfigError> {
    match format {
        OutputFormat::Json => {
            let json = published
                .to_json()
                .map_err(|e| BuildConfigError::Publish(e.into()))?;
            println!("{}", json);
        }
        OutputFormat::Properties => print!("{}", published.to_properties()),
    }
    Ok(())
}

fn run_defaults(project: Option<PathBuf>, json_output: bool) -> Result<(), BuildConfigError> {
    let table = load_project(project)?.defaults_table()?;

    if json_output {
        let rows: Vec<serde_json::Value> = table
            .entries()
            .map(|row| {
                serde_json::json!({
                    "key": row.key(),
                    "type": row.value_type(),
                    "default": row.fallback,
                    "aliases": row.param.aliases(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "table_version": TABLE_VERSION,
            "defaults": rows,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => return Err(BuildConfigError::Publish(e.into())),
        }
    } else {
        println!("Defaults (table version {}):\n", TABLE_VERSION);
        for row in table.entries() {
            print!("  {} = {} ({})", row.key(), row.fallback, row.value_type());
            let aliases = row.param.aliases();
            if !aliases.is_empty() {
                print!("  aliases: {}", aliases.join(", "));
            }
            println!();
        }
    }

    Ok(())
}
