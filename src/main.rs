//! App Canvas CLI
//!
//! Usage:
//!   app-canvas [--config <FILE>] <COMMAND>
//!
//! Commands:
//!   eval <EXPR>          Resolve an FX expression or template
//!   lint <APP>           Check an application payload for layout problems
//!   normalize-id <TEXT>  Turn arbitrary text into a widget id
//!   catalog              List the configured widget types

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use app_canvas::fx::{resolve_expression, resolve_template, strip_wrapper, EvalContext, FxError};
use app_canvas::layout;
use app_canvas::widget::{normalize_widget_id_input, Registry, WidgetRegistry};
use app_canvas::{AppPayload, BuilderConfig};

#[derive(Parser)]
#[command(name = "app-canvas")]
#[command(about = "Widget tree, grid layout and FX expression tools for the app builder")]
struct Cli {
    /// Builder configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an FX expression (or template with --template) and print the value as JSON
    Eval {
        expression: String,

        /// JSON file describing the evaluation context
        #[arg(long)]
        context: Option<PathBuf>,

        /// Treat the input as a template mixing text and {{ }} segments
        #[arg(short, long)]
        template: bool,
    },
    /// Check an application payload (JSON) for overlaps, duplicate ids and dangling references
    Lint { app: PathBuf },
    /// Normalize arbitrary text into a widget id
    NormalizeId { text: String },
    /// List the widget types in the configured catalog
    Catalog,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match BuilderConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Eval {
            expression,
            context,
            template,
        } => run_eval(&expression, context.as_deref(), template),
        Command::Lint { app } => run_lint(&app),
        Command::NormalizeId { text } => println!("{}", normalize_widget_id_input(&text)),
        Command::Catalog => run_catalog(&config),
    }
}

fn read_json(path: &Path) -> Value {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error parsing JSON in '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn run_eval(expression: &str, context: Option<&Path>, template: bool) {
    let ctx = context
        .map(|path| EvalContext::from_json(&read_json(path)))
        .unwrap_or_default();

    let result = if template {
        resolve_template(expression, &ctx)
    } else {
        resolve_expression(expression, &ctx)
    };

    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        // Parse spans are relative to the unwrapped expression
        Err(FxError::Parse(errors)) if !template => {
            let source = strip_wrapper(expression);
            for error in &errors {
                eprint!("{}", error.format(source, "<expr>"));
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_lint(path: &Path) {
    let app: AppPayload = match serde_json::from_value(read_json(path)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error reading application payload '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };

    let warnings = layout::check(&app);
    for warning in &warnings {
        println!("{}", warning);
    }
    if !warnings.is_empty() {
        eprintln!("{} warning(s)", warnings.len());
        std::process::exit(1);
    }
}

fn run_catalog(config: &BuilderConfig) {
    let registry = match Registry::from_config(config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error building widget registry: {}", e);
            std::process::exit(1);
        }
    };

    for (category, definitions) in registry.by_category() {
        println!("{}:", category);
        for def in definitions {
            let children = if def.supports_children {
                ", children"
            } else {
                ""
            };
            println!(
                "  {} ({}, {} height{})",
                def.type_name,
                def.label,
                registry.default_height_mode(&def.type_name),
                children
            );
        }
    }
}
