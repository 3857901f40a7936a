// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Fabgraph Contributors

//! Fabgraph CLI

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fabgraph::graph::run_script;
use fabgraph::{Bounds, EngineConfig, Graph, RenderRegion, Snapshot, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fabgraph")]
#[command(about = "Fabgraph - reactive CSG expression evaluator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to fabgraph.toml plus FABGRAPH_* overrides)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a formula and print its value
    Eval {
        formula: String,
    },

    /// Evaluate a shape formula and print its prefix form and bounds
    Shape {
        formula: String,

        /// Print the kernel snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the render region derived from a shape's bounds
    Region {
        formula: String,

        /// Voxels per unit (defaults to the configured scale)
        #[arg(short, long)]
        scale: Option<f64>,
    },

    /// Run a script file of `name = formula` lines and print its outputs
    Script {
        file: PathBuf,
    },

    /// Print the effective configuration or write a default one
    Config {
        /// Write a default configuration file to PATH
        #[arg(long, value_name = "PATH")]
        init: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let mut config = EngineConfig::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => EngineConfig::load()?,
    };
    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Eval { formula } => eval_command(&config, &formula),
        Commands::Shape { formula, json } => shape_command(&config, &formula, json),
        Commands::Region { formula, scale } => region_command(&config, &formula, scale),
        Commands::Script { file } => script_command(&config, &file),
        Commands::Config { init } => config_command(&config, init.as_deref()),
        Commands::Version => {
            println!("Fabgraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(config: &EngineConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn evaluate(config: &EngineConfig, formula: &str) -> Result<Value> {
    let mut graph = Graph::with_config(config.clone());
    graph.evaluate(formula).map_err(|err| anyhow!("{}", err))
}

fn evaluate_snapshot(config: &EngineConfig, formula: &str) -> Result<Snapshot> {
    let value = evaluate(config, formula)?;
    let expression = value.as_expression().map_err(|err| anyhow!("{}", err))?;
    Ok(Snapshot::of(expression))
}

fn format_bounds(bounds: &Bounds) -> String {
    let [x0, y0, z0, x1, y1, z1] = bounds.to_array();
    format!("({x0}, {y0}, {z0}) .. ({x1}, {y1}, {z1})")
}

fn eval_command(config: &EngineConfig, formula: &str) -> Result<()> {
    match evaluate(config, formula)? {
        Value::Expression(e) => {
            println!("{} {}", "Expression".cyan(), e.to_prefix());
            println!("{} {}", "Bounds:".bold(), format_bounds(e.bounds()));
        }
        value => println!("{} {}", value.type_name().cyan(), value),
    }
    Ok(())
}

fn shape_command(config: &EngineConfig, formula: &str, json: bool) -> Result<()> {
    let snapshot = evaluate_snapshot(config, formula)?;
    if json {
        println!("{}", snapshot.to_json()?);
    } else {
        println!("{} {}", "Formula:".bold(), snapshot.formula);
        println!("{} {}", "Bounds:".bold(), format_bounds(&snapshot.bounds));
    }
    Ok(())
}

fn region_command(config: &EngineConfig, formula: &str, scale: Option<f64>) -> Result<()> {
    let snapshot = evaluate_snapshot(config, formula)?;
    let scale = scale.unwrap_or(config.scale);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(anyhow!("--scale must be a finite positive number, got {}", scale));
    }
    let Some(region) = RenderRegion::from_snapshot(&snapshot, scale, config) else {
        eprintln!("{} Shape has no finite XY extent", "Error:".red());
        std::process::exit(1);
    };

    println!("{} {}", "Bounds:".bold(), format_bounds(&region.bounds));
    println!("{} {:.4}", "Scale:".bold(), region.scale);
    let [nx, ny, nz] = region.resolution;
    println!("{} {} x {} x {}", "Resolution:".bold(), nx, ny, nz);
    let voxels = region.voxel_count().to_string();
    if region.scale < scale {
        println!("{} {} (scale reduced to fit)", "Voxels:".bold(), voxels.yellow());
    } else {
        println!("{} {}", "Voxels:".bold(), voxels.green());
    }
    Ok(())
}

fn script_command(config: &EngineConfig, file: &Path) -> Result<()> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read script: {:?}", file))?;
    let mut graph = Graph::with_config(config.clone());
    let outputs = run_script(&mut graph, &source).map_err(|err| anyhow!("{}", err))?;

    for (name, value) in &outputs {
        match value {
            Value::Expression(e) => println!("{} = {}", name.cyan(), format_bounds(e.bounds())),
            value => println!("{} = {}", name.cyan(), value),
        }
    }
    Ok(())
}

fn config_command(config: &EngineConfig, init: Option<&Path>) -> Result<()> {
    match init {
        Some(path) => {
            EngineConfig::default().save(path)?;
            println!("{} Wrote default configuration to {}", "Success:".green(), path.display());
        }
        None => print!("{}", toml::to_string_pretty(config).context("Failed to serialize config")?),
    }
    Ok(())
}
