//! topicgen: generate Rd topics, NAMESPACE and collation order from
//! annotated R sources, and answer help-style lookups.
//!
//! - `topicgen build -o out R/` writes `out/man/*.Rd`, `out/NAMESPACE`,
//!   `out/COLLATE` and `out/aliases.tsv`
//! - `topicgen lookup 'area(numeric)' R/` resolves a query against the sources
//! - `topicgen lookup --scope compiled --dir out arrange` resolves it against
//!   a previous build

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use topicgen::config::Config;
use topicgen::parser::SUPPORTED_EXTENSIONS;
use topicgen::render::{self, rd::RdRenderer};
use topicgen::{artifacts, AliasPolicy, Generation, Options, Resolver, Scope, SourceUnit, TopicStore};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TOPICGEN_LOG";

#[derive(Parser)]
#[command(
    name = "topicgen",
    version,
    about = "Generate documentation topics from annotated R source files"
)]
struct Cli {
    /// Config file (default: ./topicgen.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that reads sources.
#[derive(clap::Args)]
struct SourceArgs {
    /// Package name for `"_PACKAGE"` blocks without `@name`
    #[arg(long)]
    package: Option<String>,

    /// Documentation comment marker
    #[arg(long)]
    marker: Option<String>,

    /// Policy when a package alias collides with a symbol: prefer-symbol, strict
    #[arg(long)]
    alias_policy: Option<AliasPolicy>,
}

#[derive(Subcommand)]
enum Command {
    /// Build topics and write all artifacts
    Build {
        /// Input files, directories or glob patterns
        #[arg(default_value = "R")]
        inputs: Vec<String>,

        /// Output directory
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format: rd (default), json
        #[arg(short = 'f', long, default_value = "rd")]
        format: String,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Resolve a query: `name`, `package?name`, `class?name` or `generic(type, ...)`
    Lookup {
        query: String,

        /// Input files, directories or glob patterns (source scope)
        #[arg(default_value = "R")]
        inputs: Vec<String>,

        /// Where to search: source or compiled
        #[arg(long, default_value = "source")]
        scope: Scope,

        /// Build output directory (compiled scope)
        #[arg(long)]
        dir: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::discover(cli.config.as_deref(), Path::new("."))?;

    match cli.command {
        Command::Build {
            inputs,
            output,
            format,
            source,
        } => {
            let output = output
                .or_else(|| config.output.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            build(&inputs, &output, &format, &options(&config, source))
        }
        Command::Lookup {
            query,
            inputs,
            scope,
            dir,
            source,
        } => {
            let dir = dir
                .or_else(|| config.output.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            lookup(&query, scope, &inputs, &dir, &options(&config, source))
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

/// Config file values, overridden by flags.
fn options(config: &Config, args: SourceArgs) -> Options {
    let mut opts = config.options();
    if let Some(package) = args.package {
        opts.package = Some(package);
    }
    if let Some(marker) = args.marker {
        opts.marker = marker;
    }
    if let Some(policy) = args.alias_policy {
        opts.alias_policy = policy;
    }
    opts
}

fn build(inputs: &[String], output: &Path, format: &str, opts: &Options) -> Result<ExitCode> {
    let renderer = render::create_renderer(format)?;
    let gen = generate(inputs, opts)?;

    let summary = artifacts::write_all(&gen, output, renderer.as_ref())
        .with_context(|| format!("failed to write output to {}", output.display()))?;
    tracing::info!(
        written = summary.written.len(),
        removed = summary.removed.len(),
        "wrote {}",
        output.display()
    );

    Ok(status(&gen))
}

fn lookup(query: &str, scope: Scope, inputs: &[String], dir: &Path, opts: &Options) -> Result<ExitCode> {
    let mut resolver = Resolver::new();
    let store = match scope {
        Scope::Source => {
            let gen = generate(inputs, opts)?;
            TopicStore::from_topics(gen.index, &gen.topics, &RdRenderer)
        }
        Scope::Compiled => TopicStore::load(dir)
            .with_context(|| format!("failed to load compiled topics from {}", dir.display()))?,
    };
    resolver.set(scope, Arc::new(store));

    match resolver.lookup(query, scope) {
        Ok(topic) => {
            print!("{}", topic.text);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Read inputs, run the pipeline and report diagnostics.
fn generate(inputs: &[String], opts: &Options) -> Result<Generation> {
    let files = expand_globs(inputs)?;
    let mut units = Vec::with_capacity(files.len());
    for path in &files {
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        units.push(SourceUnit::new(path.to_string_lossy(), text));
    }
    tracing::debug!(units = units.len(), "read sources");

    let gen = topicgen::run(&units, opts)?;
    for diag in &gen.diagnostics {
        if diag.is_error() {
            eprintln!("error: {diag}");
        } else {
            tracing::warn!("{diag}");
        }
    }
    Ok(gen)
}

fn status(gen: &Generation) -> ExitCode {
    if gen.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Expand glob patterns into a list of real file paths.
/// Also handles bare directory paths by scanning for supported file types.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        // Directories are scanned non-recursively
        if path.is_dir() {
            let entries =
                fs::read_dir(path).with_context(|| format!("failed to read directory: {}", path.display()))?;
            for entry in entries.flatten() {
                let p = entry.path();
                if p.is_file() && has_supported_extension(&p) {
                    files.push(p);
                }
            }
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            tracing::warn!("no files matched: {}", pattern);
        }
        files.extend(matches);
    }
    // Sort for deterministic collation tie-breaks
    files.sort();
    files.dedup();
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}
