//! Argument parsing and command dispatch.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use stache_render::{no_escape, CacheKey, MustacheEngine, TemplateCache, TemplateRegistry, Value};
use tracing::{debug, info};

use crate::data;

/// Render and check Mustache templates.
#[derive(Debug, Parser)]
#[command(name = "stache", version)]
#[command(about = "Render and check logic-less Mustache templates")]
pub struct Cli {
    /// Raise the log level (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log filter directive, takes precedence over --verbose
    #[arg(long = "log", env = "STACHE_LOG", global = true, value_name = "DIRECTIVE")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a template with JSON or YAML data
    Render(RenderArgs),

    /// Compile templates and report syntax errors
    Check(CheckArgs),

    /// Print the cache key of each template
    Key(KeyArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template file to render
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// Data file (.json, .yaml, .yml), or `-` for stdin
    #[arg(short, long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// Directory to load partials from (repeatable)
    #[arg(short, long = "partials", value_name = "DIR")]
    pub partials: Vec<PathBuf>,

    /// Disable HTML escaping of `{{name}}` tags
    #[arg(long)]
    pub raw: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Template files to compile
    #[arg(required = true, value_name = "TEMPLATE")]
    pub templates: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct KeyArgs {
    /// Template files to hash
    #[arg(required = true, value_name = "TEMPLATE")]
    pub templates: Vec<PathBuf>,
}

/// Runs a parsed command, writing results to `out`.
///
/// Returns `Ok(false)` when the command ran but found problems (a template
/// that failed `check`), and `Err` when it could not run at all.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<bool> {
    match &cli.command {
        Command::Render(args) => render(args, out).map(|()| true),
        Command::Check(args) => check(args, out),
        Command::Key(args) => key(args, out).map(|()| true),
    }
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read template {}", path.display()))
}

fn render(args: &RenderArgs, out: &mut dyn Write) -> Result<()> {
    let source = read_template(&args.template)?;

    let mut registry = TemplateRegistry::new();
    for dir in &args.partials {
        registry
            .add_template_dir(dir)
            .with_context(|| format!("failed to load partials from {}", dir.display()))?;
    }
    debug!(partials = registry.len(), "loaded partial directories");

    let mut engine = MustacheEngine::new().with_loader(registry);
    if args.raw {
        engine.set_escape(no_escape);
    }

    let name = args.template.display().to_string();
    engine.add_template(&name, &source)?;

    let data = data::load(args.data.as_deref())?;
    let rendered = engine
        .get_template(&name)?
        .render(&Value::from(data))
        .with_context(|| format!("failed to render {}", name))?;

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = rendered.len(), "wrote output");
        }
        None => out.write_all(rendered.as_bytes())?,
    }
    Ok(())
}

fn check(args: &CheckArgs, out: &mut dyn Write) -> Result<bool> {
    let cache = TemplateCache::new();
    let mut ok = true;

    for path in &args.templates {
        let result = read_template(path)
            .and_then(|source| cache.get_or_compile(&source).map_err(anyhow::Error::from));
        match result {
            Ok(compiled) => writeln!(out, "ok    {}  {}", path.display(), compiled.key())?,
            Err(err) => {
                ok = false;
                writeln!(out, "error {}: {:#}", path.display(), err)?;
            }
        }
    }
    Ok(ok)
}

fn key(args: &KeyArgs, out: &mut dyn Write) -> Result<()> {
    for path in &args.templates {
        let source = read_template(path)?;
        writeln!(out, "{}  {}", CacheKey::for_source(&source), path.display())?;
    }
    Ok(())
}
