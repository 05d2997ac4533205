use anyhow::{bail, Context, Result};
use astcfg_core::cfg::{dot, dump};
use astcfg_core::{validate, Ast, CfgBuilder, CfgConfig, CfgError};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "astcfg", version, about = "Build control-flow graphs from JSON ASTs", long_about = None)]
struct Cli {
    /// JSON AST files to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Builder configuration (YAML, or JSON when the extension is .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check graph invariants and exit non-zero if any are violated
    #[arg(long)]
    validate: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Dot,
}

/// What one input produced.
struct Rendered {
    text: String,
    violations: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "astcfg=debug" } else { "astcfg=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn process(path: &Path, config: &CfgConfig, format: Format, check: bool) -> Result<Rendered> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let ast = Ast::from_json(&source)
        .with_context(|| format!("failed to load AST from {}", path.display()))?;

    let module = CfgBuilder::new(&ast, config.clone())
        .build()
        .map_err(|err| internal_error(path, err))?;
    debug!(
        input = %path.display(),
        functions = module.functions().len(),
        blocks = module.block_count(),
        "built CFG"
    );

    let text = match format {
        Format::Text => dump::render_module(&module, &ast),
        Format::Dot => dot::render_to_string(&module, &ast)
            .with_context(|| format!("failed to render {}", path.display()))?,
    };

    let violations = if check {
        validate(&module, &ast)
            .into_iter()
            .map(|violation| violation.to_string())
            .collect()
    } else {
        Vec::new()
    };

    Ok(Rendered { text, violations })
}

/// Build-time errors mean an earlier stage handed over a broken tree.
fn internal_error(path: &Path, err: CfgError) -> anyhow::Error {
    anyhow::Error::new(err).context(format!(
        "internal compiler error while building the CFG of {}",
        path.display()
    ))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => CfgConfig::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => CfgConfig::default(),
    };
    debug!(?config, "using builder config");

    let results: Vec<Result<Rendered>> = cli
        .inputs
        .par_iter()
        .map(|path| process(path, &config, cli.format, cli.validate))
        .collect();

    let mut out = String::new();
    let mut violation_count = 0;
    for (path, result) in cli.inputs.iter().zip(results) {
        let rendered = result?;
        if cli.inputs.len() > 1 && cli.format == Format::Text {
            out.push_str(&format!("== {} ==\n", path.display()));
        }
        out.push_str(&rendered.text);
        for violation in &rendered.violations {
            eprintln!("{}: {}", path.display(), violation);
        }
        violation_count += rendered.violations.len();
    }

    match &cli.output {
        Some(path) => fs::write(path, &out)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout()
            .write_all(out.as_bytes())
            .context("failed to write to stdout")?,
    }

    if violation_count > 0 {
        bail!("{} CFG invariant violation(s)", violation_count);
    }
    info!(inputs = cli.inputs.len(), "done");
    Ok(())
}
