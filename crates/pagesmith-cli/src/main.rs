//! `pagesmith`: renders explicitly listed content files through one run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use pagesmith::{ContentFile, Pipeline, PipelineError, PluginError, RunSummary, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pagesmith")]
#[command(version, about = "Render content files through Jinja-style layouts", long_about = None)]
struct Cli {
    /// YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template search directory (repeatable, first match wins)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Global variable exposed as `global.KEY` (value parsed as YAML)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, serde_json::Value)>,

    /// Directory filter paths resolve against
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output directory; required for more than one file
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Stop at the first file that reports an error
    #[arg(long)]
    fail: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Content files to render
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn parse_var(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    if key.is_empty() {
        return Err("variable name is empty".to_string());
    }
    let value = serde_yaml::from_str::<serde_json::Value>(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Where a rendered file is written below `out`.
fn output_path(out: &Path, root: &Path, path: &Path) -> PathBuf {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) if path.is_relative() => path.to_path_buf(),
        Err(_) => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    };
    out.join(relative)
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "pagesmith=info",
        1 => "pagesmith=debug",
        _ => "pagesmith=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    settings.paths.extend(cli.include.iter().cloned());
    for (key, value) in &cli.vars {
        settings.variables.insert(key.clone(), value.clone());
    }
    if let Some(root) = &cli.root {
        settings.root = Some(root.clone());
    }
    if cli.fail {
        settings.fail_on_error = true;
    }
    Ok(settings)
}

fn write_outputs(cli: &Cli, root: &Path, files: &[ContentFile]) -> Result<()> {
    let Some(out) = &cli.out else {
        let mut stdout = std::io::stdout().lock();
        for file in files {
            if let Some(bytes) = file.contents.as_bytes() {
                stdout.write_all(bytes)?;
            }
        }
        return Ok(());
    };

    for file in files {
        let target = output_path(out, root, &file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let bytes = file.contents.as_bytes().unwrap_or_default();
        fs::write(&target, bytes).with_context(|| format!("writing {}", target.display()))?;
        tracing::debug!(path = %target.display(), "wrote");
    }
    Ok(())
}

fn print_errors(errors: &[PluginError]) {
    for error in errors {
        match &error.path {
            Some(path) => eprintln!("{}: {}", path.display(), error),
            None => eprintln!("{}", error),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    eprintln!(
        "{} rendered, {} passed through, {} failed, {} dropped, {} error(s)",
        summary.rendered,
        summary.passed_through,
        summary.failed,
        summary.dropped,
        summary.errors.len()
    );
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.out.is_none() && cli.files.len() > 1 {
        bail!("--out is required when rendering more than one file");
    }

    let config = settings(&cli)?.into_config();
    let root = config.root().to_path_buf();
    let pipeline = Pipeline::new(config);

    let files = cli
        .files
        .iter()
        .map(|path| {
            ContentFile::from_path(path).with_context(|| format!("reading {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    match pipeline.run(files) {
        Ok(summary) => {
            write_outputs(&cli, &root, &summary.files)?;
            print_errors(&summary.errors);
            if cli.out.is_some() {
                print_summary(&summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::Aborted {
            path,
            errors,
            file,
            mut completed,
        }) => {
            completed.extend(file);
            write_outputs(&cli, &root, &completed)?;
            print_errors(&errors);
            eprintln!("aborted at {}", path.display());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
