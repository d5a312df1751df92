#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_errors_doc)]

mod config;
mod error;
mod logging;

use std::path::{Path, PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use tslower_parser::{json, sourcemap, Diagnostic, LineIndex, Severity, TransformOptions};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "tslower")]
#[command(author, version, about = "Strip types from TypeScript and lower it to JavaScript", long_about = None)]
struct Cli {
    /// Files to process. `.json` files are validated, `.map` files are
    /// decoded as source maps, everything else is transformed.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Write `<name>.js` files here instead of printing to stdout
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Config file (defaults to tslower.json in the working directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the working directory
    #[arg(long, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Parse as plain JavaScript
    #[arg(long)]
    js: bool,

    /// Reject decorators
    #[arg(long)]
    no_decorators: bool,

    /// Minify output
    #[arg(long)]
    minify: bool,

    /// Indentation for unminified output
    #[arg(long, value_name = "STRING")]
    indent: Option<String>,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit a JSON report on stdout and JSON log lines on stderr
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Flags win over the config file; flags that were not given leave the
    /// file's value alone.
    fn apply(&self, mut options: TransformOptions) -> TransformOptions {
        if self.js {
            options.parser.typescript = false;
        }
        if self.no_decorators {
            options.parser.allow_decorators = false;
        }
        if self.minify {
            options.codegen.minify = true;
        }
        if let Some(indent) = &self.indent {
            options.codegen.indent.clone_from(indent);
        }
        options
    }
}

/// One entry of the `--json` report.
#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let cwd = cli
        .cwd
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config_path = cli.config.as_ref().map(|path| cwd.join(path));
    let options = cli.apply(config::load(config_path.as_deref(), &cwd).into_diagnostic()?);
    debug!(?options, "resolved options");

    let out_dir = cli.out_dir.as_ref().map(|dir| cwd.join(dir));
    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)
            .map_err(|source| CliError::Write {
                path: dir.clone(),
                source,
            })
            .into_diagnostic()?;
    }

    let mut reports = Vec::with_capacity(cli.files.len());
    let mut failed = 0;
    for file in &cli.files {
        let path = cwd.join(file);
        let source = std::fs::read_to_string(&path)
            .map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })
            .into_diagnostic()?;

        let report = process(&path, &source, &options, out_dir.as_deref()).into_diagnostic()?;
        if report.diagnostics.iter().any(|d| d.severity == Severity::Error) {
            failed += 1;
        }
        if cli.json {
            reports.push(report);
        } else {
            print_diagnostics(&report.path, &source, &report.diagnostics);
            if let Some(code) = &report.code {
                print!("{code}");
            }
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&reports).map_err(CliError::from).into_diagnostic()?;
        println!("{json}");
    }

    if failed > 0 {
        warn!(failed, "finished with errors");
        return Err(CliError::Failed { count: failed }).into_diagnostic();
    }
    Ok(())
}

fn process(path: &Path, source: &str, options: &TransformOptions, out_dir: Option<&Path>) -> Result<FileReport, CliError> {
    let display = path.display().to_string();
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let (code, log) = match extension {
        "json" => {
            // tsconfig files allow comments and trailing commas
            let is_tsconfig = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("tsconfig") || name.starts_with("jsconfig"));
            let json_options = if is_tsconfig {
                json::JsonOptions::relaxed()
            } else {
                json::JsonOptions::default()
            };
            let (_, log) = json::parse(source, json_options);
            (None, log)
        }
        "map" => {
            let (map, log) = sourcemap::parse(source, &display);
            if let Some(map) = &map {
                info!(
                    path = %path.display(),
                    sources = map.sources.len(),
                    mappings = map.mappings.len(),
                    "decoded source map"
                );
            }
            (None, log)
        }
        _ => {
            let result = tslower_parser::transform(source, options.clone());
            (result.code, result.log)
        }
    };

    let mut report = FileReport {
        path: display,
        code,
        output: None,
        diagnostics: log.into_vec(),
    };

    if let (Some(dir), Some(code)) = (out_dir, report.code.take()) {
        let name = path.file_stem().map_or_else(|| "out".into(), |stem| stem.to_string_lossy().into_owned());
        let output = dir.join(format!("{name}.js"));
        std::fs::write(&output, code).map_err(|source| CliError::Write {
            path: output.clone(),
            source,
        })?;
        debug!(output = %output.display(), "wrote output");
        report.output = Some(output.display().to_string());
    }
    Ok(report)
}

/// `path:line:column: error: text`, followed by any notes.
fn print_diagnostics(path: &str, source: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let lines = LineIndex::new(source);
    for diagnostic in diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!(
            "{path}:{}: {severity}: {}",
            lines.display(diagnostic.span.start),
            diagnostic.text
        );
        for note in &diagnostic.notes {
            eprintln!("  {path}:{}: note: {}", lines.display(note.span.start), note.text);
        }
    }
}
