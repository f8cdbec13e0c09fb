use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use reparse::cli::{CliArgs, RunConfig};
use reparse::config::SourceConfig;
use reparse::model::Position;
use reparse::source_view::{ParseState, SourceView};

fn main() -> Result<ExitCode> {
    reparse::tracing::init();

    let config = match CliArgs::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    run(config)
}

fn run(run: RunConfig) -> Result<ExitCode> {
    let config = SourceConfig::load();
    let timeout = run.timeout.unwrap_or_else(|| config.parse_timeout());

    let mut view = SourceView::open(&run.file, run.project.as_deref(), config)
        .with_context(|| format!("Failed to open {}", run.file.display()))?;

    if let Some(text) = &run.append {
        let revision = view.append(text);
        tracing::debug!(revision, "appended command-line text");
    }

    if !view.wait_until_current(timeout) {
        eprintln!(
            "Warning: parse of {} did not finish within {:?}",
            run.file.display(),
            timeout
        );
    }

    let status = view.parse_status();
    match status {
        ParseState::Unavailable => {
            println!("{}: no parse backend", view.file());
        }
        ParseState::NotParsed => {
            println!("{}: not parsed", view.file());
        }
        ParseState::Parsed(revision) => {
            println!("{} @ revision {}", view.file(), revision);
        }
    }

    if let Some(set) = view.annotations() {
        println!("\nhighlights:");
        for span in &set.highlights {
            println!("  {}  {} ({})", span.range, span.tag, span.category);
        }

        println!("\ndiagnostics:");
        for diagnostic in &set.diagnostics {
            let message = diagnostic.tooltip.replace('\n', " ");
            println!(
                "  {}  {:<18} {}",
                diagnostic.range,
                diagnostic.class.tag_name(),
                message
            );
        }

        println!("\ntypes:");
        for annotation in &set.types {
            println!("  {}  {}", annotation.range, annotation.display_text);
        }
    }

    if let Some(Position { line, column }) = run.completion_at {
        println!("\ncompletions at {}:{}:", line + 1, column + 1);
        for suggestion in view.request_completion(line, column) {
            println!("  {}", suggestion.display_text);
        }
    }

    view.shutdown();

    let has_errors = view
        .annotations()
        .is_some_and(|set| set.count_by_class(reparse::model::DiagnosticClass::Error) > 0);
    Ok(if has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
