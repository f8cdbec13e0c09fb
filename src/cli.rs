//! Command-line argument parsing for the reparse tool
//!
//! Supports:
//! - Opening one C/C++ source file
//! - Choosing the project directory holding `compile_commands.json`
//! - Appending text before the wait (exercises incremental reparse)
//! - Completion at a line:column position

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Position;

/// Parse a C/C++ file in the background and print its annotations
#[derive(Parser, Debug)]
#[command(
    name = "reparse",
    version,
    about = "Parse a C/C++ file in the background and print its annotations"
)]
pub struct CliArgs {
    /// Source file to open
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Directory containing compile_commands.json (defaults to the file's directory)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Request completion at LINE:COL (1-indexed)
    #[arg(long, value_name = "LINE:COL")]
    pub complete: Option<String>,

    /// Append TEXT to the buffer after opening
    #[arg(long, value_name = "TEXT")]
    pub append: Option<String>,

    /// How long to wait for the parse, overriding the config
    #[arg(long, value_name = "N")]
    pub timeout_ms: Option<u64>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub file: PathBuf,
    pub project: Option<PathBuf>,
    /// Completion position, converted to 0-indexed
    pub completion_at: Option<Position>,
    /// Text appended after the view opens, with `\n` escapes expanded
    pub append: Option<String>,
    pub timeout: Option<Duration>,
}

impl CliArgs {
    /// Convert parsed CLI args into a run configuration
    pub fn into_config(self) -> Result<RunConfig, String> {
        if self.file.is_dir() {
            return Err(format!("{} is a directory", self.file.display()));
        }

        let completion_at = self
            .complete
            .as_deref()
            .map(parse_line_col)
            .transpose()?;

        Ok(RunConfig {
            file: self.file,
            project: self.project,
            completion_at,
            append: self.append.map(|text| unescape(&text)),
            timeout: self.timeout_ms.map(Duration::from_millis),
        })
    }
}

/// `"3:14"` -> `Position { line: 2, column: 13 }`
fn parse_line_col(arg: &str) -> Result<Position, String> {
    let (line, column) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected LINE:COL, got '{arg}'"))?;
    let line: usize = line
        .trim()
        .parse()
        .map_err(|_| format!("invalid line in '{arg}'"))?;
    let column: usize = column
        .trim()
        .parse()
        .map_err(|_| format!("invalid column in '{arg}'"))?;

    // Convert from 1-indexed (user input) to 0-indexed (internal)
    Ok(Position::new(line.saturating_sub(1), column.saturating_sub(1)))
}

/// Expand `\n`, `\t` and `\\` so multi-line appends fit on a command line
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: &str) -> CliArgs {
        CliArgs {
            file: PathBuf::from(file),
            project: None,
            complete: None,
            append: None,
            timeout_ms: None,
        }
    }

    #[test]
    fn test_plain_file() {
        let config = args("main.c").into_config().unwrap();
        assert_eq!(config.file, PathBuf::from("main.c"));
        assert!(config.completion_at.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_line_col_conversion() {
        let mut a = args("main.c");
        a.complete = Some("42:10".to_string());
        let config = a.into_config().unwrap();
        assert_eq!(config.completion_at, Some(Position::new(41, 9)));
    }

    #[test]
    fn test_line_col_zero_saturates() {
        assert_eq!(parse_line_col("0:0"), Ok(Position::new(0, 0)));
    }

    #[test]
    fn test_bad_line_col_is_rejected() {
        assert!(parse_line_col("12").is_err());
        assert!(parse_line_col("a:3").is_err());
        assert!(parse_line_col("3:").is_err());
    }

    #[test]
    fn test_append_escapes() {
        let mut a = args("main.c");
        a.append = Some(r"}\n\tx\\y\q".to_string());
        let config = a.into_config().unwrap();
        assert_eq!(config.append.as_deref(), Some("}\n\tx\\y\\q"));
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(&dir.path().to_string_lossy());
        assert!(a.into_config().is_err());
    }

    #[test]
    fn test_clap_parses_flags() {
        let parsed = CliArgs::try_parse_from([
            "reparse",
            "src/a.cpp",
            "--project",
            "build",
            "--complete",
            "1:5",
            "--timeout-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(parsed.project, Some(PathBuf::from("build")));
        assert_eq!(parsed.timeout_ms, Some(250));
        assert_eq!(parsed.complete.as_deref(), Some("1:5"));
    }
}
