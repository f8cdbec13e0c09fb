//! Compilation database lookup
//!
//! Reads `compile_commands.json` from the project directory and turns the
//! recorded compiler invocation for a file into backend arguments.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DATABASE_FILE: &str = "compile_commands.json";

#[derive(Debug, Clone, Deserialize)]
pub struct CompileCommand {
    pub directory: PathBuf,
    pub file: PathBuf,
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
    #[serde(default)]
    pub command: Option<String>,
}

impl CompileCommand {
    /// Full argv, including the compiler
    pub fn argv(&self) -> Vec<String> {
        match (&self.arguments, &self.command) {
            (Some(arguments), _) => arguments.clone(),
            (None, Some(command)) => split_command(command),
            (None, None) => Vec::new(),
        }
    }

    fn source_path(&self) -> PathBuf {
        if self.file.is_absolute() {
            self.file.clone()
        } else {
            self.directory.join(&self.file)
        }
    }

    fn matches(&self, file: &Path) -> bool {
        same_file(&self.source_path(), file)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilationDatabase {
    commands: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Load `<project>/compile_commands.json`
    pub fn load(project: &Path) -> Result<Self> {
        let path = project.join(DATABASE_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let commands: Vec<CompileCommand> = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(
            "Loaded {} compile commands from {}",
            commands.len(),
            path.display()
        );
        Ok(Self { commands })
    }

    /// Load, or an empty database if the file is missing or unreadable
    pub fn load_or_empty(project: &Path) -> Self {
        match Self::load(project) {
            Ok(db) => db,
            Err(e) => {
                tracing::debug!("No compilation database: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Backend arguments for `file`.
    ///
    /// Every matching entry contributes its arguments with the compiler, the
    /// output pair, `-c` and the source path removed. Header files are forced
    /// to C++.
    pub fn arguments_for(&self, file: &Path) -> Vec<String> {
        let mut args = Vec::new();
        for command in self.commands.iter().filter(|c| c.matches(file)) {
            args.extend(strip_invocation(&command.argv(), &command.source_path(), &command.file));
        }
        if args.is_empty() {
            tracing::debug!("No compile command for {}", file.display());
        }

        let is_header = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("h"));
        if is_header {
            args.push("-xc++".to_string());
        }
        args
    }
}

/// Project directory used when none is given: the file's parent
pub fn default_project(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn strip_invocation(argv: &[String], source: &Path, recorded: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut iter = argv.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" => {
                iter.next();
            }
            "-c" => {}
            _ if arg.starts_with("-o") && arg.len() > 2 => {}
            _ if Path::new(arg) == recorded || same_file(Path::new(arg), source) => {}
            _ => out.push(arg.clone()),
        }
    }
    out
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Split a shell-like command line on whitespace, honoring double quotes
pub fn split_command(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_arg = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_arg = true;
            }
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_arg {
                    args.push(std::mem::take(&mut current));
                    has_arg = false;
                }
            }
            c => {
                current.push(c);
                has_arg = true;
            }
        }
    }
    if has_arg {
        args.push(current);
    }
    args
}
