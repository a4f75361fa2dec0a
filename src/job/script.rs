//! Shell script syntax tree
//!
//! Scripts are assembled as a list of statements and rendered once. A
//! batch job submitted through `sbatch` is itself a script, nested in a
//! here-document.

use super::SlurmHeader;
use std::fmt::Write;
use std::path::PathBuf;

/// A single statement of a shell script
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Comment(String),
    Blank,
    /// `mkdir -p <path>`
    MakeDirectory(PathBuf),
    /// A command line, verbatim
    Command(String),
    /// Submit a batch script to SLURM through a here-document
    Submit {
        job_name: String,
        sbatch_options: Vec<String>,
        delimiter: String,
        script: BatchScript,
    },
    /// Pause between two submissions
    Sleep(u64),
}

/// SLURM batch script: header, environment block, job steps
#[derive(Debug, Clone, PartialEq)]
pub struct BatchScript {
    pub header: SlurmHeader,
    pub environment: Vec<String>,
    pub steps: Vec<Statement>,
}

/// Executable shell script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellScript {
    pub statements: Vec<Statement>,
}

impl ShellScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Render the script, starting with the interpreter line and `set -e`
    pub fn render(&self) -> String {
        let mut out = String::from("#!/usr/bin/env bash\nset -e\n\n");

        for statement in &self.statements {
            render_statement(&mut out, statement);
        }

        out
    }
}

impl BatchScript {
    /// Render the batch script
    pub fn render(&self) -> String {
        let mut out = String::from("#!/usr/bin/env bash\n");

        for line in self.header.lines() {
            out.push_str(&line);
            out.push('\n');
        }

        out.push('\n');

        if !self.environment.is_empty() {
            for line in &self.environment {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }

        for statement in &self.steps {
            render_statement(&mut out, statement);
        }

        out
    }
}

fn render_statement(out: &mut String, statement: &Statement) {
    match statement {
        Statement::Comment(text) => {
            let _ = writeln!(out, "# {}", text);
        }
        Statement::Blank => out.push('\n'),
        Statement::MakeDirectory(path) => {
            let _ = writeln!(out, "mkdir -p {}", shell_quote(&path.display().to_string()));
        }
        Statement::Command(command) => {
            out.push_str(command);
            out.push('\n');
        }
        Statement::Submit {
            job_name,
            sbatch_options,
            delimiter,
            script,
        } => {
            let mut line = format!("sbatch --job-name {}", job_name);
            for option in sbatch_options {
                line.push(' ');
                line.push_str(option);
            }
            let _ = writeln!(out, "{} << {}", line, delimiter);
            out.push_str(&script.render());
            let _ = writeln!(out, "{}", delimiter);
        }
        Statement::Sleep(seconds) => {
            let _ = writeln!(out, "sleep {}s", seconds);
        }
    }
}

/// Quote a word for the shell, leaving plain words as they are
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));

    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
