use crate::Program;
use std::path::PathBuf;
use thiserror::Error;

const STDERR_TAIL_LINES: usize = 5;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("could not start `{program}` (is AFNI on PATH?)")]
    Spawn {
        program: Program,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` {}: {}", describe_exit(.code), tail(.stderr))]
    Exit {
        program: Program,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("could not parse a number from `{program}` output: {output:?}")]
    Parse { program: Program, output: String },
    #[error("`{program}` reported {detail}")]
    Unexpected { program: Program, detail: String },
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("unsupported dataset name `{}`, expected .nii, .nii.gz or an AFNI prefix+view", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("unknown AFNI view `{view}` in `{}`", .path.display())]
    UnknownView { path: PathBuf, view: String },
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error("could not read NIfTI header of {}", .path.display())]
    Nifti {
        path: PathBuf,
        #[source]
        source: nifti::error::NiftiError,
    },
    #[error("could not read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no `{name}` attribute", .path.display())]
    MissingAttribute { path: PathBuf, name: &'static str },
    #[error("{} has a malformed `{name}` attribute", .path.display())]
    MalformedAttribute { path: PathBuf, name: &'static str },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with status {}", c),
        None => "was terminated by a signal".to_string(),
    }
}

fn tail(stderr: &str) -> String {
    let lines = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>();
    if lines.is_empty() {
        return "no diagnostic output".to_string();
    }
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_message_keeps_last_lines() {
        let stderr = (1..=8).map(|i| format!("line {}\n", i)).collect::<String>();
        let e = ToolError::Exit {
            program: Program::Calc,
            code: Some(1),
            stdout: String::new(),
            stderr,
        };
        assert_eq!(
            e.to_string(),
            "`3dcalc` exited with status 1: line 4 | line 5 | line 6 | line 7 | line 8"
        );
    }

    #[test]
    fn signal_exit_without_stderr() {
        let e = ToolError::Exit {
            program: Program::Merge,
            code: None,
            stdout: String::new(),
            stderr: "\n  \n".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "`3dmerge` was terminated by a signal: no diagnostic output"
        );
    }
}
