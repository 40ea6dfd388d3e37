use crate::{error::ToolError, invocation::Invocation};
use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

/// Quiets AFNI's chatter about NIfTI type conversions and environment files.
const QUIET_ENV: &[(&str, &str)] = &[
    ("AFNI_NIFTI_TYPE_WARN", "NO"),
    ("AFNI_ENVIRON_WARNINGS", "NO"),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn new<S: Into<String>>(stdout: S) -> ToolOutput {
        ToolOutput {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// The last number printed on stdout, the way the AFNI query programs
    /// report a single value.
    pub fn scalar(&self, invocation: &Invocation) -> Result<f64, ToolError> {
        self.stdout
            .split_whitespace()
            .last()
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| ToolError::Parse {
                program: invocation.program(),
                output: self.stdout.trim().to_string(),
            })
    }
}

/// Something that can execute an AFNI invocation and wait for it.
pub trait Runner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Runs AFNI binaries as blocking child processes, from `PATH` unless an
/// install directory is given.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    bin_dir: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> SystemRunner {
        SystemRunner::default()
    }

    /// Use the binaries in `dir` instead of searching `PATH`.
    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> SystemRunner {
        SystemRunner {
            bin_dir: Some(dir.into()),
        }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let name = invocation.program().to_string();
        match &self.bin_dir {
            Some(dir) => Command::new(dir.join(name)),
            None => Command::new(name),
        }
    }
}

impl Runner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program();
        log::trace!("running: {}", invocation);

        let output = self
            .command(invocation)
            .args(invocation.arguments())
            .envs(QUIET_ENV.iter().copied())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ToolError::Spawn { program, source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        log::trace!("{} stdout: {}", program, stdout.trim_end());
        log::trace!("{} stderr: {}", program, stderr.trim_end());

        if !output.status.success() {
            return Err(ToolError::Exit {
                program,
                code: output.status.code(),
                stdout,
                stderr,
            });
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

/// The installed AFNI version, or `Unknown` when it cannot be queried.
pub fn version(runner: &dyn Runner) -> String {
    match runner.run(&Invocation::version()) {
        Ok(out) if !out.stdout.trim().is_empty() => out.stdout.trim().to_string(),
        Ok(_) => "Unknown".to_string(),
        Err(e) => {
            log::debug!("could not query AFNI version: {}", e);
            "Unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::Program;

    struct Canned(Result<&'static str, ()>);

    impl Runner for Canned {
        fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
            match self.0 {
                Ok(s) => Ok(ToolOutput::new(s)),
                Err(()) => Err(ToolError::Exit {
                    program: invocation.program(),
                    code: Some(127),
                    stdout: String::new(),
                    stderr: String::new(),
                }),
            }
        }
    }

    #[test]
    fn scalar_takes_last_token() {
        let inv = Invocation::clip_level("x.nii", 0.5);
        assert_eq!(ToolOutput::new("  412.5\n").scalar(&inv).unwrap(), 412.5);
        assert_eq!(
            ToolOutput::new("++ 3dClipLevel: note\n 77\n")
                .scalar(&inv)
                .unwrap(),
            77.0
        );
    }

    #[test]
    fn scalar_rejects_text() {
        let inv = Invocation::info_min("x.nii");
        let e = ToolOutput::new("** ERROR\n").scalar(&inv).unwrap_err();
        assert!(matches!(e, ToolError::Parse { program: Program::Info, .. }));
        assert!(ToolOutput::new("").scalar(&inv).is_err());
    }

    /// A private bin dir where `program` is a link to `/bin/sh`, so the
    /// invocation's arguments are a shell script.
    #[cfg(unix)]
    fn shell_as(program: Program) -> (tempfile::TempDir, SystemRunner) {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/bin/sh", dir.path().join(program.to_string())).unwrap();
        let runner = SystemRunner::in_dir(dir.path());
        (dir, runner)
    }

    #[test]
    fn missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::in_dir(dir.path());
        let e = runner.run(&Invocation::clip_level("x.nii", 0.5)).unwrap_err();
        assert!(
            matches!(e, ToolError::Spawn { program: Program::ClipLevel, .. }),
            "{:?}",
            e
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_keeps_code_and_stderr() {
        let (_dir, runner) = shell_as(Program::Calc);
        let inv = Invocation::new(Program::Calc)
            .arg("-c")
            .arg("echo partial; echo '** FATAL ERROR: no such dataset' >&2; exit 1");
        match runner.run(&inv).unwrap_err() {
            ToolError::Exit {
                program,
                code,
                stdout,
                stderr,
            } => {
                assert_eq!(program, Program::Calc);
                assert_eq!(code, Some(1));
                assert_eq!(stdout.trim(), "partial");
                assert_eq!(stderr.trim(), "** FATAL ERROR: no such dataset");
            }
            e => panic!("unexpected {:?}", e),
        }
    }

    #[cfg(unix)]
    #[test]
    fn success_captures_stdout_with_quiet_env() {
        let (_dir, runner) = shell_as(Program::Info);
        let inv = Invocation::new(Program::Info)
            .arg("-c")
            .arg("echo $AFNI_NIFTI_TYPE_WARN $AFNI_ENVIRON_WARNINGS; echo 17");
        let out = runner.run(&inv).unwrap();
        assert_eq!(out.stdout, "NO NO\n17\n");
        assert_eq!(out.scalar(&inv).unwrap(), 17.0);
    }

    #[cfg(unix)]
    #[test]
    fn stdin_is_closed() {
        let (_dir, runner) = shell_as(Program::Merge);
        let inv = Invocation::new(Program::Merge)
            .arg("-c")
            .arg("cat; echo done");
        assert_eq!(runner.run(&inv).unwrap().stdout, "done\n");
    }

    #[test]
    fn version_reported_or_unknown() {
        assert_eq!(
            version(&Canned(Ok("Precompiled binary linux_ubuntu_16_64: AFNI_23.1.10\n"))),
            "Precompiled binary linux_ubuntu_16_64: AFNI_23.1.10"
        );
        assert_eq!(version(&Canned(Ok("\n"))), "Unknown");
        assert_eq!(version(&Canned(Err(()))), "Unknown");
    }
}
