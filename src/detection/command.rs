//! Collaborators backed by external programs.
//!
//! Each program receives the raw image bytes on stdin.
//! - face detector: prints the number of faces found.
//! - liveness checker: exits 0 for a live subject, 1 for a spoof.
//! - recognizer: prints the person's name, or nothing when unknown.

use super::{DetectionError, FaceDetector, FaceRecognizer, LivenessChecker, Photo};
use anyhow::{Result, bail};
use std::io::Write;
use std::process::{Command, Output, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExternalProgram {
    program: String,
    args: Vec<String>,
}

impl ExternalProgram {
    fn parse(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("empty collaborator command");
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    fn run(&self, stdin_bytes: &[u8]) -> Result<Output, DetectionError> {
        let spawn_err = |e: std::io::Error| DetectionError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Feed stdin from its own thread so stdout and stderr keep draining meanwhile.
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(stdin_bytes),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (output, written)
        });
        let output = output.map_err(spawn_err)?;
        if let Err(e) = written {
            // A program that decides without reading all input closes the pipe early.
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(spawn_err(e));
            }
        }

        if !output.stderr.is_empty() {
            tracing::debug!(
                program = %self.program,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "collaborator stderr"
            );
        }
        Ok(output)
    }

    fn bad_output(&self, output: impl Into<String>) -> DetectionError {
        DetectionError::BadOutput {
            program: self.program.clone(),
            output: output.into(),
        }
    }
}

pub struct CommandFaceDetector {
    program: ExternalProgram,
}

impl CommandFaceDetector {
    pub fn parse(command_line: &str) -> Result<Self> {
        Ok(Self {
            program: ExternalProgram::parse(command_line)?,
        })
    }
}

impl FaceDetector for CommandFaceDetector {
    fn count_faces(&self, photo: &Photo<'_>) -> Result<usize, DetectionError> {
        let output = self.program.run(photo.bytes)?;
        if !output.status.success() {
            return Err(self.program.bad_output(format!("exit status {}", output.status)));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<usize>()
            .map_err(|_| self.program.bad_output(stdout.trim()))
    }
}

pub struct CommandLivenessChecker {
    program: ExternalProgram,
}

impl CommandLivenessChecker {
    pub fn parse(command_line: &str) -> Result<Self> {
        Ok(Self {
            program: ExternalProgram::parse(command_line)?,
        })
    }
}

impl LivenessChecker for CommandLivenessChecker {
    fn is_live(&self, bytes: &[u8]) -> Result<bool, DetectionError> {
        let output = self.program.run(bytes)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(self.program.bad_output(format!("exit status {}", output.status))),
        }
    }
}

pub struct CommandRecognizer {
    program: ExternalProgram,
}

impl CommandRecognizer {
    pub fn parse(command_line: &str) -> Result<Self> {
        Ok(Self {
            program: ExternalProgram::parse(command_line)?,
        })
    }
}

impl FaceRecognizer for CommandRecognizer {
    fn recognize(&self, bytes: &[u8]) -> Result<Option<String>, DetectionError> {
        let output = self.program.run(bytes)?;
        if !output.status.success() {
            return Err(self.program.bad_output(format!("exit status {}", output.status)));
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }
}
