//! The external document converter.
//!
//! Turning a `.docx` into markup, and markup fragments into LaTeX, is
//! pandoc's job. The rest of the pipeline only sees [`DocumentConverter`],
//! so tests can substitute a deterministic converter and an alternative tool
//! could be plugged in without touching extraction or rendering.

use crate::error::ConverterError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// The two operations the pipeline needs from a document converter.
pub trait DocumentConverter {
    /// Convert `document` into intermediate HTML written to `markup_path`.
    fn to_markup(&self, document: &Path, markup_path: &Path) -> Result<(), ConverterError>;

    /// Convert one HTML fragment into LaTeX.
    ///
    /// Leading and trailing whitespace of the fragment is not preserved;
    /// callers restore it.
    fn to_typeset(&self, fragment: &str) -> Result<String, ConverterError>;
}

/// [`DocumentConverter`] backed by the `pandoc` executable.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for PandocConverter {
    fn default() -> Self {
        Self::new("pandoc")
    }
}

impl PandocConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill document conversions that run longer than `secs`.
    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs.filter(|&s| s > 0).map(Duration::from_secs);
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn spawn_error(&self, source: std::io::Error) -> ConverterError {
        ConverterError::Spawn {
            program: self.program_name(),
            source,
        }
    }

    fn check_status(&self, output: &Output) -> Result<(), ConverterError> {
        if output.status.success() {
            return Ok(());
        }
        Err(ConverterError::Failed {
            program: self.program_name(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Poll the child until it exits or the deadline passes.
    fn wait_with_deadline(
        &self,
        mut child: std::process::Child,
        timeout: Duration,
        document: &Path,
    ) -> Result<Output, ConverterError> {
        let deadline = Instant::now() + timeout;
        loop {
            if child.try_wait()?.is_some() {
                return Ok(child.wait_with_output()?);
            }
            if Instant::now() >= deadline {
                // The process may have exited between the two checks.
                let _ = child.kill();
                let _ = child.wait();
                return Err(ConverterError::Timeout {
                    program: self.program_name(),
                    document: document.to_path_buf(),
                    secs: timeout.as_secs(),
                });
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

impl DocumentConverter for PandocConverter {
    fn to_markup(&self, document: &Path, markup_path: &Path) -> Result<(), ConverterError> {
        debug!(
            "{} {} -> {}",
            self.program_name(),
            document.display(),
            markup_path.display()
        );
        let mut cmd = Command::new(&self.program);
        cmd.arg(document)
            .args(["-f", "docx", "-t", "html", "--wrap=none", "-o"])
            .arg(markup_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = match self.timeout {
            None => cmd.output().map_err(|e| self.spawn_error(e))?,
            Some(timeout) => {
                let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
                self.wait_with_deadline(child, timeout, document)?
            }
        };
        self.check_status(&output)
    }

    fn to_typeset(&self, fragment: &str) -> Result<String, ConverterError> {
        let mut child = Command::new(&self.program)
            .args(["-f", "html", "-t", "latex", "--wrap=none"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(fragment.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        self.check_status(&output)?;

        let mut text = String::from_utf8(output.stdout).map_err(|_| ConverterError::InvalidUtf8)?;
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }
}

/// A pandoc-free converter for unit tests.
///
/// Markup conversion copies the document verbatim (test documents already
/// contain HTML). Fragment conversion maps `<em>` to `\emph{}`, drops other
/// tags, unescapes entities and renders `~` the way pandoc does.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;

    static RE_EM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<em>(.*?)</em>").unwrap());
    static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

    pub(crate) struct FakeConverter;

    impl DocumentConverter for FakeConverter {
        fn to_markup(&self, document: &Path, markup_path: &Path) -> Result<(), ConverterError> {
            std::fs::copy(document, markup_path)?;
            Ok(())
        }

        fn to_typeset(&self, fragment: &str) -> Result<String, ConverterError> {
            let s = RE_EM.replace_all(fragment, r"\emph{$1}");
            let s = RE_TAG.replace_all(&s, "");
            let s = s
                .replace('~', r"\textasciitilde{}")
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&amp;", r"\&");
            Ok(s.trim().to_string())
        }
    }
}
