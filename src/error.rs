//! Error types for the abstract2tex library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`Abstract2TexError`]: fatal. The batch cannot proceed at all
//!   (missing input directory, unwritable output file). Returned as
//!   `Err(Abstract2TexError)` from [`crate::assemble::run`].
//!
//! * [`ExtractError`]: per submission. One document does not follow the
//!   submission template. The assembler records it in the
//!   [`crate::output::BatchReport`] and moves on to the next file.
//!
//! * [`ConverterError`]: the external converter (pandoc) could not be run
//!   or exited unsuccessfully. Also per submission.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the abstract2tex library.
///
/// Submission-level failures use [`ExtractError`] / [`ConverterError`] and
/// are stored in [`crate::output::SubmissionOutcome`] rather than
/// propagated here.
#[derive(Debug, Error)]
pub enum Abstract2TexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory was not found.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is a directory.")]
    InputDirNotFound { path: PathBuf },

    /// Input directory exists but could not be listed.
    #[error("Failed to list input directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create, truncate or append to the output LaTeX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the scratch directory for intermediate markup files.
    #[error("Failed to create temporary markup directory: {0}")]
    TempDirFailed(#[source] std::io::Error),

    // ── Submission errors escalated by policy ─────────────────────────────
    /// A malformed identifier was found and the policy is
    /// [`crate::config::MalformedIdPolicy::AbortBatch`].
    #[error("Aborting batch at '{file}': {source}")]
    SubmissionAborted {
        file: String,
        #[source]
        source: ExtractError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A failure to turn one submission's markup into a record.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document has fewer tables than the layout needs. Usually the
    /// submitter did not use the abstract template.
    #[error(
        "found {found} of the {required} expected tables; the submitter likely did not use \
the abstract template, check the document manually"
    )]
    MissingTemplateStructure { found: usize, required: usize },

    /// An id column (ordinal, affiliation, reference) contained no digits.
    #[error("malformed identifier {text:?} in the {block} table; ids must be numeric")]
    MalformedIdentifier { block: &'static str, text: String },

    /// Normalizing a fragment through the converter failed.
    #[error(transparent)]
    Converter(#[from] ConverterError),
}

/// Failures of the external document converter.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The converter executable could not be started.
    #[error("Failed to run '{program}': {source}\nIs pandoc installed and on PATH? Use --pandoc to point at it.")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran but exited with a non-zero status.
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The converter was killed after exceeding the configured timeout.
    #[error("'{program}' timed out after {secs}s converting '{document}'")]
    Timeout {
        program: String,
        document: PathBuf,
        secs: u64,
    },

    /// Reading or writing converter input/output failed.
    #[error("Converter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The converter produced bytes that are not UTF-8.
    #[error("Converter output is not valid UTF-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_structure_display() {
        let e = ExtractError::MissingTemplateStructure {
            found: 0,
            required: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("0 of the 4"), "got: {msg}");
        assert!(msg.contains("template"));
    }

    #[test]
    fn malformed_identifier_display() {
        let e = ExtractError::MalformedIdentifier {
            block: "affiliations",
            text: "a.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("affiliations"));
        assert!(msg.contains("\"a.\""));
    }

    #[test]
    fn converter_error_is_transparent() {
        let e: ExtractError = ConverterError::InvalidUtf8.into();
        assert_eq!(e.to_string(), "Converter output is not valid UTF-8");
    }

    #[test]
    fn aborted_display_names_file() {
        let e = Abstract2TexError::SubmissionAborted {
            file: "Smith_Jane.docx".into(),
            source: ExtractError::MalformedIdentifier {
                block: "references",
                text: "x".into(),
            },
        };
        assert!(e.to_string().contains("Smith_Jane.docx"));
    }

    #[test]
    fn timeout_display() {
        let e = ConverterError::Timeout {
            program: "pandoc".into(),
            document: PathBuf::from("Doe_John.docx"),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert!(e.to_string().contains("Doe_John.docx"));
    }
}
