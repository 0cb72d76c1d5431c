//! # abstract2tex
//!
//! Assemble a directory of Word abstract submissions into one LaTeX file
//! for a conference book of abstracts.
//!
//! Every submitter fills in the same Word template (five tables: title,
//! authors, affiliations, abstract body, references) and names the file
//! `Lastname_Firstname.docx`, optionally with a `Lastname_Firstname.png`
//! figure next to it. This crate converts each document with pandoc, reads
//! the tables by position, fixes the characters pandoc renders badly, and
//! appends one `posterabs` environment per submission to `output.tex`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input dir
//!  │
//!  ├─ 1. Discover  *.docx sorted by surname, figures paired by base name
//!  ├─ 2. Convert   pandoc docx → html (scratch dir, removed at the end)
//!  ├─ 3. Extract   five positional tables → SubmissionRecord
//!  ├─ 4. Normalize html fragments → LaTeX + substitution table
//!  ├─ 5. Render    posterabs / posterabswfig / posterabswref / posterabswrefwfig
//!  └─ 6. Append    output.tex, one block per submission
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use abstract2tex::{run_with_pandoc, AssemblyConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AssemblyConfig::default();
//!     let report = run_with_pandoc("abstracts/", &config)?;
//!     for problem in report.problems() {
//!         eprintln!("{:?}", problem);
//!     }
//!     println!("{}/{} abstracts written", report.rendered(), report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `abstract2tex` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{run, run_with_pandoc};
pub use config::{AssemblyConfig, AssemblyConfigBuilder, MalformedIdPolicy, SubstitutionTable};
pub use error::{Abstract2TexError, ConverterError, ExtractError};
pub use output::{BatchReport, SubmissionOutcome};
pub use pipeline::converter::{DocumentConverter, PandocConverter};
pub use pipeline::extract::{FiveTableLayout, SubmissionLayout};
pub use pipeline::render::{TemplateRenderer, TemplateVariant};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{AuthorEntry, FigureRef, NormalizedText, SubmissionRecord};
