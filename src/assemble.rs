//! Batch entry points: a directory of submissions → one LaTeX file.
//!
//! The run is strictly sequential. Each submission is converted, extracted,
//! rendered and appended before the next one starts, and the output file is
//! flushed after every abstract so a crash mid-batch still leaves every
//! finished abstract on disk.
//!
//! Intermediate markup files live in one scratch directory for the whole
//! run. It is removed when the run ends, whether submissions failed or the
//! batch was aborted.

use crate::config::{AssemblyConfig, MalformedIdPolicy};
use crate::error::{Abstract2TexError, ConverterError, ExtractError};
use crate::output::{BatchReport, SubmissionOutcome};
use crate::pipeline::converter::{DocumentConverter, PandocConverter};
use crate::pipeline::discover::{discover, Submission};
use crate::pipeline::extract::{extract, FiveTableLayout, SubmissionLayout};
use crate::pipeline::figure::figure_ref;
use crate::pipeline::normalize::TextNormalizer;
use crate::pipeline::render::TemplateRenderer;
use crate::record::FigureRef;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Assemble every submission in `input_dir` using pandoc.
///
/// The converter timeout comes from
/// [`AssemblyConfig::converter_timeout_secs`].
pub fn run_with_pandoc(
    input_dir: impl AsRef<Path>,
    config: &AssemblyConfig,
) -> Result<BatchReport, Abstract2TexError> {
    let converter = PandocConverter::default().with_timeout_secs(config.converter_timeout_secs);
    run(input_dir, config, &converter)
}

/// Assemble every submission in `input_dir` into the configured output file.
///
/// # Returns
/// `Ok(BatchReport)` once every submission has been attempted, even if some
/// were skipped (check [`BatchReport::problems`]).
///
/// # Errors
/// Returns `Err(Abstract2TexError)` only for fatal errors:
/// - Input directory missing or unreadable
/// - Output file cannot be created or written
/// - A malformed id under [`MalformedIdPolicy::AbortBatch`]
pub fn run(
    input_dir: impl AsRef<Path>,
    config: &AssemblyConfig,
    converter: &dyn DocumentConverter,
) -> Result<BatchReport, Abstract2TexError> {
    let start = Instant::now();
    let dir = input_dir.as_ref();
    info!("Assembling abstracts from {}", dir.display());

    // ── Step 1: Discover submissions ─────────────────────────────────────
    let submissions = discover(dir, config)?;
    let total = submissions.len();
    info!("Found {} submissions", total);

    // ── Step 2: Truncate the output file ─────────────────────────────────
    let output_path = resolve_output_path(dir, &config.output_file);
    let write_err = |source| Abstract2TexError::OutputWriteFailed {
        path: output_path.clone(),
        source,
    };
    let mut out = BufWriter::new(File::create(&output_path).map_err(write_err)?);

    // ── Step 3: Scratch space for intermediate markup ────────────────────
    let scratch = tempfile::Builder::new()
        .prefix("abstract2tex-")
        .tempdir()
        .map_err(Abstract2TexError::TempDirFailed)?;
    debug!("Intermediate markup goes to {}", scratch.path().display());

    let normalizer = TextNormalizer::new(converter, &config.substitutions);
    let renderer = TemplateRenderer::new(&normalizer, config);
    let stage = Stage {
        config,
        converter,
        layout: &FiveTableLayout,
        normalizer: &normalizer,
        renderer: &renderer,
        scratch: scratch.path(),
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    // ── Step 4: One submission at a time ─────────────────────────────────
    let mut outcomes = Vec::with_capacity(total);
    for (i, submission) in submissions.iter().enumerate() {
        let index = i + 1;
        let file = submission.file_name.clone();
        info!("Currently working on {}", file);
        if let Some(ref cb) = config.progress_callback {
            cb.on_submission_start(index, total, &file);
        }

        let figure = submission.figure.as_deref().map(figure_ref);
        if let Some(ref fig) = figure {
            info!("Submitter has a figure: {}", fig.file_name);
            if let Some(ref cb) = config.progress_callback {
                cb.on_figure_matched(index, &file, &fig.file_name);
            }
        }
        let figure_name = figure.as_ref().map(|f| f.file_name.clone());

        let outcome = match stage.process(submission, figure) {
            Ok(lines) => {
                write_block(&mut out, &lines).map_err(write_err)?;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_submission_complete(index, total, &file);
                }
                SubmissionOutcome::Rendered {
                    file,
                    figure: figure_name,
                }
            }
            Err(e @ ExtractError::MalformedIdentifier { .. }) => {
                if config.malformed_id_policy == MalformedIdPolicy::AbortBatch {
                    out.flush().map_err(write_err)?;
                    warn!("{} has a malformed identifier; aborting the batch", file);
                    return Err(Abstract2TexError::SubmissionAborted { file, source: e });
                }
                let reason = format!("{file} was not included: {e}");
                warn!("{}", reason);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_submission_skipped(index, total, &file, &reason);
                }
                SubmissionOutcome::Failed { file, reason }
            }
            Err(e) => {
                let reason = format!("{file} is problematic: {e}");
                warn!("{}", reason);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_submission_skipped(index, total, &file, &reason);
                }
                SubmissionOutcome::Skipped { file, reason }
            }
        };
        outcomes.push(outcome);
    }

    out.flush().map_err(write_err)?;

    // ── Step 5: Remove intermediate markup ───────────────────────────────
    if let Err(e) = scratch.close() {
        warn!("Failed to remove temporary markup files: {}", e);
    }

    let report = BatchReport {
        output_path,
        submissions: outcomes,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Batch complete: {}/{} abstracts written to {} in {}ms",
        report.rendered(),
        report.total(),
        report.output_path.display(),
        report.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(report.total(), report.rendered());
    }
    Ok(report)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything needed to turn one submission into lines.
struct Stage<'a> {
    config: &'a AssemblyConfig,
    converter: &'a dyn DocumentConverter,
    layout: &'a dyn SubmissionLayout,
    normalizer: &'a TextNormalizer<'a>,
    renderer: &'a TemplateRenderer<'a>,
    scratch: &'a Path,
}

impl Stage<'_> {
    fn process(
        &self,
        submission: &Submission,
        figure: Option<FigureRef>,
    ) -> Result<Vec<String>, ExtractError> {
        let markup_path = self
            .scratch
            .join(format!("{}.{}", submission.stem, self.config.markup_extension));
        self.converter.to_markup(&submission.path, &markup_path)?;

        let markup = std::fs::read_to_string(&markup_path).map_err(ConverterError::Io)?;
        let record = extract(&markup, self.layout, self.normalizer)?.with_figure(figure);
        debug!(
            "{}: {} authors, {} affiliations, {} references",
            submission.file_name,
            record.authors.len(),
            record.affiliations.len(),
            record.references.len()
        );

        Ok(self.renderer.render(&record, &submission.stem)?)
    }
}

/// Relative paths land in the input directory; a name without an extension
/// gets `.tex`.
fn resolve_output_path(dir: &Path, output: &Path) -> PathBuf {
    let mut path = if output.is_absolute() {
        output.to_path_buf()
    } else {
        dir.join(output)
    };
    if path.extension().is_none() {
        path.set_extension("tex");
    }
    path
}

fn write_block(out: &mut impl Write, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_output_lands_in_input_dir() {
        assert_eq!(
            resolve_output_path(Path::new("/abs/in"), Path::new("output.tex")),
            PathBuf::from("/abs/in/output.tex")
        );
        assert_eq!(
            resolve_output_path(Path::new("/abs/in"), Path::new("/tmp/book.tex")),
            PathBuf::from("/tmp/book.tex")
        );
    }

    #[test]
    fn output_without_extension_gets_tex() {
        assert_eq!(
            resolve_output_path(Path::new("/abs/in"), Path::new("book")),
            PathBuf::from("/abs/in/book.tex")
        );
        assert_eq!(
            resolve_output_path(Path::new("/abs/in"), Path::new("book.latex")),
            PathBuf::from("/abs/in/book.latex")
        );
    }

    #[test]
    fn block_lines_end_with_newlines() {
        let mut buf = Vec::new();
        write_block(&mut buf, &["a".to_string(), String::new()]).unwrap();
        assert_eq!(buf, b"a\n\n");
    }
}
