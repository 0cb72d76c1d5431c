//! CLI binary for abstract2tex.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AssemblyConfig` and prints the batch report.

use abstract2tex::{
    run, AssemblyConfig, BatchProgressCallback, MalformedIdPolicy, PandocConverter,
    ProgressCallback, SubmissionOutcome, SubstitutionTable,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per
/// submission.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Count of submissions that were skipped or failed.
    problems: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for submissions…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            problems: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} abstracts  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Assembling");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Found {total} submissions"))
        ));
    }

    fn on_submission_start(&self, _index: usize, _total: usize, file: &str) {
        self.bar.set_message(file.to_string());
    }

    fn on_figure_matched(&self, _index: usize, _file: &str, figure: &str) {
        self.bar.println(format!("    {}", dim(&format!("figure: {figure}"))));
    }

    fn on_submission_complete(&self, index: usize, total: usize, file: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            file
        ));
        self.bar.inc(1);
    }

    fn on_submission_skipped(&self, index: usize, total: usize, file: &str, reason: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            file,
            dim(reason)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, rendered: usize) {
        self.bar.finish_and_clear();
        let problems = self.problems.load(Ordering::SeqCst);
        if problems == 0 {
            eprintln!(
                "{} {} abstracts assembled",
                green("✔"),
                bold(&rendered.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} abstracts assembled  ({} need attention)",
                if rendered == 0 { red("✘") } else { cyan("⚠") },
                bold(&rendered.to_string()),
                total,
                red(&problems.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Assemble every .docx in the current directory into ./output.tex
  abstract2tex

  # A different directory and output file
  abstract2tex abstracts/ -o book.tex

  # Accept more figure formats
  abstract2tex --image-ext png,jpg,jpeg abstracts/

  # Stop at the first submission with a non-numeric id
  abstract2tex --on-malformed-id abort abstracts/

  # Extra character fixes, applied after pandoc
  abstract2tex --substitutions fixes.json abstracts/
      fixes.json:  [["ß", "{\\ss}"], ["Å", "\\AA{}"]]

FILE NAMING:
  Lastname_Firstname.docx    the submission (abstract template, five tables)
  Lastname_Firstname.png     optional figure, matched case-insensitively

ENVIRONMENT VARIABLES:
  RUST_LOG                   Override log filter (e.g. abstract2tex=debug)
  ABSTRACT2TEX_PANDOC        Path to the pandoc executable

REQUIREMENTS:
  pandoc must be installed (https://pandoc.org/installing.html).
"#;

/// Assemble Word abstract submissions into one LaTeX file.
#[derive(Parser, Debug)]
#[command(
    name = "abstract2tex",
    version,
    about = "Assemble Word abstract submissions into one LaTeX file",
    long_about = "Convert every abstract submission (.docx built from the five-table abstract \
template) in a directory into a posterabs LaTeX environment, pair each with its figure, \
and write them all, sorted by surname, into a single output file.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the submissions.
    #[arg(default_value = ".", env = "ABSTRACT2TEX_DIR")]
    input: PathBuf,

    /// Output LaTeX file (relative to the input directory; `.tex` is added when there is no extension).
    #[arg(short, long, env = "ABSTRACT2TEX_OUTPUT", default_value = "output.tex")]
    output: PathBuf,

    /// pandoc executable.
    #[arg(long, env = "ABSTRACT2TEX_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// Figure extensions to pair with submissions (comma-separated).
    #[arg(
        long = "image-ext",
        env = "ABSTRACT2TEX_IMAGE_EXT",
        value_delimiter = ',',
        default_value = "png,jpg"
    )]
    image_ext: Vec<String>,

    /// JSON file with extra `[from, to]` substitutions applied after pandoc.
    #[arg(long, env = "ABSTRACT2TEX_SUBSTITUTIONS")]
    substitutions: Option<PathBuf>,

    /// Extra name particles that must not be capitalized (comma-separated).
    #[arg(long = "no-capitalize", env = "ABSTRACT2TEX_NO_CAPITALIZE", value_delimiter = ',')]
    no_capitalize: Vec<String>,

    /// What to do with a submission whose id column has no digits.
    #[arg(long, env = "ABSTRACT2TEX_ON_MALFORMED_ID", value_enum, default_value = "skip")]
    on_malformed_id: MalformedIdArg,

    /// Kill a pandoc document conversion after this many seconds.
    #[arg(long, env = "ABSTRACT2TEX_CONVERTER_TIMEOUT")]
    converter_timeout: Option<u64>,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "ABSTRACT2TEX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ABSTRACT2TEX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ABSTRACT2TEX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ABSTRACT2TEX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum MalformedIdArg {
    /// Leave the submission out and continue.
    Skip,
    /// Stop the whole batch.
    Abort,
}

impl From<MalformedIdArg> for MalformedIdPolicy {
    fn from(v: MalformedIdArg) -> Self {
        match v {
            MalformedIdArg::Skip => MalformedIdPolicy::SkipRecord,
            MalformedIdArg::Abort => MalformedIdPolicy::AbortBatch,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports every submission; keep INFO logs
    // for runs without it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let converter =
        PandocConverter::new(&cli.pandoc).with_timeout_secs(config.converter_timeout_secs);

    // ── Run batch ────────────────────────────────────────────────────────
    let report = run(&cli.input, &config, &converter).context("Assembly failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        if !show_progress {
            eprintln!(
                "Assembled {}/{} abstracts in {}ms",
                report.rendered(),
                report.total(),
                report.duration_ms
            );
        }
        for problem in report.problems() {
            match problem {
                SubmissionOutcome::Skipped { reason, .. } => {
                    eprintln!("  {} skipped: {}", cyan("⚠"), reason)
                }
                SubmissionOutcome::Failed { reason, .. } => {
                    eprintln!("  {} failed: {}", red("✗"), reason)
                }
                SubmissionOutcome::Rendered { .. } => {}
            }
        }
        eprintln!("   →  {}", bold(&report.output_path.display().to_string()));
    }

    Ok(())
}

/// Map CLI args to `AssemblyConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AssemblyConfig> {
    let mut builder = AssemblyConfig::builder()
        .output_file(&cli.output)
        .image_extensions(cli.image_ext.iter().map(String::as_str))
        .extra_no_capitalize(cli.no_capitalize.iter().map(String::as_str))
        .malformed_id_policy(cli.on_malformed_id.clone().into())
        .converter_timeout_secs(cli.converter_timeout);

    if let Some(ref path) = cli.substitutions {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read substitutions from {:?}", path))?;
        builder = builder.extra_substitutions(SubstitutionTable::from_json(&json)?);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
