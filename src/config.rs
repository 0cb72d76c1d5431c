//! Configuration types for assembling a book of abstracts.
//!
//! All batch behaviour is controlled through [`AssemblyConfig`], built via
//! its [`AssemblyConfigBuilder`]. The substitution table and the list of name
//! particles that must not be capitalized live here too, so the normalizer
//! and the renderer receive them explicitly instead of reading globals.

use crate::error::Abstract2TexError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for one batch run.
///
/// Built via [`AssemblyConfig::builder()`] or using
/// [`AssemblyConfig::default()`].
///
/// # Example
/// ```rust
/// use abstract2tex::AssemblyConfig;
///
/// let config = AssemblyConfig::builder()
///     .image_extensions(["png", "jpg", "jpeg"])
///     .output_file("book.tex")
///     .build()
///     .unwrap();
/// assert_eq!(config.image_extensions.len(), 3);
/// ```
#[derive(Clone)]
pub struct AssemblyConfig {
    /// Extension of submission documents, without the dot. Default: `docx`.
    pub document_extension: String,

    /// Extension of the intermediate markup files. Default: `html`.
    pub markup_extension: String,

    /// Figure extensions matched against submission base names.
    /// Default: `png`, `jpg`. Compared case-insensitively.
    pub image_extensions: Vec<String>,

    /// Output LaTeX file. Relative paths are resolved against the input
    /// directory and a name without an extension gets `.tex`. Default: `output.tex`.
    pub output_file: PathBuf,

    /// Ordered replacements applied to converter output.
    pub substitutions: SubstitutionTable,

    /// Name tokens that keep their given case (particles such as `van`).
    pub no_capitalize: Vec<String>,

    /// Separator between surname and first name in submission file names.
    /// Default: `_` (`Lastname_Firstname.docx`).
    pub name_separator: char,

    /// What to do when an id column has no digits. Default: skip the record.
    pub malformed_id_policy: MalformedIdPolicy,

    /// Kill a document conversion that runs longer than this. Default: none
    /// (wait indefinitely).
    pub converter_timeout_secs: Option<u64>,

    /// Per-submission progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            document_extension: "docx".to_string(),
            markup_extension: "html".to_string(),
            image_extensions: vec!["png".to_string(), "jpg".to_string()],
            output_file: PathBuf::from("output.tex"),
            substitutions: SubstitutionTable::default(),
            no_capitalize: vec!["van".to_string(), "der".to_string(), "van't".to_string()],
            name_separator: '_',
            malformed_id_policy: MalformedIdPolicy::default(),
            converter_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AssemblyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyConfig")
            .field("document_extension", &self.document_extension)
            .field("markup_extension", &self.markup_extension)
            .field("image_extensions", &self.image_extensions)
            .field("output_file", &self.output_file)
            .field("substitutions", &self.substitutions.len())
            .field("no_capitalize", &self.no_capitalize)
            .field("name_separator", &self.name_separator)
            .field("malformed_id_policy", &self.malformed_id_policy)
            .field("converter_timeout_secs", &self.converter_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl AssemblyConfig {
    /// Create a new builder for `AssemblyConfig`.
    pub fn builder() -> AssemblyConfigBuilder {
        AssemblyConfigBuilder {
            config: Self::default(),
        }
    }

    /// True if `token` is a name particle that must not be capitalized.
    pub fn keeps_case(&self, token: &str) -> bool {
        self.no_capitalize.iter().any(|p| p == token)
    }
}

/// Builder for [`AssemblyConfig`].
#[derive(Debug)]
pub struct AssemblyConfigBuilder {
    config: AssemblyConfig,
}

impl AssemblyConfigBuilder {
    pub fn document_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.document_extension = clean_extension(ext.into());
        self
    }

    pub fn markup_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.markup_extension = clean_extension(ext.into());
        self
    }

    pub fn image_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.image_extensions = exts
            .into_iter()
            .map(|e| clean_extension(e.into()))
            .collect();
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_file = path.into();
        self
    }

    pub fn substitutions(mut self, table: SubstitutionTable) -> Self {
        self.config.substitutions = table;
        self
    }

    /// Append extra replacements after the current table.
    pub fn extra_substitutions(mut self, extra: SubstitutionTable) -> Self {
        self.config.substitutions.extend(extra);
        self
    }

    pub fn no_capitalize<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.no_capitalize = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Append particles to the current no-capitalize list.
    pub fn extra_no_capitalize<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .no_capitalize
            .extend(tokens.into_iter().map(Into::into));
        self
    }

    pub fn name_separator(mut self, sep: char) -> Self {
        self.config.name_separator = sep;
        self
    }

    pub fn malformed_id_policy(mut self, policy: MalformedIdPolicy) -> Self {
        self.config.malformed_id_policy = policy;
        self
    }

    pub fn converter_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.converter_timeout_secs = secs.filter(|&s| s > 0);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AssemblyConfig, Abstract2TexError> {
        let c = &self.config;
        if c.document_extension.is_empty() || c.markup_extension.is_empty() {
            return Err(Abstract2TexError::InvalidConfig(
                "Document and markup extensions must not be empty".into(),
            ));
        }
        if c.document_extension.eq_ignore_ascii_case(&c.markup_extension) {
            return Err(Abstract2TexError::InvalidConfig(format!(
                "Markup extension must differ from the document extension '{}'",
                c.document_extension
            )));
        }
        if let Some(ext) = c.image_extensions.iter().find(|e| e.is_empty()) {
            return Err(Abstract2TexError::InvalidConfig(format!(
                "Image extension {ext:?} is empty"
            )));
        }
        if c.image_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&c.document_extension))
        {
            return Err(Abstract2TexError::InvalidConfig(format!(
                "'{}' cannot be both a document and an image extension",
                c.document_extension
            )));
        }
        if c.output_file.as_os_str().is_empty() {
            return Err(Abstract2TexError::InvalidConfig(
                "Output file must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

fn clean_extension(ext: String) -> String {
    ext.trim().trim_start_matches('.').to_string()
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Handling of an id column that contains no digits.
///
/// The record cannot be rendered faithfully (ids are never coerced to zero),
/// so the only question is whether the rest of the batch still runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedIdPolicy {
    /// Report the submission as failed and continue with the next one. (default)
    #[default]
    SkipRecord,
    /// Stop the batch. Temporary files are still removed.
    AbortBatch,
}

// ── Substitution table ───────────────────────────────────────────────────

/// Ordered string replacements applied after the converter has run.
///
/// Pandoc already escapes `&` and `%` correctly; do not add them here or
/// they will be escaped twice. No replacement may contain another key,
/// otherwise a second application would change the text again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstitutionTable(Vec<(String, String)>);

const GREEK: &[(&str, &str)] = &[
    ("α", r"$\alpha$"),
    ("β", r"$\beta$"),
    ("γ", r"$\gamma$"),
    ("δ", r"$\delta$"),
    ("ε", r"$\epsilon$"),
    ("ζ", r"$\zeta$"),
    ("η", r"$\eta$"),
    ("θ", r"$\theta$"),
    ("ι", r"$\iota$"),
    ("κ", r"$\kappa$"),
    ("λ", r"$\lambda$"),
    ("μ", r"$\mu$"),
    ("ν", r"$\nu$"),
    ("ξ", r"$\xi$"),
    ("π", r"$\pi$"),
    ("ρ", r"$\rho$"),
    ("σ", r"$\sigma$"),
    ("τ", r"$\tau$"),
    ("υ", r"$\upsilon$"),
    ("φ", r"$\phi$"),
    ("χ", r"$\chi$"),
    ("ψ", r"$\psi$"),
    ("ω", r"$\omega$"),
];

const LATIN_ACCENTS: &[(&str, &str)] = &[
    ("é", r"\'{e}"),
    ("è", r"\`{e}"),
    ("ü", r#"\"{u}"#),
    ("ä", r#"\"{a}"#),
    ("ö", r#"\"{o}"#),
];

// Pandoc renders `~` as \textasciitilde{}, which sits too high in the line.
const CONVERTER_FIXES: &[(&str, &str)] = &[(r"\textasciitilde{}", r"$\sim$")];

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self(
            GREEK
                .iter()
                .chain(LATIN_ACCENTS)
                .chain(CONVERTER_FIXES)
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        )
    }
}

impl SubstitutionTable {
    /// An empty table (no replacements).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a table from `(from, to)` pairs, keeping their order.
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(a, b)| (a.into(), b.into()))
                .filter(|(a, _)| !a.is_empty())
                .collect(),
        )
    }

    /// Parse a JSON array of `[from, to]` pairs.
    pub fn from_json(json: &str) -> Result<Self, Abstract2TexError> {
        let table: SubstitutionTable = serde_json::from_str(json).map_err(|e| {
            Abstract2TexError::InvalidConfig(format!("Invalid substitution table: {e}"))
        })?;
        if table.0.iter().any(|(from, _)| from.is_empty()) {
            return Err(Abstract2TexError::InvalidConfig(
                "Substitution keys must not be empty".into(),
            ));
        }
        Ok(table)
    }

    /// Append another table's replacements after this one's.
    pub fn extend(&mut self, other: SubstitutionTable) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Apply every replacement in order.
    pub fn apply(&self, text: &str) -> String {
        self.0
            .iter()
            .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
    }
}
