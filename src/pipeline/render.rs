//! Template rendering: [`SubmissionRecord`] → LaTeX lines.
//!
//! Each abstract becomes one `posterabs*` environment followed by a
//! table-of-contents entry. The environment has four variants because the
//! LaTeX class takes a different number of arguments depending on whether
//! the abstract has references and/or a figure:
//!
//! ```text
//! \begin{posterabswrefwfig}
//! {Title}
//! {\underline{Jane Smith},$^{1}$ John Doe,$^{1,2}$}
//! {
//! $^{1}$First affiliation\\
//! $^{2}$Second affiliation
//! }
//! {P\#}
//! {                       ← references, if any
//! {[1]} First reference
//! }
//! {Smith_Jane.png}        ← figure, if any
//! {6.4}
//! {4.8}
//! Abstract body
//! \label{SmithJ}
//! \end{posterabswrefwfig}
//! \phantomsection\addcontentsline{toc}{subsection}{\hyperref[SmithJ]{\textbf{Jane Smith}\\Title}}
//! ```

use crate::config::AssemblyConfig;
use crate::error::ConverterError;
use crate::pipeline::normalize::{TextNormalizer, LINE_BREAK};
use crate::record::{FigureRef, SubmissionRecord};
use serde::Serialize;
use tracing::debug;

/// Poster number placeholder; numbers are assigned by hand in the book.
pub const POSTER_NUMBER_PLACEHOLDER: &str = r"{P\#}";

/// Figure pixels per output length unit.
const PIXELS_PER_UNIT: f64 = 100.0;

/// The four LaTeX environments, chosen by (references?, figure?).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemplateVariant {
    /// No references, no figure.
    Plain,
    /// Figure only.
    WithFigure,
    /// References only.
    WithReferences,
    /// References and figure.
    WithReferencesAndFigure,
}

impl TemplateVariant {
    pub fn select(references: bool, figure: bool) -> Self {
        match (references, figure) {
            (false, false) => TemplateVariant::Plain,
            (false, true) => TemplateVariant::WithFigure,
            (true, false) => TemplateVariant::WithReferences,
            (true, true) => TemplateVariant::WithReferencesAndFigure,
        }
    }

    pub fn environment(self) -> &'static str {
        match self {
            TemplateVariant::Plain => "posterabs",
            TemplateVariant::WithFigure => "posterabswfig",
            TemplateVariant::WithReferences => "posterabswref",
            TemplateVariant::WithReferencesAndFigure => "posterabswrefwfig",
        }
    }

    pub fn begin(self) -> String {
        format!(r"\begin{{{}}}", self.environment())
    }

    pub fn end(self) -> String {
        format!(r"\end{{{}}}", self.environment())
    }
}

/// Who presents the abstract: drives the `\label` and the TOC entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenterIdentity {
    /// `Surname` + first initial, e.g. `SmithJ`.
    pub label: String,
    /// Formatted full name, first name first.
    pub display_name: String,
}

/// Renders records into the lines of one abstract block.
pub struct TemplateRenderer<'a> {
    normalizer: &'a TextNormalizer<'a>,
    config: &'a AssemblyConfig,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(normalizer: &'a TextNormalizer<'a>, config: &'a AssemblyConfig) -> Self {
        Self { normalizer, config }
    }

    /// Render `record` into output lines, ending with an empty separator line.
    ///
    /// `file_stem` is the submission's base file name; it identifies the
    /// presenter when no author was marked as presenting.
    pub fn render(
        &self,
        record: &SubmissionRecord,
        file_stem: &str,
    ) -> Result<Vec<String>, ConverterError> {
        let variant = TemplateVariant::select(record.has_references(), record.has_figure());
        let presenter = self.presenter(record, file_stem)?;
        let title = record.title.as_str();

        let mut lines = vec![variant.begin(), format!("{{{title}}}")];
        lines.push(self.author_line(record)?);
        lines.extend(braced_list(
            record
                .affiliations
                .iter()
                .map(|(id, name)| format!("$^{{{id}}}${name}")),
        ));
        lines.push(POSTER_NUMBER_PLACEHOLDER.to_string());
        if record.has_references() {
            lines.extend(braced_list(
                record
                    .references
                    .iter()
                    .map(|(id, text)| format!("{{[{id}]}} {text}")),
            ));
        }
        if let Some(figure) = &record.figure {
            lines.extend(figure_lines(figure));
        }
        lines.push(record.body.as_str().to_string());
        lines.push(format!(r"\label{{{}}}", presenter.label));
        lines.push(variant.end());
        lines.push(format!(
            r"\phantomsection\addcontentsline{{toc}}{{subsection}}{{\hyperref[{}]{{\textbf{{{}}}{}{}}}}}",
            presenter.label, presenter.display_name, LINE_BREAK, title
        ));
        lines.push(String::new());
        Ok(lines)
    }

    /// Derive label and display name from the presenting author, or from
    /// the `Lastname_Firstname` file name when nobody was marked.
    pub fn presenter(
        &self,
        record: &SubmissionRecord,
        file_stem: &str,
    ) -> Result<PresenterIdentity, ConverterError> {
        let name_parts = match record.presenting_author() {
            Some(author) => author.name_parts.clone(),
            None => {
                debug!("No presenting author marked; using file name '{file_stem}'");
                name_parts_from_stem(file_stem, self.config.name_separator)
            }
        };

        let surname = name_parts.last().map(|s| capitalize(s)).unwrap_or_default();
        let initial = name_parts
            .first()
            .and_then(|s| capitalize(s).chars().next())
            .map(String::from)
            .unwrap_or_default();

        Ok(PresenterIdentity {
            label: format!("{surname}{initial}"),
            display_name: self.format_name(&name_parts)?,
        })
    }

    /// `{Name,$^{1,2}$ Name,$^{2}$}` with the presenter underlined.
    fn author_line(&self, record: &SubmissionRecord) -> Result<String, ConverterError> {
        let authors = record
            .authors
            .iter()
            .map(|author| {
                let name = self.format_name(&author.name_parts)?;
                let name = if author.is_presenting {
                    format!(r"\underline{{{name}}}")
                } else {
                    name
                };
                let ids = author
                    .affiliation_ids
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                Ok(format!("{name},$^{{{ids}}}$"))
            })
            .collect::<Result<Vec<_>, ConverterError>>()?;
        Ok(format!("{{{}}}", authors.join(" ")))
    }

    /// Capitalize (except particles), normalize and join name tokens.
    fn format_name(&self, parts: &[String]) -> Result<String, ConverterError> {
        let tokens = parts
            .iter()
            .map(|token| {
                let cased = if self.config.keeps_case(token) {
                    token.clone()
                } else {
                    capitalize(token)
                };
                self.normalizer
                    .normalize_text(&cased)
                    .map(|t| t.into_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tokens.join(" "))
    }
}

/// First character upper-case, the rest lower-case.
pub fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `Lastname_Firstname[_Middle]` → `[Firstname, Middle, Lastname]`.
fn name_parts_from_stem(stem: &str, separator: char) -> Vec<String> {
    let segments: Vec<&str> = stem
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let Some((surname, given)) = segments.split_first() else {
        return Vec::new();
    };
    given
        .iter()
        .chain(std::iter::once(surname))
        .flat_map(|s| s.split_whitespace())
        .map(String::from)
        .collect()
}

/// `{`, entries with `\\` on all but the last, `}`.
fn braced_list(entries: impl ExactSizeIterator<Item = String>) -> Vec<String> {
    let count = entries.len();
    let mut lines = Vec::with_capacity(count + 2);
    lines.push("{".to_string());
    for (i, entry) in entries.enumerate() {
        if i + 1 < count {
            lines.push(format!("{entry}{LINE_BREAK}"));
        } else {
            lines.push(entry);
        }
    }
    lines.push("}".to_string());
    lines
}

fn figure_lines(figure: &FigureRef) -> [String; 3] {
    [
        format!("{{{}}}", figure.file_name),
        format!("{{{}}}", to_units(figure.width_px)),
        format!("{{{}}}", to_units(figure.height_px)),
    ]
}

fn to_units(px: u32) -> f64 {
    f64::from(px) / PIXELS_PER_UNIT
}
