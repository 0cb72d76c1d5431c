//! Typed records extracted from one submission.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// LaTeX-ready text produced by [`crate::pipeline::normalize::TextNormalizer`].
///
/// Only the normalizer can create a non-empty value, so text that already
/// went through the converter and substitution table is never fed through
/// them a second time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Concatenate already-normalized pieces without a separator.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = NormalizedText>,
    {
        Self(parts.into_iter().map(|p| p.0).collect())
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One row of the authors table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorEntry {
    /// The name cell was emphasised in the template.
    pub is_presenting: bool,
    /// Raw name tokens, first name first, surname last.
    pub name_parts: Vec<String>,
    /// Affiliation ids in the order the submitter listed them.
    pub affiliation_ids: Vec<u32>,
}

/// A figure file paired with a submission by base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FigureRef {
    pub file_name: String,
    pub width_px: u32,
    pub height_px: u32,
}

/// Everything the renderer needs for one abstract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    pub title: NormalizedText,
    pub authors: Vec<AuthorEntry>,
    pub affiliations: BTreeMap<u32, NormalizedText>,
    pub body: NormalizedText,
    pub references: BTreeMap<u32, NormalizedText>,
    pub figure: Option<FigureRef>,
}

impl SubmissionRecord {
    /// Attach the matched figure (if any).
    pub fn with_figure(mut self, figure: Option<FigureRef>) -> Self {
        self.figure = figure;
        self
    }

    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }

    pub fn has_figure(&self) -> bool {
        self.figure.is_some()
    }

    /// The first author marked as presenting, if the submitter marked one.
    pub fn presenting_author(&self) -> Option<&AuthorEntry> {
        self.authors.iter().find(|a| a.is_presenting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(presenting: bool, name: &str) -> AuthorEntry {
        AuthorEntry {
            is_presenting: presenting,
            name_parts: name.split(' ').map(String::from).collect(),
            affiliation_ids: vec![1],
        }
    }

    #[test]
    fn concat_joins_without_separator() {
        let t = NormalizedText::concat([
            NormalizedText::new("a ".into()),
            NormalizedText::new("\\textbf{b}".into()),
        ]);
        assert_eq!(t.as_str(), "a \\textbf{b}");
    }

    #[test]
    fn first_presenting_author_wins() {
        let record = SubmissionRecord {
            authors: vec![
                author(false, "john doe"),
                author(true, "jane smith"),
                author(true, "max mustermann"),
            ],
            ..Default::default()
        };
        assert_eq!(
            record.presenting_author().unwrap().name_parts,
            vec!["jane", "smith"]
        );
    }

    #[test]
    fn presence_flags() {
        let mut record = SubmissionRecord::default();
        assert!(!record.has_references());
        assert!(!record.has_figure());
        record
            .references
            .insert(1, NormalizedText::new("ref".into()));
        let record = record.with_figure(Some(FigureRef {
            file_name: "x.png".into(),
            width_px: 10,
            height_px: 20,
        }));
        assert!(record.has_references());
        assert!(record.has_figure());
    }
}
