//! Record extraction: submission HTML → [`SubmissionRecord`].
//!
//! The abstract template is a Word document made of tables, and pandoc
//! keeps them as `<table>` elements. Which table holds what is purely
//! positional. [`FiveTableLayout`] encodes the template in use:
//!
//! | # | Table | Rows |
//! |---|-------|------|
//! | 0 | Title | one cell |
//! | 1 | Authors | header, then `ordinal \| name \| affiliation ids` |
//! | 2 | Affiliations | `id \| name` |
//! | 3 | Abstract body | one cell |
//! | 4 | References (optional) | `id \| reference` |
//!
//! A different template only needs another [`SubmissionLayout`].

use crate::error::ExtractError;
use crate::pipeline::normalize::{escape_html, TextNormalizer};
use crate::record::{AuthorEntry, NormalizedText, SubmissionRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::BTreeMap;
use tracing::debug;

static SEL_TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static SEL_TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static SEL_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());
static SEL_EM: Lazy<Selector> = Lazy::new(|| Selector::parse("em").unwrap());
static SEL_P: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

static RE_NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());

/// Positional strategy for locating the fields of a submission.
///
/// `blocks` are the document's tables in document order; the extractor
/// guarantees at least [`SubmissionLayout::required_blocks`] of them.
pub trait SubmissionLayout {
    /// Tables the document must contain to be extractable at all.
    fn required_blocks(&self) -> usize;

    fn title(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<NormalizedText, ExtractError>;

    fn authors(&self, blocks: &[ElementRef<'_>]) -> Result<Vec<AuthorEntry>, ExtractError>;

    fn affiliations(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<BTreeMap<u32, NormalizedText>, ExtractError>;

    fn body(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<NormalizedText, ExtractError>;

    fn references(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<BTreeMap<u32, NormalizedText>, ExtractError>;
}

/// Parse `markup` and pull every field out with `layout`.
///
/// # Errors
/// * [`ExtractError::MissingTemplateStructure`]: too few tables
/// * [`ExtractError::MalformedIdentifier`]: an id column without digits
/// * [`ExtractError::Converter`]: normalizing a fragment failed
pub fn extract(
    markup: &str,
    layout: &dyn SubmissionLayout,
    normalizer: &TextNormalizer<'_>,
) -> Result<SubmissionRecord, ExtractError> {
    let document = Html::parse_document(markup);
    let blocks: Vec<ElementRef<'_>> = document.select(&SEL_TABLE).collect();
    debug!("Found {} tables", blocks.len());

    if blocks.len() < layout.required_blocks() {
        return Err(ExtractError::MissingTemplateStructure {
            found: blocks.len(),
            required: layout.required_blocks(),
        });
    }

    Ok(SubmissionRecord {
        title: layout.title(&blocks, normalizer)?,
        authors: layout.authors(&blocks)?,
        affiliations: layout.affiliations(&blocks, normalizer)?,
        body: layout.body(&blocks, normalizer)?,
        references: layout.references(&blocks, normalizer)?,
        figure: None,
    })
}

/// The five-table abstract template.
#[derive(Debug, Clone, Copy, Default)]
pub struct FiveTableLayout;

impl FiveTableLayout {
    const TITLE: usize = 0;
    const AUTHORS: usize = 1;
    const AFFILIATIONS: usize = 2;
    const BODY: usize = 3;
    const REFERENCES: usize = 4;

    /// The table at `index`, or `MissingTemplateStructure` when the caller
    /// passed fewer blocks than the template needs.
    fn block<'a>(blocks: &[ElementRef<'a>], index: usize) -> Result<ElementRef<'a>, ExtractError> {
        blocks
            .get(index)
            .copied()
            .ok_or(ExtractError::MissingTemplateStructure {
                found: blocks.len(),
                required: Self::BODY + 1,
            })
    }
}

impl SubmissionLayout for FiveTableLayout {
    fn required_blocks(&self) -> usize {
        Self::BODY + 1
    }

    fn title(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<NormalizedText, ExtractError> {
        first_cell_content(Self::block(blocks, Self::TITLE)?, normalizer)
    }

    fn authors(&self, blocks: &[ElementRef<'_>]) -> Result<Vec<AuthorEntry>, ExtractError> {
        let mut authors = Vec::new();
        // First row is the column header.
        for row in Self::block(blocks, Self::AUTHORS)?.select(&SEL_ROW).skip(1) {
            let cells: Vec<ElementRef<'_>> = row.select(&SEL_TD).collect();
            let Some(name_cell) = cells.get(1) else {
                continue;
            };
            let name_parts: Vec<String> = cell_text(name_cell)
                .split_whitespace()
                .map(String::from)
                .collect();
            if name_parts.is_empty() {
                continue;
            }

            // The ordinal is not rendered, but it must still be numeric.
            parse_id(&cells.first().map(cell_text).unwrap_or_default(), "authors")?;

            let affiliation_ids = cells
                .get(2)
                .map(cell_text)
                .map(|t| parse_id_list(&t))
                .transpose()?
                .unwrap_or_default();

            authors.push(AuthorEntry {
                is_presenting: name_cell.select(&SEL_EM).next().is_some(),
                name_parts,
                affiliation_ids,
            });
        }
        Ok(authors)
    }

    fn affiliations(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<BTreeMap<u32, NormalizedText>, ExtractError> {
        let mut affiliations = BTreeMap::new();
        for row in Self::block(blocks, Self::AFFILIATIONS)?.select(&SEL_ROW) {
            let cells: Vec<ElementRef<'_>> = row.select(&SEL_CELL).collect();
            let name = match cells.get(1) {
                Some(cell) => match cell.select(&SEL_P).next() {
                    Some(p) => cell_text(&p),
                    None => cell_text(cell),
                },
                None => String::new(),
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let id = parse_id(&cells.first().map(cell_text).unwrap_or_default(), "affiliations")?;
            affiliations.insert(id, normalizer.normalize_text(name)?);
        }
        Ok(affiliations)
    }

    fn body(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<NormalizedText, ExtractError> {
        first_cell_content(Self::block(blocks, Self::BODY)?, normalizer)
    }

    fn references(
        &self,
        blocks: &[ElementRef<'_>],
        normalizer: &TextNormalizer<'_>,
    ) -> Result<BTreeMap<u32, NormalizedText>, ExtractError> {
        let mut references = BTreeMap::new();
        let Some(table) = blocks.get(Self::REFERENCES) else {
            return Ok(references);
        };
        for row in table.select(&SEL_ROW) {
            let cells: Vec<ElementRef<'_>> = row.select(&SEL_CELL).collect();
            let Some(text_cell) = cells.get(1) else {
                continue;
            };
            let text = children_content(*text_cell, normalizer)?;
            if text.as_str().trim().is_empty() {
                continue;
            }
            let id = parse_id(&cells.first().map(cell_text).unwrap_or_default(), "references")?;
            references.insert(id, text);
        }
        Ok(references)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect()
}

/// Normalized content of the first cell of `table` (empty if it has none).
fn first_cell_content(
    table: ElementRef<'_>,
    normalizer: &TextNormalizer<'_>,
) -> Result<NormalizedText, ExtractError> {
    match table.select(&SEL_CELL).next() {
        Some(cell) => children_content(cell, normalizer),
        None => Ok(NormalizedText::default()),
    }
}

/// Normalize each child node of `element` separately and concatenate.
///
/// Text nodes between block elements are usually bare newlines, which the
/// normalizer turns into forced line breaks between paragraphs.
fn children_content(
    element: ElementRef<'_>,
    normalizer: &TextNormalizer<'_>,
) -> Result<NormalizedText, ExtractError> {
    let mut parts = Vec::new();
    for child in element.children() {
        let fragment = match child.value() {
            Node::Text(text) => escape_html(text),
            Node::Element(_) => match ElementRef::wrap(child) {
                Some(el) => el.html(),
                None => continue,
            },
            _ => continue,
        };
        parts.push(normalizer.normalize(&fragment)?);
    }
    Ok(NormalizedText::concat(parts))
}

/// Parse an id column: every non-digit is dropped, the rest must be a number.
fn parse_id(text: &str, block: &'static str) -> Result<u32, ExtractError> {
    let digits = RE_NON_DIGIT.replace_all(text, "");
    digits
        .parse::<u32>()
        .map_err(|_| ExtractError::MalformedIdentifier {
            block,
            text: text.trim().to_string(),
        })
}

/// Parse a list of ids such as `1, 3` or `2;4`.
fn parse_id_list(text: &str) -> Result<Vec<u32>, ExtractError> {
    RE_NON_DIGIT
        .replace_all(text, " ")
        .split_whitespace()
        .map(|id| parse_id(id, "authors"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubstitutionTable;
    use crate::pipeline::converter::fake::FakeConverter;

    const TITLE: &str = "<table><tr><td><p>On <em>α</em>-helices</p></td></tr></table>";
    const AUTHORS: &str = "<table>\
        <tr><th>#</th><th>Name</th><th>Affiliation</th></tr>\
        <tr><td>1</td><td><em>jane smith</em></td><td>1, 2</td></tr>\
        <tr><td>2</td><td>john van der berg</td><td>2</td></tr>\
        <tr><td>3</td><td></td><td></td></tr>\
        </table>";
    const AFFILIATIONS: &str = "<table>\
        <tr><td>2.</td><td><p>Other Lab</p></td></tr>\
        <tr><td>1.</td><td>Univ &amp; Co</td></tr>\
        <tr><td></td><td></td></tr>\
        </table>";
    const BODY: &str = "<table><tr><td><p>First.</p>\n<p>Second ~ third.</p></td></tr></table>";
    const REFERENCES: &str = "<table>\
        <tr><td>[2]</td><td><p>B. Ref</p></td></tr>\
        <tr><td>[1]</td><td><p>A. Ref</p></td></tr>\
        <tr><td>[3]</td><td><p></p></td></tr>\
        </table>";

    fn doc(tables: &[&str]) -> String {
        format!("<html><body>{}</body></html>", tables.join("\n"))
    }

    fn run(markup: &str) -> Result<SubmissionRecord, ExtractError> {
        let table = SubstitutionTable::default();
        let normalizer = TextNormalizer::new(&FakeConverter, &table);
        extract(markup, &FiveTableLayout, &normalizer)
    }

    #[test]
    fn extracts_all_five_blocks() {
        let record = run(&doc(&[TITLE, AUTHORS, AFFILIATIONS, BODY, REFERENCES])).unwrap();

        assert_eq!(record.title.as_str(), r"On \emph{$\alpha$}-helices");

        assert_eq!(record.authors.len(), 2, "blank filler row must be skipped");
        assert!(record.authors[0].is_presenting);
        assert_eq!(record.authors[0].name_parts, vec!["jane", "smith"]);
        assert_eq!(record.authors[0].affiliation_ids, vec![1, 2]);
        assert!(!record.authors[1].is_presenting);
        assert_eq!(
            record.authors[1].name_parts,
            vec!["john", "van", "der", "berg"]
        );

        let affil: Vec<(u32, &str)> = record
            .affiliations
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        assert_eq!(affil, vec![(1, r"Univ \& Co"), (2, "Other Lab")]);

        assert_eq!(record.body.as_str(), r"First.\\Second $\sim$ third.");

        let refs: Vec<u32> = record.references.keys().copied().collect();
        assert_eq!(refs, vec![1, 2], "empty reference rows are dropped");
        assert_eq!(record.references[&1].as_str(), "A. Ref");
        assert!(record.figure.is_none());
    }

    #[test]
    fn four_tables_means_no_references() {
        let record = run(&doc(&[TITLE, AUTHORS, AFFILIATIONS, BODY])).unwrap();
        assert!(!record.has_references());
    }

    #[test]
    fn missing_tables_is_missing_structure() {
        let err = run("<html><body><p>Just text</p></body></html>").unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingTemplateStructure {
                found: 0,
                required: 4
            }
        ));

        let err = run(&doc(&[TITLE, AUTHORS])).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingTemplateStructure { found: 2, .. }
        ));
    }

    #[test]
    fn non_numeric_affiliation_id_is_malformed() {
        let bad = "<table><tr><td>one</td><td>Somewhere</td></tr></table>";
        let err = run(&doc(&[TITLE, AUTHORS, bad, BODY])).unwrap_err();
        match err {
            ExtractError::MalformedIdentifier { block, text } => {
                assert_eq!(block, "affiliations");
                assert_eq!(text, "one");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_ordinal_is_malformed() {
        let bad = "<table><tr><th>#</th></tr><tr><td>x</td><td>jane doe</td><td>1</td></tr></table>";
        let err = run(&doc(&[TITLE, bad, AFFILIATIONS, BODY])).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MalformedIdentifier {
                block: "authors",
                ..
            }
        ));
    }

    #[test]
    fn id_lists_accept_any_separator() {
        assert_eq!(parse_id_list("1,3; 4 and 12").unwrap(), vec![1, 3, 4, 12]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("99999999999").is_err());
    }

    #[test]
    fn layout_used_directly_with_too_few_tables_is_an_error() {
        let table = SubstitutionTable::default();
        let normalizer = TextNormalizer::new(&FakeConverter, &table);
        let markup = Html::parse_document(&doc(&[TITLE, AUTHORS]));
        let blocks: Vec<ElementRef<'_>> = markup.select(&SEL_TABLE).collect();

        assert!(FiveTableLayout.title(&blocks, &normalizer).is_ok());
        assert_eq!(FiveTableLayout.authors(&blocks).unwrap().len(), 2);
        let err = FiveTableLayout.body(&blocks, &normalizer).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingTemplateStructure {
                found: 2,
                required: 4
            }
        ));
        assert!(FiveTableLayout.affiliations(&[], &normalizer).is_err());
        assert!(FiveTableLayout.references(&blocks, &normalizer).unwrap().is_empty());
    }

    #[test]
    fn parse_id_strips_decoration() {
        assert_eq!(parse_id("[12].", "references").unwrap(), 12);
        assert!(parse_id("  ", "references").is_err());
    }
}
