//! Text normalization: markup fragments → LaTeX-ready text.
//!
//! Pandoc does most of the work. What it gets wrong is patched afterwards by
//! the [`SubstitutionTable`]:
//!
//! 1. Split the fragment on `\n` into paragraphs
//! 2. Convert each paragraph with the external converter
//! 3. Recompose Unicode (pandoc passes decomposed accents through untouched)
//! 4. Apply the substitution table
//! 5. Collapse newlines the converter emitted into spaces
//! 6. Restore the paragraph's leading/trailing whitespace width, which the
//!    converter strips
//! 7. Join paragraphs with a forced line break `\\`
//!
//! The table runs only on converter output. Running it on raw markup would
//! feed LaTeX macros back into the converter, which escapes them.

use crate::config::SubstitutionTable;
use crate::error::ConverterError;
use crate::pipeline::converter::DocumentConverter;
use crate::record::NormalizedText;
use unicode_normalization::UnicodeNormalization;

/// LaTeX forced line break used between paragraphs and list entries.
pub const LINE_BREAK: &str = r"\\";

/// Converts markup fragments into [`NormalizedText`].
pub struct TextNormalizer<'a> {
    converter: &'a dyn DocumentConverter,
    substitutions: &'a SubstitutionTable,
}

impl<'a> TextNormalizer<'a> {
    pub fn new(converter: &'a dyn DocumentConverter, substitutions: &'a SubstitutionTable) -> Self {
        Self {
            converter,
            substitutions,
        }
    }

    /// Normalize an HTML fragment.
    ///
    /// Empty input yields empty output without calling the converter.
    pub fn normalize(&self, raw: &str) -> Result<NormalizedText, ConverterError> {
        if raw.is_empty() {
            return Ok(NormalizedText::default());
        }
        let paragraphs = raw
            .split('\n')
            .map(|p| self.normalize_paragraph(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NormalizedText::new(paragraphs.join(LINE_BREAK)))
    }

    /// Normalize plain text (a value read from the DOM as text, not markup).
    pub fn normalize_text(&self, plain: &str) -> Result<NormalizedText, ConverterError> {
        self.normalize(&escape_html(plain))
    }

    fn normalize_paragraph(&self, paragraph: &str) -> Result<String, ConverterError> {
        let content = paragraph.trim();
        let leading = paragraph.chars().take_while(|c| c.is_whitespace()).count();
        if content.is_empty() {
            return Ok(" ".repeat(leading));
        }
        let trailing = paragraph
            .chars()
            .rev()
            .take_while(|c| c.is_whitespace())
            .count();

        let converted = self.converter.to_typeset(content)?;
        let composed: String = converted.trim().nfc().collect();
        let fixed = self
            .substitutions
            .apply(&composed)
            .replace("\r\n", " ")
            .replace(['\r', '\n'], " ");

        Ok(format!(
            "{}{}{}",
            " ".repeat(leading),
            fixed,
            " ".repeat(trailing)
        ))
    }
}

/// Escape the characters that would otherwise be read as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::converter::fake::FakeConverter;
    use std::cell::Cell;

    fn leading_ws(s: &str) -> usize {
        s.chars().take_while(|c| c.is_whitespace()).count()
    }

    fn trailing_ws(s: &str) -> usize {
        s.chars().rev().take_while(|c| c.is_whitespace()).count()
    }

    /// Counts converter calls and returns a fixed string.
    struct CountingConverter {
        calls: Cell<usize>,
        reply: &'static str,
    }

    impl DocumentConverter for CountingConverter {
        fn to_markup(&self, _: &std::path::Path, _: &std::path::Path) -> Result<(), ConverterError> {
            Ok(())
        }

        fn to_typeset(&self, _fragment: &str) -> Result<String, ConverterError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.reply.to_string())
        }
    }

    #[test]
    fn empty_input_skips_converter() {
        let conv = CountingConverter {
            calls: Cell::new(0),
            reply: "x",
        };
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&conv, &table);
        assert!(n.normalize("").unwrap().is_empty());
        assert_eq!(conv.calls.get(), 0);
    }

    #[test]
    fn preserves_whitespace_width() {
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&FakeConverter, &table);
        for p in ["plain", "  two leading", "trailing   ", "\t both \t ", " α "] {
            let out = n.normalize(p).unwrap();
            assert_eq!(leading_ws(out.as_str()), leading_ws(p), "leading of {p:?}");
            assert_eq!(trailing_ws(out.as_str()), trailing_ws(p), "trailing of {p:?}");
        }
    }

    #[test]
    fn whitespace_only_paragraph_keeps_width() {
        let conv = CountingConverter {
            calls: Cell::new(0),
            reply: "never",
        };
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&conv, &table);
        assert_eq!(n.normalize("   ").unwrap().as_str(), "   ");
        assert_eq!(conv.calls.get(), 0);
    }

    #[test]
    fn paragraphs_joined_with_forced_break() {
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&FakeConverter, &table);
        let out = n.normalize("<p>first</p>\n<p>second</p>").unwrap();
        assert_eq!(out.as_str(), r"first\\second");
    }

    #[test]
    fn substitutions_apply_after_conversion() {
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&FakeConverter, &table);
        let out = n.normalize("<p>size ~ 5 μm in Zürich</p>").unwrap();
        assert_eq!(out.as_str(), r#"size $\sim$ 5 $\mu$m in Z\"{u}rich"#);
    }

    #[test]
    fn decomposed_accents_are_recomposed() {
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&FakeConverter, &table);
        let out = n.normalize("Caf\u{0065}\u{0301}").unwrap();
        assert_eq!(out.as_str(), r"Caf\'{e}");
    }

    #[test]
    fn converter_newlines_collapse_to_spaces() {
        let conv = CountingConverter {
            calls: Cell::new(0),
            reply: "line one\nline two",
        };
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&conv, &table);
        assert_eq!(n.normalize("x").unwrap().as_str(), "line one line two");
    }

    #[test]
    fn crlf_counts_as_one_newline() {
        let conv = CountingConverter {
            calls: Cell::new(0),
            reply: "one\r\ntwo\rthree\nfour\r\n",
        };
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&conv, &table);
        assert_eq!(n.normalize("x").unwrap().as_str(), "one two three four");
    }

    #[test]
    fn normalized_output_is_stable_under_the_table() {
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&FakeConverter, &table);
        let out = n.normalize("<p>αβγ é è ü ä ö ~</p>").unwrap();
        assert_eq!(table.apply(out.as_str()), out.as_str());
    }

    #[test]
    fn plain_text_is_escaped_before_conversion() {
        let table = SubstitutionTable::default();
        let n = TextNormalizer::new(&FakeConverter, &table);
        let out = n.normalize_text("Smith & Sons <Ltd>").unwrap();
        assert_eq!(out.as_str(), r"Smith \& Sons <Ltd>");
    }
}
