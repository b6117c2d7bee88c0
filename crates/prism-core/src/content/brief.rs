//! Brief-text extraction for tables and link previews
//!
//! The brief is the one-line summary shown next to a declaration in
//! member tables. For paragraphed documentation it is the first
//! paragraph; for flat-text documentation, which has no paragraph
//! convention, it is the first punctuation-terminated clause. The
//! sentence heuristic only ever runs over plain prose: when the
//! description opens with a code block, the block is returned whole.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{DocBlock, DocLanguage, DocSegment};

/// First clause ending in `.`, `!` or `?` followed by whitespace or
/// the end of input
fn sentence_regex() -> &'static Regex {
    static SENTENCE: OnceLock<Regex> = OnceLock::new();
    SENTENCE.get_or_init(|| Regex::new(r"(?s)^(.*?[.!?])(\s|$)").expect("valid sentence pattern"))
}

/// Extract the brief from a documentation block
///
/// Returns `None` when the block has no description. A leading code
/// segment is returned whole; prose is shortened per the block's
/// language convention.
#[must_use]
pub fn brief_segment(doc: &DocBlock) -> Option<DocSegment> {
    match doc.description.first()? {
        DocSegment::Code(code) => Some(DocSegment::Code(code.clone())),
        DocSegment::Text(text) => {
            let brief = match doc.language {
                DocLanguage::Paragraphed => first_paragraph(text),
                DocLanguage::FlatText => first_sentence(text),
            };
            Some(DocSegment::Text(brief))
        }
    }
}

/// Everything up to the first blank line
fn first_paragraph(text: &str) -> String {
    text.split("\n\n")
        .next()
        .unwrap_or("")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// The first punctuation-terminated clause, or the whole text when no
/// terminator exists
fn first_sentence(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match sentence_regex().captures(&flat) {
        Some(captures) => captures[1].trim().to_string(),
        None => flat.trim().to_string(),
    }
}
