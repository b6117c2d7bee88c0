//! Parsed documentation blocks
//!
//! The declaration provider hands over raw documentation text plus a
//! language tag describing its brief convention. Parsing happens once,
//! in the tree builder; everything downstream works on the structured
//! [`DocBlock`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Convention the raw documentation text follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocLanguage {
    /// Paragraphs separated by blank lines; the brief is the first
    /// paragraph
    #[default]
    Paragraphed,
    /// No paragraph convention; the brief is the first sentence
    FlatText,
}

/// One run of description content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocSegment {
    /// Plain prose
    Text(String),
    /// A fenced code block, kept whole
    Code(String),
}

/// Structured documentation for one declaration in one variant
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocBlock {
    /// Brief convention of the source text
    pub language: DocLanguage,
    /// Description content in source order
    pub description: Vec<DocSegment>,
    /// `@param` documentation by parameter name
    pub params: BTreeMap<String, String>,
    /// `@return` documentation
    pub returns: Option<String>,
    /// `@throws` documentation, one entry per tag
    pub throws: Vec<String>,
    /// `@see` references
    pub see_also: Vec<String>,
    /// `@deprecated` message
    pub deprecation: Option<String>,
}

/// Tag currently accumulating continuation lines
enum OpenTag {
    Param(String),
    Returns,
    Throws,
    See,
    Deprecated,
}

impl DocBlock {
    /// Parse a raw documentation comment
    ///
    /// Total: malformed tag lines fall back to description text.
    #[must_use]
    pub fn parse(text: &str, language: DocLanguage) -> Self {
        let mut doc = DocBlock {
            language,
            ..DocBlock::default()
        };

        let mut text_lines: Vec<&str> = Vec::new();
        let mut code_lines: Vec<String> = Vec::new();
        let mut in_code_block = false;
        let mut open_tag: Option<OpenTag> = None;

        for line in text.lines() {
            let trimmed = line.trim();

            // Handle code fences; fenced content is kept whole
            if trimmed.starts_with("```") {
                if in_code_block {
                    in_code_block = false;
                    doc.description.push(DocSegment::Code(code_lines.join("\n")));
                    code_lines.clear();
                } else {
                    in_code_block = true;
                    open_tag = None;
                    flush_text(&mut text_lines, &mut doc.description);
                }
                continue;
            }
            if in_code_block {
                code_lines.push(line.to_string());
                continue;
            }

            if let Some(tag) = parse_tag_line(trimmed) {
                flush_text(&mut text_lines, &mut doc.description);
                open_tag = doc.start_tag(tag);
                continue;
            }

            if trimmed.is_empty() {
                // Blank lines close a running tag and stay in the
                // description so paragraph breaks survive
                open_tag = None;
                if !text_lines.is_empty() {
                    text_lines.push("");
                }
                continue;
            }

            match &open_tag {
                Some(tag) => doc.continue_tag(tag, trimmed),
                None => text_lines.push(trimmed),
            }
        }

        // An unterminated fence still yields its content
        if !code_lines.is_empty() {
            doc.description.push(DocSegment::Code(code_lines.join("\n")));
        }
        flush_text(&mut text_lines, &mut doc.description);

        doc
    }

    /// Check if the block carries no content at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.params.is_empty()
            && self.returns.is_none()
            && self.throws.is_empty()
            && self.see_also.is_empty()
            && self.deprecation.is_none()
    }

    /// The first plain-text segment of the description, if any
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.description.iter().find_map(|segment| match segment {
            DocSegment::Text(text) => Some(text.as_str()),
            DocSegment::Code(_) => None,
        })
    }

    fn start_tag(&mut self, tag: ParsedTag) -> Option<OpenTag> {
        match tag {
            ParsedTag::Param { name, rest } => {
                self.params.insert(name.clone(), rest);
                Some(OpenTag::Param(name))
            }
            ParsedTag::Returns(rest) => {
                self.returns = Some(rest);
                Some(OpenTag::Returns)
            }
            ParsedTag::Throws(rest) => {
                self.throws.push(rest);
                Some(OpenTag::Throws)
            }
            ParsedTag::See(rest) => {
                self.see_also.push(rest);
                Some(OpenTag::See)
            }
            ParsedTag::Deprecated(rest) => {
                self.deprecation = Some(rest);
                Some(OpenTag::Deprecated)
            }
        }
    }

    fn continue_tag(&mut self, tag: &OpenTag, line: &str) {
        match tag {
            OpenTag::Param(name) => {
                if let Some(value) = self.params.get_mut(name) {
                    append_clause(value, line);
                }
            }
            OpenTag::Returns => {
                if let Some(value) = &mut self.returns {
                    append_clause(value, line);
                }
            }
            OpenTag::Throws => {
                if let Some(value) = self.throws.last_mut() {
                    append_clause(value, line);
                }
            }
            OpenTag::See => {
                if let Some(value) = self.see_also.last_mut() {
                    append_clause(value, line);
                }
            }
            OpenTag::Deprecated => {
                if let Some(value) = &mut self.deprecation {
                    append_clause(value, line);
                }
            }
        }
    }
}

/// A recognized `@`-tag line
enum ParsedTag {
    Param { name: String, rest: String },
    Returns(String),
    Throws(String),
    See(String),
    Deprecated(String),
}

fn parse_tag_line(line: &str) -> Option<ParsedTag> {
    let rest = line.strip_prefix('@')?;
    let (tag, rest) = match rest.split_once(char::is_whitespace) {
        Some((tag, rest)) => (tag, rest.trim()),
        None => (rest, ""),
    };

    match tag {
        "param" => {
            // `@param name description`; a bare `@param` is malformed
            // and falls back to description text
            let (name, desc) = match rest.split_once(char::is_whitespace) {
                Some((name, desc)) => (name, desc.trim()),
                None if !rest.is_empty() => (rest, ""),
                None => return None,
            };
            Some(ParsedTag::Param {
                name: name.to_string(),
                rest: desc.to_string(),
            })
        }
        "return" | "returns" => Some(ParsedTag::Returns(rest.to_string())),
        "throws" | "exception" => Some(ParsedTag::Throws(rest.to_string())),
        "see" => Some(ParsedTag::See(rest.to_string())),
        "deprecated" => Some(ParsedTag::Deprecated(rest.to_string())),
        _ => None,
    }
}

fn flush_text(lines: &mut Vec<&str>, out: &mut Vec<DocSegment>) {
    while lines.last() == Some(&"") {
        lines.pop();
    }
    if !lines.is_empty() {
        out.push(DocSegment::Text(lines.join("\n")));
        lines.clear();
    }
}

fn append_clause(value: &mut String, line: &str) {
    if !value.is_empty() {
        value.push(' ');
    }
    value.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_description() {
        let doc = DocBlock::parse("Draws the widget.", DocLanguage::Paragraphed);
        assert_eq!(
            doc.description,
            vec![DocSegment::Text("Draws the widget.".into())]
        );
        assert!(doc.params.is_empty());
    }

    #[test]
    fn test_parse_tags() {
        let text = "Draws the widget.\n\n@param canvas where to draw\n@param scale how large,\n  relative to the base size\n@return the number of pixels touched\n@throws IllegalStateException when not attached\n@see Canvas\n@deprecated use render instead";
        let doc = DocBlock::parse(text, DocLanguage::Paragraphed);

        assert_eq!(doc.params.len(), 2);
        assert_eq!(doc.params["canvas"], "where to draw");
        assert_eq!(
            doc.params["scale"],
            "how large, relative to the base size"
        );
        assert_eq!(
            doc.returns.as_deref(),
            Some("the number of pixels touched")
        );
        assert_eq!(doc.throws, vec!["IllegalStateException when not attached"]);
        assert_eq!(doc.see_also, vec!["Canvas"]);
        assert_eq!(doc.deprecation.as_deref(), Some("use render instead"));
    }

    #[test]
    fn test_code_fence_kept_whole() {
        let text = "Usage:\n```\nval w = Widget()\nw.draw()\n```\nTrailing prose.";
        let doc = DocBlock::parse(text, DocLanguage::Paragraphed);

        assert_eq!(
            doc.description,
            vec![
                DocSegment::Text("Usage:".into()),
                DocSegment::Code("val w = Widget()\nw.draw()".into()),
                DocSegment::Text("Trailing prose.".into()),
            ]
        );
    }

    #[test]
    fn test_tag_inside_fence_is_not_a_tag() {
        let text = "```\n@param not really\n```";
        let doc = DocBlock::parse(text, DocLanguage::FlatText);
        assert!(doc.params.is_empty());
        assert_eq!(doc.description, vec![DocSegment::Code("@param not really".into())]);
    }

    #[test]
    fn test_unknown_tag_falls_back_to_text() {
        let doc = DocBlock::parse("@custom something", DocLanguage::Paragraphed);
        assert_eq!(
            doc.description,
            vec![DocSegment::Text("@custom something".into())]
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(DocBlock::parse("", DocLanguage::Paragraphed).is_empty());
        assert!(!DocBlock::parse("x", DocLanguage::Paragraphed).is_empty());
    }
}
