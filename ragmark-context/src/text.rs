//! Line-oriented chunking of extracted document text.
//!
//! The retrieval unit in ragmark is a single line of text. Extracted page text is
//! split on newlines, each line is trimmed, blank lines are dropped and HTML
//! entities left behind by the extractor are decoded.
//!
//! ```
//! use ragmark_context::text::split;
//!
//! let chunks = split("  Install the CLI  \n\nRun `ragmark sync` &amp; wait\n");
//! assert_eq!(chunks, vec!["Install the CLI", "Run `ragmark sync` & wait"]);
//! ```
//!
//! The function is pure and idempotent on text that has already been cleaned,
//! so re-chunking stored chunk text yields the same chunks.

use html_escape::decode_html_entities;

/// A chunk produced by [`split`], paired with its position in the document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TextChunk {
    /// Zero-based position in emission order
    pub index: usize,
    pub text: String,
}

/// Splits `text` into trimmed, non-empty, entity-decoded lines, preserving order.
pub fn split(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| decode_html_entities(line).into_owned())
        .collect()
}

/// Like [`split`], but numbers each chunk with its emission index.
pub fn split_indexed(text: &str) -> Vec<TextChunk> {
    split(text)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, text })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(split("").is_empty());
        assert!(split("\n\n   \n\t\n").is_empty());
    }

    #[test]
    fn test_trims_and_drops_blank_lines() {
        assert_eq!(split("  a  \nb\n\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_decodes_html_entities() {
        assert_eq!(split("a &amp; b"), vec!["a & b"]);
        assert_eq!(
            split("&lt;div&gt; &quot;quoted&quot; &#39;single&#39;"),
            vec!["<div> \"quoted\" 'single'"]
        );
    }

    #[test]
    fn test_preserves_order() {
        let text = "third\nfirst\r\nsecond";
        assert_eq!(split(text), vec!["third", "first", "second"]);
    }

    #[test]
    fn test_idempotent_on_clean_input() {
        let once = split("  alpha \n\n beta\ngamma  ");
        let twice = split(&once.join("\n"));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_split_indexed() {
        let chunks = split_indexed("one\n\ntwo\n");
        assert_eq!(
            chunks,
            vec![
                TextChunk {
                    index: 0,
                    text: "one".to_string()
                },
                TextChunk {
                    index: 1,
                    text: "two".to_string()
                },
            ]
        );
    }
}
