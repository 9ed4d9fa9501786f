//! Locates native `<template>` embeddings in script source.
//!
//! `<template>` is not valid TypeScript, so the scanner runs before the host
//! parser. It skips strings, comments, regular expressions and template
//! literals, classifies each embedding by where it appears, and produces a
//! masked copy of the source in which every embedding is replaced by an
//! equal-length placeholder the host parser accepts.

use std::sync::OnceLock;

use regex::Regex;
use source_map::Span;
use thiserror::Error;

/// Where a native embedding appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Directly inside a class body.
    ClassMember,
    /// In a position that takes a value.
    Expression,
    /// A bare statement at module top level; the module's default export.
    TopLevel,
}

/// A `<template>...</template>` found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEmbedding {
    /// The whole embedding, tags included.
    pub range: Span,
    /// The template contents between the tags.
    pub content: Span,
    pub placement: Placement,
}

/// The result of scanning a script.
#[derive(Debug, Clone)]
pub struct NativeScan {
    pub embeddings: Vec<NativeEmbedding>,
    /// The source with each embedding masked out. Byte offsets and line
    /// breaks are preserved.
    pub masked: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unclosed <template> tag")]
pub struct UnclosedTemplate {
    pub span: Span,
}

const OPEN_TAG: &str = "<template";
const CLOSE_TAG: &str = "</template>";

fn class_head() -> &'static Regex {
    static CLASS_HEAD: OnceLock<Regex> = OnceLock::new();
    CLASS_HEAD.get_or_init(|| {
        Regex::new(r"(?:^|[^\w$.])class(?:\s+[\w$]+)?(?:\s+extends\s+[^;{}]+?)?\s*$")
            .expect("class head pattern is valid")
    })
}

/// Keywords after which a value is expected.
const EXPRESSION_KEYWORDS: &[&str] = &["default", "return", "yield", "await", "typeof", "void"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Class,
    Block,
    Paren,
    /// `${` inside a template literal.
    Interpolation,
    /// The text of a template literal.
    TemplateLiteral,
}

/// Finds native template embeddings in `source`.
pub fn scan_native_templates(source: &str) -> Result<NativeScan, UnclosedTemplate> {
    let mut scanner = Scanner {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        stack: Vec::new(),
        last_significant: None,
        embeddings: Vec::new(),
    };
    scanner.run()?;

    let mut masked = source.as_bytes().to_vec();
    for embedding in &scanner.embeddings {
        mask(&mut masked, embedding);
    }
    // Masking only writes ASCII over whole characters.
    let masked = String::from_utf8(masked).unwrap_or_else(|_| source.to_string());

    tracing::debug!(count = scanner.embeddings.len(), "scanned native templates");
    Ok(NativeScan {
        embeddings: scanner.embeddings,
        masked,
    })
}

fn mask(bytes: &mut [u8], embedding: &NativeEmbedding) {
    let range = embedding.range.start_usize()..embedding.range.end_usize();
    for byte in &mut bytes[range.clone()] {
        if *byte != b'\n' {
            *byte = b' ';
        }
    }
    let placeholder: &[u8] = match embedding.placement {
        Placement::ClassMember => b"static{",
        Placement::Expression => b"null",
        Placement::TopLevel => b"",
    };
    bytes[range.start..range.start + placeholder.len()].copy_from_slice(placeholder);
    if embedding.placement == Placement::ClassMember {
        bytes[range.end - 1] = b'}';
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    stack: Vec<Frame>,
    /// Offset of the last code byte that was not whitespace or a comment.
    last_significant: Option<usize>,
    embeddings: Vec<NativeEmbedding>,
}

impl Scanner<'_> {
    fn run(&mut self) -> Result<(), UnclosedTemplate> {
        while self.pos < self.bytes.len() {
            if self.stack.last() == Some(&Frame::TemplateLiteral) {
                self.scan_template_literal_text();
                continue;
            }

            let byte = self.bytes[self.pos];
            match byte {
                b'\'' | b'"' => self.skip_string(byte),
                b'`' => {
                    self.stack.push(Frame::TemplateLiteral);
                    self.pos += 1;
                }
                b'/' if self.peek(1) == Some(b'/') => {
                    self.skip_line_comment();
                    continue;
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.skip_block_comment();
                    continue;
                }
                b'/' if self.regex_allowed() => self.skip_regex(),
                b'<' if self.at_open_tag(self.pos) => {
                    self.scan_embedding()?;
                    continue;
                }
                b'{' => {
                    let frame = if class_head().is_match(self.statement_prefix()) {
                        Frame::Class
                    } else {
                        Frame::Block
                    };
                    self.stack.push(frame);
                    self.pos += 1;
                }
                b'(' | b'[' => {
                    self.stack.push(Frame::Paren);
                    self.pos += 1;
                }
                b')' | b']' => {
                    if self.stack.last() == Some(&Frame::Paren) {
                        self.stack.pop();
                    }
                    self.pos += 1;
                }
                b'}' => {
                    if matches!(
                        self.stack.last(),
                        Some(Frame::Class | Frame::Block | Frame::Interpolation)
                    ) {
                        self.stack.pop();
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }

            if !byte.is_ascii_whitespace() {
                self.last_significant = Some(self.pos.min(self.bytes.len()) - 1);
            }
        }
        Ok(())
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn at_open_tag(&self, at: usize) -> bool {
        self.source[at..].starts_with(OPEN_TAG)
            && matches!(
                self.bytes.get(at + OPEN_TAG.len()),
                Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')
            )
    }

    /// Source between the previous statement boundary and the current `{`.
    fn statement_prefix(&self) -> &str {
        let start = self.source[..self.pos]
            .rfind([';', '{', '}'])
            .map_or(0, |index| index + 1);
        &self.source[start..self.pos]
    }

    fn scan_template_literal_text(&mut self) {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.stack.pop();
                    self.pos += 1;
                    self.last_significant = Some(self.pos - 1);
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.stack.push(Frame::Interpolation);
                    self.pos += 2;
                    self.last_significant = Some(self.pos - 1);
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => return,
                byte if byte == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        self.pos = self.source[self.pos..]
            .find('\n')
            .map_or(self.bytes.len(), |index| self.pos + index);
    }

    fn skip_block_comment(&mut self) {
        self.pos = self.source[self.pos + 2..]
            .find("*/")
            .map_or(self.bytes.len(), |index| self.pos + 2 + index + 2);
    }

    /// A `/` starts a regular expression where a value is expected.
    fn regex_allowed(&self) -> bool {
        match self.last_significant {
            None => true,
            Some(at) => {
                matches!(
                    self.bytes[at],
                    b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}'
                        | b';'
                ) || EXPRESSION_KEYWORDS.contains(&self.word_ending_at(at))
            }
        }
    }

    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => return,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphabetic()
                    {
                        self.pos += 1;
                    }
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn word_ending_at(&self, at: usize) -> &str {
        let mut start = at + 1;
        while start > 0 && is_word_byte(self.bytes[start - 1]) {
            start -= 1;
        }
        self.source.get(start..at + 1).unwrap_or_default()
    }

    fn placement(&self) -> Placement {
        match self.stack.last() {
            Some(Frame::Class) => Placement::ClassMember,
            Some(_) => Placement::Expression,
            None => match self.last_significant {
                Some(at)
                    if matches!(
                        self.bytes[at],
                        b'=' | b'(' | b',' | b':' | b'?' | b'[' | b'!' | b'&' | b'|' | b'>'
                    ) || EXPRESSION_KEYWORDS.contains(&self.word_ending_at(at)) =>
                {
                    Placement::Expression
                }
                _ => Placement::TopLevel,
            },
        }
    }

    fn scan_embedding(&mut self) -> Result<(), UnclosedTemplate> {
        let start = self.pos;
        let unclosed = || UnclosedTemplate {
            span: Span::from_usize(start, start + OPEN_TAG.len()),
        };

        let open_end = self.source[start..].find('>').ok_or_else(unclosed)? + start + 1;

        // Nested `<template>` elements inside the contents are balanced.
        let mut depth = 0usize;
        let mut cursor = open_end;
        let close_start = loop {
            let next_close = self.source[cursor..]
                .find(CLOSE_TAG)
                .ok_or_else(unclosed)?
                + cursor;
            let next_open = self.source[cursor..next_close]
                .match_indices(OPEN_TAG)
                .map(|(index, _)| index + cursor)
                .find(|&index| self.at_open_tag(index));
            match next_open {
                Some(open) => {
                    depth += 1;
                    cursor = open + OPEN_TAG.len();
                }
                None if depth == 0 => break next_close,
                None => {
                    depth -= 1;
                    cursor = next_close + CLOSE_TAG.len();
                }
            }
        };
        let end = close_start + CLOSE_TAG.len();

        self.embeddings.push(NativeEmbedding {
            range: Span::from_usize(start, end),
            content: Span::from_usize(open_end, close_start),
            placement: self.placement(),
        });
        self.pos = end;
        self.last_significant = Some(end - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn placements(source: &str) -> Vec<Placement> {
        scan_native_templates(source)
            .unwrap()
            .embeddings
            .iter()
            .map(|embedding| embedding.placement)
            .collect()
    }

    #[test]
    fn test_placements() {
        assert_eq!(placements("<template>hi</template>\n"), vec![Placement::TopLevel]);
        assert_eq!(
            placements("export default class Foo extends Component {\n  <template>x</template>\n}\n"),
            vec![Placement::ClassMember]
        );
        assert_eq!(
            placements("const Foo = <template>x</template>;\nexport default <template>y</template>;"),
            vec![Placement::Expression, Placement::Expression]
        );
        assert_eq!(
            placements("function f() { return <template>x</template>; }"),
            vec![Placement::Expression]
        );
        assert_eq!(
            placements("const Foo = class { <template>x</template> };"),
            vec![Placement::ClassMember]
        );
    }

    #[test]
    fn test_ranges_and_masking() {
        let source = "class A {\n  <template>{{@a}}\n</template>\n}";
        let scan = scan_native_templates(source).unwrap();
        let embedding = &scan.embeddings[0];
        assert_eq!(
            embedding.range.slice(source),
            Some("<template>{{@a}}\n</template>")
        );
        assert_eq!(embedding.content.slice(source), Some("{{@a}}\n"));
        assert_eq!(scan.masked.len(), source.len());
        assert_eq!(scan.masked, "class A {\n  static{         \n          }\n}");
    }

    #[test]
    fn test_skips_strings_comments_and_literals() {
        let source = r#"
const a = "<template>";
// <template>
/* <template> */
const b = `${"x"} <template> ${`<template>`}`;
const c = /<template>/g;
<template>real</template>
"#;
        let scan = scan_native_templates(source).unwrap();
        assert_eq!(scan.embeddings.len(), 1);
        assert_eq!(scan.embeddings[0].content.slice(source), Some("real"));
        assert_eq!(scan.embeddings[0].placement, Placement::TopLevel);
    }

    #[test]
    fn test_nested_template_elements() {
        let source = "<template><template>inner</template></template>";
        let scan = scan_native_templates(source).unwrap();
        assert_eq!(scan.embeddings.len(), 1);
        assert_eq!(
            scan.embeddings[0].content.slice(source),
            Some("<template>inner</template>")
        );
    }

    #[test]
    fn test_unclosed_template() {
        let err = scan_native_templates("const x = <template>oops").unwrap_err();
        assert_eq!(err.span, Span::from_usize(10, 19));
        assert_eq!(err.to_string(), "Unclosed <template> tag");
    }

    #[test]
    fn test_less_than_is_not_a_template() {
        let scan = scan_native_templates("if (a <templates) {}").unwrap();
        assert!(scan.embeddings.is_empty());
    }
}
