//! Mustache lexer using logos.
//!
//! Only the inside of `{{ ... }}` is tokenized; HTML structure is scanned by
//! the parser directly. A [`Lexer`] starts at an arbitrary offset of the
//! template so the parser can hand control back and forth between the two.

use std::collections::VecDeque;

use logos::Logos;
use source_map::Span;

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Span in template coordinates.
    pub span: Span,
}

/// Token kinds for mustache interiors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    /// `}}}`
    #[token("}}}")]
    CloseTriple,

    /// `}}`
    #[token("}}")]
    Close,

    /// `~`
    #[token("~")]
    Tilde,

    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `=`
    #[token("=")]
    Eq,

    /// `|`
    #[token("|")]
    Pipe,

    /// `.`
    #[token(".")]
    Dot,

    /// `@`
    #[token("@")]
    At,

    /// `#`
    #[token("#")]
    Hash,

    /// `/`
    #[token("/")]
    Slash,

    /// A double- or single-quoted string.
    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"'([^'\\]|\\.)*'")]
    String,

    /// A decimal number.
    #[regex(r"-?[0-9]+(\.[0-9]+)?", priority = 10)]
    Number,

    /// A name. Keywords (`this`, `as`, `else`, `true`, ...) are names too;
    /// the parser tells them apart by text.
    #[regex(r##"[^\s!"#%&'()*+,./;<=>@\[\\\]^`{|}~]+"##, priority = 1)]
    Ident,

    /// A character no token accepts.
    Error,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// How the token reads in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::CloseTriple => "`}}}`",
            TokenKind::Close => "`}}`",
            TokenKind::Tilde => "`~`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Eq => "`=`",
            TokenKind::Pipe => "`|`",
            TokenKind::Dot => "`.`",
            TokenKind::At => "`@`",
            TokenKind::Hash => "`#`",
            TokenKind::Slash => "`/`",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Ident => "identifier",
            TokenKind::Error => "invalid character",
            TokenKind::Eof => "end of template",
        }
    }
}

/// A lexer with arbitrary lookahead over a template slice.
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
    base: usize,
    buffer: VecDeque<Token>,
    last_end: usize,
    done: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a lexer over the whole of `source`.
    pub fn new(source: &'src str) -> Self {
        Self::at(source, 0)
    }

    /// Creates a lexer that starts at `offset` in `source`. Token spans stay
    /// relative to the start of `source`.
    pub fn at(source: &'src str, offset: usize) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(&source[offset..]),
            base: offset,
            buffer: VecDeque::new(),
            last_end: offset,
            done: false,
        }
    }

    fn lex_one(&mut self) -> Token {
        let kind = match self.inner.next() {
            Some(Ok(kind)) => kind,
            Some(Err(())) => TokenKind::Error,
            None => {
                let end = self.source.len();
                return Token {
                    kind: TokenKind::Eof,
                    span: Span::from_usize(end, end),
                };
            }
        };
        let range = self.inner.span();
        Token {
            kind,
            span: Span::from_usize(self.base + range.start, self.base + range.end),
        }
    }

    /// Looks `n` tokens ahead without consuming anything.
    pub fn peek_nth(&mut self, n: usize) -> Token {
        while self.buffer.len() <= n {
            let token = self.lex_one();
            self.buffer.push_back(token);
        }
        self.buffer[n]
    }

    /// Looks at the next token.
    pub fn peek(&mut self) -> Token {
        self.peek_nth(0)
    }

    /// Consumes the next token.
    pub fn bump(&mut self) -> Token {
        let token = match self.buffer.pop_front() {
            Some(token) => token,
            None => self.lex_one(),
        };
        self.last_end = token.span.end_usize();
        token
    }

    /// Consumes the next token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.bump())
        } else {
            None
        }
    }

    /// The end offset of the last consumed token.
    pub fn position(&self) -> usize {
        self.last_end
    }

    /// The source text of a token.
    pub fn text(&self, token: &Token) -> &'src str {
        &self.source[token.span.start_usize()..token.span.end_usize()]
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.bump();
        if token.kind == TokenKind::Eof {
            self.done = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).map(|token| token.kind).collect()
    }

    #[test]
    fn test_path_tokens() {
        assert_eq!(
            kinds("this.foo @bar.baz"),
            vec![
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::At,
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_literals_and_hash() {
        assert_eq!(
            kinds(r#"concat "a\"b" 'c' -1.5 key=2}}"#),
            vec![
                TokenKind::Ident,
                TokenKind::String,
                TokenKind::String,
                TokenKind::Number,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Close,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_names_with_dashes_and_colons() {
        let mut lexer = Lexer::new("my-helper Foo::Bar a1 $x?");
        let texts: Vec<String> = std::iter::from_fn(|| {
            let token = lexer.bump();
            (token.kind != TokenKind::Eof).then(|| lexer.text(&token).to_string())
        })
        .collect();
        assert_eq!(texts, vec!["my-helper", "Foo::Bar", "a1", "$x?"]);
    }

    #[test]
    fn test_offset_start_and_lookahead() {
        let source = "<p>{{foo bar=1}}</p>";
        let mut lexer = Lexer::at(source, 5);
        assert_eq!(lexer.peek_nth(2).kind, TokenKind::Eq);
        let first = lexer.bump();
        assert_eq!(first.span, Span::from_usize(5, 8));
        assert_eq!(lexer.text(&first), "foo");
        lexer.bump();
        lexer.bump();
        lexer.bump();
        assert_eq!(lexer.bump().kind, TokenKind::Close);
        assert_eq!(lexer.position(), 16);
    }

    #[test]
    fn test_block_params() {
        assert_eq!(
            kinds("as |item index|"),
            vec![
                TokenKind::Ident,
                TokenKind::Pipe,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Pipe,
                TokenKind::Eof,
            ]
        );
    }
}
