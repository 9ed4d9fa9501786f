//! Recursive descent parser for Glimmer templates.
//!
//! HTML structure is scanned character by character; everything between
//! `{{` and `}}` goes through the logos [`Lexer`]. The parser stops at the
//! first error.

use smol_str::SmolStr;
use source_map::Span;

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};

/// HTML elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Where a list of children is being parsed; decides which terminators end
/// the list and which are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    Element,
    Block,
}

/// What a `{{` at the current position opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Curly {
    Comment,
    BlockOpen,
    BlockClose,
    Else,
    Mustache,
}

/// The pieces shared by every call-shaped mustache.
struct CallParts {
    path: Expression,
    params: Vec<Expression>,
    hash: Hash,
    block_params: Vec<BlockParam>,
}

/// The template parser.
pub struct Parser<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Parser<'src> {
    /// Creates a new parser.
    pub fn new(source: &'src str) -> Self {
        Self { source, pos: 0 }
    }

    /// Parses the whole template.
    pub fn parse(mut self) -> Result<Template, ParseError> {
        let body = self.parse_children(Context::Root)?;
        Ok(Template {
            body,
            span: Span::from_usize(0, self.source.len()),
        })
    }

    // === Helpers ===

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn span_from(&self, start: usize) -> Span {
        Span::from_usize(start, self.pos)
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Advances while `pred` holds and returns the consumed text.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'src str {
        let start = self.pos;
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &self.source[start..self.pos]
    }

    /// The span of the curly construct at the current position, for errors.
    fn curly_span(&self) -> Span {
        let end = self
            .rest()
            .find("}}")
            .map(|offset| self.pos + offset + 2)
            .unwrap_or(self.source.len());
        Span::from_usize(self.pos, end)
    }

    fn classify_curly(&self) -> Curly {
        let inner = &self.rest()[2..];
        if inner.starts_with('{') {
            return Curly::Mustache;
        }
        let inner = inner.strip_prefix('~').unwrap_or(inner);
        if inner.starts_with('!') {
            return Curly::Comment;
        }
        let inner = inner.trim_start();
        if inner.starts_with('#') {
            Curly::BlockOpen
        } else if inner.starts_with('/') {
            Curly::BlockClose
        } else if let Some(after) = inner.strip_prefix("else") {
            match after.chars().next() {
                Some(c) if c.is_whitespace() || c == '}' || c == '~' => Curly::Else,
                _ => Curly::Mustache,
            }
        } else {
            Curly::Mustache
        }
    }

    // === Content ===

    fn parse_children(&mut self, context: Context) -> Result<Vec<Statement>, ParseError> {
        let mut children = Vec::new();

        while !self.at_end() {
            let rest = self.rest();

            if rest.starts_with("</") {
                if context == Context::Element {
                    break;
                }
                let start = self.pos;
                self.pos += 2;
                let tag = self.take_while(|c| !c.is_whitespace() && c != '>');
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedClosingTag {
                        tag: tag.to_string(),
                    },
                    self.span_from(start),
                ));
            }

            if rest.starts_with("<!--") {
                children.push(Statement::Comment(self.parse_html_comment()?));
                continue;
            }

            if starts_element(rest.as_bytes()) {
                children.push(Statement::Element(self.parse_element()?));
                continue;
            }

            if rest.starts_with("{{") {
                match self.classify_curly() {
                    Curly::Comment => {
                        children.push(Statement::MustacheComment(self.parse_mustache_comment()?))
                    }
                    Curly::BlockOpen => children.push(Statement::Block(self.parse_block()?)),
                    Curly::Mustache => children.push(Statement::Mustache(self.parse_mustache()?)),
                    Curly::Else | Curly::BlockClose if context == Context::Block => break,
                    Curly::Else => {
                        return Err(ParseError::syntax(
                            "{{else}} can only appear inside a block",
                            self.curly_span(),
                        ))
                    }
                    Curly::BlockClose => {
                        return Err(ParseError::syntax(
                            "Closing block without an open block",
                            self.curly_span(),
                        ))
                    }
                }
                continue;
            }

            children.push(Statement::Text(self.parse_text()));
        }

        Ok(children)
    }

    fn parse_text(&mut self) -> TextNode {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let mut i = self.pos;

        while i < bytes.len() {
            let rest = &bytes[i..];
            if rest.starts_with(b"\\{{") {
                i += 3;
                continue;
            }
            if i > start && (rest.starts_with(b"{{") || starts_markup(rest)) {
                break;
            }
            i += 1;
        }

        self.pos = i;
        TextNode {
            chars: self.source[start..i].to_string(),
            span: self.span_from(start),
        }
    }

    fn parse_html_comment(&mut self) -> Result<CommentStatement, ParseError> {
        let start = self.pos;
        let body_start = start + 4;
        let Some(offset) = self.source[body_start..].find("-->") else {
            return Err(ParseError::new(
                ParseErrorKind::UnclosedComment,
                Span::from_usize(start, self.source.len()),
            ));
        };
        self.pos = body_start + offset + 3;
        Ok(CommentStatement {
            value: self.source[body_start..body_start + offset].to_string(),
            span: self.span_from(start),
        })
    }

    fn parse_mustache_comment(&mut self) -> Result<MustacheCommentStatement, ParseError> {
        let start = self.pos;
        let mut body_start = start + 2;
        if self.source[body_start..].starts_with('~') {
            body_start += 1;
        }
        body_start += 1; // `!`

        let long = self.source[body_start..].starts_with("--");
        let found = if long {
            body_start += 2;
            let rest = &self.source[body_start..];
            [("--}}", 4), ("--~}}", 5)]
                .into_iter()
                .filter_map(|(terminator, len)| rest.find(terminator).map(|at| (at, len)))
                .min_by_key(|(at, _)| *at)
        } else {
            let rest = &self.source[body_start..];
            rest.find("}}").map(|at| {
                if rest[..at].ends_with('~') {
                    (at - 1, 3)
                } else {
                    (at, 2)
                }
            })
        };

        let Some((offset, terminator_len)) = found else {
            return Err(ParseError::new(
                ParseErrorKind::UnclosedComment,
                Span::from_usize(start, self.source.len()),
            ));
        };

        self.pos = body_start + offset + terminator_len;
        Ok(MustacheCommentStatement {
            value: self.source[body_start..body_start + offset].to_string(),
            span: self.span_from(start),
        })
    }

    // === Mustaches ===

    fn parse_mustache(&mut self) -> Result<MustacheStatement, ParseError> {
        let start = self.pos;
        let trusting = self.rest().starts_with("{{{");
        let mut lexer = Lexer::at(self.source, start + if trusting { 3 } else { 2 });

        lexer.eat(TokenKind::Tilde);
        let call = self.parse_call(&mut lexer)?;
        if let Some(param) = call.block_params.first() {
            return Err(ParseError::syntax(
                "Block params are only allowed on block statements",
                param.span,
            ));
        }
        lexer.eat(TokenKind::Tilde);
        self.pos = expect_close(&mut lexer, trusting)?;

        Ok(MustacheStatement {
            path: call.path,
            params: call.params,
            hash: call.hash,
            trusting,
            span: self.span_from(start),
        })
    }

    fn parse_block(&mut self) -> Result<BlockStatement, ParseError> {
        let start = self.pos;
        let mut lexer = Lexer::at(self.source, start + 2);

        lexer.eat(TokenKind::Tilde);
        expect(&mut lexer, TokenKind::Hash)?;
        let call = self.parse_call(&mut lexer)?;
        lexer.eat(TokenKind::Tilde);
        self.pos = expect_close(&mut lexer, false)?;

        let name = match &call.path {
            Expression::Path(path) => path.original.clone(),
            other => {
                return Err(ParseError::syntax(
                    "A block must be invoked through a path",
                    other.span(),
                ))
            }
        };

        self.parse_block_arms(start, call, &name, false)
    }

    /// Parses the default block, the optional inverse and (unless this block
    /// is part of an `{{else ...}}` chain) the closing `{{/name}}`.
    fn parse_block_arms(
        &mut self,
        start: usize,
        call: CallParts,
        name: &str,
        chained: bool,
    ) -> Result<BlockStatement, ParseError> {
        let open_end = self.pos;
        let unclosed = || {
            ParseError::new(
                ParseErrorKind::UnclosedBlock {
                    name: name.to_string(),
                },
                Span::from_usize(start, open_end),
            )
        };

        let body = self.parse_children(Context::Block)?;
        let program = Block {
            body,
            block_params: call.block_params,
            chained: false,
            span: Span::from_usize(open_end, self.pos),
        };
        if self.at_end() {
            return Err(unclosed());
        }

        let mut inverse = None;
        if self.classify_curly() == Curly::Else {
            let else_start = self.pos;
            let mut lexer = Lexer::at(self.source, else_start + 2);
            lexer.eat(TokenKind::Tilde);
            lexer.bump(); // `else`

            if matches!(lexer.peek().kind, TokenKind::Close | TokenKind::Tilde) {
                lexer.eat(TokenKind::Tilde);
                self.pos = expect_close(&mut lexer, false)?;
                let inverse_start = self.pos;
                let body = self.parse_children(Context::Block)?;
                if self.at_end() {
                    return Err(unclosed());
                }
                if self.classify_curly() == Curly::Else {
                    return Err(ParseError::syntax(
                        format!("{{{{#{name}}}}} cannot have more than one {{{{else}}}} block"),
                        self.curly_span(),
                    ));
                }
                inverse = Some(Block {
                    body,
                    block_params: Vec::new(),
                    chained: false,
                    span: Span::from_usize(inverse_start, self.pos),
                });
            } else {
                let chained_call = self.parse_call(&mut lexer)?;
                lexer.eat(TokenKind::Tilde);
                self.pos = expect_close(&mut lexer, false)?;
                let nested = self.parse_block_arms(else_start, chained_call, name, true)?;
                inverse = Some(Block {
                    body: vec![Statement::Block(nested)],
                    block_params: Vec::new(),
                    chained: true,
                    span: Span::from_usize(else_start, self.pos),
                });
            }
        }

        if chained {
            return Ok(BlockStatement {
                path: call.path,
                params: call.params,
                hash: call.hash,
                program,
                inverse,
                close_span: None,
                span: self.span_from(start),
            });
        }

        let (close_name, close_span) = self.parse_block_close()?;
        if close_name != name {
            return Err(ParseError::new(
                ParseErrorKind::MismatchedBlockClose {
                    expected: name.to_string(),
                    found: close_name,
                },
                close_span,
            ));
        }

        Ok(BlockStatement {
            path: call.path,
            params: call.params,
            hash: call.hash,
            program,
            inverse,
            close_span: Some(close_span),
            span: self.span_from(start),
        })
    }

    fn parse_block_close(&mut self) -> Result<(String, Span), ParseError> {
        let mut lexer = Lexer::at(self.source, self.pos + 2);
        lexer.eat(TokenKind::Tilde);
        expect(&mut lexer, TokenKind::Slash)?;
        let path = match self.parse_expression(&mut lexer)? {
            Expression::Path(path) => path,
            other => {
                return Err(ParseError::syntax(
                    "A closing block must name a path",
                    other.span(),
                ))
            }
        };
        lexer.eat(TokenKind::Tilde);
        self.pos = expect_close(&mut lexer, false)?;
        Ok((path.original, path.span))
    }

    /// Parses `path params... key=value... [as |x y|]`.
    fn parse_call(&self, lexer: &mut Lexer<'src>) -> Result<CallParts, ParseError> {
        let path = self.parse_expression(lexer)?;
        let mut params = Vec::new();
        let mut pairs: Vec<HashPair> = Vec::new();
        let mut block_params = Vec::new();

        loop {
            let token = lexer.peek();
            match token.kind {
                TokenKind::Close
                | TokenKind::CloseTriple
                | TokenKind::Tilde
                | TokenKind::RParen
                | TokenKind::Eof => break,
                TokenKind::Ident if lexer.peek_nth(1).kind == TokenKind::Eq => {
                    pairs.push(self.parse_hash_pair(lexer)?);
                }
                TokenKind::Ident
                    if lexer.text(&token) == "as" && lexer.peek_nth(1).kind == TokenKind::Pipe =>
                {
                    block_params = parse_block_params(lexer)?;
                    break;
                }
                _ => {
                    if let Some(pair) = pairs.last() {
                        return Err(ParseError::syntax(
                            "Positional arguments must come before named arguments",
                            Span::new(pair.span.end, token.span.end),
                        ));
                    }
                    params.push(self.parse_expression(lexer)?);
                }
            }
        }

        let hash_span = match (pairs.first(), pairs.last()) {
            (Some(first), Some(last)) => first.span.cover(last.span),
            _ => Span::empty(params.last().map_or(path.span(), Expression::span).end),
        };
        let hash = Hash {
            pairs,
            span: hash_span,
        };

        Ok(CallParts {
            path,
            params,
            hash,
            block_params,
        })
    }

    fn parse_hash_pair(&self, lexer: &mut Lexer<'src>) -> Result<HashPair, ParseError> {
        let key = lexer.bump();
        lexer.bump(); // `=`
        let value = self.parse_expression(lexer)?;
        Ok(HashPair {
            key: SmolStr::new(lexer.text(&key)),
            key_span: key.span,
            span: key.span.cover(value.span()),
            value,
        })
    }

    fn parse_expression(&self, lexer: &mut Lexer<'src>) -> Result<Expression, ParseError> {
        let token = lexer.peek();
        match token.kind {
            TokenKind::LParen => {
                lexer.bump();
                let call = self.parse_call(lexer)?;
                if let Some(param) = call.block_params.first() {
                    return Err(ParseError::syntax(
                        "Block params are only allowed on block statements",
                        param.span,
                    ));
                }
                let close = expect(lexer, TokenKind::RParen)?;
                Ok(Expression::SubExpression(SubExpression {
                    path: Box::new(call.path),
                    params: call.params,
                    hash: call.hash,
                    span: token.span.cover(close.span),
                }))
            }
            TokenKind::String => {
                lexer.bump();
                let text = lexer.text(&token);
                let quote = &text[..1];
                let value = text[1..text.len() - 1].replace(&format!("\\{quote}"), quote);
                Ok(literal(LiteralValue::String(value), token.span))
            }
            TokenKind::Number => {
                lexer.bump();
                let value = lexer.text(&token).parse::<f64>().map_err(|_| {
                    ParseError::syntax(
                        format!("Invalid number `{}`", lexer.text(&token)),
                        token.span,
                    )
                })?;
                Ok(literal(LiteralValue::Number(value), token.span))
            }
            TokenKind::At => {
                lexer.bump();
                let name = lexer.peek();
                if name.kind != TokenKind::Ident || name.span.start != token.span.end {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidPath {
                            message: "expected an argument name after `@`".to_string(),
                        },
                        token.span.cover(name.span),
                    ));
                }
                lexer.bump();
                let head = PathHead::Arg(PathSegment {
                    name: SmolStr::new(lexer.text(&name)),
                    span: name.span,
                });
                self.parse_path_tail(lexer, head, token.span)
            }
            TokenKind::Ident => {
                lexer.bump();
                let text = lexer.text(&token);
                let followed_by_dot = {
                    let next = lexer.peek();
                    next.kind == TokenKind::Dot && next.span.start == token.span.end
                };
                if !followed_by_dot {
                    let value = match text {
                        "true" => Some(LiteralValue::Boolean(true)),
                        "false" => Some(LiteralValue::Boolean(false)),
                        "null" => Some(LiteralValue::Null),
                        "undefined" => Some(LiteralValue::Undefined),
                        _ => None,
                    };
                    if let Some(value) = value {
                        return Ok(literal(value, token.span));
                    }
                }
                let head = if text == "this" {
                    PathHead::This(token.span)
                } else {
                    PathHead::Var(PathSegment {
                        name: SmolStr::new(text),
                        span: token.span,
                    })
                };
                self.parse_path_tail(lexer, head, token.span)
            }
            TokenKind::Eof => Err(ParseError::new(
                ParseErrorKind::UnexpectedEof {
                    expected: "an expression".to_string(),
                },
                token.span,
            )),
            kind => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: "an expression".to_string(),
                    found: kind.describe().to_string(),
                },
                token.span,
            )),
        }
    }

    fn parse_path_tail(
        &self,
        lexer: &mut Lexer<'src>,
        head: PathHead,
        start: Span,
    ) -> Result<Expression, ParseError> {
        let mut tail = Vec::new();
        let mut end = head.span().end;

        loop {
            let dot = lexer.peek();
            if dot.kind != TokenKind::Dot || dot.span.start != end {
                break;
            }
            lexer.bump();
            let segment = lexer.peek();
            let is_name = matches!(segment.kind, TokenKind::Ident | TokenKind::Number);
            if !is_name || segment.span.start != dot.span.end {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidPath {
                        message: "expected a name after `.`".to_string(),
                    },
                    dot.span,
                ));
            }
            lexer.bump();
            tail.push(PathSegment {
                name: SmolStr::new(lexer.text(&segment)),
                span: segment.span,
            });
            end = segment.span.end;
        }

        let span = Span::new(start.start, end);
        Ok(Expression::Path(PathExpression {
            head,
            tail,
            original: self.source[span.start_usize()..span.end_usize()].to_string(),
            span,
        }))
    }

    // === Elements ===

    fn parse_element(&mut self) -> Result<ElementNode, ParseError> {
        let start = self.pos;
        self.pos += 1; // `<`

        let tag_start = self.pos;
        let tag = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        let tag_span = self.span_from(tag_start);
        let tag = SmolStr::new(tag);

        let mut attributes = Vec::new();
        let mut modifiers = Vec::new();
        let mut comments = Vec::new();
        let mut block_params = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let rest = self.rest();

            if rest.is_empty() {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedElement {
                        tag: tag.to_string(),
                    },
                    Span::from_usize(start, tag_span.end_usize()),
                ));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with("{{") {
                match self.classify_curly() {
                    Curly::Comment => comments.push(self.parse_mustache_comment()?),
                    Curly::Mustache => {
                        let mustache = self.parse_mustache()?;
                        modifiers.push(ElementModifierStatement {
                            path: mustache.path,
                            params: mustache.params,
                            hash: mustache.hash,
                            span: mustache.span,
                        });
                    }
                    _ => {
                        return Err(ParseError::syntax(
                            "Blocks are not allowed inside an element's opening tag",
                            self.curly_span(),
                        ))
                    }
                }
                continue;
            }
            if starts_block_params(rest) {
                block_params = self.parse_element_block_params()?;
                continue;
            }
            attributes.push(self.parse_attribute()?);
        }

        let open_end = self.pos;
        let mut children = Vec::new();
        let mut close_tag_span = None;

        if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            children = self.parse_children(Context::Element)?;
            if self.at_end() {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedElement {
                        tag: tag.to_string(),
                    },
                    Span::from_usize(start, open_end),
                ));
            }

            self.pos += 2; // `</`
            let close_start = self.pos;
            let close_name = self.take_while(|c| !c.is_whitespace() && c != '>');
            let close_span = self.span_from(close_start);
            self.skip_whitespace();
            if !self.rest().starts_with('>') {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedToken {
                        expected: "`>`".to_string(),
                        found: describe_char(self.rest()),
                    },
                    Span::from_usize(self.pos, self.pos),
                ));
            }
            self.pos += 1;

            if close_name != tag.as_str() {
                return Err(ParseError::new(
                    ParseErrorKind::MismatchedClosingTag {
                        expected: tag.to_string(),
                        found: close_name.to_string(),
                    },
                    close_span,
                ));
            }
            close_tag_span = Some(close_span);
        }

        Ok(ElementNode {
            tag,
            tag_span,
            attributes,
            modifiers,
            comments,
            block_params,
            children,
            self_closing,
            close_tag_span,
            span: self.span_from(start),
        })
    }

    fn parse_element_block_params(&mut self) -> Result<Vec<BlockParam>, ParseError> {
        let start = self.pos;
        self.pos += 2; // `as`
        self.skip_whitespace();
        self.pos += 1; // `|`

        let mut params = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Err(ParseError::syntax(
                    "Unclosed block params",
                    self.span_from(start),
                ));
            }
            if self.rest().starts_with('|') {
                self.pos += 1;
                break;
            }
            let name_start = self.pos;
            let name = self.take_while(|c| !c.is_whitespace() && c != '|' && c != '>');
            if name.is_empty() {
                return Err(ParseError::syntax(
                    "Expected a block param name or `|`",
                    Span::from_usize(self.pos, self.pos + 1),
                ));
            }
            params.push(BlockParam {
                name: SmolStr::new(name),
                span: self.span_from(name_start),
            });
        }

        if params.is_empty() {
            return Err(ParseError::syntax(
                "Block params must declare at least one name",
                self.span_from(start),
            ));
        }
        Ok(params)
    }

    fn parse_attribute(&mut self) -> Result<AttrNode, ParseError> {
        let start = self.pos;
        let name = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '{'));
        if name.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::InvalidAttribute {
                    message: format!("expected an attribute name, found {}", describe_char(self.rest())),
                },
                Span::from_usize(start, start + 1),
            ));
        }
        let name_span = self.span_from(start);
        let name = SmolStr::new(name);

        let after_name = self.pos;
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            self.pos = after_name;
            return Ok(AttrNode {
                name,
                name_span,
                value: AttrValue::Text(TextNode {
                    chars: String::new(),
                    span: Span::empty(name_span.end),
                }),
                span: name_span,
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let rest = self.rest();
        let value = if rest.starts_with('"') || rest.starts_with('\'') {
            self.parse_quoted_value()?
        } else if rest.starts_with("{{") {
            if self.classify_curly() != Curly::Mustache {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidAttribute {
                        message: "attribute values must be a single mustache".to_string(),
                    },
                    self.curly_span(),
                ));
            }
            AttrValue::Mustache(self.parse_mustache()?)
        } else {
            let value_start = self.pos;
            let chars = self.take_while(|c| !c.is_whitespace() && c != '>');
            let chars = chars.strip_suffix('/').filter(|_| self.rest().starts_with('>')).unwrap_or(chars);
            self.pos = value_start + chars.len();
            if chars.is_empty() {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidAttribute {
                        message: format!("expected a value for `{name}`"),
                    },
                    Span::from_usize(value_start, value_start),
                ));
            }
            AttrValue::Text(TextNode {
                chars: chars.to_string(),
                span: self.span_from(value_start),
            })
        };

        Ok(AttrNode {
            name,
            name_span,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_quoted_value(&mut self) -> Result<AttrValue, ParseError> {
        let start = self.pos;
        let quote = if self.rest().starts_with('"') { '"' } else { '\'' };
        self.pos += 1;

        let mut parts = Vec::new();
        let mut text_start = self.pos;
        let mut has_mustache = false;

        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidAttribute {
                        message: "unterminated attribute value".to_string(),
                    },
                    self.span_from(start),
                ));
            }
            if rest.starts_with(quote) || rest.starts_with("{{") {
                if text_start < self.pos {
                    parts.push(ConcatPart::Text(TextNode {
                        chars: self.source[text_start..self.pos].to_string(),
                        span: self.span_from(text_start),
                    }));
                }
                if rest.starts_with(quote) {
                    self.pos += 1;
                    break;
                }
                if self.classify_curly() != Curly::Mustache {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidAttribute {
                            message: "only mustaches may appear inside attribute values"
                                .to_string(),
                        },
                        self.curly_span(),
                    ));
                }
                parts.push(ConcatPart::Mustache(self.parse_mustache()?));
                has_mustache = true;
                text_start = self.pos;
                continue;
            }
            self.pos += rest.chars().next().map_or(1, char::len_utf8);
        }

        let span = self.span_from(start);
        if has_mustache {
            Ok(AttrValue::Concat(ConcatStatement { parts, span }))
        } else {
            Ok(AttrValue::Text(TextNode {
                chars: self.source[start + 1..self.pos - 1].to_string(),
                span,
            }))
        }
    }
}

fn literal(value: LiteralValue, span: Span) -> Expression {
    Expression::Literal(Literal { value, span })
}

fn expect(lexer: &mut Lexer<'_>, kind: TokenKind) -> Result<Token, ParseError> {
    let token = lexer.peek();
    if token.kind == kind {
        return Ok(lexer.bump());
    }
    Err(unexpected(token, kind.describe()))
}

/// Consumes the closing `}}` (or `}}}`) and returns the offset just past it.
fn expect_close(lexer: &mut Lexer<'_>, trusting: bool) -> Result<usize, ParseError> {
    let token = lexer.peek();
    match (token.kind, trusting) {
        (TokenKind::Close, false) | (TokenKind::CloseTriple, true) => {
            lexer.bump();
            Ok(token.span.end_usize())
        }
        // `{{foo}}}`: the third brace is text after the mustache.
        (TokenKind::CloseTriple, false) => {
            lexer.bump();
            Ok(token.span.start_usize() + 2)
        }
        _ => Err(unexpected(
            token,
            if trusting {
                TokenKind::CloseTriple.describe()
            } else {
                TokenKind::Close.describe()
            },
        )),
    }
}

fn unexpected(token: Token, expected: &str) -> ParseError {
    if token.kind == TokenKind::Eof {
        ParseError::new(
            ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            },
            token.span,
        )
    } else {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.describe().to_string(),
            },
            token.span,
        )
    }
}

fn parse_block_params(lexer: &mut Lexer<'_>) -> Result<Vec<BlockParam>, ParseError> {
    let as_token = lexer.bump();
    lexer.bump(); // `|`
    let mut params = Vec::new();
    loop {
        let token = lexer.peek();
        match token.kind {
            TokenKind::Ident => {
                lexer.bump();
                params.push(BlockParam {
                    name: SmolStr::new(lexer.text(&token)),
                    span: token.span,
                });
            }
            TokenKind::Pipe => {
                lexer.bump();
                break;
            }
            _ => return Err(unexpected(token, "a block param name or `|`")),
        }
    }
    if params.is_empty() {
        return Err(ParseError::syntax(
            "Block params must declare at least one name",
            as_token.span,
        ));
    }
    Ok(params)
}

fn describe_char(rest: &str) -> String {
    match rest.chars().next() {
        Some(c) => format!("`{c}`"),
        None => "end of template".to_string(),
    }
}

fn is_tag_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || matches!(byte, b'@' | b':' | b'_')
}

fn starts_element(rest: &[u8]) -> bool {
    rest.len() > 1 && rest[0] == b'<' && is_tag_start(rest[1])
}

fn starts_markup(rest: &[u8]) -> bool {
    rest.starts_with(b"</") || rest.starts_with(b"<!--") || starts_element(rest)
}

fn starts_block_params(rest: &str) -> bool {
    rest.strip_prefix("as")
        .map(|after| after.trim_start().starts_with('|'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Template {
        Parser::new(source).parse().unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new(source).parse().unwrap_err()
    }

    fn slice(source: &str, span: Span) -> &str {
        span.slice(source).unwrap()
    }

    #[test]
    fn test_text_and_mustache() {
        let source = "Hello, {{@name}}!";
        let template = parse(source);
        assert_eq!(template.body.len(), 3);
        let Statement::Mustache(mustache) = &template.body[1] else {
            panic!("expected mustache");
        };
        assert_eq!(slice(source, mustache.span), "{{@name}}");
        let path = mustache.path.as_path().unwrap();
        let PathHead::Arg(head) = &path.head else {
            panic!("expected arg head");
        };
        assert_eq!(head.name, "name");
        assert_eq!(slice(source, head.span), "name");
        assert_eq!(path.original, "@name");
    }

    #[test]
    fn test_path_segments_are_located() {
        let source = "{{this.foo.bar-baz}}";
        let template = parse(source);
        let Statement::Mustache(mustache) = &template.body[0] else {
            panic!("expected mustache");
        };
        let path = mustache.path.as_path().unwrap();
        assert!(matches!(path.head, PathHead::This(_)));
        let names: Vec<(&str, &str)> = path
            .tail
            .iter()
            .map(|segment| (segment.name.as_str(), slice(source, segment.span)))
            .collect();
        assert_eq!(names, vec![("foo", "foo"), ("bar-baz", "bar-baz")]);
    }

    #[test]
    fn test_params_hash_and_subexpression() {
        let source = r#"{{format (concat "a" 1) true key=null other=@x}}"#;
        let template = parse(source);
        let Statement::Mustache(mustache) = &template.body[0] else {
            panic!("expected mustache");
        };
        assert_eq!(mustache.params.len(), 2);
        let Expression::SubExpression(sexpr) = &mustache.params[0] else {
            panic!("expected sub-expression");
        };
        assert_eq!(slice(source, sexpr.span), r#"(concat "a" 1)"#);
        assert_eq!(
            sexpr.params[0],
            Expression::Literal(Literal {
                value: LiteralValue::String("a".to_string()),
                span: Span::from_usize(17, 20),
            })
        );
        assert!(matches!(
            &mustache.params[1],
            Expression::Literal(Literal {
                value: LiteralValue::Boolean(true),
                ..
            })
        ));
        let keys: Vec<&str> = mustache.hash.pairs.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["key", "other"]);
        assert_eq!(slice(source, mustache.hash.span), "key=null other=@x");
    }

    #[test]
    fn test_block_with_params_and_else() {
        let source = "{{#each this.items key=\"id\" as |item i|}}{{item}}{{else}}none{{/each}}";
        let template = parse(source);
        let Statement::Block(block) = &template.body[0] else {
            panic!("expected block");
        };
        assert_eq!(block.span, Span::from_usize(0, source.len()));
        let names: Vec<&str> = block
            .program
            .block_params
            .iter()
            .map(|param| slice(source, param.span))
            .collect();
        assert_eq!(names, vec!["item", "i"]);
        assert_eq!(slice(source, block.program.span), "{{item}}");
        let inverse = block.inverse.as_ref().unwrap();
        assert!(!inverse.chained);
        assert_eq!(slice(source, inverse.span), "none");
        assert_eq!(slice(source, block.close_span.unwrap()), "each");
    }

    #[test]
    fn test_chained_else_if() {
        let source = "{{#if a}}1{{else if b}}2{{else}}3{{/if}}";
        let template = parse(source);
        let Statement::Block(block) = &template.body[0] else {
            panic!("expected block");
        };
        let inverse = block.inverse.as_ref().unwrap();
        assert!(inverse.chained);
        let Statement::Block(nested) = &inverse.body[0] else {
            panic!("expected nested block");
        };
        assert_eq!(nested.path.as_path().unwrap().original, "if");
        assert_eq!(slice(source, nested.params[0].span()), "b");
        assert_eq!(nested.close_span, None);
        let nested_inverse = nested.inverse.as_ref().unwrap();
        assert_eq!(slice(source, nested_inverse.span), "3");
    }

    #[test]
    fn test_whitespace_control() {
        let template = parse("{{~#if a~}} x {{~else~}} y {{~/if~}}");
        assert!(matches!(template.body[0], Statement::Block(_)));
    }

    #[test]
    fn test_element_attributes_and_modifiers() {
        let source = r#"<div class="a {{this.b}}" id=main role={{@role}} {{on "click" this.go}} ...attributes>hi</div>"#;
        let template = parse(source);
        let Statement::Element(element) = &template.body[0] else {
            panic!("expected element");
        };
        assert_eq!(element.tag, "div");
        assert_eq!(element.attributes.len(), 4);
        assert!(matches!(element.attributes[0].value, AttrValue::Concat(_)));
        assert!(
            matches!(&element.attributes[1].value, AttrValue::Text(text) if text.chars == "main")
        );
        assert!(matches!(element.attributes[2].value, AttrValue::Mustache(_)));
        assert!(element.attributes[3].is_splattributes());
        assert!(element.attributes[3].is_valueless());
        assert_eq!(element.modifiers.len(), 1);
        assert_eq!(slice(source, element.close_tag_span.unwrap()), "div");
    }

    #[test]
    fn test_component_with_block_params_and_named_blocks() {
        let source = "<Foo @x={{1}} as |a b|><:header>{{a}}</:header></Foo>";
        let template = parse(source);
        let Statement::Element(element) = &template.body[0] else {
            panic!("expected element");
        };
        assert!(element.attributes[0].is_argument());
        assert_eq!(element.block_params.len(), 2);
        let Statement::Element(named) = &element.children[0] else {
            panic!("expected named block");
        };
        assert!(named.is_named_block());
        assert_eq!(slice(source, named.tag_span), ":header");
    }

    #[test]
    fn test_void_and_self_closing() {
        let template = parse("<input disabled><br/><Foo />");
        assert_eq!(template.body.len(), 3);
        let Statement::Element(input) = &template.body[0] else {
            panic!("expected element");
        };
        assert!(input.attributes[0].is_valueless());
        assert!(input.close_tag_span.is_none());
        let Statement::Element(component) = &template.body[2] else {
            panic!("expected element");
        };
        assert!(component.self_closing);
    }

    #[test]
    fn test_comments() {
        let source = "{{! @glint-ignore }}<!-- html -->{{!-- long }} --}}<p {{! inline }}></p>";
        let template = parse(source);
        let Statement::MustacheComment(first) = &template.body[0] else {
            panic!("expected comment");
        };
        assert_eq!(first.value, " @glint-ignore ");
        assert!(matches!(&template.body[1], Statement::Comment(c) if c.value == " html "));
        assert!(
            matches!(&template.body[2], Statement::MustacheComment(c) if c.value == " long }} ")
        );
        let Statement::Element(element) = &template.body[3] else {
            panic!("expected element");
        };
        assert_eq!(element.comments.len(), 1);
    }

    #[test]
    fn test_triple_curlies() {
        let template = parse("{{{this.html}}}{{a}}}");
        let Statement::Mustache(mustache) = &template.body[0] else {
            panic!("expected mustache");
        };
        assert!(mustache.trusting);
        assert!(matches!(&template.body[2], Statement::Text(t) if t.chars == "}"));
    }

    #[test]
    fn test_errors() {
        let err = parse_err("<div>");
        assert!(matches!(err.kind, ParseErrorKind::UnclosedElement { .. }));

        let err = parse_err("<div></span>");
        assert_eq!(
            err.to_string(),
            "Closing tag </span> did not match last open tag <div>"
        );
        assert_eq!(err.span, Span::from_usize(7, 11));

        let err = parse_err("{{#if a}}x{{/each}}");
        assert!(matches!(err.kind, ParseErrorKind::MismatchedBlockClose { .. }));

        let err = parse_err("{{#if a}}x");
        assert_eq!(err.to_string(), "Unclosed block {{#if}}");

        let err = parse_err("{{foo bar=1 baz}}");
        assert_eq!(
            err.to_string(),
            "Positional arguments must come before named arguments"
        );

        let err = parse_err("{{foo");
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedEof { .. }));

        let err = parse_err("{{else}}");
        assert_eq!(err.span, Span::from_usize(0, 8));
    }
}
