//! AST types for Glimmer templates.
//!
//! Every node carries a [`Span`] in template coordinates (byte offsets into
//! the string handed to [`crate::parse`]). Names that the emitter maps back to
//! the source (path segments, tag names, block params, attribute names and
//! hash keys) carry their own span as well.

use smol_str::SmolStr;
use source_map::Span;

/// A parsed template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    /// Top-level statements.
    pub body: Vec<Statement>,
    /// The span of the entire template.
    pub span: Span,
}

/// A node that can appear in a template body or element children.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Static text.
    Text(TextNode),
    /// An HTML comment `<!-- ... -->`.
    Comment(CommentStatement),
    /// A mustache comment `{{! ... }}` or `{{!-- ... --}}`.
    MustacheComment(MustacheCommentStatement),
    /// A mustache `{{...}}` or `{{{...}}}`.
    Mustache(MustacheStatement),
    /// A block `{{#x}}...{{/x}}`.
    Block(BlockStatement),
    /// An element or component invocation.
    Element(ElementNode),
}

impl Statement {
    /// Returns the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Statement::Text(node) => node.span,
            Statement::Comment(node) => node.span,
            Statement::MustacheComment(node) => node.span,
            Statement::Mustache(node) => node.span,
            Statement::Block(node) => node.span,
            Statement::Element(node) => node.span,
        }
    }

    /// Returns true for text consisting only of whitespace.
    pub fn is_whitespace_text(&self) -> bool {
        matches!(self, Statement::Text(text) if text.chars.trim().is_empty())
    }
}

/// Static text content.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    /// The raw text.
    pub chars: String,
    pub span: Span,
}

/// An HTML comment.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentStatement {
    /// The text between `<!--` and `-->`.
    pub value: String,
    pub span: Span,
}

/// A mustache comment.
#[derive(Debug, Clone, PartialEq)]
pub struct MustacheCommentStatement {
    /// The text between the comment delimiters.
    pub value: String,
    pub span: Span,
}

/// A mustache statement, `{{path params hash}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MustacheStatement {
    /// The callee, or the value itself when there are no arguments.
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    /// True for `{{{...}}}`.
    pub trusting: bool,
    pub span: Span,
}

/// A block statement, `{{#path params hash as |x|}}...{{/path}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    /// The default block.
    pub program: Block,
    /// The `{{else}}` block. A chained `{{else if}}` produces an inverse
    /// with [`Block::chained`] set and a single nested block statement.
    pub inverse: Option<Block>,
    /// The span of the path in the closing `{{/path}}`, absent for blocks
    /// that are part of an `{{else ...}}` chain.
    pub close_span: Option<Span>,
    pub span: Span,
}

/// The contents of one arm of a block statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub body: Vec<Statement>,
    pub block_params: Vec<BlockParam>,
    /// True when this block was produced by `{{else something}}`.
    pub chained: bool,
    pub span: Span,
}

/// A name introduced by `as |name|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockParam {
    pub name: SmolStr,
    pub span: Span,
}

/// An element, a component invocation, or a named block.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    /// The tag as written, e.g. `div`, `Foo::Bar`, `@component`, `:header`.
    pub tag: SmolStr,
    /// The span of the tag name in the opening tag.
    pub tag_span: Span,
    pub attributes: Vec<AttrNode>,
    pub modifiers: Vec<ElementModifierStatement>,
    /// Mustache comments written inside the opening tag.
    pub comments: Vec<MustacheCommentStatement>,
    pub block_params: Vec<BlockParam>,
    pub children: Vec<Statement>,
    /// True for `<Foo />`.
    pub self_closing: bool,
    /// The span of the tag name in the closing tag.
    pub close_tag_span: Option<Span>,
    pub span: Span,
}

impl ElementNode {
    /// Returns true for named blocks (`<:name>`).
    pub fn is_named_block(&self) -> bool {
        self.tag.starts_with(':')
    }

    /// Items written inside the opening tag, in source order.
    pub fn open_tag_parts(&self) -> Vec<OpenTagPart<'_>> {
        let mut parts: Vec<OpenTagPart<'_>> = self
            .attributes
            .iter()
            .map(OpenTagPart::Attribute)
            .chain(self.modifiers.iter().map(OpenTagPart::Modifier))
            .chain(self.comments.iter().map(OpenTagPart::Comment))
            .collect();
        parts.sort_by_key(|part| part.span().start);
        parts
    }
}

/// A borrowed view over one item of an element's opening tag.
#[derive(Debug, Clone, Copy)]
pub enum OpenTagPart<'a> {
    Attribute(&'a AttrNode),
    Modifier(&'a ElementModifierStatement),
    Comment(&'a MustacheCommentStatement),
}

impl OpenTagPart<'_> {
    pub fn span(&self) -> Span {
        match self {
            OpenTagPart::Attribute(attr) => attr.span,
            OpenTagPart::Modifier(modifier) => modifier.span,
            OpenTagPart::Comment(comment) => comment.span,
        }
    }
}

/// An attribute or component argument.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrNode {
    /// The name as written, including a leading `@` for arguments.
    pub name: SmolStr,
    pub name_span: Span,
    pub value: AttrValue,
    pub span: Span,
}

impl AttrNode {
    /// Returns true for `@name=...` component arguments.
    pub fn is_argument(&self) -> bool {
        self.name.starts_with('@')
    }

    /// Returns true for `...attributes`.
    pub fn is_splattributes(&self) -> bool {
        self.name == "...attributes"
    }

    /// Returns true when the attribute was written without `=`.
    pub fn is_valueless(&self) -> bool {
        matches!(&self.value, AttrValue::Text(text) if text.span.is_empty())
    }
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Static text (quoted, unquoted, or empty for valueless attributes).
    Text(TextNode),
    /// `name={{value}}`.
    Mustache(MustacheStatement),
    /// `name="a {{b}} c"`.
    Concat(ConcatStatement),
}

impl AttrValue {
    pub fn span(&self) -> Span {
        match self {
            AttrValue::Text(text) => text.span,
            AttrValue::Mustache(mustache) => mustache.span,
            AttrValue::Concat(concat) => concat.span,
        }
    }
}

/// An interpolated attribute value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatStatement {
    pub parts: Vec<ConcatPart>,
    pub span: Span,
}

/// One piece of an interpolated attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConcatPart {
    Text(TextNode),
    Mustache(MustacheStatement),
}

/// An element modifier, `<div {{on "click" this.go}}>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementModifierStatement {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub span: Span,
}

/// Named arguments, `key=value ...`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hash {
    pub pairs: Vec<HashPair>,
    pub span: Span,
}

impl Hash {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: SmolStr,
    pub key_span: Span,
    pub value: Expression,
    pub span: Span,
}

/// An expression inside a mustache.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(PathExpression),
    SubExpression(SubExpression),
    Literal(Literal),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Path(path) => path.span,
            Expression::SubExpression(sexpr) => sexpr.span,
            Expression::Literal(literal) => literal.span,
        }
    }

    /// Returns the path if this expression is one.
    pub fn as_path(&self) -> Option<&PathExpression> {
        match self {
            Expression::Path(path) => Some(path),
            _ => None,
        }
    }
}

/// A dotted path such as `this.foo`, `@bar.baz` or `helper`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    pub head: PathHead,
    pub tail: Vec<PathSegment>,
    /// The path exactly as written.
    pub original: String,
    pub span: Span,
}

impl PathExpression {
    /// Returns the head name when the path is a single free variable.
    pub fn as_simple_var(&self) -> Option<&str> {
        match &self.head {
            PathHead::Var(segment) if self.tail.is_empty() => Some(&segment.name),
            _ => None,
        }
    }
}

/// The first segment of a path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathHead {
    /// `this`, located at the keyword.
    This(Span),
    /// `@name`; the segment excludes the `@`.
    Arg(PathSegment),
    /// A free variable.
    Var(PathSegment),
}

impl PathHead {
    pub fn span(&self) -> Span {
        match self {
            PathHead::This(span) => *span,
            PathHead::Arg(segment) | PathHead::Var(segment) => segment.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: SmolStr,
    pub span: Span,
}

/// A parenthesized call, `(helper a b key=c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubExpression {
    pub path: Box<Expression>,
    pub params: Vec<Expression>,
    pub hash: Hash,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

/// Common accessors for nodes shaped like a call: mustaches, blocks,
/// sub-expressions and modifiers.
pub trait CallNode {
    fn callee(&self) -> &Expression;
    fn params(&self) -> &[Expression];
    fn hash(&self) -> &Hash;
    fn span(&self) -> Span;

    /// True when the node passes any arguments.
    fn has_arguments(&self) -> bool {
        !self.params().is_empty() || !self.hash().is_empty()
    }
}

macro_rules! impl_call_node {
    ($($ty:ty => |$node:ident| $callee:expr;)*) => {
        $(
            impl CallNode for $ty {
                fn callee(&self) -> &Expression {
                    let $node = self;
                    $callee
                }
                fn params(&self) -> &[Expression] {
                    &self.params
                }
                fn hash(&self) -> &Hash {
                    &self.hash
                }
                fn span(&self) -> Span {
                    self.span
                }
            }
        )*
    };
}

impl_call_node! {
    MustacheStatement => |node| &node.path;
    BlockStatement => |node| &node.path;
    ElementModifierStatement => |node| &node.path;
    SubExpression => |node| &*node.path;
}
