//! Abstract Syntax Tree types for the constraint-set format

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Valid identifier (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root AST node - a file of constraint sets
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub sets: Vec<Spanned<SetDecl>>,
}

/// `set main [portrait, large] { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct SetDecl {
    pub name: Spanned<Identifier>,
    pub labels: Vec<Spanned<Identifier>>,
    pub entries: Vec<Spanned<EntryDecl>>,
}

/// Constraints of one node: `title { ... }` or `edge: barrier(end) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDecl {
    pub id: Spanned<Identifier>,
    pub role: Option<Spanned<RoleDecl>>,
    pub properties: Vec<Spanned<Property>>,
}

/// Helper role of an entry, with its optional argument
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDecl {
    pub kind: Spanned<Identifier>,
    pub arg: Option<Spanned<Identifier>>,
}

/// `key: value`, where the key may be dotted (`custom.color`)
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: Spanned<String>,
    pub value: Spanned<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    /// A bare word such as `match_constraint` or `packed`
    Word(String),
    Anchor(AnchorValue),
}

impl Value {
    /// Short description for error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Bool(_) => "a boolean",
            Value::Word(_) => "a word",
            Value::Anchor(_) => "an anchor reference",
        }
    }
}

/// `parent.start + 16 gone 4`
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorValue {
    pub target: Spanned<Identifier>,
    pub anchor: Spanned<Identifier>,
    pub margin: f64,
    pub gone_margin: Option<f64>,
}
