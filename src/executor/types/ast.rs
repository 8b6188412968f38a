//! Abstract Syntax Tree node types
//!
//! Nodes are produced by an external lexer/parser and consumed by the
//! evaluator. They are immutable after construction, except for the memo
//! cells carried by literal, array, dict and read nodes.

use super::values::Value;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::VecDeque;
use std::rc::Rc;

/* ===================== Memoization ===================== */

/// Cache for the first evaluated value of a node
///
/// Clones of a node share the same cell, so a function body registered in the
/// environment and the node in the program tree see one cache.
#[derive(Debug, Clone, Default)]
pub struct Memo(Rc<OnceCell<Value>>);

impl Memo {
    pub fn get(&self) -> Option<Value> {
        self.0.get().cloned()
    }

    /// Store `value` unless a value is already cached; returns the cached value
    pub fn store(&self, value: Value) -> Value {
        self.0.get_or_init(|| value).clone()
    }

    pub fn is_filled(&self) -> bool {
        self.0.get().is_some()
    }
}

/* ===================== Operators and Literals ===================== */

/// Binary operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOpKind {
    Sum,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
}

impl BinaryOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOpKind::Sum => "+",
            BinaryOpKind::Sub => "-",
            BinaryOpKind::Mul => "*",
            BinaryOpKind::Div => "/",
            BinaryOpKind::Equal => "==",
            BinaryOpKind::NotEqual => "!=",
            BinaryOpKind::GreaterThan => ">",
            BinaryOpKind::LessThan => "<",
            BinaryOpKind::GreaterEqual => ">=",
            BinaryOpKind::LessEqual => "<=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            BinaryOpKind::Sum | BinaryOpKind::Sub | BinaryOpKind::Mul | BinaryOpKind::Div
        )
    }
}

/// Literal payload, kept as the token text the parser saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum LiteralKind {
    /// Integer token text, e.g. `"42"`
    Number(String),
    /// String token text including its quote characters, e.g. `"'hi'"`
    String(String),
    Boolean(bool),
}

/* ===================== Program / Block ===================== */

/// Ordered statement sequence, used for the program root and nested blocks
///
/// A bottom-up parser builds it by prepending statements as reductions
/// complete; iteration always yields the original top-to-bottom order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    statements: VecDeque<Node>,
}

impl Program {
    pub fn new(statement: Node) -> Self {
        Self {
            statements: VecDeque::from([statement]),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a statement in front of the ones already collected
    pub fn add_statement(&mut self, statement: Node) {
        self.statements.push_front(statement);
    }

    /// Append a statement at the end
    pub fn push(&mut self, statement: Node) {
        self.statements.push_back(statement);
    }

    pub fn statements(&self) -> impl Iterator<Item = &Node> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl FromIterator<Node> for Program {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

/* ===================== Nodes ===================== */

/// AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Node {
    Literal {
        kind: LiteralKind,
        #[serde(skip)]
        memo: Memo,
    },
    BinaryOp {
        op: BinaryOpKind,
        left: Box<Node>,
        right: Box<Node>,
    },
    Variable {
        name: String,
    },
    Assignment {
        target: Box<Node>,
        value: Box<Node>,
    },
    #[serde(alias = "Block")]
    Program(Program),
    If {
        condition: Box<Node>,
        body: Box<Node>,
        #[serde(default)]
        elif_condition: Option<Box<Node>>,
        #[serde(default)]
        elif_body: Option<Box<Node>>,
        #[serde(default)]
        else_body: Option<Box<Node>>,
    },
    /// Call site of a function by name
    FunctionRef {
        name: String,
        #[serde(default)]
        args: Option<Vec<Node>>,
    },
    FunctionDef {
        name: String,
        params: Vec<Node>,
        body: Rc<Node>,
    },
    Array {
        elements: Vec<Node>,
        #[serde(skip)]
        memo: Memo,
    },
    Dict {
        entries: Vec<(Node, Node)>,
        #[serde(skip)]
        memo: Memo,
    },
    Index {
        base: Box<Node>,
        index: Box<Node>,
    },
    Import {
        symbol_path: String,
        #[serde(default)]
        relative_base: Option<String>,
        #[serde(default)]
        alias: Option<String>,
    },
    ForeignCall {
        module: String,
        function_name: String,
        #[serde(default)]
        positional_args: Vec<Node>,
        #[serde(default)]
        keyword_args: Vec<(String, Node)>,
        #[serde(default)]
        is_awaited: bool,
    },
    GetAttr {
        base: String,
        attribute_name: String,
    },
    Decorated {
        decorator_owner: String,
        decorator_name: String,
        target: Box<Node>,
        #[serde(default)]
        has_parens: bool,
        #[serde(default)]
        positional_args: Vec<Node>,
        #[serde(default)]
        keyword_args: Vec<(String, Node)>,
    },
    Sleep {
        duration_seconds: Box<Node>,
    },
    OpenFile {
        path: Box<Node>,
    },
    ReadFile {
        source: Box<Node>,
        #[serde(skip)]
        memo: Memo,
    },
    Return {
        value: Box<Node>,
    },
    Print {
        value: Box<Node>,
    },
}

impl Node {
    /// Node kind name used in diagnostics and logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Literal { .. } => "Literal",
            Node::BinaryOp { .. } => "BinaryOp",
            Node::Variable { .. } => "Variable",
            Node::Assignment { .. } => "Assignment",
            Node::Program(_) => "Program",
            Node::If { .. } => "If",
            Node::FunctionRef { .. } => "FunctionRef",
            Node::FunctionDef { .. } => "FunctionDef",
            Node::Array { .. } => "Array",
            Node::Dict { .. } => "Dict",
            Node::Index { .. } => "Index",
            Node::Import { .. } => "Import",
            Node::ForeignCall { .. } => "ForeignCall",
            Node::GetAttr { .. } => "GetAttr",
            Node::Decorated { .. } => "Decorated",
            Node::Sleep { .. } => "Sleep",
            Node::OpenFile { .. } => "OpenFile",
            Node::ReadFile { .. } => "ReadFile",
            Node::Return { .. } => "Return",
            Node::Print { .. } => "Print",
        }
    }

    /* ---------- constructors for parser hosts and tests ---------- */

    pub fn number(value: i64) -> Node {
        Node::number_text(value.to_string())
    }

    pub fn number_text(text: impl Into<String>) -> Node {
        Node::Literal {
            kind: LiteralKind::Number(text.into()),
            memo: Memo::default(),
        }
    }

    /// String literal from raw token text, quotes included
    pub fn string(raw: impl Into<String>) -> Node {
        Node::Literal {
            kind: LiteralKind::String(raw.into()),
            memo: Memo::default(),
        }
    }

    pub fn boolean(value: bool) -> Node {
        Node::Literal {
            kind: LiteralKind::Boolean(value),
            memo: Memo::default(),
        }
    }

    pub fn var(name: impl Into<String>) -> Node {
        Node::Variable { name: name.into() }
    }

    pub fn binary(op: BinaryOpKind, left: Node, right: Node) -> Node {
        Node::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(name: impl Into<String>, value: Node) -> Node {
        Node::Assignment {
            target: Box::new(Node::var(name)),
            value: Box::new(value),
        }
    }

    pub fn block(statements: impl IntoIterator<Item = Node>) -> Node {
        Node::Program(statements.into_iter().collect())
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Node {
        Node::FunctionRef {
            name: name.into(),
            args: if args.is_empty() { None } else { Some(args) },
        }
    }

    pub fn def(name: impl Into<String>, params: &[&str], body: Node) -> Node {
        Node::FunctionDef {
            name: name.into(),
            params: params.iter().map(|p| Node::var(*p)).collect(),
            body: Rc::new(body),
        }
    }

    pub fn array(elements: Vec<Node>) -> Node {
        Node::Array {
            elements,
            memo: Memo::default(),
        }
    }

    pub fn dict(entries: Vec<(Node, Node)>) -> Node {
        Node::Dict {
            entries,
            memo: Memo::default(),
        }
    }

    pub fn index(base: Node, index: Node) -> Node {
        Node::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn import(symbol_path: impl Into<String>) -> Node {
        Node::Import {
            symbol_path: symbol_path.into(),
            relative_base: None,
            alias: None,
        }
    }

    pub fn foreign_call(
        module: impl Into<String>,
        function_name: impl Into<String>,
        positional_args: Vec<Node>,
    ) -> Node {
        Node::ForeignCall {
            module: module.into(),
            function_name: function_name.into(),
            positional_args,
            keyword_args: Vec::new(),
            is_awaited: false,
        }
    }

    pub fn awaited(
        module: impl Into<String>,
        function_name: impl Into<String>,
        positional_args: Vec<Node>,
    ) -> Node {
        Node::ForeignCall {
            module: module.into(),
            function_name: function_name.into(),
            positional_args,
            keyword_args: Vec::new(),
            is_awaited: true,
        }
    }

    pub fn get_attr(base: impl Into<String>, attribute_name: impl Into<String>) -> Node {
        Node::GetAttr {
            base: base.into(),
            attribute_name: attribute_name.into(),
        }
    }

    pub fn print(value: Node) -> Node {
        Node::Print {
            value: Box::new(value),
        }
    }

    pub fn ret(value: Node) -> Node {
        Node::Return {
            value: Box::new(value),
        }
    }
}
