//! Syntax tree for Lua 5.4 sources.
//!
//! The node set and field names follow the luaparse conventions (`Chunk` with `body`,
//! `comments` and `globals`; statement and expression nodes tagged with `type`), so a tree
//! serialized with serde reads like the JSON luaparse emits.

use indexmap::IndexSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Chunk {
    pub body: Vec<Statement>,
    pub comments: Vec<Comment>,
    /// Free names referenced anywhere in the chunk, in first-reference order.
    pub globals: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub value: String,
    pub raw: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub name: String,
    pub is_local: bool,
}

impl Identifier {
    pub fn new(name: impl Into<String>, is_local: bool) -> Self {
        Self {
            name: name.into(),
            is_local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Statement {
    #[serde(rename = "LabelStatement")]
    Label(LabelStatement),
    #[serde(rename = "BreakStatement")]
    Break,
    #[serde(rename = "GotoStatement")]
    Goto(GotoStatement),
    #[serde(rename = "ReturnStatement")]
    Return(ReturnStatement),
    #[serde(rename = "IfStatement")]
    If(IfStatement),
    #[serde(rename = "WhileStatement")]
    While(WhileStatement),
    #[serde(rename = "DoStatement")]
    Do(DoStatement),
    #[serde(rename = "RepeatStatement")]
    Repeat(RepeatStatement),
    #[serde(rename = "LocalStatement")]
    Local(LocalStatement),
    #[serde(rename = "AssignmentStatement")]
    Assignment(AssignmentStatement),
    #[serde(rename = "CallStatement")]
    Call(CallStatement),
    #[serde(rename = "FunctionDeclaration")]
    Function(Box<Function>),
    #[serde(rename = "ForNumericStatement")]
    ForNumeric(Box<ForNumericStatement>),
    #[serde(rename = "ForGenericStatement")]
    ForGeneric(ForGenericStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStatement {
    pub label: Identifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GotoStatement {
    pub label: Identifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStatement {
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfStatement {
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Clause {
    #[serde(rename = "IfClause")]
    If(ConditionalClause),
    #[serde(rename = "ElseifClause")]
    Elseif(ConditionalClause),
    #[serde(rename = "ElseClause")]
    Else(ElseClause),
}

impl Clause {
    pub fn body(&self) -> &[Statement] {
        match self {
            Self::If(clause) | Self::Elseif(clause) => &clause.body,
            Self::Else(clause) => &clause.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalClause {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElseClause {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoStatement {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatStatement {
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalStatement {
    pub variables: Vec<Identifier>,
    /// Lua 5.4 `<const>` / `<close>` attributes, parallel to `variables`.
    /// Empty when no variable carries an attribute.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Option<String>>,
    pub init: Vec<Expression>,
}

impl LocalStatement {
    pub fn attribute(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).and_then(Option::as_deref)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStatement {
    pub variables: Vec<Expression>,
    pub init: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallStatement {
    pub expression: Expression,
}

/// Both the statement form (`function a.b:c() end`, `local function f() end`) and the
/// expression form (`function() end`, where `identifier` is `None`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub identifier: Option<Expression>,
    pub is_local: bool,
    /// `Identifier` nodes, optionally followed by one `VarargLiteral`.
    pub parameters: Vec<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForNumericStatement {
    pub variable: Identifier,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForGenericStatement {
    pub variables: Vec<Identifier>,
    pub iterators: Vec<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Expression {
    Identifier(Identifier),
    #[serde(rename = "StringLiteral")]
    String(StringLiteral),
    #[serde(rename = "NumericLiteral")]
    Number(NumericLiteral),
    #[serde(rename = "BooleanLiteral")]
    Boolean(BooleanLiteral),
    #[serde(rename = "NilLiteral")]
    Nil,
    #[serde(rename = "VarargLiteral")]
    Vararg(VarargLiteral),
    #[serde(rename = "FunctionDeclaration")]
    Function(Box<Function>),
    #[serde(rename = "TableConstructorExpression")]
    Table(TableConstructor),
    #[serde(rename = "BinaryExpression")]
    Binary(Box<BinaryExpression>),
    #[serde(rename = "LogicalExpression")]
    Logical(Box<BinaryExpression>),
    #[serde(rename = "UnaryExpression")]
    Unary(Box<UnaryExpression>),
    #[serde(rename = "MemberExpression")]
    Member(Box<MemberExpression>),
    #[serde(rename = "IndexExpression")]
    Index(Box<IndexExpression>),
    #[serde(rename = "CallExpression")]
    Call(Box<CallExpression>),
    #[serde(rename = "TableCallExpression")]
    TableCall(Box<TableCallExpression>),
    #[serde(rename = "StringCallExpression")]
    StringCall(Box<StringCallExpression>),
}

impl Expression {
    /// The luaparse `type` tag of this node.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Identifier(_) => "Identifier",
            Self::String(_) => "StringLiteral",
            Self::Number(_) => "NumericLiteral",
            Self::Boolean(_) => "BooleanLiteral",
            Self::Nil => "NilLiteral",
            Self::Vararg(_) => "VarargLiteral",
            Self::Function(_) => "FunctionDeclaration",
            Self::Table(_) => "TableConstructorExpression",
            Self::Binary(_) => "BinaryExpression",
            Self::Logical(_) => "LogicalExpression",
            Self::Unary(_) => "UnaryExpression",
            Self::Member(_) => "MemberExpression",
            Self::Index(_) => "IndexExpression",
            Self::Call(_) => "CallExpression",
            Self::TableCall(_) => "TableCallExpression",
            Self::StringCall(_) => "StringCallExpression",
        }
    }

    /// Whether the grammar accepts this node unparenthesized as the base of a call,
    /// index or member access.
    pub const fn is_prefix_expression(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_)
                | Self::Member(_)
                | Self::Index(_)
                | Self::Call(_)
                | Self::TableCall(_)
                | Self::StringCall(_)
        )
    }

    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Call(_) | Self::TableCall(_) | Self::StringCall(_))
    }

    /// Whether the source wrapped this node in parentheses. Only tracked for nodes where
    /// the parentheses change meaning (they truncate multiple results to one).
    pub fn in_parens(&self) -> bool {
        match self {
            Self::Call(call) => call.in_parens,
            Self::TableCall(call) => call.in_parens,
            Self::StringCall(call) => call.in_parens,
            Self::Vararg(vararg) => vararg.in_parens,
            _ => false,
        }
    }

    pub fn mark_in_parens(&mut self) {
        match self {
            Self::Call(call) => call.in_parens = true,
            Self::TableCall(call) => call.in_parens = true,
            Self::StringCall(call) => call.in_parens = true,
            Self::Vararg(vararg) => vararg.in_parens = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringLiteral {
    pub value: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericLiteral {
    pub value: f64,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanLiteral {
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarargLiteral {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_parens: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableConstructor {
    pub fields: Vec<TableField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TableField {
    /// `[key] = value`
    #[serde(rename = "TableKey")]
    Key { key: Expression, value: Expression },
    /// `name = value`
    #[serde(rename = "TableKeyString")]
    KeyString { key: Identifier, value: Expression },
    /// positional `value`
    #[serde(rename = "TableValue")]
    Value { value: Expression },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "~=")]
    Ne,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "~")]
    BitXor,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = "..")]
    Concat,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "//")]
    FloorDiv,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "^")]
    Pow,
}

impl BinaryOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Ne => "~=",
            Self::Eq => "==",
            Self::BitOr => "|",
            Self::BitXor => "~",
            Self::BitAnd => "&",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Concat => "..",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "^",
        }
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Self::Or | Self::And)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOperator {
    #[serde(rename = "not")]
    Not,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "#")]
    Length,
    #[serde(rename = "~")]
    BitNot,
}

impl UnaryOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::Minus => "-",
            Self::Length => "#",
            Self::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub argument: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Indexer {
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = ":")]
    Colon,
}

impl Indexer {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Colon => ":",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberExpression {
    pub indexer: Indexer,
    pub identifier: Identifier,
    pub base: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexExpression {
    pub base: Expression,
    pub index: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallExpression {
    pub base: Expression,
    pub arguments: Vec<Expression>,
    pub line: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_parens: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCallExpression {
    pub base: Expression,
    pub arguments: TableConstructor,
    pub line: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_parens: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringCallExpression {
    pub base: Expression,
    pub argument: StringLiteral,
    pub line: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub in_parens: bool,
}
