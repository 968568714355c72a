//! Factories for the syntax nodes the bundle generates.

use lua_parser::ast::{
    AssignmentStatement, BinaryExpression, BinaryOperator, BooleanLiteral, CallExpression, Clause,
    ConditionalClause, Expression, Function, Identifier, IfStatement, IndexExpression,
    LocalStatement, NumericLiteral, ReturnStatement, Statement, TableConstructor, TableField,
    VarargLiteral,
};

/// Names starting with this prefix belong to the generated runtime.
pub const RESERVED_PREFIX: &str = "__luapack_";
pub const REQUIRE_FUNCTION: &str = "__luapack_require";
pub const PACKAGES_TABLE: &str = "__luapack_packages";
pub const CACHE_TABLE: &str = "__luapack_cache";

pub fn local_name(name: &str) -> Identifier {
    Identifier::new(name, true)
}

pub fn name(name: &str) -> Expression {
    Expression::Identifier(local_name(name))
}

pub fn boolean(value: bool) -> Expression {
    Expression::Boolean(BooleanLiteral { value })
}

pub fn integer(value: usize) -> Expression {
    Expression::Number(NumericLiteral {
        value: value as f64,
        raw: value.to_string(),
    })
}

pub fn call(base: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call(Box::new(CallExpression {
        base,
        arguments,
        line: 0,
        in_parens: false,
    }))
}

/// `__luapack_require(<id>)`, the replacement for a rewritten require call.
pub fn require_call(id: usize) -> Expression {
    call(name(REQUIRE_FUNCTION), vec![integer(id)])
}

pub fn index(base: Expression, index: Expression) -> Expression {
    Expression::Index(Box::new(IndexExpression { base, index }))
}

pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(Box::new(BinaryExpression {
        operator,
        left,
        right,
    }))
}

/// An anonymous function; `vararg` appends `...` to the parameters.
pub fn function(parameters: &[&str], vararg: bool, body: Vec<Statement>) -> Expression {
    let mut parameters: Vec<Expression> = parameters.iter().map(|&param| name(param)).collect();
    if vararg {
        parameters.push(Expression::Vararg(VarargLiteral::default()));
    }
    Expression::Function(Box::new(Function {
        identifier: None,
        is_local: false,
        parameters,
        body,
    }))
}

pub fn table(fields: Vec<TableField>) -> Expression {
    Expression::Table(TableConstructor { fields })
}

pub fn local(names: &[&str], init: Vec<Expression>) -> Statement {
    Statement::Local(LocalStatement {
        variables: names.iter().map(|&name| local_name(name)).collect(),
        attributes: Vec::new(),
        init,
    })
}

pub fn assign(target: Expression, value: Expression) -> Statement {
    Statement::Assignment(AssignmentStatement {
        variables: vec![target],
        init: vec![value],
    })
}

pub fn if_then(condition: Expression, body: Vec<Statement>) -> Statement {
    Statement::If(IfStatement {
        clauses: vec![Clause::If(ConditionalClause { condition, body })],
    })
}

pub fn return_values(arguments: Vec<Expression>) -> Statement {
    Statement::Return(ReturnStatement { arguments })
}
