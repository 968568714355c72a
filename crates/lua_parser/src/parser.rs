//! Parses with full_moon and lowers its lossless tree into the luaparse-shaped
//! [`crate::ast`] tree.
//!
//! full_moon owns tokenizing, the grammar and operator precedence. Lowering adds what it
//! leaves open: literal values, a scope stack that tags every `Identifier` reference with
//! `is_local` and records free names in `Chunk::globals`, and the checks Lua makes after
//! parsing (`...` only inside vararg functions, `<const>`/`<close>` attributes only).

use full_moon::ast as lua;
use full_moon::node::Node;
use full_moon::tokenizer::{Token, TokenReference};
use full_moon::visitors::Visitor;
use indexmap::IndexSet;

use crate::ast::{
    AssignmentStatement, BinaryExpression, BinaryOperator, BooleanLiteral, CallExpression,
    CallStatement, Chunk, Clause, Comment, ConditionalClause, DoStatement, ElseClause, Expression,
    ForGenericStatement, ForNumericStatement, Function, GotoStatement, Identifier, IfStatement,
    IndexExpression, Indexer, LabelStatement, LocalStatement, MemberExpression, NumericLiteral,
    RepeatStatement, ReturnStatement, Statement, StringCallExpression, StringLiteral,
    TableCallExpression, TableConstructor, TableField, UnaryExpression, UnaryOperator,
    VarargLiteral, WhileStatement,
};
use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::literal;
use crate::text::SourceEncoding;

/// Parses `source` and lowers it. `encoding` says how literal chars map to bytes.
pub fn parse_chunk(source: &str, encoding: SourceEncoding) -> ParseResult<Chunk> {
    let ast = full_moon::parse(source)?;
    let mut lowerer = Lowerer::new(encoding);
    let body = lowerer.chunk(ast.nodes())?;

    let mut comments = CommentCollector::default();
    comments.visit_ast(&ast);
    Ok(Chunk {
        body,
        comments: comments.comments,
        globals: lowerer.globals,
    })
}

fn token_text(token: &TokenReference) -> String {
    token.token().to_string()
}

fn token_line(token: &TokenReference) -> usize {
    token.token().start_position().line()
}

fn unsupported<N: Node>(node: &N, what: &str) -> ParseError {
    let line = Node::start_position(node).map_or(0, |position| position.line());
    ParseError::new(ParseErrorKind::Unsupported(what.to_owned()), line)
}

fn member(base: Expression, indexer: Indexer, name: String) -> Expression {
    Expression::Member(Box::new(MemberExpression {
        indexer,
        identifier: Identifier::new(name, false),
        base,
    }))
}

fn binary_operator(binop: &lua::BinOp) -> ParseResult<BinaryOperator> {
    let symbol = token_text(binop.token());
    let operator = match symbol.as_str() {
        "or" => BinaryOperator::Or,
        "and" => BinaryOperator::And,
        "<" => BinaryOperator::Lt,
        ">" => BinaryOperator::Gt,
        "<=" => BinaryOperator::Le,
        ">=" => BinaryOperator::Ge,
        "~=" => BinaryOperator::Ne,
        "==" => BinaryOperator::Eq,
        "|" => BinaryOperator::BitOr,
        "~" => BinaryOperator::BitXor,
        "&" => BinaryOperator::BitAnd,
        "<<" => BinaryOperator::Shl,
        ">>" => BinaryOperator::Shr,
        ".." => BinaryOperator::Concat,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Sub,
        "*" => BinaryOperator::Mul,
        "/" => BinaryOperator::Div,
        "//" => BinaryOperator::FloorDiv,
        "%" => BinaryOperator::Mod,
        "^" => BinaryOperator::Pow,
        _ => {
            return Err(ParseError::new(
                ParseErrorKind::Unsupported(format!("operator '{symbol}'")),
                token_line(binop.token()),
            ));
        }
    };
    Ok(operator)
}

fn unary_operator(unop: &lua::UnOp) -> ParseResult<UnaryOperator> {
    let symbol = token_text(unop.token());
    let operator = match symbol.as_str() {
        "not" => UnaryOperator::Not,
        "-" => UnaryOperator::Minus,
        "#" => UnaryOperator::Length,
        "~" => UnaryOperator::BitNot,
        _ => {
            return Err(ParseError::new(
                ParseErrorKind::Unsupported(format!("operator '{symbol}'")),
                token_line(unop.token()),
            ));
        }
    };
    Ok(operator)
}

fn number(token: &TokenReference) -> ParseResult<Expression> {
    let raw = token_text(token);
    let Some(value) = literal::number_value(&raw) else {
        return Err(ParseError::new(
            ParseErrorKind::MalformedNumber(raw),
            token_line(token),
        ));
    };
    Ok(Expression::Number(NumericLiteral { value, raw }))
}

#[derive(Debug)]
struct Lowerer {
    encoding: SourceEncoding,
    scopes: Vec<Vec<String>>,
    /// One entry per enclosing function: whether `...` is available there.
    vararg: Vec<bool>,
    globals: IndexSet<String>,
}

impl Lowerer {
    fn new(encoding: SourceEncoding) -> Self {
        Self {
            encoding,
            scopes: Vec::new(),
            vararg: Vec::new(),
            globals: IndexSet::new(),
        }
    }

    fn chunk(&mut self, block: &lua::Block) -> ParseResult<Vec<Statement>> {
        self.vararg.push(true);
        self.scopes.push(Vec::new());
        let body = self.block(block);
        self.scopes.pop();
        self.vararg.pop();
        body
    }

    // Scope tracking

    fn open_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn close_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) -> Identifier {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_owned());
        }
        Identifier::new(name, true)
    }

    /// Builds a reference to `name`, registering it as a global when no enclosing scope
    /// declares it.
    fn reference(&mut self, name: String) -> Identifier {
        let is_local = self
            .scopes
            .iter()
            .rev()
            .any(|scope| scope.iter().any(|declared| *declared == name));
        if !is_local {
            self.globals.insert(name.clone());
        }
        Identifier { name, is_local }
    }

    // Statements

    fn block(&mut self, block: &lua::Block) -> ParseResult<Vec<Statement>> {
        let mut body = Vec::new();
        for statement in block.stmts() {
            body.push(self.statement(statement)?);
        }
        if let Some(last) = block.last_stmt() {
            body.push(self.last_statement(last)?);
        }
        Ok(body)
    }

    fn scoped_block(&mut self, block: &lua::Block) -> ParseResult<Vec<Statement>> {
        self.open_scope();
        let body = self.block(block);
        self.close_scope();
        body
    }

    fn statement(&mut self, statement: &lua::Stmt) -> ParseResult<Statement> {
        let lowered = match statement {
            lua::Stmt::Assignment(assignment) => {
                let mut variables = Vec::new();
                for variable in assignment.variables().iter() {
                    variables.push(self.var(variable)?);
                }
                let init = self.expressions(assignment.expressions().iter())?;
                Statement::Assignment(AssignmentStatement { variables, init })
            }
            lua::Stmt::Do(block) => Statement::Do(DoStatement {
                body: self.scoped_block(block.block())?,
            }),
            lua::Stmt::FunctionCall(call) => Statement::Call(CallStatement {
                expression: self.suffixed(call.prefix(), call.suffixes())?,
            }),
            lua::Stmt::FunctionDeclaration(declaration) => {
                self.function_declaration(declaration)?
            }
            lua::Stmt::GenericFor(generic_for) => {
                let iterators = self.expressions(generic_for.expressions().iter())?;
                self.open_scope();
                let variables = generic_for
                    .names()
                    .iter()
                    .map(|name| self.declare(&token_text(name)))
                    .collect();
                let body = self.block(generic_for.block());
                self.close_scope();
                Statement::ForGeneric(ForGenericStatement {
                    variables,
                    iterators,
                    body: body?,
                })
            }
            lua::Stmt::If(if_statement) => self.if_statement(if_statement)?,
            lua::Stmt::LocalAssignment(local) => self.local_assignment(local)?,
            lua::Stmt::LocalFunction(local_function) => {
                // Declared before the body so the function can call itself.
                let identifier = self.declare(&token_text(local_function.name()));
                let (parameters, body) = self.function_body(local_function.body(), false)?;
                Statement::Function(Box::new(Function {
                    identifier: Some(Expression::Identifier(identifier)),
                    is_local: true,
                    parameters,
                    body,
                }))
            }
            lua::Stmt::NumericFor(numeric_for) => {
                let start = self.expression(numeric_for.start())?;
                let end = self.expression(numeric_for.end())?;
                let step = match numeric_for.step() {
                    Some(step) => Some(self.expression(step)?),
                    None => None,
                };
                self.open_scope();
                let variable = self.declare(&token_text(numeric_for.index_variable()));
                let body = self.block(numeric_for.block());
                self.close_scope();
                Statement::ForNumeric(Box::new(ForNumericStatement {
                    variable,
                    start,
                    end,
                    step,
                    body: body?,
                }))
            }
            lua::Stmt::Repeat(repeat) => {
                // The body's locals stay visible in the `until` condition.
                self.open_scope();
                let lowered = self.repeat_statement(repeat);
                self.close_scope();
                lowered?
            }
            lua::Stmt::While(while_loop) => {
                let condition = self.expression(while_loop.condition())?;
                let body = self.scoped_block(while_loop.block())?;
                Statement::While(WhileStatement { condition, body })
            }
            lua::Stmt::Goto(goto) => Statement::Goto(GotoStatement {
                label: Identifier::new(token_text(goto.label_name()), false),
            }),
            lua::Stmt::Label(label) => Statement::Label(LabelStatement {
                label: Identifier::new(token_text(label.name()), false),
            }),
            _ => return Err(unsupported(statement, "statement")),
        };
        Ok(lowered)
    }

    fn last_statement(&mut self, last: &lua::LastStmt) -> ParseResult<Statement> {
        match last {
            lua::LastStmt::Break(_) => Ok(Statement::Break),
            lua::LastStmt::Return(return_statement) => Ok(Statement::Return(ReturnStatement {
                arguments: self.expressions(return_statement.returns().iter())?,
            })),
            _ => Err(unsupported(last, "statement")),
        }
    }

    fn repeat_statement(&mut self, repeat: &lua::Repeat) -> ParseResult<Statement> {
        let body = self.block(repeat.block())?;
        let condition = self.expression(repeat.until())?;
        Ok(Statement::Repeat(RepeatStatement { condition, body }))
    }

    fn if_statement(&mut self, if_statement: &lua::If) -> ParseResult<Statement> {
        let mut clauses = Vec::new();
        let condition = self.expression(if_statement.condition())?;
        let body = self.scoped_block(if_statement.block())?;
        clauses.push(Clause::If(ConditionalClause { condition, body }));

        for else_if in if_statement.else_if().into_iter().flatten() {
            let condition = self.expression(else_if.condition())?;
            let body = self.scoped_block(else_if.block())?;
            clauses.push(Clause::Elseif(ConditionalClause { condition, body }));
        }
        if let Some(block) = if_statement.else_block() {
            let body = self.scoped_block(block)?;
            clauses.push(Clause::Else(ElseClause { body }));
        }
        Ok(Statement::If(IfStatement { clauses }))
    }

    fn function_declaration(
        &mut self,
        declaration: &lua::FunctionDeclaration,
    ) -> ParseResult<Statement> {
        let name = declaration.name();
        let mut names = name.names().iter();
        let first = names.next().map(token_text).unwrap_or_default();
        let mut identifier = Expression::Identifier(self.reference(first));
        for field in names {
            identifier = member(identifier, Indexer::Dot, token_text(field));
        }
        let is_method = match name.method_name() {
            Some(method) => {
                identifier = member(identifier, Indexer::Colon, token_text(method));
                true
            }
            None => false,
        };
        let (parameters, body) = self.function_body(declaration.body(), is_method)?;
        Ok(Statement::Function(Box::new(Function {
            identifier: Some(identifier),
            is_local: false,
            parameters,
            body,
        })))
    }

    fn local_assignment(&mut self, local: &lua::LocalAssignment) -> ParseResult<Statement> {
        let mut attributes = Vec::new();
        for attribute in local.attributes() {
            let Some(attribute) = attribute else {
                attributes.push(None);
                continue;
            };
            let name = token_text(attribute.name());
            if name != "const" && name != "close" {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownAttribute(name),
                    token_line(attribute.name()),
                ));
            }
            attributes.push(Some(name));
        }
        if attributes.iter().all(Option::is_none) {
            attributes.clear();
        }

        let init = self.expressions(local.expressions().iter())?;
        // Declared after the initializers: `local x = x` reads the outer `x`.
        let variables = local
            .names()
            .iter()
            .map(|name| self.declare(&token_text(name)))
            .collect();
        Ok(Statement::Local(LocalStatement {
            variables,
            attributes,
            init,
        }))
    }

    fn function_body(
        &mut self,
        body: &lua::FunctionBody,
        is_method: bool,
    ) -> ParseResult<(Vec<Expression>, Vec<Statement>)> {
        let is_vararg = body
            .parameters()
            .iter()
            .any(|parameter| matches!(parameter, lua::Parameter::Ellipse(_)));
        self.open_scope();
        self.vararg.push(is_vararg);
        let lowered = self.function_body_in_scope(body, is_method);
        self.vararg.pop();
        self.close_scope();
        lowered
    }

    fn function_body_in_scope(
        &mut self,
        body: &lua::FunctionBody,
        is_method: bool,
    ) -> ParseResult<(Vec<Expression>, Vec<Statement>)> {
        if is_method {
            self.declare("self");
        }
        let mut parameters = Vec::new();
        for parameter in body.parameters().iter() {
            let lowered = match parameter {
                lua::Parameter::Ellipse(_) => Expression::Vararg(VarargLiteral::default()),
                lua::Parameter::Name(name) => {
                    Expression::Identifier(self.declare(&token_text(name)))
                }
                _ => return Err(unsupported(parameter, "parameter")),
            };
            parameters.push(lowered);
        }
        let statements = self.block(body.block())?;
        Ok((parameters, statements))
    }

    // Expressions

    fn expressions<'a>(
        &mut self,
        expressions: impl Iterator<Item = &'a lua::Expression>,
    ) -> ParseResult<Vec<Expression>> {
        let mut lowered = Vec::new();
        for expression in expressions {
            lowered.push(self.expression(expression)?);
        }
        Ok(lowered)
    }

    fn expression(&mut self, expression: &lua::Expression) -> ParseResult<Expression> {
        match expression {
            lua::Expression::BinaryOperator { lhs, binop, rhs } => {
                let operator = binary_operator(binop)?;
                let left = self.expression(lhs)?;
                let right = self.expression(rhs)?;
                let binary = Box::new(BinaryExpression {
                    operator,
                    left,
                    right,
                });
                Ok(if operator.is_logical() {
                    Expression::Logical(binary)
                } else {
                    Expression::Binary(binary)
                })
            }
            lua::Expression::Parentheses { expression, .. } => {
                let mut inner = self.expression(expression)?;
                inner.mark_in_parens();
                Ok(inner)
            }
            lua::Expression::UnaryOperator { unop, expression } => {
                let operator = unary_operator(unop)?;
                let argument = self.expression(expression)?;
                Ok(Expression::Unary(Box::new(UnaryExpression {
                    operator,
                    argument,
                })))
            }
            lua::Expression::Value { value, .. } => self.value(value),
            _ => Err(unsupported(expression, "expression")),
        }
    }

    fn value(&mut self, value: &lua::Value) -> ParseResult<Expression> {
        match value {
            lua::Value::Function((_, body)) => {
                let (parameters, body) = self.function_body(body, false)?;
                Ok(Expression::Function(Box::new(Function {
                    identifier: None,
                    is_local: false,
                    parameters,
                    body,
                })))
            }
            lua::Value::FunctionCall(call) => self.suffixed(call.prefix(), call.suffixes()),
            lua::Value::TableConstructor(table) => Ok(Expression::Table(self.table(table)?)),
            lua::Value::Number(token) => number(token),
            lua::Value::ParenthesesExpression(expression) => self.expression(expression),
            lua::Value::String(token) => Ok(Expression::String(self.string(token)?)),
            lua::Value::Symbol(token) => self.symbol(token),
            lua::Value::Var(var) => self.var(var),
            _ => Err(unsupported(value, "expression")),
        }
    }

    fn symbol(&self, token: &TokenReference) -> ParseResult<Expression> {
        match token_text(token).as_str() {
            "nil" => Ok(Expression::Nil),
            "true" => Ok(Expression::Boolean(BooleanLiteral { value: true })),
            "false" => Ok(Expression::Boolean(BooleanLiteral { value: false })),
            "..." if self.vararg.last().copied().unwrap_or(false) => {
                Ok(Expression::Vararg(VarargLiteral::default()))
            }
            "..." => Err(ParseError::new(
                ParseErrorKind::VarargOutsideVarargFunction,
                token_line(token),
            )),
            other => Err(ParseError::new(
                ParseErrorKind::Unsupported(format!("symbol '{other}'")),
                token_line(token),
            )),
        }
    }

    fn string(&self, token: &TokenReference) -> ParseResult<StringLiteral> {
        let raw = token_text(token);
        let bytes = literal::string_value(&raw, self.encoding)
            .map_err(|kind| ParseError::new(kind, token_line(token)))?;
        Ok(StringLiteral {
            value: String::from_utf8_lossy(&bytes).into_owned(),
            raw,
        })
    }

    fn var(&mut self, var: &lua::Var) -> ParseResult<Expression> {
        match var {
            lua::Var::Name(name) => Ok(Expression::Identifier(self.reference(token_text(name)))),
            lua::Var::Expression(expression) => {
                self.suffixed(expression.prefix(), expression.suffixes())
            }
            _ => Err(unsupported(var, "assignment target")),
        }
    }

    fn suffixed<'a>(
        &mut self,
        prefix: &lua::Prefix,
        suffixes: impl Iterator<Item = &'a lua::Suffix>,
    ) -> ParseResult<Expression> {
        let mut expression = match prefix {
            lua::Prefix::Name(name) => Expression::Identifier(self.reference(token_text(name))),
            lua::Prefix::Expression(inner) => self.expression(inner)?,
            _ => return Err(unsupported(prefix, "expression")),
        };
        for suffix in suffixes {
            expression = match suffix {
                lua::Suffix::Index(lua::Index::Dot { name, .. }) => {
                    member(expression, Indexer::Dot, token_text(name))
                }
                lua::Suffix::Index(lua::Index::Brackets {
                    expression: index, ..
                }) => {
                    let index = self.expression(index)?;
                    Expression::Index(Box::new(IndexExpression {
                        base: expression,
                        index,
                    }))
                }
                lua::Suffix::Call(lua::Call::AnonymousCall(arguments)) => {
                    self.call(expression, arguments)?
                }
                lua::Suffix::Call(lua::Call::MethodCall(method)) => {
                    let base = member(expression, Indexer::Colon, token_text(method.name()));
                    self.call(base, method.args())?
                }
                _ => return Err(unsupported(suffix, "suffix")),
            };
        }
        Ok(expression)
    }

    fn call(&mut self, base: Expression, arguments: &lua::FunctionArgs) -> ParseResult<Expression> {
        let call = match arguments {
            lua::FunctionArgs::Parentheses {
                parentheses,
                arguments,
            } => {
                let line = token_line(parentheses.tokens().0);
                let arguments = self.expressions(arguments.iter())?;
                Expression::Call(Box::new(CallExpression {
                    base,
                    arguments,
                    line,
                    in_parens: false,
                }))
            }
            lua::FunctionArgs::String(token) => {
                let argument = self.string(token)?;
                Expression::StringCall(Box::new(StringCallExpression {
                    base,
                    argument,
                    line: token_line(token),
                    in_parens: false,
                }))
            }
            lua::FunctionArgs::TableConstructor(table) => {
                let line = token_line(table.braces().tokens().0);
                let arguments = self.table(table)?;
                Expression::TableCall(Box::new(TableCallExpression {
                    base,
                    arguments,
                    line,
                    in_parens: false,
                }))
            }
            _ => return Err(unsupported(arguments, "call arguments")),
        };
        Ok(call)
    }

    fn table(&mut self, table: &lua::TableConstructor) -> ParseResult<TableConstructor> {
        let mut fields = Vec::new();
        for field in table.fields().iter() {
            let lowered = match field {
                lua::Field::ExpressionKey { key, value, .. } => TableField::Key {
                    key: self.expression(key)?,
                    value: self.expression(value)?,
                },
                lua::Field::NameKey { key, value, .. } => TableField::KeyString {
                    key: Identifier::new(token_text(key), false),
                    value: self.expression(value)?,
                },
                lua::Field::NoKey(value) => TableField::Value {
                    value: self.expression(value)?,
                },
                _ => return Err(unsupported(field, "table field")),
            };
            fields.push(lowered);
        }
        Ok(TableConstructor { fields })
    }
}

/// Gathers comments from the trivia around every token, in source order.
#[derive(Debug, Default)]
struct CommentCollector {
    comments: Vec<Comment>,
}

impl CommentCollector {
    fn push(&mut self, token: &Token, value: &str, raw: String) {
        self.comments.push(Comment {
            value: value.to_owned(),
            line: token.start_position().line(),
            raw,
        });
    }
}

impl Visitor for CommentCollector {
    fn visit_single_line_comment(&mut self, token: &Token) {
        let raw = token.to_string();
        let value = raw.get(2..).unwrap_or_default().to_owned();
        self.push(token, &value, raw);
    }

    fn visit_multi_line_comment(&mut self, token: &Token) {
        let raw = token.to_string();
        let value = raw
            .get(2..)
            .map(literal::long_bracket_contents)
            .unwrap_or_default()
            .to_owned();
        self.push(token, &value, raw);
    }
}
