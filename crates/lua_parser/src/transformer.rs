//! Mutable pre-order traversal of a syntax tree.
//!
//! Implementors override the `visit_*` hooks they care about and call the matching `walk_*`
//! function to continue into children. Nodes are visited in source order, so a transformer
//! that records what it sees observes the same order a reader of the file would.

use crate::ast::{Chunk, Clause, Expression, Function, Identifier, Statement, TableField};

pub trait Transformer {
    type Error;

    fn visit_chunk(&mut self, chunk: &mut Chunk) -> Result<(), Self::Error> {
        walk_block(self, &mut chunk.body)
    }

    fn visit_block(&mut self, body: &mut [Statement]) -> Result<(), Self::Error> {
        walk_block(self, body)
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> Result<(), Self::Error> {
        walk_statement(self, statement)
    }

    fn visit_expression(&mut self, expression: &mut Expression) -> Result<(), Self::Error> {
        walk_expression(self, expression)
    }

    /// Called for every identifier in the tree, including declarations, labels and field names.
    #[allow(unused_variables)]
    fn visit_identifier(&mut self, identifier: &mut Identifier) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub fn walk_block<T: Transformer + ?Sized>(
    transformer: &mut T,
    body: &mut [Statement],
) -> Result<(), T::Error> {
    for statement in body {
        transformer.visit_statement(statement)?;
    }
    Ok(())
}

fn walk_expressions<T: Transformer + ?Sized>(
    transformer: &mut T,
    expressions: &mut [Expression],
) -> Result<(), T::Error> {
    for expression in expressions {
        transformer.visit_expression(expression)?;
    }
    Ok(())
}

fn walk_function<T: Transformer + ?Sized>(
    transformer: &mut T,
    function: &mut Function,
) -> Result<(), T::Error> {
    if let Some(identifier) = &mut function.identifier {
        transformer.visit_expression(identifier)?;
    }
    walk_expressions(transformer, &mut function.parameters)?;
    transformer.visit_block(&mut function.body)
}

pub fn walk_statement<T: Transformer + ?Sized>(
    transformer: &mut T,
    statement: &mut Statement,
) -> Result<(), T::Error> {
    match statement {
        Statement::Label(label) => transformer.visit_identifier(&mut label.label),
        Statement::Goto(goto) => transformer.visit_identifier(&mut goto.label),
        Statement::Break => Ok(()),
        Statement::Return(ret) => walk_expressions(transformer, &mut ret.arguments),
        Statement::If(if_statement) => {
            for clause in &mut if_statement.clauses {
                match clause {
                    Clause::If(clause) | Clause::Elseif(clause) => {
                        transformer.visit_expression(&mut clause.condition)?;
                        transformer.visit_block(&mut clause.body)?;
                    }
                    Clause::Else(clause) => transformer.visit_block(&mut clause.body)?,
                }
            }
            Ok(())
        }
        Statement::While(while_statement) => {
            transformer.visit_expression(&mut while_statement.condition)?;
            transformer.visit_block(&mut while_statement.body)
        }
        Statement::Do(do_statement) => transformer.visit_block(&mut do_statement.body),
        Statement::Repeat(repeat) => {
            transformer.visit_block(&mut repeat.body)?;
            transformer.visit_expression(&mut repeat.condition)
        }
        Statement::Local(local) => {
            for variable in &mut local.variables {
                transformer.visit_identifier(variable)?;
            }
            walk_expressions(transformer, &mut local.init)
        }
        Statement::Assignment(assignment) => {
            walk_expressions(transformer, &mut assignment.variables)?;
            walk_expressions(transformer, &mut assignment.init)
        }
        Statement::Call(call) => transformer.visit_expression(&mut call.expression),
        Statement::Function(function) => walk_function(transformer, function),
        Statement::ForNumeric(for_statement) => {
            transformer.visit_identifier(&mut for_statement.variable)?;
            transformer.visit_expression(&mut for_statement.start)?;
            transformer.visit_expression(&mut for_statement.end)?;
            if let Some(step) = &mut for_statement.step {
                transformer.visit_expression(step)?;
            }
            transformer.visit_block(&mut for_statement.body)
        }
        Statement::ForGeneric(for_statement) => {
            for variable in &mut for_statement.variables {
                transformer.visit_identifier(variable)?;
            }
            walk_expressions(transformer, &mut for_statement.iterators)?;
            transformer.visit_block(&mut for_statement.body)
        }
    }
}

pub fn walk_expression<T: Transformer + ?Sized>(
    transformer: &mut T,
    expression: &mut Expression,
) -> Result<(), T::Error> {
    match expression {
        Expression::Identifier(identifier) => transformer.visit_identifier(identifier),
        Expression::String(_)
        | Expression::Number(_)
        | Expression::Boolean(_)
        | Expression::Nil
        | Expression::Vararg(_) => Ok(()),
        Expression::Function(function) => walk_function(transformer, function),
        Expression::Table(table) => walk_table_fields(transformer, &mut table.fields),
        Expression::Binary(binary) | Expression::Logical(binary) => {
            transformer.visit_expression(&mut binary.left)?;
            transformer.visit_expression(&mut binary.right)
        }
        Expression::Unary(unary) => transformer.visit_expression(&mut unary.argument),
        Expression::Member(member) => {
            transformer.visit_expression(&mut member.base)?;
            transformer.visit_identifier(&mut member.identifier)
        }
        Expression::Index(index) => {
            transformer.visit_expression(&mut index.base)?;
            transformer.visit_expression(&mut index.index)
        }
        Expression::Call(call) => {
            transformer.visit_expression(&mut call.base)?;
            walk_expressions(transformer, &mut call.arguments)
        }
        Expression::TableCall(call) => {
            transformer.visit_expression(&mut call.base)?;
            walk_table_fields(transformer, &mut call.arguments.fields)
        }
        Expression::StringCall(call) => transformer.visit_expression(&mut call.base),
    }
}

fn walk_table_fields<T: Transformer + ?Sized>(
    transformer: &mut T,
    fields: &mut [TableField],
) -> Result<(), T::Error> {
    for field in fields {
        match field {
            TableField::Key { key, value } => {
                transformer.visit_expression(key)?;
                transformer.visit_expression(value)?;
            }
            TableField::KeyString { key, value } => {
                transformer.visit_identifier(key)?;
                transformer.visit_expression(value)?;
            }
            TableField::Value { value } => transformer.visit_expression(value)?,
        }
    }
    Ok(())
}
