use lua_parser::ast::{
    BinaryExpression, BinaryOperator, CallExpression, Chunk, Clause, Expression, Function,
    Identifier, LocalStatement, Statement, StringCallExpression, TableCallExpression,
    TableConstructor, TableField, UnaryExpression, UnaryOperator,
};

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Style {
    /// One statement per line, four-space indentation, one table field per line.
    Pretty,
    /// Minimal whitespace. Identifiers are kept as written.
    #[default]
    Compact,
}

const UNARY_PRECEDENCE: u8 = 12;

const fn precedence(operator: BinaryOperator) -> u8 {
    match operator {
        BinaryOperator::Or => 1,
        BinaryOperator::And => 2,
        BinaryOperator::Lt
        | BinaryOperator::Gt
        | BinaryOperator::Le
        | BinaryOperator::Ge
        | BinaryOperator::Ne
        | BinaryOperator::Eq => 3,
        BinaryOperator::BitOr => 4,
        BinaryOperator::BitXor => 5,
        BinaryOperator::BitAnd => 6,
        BinaryOperator::Shl | BinaryOperator::Shr => 7,
        BinaryOperator::Concat => 9,
        BinaryOperator::Add | BinaryOperator::Sub => 10,
        BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::FloorDiv | BinaryOperator::Mod => {
            11
        }
        BinaryOperator::Pow => 14,
    }
}

const fn is_right_associative(operator: BinaryOperator) -> bool {
    matches!(operator, BinaryOperator::Concat | BinaryOperator::Pow)
}

/// Equal-precedence children that may lose their parentheses even on the "wrong" side:
/// anything additive under `+`, and `*` or `/` under `*`.
const fn regroups(parent: BinaryOperator, child: BinaryOperator) -> bool {
    matches!(parent, BinaryOperator::Add)
        || (matches!(parent, BinaryOperator::Mul)
            && matches!(child, BinaryOperator::Mul | BinaryOperator::Div))
}

/// Where an expression sits relative to the operator that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Free,
    Left(BinaryOperator),
    Right(BinaryOperator),
    UnaryArgument,
}

fn needs_parens(expression: &Expression, position: Position) -> bool {
    match expression {
        Expression::Binary(binary) | Expression::Logical(binary) => {
            let child = precedence(binary.operator);
            match position {
                Position::Free => false,
                Position::UnaryArgument => child < UNARY_PRECEDENCE,
                Position::Left(parent) | Position::Right(parent) => {
                    let parent_precedence = precedence(parent);
                    if child != parent_precedence {
                        return child < parent_precedence;
                    }
                    let right_associative = is_right_associative(binary.operator);
                    let same_side = match position {
                        Position::Left(_) => !right_associative,
                        _ => right_associative,
                    };
                    !same_side && !regroups(parent, binary.operator)
                }
            }
        }
        Expression::Unary(_) => match position {
            // The operand parser always tries a unary prefix here, whatever the precedence.
            Position::Right(BinaryOperator::Pow) => false,
            Position::Left(parent) | Position::Right(parent) => {
                UNARY_PRECEDENCE < precedence(parent)
            }
            Position::Free | Position::UnaryArgument => false,
        },
        _ => false,
    }
}

/// Whether the printed expression will begin with `(`, which would make it continue the
/// previous statement as a call.
fn starts_with_paren(expression: &Expression) -> bool {
    if expression.in_parens() {
        return true;
    }
    match expression {
        Expression::Identifier(_) => false,
        Expression::Member(member) => starts_with_paren(&member.base),
        Expression::Index(index) => starts_with_paren(&index.base),
        Expression::Call(call) => starts_with_paren(&call.base),
        Expression::TableCall(call) => starts_with_paren(&call.base),
        Expression::StringCall(call) => starts_with_paren(&call.base),
        // Anything else only reaches statement position as a call or index base, where it is
        // parenthesized.
        _ => true,
    }
}

fn statement_starts_with_paren(statement: &Statement) -> bool {
    match statement {
        Statement::Call(call) => starts_with_paren(&call.expression),
        Statement::Assignment(assignment) => assignment
            .variables
            .first()
            .is_some_and(starts_with_paren),
        _ => false,
    }
}

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Debug)]
pub struct Unparser {
    pub source: String,
    style: Style,
    indent: usize,
    /// The last token written was a numeric literal.
    after_number: bool,
}

impl Default for Unparser {
    fn default() -> Self {
        Self::new(Style::default())
    }
}

impl Unparser {
    pub const fn new(style: Style) -> Self {
        Self {
            source: String::new(),
            style,
            indent: 0,
            after_number: false,
        }
    }

    /// Whether writing a token starting with `next` right after the current output would
    /// merge the two into a different lexeme.
    fn needs_separator(&self, next: char) -> bool {
        let Some(prev) = self.source.chars().next_back() else {
            return false;
        };
        if self.after_number && (is_word_char(next) || next == '.') {
            return true;
        }
        (is_word_char(prev) && is_word_char(next))
            || (prev == '-' && next == '-')
            || (prev == '.' && next == '.')
            || (prev == '[' && (next == '[' || next == '='))
            || (matches!(prev, '<' | '>' | '~' | '=') && next == '=')
    }

    fn write_str(&mut self, token: &str) {
        let Some(next) = token.chars().next() else {
            return;
        };
        if self.needs_separator(next) {
            self.source.push(' ');
        }
        self.source.push_str(token);
        self.after_number = false;
    }

    fn write_number(&mut self, raw: &str) {
        self.write_str(raw);
        self.after_number = true;
    }

    /// Starts a new line at the current indentation, then writes `token`.
    fn fill(&mut self, token: &str) {
        if self.style == Style::Pretty && !self.source.is_empty() {
            self.source.push('\n');
            self.source.push_str(&" ".repeat(self.indent * 4));
            self.after_number = false;
        }
        self.write_str(token);
    }

    fn space(&mut self) {
        if self.style == Style::Pretty {
            self.source.push(' ');
            self.after_number = false;
        }
    }

    fn operator(&mut self, operator: &str) {
        self.space();
        self.write_str(operator);
        self.space();
    }

    fn comma(&mut self) {
        self.write_str(",");
        self.space();
    }

    fn block<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn separated<T, F>(&mut self, items: &[T], mut f: F)
    where
        F: FnMut(&mut Self, &T),
    {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.comma();
            }
            f(self, item);
        }
    }

    pub fn unparse_chunk(&mut self, chunk: &Chunk) {
        self.unparse_block(&chunk.body);
        if !self.source.ends_with('\n') {
            self.source.push('\n');
        }
    }

    fn unparse_block(&mut self, body: &[Statement]) {
        for (index, statement) in body.iter().enumerate() {
            let lead = if index > 0 && statement_starts_with_paren(statement) {
                ";"
            } else {
                ""
            };
            self.fill(lead);
            self.unparse_stmt_inline(statement);
        }
    }

    /// Writes a nested block followed by its closing keyword on its own line.
    fn unparse_body(&mut self, body: &[Statement], closing: &str) {
        if body.is_empty() {
            self.space();
            self.write_str(closing);
            return;
        }
        self.block(|s| s.unparse_block(body));
        self.fill(closing);
    }

    pub fn unparse_stmt(&mut self, statement: &Statement) {
        self.fill("");
        self.unparse_stmt_inline(statement);
    }

    fn unparse_stmt_inline(&mut self, statement: &Statement) {
        match statement {
            Statement::Label(label) => {
                self.write_str("::");
                self.write_str(&label.label.name);
                self.write_str("::");
            }
            Statement::Break => self.write_str("break"),
            Statement::Goto(goto) => {
                self.write_str("goto");
                self.space();
                self.write_str(&goto.label.name);
            }
            Statement::Return(ret) => {
                self.write_str("return");
                if !ret.arguments.is_empty() {
                    self.space();
                    self.unparse_expression_list(&ret.arguments);
                }
            }
            Statement::If(if_statement) => {
                for clause in &if_statement.clauses {
                    match clause {
                        Clause::If(clause) => {
                            self.write_str("if");
                            self.space();
                            self.unparse_expr(&clause.condition, Position::Free);
                            self.space();
                            self.write_str("then");
                            self.block(|s| s.unparse_block(&clause.body));
                        }
                        Clause::Elseif(clause) => {
                            self.fill("elseif");
                            self.space();
                            self.unparse_expr(&clause.condition, Position::Free);
                            self.space();
                            self.write_str("then");
                            self.block(|s| s.unparse_block(&clause.body));
                        }
                        Clause::Else(clause) => {
                            self.fill("else");
                            self.block(|s| s.unparse_block(&clause.body));
                        }
                    }
                }
                self.fill("end");
            }
            Statement::While(while_statement) => {
                self.write_str("while");
                self.space();
                self.unparse_expr(&while_statement.condition, Position::Free);
                self.space();
                self.write_str("do");
                self.unparse_body(&while_statement.body, "end");
            }
            Statement::Do(do_statement) => {
                self.write_str("do");
                self.unparse_body(&do_statement.body, "end");
            }
            Statement::Repeat(repeat) => {
                self.write_str("repeat");
                self.unparse_body(&repeat.body, "until");
                self.space();
                self.unparse_expr(&repeat.condition, Position::Free);
            }
            Statement::Local(local) => self.unparse_local(local),
            Statement::Assignment(assignment) => {
                self.unparse_expression_list(&assignment.variables);
                self.operator("=");
                self.unparse_expression_list(&assignment.init);
            }
            Statement::Call(call) => self.unparse_expr(&call.expression, Position::Free),
            Statement::Function(function) => {
                if function.is_local {
                    self.write_str("local");
                    self.space();
                }
                self.write_str("function");
                self.space();
                if let Some(identifier) = &function.identifier {
                    self.unparse_expr(identifier, Position::Free);
                }
                self.unparse_function_tail(function);
            }
            Statement::ForNumeric(for_statement) => {
                self.write_str("for");
                self.space();
                self.write_str(&for_statement.variable.name);
                self.operator("=");
                self.unparse_expr(&for_statement.start, Position::Free);
                self.comma();
                self.unparse_expr(&for_statement.end, Position::Free);
                if let Some(step) = &for_statement.step {
                    self.comma();
                    self.unparse_expr(step, Position::Free);
                }
                self.space();
                self.write_str("do");
                self.unparse_body(&for_statement.body, "end");
            }
            Statement::ForGeneric(for_statement) => {
                self.write_str("for");
                self.space();
                self.unparse_names(&for_statement.variables);
                self.space();
                self.write_str("in");
                self.space();
                self.unparse_expression_list(&for_statement.iterators);
                self.space();
                self.write_str("do");
                self.unparse_body(&for_statement.body, "end");
            }
        }
    }

    fn unparse_local(&mut self, local: &LocalStatement) {
        self.write_str("local");
        self.space();
        for (index, variable) in local.variables.iter().enumerate() {
            if index > 0 {
                self.comma();
            }
            self.write_str(&variable.name);
            if let Some(attribute) = local.attribute(index) {
                self.space();
                self.write_str("<");
                self.write_str(attribute);
                self.write_str(">");
            }
        }
        if !local.init.is_empty() {
            self.operator("=");
            self.unparse_expression_list(&local.init);
        }
    }

    fn unparse_names(&mut self, names: &[Identifier]) {
        self.separated(names, |s, name| s.write_str(&name.name));
    }

    fn unparse_expression_list(&mut self, expressions: &[Expression]) {
        self.separated(expressions, |s, expression| {
            s.unparse_expr(expression, Position::Free);
        });
    }

    /// Parameter list, body and `end` of a function.
    fn unparse_function_tail(&mut self, function: &Function) {
        self.write_str("(");
        self.unparse_expression_list(&function.parameters);
        self.write_str(")");
        self.unparse_body(&function.body, "end");
    }

    pub fn unparse_expression(&mut self, expression: &Expression) {
        self.unparse_expr(expression, Position::Free);
    }

    fn unparse_expr(&mut self, expression: &Expression, position: Position) {
        if expression.in_parens() || needs_parens(expression, position) {
            self.write_str("(");
            self.unparse_expr_inner(expression);
            self.write_str(")");
        } else {
            self.unparse_expr_inner(expression);
        }
    }

    fn unparse_expr_inner(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier(identifier) => self.write_str(&identifier.name),
            Expression::String(string) => self.write_str(&string.raw),
            Expression::Number(number) => {
                if number.raw.is_empty() {
                    self.write_number(&number.value.to_string());
                } else {
                    self.write_number(&number.raw);
                }
            }
            Expression::Boolean(boolean) => {
                self.write_str(if boolean.value { "true" } else { "false" });
            }
            Expression::Nil => self.write_str("nil"),
            Expression::Vararg(_) => self.write_str("..."),
            Expression::Function(function) => {
                self.write_str("function");
                self.unparse_function_tail(function);
            }
            Expression::Table(table) => self.unparse_table(table),
            Expression::Binary(binary) | Expression::Logical(binary) => {
                self.unparse_binary(binary);
            }
            Expression::Unary(unary) => self.unparse_unary(unary),
            Expression::Member(member) => {
                self.unparse_base(&member.base);
                self.write_str(member.indexer.as_str());
                self.write_str(&member.identifier.name);
            }
            Expression::Index(index) => {
                self.unparse_base(&index.base);
                self.write_str("[");
                self.unparse_expr(&index.index, Position::Free);
                self.write_str("]");
            }
            Expression::Call(call) => self.unparse_call(call),
            Expression::TableCall(call) => self.unparse_table_call(call),
            Expression::StringCall(call) => self.unparse_string_call(call),
        }
    }

    fn unparse_binary(&mut self, binary: &BinaryExpression) {
        self.unparse_expr(&binary.left, Position::Left(binary.operator));
        self.operator(binary.operator.as_str());
        self.unparse_expr(&binary.right, Position::Right(binary.operator));
    }

    fn unparse_unary(&mut self, unary: &UnaryExpression) {
        self.write_str(unary.operator.as_str());
        if unary.operator == UnaryOperator::Not {
            self.space();
        }
        self.unparse_expr(&unary.argument, Position::UnaryArgument);
    }

    /// The base of a call, index or member access. Only prefix expressions may appear there
    /// without parentheses.
    fn unparse_base(&mut self, base: &Expression) {
        if base.is_prefix_expression() || base.in_parens() {
            self.unparse_expr(base, Position::Free);
        } else {
            self.write_str("(");
            self.unparse_expr_inner(base);
            self.write_str(")");
        }
    }

    fn unparse_call(&mut self, call: &CallExpression) {
        self.unparse_base(&call.base);
        self.write_str("(");
        self.unparse_expression_list(&call.arguments);
        self.write_str(")");
    }

    fn unparse_table_call(&mut self, call: &TableCallExpression) {
        self.unparse_base(&call.base);
        self.unparse_table(&call.arguments);
    }

    fn unparse_string_call(&mut self, call: &StringCallExpression) {
        self.unparse_base(&call.base);
        self.write_str(&call.argument.raw);
    }

    fn unparse_table(&mut self, table: &TableConstructor) {
        if table.fields.is_empty() {
            self.write_str("{}");
            return;
        }
        self.write_str("{");
        match self.style {
            Style::Pretty => {
                self.block(|s| {
                    for field in &table.fields {
                        s.fill("");
                        s.unparse_table_field(field);
                        s.write_str(",");
                    }
                });
                self.fill("}");
            }
            Style::Compact => {
                for (index, field) in table.fields.iter().enumerate() {
                    if index > 0 {
                        self.write_str(",");
                    }
                    self.unparse_table_field(field);
                }
                self.write_str("}");
            }
        }
    }

    fn unparse_table_field(&mut self, field: &TableField) {
        match field {
            TableField::Key { key, value } => {
                self.write_str("[");
                self.unparse_expr(key, Position::Free);
                self.write_str("]");
                self.operator("=");
                self.unparse_expr(value, Position::Free);
            }
            TableField::KeyString { key, value } => {
                self.write_str(&key.name);
                self.operator("=");
                self.unparse_expr(value, Position::Free);
            }
            TableField::Value { value } => self.unparse_expr(value, Position::Free),
        }
    }
}
