use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::ast::{Expr, FunctionDecl, Program, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Literal, Token, TokenKind};

/// Calls and function declarations accept at most this many arguments/parameters.
pub const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct ParseError {
    pub line: usize,
    /// Either ` at end` or ` at 'lexeme'`
    pub location: String,
    pub message: String,
}

impl ParseError {
    pub fn at(token: &Token, message: impl Into<String>) -> ParseError {
        let location = if token.is(TokenKind::Eof) {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };

        ParseError {
            line: token.line,
            location,
            message: message.into(),
        }
    }
}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// How many function bodies enclose the current position
    function_depth: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Parser {
        // Everything below relies on a trailing EOF to stop at
        if !tokens.last().map_or(false, |t| t.is(TokenKind::Eof)) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::eof(line));
        }

        Parser {
            tokens,
            current: 0,
            function_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Parse every declaration up to EOF.
    ///
    /// A malformed statement is skipped and parsing resumes at the next statement boundary, so
    /// one call reports every syntax error it can find. The program is only returned if none
    /// were found.
    pub fn parse_program(mut self) -> Result<Program, Vec<ParseError>> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                program.statements.push(statement);
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        Ok(program)
    }

    fn declaration(&mut self) -> Option<Stmt> {
        ensure_sufficient_stack(|| self.recovering_declaration())
    }

    fn recovering_declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(TokenKind::Fun) {
            self.function_declaration()
        } else if self.match_kind(TokenKind::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(error) => {
                debug!(%error, "recovering from parse error");
                self.errors.push(error);
                self.synchronize();
                None
            }
        }
    }

    fn function_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.report(ParseError::at(
                        self.peek(),
                        "Can't have more than 255 parameters.",
                    ));
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);

                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;

        self.function_depth += 1;
        let body = self.block();
        self.function_depth -= 1;

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name,
            params,
            body: body?,
        })))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;

        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        ensure_sufficient_stack(|| self.dispatch_statement())
    }

    fn dispatch_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::For => {
                self.advance();
                self.for_statement()
            }
            TokenKind::If => {
                self.advance();
                self.if_statement()
            }
            TokenKind::Print => {
                self.advance();
                self.print_statement()
            }
            TokenKind::Return => {
                self.advance();
                self.return_statement()
            }
            TokenKind::While => {
                self.advance();
                self.while_statement()
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Stmt::Block(self.block()?))
            }
            _ => self.expression_statement(),
        }
    }

    /// `for` has no node of its own: it becomes a `while` loop inside blocks.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        body = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(Literal::Bool(true))),
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        if self.function_depth == 0 {
            self.report(ParseError::at(&keyword, "Can't return from top-level code."));
        }

        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// Parse declarations up to the closing brace. The opening brace is already consumed.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let target = self.series()?;
        self.assignment_tail(target, Self::assignment)
    }

    /// A call argument: an assignment without the comma operator, so that commas separate arguments.
    fn argument(&mut self) -> ParseResult<Expr> {
        let target = self.conditional()?;
        self.assignment_tail(target, Self::argument)
    }

    fn assignment_tail(
        &mut self,
        target: Expr,
        parse_value: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = ensure_sufficient_stack(|| parse_value(self))?;

            if let Expr::Variable(name) = target {
                return Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                });
            }

            // Reported, but the parser is not confused: no need to synchronize
            self.report(ParseError::at(&equals, "Invalid assignment target."));
        }

        Ok(target)
    }

    fn series(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::Comma], Self::conditional)
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let condition = self.or()?;

        if self.match_kind(TokenKind::Question) {
            let operator = self.previous().clone();
            let then_branch = self.expression()?;
            self.consume(
                TokenKind::Colon,
                "Expect ':' after then branch of conditional expression.",
            )?;
            // Right-associative: `a ? b : c ? d : e` nests in the else branch
            let else_branch = ensure_sufficient_stack(|| self.conditional())?;

            return Ok(Expr::Ternary {
                operator,
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(condition)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        self.logical(TokenKind::Or, Self::and)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        self.logical(TokenKind::And, Self::equality)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary(
            &[TokenKind::BangEqual, TokenKind::EqualEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::Minus, TokenKind::Plus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let right = ensure_sufficient_stack(|| self.unary())?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        while self.match_kind(TokenKind::LeftParen) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    self.report(ParseError::at(
                        self.peek(),
                        "Can't have more than 255 arguments.",
                    ));
                }
                arguments.push(self.argument()?);

                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();

        let expr = match token.kind {
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::Nil => Expr::Literal(Literal::Nil),
            TokenKind::Number | TokenKind::String => {
                Expr::Literal(token.literal.clone().unwrap_or(Literal::Nil))
            }
            TokenKind::Identifier => Expr::Variable(token),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping(Box::new(expr)));
            }
            _ => return Err(ParseError::at(&token, "Expect expression.")),
        };

        self.advance();
        Ok(expr)
    }

    /// Parse a left-associative chain of binary operators.
    fn binary(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;

        while self.match_any(operators) {
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical(
        &mut self,
        operator: TokenKind,
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;

        while self.match_kind(operator) {
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// Record an error that does not need the parser to resynchronize.
    fn report(&mut self, error: ParseError) {
        debug!(%error, "parse error");
        self.errors.push(error);
    }

    /// Discard tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().is(TokenKind::Semicolon) || self.peek().kind.starts_statement() {
                break;
            }
            self.advance();
        }

        trace!(line = self.peek().line, "synchronized at {}", self.peek().kind);
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.match_kind(kind))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(ParseError::at(self.peek(), message))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().is(kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().is(TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}
