//! SQL Parser - Converts tokens into typed statements
//!
//! Recursive descent over the lexer's token stream. The grammar is the
//! engine's small SQL subset: CREATE TABLE, INSERT, SELECT (with one
//! optional INNER JOIN and one optional WHERE comparison), UPDATE and
//! DELETE. WHERE clauses are a single comparison; AND/OR composition is
//! out of scope by design.

use std::iter::Peekable;

use crate::error::{Error, Result};
use crate::sql::parser::ast::{ColumnSpec, CompareOp, Condition, JoinClause, Statement};
use crate::sql::parser::lexer::{Keyword, Lexer, Token};
use crate::sql::types::{DataType, Value};

pub mod ast;
mod lexer;

pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input).peekable(),
        }
    }

    /// Parses the input as one SQL statement
    ///
    /// A trailing semicolon is accepted but not required; nothing may
    /// follow the statement.
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;
        self.next_if_token(Token::Semicolon);
        if let Some(token) = self.peek()? {
            return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
        }
        Ok(stmt)
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Create)) => self.parse_create_table(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) => self.parse_delete(),
            Some(t) => Err(Error::Parse(format!("[Parser] Unexpected token {}", t))),
            None => Err(Error::Parse("[Parser] Unexpected end of input".to_string())),
        }
    }

    /// Parses CREATE TABLE statement
    fn parse_create_table(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Create))?;
        self.next_expect(Token::Keyword(Keyword::Table))?;

        let name = self.next_ident()?;
        self.next_expect(Token::OpenParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_spec()?);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        self.next_expect(Token::CloseParen)?;
        Ok(Statement::CreateTable { name, columns })
    }

    /// Parses one column definition in CREATE TABLE
    fn parse_column_spec(&mut self) -> Result<ColumnSpec> {
        let name = self.next_ident()?;
        let datatype = match self.next()? {
            Token::Keyword(Keyword::Int) => DataType::Integer,
            Token::Keyword(Keyword::Varchar) => DataType::Varchar,
            Token::Keyword(Keyword::Boolean) => DataType::Boolean,
            token => {
                return Err(Error::Parse(format!(
                    "[Parser] Unexpected column type {}",
                    token
                )))
            }
        };

        // Optional VARCHAR(n) length
        let mut max_length = None;
        if datatype == DataType::Varchar && self.next_if_token(Token::OpenParen).is_some() {
            match self.next()? {
                Token::Number(n) => max_length = Some(n.parse::<usize>()?),
                token => {
                    return Err(Error::Parse(format!(
                        "[Parser] Expected VARCHAR length, got {}",
                        token
                    )))
                }
            }
            self.next_expect(Token::CloseParen)?;
        }

        let mut column = ColumnSpec {
            name,
            datatype,
            max_length,
            primary_key: false,
            unique: false,
            nullable: None,
        };

        // Column constraints (PRIMARY KEY, UNIQUE, NOT NULL, NULL)
        while let Some(Token::Keyword(keyword)) = self.next_if_keyword() {
            match keyword {
                Keyword::Primary => {
                    self.next_expect(Token::Keyword(Keyword::Key))?;
                    column.primary_key = true;
                }
                Keyword::Unique => column.unique = true,
                Keyword::Not => {
                    self.next_expect(Token::Keyword(Keyword::Null))?;
                    column.nullable = Some(false);
                }
                Keyword::Null => column.nullable = Some(true),
                k => return Err(Error::Parse(format!("[Parser] Unexpected keyword {}", k))),
            }
        }

        Ok(column)
    }

    /// Parses INSERT statement
    fn parse_insert(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Insert))?;
        self.next_expect(Token::Keyword(Keyword::Into))?;

        let table_name = self.next_ident()?;

        // Check if specific columns are specified
        let columns = if self.next_if_token(Token::OpenParen).is_some() {
            let mut cols = Vec::new();
            loop {
                cols.push(self.next_ident()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                    }
                }
            }
            Some(cols)
        } else {
            None
        };

        self.next_expect(Token::Keyword(Keyword::Values))?;
        // Parse value tuples: INSERT INTO tbl VALUES (1, 2), (3, 4)
        let mut values = Vec::new();
        loop {
            self.next_expect(Token::OpenParen)?;
            let mut tuple = Vec::new();
            loop {
                tuple.push(self.parse_literal()?);
                match self.next()? {
                    Token::CloseParen => break,
                    Token::Comma => {}
                    token => {
                        return Err(Error::Parse(format!("[Parser] Unexpected token {}", token)));
                    }
                }
            }
            values.push(tuple);
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }
        Ok(Statement::Insert {
            table_name,
            columns,
            values,
        })
    }

    /// Parses SELECT statement
    fn parse_select(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Select))?;

        // `*` or a list of (possibly qualified) column names
        let columns = if self.next_if_token(Token::Asterisk).is_some() {
            None
        } else {
            let mut cols = Vec::new();
            loop {
                cols.push(self.next_column_ref()?);
                if self.next_if_token(Token::Comma).is_none() {
                    break;
                }
            }
            Some(cols)
        };

        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;

        let join = self.parse_join_clause(&table_name)?;
        let where_clause = self.parse_where_clause()?;

        Ok(Statement::Select {
            table_name,
            columns,
            join,
            where_clause,
        })
    }

    /// Parses an optional `[INNER] JOIN <table> ON <left>.<col> = <right>.<col>`
    fn parse_join_clause(&mut self, left_table: &str) -> Result<Option<JoinClause>> {
        if self.next_if_token(Token::Keyword(Keyword::Inner)).is_some() {
            self.next_expect(Token::Keyword(Keyword::Join))?;
        } else if self.next_if_token(Token::Keyword(Keyword::Join)).is_none() {
            return Ok(None);
        }

        let right_table = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::On))?;

        let (left_qualifier, left_column) = self.next_qualified_ref()?;
        self.next_expect(Token::Equal)?;
        let (right_qualifier, right_column) = self.next_qualified_ref()?;

        // The ON sides must name the FROM table and the joined table
        if left_qualifier != left_table || right_qualifier != right_table {
            return Err(Error::Parse(format!(
                "[Parser] Join condition must be {}.<column> = {}.<column>",
                left_table, right_table
            )));
        }

        Ok(Some(JoinClause {
            right_table,
            left_column,
            right_column,
        }))
    }

    /// Parses UPDATE statement
    fn parse_update(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Update))?;
        let table_name = self.next_ident()?;
        self.next_expect(Token::Keyword(Keyword::Set))?;

        let mut assignments: Vec<(String, Value)> = Vec::new();
        loop {
            let column = self.next_ident()?;
            self.next_expect(Token::Equal)?;
            let value = self.parse_literal()?;
            // Assigning the same column twice in one SET list is an error
            if assignments.iter().any(|(name, _)| *name == column) {
                return Err(Error::Parse(format!(
                    "[Parser] Duplicate column {} for update",
                    column
                )));
            }
            assignments.push((column, value));
            if self.next_if_token(Token::Comma).is_none() {
                break;
            }
        }

        Ok(Statement::Update {
            table_name,
            assignments,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// Parses DELETE statement
    fn parse_delete(&mut self) -> Result<Statement> {
        self.next_expect(Token::Keyword(Keyword::Delete))?;
        self.next_expect(Token::Keyword(Keyword::From))?;
        let table_name = self.next_ident()?;
        Ok(Statement::Delete {
            table_name,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// Parses an optional `WHERE <column> (= | != | > | <) <literal>`
    fn parse_where_clause(&mut self) -> Result<Option<Condition>> {
        if self.next_if_token(Token::Keyword(Keyword::Where)).is_none() {
            return Ok(None);
        }
        let column = self.next_column_ref()?;
        let op = match self.next()? {
            Token::Equal => CompareOp::Equal,
            Token::NotEqual => CompareOp::NotEqual,
            Token::GreaterThan => CompareOp::GreaterThan,
            Token::LessThan => CompareOp::LessThan,
            token => {
                return Err(Error::Parse(format!(
                    "[Parser] Expected comparison operator, got {}",
                    token
                )))
            }
        };
        let value = self.parse_literal()?;
        Ok(Some(Condition { column, op, value }))
    }

    /// Parses a literal value
    fn parse_literal(&mut self) -> Result<Value> {
        Ok(match self.next()? {
            Token::Number(n) => Value::Integer(n.parse()?),
            Token::String(s) => Value::String(s),
            Token::Keyword(Keyword::True) => Value::Boolean(true),
            Token::Keyword(Keyword::False) => Value::Boolean(false),
            Token::Keyword(Keyword::Null) => Value::Null,
            // A bare word in literal position falls back to a raw string
            Token::Ident(s) => Value::String(s),
            t => {
                return Err(Error::Parse(format!(
                    "[Parser] Unexpected literal token {}",
                    t
                )))
            }
        })
    }

    /// Peeks at the next token
    fn peek(&mut self) -> Result<Option<Token>> {
        self.lexer.peek().cloned().transpose()
    }

    /// Consumes and returns the next token
    fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .unwrap_or_else(|| Err(Error::Parse("[Parser] Unexpected end of input".to_string())))
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(Error::Parse(format!(
                "[Parser] Expected ident, got token {}",
                token
            ))),
        }
    }

    /// Consumes a column reference, either `column` or `table.column`
    fn next_column_ref(&mut self) -> Result<String> {
        let first = self.next_ident()?;
        if self.next_if_token(Token::Period).is_some() {
            let second = self.next_ident()?;
            Ok(format!("{}.{}", first, second))
        } else {
            Ok(first)
        }
    }

    /// Consumes a `table.column` reference
    fn next_qualified_ref(&mut self) -> Result<(String, String)> {
        let table = self.next_ident()?;
        self.next_expect(Token::Period)?;
        let column = self.next_ident()?;
        Ok((table, column))
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::Parse(format!(
                "[Parser] Expected token {}, got {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes next token if it satisfies the predicate
    fn next_if<F: Fn(&Token) -> bool>(&mut self, predicate: F) -> Option<Token> {
        self.peek().unwrap_or(None).filter(|t| predicate(t))?;
        self.next().ok()
    }

    /// Consumes next token if it's a keyword
    fn next_if_keyword(&mut self) -> Option<Token> {
        self.next_if(|t| matches!(t, Token::Keyword(_)))
    }

    /// Consumes next token if it matches the given token
    fn next_if_token(&mut self, token: Token) -> Option<Token> {
        self.next_if(|t| t == &token)
    }
}
