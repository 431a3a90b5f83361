use crate::{
    ast::{
        BinOp, DataType, Dimension, Expr, Field, Fill, Measurement, MeasurementName, Query,
        SelectStatement, SortOrder, Source, Token,
    },
    lexer::{LexError, Lexer, Position},
};
use std::mem;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("found {found}, expected {expected} at {position}")]
    Unexpected {
        found: String,
        expected: String,
        position: Position,
    },

    #[error("{message} at {position}")]
    Invalid { message: String, position: Position },
}

/// Parse query text into its statements.
pub fn parse_query(text: &str) -> Result<Query, ParseError> {
    Parser::new(Lexer::new(text))?.parse_query()
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(&expected.to_string()));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    /// Unquoted words that are not reserved (`fill`, `tz`, `time`).
    fn check_word(&self, word: &str) -> bool {
        matches!(&self.current_token, Token::Identifier(name) if name.eq_ignore_ascii_case(word))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::Unexpected {
            found: self.current_token.to_string(),
            expected: expected.to_string(),
            position: self.lexer.token_position(),
        }
    }

    fn invalid(&self, message: impl Into<String>) -> ParseError {
        ParseError::Invalid {
            message: message.into(),
            position: self.lexer.token_position(),
        }
    }

    /// Parse semicolon-separated statements until the end of input.
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        let mut statements = Vec::new();
        loop {
            while self.check(&Token::Semicolon) {
                self.advance()?;
            }
            if self.check(&Token::Eof) {
                break;
            }
            statements.push(self.parse_statement()?);
            if !self.check(&Token::Semicolon) && !self.check(&Token::Eof) {
                return Err(self.unexpected(";"));
            }
        }
        Ok(Query { statements })
    }

    pub fn parse_statement(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect(Token::Select)?;
        let mut stmt = SelectStatement {
            fields: self.parse_fields()?,
            ..SelectStatement::default()
        };

        self.expect(Token::From)?;
        stmt.sources = self.parse_sources()?;

        if self.check(&Token::Where) {
            self.advance()?;
            stmt.condition = Some(self.parse_expression()?);
        }

        if self.check(&Token::Group) {
            self.advance()?;
            self.expect(Token::By)?;
            stmt.dimensions = self.parse_dimensions()?;
        }

        if self.check_word("fill") {
            stmt.fill = self.parse_fill()?;
        }

        if self.check(&Token::Order) {
            self.advance()?;
            self.expect(Token::By)?;
            stmt.order = Some(self.parse_sort_order()?);
        }

        if self.check(&Token::Limit) {
            self.advance()?;
            stmt.limit = Some(self.parse_non_negative_int()?);
        }
        if self.check(&Token::Offset) {
            self.advance()?;
            stmt.offset = Some(self.parse_non_negative_int()?);
        }
        if self.check(&Token::SLimit) {
            self.advance()?;
            stmt.slimit = Some(self.parse_non_negative_int()?);
        }
        if self.check(&Token::SOffset) {
            self.advance()?;
            stmt.soffset = Some(self.parse_non_negative_int()?);
        }

        if self.check_word("tz") {
            self.advance()?;
            self.expect(Token::LParen)?;
            match mem::replace(&mut self.current_token, Token::Eof) {
                Token::String(zone) => {
                    self.advance()?;
                    stmt.location = Some(zone);
                }
                token => {
                    self.current_token = token;
                    return Err(self.unexpected("string"));
                }
            }
            self.expect(Token::RParen)?;
        }

        Ok(stmt)
    }

    fn parse_fields(&mut self) -> Result<Vec<Field>, ParseError> {
        let mut fields = vec![self.parse_field()?];
        while self.check(&Token::Comma) {
            self.advance()?;
            fields.push(self.parse_field()?);
        }
        Ok(fields)
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let expr = self.parse_expression()?;
        let mut field = Field::new(expr);
        if self.check(&Token::As) {
            self.advance()?;
            field.alias = Some(self.parse_ident()?);
        }
        Ok(field)
    }

    fn parse_ident(&mut self) -> Result<String, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            token => {
                self.current_token = token;
                Err(self.unexpected("identifier"))
            }
        }
    }

    fn parse_sources(&mut self) -> Result<Vec<Source>, ParseError> {
        let mut sources = vec![self.parse_source()?];
        while self.check(&Token::Comma) {
            self.advance()?;
            sources.push(self.parse_source()?);
        }
        Ok(sources)
    }

    /// `measurement`, `db..measurement`, `db.rp.measurement`, `rp.measurement`,
    /// `/regex/` or a parenthesised subquery.
    fn parse_source(&mut self) -> Result<Source, ParseError> {
        if self.check(&Token::LParen) {
            self.advance()?;
            let stmt = self.parse_statement()?;
            self.expect(Token::RParen)?;
            return Ok(Source::Subquery(Box::new(stmt)));
        }

        let mut segments: Vec<Option<String>> = Vec::new();
        let mut regex = None;
        loop {
            match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(name) => {
                    self.advance()?;
                    segments.push(Some(name));
                }
                Token::Slash => {
                    let pattern = self.lexer.read_regex()?;
                    self.advance()?;
                    regex = Some(pattern);
                    break;
                }
                token => {
                    self.current_token = token;
                    segments.push(None);
                }
            }
            if !self.check(&Token::Dot) {
                break;
            }
            self.advance()?;
        }

        let name = match regex {
            Some(pattern) => MeasurementName::Regex(pattern),
            None => match segments.pop().flatten() {
                Some(name) => MeasurementName::Name(name),
                None => return Err(self.unexpected("identifier")),
            },
        };
        if segments.len() > 2 {
            return Err(self.invalid("too many segments in measurement name"));
        }

        let (database, retention_policy) = match segments.as_slice() {
            [] => (None, None),
            [rp] => (None, rp.clone()),
            [db, rp] => (db.clone(), rp.clone()),
            _ => (None, None),
        };
        Ok(Source::Measurement(Measurement {
            database,
            retention_policy,
            name,
        }))
    }

    fn parse_dimensions(&mut self) -> Result<Vec<Dimension>, ParseError> {
        let mut dimensions = vec![Dimension {
            expr: self.parse_expression()?,
        }];
        while self.check(&Token::Comma) {
            self.advance()?;
            dimensions.push(Dimension {
                expr: self.parse_expression()?,
            });
        }
        Ok(dimensions)
    }

    fn parse_fill(&mut self) -> Result<Fill, ParseError> {
        self.advance()?;
        self.expect(Token::LParen)?;
        if self.check(&Token::Minus) {
            match self.lexer.read_negative_number()? {
                Some(number) => self.current_token = number,
                None => {
                    self.advance()?;
                    return Err(self.unexpected("a number"));
                }
            }
        }
        let fill = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(option) => {
                match option.to_ascii_lowercase().as_str() {
                    "null" => Fill::Null,
                    "none" => Fill::None,
                    "previous" => Fill::Previous,
                    "linear" => Fill::Linear,
                    _ => {
                        self.current_token = Token::Identifier(option);
                        return Err(self.unexpected("null, none, previous, linear or a number"));
                    }
                }
            }
            Token::Integer(n) => Fill::Integer(n),
            Token::Float(n) => Fill::Number(n),
            token => {
                self.current_token = token;
                return Err(self.unexpected("null, none, previous, linear or a number"));
            }
        };
        self.advance()?;
        self.expect(Token::RParen)?;
        Ok(fill)
    }

    fn parse_sort_order(&mut self) -> Result<SortOrder, ParseError> {
        // A bare direction sorts by time.
        if !self.check(&Token::Asc) && !self.check(&Token::Desc) {
            if !self.check_word("time") {
                return Err(self.invalid("only ORDER BY time supported at this time"));
            }
            self.advance()?;
        }
        let order = if self.check(&Token::Desc) {
            self.advance()?;
            SortOrder::Descending
        } else {
            if self.check(&Token::Asc) {
                self.advance()?;
            }
            SortOrder::Ascending
        };
        if self.check(&Token::Comma) {
            return Err(self.invalid("only ORDER BY time supported at this time"));
        }
        Ok(order)
    }

    fn parse_non_negative_int(&mut self) -> Result<i64, ParseError> {
        match self.current_token {
            Token::Integer(n) => {
                self.advance()?;
                Ok(n)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    /// Parse an expression, lowest precedence first.
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.check(&Token::Or) {
            self.advance()?;
            let rhs = self.parse_and()?;
            lhs = Expr::binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        while self.check(&Token::And) {
            self.advance()?;
            let rhs = self.parse_comparison()?;
            lhs = Expr::binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.current_token {
                Token::Eq => BinOp::Equal,
                Token::NotEq => BinOp::NotEqual,
                Token::EqRegex => BinOp::RegexMatch,
                Token::NotEqRegex => BinOp::RegexNotMatch,
                Token::Lt => BinOp::LessThan,
                Token::LtEq => BinOp::LessEqual,
                Token::Gt => BinOp::GreaterThan,
                Token::GtEq => BinOp::GreaterEqual,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_additive()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current_token {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// Unary minus folds into numeric and duration literals; anything else
    /// becomes `-1 * operand`.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Plus) {
            self.advance()?;
            return self.parse_unary();
        }
        if !self.check(&Token::Minus) {
            return self.parse_primary();
        }
        if let Some(number) = self.lexer.read_negative_number()? {
            self.current_token = number;
            return self.parse_primary();
        }
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::binary(BinOp::Multiply, Expr::Integer(-1), operand))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            // Literals
            Token::Integer(n) => {
                self.advance()?;
                Ok(Expr::Integer(n))
            }
            Token::Float(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Expr::Boolean(b))
            }
            Token::Duration(d) => {
                self.advance()?;
                Ok(Expr::Duration(d))
            }

            Token::Star => {
                self.advance()?;
                Ok(Expr::Wildcard)
            }

            // A slash in operand position opens a regex
            Token::Slash => {
                let pattern = self.lexer.read_regex()?;
                self.advance()?;
                Ok(Expr::Regex(pattern))
            }

            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Paren(Box::new(expr)))
            }

            Token::Identifier(name) => {
                self.advance()?;
                if self.check(&Token::LParen) {
                    self.advance()?;
                    let args = self.parse_call_args()?;
                    return Ok(Expr::call(name.to_ascii_lowercase(), args));
                }
                if name.eq_ignore_ascii_case("distinct") {
                    if let Token::Identifier(field) = &self.current_token {
                        let field = field.clone();
                        self.advance()?;
                        return Ok(Expr::Distinct(field));
                    }
                }
                let data_type = self.parse_type_hint()?;
                Ok(Expr::VarRef { name, data_type })
            }

            token => {
                self.current_token = token;
                Err(self.unexpected("identifier, string, number, bool"))
            }
        }
    }

    /// Arguments after the opening parenthesis, through the closing one.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&Token::RParen) {
            self.advance()?;
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.check(&Token::Comma) {
                self.advance()?;
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }

    fn parse_type_hint(&mut self) -> Result<Option<DataType>, ParseError> {
        if !self.check(&Token::DoubleColon) {
            return Ok(None);
        }
        self.advance()?;
        let hint = match &self.current_token {
            Token::Identifier(name) => DataType::from_name(name),
            _ => None,
        };
        match hint {
            Some(data_type) => {
                self.advance()?;
                Ok(Some(data_type))
            }
            None => Err(self.unexpected("float, integer, string, boolean, field, tag")),
        }
    }
}
