use super::lexer::{tokenize, Spanned, Token};
use super::ScriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Name(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Conditional {
        then: Box<Expr>,
        cond: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Assignment target: a variable, optionally followed by index steps.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Target {
    pub(crate) name: String,
    pub(crate) indices: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Pass,
    Expr(Expr),
    Assign {
        target: Target,
        op: Option<BinOp>,
        value: Expr,
    },
}

pub(crate) fn parse_program(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut stmts = Vec::new();
    loop {
        parser.skip_newlines();
        if parser.at(&Token::Eof) {
            return Ok(stmts);
        }
        stmts.push(parser.statement()?);
        if !parser.at(&Token::Eof) {
            parser.expect(&Token::Newline, "end of statement")?;
        }
    }
}

pub(crate) fn parse_expression(source: &str) -> Result<Expr, ScriptError> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.skip_newlines();
    let expr = parser.expression()?;
    parser.skip_newlines();
    parser.expect(&Token::Eof, "end of expression")?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ScriptError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ScriptError {
        let found = match self.peek() {
            Token::Eof => "end of input".to_string(),
            Token::Newline => "end of line".to_string(),
            other => format!("{other:?}"),
        };
        ScriptError::syntax(format!("expected {what}, found {found}"), self.offset())
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        if self.eat(&Token::Pass) {
            return Ok(Stmt::Pass);
        }
        let start = self.offset();
        let expr = self.expression()?;
        let op = match self.peek() {
            Token::Assign => None,
            Token::PlusAssign => Some(BinOp::Add),
            Token::MinusAssign => Some(BinOp::Sub),
            Token::StarAssign => Some(BinOp::Mul),
            Token::SlashAssign => Some(BinOp::Div),
            Token::SlashSlashAssign => Some(BinOp::FloorDiv),
            Token::PercentAssign => Some(BinOp::Mod),
            Token::StarStarAssign => Some(BinOp::Pow),
            _ => return Ok(Stmt::Expr(expr)),
        };
        self.advance();
        let target = into_target(expr)
            .ok_or_else(|| ScriptError::syntax("cannot assign to expression", start))?;
        let value = self.expression()?;
        Ok(Stmt::Assign { target, op, value })
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        let then = self.or_expr()?;
        if !self.eat(&Token::If) {
            return Ok(then);
        }
        let cond = self.or_expr()?;
        self.expect(&Token::Else, "'else'")?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional {
            then: Box::new(then),
            cond: Box::new(cond),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(&Token::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Token::EqEq => CmpOp::Eq,
                Token::NotEq => CmpOp::NotEq,
                Token::Lt => CmpOp::Lt,
                Token::Le => CmpOp::Le,
                Token::Gt => CmpOp::Gt,
                Token::Ge => CmpOp::Ge,
                Token::In => CmpOp::In,
                Token::Not => {
                    self.advance();
                    if !self.at(&Token::In) {
                        return Err(self.unexpected("'in' after 'not'"));
                    }
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn arith(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::SlashSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn factor(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.factor()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn power(&mut self) -> Result<Expr, ScriptError> {
        let base = self.postfix()?;
        if !self.eat(&Token::StarStar) {
            return Ok(base);
        }
        // Right-associative and binds tighter than a unary minus on its left.
        let exponent = self.factor()?;
        Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)))
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                Token::LParen => {
                    let Expr::Name(name) = expr else {
                        return Err(ScriptError::syntax(
                            "only named functions can be called",
                            self.offset(),
                        ));
                    };
                    self.advance();
                    let args = self.sequence(&Token::RParen)?;
                    expr = Expr::Call(name, args);
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&Token::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: &Token) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                self.expect(close, "',' or closing bracket")?;
                break;
            }
        }
        Ok(items)
    }

    fn atom(&mut self) -> Result<Expr, ScriptError> {
        let expr = match self.peek().clone() {
            Token::Int(value) => Expr::Int(value),
            Token::Float(value) => Expr::Float(value),
            Token::Str(value) => {
                self.advance();
                let mut joined = value;
                while let Token::Str(next) = self.peek().clone() {
                    joined.push_str(&next);
                    self.advance();
                }
                return Ok(Expr::Str(joined));
            }
            Token::Name(name) => Expr::Name(name),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::None => Expr::None,
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => {
                self.advance();
                return Ok(Expr::List(self.sequence(&Token::RBracket)?));
            }
            Token::LBrace => {
                self.advance();
                return self.map_literal();
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn map_literal(&mut self) -> Result<Expr, ScriptError> {
        let mut entries = Vec::new();
        while !self.eat(&Token::RBrace) {
            let key = self.expression()?;
            self.expect(&Token::Colon, "':'")?;
            let value = self.expression()?;
            entries.push((key, value));
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RBrace, "',' or '}'")?;
                break;
            }
        }
        Ok(Expr::Map(entries))
    }
}

fn into_target(expr: Expr) -> Option<Target> {
    match expr {
        Expr::Name(name) => Some(Target {
            name,
            indices: Vec::new(),
        }),
        Expr::Index(base, index) => {
            let mut target = into_target(*base)?;
            target.indices.push(*index);
            Some(target)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_binds_tighter_than_unary_minus() {
        let expr = parse_expression("-2 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(
                    BinOp::Pow,
                    Box::new(Expr::Int(2)),
                    Box::new(Expr::Int(2))
                ))
            )
        );
    }

    #[test]
    fn parses_augmented_and_indexed_assignment() {
        let program = parse_program("x *= 1.1\ngrid[0][1] = 'a'").unwrap();
        assert_eq!(program.len(), 2);
        assert!(matches!(
            &program[0],
            Stmt::Assign { target, op: Some(BinOp::Mul), .. } if target.name == "x"
        ));
        assert!(matches!(
            &program[1],
            Stmt::Assign { target, op: None, .. } if target.indices.len() == 2
        ));
    }

    #[test]
    fn parses_conditional_and_not_in() {
        let expr = parse_expression("'big' if x not in [1, 2] else 'small'").unwrap();
        let Expr::Conditional { cond, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*cond, Expr::Compare(_, ref rest) if rest[0].0 == CmpOp::NotIn));
    }

    #[test]
    fn rejects_assignment_to_call() {
        let err = parse_program("f(x) = 1").unwrap_err();
        assert!(err.to_string().contains("cannot assign"), "{err}");
    }

    #[test]
    fn rejects_trailing_tokens_in_expression() {
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("x = 1").is_err());
    }
}
