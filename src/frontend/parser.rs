// Recursive-descent parser producing the Surface AST of ast.rs.
//
// Not part of the hard core: it exists so the pipeline is exercisable from
// real Source text (see SPEC_FULL.md §1 ADDITIONS). Its own bugs are
// ordinary parser bugs, not pipeline-invariant violations.

use super::ast::*;
use super::lexer::{Lexer, Token};
use crate::diagnostics::{ParseError, Span};

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(source: &str) -> PResult<Module> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser::new(tokens);
        parser.parse_module()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn advance(&mut self) -> (Token, Span) {
        let item = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> PResult<Span> {
        if *self.peek() == expected {
            Ok(self.advance().1)
        } else if *self.peek() == Token::Eof {
            Err(ParseError::UnexpectedEof { expected: what })
        } else {
            let (found, span) = self.advance();
            Err(ParseError::UnexpectedToken { found: found.to_string(), expected: what, span })
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, Span)> {
        match self.peek().clone() {
            Token::Ident(name) => {
                let (_, span) = self.advance();
                Ok((name, span))
            }
            Token::Eof => Err(ParseError::UnexpectedEof { expected: "identifier" }),
            other => {
                let span = self.peek_span();
                self.advance();
                Err(ParseError::UnexpectedToken { found: other.to_string(), expected: "identifier", span })
            }
        }
    }

    pub fn parse_module(&mut self) -> PResult<Module> {
        let mut body = Vec::new();
        while *self.peek() != Token::Eof {
            body.push(self.parse_statement()?);
        }
        Ok(Module { body })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(Token::LBrace, "`{`")?;
        let mut stmts = Vec::new();
        while *self.peek() != Token::RBrace {
            stmts.push(self.parse_statement()?);
        }
        self.expect(Token::RBrace, "`}`")?;
        Ok(stmts)
    }

    fn parse_params(&mut self) -> PResult<Vec<String>> {
        self.expect(Token::LParen, "`(`")?;
        let mut params = Vec::new();
        if *self.peek() != Token::RParen {
            loop {
                params.push(self.expect_ident()?.0);
                if *self.peek() == Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "`)`")?;
        Ok(params)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.peek().clone() {
            Token::Def => {
                let start = self.advance().1;
                let (name, _) = self.expect_ident()?;
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                let span = start;
                Ok(Stmt::FunctionDef { name, params, body, span })
            }
            Token::If => {
                let start = self.advance().1;
                self.expect(Token::LParen, "`(`")?;
                let test = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                let body = self.parse_block()?;
                let orelse = if *self.peek() == Token::Else {
                    self.advance();
                    if *self.peek() == Token::If {
                        vec![self.parse_statement()?]
                    } else {
                        self.parse_block()?
                    }
                } else {
                    Vec::new()
                };
                Ok(Stmt::If { test, body, orelse, span: start })
            }
            Token::While => {
                let start = self.advance().1;
                self.expect(Token::LParen, "`(`")?;
                let test = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                let body = self.parse_block()?;
                Ok(Stmt::While { test, body, span: start })
            }
            Token::Break => {
                let span = self.advance().1;
                self.expect(Token::Semicolon, "`;`")?;
                Ok(Stmt::Break(span))
            }
            Token::Return => {
                let span = self.advance().1;
                let value = if *self.peek() == Token::Semicolon { None } else { Some(self.parse_expr()?) };
                self.expect(Token::Semicolon, "`;`")?;
                Ok(Stmt::Return { value, span })
            }
            _ => {
                let expr = self.parse_expr()?;
                if *self.peek() == Token::Eq {
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect(Token::Semicolon, "`;`")?;
                    let target = lvalue_from_expr(expr)?;
                    let span = target.span();
                    Ok(Stmt::Assign { target, value, span })
                } else {
                    self.expect(Token::Semicolon, "`;`")?;
                    Ok(Stmt::Expr(expr))
                }
            }
        }
    }

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> PResult<Expr> {
        let body = self.parse_or()?;
        if *self.peek() == Token::If {
            let span = self.advance().1;
            let test = self.parse_or()?;
            self.expect(Token::Else, "`else`")?;
            let orelse = self.parse_ternary()?;
            Ok(Expr::IfExp { test: Box::new(test), body: Box::new(body), orelse: Box::new(orelse), span })
        } else {
            Ok(body)
        }
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let first = self.parse_and()?;
        let mut values = vec![first];
        let mut span = values[0].span();
        while *self.peek() == Token::Or {
            self.advance();
            let next = self.parse_and()?;
            span = span.join(next.span());
            values.push(next);
        }
        if values.len() == 1 {
            Ok(values.into_iter().next().unwrap())
        } else {
            Ok(Expr::BoolOp { op: BoolOp::Or, values, span })
        }
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let first = self.parse_not()?;
        let mut values = vec![first];
        let mut span = values[0].span();
        while *self.peek() == Token::And {
            self.advance();
            let next = self.parse_not()?;
            span = span.join(next.span());
            values.push(next);
        }
        if values.len() == 1 {
            Ok(values.into_iter().next().unwrap())
        } else {
            Ok(Expr::BoolOp { op: BoolOp::And, values, span })
        }
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if *self.peek() == Token::Not {
            let span = self.advance().1;
            let operand = self.parse_not()?;
            let span = span.join(operand.span());
            Ok(Expr::UnaryOp { op: UnaryOp::Not, operand: Box::new(operand), span })
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let left = self.parse_bitxor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        let mut span = left.span();
        loop {
            let op = match self.peek() {
                Token::EqEq => CmpOp::Eq,
                Token::NotEq => CmpOp::NotEq,
                Token::Lt => CmpOp::Lt,
                Token::LtE => CmpOp::LtE,
                Token::Gt => CmpOp::Gt,
                Token::GtE => CmpOp::GtE,
                Token::Is => CmpOp::Is,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_bitxor()?;
            span = span.join(rhs.span());
            ops.push(op);
            comparators.push(rhs);
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare { left: Box::new(left), ops, comparators, span })
        }
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_add()?;
        while *self.peek() == Token::Caret {
            self.advance();
            let right = self.parse_add()?;
            let span = left.span().join(right.span());
            left = Expr::BinOp { op: BinOp::BitXor, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_add(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        while *self.peek() == Token::Plus {
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span().join(right.span());
            left = Expr::BinOp { op: BinOp::Add, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if *self.peek() == Token::Minus {
            let span = self.advance().1;
            let operand = self.parse_unary()?;
            let span = span.join(operand.span());
            Ok(Expr::UnaryOp { op: UnaryOp::USub, operand: Box::new(operand), span })
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut e = self.parse_primary()?;
        loop {
            if *self.peek() == Token::LBracket {
                self.advance();
                let index = self.parse_expr()?;
                let end = self.expect(Token::RBracket, "`]`")?;
                let span = e.span().join(end);
                e = Expr::Subscript { value: Box::new(e), index: Box::new(index), ctx: Ctx::Load, span };
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            Token::Int(n) => {
                let span = self.advance().1;
                Ok(Expr::Constant(Constant::Int(n), span))
            }
            Token::True => {
                let span = self.advance().1;
                Ok(Expr::Constant(Constant::Bool(true), span))
            }
            Token::False => {
                let span = self.advance().1;
                Ok(Expr::Constant(Constant::Bool(false), span))
            }
            Token::LParen => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(e)
            }
            Token::LBracket => {
                let start = self.advance().1;
                let mut elts = Vec::new();
                if *self.peek() != Token::RBracket {
                    loop {
                        elts.push(self.parse_expr()?);
                        if *self.peek() == Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let end = self.expect(Token::RBracket, "`]`")?;
                Ok(Expr::List { elts, span: start.join(end) })
            }
            Token::LBrace => {
                let start = self.advance().1;
                let mut keys = Vec::new();
                let mut values = Vec::new();
                if *self.peek() != Token::RBrace {
                    loop {
                        let k = self.parse_expr()?;
                        self.expect(Token::Colon, "`:`")?;
                        let v = self.parse_expr()?;
                        keys.push(k);
                        values.push(v);
                        if *self.peek() == Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                let end = self.expect(Token::RBrace, "`}`")?;
                Ok(Expr::Dict { keys, values, span: start.join(end) })
            }
            Token::Lambda => {
                let start = self.advance().1;
                let mut params = Vec::new();
                if *self.peek() != Token::Colon {
                    loop {
                        params.push(self.expect_ident()?.0);
                        if *self.peek() == Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::Colon, "`:`")?;
                let body = self.parse_expr()?;
                let span = start.join(body.span());
                Ok(Expr::Lambda { params, body: Box::new(body), span })
            }
            Token::Ident(name) => {
                let span = self.advance().1;
                if *self.peek() == Token::LParen {
                    self.advance();
                    let mut args = Vec::new();
                    if *self.peek() != Token::RParen {
                        loop {
                            args.push(self.parse_expr()?);
                            if *self.peek() == Token::Comma {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    let end = self.expect(Token::RParen, "`)`")?;
                    Ok(Expr::Call { callee: name, args, span: span.join(end) })
                } else {
                    Ok(Expr::Name(name, Ctx::Load, span))
                }
            }
            Token::Eof => Err(ParseError::UnexpectedEof { expected: "expression" }),
            other => {
                let span = self.peek_span();
                self.advance();
                Err(ParseError::UnexpectedToken { found: other.to_string(), expected: "expression", span })
            }
        }
    }
}

fn lvalue_from_expr(e: Expr) -> PResult<LValue> {
    match e {
        Expr::Name(name, _, span) => Ok(LValue::Name(name, span)),
        Expr::Subscript { value, index, span, .. } => Ok(LValue::Subscript { value, index, span }),
        other => Err(ParseError::UnexpectedToken {
            found: format!("{other:?}"),
            expected: "assignable expression (name or subscript)",
            span: other_span(&other),
        }),
    }
}

fn other_span(e: &Expr) -> Span {
    e.span()
}

pub fn parse(source: &str) -> PResult<Module> {
    Parser::parse_program(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_print_call() {
        let m = parse("print(1+2);").unwrap();
        assert_eq!(m.body.len(), 1);
        assert!(matches!(m.body[0], Stmt::Expr(Expr::Call { .. })));
    }

    #[test]
    fn parses_assignment_and_while() {
        let m = parse("x = 0; while (x < 10) { x = x + 1; }").unwrap();
        assert_eq!(m.body.len(), 2);
        assert!(matches!(m.body[0], Stmt::Assign { .. }));
        assert!(matches!(m.body[1], Stmt::While { .. }));
    }

    #[test]
    fn parses_function_def_and_lambda() {
        let m = parse("f = lambda x: x + 1; print(f(41));").unwrap();
        assert_eq!(m.body.len(), 2);
    }

    #[test]
    fn parses_chained_comparison() {
        let m = parse("print(a < b < c);").unwrap();
        if let Stmt::Expr(Expr::Call { args, .. }) = &m.body[0] {
            assert!(matches!(&args[0], Expr::Compare { ops, .. } if ops.len() == 2));
        } else {
            panic!("expected call");
        }
    }

    #[test]
    fn parses_subscript_assignment() {
        let m = parse("a[0] = 1;").unwrap();
        assert!(matches!(m.body[0], Stmt::Assign { target: LValue::Subscript { .. }, .. }));
    }
}
