use crate::ast::*;
use crate::error::{LangError, ParseError};
use crate::lexer::{tokenize, Token, TokenStream};
use indexmap::IndexMap;
use std::rc::Rc;

/// Parse a token sequence into an expression.
///
/// Tokens left over after a complete expression are ignored.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    let mut stream = TokenStream::new(tokens);
    let expr = parse_expr(&mut stream)?;
    if !stream.remaining().is_empty() {
        log::trace!(
            "ignoring {} trailing token(s) after expression",
            stream.remaining().len()
        );
    }
    Ok(expr)
}

/// Lex and parse source text in one step.
pub fn parse_source(input: &str) -> Result<Expr, LangError> {
    let tokens = tokenize(input)?;
    Ok(parse(tokens)?)
}

/// Tokens that may begin a juxtaposed argument.
fn starts_argument(token: Option<&Token>) -> bool {
    matches!(
        token,
        Some(
            Token::Number(_)
                | Token::String(_)
                | Token::LBrace
                | Token::LBracket
                | Token::Backslash
                | Token::Let
                | Token::Ident(_)
                | Token::LParen
                | Token::If
        )
    )
}

// ── Precedence levels, loosest first ────────────────────────────────

/// `apply ('|' apply)*`
fn parse_expr(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    let seed = parse_apply(tokens)?;
    if tokens.peek() != Some(&Token::Pipe) {
        return Ok(seed);
    }
    let mut stages = Vec::new();
    while tokens.eat(&Token::Pipe) {
        stages.push(parse_apply(tokens)?);
    }
    Ok(Expr::Pipe {
        seed: Box::new(seed),
        stages,
    })
}

/// `equality equality*`: the callee and each argument are equality-level.
fn parse_apply(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    let callee = parse_equality(tokens)?;
    if !starts_argument(tokens.peek()) {
        return Ok(callee);
    }
    let mut args = Vec::new();
    while starts_argument(tokens.peek()) {
        args.push(parse_equality(tokens)?);
    }
    Ok(Expr::Apply {
        callee: Box::new(callee),
        args,
    })
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn parse_equality(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    let left = parse_additive(tokens)?;
    if tokens.eat(&Token::EqEq) {
        let right = parse_equality(tokens)?;
        return Ok(binary(BinaryOp::Eq, left, right));
    }
    Ok(left)
}

/// Right-recursive: `10 - 3 - 2` is `10 - (3 - 2)`.
fn parse_additive(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    let left = parse_multiplicative(tokens)?;
    let op = match tokens.peek() {
        Some(Token::Plus) => BinaryOp::Add,
        Some(Token::Minus) => BinaryOp::Sub,
        _ => return Ok(left),
    };
    tokens.advance();
    let right = parse_additive(tokens)?;
    Ok(binary(op, left, right))
}

fn parse_multiplicative(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    let left = parse_atom(tokens)?;
    let op = match tokens.peek() {
        Some(Token::Star) => BinaryOp::Mul,
        Some(Token::Slash) => BinaryOp::Div,
        Some(Token::Percent) => BinaryOp::Rem,
        _ => return Ok(left),
    };
    tokens.advance();
    let right = parse_multiplicative(tokens)?;
    Ok(binary(op, left, right))
}

// ── Atoms ───────────────────────────────────────────────────────────

fn parse_atom(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    match tokens.peek() {
        Some(Token::Number(n)) => {
            let n = *n;
            tokens.advance();
            Ok(Expr::Number(n))
        }
        Some(Token::String(s)) => {
            let s = s.clone();
            tokens.advance();
            Ok(Expr::String(s))
        }
        Some(Token::Backslash) => parse_lambda(tokens),
        Some(Token::Let) => parse_let(tokens),
        Some(Token::If) => parse_if(tokens),
        Some(Token::Ident(_)) => parse_ident(tokens),
        Some(Token::LParen) => {
            tokens.advance();
            let inner = parse_expr(tokens)?;
            tokens.expect(&Token::RParen)?;
            Ok(inner)
        }
        Some(Token::LBrace) => parse_record(tokens),
        Some(Token::LBracket) => parse_list(tokens),
        _ => Err(tokens.unexpected(
            "number, string, lambda, let, if, ident, record, list or grouped () expression",
        )),
    }
}

/// `\name: body`
fn parse_lambda(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    tokens.expect(&Token::Backslash)?;
    let param = tokens.expect_ident()?;
    tokens.expect(&Token::Colon)?;
    let body = parse_expr(tokens)?;
    Ok(Expr::Lambda {
        param,
        body: Rc::new(body),
    })
}

/// `let name = value; next`
fn parse_let(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    tokens.expect(&Token::Let)?;
    let name = tokens.expect_ident()?;
    tokens.expect(&Token::Assign)?;
    let value = parse_expr(tokens)?;
    tokens.expect(&Token::Semicolon)?;
    let next = parse_expr(tokens)?;
    Ok(Expr::Let {
        name,
        value: Box::new(value),
        next: Box::new(next),
    })
}

/// `if cond then a else b`
fn parse_if(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    tokens.expect(&Token::If)?;
    let cond = parse_expr(tokens)?;
    tokens.expect(&Token::Then)?;
    let then = parse_expr(tokens)?;
    tokens.expect(&Token::Else)?;
    let otherwise = parse_expr(tokens)?;
    Ok(Expr::If {
        cond: Box::new(cond),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    })
}

/// An identifier, optionally followed by a `.field` chain.
fn parse_ident(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    let base = tokens.expect_ident()?;
    if tokens.peek() != Some(&Token::Dot) {
        return Ok(Expr::Ident(base));
    }
    let mut fields = Vec::new();
    while tokens.eat(&Token::Dot) {
        fields.push(tokens.expect_ident()?);
    }
    Ok(Expr::Field { base, fields })
}

/// `{ name: expr, ... }`. Empty is allowed, a trailing comma is not.
fn parse_record(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    tokens.expect(&Token::LBrace)?;
    let mut fields = IndexMap::new();
    if tokens.eat(&Token::RBrace) {
        return Ok(Expr::Record(fields));
    }
    loop {
        let name = tokens.expect_ident()?;
        tokens.expect(&Token::Colon)?;
        let value = parse_expr(tokens)?;
        fields.insert(name, value);
        if tokens.eat(&Token::RBrace) {
            return Ok(Expr::Record(fields));
        }
        if !tokens.eat(&Token::Comma) {
            return Err(tokens.unexpected("',' or '}'"));
        }
    }
}

/// `[ expr, ... ]`. Empty is allowed, a trailing comma is not.
fn parse_list(tokens: &mut TokenStream) -> Result<Expr, ParseError> {
    tokens.expect(&Token::LBracket)?;
    let mut elements = Vec::new();
    if tokens.eat(&Token::RBracket) {
        return Ok(Expr::List(elements));
    }
    loop {
        elements.push(parse_expr(tokens)?);
        if tokens.eat(&Token::RBracket) {
            return Ok(Expr::List(elements));
        }
        if !tokens.eat(&Token::Comma) {
            return Err(tokens.unexpected("',' or ']'"));
        }
    }
}
