//! Syntax tree produced by the parser and walked by the interpreter.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Binary operators. All of them are right-associative in the grammar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Ident(String),
    /// `base.a.b`; only a bare identifier can start a field chain.
    Field {
        base: String,
        fields: Vec<String>,
    },
    /// `let name = value; next`
    Let {
        name: String,
        value: Box<Expr>,
        next: Box<Expr>,
    },
    /// `\param: body`. The body is shared with every closure made from it.
    Lambda {
        param: String,
        body: Rc<Expr>,
    },
    Record(IndexMap<String, Expr>),
    List(Vec<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Juxtaposition: `callee a b c`, applied one argument at a time.
    Apply {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `seed | stage | stage`
    Pipe {
        seed: Box<Expr>,
        stages: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}
