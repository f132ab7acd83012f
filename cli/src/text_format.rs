//! A small textual IR, standing in for "the external parser" this crate's
//! builder API is meant to be driven by. Not part of the core's contract;
//! exists only so the CLI has something to compile.
//!
//! Grammar, informally:
//!
//! ```text
//! fn NAME(ARG: TYPE, ...) {
//!     var NAME: TYPE ;
//!     BODY
//! }
//! BODY    := block { INSTR* } | seq { BODY* } | fork { cond BODY case BODY* }
//!          | loop { start BODY cond BODY body BODY update BODY }
//! INSTR   := [DEST '='] OPCODE OPERAND,* ;
//! OPERAND := NAME | INTEGER | FLOAT | 'true' | 'false'
//! ```

use ssagen_frontend::{FunctionBuilder, ValueOperand};
use ssagen_ir::{CompileError, CompileResult, Component, Constant, Function, Opcode, TypeTable, Variable};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Symbol(char),
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            if c == '#' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.chars.next();
                }
                continue;
            }
            if c.is_alphabetic() || c == '_' {
                let mut s = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        s.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(s));
                continue;
            }
            if c.is_ascii_digit() || (c == '-' && self.peek_digit_after_minus()) {
                let mut s = String::new();
                if c == '-' {
                    s.push(c);
                    self.chars.next();
                }
                let mut is_float = false;
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        s.push(c);
                        self.chars.next();
                    } else if c == '.' && !is_float {
                        is_float = true;
                        s.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                if is_float {
                    tokens.push(Token::Float(s.parse().map_err(|_| format!("bad float literal {s}"))?));
                } else {
                    tokens.push(Token::Int(s.parse().map_err(|_| format!("bad integer literal {s}"))?));
                }
                continue;
            }
            match c {
                '{' | '}' | '(' | ')' | ',' | ':' | ';' | '=' => {
                    tokens.push(Token::Symbol(c));
                    self.chars.next();
                }
                _ => return Err(format!("unexpected character {c:?}")),
            }
        }
        Ok(tokens)
    }

    fn peek_digit_after_minus(&self) -> bool {
        let mut clone = self.chars.clone();
        clone.next();
        matches!(clone.peek(), Some(c) if c.is_ascii_digit())
    }
}

/// Parse `src` and build a single [`Function`] through [`FunctionBuilder`],
/// returning its lowered static form.
pub fn compile(src: &str, types: &TypeTable) -> CompileResult<ssagen_ir::static_ir::StaticFunction> {
    let tokens = Lexer::new(src)
        .tokenize()
        .map_err(|e| CompileError::MalformedInput(format!("lex error: {e}")))?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        types,
        vars: HashMap::new(),
    };
    parser.parse_function()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    types: &'a TypeTable,
    vars: HashMap<String, Variable>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, String> {
        let t = self.tokens.get(self.pos).cloned().ok_or("unexpected end of input")?;
        self.pos += 1;
        Ok(t)
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(), String> {
        match self.next()? {
            Token::Ident(s) if s == expected => Ok(()),
            other => Err(format!("expected `{expected}`, found {other:?}")),
        }
    }

    fn expect_symbol(&mut self, expected: char) -> Result<(), String> {
        match self.next()? {
            Token::Symbol(c) if c == expected => Ok(()),
            other => Err(format!("expected `{expected}`, found {other:?}")),
        }
    }

    fn take_ident(&mut self) -> Result<String, String> {
        match self.next()? {
            Token::Ident(s) => Ok(s),
            other => Err(format!("expected identifier, found {other:?}")),
        }
    }

    fn err(&self, msg: impl Into<String>) -> CompileError {
        CompileError::MalformedInput(format!("parse error: {}", msg.into()))
    }

    fn parse_function(&mut self) -> CompileResult<ssagen_ir::static_ir::StaticFunction> {
        self.expect_ident("fn").map_err(|e| self.err(e))?;
        let name = self.take_ident().map_err(|e| self.err(e))?;
        let mut func = Function::new(name, 0);

        self.expect_symbol('(').map_err(|e| self.err(e))?;
        loop {
            match self.peek() {
                Some(Token::Symbol(')')) => {
                    self.next().ok();
                    break;
                }
                _ => {
                    let arg_name = self.take_ident().map_err(|e| self.err(e))?;
                    self.expect_symbol(':').map_err(|e| self.err(e))?;
                    let ty_name = self.take_ident().map_err(|e| self.err(e))?;
                    let ty = self.resolve_type(&ty_name)?;
                    let v = func.declare_argument(arg_name.clone(), ty);
                    self.vars.insert(arg_name, v);
                    if matches!(self.peek(), Some(Token::Symbol(','))) {
                        self.next().ok();
                    }
                }
            }
        }
        self.expect_symbol('{').map_err(|e| self.err(e))?;

        while matches!(self.peek(), Some(Token::Ident(s)) if s == "var") {
            self.next().ok();
            let var_name = self.take_ident().map_err(|e| self.err(e))?;
            self.expect_symbol(':').map_err(|e| self.err(e))?;
            let ty_name = self.take_ident().map_err(|e| self.err(e))?;
            let ty = self.resolve_type(&ty_name)?;
            self.expect_symbol(';').map_err(|e| self.err(e))?;
            let v = func.declare_variable(var_name.clone(), ty);
            self.vars.insert(var_name, v);
        }

        let types_ref: &TypeTable = self.types;
        let mut builder = FunctionBuilder::new(&mut func, types_ref);
        let mut vars = self.vars.clone();
        let body = parse_body(self, &mut builder, &mut vars)?;
        builder.set_body(body);
        self.expect_symbol('}').map_err(|e| self.err(e))?;

        builder.finalize()
    }

    fn resolve_type(&self, name: &str) -> CompileResult<ssagen_ir::Type> {
        self.types
            .by_name(name)
            .ok_or_else(|| self.err(format!("unknown type `{name}`")))
    }
}

fn parse_body(
    parser: &mut Parser,
    builder: &mut FunctionBuilder,
    vars: &mut HashMap<String, Variable>,
) -> CompileResult<Component> {
    match parser.next().map_err(|e| parser.err(e))? {
        Token::Ident(kw) if kw == "block" => {
            let block = builder.create_block();
            parser.expect_symbol('{').map_err(|e| parser.err(e))?;
            while !matches!(parser.peek(), Some(Token::Symbol('}'))) {
                parse_instruction(parser, builder, vars, block)?;
            }
            parser.expect_symbol('}').map_err(|e| parser.err(e))?;
            Ok(block)
        }
        Token::Ident(kw) if kw == "seq" => {
            parser.expect_symbol('{').map_err(|e| parser.err(e))?;
            let mut children = Vec::new();
            while !matches!(parser.peek(), Some(Token::Symbol('}'))) {
                children.push(parse_body(parser, builder, vars)?);
            }
            parser.expect_symbol('}').map_err(|e| parser.err(e))?;
            if children.is_empty() {
                return Err(parser.err("seq must have at least one element"));
            }
            Ok(builder.create_sequence(children))
        }
        Token::Ident(kw) if kw == "fork" => {
            parser.expect_symbol('{').map_err(|e| parser.err(e))?;
            parser.expect_ident("cond").map_err(|e| parser.err(e))?;
            let cond = parse_body(parser, builder, vars)?;
            let mut cases = Vec::new();
            while matches!(parser.peek(), Some(Token::Ident(s)) if s == "case") {
                parser.next().ok();
                cases.push(parse_body(parser, builder, vars)?);
            }
            parser.expect_symbol('}').map_err(|e| parser.err(e))?;
            if cases.is_empty() {
                return Err(parser.err("fork must have at least one case"));
            }
            Ok(builder.create_fork(cond, cases))
        }
        Token::Ident(kw) if kw == "loop" => {
            parser.expect_symbol('{').map_err(|e| parser.err(e))?;
            parser.expect_ident("start").map_err(|e| parser.err(e))?;
            let start = parse_body(parser, builder, vars)?;
            parser.expect_ident("cond").map_err(|e| parser.err(e))?;
            let cond = parse_body(parser, builder, vars)?;
            parser.expect_ident("body").map_err(|e| parser.err(e))?;
            let body = parse_body(parser, builder, vars)?;
            parser.expect_ident("update").map_err(|e| parser.err(e))?;
            let update = parse_body(parser, builder, vars)?;
            parser.expect_symbol('}').map_err(|e| parser.err(e))?;
            Ok(builder.create_loop(start, cond, body, update))
        }
        other => Err(parser.err(format!("expected a block/seq/fork/loop, found {other:?}"))),
    }
}

fn parse_instruction(
    parser: &mut Parser,
    builder: &mut FunctionBuilder,
    vars: &mut HashMap<String, Variable>,
    block: Component,
) -> CompileResult<()> {
    let first = parser.take_ident().map_err(|e| parser.err(e))?;
    let (dest, opcode_name) = if matches!(parser.peek(), Some(Token::Symbol('='))) {
        parser.next().ok();
        (Some(first), parser.take_ident().map_err(|e| parser.err(e))?)
    } else {
        (None, first)
    };
    let opcode = resolve_opcode(&opcode_name).map_err(|e| parser.err(e))?;

    let mut operands = Vec::new();
    if !matches!(parser.peek(), Some(Token::Symbol(';'))) {
        loop {
            operands.push(parse_operand(parser, vars)?);
            if matches!(parser.peek(), Some(Token::Symbol(','))) {
                parser.next().ok();
            } else {
                break;
            }
        }
    }
    parser.expect_symbol(';').map_err(|e| parser.err(e))?;

    let (def_var, result_ty) = match dest {
        Some(name) => {
            let v = *vars
                .get(&name)
                .ok_or_else(|| parser.err(format!("undeclared variable `{name}`")))?;
            (Some(v), Some(builder.variable_type(v)))
        }
        None => (None, None),
    };
    builder.append_instruction(block, opcode, def_var, operands, result_ty)?;
    Ok(())
}

fn parse_operand(parser: &mut Parser, vars: &HashMap<String, Variable>) -> CompileResult<ValueOperand> {
    match parser.next().map_err(|e| parser.err(e))? {
        Token::Ident(s) if s == "true" => Ok(ValueOperand::Const(Constant::Bool(true))),
        Token::Ident(s) if s == "false" => Ok(ValueOperand::Const(Constant::Bool(false))),
        Token::Ident(name) => vars
            .get(&name)
            .map(|&v| ValueOperand::Var(v))
            .ok_or_else(|| parser.err(format!("undeclared variable `{name}`"))),
        Token::Int(i) => Ok(ValueOperand::Const(Constant::I64(i))),
        Token::Float(f) => Ok(ValueOperand::Const(Constant::F64(f))),
        other => Err(parser.err(format!("expected an operand, found {other:?}"))),
    }
}

fn resolve_opcode(name: &str) -> Result<Opcode, String> {
    Ok(match name {
        "assign" => Opcode::Assign,
        "call" => Opcode::Call,
        "return" => Opcode::Return,
        "branch" => Opcode::Branch,
        "cond_branch" => Opcode::CondBranch,
        "add" => Opcode::Add,
        "sub" => Opcode::Sub,
        "mul" => Opcode::Mul,
        "div" => Opcode::Div,
        "mod" => Opcode::Mod,
        "rem" => Opcode::Rem,
        "neg" => Opcode::Neg,
        "eq" => Opcode::Eq,
        "ne" => Opcode::Ne,
        "lt" => Opcode::Lt,
        "le" => Opcode::Le,
        "gt" => Opcode::Gt,
        "ge" => Opcode::Ge,
        "band" => Opcode::Band,
        "bor" => Opcode::Bor,
        "bxor" => Opcode::Bxor,
        "bnot" => Opcode::Bnot,
        "bshiftl" => Opcode::Bshiftl,
        "bashiftr" => Opcode::Bashiftr,
        "blshiftr" => Opcode::Blshiftr,
        "extract_argument" => Opcode::ExtractArgument,
        "store_argument" => Opcode::StoreArgument,
        "error_check" => Opcode::ErrorCheck,
        other => return Err(format!("unknown opcode `{other}`")),
    })
}
