//! PEST-based parser for Cadence script files
//!
//! Produces the AST consumed by the compiler. Every statement and call carries
//! its source line so tracebacks can point back into the file.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use super::ast::{
    AssignTarget, BinaryOp, Expr, FunctionDecl, LogicalOp, Script, Stmt, StmtKind, UnaryOp,
};

#[cfg(test)]
mod tests;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "script/parser/script.pest"]
struct ScriptParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Grammar-level failure reported by pest
    #[error("{message}")]
    PestError { message: String, line: usize },
    /// Well-formed input the AST builder could not accept
    #[error("line {line}: {message}")]
    BuildError { message: String, line: usize },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::PestError { line, .. } | ParseError::BuildError { line, .. } => *line,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError { message, .. } | ParseError::BuildError { message, .. } => {
                message
            }
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let line = match err.line_col {
            pest::error::LineColLocation::Pos((line, _)) => line,
            pest::error::LineColLocation::Span((line, _), _) => line,
        };
        ParseError::PestError {
            message: err.to_string(),
            line,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn build_error<T>(pair: &Pair<Rule>, message: impl Into<String>) -> ParseResult<T> {
    Err(ParseError::BuildError {
        message: message.into(),
        line: line_of(pair),
    })
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

/// Next inner pair, or a build error naming what was expected
fn expect_next<'i>(
    inner: &mut pest::iterators::Pairs<'i, Rule>,
    parent: &Pair<'i, Rule>,
    what: &str,
) -> ParseResult<Pair<'i, Rule>> {
    match inner.next() {
        Some(pair) => Ok(pair),
        None => build_error(parent, format!("expected {}", what)),
    }
}

/* ===================== Public API ===================== */

/// Parse a whole script file
pub fn parse_script(source: &str) -> ParseResult<Script> {
    let mut pairs = ScriptParser::parse(Rule::program, source)?;
    let Some(program) = pairs.next() else {
        return Ok(Script {
            functions: Vec::new(),
            body: Vec::new(),
        });
    };

    let mut functions = Vec::new();
    let mut body = Vec::new();

    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::function_decl => functions.push(build_function(pair)?),
            Rule::statement => body.push(build_statement(pair)?),
            Rule::EOI => {}
            _ => return build_error(&pair, format!("unexpected item: {:?}", pair.as_rule())),
        }
    }

    Ok(Script { functions, body })
}

/// Parse a single expression (testing and tooling API)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let script = parse_script(source)?;
    match script.body.into_iter().next() {
        Some(Stmt {
            kind: StmtKind::Expr { expr },
            ..
        }) => Ok(expr),
        _ => Err(ParseError::BuildError {
            message: "source is not a single expression".to_string(),
            line: 1,
        }),
    }
}

/* ===================== AST Builder ===================== */

fn build_function(pair: Pair<Rule>) -> ParseResult<FunctionDecl> {
    // function_decl = { "function" ~ identifier ~ "(" ~ param_list? ~ ")" ~ block }
    let line = line_of(&pair);
    let mut inner = pair.clone().into_inner();

    let name = expect_next(&mut inner, &pair, "function name")?
        .as_str()
        .to_string();

    let next = expect_next(&mut inner, &pair, "function body")?;
    let (params, block_pair) = if next.as_rule() == Rule::param_list {
        let params: Vec<String> = next.into_inner().map(|p| p.as_str().to_string()).collect();
        (params, expect_next(&mut inner, &pair, "function body")?)
    } else {
        (Vec::new(), next)
    };

    for (i, param) in params.iter().enumerate() {
        if params[..i].contains(param) {
            return build_error(
                &pair,
                format!("duplicate parameter '{}' in function '{}'", param, name),
            );
        }
    }

    Ok(FunctionDecl {
        name,
        params,
        body: build_block_body(block_pair)?,
        line,
    })
}

fn build_block_body(pair: Pair<Rule>) -> ParseResult<Vec<Stmt>> {
    // block = { "{" ~ statement* ~ "}" }
    pair.into_inner().map(build_statement).collect()
}

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    let line = line_of(&pair);

    let kind = match pair.as_rule() {
        Rule::statement => {
            let mut inner = pair.clone().into_inner();
            let stmt = expect_next(&mut inner, &pair, "statement")?;
            return build_statement(stmt);
        }
        Rule::block => StmtKind::Block {
            body: build_block_body(pair)?,
        },
        Rule::declare_stmt => {
            let mut inner = pair.clone().into_inner();
            let name = expect_next(&mut inner, &pair, "variable name")?
                .as_str()
                .to_string();
            let init = inner.next().map(build_expression).transpose()?;
            StmtKind::Let { name, init }
        }
        Rule::assign_stmt => {
            let mut inner = pair.clone().into_inner();
            let target = build_assign_target(expect_next(&mut inner, &pair, "target")?)?;
            let value = build_expression(expect_next(&mut inner, &pair, "value")?)?;
            StmtKind::Assign { target, value }
        }
        Rule::expr_stmt => {
            let mut inner = pair.clone().into_inner();
            StmtKind::Expr {
                expr: build_expression(expect_next(&mut inner, &pair, "expression")?)?,
            }
        }
        Rule::return_stmt => StmtKind::Return {
            value: pair.into_inner().next().map(build_expression).transpose()?,
        },
        Rule::if_stmt => {
            let mut inner = pair.clone().into_inner();
            let test = build_expression(expect_next(&mut inner, &pair, "condition")?)?;
            let then_s = build_statement(expect_next(&mut inner, &pair, "then branch")?)?;
            // Skip the `else` keyword token if present
            let else_s = match inner.next() {
                Some(_else_kw) => Some(Box::new(build_statement(expect_next(
                    &mut inner,
                    &pair,
                    "else branch",
                )?)?)),
                None => None,
            };
            StmtKind::If {
                test,
                then_s: Box::new(then_s),
                else_s,
            }
        }
        Rule::while_stmt => {
            let mut inner = pair.clone().into_inner();
            let test = build_expression(expect_next(&mut inner, &pair, "condition")?)?;
            let body = build_statement(expect_next(&mut inner, &pair, "loop body")?)?;
            StmtKind::While {
                test,
                body: Box::new(body),
            }
        }
        Rule::for_stmt => {
            let mut inner = pair.clone().into_inner();
            let binding = expect_next(&mut inner, &pair, "loop variable")?
                .as_str()
                .to_string();
            let _of_kw = expect_next(&mut inner, &pair, "'of'")?;
            let iterable = build_expression(expect_next(&mut inner, &pair, "iterable")?)?;
            let body = build_statement(expect_next(&mut inner, &pair, "loop body")?)?;
            StmtKind::ForOf {
                binding,
                iterable,
                body: Box::new(body),
            }
        }
        Rule::try_stmt => {
            let mut inner = pair.clone().into_inner();
            let body = build_block_body(expect_next(&mut inner, &pair, "try block")?)?;
            let catch_var = expect_next(&mut inner, &pair, "catch variable")?
                .as_str()
                .to_string();
            let handler = build_block_body(expect_next(&mut inner, &pair, "catch block")?)?;
            StmtKind::Try {
                body,
                catch_var,
                handler,
            }
        }
        Rule::throw_stmt => {
            let mut inner = pair.clone().into_inner();
            StmtKind::Throw {
                value: build_expression(expect_next(&mut inner, &pair, "thrown value")?)?,
            }
        }
        Rule::break_stmt => StmtKind::Break,
        Rule::continue_stmt => StmtKind::Continue,
        _ => {
            return build_error(
                &pair,
                format!("unexpected statement rule: {:?}", pair.as_rule()),
            )
        }
    };

    Ok(Stmt::new(kind, line))
}

fn build_assign_target(pair: Pair<Rule>) -> ParseResult<AssignTarget> {
    // assign_target = { identifier ~ (member_suffix | index_suffix)* }
    let mut inner = pair.clone().into_inner();
    let name = expect_next(&mut inner, &pair, "identifier")?
        .as_str()
        .to_string();
    let suffixes: Vec<Pair<Rule>> = inner.collect();

    let Some((last, path)) = suffixes.split_last() else {
        return Ok(AssignTarget::Ident { name });
    };

    // Everything but the last suffix is an ordinary read
    let mut object = Expr::Ident { name };
    for suffix in path {
        object = apply_suffix(object, suffix.clone())?;
    }

    match last.as_rule() {
        Rule::member_suffix => Ok(AssignTarget::Member {
            object,
            property: suffix_name(last)?,
        }),
        Rule::index_suffix => {
            let mut index = last.clone().into_inner();
            Ok(AssignTarget::Index {
                object,
                index: build_expression(expect_next(&mut index, last, "index")?)?,
            })
        }
        _ => build_error(last, "invalid assignment target"),
    }
}

fn suffix_name(pair: &Pair<Rule>) -> ParseResult<String> {
    let mut inner = pair.clone().into_inner();
    Ok(expect_next(&mut inner, pair, "property name")?
        .as_str()
        .to_string())
}

fn apply_suffix(object: Expr, suffix: Pair<Rule>) -> ParseResult<Expr> {
    let line = line_of(&suffix);
    match suffix.as_rule() {
        Rule::call_suffix => {
            let args = match suffix.into_inner().next() {
                Some(arg_list) => arg_list
                    .into_inner()
                    .map(build_expression)
                    .collect::<ParseResult<Vec<_>>>()?,
                None => Vec::new(),
            };
            Ok(Expr::Call {
                callee: Box::new(object),
                args,
                line,
            })
        }
        Rule::member_suffix => Ok(Expr::Member {
            object: Box::new(object),
            property: suffix_name(&suffix)?,
        }),
        Rule::index_suffix => {
            let mut inner = suffix.clone().into_inner();
            let index = build_expression(expect_next(&mut inner, &suffix, "index")?)?;
            Ok(Expr::Index {
                object: Box::new(object),
                index: Box::new(index),
            })
        }
        _ => build_error(&suffix, format!("unexpected suffix: {:?}", suffix.as_rule())),
    }
}

fn binary_op(pair: &Pair<Rule>) -> ParseResult<BinaryOp> {
    let op = match pair.as_rule() {
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::Ne,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_lte => BinaryOp::Lte,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_gte => BinaryOp::Gte,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_mod => BinaryOp::Mod,
        _ => return build_error(pair, format!("unknown operator: {}", pair.as_str())),
    };
    Ok(op)
}

fn build_binary_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    // Left-associative: operand ~ (op ~ operand)*
    let mut inner = pair.clone().into_inner();
    let mut left = build_expression(expect_next(&mut inner, &pair, "operand")?)?;

    while let Some(op_pair) = inner.next() {
        let right = build_expression(expect_next(&mut inner, &pair, "operand")?)?;
        left = match op_pair.as_rule() {
            Rule::op_and => Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            },
            Rule::op_or => Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            },
            _ => Expr::Binary {
                op: binary_op(&op_pair)?,
                left: Box::new(left),
                right: Box::new(right),
            },
        };
    }

    Ok(left)
}

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expression | Rule::primary | Rule::literal => {
            let mut inner = pair.clone().into_inner();
            build_expression(expect_next(&mut inner, &pair, "expression")?)
        }
        Rule::logical_or_expr
        | Rule::logical_and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair),
        Rule::unary_expr => {
            // unary_expr = { (op_not | op_neg)* ~ call_expr }
            let mut ops = Vec::new();
            let mut operand = None;
            for child in pair.clone().into_inner() {
                match child.as_rule() {
                    Rule::op_not => ops.push(UnaryOp::Not),
                    Rule::op_neg => ops.push(UnaryOp::Neg),
                    _ => operand = Some(build_expression(child)?),
                }
            }
            let Some(mut expr) = operand else {
                return build_error(&pair, "expected operand");
            };
            // Prefix operators bind right-to-left
            for op in ops.into_iter().rev() {
                expr = match (op, expr) {
                    (UnaryOp::Neg, Expr::LitNum { v }) => Expr::LitNum { v: -v },
                    (op, expr) => Expr::Unary {
                        op,
                        operand: Box::new(expr),
                    },
                };
            }
            Ok(expr)
        }
        Rule::call_expr => {
            let mut inner = pair.clone().into_inner();
            let mut expr = build_expression(expect_next(&mut inner, &pair, "primary")?)?;
            for suffix in inner {
                expr = apply_suffix(expr, suffix)?;
            }
            Ok(expr)
        }
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
        }),
        Rule::number => {
            let num_str = pair.as_str();
            match num_str.parse::<f64>() {
                Ok(v) => Ok(Expr::LitNum { v }),
                Err(e) => build_error(
                    &pair,
                    format!("failed to parse number '{}': {}", num_str, e),
                ),
            }
        }
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
        }),
        Rule::null_lit => Ok(Expr::LitNull),
        Rule::string => {
            let content = pair.clone().into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Expr::LitStr {
                v: unescape(content),
            })
        }
        Rule::array_lit => Ok(Expr::List {
            items: pair
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<Vec<_>>>()?,
        }),
        Rule::object_lit => {
            let mut props = Vec::new();
            for property in pair.into_inner() {
                let mut inner = property.clone().into_inner();
                let key_pair = expect_next(&mut inner, &property, "property key")?;
                let key = match key_pair.as_rule() {
                    Rule::string => {
                        unescape(key_pair.into_inner().next().map(|p| p.as_str()).unwrap_or(""))
                    }
                    _ => key_pair.as_str().to_string(),
                };
                let value = build_expression(expect_next(&mut inner, &property, "property value")?)?;
                props.push((key, value));
            }
            Ok(Expr::Obj { props })
        }
        _ => build_error(
            &pair,
            format!("unexpected expression rule: {:?}", pair.as_rule()),
        ),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
