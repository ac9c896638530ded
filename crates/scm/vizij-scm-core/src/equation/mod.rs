//! Structural equations written as `lambda <params>: <body>`.
//!
//! An equation is compiled once into an ordered parameter list and an expression tree,
//! then applied sample by sample across a batch:
//!
//! - [`parse_parameters`] extracts the formal parameter names, dropping `_` placeholders.
//! - [`CompiledEquation::compile`] tokenizes and parses the body ([`lexer`], [`parser`]).
//! - [`CompiledEquation::evaluate`] gathers the `i`-th value of every bound parent and
//!   writes one output per sample.
//! - [`EquationCache`] shares compiled equations between nodes with identical text.
//!
//! # Untrusted input
//!
//! Equation text comes from the model definition. The body grammar is closed (numeric
//! literals, bound parameters, operators and a fixed set of math functions), so no host
//! code is ever executed. Parsing is recursive in the nesting depth of the body, so text
//! from an untrusted source should still be length-limited before it reaches
//! [`CompiledEquation::compile`].

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::ScmError;

pub mod expr;
pub mod lexer;
pub mod parser;

use expr::Expr;
use lexer::Lexer;
use parser::Parser;

const INTRODUCER: &str = "lambda";
const PLACEHOLDER: &str = "_";

/// Split `text` into its parameter section and body.
fn split_lambda(text: &str) -> Result<(&str, &str), ScmError> {
    let rest = text
        .trim_start()
        .strip_prefix(INTRODUCER)
        .ok_or_else(|| ScmError::spec_parse(text, "expected 'lambda' introducer"))?;
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return Err(ScmError::spec_parse(text, "expected 'lambda' introducer"));
    }
    rest.split_once(':')
        .ok_or_else(|| ScmError::spec_parse(text, "missing ':' between parameters and body"))
}

/// Formal parameter names bound to data, in declaration order.
///
/// Parentheses and whitespace are stripped, and `_` placeholders are dropped because
/// they are never looked up.
pub fn parse_parameters(text: &str) -> Result<Vec<String>, ScmError> {
    let (params, _) = split_lambda(text)?;
    let cleaned = params.replace(['(', ')'], "");
    let mut names: Vec<String> = Vec::new();
    for raw in cleaned.split(',') {
        let name = raw.trim();
        if name.is_empty() || name == PLACEHOLDER {
            continue;
        }
        let valid = name.starts_with(|c: char| c.is_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(ScmError::spec_parse(
                text,
                format!("invalid parameter name '{name}'"),
            ));
        }
        if names.iter().any(|n| n == name) {
            return Err(ScmError::spec_parse(
                text,
                format!("duplicate parameter '{name}'"),
            ));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// A structural equation ready for per-sample evaluation.
#[derive(Debug, Clone)]
pub struct CompiledEquation {
    source: String,
    params: Vec<String>,
    body: Expr,
}

impl CompiledEquation {
    pub fn compile(text: &str) -> Result<Self, ScmError> {
        let params = parse_parameters(text)?;
        let (_, body) = split_lambda(text)?;
        let tokens = Lexer::new(body)
            .tokenize()
            .map_err(|reason| ScmError::spec_parse(text, reason))?;
        let body = Parser::new(&tokens, &params)
            .parse()
            .map_err(|reason| ScmError::spec_parse(text, reason))?;
        Ok(CompiledEquation {
            source: text.to_string(),
            params,
            body,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names bound to parent data, placeholders excluded.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Apply the equation to a single set of scalar arguments, ordered like [`params`](Self::params).
    pub fn call(&self, args: &[f64]) -> Result<f64, String> {
        if args.len() != self.params.len() {
            return Err(format!(
                "expected {} argument(s), got {}",
                self.params.len(),
                args.len()
            ));
        }
        self.body.eval(args)
    }

    /// Evaluate `n` samples for `node`.
    ///
    /// `lookup` resolves a parameter name to the data already computed for it. A name it
    /// cannot resolve fails with [`ScmError::MissingParent`]; a failure inside the body
    /// fails with [`ScmError::Evaluation`] carrying the sample index.
    pub fn evaluate<'d>(
        &self,
        node: &str,
        lookup: impl Fn(&str) -> Option<&'d [f64]>,
        n: usize,
    ) -> Result<Vec<f64>, ScmError> {
        let columns = self
            .params
            .iter()
            .map(|param| {
                lookup(param).ok_or_else(|| ScmError::MissingParent {
                    node: node.to_string(),
                    param: param.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut args = vec![0.0; columns.len()];
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            for (slot, (column, param)) in args.iter_mut().zip(columns.iter().zip(&self.params)) {
                *slot = *column.get(i).ok_or_else(|| ScmError::Evaluation {
                    node: node.to_string(),
                    index: i,
                    cause: format!("parent '{param}' has only {} samples", column.len()),
                })?;
            }
            let value = self.call(&args).map_err(|cause| ScmError::Evaluation {
                node: node.to_string(),
                index: i,
                cause,
            })?;
            out.push(value);
        }
        Ok(out)
    }
}

impl fmt::Display for CompiledEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compiled equations keyed by their source text.
#[derive(Debug, Default)]
pub struct EquationCache {
    compiled: HashMap<String, Arc<CompiledEquation>>,
}

impl EquationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached equation for `text`, compiling it on first use.
    pub fn get_or_compile(&mut self, text: &str) -> Result<Arc<CompiledEquation>, ScmError> {
        if let Some(hit) = self.compiled.get(text) {
            return Ok(Arc::clone(hit));
        }
        let compiled = Arc::new(CompiledEquation::compile(text)?);
        log::trace!("compiled structural equation '{text}'");
        self.compiled.insert(text.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column<'a>(data: &'a [(&str, Vec<f64>)]) -> impl Fn(&str) -> Option<&'a [f64]> {
        move |name| {
            data.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_slice())
        }
    }

    #[test]
    fn extracts_parameters() {
        assert_eq!(parse_parameters("lambda a, b: a + b").unwrap(), vec!["a", "b"]);
        assert_eq!(parse_parameters("lambda (x): x").unwrap(), vec!["x"]);
        assert_eq!(parse_parameters("lambda _, y: y").unwrap(), vec!["y"]);
        assert!(parse_parameters("lambda: 1").unwrap().is_empty());
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        for bad in ["a + b", "lambda a a + b", "lambdax: x", "lambda 1a: 1", "lambda a, a: a"] {
            assert!(
                matches!(CompiledEquation::compile(bad), Err(ScmError::SpecParse { .. })),
                "expected parse error for {bad}"
            );
        }
    }

    #[test]
    fn evaluates_per_sample() {
        let eq = CompiledEquation::compile("lambda a, b: a * 2 + b").unwrap();
        let data = [("a", vec![1.0, 2.0, 3.0]), ("b", vec![0.5, 0.5, 0.5])];
        let out = eq.evaluate("c", column(&data), 3).unwrap();
        assert_eq!(out, vec![2.5, 4.5, 6.5]);
    }

    #[test]
    fn placeholder_parent_is_not_looked_up() {
        let eq = CompiledEquation::compile("lambda _, b: b + 1").unwrap();
        let data = [("b", vec![1.0, 2.0])];
        assert_eq!(eq.evaluate("c", column(&data), 2).unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn constant_body_fills_every_sample() {
        let eq = CompiledEquation::compile("lambda: 4").unwrap();
        assert_eq!(eq.evaluate("c", |_| None, 3).unwrap(), vec![4.0; 3]);
    }

    #[test]
    fn missing_parent_is_reported() {
        let eq = CompiledEquation::compile("lambda a: a").unwrap();
        match eq.evaluate("c", |_| None, 2) {
            Err(ScmError::MissingParent { node, param }) => {
                assert_eq!(node, "c");
                assert_eq!(param, "a");
            }
            other => panic!("expected missing parent, got {other:?}"),
        }
    }

    #[test]
    fn evaluation_error_carries_sample_index() {
        let eq = CompiledEquation::compile("lambda a: math.log(a)").unwrap();
        let data = [("a", vec![1.0, 2.0, 0.0, 4.0])];
        match eq.evaluate("c", column(&data), 4) {
            Err(ScmError::Evaluation { node, index, cause }) => {
                assert_eq!(node, "c");
                assert_eq!(index, 2);
                assert!(cause.contains("math domain error"));
            }
            other => panic!("expected evaluation error, got {other:?}"),
        }
    }

    #[test]
    fn division_by_zero_in_data_yields_infinity() {
        let eq = CompiledEquation::compile("lambda a: 1 / a").unwrap();
        let data = [("a", vec![1.0, 2.0, 0.0])];
        assert_eq!(
            eq.evaluate("c", column(&data), 3).unwrap(),
            vec![1.0, 0.5, f64::INFINITY]
        );
    }

    #[test]
    fn call_rejects_wrong_argument_count() {
        let eq = CompiledEquation::compile("lambda a, b: a + b").unwrap();
        assert!(eq.call(&[1.0]).is_err());
        assert!(eq.call(&[1.0, 2.0, 3.0]).is_err());
        assert_eq!(eq.call(&[1.0, 2.0]).unwrap(), 3.0);
    }

    #[test]
    fn cache_compiles_once_per_text() {
        let mut cache = EquationCache::new();
        let a = cache.get_or_compile("lambda x: x + 1").unwrap();
        let b = cache.get_or_compile("lambda x: x + 1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_compile("lambda x: x + 2").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get_or_compile("lambda x x").is_err());
        assert_eq!(cache.len(), 2);
    }
}
