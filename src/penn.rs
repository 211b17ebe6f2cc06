//! Penn Treebank bracket parser
//!
//! Parses bracket notation into `Tree`s using a pest grammar. A bracket whose
//! contents are all bare tokens is a preterminal and becomes a single leaf
//! labeled with the tag and word joined by one space (`(VB Add)` gives the
//! leaf `"VB Add"`). Whitespace and line endings between symbols are
//! insignificant, so `\n` and `\r\n` input parse to equal trees.

use memchr::memchr2_iter;
use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::tree::{NodeId, Tree};

#[derive(Parser)]
#[grammar = "penn.pest"]
struct PennParser;

/// Deepest bracket nesting accepted; the recursive grammar cannot go much further
pub const MAX_DEPTH: usize = 1000;

/// Error type for bracket parsing failures
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Penn syntax error: {0}")]
    Syntax(#[from] pest::error::Error<Rule>),

    #[error("Penn syntax error: expected a single tree, found {0}")]
    MultipleTrees(usize),

    #[error("Penn nesting error: brackets nest {depth} deep, limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
}

impl ParseError {
    /// 1-based line and column where parsing stopped, for syntax errors
    pub fn line_col(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::Syntax(err) => match err.line_col {
                LineColLocation::Pos(pos) => Some(pos),
                LineColLocation::Span(start, _) => Some(start),
            },
            ParseError::MultipleTrees(_) | ParseError::TooDeep { .. } => None,
        }
    }
}

/// Parse text holding at most one tree
///
/// Empty or whitespace-only input gives `Tree::empty()`.
pub fn parse(text: &str) -> Result<Tree, ParseError> {
    let mut trees = parse_forest(text)?;
    match trees.len() {
        0 => Ok(Tree::empty()),
        1 => Ok(trees.remove(0)),
        n => Err(ParseError::MultipleTrees(n)),
    }
}

/// Parse a sequence of zero or more consecutive trees
#[instrument(level = "debug", skip(text), fields(len = text.len()))]
pub fn parse_forest(text: &str) -> Result<Vec<Tree>, ParseError> {
    let depth = nesting_depth(text);
    if depth > MAX_DEPTH {
        return Err(ParseError::TooDeep {
            depth,
            limit: MAX_DEPTH,
        });
    }

    let mut pairs = PennParser::parse(Rule::forest, text)?;
    let Some(forest) = pairs.next() else {
        return Ok(Vec::new());
    };

    let trees: Vec<Tree> = forest
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::bracket)
        .map(build_tree)
        .collect();

    debug!(trees = trees.len(), "parsed bracket text");
    Ok(trees)
}

/// Maximum number of simultaneously open brackets
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0;
    for pos in memchr2_iter(b'(', b')', text.as_bytes()) {
        if text.as_bytes()[pos] == b'(' {
            depth += 1;
            max = max.max(depth);
        } else {
            depth = depth.saturating_sub(1);
        }
    }
    max
}

/// Build a tree from a top-level bracket
fn build_tree(pair: Pair<'_, Rule>) -> Tree {
    let (value, items) = split_bracket(pair);
    let mut tree = Tree::with_root(value);
    let root = tree.root().id();
    for item in items {
        attach(&mut tree, root, item);
    }
    tree
}

/// Add a bracket or bare token below `parent`
fn attach(tree: &mut Tree, parent: NodeId, pair: Pair<'_, Rule>) {
    match pair.as_rule() {
        Rule::token => {
            tree.add_child(parent, Some(pair.as_str().to_string()));
        }
        Rule::bracket => {
            let (value, items) = split_bracket(pair);
            let id = tree.add_child(parent, value);
            for item in items {
                attach(tree, id, item);
            }
        }
        _ => {}
    }
}

/// Split a bracket into its node value and the items that become children
///
/// Preterminals come back with their tokens folded into the value and no
/// items left over.
fn split_bracket(pair: Pair<'_, Rule>) -> (Option<String>, Vec<Pair<'_, Rule>>) {
    let mut label = None;
    let mut items = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::label => label = Some(inner.as_str().to_string()),
            Rule::bracket | Rule::token => items.push(inner),
            _ => {}
        }
    }

    match label {
        Some(mut value) if !items.is_empty() && items.iter().all(|p| p.as_rule() == Rule::token) => {
            for token in items.drain(..) {
                value.push(' ');
                value.push_str(token.as_str());
            }
            (Some(value), items)
        }
        label => (label, items),
    }
}
