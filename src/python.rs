//! Python bindings for penntree
//!
//! This module provides PyO3-based Python bindings for the Rust core.

use pyo3::exceptions::{PyIndexError, PyValueError};
use pyo3::prelude::*;
use regex::Regex;
use std::sync::Arc;

use crate::penn::{ParseError, parse, parse_forest};
use crate::sentence::SentenceAnalysis;
use crate::tree::{NodeId, NodeRef, Tree as RustTree};

impl From<ParseError> for PyErr {
    fn from(err: ParseError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn compile_pattern(pattern: &str) -> PyResult<Regex> {
    Regex::new(pattern).map_err(|e| PyValueError::new_err(format!("Invalid pattern: {}", e)))
}

#[pyclass(name = "Tree")]
#[derive(Clone)]
pub struct PyTree {
    pub(crate) inner: Arc<RustTree>,
}

#[pymethods]
impl PyTree {
    #[getter]
    fn root(&self) -> PyNode {
        PyNode::new(&self.inner, self.inner.root().id())
    }

    fn is_blank(&self) -> bool {
        self.inner.is_blank()
    }

    fn pretty(&self) -> String {
        format!("{:#}", self.inner)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __eq__(&self, other: PyRef<'_, PyTree>) -> bool {
        *self.inner == *other.inner
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }

    fn __repr__(&self) -> String {
        if self.inner.is_blank() {
            return "<Tree (empty)>".to_string();
        }
        format!("<Tree len={} {}>", self.inner.len(), self.inner)
    }
}

#[pyclass(name = "Node")]
#[derive(Clone)]
pub struct PyNode {
    tree: Arc<RustTree>,
    id: NodeId,
}

impl PyNode {
    fn new(tree: &Arc<RustTree>, id: NodeId) -> Self {
        Self {
            tree: Arc::clone(tree),
            id,
        }
    }

    fn node_ref(&self) -> NodeRef<'_> {
        self.tree.node_ref(self.id).unwrap_or_else(|| self.tree.root())
    }

    fn wrap(&self, nodes: Vec<NodeRef<'_>>) -> Vec<PyNode> {
        nodes
            .into_iter()
            .map(|node| PyNode::new(&self.tree, node.id()))
            .collect()
    }
}

#[pymethods]
impl PyNode {
    #[getter]
    fn value(&self) -> Option<String> {
        self.node_ref().value().map(str::to_string)
    }

    #[getter]
    fn tag(&self) -> Option<String> {
        self.node_ref().tag().map(str::to_string)
    }

    #[getter]
    fn word(&self) -> Option<String> {
        self.node_ref().word().map(str::to_string)
    }

    fn is_leaf(&self) -> bool {
        self.node_ref().is_leaf()
    }

    fn depth(&self) -> usize {
        self.node_ref().depth()
    }

    fn parent(&self) -> Option<PyNode> {
        self.node_ref()
            .parent()
            .map(|parent| PyNode::new(&self.tree, parent.id()))
    }

    fn children(&self) -> Vec<PyNode> {
        self.wrap(self.node_ref().children().collect())
    }

    fn __getitem__(&self, index: usize) -> PyResult<PyNode> {
        self.node_ref()
            .child(index)
            .map(|child| PyNode::new(&self.tree, child.id()))
            .ok_or_else(|| PyIndexError::new_err(format!("child index out of range: {}", index)))
    }

    fn __len__(&self) -> usize {
        self.node_ref().num_children()
    }

    fn children_with_value(&self, pattern: &str) -> PyResult<Vec<PyNode>> {
        let pattern = compile_pattern(pattern)?;
        Ok(self.wrap(self.node_ref().children_with_value(&pattern)))
    }

    fn highest_level_nodes_with_value(&self, pattern: &str) -> PyResult<Vec<PyNode>> {
        let pattern = compile_pattern(pattern)?;
        Ok(self.wrap(self.node_ref().highest_level_nodes_with_value(&pattern)))
    }

    fn to_tree(&self) -> PyTree {
        PyTree {
            inner: Arc::new(self.node_ref().to_tree()),
        }
    }

    fn __eq__(&self, other: PyRef<'_, PyNode>) -> bool {
        self.node_ref() == other.node_ref()
    }

    fn __str__(&self) -> String {
        self.node_ref().to_string()
    }

    fn __repr__(&self) -> String {
        format!("<Node id={} {}>", self.id, self.node_ref())
    }
}

#[pyclass(name = "Sentence")]
#[derive(Clone)]
pub struct PySentence {
    inner: SentenceAnalysis,
}

#[pymethods]
impl PySentence {
    #[new]
    #[pyo3(signature = (tagged_words, penn = ""))]
    fn new(tagged_words: &str, penn: &str) -> PyResult<Self> {
        Ok(PySentence {
            inner: SentenceAnalysis::from_penn(tagged_words, penn)?,
        })
    }

    #[getter]
    fn tagged_words(&self) -> String {
        self.inner.tagged_words().to_string()
    }

    #[setter]
    fn set_tagged_words(&mut self, tagged_words: &str) {
        self.inner.set_tagged_words(tagged_words);
    }

    #[getter]
    fn tree(&self) -> PyTree {
        PyTree {
            inner: Arc::new(self.inner.tree().clone()),
        }
    }

    /// Bracket notation of the current tree
    #[getter]
    fn penn(&self) -> String {
        self.inner.tree().to_string()
    }

    #[setter]
    fn set_penn(&mut self, penn: &str) -> PyResult<()> {
        Ok(self.inner.set_penn(penn)?)
    }

    /// List of (word, tag) pairs from the tagged-word string
    fn tokens(&self) -> Vec<(String, String)> {
        self.inner
            .tokens()
            .into_iter()
            .map(|token| (token.word, token.tag))
            .collect()
    }

    fn has_verb(&self) -> bool {
        self.inner.has_verb()
    }

    fn is_fragment(&self) -> bool {
        self.inner.is_fragment()
    }

    fn __repr__(&self) -> String {
        format!("<Sentence '{}'>", self.inner.tagged_words())
    }
}

/// Parse bracket notation holding at most one tree.
///
/// Raises:
///     ValueError: If the brackets are unbalanced
#[pyfunction(name = "parse_penn")]
fn py_parse_penn(text: &str) -> PyResult<PyTree> {
    Ok(PyTree {
        inner: Arc::new(parse(text)?),
    })
}

/// Parse bracket notation holding any number of trees.
#[pyfunction(name = "parse_forest")]
fn py_parse_forest(text: &str) -> PyResult<Vec<PyTree>> {
    Ok(parse_forest(text)?
        .into_iter()
        .map(|tree| PyTree {
            inner: Arc::new(tree),
        })
        .collect())
}

#[pymodule]
fn penntree(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTree>()?;
    m.add_class::<PyNode>()?;
    m.add_class::<PySentence>()?;

    m.add_function(wrap_pyfunction!(py_parse_penn, m)?)?;
    m.add_function(wrap_pyfunction!(py_parse_forest, m)?)?;

    Ok(())
}
