//! Per-sentence analysis: tagged words plus constituency tree

use memchr::memrchr;

use crate::penn::{self, ParseError};
use crate::tree::Tree;

/// One `word/TAG` token from a tagged-word string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedWord {
    pub word: String,
    pub tag: String,
}

impl TaggedWord {
    /// Split on the last `/`, so `1/2/CD` is the word `1/2` tagged `CD`
    ///
    /// A token with no `/` is kept as the word with an empty tag.
    pub fn parse(token: &str) -> Self {
        match memrchr(b'/', token.as_bytes()) {
            Some(pos) => Self {
                word: token[..pos].to_string(),
                tag: token[pos + 1..].to_string(),
            },
            None => Self {
                word: token.to_string(),
                tag: String::new(),
            },
        }
    }
}

/// One sentence's tagger output and parse tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceAnalysis {
    tagged_words: String,
    tree: Tree,
}

impl SentenceAnalysis {
    pub fn new(tagged_words: &str, tree: Tree) -> Self {
        Self {
            tagged_words: tagged_words.to_string(),
            tree,
        }
    }

    /// Build from tagged words and bracket text
    pub fn from_penn(tagged_words: &str, penn: &str) -> Result<Self, ParseError> {
        Ok(Self::new(tagged_words, penn::parse(penn)?))
    }

    /// Raw `word/TAG word/TAG ...` string
    pub fn tagged_words(&self) -> &str {
        &self.tagged_words
    }

    pub fn set_tagged_words(&mut self, tagged_words: &str) {
        self.tagged_words = tagged_words.to_string();
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn set_tree(&mut self, tree: Tree) {
        self.tree = tree;
    }

    /// Re-parse bracket text and replace the tree
    ///
    /// On error the current tree is left untouched.
    pub fn set_penn(&mut self, penn: &str) -> Result<(), ParseError> {
        self.tree = penn::parse(penn)?;
        Ok(())
    }

    pub fn tokens(&self) -> Vec<TaggedWord> {
        self.tagged_words
            .split_whitespace()
            .map(TaggedWord::parse)
            .collect()
    }

    /// True if any leaf of the tree carries a verb tag (VB, VBD, VBG, ...)
    pub fn has_verb(&self) -> bool {
        self.tree
            .root()
            .leaves()
            .any(|leaf| leaf.tag().is_some_and(|tag| tag.starts_with('V')))
    }

    /// True if the root's only child is a FRAG constituent
    pub fn is_fragment(&self) -> bool {
        let root = self.tree.root();
        if root.num_children() != 1 {
            return false;
        }
        root.child(0)
            .and_then(|child| child.value())
            .is_some_and(|label| label.starts_with("FRAG"))
    }
}
