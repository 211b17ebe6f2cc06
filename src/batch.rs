//! Batch tagging and parsing
//!
//! Turns a list of raw sentences into one `SentenceAnalysis` per sentence by
//! making a single call to an external tagger/parser (the `TagAndParse`
//! collaborator). Results are index-aligned with the input. Any collaborator
//! failure, misaligned response or unparsable tree fails the whole batch.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::penn::{self, ParseError};
use crate::sentence::SentenceAnalysis;
use crate::tree::Tree;

/// How sentences are delimited when handed to the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// One input with sentences joined by `\n`; the collaborator must split
    /// sentences at line ends only
    #[default]
    Newline,
    /// One input entry per sentence
    Separate,
}

/// What the collaborator receives for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub mode: BatchMode,
    pub inputs: Vec<String>,
    /// Number of sentences the collaborator is expected to report on
    pub sentence_count: usize,
}

impl BatchRequest {
    pub fn new<S: AsRef<str>>(sentences: &[S], mode: BatchMode) -> Self {
        let inputs = match mode {
            // Line breaks inside a sentence would split it in two
            BatchMode::Newline => vec![
                sentences
                    .iter()
                    .map(|s| single_line(s.as_ref()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ],
            BatchMode::Separate => sentences.iter().map(|s| s.as_ref().to_string()).collect(),
        };
        Self {
            mode,
            inputs,
            sentence_count: sentences.len(),
        }
    }
}

fn single_line(sentence: &str) -> String {
    sentence.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collaborator output for one sentence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResult {
    /// `word/TAG word/TAG ...`
    pub tagged_words: String,
    /// Bracket notation, absent when the backend produced no tree
    pub penn: Option<String>,
}

impl RawResult {
    pub fn new(tagged_words: &str, penn: Option<&str>) -> Self {
        Self {
            tagged_words: tagged_words.to_string(),
            penn: penn.map(str::to_string),
        }
    }
}

/// Failure reported by the tagging/parsing backend
#[derive(Debug, Error)]
#[error("Tagger error: {message}")]
pub struct CollaboratorError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Error type for batch failures
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Batch error: expected {expected} results, collaborator returned {got}")]
    Misaligned { expected: usize, got: usize },

    #[error("Batch error: sentence {index}: {source}")]
    Parse {
        index: usize,
        #[source]
        source: ParseError,
    },
}

/// External part-of-speech tagger and constituency parser
///
/// Implementations return one `RawResult` per requested sentence, in input
/// order. A result without bracket text is a valid degenerate response.
#[allow(async_fn_in_trait)]
pub trait TagAndParse {
    async fn tag_and_parse(&self, request: &BatchRequest)
    -> Result<Vec<RawResult>, CollaboratorError>;
}

/// Tag and parse `sentences` with a single collaborator call
///
/// Holds no state between calls, so independent batches may run
/// concurrently. There is no retry and no timeout; wrap the future if a
/// deadline is needed.
#[instrument(level = "debug", skip(collaborator, sentences), fields(count = sentences.len()))]
pub async fn parse_sentences<C, S>(
    collaborator: &C,
    sentences: &[S],
    mode: BatchMode,
) -> Result<Vec<SentenceAnalysis>, BatchError>
where
    C: TagAndParse,
    S: AsRef<str>,
{
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let request = BatchRequest::new(sentences, mode);
    debug!(inputs = request.inputs.len(), "invoking tagger");
    let results = collaborator.tag_and_parse(&request).await?;

    if results.len() != sentences.len() {
        return Err(BatchError::Misaligned {
            expected: sentences.len(),
            got: results.len(),
        });
    }

    results
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let tree = match raw.penn.as_deref() {
                Some(text) => penn::parse(text).map_err(|source| BatchError::Parse { index, source })?,
                None => {
                    debug!(index, "no tree from tagger, using empty tree");
                    Tree::empty()
                }
            };
            Ok(SentenceAnalysis::new(&raw.tagged_words, tree))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    const ADD_PENN: &str = "(ROOT
  (S
    (VP
      (VP (VB Add)
        (NP (JJ empty) (NN name) (NN check)))
      (CC and)
      (VP (VBD changed)
        (NP (NN email) (NN validation))))))";

    /// Canned backend keyed by sentence text
    struct FakeTagger {
        responses: HashMap<&'static str, RawResult>,
        with_trees: bool,
        calls: Cell<usize>,
        last_request: RefCell<Option<BatchRequest>>,
    }

    impl FakeTagger {
        fn new(with_trees: bool) -> Self {
            let mut responses = HashMap::new();
            responses.insert(
                "Add empty name check and changed email validation",
                RawResult::new(
                    "Add/VB empty/JJ name/NN check/NN and/CC changed/VBD email/NN validation/NN",
                    Some(ADD_PENN),
                ),
            );
            responses.insert(
                "Fixes nasty bug on the registration page",
                RawResult::new(
                    "Fixes/VBZ nasty/JJ bug/NN on/IN the/DT registration/NN page/NN",
                    Some("(ROOT (S (VP (VBZ Fixes) (NP (NP (JJ nasty) (NN bug)) (PP (IN on) (NP (DT the) (NN registration) (NN page)))))))"),
                ),
            );
            responses.insert(
                "Fixed bug in landing page",
                RawResult::new(
                    "Fixed/VBN bug/NN in/IN landing/NN page/NN",
                    Some("(ROOT (S (VP (VBN Fixed) (NP (NP (NN bug)) (PP (IN in) (NP (NN landing) (NN page)))))))"),
                ),
            );
            responses.insert(
                "Minor fixes regarding serializers",
                RawResult::new(
                    "Minor/JJ fixes/NNS regarding/VBG serializers/NNS",
                    Some("(ROOT\n  (FRAG\n    (NP (JJ Minor) (NNS fixes))\n    (PP (VBG regarding)\n      (NP (NNS serializers)))))"),
                ),
            );
            responses.insert("CSS fixes", RawResult::new("CSS/NNP fixes/NNS", None));
            Self {
                responses,
                with_trees,
                calls: Cell::new(0),
                last_request: RefCell::new(None),
            }
        }
    }

    impl TagAndParse for FakeTagger {
        async fn tag_and_parse(
            &self,
            request: &BatchRequest,
        ) -> Result<Vec<RawResult>, CollaboratorError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_request.borrow_mut() = Some(request.clone());

            let sentences: Vec<&str> = match request.mode {
                BatchMode::Newline => request.inputs.iter().flat_map(|input| input.lines()).collect(),
                BatchMode::Separate => request.inputs.iter().map(String::as_str).collect(),
            };
            sentences
                .into_iter()
                .map(|sentence| {
                    let mut raw = self
                        .responses
                        .get(sentence)
                        .cloned()
                        .ok_or_else(|| CollaboratorError::new(format!("unknown sentence: {sentence}")))?;
                    if !self.with_trees {
                        raw.penn = None;
                    }
                    Ok(raw)
                })
                .collect()
        }
    }

    /// Backend that always fails
    struct BrokenTagger;

    impl TagAndParse for BrokenTagger {
        async fn tag_and_parse(
            &self,
            _request: &BatchRequest,
        ) -> Result<Vec<RawResult>, CollaboratorError> {
            Err(CollaboratorError::with_source(
                "backend unavailable",
                std::io::Error::other("connection refused"),
            ))
        }
    }

    /// Backend returning a fixed response regardless of input
    struct CannedTagger(Vec<RawResult>);

    impl TagAndParse for CannedTagger {
        async fn tag_and_parse(
            &self,
            _request: &BatchRequest,
        ) -> Result<Vec<RawResult>, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[tokio::test]
    async fn test_parse_sentences() {
        init_tracing();
        let sentences = [
            "Add empty name check and changed email validation",
            "Fixes nasty bug on the registration page",
            "Fixed bug in landing page",
            "Minor fixes regarding serializers",
        ];
        let tagger = FakeTagger::new(true);

        let analyses = parse_sentences(&tagger, &sentences, BatchMode::Newline)
            .await
            .unwrap();

        assert_eq!(tagger.calls.get(), 1);
        assert_eq!(analyses.len(), sentences.len());
        assert_eq!(
            analyses[0].tagged_words(),
            "Add/VB empty/JJ name/NN check/NN and/CC changed/VBD email/NN validation/NN"
        );
        assert_eq!(*analyses[0].tree(), penn::parse(ADD_PENN).unwrap());

        let fixes = analyses[1].tree().root();
        let leaf = fixes.child(0).unwrap().child(0).unwrap().child(0).unwrap();
        assert_eq!(leaf.value(), Some("VBZ Fixes"));

        assert!(analyses[2].has_verb());
        assert!(!analyses[2].is_fragment());
        assert!(analyses[3].is_fragment());
    }

    #[tokio::test]
    async fn test_newline_request() {
        let tagger = FakeTagger::new(true);
        let sentences = ["Fixed bug\nin landing page", "CSS fixes"];

        parse_sentences(&tagger, &sentences, BatchMode::Newline)
            .await
            .unwrap();

        let request = tagger.last_request.borrow().clone().unwrap();
        assert_eq!(request.inputs, vec!["Fixed bug in landing page\nCSS fixes"]);
        assert_eq!(request.sentence_count, 2);
    }

    #[tokio::test]
    async fn test_separate_mode() {
        let tagger = FakeTagger::new(true);
        let sentences = vec!["CSS fixes".to_string(), "Fixed bug in landing page".to_string()];

        let analyses = parse_sentences(&tagger, &sentences, BatchMode::Separate)
            .await
            .unwrap();

        let request = tagger.last_request.borrow().clone().unwrap();
        assert_eq!(request.inputs.len(), 2);
        assert_eq!(analyses[0].tagged_words(), "CSS/NNP fixes/NNS");
        assert!(analyses[1].has_verb());
    }

    #[tokio::test]
    async fn test_works_without_trees() {
        let tagger = FakeTagger::new(false);
        let sentences = ["CSS fixes", "Fixed bug in landing page"];

        let analyses = parse_sentences(&tagger, &sentences, BatchMode::Newline)
            .await
            .unwrap();

        assert_eq!(analyses.len(), 2);
        assert_eq!(analyses[0].tagged_words(), "CSS/NNP fixes/NNS");
        assert!(analyses[0].tree().is_blank());
        assert!(analyses[1].tree().is_blank());
        assert!(!analyses[1].is_fragment());
        assert_eq!(analyses[1].tokens()[0].tag, "VBN");
    }

    #[tokio::test]
    async fn test_collaborator_failure_fails_batch() {
        let err = parse_sentences(&BrokenTagger, &["CSS fixes"], BatchMode::Newline)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Collaborator(_)));
        assert!(err.to_string().contains("backend unavailable"));

        // One unknown sentence fails everything, no partial results
        let tagger = FakeTagger::new(true);
        let result = parse_sentences(&tagger, &["CSS fixes", "???"], BatchMode::Separate).await;
        assert!(matches!(result, Err(BatchError::Collaborator(_))));
    }

    #[tokio::test]
    async fn test_misaligned_results() {
        let tagger = CannedTagger(vec![RawResult::new("CSS/NNP fixes/NNS", None)]);

        let err = parse_sentences(&tagger, &["CSS fixes", "Fix it"], BatchMode::Newline)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Misaligned { expected: 2, got: 1 }));
    }

    #[tokio::test]
    async fn test_bad_tree_fails_batch() {
        let tagger = CannedTagger(vec![
            RawResult::new("CSS/NNP fixes/NNS", Some("(ROOT (NP (NNP CSS) (NNS fixes)))")),
            RawResult::new("Fix/VB it/PRP", Some("(ROOT (S (VP (VB Fix)")),
        ]);

        let err = parse_sentences(&tagger, &["CSS fixes", "Fix it"], BatchMode::Newline)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Parse { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_collaborator() {
        let tagger = FakeTagger::new(true);
        let sentences: [&str; 0] = [];

        let analyses = parse_sentences(&tagger, &sentences, BatchMode::Newline)
            .await
            .unwrap();

        assert!(analyses.is_empty());
        assert_eq!(tagger.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_batches() {
        let tagger = FakeTagger::new(true);

        let (a, b) = tokio::join!(
            parse_sentences(&tagger, &["CSS fixes"], BatchMode::Newline),
            parse_sentences(&tagger, &["Minor fixes regarding serializers"], BatchMode::Separate),
        );

        assert_eq!(a.unwrap()[0].tagged_words(), "CSS/NNP fixes/NNS");
        assert!(b.unwrap()[0].is_fragment());
        assert_eq!(tagger.calls.get(), 2);
    }
}
