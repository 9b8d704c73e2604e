//! Request Source: supplies the lazy `Request` iterator a `Scheduler`
//! run drains. Two implementations ship: a synthetic prompt
//! generator and a line-delimited JSON file loader, grounded on
//! `guidellm`'s `dataset/creator.py` synthetic mode and
//! `request/file.py`'s `FileRequestGenerator` respectively.

use crate::request::Request;
use serde::Deserialize;
use std::io::BufRead;
use std::path::Path;

/// Supplies requests to a benchmark run, independent of how they were
/// produced.
pub trait RequestSource: Send {
    fn iter(&self) -> Box<dyn Iterator<Item = Request> + Send>;

    /// Best-effort size estimate for progress reporting; `None` when the
    /// source is unbounded or its length isn't known up front.
    fn len_hint(&self) -> Option<usize>;
}

const LOREM_WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
];

/// An unbounded source of fixed-length lorem-style prompts, repeated
/// indefinitely. The synthetic-dataset counterpart to guidellm's
/// `DatasetCreator` for runs that don't need a real prompt corpus.
pub struct SyntheticPromptSource {
    prompt: String,
    model: String,
}

impl SyntheticPromptSource {
    pub fn new(word_count: usize, model: impl Into<String>) -> Self {
        let prompt = (0..word_count.max(1))
            .map(|i| LOREM_WORDS[i % LOREM_WORDS.len()])
            .collect::<Vec<_>>()
            .join(" ");
        Self { prompt, model: model.into() }
    }
}

impl RequestSource for SyntheticPromptSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Request> + Send> {
        let prompt = self.prompt.clone();
        let model = self.model.clone();
        Box::new(std::iter::repeat_with(move || {
            Request::new(prompt.clone()).with_model(model.clone())
        }))
    }

    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// One line of a file-backed dataset: a prompt plus token-count hints for
/// the backend to use when the server can't report its own counts.
#[derive(Debug, Deserialize)]
struct FileRecord {
    question: String,
    #[serde(default)]
    tok_input_length: Option<u64>,
    #[serde(default)]
    tok_output_length: Option<u64>,
}

/// A finite source loaded from a line-delimited JSON file. The first line
/// is metadata and is skipped, matching `FileRequestGenerator`'s
/// `lines[1:]` behavior; malformed lines are logged and skipped rather
/// than aborting the load.
pub struct FileRequestSource {
    requests: Vec<Request>,
}

impl FileRequestSource {
    pub fn load(path: &Path, model: impl Into<String>) -> std::io::Result<Self> {
        let model = model.into();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut requests = Vec::new();

        for line in reader.lines().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: FileRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "skipping malformed dataset line");
                    continue;
                }
            };

            let mut request = Request::new(record.question).with_model(model.clone());
            request.prompt_tokens_hint = record.tok_input_length;
            request.output_tokens_hint = record.tok_output_length;
            requests.push(request);
        }

        Ok(Self { requests })
    }
}

impl RequestSource for FileRequestSource {
    fn iter(&self) -> Box<dyn Iterator<Item = Request> + Send> {
        Box::new(self.requests.clone().into_iter())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.requests.len())
    }
}
