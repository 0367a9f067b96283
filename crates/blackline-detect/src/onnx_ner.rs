//! Local CPU token-classification model.
//!
//! Loads a BERT-style NER model exported to ONNX together with its
//! tokenizer and `config.json` label map. Requires the `onnx` feature.
//!
//! Text longer than one model sequence is classified in overlapping
//! windows; where windows overlap, the higher-scoring prediction wins.

use std::ops::Range;

/// Maximum sequence length for the model.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
const MAX_SEQ_LEN: usize = 512;

/// Content tokens per window, leaving room for `[CLS]` and `[SEP]`.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
const WINDOW_TOKENS: usize = MAX_SEQ_LEN - 2;

/// Tokens shared by neighbouring windows.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
const WINDOW_OVERLAP: usize = 64;

/// Split `len` tokens into windows of at most `size`, each starting
/// `size - overlap` after the previous one. The last window ends at `len`.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn token_windows(len: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let step = size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += step;
    }
    windows
}

/// Fold per-window `(label index, score)` predictions back onto the full
/// token sequence, keeping the higher score where windows overlap.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn merge_predictions(len: usize, windows: &[(Range<usize>, Vec<(usize, f64)>)]) -> Vec<Option<(usize, f64)>> {
    let mut merged: Vec<Option<(usize, f64)>> = vec![None; len];
    for (range, predictions) in windows {
        for (slot, &(label, score)) in merged[range.clone()].iter_mut().zip(predictions) {
            match slot {
                Some((_, best)) if *best >= score => {}
                _ => *slot = Some((label, score)),
            }
        }
    }
    merged
}

#[cfg(feature = "onnx")]
mod inner {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use blackline_core::{Error, Result};
    use ndarray::ArrayView2;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use super::{merge_predictions, token_windows, WINDOW_OVERLAP, WINDOW_TOKENS};
    use crate::ner::{NerBackend, RawNerEntity};

    #[derive(Deserialize)]
    struct ModelConfig {
        id2label: HashMap<String, String>,
    }

    /// ONNX token-classification model.
    pub struct OnnxNerModel {
        session: Arc<Mutex<Session>>,
        tokenizer: Tokenizer,
        labels: Vec<String>,
        cls_id: u32,
        sep_id: u32,
    }

    impl OnnxNerModel {
        /// Load from a directory holding `model.onnx`, `tokenizer.json`
        /// and `config.json`.
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");
            let config_path = model_dir.join("config.json");

            for path in [&model_path, &tokenizer_path, &config_path] {
                if !path.exists() {
                    return Err(Error::Ner(format!("Model file not found: {}", path.display())));
                }
            }

            let config: ModelConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
            let mut labels = vec![String::from("O"); config.id2label.len()];
            for (id, label) in config.id2label {
                let id: usize = id
                    .parse()
                    .map_err(|_| Error::Ner(format!("Bad label id in config.json: {}", id)))?;
                if id >= labels.len() {
                    return Err(Error::Ner(format!("Label id {} out of range", id)));
                }
                labels[id] = label;
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::Ner(format!("Failed to create session builder: {}", e)))?
                .with_intra_threads(2)
                .map_err(|e| Error::Ner(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Ner(format!("Failed to load ONNX model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Ner(format!("Failed to load tokenizer: {}", e)))?;
            let special = |token: &str| {
                tokenizer
                    .token_to_id(token)
                    .ok_or_else(|| Error::Ner(format!("Tokenizer has no {} token", token)))
            };
            let cls_id = special("[CLS]")?;
            let sep_id = special("[SEP]")?;

            info!(
                "ONNX NER model loaded: labels={}, model={}",
                labels.len(),
                model_path.display()
            );

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer,
                labels,
                cls_id,
                sep_id,
            })
        }

        /// Per-token `(label, score, char_start, char_end)` over the whole
        /// text, one model run per window.
        fn classify(&self, text: &str) -> Result<Vec<(String, f64, usize, usize)>> {
            let encoding = self
                .tokenizer
                .encode_char_offsets(text, false)
                .map_err(|e| Error::Ner(format!("Tokenization failed: {}", e)))?;
            let ids = encoding.get_ids();
            let offsets = encoding.get_offsets();

            let windows = token_windows(ids.len(), WINDOW_TOKENS, WINDOW_OVERLAP);
            if windows.len() > 1 {
                debug!("ONNX NER: {} tokens in {} windows", ids.len(), windows.len());
            }
            let mut predictions = Vec::with_capacity(windows.len());
            for window in windows {
                let scores = self.run_window(&ids[window.clone()])?;
                predictions.push((window, scores));
            }

            let tokens = merge_predictions(ids.len(), &predictions)
                .into_iter()
                .zip(offsets)
                .filter_map(|(prediction, &(start, end))| {
                    let (label, score) = prediction?;
                    (start != end).then(|| (self.labels[label].clone(), score, start, end))
                })
                .collect();
            Ok(tokens)
        }

        /// Argmax `(label index, probability)` for each of `ids`, wrapped in
        /// `[CLS]`/`[SEP]` for the run.
        fn run_window(&self, ids: &[u32]) -> Result<Vec<(usize, f64)>> {
            let seq_len = ids.len() + 2;
            let input_ids: Vec<i64> = std::iter::once(self.cls_id)
                .chain(ids.iter().copied())
                .chain(std::iter::once(self.sep_id))
                .map(|id| id as i64)
                .collect();
            let mask = vec![1i64; seq_len];
            let type_ids = vec![0i64; seq_len];

            let tensor = |data: Vec<i64>| {
                Tensor::from_array(([1usize, seq_len], data))
                    .map_err(|e| Error::Ner(format!("Failed to create input tensor: {}", e)))
            };
            let inputs = ort::inputs![tensor(input_ids)?, tensor(mask)?, tensor(type_ids)?];

            let mut session = self.session.lock();
            let outputs = session
                .run(inputs)
                .map_err(|e| Error::Ner(format!("ONNX inference failed: {}", e)))?;

            // Logits: [1, seq_len, num_labels].
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Ner(format!("Failed to extract logits: {}", e)))?;
            let dims: Vec<i64> = shape.iter().copied().collect();
            if dims.len() != 3 || dims[1] as usize != seq_len || dims[2] as usize != self.labels.len() {
                return Err(Error::Ner(format!("Unexpected logits shape: {:?}", dims)));
            }
            let logits = ArrayView2::from_shape((seq_len, dims[2] as usize), data)
                .map_err(|e| Error::Ner(format!("Bad logits layout: {}", e)))?;

            let scores = logits
                .outer_iter()
                .skip(1)
                .take(ids.len())
                .map(|row| {
                    let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                    let exp: Vec<f32> = row.iter().map(|&v| (v - max).exp()).collect();
                    let sum: f32 = exp.iter().sum();
                    let (best, best_p) = exp
                        .iter()
                        .enumerate()
                        .fold((0, 0.0f32), |acc, (j, &p)| if p > acc.1 { (j, p) } else { acc });
                    (best, (best_p / sum) as f64)
                })
                .collect();
            Ok(scores)
        }
    }

    impl NerBackend for OnnxNerModel {
        fn name(&self) -> &str {
            "onnx"
        }

        fn recognize(&self, text: &str, _language: &str) -> Result<Vec<RawNerEntity>> {
            let tokens = self.classify(text)?;
            let entities = aggregate_simple(text, &tokens);
            debug!("ONNX NER: {} tokens → {} entities", tokens.len(), entities.len());
            Ok(entities)
        }
    }

    /// Merge B-/I- tagged tokens into entity groups; score is the mean
    /// token score.
    fn aggregate_simple(text: &str, tokens: &[(String, f64, usize, usize)]) -> Vec<RawNerEntity> {
        let chars: Vec<char> = text.chars().collect();
        let mut entities = Vec::new();
        let mut current: Option<(String, Vec<f64>, usize, usize)> = None;

        let mut flush = |current: &mut Option<(String, Vec<f64>, usize, usize)>| {
            if let Some((group, scores, start, end)) = current.take() {
                let end = end.min(chars.len());
                entities.push(RawNerEntity {
                    entity_group: group,
                    word: chars[start.min(end)..end].iter().collect(),
                    score: scores.iter().sum::<f64>() / scores.len() as f64,
                    start: Some(start),
                    end: Some(end),
                });
            }
        };

        for (label, score, start, end) in tokens {
            if label == "O" {
                flush(&mut current);
                continue;
            }
            let (prefix, group) = match label.split_once('-') {
                Some((p, g)) if p == "B" || p == "I" => (p, g),
                _ => ("B", label.as_str()),
            };
            let continues = prefix == "I"
                && current.as_ref().map(|(g, ..)| g == group).unwrap_or(false);
            if continues {
                if let Some((_, scores, _, cur_end)) = current.as_mut() {
                    scores.push(*score);
                    *cur_end = *end;
                }
            } else {
                flush(&mut current);
                current = Some((group.to_string(), vec![*score], *start, *end));
            }
        }
        flush(&mut current);
        entities
    }

}

#[cfg(feature = "onnx")]
pub use inner::OnnxNerModel;
