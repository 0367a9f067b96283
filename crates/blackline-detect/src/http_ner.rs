//! Hosted token-classification endpoint (Hugging Face inference API shape).

use std::time::Duration;

use blackline_core::{Error, NerSettings, Result};
use serde_json::{json, Value};
use tracing::debug;

use crate::ner::{NerBackend, RawNerEntity};

/// Request timeout for the hosted endpoint.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for `POST {endpoint}/models/{model}`.
pub struct HttpNerClient {
    client: reqwest::blocking::Client,
    name: &'static str,
    endpoint: String,
    api_token: Option<String>,
    english_model: String,
    multilingual_model: String,
}

impl HttpNerClient {
    pub fn new(settings: &NerSettings) -> Result<Self> {
        Self::build(settings, "hosted", false)
    }

    /// Same endpoint with the model choice swapped: the multilingual model
    /// serves English text and the English model serves everything else.
    /// Used as the second tier when no local model is loaded.
    pub fn alternate(settings: &NerSettings) -> Result<Self> {
        Self::build(settings, "hosted-alternate", true)
    }

    fn build(settings: &NerSettings, name: &'static str, swapped: bool) -> Result<Self> {
        let (english_model, multilingual_model) = if swapped {
            (settings.multilingual_model.clone(), settings.english_model.clone())
        } else {
            (settings.english_model.clone(), settings.multilingual_model.clone())
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build NER client: {}", e)))?;

        Ok(Self {
            client,
            name,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            english_model,
            multilingual_model,
        })
    }

    /// English text goes to the English model, everything else to the
    /// multilingual one.
    pub fn model_for(&self, language: &str) -> &str {
        if language == "en" {
            &self.english_model
        } else {
            &self.multilingual_model
        }
    }
}

impl NerBackend for HttpNerClient {
    fn name(&self) -> &str {
        self.name
    }

    fn recognize(&self, text: &str, language: &str) -> Result<Vec<RawNerEntity>> {
        let model = self.model_for(language);
        let url = format!("{}/models/{}", self.endpoint, model);
        debug!("NER request: model={}, chars={}", model, text.chars().count());

        let mut request = self.client.post(&url).json(&json!({
            "inputs": text,
            "parameters": { "aggregation_strategy": "simple" },
            "options": { "wait_for_model": true },
        }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| Error::Ner(format!("{} unreachable: {}", model, e)))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| Error::Ner(format!("{} returned unreadable body: {}", model, e)))?;

        if !status.is_success() {
            let reason = body
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("no error message");
            return Err(Error::Ner(format!("{} returned {}: {}", model, status, reason)));
        }

        parse_response(body)
    }

    fn is_available(&self) -> bool {
        self.api_token.is_some()
    }
}

/// Accept both a flat entity list and the batched `[[...]]` form.
fn parse_response(body: Value) -> Result<Vec<RawNerEntity>> {
    if let Some(reason) = body.get("error").and_then(|v| v.as_str()) {
        return Err(Error::Ner(reason.to_string()));
    }
    let items = match body {
        Value::Array(items) if items.iter().all(Value::is_array) => items
            .into_iter()
            .flat_map(|inner| match inner {
                Value::Array(v) => v,
                _ => Vec::new(),
            })
            .collect(),
        Value::Array(items) => items,
        other => return Err(Error::Ner(format!("unexpected NER response: {}", other))),
    };
    let entities = serde_json::from_value(Value::Array(items))?;
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_selection_by_language() {
        let client = HttpNerClient::new(&NerSettings::default()).unwrap();
        assert_eq!(client.model_for("en"), "dslim/bert-base-NER");
        assert_eq!(client.model_for("hi"), "Davlan/bert-base-multilingual-cased-ner-hrl");
        assert_eq!(client.model_for("fr"), client.model_for("es"));
    }

    #[test]
    fn test_alternate_swaps_models() {
        let settings = NerSettings::default();
        let primary = HttpNerClient::new(&settings).unwrap();
        let alternate = HttpNerClient::alternate(&settings).unwrap();

        assert_eq!(alternate.name(), "hosted-alternate");
        assert_eq!(alternate.model_for("en"), primary.model_for("hi"));
        assert_eq!(alternate.model_for("hi"), primary.model_for("en"));
        assert_ne!(alternate.model_for("en"), primary.model_for("en"));
    }

    #[test]
    fn test_parse_flat_and_batched() {
        let flat = json!([{"entity_group": "PER", "word": "Ana", "score": 0.9, "start": 0, "end": 3}]);
        assert_eq!(parse_response(flat).unwrap().len(), 1);

        let batched = json!([[
            {"entity_group": "PER", "word": "Ana", "score": 0.9, "start": 0, "end": 3},
            {"entity_group": "LOC", "word": "Pune", "score": 0.8, "start": 10, "end": 14}
        ]]);
        let parsed = parse_response(batched).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].word, "Pune");
    }

    #[test]
    fn test_parse_error_body() {
        let body = json!({"error": "Model is currently loading", "estimated_time": 20.0});
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("loading"));
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_response(json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_unavailable_without_token() {
        let client = HttpNerClient::new(&NerSettings::default()).unwrap();
        assert!(!client.is_available());
    }
}
