// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Loads the vocabulary file (one token per line, id = line index)
// and wraps it in a HuggingFace word-level tokenizer.
//
// The tokenizer JSON is assembled in memory and parsed straight
// into a Tokenizer, which avoids the trainer type constraints of
// tokenizers 0.15:
//
//   normalizer     Lowercase
//   pre_tokenizer  Whitespace   ("Hi, you!" → hi , you !)
//   model          WordLevel    unknown words → _UNK
//
// Rendering goes the other way through the id → token list.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};
use std::{fs, path::Path, str::FromStr};
use tokenizers::Tokenizer;

use crate::domain::example::{RESERVED_TOKENS, UNK_ID};
use crate::domain::traits::TokenCodec;

pub struct VocabStore {
    tokenizer: Tokenizer,
    tokens:    Vec<String>,
}

impl VocabStore {
    /// Read a vocabulary file and build the tokenizer for it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary '{}'", path.display()))?;
        let tokens: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        let store = Self::from_tokens(tokens)?;
        tracing::info!("Vocabulary loaded: {} tokens from '{}'", store.len(), path.display());
        Ok(store)
    }

    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(anyhow!("Vocabulary is empty"));
        }
        if !tokens.iter().zip(RESERVED_TOKENS).all(|(t, r)| t == r) {
            tracing::warn!("Vocabulary does not start with {:?}", RESERVED_TOKENS);
        }

        // First occurrence wins for duplicate lines
        let mut vocab = Map::new();
        for (id, token) in tokens.iter().enumerate() {
            if !token.is_empty() && !vocab.contains_key(token) {
                vocab.insert(token.clone(), json!(id));
            }
        }

        let tokenizer_json = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": Value::Object(vocab),
                "unk_token": RESERVED_TOKENS[UNK_ID as usize]
            }
        });

        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow!("Cannot build tokenizer: {e}"))?;

        Ok(Self { tokenizer, tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }
}

impl TokenCodec for VocabStore {
    fn encode(&self, sentence: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(sentence.trim(), false)
            .map_err(|e| anyhow!("Tokenise: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn render(&self, ids: &[u32]) -> String {
        ids.iter()
            .map(|&id| self.token(id).unwrap_or(RESERVED_TOKENS[UNK_ID as usize]))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
