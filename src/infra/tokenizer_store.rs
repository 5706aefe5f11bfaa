// ============================================================
// Layer 6: Tokenizer Store
// ============================================================
// Keeps the tokenizer next to the experiment's artifacts so the
// runs, the reload check and `verify` all see the same vocabulary.
//
//   <storage>/tokenizer.json   ← HuggingFace tokenizer format
//
// If a tokenizer.json is already there (for example one shipped
// with a pretrained model) it is used as-is. Otherwise a
// word-level vocabulary is built from the training reviews.
//
// Building is deterministic: words are ranked by frequency, ties
// broken alphabetically, so the same corpus always yields the same
// ids. Ids below FIRST_WORD_ID are reserved for special tokens
// (BERT numbering).
//
// Reference: HuggingFace tokenizers JSON format

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const CLS_ID: u32 = 101;
pub const SEP_ID: u32 = 102;
pub const MASK_ID: u32 = 103;

/// First id handed to a corpus word.
pub const FIRST_WORD_ID: u32 = 104;

const FILE_NAME: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(FILE_NAME)
    }

    /// Load the stored tokenizer, or build one from `texts` whose
    /// ids all fit in a `vocab_size` embedding table.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = rank_words(texts, vocab_size.saturating_sub(FIRST_WORD_ID as usize));

        // ── Vocabulary: special tokens first, then ranked words ──────────────
        let mut vocab = serde_json::json!({
            "[PAD]":  PAD_ID,
            "[UNK]":  UNK_ID,
            "[CLS]":  CLS_ID,
            "[SEP]":  SEP_ID,
            "[MASK]": MASK_ID,
        });
        for (offset, word) in words.iter().enumerate() {
            vocab[word.as_str()] = serde_json::json!(FIRST_WORD_ID as usize + offset);
        }

        let special = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        };

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(PAD_ID, "[PAD]"),
                special(UNK_ID, "[UNK]"),
                special(CLS_ID, "[CLS]"),
                special(SEP_ID, "[SEP]"),
                special(MASK_ID, "[MASK]"),
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;

        tracing::info!("Tokenizer built with {} words, saved to '{}'", words.len(), path.display());

        self.load()
    }
}

/// The `limit` most frequent lowercase words of `texts`.
fn rank_words(texts: &[String], limit: usize) -> Vec<String> {
    let mut freq: BTreeMap<String, usize> = BTreeMap::new();

    for text in texts {
        for word in text.split_whitespace() {
            let w = word.to_lowercase();
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            if !w.is_empty() {
                *freq.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    // BTreeMap iterates alphabetically and sort_by is stable,
    // so equal counts stay in alphabetical order.
    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked.into_iter().map(|(w, _)| w).collect()
}
