// ============================================================
// Layer 4: Review Encoder
// ============================================================
// Turns cleaned review text into fixed-length model input:
//
//   [CLS] tok tok tok ... [PAD] [PAD]
//    101   ..  ..  ..     0     0
//
//   attention_mask: 1 for real tokens, 0 for padding
//
// Every example comes out exactly max_seq_len long. Reviews longer
// than that are truncated; the [CLS] position is what the
// classifier head reads, so it is always kept.
//
// Token ids the model's embedding table cannot hold (a tokenizer
// built for a larger vocabulary) are mapped to [UNK].

use tokenizers::Tokenizer;

use crate::domain::{
    error::PeftError,
    review::{LabeledExample, TokenizedExample},
};
use crate::infra::tokenizer_store::{CLS_ID, PAD_ID, UNK_ID};

pub struct ReviewEncoder<'a> {
    tokenizer:   &'a Tokenizer,
    max_seq_len: usize,
    vocab_size:  usize,
}

impl<'a> ReviewEncoder<'a> {
    pub fn new(tokenizer: &'a Tokenizer, max_seq_len: usize, vocab_size: usize) -> Self {
        Self { tokenizer, max_seq_len, vocab_size }
    }

    /// `(input_ids, attention_mask)` for one text.
    pub fn encode(&self, text: &str) -> Result<(Vec<u32>, Vec<u32>), PeftError> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| PeftError::Dataset(format!("tokenisation error: {e}")))?;

        let mut input_ids = Vec::with_capacity(self.max_seq_len);
        input_ids.push(CLS_ID);
        input_ids.extend(
            enc.get_ids()
                .iter()
                .map(|&id| if (id as usize) < self.vocab_size { id } else { UNK_ID }),
        );
        input_ids.truncate(self.max_seq_len);

        let mut attention_mask = vec![1u32; input_ids.len()];
        input_ids.resize(self.max_seq_len, PAD_ID);
        attention_mask.resize(self.max_seq_len, 0);

        Ok((input_ids, attention_mask))
    }

    /// Encode every example, one-to-one and in order.
    pub fn encode_all(&self, examples: &[LabeledExample]) -> Result<Vec<TokenizedExample>, PeftError> {
        let encoded = examples
            .iter()
            .map(|ex| {
                let (input_ids, attention_mask) = self.encode(&ex.text)?;
                Ok(TokenizedExample {
                    text: ex.text.clone(),
                    label: ex.label,
                    input_ids,
                    attention_mask,
                })
            })
            .collect::<Result<Vec<_>, PeftError>>()?;

        let filled = encoded.iter().filter(|ex| ex.token_count() == self.max_seq_len).count();
        tracing::debug!(
            "Encoded {} reviews ({} fill all {} positions, possibly truncated)",
            encoded.len(),
            filled,
            self.max_seq_len,
        );
        Ok(encoded)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn tokenizer(dir: &std::path::Path) -> Tokenizer {
        let corpus = vec![
            "the food was great".to_string(),
            "the service was slow".to_string(),
        ];
        TokenizerStore::new(dir).load_or_build(&corpus, 200).unwrap()
    }

    #[test]
    fn test_pads_to_fixed_length() {
        let tmp = tempfile::tempdir().unwrap();
        let tok = tokenizer(tmp.path());
        let enc = ReviewEncoder::new(&tok, 8, 200);

        let (ids, mask) = enc.encode("the food was great").unwrap();
        assert_eq!(ids.len(), 8);
        assert_eq!(mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(ids[0], CLS_ID);
        assert!(ids[5..].iter().all(|&id| id == PAD_ID));
    }

    #[test]
    fn test_truncates_long_text() {
        let tmp = tempfile::tempdir().unwrap();
        let tok = tokenizer(tmp.path());
        let enc = ReviewEncoder::new(&tok, 3, 200);

        let (ids, mask) = enc.encode("the food was great the service was slow").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(mask, vec![1, 1, 1]);
    }

    #[test]
    fn test_ids_outside_model_vocab_become_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let tok = tokenizer(tmp.path());
        // CLS (101) still fits; every word id (>= 104) does not
        let enc = ReviewEncoder::new(&tok, 4, 104);

        let (ids, _) = enc.encode("food was great").unwrap();
        assert_eq!(ids, vec![CLS_ID, UNK_ID, UNK_ID, UNK_ID]);
    }

    #[test]
    fn test_encode_all_preserves_order_and_labels() {
        let tmp      = tempfile::tempdir().unwrap();
        let tok      = tokenizer(tmp.path());
        let enc      = ReviewEncoder::new(&tok, 6, 200);
        let examples = vec![
            LabeledExample::new("great", 4),
            LabeledExample::new("slow", 1),
        ];

        let out = enc.encode_all(&examples).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, 4);
        assert_eq!(out[1].text, "slow");
        assert_eq!(out[1].token_count(), 2);
        assert_eq!(out, enc.encode_all(&examples).unwrap());
    }
}
