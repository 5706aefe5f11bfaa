// ============================================================
// Layer 4: Split Selection
// ============================================================
// Two ways of deciding which reviews an experiment uses:
//
//   take_fraction  → "the first X% of a split", deterministic,
//                    used on the train and test files
//   split_holdout  → seeded shuffle + cut, used only when the
//                    dataset ships without a test file
//
// Experiments are repeated at several dataset sizes, so both
// must return exactly the same examples for the same inputs.
//
// Reference: rand crate documentation (SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::PeftError;

/// Number of items "the first `fraction`" of `total` refers to.
///
/// Rounds to the nearest item, so 1% of 150 items is 2.
pub fn fraction_count(total: usize, fraction: f64) -> Result<usize, PeftError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(PeftError::Dataset(format!(
            "fraction must be in (0, 1], got {fraction}"
        )));
    }
    let count = ((total as f64) * fraction).round() as usize;
    Ok(count.min(total))
}

/// Keep the first `fraction` of `items`, preserving order.
pub fn take_fraction<T>(mut items: Vec<T>, fraction: f64) -> Result<Vec<T>, PeftError> {
    let keep = fraction_count(items.len(), fraction)?;
    items.truncate(keep);
    Ok(items)
}

/// Shuffle with a fixed seed and split off the last `holdout_fraction`.
///
/// Returns `(kept, held_out)`.
pub fn split_holdout<T>(mut items: Vec<T>, holdout_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);

    let total    = items.len();
    let held_out = ((total as f64) * holdout_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = total - held_out.min(total);

    let holdout = items.split_off(split_at);

    tracing::debug!(
        "Holdout split: {} kept, {} held out (seed {})",
        items.len(),
        holdout.len(),
        seed,
    );

    (items, holdout)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_fraction_keeps_prefix() {
        let items: Vec<usize> = (0..200).collect();
        let kept              = take_fraction(items, 0.05).unwrap();
        assert_eq!(kept, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_take_fraction_rounds() {
        assert_eq!(fraction_count(150, 0.01).unwrap(), 2);
        assert_eq!(fraction_count(10, 1.0).unwrap(), 10);
        assert_eq!(fraction_count(0, 0.5).unwrap(), 0);
    }

    #[test]
    fn test_fraction_out_of_range() {
        assert!(fraction_count(10, 0.0).is_err());
        assert!(fraction_count(10, 1.5).is_err());
        assert!(fraction_count(10, f64::NAN).is_err());
    }

    #[test]
    fn test_holdout_is_seeded() {
        let items: Vec<usize> = (0..40).collect();
        let (a_keep, a_out)   = split_holdout(items.clone(), 0.25, 7);
        let (b_keep, b_out)   = split_holdout(items, 0.25, 7);
        assert_eq!(a_keep, b_keep);
        assert_eq!(a_out, b_out);
        assert_eq!(a_out.len(), 10);
        assert_eq!(a_keep.len() + a_out.len(), 40);
    }

    #[test]
    fn test_holdout_of_empty() {
        let (keep, out) = split_holdout(Vec::<usize>::new(), 0.2, 1);
        assert!(keep.is_empty());
        assert!(out.is_empty());
    }
}
