// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types and traits describing the experiment:
// reviews, metrics, run results, fine-tuning strategies and the
// contracts the ML collaborators must satisfy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only structs, enums, traits and pure functions
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Error taxonomy shared by every layer below the CLI
pub mod error;

/// Labelled and tokenised review examples
pub mod review;

/// Accuracy, micro precision and cross-entropy from logits
pub mod metrics;

/// Training modes and the normalised result record
pub mod outcome;

/// Full / classifier-only / adapter strategies
pub mod strategy;

// Collaborator contracts implemented by other layers
pub mod traits;
