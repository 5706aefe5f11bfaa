// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (comparing strategies or checking an export).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - No direct file formats (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// One variant through evaluate → train → evaluate → export
pub mod orchestrator;

// Experiment settings and review selection
pub mod experiment;

// The strategy comparison workflow
pub mod compare_use_case;

// Reload-and-evaluate workflow for exported variants
pub mod verify_use_case;
