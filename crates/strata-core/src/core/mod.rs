// crates/strata-core/src/core/mod.rs
// ============================================================================
// Module: Strata Core Primitives
// Description: Hashing, identifiers, wall-clock helpers, patterns, and properties.
// Purpose: Provide the small shared building blocks used by every other module.
// Dependencies: sha2, time, uuid
// ============================================================================

//! ## Overview
//! Primitives shared by the store, the readers, and the runtime: content
//! hashing, object-id generation and naming, timestamps, glob-style pattern
//! matching, and typed component properties.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod pattern;
pub mod properties;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use hashing::hash_hex;
pub use identifiers::generate_uuid;
pub use pattern::wildcard_match;
pub use properties::Properties;
pub use properties::PropertyError;
pub use properties::PropertyValue;
pub use time::now_timestamp;
