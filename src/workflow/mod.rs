//! The proof-submission and verification workflow: the one part of the
//! system with multi-step state transitions and cross-entity invariants.
//! Everything here is thin glue over the database and the external
//! providers, sequenced carefully where order matters.

pub mod accounts;
pub mod progress;
pub mod roles;
pub mod submission;
