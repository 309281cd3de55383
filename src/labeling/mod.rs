//! Weak-label inputs for the label model.
//!
//! Converts per-source votes into the augmented indicator matrix the model consumes.

pub mod augment;
pub mod votes;
