//! Machine learning components.
//!
//! The label model turns votes from weak sources into probabilistic training labels.

pub mod label_model;
