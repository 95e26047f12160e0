pub mod statement_classifier;

pub use statement_classifier::*;
