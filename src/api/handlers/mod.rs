pub mod statement;
pub mod statement_set;

pub use statement::AppState;
