pub mod error;
pub mod engine;
pub mod properties;
pub mod dispatcher;
pub mod handlers;
pub mod assembler;
pub mod statement_translator;
pub mod statement_service;
pub mod datafusion; // DataFusion default engine

#[cfg(test)]
pub mod testing;

pub use assembler::*;
pub use dispatcher::*;
pub use engine::*;
pub use error::*;
pub use handlers::*;
pub use properties::*;
pub use statement_service::*;
pub use statement_translator::*;
