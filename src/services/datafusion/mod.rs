// DataFusion default engine
//
// Default implementations of the engine-facing traits:
// 1. SQL parsing with sqlparser, including extension statements
// 2. Planning and execution on a DataFusion SessionContext
// 3. Arrow result conversion to JSON rows
// 4. Table-level lineage analysis

pub mod session; // DataFusionSessionManager
pub mod parser; // SqlStatementParser
pub mod engine; // DataFusionEngine
pub mod converter; // DataFusionResultConverter
pub mod lineage; // SqlLineageAnalyzer

// Re-exports for convenient access
pub use session::{DataFusionSessionManager, SessionConfig};
pub use parser::SqlStatementParser;
pub use engine::DataFusionEngine;
pub use converter::DataFusionResultConverter;
pub use lineage::SqlLineageAnalyzer;
