pub mod explain;
pub mod lineage;
pub mod operation;
pub mod request;
pub mod result;
pub mod statement;

pub use explain::*;
pub use lineage::*;
pub use operation::*;
pub use request::*;
pub use result::*;
pub use statement::*;
