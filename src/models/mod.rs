pub mod analysis;
pub mod exam_record;
pub mod manifest;
pub mod sheet;

pub use analysis::*;
pub use exam_record::*;
pub use manifest::*;
pub use sheet::*;
