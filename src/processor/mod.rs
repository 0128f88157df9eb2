pub mod column_profiler;
pub mod field_cleaner;
pub mod file_analyzer;
pub mod record_builder;
pub mod schema_mapper;
pub mod time_parser;

pub use column_profiler::*;
pub use field_cleaner::*;
pub use file_analyzer::*;
pub use record_builder::*;
pub use schema_mapper::*;
pub use time_parser::*;
