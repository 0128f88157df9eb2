pub mod notice_crawler;
pub mod sheet_reader;

pub use notice_crawler::*;
pub use sheet_reader::*;
