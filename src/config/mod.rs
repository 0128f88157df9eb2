pub mod crawler_config;
pub mod pipeline_config;

pub use crawler_config::CrawlerConfig;
pub use pipeline_config::*;
