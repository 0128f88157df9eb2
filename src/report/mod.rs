pub mod inventory_report;

pub use inventory_report::*;
