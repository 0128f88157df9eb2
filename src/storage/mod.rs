pub mod atomic_file;
pub mod attachment_store;
pub mod dataset_store;

pub use atomic_file::*;
pub use attachment_store::*;
pub use dataset_store::*;
