mod error;
mod memory;
mod record;
mod traits;

pub use error::IndexError;
pub use memory::MemoryMetadataIndex;
pub use record::{ContentRecord, Principal};
pub use traits::MetadataIndex;
