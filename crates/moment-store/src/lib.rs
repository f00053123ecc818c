pub mod blob;
pub mod cell;
pub mod memory;
pub mod tabular;

pub use blob::{Blob, BlobStore, DiskBlobStore};
pub use cell::Cell;
pub use memory::{MemoryBlobStore, MemoryTabularStore};
pub use tabular::{SqliteTabularStore, TabularStore};
