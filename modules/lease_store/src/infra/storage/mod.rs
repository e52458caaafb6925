pub mod item;
pub mod memory_kv;
pub mod memory_table;
pub mod path_store;
pub mod record;
pub mod table_store;

pub use memory_kv::{MemoryPathKv, PathItem, PathKv};
pub use memory_table::{ItemTable, MemoryTable, MemoryTableOptions};
pub use path_store::HierarchicalStore;
pub use table_store::SingleTableStore;
