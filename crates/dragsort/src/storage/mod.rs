pub mod memory;

pub use memory::MemoryPivotStore;
