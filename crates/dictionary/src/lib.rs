pub mod cache;
pub mod config;
pub mod memory;
pub mod store;
pub mod term;

pub use cache::TermCache;
pub use config::Config;
pub use memory::MemoryStore;
pub use store::{is_valid_collection_name, is_valid_key_value, FetchedTerm, Store, StoreError};
pub use term::Term;
