pub mod joke_llm;
pub mod kv_backend;
pub mod local_store;

pub use joke_llm::OpenAiJokeAdapter;
pub use kv_backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use local_store::LocalStorageAdapter;
