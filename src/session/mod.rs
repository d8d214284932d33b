mod context;
mod file_store;
mod memory;
mod secret_store;
mod storage;

pub use context::{Credentials, Session};
pub use file_store::FileStorage;
pub use memory::MemoryStorage;
pub use secret_store::{KeyringStorage, KEYRING_SERVICE};
pub use storage::{SessionKey, SessionStorage, StorageError};
