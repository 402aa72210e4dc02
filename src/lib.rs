pub mod common;
pub mod config;
pub mod error;
pub mod network;
pub mod storage;
pub mod sync;
pub mod ui;

pub use config::SyncConfig;
pub use error::{FetchError, SelectError, SendError, StoreError};
pub use network::{HttpStore, RemoteStore};
pub use sync::SessionController;
