pub mod client;
pub mod store;
pub mod transport;

pub use client::HttpStore;
pub use store::{FetchedMessage, LatestNotification, RemoteStore};
