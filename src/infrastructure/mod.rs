pub(crate) mod clients;
pub(crate) mod export;
pub(crate) mod scrapers;
mod storage;

pub use clients::wiki::WikiClient;
pub use storage::fs_store::FileSystemStore;
