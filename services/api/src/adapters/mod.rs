pub mod crypto;
pub mod db;
pub mod identity;
pub mod storage;
pub mod worker;

pub use crypto::ChaChaFieldCipher;
pub use db::DbAdapter;
pub use identity::JwtIdentityAdapter;
pub use storage::ObjectStorageAdapter;
pub use worker::AnalysisWorkerAdapter;
