// livecraft-common/src/lib.rs
//
// Types shared by every livecraft crate: the workspace error, the stored
// record models, and the traits at the storage and side-effect seams.

pub mod error;
pub mod models;
pub mod traits;

pub use error::Error;
