pub mod archive;
pub mod error;
pub mod rate;
pub mod retry;
pub mod source;
pub mod store;
