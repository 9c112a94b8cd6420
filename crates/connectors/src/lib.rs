pub mod archive;
pub mod nvd;
pub mod postgres;
