pub mod entity;
pub mod page;
pub mod report;
pub mod sync;
pub mod window;
