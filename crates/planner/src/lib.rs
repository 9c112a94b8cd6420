pub mod pages;
pub mod windows;
