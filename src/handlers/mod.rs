pub mod file;
pub mod info;
