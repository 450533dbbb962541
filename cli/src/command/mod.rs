pub mod files;
pub mod resolve;
