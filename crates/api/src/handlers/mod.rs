pub mod cache;
pub mod process;
pub mod seo;
pub mod upload;
