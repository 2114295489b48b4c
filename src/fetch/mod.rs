pub mod files;
pub mod urls;
