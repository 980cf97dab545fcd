pub mod asset;
#[macro_use]
pub mod exception;
pub mod json;
pub mod log;
#[cfg(feature = "s3")]
pub mod s3;
