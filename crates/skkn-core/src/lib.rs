pub mod banner;
pub mod budget;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod key_pool;
pub mod llm;
pub mod locator;
pub mod machine;
pub mod session;
pub mod solutions;
pub mod step;
pub mod storage;
pub mod subjects;
pub mod template;
pub mod user_info;

// Re-export common error type
pub use error::{Result, SkknError};
