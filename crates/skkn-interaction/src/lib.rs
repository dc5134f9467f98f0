pub mod gemini_stream_client;
pub mod supported_models;

pub use gemini_stream_client::GeminiStreamClient;
