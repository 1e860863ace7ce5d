pub mod client;
pub mod types;
pub mod vision;

pub use vision::GeminiVisionClient;
