pub mod mock_gemini_server;

pub use mock_gemini_server::{text_response, MockGeminiServer, RecordedRequest};
