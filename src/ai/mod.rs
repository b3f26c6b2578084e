pub mod decode;
pub mod error;
pub mod gemini;
pub mod huggingface;
pub mod local;
pub mod transport;

pub use huggingface::{HuggingFaceClient, SessionState};
pub use local::{LocalAI, SeededRandom, ThreadRandom};
pub use transport::ReqwestTransport;
