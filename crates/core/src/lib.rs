pub mod config;
pub mod error;
pub mod message;
pub mod paths;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use message::{ChatReply, ChatRequest, QuestionRequest, UserContext};
pub use paths::Paths;
