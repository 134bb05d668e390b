pub mod config;
pub mod ids;
pub mod message;
pub mod queue;
pub mod run;

pub use config::{CachePolicy, PollConfig, SessionConfig};
pub use ids::{MessageId, RunId, ThreadId};
pub use message::{Delivery, Message, MessageRole};
pub use queue::QueuedMessage;
pub use run::{Run, RunStatus};
