pub mod error;
pub mod poller;
pub mod queue;
pub mod session;
pub mod storage;

pub use error::SessionError;
pub use poller::{PollCancellation, PollError, PollHandle, RunPoller};
pub use queue::OfflineQueue;
pub use session::{ConversationSession, SendOutcome, SessionSnapshot};
pub use storage::{JsonFileStore, MemoryStore, SessionStore, StoreError};
