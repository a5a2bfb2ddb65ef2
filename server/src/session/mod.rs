pub mod handle;
pub mod manager;
pub mod prefix;
pub mod store;

pub use handle::{Session, SessionErrorResponse};
pub use manager::{SessionError, SessionId, SessionManager};
pub use prefix::{KeyPrefix, PrefixError, PrefixedSession, SessionKeyPrefixConfig, TEMP_DATA_KEY};
pub use store::{SessionData, SessionStore};
