mod types;

pub use types::{ListenerError, Result};
