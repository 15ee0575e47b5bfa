pub mod error;
pub mod service;

pub use error::{Error, Result};
pub use service::{DenyReason, Destination, NewService, PostIntent, Posting, Service, Transfer};
