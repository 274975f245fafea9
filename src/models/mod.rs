pub mod event;
pub mod user;

pub use event::{Event, NewEvent};
pub use user::{Credentials, User};
