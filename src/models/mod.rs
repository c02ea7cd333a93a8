pub mod session;

pub use session::{Exercise, Session};
