//! Small async helpers shared by the drivers and adapters.

mod wait;

pub use wait::{WaitError, wait_until};
