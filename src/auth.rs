//! Bearer credentials and the refresh contract used when the backend rejects them.

pub mod credential;
pub mod refresh;

pub use credential::*;
pub use refresh::*;
