pub mod browser;
#[cfg(test)]
pub mod mock;
pub mod traits;

pub use browser::ChromeSession;
pub use traits::{NetworkWait, UiSession};
