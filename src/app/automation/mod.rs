pub mod capabilities;
pub mod driver;
pub mod session;
pub mod webdriver;

#[cfg(test)]
pub(crate) mod fake;

pub use driver::{AutomationDriver, ElementId, Locator, SessionId};
pub use session::{DigitEntryReport, SessionManager, SessionSettings, SessionState};
pub use webdriver::WebDriverClient;
