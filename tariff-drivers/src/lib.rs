//! Browser automation for rendered competitor pages.
//!
//! - [`browser::driver::TariffDriver`]: WebDriver session wrapper implementing
//!   [`tariff_common::PageProvider`], one tab per acquired page
//! - [`browser::page::DriverPage`]: the tab itself, with bounded readiness
//!   waits and, after clicks, polling until the watched region changes
pub mod browser;

pub use browser::driver::{DriverSettings, TariffDriver};
pub use browser::page::DriverPage;
