//! UI panels

mod arrange;
mod browser;
mod lanes;
mod transport;

pub use arrange::{ArrangeAction, ArrangePanel};
pub use browser::{BrowserAction, BrowserPanel, BrowserView};
pub use lanes::{LaneAction, LanesPanel, HEADER_WIDTH};
pub use transport::{TransportAction, TransportPanel};
