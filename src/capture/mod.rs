pub mod bus;
pub mod commands;
pub mod sink;

pub use bus::{DashboardMessage, EventBus};
pub use sink::CaptureSink;
