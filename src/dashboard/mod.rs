pub mod commands;
pub mod debounce;
pub mod presenter;
pub mod render;
pub mod watcher;

pub use debounce::Debouncer;
pub use presenter::{DashboardPresenter, Surface, TerminalSurface};
pub use render::DetailOptions;
pub use watcher::DashboardWatcher;
