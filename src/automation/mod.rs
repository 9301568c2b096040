//! Request documents for the automation backend. The backend replays a workflow
//! (or a free-text task) in a real browser; this crate only prepares its input.

pub mod commands;
pub mod request;

pub use request::{
    apply_secret_placeholders, parse_input_values, AutomateOptions, AutomateRequest,
    BackendEvent, TaskRequest,
};
