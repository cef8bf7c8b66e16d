//! Headless view layer: debounced input, form validation, the dashboard controller and text rendering.
//!
//! Views never change domain entities themselves. Every mutation goes through a store intent.

pub mod dashboard;
pub mod debounce;
pub mod forms;
pub mod render;

pub use dashboard::{ActionError, Dashboard, Modal};
pub use debounce::Debouncer;
pub use forms::{EditForm, FormError, IssueForm, LoginForm, SignupForm};
