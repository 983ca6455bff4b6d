//! Built-in notification capabilities.

pub mod notify;

pub use notify::register_builtin_tools;
