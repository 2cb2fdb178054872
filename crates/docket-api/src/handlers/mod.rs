//! Route handlers, one module per resource.

pub mod auth;
pub mod cases;
pub mod files;
pub mod notifications;
pub mod profile;
pub mod system;
pub mod users;
pub mod ws;
