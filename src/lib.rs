/// Bloodlink - blood donation coordination server
///
/// REST backend for donor accounts, blood-bank inventory, blood drives with
/// capacity-bounded registration, blood requests and contact-form triage.

pub mod account;
pub mod actor;
pub mod api;
pub mod auth;
pub mod blood;
pub mod blood_bank;
pub mod config;
pub mod contact;
pub mod context;
pub mod crypto;
pub mod db;
pub mod error;
pub mod event;
pub mod metrics;
pub mod rate_limit;
pub mod request;
pub mod server;
pub mod validation;

pub use context::AppContext;
pub use error::{AppError, AppResult};
