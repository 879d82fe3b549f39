//! Order lifecycle workflow for the marketplace.
//!
//! This crate provides:
//! - [`OrderWorkflow`]: create, cancel and ship orders with stock reservation
//! - [`NotificationDispatcher`]: notifications for every order transition
//! - [`NotificationService`]: a user's notification inbox
//! - [`NotificationBus`]: live fan-out of stored notifications

pub mod bus;
pub mod compensation;
pub mod dispatcher;
pub mod error;
pub mod notifications;
pub mod workflow;

pub use bus::NotificationBus;
pub use compensation::{CompensationLog, CompensationStep};
pub use dispatcher::NotificationDispatcher;
pub use error::{Result, WorkflowError};
pub use notifications::{ManualNotification, NotificationService};
pub use workflow::OrderWorkflow;
