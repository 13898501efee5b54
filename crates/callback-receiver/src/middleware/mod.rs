//! Receiver middleware stack.

pub mod tracing;

pub use self::tracing::{TracingLayer, TracingService};
