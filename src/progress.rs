// src/progress.rs

//! Package operation events
//!
//! The orchestrator reports each applied operation through the
//! `OperationObserver` trait so CLI and IDE layers can render progress
//! without this core knowing how. Implementations:
//! - `LogObserver`: logs events through tracing
//! - `CallbackObserver`: forwards events to a closure
//!
//! Observers must be thread-safe: a background restore delivers events from
//! its worker thread.

use crate::package::PackageIdentity;
use crate::planner::OperationKind;
use std::fmt;
use tracing::info;

/// An applied package operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEvent {
    pub kind: OperationKind,
    pub package: PackageIdentity,
}

impl OperationEvent {
    pub fn new(kind: OperationKind, package: PackageIdentity) -> Self {
        Self { kind, package }
    }
}

impl fmt::Display for OperationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.package)
    }
}

/// Receiver for applied-operation notifications
pub trait OperationObserver: Send + Sync {
    fn on_operation(&self, event: &OperationEvent);
}

/// Observer that logs each event at info level
#[derive(Debug, Default)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl OperationObserver for LogObserver {
    fn on_operation(&self, event: &OperationEvent) {
        match event.kind {
            OperationKind::Install => info!("installed {}", event.package),
            OperationKind::Uninstall => info!("uninstalled {}", event.package),
        }
    }
}

/// Observer forwarding each event to a caller-supplied closure
pub struct CallbackObserver {
    callback: Box<dyn Fn(&OperationEvent) + Send + Sync>,
}

impl CallbackObserver {
    pub fn new(callback: impl Fn(&OperationEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl OperationObserver for CallbackObserver {
    fn on_operation(&self, event: &OperationEvent) {
        (self.callback)(event)
    }
}
