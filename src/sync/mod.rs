//! Synchronization primitives shared across a pipeline.

pub mod listeners;
pub mod monitor;

pub use listeners::{Listener, ListenerSet};
pub use monitor::{
    ensure_same_monitor, Monitor, MonitorGuard, NoopMonitor, ReadWriteMonitor, SharedMonitor,
};
