//! Pulse counting firmware daemon.
//!
//! Watches an active-low switch line, debounces and counts closures,
//! persists the running total across power loss, and periodically reports
//! it to a remote collector.
//!
//! Three components carry the real invariants:
//!
//! - [`debounce::EdgeCounter`] turns a noisy edge stream into a reliable
//!   monotonic count (settle window + minimum pulse spacing).
//! - [`store::CounterStore`] remembers the count durably while sparing the
//!   storage medium's write endurance.
//! - [`reporter::Reporter`] runs the dual-interval publish/persist policy,
//!   where a publish always forces a persist.
//!
//! Everything else (storage medium, collector transport, the physical input
//! line) sits behind capability traits with small concrete implementations.

pub mod config;
pub mod count;
pub mod debounce;
pub mod hw;
pub mod reporter;
pub mod store;
pub mod tracing;
pub mod transport;
