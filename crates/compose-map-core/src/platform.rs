//! Platform abstraction for the serial runtime.
//!
//! The coordinator never blocks and never spawns threads. Work that must run
//! "on the next turn" is queued on the [`Runtime`](crate::Runtime) and the
//! host is asked, through [`RuntimeScheduler`], to come back and drain it.

/// Requests host turns on behalf of the runtime.
///
/// Implementations must be callable from the thread that drives the runtime;
/// `Send + Sync` lets a host share one scheduler with a cross-thread waker.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host run another turn soon.
    fn request_turn(&self);
}
