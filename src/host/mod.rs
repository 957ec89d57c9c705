//! Host integration: the render hook and its async driver.
//!
//! `PlaceholderRuntime` is synchronous and clock-free; `run_event_loop`
//! owns it on a tokio task and turns host events and timer deadlines into
//! runtime calls.

pub mod driver;
pub mod runtime;

pub use driver::{run_event_loop, HostEvent};
pub use runtime::{PlaceholderRuntime, RenderedPost, RuntimeTask};
