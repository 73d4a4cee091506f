//! # Reactive Primitives
//!
//! - [`Dynamic<T>`]: A reactive value that can be observed for changes.
//! - [`Subscription<T>`]: A polling-based subscription to a `Dynamic<T>`.
//!
//! Subscriptions track versions and poll for changes rather than using
//! push-based channels, so they work the same under any async runtime or in
//! plain synchronous code.

mod dynamic;

pub use dynamic::{Dynamic, Subscription};
