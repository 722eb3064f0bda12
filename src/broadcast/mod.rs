//! Latest-value broadcast primitive
//!
//! A [`Broadcaster`] holds exactly one current value. A producer replaces it
//! with [`Broadcaster::update`] or [`Broadcaster::broadcast`], and any number
//! of listeners wait for the next replacement and receive a clone of the value
//! that is current when they wake.
//!
//! # Architecture
//!
//! ```text
//!                        Broadcaster<E> (Arc<Shared>)
//!                   ┌──────────────────────────────┐
//!                   │ state: RwLock<State {        │
//!                   │   value, version, closed,    │
//!                   │   listeners: id -> handle,   │
//!                   │ }>                           │
//!                   │ notify: Notify (wake all)    │
//!                   └──────────────┬───────────────┘
//!                                  │
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!    [Producer]              [Subscriber]             [Subscriber]
//!    update(f)               recv().await             recv().await
//!         │                        │                        │
//!         └──► version += 1 ──► notify_waiters() ──► clone(value)
//! ```
//!
//! # Delivery
//!
//! There is no per-listener queue. A listener that is busy while several
//! updates happen observes only the newest value on its next `recv`. This is
//! the "synchronized radio" contract: everyone hears what is playing now.

pub mod error;
pub mod handle;
pub mod store;
pub mod subscriber;

pub use error::{BroadcastError, ListenError, RecvError};
pub use handle::ListenerHandle;
pub use store::Broadcaster;
pub use subscriber::Subscriber;
