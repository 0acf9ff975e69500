//! Change propagation: subscribers of a watcher's change signal.
//!
//! The same [`crate::watch::Watcher`] type feeds two independent wirings:
//!
//! - [`dev`]: rebuild the site, then tell every browser to reload
//! - [`agent`]: mark the cached snapshot stale, then notify the client
//!
//! Both subscribers run on their own thread and exit when the watcher
//! (the sending side) is dropped.

pub mod agent;
pub mod dev;
