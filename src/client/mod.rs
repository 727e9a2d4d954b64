//! Player-side client: a polling loop and a local echo cache that rebuild the
//! player screen from periodic snapshots.

pub mod api;
pub mod poller;
pub mod reconciler;
pub mod store;
