//! adtp-tracker: the tracker tier of the AirDispatch overlay.
//!
//! A tracker is a trust-rooted directory: it accepts signed registration
//! records binding a sender's address (and optional alias) to a location
//! and encryption key, and answers signed queries that resolve an address
//! or alias back into a location plus key. Clients fan out queries to
//! several independent trackers and take the first successful answer.

pub mod delegate;
pub mod error;
pub mod list_router;
pub mod messages;
pub mod router;
pub mod server;
pub mod store;

pub use delegate::{OperationalHooks, RecordStore, TrackerDelegate, TrackerFault};
pub use error::RouteError;
pub use list_router::{ListRouter, FAN_OUT_DEADLINE};
pub use messages::{QueryBody, RedirectEntry, RegistrationBody, REGISTRATION_LIFETIME_SECS};
pub use router::{FollowRedirects, RedirectHandler, Router};
pub use server::Tracker;
pub use store::MemoryStore;
