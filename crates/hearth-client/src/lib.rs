//! Async client for the hearth cloud camera service.
//!
//! Owns the event-stream subsystem spec.md scopes as the core of this
//! library: the per-base-station SSE connection, the request/reply
//! correlation layer, keepalive, and the login/device-enumeration lifecycle
//! that ties it all together. The per-feature command catalog (§4.6) is thin
//! methods built on top of [`BaseStationController::request`].

mod base_station_controller;
mod catalog;
mod device_handle;
mod error;
mod event_stream;
mod http_session;
mod session;
mod subscription_table;
mod trans_id;

pub use base_station_controller::{BaseStationController, BaseStationIdentity};
pub use device_handle::{AudioCamera, BaseStation, Camera};
pub use error::{HttpError, RequestError, SessionError, StreamError};
pub use event_stream::EventStream;
pub use http_session::HttpSession;
pub use session::Session;
pub use subscription_table::SubscriptionTable;
pub use trans_id::gen_trans_id;
