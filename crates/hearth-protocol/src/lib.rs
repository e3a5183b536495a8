//! Wire types for the cloud camera service.
//!
//! All request/response bodies are JSON (`application/json`). Types here have
//! no I/O and no async — they are plain `serde` data, shared by every crate
//! that talks to the service.

pub mod catalog;
mod device;
mod envelope;
mod responses;

pub use catalog::*;
pub use device::{Device, DeviceType};
pub use envelope::{EventEnvelope, NotifyPayload};
pub use responses::{
    DevicesResponse, GenericResponse, LoginData, LoginResponse, StreamData, StreamResponse,
};
