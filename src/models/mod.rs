//! Data models for scraped vessel-call records and inputs.

mod port;
mod vessel_call;

pub use port::{load_ports, Port};
pub use vessel_call::VesselCall;
