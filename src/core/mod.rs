// Core module - Transport logic and the event seam
pub mod event;
pub mod tcp;
pub mod udp;

pub use event::{EventSink, TransportEvent};
