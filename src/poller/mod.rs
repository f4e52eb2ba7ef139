//! Platform Event Poller (spec §4.2): per-EID state machine that solicits
//! platform events over MCTP, reassembles multi-part payloads, validates
//! them with CRC-32, and reports completed events for dispatch. Two
//! independent queues (normal / critical) drive the same transport.

pub mod endpoint;
pub mod queue;
pub mod reassembly;
pub mod state;
pub mod table;

pub use endpoint::{EndpointPoller, PollEffect};
pub use state::{Flags, OutgoingRequest, PollState, RequestState};
pub use table::PollerTable;
