//! A PLDM Platform Monitoring and Control responder for a BMC (DSP0248):
//! request/response correlation, a PDR repository, the platform event
//! dispatcher, the event poller's reassembly state machine, and (under
//! the `bios` feature) the BIOS attribute registry.
//!
//! Dependency order (leaves first): [`messages`] → [`correlator`] →
//! [`pdr`] / [`bios`] → [`dispatch`] → [`poller`].

pub mod config;
pub mod correlator;
pub mod dispatch;
pub mod eid;
pub mod error;
pub mod messages;
pub mod pdr;
pub mod poller;
pub mod timer;
pub mod transport;

#[cfg(feature = "bios")]
pub mod bios;

pub use config::PlatformConfig;
pub use correlator::Correlator;
pub use error::{PldmError, PldmResult};
pub use timer::TimerWheel;
pub use transport::Transport;
