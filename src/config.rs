//! Tunables named in spec §6, as compiled-in defaults with optional
//! environment-variable overrides, read once at construction the way the
//! teacher resolves a `DomainParticipantSecurityConfigFiles` from a config
//! directory.

use std::time::Duration;

use crate::eid::{Eid, Tid};

/// Default terminus handle bound to this BMC's own PLDM terminus. Taken
/// from the original OpenBMC `pldm` daemon's compiled-in default.
pub const DEFAULT_TERMINUS_HANDLE: u16 = 0;
pub const DEFAULT_TERMINUS_ID: Tid = Tid(1);
pub const DEFAULT_BMC_MCTP_EID: Eid = Eid(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Period of the normal-queue poll timer.
    pub normal_ras_event_timer: Duration,
    /// Period of the critical-queue poll timer.
    pub critical_ras_event_timer: Duration,
    /// Period between parts of an in-progress multi-part transfer.
    pub poll_req_event_timer: Duration,
    /// Number of retries attempted before a poll request is abandoned.
    pub number_of_request_retries: u32,
    /// Per-request response timeout.
    pub response_time_out: Duration,
    /// Bound on the critical queue's length (spec §3, §9: the overflow
    /// check is `size > MAX`, so `MAX + 1` entries are in fact accepted).
    pub max_queue_size: usize,
    /// Handle of this BMC's own terminus, stamped into the terminus-locator
    /// PDR.
    pub terminus_handle: u16,
    /// ID of this BMC's own terminus.
    pub terminus_id: Tid,
    /// MCTP EID this BMC responds on.
    pub bmc_mctp_eid: Eid,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            normal_ras_event_timer: Duration::from_secs(5),
            critical_ras_event_timer: Duration::from_millis(500),
            poll_req_event_timer: Duration::from_millis(100),
            number_of_request_retries: 2,
            response_time_out: Duration::from_millis(100),
            max_queue_size: 256,
            terminus_handle: DEFAULT_TERMINUS_HANDLE,
            terminus_id: DEFAULT_TERMINUS_ID,
            bmc_mctp_eid: DEFAULT_BMC_MCTP_EID,
        }
    }
}

impl PlatformConfig {
    /// Total time before a poll is declared abandoned:
    /// `(NUMBER_OF_REQUEST_RETRIES + 1) * RESPONSE_TIME_OUT` (spec §4.2).
    pub fn poll_timeout(&self) -> Duration {
        self.response_time_out * (self.number_of_request_retries + 1)
    }

    /// Builds a config from defaults, applying overrides from the process
    /// environment where set. Unset or unparsable variables are ignored and
    /// the compiled-in default is kept.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_u64("NORMAL_RAS_EVENT_TIMER") {
            cfg.normal_ras_event_timer = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("CRITICAL_RAS_EVENT_TIMER") {
            cfg.critical_ras_event_timer = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("POLL_REQ_EVENT_TIMER") {
            cfg.poll_req_event_timer = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("NUMBER_OF_REQUEST_RETRIES") {
            cfg.number_of_request_retries = v as u32;
        }
        if let Some(v) = env_u64("RESPONSE_TIME_OUT") {
            cfg.response_time_out = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("MAX_QUEUE_SIZE") {
            cfg.max_queue_size = v as usize;
        }
        if let Some(v) = env_u64("TERMINUS_HANDLE") {
            cfg.terminus_handle = v as u16;
        }
        if let Some(v) = env_u64("TERMINUS_ID") {
            cfg.terminus_id = Tid(v as u8);
        }
        if let Some(v) = env_u64("BMC_MCTP_EID") {
            cfg.bmc_mctp_eid = Eid(v as u8);
        }
        cfg
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_timeout_matches_formula() {
        let cfg = PlatformConfig::default();
        assert_eq!(
            cfg.poll_timeout(),
            cfg.response_time_out * (cfg.number_of_request_retries + 1)
        );
    }
}
