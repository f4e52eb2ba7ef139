//! Request/Response Correlator (spec §4.1): allocates a unique instance id
//! per outgoing PLDM request on an EID, correlates the next response on
//! that `(eid, iid)` pair, and releases the id on response or timeout.
//!
//! Callbacks are one-shot and are moved out of the map on completion —
//! never cloned — which is the "weak reference, removed on delivery"
//! discipline spec §9 calls for to avoid a poller/correlator/dispatcher
//! reference cycle.

use std::collections::HashMap;

use crate::eid::{Eid, InstanceId};
use crate::error::{PldmError, PldmResult};
use crate::transport::Transport;

type ResponseCallback = Box<dyn FnOnce(&[u8]) + 'static>;

struct PendingRequest {
    command: u8,
    pldm_type: u8,
    callback: ResponseCallback,
}

/// Per-EID bitmap of allocated instance ids (0..=31) plus their pending
/// callbacks.
#[derive(Default)]
struct EidSlots {
    allocated: u32,
    pending: HashMap<u8, PendingRequest>,
}

impl EidSlots {
    fn allocate(&mut self) -> PldmResult<InstanceId> {
        for iid in 0..=InstanceId::MAX {
            if self.allocated & (1 << iid) == 0 {
                self.allocated |= 1 << iid;
                return Ok(InstanceId(iid));
            }
        }
        Err(PldmError::NoFreeSlot)
    }

    fn free(&mut self, iid: InstanceId) {
        self.allocated &= !(1 << iid.0);
        self.pending.remove(&iid.0);
    }
}

/// Allocates and correlates instance ids across all known EIDs. One
/// instance is shared by the poller and any other subsystem issuing PLDM
/// requests.
#[derive(Default)]
pub struct Correlator {
    slots: HashMap<Eid, EidSlots>,
}

impl Correlator {
    pub fn new() -> Self {
        Correlator {
            slots: HashMap::new(),
        }
    }

    /// Returns a free instance id in `[0, 31]` for `eid`. Fails with
    /// `NoFreeSlot` if all ids on this EID are outstanding (spec §4.1).
    pub fn get_instance_id(&mut self, eid: Eid) -> PldmResult<InstanceId> {
        self.slots.entry(eid).or_default().allocate()
    }

    /// Installs a one-shot callback matched to `(eid, iid)` and transmits
    /// `bytes` via `transport`. Fails with `SendFailed` (callback not
    /// installed) or `DuplicateRequest` (spec §4.1).
    pub fn register_request<T, F>(
        &mut self,
        transport: &mut T,
        eid: Eid,
        iid: InstanceId,
        pldm_type: u8,
        command: u8,
        bytes: &[u8],
        on_response: F,
    ) -> PldmResult<()>
    where
        T: Transport,
        F: FnOnce(&[u8]) + 'static,
    {
        let slots = self.slots.entry(eid).or_default();
        if slots.pending.contains_key(&iid.0) {
            return Err(PldmError::Duplicate);
        }
        transport.send(eid, bytes).map_err(|e| {
            PldmError::SendFailed(format!("eid {eid}, iid {iid}: {e}"))
        })?;
        slots.pending.insert(
            iid.0,
            PendingRequest {
                command,
                pldm_type,
                callback: Box::new(on_response),
            },
        );
        Ok(())
    }

    /// Delivers a response to the matching `(eid, iid)` pending request,
    /// invoking and removing its callback. Responses with no matching
    /// pending request (e.g. arriving after a timeout already freed the
    /// id) are silently discarded (spec §5).
    pub fn complete(&mut self, eid: Eid, iid: InstanceId, bytes: &[u8]) {
        if let Some(slots) = self.slots.get_mut(&eid) {
            if let Some(pending) = slots.pending.remove(&iid.0) {
                slots.allocated &= !(1 << iid.0);
                (pending.callback)(bytes);
            }
        }
    }

    /// Releases `iid` on `eid` without invoking its callback. Mandatory on
    /// timeout or any early-exit path (spec §4.1).
    pub fn mark_free(&mut self, eid: Eid, iid: InstanceId) {
        if let Some(slots) = self.slots.get_mut(&eid) {
            slots.free(iid);
        }
    }

    /// True while `eid` has any instance id outstanding.
    pub fn is_polling(&self, eid: Eid) -> bool {
        self.slots
            .get(&eid)
            .map(|s| s.allocated != 0)
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn pending_command(&self, eid: Eid, iid: InstanceId) -> Option<(u8, u8)> {
        self.slots
            .get(&eid)
            .and_then(|s| s.pending.get(&iid.0))
            .map(|p| (p.pldm_type, p.command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeTransport {
        sent: Vec<(Eid, Vec<u8>)>,
        fail: bool,
    }

    impl Transport for FakeTransport {
        fn send(&mut self, eid: Eid, bytes: &[u8]) -> PldmResult<()> {
            if self.fail {
                return Err(PldmError::SendFailed("no route".into()));
            }
            self.sent.push((eid, bytes.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn allocates_distinct_ids_and_exhausts_cleanly() {
        let mut c = Correlator::new();
        let eid = Eid(8);
        let mut ids = Vec::new();
        for _ in 0..=InstanceId::MAX {
            ids.push(c.get_instance_id(eid).unwrap().0);
        }
        assert_eq!(ids.len(), 32);
        assert!(matches!(c.get_instance_id(eid), Err(PldmError::NoFreeSlot)));
        c.mark_free(eid, InstanceId(ids[0]));
        assert_eq!(c.get_instance_id(eid).unwrap().0, ids[0]);
    }

    #[test]
    fn response_invokes_callback_exactly_once() {
        let mut c = Correlator::new();
        let mut t = FakeTransport {
            sent: vec![],
            fail: false,
        };
        let eid = Eid(8);
        let iid = c.get_instance_id(eid).unwrap();
        let got = Rc::new(RefCell::new(None));
        let got2 = Rc::clone(&got);
        c.register_request(&mut t, eid, iid, 0x02, 0x0a, &[1, 2, 3], move |resp| {
            *got2.borrow_mut() = Some(resp.to_vec());
        })
        .unwrap();
        assert_eq!(t.sent, vec![(eid, vec![1, 2, 3])]);
        assert_eq!(c.pending_command(eid, iid), Some((0x02, 0x0a)));

        c.complete(eid, iid, &[9, 9]);
        assert_eq!(*got.borrow(), Some(vec![9, 9]));
        assert!(!c.is_polling(eid));

        // A second, late completion for the same (now-freed) iid is a no-op.
        c.complete(eid, iid, &[0]);
    }

    #[test]
    fn duplicate_request_on_same_iid_rejected() {
        let mut c = Correlator::new();
        let mut t = FakeTransport {
            sent: vec![],
            fail: false,
        };
        let eid = Eid(8);
        let iid = c.get_instance_id(eid).unwrap();
        c.register_request(&mut t, eid, iid, 0x02, 0x0a, &[], |_| {}).unwrap();
        let err = c
            .register_request(&mut t, eid, iid, 0x02, 0x0a, &[], |_| {})
            .unwrap_err();
        assert!(matches!(err, PldmError::Duplicate));
    }

    #[test]
    fn send_failure_does_not_install_callback() {
        let mut c = Correlator::new();
        let mut t = FakeTransport {
            sent: vec![],
            fail: true,
        };
        let eid = Eid(8);
        let iid = c.get_instance_id(eid).unwrap();
        let err = c
            .register_request(&mut t, eid, iid, 0x02, 0x0a, &[], |_| {})
            .unwrap_err();
        assert!(matches!(err, PldmError::SendFailed(_)));
        assert_eq!(c.pending_command(eid, iid), None);
    }
}
