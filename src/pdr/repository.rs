//! PDR Repository (spec §4.3): persists typed PDR records indexed by
//! handle; enumerates by first/next; filters by type; removes by terminus
//! handle.

use std::collections::HashMap;

use crate::config::PlatformConfig;
use crate::eid::PdrHandle;
use crate::messages::completion_code::CompletionCode;
use crate::messages::get_pdr::{GetPdrRequest, GetPdrResponse};
use crate::messages::transfer::TransferFlag;
use crate::pdr::record::{Entry, PdrRecord, PdrType};
use crate::pdr::types::TerminusLocatorPdr;

#[derive(Default)]
pub struct PdrRepository {
    records: Vec<PdrRecord>,
    by_handle: HashMap<u32, usize>,
    next_free_handle: u32,
}

impl PdrRepository {
    pub fn new() -> Self {
        PdrRepository {
            records: Vec::new(),
            by_handle: HashMap::new(),
            next_free_handle: 1,
        }
    }

    /// Builds a repository pre-seeded with the terminus-locator PDR that
    /// must always be present (spec §6 "Persisted state").
    pub fn with_terminus_locator(config: &PlatformConfig) -> Self {
        let mut repo = Self::new();
        let locator = TerminusLocatorPdr::for_mctp_eid(
            config.terminus_handle,
            config.terminus_id.0,
            config.bmc_mctp_eid.0,
        );
        repo.add(PdrRecord {
            handle: PdrHandle(0), // overwritten by `add`
            next_handle: PdrHandle(0),
            pdr_type: PdrType::TerminusLocator,
            version: 1,
            change_num: 0,
            payload: locator.encode(),
        });
        repo
    }

    /// Appends `record`, assigning it a monotonically increasing handle
    /// (spec §4.3). Handle `0` is reserved and is never assigned.
    pub fn add(&mut self, mut record: PdrRecord) {
        let handle = PdrHandle(self.next_free_handle);
        self.next_free_handle += 1;
        record.handle = handle;
        record.next_handle = PdrHandle(0);

        if let Some(&last_index) = self.records.last().map(|_| &(self.records.len() - 1)) {
            self.records[last_index].next_handle = handle;
        }
        self.by_handle.insert(handle.0, self.records.len());
        self.records.push(record);
    }

    pub fn get_by_handle(&self, handle: PdrHandle) -> Option<Entry<'_>> {
        if handle.is_reserved() {
            return None;
        }
        self.by_handle
            .get(&handle.0)
            .map(|&i| self.records[i].entry())
    }

    pub fn get_first(&self) -> Option<(PdrHandle, Entry<'_>)> {
        self.records.first().map(|r| (r.handle, r.entry()))
    }

    /// Continues a full-repository iteration from `cursor` (spec §4.3).
    pub fn get_next(&self, cursor: PdrHandle) -> Option<(PdrHandle, Entry<'_>)> {
        let &i = self.by_handle.get(&cursor.0)?;
        let next = self.records[i].next_handle;
        if next.is_reserved() {
            return None;
        }
        self.get_by_handle(next).map(|e| (next, e))
    }

    /// Copies every record of `pdr_type` into `dst_repo`.
    pub fn filter_by_type(&self, dst_repo: &mut PdrRepository, pdr_type: PdrType) {
        for record in self.records.iter().filter(|r| r.pdr_type == pdr_type) {
            dst_repo.add(record.clone());
        }
    }

    /// Removes every record whose embedded terminus handle equals `th`
    /// (spec §4.3, scenario 6). Removal invalidates the handle; it is not
    /// reused within the session.
    pub fn remove_by_terminus_handle(&mut self, th: u16) {
        let keep: Vec<PdrRecord> = self
            .records
            .drain(..)
            .filter(|r| r.embedded_terminus_handle() != Some(th))
            .collect();
        self.rebuild_links(keep);
    }

    pub fn empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Handles an inbound `GetPDR` command (spec §4.3, §8 scenario 7): a
    /// missed lookup maps to `InvalidRecordHandle` with no payload beyond
    /// the completion code; a hit returns the record's bytes and traversal
    /// pointer in one part (`END`) — this repository never splits a PDR
    /// across multiple `GetPDR` responses.
    pub fn handle_get_pdr(&self, request: &GetPdrRequest) -> GetPdrResponse {
        match self.get_by_handle(request.record_handle) {
            Some(entry) => GetPdrResponse::success(
                entry.next_handle,
                0,
                TransferFlag::StartAndEnd,
                entry.data.to_vec(),
            ),
            None => GetPdrResponse::failure(CompletionCode::InvalidRecordHandle),
        }
    }

    fn rebuild_links(&mut self, mut kept: Vec<PdrRecord>) {
        for i in 0..kept.len() {
            kept[i].next_handle = kept.get(i + 1).map(|r| r.handle).unwrap_or(PdrHandle(0));
        }
        self.by_handle.clear();
        for (i, r) in kept.iter().enumerate() {
            self.by_handle.insert(r.handle.0, i);
        }
        self.records = kept;
    }
}
