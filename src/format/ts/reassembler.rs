use super::types::AdaptationField;
use log::debug;
use std::collections::BTreeMap;

/// A fully reassembled PES fragment for one PID: the concatenated payload
/// bytes from every TS packet between two PUSI boundaries (or up to EOF),
/// plus the adaptation field carried on the PUSI packet that opened it.
#[derive(Debug)]
pub struct PesFragment {
    /// PID this fragment was reassembled from.
    pub pid: u16,
    /// Concatenated payload bytes.
    pub data: Vec<u8>,
    /// Adaptation field from the PUSI packet that started this fragment,
    /// if one was present.
    pub adaptation_field: Option<AdaptationField>,
    /// Set on fragments flushed at EOF rather than closed by the next PUSI.
    pub is_last: bool,
}

struct PendingFragment {
    data: Vec<u8>,
    adaptation_field: Option<AdaptationField>,
}

/// Per-PID accumulation of TS payload fragments into PES packets, driven
/// by `payload_unit_start_indicator`.
///
/// A PID's pending fragment closes (and is returned) the moment a new
/// PUSI-marked packet arrives for that PID; the residual before any PUSI
/// has ever been seen for a PID is dropped, since it cannot belong to a
/// complete PES packet.
#[derive(Default)]
pub struct PesReassembler {
    pending: BTreeMap<u16, PendingFragment>,
}

impl PesReassembler {
    /// Creates an empty reassembler.
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }

    /// Feeds one TS packet's payload for `pid`. Returns a completed
    /// fragment when this packet's PUSI closes the previous one.
    pub fn push(
        &mut self,
        pid: u16,
        payload_unit_start: bool,
        adaptation_field: Option<AdaptationField>,
        payload: &[u8],
    ) -> Option<PesFragment> {
        if payload.is_empty() && !payload_unit_start {
            return None;
        }

        let mut closed = None;

        if payload_unit_start {
            if let Some(prev) = self.pending.remove(&pid) {
                closed = Some(PesFragment {
                    pid,
                    data: prev.data,
                    adaptation_field: prev.adaptation_field,
                    is_last: false,
                });
            }
            self.pending.insert(
                pid,
                PendingFragment {
                    data: payload.to_vec(),
                    adaptation_field,
                },
            );
        } else if let Some(entry) = self.pending.get_mut(&pid) {
            entry.data.extend_from_slice(payload);
        } else {
            debug!("dropping residual fragment on PID {:#x} before first PUSI", pid);
        }

        closed
    }

    /// Flushes every PID's pending fragment, in ascending PID order, for
    /// use at end-of-input. Each returned fragment has `is_last = true`.
    pub fn flush(&mut self) -> Vec<PesFragment> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .map(|(pid, frag)| PesFragment {
                pid,
                data: frag.data,
                adaptation_field: frag.adaptation_field,
                is_last: true,
            })
            .collect()
    }
}
