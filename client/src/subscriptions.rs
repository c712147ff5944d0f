//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Datagram subscription bookkeeping.
//!
//! Two per-id tables: what the client wants (`requested`) and what the
//! server has confirmed (`acknowledged`). They drift apart between a
//! `set-2` request and the server's `DG_SET2` confirmation — the server
//! keeps sending under the old settings until it processes the change.
//!
//! Before the `level2settings=` handshake line goes out, the two tables
//! move together: the batch line itself is what seeds the server, so
//! everything requested before it is acknowledged by construction.
//! Afterwards only `DG_SET2` confirmations touch `acknowledged`.

use caissa_icscodec::dg;

/// Datagrams the session itself depends on. These can never be
/// requested off: login resolution, subscription confirmations and the
/// rating-name table stop working without them.
pub const ESSENTIAL_DGS: [u16; 4] = [
    dg::WHO_AM_I,
    dg::LOGIN_FAILED,
    dg::RATING_TYPE_KEY,
    dg::SET2,
];

/// Whether the given datagram id is essential to session operation.
pub fn is_essential(id: u16) -> bool {
    ESSENTIAL_DGS.contains(&id)
}

/// Outcome of a subscription request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RequestOutcome {
    /// Refused: the id is essential and was asked off, or out of range.
    Rejected,
    /// Recorded; the pending `level2settings=` batch line will carry it.
    Batched,
    /// Recorded after the handshake; a `set-2` command is due (now if
    /// logged in, otherwise via the post-login reconciliation).
    NeedsCommand,
}

/// The subscription tables for one connection.
#[derive(Debug)]
pub(crate) struct SubscriptionState {
    requested: [bool; dg::DG_TABLE_SIZE],
    acknowledged: [bool; dg::DG_TABLE_SIZE],
    handshake_sent: bool,
}

impl SubscriptionState {
    /// Fresh state for a new connection: the essential datagrams plus
    /// the wild-variant key table are requested from the start.
    pub fn new() -> Self {
        let mut state = SubscriptionState {
            requested: [false; dg::DG_TABLE_SIZE],
            acknowledged: [false; dg::DG_TABLE_SIZE],
            handshake_sent: false,
        };
        for id in ESSENTIAL_DGS {
            state.request(id, true);
        }
        state.request(dg::WILD_KEY, true);
        state
    }

    /// Whether the server currently has the datagram on. This is the
    /// acknowledged state, not the requested one.
    pub fn is_acknowledged(&self, id: u16) -> bool {
        (id as usize) < dg::DG_TABLE_SIZE && self.acknowledged[id as usize]
    }

    /// Whether the `level2settings=` line has been sent.
    pub fn handshake_sent(&self) -> bool {
        self.handshake_sent
    }

    /// Records a desired state change.
    pub fn request(&mut self, id: u16, wanted: bool) -> RequestOutcome {
        let index = id as usize;
        if index >= dg::DG_TABLE_SIZE {
            return RequestOutcome::Rejected;
        }
        if !wanted && is_essential(id) {
            return RequestOutcome::Rejected;
        }

        self.requested[index] = wanted;
        if self.handshake_sent {
            RequestOutcome::NeedsCommand
        } else {
            self.acknowledged[index] = wanted;
            RequestOutcome::Batched
        }
    }

    /// Applies a server-side `DG_SET2` confirmation.
    pub fn apply_ack(&mut self, id: u16, state: bool) {
        let index = id as usize;
        if index < dg::DG_TABLE_SIZE {
            self.acknowledged[index] = state;
        }
    }

    /// Marks the batch line as sent; later requests emit `set-2`
    /// commands instead of folding into the batch.
    pub fn mark_handshake_sent(&mut self) {
        self.handshake_sent = true;
    }

    /// Renders the `level2settings=` login line: one `1`/`0` per id up
    /// to the highest requested one.
    pub fn settings_line(&self) -> String {
        let highest = match self.requested.iter().rposition(|&on| on) {
            Some(index) => index,
            None => return "level2settings=".to_string(),
        };
        let mut line = String::with_capacity("level2settings=".len() + highest + 1);
        line.push_str("level2settings=");
        for &on in &self.requested[..=highest] {
            line.push(if on { '1' } else { '0' });
        }
        line
    }

    /// Ids whose requested state differs from the acknowledged one,
    /// with the state to ask for. Sent as individual `set-2` commands
    /// right after login.
    pub fn pending_changes(&self) -> Vec<(u16, bool)> {
        (0..dg::DG_TABLE_SIZE)
            .filter(|&index| self.requested[index] != self.acknowledged[index])
            .map(|index| (index as u16, self.requested[index]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_requests_the_essentials() {
        let state = SubscriptionState::new();
        for id in ESSENTIAL_DGS {
            assert!(state.is_acknowledged(id), "dg {} should start on", id);
        }
        assert!(state.is_acknowledged(dg::WILD_KEY));
        assert!(!state.is_acknowledged(dg::SEND_MOVES));
    }

    #[test]
    fn essential_ids_cannot_be_turned_off() {
        let mut state = SubscriptionState::new();
        for id in ESSENTIAL_DGS {
            assert_eq!(state.request(id, false), RequestOutcome::Rejected);
            assert!(state.is_acknowledged(id));
        }
        state.mark_handshake_sent();
        for id in ESSENTIAL_DGS {
            assert_eq!(state.request(id, false), RequestOutcome::Rejected);
        }
    }

    #[test]
    fn wild_key_is_on_but_not_essential() {
        let mut state = SubscriptionState::new();
        assert_eq!(state.request(dg::WILD_KEY, false), RequestOutcome::Batched);
        assert!(!state.is_acknowledged(dg::WILD_KEY));
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        let mut state = SubscriptionState::new();
        assert_eq!(state.request(4096, true), RequestOutcome::Rejected);
    }

    #[test]
    fn pre_handshake_requests_fold_into_the_batch() {
        let mut state = SubscriptionState::new();
        assert_eq!(
            state.request(dg::SEND_MOVES, true),
            RequestOutcome::Batched
        );
        assert!(state.is_acknowledged(dg::SEND_MOVES));
        assert!(state.pending_changes().is_empty());
    }

    #[test]
    fn post_handshake_requests_need_commands() {
        let mut state = SubscriptionState::new();
        state.mark_handshake_sent();
        assert_eq!(
            state.request(dg::SEND_MOVES, true),
            RequestOutcome::NeedsCommand
        );
        // Not acknowledged until the server confirms.
        assert!(!state.is_acknowledged(dg::SEND_MOVES));
        assert_eq!(state.pending_changes(), vec![(dg::SEND_MOVES, true)]);

        state.apply_ack(dg::SEND_MOVES, true);
        assert!(state.is_acknowledged(dg::SEND_MOVES));
        assert!(state.pending_changes().is_empty());
    }

    #[test]
    fn settings_line_runs_to_the_highest_requested_id() {
        let state = SubscriptionState::new();
        let line = state.settings_line();
        assert!(line.starts_with("level2settings="));
        let bits = &line["level2settings=".len()..];
        // Highest initial request is DG_SET2 = 124.
        assert_eq!(bits.len(), dg::SET2 as usize + 1);
        assert_eq!(&bits[0..1], "1"); // WHO_AM_I
        assert_eq!(&bits[124..125], "1"); // SET2
        assert_eq!(&bits[1..2], "0");
    }

    #[test]
    fn settings_line_reflects_pre_handshake_requests() {
        let mut state = SubscriptionState::new();
        state.request(dg::KNOWS_FISCHER_RANDOM, true);
        let line = state.settings_line();
        let bits = &line["level2settings=".len()..];
        assert_eq!(bits.len(), dg::KNOWS_FISCHER_RANDOM as usize + 1);
        assert!(bits.ends_with('1'));
    }
}
