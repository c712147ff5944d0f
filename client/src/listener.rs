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

//! Listener traits and the per-session listener registry.

use async_trait::async_trait;
use caissa_icscodec::Datagram;
use std::collections::HashMap;
use std::sync::Arc;

/// A datagram delivered to listeners, together with the client tag of
/// the packet it arrived in (the outermost packet's tag, if any).
#[derive(Clone, Debug)]
pub struct DatagramEvent {
    datagram: Datagram,
    client_tag: Option<String>,
}

impl DatagramEvent {
    pub(crate) fn new(datagram: Datagram, client_tag: Option<String>) -> Self {
        DatagramEvent {
            datagram,
            client_tag,
        }
    }

    /// The datagram itself.
    pub fn datagram(&self) -> &Datagram {
        &self.datagram
    }

    /// The correlation tag of the request this datagram answers, if it
    /// arrived inside a tagged packet.
    pub fn client_tag(&self) -> Option<&str> {
        self.client_tag.as_deref()
    }
}

/// Receives datagrams of a specific id.
///
/// Registering the first listener for an id turns that datagram on with
/// the server; removing the last turns it off again (unless the id is
/// essential). This holds even for datagrams that are never delivered
/// themselves but act as flags for fields of other datagrams — register
/// for them anyway. Optional fields of a datagram may be on because
/// *another* listener requested the flag datagram, so handlers should
/// check the session's acknowledged state rather than assume their own
/// requests are the only ones.
#[async_trait]
pub trait DatagramListener: Send + Sync + 'static {
    /// Called for every arriving datagram with a matching id.
    async fn datagram_received(&self, event: &DatagramEvent);
}

/// Receives plain text lines.
#[async_trait]
pub trait LineListener: Send + Sync + 'static {
    /// Called for every plain line, with the enclosing packet's client
    /// tag when the line arrived inside one.
    async fn line_received(&self, line: &str, client_tag: Option<&str>);
}

/// Listener storage. Lives inside the session state lock so that
/// registration and its subscription side effect are one atomic step.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    datagram: HashMap<u16, Vec<Arc<dyn DatagramListener>>>,
    line: Vec<Arc<dyn LineListener>>,
}

impl ListenerRegistry {
    /// Adds a datagram listener. Returns `true` when it is the first
    /// listener for that id.
    pub fn add_datagram(&mut self, id: u16, listener: Arc<dyn DatagramListener>) -> bool {
        let listeners = self.datagram.entry(id).or_default();
        listeners.push(listener);
        listeners.len() == 1
    }

    /// Removes a datagram listener by identity. Returns `true` when it
    /// was the last listener for that id.
    pub fn remove_datagram(&mut self, id: u16, listener: &Arc<dyn DatagramListener>) -> bool {
        let Some(listeners) = self.datagram.get_mut(&id) else {
            return false;
        };
        listeners.retain(|registered| !Arc::ptr_eq(registered, listener));
        if listeners.is_empty() {
            self.datagram.remove(&id);
            true
        } else {
            false
        }
    }

    /// Adds a line listener.
    pub fn add_line(&mut self, listener: Arc<dyn LineListener>) {
        self.line.push(listener);
    }

    /// Removes a line listener by identity.
    pub fn remove_line(&mut self, listener: &Arc<dyn LineListener>) {
        self.line.retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    /// Snapshot of the listeners for a datagram id.
    pub fn datagram_listeners(&self, id: u16) -> Vec<Arc<dyn DatagramListener>> {
        self.datagram.get(&id).cloned().unwrap_or_default()
    }

    /// Snapshot of the line listeners.
    pub fn line_listeners(&self) -> Vec<Arc<dyn LineListener>> {
        self.line.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullListener;

    #[async_trait]
    impl DatagramListener for NullListener {
        async fn datagram_received(&self, _event: &DatagramEvent) {}
    }

    #[test]
    fn first_and_last_registration_are_reported() {
        let mut registry = ListenerRegistry::default();
        let first: Arc<dyn DatagramListener> = Arc::new(NullListener);
        let second: Arc<dyn DatagramListener> = Arc::new(NullListener);

        assert!(registry.add_datagram(24, first.clone()));
        assert!(!registry.add_datagram(24, second.clone()));

        assert!(!registry.remove_datagram(24, &first));
        assert!(registry.remove_datagram(24, &second));
    }

    #[test]
    fn removal_is_by_identity() {
        let mut registry = ListenerRegistry::default();
        let registered: Arc<dyn DatagramListener> = Arc::new(NullListener);
        let stranger: Arc<dyn DatagramListener> = Arc::new(NullListener);

        registry.add_datagram(24, registered.clone());
        assert!(!registry.remove_datagram(24, &stranger));
        assert_eq!(registry.datagram_listeners(24).len(), 1);
    }
}
