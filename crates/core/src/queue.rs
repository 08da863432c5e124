// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO holding area for clients waiting on the backing server
//!
//! Entries are added from event-handling tasks and drained only by the
//! control loop, always in full: one drain either connects every waiting
//! client or turns every one of them away.

use crate::adapters::ClientHandle;

/// Queue of clients waiting for the target server to come up
pub struct ConnectionQueue<C> {
    entries: Vec<C>,
}

impl<C: ClientHandle> ConnectionQueue<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a client at the back of the queue
    pub fn push(&mut self, client: C) {
        self.entries.push(client);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the waiting clients, in arrival order
    pub fn names(&self) -> Vec<Option<String>> {
        self.entries.iter().map(|c| c.name()).collect()
    }

    /// Send every waiting client to the target server, emptying the queue.
    /// Returns how many clients were released.
    pub fn connect_all(&mut self, target: &str) -> usize {
        let released = self.entries.len();
        for client in self.entries.drain(..) {
            client.connect(target);
        }
        released
    }

    /// Turn every waiting client away with the given message, emptying the
    /// queue. Returns how many clients were dropped.
    pub fn disconnect_all(&mut self, reason: &str) -> usize {
        let dropped = self.entries.len();
        for client in self.entries.drain(..) {
            client.disconnect(reason);
        }
        dropped
    }
}

impl<C: ClientHandle> Default for ConnectionQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fake::{ClientEvent, FakeClient};

    #[test]
    fn queue_starts_empty() {
        let queue: ConnectionQueue<FakeClient> = ConnectionQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn connect_all_preserves_arrival_order() {
        let log = FakeClient::log();
        let mut queue = ConnectionQueue::new();
        queue.push(FakeClient::new("alice", &log));
        queue.push(FakeClient::new("bob", &log));
        queue.push(FakeClient::anonymous(&log));

        let released = queue.connect_all("lobby");

        assert_eq!(released, 3);
        assert!(queue.is_empty());
        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                ClientEvent::Connected {
                    name: Some("alice".to_string()),
                    target: "lobby".to_string()
                },
                ClientEvent::Connected {
                    name: Some("bob".to_string()),
                    target: "lobby".to_string()
                },
                ClientEvent::Connected {
                    name: None,
                    target: "lobby".to_string()
                },
            ]
        );
    }

    #[test]
    fn disconnect_all_drops_every_client() {
        let log = FakeClient::log();
        let mut queue = ConnectionQueue::new();
        queue.push(FakeClient::new("alice", &log));
        queue.push(FakeClient::new("bob", &log));

        let dropped = queue.disconnect_all("server unavailable");

        assert_eq!(dropped, 2);
        assert!(queue.is_empty());
        let events = log.lock().unwrap().clone();
        assert!(events
            .iter()
            .all(|e| matches!(e, ClientEvent::Disconnected { reason, .. } if reason == "server unavailable")));
    }

    #[test]
    fn names_reports_queue_contents_without_draining() {
        let log = FakeClient::log();
        let mut queue = ConnectionQueue::new();
        queue.push(FakeClient::new("alice", &log));
        queue.push(FakeClient::anonymous(&log));

        assert_eq!(queue.names(), vec![Some("alice".to_string()), None]);
        assert_eq!(queue.len(), 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_names() -> impl Strategy<Value = Vec<Option<String>>> {
            proptest::collection::vec(
                proptest::option::of("[a-z]{1,8}"),
                0..16,
            )
        }

        proptest! {
            #[test]
            fn every_client_gets_exactly_one_verdict(names in arb_names()) {
                let log = FakeClient::log();
                let mut queue = ConnectionQueue::new();
                for name in &names {
                    match name {
                        Some(n) => queue.push(FakeClient::new(n.clone(), &log)),
                        None => queue.push(FakeClient::anonymous(&log)),
                    }
                }

                queue.connect_all("world");

                let events = log.lock().unwrap().clone();
                prop_assert_eq!(events.len(), names.len());
                prop_assert!(queue.is_empty());
                // FIFO: verdicts carry the names in arrival order
                for (event, name) in events.iter().zip(names.iter()) {
                    prop_assert!(
                        matches!(event, ClientEvent::Connected { name: got, .. } if got == name),
                        "unexpected event {:?}",
                        event
                    );
                }
            }

            #[test]
            fn drain_after_drain_is_a_no_op(names in arb_names()) {
                let log = FakeClient::log();
                let mut queue = ConnectionQueue::new();
                for name in names.iter().flatten() {
                    queue.push(FakeClient::new(name.clone(), &log));
                }

                queue.disconnect_all("down");
                let seen = log.lock().unwrap().len();
                prop_assert_eq!(queue.disconnect_all("down"), 0);
                prop_assert_eq!(log.lock().unwrap().len(), seen);
            }
        }
    }
}
