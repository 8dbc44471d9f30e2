//! The remote command plane (spec §4.7): a `(module_name, instance)`-keyed registration table,
//! polled by a configurable ping schedule, backed by a ROUTER socket that both receives
//! registrations and issues pings/terminates by routing identity.
//!
//! Routing identities are tracked as raw bytes rather than [`umps_transport::Frame`] here:
//! `zmq::Message` does not implement `Clone`, and this table needs to keep its own copy of an
//! identity independent of whatever frame the socket layer eventually sends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use umps_base::error::{Error, Result};
use umps_messages::details::ModuleDetails;

pub type RoutingId = Vec<Vec<u8>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PingAction {
    Ping,
    ResendPing,
    Terminate,
    Evict,
}

/// `ping_intervals` (spec §4.7): "given `ping_intervals = [i1, i2, i3, …]`, every `i1` send a
/// ping; if no reply arrives within `i2`, resend; if still no reply after `i3`, send Terminate;
/// if still no reply, evict from the table." The final interval is reused for the evict wait,
/// since the schedule names no interval past the terminate step.
#[derive(Clone, Debug)]
pub struct PingSchedule(Vec<Duration>);

impl PingSchedule {
    pub fn new(intervals: Vec<Duration>) -> Result<Self> {
        if intervals.is_empty() {
            return Err(Error::invalid_argument("ping_intervals must not be empty"));
        }
        if intervals.iter().any(|interval| interval.is_zero()) {
            return Err(Error::invalid_argument("ping_intervals entries must be positive"));
        }
        Ok(Self(intervals))
    }

    fn wait_for(&self, step: usize) -> Duration {
        self.0[step.min(self.0.len() - 1)]
    }

    fn action_for(&self, step: usize) -> PingAction {
        let last = self.0.len() - 1;
        if step == 0 {
            PingAction::Ping
        } else if step < last {
            PingAction::ResendPing
        } else if step == last {
            PingAction::Terminate
        } else {
            PingAction::Evict
        }
    }
}

type Key = (String, u16);

struct Entry {
    details: ModuleDetails,
    routing_id: RoutingId,
    last_action_at: Instant,
    step: usize,
}

/// The internal per-key registration table. Plain-data, no I/O: the proxy loop interprets
/// [`PingAction`]s by sending frames, this type only tracks when they are due.
pub struct RemoteRegistry {
    schedule: PingSchedule,
    entries: Mutex<HashMap<Key, Entry>>,
    by_routing_id: Mutex<HashMap<RoutingId, Key>>,
}

impl RemoteRegistry {
    pub fn new(schedule: PingSchedule) -> Self {
        Self {
            schedule,
            entries: Mutex::new(HashMap::new()),
            by_routing_id: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_arc(schedule: PingSchedule) -> Arc<Self> {
        Arc::new(Self::new(schedule))
    }

    pub fn register(&self, details: ModuleDetails, routing_id: RoutingId) {
        let key = (details.name.clone(), details.instance);
        self.entries.lock().expect("remote registry mutex poisoned").insert(
            key.clone(),
            Entry {
                details,
                routing_id: routing_id.clone(),
                last_action_at: Instant::now(),
                step: 0,
            },
        );
        self.by_routing_id
            .lock()
            .expect("remote registry mutex poisoned")
            .insert(routing_id, key);
    }

    pub fn deregister(&self, name: &str, instance: u16) {
        if let Some(entry) = self
            .entries
            .lock()
            .expect("remote registry mutex poisoned")
            .remove(&(name.to_string(), instance))
        {
            self.by_routing_id
                .lock()
                .expect("remote registry mutex poisoned")
                .remove(&entry.routing_id);
        }
    }

    /// Resets a module's ping escalation on any reply, identified by the physical routing
    /// identity the reply arrived on.
    pub fn note_reply(&self, routing_id: &RoutingId) {
        let key = self
            .by_routing_id
            .lock()
            .expect("remote registry mutex poisoned")
            .get(routing_id)
            .cloned();
        let Some(key) = key else { return };
        if let Some(entry) = self.entries.lock().expect("remote registry mutex poisoned").get_mut(&key) {
            entry.step = 0;
            entry.last_action_at = Instant::now();
        }
    }

    pub fn available(&self) -> Vec<ModuleDetails> {
        self.entries
            .lock()
            .expect("remote registry mutex poisoned")
            .values()
            .map(|entry| entry.details.clone())
            .collect()
    }

    /// Advances every entry's escalation state, returning the routing id and action for each
    /// entry whose current wait has elapsed. Entries that reach [`PingAction::Evict`] are
    /// removed from the table before this returns.
    pub fn tick(&self, now: Instant) -> Vec<(RoutingId, PingAction)> {
        let mut due = Vec::new();
        let mut evicted = Vec::new();
        {
            let mut entries = self.entries.lock().expect("remote registry mutex poisoned");
            for (key, entry) in entries.iter_mut() {
                if now.duration_since(entry.last_action_at) < self.schedule.wait_for(entry.step) {
                    continue;
                }
                let action = self.schedule.action_for(entry.step);
                if action == PingAction::Evict {
                    evicted.push((key.clone(), entry.routing_id.clone()));
                } else {
                    due.push((entry.routing_id.clone(), action));
                    entry.step += 1;
                    entry.last_action_at = now;
                }
            }
            for (key, _) in &evicted {
                entries.remove(key);
            }
        }
        let mut by_routing_id = self.by_routing_id.lock().expect("remote registry mutex poisoned");
        for (_, routing_id) in &evicted {
            by_routing_id.remove(routing_id);
        }
        due.extend(evicted.into_iter().map(|(_, routing_id)| (routing_id, PingAction::Evict)));
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(name: &str, instance: u16) -> ModuleDetails {
        ModuleDetails {
            name: name.to_string(),
            instance,
            ..ModuleDetails::default()
        }
    }

    fn routing_id(id: &[u8]) -> RoutingId {
        vec![id.to_vec()]
    }

    #[test]
    fn schedule_rejects_empty_or_nonpositive_intervals() {
        assert!(PingSchedule::new(Vec::new()).is_err());
        assert!(PingSchedule::new(vec![Duration::ZERO]).is_err());
        assert!(PingSchedule::new(vec![Duration::from_millis(10)]).is_ok());
    }

    #[test]
    fn tick_escalates_through_ping_resend_terminate_evict() {
        let schedule = PingSchedule::new(vec![
            Duration::from_millis(5),
            Duration::from_millis(5),
            Duration::from_millis(5),
        ])
        .unwrap();
        let registry = RemoteRegistry::new(schedule);
        registry.register(details("picker", 0), routing_id(b"id-1"));

        let t0 = Instant::now();
        assert!(registry.tick(t0).is_empty());

        let t1 = t0 + Duration::from_millis(6);
        assert_eq!(registry.tick(t1), vec![(routing_id(b"id-1"), PingAction::Ping)]);

        let t2 = t1 + Duration::from_millis(6);
        assert_eq!(registry.tick(t2), vec![(routing_id(b"id-1"), PingAction::ResendPing)]);

        let t3 = t2 + Duration::from_millis(6);
        assert_eq!(registry.tick(t3), vec![(routing_id(b"id-1"), PingAction::Terminate)]);

        let t4 = t3 + Duration::from_millis(6);
        assert_eq!(registry.tick(t4), vec![(routing_id(b"id-1"), PingAction::Evict)]);
        assert!(registry.available().is_empty());
    }

    #[test]
    fn note_reply_resets_escalation() {
        let schedule = PingSchedule::new(vec![Duration::from_millis(5), Duration::from_millis(5)]).unwrap();
        let registry = RemoteRegistry::new(schedule);
        registry.register(details("picker", 0), routing_id(b"id-1"));

        let t1 = Instant::now() + Duration::from_millis(6);
        assert_eq!(registry.tick(t1), vec![(routing_id(b"id-1"), PingAction::Ping)]);

        registry.note_reply(&routing_id(b"id-1"));
        let t2 = t1 + Duration::from_millis(2);
        assert!(registry.tick(t2).is_empty());
    }

    #[test]
    fn deregister_removes_entry() {
        let schedule = PingSchedule::new(vec![Duration::from_millis(5)]).unwrap();
        let registry = RemoteRegistry::new(schedule);
        registry.register(details("picker", 0), routing_id(b"id-1"));
        registry.deregister("picker", 0);
        assert!(registry.available().is_empty());
    }
}
