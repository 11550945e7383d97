use crate::errors::BootstrapError;
use crate::lifecycle::{LifecycleEvent, LifecyclePhase, ListenerEntry};
use crate::registry::Scope;

/// Ordered dispatch of lifecycle events.
///
/// Listeners are called in registration order. Every broadcast event is kept,
/// so a listener registered after a phase still receives it once, right away.
#[derive(Debug, Default)]
pub struct LifecycleBroadcaster {
    listeners: Vec<(Scope, ListenerEntry)>,
    history: Vec<LifecycleEvent>,
}

impl LifecycleBroadcaster {
    /// Create a new lifecycle broadcaster
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, replaying already broadcast events to it.
    ///
    /// Returns false when an equal listener is already registered.
    pub fn register(&mut self, mut entry: ListenerEntry, scope: Scope) -> Result<bool, BootstrapError> {
        if let Some(dedup_key) = entry.dedup_key() {
            let duplicate = self
                .listeners
                .iter()
                .any(|(_, known)| known.key() == entry.key() && known.dedup_key().as_deref() == Some(dedup_key.as_str()));
            if duplicate {
                tracing::info!(
                    target: "weave::lifecycle",
                    "IGNORE listener {}/{} as duplicate",
                    scope,
                    entry.name()
                );
                return Ok(false);
            }
        }

        for event in &self.history {
            tracing::warn!(
                target: "weave::lifecycle",
                "Listener {} registered by {} after {} was broadcast, delivering it now",
                entry.name(),
                scope,
                event.phase()
            );
            deliver(&mut entry, scope, event)?;
        }

        self.listeners.push((scope, entry));
        Ok(true)
    }

    /// Dispatch an event to every listener; the first error stops dispatch
    pub fn broadcast(&mut self, event: LifecycleEvent) -> Result<(), BootstrapError> {
        tracing::debug!(
            target: "weave::lifecycle",
            "Broadcasting {} to {} listeners",
            event.phase(),
            self.listeners.len()
        );
        let result = self
            .listeners
            .iter_mut()
            .try_for_each(|(scope, listener)| deliver(listener, *scope, &event));
        self.history.push(event);
        result
    }

    /// Whether the phase was broadcast at least once
    pub fn is_broadcast(&self, phase: LifecyclePhase) -> bool {
        self.history.iter().any(|event| event.phase() == phase)
    }

    /// Broadcast phases in order
    pub fn history(&self) -> Vec<LifecyclePhase> {
        self.history.iter().map(LifecycleEvent::phase).collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

fn deliver(listener: &mut ListenerEntry, scope: Scope, event: &LifecycleEvent) -> Result<(), BootstrapError> {
    let key = listener.key();
    listener
        .deliver(event)
        .map_err(|error| BootstrapError::callback_failed(format!("{} listener", event.phase()), key, scope, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{listener_fn, LifecycleListener};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        label: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl LifecycleListener for Recorder {
        fn on_event(&mut self, event: &LifecycleEvent) -> Result<(), BootstrapError> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.phase()));
            Ok(())
        }

        fn dedup_key(&self) -> Option<String> {
            Some(self.label.to_string())
        }
    }

    fn recorder(label: &'static str, events: &Arc<Mutex<Vec<String>>>) -> ListenerEntry {
        ListenerEntry::new(Recorder {
            label,
            events: events.clone(),
        })
    }

    fn hooks() -> LifecycleEvent {
        LifecycleEvent::HooksProcessed { hooks: Vec::new() }
    }

    fn before_init() -> LifecycleEvent {
        LifecycleEvent::BeforeInit { options: Vec::new() }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut broadcaster = LifecycleBroadcaster::new();
        broadcaster.register(recorder("first", &events), Scope::Application).unwrap();
        broadcaster.register(recorder("second", &events), Scope::Application).unwrap();

        broadcaster.broadcast(hooks()).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["first:HooksProcessed", "second:HooksProcessed"]
        );
    }

    #[test]
    fn test_late_listener_gets_replay_once() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut broadcaster = LifecycleBroadcaster::new();
        broadcaster.broadcast(hooks()).unwrap();
        broadcaster.broadcast(before_init()).unwrap();

        broadcaster.register(recorder("late", &events), Scope::Application).unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["late:HooksProcessed", "late:BeforeInit"]
        );

        broadcaster
            .broadcast(LifecycleEvent::BundlesInitialized { bundles: Vec::new() })
            .unwrap();
        assert_eq!(events.lock().unwrap().len(), 3);
        assert!(broadcaster.is_broadcast(LifecyclePhase::BeforeInit));
    }

    #[test]
    fn test_duplicate_listener_ignored() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut broadcaster = LifecycleBroadcaster::new();
        assert!(broadcaster.register(recorder("same", &events), Scope::Application).unwrap());
        assert!(!broadcaster.register(recorder("same", &events), Scope::Application).unwrap());
        assert!(broadcaster.register(recorder("other", &events), Scope::Application).unwrap());
        assert_eq!(broadcaster.len(), 2);
    }

    #[test]
    fn test_error_aborts_remaining_dispatch() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut broadcaster = LifecycleBroadcaster::new();
        broadcaster
            .register(
                ListenerEntry::new(listener_fn("failing", |_| Err(BootstrapError::custom("boom")))),
                Scope::Application,
            )
            .unwrap();
        broadcaster.register(recorder("after", &events), Scope::Application).unwrap();

        let err = broadcaster.broadcast(hooks()).unwrap_err();
        assert!(err.is_registration());
        assert_eq!(err.root_cause().to_string(), BootstrapError::custom("boom").to_string());
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(broadcaster.history(), vec![LifecyclePhase::HooksProcessed]);
    }
}
