use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::entities::alert::Alert;
use crate::domain::ports::alert_log::AlertLog;

const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Observer invoked synchronously for every newly raised alert.
pub type AlertCallback = Arc<dyn Fn(&Alert) -> anyhow::Result<()> + Send + Sync>;

struct ActiveEntry {
    /// Raise order, for stable listing
    seq: u64,
    alert: Alert,
}

#[derive(Default)]
struct RegistryState {
    active: HashMap<String, ActiveEntry>,
    next_seq: u64,
    history: VecDeque<Alert>,
}

impl RegistryState {
    fn active_in_order(&self) -> Vec<Alert> {
        let mut entries: Vec<&ActiveEntry> = self.active.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.alert.clone()).collect()
    }
}

fn same_condition(a: &Alert, b: &Alert) -> bool {
    a.kind() == b.kind()
        && a.severity() == b.severity()
        && a.data().get("component") == b.data().get("component")
}

/// Active alert set plus a bounded history ring.
///
/// Alerts stay active until a caller clears them.
pub struct AlertRegistry {
    state: Mutex<RegistryState>,
    callbacks: Mutex<Vec<AlertCallback>>,
    log: Arc<dyn AlertLog>,
    history_capacity: usize,
}

impl AlertRegistry {
    #[must_use]
    pub fn new(log: Arc<dyn AlertLog>, history_capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            callbacks: Mutex::new(Vec::new()),
            log,
            history_capacity: history_capacity.max(1),
        }
    }

    #[must_use]
    pub fn with_default_history(log: Arc<dyn AlertLog>) -> Self {
        Self::new(log, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn register_callback<F>(&self, callback: F)
    where
        F: Fn(&Alert) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: AlertCallback = Arc::new(callback);
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Adds `alert` to the active set unless an active alert of the same type
    /// and severity (and, for component alerts, the same component) already
    /// exists. Returns whether it was raised.
    ///
    /// Raised alerts are appended to the alert log and passed to every callback
    /// in registration order. Callback errors and panics are logged and skipped.
    pub fn raise(&self, alert: Alert) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state
                .active
                .values()
                .any(|e| same_condition(&e.alert, &alert))
            {
                tracing::debug!("Alert {} ({}) already active", alert.kind(), alert.severity());
                return false;
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.active.insert(
                alert.id().to_string(),
                ActiveEntry {
                    seq,
                    alert: alert.clone(),
                },
            );
            if state.history.len() >= self.history_capacity {
                state.history.pop_front();
            }
            state.history.push_back(alert.clone());
        }

        tracing::warn!("[{}] {}: {}", alert.severity(), alert.kind(), alert.message());
        if let Err(e) = self.log.append(&alert) {
            tracing::warn!("Failed to append alert to log: {e}");
        }

        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for (index, callback) in callbacks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(&alert))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Alert callback #{index} failed: {e:#}"),
                Err(_) => tracing::error!("Alert callback #{index} panicked"),
            }
        }
        true
    }

    /// Removes one alert from the active set. It stays in history.
    pub fn clear_alert(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .remove(id)
            .is_some()
    }

    /// Empties the active set, returning how many alerts were cleared.
    pub fn clear_all(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let cleared = state.active.len();
        state.active.clear();
        cleared
    }

    /// Active alerts in the order they were raised.
    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active_in_order()
    }

    #[must_use]
    pub fn active_alert(&self, id: &str) -> Option<Alert> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .get(id)
            .map(|e| e.alert.clone())
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .len()
    }

    /// The most recent `limit` alerts, oldest first.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<Alert> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = state.history.len().saturating_sub(limit);
        state.history.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::entities::alert::kind;
    use crate::domain::ports::alert_log::{AlertLogError, NullAlertLog};
    use crate::domain::value_objects::severity::Severity;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn alert(kind: &str, severity: Severity) -> Alert {
        Alert::new(severity, kind, "test", json!({}))
    }

    fn registry() -> AlertRegistry {
        AlertRegistry::with_default_history(Arc::new(NullAlertLog))
    }

    #[test]
    fn raise_adds_to_active_and_history() {
        let r = registry();
        assert!(r.raise(alert(kind::DISK_SPACE, Severity::Warning)));
        assert_eq!(r.active_count(), 1);
        assert_eq!(r.history(10).len(), 1);
    }

    #[test]
    fn same_type_and_severity_is_not_raised_twice() {
        let r = registry();
        assert!(r.raise(alert(kind::DISK_SPACE, Severity::Warning)));
        assert!(!r.raise(alert(kind::DISK_SPACE, Severity::Warning)));
        assert!(r.raise(alert(kind::DISK_SPACE, Severity::Critical)));
        assert_eq!(r.active_count(), 2);
        assert_eq!(r.history(10).len(), 2);
    }

    #[test]
    fn component_alerts_are_scoped_per_component() {
        let r = registry();
        let unreachable = |component: &str| {
            Alert::new(
                Severity::Critical,
                kind::COMPONENT_UNREACHABLE,
                "down",
                json!({ "component": component }),
            )
        };
        assert!(r.raise(unreachable("sampler")));
        assert!(r.raise(unreachable("shell")));
        assert!(!r.raise(unreachable("shell")));
        assert_eq!(r.active_count(), 2);
    }

    #[test]
    fn clearing_allows_reraise() {
        let r = registry();
        let a = alert(kind::CPU_SUSTAINED, Severity::Warning);
        let id = a.id().to_string();
        r.raise(a);
        assert!(r.clear_alert(&id));
        assert!(!r.clear_alert(&id));
        assert!(r.raise(alert(kind::CPU_SUSTAINED, Severity::Warning)));
        assert_eq!(r.history(10).len(), 2);
    }

    #[test]
    fn active_set_is_keyed_by_id_and_keeps_raise_order() {
        let r = registry();
        let kinds = [kind::DISK_SPACE, kind::CPU_SUSTAINED, kind::PROCESS_GROWTH, kind::MEMORY_TREND];
        let ids: Vec<String> = kinds
            .iter()
            .map(|k| {
                let a = alert(k, Severity::Warning);
                let id = a.id().to_string();
                assert!(r.raise(a));
                id
            })
            .collect();

        assert!(r.clear_alert(&ids[1]));
        assert!(r.active_alert(&ids[1]).is_none());
        assert_eq!(
            r.active_alert(&ids[2]).map(|a| a.kind().to_string()),
            Some(kind::PROCESS_GROWTH.to_string())
        );
        let listed: Vec<String> = r.active_alerts().iter().map(|a| a.id().to_string()).collect();
        assert_eq!(listed, vec![ids[0].clone(), ids[2].clone(), ids[3].clone()]);
    }

    #[test]
    fn clear_all_empties_active_only() {
        let r = registry();
        r.raise(alert(kind::CPU_SUSTAINED, Severity::Warning));
        r.raise(alert(kind::PROCESS_GROWTH, Severity::Warning));
        assert_eq!(r.clear_all(), 2);
        assert!(r.active_alerts().is_empty());
        assert_eq!(r.history(10).len(), 2);
    }

    #[test]
    fn history_is_bounded() {
        let r = AlertRegistry::new(Arc::new(NullAlertLog), 3);
        for i in 0..5 {
            r.raise(alert(&format!("kind_{i}"), Severity::Info));
        }
        let history = r.history(100);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].kind(), "kind_2");
        assert_eq!(r.history(1)[0].kind(), "kind_4");
    }

    #[test]
    fn callbacks_run_in_order_and_survive_failures() {
        let r = registry();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        r.register_callback(move |_| {
            o.lock().expect("order").push(1);
            anyhow::bail!("first callback fails")
        });
        r.register_callback(|_| panic!("second callback panics"));
        let o = order.clone();
        r.register_callback(move |_| {
            o.lock().expect("order").push(3);
            Ok(())
        });

        assert!(r.raise(alert(kind::MEMORY_TREND, Severity::Emergency)));
        assert_eq!(*order.lock().expect("order"), vec![1, 3]);
    }

    struct CountingLog(AtomicUsize);

    impl AlertLog for CountingLog {
        fn append(&self, _alert: &Alert) -> Result<(), AlertLogError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(AlertLogError::AppendFailed("disk full".into()))
        }
    }

    #[test]
    fn log_failures_do_not_block_raise() {
        let log = Arc::new(CountingLog(AtomicUsize::new(0)));
        let r = AlertRegistry::with_default_history(log.clone());
        assert!(r.raise(alert(kind::DISK_SPACE, Severity::Critical)));
        assert!(!r.raise(alert(kind::DISK_SPACE, Severity::Critical)));
        assert_eq!(log.0.load(Ordering::SeqCst), 1);
    }
}
