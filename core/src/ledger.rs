use std::collections::HashSet;

use serde::Serialize;

use crate::alerts::AlertKind;

/// Normalised key under which an acknowledged alert is remembered.
///
/// All three task alert kinds collapse onto the task's key, so
/// acknowledging "overdue" also hides "due today" for the same task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DismissalKey {
    Task(i64),
    Contact(i64),
    /// An identifier without a recognised kind prefix, kept verbatim.
    Other(String),
}

impl DismissalKey {
    /// Strip a recognised kind prefix from an alert identifier.
    pub fn from_alert_id(alert_id: &str) -> Self {
        for kind in AlertKind::ALL {
            let Some(rest) = alert_id
                .strip_prefix(kind.id_prefix())
                .and_then(|r| r.strip_prefix('-'))
            else {
                continue;
            };
            // the prefix must be followed by a numeric entity id
            let Ok(id) = rest.parse::<i64>() else {
                continue;
            };
            return if kind.is_task() {
                DismissalKey::Task(id)
            } else {
                DismissalKey::Contact(id)
            };
        }
        DismissalKey::Other(alert_id.to_string())
    }
}

/// Session-scoped set of acknowledged alerts.
///
/// Lives as long as the owning session; nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct DismissalLedger {
    keys: HashSet<DismissalKey>,
}

impl DismissalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an alert as acknowledged. Returns false if it already was.
    pub fn dismiss(&mut self, alert_id: &str) -> bool {
        self.insert(DismissalKey::from_alert_id(alert_id))
    }

    pub fn insert(&mut self, key: DismissalKey) -> bool {
        self.keys.insert(key)
    }

    pub fn is_dismissed(&self, key: &DismissalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DismissalKey> {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{DismissalKey, DismissalLedger};

    #[test]
    fn task_prefixes_normalise_to_task_key() {
        for id in ["overdue-42", "due-today-42", "due-tomorrow-42"] {
            assert_eq!(DismissalKey::from_alert_id(id), DismissalKey::Task(42));
        }
    }

    #[test]
    fn follow_up_prefix_normalises_to_contact_key() {
        assert_eq!(
            DismissalKey::from_alert_id("follow-up-5"),
            DismissalKey::Contact(5)
        );
    }

    #[test]
    fn unrecognised_identifier_is_kept_verbatim() {
        assert_eq!(
            DismissalKey::from_alert_id("reminder-3"),
            DismissalKey::Other("reminder-3".to_string())
        );
        assert_eq!(
            DismissalKey::from_alert_id("overdue-abc"),
            DismissalKey::Other("overdue-abc".to_string())
        );
    }

    #[test]
    fn dismiss_is_idempotent() {
        let mut ledger = DismissalLedger::new();
        assert!(ledger.dismiss("overdue-42"));
        assert!(!ledger.dismiss("overdue-42"));
        assert!(!ledger.dismiss("due-today-42"));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_dismissed(&DismissalKey::Task(42)));
    }

    #[test]
    fn task_and_contact_keys_do_not_collide() {
        let mut ledger = DismissalLedger::new();
        ledger.dismiss("follow-up-5");
        assert!(ledger.is_dismissed(&DismissalKey::Contact(5)));
        assert!(!ledger.is_dismissed(&DismissalKey::Task(5)));
    }

    #[test]
    fn clear_empties_the_ledger() {
        let mut ledger = DismissalLedger::new();
        ledger.dismiss("overdue-1");
        ledger.dismiss("follow-up-2");
        ledger.clear();
        assert!(ledger.is_empty());
    }
}
