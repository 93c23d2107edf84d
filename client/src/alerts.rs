//! Alert service: loads tasks, activities and contacts and runs the alert
//! engine over them, filtered through this session's dismissals.

use chrono::{DateTime, Local};

use crmdesk_core::alerts::{Alert, compute_alerts};
use crmdesk_core::ledger::{DismissalKey, DismissalLedger};
use crmdesk_core::records::TaskInput;

use crate::error::AlertError;
use crate::services::{ActivityService, ContactService, Services, TaskService};

pub struct AlertService {
    tasks: TaskService,
    activities: ActivityService,
    contacts: ContactService,
    ledger: DismissalLedger,
}

impl AlertService {
    pub fn new(services: &Services) -> Self {
        Self {
            tasks: services.tasks.clone(),
            activities: services.activities.clone(),
            contacts: services.contacts.clone(),
            ledger: DismissalLedger::new(),
        }
    }

    pub fn ledger(&self) -> &DismissalLedger {
        &self.ledger
    }

    /// Current alerts as of `now`. The three reads run concurrently; any
    /// one failing fails the whole load.
    pub async fn get_all(&self, now: DateTime<Local>) -> Result<Vec<Alert>, AlertError> {
        let (tasks, activities, contacts) = tokio::try_join!(
            self.tasks.list(),
            self.activities.list(),
            self.contacts.list(),
        )
        .map_err(AlertError::Load)?;

        let alerts = compute_alerts(&tasks, &activities, &contacts, &self.ledger, now);
        tracing::debug!(
            tasks = tasks.len(),
            activities = activities.len(),
            contacts = contacts.len(),
            alerts = alerts.len(),
            dismissed = self.ledger.len(),
            "alerts computed"
        );
        Ok(alerts)
    }

    /// Acknowledge an alert by id. Returns false if it was already dismissed.
    pub fn dismiss(&mut self, alert_id: &str) -> bool {
        let key = DismissalKey::from_alert_id(alert_id);
        let added = self.ledger.insert(key.clone());
        tracing::info!(alert_id, key = ?key, added, "alert dismissed");
        added
    }

    /// Mark a task completed and suppress its alerts for the session, even
    /// against a snapshot read before the update landed.
    pub async fn complete_task(&mut self, task_id: i64) -> Result<(), AlertError> {
        self.tasks
            .update(task_id, &TaskInput::completion())
            .await
            .map_err(|source| AlertError::Complete { task_id, source })?;

        self.ledger.insert(DismissalKey::Task(task_id));
        tracing::info!(task_id, "task completed from alert");
        Ok(())
    }

    pub fn clear_dismissed(&mut self) {
        self.ledger.clear();
    }
}
