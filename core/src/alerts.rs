//! Alert derivation.
//!
//! Alerts are never stored: they are recomputed from the current tasks,
//! activities and contacts every time they are requested, minus whatever
//! the session's [`DismissalLedger`] says has been acknowledged.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local};
use serde::Serialize;

use crate::ledger::{DismissalKey, DismissalLedger};
use crate::records::{Activity, Contact, Task};

/// Look-back window for the follow-up rule, and the idle threshold it applies.
pub const FOLLOW_UP_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    TaskOverdue,
    TaskDueToday,
    TaskDueTomorrow,
    ContactFollowUp,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::TaskOverdue,
        AlertKind::TaskDueToday,
        AlertKind::TaskDueTomorrow,
        AlertKind::ContactFollowUp,
    ];

    /// Prefix of the alert identifier, joined to the entity id with '-'.
    pub fn id_prefix(self) -> &'static str {
        match self {
            AlertKind::TaskOverdue => "overdue",
            AlertKind::TaskDueToday => "due-today",
            AlertKind::TaskDueTomorrow => "due-tomorrow",
            AlertKind::ContactFollowUp => "follow-up",
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            AlertKind::TaskOverdue => Priority::High,
            AlertKind::TaskDueToday => Priority::Medium,
            AlertKind::TaskDueTomorrow => Priority::Low,
            AlertKind::ContactFollowUp => Priority::Medium,
        }
    }

    pub fn is_task(self) -> bool {
        !matches!(self, AlertKind::ContactFollowUp)
    }

    pub fn title(self) -> &'static str {
        match self {
            AlertKind::TaskOverdue => "Task Overdue",
            AlertKind::TaskDueToday => "Task Due Today",
            AlertKind::TaskDueTomorrow => "Task Due Tomorrow",
            AlertKind::ContactFollowUp => "Follow-up Required",
        }
    }

    pub fn actions(self) -> Vec<AlertAction> {
        match self {
            AlertKind::TaskOverdue => vec![AlertAction::Complete, AlertAction::Dismiss],
            AlertKind::TaskDueToday => vec![AlertAction::Complete],
            AlertKind::TaskDueTomorrow => Vec::new(),
            AlertKind::ContactFollowUp => vec![AlertAction::Dismiss],
        }
    }

    pub fn alert_id(self, entity_id: i64) -> String {
        format!("{}-{entity_id}", self.id_prefix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    Complete,
    Dismiss,
}

impl AlertAction {
    pub fn label(self) -> &'static str {
        match self {
            AlertAction::Complete => "Mark Complete",
            AlertAction::Dismiss => "Dismiss",
        }
    }
}

/// The record an alert points back to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSubject {
    Task(Task),
    Contact {
        contact: Contact,
        /// In-window activities, newest first
        activities: Vec<Activity>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
    pub subject: AlertSubject,
    pub timestamp: DateTime<Local>,
    pub actions: Vec<AlertAction>,
}

impl Alert {
    fn new(
        kind: AlertKind,
        entity_id: i64,
        message: String,
        subject: AlertSubject,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            id: kind.alert_id(entity_id),
            kind,
            priority: kind.priority(),
            title: kind.title().to_string(),
            message,
            subject,
            timestamp,
            actions: kind.actions(),
        }
    }

    pub fn task_id(&self) -> Option<i64> {
        match &self.subject {
            AlertSubject::Task(task) => Some(task.id),
            AlertSubject::Contact { .. } => None,
        }
    }

    pub fn contact_id(&self) -> Option<i64> {
        match &self.subject {
            AlertSubject::Task(_) => None,
            AlertSubject::Contact { contact, .. } => Some(contact.id),
        }
    }

    pub fn dismissal_key(&self) -> DismissalKey {
        DismissalKey::from_alert_id(&self.id)
    }
}

/// Derive the current alert list.
///
/// Output is ordered by priority rank, then newest timestamp first.
pub fn compute_alerts(
    tasks: &[Task],
    activities: &[Activity],
    contacts: &[Contact],
    ledger: &DismissalLedger,
    now: DateTime<Local>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for task in tasks {
        task_alerts(task, ledger, now, &mut alerts);
    }
    follow_up_alerts(activities, contacts, ledger, now, &mut alerts);

    alerts.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    alerts
}

fn task_alerts(task: &Task, ledger: &DismissalLedger, now: DateTime<Local>, out: &mut Vec<Alert>) {
    if task.completed {
        return;
    }
    let Some(due) = task.due_date else {
        return;
    };
    let key = DismissalKey::Task(task.id);
    let today = now.date_naive();
    let due_day = due.date_naive();

    // Independent guards: each date predicate decides on its own. A bare
    // date is due at local midnight, so once that passes the task is both
    // overdue and due today.
    if due < now && !ledger.is_dismissed(&key) {
        out.push(Alert::new(
            AlertKind::TaskOverdue,
            task.id,
            format!("\"{}\" was due {}", task.title, due.format("%b %-d, %Y")),
            AlertSubject::Task(task.clone()),
            due,
        ));
    }

    if due_day == today && !ledger.is_dismissed(&key) {
        out.push(Alert::new(
            AlertKind::TaskDueToday,
            task.id,
            format!("\"{}\" is due today", task.title),
            AlertSubject::Task(task.clone()),
            due,
        ));
    }

    if today.succ_opt() == Some(due_day) && !ledger.is_dismissed(&key) {
        out.push(Alert::new(
            AlertKind::TaskDueTomorrow,
            task.id,
            format!("\"{}\" is due tomorrow", task.title),
            AlertSubject::Task(task.clone()),
            due,
        ));
    }
}

/// Follow-up rule.
///
/// Only activities inside `[now - 7d, now]` are considered, yet a contact
/// is flagged only when its newest such activity is at least 7 days old.
/// In practice this fires solely for an activity sitting exactly on the
/// window edge. Both bounds are closed. Activities without a timestamp
/// are skipped.
fn follow_up_alerts(
    activities: &[Activity],
    contacts: &[Contact],
    ledger: &DismissalLedger,
    now: DateTime<Local>,
    out: &mut Vec<Alert>,
) {
    let threshold = Duration::days(FOLLOW_UP_DAYS);
    let window_start = now - threshold;

    let mut recent: Vec<(DateTime<Local>, &Activity)> = activities
        .iter()
        .filter_map(|a| a.timestamp.map(|ts| (ts, a)))
        .filter(|(ts, _)| *ts >= window_start && *ts <= now)
        .collect();
    recent.sort_by(|a, b| b.0.cmp(&a.0));

    let mut by_contact: BTreeMap<i64, Vec<(DateTime<Local>, &Activity)>> = BTreeMap::new();
    for (ts, activity) in recent {
        if let Some(contact_id) = activity.contact_id() {
            by_contact.entry(contact_id).or_default().push((ts, activity));
        }
    }

    for (contact_id, contact_activities) in by_contact {
        if ledger.is_dismissed(&DismissalKey::Contact(contact_id)) {
            continue;
        }
        let Some(contact) = contacts.iter().find(|c| c.id == contact_id) else {
            continue;
        };
        let Some(&(latest, _)) = contact_activities.first() else {
            continue;
        };
        if now - latest < threshold {
            continue;
        }

        out.push(Alert::new(
            AlertKind::ContactFollowUp,
            contact_id,
            format!("No recent activity with {}", contact.name),
            AlertSubject::Contact {
                contact: contact.clone(),
                activities: contact_activities.iter().map(|(_, a)| (*a).clone()).collect(),
            },
            latest,
        ));
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};

    use super::*;
    use crate::records::{Reference, local_from_naive};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    fn task(id: i64, title: &str, due: Option<NaiveDate>, completed: bool) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: None,
            due_date: due.map(|d| local_from_naive(d.and_time(NaiveTime::MIN))),
            completed,
            priority: None,
            contact: None,
            deal: None,
        }
    }

    fn activity(id: i64, contact: Option<Reference>, timestamp: DateTime<Local>) -> Activity {
        Activity {
            id,
            description: format!("activity {id}"),
            kind: "call".to_string(),
            timestamp: Some(timestamp),
            contact,
            deal: None,
        }
    }

    fn contact(id: i64, name: &str) -> Contact {
        Contact {
            id,
            name: name.to_string(),
            email: None,
            phone: None,
            company: None,
            notes: None,
            tags: None,
            created_on: None,
            modified_on: None,
        }
    }

    fn run(tasks: &[Task], activities: &[Activity], contacts: &[Contact]) -> Vec<Alert> {
        compute_alerts(tasks, activities, contacts, &DismissalLedger::new(), now())
    }

    #[test]
    fn completed_tasks_never_alert() {
        let tasks = [
            task(1, "past", today().pred_opt(), true),
            task(2, "present", Some(today()), true),
            task(3, "future", today().succ_opt(), true),
        ];
        assert!(run(&tasks, &[], &[]).is_empty());
    }

    #[test]
    fn overdue_task_yields_single_high_alert() {
        let alerts = run(&[task(1, "Renew contract", today().pred_opt(), false)], &[], &[]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "overdue-1");
        assert_eq!(alerts[0].kind, AlertKind::TaskOverdue);
        assert_eq!(alerts[0].priority, Priority::High);
        assert_eq!(alerts[0].task_id(), Some(1));
        assert_eq!(
            alerts[0].actions,
            vec![AlertAction::Complete, AlertAction::Dismiss]
        );
    }

    #[test]
    fn overdue_message_formats_due_date() {
        let due = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let alerts = run(&[task(8, "Send invoice", Some(due), false)], &[], &[]);
        assert_eq!(alerts[0].message, "\"Send invoice\" was due Jun 3, 2024");
    }

    #[test]
    fn task_due_today_past_midnight_is_overdue_and_due_today() {
        let alerts = run(&[task(1, "Call Dana", Some(today()), false)], &[], &[]);

        let ids: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["overdue-1", "due-today-1"]);
        assert_eq!(alerts[0].priority, Priority::High);
        assert_eq!(alerts[1].priority, Priority::Medium);
        assert_eq!(alerts[1].message, "\"Call Dana\" is due today");
    }

    #[test]
    fn task_due_later_today_is_only_due_today() {
        let mut later = task(2, "Call Dana", None, false);
        later.due_date = Some(now() + Duration::hours(6));

        let alerts = run(&[later], &[], &[]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "due-today-2");
        assert_eq!(alerts[0].priority, Priority::Medium);
    }

    #[test]
    fn task_due_earlier_today_is_overdue() {
        let mut earlier = task(3, "Standup", None, false);
        earlier.due_date = Some(now() - Duration::minutes(1));

        let ids: Vec<String> = run(&[earlier], &[], &[]).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["overdue-3", "due-today-3"]);
    }

    #[test]
    fn task_due_tomorrow_is_low_without_actions() {
        let alerts = run(&[task(3, "Prep deck", today().succ_opt(), false)], &[], &[]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "due-tomorrow-3");
        assert_eq!(alerts[0].priority, Priority::Low);
        assert!(alerts[0].actions.is_empty());
    }

    #[test]
    fn tasks_without_due_date_or_far_out_are_quiet() {
        let tasks = [
            task(4, "someday", None, false),
            task(5, "next week", Some(today() + Duration::days(7)), false),
        ];
        assert!(run(&tasks, &[], &[]).is_empty());
    }

    #[test]
    fn dismissed_overdue_alert_is_suppressed() {
        let tasks = [task(42, "Renew", today().pred_opt(), false)];
        let mut ledger = DismissalLedger::new();
        ledger.dismiss("overdue-42");

        let alerts = compute_alerts(&tasks, &[], &[], &ledger, now());
        assert!(alerts.iter().all(|a| a.id != "overdue-42"));
    }

    #[test]
    fn dismissing_a_contact_leaves_same_numbered_task_alone() {
        let tasks = [task(5, "Renew", today().pred_opt(), false)];
        let mut ledger = DismissalLedger::new();
        ledger.dismiss("follow-up-5");

        let alerts = compute_alerts(&tasks, &[], &[], &ledger, now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "overdue-5");
    }

    #[test]
    fn output_is_ordered_by_priority_then_newest_first() {
        let edge = now() - Duration::days(FOLLOW_UP_DAYS);
        let tasks = [
            task(1, "tomorrow", today().succ_opt(), false),
            task(2, "long overdue", Some(today() - Duration::days(10)), false),
            task(3, "today", Some(today()), false),
            task(4, "just overdue", today().pred_opt(), false),
        ];
        let activities = [activity(1, Some(Reference::Id(9)), edge)];
        let contacts = [contact(9, "Acme")];

        let alerts = run(&tasks, &activities, &contacts);
        let ids: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "overdue-3",
                "overdue-4",
                "overdue-2",
                "due-today-3",
                "follow-up-9",
                "due-tomorrow-1"
            ]
        );

        for pair in alerts.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.priority.rank() <= b.priority.rank());
            if a.priority == b.priority {
                assert!(a.timestamp >= b.timestamp);
            }
        }
    }

    #[test]
    fn single_overdue_task_scenario() {
        let alerts = run(&[task(1, "Renew contract", today().pred_opt(), false)], &[], &[]);
        let value = serde_json::to_value(&alerts).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["Id"], "overdue-1");
        assert_eq!(value[0]["type"], "task_overdue");
        assert_eq!(value[0]["priority"], "high");
        assert_eq!(value[0]["subject"]["task"]["Id"], 1);
    }

    #[test]
    fn activity_outside_window_produces_no_follow_up() {
        let activities = [activity(
            1,
            Some(Reference::Expanded {
                id: 5,
                name: "Acme".to_string(),
            }),
            now() - Duration::days(10),
        )];
        let contacts = [contact(5, "Acme")];

        assert!(run(&[], &activities, &contacts).is_empty());
    }

    // The window and the idle threshold are both 7 days, so only an activity
    // exactly on the window edge triggers a follow-up. Kept as observed.
    #[test]
    fn follow_up_fires_only_on_exact_window_edge() {
        let contacts = [contact(5, "Acme")];

        let on_edge = [activity(1, Some(Reference::Id(5)), now() - Duration::days(7))];
        let alerts = run(&[], &on_edge, &contacts);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "follow-up-5");
        assert_eq!(alerts[0].priority, Priority::Medium);
        assert_eq!(alerts[0].message, "No recent activity with Acme");
        assert_eq!(alerts[0].contact_id(), Some(5));

        let inside = [activity(
            2,
            Some(Reference::Id(5)),
            now() - Duration::days(7) + Duration::seconds(1),
        )];
        assert!(run(&[], &inside, &contacts).is_empty());
    }

    #[test]
    fn newest_in_window_activity_decides_follow_up() {
        let contacts = [contact(5, "Acme")];
        let activities = [
            activity(1, Some(Reference::Id(5)), now() - Duration::days(7)),
            activity(2, Some(Reference::Id(5)), now() - Duration::days(2)),
        ];
        assert!(run(&[], &activities, &contacts).is_empty());
    }

    #[test]
    fn follow_up_skips_unknown_contacts_and_unlinked_activities() {
        let edge = now() - Duration::days(7);
        let activities = [activity(1, None, edge), activity(2, Some(Reference::Id(77)), edge)];
        let contacts = [contact(5, "Acme")];

        assert!(run(&[], &activities, &contacts).is_empty());
    }

    #[test]
    fn follow_up_carries_activities_and_respects_dismissal() {
        let edge = now() - Duration::days(7);
        let activities = [
            activity(1, Some(Reference::Id(5)), edge),
            activity(2, Some(Reference::Id(5)), edge),
        ];
        let contacts = [contact(5, "Acme")];

        let alerts = run(&[], &activities, &contacts);
        match &alerts[0].subject {
            AlertSubject::Contact { activities, .. } => assert_eq!(activities.len(), 2),
            other => panic!("unexpected subject {other:?}"),
        }

        let mut ledger = DismissalLedger::new();
        ledger.dismiss(&alerts[0].id);
        assert!(compute_alerts(&[], &activities, &contacts, &ledger, now()).is_empty());
    }

    #[test]
    fn activity_without_timestamp_is_ignored() {
        let edge = now() - Duration::days(7);
        let mut undated = activity(2, Some(Reference::Id(5)), edge);
        undated.timestamp = None;
        let contacts = [contact(5, "Acme")];

        assert!(run(&[], &[undated.clone()], &contacts).is_empty());

        let alerts = run(&[], &[activity(1, Some(Reference::Id(5)), edge), undated], &contacts);
        assert_eq!(alerts.len(), 1);
        match &alerts[0].subject {
            AlertSubject::Contact { activities, .. } => assert_eq!(activities.len(), 1),
            other => panic!("unexpected subject {other:?}"),
        }
    }

    #[test]
    fn future_activities_are_outside_the_window() {
        let activities = [activity(1, Some(Reference::Id(5)), now() + Duration::hours(1))];
        let contacts = [contact(5, "Acme")];
        assert!(run(&[], &activities, &contacts).is_empty());
    }
}
