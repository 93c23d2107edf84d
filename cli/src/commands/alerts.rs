use clap::Subcommand;
use serde_json::json;

use crmdesk_client::{AlertService, Services};

use crate::util::{alert_failure, print_json};

#[derive(Subcommand, Debug)]
pub enum AlertCommands {
    /// List current alerts, highest priority first
    List {
        /// Treat this alert as already dismissed (repeatable)
        #[arg(long = "dismiss", value_name = "ALERT_ID")]
        dismissed: Vec<String>,
    },
    /// Dismiss an alert for this listing only (not kept between runs) and
    /// list the remaining ones
    Dismiss {
        /// Alert id, e.g. overdue-42 or follow-up-7
        alert_id: String,
    },
    /// Mark a task complete and list the remaining alerts
    Complete { task_id: i64 },
}

pub async fn run(services: &Services, command: AlertCommands) -> i32 {
    let mut alerts = AlertService::new(services);

    match command {
        AlertCommands::List { dismissed } => {
            for alert_id in &dismissed {
                alerts.dismiss(alert_id);
            }
        }
        AlertCommands::Dismiss { alert_id } => {
            alerts.dismiss(&alert_id);
        }
        AlertCommands::Complete { task_id } => {
            if let Err(e) = alerts.complete_task(task_id).await {
                return alert_failure(&e);
            }
        }
    }

    match alerts.get_all(chrono::Local::now()).await {
        Ok(current) => {
            let dismissed: Vec<_> = alerts.ledger().keys().collect();
            print_json(&json!({
                "alerts": current,
                "dismissed": dismissed,
            }))
        }
        Err(e) => alert_failure(&e),
    }
}
