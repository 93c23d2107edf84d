use clap::Subcommand;
use serde::Serialize;

use crmdesk_client::services::ActivityService;
use crmdesk_client::{Query, ServiceError};

use super::crud::{RecordCommands, list, run_record};
use crate::util::{print_json, service_failure};

#[derive(Subcommand, Debug)]
pub enum ActivityCommands {
    /// List activities, newest first
    List {
        /// Only activities logged against this contact
        #[arg(long, conflicts_with = "deal_id")]
        contact_id: Option<i64>,
        /// Only activities logged against this deal
        #[arg(long)]
        deal_id: Option<i64>,
    },
    #[command(flatten)]
    Record(RecordCommands),
}

pub async fn run(service: &ActivityService, command: ActivityCommands) -> i32 {
    match command {
        ActivityCommands::List {
            contact_id: Some(id),
            ..
        } => print_result(service.for_contact(id).await),
        ActivityCommands::List {
            deal_id: Some(id), ..
        } => print_result(service.for_deal(id).await),
        ActivityCommands::List { .. } => list(service, Query::new()).await,
        ActivityCommands::Record(command) => run_record(service, command).await,
    }
}

fn print_result<T: Serialize>(result: Result<T, ServiceError>) -> i32 {
    match result {
        Ok(value) => print_json(&value),
        Err(e) => service_failure(&e),
    }
}
