use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::json;

use crmdesk_client::{EntityService, Query, ServiceError};
use crmdesk_core::error::{ErrorBody, codes};
use crmdesk_core::records::Entity;

use crate::util::{EXIT_USAGE, print_error, print_json, read_input, service_failure};

/// Record payload for create/update.
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Record fields as a JSON object (wire names, e.g. '{"name_c":"Dana"}')
    #[arg(long, required_unless_present = "data_file")]
    pub data: Option<String>,
    /// Read record fields from file (use '-' for stdin)
    #[arg(long, short = 'f', conflicts_with = "data")]
    pub data_file: Option<String>,
}

impl DataArgs {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, String> {
        read_input(self.data.as_deref(), self.data_file.as_deref())
    }
}

/// Single-record operations shared by every entity.
#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Fetch one record by id
    Get { id: i64 },
    /// Create a record
    Create {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Update a record (only the given fields are sent)
    Update {
        id: i64,
        #[command(flatten)]
        data: DataArgs,
    },
    /// Delete a record
    Delete { id: i64 },
}

/// Commands for entities without list filters (contacts, deals, tasks).
#[derive(Subcommand, Debug)]
pub enum CrudCommands {
    /// List records
    List,
    #[command(flatten)]
    Record(RecordCommands),
}

pub async fn run<E>(service: &EntityService<E>, command: CrudCommands) -> i32
where
    E: Entity,
    E::Input: DeserializeOwned,
{
    match command {
        CrudCommands::List => list(service, Query::new()).await,
        CrudCommands::Record(command) => run_record(service, command).await,
    }
}

pub async fn run_record<E>(service: &EntityService<E>, command: RecordCommands) -> i32
where
    E: Entity,
    E::Input: DeserializeOwned,
{
    match command {
        RecordCommands::Get { id } => get(service, id).await,
        RecordCommands::Create { data } => match data.decode::<E::Input>() {
            Ok(input) => create(service, &input).await,
            Err(message) => usage_error(&message),
        },
        RecordCommands::Update { id, data } => match data.decode::<E::Input>() {
            Ok(input) => update(service, id, &input).await,
            Err(message) => usage_error(&message),
        },
        RecordCommands::Delete { id } => delete(service, id).await,
    }
}

pub async fn list<E: Entity>(service: &EntityService<E>, query: impl Into<Query>) -> i32 {
    match service.get_all(query).await {
        Ok(records) => print_json(&records),
        Err(e) => service_failure(&e),
    }
}

pub async fn get<E: Entity>(service: &EntityService<E>, id: i64) -> i32 {
    match service.get_by_id(id).await {
        Ok(Some(record)) => print_json(&record),
        Ok(None) => not_found::<E>(id),
        Err(e) => service_failure(&e),
    }
}

pub async fn create<E: Entity>(service: &EntityService<E>, input: &E::Input) -> i32 {
    match service.create(input).await {
        Ok(record) => print_json(&record),
        Err(e) => service_failure(&e),
    }
}

pub async fn update<E: Entity>(service: &EntityService<E>, id: i64, input: &E::Input) -> i32 {
    match service.update(id, input).await {
        Ok(record) => print_json(&record),
        Err(e) => service_failure(&e),
    }
}

pub async fn delete<E: Entity>(service: &EntityService<E>, id: i64) -> i32 {
    match service.delete(id).await {
        Ok(true) => print_json(&json!({"deleted": true, "table": E::TABLE, "id": id})),
        Ok(false) => not_found::<E>(id),
        Err(e) => service_failure(&e),
    }
}

fn not_found<E: Entity>(id: i64) -> i32 {
    service_failure(&ServiceError::NotFound {
        table: E::TABLE.to_string(),
        id,
    })
}

pub fn usage_error(message: &str) -> i32 {
    print_error(
        &ErrorBody::new(codes::CLI_ERROR, message)
            .with_hint("Pass a JSON object using the table's wire field names"),
    );
    EXIT_USAGE
}
