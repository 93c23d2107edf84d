//! In-memory doubles for service and alert tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crmdesk_core::table::{
    DeleteParams, FetchParams, FetchResponse, GetParams, MutationResponse, Operator,
    RecordResponse, RecordResult, RecordsPayload, WhereClause,
};

use crate::error::ServiceError;
use crate::notify::{NoticeLevel, Notifier};
use crate::table::TableApi;

/// Tables held in memory. Supports `EqualTo` and `Contains` filters; lookup
/// fields match on their `Id`.
pub struct FakeTables {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashMap<String, String>>,
    scripted: Mutex<Option<MutationResponse>>,
    fetches: Mutex<HashMap<String, FetchParams>>,
    writes: Mutex<HashMap<String, Value>>,
    next_id: AtomicI64,
}

impl Default for FakeTables {
    fn default() -> Self {
        Self {
            tables: Mutex::default(),
            failing: Mutex::default(),
            scripted: Mutex::default(),
            fetches: Mutex::default(),
            writes: Mutex::default(),
            next_id: AtomicI64::new(100),
        }
    }
}

impl FakeTables {
    pub fn seed(&self, table: &str, records: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), records);
    }

    /// Every call on `table` answers `success: false` with `message`.
    pub fn fail(&self, table: &str, message: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(table.to_string(), message.to_string());
    }

    pub fn recover(&self, table: &str) {
        self.failing.lock().unwrap().remove(table);
    }

    /// The next mutation returns `response` instead of touching the store.
    pub fn script_mutation(&self, response: MutationResponse) {
        *self.scripted.lock().unwrap() = Some(response);
    }

    pub fn last_fetch(&self, table: &str) -> Option<FetchParams> {
        self.fetches.lock().unwrap().get(table).cloned()
    }

    pub fn last_write(&self, table: &str) -> Option<Value> {
        self.writes.lock().unwrap().get(table).cloned()
    }

    pub fn record(&self, table: &str, id: i64) -> Option<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)?
            .iter()
            .find(|r| r["Id"] == id)
            .cloned()
    }

    fn failure(&self, table: &str) -> Option<String> {
        self.failing.lock().unwrap().get(table).cloned()
    }

    fn take_script(&self) -> Option<MutationResponse> {
        self.scripted.lock().unwrap().take()
    }

    fn failed_mutation(message: String) -> MutationResponse {
        MutationResponse {
            success: false,
            message: Some(message),
            results: None,
        }
    }

    fn ok(record: Value) -> RecordResult {
        RecordResult {
            success: true,
            data: Some(record),
            ..RecordResult::default()
        }
    }

    fn not_found() -> RecordResult {
        RecordResult {
            success: false,
            message: Some("Record does not exist".to_string()),
            ..RecordResult::default()
        }
    }
}

fn lookup_id(value: &Value) -> &Value {
    value.get("Id").unwrap_or(value)
}

fn matches(record: &Value, clause: &WhereClause) -> bool {
    let Some(field) = record.get(&clause.field_name) else {
        return false;
    };
    clause.values.iter().any(|wanted| match clause.operator {
        Operator::EqualTo => lookup_id(field) == wanted || field == wanted,
        Operator::Contains => match (field.as_str(), wanted.as_str()) {
            (Some(have), Some(want)) => have.to_lowercase().contains(&want.to_lowercase()),
            _ => false,
        },
        _ => true,
    })
}

#[async_trait]
impl TableApi for FakeTables {
    async fn fetch_records(
        &self,
        table: &str,
        params: &FetchParams,
    ) -> Result<FetchResponse, ServiceError> {
        self.fetches
            .lock()
            .unwrap()
            .insert(table.to_string(), params.clone());
        if let Some(message) = self.failure(table) {
            return Ok(FetchResponse {
                success: false,
                message: Some(message),
                data: None,
            });
        }
        let records = self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| params.where_clauses.iter().all(|c| matches(r, c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(FetchResponse {
            success: true,
            message: None,
            data: Some(records),
        })
    }

    async fn get_record_by_id(
        &self,
        table: &str,
        id: i64,
        _params: &GetParams,
    ) -> Result<RecordResponse, ServiceError> {
        if let Some(message) = self.failure(table) {
            return Ok(RecordResponse {
                success: false,
                message: Some(message),
                data: None,
            });
        }
        Ok(RecordResponse {
            success: true,
            message: None,
            data: self.record(table, id),
        })
    }

    async fn create_records(
        &self,
        table: &str,
        payload: &RecordsPayload,
    ) -> Result<MutationResponse, ServiceError> {
        if let Some(record) = payload.records.first() {
            self.writes
                .lock()
                .unwrap()
                .insert(table.to_string(), record.clone());
        }
        if let Some(message) = self.failure(table) {
            return Ok(Self::failed_mutation(message));
        }
        if let Some(scripted) = self.take_script() {
            return Ok(scripted);
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let results = payload
            .records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                record["Id"] = json!(self.next_id.fetch_add(1, Ordering::SeqCst));
                rows.push(record.clone());
                Self::ok(record)
            })
            .collect();
        Ok(MutationResponse {
            success: true,
            message: None,
            results: Some(results),
        })
    }

    async fn update_records(
        &self,
        table: &str,
        payload: &RecordsPayload,
    ) -> Result<MutationResponse, ServiceError> {
        if let Some(record) = payload.records.first() {
            self.writes
                .lock()
                .unwrap()
                .insert(table.to_string(), record.clone());
        }
        if let Some(message) = self.failure(table) {
            return Ok(Self::failed_mutation(message));
        }
        if let Some(scripted) = self.take_script() {
            return Ok(scripted);
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let results = payload
            .records
            .iter()
            .map(|patch| {
                let Some(row) = rows.iter_mut().find(|r| r["Id"] == patch["Id"]) else {
                    return Self::not_found();
                };
                if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
                    for (key, value) in patch {
                        row.insert(key.clone(), value.clone());
                    }
                }
                Self::ok(row.clone())
            })
            .collect();
        Ok(MutationResponse {
            success: true,
            message: None,
            results: Some(results),
        })
    }

    async fn delete_records(
        &self,
        table: &str,
        params: &DeleteParams,
    ) -> Result<MutationResponse, ServiceError> {
        if let Some(message) = self.failure(table) {
            return Ok(Self::failed_mutation(message));
        }
        if let Some(scripted) = self.take_script() {
            return Ok(scripted);
        }

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let results = params
            .record_ids
            .iter()
            .map(|id| match rows.iter().position(|r| r["Id"] == *id) {
                Some(index) => Self::ok(rows.remove(index)),
                None => Self::not_found(),
            })
            .collect();
        Ok(MutationResponse {
            success: true,
            message: None,
            results: Some(results),
        })
    }
}

/// Notifier that keeps every notice for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}
