//! Entity services: typed CRUD over one hosted table each.
//!
//! Every operation returns an explicit `Result`. Failures are logged and
//! raised through the [`Notifier`] before being returned, so a caller that
//! only wants the degraded view can write `.unwrap_or_default()` and get an
//! empty list, `None`, or `false`.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crmdesk_core::records::{Activity, Contact, Deal, Entity, Quote, QuoteStatus, Task};
use crmdesk_core::table::{
    DeleteParams, FetchParams, FieldSpec, GetParams, MutationResponse, OrderBy, PagingInfo,
    RecordResult, RecordsPayload, WhereClause,
};

use crate::error::{RecordFailure, ServiceError};
use crate::notify::{NoticeLevel, Notifier};
use crate::table::TableApi;

/// Filter, ordering and paging for `get_all`. Unset ordering and paging
/// fall back to the entity's defaults.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub where_clauses: Vec<WhereClause>,
    pub order_by: Option<Vec<OrderBy>>,
    pub paging: Option<PagingInfo>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.where_clauses.push(clause);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.get_or_insert_with(Vec::new).push(order);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.paging = Some(PagingInfo { limit, offset });
        self
    }

    fn into_params<E: Entity>(self) -> FetchParams {
        FetchParams {
            fields: FieldSpec::list(E::FIELDS),
            where_clauses: self.where_clauses,
            order_by: self.order_by.unwrap_or_else(E::default_order),
            paging_info: self.paging.or_else(E::default_paging),
        }
    }
}

/// Search and status filters of the quotes list.
#[derive(Debug, Clone, Default)]
pub struct QuoteFilters {
    pub search: Option<String>,
    pub status: Option<QuoteStatus>,
}

impl From<QuoteFilters> for Query {
    fn from(filters: QuoteFilters) -> Self {
        let mut query = Query::new();
        if let Some(search) = filters.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(WhereClause::contains("Name", search).included());
        }
        if let Some(status) = filters.status {
            query = query.filter(WhereClause::equal_to("status_c", status.as_str()).included());
        }
        query
    }
}

pub struct EntityService<E: Entity> {
    api: Arc<dyn TableApi>,
    notifier: Arc<dyn Notifier>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            notifier: Arc::clone(&self.notifier),
            _entity: PhantomData,
        }
    }
}

pub type ContactService = EntityService<Contact>;
pub type DealService = EntityService<Deal>;
pub type QuoteService = EntityService<Quote>;
pub type TaskService = EntityService<Task>;
pub type ActivityService = EntityService<Activity>;

impl<E: Entity> EntityService<E> {
    pub fn new(api: Arc<dyn TableApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            _entity: PhantomData,
        }
    }

    /// All records with the entity's default ordering and paging.
    pub async fn list(&self) -> Result<Vec<E>, ServiceError> {
        self.get_all(Query::default()).await
    }

    pub async fn get_all(&self, query: impl Into<Query>) -> Result<Vec<E>, ServiceError> {
        self.fetch(query.into())
            .await
            .map_err(|err| self.report("fetch", err))
    }

    /// `Ok(None)` when the store has no such record.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<E>, ServiceError> {
        self.fetch_one(id)
            .await
            .map_err(|err| self.report("get", err))
    }

    pub async fn create(&self, input: &E::Input) -> Result<E, ServiceError> {
        let result = self.write(None, input).await;
        self.finish_write("create", "created", result)
    }

    pub async fn update(&self, id: i64, input: &E::Input) -> Result<E, ServiceError> {
        let result = self.write(Some(id), input).await;
        self.finish_write("update", "updated", result)
    }

    /// `Ok(true)` when the store confirmed at least one deletion.
    pub async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        match self.remove(id).await {
            Ok(deleted) => {
                if deleted && E::ANNOUNCE_WRITES {
                    self.notifier
                        .notify(NoticeLevel::Success, &format!("{} deleted successfully", E::NOUN));
                }
                Ok(deleted)
            }
            Err(err) => Err(self.report("delete", err)),
        }
    }

    async fn fetch(&self, query: Query) -> Result<Vec<E>, ServiceError> {
        let params = query.into_params::<E>();
        let response = self.api.fetch_records(E::TABLE, &params).await?;
        if !response.success {
            return Err(ServiceError::remote(E::TABLE, response.message));
        }
        response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|record| self.decode(record))
            .collect()
    }

    async fn fetch_one(&self, id: i64) -> Result<Option<E>, ServiceError> {
        let params = GetParams {
            fields: FieldSpec::list(E::FIELDS),
        };
        let response = self.api.get_record_by_id(E::TABLE, id, &params).await?;
        if !response.success {
            return Err(ServiceError::remote(E::TABLE, response.message));
        }
        match response.data {
            None | Some(Value::Null) => Ok(None),
            Some(record) => self.decode(record).map(Some),
        }
    }

    async fn write(&self, id: Option<i64>, input: &E::Input) -> Result<E, ServiceError> {
        E::validate(input)?;

        let mut record =
            serde_json::to_value(input).map_err(|source| ServiceError::decode(E::TABLE, source))?;
        if let (Some(id), Value::Object(fields)) = (id, &mut record) {
            fields.insert("Id".to_string(), Value::from(id));
        }
        let payload = RecordsPayload {
            records: vec![record],
        };

        let response = match id {
            Some(_) => self.api.update_records(E::TABLE, &payload).await?,
            None => self.api.create_records(E::TABLE, &payload).await?,
        };
        let op = if id.is_some() { "update" } else { "create" };
        let succeeded = self.split_batch(op, response)?;

        match succeeded.into_iter().find_map(|r| r.data) {
            Some(record) => self.decode(record),
            None => Err(ServiceError::remote(
                E::TABLE,
                Some(format!("{} {op} returned no record", E::NOUN)),
            )),
        }
    }

    async fn remove(&self, id: i64) -> Result<bool, ServiceError> {
        let params = DeleteParams {
            record_ids: vec![id],
        };
        let response = self.api.delete_records(E::TABLE, &params).await?;
        if response.results.is_none() && response.success {
            return Ok(false);
        }
        Ok(!self.split_batch("delete", response)?.is_empty())
    }

    /// Check the envelope, report each failed record, and hand back the
    /// successful ones. A batch with no successes is an error.
    fn split_batch(
        &self,
        op: &'static str,
        response: MutationResponse,
    ) -> Result<Vec<RecordResult>, ServiceError> {
        if !response.success {
            return Err(ServiceError::remote(E::TABLE, response.message));
        }
        let (succeeded, failed) = response.partition();

        let failures: Vec<RecordFailure> = failed
            .into_iter()
            .map(|r| RecordFailure {
                message: r.message,
                errors: r.errors,
            })
            .collect();
        if !failures.is_empty() {
            tracing::warn!(
                table = E::TABLE,
                op,
                failed = failures.len(),
                succeeded = succeeded.len(),
                "failed to {op} {} {}",
                failures.len(),
                E::LABEL
            );
            for notice in failures.iter().flat_map(RecordFailure::notices) {
                self.notifier.notify(NoticeLevel::Error, &notice);
            }
        }

        if succeeded.is_empty() {
            return Err(ServiceError::Rejected {
                table: E::TABLE.to_string(),
                failures,
            });
        }
        Ok(succeeded)
    }

    fn finish_write(
        &self,
        op: &'static str,
        past: &str,
        result: Result<E, ServiceError>,
    ) -> Result<E, ServiceError> {
        match result {
            Ok(record) => {
                tracing::debug!(table = E::TABLE, op, id = record.id(), "record written");
                if E::ANNOUNCE_WRITES {
                    self.notifier
                        .notify(NoticeLevel::Success, &format!("{} {past} successfully", E::NOUN));
                }
                Ok(record)
            }
            Err(err) => Err(self.report(op, err)),
        }
    }

    fn decode(&self, record: Value) -> Result<E, ServiceError> {
        serde_json::from_value(record).map_err(|source| ServiceError::decode(E::TABLE, source))
    }

    /// Log a failure and raise it as a notice. Rejected batches were
    /// already reported record by record.
    fn report(&self, op: &'static str, err: ServiceError) -> ServiceError {
        tracing::error!(table = E::TABLE, op, error = %err, "{} {op} failed", E::LABEL);
        if !matches!(err, ServiceError::Rejected { .. }) {
            self.notifier.notify(NoticeLevel::Error, &err.to_string());
        }
        err
    }
}

impl EntityService<Activity> {
    pub async fn for_contact(&self, contact_id: i64) -> Result<Vec<Activity>, ServiceError> {
        self.get_all(Query::new().filter(WhereClause::equal_to("contact_id_c", contact_id)))
            .await
    }

    pub async fn for_deal(&self, deal_id: i64) -> Result<Vec<Activity>, ServiceError> {
        self.get_all(Query::new().filter(WhereClause::equal_to("deal_id_c", deal_id)))
            .await
    }
}

/// One service per table, sharing a client and a notifier.
#[derive(Clone)]
pub struct Services {
    pub contacts: ContactService,
    pub deals: DealService,
    pub quotes: QuoteService,
    pub tasks: TaskService,
    pub activities: ActivityService,
}

impl Services {
    pub fn new(api: Arc<dyn TableApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            contacts: EntityService::new(Arc::clone(&api), Arc::clone(&notifier)),
            deals: EntityService::new(Arc::clone(&api), Arc::clone(&notifier)),
            quotes: EntityService::new(Arc::clone(&api), Arc::clone(&notifier)),
            tasks: EntityService::new(Arc::clone(&api), Arc::clone(&notifier)),
            activities: EntityService::new(api, notifier),
        }
    }
}
