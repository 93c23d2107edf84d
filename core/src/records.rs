use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

use crate::table::{OrderBy, PagingInfo};

/// Parse failure for a date or timestamp field received from the table store.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct DateParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Input rejected before it is sent to the table store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Wire name of the offending field
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A lookup field (contact, deal). The table store writes these as bare
/// integers but may read them back either bare or expanded to `{Id, Name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(i64),
    Expanded {
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Name", default)]
        name: String,
    },
}

impl Reference {
    pub fn id(&self) -> i64 {
        match self {
            Reference::Id(id) => *id,
            Reference::Expanded { id, .. } => *id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Reference::Id(_) => None,
            Reference::Expanded { name, .. } => Some(name.as_str()),
        }
    }
}

/// A text field that some tables expand into a lookup object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Lookup {
        #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
        id: Option<i64>,
        #[serde(rename = "Name")]
        name: String,
    },
}

impl Label {
    pub fn as_str(&self) -> &str {
        match self {
            Label::Text(text) => text,
            Label::Lookup { name, .. } => name,
        }
    }
}

/// Static description of a table-backed entity.
pub trait Entity: Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static {
    /// Payload accepted by create/update (only updateable fields)
    type Input: Serialize + Send + Sync;

    /// Table name in the hosted store
    const TABLE: &'static str;
    /// Plural label used in log lines and notifications
    const LABEL: &'static str;
    /// Singular label for success notices
    const NOUN: &'static str;
    /// Whether successful writes raise a success notice
    const ANNOUNCE_WRITES: bool = false;
    /// Fields projected on every read
    const FIELDS: &'static [&'static str];

    fn id(&self) -> i64;

    fn default_order() -> Vec<OrderBy> {
        Vec::new()
    }

    fn default_paging() -> Option<PagingInfo> {
        None
    }

    /// Checks run before a create or update is sent.
    fn validate(_input: &Self::Input) -> Result<(), ValidationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "name_c", default)]
    pub name: String,
    #[serde(rename = "email_c", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "phone_c", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "company_c", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "notes_c", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "tags_c", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(rename = "CreatedOn", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(rename = "ModifiedOn", default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInput {
    #[serde(rename = "name_c")]
    pub name: String,
    #[serde(rename = "email_c", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "phone_c", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "company_c", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "notes_c", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "tags_c", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl Entity for Contact {
    type Input = ContactInput;

    const TABLE: &'static str = "contact_c";
    const LABEL: &'static str = "contacts";
    const NOUN: &'static str = "Contact";
    const FIELDS: &'static [&'static str] = &[
        "name_c",
        "email_c",
        "phone_c",
        "company_c",
        "notes_c",
        "tags_c",
        "CreatedOn",
        "ModifiedOn",
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "description_c", default)]
    pub description: String,
    #[serde(rename = "type_c", default)]
    pub kind: String,
    /// `None` when the store holds no readable timestamp for the row
    #[serde(
        rename = "timestamp_c",
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Local>>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Reference>,
    #[serde(rename = "deal_id_c", default, skip_serializing_if = "Option::is_none")]
    pub deal: Option<Reference>,
}

impl Activity {
    pub fn contact_id(&self) -> Option<i64> {
        self.contact.as_ref().map(Reference::id)
    }

    pub fn deal_id(&self) -> Option<i64> {
        self.deal.as_ref().map(Reference::id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityInput {
    #[serde(rename = "description_c")]
    pub description: String,
    #[serde(rename = "type_c")]
    pub kind: String,
    #[serde(rename = "timestamp_c")]
    pub timestamp: DateTime<Local>,
    #[serde(rename = "contact_id_c", default)]
    pub contact_id: Option<i64>,
    #[serde(rename = "deal_id_c", default)]
    pub deal_id: Option<i64>,
}

impl Entity for Activity {
    type Input = ActivityInput;

    const TABLE: &'static str = "activity_c";
    const LABEL: &'static str = "activities";
    const NOUN: &'static str = "Activity";
    const FIELDS: &'static [&'static str] = &[
        "description_c",
        "type_c",
        "timestamp_c",
        "contact_id_c",
        "deal_id_c",
        "CreatedOn",
        "ModifiedOn",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn default_order() -> Vec<OrderBy> {
        vec![OrderBy::desc("timestamp_c")]
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "title_c", default)]
    pub title: String,
    #[serde(rename = "description_c", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "due_date_c",
        default,
        deserialize_with = "deserialize_due_date",
        skip_serializing_if = "Option::is_none"
    )]
    /// Due instant: local midnight for a bare date, otherwise the given time
    pub due_date: Option<DateTime<Local>>,
    #[serde(rename = "completed_c", default)]
    pub completed: bool,
    #[serde(rename = "priority_c", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Reference>,
    #[serde(rename = "deal_id_c", default, skip_serializing_if = "Option::is_none")]
    pub deal: Option<Reference>,
}

/// Task writes. Every field is optional so a partial update such as
/// marking a task complete only sends `completed_c`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInput {
    #[serde(rename = "title_c", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "description_c", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "due_date_c", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "completed_c", default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(rename = "priority_c", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    #[serde(rename = "deal_id_c", default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<i64>,
}

impl TaskInput {
    pub fn completion() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }
}

impl Entity for Task {
    type Input = TaskInput;

    const TABLE: &'static str = "task_c";
    const LABEL: &'static str = "tasks";
    const NOUN: &'static str = "Task";
    const FIELDS: &'static [&'static str] = &[
        "title_c",
        "description_c",
        "due_date_c",
        "completed_c",
        "priority_c",
        "contact_id_c",
        "deal_id_c",
        "CreatedOn",
        "ModifiedOn",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn default_order() -> Vec<OrderBy> {
        vec![OrderBy::asc("due_date_c")]
    }
}

// ---------------------------------------------------------------------------
// Deals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "value_c", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(rename = "stage_c", default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Reference>,
    #[serde(
        rename = "expected_close_date_c",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_close_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealInput {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "value_c", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(rename = "stage_c", default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    #[serde(
        rename = "expected_close_date_c",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_close_date: Option<String>,
}

impl Entity for Deal {
    type Input = DealInput;

    const TABLE: &'static str = "deal_c";
    const LABEL: &'static str = "deals";
    const NOUN: &'static str = "Deal";
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "value_c",
        "stage_c",
        "contact_id_c",
        "expected_close_date_c",
        "CreatedOn",
        "ModifiedOn",
    ];

    fn id(&self) -> i64 {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 4] = [
        QuoteStatus::Draft,
        QuoteStatus::Sent,
        QuoteStatus::Accepted,
        QuoteStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuoteStatus::Draft => "Draft",
            QuoteStatus::Sent => "Sent",
            QuoteStatus::Accepted => "Accepted",
            QuoteStatus::Rejected => "Rejected",
        }
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ValidationError::new("status_c", format!("Unknown quote status '{s}'"))
            })
    }
}

/// One postal address block on a quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Tags", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(rename = "company_c", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Label>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Reference>,
    #[serde(rename = "deal_id_c", default, skip_serializing_if = "Option::is_none")]
    pub deal: Option<Reference>,
    #[serde(rename = "quote_date_c", default, skip_serializing_if = "Option::is_none")]
    pub quote_date: Option<String>,
    #[serde(rename = "status_c", default)]
    pub status: QuoteStatus,
    #[serde(rename = "delivery_method_c", default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<String>,
    #[serde(rename = "expires_on_c", default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<String>,
    #[serde(rename = "billing_name_c", default, skip_serializing_if = "Option::is_none")]
    pub billing_name: Option<String>,
    #[serde(rename = "billing_street_c", default, skip_serializing_if = "Option::is_none")]
    pub billing_street: Option<String>,
    #[serde(rename = "billing_city_c", default, skip_serializing_if = "Option::is_none")]
    pub billing_city: Option<String>,
    #[serde(rename = "billing_state_c", default, skip_serializing_if = "Option::is_none")]
    pub billing_state: Option<String>,
    #[serde(rename = "billing_country_c", default, skip_serializing_if = "Option::is_none")]
    pub billing_country: Option<String>,
    #[serde(rename = "billing_pincode_c", default, skip_serializing_if = "Option::is_none")]
    pub billing_pincode: Option<String>,
    #[serde(rename = "shipping_name_c", default, skip_serializing_if = "Option::is_none")]
    pub shipping_name: Option<String>,
    #[serde(rename = "shipping_street_c", default, skip_serializing_if = "Option::is_none")]
    pub shipping_street: Option<String>,
    #[serde(rename = "shipping_city_c", default, skip_serializing_if = "Option::is_none")]
    pub shipping_city: Option<String>,
    #[serde(rename = "shipping_state_c", default, skip_serializing_if = "Option::is_none")]
    pub shipping_state: Option<String>,
    #[serde(rename = "shipping_country_c", default, skip_serializing_if = "Option::is_none")]
    pub shipping_country: Option<String>,
    #[serde(rename = "shipping_pincode_c", default, skip_serializing_if = "Option::is_none")]
    pub shipping_pincode: Option<String>,
    #[serde(rename = "Owner", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Reference>,
    #[serde(rename = "CreatedOn", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(rename = "ModifiedOn", default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
}

/// Updateable quote fields. Empty strings are dropped before sending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteInput {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Tags", default, skip_serializing_if = "is_blank")]
    pub tags: Option<String>,
    #[serde(rename = "company_c", default, skip_serializing_if = "is_blank")]
    pub company: Option<String>,
    #[serde(rename = "contact_id_c", default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    #[serde(rename = "deal_id_c", default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<i64>,
    #[serde(rename = "quote_date_c", default, skip_serializing_if = "is_blank")]
    pub quote_date: Option<String>,
    #[serde(rename = "status_c", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuoteStatus>,
    #[serde(rename = "delivery_method_c", default, skip_serializing_if = "is_blank")]
    pub delivery_method: Option<String>,
    #[serde(rename = "expires_on_c", default, skip_serializing_if = "is_blank")]
    pub expires_on: Option<String>,
    #[serde(rename = "billing_name_c", default, skip_serializing_if = "is_blank")]
    pub billing_name: Option<String>,
    #[serde(rename = "billing_street_c", default, skip_serializing_if = "is_blank")]
    pub billing_street: Option<String>,
    #[serde(rename = "billing_city_c", default, skip_serializing_if = "is_blank")]
    pub billing_city: Option<String>,
    #[serde(rename = "billing_state_c", default, skip_serializing_if = "is_blank")]
    pub billing_state: Option<String>,
    #[serde(rename = "billing_country_c", default, skip_serializing_if = "is_blank")]
    pub billing_country: Option<String>,
    #[serde(rename = "billing_pincode_c", default, skip_serializing_if = "is_blank")]
    pub billing_pincode: Option<String>,
    #[serde(rename = "shipping_name_c", default, skip_serializing_if = "is_blank")]
    pub shipping_name: Option<String>,
    #[serde(rename = "shipping_street_c", default, skip_serializing_if = "is_blank")]
    pub shipping_street: Option<String>,
    #[serde(rename = "shipping_city_c", default, skip_serializing_if = "is_blank")]
    pub shipping_city: Option<String>,
    #[serde(rename = "shipping_state_c", default, skip_serializing_if = "is_blank")]
    pub shipping_state: Option<String>,
    #[serde(rename = "shipping_country_c", default, skip_serializing_if = "is_blank")]
    pub shipping_country: Option<String>,
    #[serde(rename = "shipping_pincode_c", default, skip_serializing_if = "is_blank")]
    pub shipping_pincode: Option<String>,
}

impl QuoteInput {
    /// A fresh draft dated today, as the quote form starts out.
    pub fn draft(name: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            name: name.into(),
            quote_date: Some(today.format("%Y-%m-%d").to_string()),
            status: Some(QuoteStatus::Draft),
            ..Self::default()
        }
    }

    pub fn billing(&self) -> Address {
        Address {
            name: self.billing_name.clone(),
            street: self.billing_street.clone(),
            city: self.billing_city.clone(),
            state: self.billing_state.clone(),
            country: self.billing_country.clone(),
            pincode: self.billing_pincode.clone(),
        }
    }

    pub fn copy_billing_to_shipping(&mut self) {
        let Address {
            name,
            street,
            city,
            state,
            country,
            pincode,
        } = self.billing();
        self.shipping_name = name;
        self.shipping_street = street;
        self.shipping_city = city;
        self.shipping_state = state;
        self.shipping_country = country;
        self.shipping_pincode = pincode;
    }
}

impl From<&Quote> for QuoteInput {
    fn from(quote: &Quote) -> Self {
        Self {
            name: quote.name.clone(),
            tags: quote.tags.clone(),
            company: quote.company.as_ref().map(|c| c.as_str().to_string()),
            contact_id: quote.contact.as_ref().map(Reference::id),
            deal_id: quote.deal.as_ref().map(Reference::id),
            quote_date: quote.quote_date.clone(),
            status: Some(quote.status),
            delivery_method: quote.delivery_method.clone(),
            expires_on: quote.expires_on.clone(),
            billing_name: quote.billing_name.clone(),
            billing_street: quote.billing_street.clone(),
            billing_city: quote.billing_city.clone(),
            billing_state: quote.billing_state.clone(),
            billing_country: quote.billing_country.clone(),
            billing_pincode: quote.billing_pincode.clone(),
            shipping_name: quote.shipping_name.clone(),
            shipping_street: quote.shipping_street.clone(),
            shipping_city: quote.shipping_city.clone(),
            shipping_state: quote.shipping_state.clone(),
            shipping_country: quote.shipping_country.clone(),
            shipping_pincode: quote.shipping_pincode.clone(),
        }
    }
}

impl Entity for Quote {
    type Input = QuoteInput;

    const TABLE: &'static str = "quote_c";
    const LABEL: &'static str = "quotes";
    const NOUN: &'static str = "Quote";
    const ANNOUNCE_WRITES: bool = true;
    const FIELDS: &'static [&'static str] = &[
        "Id",
        "Name",
        "Tags",
        "Owner",
        "CreatedOn",
        "CreatedBy",
        "ModifiedOn",
        "ModifiedBy",
        "company_c",
        "contact_id_c",
        "deal_id_c",
        "quote_date_c",
        "status_c",
        "delivery_method_c",
        "expires_on_c",
        "billing_name_c",
        "billing_street_c",
        "billing_city_c",
        "billing_state_c",
        "billing_country_c",
        "billing_pincode_c",
        "shipping_name_c",
        "shipping_street_c",
        "shipping_city_c",
        "shipping_state_c",
        "shipping_country_c",
        "shipping_pincode_c",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn default_order() -> Vec<OrderBy> {
        vec![OrderBy::desc("ModifiedOn")]
    }

    fn default_paging() -> Option<PagingInfo> {
        Some(PagingInfo {
            limit: 50,
            offset: 0,
        })
    }

    fn validate(input: &QuoteInput) -> Result<(), ValidationError> {
        if input.name.trim().is_empty() {
            return Err(ValidationError::new("Name", "Quote name is required"));
        }
        if is_blank(&input.quote_date) {
            return Err(ValidationError::new(
                "quote_date_c",
                "Quote date is required",
            ));
        }
        if input.status.is_none() {
            return Err(ValidationError::new("status_c", "Status is required"));
        }
        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Date handling
// ---------------------------------------------------------------------------

/// Parse a due date into the instant it falls due. A plain `YYYY-MM-DD` is
/// due at local midnight; RFC 3339 and naive date-times keep their time.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Local>, DateParseError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(local_from_naive(date.and_time(NaiveTime::MIN)));
    }
    parse_timestamp(raw).map_err(|_| DateParseError {
        kind: "due date",
        value: raw.to_string(),
    })
}

/// Parse a timestamp into local time. Naive values are read as local wall time.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Local>, DateParseError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| DateParseError {
            kind: "timestamp",
            value: raw.to_string(),
        })?;
    Ok(local_from_naive(naive))
}

/// Resolve a local wall-clock time, taking the earlier instant across a DST
/// overlap and falling back to UTC inside a gap.
pub fn local_from_naive(naive: NaiveDateTime) -> DateTime<Local> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_due_date(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Missing, null, blank or unreadable timestamps all decode to `None` so one
/// bad row does not fail a whole fetch.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| parse_timestamp(value).ok()))
}
