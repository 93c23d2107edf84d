pub mod alerts;
pub mod config;
pub mod error;
pub mod notify;
pub mod services;
pub mod table;

#[cfg(test)]
mod testing;

pub use alerts::AlertService;
pub use config::{ClientConfig, ConfigOverrides};
pub use error::{AlertError, ConfigError, ServiceError};
pub use notify::{NoticeLevel, Notifier, TracingNotifier};
pub use services::{EntityService, Query, QuoteFilters, Services};
pub use table::{HttpTableClient, TableApi};
