pub mod alerts;
pub mod error;
pub mod ledger;
pub mod records;
pub mod table;
