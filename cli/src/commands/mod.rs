pub mod activity;
pub mod alerts;
pub mod config;
pub mod crud;
pub mod quote;
