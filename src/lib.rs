pub mod activity;
pub mod api;
pub mod config;
pub mod error;
pub mod peer;
pub mod quiz;
pub mod storage;
