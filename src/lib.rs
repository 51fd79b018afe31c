// Event planner client - library root

pub mod api_client;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod services;
pub mod storage;
