pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod jobs;
pub mod llm_client;
pub mod models;
pub mod poller;
pub mod profiles;
pub mod retry;
pub mod routes;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
