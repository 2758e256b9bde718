pub mod credential;
pub mod credential_cache;
pub mod provider;
pub mod redis_store;
pub mod store;
