pub mod common;

pub mod vendor_client;
