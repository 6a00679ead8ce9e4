pub mod correlation;
pub mod http_client;
