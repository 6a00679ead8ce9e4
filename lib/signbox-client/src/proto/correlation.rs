use uuid::Uuid;

/// Source of the per-request correlation id sent as `X-SIGNBOX-TRANSACTION-ID`.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait CorrelationIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidCorrelationIdGenerator;

impl CorrelationIdGenerator for UuidCorrelationIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
