pub mod dedup;
pub mod drafting;
pub mod filtering;
pub mod notify;
pub mod pipeline;
pub mod scheduling;
pub mod scoring;
pub mod sources;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod voice;
