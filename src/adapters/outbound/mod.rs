mod memory_job_store;
mod nominatim_provider;
mod redis_job_store;

pub use memory_job_store::MemoryJobStore;
pub use nominatim_provider::{NominatimConfig, NominatimProvider};
pub use redis_job_store::RedisJobStore;
