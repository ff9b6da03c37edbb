mod job_store;
mod lookup_provider;

pub use job_store::{JobStore, StoreError};
pub use lookup_provider::{LookupProvider, ProviderError};
