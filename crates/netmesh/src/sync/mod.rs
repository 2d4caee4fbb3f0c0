mod adapter;
mod identity;
mod observer;
mod registry;
mod spawn_queue;

pub use adapter::{ConnectionAdapter, SyncStats};
pub use identity::IdentityStore;
pub use observer::{Observers, SubscriptionId};
pub use registry::{Registry, RegistryEvent, RemoteEntity, TransformOutcome, TransformTarget};
pub use spawn_queue::{SpawnPolicy, SpawnQueue};
