//! Database layer
//!
//! [`DocumentStore`] is the seam every service talks to. [`MongoStore`] backs
//! it with MongoDB; [`InMemoryStore`] keeps everything in process.

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
pub mod store;

pub use memory::{InMemoryStore, StoreCollection};
pub use mongo::{IntoIndexes, MongoClient, MongoCollection};
pub use mongo_store::MongoStore;
pub use store::DocumentStore;
