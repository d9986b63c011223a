pub mod task;
pub mod store;
pub mod memory;
pub mod postgres;

pub use task::*;
pub use store::*;
pub use memory::InMemoryTaskStore;
pub use postgres::PostgresTaskStore;
