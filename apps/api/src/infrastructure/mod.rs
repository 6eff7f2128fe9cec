// Infrastructure layer module
// Contains database adapters and external service integrations
// Follows Hexagonal Architecture

pub mod memory;
pub mod repositories;

pub use memory::InMemoryStore;
pub use repositories::postgres_repositories;
