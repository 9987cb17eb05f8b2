pub mod blocking;
pub mod connection;
pub mod migrations;
pub mod repositories;

pub use blocking::BlockingBlobStore;
pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    InMemorySessionBlobRepository, RepositoryError, SessionBlobRepository,
    SqlSessionBlobRepository,
};
