pub mod redis_store;
pub mod repository;
pub mod sequencer;

pub use redis_store::RedisTicketRepository;
pub use repository::{InMemoryTicketRepository, TicketRepository};
pub use sequencer::QueueSequencer;
