pub mod redis_pool;
pub mod transaction;

pub use redis_pool::{RedisPool, RedisPoolError};
pub use transaction::{Transaction, TransactionGate};
