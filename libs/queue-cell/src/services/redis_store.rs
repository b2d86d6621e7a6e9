use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use deadpool_redis::Connection;
use redis::{AsyncCommands, Script};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::RedisPool;

use crate::error::QueueError;
use crate::models::{QueueTicket, TicketQuery, TicketStatus};
use crate::services::repository::TicketRepository;

// Day-scoped keys outlive their day by one more.
const DAY_TTL_SECONDS: u64 = 172_800;

// KEYS[1] waiting zset. ARGV[1] branch prefix ('' for any branch), ARGV[2] ticket
// key prefix, ARGV[3] JSON-encoded `updated_at`.
// Picks the lowest-scored member, rewrites its ticket as in_progress and removes
// it from the zset in one step. Nothing is written when the ticket body is missing.
const CLAIM_NEXT: &str = r#"
local member = false
if ARGV[1] == '' then
    local first = redis.call('ZRANGE', KEYS[1], 0, 0)
    if #first > 0 then member = first[1] end
else
    local members = redis.call('ZRANGE', KEYS[1], 0, -1)
    for _, candidate in ipairs(members) do
        if string.sub(candidate, 1, string.len(ARGV[1])) == ARGV[1] then
            member = candidate
            break
        end
    end
end
if not member then
    return false
end

local ticket_id = string.match(member, ':([^:]+)$')
local ticket_key = ARGV[2] .. ticket_id
local raw = redis.call('GET', ticket_key)
if not raw then
    return redis.error_reply('missing ticket body for ' .. ticket_id)
end

local ticket = cjson.decode(raw)
ticket['status'] = 'in_progress'
ticket['updated_at'] = cjson.decode(ARGV[3])
local encoded = cjson.encode(ticket)

redis.call('ZREM', KEYS[1], member)
redis.call('SET', ticket_key, encoded, 'KEEPTTL')
return encoded
"#;

/// Ticket store shared between API processes.
///
/// Layout (all keys carry the pool prefix):
/// - `queue_ticket:{id}` ticket JSON
/// - `queue_counter:{date}` INCR counter giving the day's ticket numbers
/// - `queue_day:{date}` set of ticket ids issued that day
/// - `queue_waiting:{date}` sorted set of `{branch}:{ticket}` scored by value
/// - `queue_user:{user}` set of ticket ids held by a user
///
/// Every key expires two days after its last ticket was issued.
pub struct RedisTicketRepository {
    pool: RedisPool,
    claim_next: Script,
}

impl RedisTicketRepository {
    pub fn new(pool: RedisPool) -> Self {
        info!("Using Redis ticket store (prefix '{}')", pool.key_prefix());
        Self {
            pool,
            claim_next: Script::new(CLAIM_NEXT),
        }
    }

    fn ticket_key(&self, id: Uuid) -> String {
        self.pool.key(&format!("queue_ticket:{}", id))
    }

    fn counter_key(&self, date: NaiveDate) -> String {
        self.pool.key(&format!("queue_counter:{}", date))
    }

    fn day_key(&self, date: NaiveDate) -> String {
        self.pool.key(&format!("queue_day:{}", date))
    }

    fn waiting_key(&self, date: NaiveDate) -> String {
        self.pool.key(&format!("queue_waiting:{}", date))
    }

    fn user_key(&self, user_id: Uuid) -> String {
        self.pool.key(&format!("queue_user:{}", user_id))
    }

    fn waiting_member(ticket: &QueueTicket) -> String {
        format!("{}:{}", ticket.branch_id, ticket.id)
    }

    async fn load(&self, conn: &mut Connection, id: Uuid) -> Result<Option<QueueTicket>, QueueError> {
        let data: Option<String> = conn.get(self.ticket_key(id)).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, conn: &mut Connection, ticket: &QueueTicket) -> Result<(), QueueError> {
        let json = serde_json::to_string(ticket)?;
        let _: () = redis::cmd("SET")
            .arg(self.ticket_key(ticket.id))
            .arg(json)
            .arg("KEEPTTL")
            .query_async(conn)
            .await?;
        Ok(())
    }

    async fn claim(
        &self,
        conn: &mut Connection,
        date: NaiveDate,
        branch_id: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Option<QueueTicket>, QueueError> {
        let branch_prefix = branch_id.map(|id| format!("{}:", id)).unwrap_or_default();
        let updated_at = serde_json::to_string(&now)?;

        let claimed: Option<String> = self
            .claim_next
            .key(self.waiting_key(date))
            .arg(branch_prefix)
            .arg(self.pool.key("queue_ticket:"))
            .arg(updated_at)
            .invoke_async(conn)
            .await?;

        match claimed {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TicketRepository for RedisTicketRepository {
    async fn allocate_value(&self, date: NaiveDate) -> Result<u32, QueueError> {
        let mut conn = self.pool.connection().await?;
        let key = self.counter_key(date);

        let value: u64 = conn.incr(&key, 1).await?;
        let _: () = redis::cmd("EXPIRE")
            .arg(&key)
            .arg(DAY_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;

        let value = u32::try_from(value)
            .map_err(|_| QueueError::StorageError(format!("Ticket counter overflow for {}", date)))?;
        debug!("Allocated ticket value {} for {}", value, date);
        Ok(value)
    }

    async fn insert(&self, ticket: QueueTicket) -> Result<QueueTicket, QueueError> {
        let mut conn = self.pool.connection().await?;
        let ticket_key = self.ticket_key(ticket.id);

        let exists: bool = conn.exists(&ticket_key).await?;
        if exists {
            return Err(QueueError::StorageError(format!("Ticket {} already exists", ticket.id)));
        }

        let json = serde_json::to_string(&ticket)?;
        let ticket_id = ticket.id.to_string();

        let day_key = self.day_key(ticket.service_date);
        let waiting_key = self.waiting_key(ticket.service_date);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET").arg(&ticket_key).arg(json).arg("EX").arg(DAY_TTL_SECONDS)
            .ignore()
            .sadd(&day_key, &ticket_id)
            .ignore()
            .cmd("EXPIRE").arg(&day_key).arg(DAY_TTL_SECONDS)
            .ignore();
        if ticket.status == TicketStatus::Waiting {
            pipe.zadd(&waiting_key, Self::waiting_member(&ticket), ticket.value)
                .ignore()
                .cmd("EXPIRE").arg(&waiting_key).arg(DAY_TTL_SECONDS)
                .ignore();
        }
        if let Some(user_id) = ticket.user_id {
            let user_key = self.user_key(user_id);
            pipe.sadd(&user_key, &ticket_id)
                .ignore()
                .cmd("EXPIRE").arg(&user_key).arg(DAY_TTL_SECONDS)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        debug!("Stored ticket {} in Redis", ticket.id);
        Ok(ticket)
    }

    async fn update(&self, ticket: QueueTicket) -> Result<QueueTicket, QueueError> {
        let mut conn = self.pool.connection().await?;

        let exists: bool = conn.exists(self.ticket_key(ticket.id)).await?;
        if !exists {
            return Err(QueueError::TicketNotFound(ticket.id.to_string()));
        }

        let json = serde_json::to_string(&ticket)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET").arg(self.ticket_key(ticket.id)).arg(json).arg("KEEPTTL")
            .ignore();
        if ticket.status != TicketStatus::Waiting {
            pipe.zrem(self.waiting_key(ticket.service_date), Self::waiting_member(&ticket))
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(ticket)
    }

    async fn get(&self, id: Uuid) -> Result<Option<QueueTicket>, QueueError> {
        let mut conn = self.pool.connection().await?;
        self.load(&mut conn, id).await
    }

    async fn remove(&self, ticket: &QueueTicket) -> Result<(), QueueError> {
        let mut conn = self.pool.connection().await?;
        let ticket_id = ticket.id.to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(self.ticket_key(ticket.id))
            .ignore()
            .srem(self.day_key(ticket.service_date), &ticket_id)
            .ignore()
            .zrem(self.waiting_key(ticket.service_date), Self::waiting_member(ticket))
            .ignore();
        if let Some(user_id) = ticket.user_id {
            pipe.srem(self.user_key(user_id), &ticket_id).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn take_next_waiting(
        &self,
        date: NaiveDate,
        branch_id: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Option<QueueTicket>, QueueError> {
        let mut conn = self.pool.connection().await?;

        let claimed = self.claim(&mut conn, date, branch_id, now).await?;
        if let Some(ticket) = &claimed {
            debug!("Claimed ticket {} from Redis", ticket.id);
        }
        Ok(claimed)
    }

    async fn list(&self, date: NaiveDate, query: &TicketQuery) -> Result<Vec<QueueTicket>, QueueError> {
        let mut conn = self.pool.connection().await?;
        let ids: Vec<String> = conn.smembers(self.day_key(date)).await?;

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(id) = Uuid::parse_str(&id) else {
                warn!("Skipping malformed ticket id '{}' in day index", id);
                continue;
            };
            if let Some(ticket) = self.load(&mut conn, id).await? {
                if query.matches(&ticket) {
                    found.push(ticket);
                }
            }
        }
        found.sort_by_key(|t| t.value);
        Ok(found)
    }

    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, QueueError> {
        let mut conn = self.pool.connection().await?;
        let user_key = self.user_key(user_id);
        let ids: Vec<String> = conn.smembers(&user_key).await?;

        let mut changed = 0;
        for id in ids {
            let Ok(id) = Uuid::parse_str(&id) else {
                continue;
            };
            if let Some(mut ticket) = self.load(&mut conn, id).await? {
                ticket.user_id = None;
                ticket.updated_at = now;
                self.store(&mut conn, &ticket).await?;
                changed += 1;
            }
        }

        let _: () = conn.del(&user_key).await?;
        Ok(changed)
    }
}
