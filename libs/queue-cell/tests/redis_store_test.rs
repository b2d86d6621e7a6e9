//! Runs against a live Redis. Set REDIS_TEST_URL and use `cargo test -- --ignored`.
use chrono::NaiveDate;
use redis::AsyncCommands;
use uuid::Uuid;

use queue_cell::*;
use shared_database::RedisPool;

struct RedisFixture {
    pool: RedisPool,
    store: RedisTicketRepository,
}

impl RedisFixture {
    async fn new() -> Self {
        let redis_url = std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let prefix = format!("test_{}:", Uuid::new_v4().simple());
        let pool = RedisPool::connect_url(&redis_url, &prefix).await.unwrap();
        Self {
            store: RedisTicketRepository::new(pool.clone()),
            pool,
        }
    }

    async fn cleanup(&self) {
        let mut conn = self.pool.connection().await.unwrap();
        let keys: Vec<String> = conn.keys(format!("{}*", self.pool.key_prefix())).await.unwrap();
        if !keys.is_empty() {
            let _: () = conn.del(keys).await.unwrap();
        }
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

async fn issue(store: &RedisTicketRepository, branch_id: Uuid, kind: TicketKind) -> QueueTicket {
    let value = store.allocate_value(day()).await.unwrap();
    let at = day().and_hms_opt(9, 0, 0).unwrap();
    store
        .insert(QueueTicket {
            id: Uuid::new_v4(),
            branch_id,
            service_id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            value,
            kind,
            status: TicketStatus::Waiting,
            service_date: day(),
            booking_id: None,
            created_at: at,
            updated_at: at,
        })
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn test_redis_numbering_and_pull_order() {
    let fixture = RedisFixture::new().await;
    let branch = Uuid::new_v4();

    let first = issue(&fixture.store, branch, TicketKind::WalkIn).await;
    let second = issue(&fixture.store, branch, TicketKind::FromBooking).await;
    assert_eq!(first.slug(), "S1");
    assert_eq!(second.slug(), "R2");

    let now = day().and_hms_opt(9, 5, 0).unwrap();
    let pulled = fixture.store.take_next_waiting(day(), None, now).await.unwrap().unwrap();
    assert_eq!(pulled.id, first.id);
    assert_eq!(pulled.status, TicketStatus::InProgress);
    assert_eq!(fixture.store.get(first.id).await.unwrap().unwrap().status, TicketStatus::InProgress);

    let pulled = fixture.store.take_next_waiting(day(), None, now).await.unwrap().unwrap();
    assert_eq!(pulled.id, second.id);
    assert!(fixture.store.take_next_waiting(day(), None, now).await.unwrap().is_none());

    fixture.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_redis_branch_filtered_pull() {
    let fixture = RedisFixture::new().await;
    let here = Uuid::new_v4();
    let there = Uuid::new_v4();

    issue(&fixture.store, here, TicketKind::WalkIn).await;
    let theirs = issue(&fixture.store, there, TicketKind::WalkIn).await;

    let now = day().and_hms_opt(9, 5, 0).unwrap();
    let pulled = fixture.store.take_next_waiting(day(), Some(there), now).await.unwrap().unwrap();
    assert_eq!(pulled.id, theirs.id);
    assert!(fixture.store.take_next_waiting(day(), Some(there), now).await.unwrap().is_none());

    let listed = fixture
        .store
        .list(day(), &TicketQuery { branch_id: None, status: Some(TicketStatus::Waiting) })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].branch_id, here);

    fixture.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_redis_detach_user() {
    let fixture = RedisFixture::new().await;
    let ticket = issue(&fixture.store, Uuid::new_v4(), TicketKind::WalkIn).await;
    let user = ticket.user_id.unwrap();

    let now = day().and_hms_opt(12, 0, 0).unwrap();
    assert_eq!(fixture.store.detach_user(user, now).await.unwrap(), 1);
    assert_eq!(fixture.store.get(ticket.id).await.unwrap().unwrap().user_id, None);

    fixture.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_redis_claim_keeps_member_when_body_missing() {
    let fixture = RedisFixture::new().await;
    let ticket = issue(&fixture.store, Uuid::new_v4(), TicketKind::WalkIn).await;

    let mut conn = fixture.pool.connection().await.unwrap();
    let _: () = conn.del(fixture.pool.key(&format!("queue_ticket:{}", ticket.id))).await.unwrap();

    let now = day().and_hms_opt(9, 5, 0).unwrap();
    assert!(fixture.store.take_next_waiting(day(), None, now).await.is_err());

    let waiting: usize = conn.zcard(fixture.pool.key(&format!("queue_waiting:{}", day()))).await.unwrap();
    assert_eq!(waiting, 1);

    fixture.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_redis_claimed_ticket_is_stored_in_progress() {
    let fixture = RedisFixture::new().await;
    let branch = Uuid::new_v4();
    let ticket = issue(&fixture.store, branch, TicketKind::WalkIn).await;

    let now = day().and_hms_opt(9, 5, 0).unwrap();
    fixture.store.take_next_waiting(day(), Some(branch), now).await.unwrap().unwrap();

    let stored = fixture.store.get(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::InProgress);
    assert_eq!(stored.updated_at, now);
    assert_eq!(stored.value, ticket.value);

    let listed = fixture
        .store
        .list(day(), &TicketQuery { branch_id: Some(branch), status: Some(TicketStatus::Waiting) })
        .await
        .unwrap();
    assert!(listed.is_empty());

    fixture.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_redis_day_keys_expire() {
    let fixture = RedisFixture::new().await;
    let ticket = issue(&fixture.store, Uuid::new_v4(), TicketKind::WalkIn).await;
    let user = ticket.user_id.unwrap();

    let mut conn = fixture.pool.connection().await.unwrap();
    for key in [
        format!("queue_ticket:{}", ticket.id),
        format!("queue_counter:{}", day()),
        format!("queue_day:{}", day()),
        format!("queue_waiting:{}", day()),
        format!("queue_user:{}", user),
    ] {
        let ttl: i64 = conn.ttl(fixture.pool.key(&key)).await.unwrap();
        assert!(ttl > 0, "{} has no expiry", key);
    }

    // Rewriting the ticket keeps its expiry
    let mut completed = ticket.clone();
    completed.status = TicketStatus::Completed;
    fixture.store.update(completed).await.unwrap();
    let ttl: i64 = conn.ttl(fixture.pool.key(&format!("queue_ticket:{}", ticket.id))).await.unwrap();
    assert!(ttl > 0);

    fixture.cleanup().await;
}
