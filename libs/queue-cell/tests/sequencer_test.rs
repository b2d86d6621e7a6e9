use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use async_trait::async_trait;
use booking_cell::{
    Booking, BookingError, BookingQuery, BookingRepository, BookingService, BookingStatus, CreateBookingRequest,
    InMemoryBookingRepository,
};
use branch_cell::{
    BranchError, BranchService, CreateBranchRequest, CreateServiceRequest, DayOfWeek, InMemoryBranchDirectory,
    WeeklySchedule,
};
use queue_cell::*;
use shared_database::TransactionGate;
use shared_utils::clock::FixedClock;
use shared_utils::test_utils::monday_at;

struct Fixture {
    queue: Arc<QueueSequencer>,
    bookings: Arc<BookingService>,
    branches: BranchService,
    clock: Arc<FixedClock>,
    branch_id: Uuid,
    service_id: Uuid,
}

async fn setup() -> Fixture {
    setup_with_bookings(Arc::new(InMemoryBookingRepository::new())).await
}

async fn setup_with_bookings(booking_store: Arc<dyn BookingRepository>) -> Fixture {
    let clock = Arc::new(FixedClock::new(monday_at(9, 30)));
    let directory = Arc::new(InMemoryBranchDirectory::new());

    let branches = BranchService::new(directory.clone(), clock.clone());
    let branch = branches
        .create_branch(CreateBranchRequest {
            city: "Bishkek".to_string(),
            address: "Manas 12".to_string(),
            description: String::new(),
            schedules: vec![WeeklySchedule::new(
                DayOfWeek::Monday,
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            )],
        })
        .await
        .unwrap();
    let service = branches
        .create_service(CreateServiceRequest { name: "Transfers".to_string() })
        .await
        .unwrap();

    let bookings = Arc::new(BookingService::new(
        booking_store,
        directory.clone(),
        Arc::new(TransactionGate::new()),
        clock.clone(),
        5,
    ));
    let queue = Arc::new(QueueSequencer::new(
        Arc::new(InMemoryTicketRepository::new()),
        bookings.clone(),
        directory,
        clock.clone(),
    ));

    Fixture {
        queue,
        bookings,
        branches,
        clock,
        branch_id: branch.id,
        service_id: service.id,
    }
}

/// Booking store that refuses to record completions.
#[derive(Default)]
struct CompletionRejectingStore {
    inner: InMemoryBookingRepository,
}

#[async_trait]
impl BookingRepository for CompletionRejectingStore {
    async fn insert(&self, booking: Booking) -> Result<Booking, BookingError> {
        self.inner.insert(booking).await
    }

    async fn update(&self, booking: Booking) -> Result<Booking, BookingError> {
        if booking.status == BookingStatus::Completed {
            return Err(BookingError::StorageError("write rejected".to_string()));
        }
        self.inner.update(booking).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BookingError> {
        self.inner.get(id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Booking>, BookingError> {
        self.inner.find_by_code(code).await
    }

    async fn code_exists(&self, code: &str) -> Result<bool, BookingError> {
        self.inner.code_exists(code).await
    }

    async fn find_waiting_in_slot(
        &self,
        branch_id: Uuid,
        service_id: Uuid,
        meeting_time: NaiveDateTime,
    ) -> Result<Vec<Booking>, BookingError> {
        self.inner.find_waiting_in_slot(branch_id, service_id, meeting_time).await
    }

    async fn list(&self, query: &BookingQuery) -> Result<Vec<Booking>, BookingError> {
        self.inner.list(query).await
    }

    async fn detach_user(&self, user_id: Uuid, now: NaiveDateTime) -> Result<usize, BookingError> {
        self.inner.detach_user(user_id, now).await
    }
}

impl Fixture {
    async fn walk_in(&self) -> QueueTicket {
        self.queue
            .enqueue_walk_in(self.branch_id, self.service_id, None)
            .await
            .unwrap()
    }

    async fn book(&self, hour: u32, requester: Uuid) -> Booking {
        self.bookings
            .create(
                CreateBookingRequest {
                    branch_id: self.branch_id,
                    service_id: self.service_id,
                    meeting_time: monday_at(hour, 0),
                    display_name: "Dinara Ismailova".to_string(),
                },
                requester,
            )
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_walk_ins_then_booking_share_numbering() {
    let fixture = setup().await;

    let slugs: Vec<String> = vec![
        fixture.walk_in().await.slug(),
        fixture.walk_in().await.slug(),
        fixture.walk_in().await.slug(),
    ];
    assert_eq!(slugs, vec!["S1", "S2", "S3"]);

    let requester = Uuid::new_v4();
    let booking = fixture.book(11, requester).await;
    let ticket = fixture.queue.enqueue_from_booking(&booking.lookup_code).await.unwrap();

    assert_eq!(ticket.value, 4);
    assert_eq!(ticket.slug(), "R4");
    assert_eq!(ticket.kind, TicketKind::FromBooking);
    assert_eq!(ticket.user_id, Some(requester));
    assert_eq!(ticket.booking_id, Some(booking.id));
    assert_eq!(fixture.bookings.get(booking.id).await.unwrap().status, BookingStatus::Completed);
}

#[tokio::test]
async fn test_booking_converts_only_once() {
    let fixture = setup().await;
    let booking = fixture.book(10, Uuid::new_v4()).await;

    fixture.queue.enqueue_from_booking(&booking.lookup_code).await.unwrap();
    assert_matches!(
        fixture.queue.enqueue_from_booking(&booking.lookup_code).await,
        Err(QueueError::BookingNotFound(_))
    );
}

#[tokio::test]
async fn test_canceled_booking_cannot_check_in() {
    let fixture = setup().await;
    let booking = fixture.book(10, Uuid::new_v4()).await;
    fixture.bookings.cancel(booking.id).await.unwrap();

    assert_matches!(
        fixture.queue.enqueue_from_booking(&booking.lookup_code).await,
        Err(QueueError::BookingNotFound(_))
    );
    assert!(fixture.queue.list_today(&TicketQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_code_is_booking_not_found() {
    let fixture = setup().await;

    assert_matches!(
        fixture.queue.enqueue_from_booking("9999999999").await,
        Err(QueueError::BookingNotFound(_))
    );
}

#[tokio::test]
async fn test_pull_next_on_empty_queue() {
    let fixture = setup().await;

    assert!(fixture.queue.pull_next(None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pull_next_takes_lowest_value_first() {
    let fixture = setup().await;
    let first = fixture.walk_in().await;
    let second = fixture.walk_in().await;
    let third = fixture.walk_in().await;

    // A pool holding only values 3 and 1
    let repository = InMemoryTicketRepository::new();
    repository.insert(third.clone()).await.unwrap();
    repository.insert(first.clone()).await.unwrap();
    let pulled = repository
        .take_next_waiting(first.service_date, None, monday_at(9, 45))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pulled.value, 1);
    assert_eq!(pulled.status, TicketStatus::InProgress);

    let pulled = fixture.queue.pull_next(None).await.unwrap().unwrap();
    assert_eq!(pulled.id, first.id);
    let pulled = fixture.queue.pull_next(None).await.unwrap().unwrap();
    assert_eq!(pulled.id, second.id);
    let pulled = fixture.queue.pull_next(None).await.unwrap().unwrap();
    assert_eq!(pulled.id, third.id);
    assert!(fixture.queue.pull_next(None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pull_next_filters_by_branch() {
    let fixture = setup().await;
    let other_branch = fixture
        .branches
        .create_branch(CreateBranchRequest {
            city: "Osh".to_string(),
            address: "Kurmanjan Datka 3".to_string(),
            description: String::new(),
            schedules: vec![],
        })
        .await
        .unwrap();

    fixture.walk_in().await;
    let elsewhere = fixture
        .queue
        .enqueue_walk_in(other_branch.id, fixture.service_id, None)
        .await
        .unwrap();

    let pulled = fixture.queue.pull_next(Some(other_branch.id)).await.unwrap().unwrap();
    assert_eq!(pulled.id, elsewhere.id);
    assert_eq!(pulled.value, 2);
    assert!(fixture.queue.pull_next(Some(other_branch.id)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_teller_pulls_from_assigned_branch() {
    let fixture = setup().await;
    let other_branch = fixture
        .branches
        .create_branch(CreateBranchRequest {
            city: "Osh".to_string(),
            address: "Kurmanjan Datka 3".to_string(),
            description: String::new(),
            schedules: vec![],
        })
        .await
        .unwrap();
    let teller = Uuid::new_v4();
    fixture.branches.assign_staff(other_branch.id, teller).await.unwrap();

    let here = fixture.walk_in().await;
    let elsewhere = fixture
        .queue
        .enqueue_walk_in(other_branch.id, fixture.service_id, None)
        .await
        .unwrap();

    let pulled = fixture.queue.pull_next_for(teller, None).await.unwrap().unwrap();
    assert_eq!(pulled.id, elsewhere.id);
    assert!(fixture.queue.pull_next_for(teller, None).await.unwrap().is_none());

    // An explicit branch wins over the assignment
    let pulled = fixture.queue.pull_next_for(teller, Some(fixture.branch_id)).await.unwrap().unwrap();
    assert_eq!(pulled.id, here.id);
}

#[tokio::test]
async fn test_unassigned_teller_serves_whole_pool() {
    let fixture = setup().await;
    let first = fixture.walk_in().await;

    let pulled = fixture.queue.pull_next_for(Uuid::new_v4(), None).await.unwrap().unwrap();
    assert_eq!(pulled.id, first.id);
}

#[tokio::test]
async fn test_complete_requires_in_progress() {
    let fixture = setup().await;
    let ticket = fixture.walk_in().await;

    assert_matches!(
        fixture.queue.complete(ticket.id).await,
        Err(QueueError::InvalidState { from: TicketStatus::Waiting, to: TicketStatus::Completed })
    );

    fixture.queue.pull_next(None).await.unwrap();
    let completed = fixture.queue.complete(ticket.id).await.unwrap();
    assert_eq!(completed.status, TicketStatus::Completed);

    assert_matches!(
        fixture.queue.complete(ticket.id).await,
        Err(QueueError::InvalidState { from: TicketStatus::Completed, .. })
    );
}

#[tokio::test]
async fn test_unknown_ticket() {
    let fixture = setup().await;

    assert_matches!(fixture.queue.get(Uuid::new_v4()).await, Err(QueueError::TicketNotFound(_)));
    assert_matches!(fixture.queue.complete(Uuid::new_v4()).await, Err(QueueError::TicketNotFound(_)));
}

#[tokio::test]
async fn test_numbering_restarts_next_day() {
    let fixture = setup().await;
    fixture.walk_in().await;
    fixture.walk_in().await;

    fixture.clock.advance(Duration::days(1));
    let ticket = fixture.walk_in().await;

    assert_eq!(ticket.value, 1);
    assert_eq!(ticket.service_date, monday_at(0, 0).date() + Duration::days(1));
    assert_eq!(fixture.queue.list_today(&TicketQuery::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_yesterdays_tickets_are_not_pulled() {
    let fixture = setup().await;
    fixture.walk_in().await;

    fixture.clock.advance(Duration::days(1));
    assert!(fixture.queue.pull_next(None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_walk_ins_get_distinct_values() {
    let fixture = setup().await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let queue = fixture.queue.clone();
            let (branch_id, service_id) = (fixture.branch_id, fixture.service_id);
            tokio::spawn(async move { queue.enqueue_walk_in(branch_id, service_id, None).await })
        })
        .collect();

    let mut values: Vec<u32> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|result| result.unwrap().unwrap().value)
        .collect();
    values.sort_unstable();

    assert_eq!(values, (1..=20).collect::<Vec<u32>>());
}

#[tokio::test]
async fn test_walk_in_for_unknown_branch() {
    let fixture = setup().await;

    assert_matches!(
        fixture.queue.enqueue_walk_in(Uuid::new_v4(), fixture.service_id, None).await,
        Err(QueueError::Branch(BranchError::NotFound(_)))
    );
}

#[tokio::test]
async fn test_list_today_filters_and_views() {
    let fixture = setup().await;
    fixture.walk_in().await;
    fixture.walk_in().await;
    fixture.queue.pull_next(None).await.unwrap();

    let waiting = fixture
        .queue
        .list_today(&TicketQuery {
            branch_id: None,
            status: Some(TicketStatus::Waiting),
        })
        .await
        .unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].value, 2);

    let views = fixture.queue.views(waiting).await.unwrap();
    assert_eq!(views[0].slug, "S2");
    assert_eq!(views[0].service.name, "Transfers");
    assert!(views[0].branch.is_open);
}

#[tokio::test]
async fn test_detach_user_from_tickets() {
    let fixture = setup().await;
    let user = Uuid::new_v4();
    let ticket = fixture
        .queue
        .enqueue_walk_in(fixture.branch_id, fixture.service_id, Some(user))
        .await
        .unwrap();

    assert_eq!(fixture.queue.detach_user(user).await.unwrap(), 1);
    assert_eq!(fixture.queue.get(ticket.id).await.unwrap().user_id, None);
}

#[tokio::test]
async fn test_failed_check_in_withdraws_ticket() {
    let fixture = setup_with_bookings(Arc::new(CompletionRejectingStore::default())).await;
    let booking = fixture.book(10, Uuid::new_v4()).await;

    assert_matches!(
        fixture.queue.enqueue_from_booking(&booking.lookup_code).await,
        Err(QueueError::Booking(BookingError::StorageError(_)))
    );

    assert!(fixture.queue.list_today(&TicketQuery::default()).await.unwrap().is_empty());
    assert!(fixture.queue.pull_next(None).await.unwrap().is_none());
    assert_eq!(fixture.bookings.get(booking.id).await.unwrap().status, BookingStatus::Waiting);

    // The withdrawn number is handed out again
    assert_eq!(fixture.walk_in().await.value, 1);
}
