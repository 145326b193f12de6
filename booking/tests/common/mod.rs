//! Shared fixtures for booking integration tests.

#![allow(dead_code)]

use booking::accounts::SeedAccount;
use booking::{Account, Actor, BookingService, EventDraft, InMemoryAccounts, Money, Role, TicketTypeDraft, UserId};
use chrono::{DateTime, Duration, Utc};
use eventbook_core::environment::Clock;
use eventbook_testing::{ManualClock, init_tracing, test_clock};
use std::sync::Arc;

/// Bearer token seeded for the admin account.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Bearer token seeded for the first regular user.
pub const ALICE_TOKEN: &str = "alice-token";
/// Bearer token seeded for the second regular user.
pub const BOB_TOKEN: &str = "bob-token";

pub struct Fixture {
    pub service: Arc<BookingService>,
    pub accounts: Arc<InMemoryAccounts>,
    pub clock: ManualClock,
    pub admin: Account,
    pub alice: Account,
    pub bob: Account,
}

impl Fixture {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub fn account(name: &str, role: Role) -> Account {
    Account {
        id: UserId::new(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        role,
        banned: false,
        ban_reason: None,
        banned_at: None,
    }
}

pub fn seeded_accounts() -> (InMemoryAccounts, Account, Account, Account) {
    let admin = account("Admin", Role::Admin);
    let alice = account("Alice", Role::User);
    let bob = account("Bob", Role::User);
    let accounts = InMemoryAccounts::from_seed([
        SeedAccount { token: ADMIN_TOKEN.into(), account: admin.clone() },
        SeedAccount { token: ALICE_TOKEN.into(), account: alice.clone() },
        SeedAccount { token: BOB_TOKEN.into(), account: bob.clone() },
    ]);
    (accounts, admin, alice, bob)
}

pub fn fixture() -> Fixture {
    init_tracing();
    let (accounts, admin, alice, bob) = seeded_accounts();
    let accounts = Arc::new(accounts);
    let clock = ManualClock::new(test_clock().now());
    let service = BookingService::in_memory(Arc::new(clock.clone()), accounts.clone());
    Fixture {
        service: Arc::new(service),
        accounts,
        clock,
        admin,
        alice,
        bob,
    }
}

/// A published-on-create draft starting a week after `now`.
pub fn draft(now: DateTime<Utc>, ticket_types: Vec<TicketTypeDraft>) -> EventDraft {
    EventDraft {
        title: "RustConf".into(),
        description: "Talks and workshops".into(),
        category: "tech".into(),
        kind: "conference".into(),
        location: "Portland".into(),
        start_time: now + Duration::days(7),
        end_time: now + Duration::days(7) + Duration::hours(8),
        max_attendees: 500,
        ticket_types,
        is_featured: false,
        publish: true,
    }
}

pub fn tier(available: u32, max_per_user: u32, price_cents: u64) -> TicketTypeDraft {
    TicketTypeDraft::new("General", Money::from_cents(price_cents), available, max_per_user)
}

pub fn actor(account: &Account) -> Actor {
    account.actor()
}
