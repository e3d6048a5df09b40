use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

use crate::model::*;

/// Sort bookings most-recently-starting first. Listings always use this
/// order; id breaks ties deterministically.
fn sort_start_desc(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.span.start.cmp(&a.span.start).then(a.id.cmp(&b.id)));
}

pub struct Users {
    map: DashMap<i64, User>,
    next_id: AtomicI64,
}

impl Users {
    fn new() -> Self {
        Self {
            map: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn observe_id(&self, id: i64) {
        self.next_id.fetch_max(id + 1, Ordering::Relaxed);
    }

    pub fn get(&self, id: i64) -> Option<User> {
        self.map.get(&id).map(|e| e.value().clone())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.map.contains_key(&id)
    }

    /// Email uniqueness check; `exclude` skips the user being updated.
    pub fn email_taken(&self, email: &str, exclude: Option<i64>) -> bool {
        self.map
            .iter()
            .any(|e| e.value().email == email && Some(e.value().id) != exclude)
    }

    pub fn all(&self) -> Vec<User> {
        let mut users: Vec<User> = self.map.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        users
    }
}

pub struct Items {
    map: DashMap<i64, Item>,
    next_id: AtomicI64,
}

impl Items {
    fn new() -> Self {
        Self {
            map: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn observe_id(&self, id: i64) {
        self.next_id.fetch_max(id + 1, Ordering::Relaxed);
    }

    pub fn get(&self, id: i64) -> Option<Item> {
        self.map.get(&id).map(|e| e.value().clone())
    }

    pub fn owned_by(&self, owner_id: i64) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .map
            .iter()
            .filter(|e| e.value().owner_id == owner_id)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|i| i.id);
        items
    }

    pub fn ids_owned_by(&self, owner_id: i64) -> HashSet<i64> {
        self.map
            .iter()
            .filter(|e| e.value().owner_id == owner_id)
            .map(|e| e.value().id)
            .collect()
    }

    /// Case-insensitive substring match on name or description, available
    /// items only. Blank-query handling belongs to the caller.
    pub fn search(&self, text: &str) -> Vec<Item> {
        let needle = text.to_lowercase();
        let mut items: Vec<Item> = self
            .map
            .iter()
            .filter(|e| {
                let item = e.value();
                item.available
                    && (item.name.to_lowercase().contains(&needle)
                        || item.description.to_lowercase().contains(&needle))
            })
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|i| i.id);
        items
    }
}

pub struct Bookings {
    map: DashMap<i64, Booking>,
    next_id: AtomicI64,
}

impl Bookings {
    fn new() -> Self {
        Self {
            map: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn observe_id(&self, id: i64) {
        self.next_id.fetch_max(id + 1, Ordering::Relaxed);
    }

    pub fn get(&self, id: i64) -> Option<Booking> {
        self.map.get(&id).map(|e| e.value().clone())
    }

    /// All bookings requested by `booker_id`, most recently starting first.
    pub fn by_booker(&self, booker_id: i64) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .map
            .iter()
            .filter(|e| e.value().booker_id == booker_id)
            .map(|e| e.value().clone())
            .collect();
        sort_start_desc(&mut bookings);
        bookings
    }

    /// All bookings on any of the given items, most recently starting first.
    pub fn by_item_ids(&self, item_ids: &HashSet<i64>) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .map
            .iter()
            .filter(|e| item_ids.contains(&e.value().item_id))
            .map(|e| e.value().clone())
            .collect();
        sort_start_desc(&mut bookings);
        bookings
    }

    /// All bookings of one item in creation order (ascending id). The
    /// annotation pass depends on this order for its first-match pick.
    pub fn by_item(&self, item_id: i64) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .map
            .iter()
            .filter(|e| e.value().item_id == item_id)
            .map(|e| e.value().clone())
            .collect();
        bookings.sort_by_key(|b| b.id);
        bookings
    }

    /// One booker's history for one item, used by the comment gate.
    pub fn by_item_and_booker(&self, item_id: i64, booker_id: i64) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .map
            .iter()
            .filter(|e| e.value().item_id == item_id && e.value().booker_id == booker_id)
            .map(|e| e.value().clone())
            .collect();
        sort_start_desc(&mut bookings);
        bookings
    }
}

pub struct Comments {
    map: DashMap<i64, Comment>,
    next_id: AtomicI64,
}

impl Comments {
    fn new() -> Self {
        Self {
            map: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn observe_id(&self, id: i64) {
        self.next_id.fetch_max(id + 1, Ordering::Relaxed);
    }

    pub fn by_item(&self, item_id: i64) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self
            .map
            .iter()
            .filter(|e| e.value().item_id == item_id)
            .map(|e| e.value().clone())
            .collect();
        comments.sort_by_key(|c| c.id);
        comments
    }

    pub fn all(&self) -> Vec<Comment> {
        let mut comments: Vec<Comment> = self.map.iter().map(|e| e.value().clone()).collect();
        comments.sort_by_key(|c| c.id);
        comments
    }
}

/// All durable state, one keyed map per entity. Owned by the engine and
/// injected at construction; mutated only through journal-event application
/// so that live operation and replay share one code path.
pub struct Stores {
    pub users: Users,
    pub items: Items,
    pub bookings: Bookings,
    pub comments: Comments,
}

impl Stores {
    pub fn new() -> Self {
        Self {
            users: Users::new(),
            items: Items::new(),
            bookings: Bookings::new(),
            comments: Comments::new(),
        }
    }

    /// Apply one journal event. Id counters advance past every observed id
    /// so assignment never regresses after a replay.
    pub fn apply(&self, event: &Event) {
        match event {
            Event::UserCreated { id, name, email } => {
                self.users.observe_id(*id);
                self.users.map.insert(
                    *id,
                    User {
                        id: *id,
                        name: name.clone(),
                        email: email.clone(),
                    },
                );
            }
            Event::UserUpdated { id, name, email } => {
                if let Some(mut user) = self.users.map.get_mut(id) {
                    if let Some(name) = name {
                        user.name = name.clone();
                    }
                    if let Some(email) = email {
                        user.email = email.clone();
                    }
                }
            }
            Event::UserDeleted { id } => {
                self.users.map.remove(id);
            }
            Event::ItemCreated {
                id,
                owner_id,
                name,
                description,
                available,
            } => {
                self.items.observe_id(*id);
                self.items.map.insert(
                    *id,
                    Item {
                        id: *id,
                        owner_id: *owner_id,
                        name: name.clone(),
                        description: description.clone(),
                        available: *available,
                    },
                );
            }
            Event::ItemUpdated {
                id,
                name,
                description,
                available,
            } => {
                if let Some(mut item) = self.items.map.get_mut(id) {
                    if let Some(name) = name {
                        item.name = name.clone();
                    }
                    if let Some(description) = description {
                        item.description = description.clone();
                    }
                    if let Some(available) = available {
                        item.available = *available;
                    }
                }
            }
            Event::BookingCreated {
                id,
                item_id,
                booker_id,
                span,
            } => {
                self.bookings.observe_id(*id);
                self.bookings.map.insert(
                    *id,
                    Booking {
                        id: *id,
                        item_id: *item_id,
                        booker_id: *booker_id,
                        span: *span,
                        status: BookingStatus::Waiting,
                    },
                );
            }
            Event::BookingDecided { id, approved } => {
                if let Some(mut booking) = self.bookings.map.get_mut(id) {
                    booking.status = if *approved {
                        BookingStatus::Approved
                    } else {
                        BookingStatus::Rejected
                    };
                }
            }
            Event::CommentAdded {
                id,
                item_id,
                author_id,
                text,
                created,
            } => {
                self.comments.observe_id(*id);
                self.comments.map.insert(
                    *id,
                    Comment {
                        id: *id,
                        item_id: *item_id,
                        author_id: *author_id,
                        text: text.clone(),
                        created: *created,
                    },
                );
            }
        }
    }

    /// Minimal event sequence that recreates the current state; the journal
    /// is rewritten to exactly this during compaction.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for user in self.users.all() {
            events.push(Event::UserCreated {
                id: user.id,
                name: user.name,
                email: user.email,
            });
        }
        let mut items: Vec<Item> = self.items.map.iter().map(|e| e.value().clone()).collect();
        items.sort_by_key(|i| i.id);
        for item in items {
            events.push(Event::ItemCreated {
                id: item.id,
                owner_id: item.owner_id,
                name: item.name,
                description: item.description,
                available: item.available,
            });
        }
        let mut bookings: Vec<Booking> =
            self.bookings.map.iter().map(|e| e.value().clone()).collect();
        bookings.sort_by_key(|b| b.id);
        for booking in bookings {
            events.push(Event::BookingCreated {
                id: booking.id,
                item_id: booking.item_id,
                booker_id: booking.booker_id,
                span: booking.span,
            });
            match booking.status {
                BookingStatus::Approved => events.push(Event::BookingDecided {
                    id: booking.id,
                    approved: true,
                }),
                BookingStatus::Rejected => events.push(Event::BookingDecided {
                    id: booking.id,
                    approved: false,
                }),
                BookingStatus::Waiting | BookingStatus::Canceled => {}
            }
        }
        for comment in self.comments.all() {
            events.push(Event::CommentAdded {
                id: comment.id,
                item_id: comment.item_id,
                author_id: comment.author_id,
                text: comment.text,
                created: comment.created,
            });
        }
        events
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}
