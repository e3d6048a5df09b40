use tracing::debug;

use crate::limits::*;
use crate::model::*;

use super::conflict::{find_overlap, now_ms, validate_span};
use super::{Engine, EngineError};

impl Engine {
    // ── Users ────────────────────────────────────────────────

    pub async fn create_user(&self, name: String, email: String) -> Result<User, EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("user name too long"));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(EngineError::LimitExceeded("email too long"));
        }
        if self.stores.users.email_taken(&email, None) {
            return Err(EngineError::DuplicateEmail(email));
        }

        let id = self.stores.users.assign_id();
        let event = Event::UserCreated {
            id,
            name: name.clone(),
            email: email.clone(),
        };
        self.persist_and_apply(&event).await?;
        debug!("created user {id} ({email})");
        Ok(User { id, name, email })
    }

    pub async fn update_user(
        &self,
        id: i64,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<User, EngineError> {
        if !self.stores.users.contains(id) {
            return Err(EngineError::UserNotFound(id));
        }
        if let Some(ref name) = name
            && name.len() > MAX_NAME_LEN
        {
            return Err(EngineError::LimitExceeded("user name too long"));
        }
        if let Some(ref email) = email {
            if email.len() > MAX_EMAIL_LEN {
                return Err(EngineError::LimitExceeded("email too long"));
            }
            if self.stores.users.email_taken(email, Some(id)) {
                return Err(EngineError::DuplicateEmail(email.clone()));
            }
        }

        let event = Event::UserUpdated { id, name, email };
        self.persist_and_apply(&event).await?;
        debug!("updated user {id}");
        self.stores
            .users
            .get(id)
            .ok_or(EngineError::UserNotFound(id))
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), EngineError> {
        if !self.stores.users.contains(id) {
            return Err(EngineError::UserNotFound(id));
        }
        let event = Event::UserDeleted { id };
        self.persist_and_apply(&event).await?;
        debug!("deleted user {id}");
        Ok(())
    }

    // ── Items ────────────────────────────────────────────────

    pub async fn create_item(
        &self,
        owner_id: i64,
        name: String,
        description: String,
        available: bool,
    ) -> Result<Item, EngineError> {
        if !self.stores.users.contains(owner_id) {
            return Err(EngineError::UserNotFound(owner_id));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("item name too long"));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(EngineError::LimitExceeded("item description too long"));
        }

        let id = self.stores.items.assign_id();
        let event = Event::ItemCreated {
            id,
            owner_id,
            name: name.clone(),
            description: description.clone(),
            available,
        };
        self.persist_and_apply(&event).await?;
        debug!("created item {id} for owner {owner_id}");
        Ok(Item {
            id,
            owner_id,
            name,
            description,
            available,
        })
    }

    /// Partial update; only the item's owner may change it.
    pub async fn update_item(
        &self,
        item_id: i64,
        user_id: i64,
        name: Option<String>,
        description: Option<String>,
        available: Option<bool>,
    ) -> Result<Item, EngineError> {
        let item = self
            .stores
            .items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;
        if item.owner_id != user_id {
            return Err(EngineError::AccessDenied {
                id: item_id,
                user_id,
            });
        }
        if let Some(ref name) = name
            && name.len() > MAX_NAME_LEN
        {
            return Err(EngineError::LimitExceeded("item name too long"));
        }
        if let Some(ref description) = description
            && description.len() > MAX_DESCRIPTION_LEN
        {
            return Err(EngineError::LimitExceeded("item description too long"));
        }

        let event = Event::ItemUpdated {
            id: item_id,
            name,
            description,
            available,
        };
        self.persist_and_apply(&event).await?;
        debug!("updated item {item_id}");
        self.stores
            .items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))
    }

    // ── Bookings ─────────────────────────────────────────────

    /// Create a booking request. The booker and item must exist and the item
    /// must be available; the stored booking starts out `Waiting`.
    pub async fn create_booking(
        &self,
        booker_id: i64,
        item_id: i64,
        span: Span,
    ) -> Result<BookingView, EngineError> {
        validate_span(&span)?;
        if !self.stores.users.contains(booker_id) {
            return Err(EngineError::UserNotFound(booker_id));
        }
        let item = self
            .stores
            .items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;
        if !item.available {
            return Err(EngineError::ItemUnavailable(item_id));
        }
        if self.reject_overlaps {
            let existing = self.stores.bookings.by_item(item_id);
            if let Some(other) = find_overlap(&existing, &span) {
                return Err(EngineError::BookingOverlap { item_id, other });
            }
        }

        let id = self.stores.bookings.assign_id();
        let event = Event::BookingCreated {
            id,
            item_id,
            booker_id,
            span,
        };
        self.persist_and_apply(&event).await?;
        metrics::counter!(crate::observability::BOOKINGS_CREATED_TOTAL).increment(1);
        debug!("booking {id}: item {item_id} requested by user {booker_id}");
        Ok(BookingView {
            id,
            item_id,
            booker_id,
            start: span.start,
            end: span.end,
            status: BookingStatus::Waiting,
        })
    }

    /// Approve or reject a booking. Only the item's current owner may
    /// decide. The prior status is not consulted — re-deciding an already
    /// decided booking overwrites it.
    pub async fn set_approval(
        &self,
        booking_id: i64,
        owner_id: i64,
        approved: bool,
    ) -> Result<BookingView, EngineError> {
        let booking = self
            .stores
            .bookings
            .get(booking_id)
            .ok_or(EngineError::BookingNotFound(booking_id))?;
        let item = self
            .stores
            .items
            .get(booking.item_id)
            .ok_or(EngineError::ItemNotFound(booking.item_id))?;
        if item.owner_id != owner_id {
            return Err(EngineError::AccessDenied {
                id: booking_id,
                user_id: owner_id,
            });
        }

        let event = Event::BookingDecided {
            id: booking_id,
            approved,
        };
        self.persist_and_apply(&event).await?;
        metrics::counter!(crate::observability::BOOKINGS_DECIDED_TOTAL).increment(1);
        debug!("booking {booking_id}: approved={approved} by owner {owner_id}");
        let status = if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        };
        Ok(BookingView {
            status,
            ..BookingView::from_booking(&booking)
        })
    }

    // ── Comments ─────────────────────────────────────────────

    /// Store a comment, gated on the author having a completed booking of
    /// the item.
    pub async fn add_comment(
        &self,
        author_id: i64,
        item_id: i64,
        text: String,
    ) -> Result<CommentView, EngineError> {
        if text.len() > MAX_COMMENT_LEN {
            return Err(EngineError::LimitExceeded("comment too long"));
        }
        let author = self
            .stores
            .users
            .get(author_id)
            .ok_or(EngineError::UserNotFound(author_id))?;
        if self.stores.items.get(item_id).is_none() {
            return Err(EngineError::ItemNotFound(item_id));
        }

        let now = now_ms();
        let history = self.stores.bookings.by_item_and_booker(item_id, author_id);
        if !super::classify::has_completed_booking(&history, now) {
            metrics::counter!(crate::observability::COMMENTS_REJECTED_TOTAL).increment(1);
            return Err(EngineError::CommentRejected { author_id, item_id });
        }

        let id = self.stores.comments.assign_id();
        let event = Event::CommentAdded {
            id,
            item_id,
            author_id,
            text: text.clone(),
            created: now,
        };
        self.persist_and_apply(&event).await?;
        metrics::counter!(crate::observability::COMMENTS_TOTAL).increment(1);
        debug!("comment {id} on item {item_id} by user {author_id}");
        Ok(CommentView {
            id,
            text,
            author_name: author.name,
            created: now,
        })
    }
}
