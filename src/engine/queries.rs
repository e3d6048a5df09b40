use crate::model::*;

use super::classify::{last_booking, matches_state, next_booking};
use super::conflict::now_ms;
use super::{Engine, EngineError};

impl Engine {
    // ── Users ────────────────────────────────────────────────

    pub fn get_user(&self, id: i64) -> Result<User, EngineError> {
        self.stores
            .users
            .get(id)
            .ok_or(EngineError::UserNotFound(id))
    }

    pub fn list_users(&self) -> Vec<User> {
        self.stores.users.all()
    }

    // ── Items ────────────────────────────────────────────────

    /// Detail view: the item plus its temporal annotations and comments.
    /// Annotations scan the item's bookings in store order against a single
    /// `now`; status is not consulted.
    pub fn item_detail(&self, item_id: i64) -> Result<ItemDetail, EngineError> {
        let item = self
            .stores
            .items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))?;

        let now = now_ms();
        let bookings = self.stores.bookings.by_item(item_id);
        let comments = self
            .stores
            .comments
            .by_item(item_id)
            .into_iter()
            .map(|c| self.comment_view(c))
            .collect();

        Ok(ItemDetail {
            id: item.id,
            owner_id: item.owner_id,
            name: item.name,
            description: item.description,
            available: item.available,
            last_booking: last_booking(&bookings, now),
            next_booking: next_booking(&bookings, now),
            comments,
        })
    }

    pub fn items_by_owner(&self, owner_id: i64) -> Vec<Item> {
        self.stores.items.owned_by(owner_id)
    }

    /// Text search over available items. A blank query matches nothing.
    pub fn search_items(&self, text: &str) -> Result<Vec<Item>, EngineError> {
        if text.len() > crate::limits::MAX_SEARCH_TEXT_LEN {
            return Err(EngineError::LimitExceeded("search text too long"));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.items.search(text))
    }

    // ── Bookings ─────────────────────────────────────────────

    /// Point lookup with the visibility rule: only the booker or the item's
    /// current owner may see a booking.
    pub fn get_booking(&self, booking_id: i64, requester_id: i64) -> Result<BookingView, EngineError> {
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
        if booking.booker_id != requester_id && item.owner_id != requester_id {
            return Err(EngineError::AccessDenied {
                id: booking_id,
                user_id: requester_id,
            });
        }
        Ok(BookingView::from_booking(&booking))
    }

    /// List a user's bookings — as booker or as owner of the booked items —
    /// filtered to a temporal bucket. One `now` is sampled for the whole
    /// listing; results are ordered most recently starting first.
    pub fn list_bookings(
        &self,
        user_id: i64,
        role: BookingRole,
        state: BookingSearchState,
    ) -> Result<Vec<BookingView>, EngineError> {
        if !self.stores.users.contains(user_id) {
            return Err(EngineError::UserNotFound(user_id));
        }

        let bookings = match role {
            BookingRole::Booker => self.stores.bookings.by_booker(user_id),
            BookingRole::Owner => {
                let owned = self.stores.items.ids_owned_by(user_id);
                self.stores.bookings.by_item_ids(&owned)
            }
        };

        let now = now_ms();
        Ok(bookings
            .iter()
            .filter(|b| matches_state(b, state, now))
            .map(BookingView::from_booking)
            .collect())
    }

    fn comment_view(&self, comment: Comment) -> CommentView {
        let author_name = self
            .stores
            .users
            .get(comment.author_id)
            .map(|u| u.name)
            .unwrap_or_default();
        CommentView {
            id: comment.id,
            text: comment.text,
            author_name,
            created: comment.created,
        }
    }
}
