use serde::{Deserialize, Serialize};

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// A booking window, `end` strictly after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Lifecycle tag of a booking.
///
/// Created `Waiting`; the owner's decision moves it to `Approved` or
/// `Rejected`. `Canceled` is part of the vocabulary but no engine operation
/// currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }
}

/// Temporal bucket selector for booking listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingSearchState {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl BookingSearchState {
    /// Parse the `state` query parameter. An unrecognized value is a
    /// caller-side error, so this returns `None` rather than an engine error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ALL" => Some(Self::All),
            "CURRENT" => Some(Self::Current),
            "PAST" => Some(Self::Past),
            "FUTURE" => Some(Self::Future),
            "WAITING" => Some(Self::Waiting),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Which side of a booking the listing user is on. The same user can be a
/// booker on some bookings and the owner of items booked by others; the role
/// is chosen per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingRole {
    Booker,
    Owner,
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    /// Gates new bookings; flipped by the owner via item update.
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub item_id: i64,
    pub booker_id: i64,
    pub span: Span,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub item_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created: Ms,
}

/// The event types — flat, no nesting. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    UserCreated {
        id: i64,
        name: String,
        email: String,
    },
    UserUpdated {
        id: i64,
        name: Option<String>,
        email: Option<String>,
    },
    UserDeleted {
        id: i64,
    },
    ItemCreated {
        id: i64,
        owner_id: i64,
        name: String,
        description: String,
        available: bool,
    },
    ItemUpdated {
        id: i64,
        name: Option<String>,
        description: Option<String>,
        available: Option<bool>,
    },
    BookingCreated {
        id: i64,
        item_id: i64,
        booker_id: i64,
        span: Span,
    },
    BookingDecided {
        id: i64,
        approved: bool,
    },
    CommentAdded {
        id: i64,
        item_id: i64,
        author_id: i64,
        text: String,
        created: Ms,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingView {
    pub id: i64,
    pub item_id: i64,
    pub booker_id: i64,
    pub start: Ms,
    pub end: Ms,
    pub status: BookingStatus,
}

impl BookingView {
    pub fn from_booking(b: &Booking) -> Self {
        Self {
            id: b.id,
            item_id: b.item_id,
            booker_id: b.booker_id,
            start: b.span.start,
            end: b.span.end,
            status: b.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub created: Ms,
}

/// Item detail projection: the item plus temporal annotations and comments.
/// `last_booking` is the end of a booking straddling `now`; `next_booking`
/// is the start of the nearest future booking. Either may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub last_booking: Option<Ms>,
    pub next_booking: Option<Ms>,
    pub comments: Vec<CommentView>,
}
