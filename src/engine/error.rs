#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    UserNotFound(i64),
    ItemNotFound(i64),
    BookingNotFound(i64),
    /// Caller is neither the booker nor the current item owner (reads), or
    /// not the owner (decisions, item updates).
    AccessDenied { id: i64, user_id: i64 },
    /// Booking rejected: the item's availability flag is off.
    ItemUnavailable(i64),
    /// Booking rejected: the requested window overlaps a live booking of the
    /// same item. Only raised when overlap rejection is enabled.
    BookingOverlap { item_id: i64, other: i64 },
    /// Comment rejected: the author has no completed booking of the item.
    CommentRejected { author_id: i64, item_id: i64 },
    DuplicateEmail(String),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UserNotFound(id) => write!(f, "user not found: {id}"),
            EngineError::ItemNotFound(id) => write!(f, "item not found: {id}"),
            EngineError::BookingNotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::AccessDenied { id, user_id } => {
                write!(f, "access to {id} denied for user {user_id}")
            }
            EngineError::ItemUnavailable(id) => {
                write!(f, "item {id} is unavailable for booking")
            }
            EngineError::BookingOverlap { item_id, other } => {
                write!(f, "item {item_id} already booked, conflicts with booking {other}")
            }
            EngineError::CommentRejected { author_id, item_id } => {
                write!(f, "user {author_id} may not comment on item {item_id}")
            }
            EngineError::DuplicateEmail(email) => {
                write!(f, "email already in use: {email}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
