// Protocol module: wire events, stored records, and boundary validation

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;

pub use types::{
    AuthorInfo, ChatMessage, LastMessageSummary, MessageId, MessageView, Room, RoomId, SessionId,
    UserId, DEFAULT_HISTORY_LIMIT, DEFAULT_SUMMARY_MAX_CHARS, SUMMARY_ELLIPSIS,
};

pub use messages::{ClientMessage, ServerMessage};

pub use validation::{validate_message_text, TextRejection};
