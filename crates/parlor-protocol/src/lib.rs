//! Wire protocol for Parlor.
//!
//! - **Types**: seat/room identifiers, the [`Command`] and [`Event`] sets,
//!   pending-action data, and the client/server envelopes.
//! - **Codec**: the [`Codec`] trait and the default [`JsonCodec`].
//! - **Errors**: [`ProtocolError`].
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEnvelope) → Room (Command)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ActionId, ActionKind, ActionStatus, ClientEnvelope, ClientFrame, Command, Debt, EndReason,
    Event, JoinOptions, PendingAction, Phase, PlayerId, Recipient, Response, RoomId,
    ServerEnvelope, ServerFrame,
};
