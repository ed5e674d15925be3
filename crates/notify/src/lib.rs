//! Customer messaging - template-based phone notifications
//!
//! This crate is the outbound messaging seam for coverdesk:
//! - **Phone normalization** (`phone`) - E.164 handling, default country
//!   code 973 for 8-digit local numbers
//! - **Templates** (`templates`) - message bodies for payment links,
//!   approval decisions, and renewal reminders
//! - **Transport** (`transport`) - the delivery trait, an HTTP client for a
//!   template-messaging API, and a latency-simulating mock
//! - **Notifier** (`notifier`) - render + normalize + send, with every
//!   failure surfaced as a typed error
//!
//! Delivery failures are returned to the caller. Nothing in this crate
//! swallows an error; deciding what a failed notification means is workflow
//! business, not transport business.

pub mod notifier;
pub mod phone;
pub mod templates;
pub mod transport;

pub use notifier::{Notifier, NotifyError};
pub use phone::{normalize, PhoneError, E164};
pub use templates::MessageTemplates;
pub use transport::{HttpMessageTransport, MessageId, MessageTransport, MockTransport, TransportError};
