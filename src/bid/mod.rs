//! Bid modal: mock card payment, signature capture, ratification.

pub mod flow;
pub mod session;
pub mod signature;

pub use flow::{BidError, BidStep, PaymentForm, Stage};
pub use session::BidSession;
pub use signature::{Point, Signature};
