use serde::Serialize;
use thiserror::Error;

use crate::receipt::ReceiptId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Mock card processing.
    ClearingPayment,
    /// Receipt being produced for a signed bid.
    Ratifying { receipt_id: ReceiptId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum BidStep {
    Payment,
    Processing(Stage),
    Signing,
    Success { receipt_id: ReceiptId },
    Closed,
}

impl BidStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStep::Payment => "payment",
            BidStep::Processing(_) => "processing",
            BidStep::Signing => "signing",
            BidStep::Success { .. } => "success",
            BidStep::Closed => "closed",
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, BidStep::Processing(_))
    }
}

/// Card details collected on the payment step. Never persisted or logged.
#[derive(Clone, Default)]
pub struct PaymentForm {
    pub cardholder: String,
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("cardholder", &self.cardholder)
            .field("card_number", &"<redacted>")
            .field("expiry", &"<redacted>")
            .field("cvc", &"<redacted>")
            .finish()
    }
}

impl PaymentForm {
    pub fn new(cardholder: &str, card_number: &str, expiry: &str, cvc: &str) -> Self {
        Self {
            cardholder: cardholder.to_string(),
            card_number: card_number.to_string(),
            expiry: expiry.to_string(),
            cvc: cvc.to_string(),
        }
    }

    /// Every field is required; whitespace counts as blank.
    pub fn validate(&self) -> Result<(), BidError> {
        let fields = [
            ("cardholder", &self.cardholder),
            ("card_number", &self.card_number),
            ("expiry", &self.expiry),
            ("cvc", &self.cvc),
        ];
        match fields.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((name, _)) => Err(BidError::MissingField(*name)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BidEvent {
    SubmitPayment(PaymentForm),
    PaymentCleared,
    Finalize { signature_empty: bool, receipt_id: ReceiptId },
    Ratified,
    RatifyFailed,
    Close,
}

impl BidEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidEvent::SubmitPayment(_) => "submit_payment",
            BidEvent::PaymentCleared => "payment_cleared",
            BidEvent::Finalize { .. } => "finalize",
            BidEvent::Ratified => "ratified",
            BidEvent::RatifyFailed => "ratify_failed",
            BidEvent::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidError {
    #[error("{event} not accepted during {step}")]
    InvalidStep { step: &'static str, event: &'static str },
    #[error("payment field required: {0}")]
    MissingField(&'static str),
    #[error("Digital signature required to ratify bid.")]
    SignatureRequired,
    #[error("receipt unavailable: {0}")]
    Receipt(String),
}

/// Every rejection leaves `step` untouched.
pub fn apply_event(step: &mut BidStep, event: BidEvent) -> Result<(), BidError> {
    match (&*step, event) {
        (BidStep::Payment, BidEvent::SubmitPayment(form)) => {
            form.validate()?;
            *step = BidStep::Processing(Stage::ClearingPayment);
            Ok(())
        }
        (BidStep::Processing(Stage::ClearingPayment), BidEvent::PaymentCleared) => {
            *step = BidStep::Signing;
            Ok(())
        }
        (BidStep::Signing, BidEvent::Finalize { signature_empty, receipt_id }) => {
            if signature_empty {
                return Err(BidError::SignatureRequired);
            }
            *step = BidStep::Processing(Stage::Ratifying { receipt_id });
            Ok(())
        }
        (BidStep::Processing(Stage::Ratifying { receipt_id }), BidEvent::Ratified) => {
            *step = BidStep::Success { receipt_id: receipt_id.clone() };
            Ok(())
        }
        (BidStep::Processing(Stage::Ratifying { .. }), BidEvent::RatifyFailed) => {
            *step = BidStep::Signing;
            Ok(())
        }
        (BidStep::Payment | BidStep::Signing | BidStep::Success { .. }, BidEvent::Close) => {
            *step = BidStep::Closed;
            Ok(())
        }
        (current, event) => Err(BidError::InvalidStep {
            step: current.as_str(),
            event: event.as_str(),
        }),
    }
}
