use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use tokio::sync::watch;
use tokio::time::Duration;

use super::flow::{apply_event, BidError, BidEvent, BidStep, PaymentForm};
use super::signature::Signature;
use crate::config::Config;
use crate::logging::{error, info, obj, v_num, v_str, warn, Domain};
use crate::receipt::{Receipt, ReceiptId, ReceiptIssuer};
use crate::tasks::TaskSet;

/// Applies `event` atomically and logs the outcome.
fn apply_to(tx: &watch::Sender<BidStep>, event: BidEvent) -> Result<(), BidError> {
    let name = event.as_str();
    let mut outcome = Ok(());
    let mut from = "";
    tx.send_if_modified(|s| {
        from = s.as_str();
        match apply_event(s, event) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        }
    });
    match &outcome {
        Ok(()) => info(
            Domain::Bid,
            "bid.step",
            obj(&[
                ("event", v_str(name)),
                ("from", v_str(from)),
                ("to", v_str(tx.borrow().as_str())),
            ]),
        ),
        Err(e) => warn(
            Domain::Bid,
            "bid.rejected",
            obj(&[("event", v_str(name)), ("step", v_str(from)), ("msg", v_str(&e.to_string()))]),
        ),
    }
    outcome
}

/// One bid modal: mock payment, signature capture and receipt issuance.
pub struct BidSession {
    step: Arc<watch::Sender<BidStep>>,
    issuer: Arc<ReceiptIssuer>,
    rng: Mutex<StdRng>,
    payment_delay: Duration,
    ratify_delay: Duration,
    tasks: TaskSet,
}

impl BidSession {
    pub fn new(issuer: Arc<ReceiptIssuer>, rng: StdRng, payment_delay: Duration, ratify_delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(BidStep::Payment);
        Self {
            step: Arc::new(tx),
            issuer,
            rng: Mutex::new(rng),
            payment_delay,
            ratify_delay,
            tasks: TaskSet::new("bid"),
        }
    }

    pub fn from_config(cfg: &Config, issuer: Arc<ReceiptIssuer>, rng: StdRng) -> Self {
        Self::new(issuer, rng, cfg.payment_clear_delay(), cfg.ratify_delay())
    }

    pub fn step(&self) -> BidStep {
        self.step.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BidStep> {
        self.step.subscribe()
    }

    pub fn submit_payment(&self, form: PaymentForm) -> Result<(), BidError> {
        apply_to(&self.step, BidEvent::SubmitPayment(form))?;
        info(
            Domain::Bid,
            "payment.processing",
            obj(&[("delay_ms", v_num(self.payment_delay.as_millis() as f64))]),
        );
        let tx = self.step.clone();
        self.tasks.after(self.payment_delay, async move {
            let _ = apply_to(&tx, BidEvent::PaymentCleared);
        });
        Ok(())
    }

    /// Draws a receipt id and schedules ratification. The id is returned
    /// immediately; the receipt file exists once the step reaches `Success`.
    pub fn finalize(&self, signature: Signature) -> Result<ReceiptId, BidError> {
        let current = self.step();
        if current != BidStep::Signing {
            let e = BidError::InvalidStep { step: current.as_str(), event: "finalize" };
            warn(
                Domain::Bid,
                "bid.rejected",
                obj(&[("event", v_str("finalize")), ("step", v_str(current.as_str())), ("msg", v_str(&e.to_string()))]),
            );
            return Err(e);
        }
        if signature.is_empty() {
            warn(Domain::Bid, "signature.missing", obj(&[("msg", v_str(&BidError::SignatureRequired.to_string()))]));
            return Err(BidError::SignatureRequired);
        }

        let receipt_id = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| BidError::Receipt("rng lock poisoned".to_string()))?;
            self.issuer
                .next_id(&mut *rng)
                .map_err(|e| BidError::Receipt(e.to_string()))?
        };
        apply_to(&self.step, BidEvent::Finalize {
            signature_empty: false,
            receipt_id: receipt_id.clone(),
        })?;

        let tx = self.step.clone();
        let issuer = self.issuer.clone();
        let id = receipt_id.clone();
        self.tasks.after(self.ratify_delay, async move {
            let receipt = Receipt::new(id, signature);
            match issuer.issue(&receipt) {
                Ok(_) => {
                    let _ = apply_to(&tx, BidEvent::Ratified);
                }
                Err(e) => {
                    error(
                        Domain::Receipt,
                        "receipt.failed",
                        obj(&[("receipt_id", v_str(receipt.id.as_str())), ("msg", v_str(&format!("{:#}", e)))]),
                    );
                    let _ = apply_to(&tx, BidEvent::RatifyFailed);
                }
            }
        });
        Ok(receipt_id)
    }

    pub fn close(&self) -> Result<(), BidError> {
        apply_to(&self.step, BidEvent::Close)
    }

    /// Cancels any pending payment or ratification step.
    pub fn teardown(&self) {
        self.tasks.shutdown();
    }
}
