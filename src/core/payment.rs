//! Payment adapter - Gateway-agnostic contract for card payments.
//!
//! The engine never talks to a concrete provider; it only needs two
//! capabilities: opening a gateway order before the client-side checkout
//! widget runs, and verifying the provider's callback proof afterwards.
//! Wallet payments bypass this boundary entirely and go through the ledger.
//!
//! `verify` must be idempotent for repeated calls with the same valid
//! payload: the orchestrator may retry after a crash, and a provider may
//! deliver the callback more than once. No money moves at `authorize` time.

use crate::errors::Result;

/// A gateway order opened by `authorize`, awaiting client-side checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// The provider's order id, handed to the checkout widget
    pub external_order_id: String,
}

/// The provider's callback proof, produced by the checkout widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    /// Order id the payment settles
    pub external_order_id: String,
    /// Provider-side payment id
    pub payment_id: String,
    /// Provider signature over (order id, payment id)
    pub signature: String,
}

/// Contract a payment gateway implementation must satisfy for the
/// booking orchestrator.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Opens a gateway order for the given amount; does not move money.
    async fn authorize(
        &self,
        amount_cents: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PendingAuthorization>;

    /// Validates a provider callback proof.
    ///
    /// Fails with `SignatureInvalid` or `AuthorizationNotFound`; repeated
    /// calls with the same valid payload return Ok without double effect.
    async fn verify(&self, payload: &SignaturePayload) -> Result<()>;
}
