use rae_common::Rial;
use thiserror::Error;

/// The outbound contract for the deposit payment gateway.
///
/// The engine only consumes the request/verify surface. Callbacks from the gateway ("the user paid") arrive through
/// the transport layer and are fed back in via [`crate::AuctionFlowApi::confirm_paid`]; they do not appear here.
///
/// Implementations should not apply their own deadlines: the engine bounds every call with
/// [`crate::rae_api::EngineConfig::gateway_timeout`] and maps an elapsed timer to [`GatewayError::Timeout`]. A
/// timeout says nothing about whether the underlying payment went through.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Send + Sync {
    /// Asks the gateway to open a payment of `amount`, to be reported back under `callback_ref`.
    /// Returns the gateway's tracking id.
    async fn request_payment(&self, amount: Rial, callback_ref: &str) -> Result<String, GatewayError>;

    /// Asks the gateway whether the payment behind `track_id` settled. A definitive "no" is a successful call with
    /// [`PaymentVerification::Rejected`]; [`GatewayError`] is reserved for transport problems.
    async fn verify_payment(&self, track_id: &str) -> Result<PaymentVerification, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentVerification {
    /// The gateway confirmed settlement and issued a reference number.
    Verified { ref_number: String },
    /// The gateway definitively rejected the payment. Not retryable.
    Rejected { reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The gateway did not respond within the request timeout")]
    Timeout,
    #[error("Gateway transport error: {0}")]
    Transport(String),
}
