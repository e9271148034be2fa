use rae_common::Rial;
use thiserror::Error;

use crate::{
    db_types::{AuctionId, AuctionStatus},
    helpers::LockBusy,
    traits::{AuctionStoreError, GatewayError},
};

/// Why a bid was not accepted. These are user errors: each maps 1:1 to a human-readable reason, is returned
/// synchronously, and is never retried or logged as a system failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidRejection {
    #[error("The auction is not open for bids")]
    AuctionNotActive,
    #[error("The bidding deadline has passed")]
    DeadlinePassed,
    #[error("You have not been invited to bid on this auction")]
    NotInvited,
    #[error("Bids must be below the starting price of {starting_price}")]
    PriceTooHigh { starting_price: Rial },
    #[error("A new bid must be lower than your previous bid of {previous}")]
    NotLowerThanPrevious { previous: Rial },
    #[error("A bid must undercut by at least the minimum decrement of {required}")]
    DecrementTooSmall { required: Rial },
}

#[derive(Debug, Clone, Error)]
pub enum AuctionEngineError {
    #[error("{0}")]
    Rejected(#[from] BidRejection),
    #[error("{0}")]
    Busy(#[from] LockBusy),
    #[error("Payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),
    #[error("{0}")]
    Store(#[from] AuctionStoreError),
    #[error("The requested auction {0} does not exist")]
    AuctionNotFound(AuctionId),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Cannot {attempted} an auction in status {from}")]
    InvalidTransition { from: AuctionStatus, attempted: &'static str },
    #[error("A live reverse auction cannot be closed early this close to its deadline")]
    EarlyCloseTooLate,
    #[error("Auction {0} cannot be submitted for review: {1}")]
    IncompleteDraft(AuctionId, String),
    #[error("Invalid auction: {0}")]
    InvalidAuction(String),
    #[error("Auction {0} has no deposit")]
    DepositMissing(AuctionId),
    #[error("Deposit for auction {0} is in the wrong state: {1}")]
    DepositState(AuctionId, String),
}

impl AuctionEngineError {
    /// True for errors the caller's user did something wrong and can fix: the bid or transition was invalid.
    /// UIs show the reason verbatim.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuctionEngineError::Rejected(_)
                | AuctionEngineError::NotAuthorized(_)
                | AuctionEngineError::InvalidTransition { .. }
                | AuctionEngineError::EarlyCloseTooLate
                | AuctionEngineError::IncompleteDraft(..)
                | AuctionEngineError::InvalidAuction(_)
        )
    }

    /// True for failures worth retrying: the request itself was fine but a lock or the gateway was unavailable.
    /// UIs show a generic "try again", never a suggestion that the bid was invalid.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuctionEngineError::Busy(_)
                | AuctionEngineError::Gateway(GatewayError::Timeout)
                | AuctionEngineError::Gateway(GatewayError::Transport(_))
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_classes_do_not_overlap() {
        let rejected = AuctionEngineError::Rejected(BidRejection::AuctionNotActive);
        assert!(rejected.is_validation());
        assert!(!rejected.is_transient());

        let busy = AuctionEngineError::Busy(LockBusy(AuctionId::from("a")));
        assert!(busy.is_transient());
        assert!(!busy.is_validation());

        let gateway = AuctionEngineError::Gateway(GatewayError::Timeout);
        assert!(gateway.is_transient());

        let fatal = AuctionEngineError::Store(AuctionStoreError::DatabaseError("boom".into()));
        assert!(!fatal.is_validation());
        assert!(!fatal.is_transient());
    }
}
