mod auction_locks;

pub use auction_locks::{AuctionLocks, LockBusy};
