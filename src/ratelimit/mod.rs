//! Rate limiting logic and state management.

mod clock;
mod counter;
mod identity;
mod policy;
mod reclaimer;
mod registry;
mod stats;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::{Decision, WindowCounter};
pub use identity::{AuthenticatedUser, ClientIdentity, UNKNOWN_CLIENT};
pub use policy::{
    describe_window, DerivedKey, LimitRule, Policy, PolicyKind, PolicyOutcome, PolicySet,
    Rejection,
};
pub use reclaimer::{Reclaimer, ReclaimerHandle, DEFAULT_RECLAIM_INTERVAL};
pub use registry::{
    RateLimitRegistry, Retention, StoreKind, DEFAULT_GENERAL_GRACE, DEFAULT_HEAVY_GRACE,
};
pub use stats::{RateLimitStats, ReclaimReport};
pub use store::{ActiveSummary, WindowStore};
