//! Runtime Loader
//!
//! Acquires the selected variant and races the instantiation against the
//! configured timeout.
//!
//! # Single Authoritative Completion
//!
//! Exactly one terminal transition is recorded per load. The instantiation
//! task settles the lifecycle itself (ready or aborted); when the timer wins
//! the race, the loader marks the lifecycle aborted first, and any result the
//! task produces later is refused by the guarded transition and released.
//!
//! # No Cancellation
//!
//! A timeout cancels only the caller's wait. The instantiation task keeps
//! running to completion in the background, holding its compile resources
//! until it finishes. Its result, if any, is then discarded.

mod completion;
mod engine;
mod plan;
mod report;

pub use engine::Loader;
pub use plan::LoadPlan;
pub use report::LoadReport;
