//! Rollcall crawl engine.
//!
//! Coordinates region adapters, the durable task queue, and the
//! database into a restartable roster crawl. The state machine in
//! [`machine`] runs the individual crawl steps; [`lifecycle`] owns
//! start/resume/stop; [`worker`] drives it all from the queue.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod failures;
pub mod lifecycle;
pub mod linker;
pub mod machine;
pub mod proxy;
pub mod worker;

pub use error::{EngineError, Result};
pub use failures::{FailCounter, FAIL_COUNTER_TTL, MAX_RESULTS_FAILURES};
pub use lifecycle::RegionStatus;
pub use linker::RecordLinker;
pub use machine::{CrawlStateMachine, Disposition};
pub use proxy::ProxyCredentialProvider;
pub use worker::WorkerPool;
