// Resume enhancement pipeline.
// Enqueue creates a pending job and fires the trigger queue; the worker moves
// it to completed/error; clients poll the status endpoint.

pub mod enhancer;
pub mod enqueue;
pub mod extract;
pub mod file_ref;
pub mod handlers;
pub mod queue;
pub mod reaper;
pub mod status;
pub mod store;
pub mod worker;
