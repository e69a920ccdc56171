// User profiles: editable details, the uploaded resume reference, and the
// denormalized latest enhancement written by the worker.

pub mod handlers;
pub mod store;
