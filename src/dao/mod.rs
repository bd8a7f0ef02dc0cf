/// Session store abstraction and its in-memory backend.
pub mod session_store;
/// Errors shared by store backends.
pub mod storage;
