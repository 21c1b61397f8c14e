use graphtx_log::LoggedTransaction;

use crate::lock::LockStatus;

/// The success/deadlock/not-locked/failure sentinel every RPC surface
/// operation resolves to (spec.md §6 "RPC surface (per operation)").
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseStatus {
    Ok,
    NotLocked,
    Deadlock(String),
    Failure(String),
}

impl From<LockStatus> for ResponseStatus {
    fn from(status: LockStatus) -> Self {
        match status {
            LockStatus::OkLocked => ResponseStatus::Ok,
            LockStatus::NotLocked => ResponseStatus::NotLocked,
            LockStatus::Deadlock(msg) => ResponseStatus::Deadlock(msg),
        }
    }
}

/// What every coordinator entry point returns (spec.md §6): the result
/// (absent exactly when `status` isn't `Ok`, except where the payload is
/// itself naturally optional — see [`crate::MasterCoordinator::get_master_id_for_committed_tx`]),
/// the catch-up stream of transactions the slave is missing up to its
/// recorded horizon, and the status sentinel. `catch_up` is `None` for
/// idempotent/metadata calls that aren't bound to a slave context, matching
/// spec.md §6's "'no stream' for idempotent/metadata calls".
#[derive(Clone, Debug)]
pub struct Response<T> {
    pub result: Option<T>,
    pub catch_up: Option<Vec<LoggedTransaction>>,
    pub status: ResponseStatus,
}

impl<T> Response<T> {
    pub fn ok(result: T, catch_up: Vec<LoggedTransaction>) -> Self {
        Self {
            result: Some(result),
            catch_up: Some(catch_up),
            status: ResponseStatus::Ok,
        }
    }

    pub fn ok_without_stream(result: T) -> Self {
        Self {
            result: Some(result),
            catch_up: None,
            status: ResponseStatus::Ok,
        }
    }

    pub fn failed(status: ResponseStatus, catch_up: Vec<LoggedTransaction>) -> Self {
        debug_assert_ne!(status, ResponseStatus::Ok, "Response::failed called with an Ok status");
        Self {
            result: None,
            catch_up: Some(catch_up),
            status,
        }
    }
}
