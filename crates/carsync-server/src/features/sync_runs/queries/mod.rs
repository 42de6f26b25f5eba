pub mod latest;
pub mod list;

pub use latest::LatestSyncRunError;
pub use list::{ListSyncRunsError, ListSyncRunsQuery, SyncRunItem};
