//! `blueprint-core`: pure model of the blueprint batch.
//!
//! This crate has **no I/O**: identifiers, work items, the ordered work item
//! store, and the deterministic partitioner used to shard a batch across
//! independent runs.

pub mod error;
pub mod id;
pub mod item;
pub mod partition;
pub mod record;
pub mod store;

pub use error::{CoreError, CoreResult};
pub use id::{LeagueId, RecipientKey, TeamId, UserId};
pub use item::{ItemStatus, RecipientParams, RenderedResult, WorkItem, parse_disallowed_buys};
pub use partition::{ChunkRange, chunk_range, chunk_ranges, select_by_ranges};
pub use record::{CustomerRecord, RawRow, carry_forward_disallowed};
pub use store::{ColumnLists, Rejected, WorkItemStore};
