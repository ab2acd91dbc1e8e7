//! The desired-state store: a git branch tree holding one record per
//! (service, environment), plus the publish machinery and the promotion
//! event log layered on its history.

mod error;
pub mod history;
mod layout;
pub mod publish;
mod record;

pub use error::StoreError;
pub use history::EventEntry;
pub use layout::{record_path, rollback_slot_path};
pub use publish::{Committed, Idle, Loaded, Publisher, StageDiff, Staged, StagedChange};
pub use record::DesiredStateRecord;
