pub mod backup;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod index;
pub mod io;
pub mod logging;
pub mod record;
pub mod report;
pub mod shape;
pub mod stats;
pub mod store;

pub mod prelude {
    pub use crate::config::IngestConfig;
    pub use crate::engine::{Engine, LineOutcome, RunSummary, run};
    pub use crate::error::IngestError;
    pub use crate::fingerprint::Fingerprint;
    pub use crate::record::LeakRecord;
    pub use crate::shape::RecordShape;
}
