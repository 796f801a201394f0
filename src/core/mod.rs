pub mod checksum;
pub mod comparator;
pub mod engine;
pub mod metadata;
pub mod report;
pub mod scanner;
pub mod transfer;

pub use checksum::{local_digest, normalize_remote_digest};
pub use comparator::{FileComparator, VerificationMethod, VerificationOutcome};
pub use engine::{SyncEngine, SyncOptions};
pub use metadata::{MetadataExtractor, MetadataPipeline, ModifyTimeExtractor};
pub use report::{RestartLedger, RunReport};
pub use scanner::{FileEntry, FileScanner, TreeListing};
pub use transfer::{TransferExecutor, TransferResult};
