pub mod analysis;
pub mod asset;
pub mod job;
pub mod progress;
pub mod thumbnail;

pub use analysis::{AnalysisResult, StructuredView};
pub use asset::{MediaAsset, RemoteAssetHandle, RemoteState};
pub use job::{JobOutcome, JobSummary};
pub use progress::{JobProgress, JobStage, PollProgress};
pub use thumbnail::Thumbnail;
