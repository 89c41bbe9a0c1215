//! Keyframe index construction for the AVA spatio-temporal action dataset.

mod common;

pub mod clip;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod dedup;
pub mod keyframe;
pub mod record;
pub mod sampler;
pub mod video;

pub use clip::ClipPlanner;
pub use config::{Config, FrameWindow, Split};
pub use corpus::{BuildOptions, CorpusIndex, Keyframe, VideoOrder};
pub use dataset::{AvaDataset, GenericDataset, RandomAccessDataset};
pub use dedup::{BoxEntry, LoadStatistics};
pub use keyframe::KeyframeDescriptor;
pub use record::{AnnotationRecord, AnnotationSource};
pub use sampler::{KeyframeSampler, Sample};
pub use video::{FsVideoDirectory, PathResolution, VideoDirectory};

pub use bbox::{HW, XYXY};
pub use label::{ClassLabel, MultiLabel};
