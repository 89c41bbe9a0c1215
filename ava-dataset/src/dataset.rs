//! The AVA dataset of one split.

use crate::{
    clip::ClipPlanner,
    common::*,
    config::{Config, Split},
    corpus::{CorpusIndex, Keyframe},
    record::AnnotationSource,
    sampler::KeyframeSampler,
    video::{FsVideoDirectory, VideoDirectory},
};
use futures::future::FutureExt as _;

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug + Sync + Send,
{
    /// The split the dataset is built for.
    fn split(&self) -> Split;

    /// The number of action classes.
    fn num_classes(&self) -> usize;
}

/// The dataset that can be random accessed.
pub trait RandomAccessDataset
where
    Self: GenericDataset,
{
    /// Get number of keyframes in the dataset.
    fn num_records(&self) -> usize;

    /// Get the nth keyframe in the dataset.
    fn nth(&self, index: usize) -> Result<Keyframe<'_>>;
}

/// The keyframe index of a split with resolved video paths.
#[derive(Debug, Clone)]
pub struct AvaDataset {
    config: Arc<Config>,
    split: Split,
    index: Arc<CorpusIndex>,
}

impl AvaDataset {
    /// Load the split with videos looked up on the local file system.
    pub async fn load(config: Arc<Config>, split: Split) -> Result<Self> {
        Self::load_with(config, split, FsVideoDirectory).await
    }

    pub async fn load_with<D>(config: Arc<Config>, split: Split, directory: D) -> Result<Self>
    where
        D: 'static + VideoDirectory + Send,
    {
        let sources = config.annotation_sources(split);
        info!("constructing AVA {} dataset", split);

        // files are read concurrently but kept in source order
        let contents: Vec<(AnnotationSource, Vec<u8>)> = stream::iter(sources)
            .par_then(None, |source| async move {
                let bytes = tokio::fs::read(&source.path).await.with_context(|| {
                    format!(
                        "failed to read annotation file '{}'",
                        source.path.display()
                    )
                })?;
                Fallible::Ok((source, bytes))
            })
            .try_collect()
            .await?;

        let index = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                let options = config.build_options(split);
                let sources = contents
                    .iter()
                    .map(|(source, bytes)| (source.clone(), bytes.as_slice()));
                let index = CorpusIndex::build(sources, &options)?
                    .resolve_video_paths(&directory, split, &config.video)?;
                Fallible::Ok(index)
            })
            .map(|result| Fallible::Ok(result??))
            .await?
        };

        let dataset = Self {
            config,
            split,
            index: Arc::new(index),
        };
        dataset.print_summary();

        Ok(dataset)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn sampler(&self) -> KeyframeSampler<'_> {
        KeyframeSampler::new(&self.index)
    }

    pub fn clip_planner(&self) -> ClipPlanner {
        ClipPlanner::from_config(&self.config.clip)
    }

    pub fn print_summary(&self) {
        info!("=== AVA dataset summary ===");
        info!("split: {}", self.split);
        info!("number of videos: {}", self.index.num_videos());
        info!("number of key frames: {}", self.index.num_keyframes());
        info!("number of boxes: {}", self.index.num_boxes_used());
    }
}

impl GenericDataset for AvaDataset {
    fn split(&self) -> Split {
        self.split
    }

    fn num_classes(&self) -> usize {
        self.config.num_classes.get()
    }
}

impl RandomAccessDataset for AvaDataset {
    fn num_records(&self) -> usize {
        self.index.len()
    }

    fn nth(&self, index: usize) -> Result<Keyframe<'_>> {
        self.index.nth(index)
    }
}
