//! Keyframe sampling for clip loaders.

use crate::{
    clip::ClipPlanner,
    common::*,
    corpus::{CorpusIndex, Keyframe},
    dedup::BoxEntry,
    keyframe::KeyframeDescriptor,
};
use ndarray::Array2;

/// The number of positions tried before a sample request fails.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// A keyframe whose video file exists, with its boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// The position actually sampled, which differs from the requested one
    /// after a retry.
    pub position: usize,
    pub descriptor: KeyframeDescriptor,
    pub video_name: String,
    pub video_path: PathBuf,
    pub boxes: Vec<BoxEntry>,
}

impl Sample {
    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    /// Boxes in normalized coordinates.
    pub fn ori_boxes(&self) -> Vec<XYXY<f64>> {
        self.boxes.iter().map(|entry| entry.rect).collect()
    }

    /// Labels of every box, sentinel included.
    pub fn labels(&self) -> Vec<Vec<ClassLabel>> {
        self.boxes
            .iter()
            .map(|entry| entry.classes.clone())
            .collect()
    }

    /// `(video_index, frame_second)` repeated once per box.
    pub fn metadata(&self) -> Vec<(usize, i64)> {
        let KeyframeDescriptor {
            video_index,
            frame_second,
            ..
        } = self.descriptor;
        vec![(video_index, frame_second); self.boxes.len()]
    }

    /// The multi-hot label matrix, one row per box.
    pub fn label_matrix(&self, num_classes: usize) -> Result<Array2<i32>> {
        label::label_matrix(&self.boxes, num_classes).with_context(|| {
            format!(
                "invalid label in video '{}' at second {}",
                self.video_name, self.descriptor.frame_second
            )
        })
    }

    /// Boxes scaled to an image and clipped to its border, labels kept.
    pub fn pixel_boxes(&self, image_size: &HW<f64>) -> Vec<BoxEntry> {
        let transform = Transform::from_unit_to_pixel(image_size);
        self.boxes
            .iter()
            .map(|entry| {
                let MultiLabel { rect, classes } = &transform * entry;
                MultiLabel {
                    rect: rect.clip_to_image(image_size),
                    classes,
                }
            })
            .collect()
    }

    /// The frames to decode for this keyframe.
    pub fn frame_indices(
        &self,
        planner: &ClipPlanner,
        fps: NonZeroUsize,
        total_frames: usize,
    ) -> Result<Vec<usize>> {
        planner.frame_indices(self.descriptor.frame_second, fps, total_frames)
    }
}

/// Picks keyframes whose video file exists.
#[derive(Debug, Clone, Copy)]
pub struct KeyframeSampler<'a> {
    index: &'a CorpusIndex,
    max_attempts: usize,
}

impl<'a> KeyframeSampler<'a> {
    pub fn new(index: &'a CorpusIndex) -> Self {
        Self {
            index,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(index: &'a CorpusIndex, max_attempts: usize) -> Result<Self> {
        ensure!(max_attempts > 0, "max_attempts must be positive");
        Ok(Self {
            index,
            max_attempts,
        })
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Sample the keyframe at `position`.
    ///
    /// When the video file is missing, a uniformly random position is tried
    /// instead, up to `max_attempts` positions in total.
    pub fn sample<R>(&self, position: usize, rng: &mut R) -> Result<Sample>
    where
        R: Rng + ?Sized,
    {
        ensure!(
            self.index.has_video_paths(),
            "video paths are not resolved"
        );
        let len = self.index.len();

        let mut position = position;
        for attempt in 1..=self.max_attempts {
            let keyframe = self.index.nth(position)?;
            let Keyframe {
                descriptor,
                video_name,
                video_path,
                boxes,
            } = keyframe;
            let video_path = video_path
                .ok_or_else(|| format_err!("no video path for '{}'", video_name))?;

            if video_path.is_file() {
                return Ok(Sample {
                    position,
                    descriptor,
                    video_name: video_name.to_owned(),
                    video_path: video_path.to_owned(),
                    boxes: boxes.to_vec(),
                });
            }

            warn!(
                "file {} does not exist (attempt {}/{})",
                video_path.display(),
                attempt,
                self.max_attempts
            );
            position = rng.gen_range(0..len);
        }

        bail!(
            "failed to find an existing video file after {} attempts",
            self.max_attempts
        )
    }
}
