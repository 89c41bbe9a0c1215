//! Frame planning for a clip centred on a keyframe.

use crate::{common::*, config::ClipConfig};

/// Plans which frames a clip loader decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipPlanner {
    pub num_frames: NonZeroUsize,
    pub sampling_rate: NonZeroUsize,
}

impl ClipPlanner {
    pub fn new(num_frames: NonZeroUsize, sampling_rate: NonZeroUsize) -> Self {
        Self {
            num_frames,
            sampling_rate,
        }
    }

    pub fn from_config(config: &ClipConfig) -> Self {
        Self::new(config.num_frames, config.sampling_rate)
    }

    /// The span of frames covered by a clip.
    pub fn seq_len(&self) -> usize {
        self.num_frames.get() * self.sampling_rate.get()
    }

    /// Frame indices around the frame at `center_sec`, clamped to the video.
    pub fn frame_indices(
        &self,
        center_sec: i64,
        fps: NonZeroUsize,
        total_frames: usize,
    ) -> Result<Vec<usize>> {
        ensure!(total_frames > 0, "the video has no frames");

        let center = fps.get() as i64 * center_sec;
        let half = (self.seq_len() / 2) as i64;
        let last = total_frames as i64 - 1;

        let indices: Vec<usize> = ((center - half)..(center + half))
            .step_by(self.sampling_rate.get())
            .map(|index| index.clamp(0, last) as usize)
            .collect();
        ensure!(!indices.is_empty(), "a clip of {} frames is empty", self.seq_len());

        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(num_frames: usize, sampling_rate: usize) -> ClipPlanner {
        ClipPlanner::new(
            NonZeroUsize::new(num_frames).unwrap(),
            NonZeroUsize::new(sampling_rate).unwrap(),
        )
    }

    fn fps(fps: usize) -> NonZeroUsize {
        NonZeroUsize::new(fps).unwrap()
    }

    #[test]
    fn indices_around_center() {
        let planner = planner(4, 2);
        assert_eq!(planner.seq_len(), 8);
        let indices = planner.frame_indices(10, fps(30), 100_000).unwrap();
        assert_eq!(indices, vec![296, 298, 300, 302]);
    }

    #[test]
    fn clamp_at_both_ends() {
        let planner = planner(4, 2);

        let indices = planner.frame_indices(0, fps(30), 1000).unwrap();
        assert_eq!(indices, vec![0, 0, 0, 2]);

        let indices = planner.frame_indices(10, fps(30), 300).unwrap();
        assert_eq!(indices, vec![296, 298, 299, 299]);
    }

    #[test]
    fn single_frame_clip_is_empty() {
        assert!(planner(1, 1).frame_indices(10, fps(30), 1000).is_err());
    }

    #[test]
    fn empty_video_fails() {
        assert!(planner(4, 2).frame_indices(10, fps(30), 0).is_err());
    }
}
