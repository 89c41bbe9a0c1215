//! Keyframe selection.

use crate::{
    common::*,
    dedup::{BoxEntry, VideoAnnotations},
};

/// Locates a keyframe: the video, its rank among the video's keyframes and
/// the second it falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyframeDescriptor {
    pub video_index: usize,
    pub sequence_index: usize,
    pub frame_second: i64,
}

/// Selected keyframes and their boxes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeSelection {
    /// Grouped by video, ascending seconds within a video.
    pub descriptors: Vec<KeyframeDescriptor>,
    /// Boxes indexed by `video_index` then `sequence_index`.
    pub boxes: Vec<Vec<Vec<BoxEntry>>>,
}

impl KeyframeSelection {
    pub fn num_keyframes(&self) -> usize {
        self.descriptors.len()
    }

    /// The total number of boxes over all keyframes.
    pub fn num_boxes_used(&self) -> usize {
        self.descriptors
            .iter()
            .map(|desc| self.boxes[desc.video_index][desc.sequence_index].len())
            .sum()
    }
}

/// Select the non-empty seconds of each video as keyframes.
///
/// Videos are visited in the given order, which defines `video_index`.
pub fn select_keyframes<I>(videos: I) -> KeyframeSelection
where
    I: IntoIterator<Item = VideoAnnotations>,
{
    let mut descriptors = vec![];
    let mut boxes = vec![];

    for (video_index, video) in videos.into_iter().enumerate() {
        let mut video_boxes: Vec<Vec<BoxEntry>> = vec![];

        for (frame_second, entries) in video.into_seconds() {
            if entries.is_empty() {
                continue;
            }

            descriptors.push(KeyframeDescriptor {
                video_index,
                sequence_index: video_boxes.len(),
                frame_second,
            });
            video_boxes.push(entries);
        }

        boxes.push(video_boxes);
    }

    let selection = KeyframeSelection { descriptors, boxes };
    info!("{} keyframes used", selection.num_keyframes());
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FrameWindow, dedup::BoxIndexBuilder, record::AnnotationRecord};

    fn videos(lines: &[&str]) -> Vec<VideoAnnotations> {
        let mut builder = BoxIndexBuilder::new(
            FrameWindow::new(900..910).unwrap(),
            NonZeroUsize::new(1).unwrap(),
        )
        .unwrap();
        for line in lines {
            let record = AnnotationRecord::parse(line, true, r64(0.0))
                .unwrap()
                .unwrap();
            builder.insert(record);
        }
        let (videos, _) = builder.finish();
        videos.into_iter().map(|(_, video)| video).collect()
    }

    #[test]
    fn select_nonempty_seconds_in_order() {
        let selection = select_keyframes(videos(&[
            "b,907,0.1,0.1,0.5,0.5,1",
            "b,901,0.1,0.1,0.5,0.5,2",
            "b,901,0.2,0.2,0.6,0.6,3",
            "a,905,0.1,0.1,0.5,0.5,4",
        ]));

        let expect = vec![
            KeyframeDescriptor {
                video_index: 0,
                sequence_index: 0,
                frame_second: 901,
            },
            KeyframeDescriptor {
                video_index: 0,
                sequence_index: 1,
                frame_second: 907,
            },
            KeyframeDescriptor {
                video_index: 1,
                sequence_index: 0,
                frame_second: 905,
            },
        ];
        assert_eq!(selection.descriptors, expect);
        assert_eq!(selection.num_keyframes(), 3);
        assert_eq!(selection.num_boxes_used(), 4);
        assert_eq!(selection.boxes[0][0].len(), 2);
    }

    #[test]
    fn every_descriptor_indexes_nonempty_boxes() {
        let selection = select_keyframes(videos(&[
            "a,900,0.1,0.1,0.5,0.5,1",
            "a,909,0.1,0.1,0.5,0.5,1",
            "b,1500,0.1,0.1,0.5,0.5,1",
            "c,904,0.1,0.1,0.5,0.5,",
        ]));

        assert_eq!(selection.boxes.len(), 3);
        assert!(selection.boxes[1].is_empty());

        let total: usize = selection.boxes.iter().map(|video| video.len()).sum();
        assert_eq!(selection.num_keyframes(), total);

        for desc in &selection.descriptors {
            assert!(!selection.boxes[desc.video_index][desc.sequence_index].is_empty());
        }
    }

    #[test]
    fn no_videos_no_keyframes() {
        let selection = select_keyframes(Vec::<VideoAnnotations>::new());
        assert_eq!(selection.num_keyframes(), 0);
        assert_eq!(selection.num_boxes_used(), 0);
    }
}
