//! Per-second box accumulation with duplicate boxes merged.

use crate::{common::*, config::FrameWindow, record::AnnotationRecord};
use indexmap::map::Entry;

/// A normalized box and the labels attached to it.
pub type BoxEntry = MultiLabel<XYXY<f64>>;

/// Counters collected while loading annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadStatistics {
    /// Lines read from every source.
    pub num_lines: usize,
    /// Predicted boxes dropped by the score threshold.
    pub below_threshold: usize,
    /// Records dropped by the box sample rate.
    pub subsampled: usize,
    /// Records whose second is outside the valid window.
    pub out_of_window: usize,
    pub unique_boxes: usize,
    /// Labels other than the sentinel, counted when the builder finishes.
    pub annotations: usize,
}

/// The fate of a line given to [BoxIndexBuilder::push].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Insertion {
    BelowThreshold,
    Subsampled,
    OutOfWindow,
    /// The record created a new box.
    NewBox,
    /// The record added a label to an existing box.
    Merged,
}

/// The boxes of one video for every second of the valid window.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAnnotations {
    window: FrameWindow,
    seconds: Vec<Vec<BoxEntry>>,
}

impl VideoAnnotations {
    pub fn window(&self) -> FrameWindow {
        self.window
    }

    /// The number of seconds, which always equals the window length.
    pub fn num_seconds(&self) -> usize {
        self.seconds.len()
    }

    pub fn get(&self, second: i64) -> Option<&[BoxEntry]> {
        let offset = self.window.offset(second)?;
        Some(&self.seconds[offset])
    }

    /// Iterate seconds in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &[BoxEntry])> + '_ {
        self.window
            .seconds()
            .zip(&self.seconds)
            .map(|(second, boxes)| (second, boxes.as_slice()))
    }

    pub fn into_seconds(self) -> impl Iterator<Item = (i64, Vec<BoxEntry>)> {
        self.window.seconds().zip(self.seconds)
    }
}

/// Accumulates annotation records into per-video, per-second boxes.
#[derive(Debug, Clone)]
pub struct BoxIndexBuilder {
    window: FrameWindow,
    boxes_sample_rate: NonZeroUsize,
    videos: IndexMap<String, Vec<IndexMap<String, BoxEntry>>>,
    stats: LoadStatistics,
}

impl BoxIndexBuilder {
    pub fn new(window: FrameWindow, boxes_sample_rate: NonZeroUsize) -> Result<Self> {
        window.check()?;

        Ok(Self {
            window,
            boxes_sample_rate,
            videos: IndexMap::new(),
            stats: LoadStatistics::default(),
        })
    }

    pub fn statistics(&self) -> &LoadStatistics {
        &self.stats
    }

    pub fn num_videos(&self) -> usize {
        self.videos.len()
    }

    /// Register a video in first-seen order and lay out its empty window.
    ///
    /// Returns the index of the video.
    pub fn register_video(&mut self, video_name: &str) -> usize {
        if let Some(index) = self.videos.get_index_of(video_name) {
            return index;
        }

        let seconds = (0..self.window.len()).map(|_| IndexMap::new()).collect();
        let (index, _) = self.videos.insert_full(video_name.to_owned(), seconds);
        index
    }

    /// Accept the outcome of parsing one line.
    pub fn push(&mut self, parsed: Option<AnnotationRecord>) -> Insertion {
        self.stats.num_lines += 1;

        match parsed {
            Some(record) => self.insert(record),
            None => {
                self.stats.below_threshold += 1;
                Insertion::BelowThreshold
            }
        }
    }

    pub fn insert(&mut self, record: AnnotationRecord) -> Insertion {
        let AnnotationRecord {
            video_name,
            frame_second,
            rect,
            box_key,
            label,
            ..
        } = record;

        // the video is known even if none of its boxes survive
        let video_index = self.register_video(&video_name);

        let rate = self.boxes_sample_rate.get() as i64;
        if frame_second.rem_euclid(rate) != 0 {
            self.stats.subsampled += 1;
            return Insertion::Subsampled;
        }

        let offset = match self.window.offset(frame_second) {
            Some(offset) => offset,
            None => {
                self.stats.out_of_window += 1;
                return Insertion::OutOfWindow;
            }
        };

        let boxes = &mut self.videos[video_index][offset];
        let (entry, insertion) = match boxes.entry(box_key) {
            Entry::Occupied(entry) => (entry.into_mut(), Insertion::Merged),
            Entry::Vacant(entry) => {
                self.stats.unique_boxes += 1;
                (entry.insert(MultiLabel::new(rect)), Insertion::NewBox)
            }
        };

        entry.push(label);
        insertion
    }

    /// Freeze the boxes of every second into lists in first-seen order.
    pub fn finish(self) -> (IndexMap<String, VideoAnnotations>, LoadStatistics) {
        let Self {
            window,
            videos,
            mut stats,
            ..
        } = self;

        stats.annotations = videos
            .values()
            .flatten()
            .flat_map(|boxes| boxes.values())
            .map(|entry| entry.num_known())
            .sum();

        let videos = videos
            .into_iter()
            .map(|(video_name, seconds)| {
                let seconds = seconds
                    .into_iter()
                    .map(|boxes| boxes.into_iter().map(|(_key, entry)| entry).collect())
                    .collect();
                (video_name, VideoAnnotations { window, seconds })
            })
            .collect();

        (videos, stats)
    }
}
