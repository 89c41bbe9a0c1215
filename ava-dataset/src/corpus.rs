//! The keyframe index over a set of annotation files.

use crate::{
    common::*,
    config::{FrameWindow, Split, VideoConfig},
    dedup::{BoxEntry, BoxIndexBuilder, LoadStatistics},
    keyframe::{select_keyframes, KeyframeDescriptor, KeyframeSelection},
    record::{read_records, AnnotationSource},
    video::{self, VideoDirectory},
};
use std::{fs::File, io::BufReader, ops::Index};

/// The order videos are numbered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOrder {
    /// The order of first sighting across all sources.
    FirstSeen,
    /// Lexicographic order of video names.
    Sorted,
}

impl Default for VideoOrder {
    fn default() -> Self {
        Self::FirstSeen
    }
}

/// Parameters of an index build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildOptions {
    pub detect_thresh: R64,
    pub boxes_sample_rate: NonZeroUsize,
    pub valid_frames: FrameWindow,
    pub video_order: VideoOrder,
}

impl BuildOptions {
    /// Options with every second sampled over the AVA window.
    pub fn new(detect_thresh: R64) -> Self {
        Self {
            detect_thresh,
            boxes_sample_rate: NonZeroUsize::new(1).unwrap(),
            valid_frames: FrameWindow::AVA,
            video_order: VideoOrder::FirstSeen,
        }
    }
}

/// A keyframe borrowed from a [CorpusIndex].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<'a> {
    pub descriptor: KeyframeDescriptor,
    pub video_name: &'a str,
    /// Present once paths are resolved.
    pub video_path: Option<&'a Path>,
    pub boxes: &'a [BoxEntry],
}

/// The immutable keyframe index.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusIndex {
    video_names: IndexSet<String>,
    video_paths: Option<Vec<PathBuf>>,
    selection: KeyframeSelection,
    num_boxes_used: usize,
    statistics: LoadStatistics,
}

impl CorpusIndex {
    /// Build an index from annotation streams, parsed in the given order.
    pub fn build<I, R>(sources: I, options: &BuildOptions) -> Result<Self>
    where
        I: IntoIterator<Item = (AnnotationSource, R)>,
        R: io::Read,
    {
        let mut builder = BoxIndexBuilder::new(options.valid_frames, options.boxes_sample_rate)?;

        for (source, reader) in sources {
            read_records(reader, source.is_ground_truth, options.detect_thresh)
                .try_for_each(|parsed| -> Result<()> {
                    builder.push(parsed?);
                    Ok(())
                })
                .with_context(|| {
                    format!(
                        "failed to parse annotation file '{}'",
                        source.path.display()
                    )
                })?;
            info!("finished loading annotations from '{}'", source.path.display());
        }

        Ok(Self::from_builder(builder, options))
    }

    /// Build an index from annotation files.
    pub fn open(sources: &[AnnotationSource], options: &BuildOptions) -> Result<Self> {
        let readers: Vec<_> = sources
            .iter()
            .map(|source| -> Result<_> {
                let file = File::open(&source.path).with_context(|| {
                    format!(
                        "failed to open annotation file '{}'",
                        source.path.display()
                    )
                })?;
                Ok((source.clone(), BufReader::new(file)))
            })
            .try_collect()?;

        Self::build(readers, options)
    }

    fn from_builder(builder: BoxIndexBuilder, options: &BuildOptions) -> Self {
        let (mut videos, statistics) = builder.finish();

        info!("detection threshold: {}", options.detect_thresh);
        info!("number of unique boxes: {}", statistics.unique_boxes);
        info!("number of annotations: {}", statistics.annotations);
        debug!(
            "dropped {} boxes below threshold, {} subsampled, {} out of window",
            statistics.below_threshold, statistics.subsampled, statistics.out_of_window
        );

        if options.video_order == VideoOrder::Sorted {
            videos.sort_keys();
        }

        let video_names: IndexSet<String> = videos.keys().cloned().collect();
        let selection = select_keyframes(videos.into_iter().map(|(_, video)| video));
        let num_boxes_used = selection.num_boxes_used();

        Self {
            video_names,
            video_paths: None,
            selection,
            num_boxes_used,
            statistics,
        }
    }

    /// Attach a file path to every video.
    pub fn with_video_paths(mut self, mut paths: IndexMap<String, PathBuf>) -> Result<Self> {
        let video_paths: Vec<_> = self
            .video_names
            .iter()
            .map(|name| {
                paths
                    .remove(name)
                    .ok_or_else(|| format_err!("no video file found for '{}'", name))
            })
            .try_collect()?;
        self.video_paths = Some(video_paths);
        Ok(self)
    }

    /// Locate the file of every video in the split directory.
    pub fn resolve_video_paths<D>(
        self,
        directory: &D,
        split: Split,
        config: &VideoConfig,
    ) -> Result<Self>
    where
        D: VideoDirectory + ?Sized,
    {
        let files = directory.list(split, config)?;
        let paths = video::resolve_video_paths(
            self.video_names.iter().map(|name| name.as_str()),
            &files,
            config.path_resolution,
        )?;
        self.with_video_paths(paths)
    }

    /// The number of keyframes.
    pub fn len(&self) -> usize {
        self.selection.num_keyframes()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_videos(&self) -> usize {
        self.video_names.len()
    }

    pub fn num_keyframes(&self) -> usize {
        self.len()
    }

    /// The total number of boxes over all keyframes.
    pub fn num_boxes_used(&self) -> usize {
        self.num_boxes_used
    }

    pub fn statistics(&self) -> &LoadStatistics {
        &self.statistics
    }

    pub fn video_names(&self) -> &IndexSet<String> {
        &self.video_names
    }

    pub fn video_name(&self, video_index: usize) -> Option<&str> {
        self.video_names
            .get_index(video_index)
            .map(|name| name.as_str())
    }

    pub fn has_video_paths(&self) -> bool {
        self.video_paths.is_some()
    }

    pub fn video_path(&self, video_index: usize) -> Option<&Path> {
        self.video_paths.as_ref()?.get(video_index).map(|path| path.as_path())
    }

    pub fn descriptors(&self) -> &[KeyframeDescriptor] {
        &self.selection.descriptors
    }

    /// The boxes of the `sequence_index`-th keyframe of a video.
    pub fn keyframe_boxes(&self, video_index: usize, sequence_index: usize) -> Option<&[BoxEntry]> {
        self.selection
            .boxes
            .get(video_index)?
            .get(sequence_index)
            .map(|boxes| boxes.as_slice())
    }

    /// The keyframe at `position`, or `None` if out of range.
    pub fn get(&self, position: usize) -> Option<Keyframe<'_>> {
        let descriptor = *self.selection.descriptors.get(position)?;
        let KeyframeDescriptor {
            video_index,
            sequence_index,
            ..
        } = descriptor;

        Some(Keyframe {
            descriptor,
            video_name: &self.video_names[video_index],
            video_path: self.video_path(video_index),
            boxes: &self.selection.boxes[video_index][sequence_index],
        })
    }

    /// The keyframe at `position`, or an error if out of range.
    pub fn nth(&self, position: usize) -> Result<Keyframe<'_>> {
        self.get(position).ok_or_else(|| {
            format_err!(
                "invalid index {}, the index has {} keyframes",
                position,
                self.len()
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Keyframe<'_>> + '_ {
        (0..self.len()).filter_map(move |position| self.get(position))
    }
}

impl Index<usize> for CorpusIndex {
    type Output = KeyframeDescriptor;

    /// Panics if `position` is out of range.
    fn index(&self, position: usize) -> &Self::Output {
        &self.selection.descriptors[position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(sources: &[(bool, &str)], options: &BuildOptions) -> Result<CorpusIndex> {
        let sources = sources.iter().map(|&(is_gt, text)| {
            let source = if is_gt {
                AnnotationSource::ground_truth("inline.csv")
            } else {
                AnnotationSource::prediction("inline.csv")
            };
            (source, text.as_bytes())
        });
        CorpusIndex::build(sources, options)
    }

    #[test]
    fn merge_across_sources() {
        let options = BuildOptions::new(r64(0.5));
        let index = build(
            &[
                (true, "v1,902,0.1,0.1,0.5,0.5,3\n"),
                (false, "v1,902,0.1,0.1,0.5,0.5,7,0.9\n"),
            ],
            &options,
        )
        .unwrap();

        assert_eq!(index.len(), 1);
        let keyframe = index.nth(0).unwrap();
        assert_eq!(keyframe.video_name, "v1");
        assert_eq!(keyframe.descriptor.frame_second, 902);
        assert_eq!(keyframe.boxes.len(), 1);
        assert_eq!(
            keyframe.boxes[0].classes,
            vec![ClassLabel::new(3), ClassLabel::new(7)]
        );
        assert_eq!(keyframe.video_path, None);
    }

    #[test]
    fn out_of_range_position() {
        let index = build(
            &[(true, "v1,902,0.1,0.1,0.5,0.5,3\n")],
            &BuildOptions::new(r64(0.5)),
        )
        .unwrap();
        assert!(index.get(1).is_none());
        assert!(index.nth(1).is_err());
        assert_eq!(index[0].frame_second, 902);
    }

    #[test]
    #[should_panic]
    fn index_operator_panics_out_of_range() {
        let index = build(
            &[(true, "v1,902,0.1,0.1,0.5,0.5,3\n")],
            &BuildOptions::new(r64(0.5)),
        )
        .unwrap();
        let _descriptor = index[1];
    }

    #[test]
    fn error_names_the_file() {
        let sources = vec![(
            AnnotationSource::ground_truth("broken.csv"),
            "v1,902,0.1,0.1,0.5,0.5,3\nv1,x,0.1,0.1,0.5,0.5,3\n".as_bytes(),
        )];
        let err = CorpusIndex::build(sources, &BuildOptions::new(r64(0.5))).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("broken.csv"));
        assert!(message.contains("line 2"));
    }

    #[test]
    fn sorted_video_order() {
        let mut options = BuildOptions::new(r64(0.5));
        options.video_order = VideoOrder::Sorted;
        let index = build(
            &[(
                true,
                "zz,902,0.1,0.1,0.5,0.5,3\naa,903,0.1,0.1,0.5,0.5,3\n",
            )],
            &options,
        )
        .unwrap();

        assert_eq!(index.video_name(0), Some("aa"));
        assert_eq!(index.video_name(1), Some("zz"));
        assert_eq!(index.nth(0).unwrap().descriptor.frame_second, 903);
    }

    #[test]
    fn attach_video_paths() {
        let index = build(
            &[(true, "b,902,0.1,0.1,0.5,0.5,3\na,903,0.1,0.1,0.5,0.5,3\n")],
            &BuildOptions::new(r64(0.5)),
        )
        .unwrap();

        let paths: IndexMap<_, _> = vec![
            ("a".to_owned(), PathBuf::from("/v/a.mp4")),
            ("b".to_owned(), PathBuf::from("/v/b.mkv")),
        ]
        .into_iter()
        .collect();
        let index = index.with_video_paths(paths).unwrap();

        assert!(index.has_video_paths());
        assert_eq!(index.video_path(0), Some(Path::new("/v/b.mkv")));
        assert_eq!(
            index.nth(1).unwrap().video_path,
            Some(Path::new("/v/a.mp4"))
        );
    }

    #[test]
    fn missing_video_path_is_an_error() {
        let index = build(
            &[(true, "b,902,0.1,0.1,0.5,0.5,3\n")],
            &BuildOptions::new(r64(0.5)),
        )
        .unwrap();
        assert!(index.with_video_paths(IndexMap::new()).is_err());
    }
}
