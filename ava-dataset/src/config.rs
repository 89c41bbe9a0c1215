//! Dataset configuration format.

use crate::{
    common::*,
    corpus::{BuildOptions, VideoOrder},
    record::AnnotationSource,
    video::PathResolution,
};

pub use annotation::*;
pub use clip::*;
pub use video::*;

pub static CONFIG_VERSION: Lazy<VersionReq> = Lazy::new(|| VersionReq::parse("0.1.0").unwrap());

/// The dataset configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_version")]
    pub version: Version,
    pub annotation: AnnotationConfig,
    pub video: VideoConfig,
    pub clip: ClipConfig,
    /// The number of action classes. Labels range in `1..=num_classes`.
    #[serde(default = "default_num_classes")]
    pub num_classes: NonZeroUsize,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// List annotation files for the split, ground-truth files first.
    pub fn annotation_sources(&self, split: Split) -> Vec<AnnotationSource> {
        let AnnotationConfig {
            ref dir,
            ref train_gt_box_lists,
            ref train_predict_box_lists,
            ref test_predict_box_lists,
            ..
        } = self.annotation;

        let no_lists: &[PathBuf] = &[];
        let (gt_lists, pred_lists) = match split {
            Split::Train => (
                train_gt_box_lists.as_slice(),
                train_predict_box_lists.as_slice(),
            ),
            Split::Val | Split::Test => (no_lists, test_predict_box_lists.as_slice()),
        };

        gt_lists
            .iter()
            .map(|file| AnnotationSource::ground_truth(dir.join(file)))
            .chain(
                pred_lists
                    .iter()
                    .map(|file| AnnotationSource::prediction(dir.join(file))),
            )
            .collect()
    }

    /// Validation keeps one of every four seconds unless a full test is requested.
    pub fn boxes_sample_rate(&self, split: Split) -> NonZeroUsize {
        let rate = match split {
            Split::Val if !self.annotation.full_test_on_val => 4,
            _ => 1,
        };
        NonZeroUsize::new(rate).unwrap()
    }

    pub fn build_options(&self, split: Split) -> BuildOptions {
        BuildOptions {
            detect_thresh: self.annotation.detection_score_thresh,
            boxes_sample_rate: self.boxes_sample_rate(split),
            valid_frames: self.annotation.valid_frames,
            video_order: self.annotation.video_order,
        }
    }

    pub fn video_dir(&self, split: Split) -> PathBuf {
        self.video.dir(split)
    }
}

/// The dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl FromStr for Split {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let split = match text {
            "train" => Self::Train,
            "val" => Self::Val,
            "test" => Self::Test,
            _ => bail!("unsupported split mode '{}'", text),
        };
        Ok(split)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        };
        write!(f, "{}", text)
    }
}

/// The contiguous range of seconds eligible for keyframe selection.
///
/// The end is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameWindow {
    pub start: i64,
    pub end: i64,
}

impl FrameWindow {
    /// The annotated span of an AVA movie, seconds 902 to 1798.
    pub const AVA: Self = Self {
        start: 902,
        end: 1799,
    };

    pub fn new(seconds: Range<i64>) -> Result<Self> {
        let window = Self {
            start: seconds.start,
            end: seconds.end,
        };
        window.check()?;
        Ok(window)
    }

    pub fn check(&self) -> Result<()> {
        ensure!(
            self.start < self.end,
            "the valid frame window {}..{} is empty",
            self.start,
            self.end
        );
        Ok(())
    }

    pub fn contains(&self, second: i64) -> bool {
        (self.start..self.end).contains(&second)
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The position of the second counted from the window start.
    pub fn offset(&self, second: i64) -> Option<usize> {
        self.contains(second).then(|| (second - self.start) as usize)
    }

    pub fn seconds(&self) -> Range<i64> {
        self.start..self.end
    }
}

impl Default for FrameWindow {
    fn default() -> Self {
        Self::AVA
    }
}

mod annotation {
    use super::*;

    /// Annotation file options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnnotationConfig {
        /// The directory where annotation files are located.
        pub dir: PathBuf,
        /// Ground-truth box files used in training.
        #[serde(default)]
        pub train_gt_box_lists: Vec<PathBuf>,
        /// Detector box files used in training.
        #[serde(default)]
        pub train_predict_box_lists: Vec<PathBuf>,
        /// Detector box files used in validation and testing.
        #[serde(default)]
        pub test_predict_box_lists: Vec<PathBuf>,
        /// Detector boxes scoring below this value are ignored.
        pub detection_score_thresh: R64,
        /// If set, validation uses every second instead of one in four.
        #[serde(default)]
        pub full_test_on_val: bool,
        #[serde(default)]
        pub valid_frames: FrameWindow,
        #[serde(default)]
        pub video_order: VideoOrder,
    }
}

mod video {
    use super::*;

    /// Video file location options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VideoConfig {
        pub data_dir: PathBuf,
        pub train_dir: PathBuf,
        pub test_dir: PathBuf,
        /// How to treat several files sharing a video name.
        #[serde(default)]
        pub path_resolution: PathResolution,
    }

    impl VideoConfig {
        /// The directory holding the videos of a split.
        pub fn dir(&self, split: Split) -> PathBuf {
            match split {
                Split::Train => self.data_dir.join(&self.train_dir),
                Split::Val | Split::Test => self.data_dir.join(&self.test_dir),
            }
        }
    }
}

mod clip {
    use super::*;

    /// Clip sampling options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ClipConfig {
        /// The number of frames in a clip.
        pub num_frames: NonZeroUsize,
        /// The frame stride within a clip.
        pub sampling_rate: NonZeroUsize,
        /// The frame rate assumed when the container does not report one.
        #[serde(default = "default_fps")]
        pub fps: NonZeroUsize,
    }
}

fn default_num_classes() -> NonZeroUsize {
    NonZeroUsize::new(80).unwrap()
}

fn default_fps() -> NonZeroUsize {
    NonZeroUsize::new(30).unwrap()
}

pub fn deserialize_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let version = Version::parse(&text).map_err(|err| {
        D::Error::custom(format!(
            "failed to parse version number '{}': {:?}",
            text, err
        ))
    })?;

    if !CONFIG_VERSION.matches(&version) {
        return Err(D::Error::custom(format!(
            "incompatible version: get '{}', but it is incompatible with requirement '{}'",
            version, &*CONFIG_VERSION,
        )));
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        version: "0.1.0",
        annotation: {
            dir: "/data/ava/annotations",
            train_gt_box_lists: ["ava_train_v2.2.csv"],
            train_predict_box_lists: ["person_box_67091280_iou90/ava_detection_train_boxes_and_labels_include_negative_v2.2.csv"],
            test_predict_box_lists: ["person_box_67091280_iou90/ava_detection_val_boxes_and_labels.csv"],
            detection_score_thresh: 0.8,
        },
        video: {
            data_dir: "/data/ava",
            train_dir: "videos/trainval",
            test_dir: "videos/test",
        },
        clip: {
            num_frames: 32,
            sampling_rate: 2,
        },
    }"#;

    #[test]
    fn parse_config_with_defaults() {
        let config: Config = json5::from_str(CONFIG).unwrap();
        assert_eq!(config.num_classes.get(), 80);
        assert_eq!(config.clip.fps.get(), 30);
        assert_eq!(config.annotation.valid_frames, FrameWindow::AVA);
        assert_eq!(config.annotation.video_order, VideoOrder::FirstSeen);
        assert_eq!(config.video.path_resolution, PathResolution::FirstMatch);
        assert!(!config.annotation.full_test_on_val);
    }

    #[test]
    fn reject_incompatible_version() {
        let text = CONFIG.replace("\"0.1.0\"", "\"0.2.0\"");
        assert!(json5::from_str::<Config>(&text).is_err());
    }

    #[test]
    fn sources_per_split() {
        let config: Config = json5::from_str(CONFIG).unwrap();

        let train = config.annotation_sources(Split::Train);
        assert_eq!(train.len(), 2);
        assert!(train[0].is_ground_truth);
        assert!(!train[1].is_ground_truth);
        assert_eq!(
            train[0].path,
            Path::new("/data/ava/annotations/ava_train_v2.2.csv")
        );

        let val = config.annotation_sources(Split::Val);
        assert_eq!(val.len(), 1);
        assert!(!val[0].is_ground_truth);
        assert_eq!(val, config.annotation_sources(Split::Test));
    }

    #[test]
    fn sample_rate_per_split() {
        let mut config: Config = json5::from_str(CONFIG).unwrap();
        assert_eq!(config.boxes_sample_rate(Split::Train).get(), 1);
        assert_eq!(config.boxes_sample_rate(Split::Val).get(), 4);
        assert_eq!(config.boxes_sample_rate(Split::Test).get(), 1);

        config.annotation.full_test_on_val = true;
        assert_eq!(config.boxes_sample_rate(Split::Val).get(), 1);
    }

    #[test]
    fn video_dir_per_split() {
        let config: Config = json5::from_str(CONFIG).unwrap();
        assert_eq!(
            config.video_dir(Split::Train),
            Path::new("/data/ava/videos/trainval")
        );
        assert_eq!(
            config.video_dir(Split::Val),
            Path::new("/data/ava/videos/test")
        );
    }

    #[test]
    fn parse_split() {
        assert_eq!("val".parse::<Split>().unwrap(), Split::Val);
        assert_eq!(Split::Test.to_string(), "test");
        assert!("holdout".parse::<Split>().is_err());
    }

    #[test]
    fn frame_window_offsets() {
        let window = FrameWindow::new(10..14).unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(window.offset(10), Some(0));
        assert_eq!(window.offset(13), Some(3));
        assert_eq!(window.offset(14), None);
        assert_eq!(window.offset(9), None);
        assert!(FrameWindow::new(5..5).is_err());
    }
}
