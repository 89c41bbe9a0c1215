//! Annotation line parsing.

use crate::common::*;

const MIN_NUM_FIELDS: usize = 7;
const SCORE_FIELD: usize = 7;

/// An annotation file and the kind of boxes it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationSource {
    pub path: PathBuf,
    /// Ground-truth boxes are never filtered by score.
    pub is_ground_truth: bool,
}

impl AnnotationSource {
    pub fn ground_truth(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_ground_truth: true,
        }
    }

    pub fn prediction(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_ground_truth: false,
        }
    }
}

/// One line of a box annotation file.
///
/// The line format is `video_name,frame_second,x1,y1,x2,y2,label[,score,...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub video_name: String,
    pub frame_second: i64,
    /// The box in normalized coordinates, as written in the file.
    pub rect: XYXY<f64>,
    /// The key that identifies the box within a second. See [box_key].
    pub box_key: String,
    pub label: ClassLabel,
    /// The detector score. It is only read for prediction sources.
    pub score: Option<f64>,
    pub is_ground_truth: bool,
}

impl AnnotationRecord {
    /// Parse a line. Returns `None` for a prediction scoring below `detect_thresh`.
    pub fn parse(line: &str, is_ground_truth: bool, detect_thresh: R64) -> Result<Option<Self>> {
        let fields: Vec<_> = line.trim().split(',').collect();
        Self::from_fields(&fields, is_ground_truth, detect_thresh)
    }

    pub fn from_fields(
        fields: &[&str],
        is_ground_truth: bool,
        detect_thresh: R64,
    ) -> Result<Option<Self>> {
        ensure!(
            fields.len() >= MIN_NUM_FIELDS,
            "expect at least {} fields, but found {}",
            MIN_NUM_FIELDS,
            fields.len()
        );

        // predicted boxes scoring below the threshold are dropped before
        // anything else is read
        let score = if is_ground_truth {
            None
        } else {
            let text = fields
                .get(SCORE_FIELD)
                .ok_or_else(|| format_err!("the score field is missing in a predicted box"))?;
            let score: f64 = parse_number(text, "score")?;
            if score < detect_thresh.raw() {
                return Ok(None);
            }
            Some(score)
        };

        let video_name = fields[0].to_owned();
        let frame_second: i64 = parse_number(fields[1], "frame second")?;

        let coords = &fields[2..6];
        let x1: f64 = parse_number(coords[0], "x1")?;
        let y1: f64 = parse_number(coords[1], "y1")?;
        let x2: f64 = parse_number(coords[2], "x2")?;
        let y2: f64 = parse_number(coords[3], "y2")?;

        let label: ClassLabel = fields[6]
            .parse()
            .with_context(|| format!("invalid label '{}'", fields[6]))?;

        Ok(Some(Self {
            video_name,
            frame_second,
            rect: XYXY::new([x1, y1, x2, y2]),
            box_key: box_key(coords),
            label,
            score,
            is_ground_truth,
        }))
    }
}

/// The identity of a box within a second: its coordinate fields exactly as
/// written, joined by commas.
///
/// Boxes are merged by text, not by value, so `0.1` and `0.100` name two
/// different boxes.
pub fn box_key(coords: &[&str]) -> String {
    coords.join(",")
}

/// Parse every line of an annotation stream.
///
/// Lines are read as [AnnotationRecord::parse] reads them: whitespace around
/// the line is dropped and the fields inside are kept verbatim. Empty lines
/// are skipped. Yields `None` for each prediction below the threshold. Errors
/// carry the line number.
pub fn read_records<R>(
    reader: R,
    is_ground_truth: bool,
    detect_thresh: R64,
) -> impl Iterator<Item = Result<Option<AnnotationRecord>>>
where
    R: io::Read,
{
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader)
        .into_records()
        .map(move |result| -> Result<_> {
            let record = result?;
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            let mut fields: Vec<_> = record.iter().collect();
            if let Some(first) = fields.first_mut() {
                *first = first.trim_start();
            }
            if let Some(last) = fields.last_mut() {
                *last = last.trim_end();
            }
            AnnotationRecord::from_fields(&fields, is_ground_truth, detect_thresh)
                .with_context(|| format!("invalid annotation at line {}", line))
        })
}

fn parse_number<T>(text: &str, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.trim()
        .parse()
        .with_context(|| format!("invalid {} '{}'", name, text))
}
