//! Video file lookup by name.

use crate::{
    common::*,
    config::{Split, VideoConfig},
};
use std::collections::HashMap;

/// How to treat several files that share a video name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathResolution {
    /// Take the first file in listing order and warn.
    FirstMatch,
    /// Reject the configuration.
    Strict,
}

impl Default for PathResolution {
    fn default() -> Self {
        Self::FirstMatch
    }
}

/// Lists the candidate video files of a split.
pub trait VideoDirectory {
    fn list(&self, split: Split, config: &VideoConfig) -> Result<Vec<PathBuf>>;
}

/// Lists video files on the local file system, sorted by file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsVideoDirectory;

impl VideoDirectory for FsVideoDirectory {
    fn list(&self, split: Split, config: &VideoConfig) -> Result<Vec<PathBuf>> {
        let dir = config.dir(split);
        ensure!(
            dir.is_dir(),
            "the video directory '{}' does not exist",
            dir.display()
        );

        let dir_text = dir
            .to_str()
            .ok_or_else(|| format_err!("non-UTF-8 path '{}'", dir.display()))?;
        let pattern = format!("{}/*", glob::Pattern::escape(dir_text));
        let files: Vec<PathBuf> = glob::glob(&pattern)?.try_collect()?;

        debug!("found {} files in '{}'", files.len(), dir.display());
        Ok(files)
    }
}

/// The name a video file is matched by: its file name up to the first dot.
pub fn video_stem(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    file_name.split('.').next()
}

/// Map every video name to the file whose stem equals the name.
///
/// A name without a file is an error. A name with several files follows
/// `policy`.
pub fn resolve_video_paths<'a, I>(
    video_names: I,
    files: &[PathBuf],
    policy: PathResolution,
) -> Result<IndexMap<String, PathBuf>>
where
    I: IntoIterator<Item = &'a str>,
{
    let candidates: HashMap<&str, Vec<&PathBuf>> = files
        .iter()
        .filter_map(|path| Some((video_stem(path)?, path)))
        .into_group_map();

    video_names
        .into_iter()
        .map(|video_name| -> Result<_> {
            let matches = candidates
                .get(video_name)
                .map(|paths| paths.as_slice())
                .unwrap_or(&[]);

            let path = match (matches, policy) {
                ([], _) => bail!("no video file found for '{}'", video_name),
                ([path], _) => path,
                ([path, ..], PathResolution::FirstMatch) => {
                    warn!(
                        "{} files match video '{}', use '{}'",
                        matches.len(),
                        video_name,
                        path.display()
                    );
                    path
                }
                (_, PathResolution::Strict) => bail!(
                    "{} files match video '{}': {:?}",
                    matches.len(),
                    video_name,
                    matches
                ),
            };

            Ok((video_name.to_owned(), path.to_path_buf()))
        })
        .try_collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| Path::new("/videos").join(name))
            .collect()
    }

    #[test]
    fn stem_stops_at_first_dot() {
        assert_eq!(video_stem(Path::new("/a/-5KQ66BBWC4.mkv")), Some("-5KQ66BBWC4"));
        assert_eq!(video_stem(Path::new("/a/clip.part.mp4")), Some("clip"));
        assert_eq!(video_stem(Path::new("/a/noext")), Some("noext"));
    }

    #[test]
    fn resolve_unique_names() {
        let files = files(&["b.mp4", "a.mkv", "c.webm"]);
        let paths =
            resolve_video_paths(["a", "b"], &files, PathResolution::FirstMatch).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths["a"], Path::new("/videos/a.mkv"));
        assert_eq!(paths["b"], Path::new("/videos/b.mp4"));
        assert_eq!(paths.get_index(0).unwrap().0, "a");
    }

    #[test]
    fn missing_video_is_an_error() {
        let files = files(&["a.mkv"]);
        assert!(resolve_video_paths(["a", "b"], &files, PathResolution::FirstMatch).is_err());
    }

    #[test]
    fn prefix_is_not_a_match() {
        let files = files(&["ab.mkv"]);
        assert!(resolve_video_paths(["a"], &files, PathResolution::FirstMatch).is_err());
    }

    #[test]
    fn ambiguous_names_follow_policy() {
        let files = files(&["a.mkv", "a.mp4"]);

        let paths = resolve_video_paths(["a"], &files, PathResolution::FirstMatch).unwrap();
        assert_eq!(paths["a"], Path::new("/videos/a.mkv"));

        assert!(resolve_video_paths(["a"], &files, PathResolution::Strict).is_err());
    }
}
