use anyhow::{Context, Result};
use ava_dataset::{AvaDataset, Config, RandomAccessDataset, Split};
use clap::Parser;
use prettytable::{cell, row, Table};
use serde::Serialize;
use std::{
    env,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
/// Build and inspect AVA keyframe indexes
enum Opts {
    Info {
        /// configuration file
        config_file: PathBuf,
        /// dataset split: train, val or test
        #[clap(long, default_value = "train")]
        split: Split,
    },
    Dump {
        /// configuration file
        config_file: PathBuf,
        /// dataset split: train, val or test
        #[clap(long, default_value = "train")]
        split: Split,
        /// output JSON lines file, stdout if not set
        #[clap(long)]
        output_file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Serialize)]
struct KeyframeRecord<'a> {
    position: usize,
    video_index: usize,
    video_name: &'a str,
    frame_second: i64,
    boxes: Vec<BoxRecord>,
}

#[derive(Debug, Clone, Serialize)]
struct BoxRecord {
    xyxy: [f64; 4],
    labels: Vec<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match Opts::parse() {
        Opts::Info { config_file, split } => {
            info(config_file, split).await?;
        }
        Opts::Dump {
            config_file,
            split,
            output_file,
        } => {
            dump(config_file, split, output_file).await?;
        }
    }

    Ok(())
}

async fn load(config_file: impl AsRef<Path>, split: Split) -> Result<AvaDataset> {
    let config_file = config_file.as_ref();
    let config = Arc::new(
        Config::open(config_file)
            .with_context(|| format!("failed to load config file '{}'", config_file.display()))?,
    );
    AvaDataset::load(config, split).await
}

async fn info(config_file: impl AsRef<Path>, split: Split) -> Result<()> {
    let dataset = load(config_file, split).await?;
    let index = dataset.index();

    // count keyframes and boxes per video
    let mut counts = vec![(0usize, 0usize); index.num_videos()];
    index.iter().for_each(|keyframe| {
        let (num_keyframes, num_boxes) = &mut counts[keyframe.descriptor.video_index];
        *num_keyframes += 1;
        *num_boxes += keyframe.boxes.len();
    });

    {
        let mut table = Table::new();
        table.add_row(row!["index", "video", "path", "keyframes", "boxes"]);

        index
            .video_names()
            .iter()
            .zip(&counts)
            .enumerate()
            .for_each(|(video_index, (name, (num_keyframes, num_boxes)))| {
                let path = index
                    .video_path(video_index)
                    .map(|path| format!("{}", path.display()))
                    .unwrap_or_default();
                table.add_row(row![video_index, name, path, num_keyframes, num_boxes]);
            });

        table.printstd();
    }

    {
        let stats = index.statistics();
        let mut table = Table::new();
        table.add_row(row!["lines", stats.num_lines]);
        table.add_row(row!["below threshold", stats.below_threshold]);
        table.add_row(row!["subsampled", stats.subsampled]);
        table.add_row(row!["out of window", stats.out_of_window]);
        table.add_row(row!["unique boxes", stats.unique_boxes]);
        table.add_row(row!["annotations", stats.annotations]);
        table.add_row(row!["keyframes", index.num_keyframes()]);
        table.add_row(row!["boxes used", index.num_boxes_used()]);
        table.printstd();
    }

    Ok(())
}

async fn dump(
    config_file: impl AsRef<Path>,
    split: Split,
    output_file: Option<PathBuf>,
) -> Result<()> {
    let dataset = load(config_file, split).await?;

    let mut writer: Box<dyn Write> = match &output_file {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file '{}'", path.display())
        })?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    for position in 0..dataset.num_records() {
        let keyframe = dataset.nth(position)?;
        let record = KeyframeRecord {
            position,
            video_index: keyframe.descriptor.video_index,
            video_name: keyframe.video_name,
            frame_second: keyframe.descriptor.frame_second,
            boxes: keyframe
                .boxes
                .iter()
                .map(|entry| BoxRecord {
                    xyxy: entry.rect.xyxy(),
                    labels: entry.classes.iter().map(|class| class.id()).collect(),
                })
                .collect(),
        };
        serde_json::to_writer(&mut writer, &record)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    info!("wrote {} keyframes", dataset.num_records());
    Ok(())
}
