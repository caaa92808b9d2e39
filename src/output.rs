use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::monte_carlo::MonteCarloSummary;
use crate::render::{color_of, PathRenderer, PathPoint, Segment, TieMarker};
use crate::BallotError;

#[derive(Debug, Clone, Serialize)]
struct PointRow {
    step: u32,
    lead: i64,
    color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct SegmentRow {
    index: usize,
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct MarkerRow {
    index: usize,
    x: f64,
}

/// Files written for one rendered path
#[derive(Debug, Clone)]
pub struct PathOutputs {
    pub points_path: PathBuf,
    pub segments_path: PathBuf,
    pub markers_path: PathBuf,
}

/// Create `root/<UTC timestamp>`, suffixing a counter if it already exists.
pub fn create_timestamped_output_dir(root: &Path) -> Result<PathBuf, BallotError> {
    fs::create_dir_all(root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

pub fn write_summary_json(path: &Path, summary: &MonteCarloSummary) -> Result<(), BallotError> {
    fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}

pub fn write_points_csv(path: &Path, points: &[PathPoint]) -> Result<(), BallotError> {
    write_rows(
        path,
        points.iter().map(|point| PointRow {
            step: point.step,
            lead: point.lead,
            color: color_of(point.lead as f64).label(),
        }),
    )
}

pub fn write_segments_csv(path: &Path, segments: &[Segment]) -> Result<(), BallotError> {
    write_rows(
        path,
        segments.iter().enumerate().map(|(index, segment)| SegmentRow {
            index,
            x0: segment.start.0,
            y0: segment.start.1,
            x1: segment.end.0,
            y1: segment.end.1,
            color: segment.color.label(),
        }),
    )
}

pub fn write_markers_csv(path: &Path, markers: &[TieMarker]) -> Result<(), BallotError> {
    write_rows(
        path,
        markers
            .iter()
            .enumerate()
            .map(|(index, marker)| MarkerRow { index, x: marker.x }),
    )
}

/// Write `points.csv`, `segments.csv` and `tie_markers.csv` into `dir`.
pub fn write_path_csvs(dir: &Path, renderer: &PathRenderer) -> Result<PathOutputs, BallotError> {
    fs::create_dir_all(dir)?;
    let outputs = PathOutputs {
        points_path: dir.join("points.csv"),
        segments_path: dir.join("segments.csv"),
        markers_path: dir.join("tie_markers.csv"),
    };

    write_points_csv(&outputs.points_path, renderer.points())?;
    write_segments_csv(&outputs.segments_path, renderer.segments())?;
    write_markers_csv(&outputs.markers_path, renderer.markers())?;
    Ok(outputs)
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<(), BallotError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::{summarize, MonteCarloConfig, MonteCarloResult};

    #[test]
    fn timestamped_dirs_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let first = create_timestamped_output_dir(root.path()).unwrap();
        let second = create_timestamped_output_dir(root.path()).unwrap();
        assert!(first.is_dir());
        assert!(second.is_dir());
        assert_ne!(first, second);
    }

    #[test]
    fn path_csvs_have_one_row_per_item() {
        let mut renderer = PathRenderer::new();
        renderer.reset(4);
        for (step, lead) in [(1, 1), (2, 0), (3, -1), (4, 0)] {
            renderer.add_point(step, lead);
        }

        let dir = tempfile::tempdir().unwrap();
        let outputs = write_path_csvs(dir.path(), &renderer).unwrap();

        let points = fs::read_to_string(&outputs.points_path).unwrap();
        assert_eq!(points.lines().count(), 1 + renderer.points().len());
        assert_eq!(points.lines().next(), Some("step,lead,color"));
        assert!(points.contains("3,-1,b_leading"));

        let segments = fs::read_to_string(&outputs.segments_path).unwrap();
        assert_eq!(segments.lines().count(), 1 + renderer.segments().len());
        assert_eq!(segments.lines().next(), Some("index,x0,y0,x1,y1,color"));

        let markers = fs::read_to_string(&outputs.markers_path).unwrap();
        assert_eq!(markers.lines().count(), 1 + renderer.markers().len());
    }

    #[test]
    fn summary_json_round_trips_fields() {
        let config = MonteCarloConfig::default();
        let result = MonteCarloResult {
            trials: 10,
            successes: 4,
            empirical: 0.4,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary_json(&path, &summarize(&config, &result)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["trials"], 10);
        assert_eq!(value["successes"], 4);
        assert_eq!(value["a"], 7);
    }
}
