//! Lead path rendering
//!
//! Turns the running lead of a count into colored line segments. A segment
//! takes the color of the candidate ahead on it; where the lead touches or
//! crosses zero the path is split exactly at the crossing and a tie marker is
//! recorded so a display can draw a guide line there.

use serde::Serialize;

/// Smallest vertical half-range after a rescale
const MIN_Y_BOUND: f64 = 5.0;
/// Growth factor applied when the lead nears the vertical bound
const Y_GROWTH: f64 = 1.3;
/// Smallest horizontal range once points start arriving
const MIN_X_MAX: f64 = 10.0;

/// Color class of a point or segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadColor {
    ALeading,
    BLeading,
    Tie,
}

impl LeadColor {
    pub fn label(self) -> &'static str {
        match self {
            Self::ALeading => "a_leading",
            Self::BLeading => "b_leading",
            Self::Tie => "tie",
        }
    }
}

/// Color class of a lead value
pub fn color_of(lead: f64) -> LeadColor {
    if lead > 0.0 {
        LeadColor::ALeading
    } else if lead < 0.0 {
        LeadColor::BLeading
    } else {
        LeadColor::Tie
    }
}

/// One sampled point of the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathPoint {
    pub step: u32,
    pub lead: i64,
}

impl PathPoint {
    pub fn new(step: u32, lead: i64) -> Self {
        Self { step, lead }
    }

    fn xy(self) -> (f64, f64) {
        (f64::from(self.step), self.lead as f64)
    }
}

/// A straight colored piece of the path
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub color: LeadColor,
}

/// Horizontal position where the path touches or crosses zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TieMarker {
    pub x: f64,
}

/// Visible domain: `[0, x_max]` by `[-y_bound, y_bound]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub x_max: f64,
    pub y_bound: f64,
}

impl AxisBounds {
    /// Domain sized for a count of `expected_steps` ballots
    pub fn for_steps(expected_steps: u32) -> Self {
        Self {
            x_max: f64::from(expected_steps.max(1)),
            y_bound: f64::from((expected_steps / 2).max(1)),
        }
    }
}

impl Default for AxisBounds {
    fn default() -> Self {
        Self::for_steps(1)
    }
}

/// Display surface fed by the animation.
pub trait PathSink {
    /// Start a new path for a count of `expected_steps` ballots
    fn reset(&mut self, expected_steps: u32);

    /// Append the lead after `step` ballots
    fn add_point(&mut self, step: u32, lead: i64);
}

/// Incremental segment builder for a lead path
#[derive(Debug, Clone)]
pub struct PathRenderer {
    points: Vec<PathPoint>,
    segments: Vec<Segment>,
    markers: Vec<TieMarker>,
    bounds: AxisBounds,
}

impl PathRenderer {
    /// Create a renderer holding only the origin
    pub fn new() -> Self {
        Self {
            points: vec![PathPoint::new(0, 0)],
            segments: Vec::new(),
            markers: Vec::new(),
            bounds: AxisBounds::default(),
        }
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn markers(&self) -> &[TieMarker] {
        &self.markers
    }

    pub fn bounds(&self) -> AxisBounds {
        self.bounds
    }

    /// Point colors in point order (blue/red/gray in a typical display)
    pub fn point_colors(&self) -> impl Iterator<Item = LeadColor> + '_ {
        self.points.iter().map(|p| color_of(p.lead as f64))
    }

    /// Clear the history and size the axes for `expected_steps` ballots
    pub fn reset(&mut self, expected_steps: u32) {
        self.points.clear();
        self.points.push(PathPoint::new(0, 0));
        self.segments.clear();
        self.markers.clear();
        self.bounds = AxisBounds::for_steps(expected_steps);
    }

    /// Append a point and emit the geometry joining it to the previous one
    pub fn add_point(&mut self, step: u32, lead: i64) {
        let previous = self.points.last().copied();
        let point = PathPoint::new(step, lead);
        self.points.push(point);

        if let Some(previous) = previous {
            self.connect(previous, point);
        }

        self.rescale(step, lead);
    }

    fn connect(&mut self, from: PathPoint, to: PathPoint) {
        let (x0, y0) = from.xy();
        let (x1, y1) = to.xy();

        match (color_of(y0), color_of(y1)) {
            // Same side of zero, or resting on it
            (c0, c1) if c0 == c1 => self.push_segment((x0, y0), (x1, y1), c0),
            // Leaving a tie
            (LeadColor::Tie, c1) => {
                self.push_segment((x0, y0), (x1, y1), c1);
                self.markers.push(TieMarker { x: x0 });
            }
            // Arriving at a tie
            (c0, LeadColor::Tie) => {
                self.push_segment((x0, y0), (x1, y1), c0);
                self.markers.push(TieMarker { x: x1 });
            }
            // Opposite signs: split at the interpolated crossing
            (c0, c1) => {
                let xc = x0 + (0.0 - y0) / (y1 - y0) * (x1 - x0);
                self.push_segment((x0, y0), (xc, 0.0), c0);
                self.push_segment((xc, 0.0), (x1, y1), c1);
                self.markers.push(TieMarker { x: xc });
            }
        }
    }

    fn push_segment(&mut self, start: (f64, f64), end: (f64, f64), color: LeadColor) {
        self.segments.push(Segment { start, end, color });
    }

    fn rescale(&mut self, step: u32, lead: i64) {
        let magnitude = lead.unsigned_abs() as f64;
        if magnitude >= self.bounds.y_bound - 1.0 {
            self.bounds.y_bound = MIN_Y_BOUND.max(Y_GROWTH * magnitude.max(self.bounds.y_bound));
        }

        let x_target = MIN_X_MAX.max(f64::from(step) + 1.0);
        self.bounds.x_max = self.bounds.x_max.max(x_target);
    }
}

impl Default for PathRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PathSink for PathRenderer {
    fn reset(&mut self, expected_steps: u32) {
        PathRenderer::reset(self, expected_steps);
    }

    fn add_point(&mut self, step: u32, lead: i64) {
        PathRenderer::add_point(self, step, lead);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn renderer_from(points: &[(u32, i64)]) -> PathRenderer {
        let mut renderer = PathRenderer::new();
        renderer.reset(points.len() as u32);
        for &(step, lead) in points {
            renderer.add_point(step, lead);
        }
        renderer
    }

    #[test]
    fn test_reset_seeds_origin_and_bounds() {
        let mut renderer = renderer_from(&[(1, 1), (2, 0)]);
        renderer.reset(10);
        assert_eq!(renderer.points(), &[PathPoint::new(0, 0)]);
        assert!(renderer.segments().is_empty());
        assert!(renderer.markers().is_empty());
        assert_eq!(
            renderer.bounds(),
            AxisBounds {
                x_max: 10.0,
                y_bound: 5.0
            }
        );

        renderer.reset(0);
        assert_eq!(
            renderer.bounds(),
            AxisBounds {
                x_max: 1.0,
                y_bound: 1.0
            }
        );

        renderer.reset(7);
        assert_eq!(renderer.bounds().y_bound, 3.0);
    }

    #[test]
    fn test_same_sign_single_segment() {
        let renderer = renderer_from(&[(1, 1), (2, 2), (3, -1), (4, -2)]);
        let colors: Vec<_> = renderer.segments().iter().map(|s| s.color).collect();
        // origin->1 leaves a tie, 1->2 stays positive, 2->3 crosses, 3->4 stays negative
        assert_eq!(
            colors,
            vec![
                LeadColor::ALeading,
                LeadColor::ALeading,
                LeadColor::ALeading,
                LeadColor::BLeading,
                LeadColor::BLeading,
            ]
        );
        assert_eq!(renderer.segments()[1].start, (1.0, 1.0));
        assert_eq!(renderer.segments()[1].end, (2.0, 2.0));
    }

    #[test]
    fn test_tie_to_tie_is_gray_without_marker() {
        let mut renderer = PathRenderer::new();
        renderer.reset(4);
        renderer.add_point(1, 0);
        assert_eq!(renderer.segments().len(), 1);
        assert_eq!(renderer.segments()[0].color, LeadColor::Tie);
        assert!(renderer.markers().is_empty());
    }

    #[test]
    fn test_touching_zero_marks_zero_endpoint() {
        let renderer = renderer_from(&[(1, -1), (2, 0)]);
        assert_eq!(renderer.segments()[0].color, LeadColor::BLeading);
        assert_eq!(renderer.segments()[1].color, LeadColor::BLeading);
        assert_eq!(
            renderer.markers(),
            &[TieMarker { x: 0.0 }, TieMarker { x: 2.0 }]
        );
    }

    #[test]
    fn test_crossing_splits_at_interpolated_zero() {
        let mut renderer = PathRenderer::new();
        renderer.reset(2);
        // Replace the origin-anchored start with a positive lead at x=0.
        renderer.points.clear();
        renderer.points.push(PathPoint::new(0, 1));
        renderer.add_point(1, -1);

        let segments = renderer.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, (0.0, 1.0));
        assert_eq!(segments[0].end, (0.5, 0.0));
        assert_eq!(segments[0].color, LeadColor::ALeading);
        assert_eq!(segments[1].start, (0.5, 0.0));
        assert_eq!(segments[1].end, (1.0, -1.0));
        assert_eq!(segments[1].color, LeadColor::BLeading);
        assert_eq!(renderer.markers(), &[TieMarker { x: 0.5 }]);
    }

    #[test]
    fn test_uneven_crossing() {
        let renderer = renderer_from(&[(1, 3), (3, -1)]);
        // From (1,3) to (3,-1) the zero is three quarters of the way.
        assert_eq!(renderer.segments()[1].end, (2.5, 0.0));
        assert_eq!(renderer.markers().last(), Some(&TieMarker { x: 2.5 }));
    }

    #[test]
    fn test_vertical_bound_grows_near_edge() {
        let mut renderer = PathRenderer::new();
        renderer.reset(20);
        assert_eq!(renderer.bounds().y_bound, 10.0);
        renderer.add_point(1, 1);
        assert_eq!(renderer.bounds().y_bound, 10.0);
        renderer.add_point(9, 9);
        assert!((renderer.bounds().y_bound - 13.0).abs() < 1e-9);
        renderer.add_point(10, -12);
        assert!((renderer.bounds().y_bound - 16.9).abs() < 1e-9);
    }

    #[test]
    fn test_small_domain_grows_to_minimum() {
        let mut renderer = PathRenderer::new();
        renderer.reset(2);
        renderer.add_point(1, 1);
        assert_eq!(
            renderer.bounds(),
            AxisBounds {
                x_max: 10.0,
                y_bound: 5.0
            }
        );
        renderer.add_point(12, 2);
        assert_eq!(renderer.bounds().x_max, 13.0);
    }

    #[test]
    fn test_horizontal_bound_keeps_expected_length() {
        let mut renderer = PathRenderer::new();
        renderer.reset(40);
        renderer.add_point(1, 1);
        assert_eq!(renderer.bounds().x_max, 40.0);
    }

    #[test]
    fn test_point_colors() {
        let renderer = renderer_from(&[(1, 1), (2, 0), (3, -1)]);
        let colors: Vec<_> = renderer.point_colors().collect();
        assert_eq!(
            colors,
            vec![
                LeadColor::Tie,
                LeadColor::ALeading,
                LeadColor::Tie,
                LeadColor::BLeading
            ]
        );
    }

    fn walk() -> impl Strategy<Value = Vec<i64>> {
        prop::collection::vec(prop_oneof![Just(1_i64), Just(-1_i64)], 1..120).prop_map(|steps| {
            steps
                .into_iter()
                .scan(0_i64, |lead, delta| {
                    *lead += delta;
                    Some(*lead)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_segments_are_contiguous(leads in walk()) {
            let mut renderer = PathRenderer::new();
            renderer.reset(leads.len() as u32);
            for (idx, &lead) in leads.iter().enumerate() {
                renderer.add_point(idx as u32 + 1, lead);
            }

            prop_assert_eq!(renderer.points().len(), leads.len() + 1);
            let segments = renderer.segments();
            prop_assert_eq!(segments[0].start, (0.0, 0.0));
            for pair in segments.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
            let last = segments[segments.len() - 1].end;
            prop_assert_eq!(last, (leads.len() as f64, leads[leads.len() - 1] as f64));
        }

        #[test]
        fn prop_bounds_never_shrink_and_contain_path(leads in walk()) {
            let mut renderer = PathRenderer::new();
            renderer.reset(leads.len() as u32);
            let mut previous = renderer.bounds();
            for (idx, &lead) in leads.iter().enumerate() {
                renderer.add_point(idx as u32 + 1, lead);
                let bounds = renderer.bounds();
                prop_assert!(bounds.x_max >= previous.x_max);
                prop_assert!(bounds.y_bound >= previous.y_bound);
                prop_assert!(bounds.x_max > f64::from(idx as u32 + 1) - 1.0);
                prop_assert!(bounds.y_bound > lead.unsigned_abs() as f64 - 1.0);
                previous = bounds;
            }
        }

        #[test]
        fn prop_markers_sit_on_ties(leads in walk()) {
            let mut renderer = PathRenderer::new();
            renderer.reset(leads.len() as u32);
            for (idx, &lead) in leads.iter().enumerate() {
                renderer.add_point(idx as u32 + 1, lead);
            }
            for marker in renderer.markers() {
                let step = marker.x as u32;
                prop_assert_eq!(f64::from(step), marker.x);
                let point = renderer.points()[step as usize];
                prop_assert_eq!(point.lead, 0);
            }
        }
    }
}
