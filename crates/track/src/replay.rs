use std::f32::consts::TAU;

use glam::{Mat4, Vec3};
use markerview_common::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::{CameraCalibration, DetectionMode, MarkerDetector, MarkerObservation, Pattern, PatternId, TrackError};

fn default_near() -> f64 {
    0.1
}

fn default_far() -> f64 {
    1000.0
}

fn default_confidence() -> f32 {
    1.0
}

/// A marker entry in a recorded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMarker {
    pub pattern: u32,
    /// Column-major 4x4 marker pose.
    pub pose: [f32; 16],
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(default)]
    pub markers: Vec<ReplayMarker>,
}

/// Recorded detection results, played back one frame per `detect` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTrack {
    #[serde(default = "default_near")]
    pub near: f64,
    #[serde(default = "default_far")]
    pub far: f64,
    #[serde(default)]
    pub frames: Vec<ReplayFrame>,
}

impl Default for ReplayTrack {
    fn default() -> Self {
        Self {
            near: default_near(),
            far: default_far(),
            frames: Vec::new(),
        }
    }
}

impl ReplayTrack {
    pub fn from_json(text: &str) -> Result<Self, TrackError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, TrackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A generated track: pattern 0 seen for `visible` frames while the
    /// camera circles it, then lost for `hidden` frames.
    pub fn orbit(visible: usize, hidden: usize) -> Self {
        let mut frames = Vec::with_capacity(visible + hidden);
        for i in 0..visible {
            let angle = TAU * i as f32 / visible.max(1) as f32;
            let pose = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
                * Mat4::from_rotation_x(-0.6)
                * Mat4::from_rotation_y(angle);
            frames.push(ReplayFrame {
                markers: vec![ReplayMarker {
                    pattern: 0,
                    pose: pose.to_cols_array(),
                    confidence: 1.0,
                }],
            });
        }
        frames.extend(std::iter::repeat_with(ReplayFrame::default).take(hidden));
        Self {
            frames,
            ..Self::default()
        }
    }
}

/// Detector backend that replays a [`ReplayTrack`], looping at the end.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    track: ReplayTrack,
    cursor: usize,
    patterns: u32,
    mode: Option<DetectionMode>,
}

impl ReplayDetector {
    pub fn new(track: ReplayTrack) -> Self {
        Self {
            track,
            cursor: 0,
            patterns: 0,
            mode: None,
        }
    }

    pub fn mode(&self) -> Option<DetectionMode> {
        self.mode
    }
}

impl MarkerDetector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn init(&mut self, calibration: &CameraCalibration, mode: DetectionMode) -> Result<Mat4, TrackError> {
        if self.track.near <= 0.0 || self.track.far <= self.track.near {
            return Err(TrackError::Detector(format!(
                "invalid clip range {}..{}",
                self.track.near, self.track.far
            )));
        }
        self.mode = Some(mode);
        self.cursor = 0;
        tracing::debug!(frames = self.track.frames.len(), ?mode, "replay detector ready");
        Ok(calibration.projection(self.track.near, self.track.far))
    }

    fn load_pattern(&mut self, pattern: &Pattern) -> Result<PatternId, TrackError> {
        let id = PatternId(self.patterns);
        self.patterns += 1;
        tracing::debug!(?id, resolution = pattern.resolution, "pattern loaded");
        Ok(id)
    }

    fn detect(&mut self, _frame: &VideoFrame) -> Vec<MarkerObservation> {
        if self.track.frames.is_empty() {
            return Vec::new();
        }
        let frame = &self.track.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.track.frames.len();
        frame
            .markers
            .iter()
            .filter(|m| m.pattern < self.patterns)
            .map(|m| MarkerObservation {
                pattern: PatternId(m.pattern),
                pose: Mat4::from_cols_array(&m.pose),
                confidence: m.confidence,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Pattern {
        Pattern {
            resolution: 1,
            data: vec![0; 12],
        }
    }

    fn frame() -> VideoFrame {
        VideoFrame::solid(1, 1, [0, 0, 0, 255], 0)
    }

    #[test]
    fn replays_and_loops() {
        let mut d = ReplayDetector::new(ReplayTrack::orbit(2, 1));
        d.init(&CameraCalibration::nominal_640x480(), DetectionMode::Mono).unwrap();
        d.load_pattern(&pattern()).unwrap();

        let counts: Vec<usize> = (0..6).map(|_| d.detect(&frame()).len()).collect();
        assert_eq!(counts, vec![1, 1, 0, 1, 1, 0]);
    }

    #[test]
    fn unknown_patterns_are_ignored() {
        let mut d = ReplayDetector::new(ReplayTrack::orbit(1, 0));
        d.init(&CameraCalibration::nominal_640x480(), DetectionMode::Mono).unwrap();
        // No pattern loaded yet.
        assert!(d.detect(&frame()).is_empty());
    }

    #[test]
    fn empty_track_detects_nothing() {
        let mut d = ReplayDetector::new(ReplayTrack::default());
        assert!(d.detect(&frame()).is_empty());
    }

    #[test]
    fn invalid_clip_range_fails_init() {
        let track = ReplayTrack {
            near: 10.0,
            far: 1.0,
            frames: Vec::new(),
        };
        let mut d = ReplayDetector::new(track);
        assert!(d.init(&CameraCalibration::nominal_640x480(), DetectionMode::Mono).is_err());
    }

    #[test]
    fn parses_json_with_defaults() {
        let json = r#"{"frames":[{"markers":[{"pattern":0,"pose":[1,0,0,0,0,1,0,0,0,0,1,0,0,0,-5,1]}]},{}]}"#;
        let track = ReplayTrack::from_json(json).unwrap();
        assert_eq!(track.frames.len(), 2);
        assert_eq!(track.near, 0.1);
        assert_eq!(track.frames[0].markers[0].confidence, 1.0);
        assert!(track.frames[1].markers.is_empty());
    }

    #[test]
    fn malformed_json_is_a_track_error() {
        assert!(matches!(ReplayTrack::from_json("{"), Err(TrackError::Track(_))));
    }
}
