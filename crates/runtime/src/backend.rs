use markerview_common::ResourceBase;
use markerview_track::{MarkerDetector, ReplayDetector, ReplayTrack, TrackError};

/// Frames in the generated orbit used when no track is configured.
const DEMO_VISIBLE_FRAMES: usize = 240;
const DEMO_HIDDEN_FRAMES: usize = 60;

/// Build the detector backend. A configured track is loaded and replayed;
/// otherwise a generated orbit stands in.
pub fn open_detector(track_url: Option<&str>, base: &ResourceBase) -> Result<Box<dyn MarkerDetector>, TrackError> {
    let track = match track_url {
        Some(url) => {
            let text = base.read_to_string(url)?;
            let track = ReplayTrack::from_json(&text)?;
            tracing::info!(track = url, frames = track.frames.len(), "replay track loaded");
            track
        }
        None => {
            tracing::info!("no track configured, replaying generated orbit");
            ReplayTrack::orbit(DEMO_VISIBLE_FRAMES, DEMO_HIDDEN_FRAMES)
        }
    };
    Ok(Box::new(ReplayDetector::new(track)))
}
