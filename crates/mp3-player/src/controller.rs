//! Track controller: maps transport intents onto engine operations.
//!
//! Keeps two indices apart: `selected` is the UI cursor, `current` is the
//! track the engine actually holds. `current` only moves after a successful
//! load; a track that fails to decode never becomes current.

use crate::decode::{SymphoniaDecoder, TrackDecoder};
use crate::engine::PlaybackEngine;
use crate::error::PlaybackError;
use crate::library::TrackLibrary;
use crate::status::PlayerStatus;

pub struct TrackController<D = SymphoniaDecoder> {
    library: TrackLibrary,
    decoder: D,
    engine: PlaybackEngine,
    selected: usize,
    current: Option<usize>,
}

impl<D: TrackDecoder> TrackController<D> {
    pub fn new(library: TrackLibrary, decoder: D, engine: PlaybackEngine) -> Self {
        Self {
            library,
            decoder,
            engine,
            selected: 0,
            current: None,
        }
    }

    /// Stop whatever plays, then decode, load and start the selected track.
    pub fn change_track(&mut self) -> Result<(), PlaybackError> {
        self.engine.stop();

        let index = self.selected;
        let Some(path) = self.library.path(index) else {
            tracing::warn!(index, "no track to play");
            return Err(PlaybackError::NoTracks);
        };

        tracing::info!(index, path = ?path, "loading track");
        let audio = match self.decoder.decode(&path) {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(index, "load failed: {e}");
                return Err(e.into());
            }
        };

        self.engine.load(audio)?;
        self.current = Some(index);

        if let Err(e) = self.engine.start() {
            tracing::error!(index, "start playback failed: {e}");
            return Err(e);
        }
        Ok(())
    }

    /// Start the selected track when idle, resume when paused, otherwise nothing.
    pub fn play_button_pressed(&mut self) -> Result<(), PlaybackError> {
        if !self.engine.is_playing() {
            self.change_track()
        } else {
            if self.engine.is_paused() {
                self.engine.resume();
            }
            Ok(())
        }
    }

    pub fn pause_button_pressed(&mut self) {
        if !self.engine.is_paused() {
            self.engine.pause();
        }
    }

    /// Move the cursor forward and play it. No-op on the last track.
    pub fn next(&mut self) -> Result<(), PlaybackError> {
        if self.selected + 1 >= self.library.len() {
            return Ok(());
        }
        self.selected += 1;
        self.change_track()
    }

    /// Move the cursor back and play it. No-op on the first track.
    pub fn previous(&mut self) -> Result<(), PlaybackError> {
        if self.selected == 0 || self.library.is_empty() {
            return Ok(());
        }
        self.selected -= 1;
        self.change_track()
    }

    /// Move the cursor without touching playback. Clamped to the list.
    pub fn select(&mut self, index: usize) -> usize {
        self.selected = index.min(self.library.len().saturating_sub(1));
        self.selected
    }

    pub fn select_next(&mut self) -> usize {
        self.select(self.selected.saturating_add(1))
    }

    pub fn select_prev(&mut self) -> usize {
        self.select(self.selected.saturating_sub(1))
    }

    /// Stop the current session and unload the track.
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Set volume from a 0.0..=1.0 user scalar.
    pub fn set_volume(&mut self, scalar: f32) {
        if scalar.is_nan() {
            return;
        }
        self.engine.set_volume(scalar.clamp(0.0, 1.0));
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn library(&self) -> &TrackLibrary {
        &self.library
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.engine.is_paused()
    }

    pub fn status(&self) -> PlayerStatus {
        let info = self.engine.track_info();
        PlayerStatus {
            state: self.engine.state(),
            selected_index: self.selected,
            current_index: self.current,
            now_playing: info
                .and(self.current)
                .and_then(|i| self.library.name(i))
                .map(str::to_string),
            volume: self.engine.volume(),
            position_frames: self.engine.position_frames(),
            sample_rate: info.map(|i| i.sample_rate),
            channels: info.map(|i| i.channels),
            duration_ms: info.and_then(|i| i.duration_ms()),
            codec: info.and_then(|i| i.codec.clone()),
            end_reason: self.engine.end_reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineState;
    use crate::error::DecodeError;
    use crate::test_support::{RecordingOutput, ScriptedDecoder, ramp, test_config};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn library(names: &[&str]) -> TrackLibrary {
        TrackLibrary::from_names(
            Path::new("/music"),
            names.iter().map(|n| n.to_string()).collect(),
        )
    }

    fn controller(
        names: &[&str],
        decoder: ScriptedDecoder,
        out: &RecordingOutput,
    ) -> TrackController<ScriptedDecoder> {
        let engine = PlaybackEngine::new(Arc::new(out.clone()), test_config());
        TrackController::new(library(names), decoder, engine)
    }

    #[test]
    fn failed_next_keeps_current_and_leaves_silence() {
        let out = RecordingOutput::gated();
        let decoder = ScriptedDecoder::new().track("a.mp3", ramp(5_000, 2, 44_100));
        let mut ctl = controller(&["a.mp3", "b.mp3"], decoder, &out);

        ctl.play_button_pressed().unwrap();
        assert_eq!(ctl.current_index(), Some(0));
        assert_eq!(ctl.engine().state(), EngineState::Playing);

        let err = ctl.next().unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(DecodeError::Empty { .. })));
        assert_eq!(ctl.selected_index(), 1);
        assert_eq!(ctl.current_index(), Some(0));
        assert_eq!(ctl.engine().state(), EngineState::Idle);
        assert_eq!(out.closed_count(), 1);
        assert_eq!(out.opened().len(), 1);
        assert!(ctl.status().now_playing.is_none());
    }

    #[test]
    fn change_track_then_stop_releases_buffer() {
        let out = RecordingOutput::gated();
        let decoder = ScriptedDecoder::new()
            .track("a.mp3", ramp(1_000, 2, 44_100))
            .track("b.mp3", ramp(1_000, 1, 22_050));
        let mut ctl = controller(&["a.mp3", "b.mp3"], decoder, &out);

        for i in 0..2 {
            ctl.select(i);
            ctl.change_track().unwrap();
            assert_eq!(ctl.current_index(), Some(i));
            ctl.stop();
            assert_eq!(ctl.engine().state(), EngineState::Idle);
            assert!(ctl.engine().track_info().is_none());
        }
        assert_eq!(out.closed_count(), 2);
    }

    #[test]
    fn next_and_previous_stay_in_bounds() {
        let out = RecordingOutput::gated();
        let decoder = ScriptedDecoder::new()
            .track("a.mp3", ramp(100, 1, 8_000))
            .track("b.mp3", ramp(100, 1, 8_000));
        let mut ctl = controller(&["a.mp3", "b.mp3"], decoder, &out);

        ctl.previous().unwrap();
        assert_eq!(ctl.selected_index(), 0);
        assert!(ctl.decoder.calls().is_empty());

        ctl.next().unwrap();
        assert_eq!(ctl.selected_index(), 1);
        assert_eq!(ctl.current_index(), Some(1));

        ctl.next().unwrap();
        assert_eq!(ctl.selected_index(), 1);
        assert_eq!(ctl.decoder.calls().len(), 1);

        ctl.previous().unwrap();
        assert_eq!(ctl.selected_index(), 0);
        assert_eq!(ctl.current_index(), Some(0));
        assert_eq!(
            ctl.decoder.calls(),
            vec![PathBuf::from("/music/b.mp3"), PathBuf::from("/music/a.mp3")]
        );
    }

    #[test]
    fn play_button_resumes_or_ignores() {
        let out = RecordingOutput::gated();
        let decoder = ScriptedDecoder::new().track("a.mp3", ramp(5_000, 2, 44_100));
        let mut ctl = controller(&["a.mp3"], decoder, &out);

        ctl.play_button_pressed().unwrap();
        ctl.play_button_pressed().unwrap();
        assert_eq!(ctl.decoder.calls().len(), 1);
        assert_eq!(out.opened().len(), 1);

        ctl.pause_button_pressed();
        assert!(ctl.is_paused());
        ctl.pause_button_pressed();
        assert!(ctl.is_paused());

        ctl.play_button_pressed().unwrap();
        assert!(ctl.is_playing());
        assert!(!ctl.is_paused());
        assert_eq!(ctl.decoder.calls().len(), 1);
        ctl.stop();
    }

    #[test]
    fn play_button_after_stop_reloads_selected() {
        let out = RecordingOutput::gated();
        let decoder = ScriptedDecoder::new().track("a.mp3", ramp(5_000, 2, 44_100));
        let mut ctl = controller(&["a.mp3"], decoder, &out);

        ctl.play_button_pressed().unwrap();
        ctl.stop();
        ctl.play_button_pressed().unwrap();
        assert_eq!(ctl.decoder.calls().len(), 2);
        assert_eq!(ctl.engine().state(), EngineState::Playing);
    }

    #[test]
    fn decode_failure_on_first_play_commits_nothing() {
        let out = RecordingOutput::new();
        let mut ctl = controller(&["broken.mp3"], ScriptedDecoder::new(), &out);

        assert!(ctl.play_button_pressed().is_err());
        assert_eq!(ctl.current_index(), None);
        assert_eq!(ctl.engine().state(), EngineState::Idle);
        assert!(out.opened().is_empty());
    }

    #[test]
    fn device_failure_still_commits_loaded_track() {
        let out = RecordingOutput::new();
        out.fail_next_open();
        let decoder = ScriptedDecoder::new().track("a.mp3", ramp(100, 2, 44_100));
        let mut ctl = controller(&["a.mp3"], decoder, &out);

        let err = ctl.change_track().unwrap_err();
        assert!(matches!(err, PlaybackError::Device(_)));
        assert_eq!(ctl.current_index(), Some(0));
        assert_eq!(ctl.engine().state(), EngineState::Loaded);
    }

    #[test]
    fn empty_library_is_usable() {
        let out = RecordingOutput::new();
        let mut ctl = controller(&[], ScriptedDecoder::new(), &out);

        assert!(matches!(ctl.play_button_pressed(), Err(PlaybackError::NoTracks)));
        ctl.next().unwrap();
        ctl.previous().unwrap();
        ctl.pause_button_pressed();
        assert_eq!(ctl.select(5), 0);
        assert_eq!(ctl.engine().state(), EngineState::Idle);
    }

    #[test]
    fn select_moves_cursor_only() {
        let out = RecordingOutput::new();
        let mut ctl = controller(&["a.mp3", "b.mp3", "c.mp3"], ScriptedDecoder::new(), &out);

        assert_eq!(ctl.select(10), 2);
        assert_eq!(ctl.select_next(), 2);
        assert_eq!(ctl.select_prev(), 1);
        assert_eq!(ctl.select(0), 0);
        assert_eq!(ctl.select_prev(), 0);
        assert!(ctl.decoder.calls().is_empty());
        assert_eq!(ctl.current_index(), None);
    }

    #[test]
    fn set_volume_clamps_user_scalar() {
        let out = RecordingOutput::new();
        let mut ctl = controller(&["a.mp3"], ScriptedDecoder::new(), &out);

        ctl.set_volume(0.3);
        assert_eq!(ctl.volume(), 0.3);
        ctl.set_volume(1.5);
        assert_eq!(ctl.volume(), 1.0);
        ctl.set_volume(-1.0);
        assert_eq!(ctl.volume(), 0.0);
        ctl.set_volume(f32::NAN);
        assert_eq!(ctl.volume(), 0.0);
    }

    #[test]
    fn status_reports_current_track() {
        let out = RecordingOutput::gated();
        let decoder = ScriptedDecoder::new().track("b.mp3", ramp(48_000, 2, 48_000).with_codec("MP3"));
        let mut ctl = controller(&["a.mp3", "b.mp3"], decoder, &out);

        ctl.select(1);
        ctl.change_track().unwrap();
        ctl.select(0);

        let status = ctl.status();
        assert_eq!(status.selected_index, 0);
        assert_eq!(status.current_index, Some(1));
        assert_eq!(status.now_playing.as_deref(), Some("b.mp3"));
        assert_eq!(status.duration_ms, Some(1000));
        assert_eq!(status.channels, Some(2));
        assert_eq!(status.codec.as_deref(), Some("MP3"));
        assert_eq!(status.state, EngineState::Playing);
        ctl.stop();
    }
}
