//! Looping playback position, gain and the user-facing volume control.

use super::decode::DecodedAudio;

/// Volume step for one key press
pub const VOLUME_STEP: f32 = 0.1;

/// User volume with a mute toggle that remembers the level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeControl {
    volume: f32,
    muted: bool,
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
        }
    }
}

impl VolumeControl {
    pub fn raise(&mut self) {
        self.volume = (self.volume + VOLUME_STEP).min(1.0);
    }

    pub fn lower(&mut self) {
        self.volume = (self.volume - VOLUME_STEP).max(0.0);
    }

    /// Silence output, or restore the set volume if already silent
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Volume level, ignoring mute
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain actually applied to the output
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

/// Playback cursor shared with the audio callback
#[derive(Debug, Clone)]
pub struct PlaybackState {
    /// Position in source frames (fractional for rate conversion)
    position: f64,
    gain: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            position: 0.0,
            gain: 1.0,
        }
    }
}

impl PlaybackState {
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Seconds into the current loop of `audio`
    pub fn elapsed_s(&self, audio: &DecodedAudio) -> f32 {
        (self.position / audio.sample_rate as f64) as f32
    }

    /// Fill an interleaved output buffer from `audio`, looping at the end.
    ///
    /// Uses nearest-sample rate conversion from the source rate to
    /// `output_rate`. The mono mix of everything written is appended to
    /// `analysis` for spectrum extraction.
    pub fn render(
        &mut self,
        audio: &DecodedAudio,
        output: &mut [f32],
        output_channels: usize,
        output_rate: u32,
        analysis: &mut Vec<f32>,
    ) {
        let frames = audio.frames();
        if frames == 0 || output_channels == 0 {
            output.fill(0.0);
            return;
        }
        let step = audio.sample_rate as f64 / output_rate as f64;

        for out_frame in output.chunks_mut(output_channels) {
            let frame = self.position as usize % frames;
            let mut mix = 0.0;
            for (ch, sample) in out_frame.iter_mut().enumerate() {
                *sample = audio.sample(frame, ch) * self.gain;
                mix += *sample;
            }
            analysis.push(mix / output_channels as f32);

            self.position += step;
            if self.position >= frames as f64 {
                self.position -= frames as f64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize, channels: usize, sample_rate: u32) -> DecodedAudio {
        DecodedAudio {
            samples: (0..frames * channels).map(|i| i as f32).collect(),
            channels,
            sample_rate,
        }
    }

    #[test]
    fn test_volume_steps_clamp() {
        let mut volume = VolumeControl::default();
        volume.raise();
        assert_eq!(volume.volume(), 1.0);
        for _ in 0..20 {
            volume.lower();
        }
        assert_eq!(volume.volume(), 0.0);
    }

    #[test]
    fn test_mute_remembers_volume() {
        let mut volume = VolumeControl::default();
        volume.lower();
        volume.toggle_mute();
        assert_eq!(volume.gain(), 0.0);
        volume.toggle_mute();
        assert!((volume.gain() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_render_loops_at_end() {
        let audio = ramp(3, 1, 100);
        let mut state = PlaybackState::default();
        let mut out = [0.0; 5];
        let mut analysis = Vec::new();

        state.render(&audio, &mut out, 1, 100, &mut analysis);
        assert_eq!(out, [0.0, 1.0, 2.0, 0.0, 1.0]);
        assert_eq!(analysis, out.to_vec());
        assert!((state.elapsed_s(&audio) - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_render_rate_conversion() {
        // Source at half the output rate: each frame plays twice
        let audio = ramp(4, 1, 50);
        let mut state = PlaybackState::default();
        let mut out = [0.0; 6];
        state.render(&audio, &mut out, 1, 100, &mut Vec::new());
        assert_eq!(out, [0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_render_mono_to_stereo_with_gain() {
        let audio = ramp(2, 1, 100);
        let mut state = PlaybackState::default();
        state.set_gain(0.5);
        let mut out = [0.0; 4];
        let mut analysis = Vec::new();
        state.render(&audio, &mut out, 2, 100, &mut analysis);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.5]);
        assert_eq!(analysis, vec![0.0, 0.5]);
    }

    #[test]
    fn test_render_stereo_mixes_for_analysis() {
        let audio = ramp(2, 2, 100);
        let mut state = PlaybackState::default();
        let mut out = [0.0; 4];
        let mut analysis = Vec::new();
        state.render(&audio, &mut out, 2, 100, &mut analysis);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(analysis, vec![0.5, 2.5]);
    }
}
