// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audible alert: a synthesized ascending two-tone chime.
//!
//! The chime is rendered once to a WAV file and handed to an external
//! player. Without a working player the terminal bell is rung instead, and
//! if even that fails the alert is silently skipped.

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use chatdesk_core::{ChatdeskError, ChimePlayer};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

const SAMPLE_RATE: u32 = 22_050;
const TONE_MS: u32 = 150;
/// E5 then A5.
const TONES_HZ: [f32; 2] = [659.25, 880.0];
const AMPLITUDE: f32 = 0.3;

const PROBED_PLAYERS: &[&str] = &["paplay", "aplay -q", "afplay"];

/// Render the chime as a 16-bit mono PCM WAV file.
pub fn synthesize_chime() -> Vec<u8> {
    let per_tone = (SAMPLE_RATE * TONE_MS / 1000) as usize;
    let mut samples: Vec<i16> = Vec::with_capacity(per_tone * TONES_HZ.len());
    for freq in TONES_HZ {
        for n in 0..per_tone {
            let t = n as f32 / SAMPLE_RATE as f32;
            // Linear decay so each tone ends without a click.
            let envelope = 1.0 - n as f32 / per_tone as f32;
            let value = (TAU * freq * t).sin() * envelope * AMPLITUDE;
            samples.push((value * f32::from(i16::MAX)) as i16);
        }
    }

    let data_len = u32::try_from(samples.len() * 2).unwrap_or(u32::MAX);
    let mut wav = Vec::with_capacity(44 + samples.len() * 2);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        wav.extend_from_slice(&s.to_le_bytes());
    }
    wav
}

/// Chime played through an external WAV player.
pub struct SynthChime {
    players: Vec<String>,
    wav_path: PathBuf,
    rendered: OnceCell<()>,
}

impl SynthChime {
    /// `player` is a command line such as `aplay -q`; the WAV path is
    /// appended as the last argument. `None` probes common players.
    pub fn new(player: Option<String>) -> Self {
        let players = match player {
            Some(p) => vec![p],
            None => PROBED_PLAYERS.iter().map(|p| p.to_string()).collect(),
        };
        Self {
            players,
            wav_path: std::env::temp_dir().join("chatdesk-chime.wav"),
            rendered: OnceCell::new(),
        }
    }

    /// Write the WAV under a different path.
    pub fn with_wav_path(mut self, path: PathBuf) -> Self {
        self.wav_path = path;
        self
    }

    pub fn wav_path(&self) -> &PathBuf {
        &self.wav_path
    }

    async fn render(&self) -> Result<(), ChatdeskError> {
        self.rendered
            .get_or_try_init(|| async {
                tokio::fs::write(&self.wav_path, synthesize_chime())
                    .await
                    .map_err(|e| ChatdeskError::Internal(format!("cannot write chime: {e}")))
            })
            .await
            .map(|_| ())
    }

    async fn try_player(&self, command_line: &str) -> bool {
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return false;
        };
        let status = tokio::process::Command::new(program)
            .args(parts)
            .arg(&self.wav_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(s) if s.success() => true,
            Ok(s) => {
                debug!(player = program, status = %s, "chime player failed");
                false
            }
            Err(e) => {
                debug!(player = program, error = %e, "chime player unavailable");
                false
            }
        }
    }
}

#[async_trait]
impl ChimePlayer for SynthChime {
    async fn play(&self) -> Result<(), ChatdeskError> {
        match self.render().await {
            Ok(()) => {
                for player in &self.players {
                    if self.try_player(player).await {
                        return Ok(());
                    }
                }
            }
            Err(e) => warn!(error = %e, "chime synthesis failed, using terminal bell"),
        }
        ring_bell().await;
        Ok(())
    }
}

async fn ring_bell() {
    let mut stderr = tokio::io::stderr();
    if let Err(e) = stderr.write_all(b"\x07").await {
        debug!(error = %e, "terminal bell unavailable, chime skipped");
        return;
    }
    let _ = stderr.flush().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_matches_payload() {
        let wav = synthesize_chime();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..16], b"WAVEfmt ");
        let data_len = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
        assert_eq!(wav.len(), 44 + data_len);
        // Two tones of 150 ms at 22.05 kHz, 2 bytes per sample.
        assert_eq!(data_len, 2 * 3307 * 2);
    }

    #[test]
    fn tones_ascend() {
        assert!(TONES_HZ[0] < TONES_HZ[1]);
    }

    #[tokio::test]
    async fn missing_player_falls_back_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let chime = SynthChime::new(Some("chatdesk-no-such-player --quiet".into()))
            .with_wav_path(dir.path().join("chime.wav"));
        chime.play().await.unwrap();
        assert!(chime.wav_path().exists());
    }

    #[tokio::test]
    async fn unwritable_path_still_succeeds() {
        let chime = SynthChime::new(Some("true".into()))
            .with_wav_path(PathBuf::from("/nonexistent-dir/for/chime.wav"));
        chime.play().await.unwrap();
    }
}
