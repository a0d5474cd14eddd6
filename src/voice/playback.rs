//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Routes Ctrl-C between active playback and the process.
///
/// `tokio::signal::ctrl_c` permanently replaces the default SIGINT
/// disposition the first time it is polled, so the subscription must be
/// owned by one long-lived listener rather than re-registered per clip.
/// While a clip is playing, a signal stops the clip; at any other time it
/// terminates the process the way the default handler would have.
#[derive(Clone, Default)]
pub struct Interrupt {
    playing: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl Interrupt {
    /// Install the process-wide Ctrl-C listener. Call once at startup.
    pub fn listen(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                if this.deliver() {
                    tracing::info!("playback interrupted");
                } else {
                    tracing::info!("interrupt received, exiting");
                    std::process::exit(130);
                }
            }
        });
    }

    /// Route one signal: true if it stopped an active clip
    fn deliver(&self) -> bool {
        if self.playing.load(Ordering::SeqCst) {
            self.stop.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Mark a clip as playing until the guard drops; a stale stop request
    /// from a previous clip is cleared
    fn begin_playback(&self) -> PlaybackGuard {
        self.stop.store(false, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
        PlaybackGuard {
            playing: Arc::clone(&self.playing),
        }
    }

    fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }
}

/// Clears the playing flag when the clip ends, on any path
struct PlaybackGuard {
    playing: Arc<AtomicBool>,
}

impl Drop for PlaybackGuard {
    fn drop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}

/// Plays audio to the default output device
pub struct AudioPlayback {
    config: StreamConfig,
    interrupt: Interrupt,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if no output device or suitable config is available
    pub fn new(interrupt: Interrupt) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config, interrupt })
    }

    /// Play audio from MP3 bytes, blocking the turn until done.
    /// A Ctrl-C routed by the `Interrupt` listener stops it cleanly
    /// and returns Ok.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_mp3(&self, mp3_data: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        self.play(samples).await
    }

    /// Play audio samples (f32 format), interruptible while playing
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    pub async fn play(&self, samples: Vec<f32>) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let _guard = self.interrupt.begin_playback();
        let stop = self.interrupt.stop_flag();
        let config = self.config.clone();

        // The blocking loop observes the stop flag within one poll tick
        tokio::task::spawn_blocking(move || play_samples_blocking(&config, &samples, &stop))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

/// Drive samples through a cpal output stream until finished or stopped
fn play_samples_blocking(config: &StreamConfig, samples: &[f32], stop: &AtomicBool) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = config.channels as usize;

    let samples = Arc::new(samples.to_vec());
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(AtomicBool::new(false));
    let finished_clone = Arc::clone(&finished);

    let samples_clone = Arc::clone(&samples);
    let position_clone = Arc::clone(&position);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = position_clone.lock().unwrap();

                for frame in data.chunks_mut(channels) {
                    let sample = if *pos < samples_clone.len() {
                        samples_clone[*pos]
                    } else {
                        finished_clone.store(true, Ordering::SeqCst);
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if *pos < samples_clone.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    // Wait for playback to finish, bounded by the clip duration
    let sample_count = samples.len();
    let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);

    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(duration_ms + 500);

    while !finished.load(Ordering::SeqCst) && !stop.load(Ordering::SeqCst) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    if !stop.load(Ordering::SeqCst) {
        // Small delay to let the tail of the buffer drain
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");

    Ok(())
}

/// Decode MP3 bytes to f32 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                // Convert i16 samples to f32 and handle stereo to mono
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    // Stereo: average channels
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            f32::midpoint(left, right)
                        })
                        .collect()
                } else {
                    // Mono
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
