//! Producer thread that drives an audio source and feeds the render thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use tracing::{debug, error, info};

use super::source::{AudioChunk, AudioSource, SourceInfo};
use crate::engine::StopSignal;
use crate::error::{ObliqueError, Result};

/// Chunks buffered between the producer and the render thread
pub const QUEUE_CAPACITY: usize = 8;

/// Longest single sleep, bounds how long a stop request can go unnoticed
const POLL_SLICE: Duration = Duration::from_millis(5);

/// Handle to the audio producer thread
pub struct AudioFeed {
    info: SourceInfo,
    receiver: Receiver<AudioChunk>,
    stop: StopSignal,
    producing: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioFeed {
    /// Spawn the producer. `open` runs on the producer thread (device streams
    /// are not `Send`); this call waits until the source is opened and started.
    pub fn spawn<F, S>(open: F, chunk_frames: usize) -> Result<Self>
    where
        F: FnOnce() -> Result<S> + Send + 'static,
        S: AudioSource + 'static,
    {
        let (chunk_tx, chunk_rx) = bounded(QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<SourceInfo>>(1);
        let stop = StopSignal::new();
        let producing = Arc::new(AtomicBool::new(true));

        let thread_stop = stop.clone();
        let thread_producing = Arc::clone(&producing);
        let thread = thread::Builder::new()
            .name("audio-feed".to_string())
            .spawn(move || {
                let mut source = match open().and_then(|mut s| s.start().map(|_| s)) {
                    Ok(source) => source,
                    Err(e) => {
                        thread_producing.store(false, Ordering::Release);
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(source.info().clone()));
                produce(&mut source, chunk_frames, &chunk_tx, &thread_stop);
                source.stop();
                thread_producing.store(false, Ordering::Release);
                info!("Audio feed stopped");
            })
            .map_err(|e| ObliqueError::AudioSource(format!("Failed to spawn audio thread: {}", e)))?;

        let info = match ready_rx.recv() {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(ObliqueError::AudioSource(
                    "Audio thread exited before reporting".to_string(),
                ));
            }
        };
        info!(
            "Audio feed started: {} ({} Hz, {} ch)",
            info.name, info.sample_rate, info.channels
        );

        Ok(Self {
            info,
            receiver: chunk_rx,
            stop,
            producing,
            thread: Some(thread),
        })
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Every chunk completed since the last call; never blocks
    pub fn drain(&self) -> Vec<AudioChunk> {
        self.receiver.try_iter().collect()
    }

    /// True while the producer is delivering or undrained chunks remain
    pub fn is_playing(&self) -> bool {
        self.producing.load(Ordering::Acquire) || !self.receiver.is_empty()
    }

    /// Request the producer to stop and wait for it; idempotent
    pub fn stop(&mut self) {
        self.stop.request();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

impl Drop for AudioFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn produce<S: AudioSource>(
    source: &mut S,
    chunk_frames: usize,
    sender: &Sender<AudioChunk>,
    stop: &StopSignal,
) {
    let paced = source.info().paced;
    let started = Instant::now();

    while !stop.is_requested() {
        let Some(mut chunk) = source.read(chunk_frames) else {
            if source.is_exhausted() {
                debug!("Audio source exhausted");
                return;
            }
            thread::sleep(POLL_SLICE);
            continue;
        };

        if paced {
            let due = started + Duration::from_secs_f64(chunk.position_secs);
            loop {
                let now = Instant::now();
                if now >= due || stop.is_requested() {
                    break;
                }
                thread::sleep((due - now).min(POLL_SLICE));
            }
        }

        // Block with a timeout so a full queue cannot hide a stop request
        loop {
            match sender.send_timeout(chunk, POLL_SLICE) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if stop.is_requested() {
                        return;
                    }
                    chunk = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BufferSource;

    #[test]
    fn test_unpaced_source_delivers_every_sample() {
        let mut feed =
            AudioFeed::spawn(|| Ok(BufferSource::silence(0.1, 10_000)), 100).unwrap();
        assert_eq!(feed.info().sample_rate, 10_000);

        let mut frames = 0;
        let deadline = Instant::now() + Duration::from_secs(5);
        while frames < 1000 && Instant::now() < deadline {
            frames += feed.drain().iter().map(|c| c.frames()).sum::<usize>();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(frames, 1000);

        feed.stop();
        assert!(!feed.is_playing());
    }

    #[test]
    fn test_stop_interrupts_paced_source() {
        let mut feed = AudioFeed::spawn(
            || Ok(BufferSource::silence(60.0, 8000).paced(true)),
            1024,
        )
        .unwrap();
        let begun = Instant::now();
        feed.stop();
        assert!(begun.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_open_failure_is_reported() {
        let result = AudioFeed::spawn(
            || -> Result<BufferSource> { Err(ObliqueError::AudioSource("no device".into())) },
            1024,
        );
        assert!(matches!(result, Err(ObliqueError::AudioSource(_))));
    }
}
