use crate::error::SinkError;
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "audio")]
pub use self::rodio_sink::{RodioSink, SampleCapture};

/// The single audio output a track is loaded into and played from.
///
/// Only the playback controller holds one of these; analysis reads captured
/// samples through a separate handle and never touches transport.
pub trait AudioSink {
    /// Replaces the current source with `path`, paused at the start.
    /// Returns the stream length when the decoder knows it.
    fn load(&mut self, path: &Path) -> Result<Option<Duration>, SinkError>;

    /// Starts the loaded source. `Ok` means audio is being produced.
    fn play(&mut self) -> Result<(), SinkError>;

    fn pause(&mut self);

    fn resume(&mut self) -> Result<(), SinkError>;

    /// Stops and drops the loaded source.
    fn stop(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), SinkError>;

    /// Linear gain, 0.0 to 1.0.
    fn set_volume(&mut self, volume: f32);

    fn position(&self) -> Duration;

    /// True once a loaded source has run out of samples.
    fn is_finished(&self) -> bool;
}

#[cfg(feature = "audio")]
mod rodio_sink {
    use super::AudioSink;
    use crate::error::SinkError;
    use ringbuf::{traits::*, HeapRb};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::debug;

    /// Mono samples kept for analysis (~370ms at 44.1kHz).
    const CAPTURE_CAPACITY: usize = 16384;

    /// `rodio` output on the default device, with every played sample copied
    /// into a ring buffer for the analyser.
    pub struct RodioSink {
        _stream: OutputStream,
        stream_handle: OutputStreamHandle,
        sink: Option<Sink>,
        volume: f32,
        capture: Arc<Mutex<HeapRb<f32>>>,
    }

    impl RodioSink {
        pub fn new() -> Result<Self, SinkError> {
            let (stream, stream_handle) =
                OutputStream::try_default().map_err(|e| SinkError::Device(e.to_string()))?;

            Ok(Self {
                _stream: stream,
                stream_handle,
                sink: None,
                volume: 1.0,
                capture: Arc::new(Mutex::new(HeapRb::<f32>::new(CAPTURE_CAPACITY))),
            })
        }

        /// Read side of the capture buffer.
        pub fn capture_buffer(&self) -> Arc<Mutex<HeapRb<f32>>> {
            Arc::clone(&self.capture)
        }

        fn clear_capture(&self) {
            if let Ok(mut buf) = self.capture.lock() {
                while buf.try_pop().is_some() {}
            }
        }
    }

    impl AudioSink for RodioSink {
        fn load(&mut self, path: &Path) -> Result<Option<Duration>, SinkError> {
            self.stop();

            let file = File::open(path).map_err(|e| SinkError::Open {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let source = Decoder::new(BufReader::new(file)).map_err(|e| SinkError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let total = source.total_duration();

            let sink = Sink::try_new(&self.stream_handle).map_err(|e| SinkError::Device(e.to_string()))?;
            sink.pause();
            sink.set_volume(self.volume);
            sink.append(SampleCapture::new(source.convert_samples::<f32>(), Arc::clone(&self.capture)));

            debug!("Loaded {} (length {:?})", path.display(), total);
            self.sink = Some(sink);
            Ok(total)
        }

        fn play(&mut self) -> Result<(), SinkError> {
            let sink = self.sink.as_ref().ok_or(SinkError::NoSource)?;
            sink.play();
            Ok(())
        }

        fn pause(&mut self) {
            if let Some(sink) = self.sink.as_ref() {
                sink.pause();
            }
        }

        fn resume(&mut self) -> Result<(), SinkError> {
            self.play()
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.clear_capture();
        }

        fn seek(&mut self, position: Duration) -> Result<(), SinkError> {
            let sink = self.sink.as_ref().ok_or(SinkError::NoSource)?;
            sink.try_seek(position).map_err(|e| SinkError::Seek(e.to_string()))
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(sink) = self.sink.as_ref() {
                sink.set_volume(self.volume);
            }
        }

        fn position(&self) -> Duration {
            self.sink.as_ref().map(|sink| sink.get_pos()).unwrap_or_default()
        }

        fn is_finished(&self) -> bool {
            self.sink.as_ref().map(|sink| sink.empty()).unwrap_or(false)
        }
    }

    /// Pass-through source that mixes each frame to mono and pushes it into a
    /// circular buffer, overwriting the oldest sample when full.
    pub struct SampleCapture<S> {
        source: S,
        buffer: Arc<Mutex<HeapRb<f32>>>,
        frame_sum: f32,
        frame_fill: u16,
    }

    impl<S> SampleCapture<S> {
        pub fn new(source: S, buffer: Arc<Mutex<HeapRb<f32>>>) -> Self {
            Self {
                source,
                buffer,
                frame_sum: 0.0,
                frame_fill: 0,
            }
        }
    }

    impl<S> Iterator for SampleCapture<S>
    where
        S: Source<Item = f32>,
    {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            let sample = self.source.next()?;
            let channels = self.source.channels().max(1);

            self.frame_sum += sample;
            self.frame_fill += 1;
            if self.frame_fill >= channels {
                let mono = self.frame_sum / f32::from(self.frame_fill);
                self.frame_sum = 0.0;
                self.frame_fill = 0;
                if let Ok(mut buf) = self.buffer.lock() {
                    if buf.is_full() {
                        let _ = buf.try_pop();
                    }
                    let _ = buf.try_push(mono);
                }
            }
            Some(sample)
        }
    }

    impl<S> Source for SampleCapture<S>
    where
        S: Source<Item = f32>,
    {
        fn current_frame_len(&self) -> Option<usize> {
            self.source.current_frame_len()
        }

        fn channels(&self) -> u16 {
            self.source.channels()
        }

        fn sample_rate(&self) -> u32 {
            self.source.sample_rate()
        }

        fn total_duration(&self) -> Option<Duration> {
            self.source.total_duration()
        }

        fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
            self.frame_sum = 0.0;
            self.frame_fill = 0;
            self.source.try_seek(pos)
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::AudioSink;
    use crate::error::SinkError;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    pub enum SinkCall {
        Load(PathBuf),
        Play,
        Pause,
        Resume,
        Stop,
        Seek(Duration),
        Volume(f32),
    }

    /// Scriptable sink for controller tests.
    #[derive(Debug, Default)]
    pub struct MockSink {
        pub calls: Vec<SinkCall>,
        /// Number of upcoming `play` calls that fail.
        pub failing_plays: usize,
        pub resume_fails: bool,
        pub length: Option<Duration>,
        pub position: Duration,
        pub finished: bool,
        pub loaded: Option<PathBuf>,
    }

    impl MockSink {
        pub fn loads(&self) -> Vec<PathBuf> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    SinkCall::Load(path) => Some(path.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl AudioSink for MockSink {
        fn load(&mut self, path: &Path) -> Result<Option<Duration>, SinkError> {
            self.calls.push(SinkCall::Load(path.to_path_buf()));
            self.loaded = Some(path.to_path_buf());
            self.position = Duration::ZERO;
            self.finished = false;
            Ok(self.length)
        }

        fn play(&mut self) -> Result<(), SinkError> {
            self.calls.push(SinkCall::Play);
            if self.failing_plays > 0 {
                self.failing_plays -= 1;
                return Err(SinkError::Device("scripted failure".into()));
            }
            if self.loaded.is_none() {
                return Err(SinkError::NoSource);
            }
            Ok(())
        }

        fn pause(&mut self) {
            self.calls.push(SinkCall::Pause);
        }

        fn resume(&mut self) -> Result<(), SinkError> {
            self.calls.push(SinkCall::Resume);
            if self.resume_fails {
                Err(SinkError::Device("resume rejected".into()))
            } else {
                Ok(())
            }
        }

        fn stop(&mut self) {
            self.calls.push(SinkCall::Stop);
            self.loaded = None;
            self.position = Duration::ZERO;
        }

        fn seek(&mut self, position: Duration) -> Result<(), SinkError> {
            self.calls.push(SinkCall::Seek(position));
            self.position = position;
            Ok(())
        }

        fn set_volume(&mut self, volume: f32) {
            self.calls.push(SinkCall::Volume(volume));
        }

        fn position(&self) -> Duration {
            self.position
        }

        fn is_finished(&self) -> bool {
            self.finished
        }
    }
}
