//! Microphone capture via `cpal`.
//!
//! `cpal::Stream` is not `Send` on every platform, so each stream lives on a
//! dedicated [`StreamThread`] for its whole life.  The thread builds the
//! stream, reports the outcome back, then parks until the owning handle is
//! dropped.  Dropping a [`CpalInput`] therefore stops the hardware stream and
//! joins its thread.
//!
//! Captured samples are pushed, interleaved and converted to `f32`, into an
//! `rtrb` ring whose reader is handed to the signal chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use tokio::sync::oneshot;

use super::backend::{AcquisitionError, InputResource, SampleReader, StreamFormat};

/// Smallest capture ring, in samples.
const MIN_RING_SAMPLES: usize = 1024;

// ---------------------------------------------------------------------------
// StreamThread
// ---------------------------------------------------------------------------

/// RAII owner of a thread that keeps one cpal stream alive.
///
/// The body receives the `running` flag and must return once it turns false.
pub(crate) struct StreamThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    pub(crate) fn spawn<F>(name: &str, body: F) -> Result<Self, AcquisitionError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))
            .map_err(|e| AcquisitionError::DeviceUnavailable(format!("cannot spawn {name}: {e}")))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Block the calling stream thread until the owner drops its handle.
    pub(crate) fn park(running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("[audio] stream thread panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// cpal error mapping
// ---------------------------------------------------------------------------

impl From<cpal::BuildStreamError> for AcquisitionError {
    fn from(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => {
                AcquisitionError::DeviceUnavailable("device disconnected".into())
            }
            cpal::BuildStreamError::StreamConfigNotSupported
            | cpal::BuildStreamError::InvalidArgument => {
                AcquisitionError::Unsupported(err.to_string())
            }
            cpal::BuildStreamError::BackendSpecific { err } => backend_specific(err.description),
            other => AcquisitionError::DeviceUnavailable(other.to_string()),
        }
    }
}

impl From<cpal::DefaultStreamConfigError> for AcquisitionError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        match err {
            cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
                AcquisitionError::Unsupported(err.to_string())
            }
            cpal::DefaultStreamConfigError::BackendSpecific { err } => {
                backend_specific(err.description)
            }
            other => AcquisitionError::DeviceUnavailable(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for AcquisitionError {
    fn from(err: cpal::PlayStreamError) -> Self {
        match err {
            cpal::PlayStreamError::BackendSpecific { err } => backend_specific(err.description),
            other => AcquisitionError::DeviceUnavailable(other.to_string()),
        }
    }
}

impl From<cpal::DevicesError> for AcquisitionError {
    fn from(err: cpal::DevicesError) -> Self {
        AcquisitionError::DeviceUnavailable(err.to_string())
    }
}

/// Platforms report refused microphone access as a backend-specific error.
fn backend_specific(description: String) -> AcquisitionError {
    let lower = description.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        AcquisitionError::Denied(description)
    } else {
        AcquisitionError::DeviceUnavailable(description)
    }
}

// ---------------------------------------------------------------------------
// CpalInput
// ---------------------------------------------------------------------------

/// A running microphone stream.
pub struct CpalInput {
    format: StreamFormat,
    reader: Option<SampleReader>,
    _thread: StreamThread,
}

impl std::fmt::Debug for CpalInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalInput")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl InputResource for CpalInput {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn take_reader(&mut self) -> Option<SampleReader> {
        self.reader.take()
    }
}

/// Ring capacity holding `buffer_ms` of interleaved audio.
pub(crate) fn ring_capacity(format: StreamFormat, buffer_ms: u32) -> usize {
    let samples = format.sample_rate as u64 * format.channels as u64 * buffer_ms as u64 / 1000;
    (samples as usize).max(MIN_RING_SAMPLES)
}

/// Open the named input device (or the default one) and start capturing.
///
/// Resolves once the stream is playing.  Dropping the future before that
/// tears the half-opened stream down again.
pub async fn open_input(
    device_name: Option<String>,
    buffer_ms: u32,
) -> Result<CpalInput, AcquisitionError> {
    let (ready_tx, ready_rx) = oneshot::channel();

    let thread = StreamThread::spawn("amp-capture", move |running| {
        match build_input(device_name.as_deref(), buffer_ms) {
            Ok((stream, format, reader)) => {
                if ready_tx.send(Ok((format, reader))).is_err() {
                    log::debug!("[audio] capture opened after the request was abandoned");
                    return;
                }
                StreamThread::park(&running);
                drop(stream);
                log::debug!("[audio] capture stream closed");
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        }
    })?;

    let (format, reader) = ready_rx.await.map_err(|_| AcquisitionError::Cancelled)??;
    log::info!(
        "[audio] capture started: {} Hz, {} channel(s)",
        format.sample_rate,
        format.channels
    );

    Ok(CpalInput {
        format,
        reader: Some(reader),
        _thread: thread,
    })
}

fn input_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, AcquisitionError> {
    match name {
        Some(wanted) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| AcquisitionError::DeviceUnavailable(format!("no input named {wanted:?}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| AcquisitionError::DeviceUnavailable("no input device found".into())),
    }
}

fn build_input(
    device_name: Option<&str>,
    buffer_ms: u32,
) -> Result<(cpal::Stream, StreamFormat, SampleReader), AcquisitionError> {
    let host = cpal::default_host();
    let device = input_device(&host, device_name)?;
    let supported = device.default_input_config()?;

    let format = StreamFormat {
        sample_rate: supported.sample_rate().0,
        channels: supported.channels(),
    };
    let (producer, reader) = rtrb::RingBuffer::new(ring_capacity(format, buffer_ms));
    let config: cpal::StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, producer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, producer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, producer)?,
        SampleFormat::I32 => build_stream::<i32>(&device, &config, producer)?,
        other => {
            return Err(AcquisitionError::Unsupported(format!(
                "input sample format {other:?}"
            )))
        }
    };
    stream.play()?;

    Ok((stream, format, reader))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: rtrb::Producer<f32>,
) -> Result<cpal::Stream, AcquisitionError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            push_converted(&mut producer, data);
        },
        |err: cpal::StreamError| {
            log::error!("[audio] capture stream error: {err}");
        },
        None,
    )?;
    Ok(stream)
}

/// Convert `data` to `f32` and queue it.  Returns how many samples fit.
///
/// A full ring means the output side stalled; newer audio is dropped.
fn push_converted<T>(producer: &mut rtrb::Producer<f32>, data: &[T]) -> usize
where
    T: Sample,
    f32: FromSample<T>,
{
    let mut pushed = 0;
    for &sample in data {
        if producer.push(f32::from_sample(sample)).is_err() {
            break;
        }
        pushed += 1;
    }
    pushed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn ring_holds_requested_duration() {
        let stereo = StreamFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        assert_eq!(ring_capacity(stereo, 100), 9_600);

        let tiny = StreamFormat {
            sample_rate: 8_000,
            channels: 1,
        };
        assert_eq!(ring_capacity(tiny, 10), MIN_RING_SAMPLES);
    }

    #[test]
    fn integer_samples_are_converted_to_f32() {
        let (mut producer, mut reader) = rtrb::RingBuffer::<f32>::new(8);
        assert_eq!(push_converted(&mut producer, &[0i16, i16::MIN]), 2);
        assert_eq!(push_converted(&mut producer, &[u16::MAX / 2 + 1]), 1);

        assert_eq!(reader.pop(), Ok(0.0));
        assert_eq!(reader.pop(), Ok(-1.0));
        let mid = reader.pop().expect("u16 sample");
        assert!(mid.abs() < 1e-3);
    }

    #[test]
    fn full_ring_drops_the_rest() {
        let (mut producer, reader) = rtrb::RingBuffer::<f32>::new(2);
        assert_eq!(push_converted(&mut producer, &[0.1f32, 0.2, 0.3]), 2);
        assert_eq!(reader.slots(), 2);
    }

    #[test]
    fn permission_errors_map_to_denied() {
        assert!(matches!(
            backend_specific("Permission denied by user".into()),
            AcquisitionError::Denied(_)
        ));
        assert!(matches!(
            backend_specific("ALSA function failed".into()),
            AcquisitionError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn build_errors_map_to_acquisition_errors() {
        assert!(matches!(
            AcquisitionError::from(cpal::BuildStreamError::StreamConfigNotSupported),
            AcquisitionError::Unsupported(_)
        ));
        assert!(matches!(
            AcquisitionError::from(cpal::BuildStreamError::DeviceNotAvailable),
            AcquisitionError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn stream_thread_stops_on_drop() {
        let exits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&exits);
        let thread = StreamThread::spawn("test-stream", move |running| {
            StreamThread::park(&running);
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .expect("spawn");

        drop(thread);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }
}
