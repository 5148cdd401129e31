//! Processed-audio output via `cpal`.
//!
//! The output device is opened at the capture sample rate so the chain never
//! resamples.  Its clock drives the whole signal chain: each callback asks
//! the [`RenderCallback`] to fill the device buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::oneshot;

use super::backend::{AcquisitionError, OutputBinding, RenderCallback, StreamFormat};
use super::capture::StreamThread;

// ---------------------------------------------------------------------------
// CpalOutput
// ---------------------------------------------------------------------------

/// A running output stream.  Dropping it stops playback.
pub struct CpalOutput {
    format: StreamFormat,
    _thread: StreamThread,
}

impl std::fmt::Debug for CpalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalOutput")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl OutputBinding for CpalOutput {
    fn format(&self) -> StreamFormat {
        self.format
    }
}

/// Open the named output device (or the default one) at `sample_rate` and
/// start pulling audio through `render`.
///
/// # Errors
///
/// [`AcquisitionError::Unsupported`] when the device cannot run `f32` at the
/// requested rate.
pub async fn open_output(
    device_name: Option<String>,
    sample_rate: u32,
    render: RenderCallback,
) -> Result<CpalOutput, AcquisitionError> {
    let (ready_tx, ready_rx) = oneshot::channel();

    let thread = StreamThread::spawn("amp-playback", move |running| {
        match build_output(device_name.as_deref(), sample_rate, render) {
            Ok((stream, format)) => {
                if ready_tx.send(Ok(format)).is_err() {
                    log::debug!("[audio] playback opened after the request was abandoned");
                    return;
                }
                StreamThread::park(&running);
                drop(stream);
                log::debug!("[audio] playback stream closed");
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        }
    })?;

    let format = ready_rx
        .await
        .map_err(|_| AcquisitionError::DeviceUnavailable("playback thread exited".into()))??;
    log::info!(
        "[audio] playback started: {} Hz, {} channel(s)",
        format.sample_rate,
        format.channels
    );

    Ok(CpalOutput {
        format,
        _thread: thread,
    })
}

fn output_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, AcquisitionError> {
    match name {
        Some(wanted) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| AcquisitionError::DeviceUnavailable(format!("no output named {wanted:?}"))),
        None => host
            .default_output_device()
            .ok_or_else(|| AcquisitionError::DeviceUnavailable("no output device found".into())),
    }
}

/// Pick an `f32` configuration supporting `sample_rate`, stereo preferred.
fn pick_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> Result<cpal::SupportedStreamConfig, AcquisitionError> {
    let rate = cpal::SampleRate(sample_rate);
    let candidates: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AcquisitionError::DeviceUnavailable(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .collect();

    candidates
        .iter()
        .find(|c| c.channels() == 2)
        .or_else(|| candidates.iter().find(|c| c.channels() > 2))
        .or_else(|| candidates.first())
        .cloned()
        .map(|c| c.with_sample_rate(rate))
        .ok_or_else(|| {
            AcquisitionError::Unsupported(format!("output device cannot play {sample_rate} Hz"))
        })
}

fn build_output(
    device_name: Option<&str>,
    sample_rate: u32,
    mut render: RenderCallback,
) -> Result<(cpal::Stream, StreamFormat), AcquisitionError> {
    let host = cpal::default_host();
    let device = output_device(&host, device_name)?;
    let supported = pick_config(&device, sample_rate)?;

    let format = StreamFormat {
        sample_rate,
        channels: supported.channels(),
    };
    let channels = format.channels as usize;

    let stream = device.build_output_stream(
        &supported.config(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render(data, channels),
        |err: cpal::StreamError| {
            log::error!("[audio] playback stream error: {err}");
        },
        None,
    )?;
    stream.play()?;

    Ok((stream, format))
}
