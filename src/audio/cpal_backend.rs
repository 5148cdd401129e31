//! [`AudioBackend`] on top of the system's default cpal host.

use async_trait::async_trait;

use crate::config::AudioConfig;

use super::backend::{
    AcquisitionError, AudioBackend, CaptureConstraints, InputResource, OutputBinding,
    RenderCallback, StreamFormat,
};
use super::capture::open_input;
use super::playback::open_output;

#[derive(Debug, Clone)]
pub struct CpalBackend {
    input_device: Option<String>,
    output_device: Option<String>,
    buffer_ms: u32,
}

impl CpalBackend {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            input_device: config.input_device.clone(),
            output_device: config.output_device.clone(),
            buffer_ms: config.buffer_ms,
        }
    }
}

#[async_trait]
impl AudioBackend for CpalBackend {
    async fn acquire_input(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn InputResource>, AcquisitionError> {
        // cpal only hands out the unprocessed device signal.
        if !constraints.is_raw() {
            return Err(AcquisitionError::Unsupported(
                "voice processing is not available on this host".into(),
            ));
        }
        let input = open_input(self.input_device.clone(), self.buffer_ms).await?;
        Ok(Box::new(input))
    }

    async fn bind_output(
        &self,
        format: StreamFormat,
        render: RenderCallback,
    ) -> Result<Box<dyn OutputBinding>, AcquisitionError> {
        let output = open_output(self.output_device.clone(), format.sample_rate, render).await?;
        Ok(Box::new(output))
    }
}
