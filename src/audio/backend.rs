//! Output backends: where a context's destination gets pulled from.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::Mutex;
use std::sync::Arc;

use super::graph::AudioGraph;
use crate::error::{AudioError, AudioResult};
use crate::params::audio_constants::OFFLINE_SAMPLE_RATE_HZ;

/// Graph shared between the control side and the rendering side
pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// An open output pulling from one graph
pub trait OutputStream {
    /// Render `frames` frames on the caller's thread.
    ///
    /// Device-clocked streams render on their own and ignore this.
    fn pump(&mut self, _frames: usize) {}

    /// Stop pulling and release the device. Closing twice is an error.
    fn close(&mut self) -> AudioResult<()>;
}

/// Source of output streams (the host audio subsystem)
pub trait AudioBackend {
    fn sample_rate(&mut self) -> AudioResult<f32>;

    fn open(&mut self, graph: SharedGraph) -> AudioResult<Box<dyn OutputStream>>;
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn sample_rate(&mut self) -> AudioResult<f32> {
        (**self).sample_rate()
    }

    fn open(&mut self, graph: SharedGraph) -> AudioResult<Box<dyn OutputStream>> {
        (**self).open(graph)
    }
}

/// Default output device through cpal
#[derive(Default)]
pub struct CpalBackend {
    device: Option<cpal::Device>,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn device(&mut self) -> AudioResult<&cpal::Device> {
        if self.device.is_none() {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or(AudioError::NoOutputDevice)?;
            log::info!(
                "Audio: {}",
                device.name().unwrap_or_else(|_| "Unknown".to_string())
            );
            self.device = Some(device);
        }
        self.device.as_ref().ok_or(AudioError::NoOutputDevice)
    }
}

impl AudioBackend for CpalBackend {
    fn sample_rate(&mut self) -> AudioResult<f32> {
        let config = self
            .device()?
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        Ok(config.sample_rate().0 as f32)
    }

    fn open(&mut self, graph: SharedGraph) -> AudioResult<Box<dyn OutputStream>> {
        let device = self.device()?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        log::debug!(
            "Opening output stream: {} channels @ {}Hz ({:?})",
            config.channels(),
            config.sample_rate().0,
            config.sample_format()
        );

        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(device, &stream_config, graph),
            cpal::SampleFormat::I16 => build_stream::<i16>(device, &stream_config, graph),
            cpal::SampleFormat::U16 => build_stream::<u16>(device, &stream_config, graph),
            other => Err(AudioError::Stream(format!(
                "unsupported sample format {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(format!("failed to start stream: {}", e)))?;

        Ok(Box::new(CpalStream {
            stream: Some(stream),
        }))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    graph: SharedGraph,
) -> AudioResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut mix = Vec::<f32>::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                mix.resize(data.len(), 0.0);
                graph.lock().render(&mut mix, channels);
                for (out, sample) in data.iter_mut().zip(&mix) {
                    // Safety limiter: hard clip to full scale
                    *out = <T as Sample>::from_sample(sample.clamp(-1.0, 1.0));
                }
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Stream(format!("failed to build stream: {}", e)))
}

struct CpalStream {
    stream: Option<cpal::Stream>,
}

impl OutputStream for CpalStream {
    fn close(&mut self) -> AudioResult<()> {
        let stream = self
            .stream
            .take()
            .ok_or(AudioError::InvalidState("stream already closed"))?;
        if let Err(e) = stream.pause() {
            log::debug!("Pausing stream before close failed: {}", e);
        }
        Ok(())
    }
}

/// Device-less backend; the host renders by calling `pump`
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    sample_rate: f32,
}

impl OfflineBackend {
    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new(OFFLINE_SAMPLE_RATE_HZ)
    }
}

impl AudioBackend for OfflineBackend {
    fn sample_rate(&mut self) -> AudioResult<f32> {
        Ok(self.sample_rate)
    }

    fn open(&mut self, graph: SharedGraph) -> AudioResult<Box<dyn OutputStream>> {
        Ok(Box::new(OfflineStream {
            graph,
            closed: false,
        }))
    }
}

struct OfflineStream {
    graph: SharedGraph,
    closed: bool,
}

impl OutputStream for OfflineStream {
    fn pump(&mut self, frames: usize) {
        if !self.closed {
            self.graph.lock().advance(frames);
        }
    }

    fn close(&mut self) -> AudioResult<()> {
        if std::mem::replace(&mut self.closed, true) {
            return Err(AudioError::InvalidState("stream already closed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_pump_advances_graph_clock() {
        let mut backend = OfflineBackend::default();
        let sample_rate = backend.sample_rate().unwrap();
        let graph: SharedGraph = Arc::new(Mutex::new(AudioGraph::new(sample_rate)));
        let mut stream = backend.open(Arc::clone(&graph)).unwrap();

        stream.pump(44_100);
        let elapsed = graph.lock().current_time();
        assert!((elapsed - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_offline_close_twice_fails_and_stops_pumping() {
        let mut backend = OfflineBackend::default();
        let graph: SharedGraph = Arc::new(Mutex::new(AudioGraph::new(44_100.0)));
        let mut stream = backend.open(Arc::clone(&graph)).unwrap();

        assert!(stream.close().is_ok());
        assert!(stream.close().is_err());
        stream.pump(1024);
        assert_eq!(graph.lock().current_time(), 0.0);
    }
}
