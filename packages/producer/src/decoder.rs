use std::process::Stdio;

use tokio::io::BufReader;
use tokio::process::{Child, ChildStdout, Command};
use tracing::info;

use crate::config::DecoderConfig;
use crate::error::{ProducerError, Result};

/// Running `rtl_fm | multimon-ng` pipeline. Both processes are killed when
/// this is dropped.
#[derive(Debug)]
pub struct DecoderPipeline {
    _tuner: Child,
    _demodulator: Child,
    output: Option<BufReader<ChildStdout>>,
}

impl DecoderPipeline {
    pub fn spawn(config: &DecoderConfig) -> Result<Self> {
        let mut tuner = Command::new(&config.rtl_fm_bin)
            .args(config.rtl_fm_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProducerError::Spawn {
                program: config.rtl_fm_bin.clone(),
                source,
            })?;

        let audio: Stdio = tuner
            .stdout
            .take()
            .ok_or_else(|| ProducerError::Spawn {
                program: config.rtl_fm_bin.clone(),
                source: std::io::Error::other("stdout was not captured"),
            })?
            .try_into()
            .map_err(|source| ProducerError::Spawn {
                program: config.rtl_fm_bin.clone(),
                source,
            })?;

        let mut demodulator = Command::new(&config.multimon_bin)
            .args(config.multimon_args())
            .stdin(audio)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProducerError::Spawn {
                program: config.multimon_bin.clone(),
                source,
            })?;

        let output = demodulator.stdout.take().map(BufReader::new);

        info!(
            frequency = %config.frequency,
            gain = config.gain,
            sample_rate = config.sample_rate,
            protocol = %config.protocol,
            "Decoder pipeline started"
        );

        Ok(Self {
            _tuner: tuner,
            _demodulator: demodulator,
            output,
        })
    }

    /// Decoded text stream. Can be taken once.
    pub fn take_output(&mut self) -> Option<BufReader<ChildStdout>> {
        self.output.take()
    }
}
