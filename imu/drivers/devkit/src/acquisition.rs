use imu_traits::{ByteSource, ImuError, Sample, SampleSink};
use tracing::{debug, error, info, trace};

use crate::frame::{FrameDecoder, FrameError};
use crate::stop::{StopListener, StopSignal};

/// Line feed ends every frame on the wire.
pub const DEFAULT_DELIMITER: u8 = b'\n';
/// Read ceiling per frame; a full frame is well under 200 bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionConfig {
    pub delimiter: u8,
    /// Zero selects [`DEFAULT_MAX_FRAME_LEN`].
    pub max_frame_len: usize,
    pub decoder: FrameDecoder,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            decoder: FrameDecoder::new(),
        }
    }
}

impl AcquisitionConfig {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_decoder(mut self, decoder: FrameDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Byte ceiling handed to each read; never zero.
    pub fn frame_ceiling(&self) -> usize {
        match self.max_frame_len {
            0 => DEFAULT_MAX_FRAME_LEN,
            len => len,
        }
    }
}

/// Running totals for one acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionStats {
    /// Non-empty reads handed to the decoder.
    pub frames: u64,
    pub samples: u64,
    pub unrecognized: u64,
    pub malformed: u64,
    /// Reads that timed out before any byte arrived.
    pub empty_reads: u64,
}

/// Result of a single read-decode-forward iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Forwarded(Sample),
    Unrecognized,
    Malformed(FrameError),
    Empty,
}

/// How an acquisition ended.
#[derive(Debug)]
pub enum LoopOutcome {
    /// The stop predicate asked to finish.
    Stopped(AcquisitionStats),
    /// The source or the sink failed; nothing was read afterwards.
    Failed {
        error: ImuError,
        stats: AcquisitionStats,
    },
}

impl LoopOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, LoopOutcome::Stopped(_))
    }

    pub fn stats(&self) -> AcquisitionStats {
        match self {
            LoopOutcome::Stopped(stats) | LoopOutcome::Failed { stats, .. } => *stats,
        }
    }

    pub fn into_result(self) -> Result<AcquisitionStats, ImuError> {
        match self {
            LoopOutcome::Stopped(stats) => Ok(stats),
            LoopOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Pulls frames from a [`ByteSource`], decodes them and forwards samples to a
/// [`SampleSink`] in read order.
///
/// Frames that fail to decode are dropped and acquisition carries on. A read
/// or sink error ends the loop. The stop predicate is polled once before each
/// read, so an in-flight read always completes first.
pub struct AcquisitionLoop<S, K> {
    source: S,
    sink: K,
    config: AcquisitionConfig,
    stats: AcquisitionStats,
    listener: Option<StopListener>,
}

impl<S: ByteSource, K: SampleSink> AcquisitionLoop<S, K> {
    pub fn new(source: S, sink: K, config: AcquisitionConfig) -> Self {
        Self {
            source,
            sink,
            config,
            stats: AcquisitionStats::default(),
            listener: None,
        }
    }

    /// Registers the thread that raises the stop request so a clean stop can
    /// wait for it.
    pub fn with_listener(mut self, listener: StopListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }

    /// Reads one frame and forwards it if it decodes.
    pub fn step(&mut self) -> Result<FrameOutcome, ImuError> {
        let frame = self
            .source
            .read_until(self.config.delimiter, self.config.frame_ceiling())?;

        if frame.is_empty() {
            self.stats.empty_reads += 1;
            trace!("read timed out without data");
            return Ok(FrameOutcome::Empty);
        }

        self.stats.frames += 1;
        debug!("Received data: {:?}", String::from_utf8_lossy(&frame));

        let body = frame
            .strip_suffix(&[self.config.delimiter])
            .unwrap_or(&frame);
        match self.config.decoder.decode(body) {
            Ok(sample) => {
                self.sink.accept(sample)?;
                self.stats.samples += 1;
                Ok(FrameOutcome::Forwarded(sample))
            }
            Err(FrameError::Unrecognized) => {
                self.stats.unrecognized += 1;
                Ok(FrameOutcome::Unrecognized)
            }
            Err(err) => {
                self.stats.malformed += 1;
                debug!("Dropping malformed frame: {}", err);
                Ok(FrameOutcome::Malformed(err))
            }
        }
    }

    /// Runs until `should_continue` returns false or an error occurs.
    pub fn run<F>(&mut self, mut should_continue: F) -> LoopOutcome
    where
        F: FnMut() -> bool,
    {
        info!("Starting data collection");

        while should_continue() {
            if let Err(error) = self.step() {
                error!("Data collection failed: {}", error);
                return LoopOutcome::Failed {
                    error,
                    stats: self.stats,
                };
            }
        }

        if let Some(listener) = self.listener.take() {
            listener.join();
        }

        let stats = self.stats;
        info!(
            "Ending data collection: {} frames, {} samples, {} unrecognized, {} malformed",
            stats.frames, stats.samples, stats.unrecognized, stats.malformed
        );
        LoopOutcome::Stopped(stats)
    }

    pub fn run_until(&mut self, signal: &StopSignal) -> LoopOutcome {
        self.run(|| !signal.is_stop_requested())
    }
}
