//! Reader for the accelerometer/gyroscope stream a development kit prints
//! over its serial console.
//!
//! The kit sends one text frame per line, `accel;` followed by six
//! fixed-point axis values. [`FrameDecoder`] turns a line into a [`Sample`],
//! and [`AcquisitionLoop`] keeps reading lines from a [`ByteSource`] and
//! hands decoded samples to a [`SampleSink`] until it is asked to stop.
//!
//! ```
//! use devkit::{AcquisitionConfig, AcquisitionLoop, ReaderSource, Sample};
//!
//! let capture = b"accel;0;250000;0;0;-9;-810000;0;0;0;0;0;0;\r\nboot ok\r\n".to_vec();
//! let source = ReaderSource::new(std::io::Cursor::new(capture));
//! let mut samples: Vec<Sample> = Vec::new();
//!
//! let mut reads = 0;
//! let outcome = AcquisitionLoop::new(source, &mut samples, AcquisitionConfig::default())
//!     .run(|| { reads += 1; reads <= 2 });
//!
//! assert!(outcome.is_clean());
//! assert_eq!(samples.len(), 1);
//! assert!((samples[0].accelerometer().z + 9.81).abs() < 1e-9);
//! ```

pub mod acquisition;
pub mod frame;
pub mod port;
pub mod sink;
pub mod stop;

pub use imu_traits::{
    Axis, ByteSource, ImuError, ReaderSource, Sample, SampleSink, Vector3, SAMPLE_LEN,
};

pub use acquisition::{
    AcquisitionConfig, AcquisitionLoop, AcquisitionStats, FrameOutcome, LoopOutcome,
    DEFAULT_DELIMITER, DEFAULT_MAX_FRAME_LEN,
};
pub use frame::{decode_frame, FrameDecoder, FrameError};
pub use port::{list_ports, print_ports, PortDescription, SerialSource};
pub use sink::{ConsoleSink, CsvSink, LogSink, Sensor};
pub use stop::{StopListener, StopSignal};
