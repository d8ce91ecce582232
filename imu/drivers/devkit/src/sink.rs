use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use imu_traits::{Axis, ImuError, Sample, SampleSink};
use serde::Serialize;
use strum_macros::Display;
use tracing::info;

/// Which readings are written out. Decoding always covers all six axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Sensor {
    #[default]
    All,
    Accelerometer,
}

impl Sensor {
    pub fn includes(self, axis: Axis) -> bool {
        match self {
            Sensor::All => true,
            Sensor::Accelerometer => axis.is_accelerometer(),
        }
    }
}

/// Log target used by [`LogSink`].
pub const SAMPLE_TARGET: &str = "devkit::samples";

fn write_error(err: impl std::fmt::Display) -> ImuError {
    ImuError::WriteError(err.to_string())
}

/// Prints each sample as aligned text.
pub struct ConsoleSink<W> {
    out: W,
    sensor: Sensor,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(sensor: Sensor) -> Self {
        Self::new(io::stdout(), sensor)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, sensor: Sensor) -> Self {
        Self { out, sensor }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SampleSink for ConsoleSink<W> {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        let acc = sample.accelerometer();
        write!(
            self.out,
            "acc:  x: {: >10.6} y: {: >10.6} z: {: >10.6}",
            acc.x, acc.y, acc.z
        )
        .map_err(write_error)?;
        if self.sensor == Sensor::All {
            let gyro = sample.gyroscope();
            write!(
                self.out,
                " | gyro: x: {: >10.6} y: {: >10.6} z: {: >10.6}",
                gyro.x, gyro.y, gyro.z
            )
            .map_err(write_error)?;
        }
        writeln!(self.out).map_err(write_error)
    }
}

/// Emits each sample as an `info` event under [`SAMPLE_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    sensor: Sensor,
}

impl LogSink {
    pub fn new(sensor: Sensor) -> Self {
        Self { sensor }
    }

    /// `name=value` pairs for the selected axes, space separated.
    fn describe(&self, sample: &Sample) -> String {
        sample
            .axes()
            .filter(|(axis, _)| self.sensor.includes(*axis))
            .map(|(axis, value)| format!("{}={}", axis, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl SampleSink for LogSink {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        info!(target: SAMPLE_TARGET, "{}", self.describe(&sample));
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SampleRecord {
    acc_x: f64,
    acc_y: f64,
    acc_z: f64,
    gyr_x: f64,
    gyr_y: f64,
    gyr_z: f64,
}

#[derive(Debug, Serialize)]
struct AccelRecord {
    acc_x: f64,
    acc_y: f64,
    acc_z: f64,
}

impl From<&Sample> for SampleRecord {
    fn from(sample: &Sample) -> Self {
        let [acc_x, acc_y, acc_z, gyr_x, gyr_y, gyr_z] = *sample.values();
        Self {
            acc_x,
            acc_y,
            acc_z,
            gyr_x,
            gyr_y,
            gyr_z,
        }
    }
}

impl From<&Sample> for AccelRecord {
    fn from(sample: &Sample) -> Self {
        let acc = sample.accelerometer();
        Self {
            acc_x: acc.x,
            acc_y: acc.y,
            acc_z: acc.z,
        }
    }
}

/// Writes one CSV row per sample, flushing after every row.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    sensor: Sensor,
}

impl CsvSink<File> {
    /// Appends to `path`, creating it if needed. The header row is only
    /// written into an empty file.
    pub fn append(path: impl AsRef<Path>, sensor: Sensor) -> Result<Self, ImuError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| write_error(format!("cannot open {}: {}", path.display(), e)))?;
        let is_empty = file.metadata()?.len() == 0;
        info!("Writing samples to {}", path.display());
        Ok(Self::new(file, sensor, is_empty))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W, sensor: Sensor, write_header: bool) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(out);
        Self { writer, sensor }
    }

    pub fn into_inner(self) -> Result<W, ImuError> {
        self.writer.into_inner().map_err(write_error)
    }
}

impl<W: Write> SampleSink for CsvSink<W> {
    fn accept(&mut self, sample: Sample) -> Result<(), ImuError> {
        let written = match self.sensor {
            Sensor::All => self.writer.serialize(SampleRecord::from(&sample)),
            Sensor::Accelerometer => self.writer.serialize(AccelRecord::from(&sample)),
        };
        written.map_err(write_error)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> Sample {
        Sample::new([0.25, -0.260377, -9.903318, 0.001331, -0.00213, 0.0])
    }

    #[test]
    fn console_prints_both_vectors() {
        let mut sink = ConsoleSink::new(Vec::new(), Sensor::All);
        sink.accept(sample()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "acc:  x:   0.250000 y:  -0.260377 z:  -9.903318 | gyro: x:   0.001331 y:  -0.002130 z:   0.000000\n"
        );
    }

    #[test]
    fn console_accelerometer_only() {
        let mut sink = ConsoleSink::new(Vec::new(), Sensor::Accelerometer);
        sink.accept(sample()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.starts_with("acc:"));
        assert!(!text.contains("gyro"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn log_sink_never_fails() {
        let mut sink = LogSink::new(Sensor::All);
        assert!(sink.accept(sample()).is_ok());
        let mut sink = LogSink::new(Sensor::Accelerometer);
        assert!(sink.accept(sample()).is_ok());
    }

    #[test]
    fn log_sink_lists_selected_axes() {
        assert_eq!(
            LogSink::new(Sensor::Accelerometer).describe(&sample()),
            "acc_x=0.25 acc_y=-0.260377 acc_z=-9.903318"
        );
        assert_eq!(
            LogSink::new(Sensor::All).describe(&Sample::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.5])),
            "acc_x=1 acc_y=2 acc_z=3 gyr_x=4 gyr_y=5 gyr_z=6.5"
        );
    }

    #[test]
    fn csv_rows_follow_axis_order() {
        let mut sink = CsvSink::new(Vec::new(), Sensor::All, true);
        sink.accept(sample()).unwrap();
        sink.accept(Sample::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "acc_x,acc_y,acc_z,gyr_x,gyr_y,gyr_z\n\
             0.25,-0.260377,-9.903318,0.001331,-0.00213,0.0\n\
             1.0,2.0,3.0,4.0,5.0,6.0\n"
        );
    }

    #[test]
    fn csv_accelerometer_columns() {
        let mut sink = CsvSink::new(Vec::new(), Sensor::Accelerometer, false);
        sink.accept(sample()).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "0.25,-0.260377,-9.903318\n");
    }

    #[test]
    fn csv_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");

        let mut sink = CsvSink::append(&path, Sensor::All).unwrap();
        sink.accept(sample()).unwrap();
        drop(sink);

        let mut sink = CsvSink::append(&path, Sensor::All).unwrap();
        sink.accept(sample()).unwrap();
        drop(sink);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "acc_x,acc_y,acc_z,gyr_x,gyr_y,gyr_z");
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn csv_append_reports_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvSink::append(dir.path().join("missing/samples.csv"), Sensor::All)
            .err()
            .unwrap();
        assert!(matches!(err, ImuError::WriteError(_)));
    }

    #[test]
    fn sensor_selects_axes() {
        assert!(Axis::ALL.iter().all(|&axis| Sensor::All.includes(axis)));
        assert!(Sensor::Accelerometer.includes(Axis::AccelZ));
        assert!(!Sensor::Accelerometer.includes(Axis::GyroX));
    }

    #[test]
    fn sensor_names() {
        assert_eq!(Sensor::All.to_string(), "all");
        assert_eq!(Sensor::Accelerometer.to_string(), "accelerometer");
        assert_eq!(Sensor::default(), Sensor::All);
    }
}
