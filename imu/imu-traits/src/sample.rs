use std::fmt;
use std::ops::Index;

use strum_macros::{AsRefStr, Display, EnumCount, EnumIter};

use crate::ImuError;

/// Number of values carried by a [`Sample`].
pub const SAMPLE_LEN: usize = 6;

// --- Basic Types ---
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

/// Position of a value inside a [`Sample`].
///
/// The discriminant is the index into the sample, so the declaration order
/// here is the wire order and must not change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, Display, AsRefStr,
)]
pub enum Axis {
    #[strum(serialize = "acc_x")]
    AccelX = 0,
    #[strum(serialize = "acc_y")]
    AccelY = 1,
    #[strum(serialize = "acc_z")]
    AccelZ = 2,
    #[strum(serialize = "gyr_x")]
    GyroX = 3,
    #[strum(serialize = "gyr_y")]
    GyroY = 4,
    #[strum(serialize = "gyr_z")]
    GyroZ = 5,
}

impl Axis {
    pub const ALL: [Axis; SAMPLE_LEN] = [
        Axis::AccelX,
        Axis::AccelY,
        Axis::AccelZ,
        Axis::GyroX,
        Axis::GyroY,
        Axis::GyroZ,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_accelerometer(self) -> bool {
        (self as usize) < 3
    }
}

/// One decoded six-axis reading: acceleration followed by angular velocity.
///
/// Values are stored in [`Axis`] order and never reordered. A `Sample` is
/// immutable once built and cheap to copy, so it can be handed to several
/// consumers or threads without synchronization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    values: [f64; SAMPLE_LEN],
}

impl Sample {
    pub const fn new(values: [f64; SAMPLE_LEN]) -> Self {
        Self { values }
    }

    pub const fn from_parts(accelerometer: Vector3, gyroscope: Vector3) -> Self {
        Self::new([
            accelerometer.x,
            accelerometer.y,
            accelerometer.z,
            gyroscope.x,
            gyroscope.y,
            gyroscope.z,
        ])
    }

    pub const fn get(&self, axis: Axis) -> f64 {
        self.values[axis.index()]
    }

    pub const fn values(&self) -> &[f64; SAMPLE_LEN] {
        &self.values
    }

    /// Acceleration as reported by the kit.
    pub const fn accelerometer(&self) -> Vector3 {
        Vector3::new(self.values[0], self.values[1], self.values[2])
    }

    /// Angular velocity as reported by the kit.
    pub const fn gyroscope(&self) -> Vector3 {
        Vector3::new(self.values[3], self.values[4], self.values[5])
    }

    /// Iterates the values in axis order. Every call starts from the first axis.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, f64>> {
        self.values.iter().copied()
    }

    /// Iterates `(axis, value)` pairs in axis order.
    pub fn axes(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        Axis::ALL.into_iter().zip(self.iter())
    }
}

impl Index<Axis> for Sample {
    type Output = f64;

    fn index(&self, axis: Axis) -> &f64 {
        &self.values[axis.index()]
    }
}

impl From<[f64; SAMPLE_LEN]> for Sample {
    fn from(values: [f64; SAMPLE_LEN]) -> Self {
        Self::new(values)
    }
}

impl TryFrom<&[f64]> for Sample {
    type Error = ImuError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let values: [f64; SAMPLE_LEN] = values
            .try_into()
            .map_err(|_| ImuError::InvalidSampleLength(values.len()))?;
        Ok(Self::new(values))
    }
}

impl TryFrom<Vec<f64>> for Sample {
    type Error = ImuError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::try_from(values.as_slice())
    }
}

impl IntoIterator for Sample {
    type Item = f64;
    type IntoIter = std::array::IntoIter<f64, SAMPLE_LEN>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Sample {
    type Item = f64;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [ax, ay, az, gx, gy, gz] = self.values;
        write!(
            f,
            "acc[x,y,z]=[{}, {}, {}]; gyr[x,y,z]=[{}, {}, {}]",
            ax, ay, az, gx, gy, gz
        )
    }
}
