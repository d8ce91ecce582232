use imu_traits::{Axis, Sample, SAMPLE_LEN};
use thiserror::Error;
use tracing::debug;

/// Leading token of every accelerometer/gyroscope frame.
pub const FRAME_MARKER: &[u8] = b"accel";
/// Token separator on the wire.
pub const FIELD_SEPARATOR: u8 = b';';
/// Integer tokens following the marker: one (integer, fraction) pair per axis.
pub const FRAME_TOKENS: usize = SAMPLE_LEN * 2;
/// Fractional tokens carry the value scaled by 10^6.
pub const FRACTION_SCALE: i64 = 1_000_000;

/// Why a frame did not produce a [`Sample`].
///
/// None of these stop acquisition; the frame is dropped and the next one read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The first token is not the `accel` marker, so the line belongs to
    /// some other message.
    #[error("unrecognized frame")]
    Unrecognized,
    #[error("expected {expected} integer tokens, found {found}")]
    TokenCount { expected: usize, found: usize },
    #[error("token {position} is not an integer: {token:?}")]
    InvalidToken { position: usize, token: String },
    #[error("fractional part {fractional} of {axis} is outside (-10^6, 10^6)")]
    FractionOutOfRange { axis: Axis, fractional: i64 },
}

impl FrameError {
    /// True when the frame carried the marker but could not be decoded.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, FrameError::Unrecognized)
    }
}

/// One axis as transmitted: whole part plus a signed fraction scaled by 10^6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FixedPoint {
    integer: i64,
    fractional: i64,
}

impl FixedPoint {
    // Both parts carry their own sign, so -1.25 arrives as (-1, -250000).
    fn value(self) -> f64 {
        self.integer as f64 + self.fractional as f64 / FRACTION_SCALE as f64
    }

    fn fraction_in_range(self) -> bool {
        self.fractional.unsigned_abs() < FRACTION_SCALE.unsigned_abs()
    }
}

/// Turns one line of the dev-kit protocol into a [`Sample`].
///
/// Wire format, terminator optional:
///
/// ```text
/// accel;I0;F0;I1;F1;I2;F2;I3;F3;I4;F4;I5;F5;\r\n
/// ```
///
/// Pairs are in axis order (accelerometer x/y/z, then gyroscope x/y/z) and
/// each axis decodes to `I + F * 10^-6`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDecoder {
    strict_fraction: bool,
    trace: bool,
}

impl FrameDecoder {
    pub const fn new() -> Self {
        Self {
            strict_fraction: false,
            trace: false,
        }
    }

    /// Decoder that rejects fractional parts with a magnitude of 10^6 or more.
    pub const fn strict() -> Self {
        Self::new().with_strict_fraction(true)
    }

    pub const fn with_strict_fraction(mut self, strict: bool) -> Self {
        self.strict_fraction = strict;
        self
    }

    /// Emit every decoded vector at debug level.
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub const fn is_strict(&self) -> bool {
        self.strict_fraction
    }

    pub fn decode(&self, frame: &[u8]) -> Result<Sample, FrameError> {
        let body = strip_terminator(frame);
        let mut tokens = body.split(|&b| b == FIELD_SEPARATOR);

        if tokens.next() != Some(FRAME_MARKER) {
            return Err(FrameError::Unrecognized);
        }

        let mut fields: Vec<&[u8]> = tokens.collect();
        // The separator after the last value leaves one empty token behind.
        if fields.last().is_some_and(|t| t.is_empty()) {
            fields.pop();
        }
        if fields.len() != FRAME_TOKENS {
            return Err(FrameError::TokenCount {
                expected: FRAME_TOKENS,
                found: fields.len(),
            });
        }

        let mut integers = [0i64; FRAME_TOKENS];
        for (position, (slot, token)) in integers.iter_mut().zip(&fields).enumerate() {
            *slot = parse_token(token).ok_or_else(|| FrameError::InvalidToken {
                position,
                token: String::from_utf8_lossy(token).into_owned(),
            })?;
        }

        let mut values = [0.0f64; SAMPLE_LEN];
        for (axis, pair) in Axis::ALL.into_iter().zip(integers.chunks_exact(2)) {
            let field = FixedPoint {
                integer: pair[0],
                fractional: pair[1],
            };
            if self.strict_fraction && !field.fraction_in_range() {
                return Err(FrameError::FractionOutOfRange {
                    axis,
                    fractional: field.fractional,
                });
            }
            values[axis.index()] = field.value();
        }

        let sample = Sample::new(values);
        if self.trace {
            debug!("{}", sample);
        }
        Ok(sample)
    }
}

/// Decodes with the default, lenient decoder.
pub fn decode_frame(frame: &[u8]) -> Result<Sample, FrameError> {
    FrameDecoder::new().decode(frame)
}

fn strip_terminator(frame: &[u8]) -> &[u8] {
    let frame = frame.strip_suffix(b"\n").unwrap_or(frame);
    frame.strip_suffix(b"\r").unwrap_or(frame)
}

fn parse_token(token: &[u8]) -> Option<i64> {
    std::str::from_utf8(token).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_sample(sample: &Sample, expected: [f64; SAMPLE_LEN]) {
        for (got, want) in sample.iter().zip(expected) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn decodes_reference_frame() {
        let sample =
            decode_frame(b"accel;0;250000;0;-260377;-9;-903318;0;1331;0;-2130;0;0;").unwrap();
        assert_sample(&sample, [0.25, -0.260377, -9.903318, 0.001331, -0.00213, 0.0]);
    }

    #[test]
    fn fraction_is_added_not_sign_copied() {
        // A positive fraction on a negative whole part moves toward zero.
        let sample =
            decode_frame(b"accel;0;250000;0;-260377;-9;903318;0;1331;0;-2130;0;0;").unwrap();
        assert_sample(&sample, [0.25, -0.260377, -8.096682, 0.001331, -0.00213, 0.0]);
    }

    #[test]
    fn documented_fixed_point_examples() {
        let cases = [
            (0, 250_000, 0.25),
            (0, -250_000, -0.25),
            (-1, 0, -1.0),
            (-1, -250_000, -1.25),
        ];
        for (integer, fractional, expected) in cases {
            let value = FixedPoint { integer, fractional }.value();
            assert_abs_diff_eq!(value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn fixed_point_round_trip() {
        for value in [0.0, 1.5, -2.75, 9.806650, -9.903318, 123.000001, -0.000001] {
            let integer = (value as f64).trunc() as i64;
            let fractional = ((value - integer as f64) * FRACTION_SCALE as f64).round() as i64;
            let line = format!(
                "accel;{i};{f};{i};{f};{i};{f};{i};{f};{i};{f};{i};{f};\r\n",
                i = integer,
                f = fractional
            );
            let sample = decode_frame(line.as_bytes()).unwrap();
            for got in &sample {
                assert_abs_diff_eq!(got, value, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn accepts_attached_terminators() {
        let base = b"accel;1;0;2;0;3;0;4;0;5;0;6;0;".to_vec();
        for terminator in [&b""[..], b"\n", b"\r\n", b"\r"] {
            let mut frame = base.clone();
            frame.extend_from_slice(terminator);
            let sample = decode_frame(&frame).unwrap();
            assert_sample(&sample, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        }
    }

    #[test]
    fn accepts_padded_and_zero_prefixed_tokens() {
        let sample =
            decode_frame(b"accel; 0;081405;0;-260377;-9;-903318;0;001331;0;-02130;0;000000;\r\n")
                .unwrap();
        assert_sample(&sample, [0.081405, -0.260377, -9.903318, 0.001331, -0.00213, 0.0]);
    }

    #[test]
    fn other_markers_are_unrecognized() {
        for frame in [&b"temp;25;0;"[..], b"", b"\r\n", b"ACCEL;0;0;", b" accel;0;", b"accelx;1;"] {
            assert_eq!(decode_frame(frame), Err(FrameError::Unrecognized));
        }
        assert!(!FrameError::Unrecognized.is_malformed());
    }

    #[test]
    fn short_frame_is_malformed() {
        let err = decode_frame(b"accel;0;250000;0;").unwrap_err();
        assert_eq!(
            err,
            FrameError::TokenCount {
                expected: 12,
                found: 3
            }
        );
        assert!(err.is_malformed());
        assert!(decode_frame(b"accel").unwrap_err().is_malformed());
        assert!(decode_frame(b"accel;\r\n").unwrap_err().is_malformed());
    }

    #[test]
    fn long_frame_is_malformed() {
        let err = decode_frame(b"accel;0;0;0;0;0;0;0;0;0;0;0;0;7;").unwrap_err();
        assert!(matches!(err, FrameError::TokenCount { found: 13, .. }));
    }

    #[test]
    fn non_numeric_token_is_malformed() {
        let err = decode_frame(b"accel;0;250000;0;x;0;0;0;0;0;0;0;0;\n").unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidToken {
                position: 3,
                token: "x".to_string()
            }
        );
        assert!(decode_frame(b"accel;0;;0;0;0;0;0;0;0;0;0;0;").is_err());
        assert!(decode_frame(b"accel;0;\xff;0;0;0;0;0;0;0;0;0;0;").is_err());
        assert!(decode_frame(b"accel;0;99999999999999999999;0;0;0;0;0;0;0;0;0;0;").is_err());
    }

    #[test]
    fn strict_decoder_bounds_fraction() {
        let frame = b"accel;0;1500000;0;0;0;0;0;0;0;0;0;0;";
        let lenient = decode_frame(frame).unwrap();
        assert_abs_diff_eq!(lenient[Axis::AccelX], 1.5, epsilon = 1e-12);

        let err = FrameDecoder::strict().decode(frame).unwrap_err();
        assert_eq!(
            err,
            FrameError::FractionOutOfRange {
                axis: Axis::AccelX,
                fractional: 1_500_000
            }
        );
        assert!(FrameDecoder::strict()
            .decode(b"accel;0;999999;0;-999999;0;0;0;0;0;0;0;0;")
            .is_ok());

        let err = FrameDecoder::strict()
            .decode(b"accel;0;-9223372036854775808;0;0;0;0;0;0;0;0;0;0;")
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::FractionOutOfRange {
                axis: Axis::AccelX,
                fractional: i64::MIN
            }
        );
        let err = FrameDecoder::strict()
            .decode(b"accel;0;0;0;0;0;0;0;0;0;0;0;9223372036854775807;")
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::FractionOutOfRange {
                axis: Axis::GyroZ,
                fractional: i64::MAX
            }
        );
    }

    #[test]
    fn error_messages_name_the_problem() {
        let msg = FrameError::InvalidToken {
            position: 4,
            token: "abc".into(),
        }
        .to_string();
        assert!(msg.contains("token 4"));
        assert!(msg.contains("abc"));
        let msg = FrameError::FractionOutOfRange {
            axis: Axis::GyroY,
            fractional: -2_000_000,
        }
        .to_string();
        assert!(msg.contains("gyr_y"));
    }
}
