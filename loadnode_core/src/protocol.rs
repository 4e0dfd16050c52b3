//! Serial line protocol.
//!
//! Inbound, one command byte optionally followed by an argument:
//! - `s<float>`: set the conversion factor
//! - `g`: query the conversion factor
//!
//! Outbound frames are ASCII, `<`/`>` delimited and comma separated:
//! - `<1,<time_s:.3>,<force:.4>>` telemetry, every cycle
//! - `<2,<factor:.5>>` answer to `g`

use std::fmt;
use std::str::FromStr;

use loadnode_traits::{BoxError, SerialLink};

/// Upper bound on argument bytes consumed after a command byte.
pub const MAX_ARG_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetScale(f32),
    QueryScale,
    /// Anything else, including `s` without a parsable number.
    Unknown(u8),
}

/// Read at most one command from `link`.
///
/// Returns `Ok(None)` when no byte is pending. The argument of `s` is the
/// rest of the line as far as it is already buffered; an argument split
/// across two polls is not reassembled.
pub fn read_command<L: SerialLink + ?Sized>(link: &mut L) -> Result<Option<Command>, BoxError> {
    let Some(byte) = link.poll_byte()? else {
        return Ok(None);
    };
    let cmd = match byte {
        b's' => {
            let arg = read_argument(link)?;
            match parse_float_prefix(&arg) {
                Some(v) => Command::SetScale(v),
                None => Command::Unknown(b's'),
            }
        }
        b'g' => Command::QueryScale,
        other => Command::Unknown(other),
    };
    Ok(Some(cmd))
}

fn read_argument<L: SerialLink + ?Sized>(link: &mut L) -> Result<String, BoxError> {
    let mut buf = Vec::with_capacity(16);
    while buf.len() < MAX_ARG_LEN {
        match link.poll_byte()? {
            Some(b'\n') | None => break,
            Some(b) => buf.push(b),
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Parse the leading decimal literal of `s`, ignoring leading whitespace and
/// anything after the literal. Accepts an optional sign, a fraction and an
/// exponent (`-1.5`, `.25`, `2e-3`). Returns `None` when no digit is found.
pub fn parse_float_prefix(s: &str) -> Option<f32> {
    let t = s.trim_start();
    let b = t.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }
    // Exponent only counts when at least one digit follows it.
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    t[..i].parse::<f32>().ok().filter(|v| v.is_finite())
}

/// One telemetry measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub timestamp_seconds: f64,
    pub force: f32,
}

/// Outbound frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Telemetry(TelemetrySample),
    Scale(f32),
}

impl Frame {
    pub fn tag(&self) -> u8 {
        match self {
            Frame::Telemetry(_) => 1,
            Frame::Scale(_) => 2,
        }
    }
}

impl From<TelemetrySample> for Frame {
    fn from(s: TelemetrySample) -> Self {
        Frame::Telemetry(s)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Telemetry(s) => write!(f, "<1,{:.3},{:.4}>", s.timestamp_seconds, s.force),
            Frame::Scale(factor) => write!(f, "<2,{factor:.5}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame must be wrapped in '<' and '>'")]
    Delimiters,
    #[error("unknown frame tag {0:?}")]
    UnknownTag(String),
    #[error("frame tag {tag} expects {expected} fields, got {got}")]
    FieldCount { tag: u8, expected: usize, got: usize },
    #[error("invalid number {0:?}")]
    Number(String),
}

fn number<T: FromStr>(field: &str) -> Result<T, FrameError> {
    field
        .trim()
        .parse::<T>()
        .map_err(|_| FrameError::Number(field.to_string()))
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let body = line
            .trim()
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or(FrameError::Delimiters)?;
        let fields: Vec<&str> = body.split(',').collect();
        match fields[0].trim() {
            "1" => {
                if fields.len() != 3 {
                    return Err(FrameError::FieldCount {
                        tag: 1,
                        expected: 3,
                        got: fields.len(),
                    });
                }
                Ok(Frame::Telemetry(TelemetrySample {
                    timestamp_seconds: number(fields[1])?,
                    force: number(fields[2])?,
                }))
            }
            "2" => {
                if fields.len() != 2 {
                    return Err(FrameError::FieldCount {
                        tag: 2,
                        expected: 2,
                        got: fields.len(),
                    });
                }
                Ok(Frame::Scale(number(fields[1])?))
            }
            other => Err(FrameError::UnknownTag(other.to_string())),
        }
    }
}
