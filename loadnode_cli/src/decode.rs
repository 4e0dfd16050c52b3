//! `loadnode decode`: turn node frames on stdin into readable lines.

use std::io::{BufRead, Write};

use loadnode_core::Frame;

/// Counts of decoded and rejected lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    pub frames: usize,
    pub rejected: usize,
}

pub fn render(frame: &Frame, json: bool) -> String {
    match (frame, json) {
        (Frame::Telemetry(s), false) => {
            format!("telemetry t={:.3}s force={:.4}", s.timestamp_seconds, s.force)
        }
        (Frame::Scale(f), false) => format!("scale factor={f:.5}"),
        (Frame::Telemetry(s), true) => serde_json::json!({
            "tag": frame.tag(),
            "kind": "telemetry",
            "t": s.timestamp_seconds,
            "force": s.force,
        })
        .to_string(),
        (Frame::Scale(f), true) => serde_json::json!({
            "tag": frame.tag(),
            "kind": "scale",
            "factor": f,
        })
        .to_string(),
    }
}

/// Decode every line of `input`; blank lines are skipped, malformed ones
/// (including bytes that are not UTF-8) reported on stderr.
pub fn decode(mut input: impl BufRead, mut out: impl Write, json: bool) -> eyre::Result<DecodeStats> {
    let mut stats = DecodeStats::default();
    let mut buf = Vec::new();
    let mut lineno = 0usize;
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lineno += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(line = lineno, error = %e, "skipping line that is not UTF-8");
                stats.rejected += 1;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<Frame>() {
            Ok(frame) => {
                writeln!(out, "{}", render(&frame, json))?;
                stats.frames += 1;
            }
            Err(e) => {
                tracing::warn!(line = lineno, error = %e, "skipping malformed frame");
                stats.rejected += 1;
            }
        }
    }
    out.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_counts() {
        let input = b"<1,0.012,5.0000>\r\n\nnoise\n<2,2.50000>\n" as &[u8];
        let mut out = Vec::new();
        let stats = decode(input, &mut out, false).unwrap();
        assert_eq!(stats, DecodeStats { frames: 2, rejected: 1 });
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "telemetry t=0.012s force=5.0000\nscale factor=2.50000\n");
    }

    #[test]
    fn json_lines_are_parseable() {
        let mut out = Vec::new();
        decode(b"<1,1.500,-0.2500>\n" as &[u8], &mut out, true).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["kind"], "telemetry");
        assert_eq!(v["tag"], 1);
        assert_eq!(v["force"], -0.25);
    }

    #[test]
    fn non_utf8_noise_is_skipped() {
        let input = b"\xff\xfe garbage on connect\n<1,0.012,5.0000>\n" as &[u8];
        let mut out = Vec::new();
        let stats = decode(input, &mut out, false).unwrap();
        assert_eq!(stats, DecodeStats { frames: 1, rejected: 1 });
        assert_eq!(String::from_utf8(out).unwrap(), "telemetry t=0.012s force=5.0000\n");
    }

    #[test]
    fn last_line_without_newline_is_decoded() {
        let mut out = Vec::new();
        let stats = decode(b"<2,1.00000>" as &[u8], &mut out, false).unwrap();
        assert_eq!(stats.frames, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "scale factor=1.00000\n");
    }
}
