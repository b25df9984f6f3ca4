//! Decoder for QEMU trace lines describing PCI BAR writes.
//!
//! A recognized line looks like
//!
//! ```text
//! 8055@1669203543.112314:vfio_region_write  (0000:00:1b.0:region0+0x48, 0xff, 1)
//! ```
//!
//! The leading `pid@sec.usec:` token marks a trace line; the
//! `region<N>+0x<offset>, <data>, <width>` tail carries the write. Field
//! positions are located by delimiter, not by column, so device-name length
//! and value width do not matter.

#![forbid(unsafe_code)]

use corbwatch_core::WriteEvent;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not carry the `pid@sec.usec:` trace prefix. Console and
    /// monitor output interleaved with the trace stream lands here; callers
    /// skip it silently.
    #[error("not a trace line")]
    NotATraceLine,

    /// A trace line without a `region<N>+0x<offset>, <data>, <width>` write
    /// description (trace points other than region writes).
    #[error("no region-write description")]
    NoWriteDescription,

    #[error("malformed {field} field {text:?}")]
    MalformedField { field: &'static str, text: String },

    /// Widths other than 1/2/4 cannot be represented as a 32-bit write event.
    #[error("unsupported access width {0}")]
    UnsupportedWidth(u64),
}

/// Offset of the `:` closing the `pid@sec.usec:` timestamp token, i.e. the
/// `@`, `.`, `:` characters found in order.
fn timestamp_end(line: &str) -> Option<usize> {
    let at = line.find('@')?;
    let dot = at + line[at..].find('.')?;
    let colon = dot + line[dot..].find(':')?;
    Some(colon)
}

fn parse_number(field: &'static str, text: &str) -> Result<u64, ParseError> {
    let text = text.trim();
    let malformed = || ParseError::MalformedField {
        field,
        text: text.to_owned(),
    };
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| malformed())
}

/// Decode one trace line into a [`WriteEvent`].
///
/// Malformed lines are reported, never guessed at: an event only reaches the
/// core when every field parsed cleanly.
pub fn parse_line(line: &str) -> Result<WriteEvent, ParseError> {
    let colon = timestamp_end(line).ok_or(ParseError::NotATraceLine)?;
    let rest = &line[colon + 1..];

    // Find `region<digits>+`; a bare "region" substring is not enough, since
    // the trace-point name itself contains one (`vfio_region_write`).
    let mut found = None;
    for (idx, _) in rest.match_indices("region") {
        let tail = &rest[idx + "region".len()..];
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && tail[digits..].starts_with('+') {
            found = Some((&tail[..digits], &tail[digits + 1..]));
            break;
        }
    }
    let (region_text, rest) = found.ok_or(ParseError::NoWriteDescription)?;
    let region = parse_number("region", region_text)?;
    let region = u32::try_from(region).map_err(|_| ParseError::MalformedField {
        field: "region",
        text: region_text.to_owned(),
    })?;

    let comma = rest.find(',').ok_or(ParseError::NoWriteDescription)?;
    let offset = parse_number("offset", &rest[..comma])?;

    // Reads (`region<N>+0x<offset>, <width>) = <data>`) have no second comma
    // and fall out here as NoWriteDescription.
    let rest = &rest[comma + 1..];
    let comma = rest.find(',').ok_or(ParseError::NoWriteDescription)?;
    let data = parse_number("data", &rest[..comma])?;
    let data = u32::try_from(data).map_err(|_| ParseError::MalformedField {
        field: "data",
        text: rest[..comma].trim().to_owned(),
    })?;

    let rest = &rest[comma + 1..];
    let width_text = rest.trim_end().trim_end_matches(')');
    let width = parse_number("width", width_text)?;
    if !matches!(width, 1 | 2 | 4) {
        return Err(ParseError::UnsupportedWidth(width));
    }

    Ok(WriteEvent {
        region,
        offset,
        data,
        width: width as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_vfio_region_write_line() {
        let line = "8055@1669203543.112314:vfio_region_write  (0000:00:1b.0:region0+0x48, 0xff, 1)";
        assert_eq!(
            parse_line(line),
            Ok(WriteEvent {
                region: 0,
                offset: 0x48,
                data: 0xFF,
                width: 1,
            })
        );
    }

    #[test]
    fn decodes_wide_writes_and_other_regions() {
        let line = "31@1669203543.990001:vfio_region_write  (0000:00:1b.0:region0+0x40, 0x47f81000, 4)";
        assert_eq!(
            parse_line(line),
            Ok(WriteEvent {
                region: 0,
                offset: 0x40,
                data: 0x47F8_1000,
                width: 4,
            })
        );

        let line = "31@1669203544.000313:vfio_region_write  (0000:00:1b.0:region2+0x14, 0x0, 2)";
        assert_eq!(
            parse_line(line),
            Ok(WriteEvent {
                region: 2,
                offset: 0x14,
                data: 0,
                width: 2,
            })
        );
    }

    #[test]
    fn console_noise_is_not_a_trace_line() {
        assert_eq!(
            parse_line("QEMU 7.1.0 monitor - type 'help' for more information"),
            Err(ParseError::NotATraceLine)
        );
        assert_eq!(parse_line(""), Err(ParseError::NotATraceLine));
        // ':' before '@' does not count; the tokens must appear in order.
        assert_eq!(
            parse_line("addr 0000:00:1b.0 name user@host"),
            Err(ParseError::NotATraceLine)
        );
    }

    #[test]
    fn other_trace_points_are_rejected_without_a_write() {
        assert_eq!(
            parse_line("8055@1669203543.112320:vfio_intx_interrupt  (0000:00:1b.0) Pin A"),
            Err(ParseError::NoWriteDescription)
        );
    }

    #[test]
    fn read_lines_are_rejected() {
        // Single comma in the tail: reads must never be decoded as writes.
        let line = "8055@1669203543.112401:vfio_region_read  (0000:00:1b.0:region0+0x48, 1) = 0xff";
        assert_eq!(parse_line(line), Err(ParseError::NoWriteDescription));
    }

    #[test]
    fn garbage_fields_are_malformed_not_guessed() {
        let line = "8055@1669203543.1:vfio_region_write  (0000:00:1b.0:region0+0xZZ, 0xff, 1)";
        assert!(matches!(
            parse_line(line),
            Err(ParseError::MalformedField { field: "offset", .. })
        ));

        let line = "8055@1669203543.1:vfio_region_write  (0000:00:1b.0:region0+0x48, 0x1ffffffff, 4)";
        assert!(matches!(
            parse_line(line),
            Err(ParseError::MalformedField { field: "data", .. })
        ));
    }

    #[test]
    fn eight_byte_accesses_are_unsupported() {
        let line = "8055@1669203543.1:vfio_region_write  (0000:00:1b.0:region0+0x40, 0x1000, 8)";
        assert_eq!(parse_line(line), Err(ParseError::UnsupportedWidth(8)));
    }
}
