//! JPEG marker-level parsing.
//!
//! Splits a baseline JPEG into the pieces the coefficient transcoder needs
//! while keeping everything it does not touch verbatim:
//!
//! | Segment | Handling |
//! |---------|----------|
//! | SOI / EOI          | implicit, re-emitted by the writer |
//! | APPn, COM, DQT     | copied verbatim to the output |
//! | SOF0 / SOF1        | parsed (dimensions, components) and copied verbatim |
//! | DHT                | parsed into decode tables, **not** copied - the writer emits the standard tables |
//! | DRI                | parsed (restart interval), not copied - the writer emits no restart markers |
//! | SOS                | parsed; entropy-coded data captured up to the next real marker |
//! | SOF2..SOF15        | rejected (progressive / hierarchical / arithmetic) |
//!
//! Quantisation tables are part of the verbatim copy, which is what makes
//! the save path re-quantisation-free by construction.

use std::io::Cursor;

use super::huffman::HuffTable;
use crate::utils::{be_u16, bytesa, bytesv, u8 as read_u8};
use crate::{Error, Result};

/// One component of the frame header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameComponent {
    pub id: u8,
    /// Horizontal sampling factor (1..=4).
    pub h: u8,
    /// Vertical sampling factor (1..=4).
    pub v: u8,
}

/// Parsed SOF0/SOF1 frame header.
#[derive(Debug, Clone)]
pub(crate) struct FrameInfo {
    pub width: u16,
    pub height: u16,
    pub components: Vec<FrameComponent>,
}

impl FrameInfo {
    pub fn h_max(&self) -> u8 {
        self.components.iter().map(|c| c.h).max().unwrap_or(1)
    }

    pub fn v_max(&self) -> u8 {
        self.components.iter().map(|c| c.v).max().unwrap_or(1)
    }
}

/// Everything extracted from one pass over the file.
pub(crate) struct Parsed {
    pub frame: FrameInfo,
    /// Verbatim segments (marker through body) in original order.
    pub copied: Vec<Vec<u8>>,
    pub dc_tables: [Option<HuffTable>; 4],
    pub ac_tables: [Option<HuffTable>; 4],
    /// MCUs between restart markers; 0 = none.
    pub restart_interval: u16,
    /// Per scan component: (component index into frame, dc table id, ac table id).
    pub scan: Vec<(usize, u8, u8)>,
    /// Entropy-coded bytes, including any embedded RST markers.
    pub scan_data: Vec<u8>,
}

fn malformed(msg: &str) -> Error {
    Error::MalformedCover(msg.to_string())
}

/// Parse `bytes` as a baseline JPEG.
pub(crate) fn parse(bytes: &[u8]) -> Result<Parsed> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return Err(malformed("missing SOI marker"));
    }

    let mut frame: Option<FrameInfo> = None;
    let mut copied = Vec::new();
    let mut dc_tables: [Option<HuffTable>; 4] = [None, None, None, None];
    let mut ac_tables: [Option<HuffTable>; 4] = [None, None, None, None];
    let mut restart_interval = 0u16;

    let mut pos = 2usize;
    loop {
        // Markers may be preceded by fill bytes (0xFF).
        while pos < bytes.len() && bytes[pos] == 0xFF && bytes.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if pos + 2 > bytes.len() {
            return Err(malformed("truncated before SOS"));
        }
        if bytes[pos] != 0xFF {
            return Err(malformed("expected marker"));
        }
        let marker = bytes[pos + 1];
        pos += 2;

        match marker {
            0xD9 => return Err(malformed("EOI before scan data")),
            0x01 | 0xD0..=0xD7 => continue, // TEM / stray RST: no segment body
            0xC0 | 0xC1 => {
                let (seg, body) = read_segment(bytes, pos, marker)?;
                pos += seg.len() - 2;
                frame = Some(parse_frame(&body)?);
                copied.push(seg);
            }
            0xC2 | 0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                return Err(malformed("progressive or non-baseline JPEG"));
            }
            0xC4 => {
                let (seg, body) = read_segment(bytes, pos, marker)?;
                pos += seg.len() - 2;
                parse_dht(&body, &mut dc_tables, &mut ac_tables)?;
            }
            0xDD => {
                let (seg, body) = read_segment(bytes, pos, marker)?;
                pos += seg.len() - 2;
                if body.len() != 2 {
                    return Err(malformed("bad DRI length"));
                }
                restart_interval = u16::from_be_bytes([body[0], body[1]]);
            }
            0xDA => {
                let (seg, body) = read_segment(bytes, pos, marker)?;
                pos += seg.len() - 2;
                let frame = frame.ok_or_else(|| malformed("SOS before SOF"))?;
                let scan = parse_scan(&body, &frame)?;

                let (scan_data, next) = capture_entropy_data(bytes, pos)?;
                if next != 0xD9 {
                    return Err(malformed("multi-scan JPEG not supported"));
                }
                return Ok(Parsed {
                    frame,
                    copied,
                    dc_tables,
                    ac_tables,
                    restart_interval,
                    scan,
                    scan_data,
                });
            }
            // APPn, COM, DQT and anything else with a length field.
            _ => {
                let (seg, _) = read_segment(bytes, pos, marker)?;
                pos += seg.len() - 2;
                copied.push(seg);
            }
        }
    }
}

/// Read one length-prefixed segment starting at `pos` (just past the
/// marker). Returns (full segment bytes including the marker, body without
/// the length field).
fn read_segment(bytes: &[u8], pos: usize, marker: u8) -> Result<(Vec<u8>, Vec<u8>)> {
    if pos + 2 > bytes.len() {
        return Err(malformed("truncated segment length"));
    }
    let len = u16::from_be_bytes([bytes[pos], bytes[pos + 1]]) as usize;
    if len < 2 || pos + len > bytes.len() {
        return Err(malformed("segment overruns file"));
    }
    let mut seg = Vec::with_capacity(len + 2);
    seg.extend_from_slice(&[0xFF, marker]);
    seg.extend_from_slice(&bytes[pos..pos + len]);
    let body = bytes[pos + 2..pos + len].to_vec();
    Ok((seg, body))
}

fn parse_frame(body: &[u8]) -> Result<FrameInfo> {
    let mut r = Cursor::new(body);
    let precision = read_u8(&mut r)?;
    if precision != 8 {
        return Err(malformed("only 8-bit precision supported"));
    }
    let height = be_u16(&mut r)?;
    let width = be_u16(&mut r)?;
    let nf = read_u8(&mut r)? as usize;
    if nf == 0 || nf > 4 || width == 0 || height == 0 {
        return Err(malformed("bad frame header"));
    }
    let mut components = Vec::with_capacity(nf);
    for _ in 0..nf {
        let id = read_u8(&mut r)?;
        let hv = read_u8(&mut r)?;
        let _tq = read_u8(&mut r)?;
        let (h, v) = (hv >> 4, hv & 0x0F);
        if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
            return Err(malformed("bad sampling factors"));
        }
        components.push(FrameComponent { id, h, v });
    }
    Ok(FrameInfo {
        width,
        height,
        components,
    })
}

fn parse_dht(
    body: &[u8],
    dc: &mut [Option<HuffTable>; 4],
    ac: &mut [Option<HuffTable>; 4],
) -> Result<()> {
    let mut r = Cursor::new(body);
    let mut remaining = body.len();
    while remaining > 0 {
        let tc_th = read_u8(&mut r)?;
        let (class, id) = ((tc_th >> 4) as usize, (tc_th & 0x0F) as usize);
        if class > 1 || id > 3 {
            return Err(malformed("bad DHT table id"));
        }
        let counts = bytesa::<16>(&mut r)?;
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total > 256 {
            return Err(malformed("bad DHT counts"));
        }
        let symbols = bytesv(&mut r, total)?;
        let table = HuffTable::new(counts, symbols);
        if class == 0 {
            dc[id] = Some(table);
        } else {
            ac[id] = Some(table);
        }
        remaining = remaining
            .checked_sub(17 + total)
            .ok_or_else(|| malformed("bad DHT length"))?;
    }
    Ok(())
}

fn parse_scan(body: &[u8], frame: &FrameInfo) -> Result<Vec<(usize, u8, u8)>> {
    let mut r = Cursor::new(body);
    let ns = read_u8(&mut r)? as usize;
    if ns != frame.components.len() {
        return Err(malformed("multi-scan JPEG not supported"));
    }
    let mut scan = Vec::with_capacity(ns);
    for _ in 0..ns {
        let id = read_u8(&mut r)?;
        let tables = read_u8(&mut r)?;
        let comp = frame
            .components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| malformed("scan references unknown component"))?;
        scan.push((comp, tables >> 4, tables & 0x0F));
    }
    // Spectral selection / successive approximation: fixed for baseline.
    let ss = read_u8(&mut r)?;
    let se = read_u8(&mut r)?;
    let _ah_al = read_u8(&mut r)?;
    if ss != 0 || se != 63 {
        return Err(malformed("non-baseline spectral selection"));
    }
    Ok(scan)
}

/// Capture entropy-coded bytes starting at `pos` up to (not including) the
/// next marker that is neither a stuffed zero nor a restart. Returns the
/// data and that marker byte.
fn capture_entropy_data(bytes: &[u8], pos: usize) -> Result<(Vec<u8>, u8)> {
    let mut i = pos;
    while i + 1 < bytes.len() {
        if bytes[i] == 0xFF {
            match bytes[i + 1] {
                0x00 | 0xD0..=0xD7 => i += 2,
                marker => return Ok((bytes[pos..i].to_vec(), marker)),
            }
        } else {
            i += 1;
        }
    }
    Err(malformed("scan data not terminated by a marker"))
}
