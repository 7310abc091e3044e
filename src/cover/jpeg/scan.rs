//! Coefficient-level scan decode and re-encode.
//!
//! Decode walks the MCU structure of the (single, interleaved) baseline
//! scan and lands every block in a per-component 2-D coefficient array in
//! natural order, DC values made absolute. Encode inverts the walk with
//! the standard Huffman tables, re-differencing the DC terms. The two
//! traversals visit blocks in exactly the same order, so
//! decode(encode(planes)) is the identity on the coefficient arrays.

use super::huffman::{
    BitReader, BitWriter, HuffEncoder, HuffTable, STD_AC_CHROMA_COUNTS, STD_AC_CHROMA_SYMBOLS,
    STD_AC_LUMA_COUNTS, STD_AC_LUMA_SYMBOLS, STD_DC_CHROMA_COUNTS, STD_DC_CHROMA_SYMBOLS,
    STD_DC_LUMA_COUNTS, STD_DC_LUMA_SYMBOLS, UNZIGZAG,
};
use super::marker::{FrameInfo, Parsed};
use crate::{Error, Result};

/// One component's quantised DCT coefficients as a 2-D row-major array.
///
/// Dimensions are MCU-aligned (multiples of 8, including any padding blocks
/// the scan carries), so the array holds exactly the coefficients the file
/// encodes. Position `(r, c)` is the DC term of its block iff
/// `r % 8 == 0 && c % 8 == 0`.
pub struct CoeffPlane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<i16>,
}

impl CoeffPlane {
    fn blocks_wide(&self) -> usize {
        self.width / 8
    }
}

/// MCU geometry shared by decode and encode.
pub(crate) struct Geometry {
    mcus_x: usize,
    mcus_y: usize,
    /// Per scan component: blocks per MCU (h, v).
    blocks_per_mcu: Vec<(usize, usize)>,
}

pub(crate) fn geometry(frame: &FrameInfo, scan_order: &[usize]) -> Geometry {
    if frame.components.len() == 1 {
        // Single-component scan: the MCU is one block and padding aligns
        // to the block grid only.
        let mcus_x = frame.width.div_ceil(8) as usize;
        let mcus_y = frame.height.div_ceil(8) as usize;
        Geometry {
            mcus_x,
            mcus_y,
            blocks_per_mcu: vec![(1, 1)],
        }
    } else {
        let h_max = frame.h_max() as usize;
        let v_max = frame.v_max() as usize;
        let mcus_x = (frame.width as usize).div_ceil(8 * h_max);
        let mcus_y = (frame.height as usize).div_ceil(8 * v_max);
        let blocks_per_mcu = scan_order
            .iter()
            .map(|&ci| {
                let c = frame.components[ci];
                (c.h as usize, c.v as usize)
            })
            .collect();
        Geometry {
            mcus_x,
            mcus_y,
            blocks_per_mcu,
        }
    }
}

/// Decode the entropy-coded scan into per-component coefficient planes.
pub(crate) fn decode_scan(parsed: &Parsed) -> Result<Vec<CoeffPlane>> {
    let scan_order: Vec<usize> = parsed.scan.iter().map(|&(ci, _, _)| ci).collect();
    let geo = geometry(&parsed.frame, &scan_order);
    let mut planes: Vec<CoeffPlane> = geo
        .blocks_per_mcu
        .iter()
        .map(|&(h, v)| {
            let width = geo.mcus_x * h * 8;
            let height = geo.mcus_y * v * 8;
            CoeffPlane {
                width,
                height,
                data: vec![0i16; width * height],
            }
        })
        .collect();

    let mut reader = BitReader::new(&parsed.scan_data);
    let mut dc_pred = vec![0i16; parsed.scan.len()];
    let ri = parsed.restart_interval as usize;

    for mcu in 0..geo.mcus_x * geo.mcus_y {
        if ri > 0 && mcu > 0 && mcu % ri == 0 {
            reader.restart()?;
            dc_pred.fill(0);
        }
        let (mcu_x, mcu_y) = (mcu % geo.mcus_x, mcu / geo.mcus_x);
        for (si, &(_, dc_id, ac_id)) in parsed.scan.iter().enumerate() {
            let dc_table = parsed.dc_tables[dc_id as usize]
                .as_ref()
                .ok_or_else(|| Error::MalformedCover("missing DC table".to_string()))?;
            let ac_table = parsed.ac_tables[ac_id as usize]
                .as_ref()
                .ok_or_else(|| Error::MalformedCover("missing AC table".to_string()))?;
            let (h, v) = geo.blocks_per_mcu[si];
            for by in 0..v {
                for bx in 0..h {
                    let block_row = mcu_y * v + by;
                    let block_col = mcu_x * h + bx;
                    decode_block(
                        &mut reader,
                        dc_table,
                        ac_table,
                        &mut dc_pred[si],
                        &mut planes[si],
                        block_row,
                        block_col,
                    )?;
                }
            }
        }
    }
    Ok(planes)
}

fn decode_block(
    reader: &mut BitReader<'_>,
    dc_table: &HuffTable,
    ac_table: &HuffTable,
    dc_pred: &mut i16,
    plane: &mut CoeffPlane,
    block_row: usize,
    block_col: usize,
) -> Result<()> {
    let base = block_row * 8 * plane.width + block_col * 8;
    let write = |plane: &mut CoeffPlane, natural: usize, value: i16| {
        let (r, c) = (natural / 8, natural % 8);
        plane.data[base + r * plane.width + c] = value;
    };

    let t = dc_table.decode(reader)?;
    if t > 11 {
        // 8-bit precision caps DC difference categories at 11.
        return Err(Error::MalformedCover("DC category out of range".to_string()));
    }
    let diff = if t == 0 { 0 } else { reader.receive_extend(t)? };
    *dc_pred = dc_pred.wrapping_add(diff);
    write(plane, 0, *dc_pred);

    let mut k = 1usize;
    while k < 64 {
        let rs = ac_table.decode(reader)?;
        let (run, size) = ((rs >> 4) as usize, rs & 0x0F);
        if size == 0 {
            if run == 15 {
                k += 16; // ZRL: sixteen zero coefficients
                continue;
            }
            break; // EOB
        }
        k += run;
        if k > 63 {
            return Err(Error::MalformedCover("AC run past block end".to_string()));
        }
        let value = reader.receive_extend(size)?;
        write(plane, UNZIGZAG[k], value);
        k += 1;
    }
    Ok(())
}

/// Re-encode the coefficient planes into entropy-coded scan data using the
/// standard tables. No restart markers are emitted.
pub(crate) fn encode_scan(
    frame: &FrameInfo,
    scan_order: &[usize],
    planes: &[CoeffPlane],
) -> Vec<u8> {
    let geo = geometry(frame, scan_order);
    let luma_dc = HuffEncoder::new(STD_DC_LUMA_COUNTS, &STD_DC_LUMA_SYMBOLS);
    let luma_ac = HuffEncoder::new(STD_AC_LUMA_COUNTS, &STD_AC_LUMA_SYMBOLS);
    let chroma_dc = HuffEncoder::new(STD_DC_CHROMA_COUNTS, &STD_DC_CHROMA_SYMBOLS);
    let chroma_ac = HuffEncoder::new(STD_AC_CHROMA_COUNTS, &STD_AC_CHROMA_SYMBOLS);

    let mut writer = BitWriter::new();
    let mut dc_pred = vec![0i16; planes.len()];

    for mcu in 0..geo.mcus_x * geo.mcus_y {
        let (mcu_x, mcu_y) = (mcu % geo.mcus_x, mcu / geo.mcus_x);
        for (si, plane) in planes.iter().enumerate() {
            let (dc, ac) = if si == 0 {
                (&luma_dc, &luma_ac)
            } else {
                (&chroma_dc, &chroma_ac)
            };
            let (h, v) = geo.blocks_per_mcu[si];
            for by in 0..v {
                for bx in 0..h {
                    let block_row = mcu_y * v + by;
                    let block_col = mcu_x * h + bx;
                    encode_block(&mut writer, dc, ac, &mut dc_pred[si], plane, block_row, block_col);
                }
            }
        }
    }
    writer.finish()
}

fn encode_block(
    writer: &mut BitWriter,
    dc_table: &HuffEncoder,
    ac_table: &HuffEncoder,
    dc_pred: &mut i16,
    plane: &CoeffPlane,
    block_row: usize,
    block_col: usize,
) {
    debug_assert!(block_col < plane.blocks_wide());
    let base = block_row * 8 * plane.width + block_col * 8;
    let read = |natural: usize| -> i16 {
        let (r, c) = (natural / 8, natural % 8);
        plane.data[base + r * plane.width + c]
    };

    let dc = read(0);
    let diff = dc.wrapping_sub(*dc_pred);
    *dc_pred = dc;
    let (cat, bits) = magnitude(diff as i32);
    dc_table.emit(writer, cat);
    writer.put(bits, cat as u32);

    let mut run = 0u8;
    for k in 1..64 {
        let v = read(UNZIGZAG[k]);
        if v == 0 {
            run += 1;
            continue;
        }
        while run > 15 {
            ac_table.emit(writer, 0xF0); // ZRL
            run -= 16;
        }
        let (cat, bits) = magnitude(v as i32);
        ac_table.emit(writer, (run << 4) | cat);
        writer.put(bits, cat as u32);
        run = 0;
    }
    if run > 0 {
        ac_table.emit(writer, 0x00); // EOB
    }
}

/// Magnitude category and the category-sized bit pattern for `v`
/// (T.81 F.1.2.1/F.1.2.2).
#[inline]
fn magnitude(v: i32) -> (u8, u32) {
    let cat = (32 - v.unsigned_abs().leading_zeros()) as u8;
    let bits = (if v < 0 { v + (1 << cat) - 1 } else { v }) as u32;
    (cat, bits & ((1u32 << cat) - 1))
}
