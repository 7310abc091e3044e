//! Huffman coding for the entropy-coded scan.
//!
//! Decode uses the tables carried in the source file's DHT segments; encode
//! always uses the standard Annex K tables. The asymmetry is deliberate: a
//! source file with optimised tables has codes only for the (run, size)
//! pairs its own data produces, and an LSB write can push a coefficient
//! into a magnitude category the optimised table cannot express. The
//! standard tables cover every legal baseline symbol.

use crate::{Error, Result};

fn truncated() -> Error {
    Error::MalformedCover("truncated scan data".to_string())
}

/// A Huffman table in decode form (T.81 F.2.2.3).
pub(crate) struct HuffTable {
    symbols: Vec<u8>,
    mincode: [i32; 17],
    maxcode: [i32; 17],
    valptr: [i32; 17],
}

impl HuffTable {
    /// Build decode structures from the DHT `counts` and `symbols` lists.
    pub fn new(counts: [u8; 16], symbols: Vec<u8>) -> Self {
        let mut mincode = [0i32; 17];
        let mut maxcode = [-1i32; 17];
        let mut valptr = [0i32; 17];
        let mut code = 0i32;
        let mut k = 0i32;
        for l in 1..=16 {
            let n = counts[l - 1] as i32;
            if n > 0 {
                valptr[l] = k;
                mincode[l] = code;
                k += n;
                code += n;
                maxcode[l] = code - 1;
            }
            code <<= 1;
        }
        Self {
            symbols,
            mincode,
            maxcode,
            valptr,
        }
    }

    /// Decode one symbol from `reader`.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u8> {
        let mut code = 0i32;
        for l in 1..=16 {
            code = (code << 1) | reader.bit()? as i32;
            if code <= self.maxcode[l] {
                let idx = (self.valptr[l] + code - self.mincode[l]) as usize;
                return self
                    .symbols
                    .get(idx)
                    .copied()
                    .ok_or_else(|| Error::MalformedCover("invalid Huffman code".to_string()));
            }
        }
        Err(Error::MalformedCover("invalid Huffman code".to_string()))
    }
}

/// A Huffman table in encode form: code and length per symbol.
pub(crate) struct HuffEncoder {
    codes: [u16; 256],
    sizes: [u8; 256],
}

impl HuffEncoder {
    pub fn new(counts: [u8; 16], symbols: &[u8]) -> Self {
        let mut codes = [0u16; 256];
        let mut sizes = [0u8; 256];
        let mut code = 0u16;
        let mut k = 0usize;
        for l in 1..=16u8 {
            for _ in 0..counts[l as usize - 1] {
                let sym = symbols[k] as usize;
                codes[sym] = code;
                sizes[sym] = l;
                code += 1;
                k += 1;
            }
            code <<= 1;
        }
        Self { codes, sizes }
    }

    #[inline]
    pub fn emit(&self, writer: &mut BitWriter, symbol: u8) {
        let s = self.sizes[symbol as usize];
        debug_assert!(s > 0, "symbol {symbol:#x} missing from encode table");
        writer.put(self.codes[symbol as usize] as u32, s as u32);
    }
}

/// MSB-first bit reader over entropy-coded data with 0xFF00 unstuffing.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buf: u8,
    nbits: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buf: 0,
            nbits: 0,
        }
    }

    #[inline]
    pub fn bit(&mut self) -> Result<u8> {
        if self.nbits == 0 {
            self.buf = self.next_data_byte()?;
            self.nbits = 8;
        }
        self.nbits -= 1;
        Ok((self.buf >> self.nbits) & 1)
    }

    /// Read `n` bits (n ≤ 16), MSB first.
    pub fn bits(&mut self, n: u8) -> Result<u16> {
        let mut v = 0u16;
        for _ in 0..n {
            v = (v << 1) | self.bit()? as u16;
        }
        Ok(v)
    }

    /// Decode a magnitude category value (T.81 `RECEIVE` + `EXTEND`).
    pub fn receive_extend(&mut self, category: u8) -> Result<i16> {
        let v = self.bits(category)? as i32;
        let vt = 1 << (category as i32 - 1);
        Ok(if v < vt {
            (v - (1 << category as i32) + 1) as i16
        } else {
            v as i16
        })
    }

    /// Discard partial bits and consume the restart marker expected at the
    /// current byte position.
    pub fn restart(&mut self) -> Result<()> {
        self.nbits = 0;
        if self.pos + 1 < self.data.len()
            && self.data[self.pos] == 0xFF
            && (0xD0..=0xD7).contains(&self.data[self.pos + 1])
        {
            self.pos += 2;
            Ok(())
        } else {
            Err(Error::MalformedCover("missing restart marker".to_string()))
        }
    }

    fn next_data_byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or_else(truncated)?;
        if b != 0xFF {
            self.pos += 1;
            return Ok(b);
        }
        match self.data.get(self.pos + 1) {
            Some(0x00) => {
                self.pos += 2;
                Ok(0xFF)
            }
            // A restart marker here means the stream and the MCU walk
            // disagree - only `restart` may consume one.
            _ => Err(truncated()),
        }
    }
}

/// MSB-first bit writer with 0xFF stuffing and 1-padding on flush.
pub(crate) struct BitWriter {
    out: Vec<u8>,
    buf: u32,
    nbits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            buf: 0,
            nbits: 0,
        }
    }

    #[inline]
    pub fn put(&mut self, bits: u32, n: u32) {
        debug_assert!(n <= 24 && (n == 0 || bits < (1u32 << n)));
        self.buf = (self.buf << n) | bits;
        self.nbits += n;
        while self.nbits >= 8 {
            let byte = (self.buf >> (self.nbits - 8)) as u8;
            self.out.push(byte);
            if byte == 0xFF {
                self.out.push(0x00);
            }
            self.nbits -= 8;
        }
        self.buf &= (1u32 << self.nbits) - 1;
    }

    /// Pad the final partial byte with 1-bits and return the stream.
    pub fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            let pad = 8 - self.nbits;
            self.put((1u32 << pad) - 1, pad);
        }
        self.out
    }
}

/// Zigzag scan position → natural (row-major) block index.
pub(crate) const UNZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, //
    17, 24, 32, 25, 18, 11, 4, 5, //
    12, 19, 26, 33, 40, 48, 41, 34, //
    27, 20, 13, 6, 7, 14, 21, 28, //
    35, 42, 49, 56, 57, 50, 43, 36, //
    29, 22, 15, 23, 30, 37, 44, 51, //
    58, 59, 52, 45, 38, 31, 39, 46, //
    53, 60, 61, 54, 47, 55, 62, 63,
];

// Standard Huffman tables from ITU T.81 Annex K.3. These cover every legal
// baseline symbol, which is what lets the writer re-encode any decoded
// coefficient stream.

pub(crate) const STD_DC_LUMA_COUNTS: [u8; 16] =
    [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
pub(crate) const STD_DC_LUMA_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub(crate) const STD_DC_CHROMA_COUNTS: [u8; 16] =
    [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
pub(crate) const STD_DC_CHROMA_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

pub(crate) const STD_AC_LUMA_COUNTS: [u8; 16] =
    [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
pub(crate) const STD_AC_LUMA_SYMBOLS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61,
    0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52,
    0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x25,
    0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44, 0x45,
    0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63, 0x64,
    0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x83,
    0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99,
    0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3,
    0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8,
    0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

pub(crate) const STD_AC_CHROMA_COUNTS: [u8; 16] =
    [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
pub(crate) const STD_AC_CHROMA_SYMBOLS: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61,
    0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33,
    0x52, 0xF0, 0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34, 0xE1, 0x25, 0xF1, 0x17, 0x18,
    0x19, 0x1A, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x43, 0x44,
    0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0x63,
    0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A,
    0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97,
    0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA,
    0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
    0xE8, 0xE9, 0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_writer_roundtrips_through_reader() {
        let mut w = BitWriter::new();
        w.put(0b101, 3);
        w.put(0b11111111, 8); // forces a stuffed 0xFF at some alignment
        w.put(0b0, 1);
        w.put(0x3FF, 10);
        let bytes = w.finish();

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.bits(3).unwrap(), 0b101);
        assert_eq!(r.bits(8).unwrap(), 0xFF);
        assert_eq!(r.bits(1).unwrap(), 0);
        assert_eq!(r.bits(10).unwrap(), 0x3FF);
    }

    #[test]
    fn receive_extend_matches_t81() {
        // Category 3 values: bit patterns 000..011 map to -7..-4, 100..111 to 4..7.
        let cases: [(u16, i16); 4] = [(0b000, -7), (0b011, -4), (0b100, 4), (0b111, 7)];
        for (pattern, expected) in cases {
            let mut w = BitWriter::new();
            w.put(pattern as u32, 3);
            let bytes = w.finish();
            let mut r = BitReader::new(&bytes);
            assert_eq!(r.receive_extend(3).unwrap(), expected);
        }
    }

    #[test]
    fn standard_tables_decode_their_own_encodings() {
        let enc = HuffEncoder::new(STD_AC_LUMA_COUNTS, &STD_AC_LUMA_SYMBOLS);
        let dec = HuffTable::new(STD_AC_LUMA_COUNTS, STD_AC_LUMA_SYMBOLS.to_vec());
        let mut w = BitWriter::new();
        for &sym in STD_AC_LUMA_SYMBOLS.iter() {
            enc.emit(&mut w, sym);
        }
        let bytes = w.finish();
        let mut r = BitReader::new(&bytes);
        for &sym in STD_AC_LUMA_SYMBOLS.iter() {
            assert_eq!(dec.decode(&mut r).unwrap(), sym);
        }
    }

    #[test]
    fn unzigzag_is_a_permutation() {
        let mut seen = [false; 64];
        for &n in UNZIGZAG.iter() {
            assert!(!seen[n]);
            seen[n] = true;
        }
        // First diagonal steps of the scan.
        assert_eq!(&UNZIGZAG[..6], &[0, 1, 8, 16, 9, 2]);
    }
}
