/// Reassemble fixed-width bit chunks into bytes.
///
/// The chunks are read as one big-endian bitstream: bits are taken from the
/// most significant end of each chunk, in input order, and sliced into
/// 8-bit groups. Only the low `chunk_bits` bits of each chunk are read.
///
/// A trailing group with fewer than 8 bits is dropped, never padded. The
/// sender always emits a whole number of bytes, so a partial group can only
/// come from a lost or spurious symbol.
///
/// `chunk_bits` may be any width from 1 to 32; a width of zero yields no
/// bytes.
///
/// ```
/// use sonicrx_core::assemble;
///
/// assert_eq!(assemble(4, &[0x4, 0x8, 0x6, 0x9]), vec![0x48, 0x69]);
/// assert_eq!(assemble(4, &[0x4, 0x8, 0x6]), vec![0x48]);
/// ```
pub fn assemble(chunk_bits: u32, chunks: &[u32]) -> Vec<u8> {
    debug_assert!(chunk_bits <= 32, "chunk width {} exceeds u32", chunk_bits);
    let mut out = Vec::with_capacity(chunks.len() * chunk_bits as usize / 8);
    if chunk_bits == 0 {
        return out;
    }

    let mut chunk_idx = 0;
    let mut bit_idx = 0; // bits already read from chunks[chunk_idx]
    let mut byte: u32 = 0;
    let mut bits_needed = 8;

    while chunk_idx < chunks.len() {
        let available = chunk_bits - bit_idx;
        let take = bits_needed.min(available);
        let offset = available - take;

        let mask = ((1u64 << take) - 1) << offset;
        let taken = ((chunks[chunk_idx] as u64 & mask) >> offset) as u32;
        byte = (byte << take) | taken;
        bits_needed -= take;
        bit_idx += take;

        if bits_needed == 0 {
            out.push(byte as u8);
            byte = 0;
            bits_needed = 8;
        }

        if bit_idx >= chunk_bits {
            chunk_idx += 1;
            bit_idx = 0;
        }
    }

    out
}
