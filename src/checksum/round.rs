use super::{packer::BLOCK_WORDS, state::DigestState};

/// Additive constants, `floor(2^32 * abs(sin(i + 1)))` for each of the 64 steps.
const K: [u32; 64] = [
    0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee, 0xf57c0faf, 0x4787c62a, 0xa8304613, 0xfd469501,
    0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be, 0x6b901122, 0xfd987193, 0xa679438e, 0x49b40821,
    0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa, 0xd62f105d, 0x02441453, 0xd8a1e681, 0xe7d3fbc8,
    0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed, 0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a,
    0xfffa3942, 0x8771f681, 0x6d9d6122, 0xfde5380c, 0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70,
    0x289b7ec6, 0xeaa127fa, 0xd4ef3085, 0x04881d05, 0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665,
    0xf4292244, 0x432aff97, 0xab9423a7, 0xfc93a039, 0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
    0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1, 0xf7537e82, 0xbd3af235, 0x2ad7d2bb, 0xeb86d391,
];

/// Left rotation amounts for each of the 64 steps.
const S: [u32; 64] = [
    7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, // Round 1
    5, 9, 14, 20, 5, 9, 14, 20, 5, 9, 14, 20, 5, 9, 14, 20, // Round 2
    4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, // Round 3
    6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21, // Round 4
];

/// Circular left rotation of a 32-bit word.
#[inline]
pub fn rotate_left(word: u32, count: u32) -> u32 {
    word.rotate_left(count)
}

/// The step shared by all four rounds: `rotl(a + f + x + constant, shift) + b`, wrapping.
#[inline]
pub fn mix(f_value: u32, a: u32, b: u32, x: u32, shift: u32, constant: u32) -> u32 {
    rotate_left(
        a.wrapping_add(f_value)
            .wrapping_add(x)
            .wrapping_add(constant),
        shift,
    )
    .wrapping_add(b)
}

#[inline]
fn round_f(b: u32, c: u32, d: u32) -> u32 {
    (b & c) | (!b & d)
}

#[inline]
fn round_g(b: u32, c: u32, d: u32) -> u32 {
    (b & d) | (c & !d)
}

#[inline]
fn round_h(b: u32, c: u32, d: u32) -> u32 {
    b ^ c ^ d
}

#[inline]
fn round_i(b: u32, c: u32, d: u32) -> u32 {
    c ^ (b | !d)
}

/// Runs the 64-step transformation of one 16-word block and chains the result onto `state`.
pub fn process_block(state: DigestState, block: &[u32; BLOCK_WORDS]) -> DigestState {
    let DigestState {
        mut a,
        mut b,
        mut c,
        mut d,
    } = state;

    for step in 0..64 {
        let (f_value, index) = match step / 16 {
            0 => (round_f(b, c, d), step),
            1 => (round_g(b, c, d), (5 * step + 1) % 16),
            2 => (round_h(b, c, d), (3 * step + 5) % 16),
            _ => (round_i(b, c, d), (7 * step) % 16),
        };

        let updated = mix(f_value, a, b, block[index], S[step], K[step]);

        // The register written next cycles a -> d -> c -> b.
        a = d;
        d = c;
        c = b;
        b = updated;
    }

    DigestState {
        a: state.a.wrapping_add(a),
        b: state.b.wrapping_add(b),
        c: state.c.wrapping_add(c),
        d: state.d.wrapping_add(d),
    }
}

/// Folds `process_block` over packed words, one block at a time in order.
pub fn process_blocks(state: DigestState, words: &[u32]) -> DigestState {
    debug_assert_eq!(words.len() % BLOCK_WORDS, 0, "words must form whole blocks");

    words.chunks_exact(BLOCK_WORDS).fold(state, |state, chunk| {
        let block: [u32; BLOCK_WORDS] = std::array::from_fn(|i| chunk[i]);
        process_block(state, &block)
    })
}
