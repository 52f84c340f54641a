/// Deterministic 32-bit generator used for shuffles. Callers own the state
/// word so engines can be seeded and replayed.
pub fn next_u32(state: &mut u32) -> u32 {
    let mut word = state.wrapping_add(0x6d2b79f5);
    *state = word;
    word = (word ^ (word >> 15)).wrapping_mul(word | 1);
    word ^= word.wrapping_add((word ^ (word >> 7)).wrapping_mul(word | 61));
    word ^ (word >> 14)
}

/// Uniform draw in `0..bound` via rejection sampling. `bound` must be
/// non-zero; a zero bound returns 0.
pub fn next_bounded(state: &mut u32, bound: u32) -> u32 {
    if bound == 0 {
        return 0;
    }
    let threshold = (u64::from(u32::MAX) + 1) / u64::from(bound) * u64::from(bound);
    let mut candidate = next_u32(state);
    while u64::from(candidate) >= threshold {
        candidate = next_u32(state);
    }
    candidate % bound
}
