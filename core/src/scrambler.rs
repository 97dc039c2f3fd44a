/// LCG multiplier (Numerical Recipes)
const LCG_MULTIPLIER: u32 = 1664525;

/// LCG increment (Numerical Recipes)
const LCG_INCREMENT: u32 = 1013904223;

/// Keyed XOR stream cipher used to whiten packet payloads.
///
/// The keystream is the high byte of a 32-bit linear congruential generator.
/// State carries over between calls, so payloads must be scrambled in the
/// order they are transmitted. Scrambling is its own inverse: a second
/// scrambler with the same seed fed the same byte count recovers the input.
#[derive(Debug, Clone)]
pub struct Scrambler {
    state: u32,
}

impl Scrambler {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Current generator state (the next keystream byte is `state >> 24`)
    pub fn state(&self) -> u32 {
        self.state
    }

    /// XOR `data` in place with the keystream
    pub fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= (self.state >> 24) as u8;
            self.state = self
                .state
                .wrapping_mul(LCG_MULTIPLIER)
                .wrapping_add(LCG_INCREMENT);
        }
    }

    /// Return a scrambled copy of `data`
    pub fn scramble(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply(&mut out);
        out
    }
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::new(0)
    }
}
