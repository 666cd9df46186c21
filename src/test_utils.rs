// src/test_utils.rs

use rand::RngCore;
use std::collections::VecDeque;

/// Random source that replays a fixed list of draws, then repeats `fallback`.
///
/// Roads reduce every draw modulo 100, so values below 100 come out as-is.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    draws: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedRng {
    pub fn new<I: IntoIterator<Item = u32>>(draws: I, fallback: u32) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback,
        }
    }

    pub fn constant(value: u32) -> Self {
        Self::new([], value)
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.draws.pop_front().unwrap_or(self.fallback)
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
