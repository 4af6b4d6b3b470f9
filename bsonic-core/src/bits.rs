/// A fixed-length sequence of bits, packed least-significant bit first within each byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    len: usize,
    bytes: Vec<u8>,
}

impl BitSet {
    /// All bits cleared.
    pub fn new(len: usize) -> Self {
        BitSet {
            len,
            bytes: vec![0; len.div_ceil(8)],
        }
    }

    /// Uses every bit of `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        BitSet {
            len: bytes.len() * 8,
            bytes,
        }
    }

    /// Uses the first `len` bits of `bytes`, or `None` if there are too few bytes.
    pub fn from_bytes_with_len(bytes: impl Into<Vec<u8>>, len: usize) -> Option<Self> {
        let mut bytes = bytes.into();
        if bytes.len() < len.div_ceil(8) {
            return None;
        }
        bytes.truncate(len.div_ceil(8));
        let mut set = BitSet { len, bytes };
        set.clear_padding();
        Some(set)
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut set = BitSet::new(bits.len());
        for (i, &bit) in bits.iter().enumerate() {
            set.set(i, bit);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        (index < self.len).then(|| self.bytes[index / 8] & (1 << (index % 8)) != 0)
    }

    /// Sets a bit. Indices past the end are ignored.
    pub fn set(&mut self, index: usize, value: bool) {
        if index >= self.len {
            return;
        }
        let mask = 1 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.bytes[i / 8] & (1 << (i % 8)) != 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn clear_padding(&mut self) {
        let used = self.len % 8;
        if used != 0 {
            if let Some(last) = self.bytes.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
    }
}
