//! Fixed-capacity block ring with a write cursor and a delayed read cursor.
//!
//! Cursors are plain `usize` indices advanced with explicit modulo arithmetic.
//! Floating point only appears transiently when a delay in seconds is turned
//! into a block offset.

/// Block counts derived from rate, chunk size and capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferGeometry {
    blocks_per_second: f64,
    len_blocks: usize,
}

impl BufferGeometry {
    pub fn new(sample_rate: u32, chunk_frames: u32, capacity_secs: f64) -> Self {
        let blocks_per_second = f64::from(sample_rate) / f64::from(chunk_frames.max(1));
        let len_blocks = (capacity_secs * blocks_per_second).round().max(1.0) as usize;
        Self {
            blocks_per_second,
            len_blocks,
        }
    }

    pub fn blocks_per_second(&self) -> f64 {
        self.blocks_per_second
    }

    pub fn len_blocks(&self) -> usize {
        self.len_blocks
    }

    /// Whole blocks covering `seconds`, reduced into the ring.
    pub fn delay_blocks(&self, seconds: f64) -> usize {
        let blocks = (seconds.max(0.0) * self.blocks_per_second).round() as usize;
        blocks % self.len_blocks
    }

    /// Read position that trails `write_index` by `seconds`.
    pub fn read_index_for(&self, write_index: usize, seconds: f64) -> usize {
        let offset = self.delay_blocks(seconds);
        (write_index % self.len_blocks + self.len_blocks - offset) % self.len_blocks
    }
}

/// Pre-allocated ring of audio blocks. Never resized after construction.
pub struct DelayRing {
    geometry: BufferGeometry,
    blocks: Vec<Vec<u8>>,
    write_index: usize,
    read_index: usize,
}

impl DelayRing {
    /// Allocate every slot up front, filled with `silence` so early reads are
    /// well-defined. The write cursor starts `initial_delay` ahead of the read
    /// cursor, which starts at zero.
    pub fn new(geometry: BufferGeometry, silence: &[u8], initial_delay: f64) -> Self {
        let blocks = vec![silence.to_vec(); geometry.len_blocks()];
        Self {
            geometry,
            blocks,
            write_index: geometry.delay_blocks(initial_delay),
            read_index: 0,
        }
    }

    pub fn geometry(&self) -> BufferGeometry {
        self.geometry
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Slot the next captured block goes into.
    pub fn write_slot(&mut self) -> &mut [u8] {
        &mut self.blocks[self.write_index]
    }

    /// Block due for playback this cycle.
    pub fn read_slot(&self) -> &[u8] {
        &self.blocks[self.read_index]
    }

    /// Step both cursors by one block.
    pub fn advance(&mut self) {
        let len = self.blocks.len();
        self.write_index = (self.write_index + 1) % len;
        self.read_index = (self.read_index + 1) % len;
    }

    /// Jump the read cursor so it trails the write cursor by `seconds`.
    /// Applying the same delay twice leaves the cursors unchanged.
    pub fn retarget(&mut self, seconds: f64) {
        self.read_index = self.geometry.read_index_for(self.write_index, seconds);
    }

    /// Current distance between the cursors, in blocks.
    pub fn lag_blocks(&self) -> usize {
        let len = self.blocks.len();
        (self.write_index + len - self.read_index) % len
    }
}
