use crate::Result;
use crate::VdkError;
use std::borrow::Cow;

/// Byte-aligned and sub-byte bit reader over a borrowed buffer.
///
/// Reads are MSB-first within each byte. The cursor is tracked as a byte
/// index plus a 0..8 bit offset into that byte, which makes push-back
/// (needed by TS sync scanning and PES pack-header probing) a matter of
/// subtracting from a single running bit count rather than unwinding a
/// state machine.
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
    bit_position: u8,
}

impl<'a> BitReader<'a> {
    /// Wraps `data` with the cursor at its start.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            bit_position: 0,
        }
    }

    fn total_bits(&self) -> usize {
        self.data.len() * 8
    }

    fn cursor_bits(&self) -> usize {
        self.position * 8 + self.bit_position as usize
    }

    /// True while at least one more bit can be read.
    pub fn has_more_data(&self) -> bool {
        self.cursor_bits() < self.total_bits()
    }

    /// True when the cursor sits on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_position == 0
    }

    /// Reads a single bit (0 or 1).
    pub fn read_bit(&mut self) -> Result<u8> {
        Ok(self.read_bits(1)? as u8)
    }

    /// Reads `count` (up to 32) MSB-first bits, advancing the cursor.
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        if count > 32 {
            return Err(VdkError::InvalidData("Cannot read more than 32 bits".into()));
        }

        if self.cursor_bits() + count as usize > self.total_bits() {
            return Err(VdkError::ReadPastEnd(format!(
                "requested {} bits at bit offset {} with only {} bits available",
                count,
                self.cursor_bits(),
                self.total_bits()
            )));
        }

        let mut result = 0u32;
        let mut bits_left = count;

        while bits_left > 0 {
            let byte = self.data[self.position];
            let bits_in_byte = 8 - self.bit_position;
            let bits_to_read = bits_in_byte.min(bits_left);

            let mask = ((1u16 << bits_to_read) - 1) as u8;
            let shifted = (byte >> (8 - self.bit_position - bits_to_read)) & mask;

            result = (result << bits_to_read) | shifted as u32;

            self.bit_position += bits_to_read;
            if self.bit_position >= 8 {
                self.position += 1;
                self.bit_position = 0;
            }

            bits_left -= bits_to_read;
        }

        Ok(result)
    }

    /// Reads one byte, aligned or not.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Reads `count` bytes. Returns a borrowed slice when the cursor is
    /// byte-aligned; otherwise assembles an owned `Vec` one byte at a time.
    pub fn read_bytes(&mut self, count: usize) -> Result<Cow<'a, [u8]>> {
        if self.is_byte_aligned() {
            if self.position + count > self.data.len() {
                return Err(VdkError::ReadPastEnd(format!(
                    "requested {} bytes at byte offset {} with only {} bytes available",
                    count,
                    self.position,
                    self.data.len().saturating_sub(self.position)
                )));
            }
            let slice = &self.data[self.position..self.position + count];
            self.position += count;
            Ok(Cow::Borrowed(slice))
        } else {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(self.read_byte()?);
            }
            Ok(Cow::Owned(out))
        }
    }

    /// Advances the cursor by `count` bytes without returning them.
    pub fn skip_bytes(&mut self, count: usize) -> Result<()> {
        self.skip_bits(count as u32 * 8)
    }

    /// Advances the cursor by `count` bits without returning them.
    pub fn skip_bits(&mut self, count: u32) -> Result<()> {
        let new_pos = self.cursor_bits() + count as usize;

        if new_pos > self.total_bits() {
            return Err(VdkError::ReadPastEnd("Attempted to skip past end of data".into()));
        }

        self.position = new_pos / 8;
        self.bit_position = (new_pos % 8) as u8;

        Ok(())
    }

    /// Rewinds the cursor by `count` bits.
    pub fn push_back_bits(&mut self, count: u32) -> Result<()> {
        let cur = self.cursor_bits();
        if count as usize > cur {
            return Err(VdkError::InvalidData(
                "push_back_bits would rewind before start of buffer".into(),
            ));
        }
        let new_pos = cur - count as usize;
        self.position = new_pos / 8;
        self.bit_position = (new_pos % 8) as u8;
        Ok(())
    }

    /// Rewinds the cursor by one byte.
    pub fn push_back_byte(&mut self) -> Result<()> {
        self.push_back_bits(8)
    }

    /// Rewinds the cursor by `count` bytes.
    pub fn push_back_bytes(&mut self, count: usize) -> Result<()> {
        self.push_back_bits(count as u32 * 8)
    }

    /// Returns the current cursor position in bytes, rounded up to the
    /// next whole byte when the cursor sits mid-byte.
    pub fn position_bytes(&self) -> usize {
        if self.bit_position == 0 {
            self.position
        } else {
            self.position + 1
        }
    }

    /// Reads `count` bits without advancing the cursor.
    pub fn peek(&mut self, count: u8) -> Result<u32> {
        let value = self.read_bits(count)?;
        self.push_back_bits(count as u32)?;
        Ok(value)
    }

    /// Returns the byte the cursor currently sits within, ignoring any
    /// sub-byte bit offset.
    pub fn get_current_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| VdkError::ReadPastEnd("no current byte".into()))
    }

    /// Returns the byte `relative_offset` bytes from the current byte
    /// position (negative looks backward).
    pub fn get_byte_at(&self, relative_offset: isize) -> Result<u8> {
        let idx = self.position as isize + relative_offset;
        if idx < 0 || idx as usize >= self.data.len() {
            return Err(VdkError::ReadPastEnd(format!("byte offset {} out of range", idx)));
        }
        Ok(self.data[idx as usize])
    }

    /// Advances the cursor to the start of the next byte, if not already aligned.
    #[allow(dead_code)]
    pub fn align_to_byte(&mut self) {
        if self.bit_position > 0 {
            self.position += 1;
            self.bit_position = 0;
        }
    }
}

#[cfg(test)]
#[path = "bits_test.rs"]
mod bits_test;
