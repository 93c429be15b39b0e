//! LEGO Power Functions infrared frame encoding.
//!
//! A frame is four nibbles sent MSB first:
//!
//! ```text
//! | toggle escape ch1 ch0 | addr m2 m1 m0 | d3 d2 d1 d0 | lrc |
//! ```
//!
//! `lrc = 0xF ^ n1 ^ n2 ^ n3`. Only single-output PWM mode is used
//! (`mode = 1 0 0 output`). Data nibble: `0` float, `1..=7` forward,
//! `8` brake then float, `9..=15` reverse (15 is the slowest).
//!
//! On the wire every bit is a 38kHz mark of 6 cycles followed by a space;
//! the space length encodes the bit.

use heapless::Vec;

use crate::traits::PfOutput;

/// Carrier frequency.
pub const CARRIER_HZ: u32 = 38_000;
/// Mark length of every symbol.
pub const MARK_US: u16 = 158;
/// Space after a `0` bit.
pub const LOW_SPACE_US: u16 = 263;
/// Space after a `1` bit.
pub const HIGH_SPACE_US: u16 = 553;
/// Space after the start and stop symbols.
pub const START_STOP_SPACE_US: u16 = 1026;
/// Receivers expect each message several times.
pub const REPEAT_COUNT: usize = 5;

/// Highest PWM step in either direction.
pub const MAX_STEP: i8 = 7;

/// Data nibble for brake-then-float.
pub const BRAKE: u8 = 0x8;

/// Start symbol, 16 data bits, stop symbol.
pub const SYMBOLS_PER_FRAME: usize = 18;

/// One mark/space pair in microseconds.
pub type Symbol = (u16, u16);

/// A single-output PWM frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    toggle: bool,
    channel: u8,
    output: PfOutput,
    data: u8,
}

impl Frame {
    /// Frame setting `output` on `channel` to a signed step in `-7..=7`.
    ///
    /// Out-of-range steps are clamped.
    pub fn level(channel: u8, output: PfOutput, step: i8) -> Self {
        Self {
            toggle: false,
            channel: channel & 0x03,
            output,
            data: level_nibble(step),
        }
    }

    /// Brake-then-float frame.
    pub fn brake(channel: u8, output: PfOutput) -> Self {
        Self {
            toggle: false,
            channel: channel & 0x03,
            output,
            data: BRAKE,
        }
    }

    /// Set the toggle bit. Receivers use it to tell repeats from new commands.
    pub fn with_toggle(mut self, toggle: bool) -> Self {
        self.toggle = toggle;
        self
    }

    /// Data nibble.
    pub fn data(&self) -> u8 {
        self.data
    }

    /// The four nibbles, checksum last.
    pub fn nibbles(&self) -> [u8; 4] {
        let n1 = (u8::from(self.toggle) << 3) | self.channel;
        let n2 = 0b0100
            | match self.output {
                PfOutput::Red => 0,
                PfOutput::Blue => 1,
            };
        let n3 = self.data & 0x0F;
        [n1, n2, n3, 0xF ^ n1 ^ n2 ^ n3]
    }

    /// The 16-bit word as sent.
    pub fn word(&self) -> u16 {
        self.nibbles()
            .iter()
            .fold(0u16, |acc, &n| (acc << 4) | u16::from(n))
    }

    /// Mark/space timings for one transmission of the frame.
    pub fn symbols(&self) -> Vec<Symbol, SYMBOLS_PER_FRAME> {
        let mut out = Vec::new();
        let word = self.word();
        let _ = out.push((MARK_US, START_STOP_SPACE_US));
        for bit in (0..16).rev() {
            let space = if word & (1 << bit) != 0 {
                HIGH_SPACE_US
            } else {
                LOW_SPACE_US
            };
            let _ = out.push((MARK_US, space));
        }
        let _ = out.push((MARK_US, START_STOP_SPACE_US));
        out
    }
}

/// Data nibble for a signed PWM step.
pub fn level_nibble(step: i8) -> u8 {
    let step = step.clamp(-MAX_STEP, MAX_STEP);
    if step >= 0 {
        step as u8
    } else {
        (16 + i16::from(step)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_nibbles() {
        assert_eq!(level_nibble(0), 0x0);
        assert_eq!(level_nibble(1), 0x1);
        assert_eq!(level_nibble(7), 0x7);
        assert_eq!(level_nibble(-1), 0xF);
        assert_eq!(level_nibble(-7), 0x9);
        assert_eq!(level_nibble(12), 0x7);
        assert_eq!(level_nibble(-12), 0x9);
    }

    #[test]
    fn red_forward_full() {
        // channel 1, red, step 7
        let frame = Frame::level(0, PfOutput::Red, 7);
        assert_eq!(frame.nibbles(), [0x0, 0x4, 0x7, 0xF ^ 0x4 ^ 0x7]);
        assert_eq!(frame.word(), 0x047C);
    }

    #[test]
    fn blue_brake_with_toggle() {
        let frame = Frame::brake(2, PfOutput::Blue).with_toggle(true);
        let [n1, n2, n3, lrc] = frame.nibbles();
        assert_eq!(n1, 0b1010);
        assert_eq!(n2, 0b0101);
        assert_eq!(n3, BRAKE);
        assert_eq!(lrc, 0xF ^ n1 ^ n2 ^ n3);
    }

    #[test]
    fn channel_masked() {
        let frame = Frame::level(5, PfOutput::Red, 1);
        assert_eq!(frame.nibbles()[0], 0x1);
    }

    #[test]
    fn symbols_frame_start_and_stop() {
        let symbols = Frame::level(0, PfOutput::Red, 0).symbols();
        assert_eq!(symbols.len(), SYMBOLS_PER_FRAME);
        assert_eq!(symbols[0], (MARK_US, START_STOP_SPACE_US));
        assert_eq!(symbols[17], (MARK_US, START_STOP_SPACE_US));
        assert!(symbols.iter().all(|&(mark, _)| mark == MARK_US));
    }

    #[test]
    fn symbols_encode_word_msb_first() {
        let frame = Frame::level(0, PfOutput::Red, 7);
        let word = frame.word();
        let symbols = frame.symbols();
        for (i, &(_, space)) in symbols[1..17].iter().enumerate() {
            let bit = word & (1 << (15 - i)) != 0;
            let expected = if bit { HIGH_SPACE_US } else { LOW_SPACE_US };
            assert_eq!(space, expected, "bit {}", i);
        }
    }
}
