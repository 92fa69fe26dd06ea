//! Byte stream decoder
//!
//! Turns raw bytes from `write` into [`Input`]s. UTF-8 sequences are
//! assembled across calls, control bytes are classified, and escape
//! sequences are swallowed when configured to. Nothing here touches the
//! terminal state.

use unicode_width::UnicodeWidthChar;

use super::state::Input;

const ESC: u8 = 0x1B;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum DecoderState {
    #[default]
    Ground,
    /// Inside a multi-byte UTF-8 sequence
    Utf8 { value: u32, remaining: u8, min: u32 },
    /// ESC received
    Escape,
    /// ESC [ received, waiting for the final byte
    Csi,
}

/// Incremental decoder from bytes to console input
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    state: DecoderState,
    discard_escapes: bool,
}

impl Decoder {
    pub fn new(discard_escapes: bool) -> Self {
        Self {
            state: DecoderState::Ground,
            discard_escapes,
        }
    }

    /// Whether a multi-byte sequence or escape is partially received
    pub fn is_pending(&self) -> bool {
        self.state != DecoderState::Ground
    }

    /// Feed a single byte
    pub fn feed(&mut self, byte: u8) -> Option<Input> {
        match self.state {
            DecoderState::Ground => self.ground(byte),
            DecoderState::Utf8 { value, remaining, min } => self.utf8(byte, value, remaining, min),
            DecoderState::Escape => self.escape(byte),
            DecoderState::Csi => self.csi(byte),
        }
    }

    fn ground(&mut self, byte: u8) -> Option<Input> {
        match byte {
            0x0A | 0x0B | 0x0C => Some(Input::Newline),
            0x0D => Some(Input::CarriageReturn),
            0x08 | 0x7F => Some(Input::Backspace),
            0x09 => Some(Input::Tab),
            ESC if self.discard_escapes => {
                self.state = DecoderState::Escape;
                None
            }
            0x00..=0x1F => None,
            0x20..=0x7E => Some(Input::Print(byte as char)),
            0xC2..=0xDF => self.start_utf8(byte & 0x1F, 1, 0x80),
            0xE0..=0xEF => self.start_utf8(byte & 0x0F, 2, 0x800),
            0xF0..=0xF4 => self.start_utf8(byte & 0x07, 3, 0x1_0000),
            _ => {
                tracing::trace!("Dropped invalid byte 0x{:02X}", byte);
                None
            }
        }
    }

    fn start_utf8(&mut self, bits: u8, remaining: u8, min: u32) -> Option<Input> {
        self.state = DecoderState::Utf8 {
            value: bits as u32,
            remaining,
            min,
        };
        None
    }

    fn utf8(&mut self, byte: u8, value: u32, remaining: u8, min: u32) -> Option<Input> {
        if byte & 0xC0 != 0x80 {
            // Truncated sequence: drop it and treat this byte afresh
            tracing::trace!("Dropped truncated UTF-8 sequence");
            self.state = DecoderState::Ground;
            return self.ground(byte);
        }

        let value = (value << 6) | (byte & 0x3F) as u32;
        if remaining > 1 {
            self.state = DecoderState::Utf8 { value, remaining: remaining - 1, min };
            return None;
        }

        self.state = DecoderState::Ground;
        if value < min {
            tracing::trace!("Dropped overlong UTF-8 encoding of U+{:04X}", value);
            return None;
        }
        char::from_u32(value).and_then(printable)
    }

    fn escape(&mut self, byte: u8) -> Option<Input> {
        self.state = match byte {
            b'[' => DecoderState::Csi,
            // Intermediate bytes keep the sequence open
            0x20..=0x2F | ESC => DecoderState::Escape,
            0x00..=0x1F => {
                self.state = DecoderState::Ground;
                return self.ground(byte);
            }
            _ => DecoderState::Ground,
        };
        None
    }

    fn csi(&mut self, byte: u8) -> Option<Input> {
        match byte {
            // Final byte ends the sequence
            0x40..=0x7E => self.state = DecoderState::Ground,
            // Parameters and intermediates
            0x20..=0x3F => {}
            // ESC restarts, anything else aborts
            ESC => self.state = DecoderState::Escape,
            _ => {
                self.state = DecoderState::Ground;
                return self.ground(byte);
            }
        }
        None
    }
}

/// Printable characters occupy one cell; everything else is dropped
fn printable(ch: char) -> Option<Input> {
    match ch.width() {
        Some(w) if w > 0 => Some(Input::Print(ch)),
        _ => {
            tracing::trace!("Dropped non-printing U+{:04X}", ch as u32);
            None
        }
    }
}
