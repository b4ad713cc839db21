//! Text support for overlays: the standard 14 fonts, their widths and the
//! WinAnsi encoding used to show text with them.

mod encoding;
mod font;
mod metrics;

pub use encoding::encode_win_ansi;
pub use font::StandardFont;
pub use metrics::{measure_char, measure_text};
