/// Encode text for a simple font using `/WinAnsiEncoding` (Windows-1252).
/// Characters with no WinAnsi code become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(ch: char) -> u8 {
    match ch as u32 {
        // ASCII and the Latin-1 block shared with Windows-1252
        code @ (0x00..=0x7F | 0xA0..=0xFF) => code as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => b'?',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(encode_win_ansi("page 1 of 4"), b"page 1 of 4");
    }

    #[test]
    fn test_windows_1252_specials() {
        assert_eq!(encode_win_ansi("€ – ’"), vec![0x80, b' ', 0x96, b' ', 0x92]);
        assert_eq!(encode_win_ansi("Página"), vec![b'P', 0xE1, b'g', b'i', b'n', b'a']);
    }

    #[test]
    fn test_unmappable_characters() {
        assert_eq!(encode_win_ansi("第1页"), b"?1?");
    }
}
