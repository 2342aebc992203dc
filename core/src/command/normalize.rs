//! Canonical form for Persian phrases before keyword matching.
//!
//! Speech-to-text engines and keyboards disagree on Arabic vs Persian code
//! points and on where to put zero-width non-joiners, so both the phrase and
//! every keyword go through [`normalize`].

const ZWNJ: char = '\u{200C}';
const TATWEEL: char = '\u{0640}';

fn canonical_char(c: char) -> Option<char> {
    match c {
        // Arabic yeh / alef maksura → Persian yeh
        '\u{064A}' | '\u{0649}' => Some('\u{06CC}'),
        // Arabic kaf → Persian keheh
        '\u{0643}' => Some('\u{06A9}'),
        TATWEEL => None,
        ZWNJ => Some(' '),
        // Persian and Arabic-Indic digits
        '\u{06F0}'..='\u{06F9}' => char::from_digit(c as u32 - 0x06F0, 10),
        '\u{0660}'..='\u{0669}' => char::from_digit(c as u32 - 0x0660, 10),
        '\u{061F}' | '\u{060C}' | '?' | '!' | '.' | ',' => Some(' '),
        c => Some(c.to_ascii_lowercase()),
    }
}

pub fn normalize(text: &str) -> String {
    let mapped: String = text.chars().filter_map(canonical_char).collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arabic_letters_become_persian() {
        assert_eq!(normalize("كليد"), "کلید");
        assert_eq!(normalize("چراغ"), "چراغ");
    }

    #[test]
    fn zwnj_and_tatweel() {
        assert_eq!(normalize("روشن\u{200C}تر"), "روشن تر");
        assert_eq!(normalize("خامـــوش"), "خاموش");
    }

    #[test]
    fn whitespace_case_and_punctuation() {
        assert_eq!(normalize("  Turn  ON the Light!  "), "turn on the light");
        assert_eq!(normalize("چراغ نشیمن را روشن کن؟"), "چراغ نشیمن را روشن کن");
        assert_eq!(normalize("اتاق ۲"), "اتاق 2");
        assert_eq!(normalize(""), "");
    }
}
