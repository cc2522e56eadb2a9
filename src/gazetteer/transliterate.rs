//! Latin-script renderings of native-language unit names.
//!
//! Only alphabets with a stable letter-by-letter romanization are handled
//! (Cyrillic, Greek, Armenian, Georgian); anything else is reported as
//! [`Transliteration::UnsupportedScript`] and produces no candidate.

use deunicode::deunicode_char;

/// Outcome of transliterating one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transliteration {
    /// Latin rendering of a name written in a supported script
    Latin(String),
    /// The name is already in Latin script; nothing to add
    AlreadyLatin,
    /// The name uses a script without a supported romanization
    UnsupportedScript { name: String },
}

impl Transliteration {
    pub fn into_latin(self) -> Option<String> {
        match self {
            Transliteration::Latin(name) => Some(name),
            _ => None,
        }
    }
}

fn is_latin(c: char) -> bool {
    c <= '\u{024F}' || ('\u{1E00}'..='\u{1EFF}').contains(&c)
}

fn is_supported_script(c: char) -> bool {
    matches!(c,
        '\u{0400}'..='\u{052F}'   // Cyrillic + supplement
        | '\u{0370}'..='\u{03FF}' // Greek
        | '\u{1F00}'..='\u{1FFF}' // Greek extended
        | '\u{0530}'..='\u{058F}' // Armenian
        | '\u{10A0}'..='\u{10FF}' // Georgian
    )
}

/// Romanize a native-language name.
pub fn transliterate(name: &str) -> Transliteration {
    let letters = || name.chars().filter(|c| c.is_alphabetic());

    if letters().all(is_latin) {
        return Transliteration::AlreadyLatin;
    }
    if !letters().all(|c| is_latin(c) || is_supported_script(c)) {
        return Transliteration::UnsupportedScript {
            name: name.to_string(),
        };
    }

    let mut latin = String::with_capacity(name.len());
    for c in name.chars() {
        match deunicode_char(c) {
            Some(s) => latin.push_str(s),
            None => {
                return Transliteration::UnsupportedScript {
                    name: name.to_string(),
                }
            }
        }
    }

    // Soft sign comes out as an apostrophe
    if name.contains('ь') {
        latin = latin.replace('\'', "");
    }

    Transliteration::Latin(latin.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyrillic_is_romanized() {
        match transliterate("Амурская область") {
            Transliteration::Latin(name) => {
                assert!(name.starts_with("Amursk"));
                assert!(!name.contains('\''));
                assert!(name.is_ascii());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_latin_names_are_left_alone() {
        assert_eq!(transliterate("Bayern"), Transliteration::AlreadyLatin);
        assert_eq!(transliterate("Đắk Lắk"), Transliteration::AlreadyLatin);
        assert_eq!(transliterate("Île-de-France"), Transliteration::AlreadyLatin);
    }

    #[test]
    fn test_unsupported_script() {
        assert_eq!(
            transliterate("กรุงเทพมหานคร"),
            Transliteration::UnsupportedScript {
                name: "กรุงเทพมหานคร".to_string()
            }
        );
        assert!(transliterate("北京市").into_latin().is_none());
    }

    #[test]
    fn test_greek() {
        let latin = transliterate("Κρήτη").into_latin().unwrap();
        assert!(latin.is_ascii());
        assert!(latin.starts_with('K'));
    }
}
