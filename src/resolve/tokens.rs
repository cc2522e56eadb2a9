//! Tokenization of free-text location strings (`country[:area,area,...]`).

use regex::Regex;
use std::sync::OnceLock;

/// Known multi-token aliases, applied to cleaned keys
const TOKEN_ALIASES: &[(&str, &str)] = &[
    ("west siberia", "Siberian Federal District"),
    ("east siberia", "Siberian Federal District"),
];

fn bracketed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.+\)").unwrap())
}

fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s-]+").unwrap())
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_letters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z]+").unwrap())
}

fn place_like_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][a-z]{4,}$").unwrap())
}

/// One cleaned area token.
///
/// `text` keeps the source casing and is what goes into queries; `key` is
/// its lower-cased form used for every comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub text: String,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            key: text.to_lowercase(),
            text,
        }
    }
}

/// Multiset of area tokens still waiting to be matched.
///
/// Stages take the bag by value and hand back what is left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBag {
    tokens: Vec<Token>,
}

impl TokenBag {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tokens.iter().any(|t| t.key == key)
    }

    /// Remove exactly one token with this key
    pub fn take(mut self, key: &str) -> (Self, Option<Token>) {
        let taken = self
            .tokens
            .iter()
            .position(|t| t.key == key)
            .map(|idx| self.tokens.remove(idx));
        (self, taken)
    }

    /// Query texts, most precise first
    pub fn texts_reversed(&self) -> Vec<&str> {
        self.tokens.iter().rev().map(|t| t.text.as_str()).collect()
    }
}

/// A free-text location split into its country part and area tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub country: Option<Token>,
    pub areas: TokenBag,
}

/// Strip bracketed asides and punctuation, collapse whitespace.
pub fn clean_token(raw: &str) -> String {
    let token = raw.replace('_', " ");
    let token = bracketed().replace_all(&token, "");
    let token = punctuation().replace_all(&token, "");
    let token = whitespace().replace_all(&token, " ");
    token.trim().to_string()
}

/// First capitalized word of at least five letters in a strain name,
/// e.g. `Vietnam` in `A/chicken/Vietnam/NCVD-15A59/2015`.
pub fn strain_location(strain: &str) -> Option<String> {
    non_letters()
        .split(strain)
        .find(|word| place_like_word().is_match(word))
        .map(str::to_string)
}

/// Split `country[:area1,area2,...]` and clean every part.
///
/// Area tokens that are empty, repeat the country, or repeat an earlier
/// token are dropped. `extra` (usually from [`strain_location`]) is
/// treated as one more area.
pub fn parse_location(text: &str, extra: Option<&str>) -> ParsedLocation {
    let (country_text, areas_text) = match text.split_once(':') {
        Some((country, areas)) => (country, Some(areas)),
        None => (text, None),
    };

    let country = Some(Token::new(clean_token(country_text))).filter(|t| !t.key.is_empty());
    let country_key = country.as_ref().map(|t| t.key.as_str()).unwrap_or_default();

    let raw_areas = areas_text
        .into_iter()
        .flat_map(|areas| areas.split(','))
        .chain(extra);

    let mut tokens: Vec<Token> = Vec::new();
    for raw in raw_areas {
        let token = Token::new(clean_token(raw));
        if token.key.is_empty()
            || token.key == country_key
            || tokens.iter().any(|t| t.key == token.key)
        {
            continue;
        }
        tokens.push(token);
    }

    let tokens = tokens
        .into_iter()
        .map(|token| {
            match TOKEN_ALIASES.iter().find(|(alias, _)| *alias == token.key) {
                Some((_, canonical)) => Token::new(*canonical),
                None => token,
            }
        })
        .collect();

    ParsedLocation {
        country,
        areas: TokenBag::new(tokens),
    }
}
