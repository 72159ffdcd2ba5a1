//! Comparación de cadenas "a la manera del locale" para ordenar nombres.
//!
//! Tres niveles, como una colación Unicode básica:
//!   1. letras base sin acentos ni mayúsculas,
//!   2. acentos,
//!   3. minúsculas antes que mayúsculas.
//! Si todo empata se comparan los puntos de código para que el orden sea total.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Clave de ordenación precalculada; útil con `sort_by_cached_key`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    primary: String,
    secondary: String,
    tertiary: Vec<bool>,
    raw: String,
}

impl CollationKey {
    pub fn new(s: &str) -> Self {
        let primary = s
            .nfd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect();
        let secondary = s.nfd().flat_map(char::to_lowercase).collect();
        let tertiary = s.nfd().map(char::is_uppercase).collect();

        Self {
            primary,
            secondary,
            tertiary,
            raw: s.to_string(),
        }
    }
}

pub fn compare(a: &str, b: &str) -> Ordering {
    CollationKey::new(a).cmp(&CollationKey::new(b))
}
