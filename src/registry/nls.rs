//! Locale-dependent settings: country, code page and note labels.

use std::io::Write;

use super::Section;
use crate::error::Result;

struct Locale {
    name: &'static str,
    country: u16,
    codepage: u16,
    note: &'static str,
    warning: &'static str,
    caution: &'static str,
}

const LOCALES: &[Locale] = &[
    Locale {
        name: "en_US",
        country: 1,
        codepage: 850,
        note: "Note:",
        warning: "Warning:",
        caution: "CAUTION:",
    },
    Locale {
        name: "en_GB",
        country: 44,
        codepage: 850,
        note: "Note:",
        warning: "Warning:",
        caution: "CAUTION:",
    },
    Locale {
        name: "de_DE",
        country: 49,
        codepage: 850,
        note: "Hinweis:",
        warning: "Warnung:",
        caution: "VORSICHT:",
    },
    Locale {
        name: "fr_FR",
        country: 33,
        codepage: 850,
        note: "Remarque:",
        warning: "Avertissement:",
        caution: "ATTENTION:",
    },
    Locale {
        name: "es_ES",
        country: 34,
        codepage: 850,
        note: "Nota:",
        warning: "Aviso:",
        caution: "PRECAUCIÓN:",
    },
    Locale {
        name: "it_IT",
        country: 39,
        codepage: 850,
        note: "Nota:",
        warning: "Avvertenza:",
        caution: "ATTENZIONE:",
    },
    Locale {
        name: "nl_NL",
        country: 31,
        codepage: 850,
        note: "Opmerking:",
        warning: "Waarschuwing:",
        caution: "PAS OP:",
    },
    Locale {
        name: "pt_BR",
        country: 55,
        codepage: 850,
        note: "Nota:",
        warning: "Aviso:",
        caution: "CUIDADO:",
    },
];

/// Size of the country record.
const COUNTRY_RECORD_LEN: usize = 10;
const RECORD_TYPE_COUNTRY: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nls {
    pub locale: String,
    pub country: u16,
    pub codepage: u16,
    pub note: String,
    pub warning: String,
    pub caution: String,
}

impl Nls {
    /// Settings for `locale` (`ll_CC`, matched case-insensitively). Unknown
    /// locales fall back to `en_US`.
    pub fn new(locale: &str) -> Self {
        let found = LOCALES
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(locale))
            .or_else(|| {
                // language only, e.g. "de"
                let lang = locale.split('_').next().unwrap_or(locale);
                LOCALES.iter().find(|l| l.name[..2].eq_ignore_ascii_case(lang))
            });
        let l = match found {
            Some(l) => l,
            None => {
                tracing::debug!("unknown locale {locale}, using en_US");
                &LOCALES[0]
            }
        };
        Self {
            locale: l.name.to_string(),
            country: l.country,
            codepage: l.codepage,
            note: l.note.to_string(),
            warning: l.warning.to_string(),
            caution: l.caution.to_string(),
        }
    }
}

impl Default for Nls {
    fn default() -> Self {
        Self::new("en_US")
    }
}

impl Section for Nls {
    fn size(&self) -> usize {
        1
    }

    fn length(&self) -> usize {
        COUNTRY_RECORD_LEN
    }

    /// `u16 record size, u8 type, u8 format, u16 country, u16 code page,
    /// u16 reserved`.
    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&(COUNTRY_RECORD_LEN as u16).to_le_bytes())?;
        out.write_all(&[RECORD_TYPE_COUNTRY, 0])?;
        out.write_all(&self.country.to_le_bytes())?;
        out.write_all(&self.codepage.to_le_bytes())?;
        out.write_all(&0u16.to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_lookup() {
        assert_eq!(Nls::new("de_DE").country, 49);
        assert_eq!(Nls::new("DE_de").note, "Hinweis:");
        assert_eq!(Nls::new("fr").country, 33);
        assert_eq!(Nls::new("xx_YY").locale, "en_US");
    }

    #[test]
    fn test_country_record() {
        let nls = Nls::new("en_GB");
        let mut out = Vec::new();
        nls.write_to(&mut out).unwrap();
        assert_eq!(out, vec![10, 0, 0, 0, 44, 0, 0x52, 0x03, 0, 0]);
        assert_eq!(out.len(), nls.length());
    }
}
