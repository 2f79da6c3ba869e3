// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

// Idiomas que temos mensagens traduzidas. O primeiro é o padrão.
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["es", "pt", "en"];

// Extrator de idioma (Accept-Language)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(SUPPORTED_LANGUAGES[0].to_string())
    }
}

impl Locale {
    /// Primeiro idioma suportado do cabeçalho, na ordem de preferência do cliente.
    pub fn from_header(header_str: &str) -> Self {
        accept_language::parse(header_str)
            .iter()
            // "es-CO" -> "es"
            .map(|tag| tag.split('-').next().unwrap_or(tag).to_lowercase())
            .find(|lang| SUPPORTED_LANGUAGES.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}
