//! Normalización de texto para comparaciones insensibles a mayúsculas y acentos.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Descompone (NFD), elimina marcas diacríticas, recorta y pasa a minúsculas.
/// "Tasa de Impactos con Fauna" -> "tasa de impactos con fauna",
/// "Subdirección" -> "subdireccion".
pub fn normalize_text(value: &str) -> String {
    strip_diacritics(value).trim().to_lowercase()
}

/// Igual que `normalize_text` pero en mayúsculas (claves y escenarios).
pub fn normalize_upper(value: &str) -> String {
    strip_diacritics(value).trim().to_uppercase()
}

fn strip_diacritics(value: &str) -> String {
    value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Clave canónica de escenario: quita las palabras de relleno
/// META / OBJETIVO / ESCENARIO / ANUAL y colapsa espacios.
/// "Escenario bajo" -> "BAJO", "Meta anual alto" -> "ALTO".
pub fn normalize_scenario_key(value: &str) -> String {
    let text = normalize_upper(value);
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !matches!(*w, "META" | "OBJETIVO" | "ESCENARIO" | "ANUAL"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quita_acentos_y_mayusculas() {
        assert_eq!(normalize_text("  Subdirección Técnica "), "subdireccion tecnica");
        assert_eq!(normalize_text("MAMÍFERO"), "mamifero");
        assert_eq!(normalize_upper("área sms"), "AREA SMS");
    }

    #[test]
    fn escenario_sin_palabras_de_relleno() {
        assert_eq!(normalize_scenario_key("Escenario bajo"), "BAJO");
        assert_eq!(normalize_scenario_key("meta anual   alto"), "ALTO");
        assert_eq!(normalize_scenario_key("MEDIO"), "MEDIO");
        assert_eq!(normalize_scenario_key(""), "");
    }
}
