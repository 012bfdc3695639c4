/// Characters removed outright rather than treated as word separators.
const REMOVED: &[char] = &['*', '+', '~', '.', '(', ')', '\'', '"', '!', ':', '@'];

/// slugify
///
/// Deterministic URL slug for a human-readable title: lowercase ASCII letters and
/// digits joined by single hyphens. Non-ASCII text is transliterated by the `slug`
/// crate, `&` reads as "and", and quotes and similar punctuation vanish without
/// splitting the word.
///
/// ```
/// use morphe_cms::slug::slugify;
///
/// assert_eq!(slugify("Web Development"), "web-development");
/// assert_eq!(slugify("  Crème Brûlée & Co. "), "creme-brulee-and-co");
/// assert_eq!(slugify("What's new?"), "whats-new");
/// ```
pub fn slugify(text: &str) -> String {
    let prepared: String = text
        .replace('&', " and ")
        .chars()
        .filter(|ch| !REMOVED.contains(ch))
        .collect();
    ::slug::slugify(prepared)
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn collapses_separators_and_trims() {
        assert_eq!(slugify("Hello  World"), "hello-world");
        assert_eq!(slugify("--Already-slugged--"), "already-slugged");
        assert_eq!(slugify("snake_case/path name"), "snake-case-path-name");
        assert_eq!(slugify("Test 123"), "test-123");
    }

    #[test]
    fn drops_quotes_inside_words() {
        assert_eq!(slugify("Don't \"quote\" me"), "dont-quote-me");
        assert_eq!(slugify("Special#Characters"), "special-characters");
    }

    #[test]
    fn transliterates_and_expands_ampersand() {
        assert_eq!(slugify("Façade Ærø"), "facade-aero");
        assert_eq!(slugify("Straße"), "strasse");
        assert_eq!(slugify("R&D"), "r-and-d");
    }

    #[test]
    fn transliterates_beyond_latin_1() {
        assert_eq!(slugify("Šibenik Łódź"), "sibenik-lodz");
        assert_eq!(slugify("Čeština Ğüzel"), "cestina-guzel");
        assert_ne!(slugify("Šibenik"), slugify("Ibenik"));
    }

    #[test]
    fn is_deterministic_and_idempotent() {
        let once = slugify("Case Studies: 2024 Edition");
        assert_eq!(once, "case-studies-2024-edition");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn unsluggable_input_yields_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("  ...  "), "");
    }
}
