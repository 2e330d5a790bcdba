//! Title to URL slug translation.

/// Turns a human title into a URL path segment.
pub trait SlugTranslator: Send + Sync {
    /// May return an empty string when nothing in `title` is representable.
    fn translate(&self, title: &str) -> String;
}

/// Transliterates the title to ASCII (Chinese becomes pinyin), then lowercases
/// letters and digits and joins the runs between them with single dashes.
/// Everything else is a separator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashSlugTranslator;

impl SlugTranslator for DashSlugTranslator {
    fn translate(&self, title: &str) -> String {
        deunicode::deunicode(title)
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Slugs that would shadow a fixed route under `/topics/{id}/`.
pub const RESERVED_SLUGS: &[&str] = &["edit"];

/// `base`, or `base-N` with the smallest N >= 2 that is not taken.
pub fn disambiguate<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: std::collections::HashSet<&str> = taken.into_iter().collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slug(title: &str) -> String {
        DashSlugTranslator.translate(title)
    }

    #[test]
    fn test_basic_title() {
        assert_eq!(slug("Getting Started"), "getting-started");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(slug("How to: Use Workflows (v2)"), "how-to-use-workflows-v2");
    }

    #[test]
    fn test_collapses_and_trims_separators() {
        assert_eq!(slug("--foo---bar--"), "foo-bar");
    }

    #[test]
    fn test_chinese_title_transliterated() {
        assert_eq!(slug("你好世界"), "ni-hao-shi-jie");
        assert_eq!(slug("Rust 入门 guide"), "rust-ru-men-guide");
    }

    #[test]
    fn test_different_chinese_titles_differ() {
        let a = slug("你好世界");
        let b = slug("再见世界");
        assert!(!a.is_empty());
        assert!(!b.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_accents_folded() {
        assert_eq!(slug("Café Déjà Vu"), "cafe-deja-vu");
    }

    #[test]
    fn test_punctuation_only_is_empty() {
        assert_eq!(slug("？！"), "");
        assert_eq!(slug("---"), "");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(slug("Same Title"), slug("Same Title"));
    }

    #[test]
    fn test_disambiguate() {
        assert_eq!(disambiguate("rust", []), "rust");
        assert_eq!(disambiguate("rust", ["rust"]), "rust-2");
        assert_eq!(disambiguate("rust", ["rust", "rust-2", "rust-4"]), "rust-3");
        assert_eq!(disambiguate("rust", ["rust-2"]), "rust");
        assert_eq!(
            disambiguate("edit", RESERVED_SLUGS.iter().copied()),
            "edit-2"
        );
    }
}
