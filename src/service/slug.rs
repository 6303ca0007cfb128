use std::sync::OnceLock;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;

use super::error::ServiceError;

pub const MAX_NUMERIC_SUFFIX: u32 = 100;
pub const RANDOM_SUFFIX_ATTEMPTS: u32 = 5;
pub const MAX_BASE_LEN: usize = 200;

/// Lookup used while searching for a free slug. The unique index on
/// `properties.slug` stays the final arbiter.
#[async_trait]
pub trait SlugStore: Send + Sync {
    async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error>;
}

fn separator_regex() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"))
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

pub fn slugify(text: &str) -> String {
    let folded: String = text.to_lowercase().chars().map(fold_accent).collect();
    let collapsed = separator_regex().replace_all(&folded, "-");
    let mut slug = collapsed.trim_matches('-').to_string();

    if slug.len() > MAX_BASE_LEN {
        slug.truncate(MAX_BASE_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }

    if slug.is_empty() {
        "property".to_string()
    } else {
        slug
    }
}

pub fn base_slug(title: &str, area_name: &str) -> String {
    slugify(&format!("{}-{}", title, area_name))
}

fn random_suffix() -> String {
    format!("{:08x}", rand::rng().random::<u32>())
}

/// Finds the first free slug for `title` in `area_name`: the bare token, then
/// `-1` to `-100`, then a few random hex suffixes. Fails rather than guessing.
pub async fn assign_unique_slug<S>(
    store: &S,
    title: &str,
    area_name: &str,
) -> Result<String, ServiceError>
where
    S: SlugStore + ?Sized,
{
    let base = base_slug(title, area_name);

    if !store.slug_exists(&base).await? {
        return Ok(base);
    }

    for n in 1..=MAX_NUMERIC_SUFFIX {
        let candidate = format!("{}-{}", base, n);
        if !store.slug_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    for _ in 0..RANDOM_SUFFIX_ATTEMPTS {
        let candidate = format!("{}-{}", base, random_suffix());
        if !store.slug_exists(&candidate).await? {
            tracing::warn!("slug {} needed a random suffix", base);
            return Ok(candidate);
        }
    }

    Err(ServiceError::SlugExhausted(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySlugs {
        taken: Mutex<HashSet<String>>,
    }

    impl MemorySlugs {
        fn take(&self, slug: &str) {
            self.taken.lock().unwrap().insert(slug.to_string());
        }
    }

    #[async_trait]
    impl SlugStore for MemorySlugs {
        async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
            Ok(self.taken.lock().unwrap().contains(slug))
        }
    }

    struct EverythingTaken;

    #[async_trait]
    impl SlugStore for EverythingTaken {
        async fn slug_exists(&self, _slug: &str) -> Result<bool, sqlx::Error> {
            Ok(true)
        }
    }

    /// Only bare and numeric candidates collide.
    struct NumericTaken {
        base: String,
    }

    #[async_trait]
    impl SlugStore for NumericTaken {
        async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
            if slug == self.base {
                return Ok(true);
            }
            let suffix = slug.strip_prefix(&format!("{}-", self.base)).unwrap_or("");
            Ok(suffix.parse::<u32>().map(|n| n <= MAX_NUMERIC_SUFFIX).unwrap_or(false))
        }
    }

    #[test]
    fn slugify_collapses_separators_and_folds_accents() {
        assert_eq!(slugify("  Modern Studio -- Bastos!! "), "modern-studio-bastos");
        assert_eq!(slugify("Résidence Yaoundé"), "residence-yaounde");
        assert_eq!(slugify("3 Bed / 2 Bath"), "3-bed-2-bath");
        assert_eq!(slugify("***"), "property");
    }

    #[test]
    fn long_titles_are_capped() {
        let slug = slugify(&"a ".repeat(300));
        assert!(slug.len() <= MAX_BASE_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[tokio::test]
    async fn unused_title_and_area_give_the_bare_token() {
        let store = MemorySlugs::default();
        let slug = assign_unique_slug(&store, "Villa with pool", "Bonapriso").await.unwrap();
        assert_eq!(slug, "villa-with-pool-bonapriso");
    }

    #[tokio::test]
    async fn repeated_title_and_area_get_numeric_suffixes() {
        let store = MemorySlugs::default();

        let first = assign_unique_slug(&store, "Studio", "Akwa").await.unwrap();
        store.take(&first);
        let second = assign_unique_slug(&store, "Studio", "Akwa").await.unwrap();
        store.take(&second);
        let third = assign_unique_slug(&store, "Studio", "Akwa").await.unwrap();

        assert_eq!(first, "studio-akwa");
        assert_eq!(second, "studio-akwa-1");
        assert_eq!(third, "studio-akwa-2");
    }

    #[tokio::test]
    async fn numeric_exhaustion_falls_back_to_random_suffix() {
        let store = NumericTaken {
            base: "studio-akwa".to_string(),
        };
        let slug = assign_unique_slug(&store, "Studio", "Akwa").await.unwrap();

        let suffix = slug.strip_prefix("studio-akwa-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn total_collision_fails_instead_of_guessing() {
        let err = assign_unique_slug(&EverythingTaken, "Studio", "Akwa").await.unwrap_err();
        assert!(matches!(err, ServiceError::SlugExhausted(base) if base == "studio-akwa"));
    }
}
