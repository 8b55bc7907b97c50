use std::collections::HashSet;
use std::sync::Mutex;

use super::normalize::normalize_url;

/// Working set of canonical URLs for one sourcing run.
///
/// Seed it once at run start with every entry website and every
/// non-rejected submission website. `claim` checks and inserts under one
/// lock, so two discoveries of the same product in one run cannot both pass.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: Mutex<HashSet<String>>,
}

impl DedupSet {
    pub fn seeded<I, S>(websites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seen = websites
            .into_iter()
            .map(|w| normalize_url(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();

        Self {
            seen: Mutex::new(seen),
        }
    }

    /// Returns the normalized URL when it was not yet present. Empty URLs
    /// are never claimable.
    pub fn claim(&self, url: &str) -> Option<String> {
        let normalized = normalize_url(url);
        if normalized.is_empty() {
            return None;
        }

        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.insert(normalized.clone()).then_some(normalized)
    }

    pub fn contains(&self, url: &str) -> bool {
        let normalized = normalize_url(url);
        let seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        seen.contains(&normalized)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn equivalent_urls_are_claimed_once() {
        let set = DedupSet::default();

        assert_eq!(set.claim("https://www.Foo.ai/"), Some("foo.ai".to_string()));
        assert_eq!(set.claim("http://foo.ai"), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn seeded_websites_are_occupied() {
        let set = DedupSet::seeded(["https://bar.ai", "", "https://www.baz.io/app/"]);

        assert_eq!(set.len(), 2);
        assert!(set.contains("bar.ai"));
        assert_eq!(set.claim("https://baz.io/app"), None);
        assert!(set.claim("https://qux.dev").is_some());
    }

    #[test]
    fn empty_urls_are_never_claimed() {
        let set = DedupSet::default();
        assert_eq!(set.claim(""), None);
        assert!(set.is_empty());
    }

    #[test]
    fn concurrent_claims_admit_exactly_one_winner() {
        let set = Arc::new(DedupSet::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let set = set.clone();
                let url = if i % 2 == 0 { "https://foo.ai" } else { "http://www.foo.ai/" };
                std::thread::spawn(move || set.claim(url).is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
