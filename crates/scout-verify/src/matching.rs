//! Name/domain/title matching shared by the search verifiers.
//!
//! These rules decide whether a search result actually belongs to a
//! given business. They are deliberately strict: a false "has website"
//! silently discards a good lead, so every relaxation here was paid for
//! with a real false positive at some point. The rules:
//!
//! - Generic words never identify a business. "candle" appearing in
//!   `yankeecandle.com` does not tie the domain to "Candle Night
//!   Personal Care"; "morton" in `mortonmotor.com` does tie it to
//!   "Morton Motors".
//! - Deep URLs are articles, not homepages. Date paths, blog segments,
//!   and long hyphenated slugs are rejected; accepted deep matches are
//!   normalized back to the scheme+host root.
//! - Title matching only applies to names with two or more words, on
//!   root URLs, with ≥2 shared words at ≥60% overlap.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use scout_core::data::is_directory_host;
use scout_core::is_public_email_domain;

/// Stop words ignored when extracting significant name words.
const NAME_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "of", "in", "at", "to", "for", "by", "le", "la", "les", "de", "du",
    "al",
];

/// Words too generic to confirm a domain belongs to a specific business.
pub const GENERIC_BUSINESS_TERMS: &[&str] = &[
    // Business types
    "fashion", "beauty", "salon", "cafe", "restaurant", "food", "market", "store", "shop", "mart",
    "auto", "dental", "medical", "health", "service", "services", "trading", "general", "kitchen",
    "grill", "pizza", "coffee", "hotel", "travel", "tour", "tours", "fitness", "clinic",
    "pharmacy", "mobile", "computer", "digital", "tech", "media", "print", "photo", "electric",
    "electronics", "sign", "care", "personal", "super", "plus", "express", "premium", "classic",
    "modern", "barber", "nails", "spa", "studio", "lab", "consulting", "realty", "properties",
    "rentals", "cleaning", "repair", "repairs", "parts", "supplies", "wholesale", "retail",
    "packaging", "logistics", "shipping", "delivery", "transport", "construction", "building",
    "plumbing", "roofing", "flooring", "catering", "bakery", "grocery", "laundry", "tailor",
    "jewellery", "jewelry", "optical", "dentist", "doctor", "lawyer",
    // Common descriptors
    "candle", "light", "night", "star", "gold", "silver", "royal", "grand", "golden", "smart",
    "fresh", "clean", "bright", "paradise", "diamond", "crystal", "pearl", "ruby", "jade",
    "emerald",
    // Geographic terms
    "island", "park", "garden", "urban", "village", "city", "center", "centre", "global",
    "international", "world", "pacific", "atlantic", "northern", "southern", "eastern", "western",
    // Country / region names used in business names
    "belgium", "germany", "france", "italy", "turkey", "jordan", "lebanon", "morocco", "america",
    "canada", "brazil", "mexico", "thailand", "vietnam", "malaysia", "indonesia", "africa",
    "europe", "kingdom", "dynasty", "empire",
    // Common English words used as business names
    "chapter", "element", "essence", "fusion", "cascade", "pioneer", "horizon", "phoenix",
    "genesis", "vintage", "premier", "prestige", "supreme", "triumph", "liberty", "fortune",
    "destiny", "miracle",
    // Other generic
    "best", "first", "great", "good", "quality", "standard",
];

fn possessive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"['’`]s?\b").expect("static regex"))
}

fn date_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}[/-]\d{2}[/-]\d{2}").expect("static regex"))
}

/// Lowercase, drop possessives and punctuation, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let no_possessive = possessive_re().replace_all(&lowered, "");
    let cleaned: String = no_possessive
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Significant words of a name (stop words removed).
pub fn name_words(name: &str) -> BTreeSet<String> {
    normalize_name(name)
        .split_whitespace()
        .filter(|w| !NAME_STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

pub fn is_generic_term(word: &str) -> bool {
    GENERIC_BUSINESS_TERMS.contains(&word)
}

/// Host of a URL, lowercased with `www.` stripped; empty on junk.
pub fn domain_from_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("").to_lowercase();
            host.strip_prefix("www.").unwrap_or(&host).to_string()
        }
        Err(_) => String::new(),
    }
}

/// Whether a URL points at a directory/social/aggregator site or a
/// public email provider's own pages.
pub fn is_excluded_host(url: &str) -> bool {
    let domain = domain_from_url(url);
    if domain.is_empty() {
        return true;
    }
    is_directory_host(&domain) || is_public_email_domain(&domain)
}

/// Does a domain likely belong to this business?
///
/// Accepts on: full cleaned name (≥7 chars) inside the domain base; the
/// domain base (≥6 chars) inside the name at ≥65% length overlap; 2+
/// name words in the base; or a single distinctive (non-generic, ≥7
/// char) word in the base.
pub fn domain_contains_name(domain: &str, business_name: &str) -> bool {
    if domain.is_empty() || business_name.is_empty() {
        return false;
    }

    let domain_base: String = domain
        .split('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
        .replace('-', "");
    let name_clean: String = business_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if name_clean.len() >= 7 && domain_base.contains(&name_clean) {
        return true;
    }

    if domain_base.len() >= 6 && name_clean.contains(&domain_base) {
        let overlap_ratio = domain_base.len() as f64 / name_clean.len().max(1) as f64;
        if overlap_ratio >= 0.65 {
            return true;
        }
    }

    let matching: Vec<String> = name_words(business_name)
        .into_iter()
        .filter(|w| w.len() >= 4 && domain_base.contains(w.as_str()))
        .collect();

    if matching.len() >= 2 {
        return true;
    }
    if let [word] = matching.as_slice() {
        if !is_generic_term(word) && word.len() >= 7 {
            return true;
        }
    }

    false
}

/// Query ladder for one business, broadest first:
/// 1. unquoted full name + city;
/// 2. quoted 2–3 longest significant words + city;
/// 3. quoted full name + city.
pub fn build_search_queries(business_name: &str, city: Option<&str>) -> Vec<String> {
    let mut queries = Vec::new();

    let broad = match city {
        Some(city) => format!("{business_name} {city}"),
        None => business_name.to_string(),
    };
    queries.push(broad);

    let mut words: Vec<String> = name_words(business_name).into_iter().collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    if words.len() >= 2 {
        let short_name = words[..words.len().min(3)].join(" ");
        let quoted = match city {
            Some(city) => format!("\"{short_name}\" {city}"),
            None => format!("\"{short_name}\""),
        };
        if !queries.contains(&quoted) {
            queries.push(quoted);
        }
    }

    let exact = match city {
        Some(city) => format!("\"{business_name}\" {city}"),
        None => format!("\"{business_name}\""),
    };
    if !queries.contains(&exact) {
        queries.push(exact);
    }

    queries
}

/// Heuristic: does this URL look like a blog post or news article?
pub fn looks_like_article_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().trim_matches('/').to_string();
    if path.is_empty() {
        return false;
    }

    if date_path_re().is_match(&path) {
        return true;
    }

    let path_lower = format!("/{}/", path.to_lowercase());
    const ARTICLE_INDICATORS: &[&str] = &[
        "/blog/", "/article/", "/news/", "/post/", "/story/", "/review/", "/supplier",
        "/archives/", "/magazine/", "/press/", "/media/", "/column/",
    ];
    if ARTICLE_INDICATORS.iter().any(|ind| path_lower.contains(ind)) {
        return true;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() >= 4 {
        return true;
    }
    for segment in &segments {
        let hyphens = segment.matches('-').count();
        if hyphens >= 5 {
            return true;
        }
        if segment.len() >= 60 && hyphens >= 3 {
            return true;
        }
    }
    if segments.len() == 3 && segments.last().map(|s| s.len()).unwrap_or(0) >= 30 {
        return true;
    }

    false
}

/// Root/homepage URLs: no path, or one short segment (`/about`).
pub fn is_root_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().trim_matches('/').to_string();
    if path.is_empty() {
        return true;
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.len() == 1 && segments[0].len() <= 20
}

/// A search hit the extractor can evaluate.
#[derive(Debug, Clone)]
pub struct Hit<'a> {
    pub title: &'a str,
    pub url: &'a str,
}

/// Find the business's own website among search results.
///
/// Pass 1 (strong): the result domain contains the business name; deep
/// URLs are normalized back to the host root. Pass 2 (strict, names
/// with ≥2 words only): root URL whose title shares ≥2 words with the
/// name at ≥60% overlap.
pub fn extract_business_website(hits: &[Hit<'_>], business_name: &str) -> Option<String> {
    // Pass 1: domain-name match.
    for hit in hits {
        if hit.url.is_empty() || is_excluded_host(hit.url) {
            continue;
        }
        let domain = domain_from_url(hit.url);
        if domain_contains_name(&domain, business_name) {
            if is_root_url(hit.url) {
                return Some(hit.url.to_string());
            }
            let parsed = Url::parse(hit.url).ok()?;
            return Some(format!(
                "{}://{}/",
                parsed.scheme(),
                parsed.host_str().unwrap_or(&domain)
            ));
        }
    }

    // Pass 2: strict title match on root URLs only.
    let biz_words = name_words(business_name);
    if biz_words.len() < 2 {
        // Single-word names are too ambiguous for title matching.
        return None;
    }

    for hit in hits {
        if hit.url.is_empty() || is_excluded_host(hit.url) {
            continue;
        }
        if !is_root_url(hit.url) {
            continue;
        }
        let title_words = name_words(hit.title);
        if title_words.is_empty() {
            continue;
        }
        let overlap = biz_words.intersection(&title_words).count();
        if overlap >= 2 && overlap as f64 >= biz_words.len() as f64 * 0.6 {
            return Some(hit.url.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_drops_possessives_and_punctuation() {
        assert_eq!(normalize_name("Morton's Motors, Ltd."), "morton motors ltd");
        assert_eq!(normalize_name("Café—Röster!"), "caf r ster");
    }

    #[test]
    fn name_words_skip_stop_words() {
        let words = name_words("The Village Cobbler of Toronto");
        assert!(words.contains("village"));
        assert!(words.contains("cobbler"));
        assert!(words.contains("toronto"));
        assert!(!words.contains("the"));
        assert!(!words.contains("of"));
    }

    #[test]
    fn domain_extraction_strips_www() {
        assert_eq!(domain_from_url("https://www.Acme.CA/about"), "acme.ca");
        assert_eq!(domain_from_url("not a url"), "");
    }

    #[test]
    fn full_name_in_domain_matches() {
        assert!(domain_contains_name("sonidentistry.com", "Soni Dentistry"));
        assert!(domain_contains_name("thevillagecobbler.ca", "Village Cobbler"));
    }

    #[test]
    fn domain_base_in_name_needs_65_percent_overlap() {
        // "mortonmotor" (11) in "mortonmotors" (12) = 92% → match.
        assert!(domain_contains_name("mortonmotor.com", "Morton Motors"));
        // "sunnyside" (9) in "sunnysidedental" (15) = 60% → no match.
        assert!(!domain_contains_name("sunnyside.com", "Sunnyside Dental"));
    }

    #[test]
    fn generic_single_words_do_not_match() {
        assert!(!domain_contains_name("yankeecandle.com", "Candle Night Personal Care"));
        assert!(!domain_contains_name("dubai-fashions.com", "Al Riyan Fashion"));
        // Distinctive 7+ char single word does match.
        assert!(domain_contains_name(
            "torontodentureservices.ca",
            "Gayne Denture Clinic"
        ));
    }

    #[test]
    fn two_word_matches_beat_generic_filter() {
        assert!(domain_contains_name("gtaheatingcooling.ca", "GTA Heating and Cooling"));
    }

    #[test]
    fn query_ladder_goes_broad_to_exact() {
        let queries = build_search_queries("The Village Cobbler", Some("Toronto"));
        assert_eq!(queries[0], "The Village Cobbler Toronto");
        assert!(queries[1].starts_with('"'));
        assert!(queries.last().unwrap().contains("\"The Village Cobbler\""));
    }

    #[test]
    fn article_urls_are_detected() {
        assert!(looks_like_article_url("https://x.com/2025/10/24/grand-opening"));
        assert!(looks_like_article_url("https://x.com/blog/our-story"));
        assert!(looks_like_article_url("https://x.com/a/b/c/d"));
        assert!(looks_like_article_url(
            "https://x.com/since-1979-al-afadhils-has-been-serving-lucknowi-delicacies/"
        ));
        assert!(!looks_like_article_url("https://x.com/"));
        assert!(!looks_like_article_url("https://x.com/about"));
    }

    #[test]
    fn root_url_allows_one_short_segment() {
        assert!(is_root_url("https://acme.ca"));
        assert!(is_root_url("https://acme.ca/about"));
        assert!(is_root_url("https://acme.ca/en"));
        assert!(!is_root_url("https://acme.ca/blog/post-one"));
        assert!(!is_root_url(
            "https://acme.ca/a-very-long-first-segment-over-twenty"
        ));
    }

    #[test]
    fn extractor_prefers_domain_match_and_roots_deep_urls() {
        let hits = vec![
            Hit { title: "Acme — Yelp", url: "https://yelp.ca/biz/acme" },
            Hit {
                title: "news",
                url: "https://packaging-gateway.com/news/acmepackaging-expands/2025/",
            },
        ];
        // Directory is skipped; deep URL with no name match is skipped.
        assert_eq!(extract_business_website(&hits, "Acme Packaging"), None);

        let hits = vec![Hit {
            title: "irrelevant",
            url: "https://acmepackaging.com/news/some/deep/article",
        }];
        assert_eq!(
            extract_business_website(&hits, "Acme Packaging").as_deref(),
            Some("https://acmepackaging.com/")
        );
    }

    #[test]
    fn title_pass_requires_two_words_and_overlap() {
        let hits = vec![Hit {
            title: "Village Cobbler — Shoe Repair in Toronto",
            url: "https://shoefix.ca/",
        }];
        assert_eq!(
            extract_business_website(&hits, "Village Cobbler").as_deref(),
            Some("https://shoefix.ca/")
        );
        // Single-word names never use the title pass.
        assert_eq!(extract_business_website(&hits, "Cobbler"), None);
    }

    #[test]
    fn title_pass_rejects_non_root_urls() {
        let hits = vec![Hit {
            title: "Village Cobbler — Shoe Repair",
            url: "https://listings.example.com/ontario/toronto/village-cobbler-shoe-repair-shop",
        }];
        assert_eq!(extract_business_website(&hits, "Village Cobbler"), None);
    }

    #[test]
    fn directories_and_public_email_hosts_are_excluded() {
        assert!(is_excluded_host("https://facebook.com/acme"));
        assert!(is_excluded_host("https://www.yelp.com/biz/acme"));
        assert!(is_excluded_host("https://gmail.com/"));
        assert!(!is_excluded_host("https://acme.ca/"));
    }
}
