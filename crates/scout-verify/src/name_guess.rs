//! Name-guess verification: purely offline candidate generation plus
//! parallel HTTP probing. No API keys, no search engines.
//!
//! Candidate generation runs multiple cleaning passes over the business
//! name (brand-only, brand+articles, full-minus-entity-suffixes, raw)
//! and crosses the resulting bases with the country's preferred TLDs.
//! Live candidates then go through the validation gauntlet in
//! [`is_valid_business_site`], the critical false-positive filter. A
//! false `has_website` silently discards a good lead, so every clause
//! below exists because a specific real-world page got through without
//! it.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde_json::json;
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

use scout_clients::probe::{FetchedPage, HttpProber, BROWSER_USER_AGENT};
use scout_clients::Config;
use scout_core::data::{country_tlds, MIN_REAL_PAGE_BYTES, PARKED_PAGE_INDICATORS};
use scout_core::{Verdict, VerificationSource};
use scout_store::{businesses, jobs};

use crate::common::{apply_verdict, VerdictWrite, VerifyOutcome};
use crate::error::VerifyError;

pub const JOB_NAME: &str = "domain_guess_verify";

/// Businesses processed concurrently.
const BUSINESS_PARALLELISM: usize = 15;
/// Candidate HEAD probes in flight per business.
const CANDIDATE_PARALLELISM: usize = 10;

// ─── Name cleaning ──────────────────────────────────────────────────────

/// Articles and prepositions, sometimes part of brand domains
/// (`thevillagecobbler.ca`).
const ARTICLE_WORDS: &[&str] = &[
    "the", "a", "an", "and", "of", "in", "at", "to", "for", "by", "on",
    // Arabic articles
    "al", "el",
    // French
    "le", "la", "les", "de", "du", "des", "et",
];

/// Business entity suffixes. Always stripped, never part of domains.
const ENTITY_SUFFIXES: &[&str] = &[
    "llc", "ltd", "inc", "corp", "co", "company", "plc", "fzc", "fze", "fz", "est", "wll", "spc",
    "dmcc", "pllc", "lp", "llp",
];

/// Generic business and industry words usually dropped from domains.
const GENERIC_WORDS: &[&str] = &[
    "services", "service", "solutions", "solution", "group", "enterprise", "enterprises",
    "trading", "general", "international", "global", "center", "centre", "shop", "store", "mart",
    "market", "plaza", "mall", "ladies", "gents", "mens", "womens", "children", "kids",
    "textiles", "textile", "tailoring", "tailor", "upholstery", "materials", "supplies",
    "supply", "equipment", "parts", "maintenance", "repair", "repairs", "installation",
    "installations", "cleaning", "laundry", "salon", "spa", "beauty", "barber", "restaurant",
    "cafe", "cafeteria", "bakery", "grill", "kitchen", "pharmacy", "medical", "dental", "clinic",
    "hospital", "electrical", "electric", "electronics", "electronic", "lighting", "lights",
    "light", "plumbing", "heating", "cooling", "furniture", "furnishing", "furnishings",
    "flooring", "printing", "print", "graphics", "graphic", "design", "photography", "photo",
    "photos", "video", "media", "fitness", "gym", "wellness", "yoga", "travel", "tours",
    "tourism", "transport", "transportation", "logistics", "shipping", "cargo", "freight",
    "school", "academy", "institute", "university", "college", "consultants", "consulting",
    "consultant", "advisory", "management", "properties", "property", "real", "estate",
    "contracting", "construction", "building", "builders",
];

/// Words that never help identify a specific business in page content.
const CONTENT_STOP_WORDS: &[&str] = &[
    "the", "and", "for", "from", "with", "that", "this", "our", "your", "all", "new", "one",
    "two",
];

/// Geographic and generic-industry words that appear on many unrelated
/// pages. A match consisting only of these is coincidental ("College
/// Street Medical Laboratories" matching any College Street page).
const GENERIC_LOCATION_WORDS: &[&str] = &[
    "street", "avenue", "road", "drive", "boulevard", "lane", "place", "way", "court", "circle",
    "terrace", "crescent", "square", "north", "south", "east", "west", "central", "upper",
    "lower", "college", "park", "lake", "hill", "mountain", "river", "bay", "city", "town",
    "village", "downtown", "midtown", "uptown", "first", "second", "third", "main", "high",
    "grand", "new", "old", "big", "little", "great", "royal", "golden", "green", "blue", "red",
    "white", "black", "national", "international", "global", "general", "universal", "auto",
    "car", "home", "food", "tech", "pro", "express", "quick", "fast", "best", "top", "prime",
    "elite", "premium",
];

fn in_set(set: &[&str], word: &str) -> bool {
    set.contains(&word)
}

fn strip_always(word: &str) -> bool {
    in_set(ENTITY_SUFFIXES, word) || in_set(GENERIC_WORDS, word)
}

/// Which words a cleaning pass removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanMode {
    /// Strip articles + generic words + entity suffixes: core brand.
    BrandOnly,
    /// Keep articles, strip generic words + entity suffixes.
    KeepArticles,
    /// Strip only entity suffixes; keeps category words
    /// ("dimalaundry.com").
    KeepCategory,
}

fn clean_business_name(name: &str, mode: CleanMode) -> Vec<String> {
    let lowered = name.to_lowercase().replace('&', " and ");
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| w.len() >= 2)
        .filter(|w| match mode {
            CleanMode::BrandOnly => !in_set(ARTICLE_WORDS, w) && !strip_always(w),
            CleanMode::KeepArticles => !strip_always(w),
            CleanMode::KeepCategory => !in_set(ENTITY_SUFFIXES, w),
        })
        .map(str::to_string)
        .collect()
}

/// Singular/plural variants of a domain base.
///
/// `mortonmotors` → `[mortonmotors, mortonmotor]`;
/// `dentistry` → `[dentistry]` (adding `s` makes nonsense).
pub fn singular_plural_variants(base: &str) -> Vec<String> {
    let mut variants = vec![base.to_string()];
    if base.len() <= 4 {
        return variants;
    }

    if base.ends_with("ies") && base.len() > 5 {
        variants.push(format!("{}y", &base[..base.len() - 3]));
    } else if base.ends_with("ses") || base.ends_with("xes") || base.ends_with("zes") {
        variants.push(base[..base.len() - 2].to_string());
    } else if base.ends_with('s') && !base.ends_with("ss") {
        variants.push(base[..base.len() - 1].to_string());
    } else if base.ends_with('y') {
        // dentistry, beauty, pharmacy: skip.
    } else if base.ends_with("sh") || base.ends_with("ch") || base.ends_with('x') || base.ends_with('z')
    {
        variants.push(format!("{base}es"));
    } else {
        variants.push(format!("{base}s"));
    }

    variants
}

/// Generate candidate domains for a business name and country.
pub fn generate_candidates(name: &str, country: Option<&str>) -> Vec<String> {
    let words_no_articles = clean_business_name(name, CleanMode::BrandOnly);
    let words_with_articles = clean_business_name(name, CleanMode::KeepArticles);
    let words_all = clean_business_name(name, CleanMode::KeepCategory);

    if words_no_articles.is_empty() && words_with_articles.is_empty() && words_all.is_empty() {
        return Vec::new();
    }

    let tlds = country_tlds(country);
    let mut bases: BTreeSet<String> = BTreeSet::new();
    let add = |bases: &mut BTreeSet<String>, base: String, min: usize, max: usize| {
        if base.len() >= min && base.len() <= max {
            bases.insert(base);
        }
    };

    for words in [&words_no_articles, &words_with_articles] {
        if words.is_empty() {
            continue;
        }

        add(&mut bases, words.concat(), 4, 40);

        // First word alone is high-risk: only for sole-word brands, or
        // very distinctive (10+ chars) leads of two-word names.
        if words.len() == 1 && words[0].len() >= 4 {
            bases.insert(words[0].clone());
        } else if words.len() == 2 && words[0].len() >= 10 {
            bases.insert(words[0].clone());
        }

        if words.len() >= 2 {
            add(&mut bases, format!("{}{}", words[0], words[1]), 4, 30);
            add(
                &mut bases,
                words[..words.len().min(4)].join("-"),
                1,
                40,
            );
            bases.insert(format!("{}-{}", words[0], words[1]));
        }
        if words.len() >= 3 {
            add(
                &mut bases,
                format!("{}{}{}", words[0], words[1], words[2]),
                5,
                35,
            );
        }
    }

    // Full name including category words ("Dima Laundry" →
    // "dimalaundry", which the brand-only track misses).
    if !words_all.is_empty() && words_all != words_no_articles && words_all != words_with_articles
    {
        add(&mut bases, words_all.concat(), 5, 40);
        if words_all.len() >= 2 {
            add(&mut bases, format!("{}{}", words_all[0], words_all[1]), 4, 30);
            add(&mut bases, words_all[..words_all.len().min(4)].join("-"), 1, 40);
        }
    }

    // Raw track: strip nothing but punctuation. Catches "curryandco"
    // from "Curry & Co." where the suffix strip loses "co".
    let raw_lowered = name.to_lowercase().replace('&', "and");
    let raw_cleaned: String = raw_lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let raw_words: Vec<&str> = raw_cleaned
        .split_whitespace()
        .filter(|w| w.len() >= 2)
        .collect();
    if raw_words.len() >= 2 {
        let raw_joined = raw_words.concat();
        if (6..=35).contains(&raw_joined.len()) {
            bases.insert(raw_joined);
        }
    }

    // Acronym handling ("GTA" in "GTA Heating").
    let original_words: Vec<&str> = name.split_whitespace().collect();
    for (i, word) in original_words.iter().enumerate() {
        let is_acronym = (2..=5).contains(&word.len())
            && word.chars().all(|c| c.is_ascii_uppercase());
        if !is_acronym {
            continue;
        }
        let remaining = clean_business_name(&original_words[i + 1..].join(" "), CleanMode::BrandOnly);
        if !remaining.is_empty() {
            bases.insert(format!("{}{}", word.to_lowercase(), remaining.concat()));
            bases.insert(format!("{}{}", word.to_lowercase(), remaining[0]));
        }
    }

    // Arabic transliteration variants.
    for base in bases.clone() {
        if base.len() > 6 {
            if base.ends_with("ain") {
                bases.insert(base[..base.len() - 2].to_string());
                bases.insert(base[..base.len() - 1].to_string());
            } else if base.ends_with("een") {
                bases.insert(base[..base.len() - 2].to_string());
            }
            for prefix in ["al-", "el-", "al", "el"] {
                if base.starts_with(prefix) && base.len() > prefix.len() + 3 {
                    let stripped = &base[prefix.len()..];
                    if !stripped.starts_with('-') {
                        bases.insert(stripped.to_string());
                    }
                }
            }
        }
    }

    // Singular/plural expansion (last segment only for hyphenated).
    let mut expanded: BTreeSet<String> = BTreeSet::new();
    for base in &bases {
        if let Some((head, last)) = base.rsplit_once('-') {
            expanded.insert(base.clone());
            for variant in singular_plural_variants(last) {
                expanded.insert(format!("{head}-{variant}"));
            }
        } else {
            for variant in singular_plural_variants(base) {
                expanded.insert(variant);
            }
        }
    }
    expanded.retain(|b| (3..=40).contains(&b.len()));

    // Prefer longer (more specific) bases first.
    let mut ordered: Vec<String> = expanded.into_iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut candidates = Vec::new();
    let mut seen = BTreeSet::new();
    for base in ordered {
        for tld in tlds {
            let domain = format!("{base}{tld}");
            if seen.insert(domain.clone()) {
                candidates.push(domain);
            }
        }
    }
    candidates
}

// ─── Validation ─────────────────────────────────────────────────────────

/// First `n` chars of a string, respecting char boundaries.
fn head(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Whole-word match, including singular/plural variants, so "Morton
/// Motors" matches a page saying "Morton Motor".
pub fn word_in_text(word: &str, text: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(word));
    if let Ok(re) = Regex::new(&pattern) {
        if re.is_match(text) {
            return true;
        }
    }
    for variant in singular_plural_variants(word) {
        if variant == word {
            continue;
        }
        let pattern = format!(r"\b{}\b", regex::escape(&variant));
        if let Ok(re) = Regex::new(&pattern) {
            if re.is_match(text) {
                return true;
            }
        }
    }
    false
}

/// Are two hosts the same business? Exact base match, containment at
/// ≥60% length ratio, or a ≥10-char shared prefix. Deliberately NOT
/// chunk matching; common words like "children" shared between
/// `thechildren.com` and `montrealchildrenshospital.ca` are different
/// businesses.
pub fn domains_related(original: &str, final_host: &str) -> bool {
    if original.is_empty() || final_host.is_empty() {
        return true; // cannot tell, assume related
    }
    let strip = |host: &str| host.strip_prefix("www.").unwrap_or(host).to_string();
    let orig_base: String = strip(original)
        .split('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
        .replace('-', "");
    let final_base: String = strip(final_host)
        .split('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
        .replace('-', "");

    if orig_base.is_empty() || final_base.is_empty() {
        return true;
    }
    if orig_base == final_base {
        return true;
    }

    let (shorter, longer) = if orig_base.len() <= final_base.len() {
        (&orig_base, &final_base)
    } else {
        (&final_base, &orig_base)
    };
    if longer.contains(shorter.as_str()) {
        if shorter.len() as f64 >= longer.len() as f64 * 0.6 {
            return true;
        }
        if longer.starts_with(shorter.as_str()) && shorter.len() >= 10 {
            return true;
        }
    }

    false
}

fn meta_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']+)"#,
            r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*name=["']description["']"#,
            r#"(?i)<meta[^>]*property=["']og:title["'][^>]*content=["']([^"']+)"#,
            r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*property=["']og:title["']"#,
            r#"(?i)<meta[^>]*property=["']og:site_name["'][^>]*content=["']([^"']+)"#,
            r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*property=["']og:site_name["']"#,
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Validate that a live page is this business's real website.
///
/// Checks, in order: 200 status; redirect-to-unrelated-host; minimum
/// body size; parked/for-sale/default-page indicators; then content
/// relevance with whole-word matching and proportional rules per name
/// length, with a stricter branch after cross-host redirects and a
/// final title filter for multi-word names.
pub fn is_valid_business_site(
    url: &str,
    business_name: &str,
    status: u16,
    body: &str,
    final_url: &str,
    title: &str,
) -> bool {
    if status != 200 {
        return false;
    }

    let original_host = host_of(url);
    let final_host = host_of(final_url);
    let orig_norm = original_host.strip_prefix("www.").unwrap_or(&original_host);
    let final_norm = final_host.strip_prefix("www.").unwrap_or(&final_host);
    let is_redirected =
        orig_norm != final_norm && !original_host.is_empty() && !final_host.is_empty();

    if is_redirected && !domains_related(&original_host, &final_host) {
        tracing::debug!(url, final_host, "reject: redirected to unrelated host");
        return false;
    }

    let body_len = body.len();
    if body_len < MIN_REAL_PAGE_BYTES {
        return false;
    }

    let body_lower = head(body, 8000).to_lowercase();
    if PARKED_PAGE_INDICATORS.iter().any(|ind| body_lower.contains(ind)) {
        return false;
    }

    // ---- Content relevance ----
    let name_lowered = business_name.to_lowercase().replace('&', " and ");
    let name_cleaned: String = name_lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let name_words: BTreeSet<String> = name_cleaned
        .split_whitespace()
        .filter(|w| w.len() >= 3 && !in_set(CONTENT_STOP_WORDS, w))
        .map(str::to_string)
        .collect();

    if name_words.is_empty() {
        return true; // cannot check, allow
    }

    let head_section = head(&body_lower, 5000);
    let mut meta_parts: Vec<String> = Vec::new();
    for pattern in meta_patterns().iter() {
        if let Some(captures) = pattern.captures(head_section) {
            if let Some(m) = captures.get(1) {
                meta_parts.push(m.as_str().to_string());
            }
        }
    }
    let check_text = format!("{title} {} {}", meta_parts.join(" "), head_section);

    // Title-is-domain-echo detection ("etihads.net" as the whole title).
    let domain_host = original_host
        .strip_prefix("www.")
        .unwrap_or(&original_host)
        .to_lowercase();
    let domain_base = domain_host.split('.').next().unwrap_or("").replace('-', "");
    let title_stripped = title.trim().to_lowercase().replace([' ', '-'], "");
    let is_title_just_domain = !title_stripped.is_empty()
        && (title_stripped == domain_host.replace('-', "")
            || title_stripped == domain_base
            || title_stripped == domain_host.replace(['.', '-'], ""));
    let title_is_domain_echo = if is_title_just_domain {
        if body_len < 10_000 {
            tracing::debug!(url, title, "reject: title is domain name on a small page");
            return false;
        }
        // Large page may still be real, but the title carries zero
        // evidence, it only echoes the domain.
        true
    } else {
        false
    };

    // Domain base in page content is supportive evidence, but every
    // site embeds its own domain in URLs and script tags, so only trust
    // long (12+ char) distinctive bases. Even then the title filter
    // below still runs: "electricallightings.com" contains its base yet
    // titles as "Ace Hardware Shop".
    let domain_base_match = domain_base.len() >= 12 && check_text.contains(&domain_base);

    let matching_words: BTreeSet<String> = name_words
        .iter()
        .filter(|w| word_in_text(w, &check_text))
        .cloned()
        .collect();
    let distinctive_matches: BTreeSet<&String> =
        matching_words.iter().filter(|w| w.len() >= 5).collect();
    let brand_matches: BTreeSet<&String> = matching_words
        .iter()
        .filter(|w| !strip_always(w) && !in_set(GENERIC_LOCATION_WORDS, w))
        .collect();

    if !domain_base_match {
        // All matches generic → coincidence ("B-K Auto Service" matching
        // any auto-service site via {"auto", "service"}).
        if !matching_words.is_empty() && brand_matches.is_empty() {
            tracing::debug!(url, business_name, "reject: only generic word matches");
            return false;
        }

        if name_words.len() >= 3 {
            if matching_words.is_empty() {
                tracing::debug!(url, business_name, "reject: no name words in page");
                return false;
            }
            let non_generic: BTreeSet<&String> = matching_words
                .iter()
                .filter(|w| !in_set(GENERIC_LOCATION_WORDS, w) && !strip_always(w))
                .collect();
            if non_generic.is_empty() {
                tracing::debug!(url, business_name, "reject: only generic/location matches");
                return false;
            }
            let non_generic_distinctive: BTreeSet<&&String> =
                non_generic.iter().filter(|w| w.len() >= 5).collect();
            let very_distinctive: BTreeSet<&&String> =
                non_generic.iter().filter(|w| w.len() >= 7).collect();

            // Proportional evidence. 4+-word names need 2+ non-generic
            // matches regardless of word length ("St. Gabriel Medical
            // Centre Walk-In Clinic" matching only "gabriel" on a church
            // page). 3-word names accept a single 7+-char word.
            if name_words.len() >= 4 {
                if non_generic.len() < 2 {
                    tracing::debug!(url, business_name, "reject: 1 match for 4+-word name");
                    return false;
                }
            } else if non_generic.len() < 2 && very_distinctive.is_empty() {
                tracing::debug!(url, business_name, "reject: weak match for 3-word name");
                return false;
            }

            if is_redirected && (matching_words.len() < 2 || non_generic_distinctive.is_empty()) {
                tracing::debug!(url, business_name, "reject: redirect needs more evidence");
                return false;
            }
        } else if name_words.len() == 2 {
            if matching_words.is_empty() {
                tracing::debug!(url, business_name, "reject: 0 of 2 words match");
                return false;
            }
            // Short words collide ("Lila Cafe" matching lila.ae, a
            // different business); require a 5+-char match.
            if distinctive_matches.is_empty() {
                tracing::debug!(url, business_name, "reject: only short-word matches");
                return false;
            }
            // Both words distinctive → require both ("Dr. Geeta Shukla"
            // matching only "geeta" is a different doctor).
            let all_distinctive = name_words.iter().filter(|w| w.len() >= 5).count();
            if all_distinctive == 2 && distinctive_matches.len() < 2 {
                tracing::debug!(url, business_name, "reject: only 1 of 2 distinctive words");
                return false;
            }
        } else {
            // Single-word name: very high false-positive risk. Require
            // the word in the title, unless the title is a domain echo,
            // in which case a title hit proves nothing and the word must
            // appear in the meta description/og tags instead.
            if matching_words.is_empty() {
                tracing::debug!(url, business_name, "reject: word not in page");
                return false;
            }
            let the_word = name_words.iter().next().expect("non-empty");
            if title_is_domain_echo {
                let meta_text = meta_parts.join(" ");
                if !word_in_text(the_word, &meta_text) {
                    tracing::debug!(url, business_name, "reject: domain-echo title, not in meta");
                    return false;
                }
            } else if !word_in_text(the_word, title) {
                tracing::debug!(url, business_name, "reject: single word not in title");
                return false;
            }
        }
    }

    // ---- Final title filter for multi-word names ----
    // Content can match while the title names a different business
    // entirely ("Trans Tech" → trans-tech.net titling "CDL Training").
    if !title.is_empty() && name_words.len() >= 2 {
        let brand_in_title = brand_matches.iter().any(|w| word_in_text(w, title));
        if !brand_in_title {
            let any_in_title = matching_words.iter().any(|w| word_in_text(w, title));
            if !any_in_title {
                tracing::debug!(url, business_name, "reject: no name words in title");
                return false;
            }
            let matching_in_title: BTreeSet<&String> = matching_words
                .iter()
                .filter(|w| word_in_text(w, title))
                .collect();
            let brand_in_title_set: Vec<&&String> = matching_in_title
                .iter()
                .filter(|w| !strip_always(w) && !in_set(GENERIC_LOCATION_WORDS, w))
                .collect();
            if brand_in_title_set.is_empty() {
                tracing::debug!(url, business_name, "reject: only generic words in title");
                return false;
            }
        }
    }

    true
}

// ─── Probing ────────────────────────────────────────────────────────────

fn domain_base_length(domain: &str) -> usize {
    domain.split('.').next().unwrap_or("").len()
}

/// HEAD all candidates in parallel, then GET + validate the live ones in
/// longest-base-first order, HTTPS pass before HTTP pass.
async fn check_candidates(
    prober: &HttpProber,
    candidates: &[String],
    business_name: &str,
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let mut live: Vec<String> = stream::iter(candidates.iter().cloned())
        .map(|candidate| async move {
            let (alive, _status) = prober.head_check(&candidate).await;
            alive.then_some(candidate)
        })
        .buffer_unordered(CANDIDATE_PARALLELISM.min(candidates.len()))
        .filter_map(|outcome| async move { outcome })
        .collect()
        .await;

    // Longer base = more specific = higher priority: mortonmotor.com
    // beats morton.com.
    live.sort_by(|a, b| {
        domain_base_length(b)
            .cmp(&domain_base_length(a))
            .then(a.cmp(b))
    });

    for scheme in ["https", "http"] {
        for domain in &live {
            let url = format!("{scheme}://{domain}");
            let FetchedPage {
                status,
                body,
                final_url,
                title,
            } = prober.fetch_page(&url).await;
            if is_valid_business_site(&url, business_name, status, &body, &final_url, &title) {
                return Some(url);
            }
        }
    }

    None
}

/// Candidate generation + probing for one business. Runs entirely off
/// the database so it is safe to fan out.
async fn process_one(
    prober: &HttpProber,
    business_name: &str,
    country: Option<&str>,
) -> (Option<String>, usize, Verdict) {
    let candidates = generate_candidates(business_name, country);
    if candidates.is_empty() {
        return (None, 0, Verdict::NoCandidates);
    }
    let found = check_candidates(prober, &candidates, business_name).await;
    let verdict = if found.is_some() {
        Verdict::HasWebsite
    } else {
        Verdict::NoMatch
    };
    (found, candidates.len(), verdict)
}

async fn process_one_row(
    prober: &HttpProber,
    row: &scout_store::models::BusinessWithCity,
) -> (Uuid, Option<String>, usize, Verdict) {
    let name = row.name.clone().unwrap_or_default();
    let (url, checked, verdict) = process_one(prober, &name, row.city_country.as_deref()).await;
    (row.id, url, checked, verdict)
}

/// Run one name-guess batch over eligible businesses.
pub async fn run_batch(
    pool: &PgPool,
    _config: &'static Config,
    limit: Option<i64>,
    min_score: f64,
    scope: Option<&str>,
) -> Result<VerifyOutcome, VerifyError> {
    let effective_limit = limit.unwrap_or(1000);
    // A zero floor means "include never-scored businesses too".
    let score_floor = (min_score > 0.0).then_some(min_score);

    let run_id = jobs::start(pool, JOB_NAME, scope, None).await?;

    let result = async {
        let source = VerificationSource::DomainGuess;
        let rows = businesses::eligible_for_verification(
            pool,
            source.verified_key(),
            score_floor,
            effective_limit,
        )
        .await?;

        let mut outcome = VerifyOutcome::default();
        if rows.is_empty() {
            return Ok::<VerifyOutcome, VerifyError>(outcome);
        }

        let prober = HttpProber::new(BROWSER_USER_AGENT, 3)
            .map_err(scout_clients::ClientError::from)?;

        // Two-level parallelism: businesses wide, candidate HEADs wide
        // within each. Database writes stay sequential afterwards.
        let results: Vec<(Uuid, Option<String>, usize, Verdict)> = stream::iter(rows.iter())
            .map(|row| {
                Box::pin(process_one_row(&prober, row))
                    as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send + '_>>
            })
            .buffer_unordered(BUSINESS_PARALLELISM)
            .collect()
            .await;

        for (business_id, url, candidates_checked, verdict) in results {
            let mut write = VerdictWrite::new(business_id, verdict)
                .extra("domain_guess_candidates_checked", json!(candidates_checked));
            if let Some(url) = url {
                tracing::info!(%business_id, %url, "name-guess found a website");
                write = write.with_website(url.clone()).extra("domain_guess_website", json!(url));
            }
            apply_verdict(pool, source, &write).await?;
            outcome.record(verdict);
        }

        Ok(outcome)
    }
    .await;

    match result {
        Ok(outcome) => {
            jobs::complete(
                pool,
                run_id,
                outcome.processed as i64,
                Some(&outcome.details(min_score)),
            )
            .await?;
            Ok(outcome)
        }
        Err(e) => {
            jobs::fail(pool, run_id, &e.to_string(), None).await?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has(candidates: &[String], domain: &str) -> bool {
        candidates.iter().any(|c| c == domain)
    }

    #[test]
    fn village_cobbler_generates_both_article_variants() {
        let candidates = generate_candidates("The Village Cobbler", Some("CA"));
        assert!(has(&candidates, "thevillagecobbler.ca"), "{candidates:?}");
        assert!(has(&candidates, "villagecobbler.ca"));
        assert!(has(&candidates, "thevillagecobbler.com"));
    }

    #[test]
    fn category_track_keeps_industry_words() {
        let candidates = generate_candidates("Dima Laundry", Some("AE"));
        assert!(has(&candidates, "dimalaundry.ae"), "{candidates:?}");
        assert!(has(&candidates, "dima.ae"));
    }

    #[test]
    fn singular_and_plural_variants_generated() {
        let candidates = generate_candidates("Morton Motors", Some("CA"));
        assert!(has(&candidates, "mortonmotors.ca"));
        assert!(has(&candidates, "mortonmotor.ca"));
    }

    #[test]
    fn raw_track_catches_curry_and_co() {
        let candidates = generate_candidates("Curry & Co.", Some("CA"));
        assert!(has(&candidates, "curryandco.ca"), "{candidates:?}");
    }

    #[test]
    fn acronym_track_builds_prefix_bases() {
        let candidates = generate_candidates("GTA Heating and Cooling", Some("CA"));
        assert!(has(&candidates, "gtaheating.ca"), "{candidates:?}");
    }

    #[test]
    fn longer_bases_come_first() {
        let candidates = generate_candidates("Morton Motors", Some("CA"));
        let long_idx = candidates.iter().position(|c| c == "mortonmotors.ca").unwrap();
        let first_word_only = candidates.iter().position(|c| c == "morton.ca");
        if let Some(short_idx) = first_word_only {
            assert!(long_idx < short_idx);
        }
    }

    #[test]
    fn empty_and_symbol_names_produce_nothing() {
        assert!(generate_candidates("", None).is_empty());
        assert!(generate_candidates("!!!", None).is_empty());
    }

    #[test]
    fn morphology_rules() {
        assert_eq!(
            singular_plural_variants("deliveries"),
            vec!["deliveries".to_string(), "delivery".to_string()]
        );
        assert_eq!(
            singular_plural_variants("boxes"),
            vec!["boxes".to_string(), "box".to_string()]
        );
        assert_eq!(
            singular_plural_variants("motors"),
            vec!["motors".to_string(), "motor".to_string()]
        );
        assert_eq!(singular_plural_variants("dentistry"), vec!["dentistry".to_string()]);
        assert_eq!(
            singular_plural_variants("brush"),
            vec!["brush".to_string(), "brushes".to_string()]
        );
        assert_eq!(
            singular_plural_variants("motor"),
            vec!["motor".to_string(), "motors".to_string()]
        );
        // Too short for variants.
        assert_eq!(singular_plural_variants("bus"), vec!["bus".to_string()]);
    }

    #[test]
    fn related_domains() {
        assert!(domains_related("loveyourshoes.ca", "www.loveyourshoes.ca"));
        assert!(domains_related("brand.com", "brand.co.uk"));
        assert!(domains_related("mortonmotor.com", "mortonmotors.com"));
        assert!(domains_related("indianroti.com", "indianrotihouse.com"));
        assert!(!domains_related("dima.com", "ddv.de"));
        assert!(!domains_related("thechildren.com", "montrealchildrenshospital.ca"));
        assert!(!domains_related("colborne.com", "colbornefoodbotics.com"));
        // Unknown hosts: assume related.
        assert!(domains_related("", "x.com"));
    }

    fn big_body(content: &str) -> String {
        // Pad past the minimum page size with inert filler.
        format!("{content}{}", "<div>menu</div>".repeat(100))
    }

    #[test]
    fn rejects_non_200_and_tiny_pages() {
        assert!(!is_valid_business_site(
            "https://acme.ca",
            "Acme Plumbing",
            404,
            &big_body("<html>acme plumbing</html>"),
            "https://acme.ca/",
            "acme plumbing",
        ));
        assert!(!is_valid_business_site(
            "https://acme.ca",
            "Acme Plumbing",
            200,
            "<html>tiny</html>",
            "https://acme.ca/",
            "acme plumbing",
        ));
    }

    #[test]
    fn rejects_parked_pages() {
        let body = big_body("<html><title>coming soon</title>this domain is for sale</html>");
        assert!(!is_valid_business_site(
            "https://acme.ca",
            "Acme Plumbing",
            200,
            &body,
            "https://acme.ca/",
            "coming soon",
        ));
    }

    #[test]
    fn rejects_redirect_to_unrelated_host() {
        let body = big_body("<html>dima content laundromat</html>");
        assert!(!is_valid_business_site(
            "https://dima.com",
            "Dima Laundry",
            200,
            &body,
            "https://ddv.de/",
            "ddv gmbh",
        ));
    }

    #[test]
    fn accepts_matching_two_word_name() {
        let body = big_body(
            "<html><head><title>Morton Motors — Used Cars</title></head>\
             <body>Welcome to morton motors of Toronto</body></html>",
        );
        assert!(is_valid_business_site(
            "https://mortonmotors.ca",
            "Morton Motors",
            200,
            &body,
            "https://mortonmotors.ca/",
            "morton motors — used cars",
        ));
    }

    #[test]
    fn rejects_one_weak_match_for_four_word_name() {
        // Only "colborne" matches, 1 of 4 significant words.
        let body = big_body(
            "<html><title>Colborne Foodbotics</title>\
             <body>colborne bakery robotics and automation</body></html>",
        );
        assert!(!is_valid_business_site(
            "https://colborne.com",
            "Colborne Street United Church",
            200,
            &body,
            "https://colborne.com/",
            "colborne foodbotics",
        ));
    }

    #[test]
    fn single_word_name_requires_title_hit() {
        let ok_body = big_body("<html><title>Zowar Restaurant Jordan</title>zowar dishes</html>");
        assert!(is_valid_business_site(
            "https://zowar.net",
            "Al Zowar",
            200,
            &ok_body,
            "https://zowar.net/",
            "zowar restaurant jordan",
        ));

        let miss_body = big_body("<html><title>Something Else</title>zowar in body only</html>");
        assert!(!is_valid_business_site(
            "https://zowar.net",
            "Al Zowar",
            200,
            &miss_body,
            "https://zowar.net/",
            "something else",
        ));
    }

    #[test]
    fn domain_echo_title_small_page_is_rejected() {
        let body = "<html><title>etihads.net</title>".to_string()
            + &"<p>etihads filler</p>".repeat(40);
        assert!(body.len() < 10_000);
        assert!(!is_valid_business_site(
            "https://etihads.net",
            "Etihads",
            200,
            &body,
            "https://etihads.net/",
            "etihads.net",
        ));
    }

    #[test]
    fn generic_only_matches_are_rejected() {
        let body = big_body(
            "<html><title>Auto Services Directory</title>\
             auto service auto service best auto service</html>",
        );
        assert!(!is_valid_business_site(
            "https://auto-services.ca",
            "B-K Auto Service",
            200,
            &body,
            "https://auto-services.ca/",
            "auto services directory",
        ));
    }

    #[test]
    fn title_filter_rejects_name_collisions() {
        // Body matches "trans" and "tech", but the title belongs to a
        // different business and carries no brand word.
        let body = big_body(
            "<html><title>CDL Training Programs</title>\
             trans tech serving students</html>",
        );
        assert!(!is_valid_business_site(
            "https://trans-tech.net",
            "Trans Tech",
            200,
            &body,
            "https://trans-tech.net/",
            "cdl training programs",
        ));
    }
}
