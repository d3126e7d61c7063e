//! # Spec Data Tables
//!
//! Fixed string sets the classifier and verifiers compare against:
//! parking indicators, directory/social domains, country TLD preferences.
//! These lists are operational data, tuned against real OSM imports for
//! the operator's locales (CA, AE, QA primarily).

/// Parking keywords checked against a classified domain's response body
/// (lowercase substring match).
pub const PARKING_KEYWORDS: &[&str] = &[
    "domain for sale",
    "buy this domain",
    "this domain is for sale",
    "domain parked",
    "parkingcrew",
    "sedo",
    "afternic",
    "bodis",
    "namecheap",
    "dan.com",
    "cashparking",
    "click here to inquire",
];

/// Host hints checked against the final redirect URL's host and any CNAME
/// target (lowercase substring match).
pub const PARKING_HOST_HINTS: &[&str] = &[
    "parkingcrew",
    "sedoparking",
    "bodis",
    "afternic",
    "dan.com",
    "namecheap",
    "hugedomains",
];

/// Page-level indicators used by the name-guess validator. Broader than
/// [`PARKING_KEYWORDS`]: also catches coming-soon shells, registrar
/// holding pages, hosting defaults, and domain-marketplace landers.
pub const PARKED_PAGE_INDICATORS: &[&str] = &[
    "domain is for sale",
    "buy this domain",
    "parked free",
    "parked by",
    "this domain may be for sale",
    "godaddy.com/domain",
    "sedoparking",
    "hugedomains",
    "dan.com",
    "afternic",
    "namecheap.com/domains",
    "domain parking",
    "this webpage was generated by the domain owner",
    "is for sale",
    "is available for purchase",
    "bodis.com",
    "for sale</title>",
    "for sale |",
    "for sale -",
    "href=\"/lander\"",
    "window.location.href=\"/lander\"",
    "domain has been registered",
    "this domain is registered",
    "sav.com",
    "porkbun.com",
    "coming soon</title>",
    "coming soon |",
    "under construction</title>",
    "site coming soon",
    "website coming soon",
    "launching soon",
    "hover realnames",
    "realnames",
    "a more meaningful email",
    "namecheap.com",
    "squarespace.com/domain",
    "premium domain",
    "high value domain",
    "domain names for sale",
    "domain name for sale",
    "domain marketplace",
    "domain auction",
    "domain portfolio",
    "category-defining",
    "category defining",
    "brandable domain",
    "exact match domain",
    "domain registered at",
    "domain default page",
    "default web site page",
    "this site is under construction",
    "this account has been suspended",
    "web hosting by",
    "cpanel",
    "plesk default page",
    "welcome to nginx",
    "apache2 default page",
    "it works!",
    "test page for the apache",
    "congratulations! your new host",
];

/// Minimum body size for a page to count as a real business website.
pub const MIN_REAL_PAGE_BYTES: usize = 500;

/// Business directories, social networks, marketplaces, and aggregators.
/// A search result pointing here is never "the business's own website".
/// Matching is exact-domain or parent-domain (`x.yelp.com` matches
/// `yelp.com`).
pub const DIRECTORY_DOMAINS: &[&str] = &[
    // Social media
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "tiktok.com",
    "youtube.com",
    "pinterest.com",
    "threads.net",
    // Business directories
    "yelp.com",
    "yelp.ca",
    "yelp.ae",
    "yellowpages.com",
    "yellowpages.ca",
    "yellowpages.ae",
    "tripadvisor.com",
    "tripadvisor.ca",
    "tripadvisor.ae",
    "bbb.org",
    "trustpilot.com",
    "glassdoor.com",
    "indeed.com",
    "mapquest.com",
    "foursquare.com",
    "zomato.com",
    "talabat.com",
    "deliveroo.com",
    "deliveroo.ae",
    "ubereats.com",
    "doordash.com",
    "grubhub.com",
    "justeat.com",
    // Maps & navigation
    "google.com",
    "google.ca",
    "google.ae",
    "maps.google.com",
    "apple.com",
    "bing.com",
    "mapy.com",
    "yango.com",
    "waze.com",
    "here.com",
    "mapcarta.com",
    // General directories & aggregators
    "crunchbase.com",
    "bloomberg.com",
    "reuters.com",
    "wikipedia.org",
    "wikidata.org",
    "openstreetmap.org",
    "manta.com",
    "dnb.com",
    "hoovers.com",
    "kompass.com",
    "chamberofcommerce.com",
    // UAE / Middle East directories
    "bayut.com",
    "propertyfinder.ae",
    "dubizzle.com",
    "yallacompare.com",
    "connectuae.com",
    "yellowpages-uae.com",
    "bizuum.com",
    "dubaitradersonline.com",
    "2gis.ae",
    "2gis.com",
    "connectuae.ae",
    "uaecontact.com",
    "dubaibizfinder.com",
    "finduslocal.com",
    "thedubaimall.com",
    "visitdubai.com",
    "aiwa.ae",
    "bestrestaurantdubaii.com",
    // Canada directories
    "canada411.ca",
    "canadapages.com",
    "pagesjaunes.ca",
    "qdexx.com",
    "cylex.com",
    "cylex.ca",
    "brownbook.net",
    "hotfrog.com",
    "hotfrog.ca",
    "shopintoronto.com",
    "carsandcars.ca",
    "n49.com",
    "ourbis.ca",
    "411.ca",
    "411.info",
    "canpages.ca",
    "mysask411.com",
    "infobel.com",
    // Booking & reservations
    "booking.com",
    "airbnb.com",
    "expedia.com",
    "hotels.com",
    "agoda.com",
    "hotelscombined.com",
    "hotelscombined.co.uk",
    "trivago.com",
    "trivago.ae",
    "trivago.ca",
    "kayak.com",
    "kayak.ae",
    "priceline.com",
    "fiji.travel",
    // Food delivery platforms
    "menulog.com.au",
    "eat.ch",
    "lieferando.de",
    "noon.com",
    "food.noon.com",
    "careem.com",
    "hungerstation.com",
    "toters.com",
    "skipcart.com",
    "instacart.com",
    "postmates.com",
    // Review / blog platforms
    "blogspot.com",
    "wordpress.com",
    "medium.com",
    "tumblr.com",
    "reddit.com",
    "quora.com",
    // Appointment platforms
    "fresha.com",
    "vagaro.com",
    "booksy.com",
    "mindbodyonline.com",
    "schedulicity.com",
    // Misc listing sites
    "neardaddy.com",
    "smokepipeshops.com",
    "city-data.com",
    "investinganswers.com",
    "newmouth.com",
    "backindo.com",
    // Reference / encyclopedia
    "britannica.com",
    "merriam-webster.com",
    "dictionary.com",
    "howstuffworks.com",
    // Food / recipe sites
    "foodnetwork.com",
    "eatingwell.com",
    "allrecipes.com",
    // Government / institutional
    "worldbank.org",
    "un.org",
    "who.int",
    // Tech / Q&A
    "stackoverflow.com",
    "stackexchange.com",
    "github.com",
    // Chinese aggregators
    "zhihu.com",
    "baidu.com",
    "jingyan.baidu.com",
    "zhidao.baidu.com",
    // E-commerce marketplaces
    "amazon.com",
    "amazon.ca",
    "amazon.ae",
    "ebay.com",
    "ebay.ca",
    "walmart.com",
    "walmart.ca",
    "alibaba.com",
    "etsy.com",
];

/// Whether a host belongs to a directory/social/aggregator domain.
pub fn is_directory_host(host: &str) -> bool {
    let host = host.trim().to_lowercase();
    if host.is_empty() {
        return true; // unparseable → treat as not-a-business-site
    }
    DIRECTORY_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Preferred TLDs per ISO country code for name-guess candidates.
pub fn country_tlds(country: Option<&str>) -> &'static [&'static str] {
    match country.map(str::to_ascii_uppercase).as_deref() {
        Some("AE") => &[".ae", ".com", ".net"],
        Some("CA") => &[".ca", ".com", ".net"],
        Some("QA") => &[".qa", ".com", ".net"],
        Some("US") => &[".com", ".us", ".net", ".org"],
        Some("GB") | Some("UK") => &[".co.uk", ".com", ".net", ".org"],
        Some("AU") => &[".com.au", ".com", ".net"],
        Some("IN") => &[".in", ".com", ".net"],
        Some("SA") => &[".sa", ".com", ".net"],
        Some("KW") => &[".kw", ".com", ".net"],
        Some("BH") => &[".bh", ".com", ".net"],
        Some("OM") => &[".om", ".com", ".net"],
        Some("JO") => &[".jo", ".com", ".net"],
        Some("LB") => &[".lb", ".com", ".net"],
        Some("EG") => &[".eg", ".com", ".net"],
        Some("PK") => &[".pk", ".com", ".net"],
        _ => &[".com", ".net"],
    }
}

/// TLDs that make a business *name* look like a domain (`iRepair.ca`).
pub const DOMAIN_LIKE_TLDS: &[&str] = &[
    ".com", ".ca", ".ae", ".qa", ".io", ".co", ".net", ".org", ".biz", ".info", ".us", ".uk",
    ".app", ".dev", ".shop", ".store",
];

/// Whether a business name reads as a domain name: ends in a known TLD
/// once whitespace is removed, or contains `<tld>/`.
pub fn name_looks_like_domain(name: &str) -> bool {
    let clean = name.trim().to_lowercase().replace(' ', "");
    if clean.is_empty() {
        return false;
    }
    DOMAIN_LIKE_TLDS
        .iter()
        .any(|tld| clean.ends_with(tld) || clean.contains(&format!("{tld}/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_matching_includes_subdomains() {
        assert!(is_directory_host("yelp.com"));
        assert!(is_directory_host("www.yelp.com"));
        assert!(is_directory_host("m.facebook.com"));
        assert!(!is_directory_host("acmeplumbing.ca"));
        assert!(is_directory_host(""));
    }

    #[test]
    fn country_tlds_prefer_local_then_com() {
        assert_eq!(country_tlds(Some("CA")), &[".ca", ".com", ".net"]);
        assert_eq!(country_tlds(Some("ca")), &[".ca", ".com", ".net"]);
        assert_eq!(country_tlds(Some("AE")), &[".ae", ".com", ".net"]);
        assert_eq!(country_tlds(None), &[".com", ".net"]);
        assert_eq!(country_tlds(Some("ZZ")), &[".com", ".net"]);
    }

    #[test]
    fn irepair_ca_looks_like_a_domain() {
        assert!(name_looks_like_domain("iRepair.ca"));
        assert!(name_looks_like_domain("SuperMart.ae"));
        assert!(name_looks_like_domain("shop.example.com/deals"));
        assert!(!name_looks_like_domain("The Village Cobbler"));
        assert!(!name_looks_like_domain(""));
    }
}
