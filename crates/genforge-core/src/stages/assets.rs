//! Curated niche table: keywords, palette, copy and stock imagery.
//!
//! Used by the planner to pick an image manifest and by the default file
//! set, so both paths agree on the look of a project.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NicheImage {
    pub url: &'static str,
    pub alt: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Niche {
    pub id: &'static str,
    pub keywords: &'static [&'static str],
    pub title: &'static str,
    pub headline: &'static str,
    pub tagline: &'static str,
    pub cta: &'static str,
    pub primary_color: &'static str,
    pub accent_color: &'static str,
    pub images: &'static [NicheImage],
}

const fn image(url: &'static str, alt: &'static str) -> NicheImage {
    NicheImage { url, alt }
}

pub const NICHES: &[Niche] = &[
    Niche {
        id: "restaurant",
        keywords: &["restaurant", "cafe", "coffee", "bakery", "bistro", "food", "menu", "dining", "chef", "bar"],
        title: "Savor",
        headline: "Seasonal food, made with care",
        tagline: "Fresh ingredients, a warm room and a table waiting for you.",
        cta: "Book a table",
        primary_color: "#b45309",
        accent_color: "#f59e0b",
        images: &[
            image(
                "https://images.unsplash.com/photo-1517248135467-4c7edcad34c4?auto=format&fit=crop&w=1600&q=80",
                "Warmly lit restaurant interior",
            ),
            image(
                "https://images.unsplash.com/photo-1504674900247-0877df9cc836?auto=format&fit=crop&w=1200&q=80",
                "Plated dish on a wooden table",
            ),
        ],
    },
    Niche {
        id: "fitness",
        keywords: &["gym", "fitness", "workout", "trainer", "yoga", "crossfit", "health club", "pilates"],
        title: "Pulse Fitness",
        headline: "Stronger every single week",
        tagline: "Coaching, classes and a community that keeps you moving.",
        cta: "Start training",
        primary_color: "#dc2626",
        accent_color: "#f97316",
        images: &[image(
            "https://images.unsplash.com/photo-1534438327276-14e5300c3a48?auto=format&fit=crop&w=1600&q=80",
            "Athlete training in a modern gym",
        )],
    },
    Niche {
        id: "saas",
        keywords: &["saas", "startup", "software", "app", "platform", "dashboard", "analytics", "api", "tool"],
        title: "Launchpad",
        headline: "Ship faster with less busywork",
        tagline: "One workspace for your team, your data and your releases.",
        cta: "Get started free",
        primary_color: "#4f46e5",
        accent_color: "#06b6d4",
        images: &[image(
            "https://images.unsplash.com/photo-1551434678-e076c223a692?auto=format&fit=crop&w=1600&q=80",
            "Team collaborating around laptops",
        )],
    },
    Niche {
        id: "portfolio",
        keywords: &["portfolio", "personal", "resume", "designer", "photographer", "developer", "freelance"],
        title: "Studio",
        headline: "Design and code, crafted with intent",
        tagline: "Selected work, process notes and a way to get in touch.",
        cta: "View my work",
        primary_color: "#0f172a",
        accent_color: "#8b5cf6",
        images: &[image(
            "https://images.unsplash.com/photo-1498050108023-c5249f4df085?auto=format&fit=crop&w=1600&q=80",
            "Laptop with code on a desk",
        )],
    },
    Niche {
        id: "ecommerce",
        keywords: &["shop", "store", "ecommerce", "e-commerce", "boutique", "products", "fashion", "clothing"],
        title: "Northwind Goods",
        headline: "Everyday goods, thoughtfully made",
        tagline: "Small-batch products with free shipping on every order.",
        cta: "Shop the collection",
        primary_color: "#047857",
        accent_color: "#10b981",
        images: &[image(
            "https://images.unsplash.com/photo-1441986300917-64674bd600d8?auto=format&fit=crop&w=1600&q=80",
            "Bright retail store interior",
        )],
    },
    Niche {
        id: "real_estate",
        keywords: &["real estate", "realtor", "property", "properties", "homes", "apartment", "housing", "rental"],
        title: "Keystone Realty",
        headline: "Find the place that feels like home",
        tagline: "Local agents, honest advice and listings updated daily.",
        cta: "Browse listings",
        primary_color: "#1d4ed8",
        accent_color: "#f59e0b",
        images: &[image(
            "https://images.unsplash.com/photo-1560518883-ce09059eeffa?auto=format&fit=crop&w=1600&q=80",
            "Modern family house exterior",
        )],
    },
    Niche {
        id: "travel",
        keywords: &["travel", "tour", "trip", "hotel", "vacation", "resort", "adventure", "booking"],
        title: "Wayfarer",
        headline: "Trips worth remembering",
        tagline: "Hand-picked destinations and itineraries built around you.",
        cta: "Plan your trip",
        primary_color: "#0e7490",
        accent_color: "#f97316",
        images: &[image(
            "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?auto=format&fit=crop&w=1600&q=80",
            "Tropical beach at sunset",
        )],
    },
    Niche {
        id: "medical",
        keywords: &["clinic", "medical", "doctor", "dental", "dentist", "hospital", "health", "therapy"],
        title: "Harbor Clinic",
        headline: "Care that puts you first",
        tagline: "Experienced clinicians, same-week appointments and clear answers.",
        cta: "Book an appointment",
        primary_color: "#0369a1",
        accent_color: "#14b8a6",
        images: &[image(
            "https://images.unsplash.com/photo-1576091160399-112ba8d25d1d?auto=format&fit=crop&w=1600&q=80",
            "Doctor speaking with a patient",
        )],
    },
    Niche {
        id: "education",
        keywords: &["school", "course", "courses", "academy", "education", "learning", "tutor", "university"],
        title: "Brightpath Academy",
        headline: "Learn the skills that matter",
        tagline: "Live classes, expert mentors and a path from first lesson to mastery.",
        cta: "Explore courses",
        primary_color: "#7c3aed",
        accent_color: "#f43f5e",
        images: &[image(
            "https://images.unsplash.com/photo-1523050854058-8df90110c9f1?auto=format&fit=crop&w=1600&q=80",
            "Graduates celebrating on campus",
        )],
    },
];

pub const GENERIC: Niche = Niche {
    id: "generic",
    keywords: &[],
    title: "Horizon",
    headline: "Build something people love",
    tagline: "A modern, fast and friendly home for your next idea.",
    cta: "Get in touch",
    primary_color: "#2563eb",
    accent_color: "#22c55e",
    images: &[image(
        "https://images.unsplash.com/photo-1497366216548-37526070297c?auto=format&fit=crop&w=1600&q=80",
        "Bright modern office space",
    )],
};

/// Niche with the most keyword hits in `prompt`; ties go to the earlier entry.
pub fn detect_niche(prompt: &str) -> &'static Niche {
    let lower = prompt.to_lowercase();
    let mut best: Option<(&'static Niche, usize)> = None;
    for niche in NICHES {
        let hits = niche.keywords.iter().filter(|k| contains_word(&lower, k)).count();
        if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
            best = Some((niche, hits));
        }
    }
    best.map_or(&GENERIC, |(niche, _)| niche)
}

pub fn niche_by_id(id: &str) -> Option<&'static Niche> {
    NICHES.iter().find(|n| n.id == id)
}

/// `needle` in `haystack` on word boundaries (multi-word needles allowed).
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_niche_by_keywords() {
        assert_eq!(detect_niche("Build a website for my Italian restaurant").id, "restaurant");
        assert_eq!(detect_niche("landing page for a SaaS analytics platform").id, "saas");
        assert_eq!(detect_niche("a real estate site with listings").id, "real_estate");
        assert_eq!(detect_niche("something nice").id, "generic");
    }

    #[test]
    fn keywords_match_whole_words() {
        // "app" must not match inside "happy".
        assert_eq!(detect_niche("a happy page").id, "generic");
    }

    #[test]
    fn every_niche_has_an_image_and_hex_colors() {
        for niche in NICHES.iter().chain(std::iter::once(&GENERIC)) {
            assert!(!niche.images.is_empty(), "{}", niche.id);
            assert!(niche.images[0].url.starts_with("https://"));
            assert_eq!(niche.primary_color.len(), 7);
        }
    }
}
