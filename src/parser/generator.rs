use super::frameworks::{Framework, FrameworkCode};

const EXCERPT_WORDS: usize = 5;
const MIN_WORD_LEN: usize = 4;
const TITLE_SEED_LEN: usize = 40;
const DESC_SEED_LEN: usize = 80;

pub const TITLE_MAX_LEN: usize = 65;
pub const META_MAX_LEN: usize = 155;

/// Three titles and three meta descriptions for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeoCopy {
    pub titles: [String; 3],
    pub meta_descriptions: [String; 3],
}

struct TemplateSet {
    titles: [&'static str; 3],
    descriptions: [&'static str; 3],
}

// `{}` is replaced by the title seed in titles and the description seed in descriptions.
const AIDA: TemplateSet = TemplateSet {
    titles: [
        "{} - An Innovative Solution",
        "Discover {} Now",
        "{}: Transform Your Approach",
    ],
    descriptions: [
        "Capture attention with {}. Discover a solution that sparks your interest and turns desire into concrete action.",
        "{} attracts, interests and inspires. A unique approach that makes you want to act right away. Join us now.",
        "Guaranteed attention with {}. From first interest to real desire, all the way to decisive action. Your success starts here.",
    ],
};

const PAS: TemplateSet = TemplateSet {
    titles: [
        "{} Problem? Here Is the Solution",
        "{}: No More Complications",
        "Solve {} for Good",
    ],
    descriptions: [
        "Worried about {}? We look at what makes it frustrating so we can offer the definitive solution.",
        "{} causing problems? It gets worse every day. Luckily, we have THE solution that changes everything.",
        "Problem with {} identified. The consequences are growing. Discover our proven solution that fixes it immediately.",
    ],
};

const BAB: TemplateSet = TemplateSet {
    titles: [
        "Before/After: {} Transformed",
        "{}: From Zero to Expert",
        "Your {} Before vs Now",
    ],
    descriptions: [
        "Before: {} is complicated. After: total simplicity. Discover the bridge from where you are to the success you want.",
        "{} transformed! From the first difficulty to an outstanding result. Your path to success starts now.",
        "Your before/after with {} is waiting. Cross the bridge to a new reality. Transformation guaranteed today.",
    ],
};

const STDC: TemplateSet = TemplateSet {
    titles: [
        "{}: Your Dream Becomes Reality",
        "Transition to the Perfect {}",
        "{}: From Idea to Success",
    ],
    descriptions: [
        "{}: from excellence to a seamless transition. Your dream becomes reality with our personal and effective approach.",
        "Start from excellent {} and move smoothly toward your boldest dreams. A natural, successful close guaranteed.",
        "Exceptional {} leads to your ultimate dream. Smooth transition, outstanding results. Your success starts here.",
    ],
};

const QUEST: TemplateSet = TemplateSet {
    titles: [
        "Complete Guide: {}",
        "{}: Questions & Answers",
        "Master {} Easily",
    ],
    descriptions: [
        "Questions about {}? We qualify, understand, educate, stimulate and ease your transition to success.",
        "{} demystified: qualification, understanding, complete education. Stimulation guaranteed for a successful transition.",
        "Qualify your {}, understand what is at stake, learn efficiently. Stimulation and a transition to excellence assured.",
    ],
};

const PASTOR: TemplateSet = TemplateSet {
    titles: [
        "{}: A Success Story",
        "Testimonial: {} That Works",
        "{}: Proof by Example",
    ],
    descriptions: [
        "Problem with {}? Our story amplifies your situation. Authentic testimonials, an exceptional offer. Respond now.",
        "{} amplified by our unique story. Customer testimonials, an irresistible offer. Your response decides your success.",
        "True story: {} solved. Convincing testimonials, a time-limited offer. Respond before it is too late.",
    ],
};

const FALLBACK: TemplateSet = TemplateSet {
    titles: [
        "{} - Professional Solutions",
        "Guaranteed {} Expertise",
        "{}: Your Trusted Partner",
    ],
    descriptions: [
        "Professional {} solutions. Recognised expertise, guaranteed results. Trust our proven know-how.",
        "{} with excellence as standard. Our expertise guides you to success. A trusted partner for years.",
        "Certified professional {}. Tailored solutions, personal support. Your success is our top priority.",
    ],
};

fn templates(code: Option<FrameworkCode>) -> &'static TemplateSet {
    match code {
        Some(FrameworkCode::Aida) => &AIDA,
        Some(FrameworkCode::Pas) => &PAS,
        Some(FrameworkCode::Stdc) => &STDC,
        Some(FrameworkCode::Bab) => &BAB,
        Some(FrameworkCode::Quest) => &QUEST,
        Some(FrameworkCode::Pastor) => &PASTOR,
        None => &FALLBACK,
    }
}

/// First five whitespace tokens longer than three characters, space-joined.
pub fn keyword_excerpt(content: &str) -> String {
    content
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .take(EXCERPT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn fill(set: &TemplateSet, title_seed: &str, desc_seed: &str) -> SeoCopy {
    SeoCopy {
        titles: set.titles.map(|t| t.replace("{}", title_seed)),
        meta_descriptions: set.descriptions.map(|t| t.replace("{}", desc_seed)),
    }
}

fn generate_with(content: &str, code: Option<FrameworkCode>) -> SeoCopy {
    let excerpt = keyword_excerpt(content);
    let title_seed = truncate_chars(&excerpt, TITLE_SEED_LEN);
    let desc_seed = truncate_chars(&excerpt, DESC_SEED_LEN);
    fill(templates(code), &title_seed, &desc_seed)
}

pub fn generate(content: &str, framework: &Framework) -> SeoCopy {
    generate_with(content, Some(framework.code))
}

/// Like [`generate`] but keyed by a raw tag; unknown tags get the generic set.
pub fn generate_for_tag(content: &str, tag: &str) -> SeoCopy {
    generate_with(content, FrameworkCode::parse(tag))
}

/// Length report for a title/meta pair. Display only, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCheck {
    pub title_len: usize,
    pub title_valid: bool,
    pub meta_len: usize,
    pub meta_valid: bool,
}

pub fn check_copy(title: &str, meta_description: &str) -> CopyCheck {
    let title_len = title.chars().count();
    let meta_len = meta_description.chars().count();
    CopyCheck {
        title_len,
        title_valid: title_len <= TITLE_MAX_LEN,
        meta_len,
        meta_valid: meta_len <= META_MAX_LEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Marketing automation software that streamlines your campaigns and maximizes ROI.";

    #[test]
    fn excerpt_skips_short_words() {
        assert_eq!(
            keyword_excerpt(SAMPLE),
            "Marketing automation software that streamlines"
        );
        assert_eq!(keyword_excerpt("a an the of to"), "");
    }

    #[test]
    fn excerpt_splits_on_any_whitespace() {
        assert_eq!(keyword_excerpt("alpha\tbravo\ncharlie   delta"), "alpha bravo charlie delta");
    }

    #[test]
    fn every_framework_yields_three_and_three() {
        for code in FrameworkCode::ALL {
            let copy = generate(SAMPLE, &Framework::new(code, ""));
            assert_eq!(copy.titles.len(), 3);
            assert_eq!(copy.meta_descriptions.len(), 3);
            assert!(copy.titles.iter().all(|t| !t.is_empty()));
            assert!(copy.meta_descriptions.iter().all(|d| !d.is_empty()));
            assert!(copy.titles.iter().all(|t| !t.contains("{}")));
        }
    }

    #[test]
    fn title_seed_is_capped_at_forty_chars() {
        let copy = generate(SAMPLE, &Framework::new(FrameworkCode::Quest, ""));
        assert_eq!(copy.titles[0], "Complete Guide: Marketing automation software that strea");
        assert!(copy.meta_descriptions[0]
            .contains("Marketing automation software that streamlines"));
    }

    #[test]
    fn frameworks_produce_distinct_copy() {
        let aida = generate(SAMPLE, &Framework::new(FrameworkCode::Aida, ""));
        let pas = generate(SAMPLE, &Framework::new(FrameworkCode::Pas, ""));
        assert_ne!(aida, pas);
    }

    #[test]
    fn unknown_tag_uses_generic_templates() {
        let copy = generate_for_tag(SAMPLE, "4Ps");
        assert!(copy.titles[0].ends_with("- Professional Solutions"));
        let known = generate_for_tag(SAMPLE, "bab");
        assert!(known.titles[0].starts_with("Before/After:"));
    }

    #[test]
    fn long_generated_copy_is_not_clipped() {
        let long = "Extraordinarily comprehensive internationalization documentation \
                    infrastructure modernization";
        let copy = generate(long, &Framework::new(FrameworkCode::Aida, ""));
        let check = check_copy(&copy.titles[2], &copy.meta_descriptions[2]);
        assert_eq!(check.title_len, copy.titles[2].chars().count());
        assert!(check.meta_len > META_MAX_LEN);
        assert!(!check.meta_valid);
    }

    #[test]
    fn check_thresholds_are_inclusive() {
        let c = check_copy(&"t".repeat(65), &"m".repeat(155));
        assert!(c.title_valid && c.meta_valid);
        let c = check_copy(&"t".repeat(66), &"m".repeat(156));
        assert!(!c.title_valid && !c.meta_valid);
    }
}
