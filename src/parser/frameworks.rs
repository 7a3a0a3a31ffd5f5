use serde::{Deserialize, Serialize};

/// The six copywriting frameworks content can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameworkCode {
    Aida,
    Pas,
    Stdc,
    Bab,
    Quest,
    Pastor,
}

impl FrameworkCode {
    pub const ALL: [FrameworkCode; 6] = [
        FrameworkCode::Aida,
        FrameworkCode::Pas,
        FrameworkCode::Stdc,
        FrameworkCode::Bab,
        FrameworkCode::Quest,
        FrameworkCode::Pastor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FrameworkCode::Aida => "AIDA",
            FrameworkCode::Pas => "PAS",
            FrameworkCode::Stdc => "STDC",
            FrameworkCode::Bab => "BAB",
            FrameworkCode::Quest => "QUEST",
            FrameworkCode::Pastor => "PASTOR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FrameworkCode::Aida => "Attention, Interest, Desire, Action",
            FrameworkCode::Pas => "Problem, Agitation, Solution",
            FrameworkCode::Stdc => "Star, Transition, Dream, Close",
            FrameworkCode::Bab => "Before, After, Bridge",
            FrameworkCode::Quest => "Qualify, Understand, Educate, Stimulate, Transition",
            FrameworkCode::Pastor => "Problem, Amplify, Story, Testimonial, Offer, Response",
        }
    }

    /// Display style tag (badge colour family).
    pub fn style(&self) -> &'static str {
        match self {
            FrameworkCode::Aida => "blue",
            FrameworkCode::Pas => "red",
            FrameworkCode::Stdc => "purple",
            FrameworkCode::Bab => "green",
            FrameworkCode::Quest => "yellow",
            FrameworkCode::Pastor => "indigo",
        }
    }

    pub fn parse(tag: &str) -> Option<FrameworkCode> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.name().eq_ignore_ascii_case(tag))
    }
}

impl std::fmt::Display for FrameworkCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// A classified framework: the fixed catalog entry plus the justification
/// assigned at classification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub code: FrameworkCode,
    #[serde(default)]
    pub justification: String,
}

impl Framework {
    pub fn new(code: FrameworkCode, justification: impl Into<String>) -> Self {
        Self {
            code,
            justification: justification.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.code.name()
    }

    pub fn description(&self) -> &'static str {
        self.code.description()
    }
}

/// Ordered keyword rules; first hit wins, AIDA otherwise.
const RULES: &[(&[&str], FrameworkCode, &str)] = &[
    (&["problem", "solution"], FrameworkCode::Pas, "problem-solving-focused content"),
    (&["before", "after"], FrameworkCode::Bab, "before/after structure identified"),
    (
        &["story", "testimonial"],
        FrameworkCode::Pastor,
        "narrative and testimonial elements present",
    ),
];

const DEFAULT_JUSTIFICATION: &str = "versatile framework suited to the content";

pub fn detect(content: &str) -> Framework {
    let lower = content.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, code, why)| Framework::new(*code, *why))
        .unwrap_or_else(|| Framework::new(FrameworkCode::Aida, DEFAULT_JUSTIFICATION))
}
