pub mod content;
pub mod frameworks;
pub mod generator;

use frameworks::Framework;
use generator::SeoCopy;

/// Result of running fetched text through the analysis passes.
pub struct Analysis {
    pub content: String,
    pub framework: Framework,
    pub copy: SeoCopy,
}

/// Three-pass pipeline: raw text → plain text → framework → titles/descriptions.
pub fn analyze(raw: &str) -> Analysis {
    let content = content::extract_main_content(raw);
    let framework = frameworks::detect(&content);
    let copy = generator::generate(&content, &framework);
    Analysis {
        content,
        framework,
        copy,
    }
}
