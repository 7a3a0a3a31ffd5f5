/// Turn raw fetched text into the plain text the classifier sees.
///
/// Currently the identity: both fetchers already hand back readable text.
/// Main-content isolation from markup would slot in here without changing
/// the signature.
pub fn extract_main_content(raw: &str) -> String {
    raw.to_string()
}
