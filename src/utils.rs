//! Small path helpers shared by the store and the engine.

/// Ensure a folder path ends with a separator so a file name can be appended
/// directly. Empty input stays empty (the file name then stands alone).
pub fn correct_folder_path(folder: &str) -> String {
    let trimmed = folder.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.ends_with('/') || trimmed.ends_with('\\') {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, std::path::MAIN_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_separator_when_missing() {
        let corrected = correct_folder_path("shots");
        assert!(corrected.starts_with("shots"));
        assert!(corrected.ends_with(std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn keeps_existing_separator() {
        assert_eq!(correct_folder_path("shots/"), "shots/");
        assert_eq!(correct_folder_path("shots\\"), "shots\\");
    }

    #[test]
    fn empty_folder_stays_empty() {
        assert_eq!(correct_folder_path(""), "");
        assert_eq!(correct_folder_path("   "), "");
    }
}
