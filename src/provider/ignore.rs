//! Ignore-list loading

use super::{ProviderError, ProviderResult};
use indexmap::IndexSet;
use std::path::Path;

/// One ARN per line; blank lines and `#` comments are skipped.
/// Order of first appearance is kept, duplicates dropped.
pub fn parse_ignore_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

pub async fn load_ignore_list(path: impl AsRef<Path>) -> ProviderResult<Vec<String>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProviderError::from_io(path, e))?;
    Ok(parse_ignore_list(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_duplicates() {
        let text = "# break-glass\n\narn:aws:iam::1:role/BreakGlass\n  arn:aws:iam::1:role/Audit  \narn:aws:iam::1:role/BreakGlass\n";
        assert_eq!(
            parse_ignore_list(text),
            vec![
                "arn:aws:iam::1:role/BreakGlass".to_string(),
                "arn:aws:iam::1:role/Audit".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_ignore_list(dir.path().join("absent.txt")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ignore.txt");
        std::fs::write(&path, "arn:aws:iam::1:role/A\n").unwrap();
        assert_eq!(load_ignore_list(&path).await.unwrap().len(), 1);
    }
}
