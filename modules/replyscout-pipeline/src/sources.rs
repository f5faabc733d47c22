use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use replyscout_common::{Platform, Post};

use crate::traits::PostSource;

/// Serves posts exported by an external scraper as a JSON array.
///
/// A post answers a query when its `search_term` equals the query
/// (case-insensitive). Posts exported without a search term answer any
/// query whose text they contain, and are tagged with that query.
pub struct SnapshotSource {
    platform: Platform,
    posts: Vec<Post>,
}

impl SnapshotSource {
    pub fn from_posts(platform: Platform, posts: Vec<Post>) -> Self {
        let posts = posts.into_iter().filter(|p| p.platform == platform).collect();
        Self { platform, posts }
    }

    pub fn from_file(platform: Platform, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let posts: Vec<Post> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid snapshot JSON: {}", path.display()))?;
        let source = Self::from_posts(platform, posts);
        info!(
            platform = %platform,
            posts = source.posts.len(),
            path = %path.display(),
            "Snapshot loaded"
        );
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

#[async_trait]
impl PostSource for SnapshotSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn scrape(&self, query: &str, limit: usize) -> Result<Vec<Post>> {
        let needle = query.to_lowercase();
        let posts = self
            .posts
            .iter()
            .filter_map(|p| {
                if p.search_term.eq_ignore_ascii_case(query) {
                    Some(p.clone())
                } else if p.search_term.is_empty() && p.text.to_lowercase().contains(&needle) {
                    let mut tagged = p.clone();
                    tagged.search_term = query.to_string();
                    Some(tagged)
                } else {
                    None
                }
            })
            .take(limit)
            .collect();
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use replyscout_common::Author;

    fn post(id: &str, platform: Platform, text: &str, term: &str) -> Post {
        Post::builder()
            .id(id)
            .platform(platform)
            .text(text)
            .author(Author::builder().username("a").build())
            .created_at(Utc::now())
            .search_term(term)
            .build()
    }

    #[tokio::test]
    async fn matches_by_term_then_text() {
        let source = SnapshotSource::from_posts(
            Platform::Twitter,
            vec![
                post("1", Platform::Twitter, "anything", "#BuildInPublic"),
                post("2", Platform::Twitter, "feeling the imposter syndrome", ""),
                post("3", Platform::Reddit, "imposter syndrome", ""),
                post("4", Platform::Twitter, "imposter syndrome", "other"),
            ],
        );
        assert_eq!(source.len(), 3);

        let tagged = source.scrape("#buildinpublic", 10).await.unwrap();
        assert_eq!(tagged.len(), 1);

        let by_text = source.scrape("Imposter Syndrome", 10).await.unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].id, "2");
        assert_eq!(by_text[0].search_term, "Imposter Syndrome");
    }

    #[tokio::test]
    async fn limit_applies() {
        let posts = (0..5)
            .map(|i| post(&i.to_string(), Platform::Reddit, "text", "Entrepreneur"))
            .collect();
        let source = SnapshotSource::from_posts(Platform::Reddit, posts);
        assert_eq!(source.scrape("Entrepreneur", 2).await.unwrap().len(), 2);
    }

    #[test]
    fn reads_json_file() {
        let path = std::env::temp_dir().join(format!("replyscout-snapshot-{}.json", uuid::Uuid::new_v4()));
        let json = serde_json::to_string(&vec![post("1", Platform::Twitter, "hello", "q")]).unwrap();
        std::fs::write(&path, json).unwrap();

        let source = SnapshotSource::from_file(Platform::Twitter, &path).unwrap();
        assert_eq!(source.len(), 1);
        std::fs::remove_file(&path).ok();

        assert!(SnapshotSource::from_file(Platform::Twitter, &path).is_err());
    }
}
