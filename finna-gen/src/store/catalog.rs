//! All entity kinds of one data folder

use super::{EntityKind, EntityTable, GenreTable};
use crate::error::StoreError;
use std::path::{Path, PathBuf};

/// The four entity stores backing one data folder
#[derive(Debug)]
pub struct EntityCatalog {
    folder: PathBuf,
    pub authors: EntityTable,
    pub publishers: EntityTable,
    pub topics: EntityTable,
    pub genres: GenreTable,
}

impl EntityCatalog {
    pub async fn open(folder: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let folder = folder.into();

        let authors = EntityTable::open(
            EntityKind::Author,
            folder.join(EntityKind::Author.file_name()),
        )
        .await?;
        let publishers = EntityTable::open(
            EntityKind::Publisher,
            folder.join(EntityKind::Publisher.file_name()),
        )
        .await?;
        let topics = EntityTable::open(
            EntityKind::Topic,
            folder.join(EntityKind::Topic.file_name()),
        )
        .await?;
        let genres = GenreTable::open(folder.join(EntityKind::Genre.file_name())).await?;

        Ok(Self {
            folder,
            authors,
            publishers,
            topics,
            genres,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Table for a surrogate-key kind; `None` for genres
    pub fn table(&self, kind: EntityKind) -> Option<&EntityTable> {
        match kind {
            EntityKind::Author => Some(&self.authors),
            EntityKind::Publisher => Some(&self.publishers),
            EntityKind::Topic => Some(&self.topics),
            EntityKind::Genre => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_empty_folder() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = EntityCatalog::open(temp_dir.path()).await.unwrap();

        assert_eq!(catalog.folder(), temp_dir.path());
        assert!(catalog.authors.is_empty().await);
        assert!(catalog.genres.is_empty());
        assert_eq!(catalog.genres.description("-1"), None);
        assert!(catalog.table(EntityKind::Genre).is_none());
        let topics = temp_dir.path().join("topics.txt");
        assert_eq!(
            catalog.table(EntityKind::Topic).map(EntityTable::path),
            Some(topics.as_path())
        );
    }
}
