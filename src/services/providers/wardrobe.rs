use std::path::{Path, PathBuf};

use crate::{
    error::AppResult,
    models::ClothingItem,
    services::providers::WardrobeRepository,
};

/// Wardrobe snapshot stored as a JSON array of items
#[derive(Debug, Clone)]
pub struct JsonFileWardrobe {
    path: PathBuf,
}

impl JsonFileWardrobe {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl WardrobeRepository for JsonFileWardrobe {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn load_items(&self) -> AppResult<Vec<ClothingItem>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let items: Vec<ClothingItem> = serde_json::from_str(&raw)?;

        tracing::info!(path = %self.path.display(), items = items.len(), "Loaded wardrobe");

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Category, Season};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("wardrobe-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_load_items() {
        let path = temp_path();
        let json = r#"[
            {"id":"6f1c1c1e-8f0a-4b8e-9a63-1a2b3c4d5e6f","name":"navy blazer","category":"outerwear",
             "primary_color":"navy","formality":4,"seasons":["autumn","winter"]},
            {"id":"7a2d2d2f-9f1b-4c9f-8b74-2b3c4d5e6f70","category":"top","formality":3,
             "seasons":["spring","summer","autumn","winter"],"wear_count":12,"last_worn":"2024-10-01"}
        ]"#;
        tokio::fs::write(&path, json).await.unwrap();

        let items = JsonFileWardrobe::new(&path).load_items().await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].category, Category::Outerwear);
        assert!(items[0].seasons.contains(&Season::Winter));
        assert_eq!(items[1].wear_count, 12);
        assert!(items[1].last_worn.is_some());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_formality_rejected() {
        let path = temp_path();
        let json = r#"[{"id":"6f1c1c1e-8f0a-4b8e-9a63-1a2b3c4d5e6f","category":"top","formality":9}]"#;
        tokio::fs::write(&path, json).await.unwrap();

        let result = JsonFileWardrobe::new(&path).load_items().await;

        assert!(matches!(result, Err(AppError::Json(_))));
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = JsonFileWardrobe::new(temp_path()).load_items().await;
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
