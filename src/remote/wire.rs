use crate::model::{Quote, QuoteContent, QuoteId};
use serde::Deserialize;

/// Quote card record as returned by the images endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QuoteRecord {
    pub id: QuoteId,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, rename = "image64encoded")]
    pub image: Option<String>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
}

impl From<QuoteRecord> for Quote {
    fn from(record: QuoteRecord) -> Self {
        Quote::new(
            record.id,
            QuoteContent {
                message: record.message,
                author: record.author,
                image: record.image.filter(|s| !s.is_empty()),
            },
            record.likes,
            record.dislikes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Engagement;

    #[test]
    fn test_record_defaults_missing_fields() {
        let records: Vec<QuoteRecord> =
            serde_json::from_str(r#"[{"id": 12, "message": "Breathe."}]"#).unwrap();
        let quote = Quote::from(records[0].clone());
        assert_eq!(quote.id, 12);
        assert_eq!(quote.content.message.as_deref(), Some("Breathe."));
        assert_eq!(quote.like_count, 0);
        assert_eq!(quote.dislike_count, 0);
        assert_eq!(quote.engagement, Engagement::None);
    }

    #[test]
    fn test_empty_image_dropped() {
        let record: QuoteRecord = serde_json::from_str(
            r#"{"id": 1, "author": "Basho", "image64encoded": "", "likes": 4, "dislikes": 2}"#,
        )
        .unwrap();
        let quote = Quote::from(record);
        assert!(quote.content.image.is_none());
        assert_eq!(quote.like_count, 4);
        assert_eq!(quote.dislike_count, 2);
    }
}
