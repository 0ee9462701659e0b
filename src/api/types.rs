use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    #[default]
    Bullet,
    Todo,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Daily,
    Regular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub uuid: String,
    #[serde(default)]
    pub title: String,
    pub page_type: PageType,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Block as it crosses the wire. The server may send the page's blocks flat
/// (with `parent_uuid` set) or pre-nested (with `children` populated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub uuid: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub parent_uuid: Option<String>,
    #[serde(default)]
    pub children: Vec<RawBlock>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageLocator {
    Id(String),
    Date(NaiveDate),
    Slug(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchPageResponse {
    pub page: Page,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

#[derive(Debug, Serialize)]
pub struct NewBlockPayload {
    pub page_uuid: String,
    /// Client-generated v4 uuid; the server echoes it back (or substitutes
    /// its own, which the caller must adopt).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<String>,
    pub block_type: BlockType,
    pub order: i64,
}

/// Partial update. Absent fields are left untouched by the server;
/// `parent_uuid` uses a double Option so `Some(None)` serializes as an
/// explicit `null` (reparent to the page root).
#[derive(Debug, Default, Serialize)]
pub struct BlockPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
}

impl BlockPatch {
    pub fn content(text: &str) -> Self {
        Self {
            content: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn position(parent_uuid: Option<String>, order: i64) -> Self {
        Self {
            parent_uuid: Some(parent_uuid),
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToggleTodoResponse {
    pub block_type: BlockType,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_block_deserializes_with_defaults() {
        let raw: RawBlock = serde_json::from_str(r#"{"uuid": "b1"}"#).unwrap();
        assert_eq!(raw.content, "");
        assert_eq!(raw.block_type, BlockType::Bullet);
        assert_eq!(raw.content_type, ContentType::Text);
        assert!(raw.order.is_none());
        assert!(raw.parent_uuid.is_none());
        assert!(raw.children.is_empty());
        assert!(raw.properties.is_empty());
    }

    #[test]
    fn raw_block_serde_roundtrip_nested() {
        let block = RawBlock {
            uuid: "b1".into(),
            content: "Parent".into(),
            block_type: BlockType::Todo,
            content_type: ContentType::Text,
            order: Some(0),
            parent_uuid: None,
            children: vec![RawBlock {
                uuid: "c1".into(),
                content: "Child".into(),
                block_type: BlockType::Bullet,
                content_type: ContentType::Text,
                order: Some(0),
                parent_uuid: Some("b1".into()),
                children: vec![],
                properties: HashMap::new(),
                media_url: None,
            }],
            properties: HashMap::new(),
            media_url: None,
        };
        let json = serde_json::to_string(&block).unwrap();
        let back: RawBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(block, back);
        assert_eq!(back.children.len(), 1);
    }

    #[test]
    fn block_type_uses_snake_case() {
        assert_eq!(serde_json::to_value(BlockType::Todo).unwrap(), json!("todo"));
        assert_eq!(serde_json::to_value(BlockType::Done).unwrap(), json!("done"));
        let t: BlockType = serde_json::from_value(json!("bullet")).unwrap();
        assert_eq!(t, BlockType::Bullet);
    }

    #[test]
    fn page_daily_deserializes() {
        let page: Page = serde_json::from_value(json!({
            "uuid": "p1",
            "title": "March 3rd, 2026",
            "page_type": "daily",
            "date": "2026-03-03"
        }))
        .unwrap();
        assert_eq!(page.page_type, PageType::Daily);
        assert_eq!(page.date, NaiveDate::from_ymd_opt(2026, 3, 3));
        assert!(page.slug.is_none());
    }

    #[test]
    fn page_regular_deserializes() {
        let page: Page = serde_json::from_value(json!({
            "uuid": "p2",
            "title": "Reading list",
            "page_type": "regular",
            "slug": "reading-list"
        }))
        .unwrap();
        assert_eq!(page.page_type, PageType::Regular);
        assert_eq!(page.slug.as_deref(), Some("reading-list"));
        assert!(page.date.is_none());
    }

    #[test]
    fn fetch_page_response_blocks_default_empty() {
        let resp: FetchPageResponse = serde_json::from_value(json!({
            "page": {"uuid": "p1", "title": "", "page_type": "regular", "slug": "x"}
        }))
        .unwrap();
        assert!(resp.blocks.is_empty());
    }

    #[test]
    fn new_block_payload_serializes() {
        let payload = NewBlockPayload {
            page_uuid: "p1".into(),
            uuid: Some("client-uuid".into()),
            content: "".into(),
            parent_uuid: Some("b1".into()),
            block_type: BlockType::Bullet,
            order: 2,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["page_uuid"], "p1");
        assert_eq!(json["uuid"], "client-uuid");
        assert_eq!(json["parent_uuid"], "b1");
        assert_eq!(json["block_type"], "bullet");
        assert_eq!(json["order"], 2);
    }

    #[test]
    fn new_block_payload_omits_absent_fields() {
        let payload = NewBlockPayload {
            page_uuid: "p1".into(),
            uuid: None,
            content: "x".into(),
            parent_uuid: None,
            block_type: BlockType::Bullet,
            order: 0,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("parent_uuid").is_none());
        assert!(json.get("uuid").is_none());
    }

    #[test]
    fn block_patch_skips_absent_fields() {
        let patch = BlockPatch::content("hello");
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["content"], "hello");
        assert!(json.get("order").is_none());
        assert!(json.get("parent_uuid").is_none());
        assert!(json.get("block_type").is_none());
    }

    #[test]
    fn block_patch_reparent_to_root_serializes_null() {
        let patch = BlockPatch::position(None, 1);
        let json = serde_json::to_value(&patch).unwrap();
        assert!(json["parent_uuid"].is_null());
        assert_eq!(json["order"], 1);
    }

    #[test]
    fn block_patch_reparent_to_block_serializes_uuid() {
        let patch = BlockPatch::position(Some("b1".into()), 0);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["parent_uuid"], "b1");
    }

    #[test]
    fn toggle_todo_response_deserializes() {
        let resp: ToggleTodoResponse = serde_json::from_value(json!({
            "block_type": "done",
            "content": "ship the release"
        }))
        .unwrap();
        assert_eq!(resp.block_type, BlockType::Done);
        assert_eq!(resp.content, "ship the release");
    }
}
