use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde_json::json;
use std::collections::HashMap;
use wiremock::MockServer;

use crate::api::client::NotesClient;
use crate::api::types::{BlockType, ContentType, Page, PageType, RawBlock};
use crate::engine::session::Session;

pub fn raw_block(uuid: &str, content: &str, order: i64, parent: Option<&str>) -> RawBlock {
    RawBlock {
        uuid: uuid.into(),
        content: content.into(),
        block_type: BlockType::Bullet,
        content_type: ContentType::Text,
        order: Some(order),
        parent_uuid: parent.map(str::to_string),
        children: vec![],
        properties: HashMap::new(),
        media_url: None,
    }
}

pub fn nested_raw(uuid: &str, content: &str, order: i64, children: Vec<RawBlock>) -> RawBlock {
    RawBlock {
        children,
        ..raw_block(uuid, content, order, None)
    }
}

pub fn test_page() -> Page {
    Page {
        uuid: "page-1".into(),
        title: "Test page".into(),
        page_type: PageType::Regular,
        date: None,
        slug: Some("test-page".into()),
    }
}

/// Canonical PATCH response body: the server echoing a block back.
pub fn update_response(uuid: &str, content: &str) -> serde_json::Value {
    json!({"uuid": uuid, "content": content, "order": 0})
}

/// Mock server + client + a session holding three root blocks.
pub async fn setup_engine() -> (MockServer, NotesClient, Session) {
    let server = MockServer::start().await;
    let client = NotesClient::new(&server.uri(), "test-token");
    let mut session = Session::new();
    session.page = Some(test_page());
    session.tree.load(vec![
        raw_block("b1", "Block one", 0, None),
        raw_block("b2", "Block two", 1, None),
        raw_block("b3", "Block three", 2, None),
    ]);
    (server, client, session)
}

/// Like [`setup_engine`], but with a parent block holding two children plus
/// a root sibling: p1 { c1, c2 }, b2.
pub async fn setup_engine_with_children() -> (MockServer, NotesClient, Session) {
    let server = MockServer::start().await;
    let client = NotesClient::new(&server.uri(), "test-token");
    let mut session = Session::new();
    session.page = Some(test_page());
    session.tree.load(vec![
        nested_raw(
            "p1",
            "Parent",
            0,
            vec![
                raw_block("c1", "Child 1", 0, None),
                raw_block("c2", "Child 2", 1, None),
            ],
        ),
        raw_block("b2", "Sibling", 1, None),
    ]);
    (server, client, session)
}

pub fn key_event(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}
