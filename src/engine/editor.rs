use crate::api::client::NotesClient;
use crate::api::types::BlockPatch;
use crate::edit_buffer::EditBuffer;
use crate::engine::session::{CursorPlacement, EditState, Session};
use crate::error::Result;

/// Begin editing a block, cursor at end of content.
pub async fn start_editing(session: &mut Session, client: &NotesClient, uuid: &str) -> Result<()> {
    start_editing_at(session, client, uuid, CursorPlacement::End).await
}

/// Begin editing a block. Enforces the single-editor invariant: every other
/// block still flagged as editing is persisted (no reload) and cleared
/// before the target's flag is set.
pub async fn start_editing_at(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
    cursor: CursorPlacement,
) -> Result<()> {
    if session.tree.get(uuid).is_none() {
        return Ok(());
    }

    let others: Vec<String> = session
        .tree
        .flatten()
        .filter(|n| n.is_editing && n.uuid != uuid)
        .map(|n| n.uuid.clone())
        .collect();
    for other in others {
        save_content(session, client, &other).await?;
        if let Some(node) = session.tree.get_mut(&other) {
            node.is_editing = false;
        }
        if session.edit.as_ref().is_some_and(|e| e.uuid == other) {
            session.edit = None;
        }
    }

    if let Some(node) = session.tree.get_mut(uuid) {
        node.is_editing = true;
        let buffer = match cursor {
            CursorPlacement::Start => EditBuffer::new_at_start(&node.content),
            CursorPlacement::End => EditBuffer::new(&node.content),
        };
        session.edit = Some(EditState {
            uuid: uuid.to_string(),
            buffer,
        });
    }
    session.request_focus(uuid, cursor);
    Ok(())
}

/// Blur entry point. Skipped without a save when the block is pending
/// deletion (a save would race the in-flight delete); left entirely alone
/// while the navigating flag is set, because that blur came from the
/// navigation engine redirecting focus, not from the user leaving the field.
pub async fn stop_editing(session: &mut Session, client: &NotesClient, uuid: &str) -> Result<()> {
    if session.is_pending_deletion(uuid) {
        if let Some(node) = session.tree.get_mut(uuid) {
            node.is_editing = false;
        }
        if session.edit.as_ref().is_some_and(|e| e.uuid == uuid) {
            session.edit = None;
        }
        return Ok(());
    }
    if session.navigating {
        return Ok(());
    }
    if session.tree.get(uuid).is_none() {
        return Ok(());
    }

    save_content(session, client, uuid).await?;
    if let Some(node) = session.tree.get_mut(uuid) {
        node.is_editing = false;
    }
    if session.edit.as_ref().is_some_and(|e| e.uuid == uuid) {
        session.edit = None;
    }
    Ok(())
}

pub fn active_uuid(session: &Session) -> Option<String> {
    session.edit.as_ref().map(|e| e.uuid.clone())
}

/// Copy the live edit buffer into its tree node. Content keystrokes go
/// through here: local state first, the network only at blur or transition.
pub fn sync_buffer_to_tree(session: &mut Session) {
    let Some(edit) = &session.edit else {
        return;
    };
    let uuid = edit.uuid.clone();
    let text = edit.buffer.to_string();
    if let Some(node) = session.tree.get_mut(&uuid) {
        node.content = text;
    }
}

/// One `update_block` carrying the block's current content. The server may
/// rewrite content and recompute the block type (todo-marker detection);
/// whatever comes back is adopted in place, no reload.
pub(crate) async fn save_content(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
) -> Result<()> {
    let Some(content) = session.tree.get(uuid).map(|n| n.content.clone()) else {
        return Ok(());
    };
    tracing::debug!(%uuid, "saving block content");
    let updated = client
        .update_block(uuid, &BlockPatch::content(&content))
        .await
        .map_err(|e| session.note_error(e))?;

    if let Some(node) = session.tree.get_mut(uuid) {
        node.block_type = updated.block_type;
        node.content = updated.content.clone();
    }
    if let Some(edit) = session.edit.as_mut() {
        if edit.uuid == uuid && edit.buffer.to_string() != updated.content {
            edit.buffer = EditBuffer::new(&updated.content);
        }
    }
    Ok(())
}

/// Save-and-close used by Enter-style transitions that move focus to a
/// different block: persists content, clears the flag, and raises the
/// navigating flag so the trailing UI blur is not treated as a second save.
pub(crate) async fn finish_editing_for_transition(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
) -> Result<()> {
    save_content(session, client, uuid).await?;
    if let Some(node) = session.tree.get_mut(uuid) {
        node.is_editing = false;
    }
    if session.edit.as_ref().is_some_and(|e| e.uuid == uuid) {
        session.edit = None;
    }
    session.navigating = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::BlockType;
    use crate::engine::test_helpers::{setup_engine, update_response};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn editing_count(session: &Session) -> usize {
        session.tree.flatten().filter(|n| n.is_editing).count()
    }

    #[tokio::test]
    async fn start_editing_sets_flag_and_buffer() {
        let (_server, client, mut session) = setup_engine().await;

        start_editing(&mut session, &client, "b1").await.unwrap();

        assert!(session.tree.get("b1").unwrap().is_editing);
        let edit = session.edit.as_ref().unwrap();
        assert_eq!(edit.uuid, "b1");
        assert_eq!(edit.buffer.to_string(), "Block one");
        assert_eq!(edit.buffer.cursor, 9); // cursor at end

        let focus = session.take_focus_request().unwrap();
        assert_eq!(focus.uuid, "b1");
    }

    #[tokio::test]
    async fn start_editing_unknown_uuid_is_noop() {
        let (_server, client, mut session) = setup_engine().await;
        start_editing(&mut session, &client, "nope").await.unwrap();
        assert!(session.edit.is_none());
        assert_eq!(editing_count(&session), 0);
    }

    #[tokio::test]
    async fn single_editor_invariant_held_across_transitions() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(update_response("b1", "Block one")),
            )
            .expect(1)
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        assert_eq!(editing_count(&session), 1);

        // Switching editors saves b1 once and clears its flag.
        start_editing(&mut session, &client, "b2").await.unwrap();
        assert_eq!(editing_count(&session), 1);
        assert!(!session.tree.get("b1").unwrap().is_editing);
        assert!(session.tree.get("b2").unwrap().is_editing);
        assert_eq!(active_uuid(&session).as_deref(), Some("b2"));

        server.verify().await;
    }

    #[tokio::test]
    async fn keystrokes_mutate_local_state_without_requests() {
        let (_server, client, mut session) = setup_engine().await;
        // No PATCH mock mounted: any network save here would fail the test.
        start_editing(&mut session, &client, "b1").await.unwrap();

        let edit = session.edit.as_mut().unwrap();
        edit.buffer.insert_char('!');
        sync_buffer_to_tree(&mut session);

        assert_eq!(session.tree.get("b1").unwrap().content, "Block one!");
    }

    #[tokio::test]
    async fn stop_editing_saves_and_clears_flag() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .and(body_json(json!({"content": "Block one!"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(update_response("b1", "Block one!")),
            )
            .expect(1)
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        session.edit.as_mut().unwrap().buffer.insert_char('!');
        sync_buffer_to_tree(&mut session);

        stop_editing(&mut session, &client, "b1").await.unwrap();

        assert_eq!(editing_count(&session), 0);
        assert!(session.edit.is_none());
        assert_eq!(session.tree.get("b1").unwrap().content, "Block one!");
        server.verify().await;
    }

    #[tokio::test]
    async fn stop_editing_adopts_server_rewritten_type() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uuid": "b1", "content": "buy milk", "block_type": "todo", "order": 0
            })))
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        stop_editing(&mut session, &client, "b1").await.unwrap();

        let node = session.tree.get("b1").unwrap();
        assert_eq!(node.block_type, BlockType::Todo);
        assert_eq!(node.content, "buy milk");
    }

    #[tokio::test]
    async fn stop_editing_skipped_for_pending_deletion() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(update_response("b1", "")))
            .expect(0)
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        session.mark_deletion_inflight("b1");

        stop_editing(&mut session, &client, "b1").await.unwrap();

        // Flag cleared, nothing saved.
        assert_eq!(editing_count(&session), 0);
        assert!(session.edit.is_none());
        server.verify().await;
    }

    #[tokio::test]
    async fn stop_editing_left_alone_while_navigating() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(update_response("b1", "")))
            .expect(0)
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        session.navigating = true;

        stop_editing(&mut session, &client, "b1").await.unwrap();

        // Programmatic blur: editing state untouched, no save issued.
        assert!(session.tree.get("b1").unwrap().is_editing);
        assert!(session.edit.is_some());
        server.verify().await;
    }

    #[tokio::test]
    async fn save_failure_sets_notice_and_keeps_local_content() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        session.edit.as_mut().unwrap().buffer.insert_char('!');
        sync_buffer_to_tree(&mut session);

        let result = stop_editing(&mut session, &client, "b1").await;

        assert!(result.is_err());
        assert!(session.take_notice().is_some());
        // No rollback: the optimistic edit stays until a reload re-syncs.
        assert_eq!(session.tree.get("b1").unwrap().content, "Block one!");
    }

    #[tokio::test]
    async fn finish_editing_for_transition_raises_navigating() {
        let (server, client, mut session) = setup_engine().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/b1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(update_response("b1", "Block one")),
            )
            .expect(1)
            .mount(&server)
            .await;

        start_editing(&mut session, &client, "b1").await.unwrap();
        finish_editing_for_transition(&mut session, &client, "b1")
            .await
            .unwrap();

        assert!(session.navigating);
        assert_eq!(editing_count(&session), 0);
        assert!(session.edit.is_none());
        server.verify().await;
    }
}
