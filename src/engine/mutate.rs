use crate::api::client::NotesClient;
use crate::api::types::{BlockPatch, BlockType, NewBlockPayload, RawBlock};
use crate::edit_buffer::EditBuffer;
use crate::engine::editor;
use crate::engine::session::{CursorPlacement, Session};
use crate::engine::tree::BlockNode;
use crate::error::Result;

// Every structural operation follows one shape: persist in-progress content
// (no reload), compute the new position, ask the server, then detach/attach
// locally on success and put focus back where it belongs. On failure the
// server is the source of truth and a page reload is the recovery path.

/// Create an empty sibling right after `uuid` and move editing focus into
/// it. Following siblings are shifted +1 first, one awaited request at a
/// time. Returns the new block's uuid, or `None` when there is no loaded
/// page or no such block.
pub async fn create_block_after(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
    content: &str,
) -> Result<Option<String>> {
    let Some(page_uuid) = session.page.as_ref().map(|p| p.uuid.clone()) else {
        return Ok(None);
    };
    let Some((parent, order, was_editing)) = session
        .tree
        .get(uuid)
        .map(|n| (n.parent.clone(), n.order, n.is_editing))
    else {
        return Ok(None);
    };

    if was_editing {
        editor::finish_editing_for_transition(session, client, uuid).await?;
    }

    let new_order = order + 1;
    shift_following_siblings(session, client, parent.clone(), new_order).await?;

    let created = client
        .create_block(&NewBlockPayload {
            page_uuid,
            uuid: Some(uuid::Uuid::new_v4().to_string()),
            content: content.to_string(),
            parent_uuid: parent.clone(),
            block_type: BlockType::Bullet,
            order: new_order,
        })
        .await
        .map_err(|e| session.note_error(e))?;

    let node = node_from_raw(created, parent, new_order);
    let new_uuid = node.uuid.clone();
    session.tree.insert_node(node);
    editor::start_editing(session, client, &new_uuid).await?;
    Ok(Some(new_uuid))
}

/// Reparent a block under its previous sibling. No previous sibling, no op.
pub async fn indent_block(session: &mut Session, client: &NotesClient, uuid: &str) -> Result<()> {
    if session.page.is_none() {
        return Ok(());
    }
    let Some(is_editing) = session.tree.get(uuid).map(|n| n.is_editing) else {
        return Ok(());
    };
    let Some(new_parent) = session.tree.previous_sibling(uuid).map(|n| n.uuid.clone()) else {
        return Ok(());
    };

    if is_editing {
        editor::save_content(session, client, uuid).await?;
    }

    let new_order = session.tree.next_order(Some(&new_parent));
    client
        .update_block(uuid, &BlockPatch::position(Some(new_parent.clone()), new_order))
        .await
        .map_err(|e| session.note_error(e))?;

    session.tree.detach(uuid);
    session.tree.attach(uuid, Some(new_parent), new_order);
    session.request_focus(uuid, CursorPlacement::End);
    Ok(())
}

/// Move a block up to its grandparent, right after its old parent. No-op on
/// root-level blocks.
pub async fn outdent_block(session: &mut Session, client: &NotesClient, uuid: &str) -> Result<()> {
    if session.page.is_none() {
        return Ok(());
    }
    let Some((old_parent, is_editing)) = session
        .tree
        .get(uuid)
        .and_then(|n| n.parent.clone().map(|p| (p, n.is_editing)))
    else {
        return Ok(());
    };
    let Some((grandparent, parent_order)) = session
        .tree
        .get(&old_parent)
        .map(|p| (p.parent.clone(), p.order))
    else {
        return Ok(());
    };

    if is_editing {
        editor::save_content(session, client, uuid).await?;
    }

    let new_order = parent_order + 1;
    shift_following_siblings(session, client, grandparent.clone(), new_order).await?;

    client
        .update_block(uuid, &BlockPatch::position(grandparent.clone(), new_order))
        .await
        .map_err(|e| session.note_error(e))?;

    session.tree.detach(uuid);
    session.tree.attach(uuid, grandparent, new_order);
    session.request_focus(uuid, CursorPlacement::End);
    Ok(())
}

// --- Deletion ---
//
// UI-initiated deletes go through an explicit request/confirm handshake; no
// request leaves before the user confirms. Empty-block deletion (the
// Backspace flow) skips the handshake, there is no content to lose.

/// Stage a block for deletion pending user confirmation. Returns whether a
/// confirmation is now pending.
pub fn request_delete_block(session: &mut Session, uuid: &str) -> bool {
    if !session.tree.contains(uuid) {
        return false;
    }
    session.pending_confirm = Some(uuid.to_string());
    true
}

pub fn cancel_pending_delete(session: &mut Session) {
    session.pending_confirm = None;
}

pub async fn confirm_pending_delete(session: &mut Session, client: &NotesClient) -> Result<()> {
    let Some(uuid) = session.pending_confirm.take() else {
        return Ok(());
    };
    delete_block_inner(session, client, &uuid, false).await
}

/// Delete an emptied block and move editing focus to its predecessor in
/// document order, cursor at end-of-content, or nowhere if it was first.
pub async fn delete_empty_block(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
) -> Result<()> {
    delete_block_inner(session, client, uuid, true).await
}

async fn delete_block_inner(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
    focus_previous: bool,
) -> Result<()> {
    if !session.tree.contains(uuid) {
        return Ok(());
    }
    let previous = session
        .tree
        .previous_in_document_order(uuid)
        .map(|n| n.uuid.clone());

    // Marked before the request so a blur arriving mid-flight cannot race a
    // save against the delete; settled markers linger for the grace window.
    session.mark_deletion_inflight(uuid);
    tracing::debug!(%uuid, "deleting block");
    let result = client.delete_block(uuid).await;
    session.settle_deletion(uuid);
    if let Err(e) = result {
        return Err(session.note_error(e));
    }

    session.tree.remove_subtree(uuid);
    if session.edit.as_ref().is_some_and(|e| e.uuid == uuid) {
        session.edit = None;
    }
    if focus_previous {
        if let Some(prev) = previous {
            editor::start_editing_at(session, client, &prev, CursorPlacement::End).await?;
        }
    }
    Ok(())
}

/// Cycle bullet → todo → done. The cycle itself (and any content rewriting,
/// e.g. stripping a done marker) lives server-side; whatever type and
/// content come back are applied verbatim.
pub async fn toggle_block_todo(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
) -> Result<()> {
    if !session.tree.contains(uuid) {
        return Ok(());
    }
    let resp = client
        .toggle_block_todo(uuid)
        .await
        .map_err(|e| session.note_error(e))?;

    if let Some(node) = session.tree.get_mut(uuid) {
        node.block_type = resp.block_type;
        node.content = resp.content.clone();
    }
    if let Some(edit) = session.edit.as_mut() {
        if edit.uuid == uuid {
            edit.buffer = EditBuffer::new(&resp.content);
        }
    }
    Ok(())
}

/// Bump every sibling at or past `from_order` by +1, strictly one awaited
/// request at a time; two in-flight shifts could collide at the backend.
/// Fail-fast: an error stops the sequence, later shifts are never issued.
async fn shift_following_siblings(
    session: &mut Session,
    client: &NotesClient,
    parent: Option<String>,
    from_order: i64,
) -> Result<()> {
    let to_shift: Vec<(String, i64)> = session
        .tree
        .siblings_of(parent.as_deref())
        .iter()
        .filter_map(|u| session.tree.get(u))
        .filter(|n| n.order >= from_order)
        .map(|n| (n.uuid.clone(), n.order))
        .collect();

    for (sibling, order) in to_shift {
        client
            .update_block(&sibling, &BlockPatch::order(order + 1))
            .await
            .map_err(|e| session.note_error(e))?;
        if let Some(node) = session.tree.get_mut(&sibling) {
            node.order = order + 1;
        }
    }
    Ok(())
}

fn node_from_raw(raw: RawBlock, fallback_parent: Option<String>, fallback_order: i64) -> BlockNode {
    BlockNode {
        uuid: raw.uuid,
        content: raw.content,
        block_type: raw.block_type,
        content_type: raw.content_type,
        order: raw.order.unwrap_or(fallback_order),
        parent: raw.parent_uuid.or(fallback_parent),
        children: Vec::new(),
        is_editing: false,
        properties: raw.properties,
        media_url: raw.media_url,
    }
}
