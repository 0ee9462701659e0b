use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::api::client::NotesClient;
use crate::engine::session::{CursorPlacement, Session};
use crate::engine::{editor, mutate};
use crate::error::Result;

/// Interpret a key event against the block currently in edit mode. Content
/// keys mutate the buffer (and the tree, optimistically); structural keys
/// dispatch into the mutation engine; boundary arrow keys move focus across
/// blocks in document order. No active editor, no-op.
pub async fn handle_edit_key(
    session: &mut Session,
    client: &NotesClient,
    key: &KeyEvent,
) -> Result<()> {
    let Some(uuid) = editor::active_uuid(session) else {
        return Ok(());
    };

    match (key.modifiers, key.code) {
        (KeyModifiers::NONE, KeyCode::Enter) => {
            // Persists the current block as part of the transition, then
            // creates and focuses an empty sibling right below.
            mutate::create_block_after(session, client, &uuid, "").await?;
        }
        (KeyModifiers::NONE, KeyCode::Tab) => {
            mutate::indent_block(session, client, &uuid).await?;
        }
        (_, KeyCode::BackTab) => {
            mutate::outdent_block(session, client, &uuid).await?;
        }
        (KeyModifiers::NONE, KeyCode::Backspace) => {
            let empty_at_start = session
                .edit
                .as_ref()
                .is_some_and(|e| e.buffer.cursor == 0 && e.buffer.is_empty());
            if empty_at_start {
                handle_backspace_on_empty(session, client, &uuid).await?;
            } else {
                if let Some(edit) = session.edit.as_mut() {
                    edit.buffer.delete_back();
                }
                editor::sync_buffer_to_tree(session);
            }
        }
        (KeyModifiers::NONE, KeyCode::Delete) => {
            if let Some(edit) = session.edit.as_mut() {
                edit.buffer.delete_forward();
            }
            editor::sync_buffer_to_tree(session);
        }
        (KeyModifiers::NONE, KeyCode::Down) => {
            let at_bottom = session
                .edit
                .as_ref()
                .is_some_and(|e| e.buffer.on_last_line() && e.buffer.at_line_end());
            if at_bottom {
                let next = session
                    .tree
                    .next_in_document_order(&uuid)
                    .map(|n| n.uuid.clone());
                if let Some(next) = next {
                    session.navigating = true;
                    editor::start_editing_at(session, client, &next, CursorPlacement::Start)
                        .await?;
                }
            } else if let Some(edit) = session.edit.as_mut() {
                edit.buffer.move_down();
            }
        }
        (KeyModifiers::NONE, KeyCode::Up) => {
            let at_top = session
                .edit
                .as_ref()
                .is_some_and(|e| e.buffer.on_first_line() && e.buffer.at_line_start());
            if at_top {
                let previous = session
                    .tree
                    .previous_in_document_order(&uuid)
                    .map(|n| n.uuid.clone());
                if let Some(previous) = previous {
                    session.navigating = true;
                    editor::start_editing_at(session, client, &previous, CursorPlacement::End)
                        .await?;
                }
            } else if let Some(edit) = session.edit.as_mut() {
                edit.buffer.move_up();
            }
        }
        (KeyModifiers::NONE, KeyCode::Left) => {
            if let Some(edit) = session.edit.as_mut() {
                edit.buffer.move_left();
            }
        }
        (KeyModifiers::NONE, KeyCode::Right) => {
            if let Some(edit) = session.edit.as_mut() {
                edit.buffer.move_right();
            }
        }
        (KeyModifiers::NONE, KeyCode::Home) | (KeyModifiers::CONTROL, KeyCode::Char('a')) => {
            if let Some(edit) = session.edit.as_mut() {
                edit.buffer.move_home();
            }
        }
        (KeyModifiers::NONE, KeyCode::End) | (KeyModifiers::CONTROL, KeyCode::Char('e')) => {
            if let Some(edit) = session.edit.as_mut() {
                edit.buffer.move_end();
            }
        }
        (KeyModifiers::NONE, KeyCode::Esc) => {
            editor::stop_editing(session, client, &uuid).await?;
        }
        (KeyModifiers::NONE, KeyCode::Char(' ')) | (KeyModifiers::SHIFT, KeyCode::Char(' ')) => {
            if double_space_trigger(session) {
                handle_double_space_indent(session, client, &uuid).await?;
            } else {
                if let Some(edit) = session.edit.as_mut() {
                    edit.buffer.insert_char(' ');
                }
                editor::sync_buffer_to_tree(session);
            }
        }
        (KeyModifiers::NONE, KeyCode::Char(ch)) | (KeyModifiers::SHIFT, KeyCode::Char(ch)) => {
            if let Some(edit) = session.edit.as_mut() {
                edit.buffer.insert_char(ch);
            }
            editor::sync_buffer_to_tree(session);
        }
        _ => {}
    }

    Ok(())
}

/// Backspace at cursor 0 on an emptied block: blocks with children are
/// deleted outright (descendants cascade), nested blocks step out one level
/// first, and a root block with nothing under it is deleted.
async fn handle_backspace_on_empty(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
) -> Result<()> {
    let Some((has_children, has_parent)) = session
        .tree
        .get(uuid)
        .map(|n| (!n.children.is_empty(), n.parent.is_some()))
    else {
        return Ok(());
    };

    if has_children || !has_parent {
        mutate::delete_empty_block(session, client, uuid).await?;
    } else {
        mutate::outdent_block(session, client, uuid).await?;
    }
    Ok(())
}

/// A space typed near the content start while the previous character is
/// already a space. Keyboard-less indent path: Tab is not reachable on every
/// on-screen keyboard.
fn double_space_trigger(session: &Session) -> bool {
    session.edit.as_ref().is_some_and(|e| {
        e.buffer.cursor >= 1
            && e.buffer.cursor <= 2
            && e.buffer.chars.get(e.buffer.cursor - 1) == Some(&' ')
    })
}

async fn handle_double_space_indent(
    session: &mut Session,
    client: &NotesClient,
    uuid: &str,
) -> Result<()> {
    // The typed space never lands; the one already in the buffer goes too.
    if let Some(edit) = session.edit.as_mut() {
        edit.buffer.delete_back();
    }
    editor::sync_buffer_to_tree(session);

    if session.tree.previous_sibling(uuid).is_some() {
        // indent_block persists the stripped content as its first step.
        mutate::indent_block(session, client, uuid).await?;
    } else {
        editor::save_content(session, client, uuid).await?;
    }
    Ok(())
}
