use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};

use crate::api::client::NotesClient;
use crate::api::types::{BlockType, NewBlockPayload, Page, PageLocator, PageType};
use crate::config::AppConfig;
use crate::edit_buffer::EditBuffer;
use crate::engine::tree::{BlockNode, BlockTree};
use crate::error::{Error, ErrorNotice, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlacement {
    Start,
    End,
}

/// Where the UI should put input focus next, produced by the editing
/// coordinator and consumed once via [`Session::take_focus_request`].
#[derive(Debug, Clone, PartialEq)]
pub struct FocusRequest {
    pub uuid: String,
    pub cursor: CursorPlacement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    pub uuid: String,
    pub buffer: EditBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DeletionMark {
    InFlight,
    Settled(Instant),
}

/// Engine state for one loaded page: the tree, the active edit, and the
/// flags that guard the blur/deletion and blur/navigation races. All
/// mutation happens on the UI thread; consistency comes from awaiting
/// persistence calls in sequence, not from locks.
pub struct Session {
    pub page: Option<Page>,
    pub tree: BlockTree,
    pub edit: Option<EditState>,
    pub navigating: bool,
    /// Uuid awaiting the user's explicit delete confirmation.
    pub pending_confirm: Option<String>,
    pub confirm_delete: bool,
    pending_deletion: HashMap<String, DeletionMark>,
    deletion_grace: Duration,
    focus: Option<FocusRequest>,
    notice: Option<ErrorNotice>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            page: None,
            tree: BlockTree::new(),
            edit: None,
            navigating: false,
            pending_confirm: None,
            confirm_delete: true,
            pending_deletion: HashMap::new(),
            deletion_grace: Duration::from_millis(300),
            focus: None,
            notice: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut session = Self::new();
        session.confirm_delete = config.editor.confirm_delete;
        session.deletion_grace = Duration::from_millis(config.editor.deletion_grace_ms);
        session
    }

    #[cfg(test)]
    pub fn with_deletion_grace(mut self, grace: Duration) -> Self {
        self.deletion_grace = grace;
        self
    }

    /// Fetch a page and normalize its blocks into the tree. Daily pages that
    /// arrive untitled get a human-readable date title; a page with no
    /// blocks at all gets one empty root block created through the API so
    /// editing and navigation always have a target.
    pub async fn load_page(&mut self, client: &NotesClient, locator: &PageLocator) -> Result<()> {
        let resp = client
            .fetch_page(locator)
            .await
            .map_err(|e| self.note_error(e))?;

        let mut page = resp.page;
        if page.title.is_empty() {
            if let (PageType::Daily, Some(date)) = (page.page_type, page.date) {
                page.title = format_daily_title(date);
            }
        }

        self.tree.load(resp.blocks);
        self.edit = None;
        self.navigating = false;
        self.pending_confirm = None;

        if self.tree.is_empty() {
            let created = client
                .create_block(&NewBlockPayload {
                    page_uuid: page.uuid.clone(),
                    uuid: Some(uuid::Uuid::new_v4().to_string()),
                    content: String::new(),
                    parent_uuid: None,
                    block_type: BlockType::Bullet,
                    order: 0,
                })
                .await
                .map_err(|e| self.note_error(e))?;
            let order = created.order.unwrap_or(0);
            self.tree.insert_node(BlockNode {
                uuid: created.uuid,
                content: created.content,
                block_type: created.block_type,
                content_type: created.content_type,
                order,
                parent: None,
                children: Vec::new(),
                is_editing: false,
                properties: created.properties,
                media_url: created.media_url,
            });
        }

        self.page = Some(page);
        Ok(())
    }

    // --- Focus requests ---

    pub fn request_focus(&mut self, uuid: &str, cursor: CursorPlacement) {
        self.focus = Some(FocusRequest {
            uuid: uuid.to_string(),
            cursor,
        });
    }

    /// Consuming the focus request ends the programmatic transition; the
    /// next blur is a genuine one again.
    pub fn take_focus_request(&mut self) -> Option<FocusRequest> {
        self.navigating = false;
        self.focus.take()
    }

    // --- User-facing notices ---

    pub fn note_error(&mut self, e: Error) -> Error {
        tracing::warn!(error = %e, "operation failed");
        self.notice = Some(ErrorNotice::from_error(&e));
        e
    }

    pub fn take_notice(&mut self) -> Option<ErrorNotice> {
        self.notice.take()
    }

    // --- Pending-deletion markers ---
    //
    // Marked before the delete request goes out; the marker outlives the
    // request by a short grace period so a blur event that fires just after
    // deletion completes still finds it.

    pub fn mark_deletion_inflight(&mut self, uuid: &str) {
        self.pending_deletion
            .insert(uuid.to_string(), DeletionMark::InFlight);
    }

    pub fn settle_deletion(&mut self, uuid: &str) {
        self.pending_deletion
            .insert(uuid.to_string(), DeletionMark::Settled(Instant::now()));
    }

    pub fn is_pending_deletion(&mut self, uuid: &str) -> bool {
        self.sweep_deletion_markers();
        self.pending_deletion.contains_key(uuid)
    }

    fn sweep_deletion_markers(&mut self) {
        let grace = self.deletion_grace;
        self.pending_deletion.retain(|_, mark| match mark {
            DeletionMark::InFlight => true,
            DeletionMark::Settled(at) => at.elapsed() < grace,
        });
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn format_daily_title(date: NaiveDate) -> String {
    let month = match date.month() {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "",
    };
    let day = date.day();
    let suffix = match day {
        1 | 21 | 31 => "st",
        2 | 22 => "nd",
        3 | 23 => "rd",
        _ => "th",
    };
    format!("{} {}{}, {}", month, day, suffix, date.year())
}
