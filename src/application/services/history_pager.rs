//! Page merging and scroll anchoring for paged lists.

use std::collections::HashSet;
use std::hash::Hash;

use tracing::trace;

use crate::domain::entities::{ConversationId, ConversationSummary, Message, MessageId, Page};

/// Items with a stable identity across pages.
pub trait Keyed {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
}

impl Keyed for Message {
    type Key = MessageId;

    fn key(&self) -> MessageId {
        self.id()
    }
}

impl Keyed for ConversationSummary {
    type Key = ConversationId;

    fn key(&self) -> ConversationId {
        self.conversation_id
    }
}

/// Where further pages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Further pages are older and go on top; the newest item is last
    /// (message history).
    Older,
    /// Further pages go below; the newest item is first (conversation list).
    Newer,
}

/// Result of merging a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The list now holds exactly the page.
    Replaced,
    /// `added` unseen items were inserted, `updated` known items came back
    /// with different contents.
    Merged { added: usize, updated: usize },
}

/// Items from one or more loaded pages.
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    items: Vec<T>,
    loaded_page: u32,
    has_more: bool,
}

impl<T> Default for PagedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loaded_page: 0,
            has_more: false,
        }
    }
}

impl<T: Keyed + Clone + PartialEq> PagedList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a fetched page.
    ///
    /// Page 1 always replaces the list wholesale, discarding pages merged
    /// earlier. Later pages are inserted according to `direction`, skipping
    /// items already present.
    pub fn apply(&mut self, page: Page<T>, direction: Direction) -> MergeOutcome {
        let number = page.number();
        self.has_more = page.has_next();

        if number <= 1 {
            self.items = page.items;
            self.loaded_page = 1;
            return MergeOutcome::Replaced;
        }

        let seen: HashSet<_> = self.items.iter().map(Keyed::key).collect();
        let fresh: Vec<T> = page
            .items
            .into_iter()
            .filter(|item| !seen.contains(&item.key()))
            .collect();
        let added = fresh.len();

        match direction {
            Direction::Older => {
                self.items.splice(0..0, fresh);
            }
            Direction::Newer => self.items.extend(fresh),
        }
        self.loaded_page = self.loaded_page.max(number);
        trace!(page = number, added, total = self.items.len(), "Merged page");

        MergeOutcome::Merged { added, updated: 0 }
    }

    /// Merges a freshly polled page 1 without discarding older pages.
    ///
    /// With only page 1 loaded this is [`apply`](Self::apply). Otherwise, for
    /// `Older` lists known items are replaced in place and unseen ones are
    /// appended. `Newer` lists take page 1 on top in server order, and items
    /// it moved are removed from further down.
    pub fn reconcile_latest(&mut self, page: Page<T>, direction: Direction) -> MergeOutcome {
        if self.loaded_page <= 1 {
            return self.apply(page, direction);
        }

        match direction {
            Direction::Older => {
                let mut updated = 0;
                let mut fresh = Vec::new();
                for item in page.items {
                    let key = item.key();
                    if let Some(existing) = self.items.iter_mut().find(|i| i.key() == key) {
                        if *existing != item {
                            *existing = item;
                            updated += 1;
                        }
                    } else {
                        fresh.push(item);
                    }
                }
                let added = fresh.len();
                self.items.extend(fresh);
                MergeOutcome::Merged { added, updated }
            }
            Direction::Newer => {
                let latest: HashSet<_> = page.items.iter().map(Keyed::key).collect();
                let mut known = 0;
                let mut updated = 0;
                for item in &self.items {
                    if latest.contains(&item.key()) {
                        known += 1;
                        if !page.items.contains(item) {
                            updated += 1;
                        }
                    }
                }
                self.items.retain(|item| !latest.contains(&item.key()));
                let added = page.items.len().saturating_sub(known);
                self.items.splice(0..0, page.items);
                MergeOutcome::Merged { added, updated }
            }
        }
    }

    /// Appends `item` at the newest end of an `Older` list unless an item
    /// with the same key is already present.
    pub fn push_if_absent(&mut self, item: T) -> bool {
        let key = item.key();
        if self.items.iter().any(|i| i.key() == key) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Page to request next, if the server reported more.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        self.has_more.then_some(self.loaded_page + 1)
    }
}

impl<T> PagedList<T> {
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn loaded_page(&self) -> u32 {
        self.loaded_page
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.loaded_page = 0;
        self.has_more = false;
    }
}

/// Scroll position of a rendered list, in rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    /// Rows scrolled past the top.
    pub offset: u32,
    /// Height of the whole rendered content.
    pub content_height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(offset: u32, content_height: u32) -> Self {
        Self {
            offset,
            content_height,
        }
    }

    #[must_use]
    pub const fn near_top(&self, threshold: u32) -> bool {
        self.offset <= threshold
    }

    #[must_use]
    pub const fn near_bottom(&self, threshold: u32, viewport_height: u32) -> bool {
        self.content_height
            .saturating_sub(self.offset.saturating_add(viewport_height))
            <= threshold
    }

    /// Keeps the same rows in view after older items were prepended.
    pub fn anchor_after_prepend(&mut self, new_content_height: u32) {
        let grown = new_content_height.saturating_sub(self.content_height);
        self.offset = self.offset.saturating_add(grown);
        self.content_height = new_content_height;
    }
}
