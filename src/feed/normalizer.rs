//! Page normalizer
//!
//! Turns a raw search response into the next cursor and the list of raw
//! entries to extract. The response shape depends on the crawl mode and on
//! whether the page is the first one, giving six variants in two families:
//!
//! - **Entry-list family** (first pages): the container is the `entries` list
//!   of the last instruction and the cursor is the `content.value` of its
//!   last element.
//! - **Instruction-list family** (continuation pages): the container is the
//!   instruction list itself and the cursor sits inside the trailing
//!   `TimelineReplaceEntry` instruction.
//!
//! [`ShapeRule::for_page`] is the lookup table from `(mode, state)` to a rule.

use crate::feed::types::{Instruction, RawEntry, INSTRUCTIONS_POINTER};
use crate::record::CrawlCursor;
use crate::state::{CrawlMode, PageState};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Container size of a page that holds only its two cursor elements
pub const TRAILING_BOOKKEEPING_ENTRIES: usize = 2;

/// Where the container and the cursor live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFamily {
    /// Container is the last instruction's `entries`; cursor is its last element's value
    EntryList,

    /// Container is the instruction list; cursor is in the last instruction's `entry`
    InstructionList,
}

/// Where the entry list lives within the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLocation {
    /// `items` of the first container element (media grid module)
    FirstEntryModuleItems,

    /// Every container element except the two trailing cursors
    EntriesBeforeCursors,

    /// `moduleItems` of the first instruction
    FirstInstructionModuleItems,

    /// `entries` of the first instruction
    FirstInstructionEntries,
}

/// Extraction rule for one response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeRule {
    pub family: ShapeFamily,
    pub list: ListLocation,
}

impl ShapeRule {
    /// Looks up the rule for a page
    pub const fn for_page(mode: CrawlMode, state: PageState) -> Self {
        use ListLocation::*;
        use ShapeFamily::*;

        let (family, list) = match (mode, state) {
            (CrawlMode::MediaTop, PageState::Initial) => (EntryList, FirstEntryModuleItems),
            (CrawlMode::MediaTop, PageState::Continuation) => {
                (InstructionList, FirstInstructionModuleItems)
            }
            (CrawlMode::MediaLatest, PageState::Initial) => (EntryList, EntriesBeforeCursors),
            (CrawlMode::MediaLatest, PageState::Continuation) => {
                (InstructionList, FirstInstructionEntries)
            }
            (CrawlMode::TextOnly, PageState::Initial) => (EntryList, EntriesBeforeCursors),
            (CrawlMode::TextOnly, PageState::Continuation) => {
                (InstructionList, FirstInstructionEntries)
            }
        };

        Self { family, list }
    }
}

/// Why a page ended the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The container held only its trailing bookkeeping elements
    NoResults,

    /// The entry list key expected for this mode and state is absent
    MissingList,

    /// The response does not have the timeline structure at all
    UnrecognizedShape,
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResults => write!(f, "no results"),
            Self::MissingList => write!(f, "entry list missing"),
            Self::UnrecognizedShape => write!(f, "unrecognized page shape"),
        }
    }
}

/// A normalized page
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPage {
    /// Cursor for the next request; `None` ends the crawl after this page
    pub next_cursor: CrawlCursor,

    pub entries: Vec<RawEntry>,

    /// Set when the page carries nothing to extract
    pub terminal: Option<TerminalReason>,
}

impl NormalizedPage {
    fn terminal(reason: TerminalReason) -> Self {
        Self {
            next_cursor: None,
            entries: Vec::new(),
            terminal: Some(reason),
        }
    }

    /// Returns true if the crawl must stop without extracting this page
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }
}

/// Normalizes one search response
///
/// # Arguments
///
/// * `response` - The decoded response body
/// * `mode` - The crawl mode of the run
/// * `state` - Whether this response answers the first request
///
/// # Returns
///
/// The next cursor and the raw entries, or a terminal page. This never fails:
/// shapes it cannot read end the crawl instead.
pub fn normalize_page(response: &Value, mode: CrawlMode, state: PageState) -> NormalizedPage {
    let instructions = match response
        .pointer(INSTRUCTIONS_POINTER)
        .map(Vec::<Instruction>::deserialize)
    {
        Some(Ok(instructions)) => instructions,
        Some(Err(e)) => {
            tracing::warn!("Timeline instructions do not match the expected shape: {}", e);
            return NormalizedPage::terminal(TerminalReason::UnrecognizedShape);
        }
        None => {
            tracing::warn!("Response has no timeline instructions ({} {} page)", mode, state);
            return NormalizedPage::terminal(TerminalReason::UnrecognizedShape);
        }
    };

    let rule = ShapeRule::for_page(mode, state);
    let page = match rule.family {
        ShapeFamily::EntryList => normalize_entry_list(instructions, rule.list),
        ShapeFamily::InstructionList => normalize_instruction_list(instructions, rule.list),
    };

    if let Some(reason) = page.terminal {
        tracing::debug!("Terminal {} page for {}: {}", state, mode, reason);
    }

    page
}

fn normalize_entry_list(instructions: Vec<Instruction>, list: ListLocation) -> NormalizedPage {
    let Some(mut entries) = instructions.into_iter().last().and_then(|i| i.entries) else {
        return NormalizedPage::terminal(TerminalReason::MissingList);
    };

    if entries.len() == TRAILING_BOOKKEEPING_ENTRIES {
        return NormalizedPage::terminal(TerminalReason::NoResults);
    }

    let next_cursor = entries.last().and_then(|entry| entry.content.value.clone());

    let raw_entries: Vec<RawEntry> = match list {
        ListLocation::FirstEntryModuleItems => {
            let items = entries
                .first_mut()
                .and_then(|module| module.content.items.take());
            match items {
                Some(items) => items.into_iter().map(RawEntry::from).collect(),
                None => return NormalizedPage::terminal(TerminalReason::MissingList),
            }
        }
        ListLocation::EntriesBeforeCursors => {
            let keep = entries.len().saturating_sub(TRAILING_BOOKKEEPING_ENTRIES);
            entries.truncate(keep);
            entries.into_iter().map(RawEntry::from).collect()
        }
        ListLocation::FirstInstructionModuleItems | ListLocation::FirstInstructionEntries => {
            return NormalizedPage::terminal(TerminalReason::UnrecognizedShape);
        }
    };

    NormalizedPage {
        next_cursor,
        entries: raw_entries,
        terminal: None,
    }
}

fn normalize_instruction_list(
    mut instructions: Vec<Instruction>,
    list: ListLocation,
) -> NormalizedPage {
    if instructions.len() == TRAILING_BOOKKEEPING_ENTRIES {
        return NormalizedPage::terminal(TerminalReason::NoResults);
    }

    let next_cursor = instructions
        .last()
        .and_then(|i| i.entry.as_ref())
        .and_then(|entry| entry.content.value.clone());

    let first = instructions.first_mut();
    let raw_entries: Vec<RawEntry> = match list {
        ListLocation::FirstInstructionModuleItems => {
            match first.and_then(|i| i.module_items.take()) {
                Some(items) => items.into_iter().map(RawEntry::from).collect(),
                None => return NormalizedPage::terminal(TerminalReason::MissingList),
            }
        }
        ListLocation::FirstInstructionEntries => match first.and_then(|i| i.entries.take()) {
            Some(entries) => entries.into_iter().map(RawEntry::from).collect(),
            None => return NormalizedPage::terminal(TerminalReason::MissingList),
        },
        ListLocation::FirstEntryModuleItems | ListLocation::EntriesBeforeCursors => {
            return NormalizedPage::terminal(TerminalReason::UnrecognizedShape);
        }
    };

    NormalizedPage {
        next_cursor,
        entries: raw_entries,
        terminal: None,
    }
}
