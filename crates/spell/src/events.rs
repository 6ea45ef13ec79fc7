//! Notifications for presentation collaborators.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::word::{FileId, Word};

/// Something observers of the spell-check core may want to react to.
///
/// Events concerning one file are delivered in the order the store changed.
/// No ordering is promised across files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpellEvent {
	/// The mistakes of `file` were replaced; `count` is the new total.
	MistakesUpdated { file: FileId, count: usize },
	/// Whether the word under the cursor is a mistake, and which one.
	CursorMistakeChanged { is_mistake: bool, word: Option<Word> },
	/// The focused file changed.
	CurrentFileChanged { file: Option<FileId> },
	/// A different project became active (or none). All analysis was reset.
	ProjectChanged { project: Option<String> },
	/// Files joined or left the active project.
	ProjectFilesChanged { added: BTreeSet<FileId>, removed: BTreeSet<FileId> },
}

/// Receiver for [`SpellEvent`]s.
pub type SpellEventReceiver = mpsc::UnboundedReceiver<SpellEvent>;

/// Fan-out of events to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventHub {
	subscribers: Mutex<Vec<mpsc::UnboundedSender<SpellEvent>>>,
}

impl EventHub {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self) -> SpellEventReceiver {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.lock().push(tx);
		rx
	}

	/// Delivers `event` to every live subscriber, pruning closed ones.
	pub fn emit(&self, event: SpellEvent) {
		let mut subscribers = self.subscribers.lock();
		tracing::trace!(?event, subscribers = subscribers.len(), "spell.event");
		subscribers.retain(|tx| tx.send(event.clone()).is_ok());
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.lock().len()
	}
}
