use std::collections::HashMap;

/// Whether a channel's subscribe command went out during the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unconfirmed,
    Confirmed,
}

/// A channel the client wants to be subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    name: String,
    cursor: Option<String>,
    state: SubscriptionState,
}

impl Channel {
    /// Create an unconfirmed channel. An empty cursor is treated as absent.
    pub fn new(name: impl Into<String>, cursor: Option<String>) -> Self {
        Self {
            name: name.into(),
            cursor: cursor.filter(|c| !c.is_empty()),
            state: SubscriptionState::Unconfirmed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == SubscriptionState::Confirmed
    }

    /// The last-seen message id to replay from, if this subscribe should
    /// request recovery.
    ///
    /// The cursor is a one-shot hint: it is only offered while the channel
    /// is unconfirmed, and confirming the channel consumes it.
    pub fn recovery_cursor(&self) -> Option<&str> {
        match self.state {
            SubscriptionState::Unconfirmed => self.cursor.as_deref(),
            SubscriptionState::Confirmed => None,
        }
    }

    fn confirm(&mut self) {
        self.state = SubscriptionState::Confirmed;
        self.cursor = None;
    }

    fn reset(&mut self) {
        self.state = SubscriptionState::Unconfirmed;
    }
}

/// Desired subscriptions keyed by channel name.
///
/// Each entry carries its insertion sequence so resubscribe batches come out
/// in a deterministic order.
#[derive(Debug, Default, Clone)]
pub struct ChannelRegistry {
    channels: HashMap<String, Entry>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    channel: Channel,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `name`, replacing any previous entry for it.
    ///
    /// A replaced entry moves to the end of the insertion order and starts
    /// unconfirmed. Returns `true` when an entry was replaced.
    pub fn add(&mut self, name: &str, cursor: Option<String>) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.channels
            .insert(
                name.to_string(),
                Entry {
                    seq,
                    channel: Channel::new(name, cursor),
                },
            )
            .is_some()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.channels.remove(name).is_some()
    }

    pub fn has(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name).map(|e| &e.channel)
    }

    /// Unconfirmed entries in insertion order.
    pub fn all_unconfirmed(&self) -> Vec<Channel> {
        self.ordered()
            .into_iter()
            .filter(|c| !c.is_confirmed())
            .cloned()
            .collect()
    }

    /// Mark `name` confirmed. Absent names and repeated confirmations are ignored.
    pub fn mark_confirmed(&mut self, name: &str) {
        if let Some(entry) = self.channels.get_mut(name) {
            entry.channel.confirm();
        }
    }

    /// Start a new epoch: the broker forgot every subscription.
    pub fn reset_confirmations(&mut self) {
        for entry in self.channels.values_mut() {
            entry.channel.reset();
        }
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.ordered().into_iter()
    }

    fn ordered(&self) -> Vec<&Channel> {
        let mut entries: Vec<&Entry> = self.channels.values().collect();
        entries.sort_unstable_by_key(|e| e.seq);
        entries.into_iter().map(|e| &e.channel).collect()
    }
}
