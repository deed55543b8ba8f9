use crate::error::{ChatError, Result};
use crate::types::{Role, Turn, WireMessage};

/// Ordered, append-only record of a conversation
///
/// Insertion order is conversation order. A system turn, if present, is
/// always at index 0 and there is at most one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transcript from existing turns, enforcing system-turn placement
    pub fn from_turns(turns: Vec<Turn>) -> Result<Self> {
        let mut transcript = Self::new();
        transcript.replace_all(turns)?;
        Ok(transcript)
    }

    /// Add a turn at the end of the conversation
    ///
    /// A system turn always lands in the system slot at index 0, replacing
    /// any previous system prompt.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        let turn = Turn::new(role, content);
        if turn.is_system() {
            self.put_system(turn);
        } else {
            self.turns.push(turn);
        }
    }

    /// Owned copy of every turn, in order
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Atomically replace the whole sequence
    ///
    /// Rejected with `InvalidTranscriptState` if a system turn appears
    /// anywhere but index 0; the current turns are left untouched.
    pub fn replace_all(&mut self, turns: Vec<Turn>) -> Result<()> {
        validate_system_placement(&turns)?;
        self.turns = turns;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Ordered `{role, content}` pairs for the request body
    pub fn to_wire_format(&self) -> Vec<WireMessage> {
        self.turns.iter().map(Turn::to_wire).collect()
    }

    /// Restore from plain wire data (e.g. a history file)
    pub fn from_wire_format(messages: Vec<WireMessage>) -> Result<Self> {
        Self::from_turns(messages.into_iter().map(Turn::from).collect())
    }

    /// Seed or replace the system prompt at index 0
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.put_system(Turn::system(prompt));
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.turns
            .first()
            .filter(|turn| turn.is_system())
            .map(Turn::content)
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn past `len`. Used to undo an uncommitted exchange.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    fn put_system(&mut self, turn: Turn) {
        match self.turns.first() {
            Some(first) if first.is_system() => self.turns[0] = turn,
            _ => self.turns.insert(0, turn),
        }
    }
}

fn validate_system_placement(turns: &[Turn]) -> Result<()> {
    if let Some(index) = turns.iter().skip(1).position(Turn::is_system) {
        return Err(ChatError::InvalidTranscriptState(format!(
            "system turn at index {}, only index 0 is allowed",
            index + 1
        )));
    }
    Ok(())
}
