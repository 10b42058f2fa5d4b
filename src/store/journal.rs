//! Undo journal for changes applied directly to the store.

use oxigraph::model::Quad;

/// A change that has been applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Inserted(Quad),
    Removed(Quad),
}

impl Change {
    /// The change that reverts this one.
    pub fn inverse(&self) -> Change {
        match self {
            Change::Inserted(quad) => Change::Removed(quad.clone()),
            Change::Removed(quad) => Change::Inserted(quad.clone()),
        }
    }
}

/// Changes of one store transaction in application order.
#[derive(Debug, Default)]
pub struct ChangeJournal {
    changes: Vec<Change>,
}

impl ChangeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Pass the inverse of each change, newest first, to `undo`. A change
    /// leaves the journal only once `undo` succeeded for it, so after an
    /// error the journal holds exactly what is still to be undone.
    pub fn unwind<E>(&mut self, mut undo: impl FnMut(&Change) -> Result<(), E>) -> Result<usize, E> {
        let mut undone = 0;
        while let Some(change) = self.changes.last() {
            undo(&change.inverse())?;
            self.changes.pop();
            undone += 1;
        }
        Ok(undone)
    }
}
