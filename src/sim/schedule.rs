//! Cancellable deferred work
//!
//! Staggered spawns and the ground restore are queued here against the
//! simulation clock. Every task has an owner so a theme switch can drop
//! whatever the outgoing theme left pending.

use super::spawn::SpawnDescriptor;

/// Identifies a registered theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThemeId(pub u32);

/// Who queued a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Engine,
    Theme(ThemeId),
}

/// Work to perform when a task comes due
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledAction {
    Spawn(Box<SpawnDescriptor>),
    RestoreGround,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub seq: u64,
    pub owner: TaskOwner,
    pub due_ms: f64,
    pub action: ScheduledAction,
}

#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    tasks: Vec<Task>,
    next_seq: u64,
}

impl Scheduler {
    pub fn schedule(&mut self, owner: TaskOwner, due_ms: f64, action: ScheduledAction) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Task {
            seq,
            owner,
            due_ms,
            action,
        });
        seq
    }

    /// Drop every pending task belonging to `owner`
    pub fn cancel_owner(&mut self, owner: TaskOwner) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != owner);
        let cancelled = before - self.tasks.len();
        if cancelled > 0 {
            log::debug!("Cancelled {} pending tasks for {:?}", cancelled, owner);
        }
        cancelled
    }

    /// Remove and return tasks due at `now_ms`, earliest first (ties in queue order)
    pub fn take_due(&mut self, now_ms: f64) -> Vec<Task> {
        let (mut due, pending): (Vec<Task>, Vec<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|t| t.due_ms <= now_ms);
        self.tasks = pending;
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due
    }

    pub fn pending(&self, owner: TaskOwner) -> usize {
        self.tasks.iter().filter(|t| t.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
