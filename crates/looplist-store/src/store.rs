//! The loop store: owns loops, check-ins and reactions.
//!
//! Every mutation takes the state lock, works on a copy of the snapshot,
//! writes the whole copy through the `KvStore`, and only then swaps it in.
//! A failed operation leaves both memory and storage as they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use looplist_core::snapshot::{CHECK_INS_KEY, LOOPS_KEY, REACTIONS_KEY};
use looplist_core::{
    streak, CheckIn, Config, Id, IdentityProvider, Loop, LoopPatch, LoopStatus, NewLoop,
    Notification, NotificationEvent, Reaction, ReactionKind, Snapshot, StreakPolicy, Visibility,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::notify::Notifier;
use crate::seed;
use crate::storage::{KvStore, StorageError};

/// Title given to loops created without one.
pub const UNTITLED_LOOP: &str = "Untitled Loop";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("you must be logged in to {0}")]
    Unauthenticated(&'static str),
    #[error("loop not found: {0}")]
    NotFound(Id),
    #[error("user {user} does not own loop {loop_id}")]
    PermissionDenied { user: Id, loop_id: Id },
    #[error("invalid loop: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Tunables for a store instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Maximum number of loops returned by `get_trending_loops`.
    pub trending_limit: usize,
    pub streak_policy: StreakPolicy,
    /// Install the demo loops when storage holds no loops yet.
    pub seed_demo_data: bool,
    pub seed_completion_rate: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for StoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            trending_limit: config.trending_limit,
            streak_policy: config.streak_policy,
            seed_demo_data: config.seed_demo_data,
            seed_completion_rate: config.seed_completion_rate,
        }
    }
}

/// Result of toggling a cheer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheerOutcome {
    /// Whether the caller is cheering the loop after the toggle.
    pub cheered: bool,
    /// The loop's cheer count after the toggle.
    pub cheers: u32,
}

pub struct LoopStore<K> {
    kv: K,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    settings: StoreSettings,
    state: Mutex<Snapshot>,
}

impl<K: std::fmt::Debug> std::fmt::Debug for LoopStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopStore")
            .field("kv", &self.kv)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<K: KvStore> LoopStore<K> {
    /// Load the last snapshot from `kv`.
    ///
    /// When no loops were ever stored and seeding is enabled, the demo loops
    /// are installed (with generated check-ins unless check-ins were stored)
    /// and written back immediately.
    pub async fn open(
        kv: K,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        settings: StoreSettings,
    ) -> Result<Self> {
        let loops = kv.get(LOOPS_KEY).await?;
        let check_ins = kv.get(CHECK_INS_KEY).await?;
        let reactions = kv.get(REACTIONS_KEY).await?;

        let needs_seed = loops.is_none() && settings.seed_demo_data;
        let needs_check_ins = check_ins.is_none();
        let mut snapshot =
            Snapshot::decode(loops.as_deref(), check_ins.as_deref(), reactions.as_deref())
                .map_err(StorageError::from)?;

        if needs_seed {
            snapshot.loops = seed::demo_loops();
            if needs_check_ins {
                snapshot.check_ins = seed::demo_check_ins(
                    &snapshot.loops,
                    Utc::now().date_naive(),
                    settings.seed_completion_rate,
                    &mut rand::thread_rng(),
                );
            }
            info!(
                "seeded demo data: {} loops, {} check-ins",
                snapshot.loops.len(),
                snapshot.check_ins.len()
            );
        }

        let store = Self {
            kv,
            identity,
            notifier,
            settings,
            state: Mutex::new(Snapshot::default()),
        };
        if needs_seed {
            store.persist(&snapshot).await?;
        }
        debug!(
            "loaded snapshot: {} loops, {} check-ins, {} reactions",
            snapshot.loops.len(),
            snapshot.check_ins.len(),
            snapshot.reactions.len()
        );
        *store.state.lock().await = snapshot;
        Ok(store)
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Copy of the full current state.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.clone()
    }

    // --- Loop CRUD ---

    /// Create a loop owned by the current user.
    pub async fn create_loop(&self, fields: NewLoop) -> Result<Loop> {
        let result = self.create_loop_inner(fields).await;
        self.report(NotificationEvent::LoopCreated, None, result, |created| {
            Notification::loop_created(&created.id)
        })
    }

    async fn create_loop_inner(&self, fields: NewLoop) -> Result<Loop> {
        let owner = self.require_user("create a loop")?;
        if let Some(ref days) = fields.custom_days {
            validate_custom_days(days)?;
        }
        let created = build_loop(owner, fields, Utc::now());

        let created = self
            .mutate(|snapshot| {
                snapshot.loops.push(created.clone());
                Ok(created)
            })
            .await?;
        info!("created loop {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Merge `patch` into the loop. No ownership check is made here.
    pub async fn update_loop(&self, loop_id: &Id, patch: LoopPatch) -> Result<Loop> {
        let result = self.update_loop_inner(loop_id, patch).await;
        self.report(NotificationEvent::LoopUpdated, Some(loop_id), result, |updated| {
            Notification::loop_updated(&updated.id)
        })
    }

    async fn update_loop_inner(&self, loop_id: &Id, patch: LoopPatch) -> Result<Loop> {
        if let Some(ref title) = patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::Validation("title must not be empty".to_string()));
            }
        }
        if let Some(ref days) = patch.custom_days {
            validate_custom_days(days)?;
        }

        let updated = self
            .mutate(|snapshot| {
                let target = find_loop_mut(&mut snapshot.loops, loop_id)?;
                patch.apply(target);
                Ok(target.clone())
            })
            .await?;
        info!("updated loop {}", loop_id);
        Ok(updated)
    }

    /// Delete a loop the current user owns, with its check-ins and reactions.
    pub async fn delete_loop(&self, loop_id: &Id) -> Result<()> {
        let result = self.delete_loop_inner(loop_id).await;
        self.report(NotificationEvent::LoopDeleted, Some(loop_id), result, |_| {
            Notification::loop_deleted(loop_id)
        })
    }

    async fn delete_loop_inner(&self, loop_id: &Id) -> Result<()> {
        let caller = self.require_user("delete a loop")?;
        let (check_ins, reactions) = self
            .mutate(|snapshot| {
                let target = find_loop_mut(&mut snapshot.loops, loop_id)?;
                ensure_owner(target, &caller)?;

                snapshot.loops.retain(|l| &l.id != loop_id);
                let before = (snapshot.check_ins.len(), snapshot.reactions.len());
                snapshot.check_ins.retain(|ci| &ci.loop_id != loop_id);
                snapshot.reactions.retain(|r| &r.loop_id != loop_id);
                Ok((
                    before.0 - snapshot.check_ins.len(),
                    before.1 - snapshot.reactions.len(),
                ))
            })
            .await?;
        info!(
            "deleted loop {} ({} check-ins, {} reactions)",
            loop_id, check_ins, reactions
        );
        Ok(())
    }

    // --- Queries ---

    /// Any loop by id. Visibility is not enforced here.
    pub async fn get_loop_by_id(&self, loop_id: &Id) -> Option<Loop> {
        let state = self.state.lock().await;
        state.loops.iter().find(|l| &l.id == loop_id).cloned()
    }

    pub async fn get_user_loops(&self, user_id: &Id) -> Vec<Loop> {
        let state = self.state.lock().await;
        state
            .loops
            .iter()
            .filter(|l| l.is_owned_by(user_id))
            .cloned()
            .collect()
    }

    /// Loops owned by the current user; empty when nobody is signed in.
    pub async fn current_user_loops(&self) -> Vec<Loop> {
        match self.identity.current_user_id() {
            Some(user_id) => self.get_user_loops(&user_id).await,
            None => Vec::new(),
        }
    }

    /// Public loops ranked by cheers + clones, highest first.
    pub async fn get_trending_loops(&self) -> Vec<Loop> {
        let state = self.state.lock().await;
        ranked_public(&state.loops)
            .into_iter()
            .take(self.settings.trending_limit)
            .cloned()
            .collect()
    }

    /// The top-ranked public loop. Not rotated by date.
    pub async fn get_loop_of_the_day(&self) -> Option<Loop> {
        let state = self.state.lock().await;
        ranked_public(&state.loops).first().map(|l| (*l).clone())
    }

    pub async fn get_check_ins_for_loop(&self, loop_id: &Id) -> Vec<CheckIn> {
        let state = self.state.lock().await;
        state
            .check_ins
            .iter()
            .filter(|ci| &ci.loop_id == loop_id)
            .cloned()
            .collect()
    }

    /// Whether the current user is cheering the loop.
    pub async fn has_user_cheered_loop(&self, loop_id: &Id) -> bool {
        let Some(user_id) = self.identity.current_user_id() else {
            return false;
        };
        let state = self.state.lock().await;
        state
            .reactions
            .iter()
            .any(|r| &r.loop_id == loop_id && r.user_id == user_id)
    }

    // --- Check-ins ---

    /// Record whether the current user did the loop on `at`'s calendar day,
    /// then recompute the loop's streaks, completion rate and status.
    ///
    /// A second check-in for the same day overwrites the first.
    pub async fn check_in_loop(&self, loop_id: &Id, at: DateTime<Utc>, completed: bool) -> Result<Loop> {
        let result = self.check_in_inner(loop_id, at, completed).await;
        self.report(NotificationEvent::CheckInRecorded, Some(loop_id), result, |_| {
            Notification::check_in_recorded(loop_id, completed)
        })
    }

    async fn check_in_inner(&self, loop_id: &Id, at: DateTime<Utc>, completed: bool) -> Result<Loop> {
        let caller = self.require_user("check in")?;
        let day = streak::normalize_day(at);
        let policy = self.settings.streak_policy;

        let updated = self
            .mutate(|snapshot| {
                let index = snapshot
                    .loops
                    .iter()
                    .position(|l| &l.id == loop_id)
                    .ok_or_else(|| StoreError::NotFound(loop_id.clone()))?;
                ensure_owner(&snapshot.loops[index], &caller)?;

                upsert_check_in(&mut snapshot.check_ins, loop_id, &caller, day, completed);

                let stats = streak::recompute(
                    &snapshot.loops[index],
                    &snapshot.check_ins,
                    &caller,
                    completed,
                    policy,
                );
                stats.apply(&mut snapshot.loops[index]);
                Ok(snapshot.loops[index].clone())
            })
            .await?;

        info!(
            "check-in on {} for {}: completed={} streak={} longest={}",
            loop_id, day, completed, updated.current_streak, updated.longest_streak
        );
        Ok(updated)
    }

    // --- Social ---

    /// Toggle the current user's cheer on a loop.
    pub async fn cheer_loop(&self, loop_id: &Id) -> Result<CheerOutcome> {
        let attempted = if self.has_user_cheered_loop(loop_id).await {
            NotificationEvent::CheerRemoved
        } else {
            NotificationEvent::CheerAdded
        };
        let result = self.cheer_inner(loop_id).await;
        self.report(attempted, Some(loop_id), result, |outcome| {
            Notification::cheer_toggled(loop_id, outcome.cheered)
        })
    }

    async fn cheer_inner(&self, loop_id: &Id) -> Result<CheerOutcome> {
        let caller = self.require_user("cheer")?;
        let outcome = self
            .mutate(|snapshot| {
                let target = snapshot
                    .loops
                    .iter_mut()
                    .find(|l| &l.id == loop_id)
                    .ok_or_else(|| StoreError::NotFound(loop_id.clone()))?;

                let existing = snapshot
                    .reactions
                    .iter()
                    .position(|r| &r.loop_id == loop_id && r.user_id == caller);

                let cheered = if let Some(pos) = existing {
                    snapshot.reactions.remove(pos);
                    target.cheers = target.cheers.saturating_sub(1);
                    false
                } else {
                    snapshot.reactions.push(Reaction {
                        id: Id::new(),
                        loop_id: loop_id.clone(),
                        user_id: caller.clone(),
                        kind: ReactionKind::Cheer,
                        created_at: Utc::now(),
                    });
                    target.cheers = target.cheers.saturating_add(1);
                    true
                };
                Ok(CheerOutcome {
                    cheered,
                    cheers: target.cheers,
                })
            })
            .await?;
        info!(
            "{} {} loop {} (cheers={})",
            caller,
            if outcome.cheered { "cheered" } else { "uncheered" },
            loop_id,
            outcome.cheers
        );
        Ok(outcome)
    }

    /// Copy a loop into the current user's private loops, with fresh progress.
    pub async fn clone_loop(&self, loop_id: &Id) -> Result<Loop> {
        let result = self.clone_inner(loop_id).await;
        self.report(NotificationEvent::LoopCloned, Some(loop_id), result, |cloned| {
            Notification::loop_cloned(&cloned.id)
        })
    }

    async fn clone_inner(&self, loop_id: &Id) -> Result<Loop> {
        let caller = self.require_user("clone a loop")?;
        let cloned = self
            .mutate(|snapshot| {
                let source = find_loop_mut(&mut snapshot.loops, loop_id)?;
                source.clones = source.clones.saturating_add(1);

                let now = Utc::now();
                let cloned = Loop {
                    id: Id::new(),
                    title: format!("{} (cloned)", source.title),
                    emoji: source.emoji.clone(),
                    cover_image: source.cover_image.clone(),
                    frequency: source.frequency,
                    custom_days: source.custom_days.clone(),
                    category: source.category.clone(),
                    start_date: now,
                    visibility: Visibility::Private,
                    user_id: caller.clone(),
                    created_at: now,
                    current_streak: 0,
                    longest_streak: 0,
                    completion_rate: 0.0,
                    status: LoopStatus::Active,
                    cheers: 0,
                    clones: 0,
                };
                snapshot.loops.push(cloned.clone());
                Ok(cloned)
            })
            .await?;
        info!("cloned loop {} into {} for {}", loop_id, cloned.id, caller);
        Ok(cloned)
    }

    // --- Internals ---

    fn require_user(&self, action: &'static str) -> Result<Id> {
        self.identity
            .current_user_id()
            .ok_or(StoreError::Unauthenticated(action))
    }

    /// Apply `change` to a copy of the state, persist it, then commit it.
    async fn mutate<T>(&self, change: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let value = change(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(value)
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let entries = snapshot.encode().map_err(StorageError::from)?;
        self.kv.put_all(&entries).await?;
        debug!(
            "persisted snapshot: {} loops, {} check-ins, {} reactions",
            snapshot.loops.len(),
            snapshot.check_ins.len(),
            snapshot.reactions.len()
        );
        Ok(())
    }

    /// Emit the notification for an operation's outcome and pass it through.
    fn report<T>(
        &self,
        event: NotificationEvent,
        loop_id: Option<&Id>,
        result: Result<T>,
        success: impl FnOnce(&T) -> Notification,
    ) -> Result<T> {
        match &result {
            Ok(value) => self.notifier.notify(&success(value)),
            Err(e) => {
                warn!("{} failed: {}", event.as_str(), e);
                self.notifier
                    .notify(&Notification::error(event, loop_id.cloned(), e.to_string()));
            }
        }
        result
    }
}

fn build_loop(owner: Id, fields: NewLoop, now: DateTime<Utc>) -> Loop {
    let title = fields
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED_LOOP.to_string());

    Loop {
        id: Id::new(),
        title,
        emoji: fields.emoji,
        cover_image: fields.cover_image,
        frequency: fields.frequency.unwrap_or_default(),
        custom_days: fields.custom_days,
        category: fields.category,
        start_date: fields.start_date.unwrap_or(now),
        visibility: fields.visibility.unwrap_or_default(),
        user_id: owner,
        created_at: now,
        current_streak: 0,
        longest_streak: 0,
        completion_rate: 0.0,
        status: LoopStatus::Active,
        cheers: 0,
        clones: 0,
    }
}

/// Weekday indices run from 0 (Sunday) to 6 (Saturday).
fn validate_custom_days(days: &[u8]) -> Result<()> {
    match days.iter().find(|d| **d > 6) {
        Some(day) => Err(StoreError::Validation(format!(
            "custom day {day} is out of range 0-6"
        ))),
        None => Ok(()),
    }
}

fn find_loop_mut<'a>(loops: &'a mut [Loop], loop_id: &Id) -> Result<&'a mut Loop> {
    loops
        .iter_mut()
        .find(|l| &l.id == loop_id)
        .ok_or_else(|| StoreError::NotFound(loop_id.clone()))
}

fn ensure_owner(target: &Loop, caller: &Id) -> Result<()> {
    if target.is_owned_by(caller) {
        Ok(())
    } else {
        Err(StoreError::PermissionDenied {
            user: caller.clone(),
            loop_id: target.id.clone(),
        })
    }
}

/// Overwrite the (loop, user, day) check-in if present, otherwise add one.
fn upsert_check_in(
    check_ins: &mut Vec<CheckIn>,
    loop_id: &Id,
    user_id: &Id,
    day: chrono::NaiveDate,
    completed: bool,
) {
    if let Some(existing) = check_ins
        .iter_mut()
        .find(|ci| ci.matches(loop_id, user_id, day))
    {
        existing.completed = completed;
        return;
    }
    check_ins.push(CheckIn {
        id: CheckIn::id_for(loop_id, day),
        loop_id: loop_id.clone(),
        user_id: user_id.clone(),
        date: day,
        completed,
    });
}

/// Public loops by descending popularity; ties keep collection order.
fn ranked_public(loops: &[Loop]) -> Vec<&Loop> {
    let mut ranked: Vec<&Loop> = loops.iter().filter(|l| l.is_public()).collect();
    ranked.sort_by_key(|l| std::cmp::Reverse(l.popularity()));
    ranked
}
