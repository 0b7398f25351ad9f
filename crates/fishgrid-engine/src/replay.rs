//! Deterministic replay of recorded sessions.
//!
//! A session is fully determined by its [`SessionConfig`] (seed included)
//! and the [`InputFrame`] handed to each [`Session::advance`]. A
//! [`ReplayRecorder`] drives a live session and writes down, for every step,
//! the input, the [`SessionEvent`]s that step produced and, every
//! `checkpoint_every` steps, the state hash. [`replay`] rebuilds the session
//! from the recorded config and checks each step against the log: events
//! first, since they pinpoint *what* went differently, then the hash.
//!
//! # Recording and replaying
//!
//! ```
//! use fishgrid_engine::prelude::*;
//!
//! let config = SessionConfig { seed: 9, ..Default::default() };
//! let mut recorder = ReplayRecorder::start(config, 5).unwrap();
//!
//! for i in 0..40usize {
//!     let direction = Direction::ALL[i % 4];
//!     recorder
//!         .advance(InputFrame { actions: vec![PlayerAction::Move(direction)] })
//!         .unwrap();
//! }
//!
//! let (log, session) = recorder.finish();
//! let result = replay(&log).unwrap();
//! assert!(result.is_faithful());
//! assert_eq!(result.steps_replayed, 40);
//! assert_eq!(result.final_hash, session.state_hash());
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::session::{InputFrame, Session, SessionConfig, SessionEvent};
use crate::SessionError;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// Everything needed to play a session again: its config and one frame per
/// step. Serializable to JSON for test fixtures and bug reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// The config the recorded session was created with.
    pub config: SessionConfig,
    /// Steps between recorded state hashes. 0 records none; the final hash
    /// is always kept.
    pub checkpoint_every: u64,
    /// Frame `i` holds what happened on step `i + 1`.
    pub frames: Vec<RecordedFrame>,
    /// State hash after the last recorded step.
    pub final_hash: String,
}

impl ReplayLog {
    /// Number of recorded steps.
    pub fn steps(&self) -> u64 {
        self.frames.len() as u64
    }
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Player actions applied before the step.
    pub input: InputFrame,
    /// What the step reported, in order.
    pub events: Vec<SessionEvent>,
    /// State hash after the step, on checkpoint steps only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// How a replayed step differed from the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Divergence {
    /// The step reported different events.
    Events {
        expected: Vec<SessionEvent>,
        actual: Vec<SessionEvent>,
    },
    /// The events matched but the resulting state did not.
    StateHash { expected: String, actual: String },
}

/// The first step at which a replay stopped matching its log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    /// Step number, counted from 1 like [`Session::steps_taken`].
    pub step: u64,
    pub divergence: Divergence,
}

/// The outcome of [`replay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Steps run, including the diverging one.
    pub steps_replayed: u64,
    pub first_divergence: Option<ReplayDivergence>,
    /// State hash of the replayed session when replay stopped.
    pub final_hash: String,
}

impl ReplayResult {
    /// True when every step matched the log.
    pub fn is_faithful(&self) -> bool {
        self.first_divergence.is_none()
    }
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Plays a session and records it into a [`ReplayLog`] as it goes.
///
/// The recorder owns the session so that nothing can reach it except through
/// [`advance`](Self::advance); a step taken behind its back would make the
/// log unreplayable.
pub struct ReplayRecorder {
    session: Session,
    log: ReplayLog,
}

impl ReplayRecorder {
    /// Build a session from `config` and start recording it.
    ///
    /// # Errors
    ///
    /// Whatever [`Session::with_config`] rejects.
    pub fn start(config: SessionConfig, checkpoint_every: u64) -> Result<Self, SessionError> {
        let session = Session::with_config(config.clone())?;
        Ok(Self {
            session,
            log: ReplayLog {
                config,
                checkpoint_every,
                frames: Vec::new(),
                final_hash: String::new(),
            },
        })
    }

    /// The session being recorded, read-only.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Advance the session by one step and record it.
    ///
    /// A failed step is not recorded; the session is over at that point.
    pub fn advance(&mut self, input: InputFrame) -> Result<Vec<SessionEvent>, SessionError> {
        let events = self.session.advance(&input)?;
        let state_hash = is_checkpoint(self.log.checkpoint_every, self.session.steps_taken())
            .then(|| self.session.state_hash());
        self.log.frames.push(RecordedFrame {
            input,
            events: events.clone(),
            state_hash,
        });
        Ok(events)
    }

    /// Seal the log with the final state hash and hand back the session.
    pub fn finish(mut self) -> (ReplayLog, Session) {
        self.log.final_hash = self.session.state_hash();
        (self.log, self.session)
    }
}

fn is_checkpoint(every: u64, step: u64) -> bool {
    every != 0 && step % every == 0
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Rebuild the session described by `log` and play every frame again.
///
/// Replay stops at the first step whose events or checkpoint hash differ
/// from the log and reports it in [`ReplayResult::first_divergence`]. A
/// mismatching final hash is reported against the last step.
///
/// # Errors
///
/// Returns an error if the recorded config no longer builds a session or if
/// a step fails outright.
pub fn replay(log: &ReplayLog) -> anyhow::Result<ReplayResult> {
    let mut session = Session::with_config(log.config.clone())
        .context("recorded config no longer builds a session")?;

    for (step, frame) in (1u64..).zip(&log.frames) {
        let events = session
            .advance(&frame.input)
            .with_context(|| format!("step {step} failed during replay"))?;

        let divergence = if events != frame.events {
            Some(Divergence::Events {
                expected: frame.events.clone(),
                actual: events,
            })
        } else {
            frame.state_hash.as_ref().and_then(|expected| {
                let actual = session.state_hash();
                (actual != *expected).then(|| Divergence::StateHash {
                    expected: expected.clone(),
                    actual,
                })
            })
        };

        if let Some(divergence) = divergence {
            return Ok(diverged(&session, step, divergence));
        }
    }

    let final_hash = session.state_hash();
    if final_hash != log.final_hash {
        let divergence = Divergence::StateHash {
            expected: log.final_hash.clone(),
            actual: final_hash,
        };
        return Ok(diverged(&session, log.steps(), divergence));
    }

    tracing::debug!(steps = log.steps(), "replay matched");
    Ok(ReplayResult {
        steps_replayed: log.steps(),
        first_divergence: None,
        final_hash,
    })
}

fn diverged(session: &Session, step: u64, divergence: Divergence) -> ReplayResult {
    tracing::warn!(step, ?divergence, "replay diverged");
    ReplayResult {
        steps_replayed: step,
        first_divergence: Some(ReplayDivergence { step, divergence }),
        final_hash: session.state_hash(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_land_on_multiples_of_the_interval() {
        assert!(!is_checkpoint(0, 0));
        assert!(!is_checkpoint(0, 10));
        assert!(is_checkpoint(1, 7));
        assert!(is_checkpoint(5, 10));
        assert!(!is_checkpoint(5, 11));
    }

    #[test]
    fn recorder_logs_every_step() {
        let mut recorder = ReplayRecorder::start(SessionConfig::default(), 2).unwrap();
        for _ in 0..5 {
            recorder.advance(InputFrame::default()).unwrap();
        }
        assert_eq!(recorder.session().steps_taken(), 5);

        let (log, session) = recorder.finish();
        assert_eq!(log.steps(), 5);
        let hashed: Vec<bool> = log.frames.iter().map(|f| f.state_hash.is_some()).collect();
        assert_eq!(hashed, vec![false, true, false, true, false]);
        assert_eq!(log.final_hash, session.state_hash());
    }

    #[test]
    fn invalid_config_refuses_to_record() {
        let config = SessionConfig {
            heart_chance: -0.5,
            ..SessionConfig::default()
        };
        assert!(matches!(
            ReplayRecorder::start(config, 1),
            Err(SessionError::InvalidConfig(_))
        ));
    }
}
