//! Progress indicator for one query operation.
//!
//! Percentages only grow and stop at 99; finishing hides the indicator
//! instead of showing 100.
//!
//! The indicator belongs to the newest query that showed it. Every presenter
//! call goes through [`IndicatorOwner`], so a reporter whose query was
//! superseded can no longer move, hide or announce anything.

use crate::query::QueryEpoch;
use bridge_traits::{ListingTarget, Presenter};
use core_runtime::events::{BrowseEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

pub const PROGRESS_HEADING: &str = "Spotify";
pub const PROGRESS_CEILING: u8 = 99;

#[derive(Debug, Default)]
struct IndicatorState {
    epoch: QueryEpoch,
    shown: bool,
}

/// Which query currently owns the progress indicator.
///
/// The presenter must not start queries from inside its progress calls.
#[derive(Debug, Clone, Default)]
pub struct IndicatorOwner {
    state: Arc<Mutex<IndicatorState>>,
}

impl IndicatorOwner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the indicator to query `epoch` before it is shown. Reporters of
    /// older queries go quiet from here on.
    pub fn claim(&self, epoch: QueryEpoch) {
        let mut state = self.state.lock();
        if epoch > state.epoch {
            state.epoch = epoch;
        }
    }

    /// Hide the indicator for whichever query shows it.
    pub fn withdraw(&self, presenter: &dyn Presenter) {
        let mut state = self.state.lock();
        if state.shown {
            state.shown = false;
            presenter.hide_progress();
        }
    }

    /// Epoch of the query that showed the indicator last, if still shown.
    pub fn current(&self) -> Option<QueryEpoch> {
        let state = self.state.lock();
        state.shown.then_some(state.epoch)
    }
}

pub struct ProgressReporter {
    presenter: Arc<dyn Presenter>,
    events: EventBus,
    owner: IndicatorOwner,
    epoch: QueryEpoch,
    target: ListingTarget,
    percent: u8,
}

impl ProgressReporter {
    /// Show the indicator with `message` on behalf of query `epoch`.
    ///
    /// An older epoch than the current owner's shows nothing.
    pub fn start(
        presenter: Arc<dyn Presenter>,
        events: EventBus,
        owner: IndicatorOwner,
        epoch: QueryEpoch,
        target: ListingTarget,
        message: &str,
    ) -> Self {
        {
            let mut state = owner.state.lock();
            if epoch >= state.epoch {
                state.epoch = epoch;
                state.shown = true;
                presenter.show_progress(PROGRESS_HEADING, message);
                events.publish(CoreEvent::Browse(BrowseEvent::Started {
                    target: target.clone(),
                }));
            } else {
                debug!(epoch, owner = state.epoch, "Indicator owned by a newer query");
            }
        }
        Self::resume(presenter, events, owner, epoch, target)
    }

    /// Attach to an indicator shown by [`ProgressReporter::start`].
    pub fn resume(
        presenter: Arc<dyn Presenter>,
        events: EventBus,
        owner: IndicatorOwner,
        epoch: QueryEpoch,
        target: ListingTarget,
    ) -> Self {
        Self {
            presenter,
            events,
            owner,
            epoch,
            target,
            percent: 0,
        }
    }

    pub fn set(&mut self, percent: u8) {
        let percent = percent.min(PROGRESS_CEILING);
        if percent <= self.percent {
            return;
        }
        let state = self.owner.state.lock();
        if !self.owns(&state) {
            return;
        }
        self.percent = percent;
        self.presenter.set_progress(percent);
        self.events.publish(CoreEvent::Browse(BrowseEvent::Progress {
            target: self.target.clone(),
            percent,
        }));
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn target(&self) -> &ListingTarget {
        &self.target
    }

    /// Results are published: notify the listing and hide the indicator.
    pub fn finish(self) {
        self.close(BrowseEvent::ResultSetUpdated {
            target: self.target.clone(),
        });
    }

    /// No result set: hide the indicator.
    pub fn fail(self, message: impl Into<String>) {
        self.close(BrowseEvent::Failed {
            target: self.target.clone(),
            message: message.into(),
        });
    }

    fn close(&self, event: BrowseEvent) {
        let mut state = self.owner.state.lock();
        if !self.owns(&state) {
            debug!(epoch = self.epoch, "Superseded query leaves the indicator alone");
            return;
        }
        state.shown = false;
        self.events.publish(CoreEvent::Browse(event));
        self.presenter.hide_progress();
    }

    fn owns(&self, state: &IndicatorState) -> bool {
        state.shown && state.epoch == self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_session::testing::{ProgressCall, RecordingPresenter};

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let presenter = Arc::new(RecordingPresenter::new());
        let mut progress = ProgressReporter::start(
            presenter.clone(),
            EventBus::new(8),
            IndicatorOwner::new(),
            1,
            ListingTarget::SearchMenu,
            "Searching for foo",
        );

        progress.set(50);
        progress.set(40);
        progress.set(120);
        progress.set(99);
        progress.finish();

        assert_eq!(presenter.progress_values(), vec![50, 99]);
        assert_eq!(presenter.progress().last(), Some(&ProgressCall::Hide));
    }

    #[test]
    fn test_finish_publishes_update_for_target() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let target = ListingTarget::Album("spotify:album:x".to_string());

        ProgressReporter::start(
            Arc::new(RecordingPresenter::new()),
            events,
            IndicatorOwner::new(),
            1,
            target.clone(),
            "Browsing tracks from X",
        )
        .finish();

        assert_eq!(
            rx.try_recv().unwrap(),
            CoreEvent::Browse(BrowseEvent::Started {
                target: target.clone()
            })
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            CoreEvent::Browse(BrowseEvent::ResultSetUpdated { target })
        );
    }

    #[test]
    fn test_superseded_reporter_leaves_indicator_alone() {
        let presenter = Arc::new(RecordingPresenter::new());
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let owner = IndicatorOwner::new();
        let artist = ListingTarget::Artist("spotify:artist:x".to_string());

        let mut older = ProgressReporter::start(
            presenter.clone(),
            events.clone(),
            owner.clone(),
            1,
            artist.clone(),
            "Browsing albums from X",
        );
        let mut newer = ProgressReporter::start(
            presenter.clone(),
            events.clone(),
            owner.clone(),
            2,
            ListingTarget::SearchMenu,
            "Searching for y",
        );
        let shown = presenter.progress().len();

        older.set(60);
        older.fail("Browse failed");
        assert_eq!(presenter.progress().len(), shown);
        assert_eq!(owner.current(), Some(2));

        newer.set(50);
        newer.finish();
        assert_eq!(presenter.progress_values(), vec![50]);
        assert_eq!(owner.current(), None);

        let browse: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(!browse.iter().any(|e| matches!(
            e,
            CoreEvent::Browse(BrowseEvent::Failed { target, .. }) if *target == artist
        )));
    }

    #[test]
    fn test_older_epoch_cannot_take_the_indicator() {
        let presenter = Arc::new(RecordingPresenter::new());
        let owner = IndicatorOwner::new();
        let _newer = ProgressReporter::start(
            presenter.clone(),
            EventBus::new(8),
            owner.clone(),
            5,
            ListingTarget::SearchMenu,
            "Searching for a",
        );

        let mut older = ProgressReporter::start(
            presenter.clone(),
            EventBus::new(8),
            owner.clone(),
            4,
            ListingTarget::SearchMenu,
            "Searching for b",
        );
        older.set(50);

        assert_eq!(presenter.progress().len(), 1);
        assert_eq!(owner.current(), Some(5));
    }

    #[test]
    fn test_withdraw_silences_the_shown_query() {
        let presenter = Arc::new(RecordingPresenter::new());
        let owner = IndicatorOwner::new();
        let mut progress = ProgressReporter::start(
            presenter.clone(),
            EventBus::new(8),
            owner.clone(),
            1,
            ListingTarget::SearchMenu,
            "Searching for a",
        );

        owner.withdraw(presenter.as_ref());
        progress.set(60);
        progress.finish();
        owner.withdraw(presenter.as_ref());

        assert_eq!(
            presenter.progress(),
            vec![
                ProgressCall::Show {
                    heading: PROGRESS_HEADING.to_string(),
                    message: "Searching for a".to_string(),
                },
                ProgressCall::Hide,
            ]
        );
    }
}
