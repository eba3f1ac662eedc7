//! A flow instance wired to its collaborators.
//!
//! In playback mode accepting is purely local. In compose mode accepting
//! persists the author's draft first: the session is marked pending while
//! the store call is outstanding, the flow only moves to `Accepted` once the
//! record exists, and a failed call leaves the flow where it was so the same
//! action can be retried. After a successful create the session schedules a
//! redirect to the share link; disposing the session cancels it. Composing
//! needs a tokio runtime for that redirect, either the ambient one or the
//! handle in [`SessionOptions::runtime`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::effects::{MediaPlayer, Navigator, Notice, Notifier};
use super::evasion::{Bounds, Offset, Point};
use super::machine::{ConfessionFlow, FlowError, FlowPhase, FlowView};
use super::share::share_link;
use crate::models::{ConfessionRecord, CreateConfessionInput, FlowConfig, ValidationError};
use crate::store::{ConfessionStore, StoreError};

/// Delay between a successful compose-mode accept and the redirect.
pub const DEFAULT_NAVIGATE_AFTER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowMode {
    /// Recipient playback. Accepting never touches the store.
    Playback,
    /// Authoring. Accepting persists the draft.
    Compose(CreateConfessionInput),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a submission is already in progress")]
    Pending,

    #[error("session has been disposed")]
    Disposed,

    #[error("no async runtime to schedule navigation on")]
    NoRuntime,
}

/// Presentation collaborators used by a session.
#[derive(Clone)]
pub struct Effects {
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub media: Option<Arc<dyn MediaPlayer>>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Base of generated share links.
    pub public_url: String,
    pub navigate_after: Duration,
    /// Runtime the redirect is scheduled on. Defaults to the runtime the
    /// accept is driven from.
    pub runtime: Option<Handle>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:3000".to_string(),
            navigate_after: DEFAULT_NAVIGATE_AFTER,
            runtime: None,
        }
    }
}

/// Result of starting an accept.
#[derive(Debug)]
pub enum AcceptStart {
    /// Playback mode: the flow is already `Accepted`.
    Accepted,
    /// Compose mode: hand this to the store, then to
    /// [`FlowSession::complete_accept`].
    Persist(PendingCreate),
}

/// An outstanding create issued by a session.
#[derive(Debug)]
pub struct PendingCreate {
    input: CreateConfessionInput,
    generation: u64,
}

impl PendingCreate {
    pub fn input(&self) -> &CreateConfessionInput {
        &self.input
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    Accepted,
    Persisted {
        record: ConfessionRecord,
        link: String,
    },
    /// The session was disposed before the create finished.
    Discarded,
}

/// A redirect that fires after a delay unless cancelled first.
pub struct ScheduledNavigation {
    url: String,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledNavigation {
    /// Spawn the delayed redirect on `runtime`.
    pub fn schedule(
        runtime: &Handle,
        navigator: Arc<dyn Navigator>,
        url: String,
        delay: Duration,
    ) -> Self {
        let target = url.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Navigating to {}", target);
            navigator.navigate(&target);
        });
        Self {
            url,
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Cancelled navigation to {}", self.url);
        }
    }

    /// Wait until the redirect has fired or been cancelled.
    pub async fn finished(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            let _ = handle.await;
            self.handle = None;
        }
    }
}

impl Drop for ScheduledNavigation {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct FlowSession {
    flow: ConfessionFlow,
    mode: FlowMode,
    effects: Effects,
    options: SessionOptions,
    pending: bool,
    disposed: bool,
    generation: u64,
    record: Option<ConfessionRecord>,
    navigation: Option<ScheduledNavigation>,
}

impl FlowSession {
    pub fn playback(config: impl Into<Arc<FlowConfig>>, effects: Effects) -> Self {
        Self::new(config, FlowMode::Playback, effects, SessionOptions::default())
    }

    pub fn compose(
        config: impl Into<Arc<FlowConfig>>,
        draft: CreateConfessionInput,
        effects: Effects,
        options: SessionOptions,
    ) -> Self {
        Self::new(config, FlowMode::Compose(draft), effects, options)
    }

    pub fn new(
        config: impl Into<Arc<FlowConfig>>,
        mode: FlowMode,
        effects: Effects,
        options: SessionOptions,
    ) -> Self {
        Self {
            flow: ConfessionFlow::new(config),
            mode,
            effects,
            options,
            pending: false,
            disposed: false,
            generation: 0,
            record: None,
            navigation: None,
        }
    }

    pub fn flow(&self) -> &ConfessionFlow {
        &self.flow
    }

    pub fn mode(&self) -> &FlowMode {
        &self.mode
    }

    pub fn phase(&self) -> FlowPhase {
        self.flow.phase()
    }

    pub fn view(&self) -> FlowView<'_> {
        self.flow.view()
    }

    /// Gates the accept control while a create is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The record persisted by a compose-mode accept.
    pub fn record(&self) -> Option<&ConfessionRecord> {
        self.record.as_ref()
    }

    pub fn scheduled_navigation(&self) -> Option<&str> {
        self.navigation.as_ref().map(ScheduledNavigation::url)
    }

    /// Replace the compose draft. Refused while a create is outstanding.
    pub fn set_draft(&mut self, draft: CreateConfessionInput) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.pending {
            return Err(SessionError::Pending);
        }
        self.mode = FlowMode::Compose(draft);
        Ok(())
    }

    pub fn advance(&mut self) -> Result<FlowPhase, SessionError> {
        self.ensure_live()?;
        Ok(self.flow.advance()?)
    }

    pub fn report_pointer_move(&mut self, pointer: Point, container: Bounds) -> Option<Offset> {
        if self.disposed {
            return None;
        }
        self.flow.report_pointer_move(pointer, container)
    }

    pub fn decline(&self) {
        self.flow.decline();
    }

    /// Start accepting.
    ///
    /// Playback mode transitions immediately. Compose mode validates the
    /// draft, marks the session pending and returns the create to issue.
    pub fn begin_accept(&mut self) -> Result<AcceptStart, SessionError> {
        self.ensure_live()?;
        if self.pending {
            return Err(SessionError::Pending);
        }
        if !matches!(self.flow.phase(), FlowPhase::Deciding { .. }) {
            return Err(FlowError {
                action: "accept",
                phase: self.flow.phase().name(),
            }
            .into());
        }

        let draft = match &self.mode {
            FlowMode::Playback => {
                self.flow.accept()?;
                self.on_accepted();
                return Ok(AcceptStart::Accepted);
            }
            FlowMode::Compose(draft) => draft.clone(),
        };

        if let Err(e) = draft.validate() {
            self.effects
                .notifier
                .notify(Notice::error("Please fill in every field", e.to_string()));
            return Err(e.into());
        }
        self.runtime()?;

        self.pending = true;
        self.generation += 1;
        Ok(AcceptStart::Persist(PendingCreate {
            input: draft,
            generation: self.generation,
        }))
    }

    /// Apply the result of a create started by [`FlowSession::begin_accept`].
    ///
    /// Results arriving after disposal, or for a superseded create, are
    /// dropped without touching the flow.
    pub fn complete_accept(
        &mut self,
        pending: PendingCreate,
        result: Result<ConfessionRecord, StoreError>,
    ) -> Result<AcceptOutcome, SessionError> {
        if self.disposed || pending.generation != self.generation {
            tracing::debug!("Discarding create result for a defunct session");
            return Ok(AcceptOutcome::Discarded);
        }
        self.pending = false;
        let runtime = self.runtime()?;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let title = match e {
                    StoreError::Validation(_) => "Please fill in every field",
                    _ => "Couldn't send your confession",
                };
                self.effects.notifier.notify(Notice::error(title, e.to_string()));
                return Err(e.into());
            }
        };

        self.flow.accept()?;
        let link = share_link(&self.options.public_url, &record.id.to_string());
        tracing::info!(id = %record.id, "Confession accepted, sharing at {}", link);

        self.navigation = Some(ScheduledNavigation::schedule(
            &runtime,
            self.effects.navigator.clone(),
            link.clone(),
            self.options.navigate_after,
        ));
        self.record = Some(record.clone());
        self.on_accepted();

        Ok(AcceptOutcome::Persisted { record, link })
    }

    /// Accept, issuing the create against `store` when composing.
    ///
    /// Dropping the returned future before it resolves clears the pending
    /// flag and leaves the flow unchanged.
    pub async fn accept<S>(&mut self, store: &S) -> Result<AcceptOutcome, SessionError>
    where
        S: ConfessionStore + ?Sized,
    {
        let pending = match self.begin_accept()? {
            AcceptStart::Accepted => return Ok(AcceptOutcome::Accepted),
            AcceptStart::Persist(pending) => pending,
        };

        let mut guard = PendingGuard {
            session: Some(self),
        };
        let result = store.create(pending.input.clone()).await;
        let session = guard.disarm();
        session.complete_accept(pending, result)
    }

    /// Wait for a scheduled redirect, if any, to fire.
    pub async fn wait_for_navigation(&mut self) {
        if let Some(navigation) = self.navigation.as_mut() {
            navigation.finished().await;
        }
    }

    /// Tear the session down. Outstanding results are discarded and a
    /// scheduled redirect is cancelled.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.pending = false;
        if let Some(mut navigation) = self.navigation.take() {
            navigation.cancel();
        }
        tracing::debug!("Flow session disposed");
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.disposed {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    fn runtime(&self) -> Result<Handle, SessionError> {
        match &self.options.runtime {
            Some(runtime) => Ok(runtime.clone()),
            None => Handle::try_current().map_err(|_| SessionError::NoRuntime),
        }
    }

    fn on_accepted(&self) {
        let (Some(player), Some(media)) = (&self.effects.media, &self.flow.config().media) else {
            return;
        };
        if let Err(e) = player.play(media) {
            tracing::warn!("Media playback failed: {:#}", e);
        }
    }
}

/// Clears the pending flag if an accept future is dropped mid-flight.
struct PendingGuard<'a> {
    session: Option<&'a mut FlowSession>,
}

impl<'a> PendingGuard<'a> {
    fn disarm(&mut self) -> &'a mut FlowSession {
        self.session
            .take()
            .expect("pending guard disarmed twice")
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.pending = false;
            tracing::debug!("Accept cancelled before the store answered");
        }
    }
}
