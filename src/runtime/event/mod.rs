//! Events: callbacks fired inline or through a Looper
//!
//! An unbound [`Event`] calls its handler synchronously on the firing thread.
//! A bound Event owns a [`SharedEvent`], an indirection record that holds the
//! bound Looper and a *weak* handle to the Event's handler. Firing posts an
//! `EventRunnable` that retains the `SharedEvent`; when it runs on the worker it
//! reaches the handler only through that weak handle.
//!
//! # Firing after destruction
//!
//! The Event may be dropped while firings are still queued. Each queued firing
//! first probes `SharedEvent::is_shared()`: if only the firing's own reference
//! remains, the owner is gone and the firing is skipped with an ERROR log and a
//! `stale_events` count on the Looper. The probe is a best-effort diagnostic
//! only; it races with a concurrent drop.
//!
//! Memory safety does not rest on the probe. The handler is reached by
//! upgrading the weak handle, so a firing either holds a strong reference for
//! the whole callback or observes that the handler is gone and skips it, the
//! same way the probe does.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::Result;
use super::looper::{Looper, PostToken};
use super::shared::{Shared, WeakShared};
use super::task::{shared_runnable, Runnable};

/// The callback behind an [`Event`].
pub trait EventHandler: Send + Sync {
    /// Called each time the event fires.
    fn on_event(&self);
}

impl<F> EventHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_event(&self) {
        self()
    }
}

/// Outcome of [`Event::fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    /// The handler ran inline before `fire` returned.
    Invoked,
    /// A firing was queued on the bound Looper.
    Posted(PostToken),
}

impl Fired {
    /// Token of the queued firing, if any.
    #[inline]
    pub fn token(&self) -> Option<PostToken> {
        match self {
            Fired::Invoked => None,
            Fired::Posted(token) => Some(*token),
        }
    }
}

/// Indirection record binding an Event to its Looper.
pub struct SharedEvent {
    /// Diagnostic name.
    name: Option<String>,
    /// Non-owning handle to the Event's handler.
    target: WeakShared<dyn EventHandler>,
    /// The bound Looper, kept alive as long as this record.
    looper: Looper,
}

impl SharedEvent {
    /// Diagnostic name.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The bound Looper.
    #[inline]
    pub fn looper(&self) -> &Looper {
        &self.looper
    }

    /// Snapshot: is the Event's handler still alive?
    #[inline]
    pub fn is_target_alive(&self) -> bool {
        self.target.is_alive()
    }
}

impl fmt::Debug for SharedEvent {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("SharedEvent")
            .field("name", &self.name)
            .field("target_alive", &self.is_target_alive())
            .field("looper", &self.looper.name())
            .finish()
    }
}

/// One queued firing of a bound Event.
struct EventRunnable {
    shared: Shared<SharedEvent>,
}

impl EventRunnable {
    fn skip_stale(
        &self,
        reason: &'static str,
    ) {
        self.shared.looper().stats().record_stale_event();
        tracing::error!(
            event = self.shared.name().unwrap_or("<unnamed>"),
            looper = %self.shared.looper().name(),
            "event fired after its owner was destroyed ({}), callback skipped",
            reason
        );
    }
}

impl Runnable for EventRunnable {
    fn run(&self) {
        // Best-effort probe: the Event holds one reference, this firing another.
        if !self.shared.is_shared() {
            self.skip_stale("no owner left");
            return;
        }

        match self.shared.target.upgrade() {
            Some(handler) => handler.on_event(),
            None => self.skip_stale("handler released during firing"),
        }
    }

    fn tag(&self) -> Option<&'static str> {
        Some("event")
    }
}

/// A callback fired either inline or through a bound Looper.
pub struct Event {
    /// The handler; the only strong owner outside a running callback.
    handler: Shared<dyn EventHandler>,
    /// Present when bound to a Looper.
    shared: Option<Shared<SharedEvent>>,
}

impl Event {
    /// An unbound event: `fire` runs the handler on the calling thread.
    pub fn new<H: EventHandler + 'static>(handler: H) -> Self {
        Self {
            handler: Self::share_handler(handler),
            shared: None,
        }
    }

    /// An event bound to `looper`: `fire` posts to it.
    pub fn bound<H: EventHandler + 'static>(
        handler: H,
        looper: &Looper,
    ) -> Self {
        Self::bind(handler, looper, None)
    }

    /// A bound event with a diagnostic name.
    pub fn bound_named<H: EventHandler + 'static>(
        handler: H,
        looper: &Looper,
        name: impl Into<String>,
    ) -> Self {
        Self::bind(handler, looper, Some(name.into()))
    }

    fn bind<H: EventHandler + 'static>(
        handler: H,
        looper: &Looper,
        name: Option<String>,
    ) -> Self {
        let handler = Self::share_handler(handler);
        let shared = Shared::new(SharedEvent {
            name,
            target: handler.downgrade(),
            looper: looper.clone(),
        });
        Self {
            handler,
            shared: Some(shared),
        }
    }

    fn share_handler<H: EventHandler + 'static>(handler: H) -> Shared<dyn EventHandler> {
        Shared::from_arc(Arc::new(handler) as Arc<dyn EventHandler>)
    }

    /// Fire the event.
    ///
    /// Unbound: the handler runs before this returns and `delay` is ignored.
    /// Bound: returns immediately; the handler runs on the Looper's worker at or
    /// after now + `delay`. Fails with `LooperStopped` if the Looper is stopped.
    pub fn fire(
        &self,
        delay: Duration,
    ) -> Result<Fired> {
        let Some(shared) = &self.shared else {
            self.handler.on_event();
            return Ok(Fired::Invoked);
        };

        let runnable = shared_runnable(EventRunnable {
            shared: shared.retain(),
        });
        let token = shared.looper().post(runnable, delay)?;
        tracing::trace!(event = shared.name().unwrap_or("<unnamed>"), seq = token.seq(), "event posted");
        Ok(Fired::Posted(token))
    }

    /// Fire with no delay.
    #[inline]
    pub fn fire_now(&self) -> Result<Fired> {
        self.fire(Duration::ZERO)
    }

    /// Withdraw a queued firing. Returns `false` if it already ran or the
    /// event is unbound.
    pub fn cancel(
        &self,
        token: PostToken,
    ) -> bool {
        self.shared
            .as_ref()
            .is_some_and(|shared| shared.looper().cancel(token))
    }

    /// Is the event bound to a Looper?
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.shared.is_some()
    }

    /// The bound Looper.
    #[inline]
    pub fn looper(&self) -> Option<&Looper> {
        self.shared.as_ref().map(|shared| shared.looper())
    }

    /// Diagnostic name of a bound event.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.shared.as_ref().and_then(|shared| shared.name())
    }

    /// Snapshot: number of owners of the indirection record, i.e. this event
    /// plus its queued firings. Zero when unbound.
    #[inline]
    pub fn shared_retain_count(&self) -> usize {
        self.shared.as_ref().map_or(0, |shared| shared.retain_count())
    }
}

impl fmt::Debug for Event {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Event")
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
