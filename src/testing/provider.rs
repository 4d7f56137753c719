use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::geocoding::{GeocodeProvider, Location, LookupError};

#[derive(Debug, Clone)]
enum Scripted {
    Found(Location),
    Absent,
    TimedOut,
    ServiceError(String),
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Scripted>,
    fallback: Option<Scripted>,
    addresses: Vec<String>,
    timeouts: Vec<Duration>,
}

/// Provider that replays queued outcomes
///
/// Each lookup pops the next queued outcome; once the queue is empty the
/// fallback (if any) is returned forever. Without either, lookups fail with a
/// service error. Clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_found(&self, location: Location) {
        self.push(Scripted::Found(location));
    }

    pub fn push_absent(&self) {
        self.push(Scripted::Absent);
    }

    /// Queue a `TimedOut` carrying the timeout the lookup was given
    pub fn push_timeout(&self) {
        self.push(Scripted::TimedOut);
    }

    pub fn push_service_error(&self, message: impl Into<String>) {
        self.push(Scripted::ServiceError(message.into()));
    }

    pub fn fallback_found(&self, location: Location) {
        self.lock().fallback = Some(Scripted::Found(location));
    }

    pub fn fallback_absent(&self) {
        self.lock().fallback = Some(Scripted::Absent);
    }

    pub fn fallback_timeout(&self) {
        self.lock().fallback = Some(Scripted::TimedOut);
    }

    pub fn fallback_service_error(&self, message: impl Into<String>) {
        self.lock().fallback = Some(Scripted::ServiceError(message.into()));
    }

    /// Number of lookups made so far
    pub fn calls(&self) -> usize {
        self.lock().addresses.len()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.lock().addresses.clone()
    }

    /// Timeouts passed to each lookup, in call order
    pub fn timeouts(&self) -> Vec<Duration> {
        self.lock().timeouts.clone()
    }

    fn push(&self, outcome: Scripted) {
        self.lock().queue.push_back(outcome);
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait(?Send)]
impl GeocodeProvider for ScriptedProvider {
    async fn lookup(&self, address: &str, timeout: Duration) -> Result<Option<Location>, LookupError> {
        let next = {
            let mut script = self.lock();
            script.addresses.push(address.to_string());
            script.timeouts.push(timeout);
            script.queue.pop_front().or_else(|| script.fallback.clone())
        };

        match next {
            Some(Scripted::Found(location)) => Ok(Some(location)),
            Some(Scripted::Absent) => Ok(None),
            Some(Scripted::TimedOut) => Err(LookupError::TimedOut(timeout)),
            Some(Scripted::ServiceError(message)) => Err(LookupError::Service(message)),
            None => Err(LookupError::Service("no scripted response".to_string())),
        }
    }
}
