//! Fake adapter implementations for testing

use super::traits::{
    ClientHandle, ControlError, NotificationSink, ResourceController, SinkError,
};
use crate::state::ResourceState;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Recorded call to a controller method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCall {
    CheckState,
    Resume,
    Suspend,
}

struct FakeControlState {
    calls: Vec<ControllerCall>,
    /// Scripted answers consumed one per `check_state` call
    check_script: VecDeque<Result<ResourceState, String>>,
    /// Answer served once the script runs dry
    check_fallback: Result<ResourceState, String>,
    resume_result: Result<(), String>,
    suspend_result: Result<(), String>,
}

/// Scriptable resource controller with call recording
#[derive(Clone)]
pub struct FakeController {
    state: Arc<Mutex<FakeControlState>>,
}

impl FakeController {
    /// Controller whose `check_state` always reports `fallback`
    pub fn new(fallback: ResourceState) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeControlState {
                calls: Vec::new(),
                check_script: VecDeque::new(),
                check_fallback: Ok(fallback),
                resume_result: Ok(()),
                suspend_result: Ok(()),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeControlState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue states to be reported by successive `check_state` calls
    pub fn script_check(&self, states: impl IntoIterator<Item = ResourceState>) {
        self.lock().check_script.extend(states.into_iter().map(Ok));
    }

    /// Queue a `check_state` failure
    pub fn script_check_error(&self, message: impl Into<String>) {
        self.lock().check_script.push_back(Err(message.into()));
    }

    /// Change the answer served once the script runs dry
    pub fn set_fallback(&self, state: ResourceState) {
        self.lock().check_fallback = Ok(state);
    }

    /// Make every `check_state` call fail once the script runs dry
    pub fn fail_checks(&self, message: impl Into<String>) {
        self.lock().check_fallback = Err(message.into());
    }

    pub fn fail_resume(&self, message: impl Into<String>) {
        self.lock().resume_result = Err(message.into());
    }

    pub fn fail_suspend(&self, message: impl Into<String>) {
        self.lock().suspend_result = Err(message.into());
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ControllerCall> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl ResourceController for FakeController {
    async fn check_state(&self) -> Result<ResourceState, ControlError> {
        let mut state = self.lock();
        state.calls.push(ControllerCall::CheckState);
        let answer = match state.check_script.pop_front() {
            Some(scripted) => scripted,
            None => state.check_fallback.clone(),
        };
        answer.map_err(ControlError::Operation)
    }

    async fn resume(&self) -> Result<(), ControlError> {
        let mut state = self.lock();
        state.calls.push(ControllerCall::Resume);
        state
            .resume_result
            .clone()
            .map_err(ControlError::Operation)
    }

    async fn suspend(&self) -> Result<(), ControlError> {
        let mut state = self.lock();
        state.calls.push(ControllerCall::Suspend);
        state
            .suspend_result
            .clone()
            .map_err(ControlError::Operation)
    }
}

/// Notification sink that records delivered texts
#[derive(Clone, Default)]
pub struct FakeSink {
    state: Arc<Mutex<FakeSinkState>>,
}

#[derive(Default)]
struct FakeSinkState {
    delivered: Vec<String>,
    fail: bool,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail
    pub fn fail_deliveries(&self) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).fail = true;
    }

    pub fn delivered(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .delivered
            .clone()
    }
}

#[async_trait]
impl NotificationSink for FakeSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.fail {
            return Err(SinkError::Failed("scripted failure".to_string()));
        }
        state.delivered.push(text.to_string());
        Ok(())
    }
}

/// Verdict delivered to a fake client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected {
        name: Option<String>,
        target: String,
    },
    Disconnected {
        name: Option<String>,
        reason: String,
    },
}

/// Client handle that records its verdict into a shared log
pub struct FakeClient {
    name: Option<String>,
    log: Arc<Mutex<Vec<ClientEvent>>>,
}

impl FakeClient {
    /// Shared log for a group of clients under test
    pub fn log() -> Arc<Mutex<Vec<ClientEvent>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn new(name: impl Into<String>, log: &Arc<Mutex<Vec<ClientEvent>>>) -> Self {
        Self {
            name: Some(name.into()),
            log: Arc::clone(log),
        }
    }

    /// A client with no known name
    pub fn anonymous(log: &Arc<Mutex<Vec<ClientEvent>>>) -> Self {
        Self {
            name: None,
            log: Arc::clone(log),
        }
    }
}

impl ClientHandle for FakeClient {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn connect(self, target: &str) {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ClientEvent::Connected {
                name: self.name,
                target: target.to_string(),
            });
    }

    fn disconnect(self, reason: &str) {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ClientEvent::Disconnected {
                name: self.name,
                reason: reason.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn controller_serves_script_then_fallback() {
        let controller = FakeController::new(ResourceState::Running);
        controller.script_check([ResourceState::NotReady, ResourceState::Suspended]);

        assert_eq!(
            controller.check_state().await.ok(),
            Some(ResourceState::NotReady)
        );
        assert_eq!(
            controller.check_state().await.ok(),
            Some(ResourceState::Suspended)
        );
        assert_eq!(
            controller.check_state().await.ok(),
            Some(ResourceState::Running)
        );
        assert_eq!(controller.calls().len(), 3);
    }

    #[tokio::test]
    async fn controller_scripted_error_surfaces() {
        let controller = FakeController::new(ResourceState::Running);
        controller.script_check_error("api quota exceeded");

        let err = controller.check_state().await.err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("operation error: api quota exceeded")
        );
    }

    #[tokio::test]
    async fn sink_records_deliveries() {
        let sink = FakeSink::new();
        assert!(sink.deliver("hello").await.is_ok());
        assert_eq!(sink.delivered(), vec!["hello".to_string()]);
    }

    #[test]
    fn client_records_one_verdict() {
        let log = FakeClient::log();
        FakeClient::new("alice", &log).connect("lobby");
        FakeClient::anonymous(&log).disconnect("closed");

        let events = log.lock().unwrap_or_else(|e| e.into_inner()).clone();
        assert_eq!(
            events,
            vec![
                ClientEvent::Connected {
                    name: Some("alice".to_string()),
                    target: "lobby".to_string()
                },
                ClientEvent::Disconnected {
                    name: None,
                    reason: "closed".to_string()
                },
            ]
        );
    }
}
