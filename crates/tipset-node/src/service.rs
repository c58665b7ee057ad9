//! Event creation service
//!
//! Runs an [`EventCreationManager`] as a single-threaded actor: every
//! command and every creation attempt is handled by one task, in order.
//!
//! ```text
//!   ServiceHandle ──mpsc──► ┌──────────────────────┐ ──broadcast──► subscribers
//!   ticker ───────────────► │ EventCreationManager │
//!   shutdown ─────mpsc────► └──────────────────────┘
//! ```

use crate::manager::EventCreationManager;
use crate::status::{EventCreationStatus, PlatformStatus};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tipset_core::{EventWindow, PlatformEvent};
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 1024;
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Input accepted by the service
#[derive(Clone, Debug)]
pub enum CreationCommand {
    RegisterEvent(PlatformEvent),
    SetEventWindow(EventWindow),
    UpdatePlatformStatus(PlatformStatus),
    ReportUnhealthyDuration(Duration),
    Clear,
}

/// Errors returned to service handles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Event creation service has stopped")]
    Stopped,
}

/// Cloneable handle for talking to a running service
#[derive(Clone)]
pub struct ServiceHandle {
    commands: mpsc::Sender<CreationCommand>,
    events: broadcast::Sender<PlatformEvent>,
    status: Arc<RwLock<EventCreationStatus>>,
}

impl ServiceHandle {
    pub async fn send(&self, command: CreationCommand) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    pub async fn register_event(&self, event: PlatformEvent) -> Result<(), ServiceError> {
        self.send(CreationCommand::RegisterEvent(event)).await
    }

    pub async fn set_event_window(&self, event_window: EventWindow) -> Result<(), ServiceError> {
        self.send(CreationCommand::SetEventWindow(event_window)).await
    }

    pub async fn update_platform_status(&self, platform_status: PlatformStatus) -> Result<(), ServiceError> {
        self.send(CreationCommand::UpdatePlatformStatus(platform_status))
            .await
    }

    pub async fn report_unhealthy_duration(&self, duration: Duration) -> Result<(), ServiceError> {
        self.send(CreationCommand::ReportUnhealthyDuration(duration))
            .await
    }

    pub async fn clear(&self) -> Result<(), ServiceError> {
        self.send(CreationCommand::Clear).await
    }

    /// Receive every event the service creates from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }

    /// Outcome of the latest creation attempt
    pub fn status(&self) -> EventCreationStatus {
        *self.status.read()
    }
}

/// The actor owning the manager
pub struct EventCreationService {
    manager: EventCreationManager,
    attempt_interval: Duration,
    command_tx: mpsc::Sender<CreationCommand>,
    command_rx: mpsc::Receiver<CreationCommand>,
    event_tx: broadcast::Sender<PlatformEvent>,
    status: Arc<RwLock<EventCreationStatus>>,
}

impl EventCreationService {
    pub fn new(manager: EventCreationManager, attempt_interval: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            status: Arc::new(RwLock::new(manager.status())),
            manager,
            attempt_interval,
            command_tx,
            command_rx,
            event_tx,
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            commands: self.command_tx.clone(),
            events: self.event_tx.clone(),
            status: self.status.clone(),
        }
    }

    /// Run until a shutdown signal arrives, then hand the manager back
    pub async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) -> EventCreationManager {
        info!(
            "Starting event creation (attempt interval: {}ms)",
            self.attempt_interval.as_millis()
        );

        let mut ticker = tokio::time::interval(self.attempt_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Event creation service shutting down");
                    break;
                }
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command);
                }
                _ = ticker.tick() => {
                    self.attempt_creation();
                }
            }
        }

        self.manager
    }

    fn handle_command(&mut self, command: CreationCommand) {
        match command {
            CreationCommand::RegisterEvent(event) => self.manager.register_event(event),
            CreationCommand::SetEventWindow(event_window) => {
                debug!("New event window: {}", event_window);
                self.manager.set_event_window(event_window);
            }
            CreationCommand::UpdatePlatformStatus(platform_status) => {
                self.manager.update_platform_status(platform_status)
            }
            CreationCommand::ReportUnhealthyDuration(duration) => {
                self.manager.report_unhealthy_duration(duration)
            }
            CreationCommand::Clear => self.manager.clear(),
        }
    }

    fn attempt_creation(&mut self) {
        match self.manager.maybe_create_event() {
            Ok(Some(event)) => {
                debug!("Publishing {}", event);
                // No subscribers is fine
                let _ = self.event_tx.send(event);
            }
            Ok(None) => {}
            Err(e) => warn!("Event creation failed: {}", e),
        }
        *self.status.write() = self.manager.status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::pool::TransactionPool;
    use crate::test_utils::{make_clock, make_roster, unlimited_config};
    use tipset_crypto::Ed25519HashSigner;

    fn make_service(nodes: u64) -> EventCreationService {
        let config = NodeConfig {
            event_creation: unlimited_config(),
            ..NodeConfig::default()
        };
        let manager = EventCreationManager::for_node(
            &config,
            make_roster(nodes),
            Arc::new(Ed25519HashSigner::from_seed(&[2; 32])),
            make_clock(),
            TransactionPool::new(),
        )
        .unwrap();
        EventCreationService::new(manager, Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_creates_and_publishes() {
        let service = make_service(1);
        let handle = service.handle();
        let mut events = handle.subscribe();
        handle
            .update_platform_status(PlatformStatus::Active)
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(service.run(shutdown_rx));

        let first = events.recv().await.unwrap();
        let second = events.recv().await.unwrap();
        let third = events.recv().await.unwrap();
        assert!(first.self_parent().is_none());
        assert_eq!(second.self_parent(), Some(first.descriptor()));
        assert_eq!(third.self_parent(), Some(second.descriptor()));

        shutdown_tx.send(()).await.unwrap();
        let manager = task.await.unwrap();
        assert_eq!(manager.platform_status(), PlatformStatus::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_reported_through_handle() {
        let service = make_service(1);
        let handle = service.handle();
        assert_eq!(handle.status(), EventCreationStatus::Idle);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(service.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.status(), EventCreationStatus::PlatformStatusPreventsCreation);

        handle
            .report_unhealthy_duration(Duration::from_secs(10))
            .await
            .unwrap();
        handle
            .update_platform_status(PlatformStatus::Active)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.status(), EventCreationStatus::Overloaded);

        shutdown_tx.send(()).await.unwrap();
        task.await.unwrap();
        assert_eq!(handle.clear().await, Err(ServiceError::Stopped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registered_events_reach_creator() {
        let service = make_service(2);
        let handle = service.handle();
        let mut events = handle.subscribe();
        handle
            .update_platform_status(PlatformStatus::Active)
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(service.run(shutdown_rx));

        let genesis = events.recv().await.unwrap();
        assert!(genesis.all_parents().is_empty());

        let peer = crate::test_utils::make_event(tipset_core::NodeId::new(1), 1);
        handle.register_event(peer.clone()).await.unwrap();
        let next = events.recv().await.unwrap();
        assert_eq!(next.other_parents(), &[*peer.descriptor()]);

        shutdown_tx.send(()).await.unwrap();
        task.await.unwrap();
    }
}
