use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};

use candela_core::connector::{CandelaConnector, CandleStreamProvider, HistoryProvider};
use candela_core::stream::StreamHandle;
use candela_core::{CandelaError, Candle, CandleUpdate, SnapshotRequest, StreamRequest, Symbol};

/// Instruction for how a method should behave for a given input.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Return the provided value after a delay.
    Delay(Duration, T),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Hang indefinitely (simulate a stalled request).
    Hang,
}

/// Instruction for how a stream should behave for a given provider name.
#[derive(Clone)]
pub enum StreamBehavior {
    /// Start a stream and send these updates, then keep it open until stopped.
    Success(Vec<CandleUpdate>),
    /// Fail the `stream_candles` call immediately.
    Fail(CandelaError),
    /// Hang the `stream_candles` call (simulate a network stall during connect).
    Hang,
    /// Start a stream that accepts external updates via controller `push_update`.
    Manual,
}

struct StreamController {
    behavior: StreamBehavior,
    kill_switch: Option<oneshot::Sender<()>>, // remote kill switch
    manual_tx: Option<mpsc::Sender<CandleUpdate>>, // inbound updates for Manual behavior
}

impl StreamController {
    const fn new(behavior: StreamBehavior) -> Self {
        Self {
            behavior,
            kill_switch: None,
            manual_tx: None,
        }
    }
}

#[derive(Default)]
struct InternalState {
    snapshot_rules: HashMap<Symbol, MockBehavior<Vec<Candle>>>,
    snapshot_requests: Vec<SnapshotRequest>,
    stream_requests: HashMap<&'static str, Vec<StreamRequest>>,
    stream_controllers: HashMap<&'static str, StreamController>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior for `snapshot` calls for a specific symbol.
    pub async fn set_snapshot_behavior(&self, symbol: Symbol, behavior: MockBehavior<Vec<Candle>>) {
        let mut guard = self.state.lock().await;
        guard.snapshot_rules.insert(symbol, behavior);
    }

    /// Set the behavior for a provider's stream session.
    pub async fn set_stream_behavior(&self, provider_name: &'static str, behavior: StreamBehavior) {
        let mut guard = self.state.lock().await;
        match guard.stream_controllers.get_mut(provider_name) {
            Some(ctrl) => ctrl.behavior = behavior,
            None => {
                guard
                    .stream_controllers
                    .insert(provider_name, StreamController::new(behavior));
            }
        }
    }

    /// Remotely end an active stream for the given provider name.
    ///
    /// The session task exits and drops its sender, so consumers observe a
    /// closed channel.
    pub async fn fail_stream(&self, provider_name: &'static str) {
        let mut guard = self.state.lock().await;
        if let Some(ctrl) = guard.stream_controllers.get_mut(provider_name)
            && let Some(tx) = ctrl.kill_switch.take()
        {
            let _ = tx.send(());
        }
    }

    /// Push a single update into an active Manual stream.
    ///
    /// Returns `true` if the update was queued, `false` if no Manual session is active
    /// or the channel is closed.
    pub async fn push_update(&self, provider_name: &'static str, update: CandleUpdate) -> bool {
        // Extract a sender clone without holding the lock across await
        let tx_opt = {
            let guard = self.state.lock().await;
            guard
                .stream_controllers
                .get(provider_name)
                .and_then(|c| c.manual_tx.clone())
        };
        if let Some(tx) = tx_opt {
            tx.send(update).await.is_ok()
        } else {
            false
        }
    }

    /// Return a copy of the snapshot request log.
    pub async fn get_snapshot_requests(&self) -> Vec<SnapshotRequest> {
        self.state.lock().await.snapshot_requests.clone()
    }

    /// Return a copy of the stream request log for the given provider name.
    pub async fn get_stream_requests(&self, provider_name: &'static str) -> Vec<StreamRequest> {
        let guard = self.state.lock().await;
        guard
            .stream_requests
            .get(provider_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Clear all configured behaviors and request logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.snapshot_rules.clear();
        guard.snapshot_requests.clear();
        guard.stream_requests.clear();
        guard.stream_controllers.clear();
    }
}

/// A connector that defers all behavior to an external controller.
pub struct DynamicMockConnector {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockConnector {
    /// Create a new dynamic mock connector and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn CandelaConnector>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn CandelaConnector>, controller)
    }
}

impl CandelaConnector for DynamicMockConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn as_history_provider(&self) -> Option<&dyn HistoryProvider> {
        Some(self as &dyn HistoryProvider)
    }

    fn as_stream_provider(&self) -> Option<&dyn CandleStreamProvider> {
        Some(self as &dyn CandleStreamProvider)
    }
}

#[async_trait]
impl HistoryProvider for DynamicMockConnector {
    async fn snapshot(&self, req: &SnapshotRequest) -> Result<Vec<Candle>, CandelaError> {
        // Log and snapshot the behavior without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.snapshot_requests.push(req.clone());
            guard.snapshot_rules.get(&req.symbol).cloned()
        };

        match behavior {
            Some(MockBehavior::Return(candles)) => Ok(candles),
            Some(MockBehavior::Delay(delay, candles)) => {
                tokio::time::sleep(delay).await;
                Ok(candles)
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(CandelaError::not_found(format!("snapshot for {}", req.symbol))),
        }
    }
}

/// Forward `update` unless it is for another instrument.
fn admits(req: &StreamRequest, update: &CandleUpdate) -> bool {
    update.symbol == req.symbol
}

#[async_trait]
impl CandleStreamProvider for DynamicMockConnector {
    async fn stream_candles(
        &self,
        req: &StreamRequest,
    ) -> Result<(StreamHandle, mpsc::Receiver<CandleUpdate>), CandelaError> {
        // Log the request
        {
            let mut guard = self.state.lock().await;
            guard
                .stream_requests
                .entry(self.name)
                .or_default()
                .push(req.clone());
        }

        // Fetch current behavior for this provider
        let behavior = {
            let guard = self.state.lock().await;
            guard
                .stream_controllers
                .get(self.name)
                .map(|c| c.behavior.clone())
        };

        match behavior {
            Some(StreamBehavior::Fail(e)) => Err(e),
            Some(StreamBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(StreamBehavior::Manual) => {
                let (tx, rx) = mpsc::channel::<CandleUpdate>(1024);
                let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
                let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
                let (in_tx, mut in_rx) = mpsc::channel::<CandleUpdate>(1024);

                // Publish kill switch and manual sender for remote control
                {
                    let mut guard = self.state.lock().await;
                    let entry = guard
                        .stream_controllers
                        .entry(self.name)
                        .or_insert_with(|| StreamController::new(StreamBehavior::Manual));
                    entry.kill_switch = Some(kill_tx);
                    entry.manual_tx = Some(in_tx);
                }

                let join = tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            biased;
                            _ = &mut stop_rx => { break; }
                            _ = &mut kill_rx => { break; }
                            maybe_u = in_rx.recv() => {
                                let Some(u) = maybe_u else {
                                    // Controller dropped manual sender; wait for stop/kill
                                    // to avoid busy loop
                                    tokio::select! {
                                        _ = &mut stop_rx => {}
                                        _ = &mut kill_rx => {}
                                    }
                                    break;
                                };
                                // Manual sessions pass every symbol through so tests can
                                // exercise the consumer's own checks.
                                if tx.send(u).await.is_err() { break; }
                            }
                        }
                    }
                });

                Ok((StreamHandle::new(join, stop_tx), rx))
            }
            Some(StreamBehavior::Success(updates)) => {
                let req = req.clone();
                let (tx, rx) = mpsc::channel::<CandleUpdate>(1024);
                let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
                let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

                // Publish kill switch for remote failure
                {
                    let mut guard = self.state.lock().await;
                    let entry = guard
                        .stream_controllers
                        .entry(self.name)
                        .or_insert_with(|| {
                            StreamController::new(StreamBehavior::Success(Vec::new()))
                        });
                    entry.kill_switch = Some(kill_tx);
                    // ensure manual_tx cleared for non-Manual behaviors
                    entry.manual_tx = None;
                }

                let join = tokio::spawn(async move {
                    // Send scripted updates for the requested symbol until stopped/killed.
                    for u in updates {
                        if !admits(&req, &u) {
                            continue;
                        }
                        tokio::select! {
                            biased;
                            _ = &mut stop_rx => { return; }
                            _ = &mut kill_rx => { return; }
                            res = tx.send(u) => {
                                if res.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    // Keep the channel open until a stop/kill arrives, then drop sender
                    tokio::select! {
                        _ = &mut stop_rx => {}
                        _ = &mut kill_rx => {}
                    }
                });

                Ok((StreamHandle::new(join, stop_tx), rx))
            }
            None => Err(CandelaError::unsupported("stream_candles")),
        }
    }
}
