//! # Busy-Signal Synchronizer
//!
//! `HwHandler` owns the serial transport and the control lines of one module
//! and serializes every write, mode switch and read against the AUX line.
//!
//! ## Event flow
//!
//! ```text
//! AUX rising edge ──► ControlLines ──► mpsc edge queue ──► coordinator task
//!                                                              │
//!        ┌───────────── action tag ────────────────────────────┤
//!        │ ModeSwitch → complete the pending mode switch       │
//!        │ Write      → complete the pending write             │
//!        │ Read       → background read → message callback     │
//!        └─────────────────────────────────────────────────────┘
//!                                   then release every busy-line waiter
//! ```
//!
//! The busy lock admits one write or mode switch at a time. The transport is
//! split into halves behind separate read and write locks: reads never
//! interleave with each other, and a read waiting out `read_timeout` holds
//! up neither a write nor the coordinator, which runs background reads as
//! tasks of their own. Reopening the link takes both halves.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ebyte_rs::hal::HwHandler;
//! use ebyte_rs::config::DeviceConfig;
//!
//! # #[cfg(feature = "raspberry-pi")]
//! # async fn example() -> Result<(), ebyte_rs::EbyteError> {
//! let handler = HwHandler::open_raspberry_pi(&DeviceConfig::default()).await?;
//! handler.write_serial(b"hello").await?;
//! handler.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::{DeviceConfig, Timing};
use crate::error::{EbyteError, TimeoutKind};
use crate::hal::{
    BusyEdge, ChipMode, ControlLines, ModuleHardware, RawMessageCallback, SerialReader,
    SerialSettings, SerialTransport, SerialWriter, LINE_HIGH,
};
use crate::util::logging::{log_frame_hex, LogThrottle};
use async_trait::async_trait;
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};

#[cfg(feature = "raspberry-pi")]
use crate::hal::{RaspberryPiLines, TokioSerialTransport};

/// What the next AUX rising edge means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Link just opened; edges only release waiters
    PowerReset,
    Read,
    Write,
    ModeSwitch,
}

struct EdgeState {
    action: Action,
    /// Completion slot of the single in-flight write or mode switch
    ack: Option<oneshot::Sender<()>>,
}

struct Link<T> {
    transport: T,
    active: SerialSettings,
}

struct Shared<T: SerialTransport, L> {
    link: AsyncMutex<Link<T>>,
    reader: AsyncMutex<Option<T::Reader>>,
    writer: AsyncMutex<Option<T::Writer>>,
    lines: Mutex<L>,
    edge: Mutex<EdgeState>,
    waiters: Mutex<HashMap<u64, oneshot::Sender<()>>>,
    next_ticket: AtomicU64,
    staged: Mutex<SerialSettings>,
    callback: OnceCell<RawMessageCallback>,
    read_errors: Mutex<LogThrottle>,
    timing: Timing,
    read_buffer_size: usize,
}

struct Coordinator {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

fn link_closed() -> EbyteError {
    EbyteError::Transport("serial link is closed".to_string())
}

/// The guarded values stay consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: SerialTransport, L: ControlLines> Shared<T, L> {
    fn set_action(&self, action: Action) {
        lock(&self.edge).action = action;
    }

    /// Tag the next edge as the acknowledgement of `action`.
    fn arm(&self, action: Action) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut edge = lock(&self.edge);
        edge.action = action;
        edge.ack = Some(tx);
        rx
    }

    fn disarm(&self) {
        let mut edge = lock(&self.edge);
        edge.action = Action::Read;
        edge.ack = None;
    }

    async fn await_ack(
        &self,
        ack: oneshot::Receiver<()>,
        kind: TimeoutKind,
    ) -> Result<(), EbyteError> {
        match timeout(self.timing.wait_timeout, ack).await {
            Ok(Ok(())) => Ok(()),
            _ => {
                self.disarm();
                warn!("Timeout waiting for {kind}");
                Err(EbyteError::Timeout(kind))
            }
        }
    }

    fn busy_free(&self) -> Result<bool, EbyteError> {
        Ok(lock(&self.lines).busy_level()? == LINE_HIGH)
    }

    /// Return once AUX reads free, registering a waiter if it is busy now.
    async fn wait_busy_free(&self) -> Result<(), EbyteError> {
        if self.busy_free()? {
            return Ok(());
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.waiters).insert(ticket, tx);

        // Re-check: the edge may have fired before the waiter was registered.
        let outcome = match self.busy_free() {
            Ok(true) => Ok(()),
            Ok(false) => match timeout(self.timing.wait_timeout, rx).await {
                Ok(_) => Ok(()),
                Err(_) => {
                    warn!("Busy line still low after {:?}", self.timing.wait_timeout);
                    Err(EbyteError::Timeout(TimeoutKind::BusyFree))
                }
            },
            Err(e) => Err(e),
        };

        lock(&self.waiters).remove(&ticket);
        outcome
    }

    fn release_waiters(&self) {
        let waiters: Vec<_> = lock(&self.waiters).drain().collect();
        if !waiters.is_empty() {
            debug!("Releasing {} busy-line waiter(s)", waiters.len());
        }
        for (_, waiter) in waiters {
            let _ = waiter.send(());
        }
    }

    async fn read_once(&self) -> Result<Vec<u8>, EbyteError> {
        let mut reader = self.reader.lock().await;
        let reader = reader.as_mut().ok_or_else(link_closed)?;
        let mut buf = vec![0u8; self.read_buffer_size];
        let n = timeout(self.timing.read_timeout, reader.read(&mut buf))
            .await
            .map_err(|_| EbyteError::Timeout(TimeoutKind::Read))??;
        if n == 0 {
            return Err(EbyteError::EndOfStream);
        }
        buf.truncate(n);
        log_frame_hex("RX", &buf);
        Ok(buf)
    }

    async fn write_transport(&self, data: &[u8]) -> Result<(), EbyteError> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or_else(link_closed)?;
        log_frame_hex("TX", data);
        writer.write_all(data).await
    }

    /// Reopen the transport only when `settings` differ from the active ones.
    ///
    /// Holds both halves for the duration; the old halves are dropped before
    /// the device is opened again.
    async fn apply_serial_settings(&self, settings: SerialSettings) -> Result<(), EbyteError> {
        let mut link = self.link.lock().await;
        if link.active == settings {
            return Ok(());
        }
        let mut reader = self.reader.lock().await;
        let mut writer = self.writer.lock().await;
        debug!("Reopening serial link: {} -> {}", link.active, settings);

        if let Some(mut old) = writer.take() {
            old.close().await?;
        }
        *reader = None;

        let (new_reader, new_writer) = link.transport.open(settings).await?;
        *reader = Some(new_reader);
        *writer = Some(new_writer);
        link.active = settings;
        Ok(())
    }

    /// Flush and drop both halves.
    async fn close_link(&self) -> Result<(), EbyteError> {
        let _link = self.link.lock().await;
        let old = self.writer.lock().await.take();
        *self.reader.lock().await = None;
        if let Some(mut writer) = old {
            writer.close().await?;
        }
        Ok(())
    }

    /// Settle the edge's action; a `Read` edge becomes a background read on
    /// `reads`, any other edge releases the waiters at once.
    fn on_busy_edge(self: &Arc<Self>, edge: BusyEdge, reads: &mut JoinSet<()>) {
        let action = {
            let mut state = lock(&self.edge);
            let action = state.action;
            if matches!(action, Action::Write | Action::ModeSwitch) {
                state.action = Action::Read;
                if let Some(ack) = state.ack.take() {
                    let _ = ack.send(());
                }
            }
            action
        };
        debug!(
            "AUX rising edge ({:?} after event) while {action:?}",
            edge.timestamp.elapsed()
        );

        if action == Action::Read {
            let shared = self.clone();
            reads.spawn(async move {
                shared.background_read().await;
                shared.release_waiters();
            });
        } else {
            self.release_waiters();
        }
    }

    async fn background_read(&self) {
        match self.read_once().await {
            Ok(data) => match self.callback.get() {
                Some(callback) => callback(Ok(data)),
                None => debug!("Dropping {} inbound bytes, no callback registered", data.len()),
            },
            Err(e) if e.is_idle() => debug!("Background read found the link idle: {e}"),
            Err(e) => {
                if lock(&self.read_errors).allow() {
                    warn!("Background read failed: {e}");
                }
                if let Some(callback) = self.callback.get() {
                    callback(Err(e));
                }
            }
        }
    }
}

async fn run_coordinator<T: SerialTransport, L: ControlLines>(
    shared: Arc<Shared<T, L>>,
    mut edges: mpsc::UnboundedReceiver<BusyEdge>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut reads = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Edge coordinator received shutdown signal");
                break;
            }

            edge = edges.recv() => match edge {
                Some(edge) => shared.on_busy_edge(edge, &mut reads),
                None => {
                    debug!("Edge queue closed");
                    break;
                }
            },

            Some(done) = reads.join_next(), if !reads.is_empty() => {
                if let Err(e) = done {
                    warn!("Background read task failed: {e}");
                }
            }
        }
    }
    reads.shutdown().await;
}

/// Hardware handler for one module: transport, control lines and the busy-line
/// coordinator.
pub struct HwHandler<T: SerialTransport, L: ControlLines> {
    shared: Arc<Shared<T, L>>,
    busy: AsyncMutex<()>,
    coordinator: Mutex<Option<Coordinator>>,
}

impl<T: SerialTransport, L: ControlLines> HwHandler<T, L> {
    /// Open `transport` with `config.serial`, subscribe to busy-line edges and
    /// start the coordinator.
    ///
    /// Returns after the power-on settle time, ready for reads, writes and mode
    /// switches.
    pub async fn new(mut transport: T, mut lines: L, config: &DeviceConfig) -> Result<Self, EbyteError> {
        let (reader, writer) = transport.open(config.serial).await?;

        let (edge_tx, edge_rx) = mpsc::unbounded_channel();
        lines.watch_busy_edges(edge_tx)?;

        let shared = Arc::new(Shared {
            link: AsyncMutex::new(Link {
                transport,
                active: config.serial,
            }),
            reader: AsyncMutex::new(Some(reader)),
            writer: AsyncMutex::new(Some(writer)),
            lines: Mutex::new(lines),
            edge: Mutex::new(EdgeState {
                action: Action::PowerReset,
                ack: None,
            }),
            waiters: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
            staged: Mutex::new(config.serial),
            callback: OnceCell::new(),
            read_errors: Mutex::new(LogThrottle::new(1000, 5)),
            timing: config.timing,
            read_buffer_size: config.read_buffer_size,
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_coordinator(shared.clone(), edge_rx, shutdown_rx));

        sleep(config.timing.power_on_settle).await;
        shared.set_action(Action::Read);
        info!("Module link open at {}", config.serial);

        Ok(Self {
            shared,
            busy: AsyncMutex::new(()),
            coordinator: Mutex::new(Some(Coordinator {
                shutdown: shutdown_tx,
                task,
            })),
        })
    }

    /// Write `data` once the module is free, waiting for its acknowledgement
    /// edge and the post-write settle time.
    pub async fn write_serial(&self, data: &[u8]) -> Result<(), EbyteError> {
        let _busy = self.busy.lock().await;
        self.shared.wait_busy_free().await?;

        let ack = self.shared.arm(Action::Write);
        if let Err(e) = self.shared.write_transport(data).await {
            self.shared.disarm();
            return Err(e);
        }
        self.shared.await_ack(ack, TimeoutKind::WriteAck).await?;

        sleep(self.shared.timing.write_settle).await;
        Ok(())
    }

    /// Switch the module to `target`.
    ///
    /// Entering sleep moves the link to 9600 8N1; leaving it restores the staged
    /// settings. The transport is reopened only when the link settings change.
    pub async fn set_mode(&self, target: ChipMode) -> Result<(), EbyteError> {
        let current = self.mode()?;
        if current == target {
            return Ok(());
        }
        let _busy = self.busy.lock().await;

        let settings = if target == ChipMode::Sleep {
            SerialSettings::COMMAND_MODE
        } else {
            self.staged_serial_settings()
        };
        self.shared.apply_serial_settings(settings).await?;
        self.shared.wait_busy_free().await?;

        let ack = self.shared.arm(Action::ModeSwitch);
        let (m0, m1) = target.line_levels();
        let driven = lock(&self.shared.lines).set_mode_levels(m0, m1);
        if let Err(e) = driven {
            self.shared.disarm();
            return Err(e);
        }
        self.shared.await_ack(ack, TimeoutKind::ModeSwitchAck).await?;

        sleep(self.shared.timing.mode_settle).await;
        debug!("Chip mode {current} -> {target}");
        Ok(())
    }

    /// One bounded read returning exactly the bytes received.
    pub async fn read_serial(&self) -> Result<Vec<u8>, EbyteError> {
        self.shared.read_once().await
    }

    pub fn mode(&self) -> Result<ChipMode, EbyteError> {
        let (m0, m1) = lock(&self.shared.lines).mode_levels()?;
        ChipMode::from_line_levels(m0, m1)
    }

    /// Register the inbound message callback; only one registration is allowed.
    pub fn register_message_callback(&self, callback: RawMessageCallback) -> Result<(), EbyteError> {
        self.shared
            .callback
            .set(callback)
            .map_err(|_| EbyteError::DuplicateCallback)
    }

    pub fn stage_serial_settings(&self, settings: SerialSettings) {
        debug!("Staging serial settings {settings}");
        *lock(&self.shared.staged) = settings;
    }

    /// Settings applied whenever the module is not asleep.
    pub fn staged_serial_settings(&self) -> SerialSettings {
        *lock(&self.shared.staged)
    }

    /// Settings the transport is currently open with.
    pub async fn active_serial_settings(&self) -> SerialSettings {
        self.shared.link.lock().await.active
    }

    /// Stop the coordinator, release the control lines and close the transport.
    pub async fn close(&self) -> Result<(), EbyteError> {
        let coordinator = lock(&self.coordinator).take();
        if let Some(Coordinator { shutdown, task }) = coordinator {
            let _ = shutdown.send(());
            if let Err(e) = task.await {
                warn!("Edge coordinator ended abnormally: {e}");
            }
        }

        let released = lock(&self.shared.lines).release();
        released?;
        self.shared.close_link().await?;
        info!("Module link closed");
        Ok(())
    }
}

#[cfg(feature = "raspberry-pi")]
impl HwHandler<TokioSerialTransport, RaspberryPiLines> {
    /// Wire the handler to the Raspberry Pi UART and BCM GPIO lines named in
    /// `config`.
    pub async fn open_raspberry_pi(config: &DeviceConfig) -> Result<Self, EbyteError> {
        config.validate()?;
        let lines = RaspberryPiLines::new(config.pins)?;
        let transport = TokioSerialTransport::new(&config.serial_port);
        Self::new(transport, lines, config).await
    }
}

#[async_trait]
impl<T: SerialTransport, L: ControlLines> ModuleHardware for HwHandler<T, L> {
    async fn read_serial(&self) -> Result<Vec<u8>, EbyteError> {
        HwHandler::read_serial(self).await
    }

    async fn write_serial(&self, data: &[u8]) -> Result<(), EbyteError> {
        HwHandler::write_serial(self, data).await
    }

    async fn set_mode(&self, mode: ChipMode) -> Result<(), EbyteError> {
        HwHandler::set_mode(self, mode).await
    }

    fn mode(&self) -> Result<ChipMode, EbyteError> {
        HwHandler::mode(self)
    }

    fn stage_serial_settings(&self, settings: SerialSettings) {
        HwHandler::stage_serial_settings(self, settings)
    }

    fn register_message_callback(&self, callback: RawMessageCallback) -> Result<(), EbyteError> {
        HwHandler::register_message_callback(self, callback)
    }
}
