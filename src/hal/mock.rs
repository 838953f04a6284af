//! Simulated module for testing
//!
//! `MockDevice` stands in for a real E22 module without hardware. It hands
//! out a `MockTransport` and a `MockLines` that share its state, answers
//! register commands in sleep mode the way the module does, and raises an AUX
//! rising edge after every acknowledged write and mode change.
//!
//! Reads return 0 bytes at once when nothing is queued. `set_pend_reads`
//! makes them wait for data instead, the way a real UART read does.

use crate::constants::{
    CMD_GET_REGISTERS, CMD_SET_REGISTERS_PERMANENT, CMD_SET_REGISTERS_TEMPORARY, FRAME_HEADER_LEN,
    REGISTER_COUNT,
};
use crate::error::EbyteError;
use crate::hal::{
    BusyEdge, ChipMode, ControlLines, EdgeSender, SerialReader, SerialSettings, SerialTransport,
    SerialWriter, LINE_HIGH, LINE_LOW,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Register contents of a module fresh from the factory
pub const FACTORY_REGISTERS: [u8; REGISTER_COUNT] = [0x00, 0x00, 0x62, 0x00, 0x12, 0x03, 0x00, 0x00];

/// Crypto registers (addresses 6 and 7) never read back
const CRYPT_START: usize = 6;

struct DeviceState {
    m0: u8,
    m1: u8,
    aux: u8,
    registers: [u8; REGISTER_COUNT],
    rx: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    opened: Vec<SerialSettings>,
    edges: Option<EdgeSender>,
    ack_writes: bool,
    ack_mode_switches: bool,
    echo_override: Option<Vec<u8>>,
    next_write_error: Option<String>,
    pend_reads: bool,
    released: bool,
    closed: bool,
}

impl DeviceState {
    fn emit_edge(&self) {
        if let Some(edges) = &self.edges {
            let _ = edges.send(BusyEdge::now());
        }
    }

    fn asleep(&self) -> bool {
        (self.m0, self.m1) == ChipMode::Sleep.line_levels()
    }

    /// Queue the module's answer to a register command.
    fn answer_register_command(&mut self, frame: &[u8]) {
        if frame.len() < FRAME_HEADER_LEN {
            return;
        }
        let (command, start, count) = (frame[0], frame[1] as usize, frame[2] as usize);
        let end = (start + count).min(REGISTER_COUNT);
        if start >= end {
            return;
        }

        match command {
            CMD_GET_REGISTERS => {}
            CMD_SET_REGISTERS_PERMANENT | CMD_SET_REGISTERS_TEMPORARY => {
                for (offset, value) in frame[FRAME_HEADER_LEN..].iter().take(end - start).enumerate() {
                    self.registers[start + offset] = *value;
                }
            }
            _ => return,
        }

        let echo = match self.echo_override.clone() {
            Some(echo) => echo,
            None => {
                let mut echo = vec![CMD_GET_REGISTERS, start as u8, (end - start) as u8];
                echo.extend((start..end).map(|addr| {
                    if addr >= CRYPT_START {
                        0
                    } else {
                        self.registers[addr]
                    }
                }));
                echo
            }
        };
        self.rx.extend(echo);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared simulated module state
#[derive(Clone)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
    rx_ready: Arc<Notify>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// A module in sleep mode, free, holding the factory registers.
    pub fn new() -> Self {
        Self::with_registers(FACTORY_REGISTERS)
    }

    pub fn with_registers(registers: [u8; REGISTER_COUNT]) -> Self {
        let (m0, m1) = ChipMode::Sleep.line_levels();
        MockDevice {
            state: Arc::new(Mutex::new(DeviceState {
                m0,
                m1,
                aux: LINE_HIGH,
                registers,
                rx: VecDeque::new(),
                writes: Vec::new(),
                opened: Vec::new(),
                edges: None,
                ack_writes: true,
                ack_mode_switches: true,
                echo_override: None,
                next_write_error: None,
                pend_reads: false,
                released: false,
                closed: false,
            })),
            rx_ready: Arc::new(Notify::new()),
        }
    }

    pub fn transport(&self) -> MockTransport {
        MockTransport {
            state: self.state.clone(),
            rx_ready: self.rx_ready.clone(),
        }
    }

    pub fn lines(&self) -> MockLines {
        MockLines {
            state: self.state.clone(),
        }
    }

    /// Drive AUX low; the module reports busy until `release_busy`.
    pub fn hold_busy(&self) {
        lock(&self.state).aux = LINE_LOW;
    }

    /// Drive AUX high and raise a rising edge.
    pub fn release_busy(&self) {
        let mut state = lock(&self.state);
        state.aux = LINE_HIGH;
        state.emit_edge();
    }

    /// Raise a rising edge without touching AUX.
    pub fn emit_edge(&self) {
        lock(&self.state).emit_edge();
    }

    /// Whether writes are acknowledged with an AUX edge.
    pub fn set_ack_writes(&self, ack: bool) {
        lock(&self.state).ack_writes = ack;
    }

    /// Whether mode changes are acknowledged with an AUX edge.
    pub fn set_ack_mode_switches(&self, ack: bool) {
        lock(&self.state).ack_mode_switches = ack;
    }

    /// Deliver bytes received over the air, announced by an AUX edge.
    pub fn inject_message(&self, data: &[u8]) {
        {
            let mut state = lock(&self.state);
            state.rx.extend(data);
            state.emit_edge();
        }
        self.rx_ready.notify_one();
    }

    /// Queue bytes for the next read without raising an edge.
    pub fn queue_rx_data(&self, data: &[u8]) {
        lock(&self.state).rx.extend(data);
        self.rx_ready.notify_one();
    }

    /// Whether a read with nothing queued waits for data instead of
    /// returning 0 bytes.
    pub fn set_pend_reads(&self, pend: bool) {
        lock(&self.state).pend_reads = pend;
        self.rx_ready.notify_one();
    }

    /// Answer register commands with `echo` instead of the register contents.
    pub fn set_echo_override(&self, echo: Option<Vec<u8>>) {
        lock(&self.state).echo_override = echo;
    }

    /// Force raw M0/M1 values, including undefined ones.
    pub fn set_line_levels(&self, m0: u8, m1: u8) {
        let mut state = lock(&self.state);
        state.m0 = m0;
        state.m1 = m1;
    }

    pub fn line_levels(&self) -> (u8, u8) {
        let state = lock(&self.state);
        (state.m0, state.m1)
    }

    pub fn set_registers(&self, registers: [u8; REGISTER_COUNT]) {
        lock(&self.state).registers = registers;
    }

    pub fn registers(&self) -> [u8; REGISTER_COUNT] {
        lock(&self.state).registers
    }

    /// Fail the next write with a transport error.
    pub fn fail_next_write(&self, message: &str) {
        lock(&self.state).next_write_error = Some(message.to_string());
    }

    /// Every write that reached the transport, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.state).writes.clone()
    }

    /// Settings of every transport open, in order.
    pub fn opened_settings(&self) -> Vec<SerialSettings> {
        lock(&self.state).opened.clone()
    }

    pub fn clear_history(&self) {
        let mut state = lock(&self.state);
        state.writes.clear();
        state.opened.clear();
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

/// Serial side of a `MockDevice`
pub struct MockTransport {
    state: Arc<Mutex<DeviceState>>,
    rx_ready: Arc<Notify>,
}

#[async_trait]
impl SerialTransport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;

    async fn open(&mut self, settings: SerialSettings) -> Result<(MockReader, MockWriter), EbyteError> {
        {
            let mut state = lock(&self.state);
            state.opened.push(settings);
            state.closed = false;
        }
        let reader = MockReader {
            state: self.state.clone(),
            rx_ready: self.rx_ready.clone(),
        };
        let writer = MockWriter {
            state: self.state.clone(),
            rx_ready: self.rx_ready.clone(),
        };
        Ok((reader, writer))
    }
}

/// Read half handed out by `MockTransport::open`
pub struct MockReader {
    state: Arc<Mutex<DeviceState>>,
    rx_ready: Arc<Notify>,
}

#[async_trait]
impl SerialReader for MockReader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, EbyteError> {
        loop {
            {
                let mut state = lock(&self.state);
                if !state.rx.is_empty() || !state.pend_reads {
                    let n = buf.len().min(state.rx.len());
                    for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
                        *slot = byte;
                    }
                    return Ok(n);
                }
            }
            self.rx_ready.notified().await;
        }
    }
}

/// Write half handed out by `MockTransport::open`
pub struct MockWriter {
    state: Arc<Mutex<DeviceState>>,
    rx_ready: Arc<Notify>,
}

#[async_trait]
impl SerialWriter for MockWriter {
    async fn write_all(&mut self, data: &[u8]) -> Result<(), EbyteError> {
        {
            let mut state = lock(&self.state);
            if let Some(message) = state.next_write_error.take() {
                return Err(EbyteError::Transport(message));
            }
            state.writes.push(data.to_vec());
            if state.asleep() {
                state.answer_register_command(data);
            }
            if state.ack_writes {
                state.emit_edge();
            }
        }
        self.rx_ready.notify_one();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EbyteError> {
        lock(&self.state).closed = true;
        Ok(())
    }
}

/// Control-line side of a `MockDevice`
pub struct MockLines {
    state: Arc<Mutex<DeviceState>>,
}

impl ControlLines for MockLines {
    fn mode_levels(&self) -> Result<(u8, u8), EbyteError> {
        let state = lock(&self.state);
        Ok((state.m0, state.m1))
    }

    fn set_mode_levels(&mut self, m0: u8, m1: u8) -> Result<(), EbyteError> {
        let mut state = lock(&self.state);
        state.m0 = m0;
        state.m1 = m1;
        if state.ack_mode_switches {
            state.emit_edge();
        }
        Ok(())
    }

    fn busy_level(&self) -> Result<u8, EbyteError> {
        Ok(lock(&self.state).aux)
    }

    fn watch_busy_edges(&mut self, edges: EdgeSender) -> Result<(), EbyteError> {
        lock(&self.state).edges = Some(edges);
        Ok(())
    }

    fn release(&mut self) -> Result<(), EbyteError> {
        let mut state = lock(&self.state);
        state.edges = None;
        state.released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn open_halves(device: &MockDevice) -> (MockReader, MockWriter) {
        device
            .transport()
            .open(SerialSettings::COMMAND_MODE)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_answered_only_in_sleep() {
        let device = MockDevice::new();
        let (mut reader, mut writer) = open_halves(&device).await;
        let mut buf = [0u8; 16];

        writer.write_all(&[0xC1, 0x00, 0x06]).await.unwrap();
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0xC1, 0x00, 0x06, 0x00, 0x00, 0x62, 0x00, 0x12, 0x03]);

        device.set_line_levels(0, 0);
        writer.write_all(&[0xC1, 0x00, 0x06]).await.unwrap();
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_stores_registers_and_hides_crypt() {
        let device = MockDevice::new();
        let (mut reader, mut writer) = open_halves(&device).await;
        let frame = [0xC0, 0x00, 0x08, 0x11, 0x22, 0x62, 0x00, 0x05, 0x80, 0xAB, 0xCD];
        writer.write_all(&frame).await.unwrap();

        assert_eq!(device.registers(), [0x11, 0x22, 0x62, 0x00, 0x05, 0x80, 0xAB, 0xCD]);
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0xC1, 0x00, 0x08, 0x11, 0x22, 0x62, 0x00, 0x05, 0x80, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn test_edges_follow_acks() {
        let device = MockDevice::new();
        let mut lines = device.lines();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        lines.watch_busy_edges(tx).unwrap();

        lines.set_mode_levels(0, 0).unwrap();
        assert!(rx.try_recv().is_ok());

        device.set_ack_mode_switches(false);
        lines.set_mode_levels(1, 1).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(device.line_levels(), (1, 1));
    }

    #[tokio::test]
    async fn test_pending_read_wakes_on_queued_data() {
        let device = MockDevice::new();
        device.set_pend_reads(true);
        let (mut reader, _writer) = open_halves(&device).await;
        let mut buf = [0u8; 8];

        let idle = tokio::time::timeout(Duration::from_millis(50), reader.read(&mut buf)).await;
        assert!(idle.is_err());

        device.queue_rx_data(b"hi");
        let n = tokio::time::timeout(Duration::from_secs(1), reader.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"hi");
    }
}
