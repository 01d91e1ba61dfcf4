//! Trait abstraction for the transceiver's SPI bus and chip-enable line,
//! so the register layer can be tested without hardware.

use async_trait::async_trait;
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::io;
use tracing::{debug, info};

/// Trait for SPI transceiver I/O
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpiTransport: Send {
    /// Open the bus and attach the device if not already done; drive
    /// chip-enable low. Must be safe to call repeatedly.
    async fn init(&mut self) -> io::Result<()>;

    /// Full-duplex transaction; `rx` has the same length as `tx`
    async fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()>;

    /// Drive the chip-enable line
    async fn set_chip_enable(&mut self, high: bool) -> io::Result<()>;
}

/// Where the transceiver is wired on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiSettings {
    /// SPI bus index (`/dev/spidevB.x`)
    pub bus: u8,
    /// Chip-select index (`/dev/spidevx.S`)
    pub slave_select: u8,
    /// SCK frequency
    pub clock_hz: u32,
    /// BCM GPIO number of the CE line
    pub ce_pin: u8,
}

/// `rppal`-backed transport for Linux single-board computers
pub struct RppalTransport {
    settings: SpiSettings,
    spi: Option<Spi>,
    ce: Option<OutputPin>,
}

impl std::fmt::Debug for RppalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RppalTransport")
            .field("settings", &self.settings)
            .field("bus_open", &self.spi.is_some())
            .field("ce_attached", &self.ce.is_some())
            .finish()
    }
}

impl RppalTransport {
    pub fn new(settings: SpiSettings) -> Self {
        Self { settings, spi: None, ce: None }
    }

    fn open_spi(settings: &SpiSettings) -> io::Result<Spi> {
        let bus = match settings.bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            3 => Bus::Spi3,
            4 => Bus::Spi4,
            5 => Bus::Spi5,
            6 => Bus::Spi6,
            other => {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("no SPI bus {}", other)))
            }
        };
        let slave_select = match settings.slave_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("no chip select {}", other)))
            }
        };

        Spi::new(bus, slave_select, settings.clock_hz, Mode::Mode0)
            .map_err(|e| io::Error::other(format!("Failed to open SPI{}.{}: {}", settings.bus, settings.slave_select, e)))
    }

    fn attach_ce(pin: u8) -> io::Result<OutputPin> {
        let gpio = Gpio::new().map_err(|e| io::Error::other(format!("GPIO unavailable: {}", e)))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| io::Error::other(format!("CE pin {} unavailable: {}", pin, e)))?;
        Ok(pin.into_output_low())
    }
}

#[async_trait]
impl SpiTransport for RppalTransport {
    async fn init(&mut self) -> io::Result<()> {
        if self.spi.is_none() {
            self.spi = Some(Self::open_spi(&self.settings)?);
            info!(
                "Opened SPI{}.{} at {} Hz",
                self.settings.bus, self.settings.slave_select, self.settings.clock_hz
            );
        }

        match self.ce.as_mut() {
            Some(ce) => ce.set_low(),
            None => {
                self.ce = Some(Self::attach_ce(self.settings.ce_pin)?);
                debug!("CE attached on GPIO{}", self.settings.ce_pin);
            }
        }

        Ok(())
    }

    async fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        let spi = self
            .spi
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "SPI bus not initialized"))?;

        spi.transfer(rx, tx)
            .map_err(|e| io::Error::other(format!("SPI transfer failed: {}", e)))?;
        Ok(())
    }

    async fn set_chip_enable(&mut self, high: bool) -> io::Result<()> {
        let ce = self
            .ce
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "CE pin not attached"))?;

        if high {
            ce.set_high();
        } else {
            ce.set_low();
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod mocks {
    //! Register-level fake of an nRF24L01+ for driving the link layer in tests.

    use super::*;
    use crate::radio::registers::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One recorded bus interaction
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum BusOp {
        Init,
        Transfer(Vec<u8>),
        ChipEnable(bool),
    }

    impl BusOp {
        /// Opcode of a transfer, if this is one
        pub fn opcode(&self) -> Option<u8> {
            match self {
                BusOp::Transfer(bytes) => bytes.first().copied(),
                _ => None,
            }
        }
    }

    struct FakeState {
        registers: [u8; 32],
        tx_addr: [u8; 5],
        rx_addr_p0: [u8; 5],
        irq: u8,
        rx_fifo: VecDeque<[u8; MAX_PAYLOAD_LEN]>,
        pending_rx: VecDeque<(Option<u8>, [u8; MAX_PAYLOAD_LEN])>,
        tx_fifo: VecDeque<Vec<u8>>,
        transmitted: Vec<(u8, Vec<u8>)>,
        ops: Vec<BusOp>,
        fail_opcode: Option<u8>,
        report_max_rt: bool,
        floating: Option<u8>,
        stuck_rx: Option<[u8; MAX_PAYLOAD_LEN]>,
    }

    impl Default for FakeState {
        fn default() -> Self {
            let mut registers = [0u8; 32];
            registers[CONFIG as usize] = CONFIG_RESET_DEFAULT;
            registers[RF_CH as usize] = 2;
            Self {
                registers,
                tx_addr: [0xE7; 5],
                rx_addr_p0: [0xE7; 5],
                irq: 0,
                rx_fifo: VecDeque::new(),
                pending_rx: VecDeque::new(),
                tx_fifo: VecDeque::new(),
                transmitted: Vec::new(),
                ops: Vec::new(),
                fail_opcode: None,
                report_max_rt: false,
                floating: None,
                stuck_rx: None,
            }
        }
    }

    impl FakeState {
        fn rx_empty(&self) -> bool {
            self.stuck_rx.is_none() && self.rx_fifo.is_empty()
        }

        fn status(&self) -> u8 {
            // RX_P_NO reads 0b111 while the RX FIFO is empty
            let pipe = if self.rx_empty() { 0x0E } else { 0x00 };
            let stuck = if self.stuck_rx.is_some() { STATUS_RX_DR } else { 0 };
            self.irq | stuck | pipe
        }

        fn read_register(&self, reg: u8, out: &mut [u8]) {
            match reg {
                TX_ADDR => copy_prefix(&self.tx_addr, out),
                RX_ADDR_P0 => copy_prefix(&self.rx_addr_p0, out),
                STATUS => out.iter_mut().for_each(|b| *b = self.status()),
                FIFO_STATUS => {
                    let mut value = 0u8;
                    if self.rx_empty() {
                        value |= FIFO_RX_EMPTY;
                    }
                    if self.tx_fifo.is_empty() {
                        value |= 1 << 4;
                    }
                    out.iter_mut().for_each(|b| *b = value);
                }
                _ => out.iter_mut().for_each(|b| *b = self.registers[reg as usize]),
            }
        }

        fn write_register(&mut self, reg: u8, data: &[u8]) {
            match reg {
                TX_ADDR => copy_prefix(data, &mut self.tx_addr),
                RX_ADDR_P0 => copy_prefix(data, &mut self.rx_addr_p0),
                STATUS => {
                    if let Some(&value) = data.first() {
                        self.irq &= !(value & (STATUS_RX_DR | STATUS_TX_DS | STATUS_MAX_RT));
                    }
                }
                _ => {
                    if let Some(&value) = data.first() {
                        self.registers[reg as usize] = value;
                    }
                }
            }
        }

        fn on_chip_enable(&mut self) {
            let config = self.registers[CONFIG as usize];
            if config & CONFIG_PWR_UP == 0 {
                return;
            }

            let channel = self.registers[RF_CH as usize];
            if config & CONFIG_PRIM_RX != 0 {
                let mut kept = VecDeque::new();
                while let Some((filter, payload)) = self.pending_rx.pop_front() {
                    let on_channel = filter.map_or(true, |ch| ch == channel);
                    if on_channel && self.rx_fifo.len() < 3 {
                        self.rx_fifo.push_back(payload);
                    } else {
                        kept.push_back((filter, payload));
                    }
                }
                self.pending_rx = kept;
                if !self.rx_fifo.is_empty() {
                    self.irq |= STATUS_RX_DR;
                }
            } else if let Some(payload) = self.tx_fifo.pop_front() {
                self.transmitted.push((channel, payload));
                self.irq |= if self.report_max_rt { STATUS_MAX_RT } else { STATUS_TX_DS };
            }
        }
    }

    fn copy_prefix(src: &[u8], dst: &mut [u8]) {
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
    }

    /// Fake nRF24L01+ transport. Clones share state, so a test can keep one
    /// handle while the radio session owns another.
    #[derive(Clone, Default)]
    pub struct FakeNrf24 {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeNrf24 {
        pub fn new() -> Self {
            Self::default()
        }

        /// A bus with nothing attached: every byte reads back as `level`
        pub fn floating(level: u8) -> Self {
            let fake = Self::new();
            fake.state.lock().unwrap().floating = Some(level);
            fake
        }

        /// Queue a payload the radio will hear when listening on `channel`
        /// (any channel when `None`)
        pub fn inject_rx(&self, channel: Option<u8>, data: &[u8]) {
            let mut payload = [0u8; MAX_PAYLOAD_LEN];
            copy_prefix(data, &mut payload);
            self.state.lock().unwrap().pending_rx.push_back((channel, payload));
        }

        pub fn pending_rx_len(&self) -> usize {
            self.state.lock().unwrap().pending_rx.len()
        }

        /// A receiver that never drains: RX_DR stays raised, the FIFO never
        /// reports empty and every payload read returns `data`
        pub fn set_stuck_rx(&self, data: &[u8]) {
            let mut payload = [0u8; MAX_PAYLOAD_LEN];
            copy_prefix(data, &mut payload);
            self.state.lock().unwrap().stuck_rx = Some(payload);
        }

        /// Interrupt flags currently latched in STATUS
        pub fn irq_flags(&self) -> u8 {
            self.state.lock().unwrap().irq
        }

        /// Make every transfer with this opcode fail
        pub fn fail_on_opcode(&self, opcode: u8) {
            self.state.lock().unwrap().fail_opcode = Some(opcode);
        }

        /// Report MAX_RT instead of TX_DS after each transmission
        pub fn set_report_max_rt(&self, value: bool) {
            self.state.lock().unwrap().report_max_rt = value;
        }

        pub fn set_register(&self, reg: u8, value: u8) {
            self.state.lock().unwrap().registers[reg as usize] = value;
        }

        pub fn register(&self, reg: u8) -> u8 {
            self.state.lock().unwrap().registers[reg as usize]
        }

        pub fn tx_addr(&self) -> [u8; 5] {
            self.state.lock().unwrap().tx_addr
        }

        pub fn rx_addr_p0(&self) -> [u8; 5] {
            self.state.lock().unwrap().rx_addr_p0
        }

        /// Payloads that left the antenna, with the channel they went out on
        pub fn transmitted(&self) -> Vec<(u8, Vec<u8>)> {
            self.state.lock().unwrap().transmitted.clone()
        }

        pub fn ops(&self) -> Vec<BusOp> {
            self.state.lock().unwrap().ops.clone()
        }

        pub fn chip_enabled(&self) -> bool {
            self.state
                .lock()
                .unwrap()
                .ops
                .iter()
                .rev()
                .find_map(|op| match op {
                    BusOp::ChipEnable(level) => Some(*level),
                    _ => None,
                })
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl SpiTransport for FakeNrf24 {
        async fn init(&mut self) -> io::Result<()> {
            self.state.lock().unwrap().ops.push(BusOp::Init);
            Ok(())
        }

        async fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            state.ops.push(BusOp::Transfer(tx.to_vec()));

            let opcode = match tx.first() {
                Some(&op) => op,
                None => return Ok(()),
            };
            if state.fail_opcode == Some(opcode) {
                return Err(io::Error::other("Mock transfer error"));
            }
            if let Some(level) = state.floating {
                rx.iter_mut().for_each(|b| *b = level);
                return Ok(());
            }

            rx[0] = state.status();
            let (tx_body, rx_body) = (&tx[1..], &mut rx[1..]);

            match opcode {
                R_RX_PAYLOAD => {
                    let payload = match state.stuck_rx {
                        Some(payload) => payload,
                        None => state.rx_fifo.pop_front().unwrap_or([0u8; MAX_PAYLOAD_LEN]),
                    };
                    copy_prefix(&payload, rx_body);
                }
                W_TX_PAYLOAD => state.tx_fifo.push_back(tx_body.to_vec()),
                FLUSH_TX => state.tx_fifo.clear(),
                FLUSH_RX => state.rx_fifo.clear(),
                NOP => {}
                op if op & 0xE0 == W_REGISTER => state.write_register(op & REGISTER_MASK, tx_body),
                op if op & 0xE0 == R_REGISTER => state.read_register(op & REGISTER_MASK, rx_body),
                _ => {}
            }

            Ok(())
        }

        async fn set_chip_enable(&mut self, high: bool) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            state.ops.push(BusOp::ChipEnable(high));
            if high {
                state.on_chip_enable();
            }
            Ok(())
        }
    }
}
