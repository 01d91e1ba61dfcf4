//! nRF24L01+ register map, SPI opcodes and bit masks.

// SPI command opcodes
pub const R_REGISTER: u8 = 0x00;
pub const W_REGISTER: u8 = 0x20;
pub const R_RX_PAYLOAD: u8 = 0x61;
pub const W_TX_PAYLOAD: u8 = 0xA0;
pub const FLUSH_TX: u8 = 0xE1;
pub const FLUSH_RX: u8 = 0xE2;
pub const NOP: u8 = 0xFF;

/// Register addresses are 5 bits wide
pub const REGISTER_MASK: u8 = 0x1F;

// Registers
pub const CONFIG: u8 = 0x00;
pub const EN_AA: u8 = 0x01;
pub const EN_RXADDR: u8 = 0x02;
pub const SETUP_AW: u8 = 0x03;
pub const SETUP_RETR: u8 = 0x04;
pub const RF_CH: u8 = 0x05;
pub const RF_SETUP: u8 = 0x06;
pub const STATUS: u8 = 0x07;
pub const RX_ADDR_P0: u8 = 0x0A;
pub const TX_ADDR: u8 = 0x10;
pub const RX_PW_P0: u8 = 0x11;
pub const FIFO_STATUS: u8 = 0x17;
pub const DYNPD: u8 = 0x1C;
pub const FEATURE: u8 = 0x1D;

// CONFIG bits
pub const CONFIG_EN_CRC: u8 = 1 << 3;
pub const CONFIG_PWR_UP: u8 = 1 << 1;
pub const CONFIG_PRIM_RX: u8 = 1 << 0;

/// CONFIG value after power-on reset (EN_CRC only)
pub const CONFIG_RESET_DEFAULT: u8 = CONFIG_EN_CRC;

// STATUS bits (write 1 to clear)
pub const STATUS_RX_DR: u8 = 1 << 6;
pub const STATUS_TX_DS: u8 = 1 << 5;
pub const STATUS_MAX_RT: u8 = 1 << 4;

// FIFO_STATUS bits
pub const FIFO_RX_EMPTY: u8 = 1 << 0;

/// SETUP_AW value for 5-byte addresses
pub const ADDRESS_WIDTH_5: u8 = 0x03;

/// RF_SETUP: 2 Mbps, 0 dBm
pub const RF_SETUP_2MBPS_0DBM: u8 = 0x0E;

/// Largest FIFO payload
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Largest multi-byte register (addresses)
pub const MAX_REGISTER_BUFFER_LEN: usize = 5;
