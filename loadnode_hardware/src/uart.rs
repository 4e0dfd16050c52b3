use std::collections::VecDeque;
use std::time::Duration;

use loadnode_traits::{BoxError, SerialLink};
use rppal::uart::{Parity, Uart};

use crate::error::HwError;

/// Serial link on the primary UART (8N1).
pub struct UartLink {
    uart: Uart,
    pending: VecDeque<u8>,
}

impl UartLink {
    pub fn open(baud: u32) -> crate::error::Result<Self> {
        let mut uart = Uart::new(baud, Parity::None, 8, 1).map_err(|e| HwError::Uart(e.to_string()))?;
        // min_length 0 + zero timeout: reads return whatever is buffered
        uart.set_read_mode(0, Duration::ZERO)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        uart.set_write_mode(true)
            .map_err(|e| HwError::Uart(e.to_string()))?;
        tracing::info!(baud, "uart link open");
        Ok(Self {
            uart,
            pending: VecDeque::new(),
        })
    }
}

impl SerialLink for UartLink {
    fn poll_byte(&mut self) -> Result<Option<u8>, BoxError> {
        if self.pending.is_empty() {
            let mut buf = [0u8; 64];
            let n = self
                .uart
                .read(&mut buf)
                .map_err(|e| HwError::Uart(e.to_string()))?;
            self.pending.extend(&buf[..n]);
        }
        Ok(self.pending.pop_front())
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        let mut written = 0;
        while written < bytes.len() {
            let n = self
                .uart
                .write(&bytes[written..])
                .map_err(|e| HwError::Uart(e.to_string()))?;
            if n == 0 {
                return Err(Box::new(HwError::Disconnected));
            }
            written += n;
        }
        self.uart
            .drain()
            .map_err(|e| HwError::Uart(e.to_string()))?;
        Ok(())
    }
}
