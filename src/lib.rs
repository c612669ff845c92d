mod control;
mod control_table;
mod instructions;
mod keyboard;
mod serial_driver;
#[cfg(test)]
mod test_utils;

pub use control::{GoalPositions, JogController, JogSettings, PollOutcome};
pub use control_table::{ControlTable, RegisterWidth};
pub use instructions::StatusError;
pub use keyboard::{Key, KeySource, TerminalKeys};
pub use serial_driver::{DynamixelError, FramedSerialDriver, Result};

use instructions::{Instruction, ReadInstruction, WriteInstruction};
use serial_driver::{FramedDriver, Status};
use tracing::debug;

const TORQUE_ON: u8 = 1;
const TORQUE_OFF: u8 = 0;

/// Request/response session with servos on one serial bus.
pub struct DynamixelDriver {
    port: Box<dyn FramedDriver>,
}

impl DynamixelDriver {
    /// Opens `port_name` at the default 1 Mbps.
    pub fn new(port_name: &str) -> Result<DynamixelDriver> {
        Ok(DynamixelDriver {
            port: Box::new(FramedSerialDriver::new(port_name)?),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_with_connection(connection: Box<dyn FramedDriver>) -> DynamixelDriver {
        DynamixelDriver { port: connection }
    }

    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.port.set_baud_rate(baud_rate)?;
        debug!(baud_rate, "baud rate changed");
        Ok(())
    }

    async fn request(&mut self, id: u8, instruction: Box<dyn Instruction>) -> Result<Status> {
        self.port.send(instruction).await?;
        let status = self.port.receive().await?;
        if status.id() != id {
            return Err(DynamixelError::UnexpectedId {
                expected: id,
                actual: status.id(),
            });
        }
        status.check_error()?;
        Ok(status)
    }

    async fn read(&mut self, id: u8, addr: u8, length: u8) -> Result<Vec<u8>> {
        let status = self
            .request(id, Box::new(ReadInstruction::new(id, addr, length)))
            .await?;
        let params = status.params();
        if params.len() < length as usize {
            return Err(DynamixelError::MissingParams {
                expected: length as usize,
                actual: params.len(),
            });
        }
        Ok(params[..length as usize].to_vec())
    }

    pub async fn read_u8(&mut self, id: u8, addr: u8) -> Result<u8> {
        let params = self.read(id, addr, 1).await?;
        Ok(params[0])
    }

    pub async fn read_u16(&mut self, id: u8, addr: u8) -> Result<u16> {
        let params = self.read(id, addr, 2).await?;
        Ok(u16::from_le_bytes([params[0], params[1]]))
    }

    pub async fn read_u32(&mut self, id: u8, addr: u8) -> Result<u32> {
        let params = self.read(id, addr, 4).await?;
        Ok(u32::from_le_bytes([params[0], params[1], params[2], params[3]]))
    }

    pub async fn write_u8(&mut self, id: u8, addr: u8, value: u8) -> Result<()> {
        self.request(id, Box::new(WriteInstruction::with_u8(id, addr, value)))
            .await?;
        Ok(())
    }

    pub async fn write_u16(&mut self, id: u8, addr: u8, value: u16) -> Result<()> {
        self.request(id, Box::new(WriteInstruction::with_u16(id, addr, value)))
            .await?;
        Ok(())
    }

    pub async fn write_u32(&mut self, id: u8, addr: u8, value: u32) -> Result<()> {
        self.request(id, Box::new(WriteInstruction::with_u32(id, addr, value)))
            .await?;
        Ok(())
    }

    pub async fn read_register(&mut self, id: u8, addr: u8, width: RegisterWidth) -> Result<u32> {
        match width {
            RegisterWidth::Byte => Ok(self.read_u8(id, addr).await? as u32),
            RegisterWidth::Word => Ok(self.read_u16(id, addr).await? as u32),
            RegisterWidth::DoubleWord => self.read_u32(id, addr).await,
        }
    }

    /// Values wider than `width` are truncated.
    pub async fn write_register(
        &mut self,
        id: u8,
        addr: u8,
        width: RegisterWidth,
        value: u32,
    ) -> Result<()> {
        match width {
            RegisterWidth::Byte => self.write_u8(id, addr, value as u8).await,
            RegisterWidth::Word => self.write_u16(id, addr, value as u16).await,
            RegisterWidth::DoubleWord => self.write_u32(id, addr, value).await,
        }
    }

    pub async fn write_torque(
        &mut self,
        id: u8,
        table: &ControlTable,
        torque_enabled: bool,
    ) -> Result<()> {
        let value = if torque_enabled { TORQUE_ON } else { TORQUE_OFF };
        self.write_u8(id, table.torque_enable, value).await
    }

    /// Negative goals go out as two's complement, leaving the range check to the servo.
    pub async fn write_goal_position(
        &mut self,
        id: u8,
        table: &ControlTable,
        goal: i32,
    ) -> Result<()> {
        self.write_register(id, table.goal_position, table.position_width, goal as u32)
            .await
    }

    pub async fn read_present_position(&mut self, id: u8, table: &ControlTable) -> Result<u32> {
        self.read_register(id, table.present_position, table.position_width)
            .await
    }

    pub fn close(self) {
        debug!("closing port");
    }
}
