use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::Sender;

use async_trait::async_trait;

use crate::control_table::ControlTable;
use crate::instructions::Instruction;
use crate::keyboard::{Key, KeySource};
use crate::serial_driver::{DynamixelError, FramedDriver, Result, Status};

const RANGE_ERROR: u8 = 1 << 3;

/// A single servo answering READ/WRITE instructions from an in-memory control
/// table. Present position moves toward the goal by `speed` on every read of
/// the present position register while torque is enabled.
pub(crate) struct SimulatedServo {
    id: u8,
    table: ControlTable,
    memory: Vec<u8>,
    speed: u32,
    written_data: Sender<Vec<u8>>,
    responses: VecDeque<Status>,
}

impl SimulatedServo {
    pub(crate) fn new(
        id: u8,
        table: ControlTable,
        present: u32,
        written_data: Sender<Vec<u8>>,
    ) -> SimulatedServo {
        let mut servo = SimulatedServo {
            id,
            table,
            memory: vec![0; 256],
            speed: 250,
            written_data,
            responses: VecDeque::new(),
        };
        servo.set_position(table.goal_position, present);
        servo.set_position(table.present_position, present);
        servo
    }

    pub(crate) fn with_speed(mut self, speed: u32) -> SimulatedServo {
        self.speed = speed;
        self
    }

    fn position(&self, addr: u8) -> u32 {
        let width = self.table.position_width.bytes() as usize;
        let mut bytes = [0_u8; 4];
        bytes[..width].copy_from_slice(&self.memory[addr as usize..addr as usize + width]);
        u32::from_le_bytes(bytes)
    }

    fn set_position(&mut self, addr: u8, value: u32) {
        let width = self.table.position_width.bytes() as usize;
        self.memory[addr as usize..addr as usize + width]
            .copy_from_slice(&value.to_le_bytes()[..width]);
    }

    fn step(&mut self) {
        if self.memory[self.table.torque_enable as usize] == 0 {
            return;
        }
        let goal = self.position(self.table.goal_position);
        let present = self.position(self.table.present_position);
        let next = if goal > present {
            present + self.speed.min(goal - present)
        } else {
            present - self.speed.min(present - goal)
        };
        self.set_position(self.table.present_position, next);
    }

    fn handle(&mut self, packet: &[u8]) {
        let id = packet[2];
        if id != self.id {
            return;
        }
        let addr = packet[5] as usize;
        match packet[4] {
            0x02 => {
                let length = packet[6] as usize;
                if addr == self.table.present_position as usize {
                    self.step();
                }
                let params = self.memory[addr..addr + length].to_vec();
                self.responses.push_back(Status::new(id, 0, params));
            }
            0x03 => {
                let data = &packet[6..packet.len() - 1];
                if addr == self.table.goal_position as usize {
                    let mut bytes = [0_u8; 4];
                    bytes[..data.len()].copy_from_slice(data);
                    let goal = u32::from_le_bytes(bytes);
                    if goal > self.table.position_max as u32 {
                        self.responses.push_back(Status::new(id, RANGE_ERROR, vec![]));
                        return;
                    }
                }
                self.memory[addr..addr + data.len()].copy_from_slice(data);
                self.responses.push_back(Status::new(id, 0, vec![]));
            }
            other => panic!("unexpected instruction {:#x}", other),
        }
    }
}

#[async_trait]
impl FramedDriver for SimulatedServo {
    async fn send(&mut self, instruction: Box<dyn Instruction>) -> Result<()> {
        let payload = instruction.serialize();
        self.written_data.send(payload.clone()).unwrap();
        self.handle(&payload);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Status> {
        self.responses.pop_front().ok_or(DynamixelError::Timeout)
    }

    fn set_baud_rate(&mut self, _baud_rate: u32) -> Result<()> {
        Ok(())
    }
}

/// Replays a fixed list of key presses, then fails like a closed terminal.
pub(crate) struct ScriptedKeys {
    keys: VecDeque<Key>,
}

impl ScriptedKeys {
    pub(crate) fn new(keys: Vec<Key>) -> ScriptedKeys {
        ScriptedKeys { keys: keys.into() }
    }
}

#[async_trait(?Send)]
impl KeySource for ScriptedKeys {
    async fn next_key(&mut self) -> io::Result<Key> {
        self.keys
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more keys"))
    }
}
