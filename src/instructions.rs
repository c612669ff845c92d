#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct StatusError {
    instruction_error: bool,
    overload_error: bool,
    checksum_error: bool,
    range_error: bool,
    overheating_error: bool,
    angle_limit_error: bool,
    input_voltage_error: bool,
}

impl StatusError {
    pub(crate) fn check_error(flag: u8) -> Result<(), StatusError> {
        if flag == 0 {
            return Ok(());
        }
        Err(StatusError {
            input_voltage_error: flag & (1 << 0) != 0,
            angle_limit_error: flag & (1 << 1) != 0,
            overheating_error: flag & (1 << 2) != 0,
            range_error: flag & (1 << 3) != 0,
            checksum_error: flag & (1 << 4) != 0,
            overload_error: flag & (1 << 5) != 0,
            instruction_error: flag & (1 << 6) != 0,
        })
    }

    /// Goal or parameter outside the range the servo accepts.
    pub fn is_range_error(&self) -> bool {
        self.range_error
    }
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut description = String::new();
        if self.input_voltage_error {
            description.push_str("input_voltage_error ");
        }
        if self.angle_limit_error {
            description.push_str("angle_limit_error ");
        }
        if self.overheating_error {
            description.push_str("overheating_error ");
        }
        if self.range_error {
            description.push_str("range_error ");
        }
        if self.checksum_error {
            description.push_str("checksum_error ");
        }
        if self.overload_error {
            description.push_str("overload_error ");
        }
        if self.instruction_error {
            description.push_str("instruction_error ");
        }
        write!(f, "{}", description)
    }
}

pub(crate) const HEADER: [u8; 2] = [0xFF, 0xFF];

const READ_DATA: u8 = 0x02;
const WRITE_DATA: u8 = 0x03;

pub(crate) fn calc_checksum(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for b in payload {
        sum = sum.wrapping_add(*b);
    }
    !sum
}

pub(crate) trait Instruction: Send {
    fn serialize(&self) -> Vec<u8>;
}

pub(crate) struct ReadInstruction {
    id: u8,
    addr: u8,
    length: u8,
}

impl ReadInstruction {
    pub(crate) fn new(id: u8, addr: u8, length: u8) -> ReadInstruction {
        ReadInstruction { id, addr, length }
    }
}

impl Instruction for ReadInstruction {
    fn serialize(&self) -> Vec<u8> {
        let mut data = vec![
            HEADER[0],
            HEADER[1],
            self.id, // ID
            0x04,    // Len
            READ_DATA,
            self.addr,
            self.length,
        ];
        let checksum = calc_checksum(&data[2..]);
        data.push(checksum);
        data
    }
}

pub(crate) struct WriteInstruction {
    id: u8,
    addr: u8,
    payload: Vec<u8>,
}

impl WriteInstruction {
    pub(crate) fn with_u8(id: u8, addr: u8, data: u8) -> WriteInstruction {
        WriteInstruction {
            id,
            addr,
            payload: vec![data],
        }
    }

    pub(crate) fn with_u16(id: u8, addr: u8, data: u16) -> WriteInstruction {
        WriteInstruction {
            id,
            addr,
            payload: data.to_le_bytes().to_vec(),
        }
    }

    pub(crate) fn with_u32(id: u8, addr: u8, data: u32) -> WriteInstruction {
        WriteInstruction {
            id,
            addr,
            payload: data.to_le_bytes().to_vec(),
        }
    }
}

impl Instruction for WriteInstruction {
    fn serialize(&self) -> Vec<u8> {
        let len = (self.payload.len() + 3) as u8;
        let mut data = vec![
            HEADER[0],
            HEADER[1],
            self.id, // ID
            len,     // Length
            WRITE_DATA,
            self.addr,
        ];
        data.extend(self.payload.iter());
        let checksum = calc_checksum(&data[2..]);
        data.push(checksum);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_instruction_serialization() {
        let read = ReadInstruction::new(1, 43, 1);
        let payload = read.serialize();
        let expected = vec![0xFF_u8, 0xFF, 0x01, 0x04, 0x02, 0x2B, 0x01, 0xCC];
        assert_eq!(payload, expected);
    }

    #[test]
    fn read_present_position_serialization() {
        let read = ReadInstruction::new(1, 36, 4);
        let payload = read.serialize();
        assert_eq!(payload, vec![0xFF, 0xFF, 0x01, 0x04, 0x02, 0x24, 0x04, 0xD0]);
    }

    #[test]
    fn write_instruction_serialization_u8() {
        let write = WriteInstruction::with_u8(0xFE, 0x03, 1);
        let payload = write.serialize();
        let expected = vec![0xFF, 0xFF, 0xFE, 0x04, 0x03, 0x03, 0x01, 0xF6];
        assert_eq!(payload, expected);
    }

    #[test]
    fn write_instruction_serialization_u16() {
        let write = WriteInstruction::with_u16(1, 30, 150);
        assert_eq!(write.serialize(), vec![255, 255, 1, 5, 3, 30, 150, 0, 66]);
    }

    #[test]
    fn write_instruction_serialization_u32() {
        let write = WriteInstruction::with_u32(1, 30, 110);
        assert_eq!(
            write.serialize(),
            vec![0xFF, 0xFF, 0x01, 0x07, 0x03, 0x1E, 0x6E, 0x00, 0x00, 0x00, 0x68]
        );
    }

    #[test]
    fn negative_goal_is_sent_as_twos_complement() {
        let write = WriteInstruction::with_u32(1, 30, -90_i32 as u32);
        let payload = write.serialize();
        assert_eq!(&payload[6..10], &[0xA6, 0xFF, 0xFF, 0xFF]);
        assert_eq!(*payload.last().unwrap(), calc_checksum(&payload[2..10]));
    }

    #[test]
    fn status_error_flags() {
        assert_eq!(StatusError::check_error(0), Ok(()));
        let cases = [
            (0b0000_0001, "input_voltage_error "),
            (0b0000_0010, "angle_limit_error "),
            (0b0000_0100, "overheating_error "),
            (0b0000_1000, "range_error "),
            (0b0001_0000, "checksum_error "),
            (0b0010_0000, "overload_error "),
            (0b0100_0000, "instruction_error "),
        ];
        for (flag, expected) in cases {
            let error = StatusError::check_error(flag).unwrap_err();
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn status_error_lists_every_flag() {
        let error = StatusError::check_error(0b0010_1000).unwrap_err();
        assert!(error.is_range_error());
        assert_eq!(error.to_string(), "range_error overload_error ");
    }
}
