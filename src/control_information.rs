use core::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    MasterSlave,
    SlaveMaster,
}

/// M-Bus control information.
///
/// Meters that push DLMS over M-Bus split long telegrams into segments and mark
/// the last one; the frame assembler only uses this for diagnostics, since the
/// reassembly itself runs until the buffer is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInformation {
    Segmented { segment: u8, last_segment: bool },
    Unsegmented { header: HeaderType, direction: Direction },
}

impl TryFrom<u8> for ControlInformation {
    type Error = u8;

    fn try_from(control_information: u8) -> Result<Self, Self::Error> {
        use {Direction::*, HeaderType::*};

        Ok(match control_information {
            0x00..=0x1f => {
                let segment = control_information & 0b1111;
                let last_segment = (control_information & 0b10000) != 0;

                Self::Segmented { segment, last_segment }
            }
            0x60 => Self::Unsegmented { header: Long, direction: MasterSlave },
            0x61 => Self::Unsegmented { header: Short, direction: MasterSlave },
            0x7c => Self::Unsegmented { header: Long, direction: SlaveMaster },
            0x7d => Self::Unsegmented { header: Short, direction: SlaveMaster },
            _ => return Err(control_information),
        })
    }
}
