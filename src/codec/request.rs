//! Request encoding.
//!
//! Each opcode carries its own payload shape; only the fields of the active
//! operation are serialized.
//!
//! | Op  | Payload |
//! |-----|---------|
//! | 101 | name, then one ASCII day byte per requested day |
//! | 102 | name, day, start `HHMM`, end `HHMM` |
//! | 103 | offset (i32 minutes) |
//! | 104 | name, offset (i32 minutes), callback port (u16) |
//! | 105 | name |
//! | 106 | offset (i32 minutes) |
//! | 107 | empty |
//!
//! `name` is a u32 length prefix followed by the raw bytes.

use crate::core::constants::{
    OP_CREATE_BOOKING, OP_EXTEND_BOOKING, OP_LIST_FACILITIES, OP_MODIFY_BOOKING,
    OP_QUERY_AVAILABILITY, OP_QUERY_CAPACITY, OP_REGISTER_WATCH,
};
use crate::core::{CodecError, Day, HourMinutes};

use super::frame::{put_prefixed, Frame, WireReader};

/// Request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Query availability (101).
    QueryAvailability = OP_QUERY_AVAILABILITY,
    /// Create booking (102).
    CreateBooking = OP_CREATE_BOOKING,
    /// Modify booking start time (103).
    ModifyBooking = OP_MODIFY_BOOKING,
    /// Register watch (104).
    RegisterWatch = OP_REGISTER_WATCH,
    /// Query capacity (105).
    QueryCapacity = OP_QUERY_CAPACITY,
    /// Extend booking (106).
    ExtendBooking = OP_EXTEND_BOOKING,
    /// List facilities (107).
    ListFacilities = OP_LIST_FACILITIES,
}

impl Opcode {
    /// Wire value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Opcode {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            OP_QUERY_AVAILABILITY => Ok(Self::QueryAvailability),
            OP_CREATE_BOOKING => Ok(Self::CreateBooking),
            OP_MODIFY_BOOKING => Ok(Self::ModifyBooking),
            OP_REGISTER_WATCH => Ok(Self::RegisterWatch),
            OP_QUERY_CAPACITY => Ok(Self::QueryCapacity),
            OP_EXTEND_BOOKING => Ok(Self::ExtendBooking),
            OP_LIST_FACILITIES => Ok(Self::ListFacilities),
            other => Err(CodecError::UnsupportedOperation(other)),
        }
    }
}

/// Operation-specific request fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Free slots of `facility` on each of `days`.
    QueryAvailability {
        /// Facility name.
        facility: String,
        /// Days to report, in request order.
        days: Vec<Day>,
    },
    /// Book `facility` on `day` from `start` to `end`.
    CreateBooking {
        /// Facility name.
        facility: String,
        /// Day of the booking.
        day: Day,
        /// Start time.
        start: HourMinutes,
        /// End time.
        end: HourMinutes,
    },
    /// Shift the booking named by the request uid by `offset` minutes.
    ModifyBooking {
        /// Signed shift in minutes.
        offset: i32,
    },
    /// Subscribe to updates on `facility`.
    RegisterWatch {
        /// Facility name.
        facility: String,
        /// Requested watch window in minutes.
        window_minutes: i32,
        /// Local TCP port the server should connect back to.
        callback_port: u16,
    },
    /// Capacity of `facility`.
    QueryCapacity {
        /// Facility name.
        facility: String,
    },
    /// Extend the booking named by the request uid by `minutes`.
    ExtendBooking {
        /// Additional minutes.
        minutes: i32,
    },
    /// Names of every facility.
    ListFacilities,
}

impl Operation {
    /// Opcode selected by this operation.
    pub fn opcode(&self) -> Opcode {
        match self {
            Operation::QueryAvailability { .. } => Opcode::QueryAvailability,
            Operation::CreateBooking { .. } => Opcode::CreateBooking,
            Operation::ModifyBooking { .. } => Opcode::ModifyBooking,
            Operation::RegisterWatch { .. } => Opcode::RegisterWatch,
            Operation::QueryCapacity { .. } => Opcode::QueryCapacity,
            Operation::ExtendBooking { .. } => Opcode::ExtendBooking,
            Operation::ListFacilities => Opcode::ListFacilities,
        }
    }

    /// Serialize the payload for this operation.
    pub fn encode_payload(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        match self {
            Operation::QueryAvailability { facility, days } => {
                put_prefixed(&mut buf, facility.as_bytes())?;
                buf.extend(days.iter().map(|d| d.to_ascii()));
            }
            Operation::CreateBooking {
                facility,
                day,
                start,
                end,
            } => {
                put_prefixed(&mut buf, facility.as_bytes())?;
                buf.push(day.to_ascii());
                buf.extend_from_slice(start.as_bytes());
                buf.extend_from_slice(end.as_bytes());
            }
            Operation::ModifyBooking { offset } => {
                buf.extend_from_slice(&offset.to_be_bytes());
            }
            Operation::RegisterWatch {
                facility,
                window_minutes,
                callback_port,
            } => {
                put_prefixed(&mut buf, facility.as_bytes())?;
                buf.extend_from_slice(&window_minutes.to_be_bytes());
                buf.extend_from_slice(&callback_port.to_be_bytes());
            }
            Operation::QueryCapacity { facility } => {
                put_prefixed(&mut buf, facility.as_bytes())?;
            }
            Operation::ExtendBooking { minutes } => {
                buf.extend_from_slice(&minutes.to_be_bytes());
            }
            Operation::ListFacilities => {}
        }
        Ok(buf)
    }

    /// Parse a payload for `opcode` (server side of the codec).
    pub fn decode_payload(opcode: Opcode, payload: &[u8]) -> Result<Self, CodecError> {
        let mut reader = WireReader::new(payload);
        let operation = match opcode {
            Opcode::QueryAvailability => {
                let facility = reader.read_string()?;
                // Day count is implied by what is left
                let days = reader
                    .read_bytes(reader.remaining())?
                    .iter()
                    .map(|&b| Day::from_ascii(b))
                    .collect::<Result<Vec<_>, _>>()?;
                Operation::QueryAvailability { facility, days }
            }
            Opcode::CreateBooking => Operation::CreateBooking {
                facility: reader.read_string()?,
                day: Day::from_ascii(reader.read_u8()?)?,
                start: HourMinutes::from_ascii(reader.read_clock()?)?,
                end: HourMinutes::from_ascii(reader.read_clock()?)?,
            },
            Opcode::ModifyBooking => Operation::ModifyBooking {
                offset: reader.read_i32()?,
            },
            Opcode::RegisterWatch => Operation::RegisterWatch {
                facility: reader.read_string()?,
                window_minutes: reader.read_i32()?,
                callback_port: reader.read_u16()?,
            },
            Opcode::QueryCapacity => Operation::QueryCapacity {
                facility: reader.read_string()?,
            },
            Opcode::ExtendBooking => Operation::ExtendBooking {
                minutes: reader.read_i32()?,
            },
            Opcode::ListFacilities => Operation::ListFacilities,
        };

        if reader.remaining() != 0 {
            return Err(CodecError::PayloadLengthMismatch {
                declared: payload.len(),
                consumed: reader.position(),
            });
        }
        Ok(operation)
    }
}

/// A request ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Caller-assigned identifier, echoed by the server.
    pub request_id: u32,
    /// Target booking id (0 if none).
    pub uid: u32,
    /// Operation and its fields.
    pub operation: Operation,
}

impl Request {
    /// Create a request with no target uid.
    pub fn new(request_id: u32, operation: Operation) -> Self {
        Self {
            request_id,
            uid: 0,
            operation,
        }
    }

    /// Set the target uid.
    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    /// Opcode of this request.
    pub fn opcode(&self) -> Opcode {
        self.operation.opcode()
    }

    /// Build the frame for this request.
    pub fn to_frame(&self) -> Result<Frame, CodecError> {
        Frame::new(
            self.request_id,
            self.uid,
            self.opcode().as_u32(),
            self.operation.encode_payload()?,
        )
    }

    /// Encode into a datagram.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        self.to_frame()?.encode()
    }

    /// Decode a request datagram (server side of the codec).
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let frame = Frame::decode(bytes)?;
        let opcode = Opcode::try_from(frame.header.operation)?;
        Ok(Self {
            request_id: frame.header.request_id,
            uid: frame.header.uid,
            operation: Operation::decode_payload(opcode, &frame.payload)?,
        })
    }
}
