//! Reply decoding.
//!
//! The reply's operation field is overloaded: values in the request opcode
//! range mean success and select the payload shape, values from 200 upward
//! are failure codes. [`ReplyStatus`] splits the two at the decode boundary.
//!
//! | Status | Payload |
//! |--------|---------|
//! | 101 | numDays, then per day: day byte, numSlots, then (start, end) minute pairs |
//! | 100, 102, 103, 104, 106 | empty |
//! | 105 | capacity (u32) |
//! | 107 | numFacilities, then length-prefixed names |
//! | >= 200 | empty |

use std::fmt;

use crate::core::constants::{
    STATUS_CREATED, STATUS_FAILURE_FLOOR, STATUS_INVALID_BOOKING, STATUS_UNAVAILABLE,
    STATUS_UNKNOWN_FACILITY, TIME_SLOT_WIRE_SIZE,
};
use crate::core::{Availability, CodecError, Day, HourMinutes, TimeSlot};

use super::frame::{put_prefixed, Frame, WireReader};
use super::request::Opcode;

/// Failure codes carried in the status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    /// 200: facility name not known to the server.
    UnknownFacility,
    /// 300: facility unavailable for the requested slot.
    Unavailable,
    /// 400: booking id not known to the server.
    InvalidBooking,
    /// Any other value in the failure range.
    Other(u32),
}

impl FailureCode {
    /// Map a raw status (>= 200) to a failure code.
    pub fn from_raw(code: u32) -> Self {
        match code {
            STATUS_UNKNOWN_FACILITY => Self::UnknownFacility,
            STATUS_UNAVAILABLE => Self::Unavailable,
            STATUS_INVALID_BOOKING => Self::InvalidBooking,
            other => Self::Other(other),
        }
    }

    /// Raw wire value.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::UnknownFacility => STATUS_UNKNOWN_FACILITY,
            Self::Unavailable => STATUS_UNAVAILABLE,
            Self::InvalidBooking => STATUS_INVALID_BOOKING,
            Self::Other(code) => code,
        }
    }

    /// Human meaning of the code.
    pub fn describe(self) -> &'static str {
        match self {
            Self::UnknownFacility => "invalid facility name",
            Self::Unavailable => "facility unavailable during the requested period",
            Self::InvalidBooking => "invalid booking id",
            Self::Other(_) => "request failed",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.as_u32())
    }
}

/// Typed view of the reply status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyStatus {
    /// The request succeeded; the opcode selects the payload shape.
    ///
    /// Both 100 and 102 decode to `Success(Opcode::CreateBooking)`.
    Success(Opcode),
    /// The server rejected the request.
    Failure(FailureCode),
    /// A value in neither range; no payload is parsed.
    Unrecognized(u32),
}

impl ReplyStatus {
    /// Classify a raw status value.
    pub fn from_raw(raw: u32) -> Self {
        if raw == STATUS_CREATED {
            return Self::Success(Opcode::CreateBooking);
        }
        if raw >= STATUS_FAILURE_FLOOR {
            return Self::Failure(FailureCode::from_raw(raw));
        }
        match Opcode::try_from(raw) {
            Ok(op) => Self::Success(op),
            Err(_) => Self::Unrecognized(raw),
        }
    }

    /// True for any success value.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Human meaning of the status.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Success(Opcode::QueryAvailability) => "availability retrieved",
            Self::Success(Opcode::CreateBooking) => "booking created",
            Self::Success(Opcode::ModifyBooking) => "booking modified",
            Self::Success(Opcode::RegisterWatch) => "watch registered",
            Self::Success(Opcode::QueryCapacity) => "capacity retrieved",
            Self::Success(Opcode::ExtendBooking) => "booking extended",
            Self::Success(Opcode::ListFacilities) => "facilities listed",
            Self::Failure(code) => code.describe(),
            Self::Unrecognized(_) => "unrecognized status",
        }
    }
}

/// Payload carried by a reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyBody {
    /// No payload.
    #[default]
    Empty,
    /// Availability per requested day.
    Availability(Vec<Availability>),
    /// Facility capacity.
    Capacity(u32),
    /// Facility names.
    Facilities(Vec<String>),
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Echoed request identifier.
    pub request_id: u32,
    /// Booking id (new id for a created booking).
    pub uid: u32,
    /// Typed status.
    pub status: ReplyStatus,
    /// Status exactly as it appeared on the wire.
    pub raw_status: u32,
    /// Operation-specific payload.
    pub body: ReplyBody,
}

impl Reply {
    /// Build a reply (server side of the codec).
    pub fn new(request_id: u32, uid: u32, raw_status: u32, body: ReplyBody) -> Self {
        Self {
            request_id,
            uid,
            status: ReplyStatus::from_raw(raw_status),
            raw_status,
            body,
        }
    }

    /// Decode a reply datagram or stream frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::from_frame(Frame::decode(bytes)?)
    }

    /// Interpret an already split frame.
    pub fn from_frame(frame: Frame) -> Result<Self, CodecError> {
        let raw_status = frame.header.operation;
        let status = ReplyStatus::from_raw(raw_status);

        let body = if frame.payload.is_empty() {
            ReplyBody::Empty
        } else {
            decode_body(status, &frame.payload)?
        };

        Ok(Self {
            request_id: frame.header.request_id,
            uid: frame.header.uid,
            status,
            raw_status,
            body,
        })
    }

    /// Encode this reply (server side of the codec).
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Frame::new(self.request_id, self.uid, self.raw_status, encode_body(&self.body)?)?.encode()
    }

    /// True if the status is a success value.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Failure code, if the server rejected the request.
    pub fn failure(&self) -> Option<FailureCode> {
        match self.status {
            ReplyStatus::Failure(code) => Some(code),
            _ => None,
        }
    }

    /// Capacity, for capacity replies.
    pub fn capacity(&self) -> Option<u32> {
        match self.body {
            ReplyBody::Capacity(c) => Some(c),
            _ => None,
        }
    }

    /// Facility names, for list replies.
    pub fn facility_names(&self) -> Option<&[String]> {
        match &self.body {
            ReplyBody::Facilities(names) => Some(names),
            _ => None,
        }
    }

    /// Availability, for availability replies.
    pub fn availabilities(&self) -> Option<&[Availability]> {
        match &self.body {
            ReplyBody::Availability(days) => Some(days),
            _ => None,
        }
    }

    /// The new booking id when this reply reports a created booking.
    pub fn created_booking_id(&self) -> Option<u32> {
        (self.status == ReplyStatus::Success(Opcode::CreateBooking)).then_some(self.uid)
    }
}

fn decode_body(status: ReplyStatus, payload: &[u8]) -> Result<ReplyBody, CodecError> {
    let mut reader = WireReader::new(payload);
    let body = match status {
        ReplyStatus::Success(Opcode::QueryAvailability) => {
            ReplyBody::Availability(decode_availability(&mut reader)?)
        }
        ReplyStatus::Success(Opcode::QueryCapacity) => ReplyBody::Capacity(reader.read_u32()?),
        ReplyStatus::Success(Opcode::ListFacilities) => {
            let count = reader.read_u32()? as usize;
            // Each name needs at least its length prefix
            let mut names = Vec::with_capacity(count.min(reader.remaining() / 4));
            for _ in 0..count {
                names.push(reader.read_string()?);
            }
            ReplyBody::Facilities(names)
        }
        // Everything else carries no payload fields
        _ => return Ok(ReplyBody::Empty),
    };

    if reader.remaining() != 0 {
        return Err(CodecError::PayloadLengthMismatch {
            declared: payload.len(),
            consumed: reader.position(),
        });
    }
    Ok(body)
}

fn decode_availability(reader: &mut WireReader<'_>) -> Result<Vec<Availability>, CodecError> {
    let num_days = reader.read_u32()? as usize;
    // Smallest day entry is a day byte plus an empty slot count
    let mut days = Vec::with_capacity(num_days.min(reader.remaining() / 5));
    for _ in 0..num_days {
        let day = Day::from_ascii(reader.read_u8()?)?;
        let num_slots = reader.read_u32()? as usize;
        let mut time_slots =
            Vec::with_capacity(num_slots.min(reader.remaining() / TIME_SLOT_WIRE_SIZE));
        for _ in 0..num_slots {
            let start = HourMinutes::from_minutes(reader.read_u32()?)?;
            let end = HourMinutes::from_minutes(reader.read_u32()?)?;
            time_slots.push(TimeSlot::new(start, end));
        }
        days.push(Availability { day, time_slots });
    }
    Ok(days)
}

fn encode_body(body: &ReplyBody) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    match body {
        ReplyBody::Empty => {}
        ReplyBody::Capacity(capacity) => buf.extend_from_slice(&capacity.to_be_bytes()),
        ReplyBody::Facilities(names) => {
            put_count(&mut buf, names.len())?;
            for name in names {
                put_prefixed(&mut buf, name.as_bytes())?;
            }
        }
        ReplyBody::Availability(days) => {
            put_count(&mut buf, days.len())?;
            for availability in days {
                buf.push(availability.day.to_ascii());
                put_count(&mut buf, availability.time_slots.len())?;
                for slot in &availability.time_slots {
                    buf.extend_from_slice(&slot.start.to_minutes().to_be_bytes());
                    buf.extend_from_slice(&slot.end.to_minutes().to_be_bytes());
                }
            }
        }
    }
    Ok(buf)
}

fn put_count(buf: &mut Vec<u8>, count: usize) -> Result<(), CodecError> {
    let count = u32::try_from(count).map_err(|_| CodecError::FieldTooLong(count))?;
    buf.extend_from_slice(&count.to_be_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(op: u32, uid: u32, payload: Vec<u8>) -> Vec<u8> {
        Frame::new(1, uid, op, payload).unwrap().encode().unwrap()
    }

    #[test]
    fn test_decode_capacity() {
        let reply = Reply::decode(&frame(105, 0, vec![0, 0, 0, 50])).unwrap();
        assert_eq!(reply.status, ReplyStatus::Success(Opcode::QueryCapacity));
        assert_eq!(reply.capacity(), Some(50));
        assert_eq!(reply.facility_names(), None);
        assert_eq!(reply.availabilities(), None);
    }

    #[test]
    fn test_decode_empty_payload_replies() {
        for op in [102, 103, 104, 106] {
            let reply = Reply::decode(&frame(op, 42, vec![])).unwrap();
            assert!(reply.is_success());
            assert_eq!(reply.uid, 42);
            assert_eq!(reply.body, ReplyBody::Empty);
            assert_eq!(reply.capacity(), None);
            assert_eq!(reply.facility_names(), None);
            assert_eq!(reply.availabilities(), None);
        }
    }

    #[test]
    fn test_zero_length_payload_is_never_parsed() {
        // A capacity status with no payload decodes without reading fields
        let reply = Reply::decode(&frame(105, 0, vec![])).unwrap();
        assert_eq!(reply.body, ReplyBody::Empty);
    }

    #[test]
    fn test_decode_availability() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u32.to_be_bytes());
        // Monday: two slots
        payload.push(b'0');
        payload.extend_from_slice(&2u32.to_be_bytes());
        for minutes in [0u32, 480, 720, 1439] {
            payload.extend_from_slice(&minutes.to_be_bytes());
        }
        // Tuesday: no slots
        payload.push(b'1');
        payload.extend_from_slice(&0u32.to_be_bytes());

        let reply = Reply::decode(&frame(101, 0, payload)).unwrap();
        let days = reply.availabilities().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, Day::Monday);
        assert_eq!(days[0].time_slots[0].start.as_bytes(), b"0000");
        assert_eq!(days[0].time_slots[0].end.as_bytes(), b"0800");
        assert_eq!(days[0].time_slots[1].start.as_bytes(), b"1200");
        assert_eq!(days[0].time_slots[1].end.as_bytes(), b"2359");
        assert_eq!(days[1].day, Day::Tuesday);
        assert!(days[1].time_slots.is_empty());
    }

    #[test]
    fn test_decode_facility_list() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u32.to_be_bytes());
        put_prefixed(&mut payload, b"Gym").unwrap();
        put_prefixed(&mut payload, b"Sports Field").unwrap();

        let reply = Reply::decode(&frame(107, 0, payload)).unwrap();
        assert_eq!(
            reply.facility_names().unwrap(),
            &["Gym".to_string(), "Sports Field".to_string()]
        );
    }

    #[test]
    fn test_failure_status_skips_payload() {
        // Bytes that would be a valid availability payload are not parsed
        let payload = vec![0, 0, 0, 1, b'0', 0, 0, 0, 0];
        let reply = Reply::decode(&frame(200, 0, payload)).unwrap();
        assert_eq!(reply.status, ReplyStatus::Failure(FailureCode::UnknownFacility));
        assert_eq!(reply.availabilities(), None);
        assert!(!reply.is_success());
    }

    #[test]
    fn test_failure_taxonomy() {
        assert_eq!(ReplyStatus::from_raw(200), ReplyStatus::Failure(FailureCode::UnknownFacility));
        assert_eq!(ReplyStatus::from_raw(300), ReplyStatus::Failure(FailureCode::Unavailable));
        assert_eq!(ReplyStatus::from_raw(400), ReplyStatus::Failure(FailureCode::InvalidBooking));
        assert_eq!(ReplyStatus::from_raw(500), ReplyStatus::Failure(FailureCode::Other(500)));
        assert_eq!(ReplyStatus::from_raw(150), ReplyStatus::Unrecognized(150));
        assert_eq!(FailureCode::from_raw(300).as_u32(), 300);
    }

    #[test]
    fn test_created_status_aliases() {
        let generic = Reply::decode(&frame(100, 17, vec![])).unwrap();
        let echoed = Reply::decode(&frame(102, 17, vec![])).unwrap();

        assert_eq!(generic.status, echoed.status);
        assert_eq!(generic.created_booking_id(), Some(17));
        assert_eq!(echoed.created_booking_id(), Some(17));
        // The wire value is kept as received
        assert_eq!(generic.raw_status, 100);
        assert_eq!(echoed.raw_status, 102);
    }

    #[test]
    fn test_truncated_availability_is_error() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.push(b'0');
        payload.extend_from_slice(&3u32.to_be_bytes());
        payload.extend_from_slice(&60u32.to_be_bytes());

        let err = Reply::decode(&frame(101, 0, payload)).unwrap_err();
        assert_eq!(err, CodecError::truncated(4, 0));
    }

    #[test]
    fn test_invalid_minutes_is_error() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.push(b'2');
        payload.extend_from_slice(&1u32.to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&5000u32.to_be_bytes());

        let err = Reply::decode(&frame(101, 0, payload)).unwrap_err();
        assert_eq!(err, CodecError::InvalidTime(5000));
    }

    #[test]
    fn test_capacity_trailing_bytes_is_error() {
        let err = Reply::decode(&frame(105, 0, vec![0, 0, 0, 50, 9])).unwrap_err();
        assert_eq!(
            err,
            CodecError::PayloadLengthMismatch {
                declared: 5,
                consumed: 4
            }
        );
    }

    #[test]
    fn test_server_side_encode() {
        let reply = Reply::new(
            5,
            0,
            101,
            ReplyBody::Availability(vec![Availability {
                day: Day::Sunday,
                time_slots: vec![TimeSlot::new(
                    HourMinutes::from_minutes(60).unwrap(),
                    HourMinutes::END_OF_DAY,
                )],
            }]),
        );
        let bytes = reply.encode().unwrap();
        // Minutes go out as raw binary, not ASCII
        assert_eq!(&bytes[bytes.len() - 8..], &[0, 0, 0, 60, 0, 0, 5, 160]);
        assert_eq!(Reply::decode(&bytes).unwrap(), reply);
    }
}
