//! Protocol constants for the facility booking wire format.
//!
//! Opcode and status values are part of the wire contract and MUST NOT be
//! changed. Operational defaults may be overridden through
//! [`ClientConfig`](crate::client::ClientConfig).

use std::time::Duration;

// =============================================================================
// OPCODES
// =============================================================================

/// Query availability of a facility for a set of days.
pub const OP_QUERY_AVAILABILITY: u32 = 101;

/// Create a booking.
pub const OP_CREATE_BOOKING: u32 = 102;

/// Shift the start time of an existing booking.
pub const OP_MODIFY_BOOKING: u32 = 103;

/// Register a watch subscription on a facility.
pub const OP_REGISTER_WATCH: u32 = 104;

/// Query facility capacity.
pub const OP_QUERY_CAPACITY: u32 = 105;

/// Extend an existing booking.
pub const OP_EXTEND_BOOKING: u32 = 106;

/// List all facilities.
pub const OP_LIST_FACILITIES: u32 = 107;

// =============================================================================
// REPLY STATUS CODES
// =============================================================================

/// Generic "booking created" success indicator.
///
/// Some server paths report a created booking with this value instead of
/// echoing [`OP_CREATE_BOOKING`].
pub const STATUS_CREATED: u32 = 100;

/// First value of the failure range.
pub const STATUS_FAILURE_FLOOR: u32 = 200;

/// Unknown facility name.
pub const STATUS_UNKNOWN_FACILITY: u32 = 200;

/// Facility unavailable for the requested slot.
pub const STATUS_UNAVAILABLE: u32 = 300;

/// Invalid or unknown booking identifier.
pub const STATUS_INVALID_BOOKING: u32 = 400;

// =============================================================================
// FRAME SIZES
// =============================================================================

/// Envelope size: requestId + uid + operation + payloadLength.
pub const FRAME_HEADER_SIZE: usize = 16;

/// Largest UDP payload that fits in a single IPv4 datagram.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Literal acknowledgment datagram.
pub const ACK_PAYLOAD: &[u8; 3] = b"ACK";

/// Size of a single time slot on the wire (two u32 minute counts).
pub const TIME_SLOT_WIRE_SIZE: usize = 8;

// =============================================================================
// CLOCK
// =============================================================================

/// Minutes in a day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Last minute of the day (23:59).
pub const LAST_MINUTE: u32 = MINUTES_PER_DAY - 1;

// =============================================================================
// OPERATIONAL DEFAULTS
// =============================================================================

/// Default server address.
pub const DEFAULT_SERVER_ADDR: &str = "localhost:3000";

/// Default timeout for one request attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Whether to wait for an `ACK` before awaiting the reply.
pub const DEFAULT_USE_ACK: bool = true;

/// Default number of retransmissions after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default watch duration.
pub const DEFAULT_WATCH_DURATION: Duration = Duration::from_secs(10 * 60);

/// Default timeout for the watch registration round-trip.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Divisor applied to the request timeout to derive the ACK-phase deadline.
pub const ACK_TIMEOUT_DIVISOR: u32 = 3;

/// Capacity of the pushed-update channel handed out by the session driver.
pub const UPDATE_CHANNEL_CAPACITY: usize = 64;
