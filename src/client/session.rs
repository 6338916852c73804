//! Session driver: request ids plus one call per operation.
//!
//! The request id counter lives here rather than in any global. It starts
//! at a random value and advances after every completed call; a call that
//! fails at the transport level reuses its id on the next attempt.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::codec::{Operation, Reply, Request};
use crate::core::{Day, HourMinutes};

use super::client::{BookingClient, ClientError};
use super::watch::{PushedUpdate, WatchSummary};

/// A sequence of requests sharing one id counter.
#[derive(Debug)]
pub struct Session {
    client: BookingClient,
    next_request_id: u32,
}

impl Session {
    /// Start a session with a random first request id.
    pub fn new(client: BookingClient) -> Self {
        Self::with_first_id(client, rand::random())
    }

    /// Start a session with a known first request id.
    pub fn with_first_id(client: BookingClient, first_request_id: u32) -> Self {
        Self {
            client,
            next_request_id: first_request_id,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &BookingClient {
        &self.client
    }

    /// Id the next request will carry.
    pub fn next_request_id(&self) -> u32 {
        self.next_request_id
    }

    fn request(&self, operation: Operation) -> Request {
        Request::new(self.next_request_id, operation)
    }

    fn advance(&mut self) {
        self.next_request_id = self.next_request_id.wrapping_add(1);
    }

    async fn call(&mut self, request: Request) -> Result<Reply, ClientError> {
        debug!(
            request_id = request.request_id,
            opcode = request.opcode().as_u32(),
            "dispatching request"
        );
        let reply = self.client.send(&request).await?;
        self.advance();
        Ok(reply)
    }

    /// Free slots of `facility`; an empty `days` asks for the whole week.
    pub async fn query_availability(
        &mut self,
        facility: &str,
        days: &[Day],
    ) -> Result<Reply, ClientError> {
        let days = if days.is_empty() {
            Day::ALL.to_vec()
        } else {
            days.to_vec()
        };
        let request = self.request(Operation::QueryAvailability {
            facility: facility.to_owned(),
            days,
        });
        self.call(request).await
    }

    /// Book `facility` on `day` between `start` and `end`.
    ///
    /// On success the reply's uid is the new booking id.
    pub async fn create_booking(
        &mut self,
        facility: &str,
        day: Day,
        start: HourMinutes,
        end: HourMinutes,
    ) -> Result<Reply, ClientError> {
        if !start.is_within_day() {
            return Err(ClientError::InvalidArgument(format!(
                "start time {start} is past the end of the day"
            )));
        }
        if end <= start {
            return Err(ClientError::InvalidArgument(format!(
                "end time {end} is not after start time {start}"
            )));
        }
        let request = self.request(Operation::CreateBooking {
            facility: facility.to_owned(),
            day,
            start,
            end,
        });
        self.call(request).await
    }

    /// Shift booking `booking_id` by `offset` minutes (may be negative).
    pub async fn modify_booking(&mut self, booking_id: u32, offset: i32) -> Result<Reply, ClientError> {
        let request = self
            .request(Operation::ModifyBooking { offset })
            .with_uid(booking_id);
        self.call(request).await
    }

    /// Extend booking `booking_id` by `minutes`.
    pub async fn extend_booking(&mut self, booking_id: u32, minutes: i32) -> Result<Reply, ClientError> {
        if minutes <= 0 {
            return Err(ClientError::InvalidArgument(format!(
                "extension must be positive, got {minutes}"
            )));
        }
        let request = self
            .request(Operation::ExtendBooking { minutes })
            .with_uid(booking_id);
        self.call(request).await
    }

    /// Capacity of `facility`.
    pub async fn query_capacity(&mut self, facility: &str) -> Result<Reply, ClientError> {
        let request = self.request(Operation::QueryCapacity {
            facility: facility.to_owned(),
        });
        self.call(request).await
    }

    /// Names of every facility.
    pub async fn list_facilities(&mut self) -> Result<Reply, ClientError> {
        let request = self.request(Operation::ListFacilities);
        self.call(request).await
    }

    /// Watch `facility` for `duration` (configured default when `None`),
    /// forwarding pushed updates to `updates`.
    ///
    /// The id advances whether or not the watch succeeds.
    pub async fn watch_facility(
        &mut self,
        facility: &str,
        duration: Option<Duration>,
        updates: mpsc::Sender<PushedUpdate>,
    ) -> Result<WatchSummary, ClientError> {
        let duration = duration.unwrap_or(self.client.config().watch_duration);
        let window_minutes = i32::try_from(duration.as_secs().div_ceil(60)).map_err(|_| {
            ClientError::InvalidArgument(format!("watch duration {duration:?} is too long"))
        })?;
        let request = self.request(Operation::RegisterWatch {
            facility: facility.to_owned(),
            window_minutes,
            // Filled in from the registration socket
            callback_port: 0,
        });
        self.advance();
        self.client.watch(request, Some(duration), updates).await
    }
}
