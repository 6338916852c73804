//! Human-readable reply output.

use std::fmt::Write;

use facility_booking_client::HourMinutes;
use facility_booking_client::codec::{Reply, ReplyBody};

/// Format a reply for the terminal.
pub fn reply(reply: &Reply) -> String {
    let mut out = format!(
        "[{}] {} (status {}, request {})",
        if reply.is_success() { "ok" } else { "failed" },
        reply.status.describe(),
        reply.raw_status,
        reply.request_id,
    );

    if let Some(id) = reply.created_booking_id() {
        let _ = write!(out, "\n  Booking ID for future reference: {id}");
    }

    match &reply.body {
        ReplyBody::Empty => {}
        ReplyBody::Capacity(capacity) => {
            let _ = write!(out, "\n  Capacity: {capacity}");
        }
        ReplyBody::Facilities(names) if names.is_empty() => {
            out.push_str("\n  (no facilities)");
        }
        ReplyBody::Facilities(names) => {
            for name in names {
                let _ = write!(out, "\n  - {name}");
            }
        }
        ReplyBody::Availability(days) => {
            for availability in days {
                let _ = write!(out, "\n  {}:", availability.day);
                if availability.time_slots.is_empty() {
                    out.push_str(" no free slots");
                }
                for slot in &availability.time_slots {
                    let _ = write!(
                        out,
                        "\n    {} - {} ({} min)",
                        clock(slot.start),
                        clock(slot.end),
                        slot.duration_minutes()
                    );
                }
            }
        }
    }

    out
}

/// `HH:MM` form of a clock time.
pub fn clock(time: HourMinutes) -> String {
    format!("{:02}:{:02}", time.hours(), time.minutes())
}

#[cfg(test)]
mod tests {
    use facility_booking_client::core::{Availability, Day, TimeSlot};

    use super::*;

    fn hm(s: &str) -> HourMinutes {
        s.parse().unwrap()
    }

    #[test]
    fn test_render_created_booking() {
        let text = reply(&Reply::new(3, 1234, 100, ReplyBody::Empty));
        assert!(text.starts_with("[ok] booking created (status 100, request 3)"));
        assert!(text.contains("Booking ID for future reference: 1234"));
    }

    #[test]
    fn test_render_failure() {
        let text = reply(&Reply::new(3, 0, 300, ReplyBody::Empty));
        assert!(text.starts_with("[failed]"));
        assert!(text.contains("status 300"));
        assert!(!text.contains("Booking ID"));
    }

    #[test]
    fn test_render_availability() {
        let body = ReplyBody::Availability(vec![
            Availability {
                day: Day::Monday,
                time_slots: vec![TimeSlot::new(hm("0000"), hm("0930"))],
            },
            Availability {
                day: Day::Tuesday,
                time_slots: vec![],
            },
        ]);
        let text = reply(&Reply::new(1, 0, 101, body));
        assert!(text.contains("00:00 - 09:30 (570 min)"));
        assert!(text.contains("no free slots"));
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock(HourMinutes::END_OF_DAY), "24:00");
        assert_eq!(clock(hm("0705")), "07:05");
    }
}
