use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{Meeting, MeetingError};

/// Minimum separation between two meetings under the same scope.
pub const MIN_SPACING_MINUTES: i64 = 10;

/// How long after its start a meeting stays joinable before the sweep
/// removes it.
pub const EXPIRY_GRACE_MINUTES: i64 = 10;

pub fn min_spacing() -> Duration {
    Duration::minutes(MIN_SPACING_MINUTES)
}

/// A meeting is expired once its start lies more than the grace period in
/// the past. Expired meetings no longer count for any conflict rule.
pub fn is_expired(meeting: &Meeting, now: DateTime<Utc>) -> bool {
    now > meeting.scheduled_time + Duration::minutes(EXPIRY_GRACE_MINUTES)
}

/// Resolve the doctor's HH:MM entry against the chosen date.
pub fn combine(date: NaiveDate, time: &str) -> Result<DateTime<Utc>, MeetingError> {
    let parsed = chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| MeetingError::InvalidTime(format!("Unparseable time '{}'", time)))?;
    Ok(date.and_time(parsed).and_utc())
}

/// Create-time rules, checked against every non-expired meeting of the
/// scheduling doctor: the room id must be fresh and the new start must
/// keep the minimum spacing from every existing start.
pub fn check_create(
    existing: &[Meeting],
    room_id: &str,
    scheduled_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), MeetingError> {
    for meeting in existing.iter().filter(|m| !is_expired(m, now)) {
        if meeting.room_id == room_id {
            return Err(MeetingError::RoomIdTaken(room_id.to_string()));
        }

        if (meeting.scheduled_time - scheduled_time).abs() < min_spacing() {
            return Err(MeetingError::SpacingViolation);
        }
    }

    Ok(())
}

/// Reschedule-time rules: spacing against every other non-expired meeting
/// sharing the room id.
pub fn check_reschedule(
    existing: &[Meeting],
    meeting_id: Uuid,
    room_id: &str,
    new_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), MeetingError> {
    for meeting in existing
        .iter()
        .filter(|m| m.id != meeting_id && m.room_id == room_id && !is_expired(m, now))
    {
        if (meeting.scheduled_time - new_time).abs() < min_spacing() {
            return Err(MeetingError::SpacingViolation);
        }
    }

    Ok(())
}

/// Verify-after-write arbitration for `create`. Both racers of a
/// check-then-act pair re-read the doctor's meetings after inserting;
/// the later write yields. Returns the conflict the loser must report
/// after rolling back, or None when the insert stands.
pub fn create_race_conflict(
    ours: &Meeting,
    others: &[Meeting],
    now: DateTime<Utc>,
) -> Option<MeetingError> {
    let wrote_earlier = |m: &Meeting| {
        m.created_at < ours.created_at || (m.created_at == ours.created_at && m.id < ours.id)
    };

    let mut spacing_conflict = false;
    for m in others
        .iter()
        .filter(|m| m.id != ours.id && !is_expired(m, now))
        .filter(|m| wrote_earlier(m))
    {
        if m.room_id == ours.room_id {
            return Some(MeetingError::RoomIdTaken(ours.room_id.clone()));
        }
        if (m.scheduled_time - ours.scheduled_time).abs() < min_spacing() {
            spacing_conflict = true;
        }
    }

    spacing_conflict.then_some(MeetingError::SpacingViolation)
}

/// Verify-after-write arbitration for `reschedule`, scoped to the room.
/// The store keeps no per-update ordering, so any spacing violation seen
/// after the move makes this side restore its previous slot; if both
/// movers restore, the invariant still holds.
pub fn reschedule_race_conflict(ours: &Meeting, others: &[Meeting], now: DateTime<Utc>) -> bool {
    others
        .iter()
        .filter(|m| m.id != ours.id && m.room_id == ours.room_id && !is_expired(m, now))
        .any(|m| (m.scheduled_time - ours.scheduled_time).abs() < min_spacing())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 6, 1, 12, 0, 0).unwrap()
    }

    fn meeting(room_id: &str, scheduled_time: DateTime<Utc>) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            room_id: room_id.to_string(),
            doctor_name: "Dr. Asha Rao".to_string(),
            patient_name: "Ravi Kumar".to_string(),
            doctor_email: "asha.rao@example.com".to_string(),
            patient_email: "ravi@example.com".to_string(),
            date: scheduled_time.date_naive(),
            time: scheduled_time.format("%H:%M").to_string(),
            scheduled_time,
            created_at: now() - Duration::days(1),
        }
    }

    #[test]
    fn create_accepts_clear_schedule() {
        let existing = vec![meeting("room-a", now() + Duration::hours(2))];
        assert!(check_create(&existing, "room-b", now() + Duration::hours(4), now()).is_ok());
    }

    #[test]
    fn create_rejects_duplicate_room_id() {
        let existing = vec![meeting("room-a", now() + Duration::hours(2))];
        assert_matches!(
            check_create(&existing, "room-a", now() + Duration::hours(4), now()),
            Err(MeetingError::RoomIdTaken(_))
        );
    }

    #[test]
    fn create_rejects_meeting_too_close() {
        let existing = vec![meeting("room-a", now() + Duration::hours(2))];
        assert_matches!(
            check_create(
                &existing,
                "room-b",
                now() + Duration::hours(2) + Duration::minutes(9),
                now()
            ),
            Err(MeetingError::SpacingViolation)
        );
    }

    #[test]
    fn create_accepts_exactly_ten_minutes_apart() {
        let existing = vec![meeting("room-a", now() + Duration::hours(2))];
        assert!(check_create(
            &existing,
            "room-b",
            now() + Duration::hours(2) + Duration::minutes(10),
            now()
        )
        .is_ok());
    }

    #[test]
    fn expired_meetings_release_their_room_id() {
        // Started 21 minutes ago: past the 10-minute grace.
        let existing = vec![meeting("room-a", now() - Duration::minutes(21))];
        assert!(check_create(&existing, "room-a", now() + Duration::hours(1), now()).is_ok());
    }

    #[test]
    fn near_boundary_expiry() {
        let stale = meeting("room-a", now() - Duration::minutes(11));
        let fresh = meeting("room-b", now() - Duration::minutes(5));
        assert!(is_expired(&stale, now()));
        assert!(!is_expired(&fresh, now()));

        // Exactly at the boundary: not yet past it, so still alive.
        let boundary = meeting("room-c", now() - Duration::minutes(10));
        assert!(!is_expired(&boundary, now()));
    }

    #[test]
    fn reschedule_ignores_itself() {
        let target = meeting("room-a", now() + Duration::hours(2));
        let existing = vec![target.clone()];
        assert!(check_reschedule(
            &existing,
            target.id,
            &target.room_id,
            now() + Duration::hours(2) + Duration::minutes(5),
            now()
        )
        .is_ok());
    }

    #[test]
    fn reschedule_checks_same_room_neighbors() {
        let target = meeting("room-a", now() + Duration::hours(2));
        let neighbor = meeting("room-a", now() + Duration::hours(3));
        let existing = vec![target.clone(), neighbor.clone()];

        assert_matches!(
            check_reschedule(
                &existing,
                target.id,
                &target.room_id,
                neighbor.scheduled_time + Duration::minutes(4),
                now()
            ),
            Err(MeetingError::SpacingViolation)
        );

        // A different room is out of scope for the reschedule check.
        let other_room = meeting("room-b", now() + Duration::hours(4));
        let existing = vec![target.clone(), other_room.clone()];
        assert!(check_reschedule(
            &existing,
            target.id,
            &target.room_id,
            other_room.scheduled_time + Duration::minutes(4),
            now()
        )
        .is_ok());
    }

    #[test]
    fn combine_parses_hh_mm() {
        let instant = combine(NaiveDate::from_ymd_opt(2031, 6, 10).unwrap(), "14:30").unwrap();
        assert_eq!(instant.format("%Y-%m-%d %H:%M").to_string(), "2031-06-10 14:30");
    }

    #[test]
    fn combine_rejects_garbage() {
        assert_matches!(
            combine(NaiveDate::from_ymd_opt(2031, 6, 10).unwrap(), "half past two"),
            Err(MeetingError::InvalidTime(_))
        );
    }

    #[test]
    fn create_race_loser_is_the_later_write() {
        let mut first = meeting("room-a", now() + Duration::hours(2));
        let mut second = meeting("room-a", now() + Duration::hours(2));
        first.created_at = now() - Duration::seconds(2);
        second.created_at = now() - Duration::seconds(1);

        let scope = vec![first.clone(), second.clone()];
        assert_matches!(
            create_race_conflict(&second, &scope, now()),
            Some(MeetingError::RoomIdTaken(_))
        );
        assert!(create_race_conflict(&first, &scope, now()).is_none());
    }

    #[test]
    fn create_race_reports_spacing_when_rooms_differ() {
        let mut first = meeting("room-a", now() + Duration::hours(2));
        let mut second = meeting("room-b", now() + Duration::hours(2) + Duration::minutes(3));
        first.created_at = now() - Duration::seconds(2);
        second.created_at = now() - Duration::seconds(1);

        let scope = vec![first.clone(), second.clone()];
        assert_matches!(
            create_race_conflict(&second, &scope, now()),
            Some(MeetingError::SpacingViolation)
        );
    }

    #[test]
    fn create_race_with_no_conflict_has_no_loser() {
        let first = meeting("room-a", now() + Duration::hours(2));
        let second = meeting("room-b", now() + Duration::hours(4));
        let scope = vec![first.clone(), second.clone()];
        assert!(create_race_conflict(&second, &scope, now()).is_none());
    }

    #[test]
    fn reschedule_race_only_minds_spacing_in_room() {
        let ours = meeting("room-a", now() + Duration::hours(2));
        // Same room, well spaced: no rollback even though the room matches.
        let neighbor = meeting("room-a", now() + Duration::hours(3));
        assert!(!reschedule_race_conflict(&ours, &[ours.clone(), neighbor], now()));

        let close = meeting("room-a", now() + Duration::hours(2) + Duration::minutes(4));
        assert!(reschedule_race_conflict(&ours, &[ours.clone(), close], now()));

        // Another room is out of scope entirely.
        let other_room = meeting("room-b", now() + Duration::hours(2) + Duration::minutes(1));
        assert!(!reschedule_race_conflict(&ours, &[ours.clone(), other_room], now()));
    }
}
