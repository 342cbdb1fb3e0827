// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{SessionFigures, SessionStatus, rollup_statistics};
use time::OffsetDateTime;
use time::macros::datetime;

const DAY_START: OffsetDateTime = datetime!(2025-03-01 00:00 UTC);

fn figures(
    status: SessionStatus,
    entry: OffsetDateTime,
    exit: Option<OffsetDateTime>,
    fees: (i64, i64, i64),
) -> SessionFigures {
    SessionFigures {
        status,
        entry_time: entry,
        exit_time: exit,
        total_fee: fees.0,
        discount_fee: fees.1,
        paid_fee: fees.2,
    }
}

#[test]
fn test_empty_rollup() {
    let stats = rollup_statistics(&[], DAY_START);
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.projected_revenue, 0);
    assert_eq!(stats.day_start, DAY_START);
}

#[test]
fn test_rollup_counts_and_revenue() {
    let rows = vec![
        // Entered yesterday, left today.
        figures(
            SessionStatus::Completed,
            datetime!(2025-02-28 22:00 UTC),
            Some(datetime!(2025-03-01 01:00 UTC)),
            (3000, 0, 3000),
        ),
        // Entered and left today.
        figures(
            SessionStatus::ForceCompleted,
            datetime!(2025-03-01 09:00 UTC),
            Some(datetime!(2025-03-01 09:30 UTC)),
            (1000, 0, 0),
        ),
        // Still inside from yesterday, partly discounted.
        figures(
            SessionStatus::Pending,
            datetime!(2025-02-28 18:00 UTC),
            None,
            (5000, 1000, 0),
        ),
        // Entered today, overpaid.
        figures(
            SessionStatus::PreSettled,
            datetime!(2025-03-01 10:00 UTC),
            None,
            (2000, 0, 2500),
        ),
        // Irrelevant: closed yesterday.
        figures(
            SessionStatus::Completed,
            datetime!(2025-02-27 10:00 UTC),
            Some(datetime!(2025-02-27 12:00 UTC)),
            (9999, 0, 9999),
        ),
    ];

    let stats = rollup_statistics(&rows, DAY_START);
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.exits, 2);
    assert_eq!(stats.currently_parked, 2);
    assert_eq!(stats.settled_revenue, 3000);
    assert_eq!(stats.projected_revenue, 3000 + 4000);
    assert_eq!(stats.by_status.completed, 1);
    assert_eq!(stats.by_status.force_completed, 1);
    assert_eq!(stats.by_status.pending, 1);
    assert_eq!(stats.by_status.pre_settled, 1);
    assert_eq!(stats.by_status.payment_pending, 0);
}

#[test]
fn test_rollup_saturates_revenue() {
    let rows = vec![
        figures(
            SessionStatus::Completed,
            datetime!(2025-03-01 08:00 UTC),
            Some(datetime!(2025-03-01 09:00 UTC)),
            (i64::MAX, 0, i64::MAX),
        ),
        figures(
            SessionStatus::Completed,
            datetime!(2025-03-01 08:30 UTC),
            Some(datetime!(2025-03-01 09:30 UTC)),
            (1, 0, 1),
        ),
        // Discount and payment both at the ceiling leave nothing due.
        figures(
            SessionStatus::Pending,
            datetime!(2025-03-01 10:00 UTC),
            None,
            (0, i64::MAX, i64::MAX),
        ),
        figures(
            SessionStatus::PaymentPending,
            datetime!(2025-03-01 11:00 UTC),
            None,
            (i64::MAX, 0, 0),
        ),
    ];

    let stats = rollup_statistics(&rows, DAY_START);
    assert_eq!(stats.exits, 2);
    assert_eq!(stats.currently_parked, 2);
    assert_eq!(stats.settled_revenue, i64::MAX);
    assert_eq!(stats.projected_revenue, i64::MAX);
}
