// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only traffic and revenue rollups.

use crate::session::{ParkingSession, SessionStatus, outstanding_amount};
use time::OffsetDateTime;

/// The columns of a session that statistics need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFigures {
    /// Current status.
    pub status: SessionStatus,
    /// Entry time.
    pub entry_time: OffsetDateTime,
    /// Exit time, if the vehicle has left.
    pub exit_time: Option<OffsetDateTime>,
    /// Total fee.
    pub total_fee: i64,
    /// Discount amount.
    pub discount_fee: i64,
    /// Paid amount.
    pub paid_fee: i64,
}

impl From<&ParkingSession> for SessionFigures {
    fn from(session: &ParkingSession) -> Self {
        Self {
            status: session.status,
            entry_time: session.entry.time,
            exit_time: session.exit.as_ref().map(|e| e.time),
            total_fee: session.total_fee,
            discount_fee: session.discount_fee,
            paid_fee: session.paid_fee,
        }
    }
}

/// Session counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// `PENDING`.
    pub pending: u64,
    /// `PRE_SETTLED`.
    pub pre_settled: u64,
    /// `PAYMENT_PENDING`.
    pub payment_pending: u64,
    /// `COMPLETED`.
    pub completed: u64,
    /// `FORCE_COMPLETED`.
    pub force_completed: u64,
}

impl StatusCounts {
    const fn bump(&mut self, status: SessionStatus) {
        match status {
            SessionStatus::Pending => self.pending += 1,
            SessionStatus::PreSettled => self.pre_settled += 1,
            SessionStatus::PaymentPending => self.payment_pending += 1,
            SessionStatus::Completed => self.completed += 1,
            SessionStatus::ForceCompleted => self.force_completed += 1,
        }
    }
}

/// Dashboard figures for one site since `day_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteStatistics {
    /// Start of the reporting window.
    pub day_start: OffsetDateTime,
    /// Sessions that entered since `day_start`.
    pub entries: u64,
    /// Closed sessions that exited since `day_start`.
    pub exits: u64,
    /// Sessions currently active.
    pub currently_parked: u64,
    /// Paid amounts of sessions closed since `day_start`.
    pub settled_revenue: i64,
    /// Settled revenue plus what active sessions still owe.
    pub projected_revenue: i64,
    /// Status breakdown of every session counted above.
    pub by_status: StatusCounts,
}

fn exited_since(figures: &SessionFigures, day_start: OffsetDateTime) -> bool {
    figures.status.is_terminal() && figures.exit_time.is_some_and(|t| t >= day_start)
}

/// Rolls session figures up into site statistics.
///
/// Rows that neither entered nor exited since `day_start` and are not active
/// are ignored.
#[must_use]
pub fn rollup_statistics(figures: &[SessionFigures], day_start: OffsetDateTime) -> SiteStatistics {
    let mut stats = SiteStatistics {
        day_start,
        entries: 0,
        exits: 0,
        currently_parked: 0,
        settled_revenue: 0,
        projected_revenue: 0,
        by_status: StatusCounts::default(),
    };
    let mut outstanding: i64 = 0;

    for f in figures {
        let entered: bool = f.entry_time >= day_start;
        let exited: bool = exited_since(f, day_start);
        let active: bool = f.status.is_active();
        if !(entered || exited || active) {
            continue;
        }

        stats.by_status.bump(f.status);
        if entered {
            stats.entries += 1;
        }
        if exited {
            stats.exits += 1;
            stats.settled_revenue = stats.settled_revenue.saturating_add(f.paid_fee);
        }
        if active {
            stats.currently_parked += 1;
            outstanding = outstanding.saturating_add(outstanding_amount(
                f.total_fee,
                f.discount_fee,
                f.paid_fee,
            ));
        }
    }

    stats.projected_revenue = stats.settled_revenue.saturating_add(outstanding);
    stats
}
