//! Admin dashboard rollups.
//!
//! The store hands over raw counts; this module shapes them into the
//! response block. `total` is derived from the per-status counts so the
//! figures cannot drift apart between two queries of a moving collection.

use crate::{
    dtos::ticketdtos::{SupportTierStats, TicketStatsData},
    models::ticketmodel::{CategoryCount, PriorityCount, StatusCounts},
};

pub struct SupportCounts {
    pub firstline_staff: i64,
    pub secondline_staff: i64,
}

pub fn assemble(
    status: StatusCounts,
    support: SupportCounts,
    mut categories: Vec<CategoryCount>,
    mut priorities: Vec<PriorityCount>,
) -> TicketStatsData {
    categories.sort_by(|a, b| b.count.cmp(&a.count));
    priorities.sort_by(|a, b| b.count.cmp(&a.count));

    TicketStatsData {
        total: status.new + status.in_progress + status.escalated + status.resolved,
        new: status.new,
        in_progress: status.in_progress,
        escalated: status.escalated,
        resolved: status.resolved,
        support: SupportTierStats {
            total: support.firstline_staff + support.secondline_staff,
            firstline: support.firstline_staff,
            secondline: support.secondline_staff,
            resolved: status.resolved,
            escalated: status.escalated,
        },
        categories,
        priorities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticketmodel::{TicketCategory, TicketPriority};

    #[test]
    fn total_is_the_sum_of_status_counts() {
        let data = assemble(
            StatusCounts {
                new: 4,
                in_progress: 3,
                escalated: 2,
                resolved: 7,
            },
            SupportCounts {
                firstline_staff: 5,
                secondline_staff: 2,
            },
            vec![],
            vec![],
        );

        assert_eq!(data.total, 16);
        assert_eq!(
            data.new + data.in_progress + data.escalated + data.resolved,
            data.total
        );
        assert_eq!(data.support.total, 7);
        assert_eq!(data.support.resolved, 7);
        assert_eq!(data.support.escalated, 2);
    }

    #[test]
    fn empty_collection_yields_zeroes_not_errors() {
        let data = assemble(
            StatusCounts::default(),
            SupportCounts {
                firstline_staff: 0,
                secondline_staff: 0,
            },
            vec![],
            vec![],
        );
        assert_eq!(data.total, 0);
        assert!(data.categories.is_empty());
    }

    #[test]
    fn distributions_come_back_most_common_first() {
        let data = assemble(
            StatusCounts::default(),
            SupportCounts {
                firstline_staff: 0,
                secondline_staff: 0,
            },
            vec![
                CategoryCount {
                    category: TicketCategory::Billing,
                    count: 1,
                },
                CategoryCount {
                    category: TicketCategory::Technical,
                    count: 9,
                },
            ],
            vec![
                PriorityCount {
                    priority: TicketPriority::Low,
                    count: 2,
                },
                PriorityCount {
                    priority: TicketPriority::High,
                    count: 5,
                },
            ],
        );

        assert_eq!(data.categories[0].category, TicketCategory::Technical);
        assert_eq!(data.priorities[0].priority, TicketPriority::High);
    }
}
