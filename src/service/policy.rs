//! Ticket access-control and lifecycle rules.
//!
//! Every ticket handler routes its permission decision through this module;
//! the role/status vocabulary is matched exhaustively in exactly one place.

use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{
        ticketmodel::{SupportLevel, Ticket, TicketStatus},
        usermodel::{User, UserRole},
    },
};

/// A denied action, classified the way the HTTP boundary reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The actor may not perform this action on this ticket at all.
    Forbidden(&'static str),
    /// The action exists but the ticket's lifecycle state rules it out.
    Conflict(&'static str),
    /// The request parameters contradict the role/tier vocabulary.
    Validation(&'static str),
}

impl From<PolicyError> for HttpError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Forbidden(msg) => HttpError::forbidden(msg),
            PolicyError::Conflict(msg) => HttpError::conflict(msg),
            PolicyError::Validation(msg) => HttpError::bad_request(msg),
        }
    }
}

/// The tier a ticket currently belongs to. A ticket that has not been
/// routed yet (no support level stamped) is firstline territory.
fn effective_tier(ticket: &Ticket) -> SupportLevel {
    ticket.support_level.unwrap_or(SupportLevel::Firstline)
}

fn is_assignee(actor: &User, ticket: &Ticket) -> bool {
    ticket.assigned_to == Some(actor.id)
}

pub fn can_view(actor: &User, ticket: &Ticket) -> bool {
    match actor.role {
        UserRole::Admin => true,
        UserRole::User => ticket.user_id == actor.id,
        UserRole::Firstline | UserRole::Secondline => {
            is_assignee(actor, ticket) || effective_tier(ticket).matches_role(actor.role)
        }
    }
}

pub fn ensure_view(actor: &User, ticket: &Ticket) -> Result<(), PolicyError> {
    if can_view(actor, ticket) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "Not authorized to view this ticket",
        ))
    }
}

/// Only plain users open tickets; staff and admins work them.
pub fn can_create(role: UserRole) -> bool {
    matches!(role, UserRole::User)
}

pub fn ensure_create(actor: &User) -> Result<(), PolicyError> {
    if can_create(actor.role) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden("Only users can open tickets"))
    }
}

/// Title/description/category edits: submitter only, until resolution.
pub fn ensure_update_content(actor: &User, ticket: &Ticket) -> Result<(), PolicyError> {
    if ticket.user_id != actor.id {
        Err(PolicyError::Forbidden(
            "Only the submitter can edit this ticket",
        ))
    } else if !ticket.status.is_editable() {
        Err(PolicyError::Conflict(
            "A resolved ticket can no longer be edited",
        ))
    } else {
        Ok(())
    }
}

/// The lifecycle state machine, independent of who is acting. Admins may
/// step outside of it (the re-open escape hatch); nobody else may.
pub fn transition_allowed(from: TicketStatus, to: TicketStatus) -> bool {
    match (from, to) {
        (TicketStatus::New, TicketStatus::InProgress) => true,
        (TicketStatus::InProgress, TicketStatus::Escalated) => true,
        (TicketStatus::InProgress, TicketStatus::Resolved) => true,
        (TicketStatus::Escalated, TicketStatus::InProgress) => true,
        (TicketStatus::Escalated, TicketStatus::Resolved) => true,
        _ => false,
    }
}

pub fn ensure_status_change(
    actor: &User,
    ticket: &Ticket,
    to: TicketStatus,
) -> Result<(), PolicyError> {
    match actor.role {
        UserRole::Admin => Ok(()),
        UserRole::Firstline | UserRole::Secondline => {
            if !is_assignee(actor, ticket) {
                return Err(PolicyError::Forbidden(
                    "Only the assigned support staff can update ticket status",
                ));
            }
            if ticket.status == TicketStatus::Resolved {
                return Err(PolicyError::Conflict(
                    "A resolved ticket can only be re-opened by an admin",
                ));
            }
            if !matches!(to, TicketStatus::InProgress | TicketStatus::Resolved) {
                return Err(PolicyError::Validation(
                    "Support staff can only set status to in_progress or resolved",
                ));
            }
            if ticket.status != to && !transition_allowed(ticket.status, to) {
                return Err(PolicyError::Conflict(
                    "This status change is not a valid transition",
                ));
            }
            Ok(())
        }
        UserRole::User => Err(PolicyError::Forbidden(
            "Only the assigned support staff can update ticket status",
        )),
    }
}

pub fn ensure_assign(
    actor: &User,
    ticket: &Ticket,
    assignee: &User,
    level: SupportLevel,
) -> Result<(), PolicyError> {
    if !assignee.role.is_support() {
        return Err(PolicyError::Validation(
            "Assignee must be a support staff member",
        ));
    }
    if !level.matches_role(assignee.role) {
        return Err(PolicyError::Validation(
            "Assignee must be a support staff of the requested tier",
        ));
    }

    match actor.role {
        // Admins may assign and reassign freely, including re-opening a
        // resolved ticket onto someone's desk.
        UserRole::Admin => Ok(()),
        UserRole::Firstline | UserRole::Secondline => {
            if ticket.status == TicketStatus::Resolved {
                return Err(PolicyError::Conflict("Ticket is already resolved"));
            }
            if ticket.assigned_to.is_some() {
                return Err(PolicyError::Conflict(
                    "Ticket is already assigned. Only admin can reassign tickets",
                ));
            }
            if assignee.id != actor.id {
                return Err(PolicyError::Forbidden(
                    "Support staff can only self-assign tickets",
                ));
            }
            if !level.matches_role(actor.role) {
                return Err(PolicyError::Validation(
                    "Support level must match your role",
                ));
            }
            if effective_tier(ticket) != level {
                return Err(PolicyError::Conflict(
                    "This ticket is handled by the other support tier",
                ));
            }
            Ok(())
        }
        UserRole::User => Err(PolicyError::Forbidden(
            "Users cannot assign tickets",
        )),
    }
}

/// Escalation hands an in-progress firstline ticket to the second tier:
/// status becomes `escalated`, the support level flips, and the assignee
/// is cleared so secondline staff can claim it.
pub fn ensure_escalate(actor: &User, ticket: &Ticket) -> Result<(), PolicyError> {
    match actor.role {
        UserRole::Admin | UserRole::Firstline => {
            if actor.role == UserRole::Firstline && !is_assignee(actor, ticket) {
                return Err(PolicyError::Forbidden(
                    "Only the handling support staff can escalate this ticket",
                ));
            }
            if effective_tier(ticket) == SupportLevel::Secondline {
                return Err(PolicyError::Conflict(
                    "Ticket has already been escalated to the second tier",
                ));
            }
            if ticket.status != TicketStatus::InProgress {
                return Err(PolicyError::Conflict(
                    "Only a ticket in progress can be escalated",
                ));
            }
            Ok(())
        }
        UserRole::Secondline => Err(PolicyError::Conflict(
            "There is no tier above secondline to escalate to",
        )),
        UserRole::User => Err(PolicyError::Forbidden(
            "Only support staff can escalate tickets",
        )),
    }
}

/// Submitter, assignee and admin may comment; support staff with no stake
/// in the ticket may not.
pub fn ensure_comment(actor: &User, ticket: &Ticket) -> Result<(), PolicyError> {
    let allowed = match actor.role {
        UserRole::Admin => true,
        UserRole::User => ticket.user_id == actor.id,
        UserRole::Firstline | UserRole::Secondline => is_assignee(actor, ticket),
    };

    if allowed {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "Not authorized to comment on this ticket",
        ))
    }
}

pub fn ensure_delete(actor: &User, ticket: &Ticket) -> Result<(), PolicyError> {
    if actor.role == UserRole::Admin || ticket.user_id == actor.id {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "Not authorized to delete this ticket",
        ))
    }
}

/// What slice of the ticket collection an actor's listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketScope {
    All,
    Submitter(Uuid),
    Tier(SupportLevel, Uuid),
}

pub fn list_scope(actor: &User) -> TicketScope {
    match actor.role {
        UserRole::Admin => TicketScope::All,
        UserRole::User => TicketScope::Submitter(actor.id),
        UserRole::Firstline => TicketScope::Tier(SupportLevel::Firstline, actor.id),
        UserRole::Secondline => TicketScope::Tier(SupportLevel::Secondline, actor.id),
    }
}

/// The system comment recorded when a ticket is resolved.
pub fn resolution_note(role: UserRole) -> String {
    match role {
        UserRole::Firstline | UserRole::Secondline => {
            format!("Ticket marked as resolved by {} support staff", role.to_str())
        }
        _ => "Ticket marked as resolved by admin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticketmodel::{TicketCategory, TicketPriority};
    use chrono::Utc;

    fn user_with_role(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test Person".to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password: "hashed".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ticket_of(submitter: &User) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            user_id: submitter.id,
            title: "Cannot access email".to_string(),
            description: "Password resets bounce".to_string(),
            category: TicketCategory::Account,
            status: TicketStatus::New,
            priority: TicketPriority::High,
            support_level: None,
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn assigned(mut ticket: Ticket, staff: &User) -> Ticket {
        ticket.status = TicketStatus::InProgress;
        ticket.support_level = SupportLevel::of_role(staff.role);
        ticket.assigned_to = Some(staff.id);
        ticket
    }

    #[test]
    fn submitter_admin_and_matching_tier_can_view() {
        let submitter = user_with_role(UserRole::User);
        let ticket = ticket_of(&submitter);

        assert!(can_view(&submitter, &ticket));
        assert!(can_view(&user_with_role(UserRole::Admin), &ticket));
        // unrouted tickets are firstline territory
        assert!(can_view(&user_with_role(UserRole::Firstline), &ticket));
        assert!(!can_view(&user_with_role(UserRole::Secondline), &ticket));
        assert!(!can_view(&user_with_role(UserRole::User), &ticket));
    }

    #[test]
    fn escalated_ticket_switches_viewing_tier() {
        let submitter = user_with_role(UserRole::User);
        let mut ticket = ticket_of(&submitter);
        ticket.status = TicketStatus::Escalated;
        ticket.support_level = Some(SupportLevel::Secondline);

        assert!(!can_view(&user_with_role(UserRole::Firstline), &ticket));
        assert!(can_view(&user_with_role(UserRole::Secondline), &ticket));
        assert!(can_view(&submitter, &ticket));
    }

    #[test]
    fn former_assignee_keeps_view_through_assignment_only() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let mut ticket = assigned(ticket_of(&submitter), &firstline);
        // escalation clears the assignee and flips the tier
        ticket.status = TicketStatus::Escalated;
        ticket.support_level = Some(SupportLevel::Secondline);
        ticket.assigned_to = None;

        assert!(!can_view(&firstline, &ticket));
    }

    #[test]
    fn only_users_create_tickets() {
        assert!(can_create(UserRole::User));
        assert!(!can_create(UserRole::Firstline));
        assert!(!can_create(UserRole::Secondline));
        assert!(!can_create(UserRole::Admin));
    }

    #[test]
    fn content_edits_are_submitter_only_and_stop_at_resolution() {
        let submitter = user_with_role(UserRole::User);
        let other = user_with_role(UserRole::User);
        let mut ticket = ticket_of(&submitter);

        assert!(ensure_update_content(&submitter, &ticket).is_ok());
        assert_eq!(
            ensure_update_content(&other, &ticket),
            Err(PolicyError::Forbidden(
                "Only the submitter can edit this ticket"
            ))
        );

        ticket.status = TicketStatus::Resolved;
        assert!(matches!(
            ensure_update_content(&submitter, &ticket),
            Err(PolicyError::Conflict(_))
        ));
    }

    #[test]
    fn lifecycle_transition_table() {
        use TicketStatus::*;

        assert!(transition_allowed(New, InProgress));
        assert!(transition_allowed(InProgress, Escalated));
        assert!(transition_allowed(InProgress, Resolved));
        assert!(transition_allowed(Escalated, InProgress));
        assert!(transition_allowed(Escalated, Resolved));

        assert!(!transition_allowed(New, Resolved));
        assert!(!transition_allowed(New, Escalated));
        assert!(!transition_allowed(Resolved, InProgress));
        assert!(!transition_allowed(Resolved, New));
        assert!(!transition_allowed(InProgress, New));
    }

    #[test]
    fn assignee_may_resolve_but_not_invent_states() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let ticket = assigned(ticket_of(&submitter), &firstline);

        assert!(ensure_status_change(&firstline, &ticket, TicketStatus::Resolved).is_ok());
        assert!(matches!(
            ensure_status_change(&firstline, &ticket, TicketStatus::New),
            Err(PolicyError::Validation(_))
        ));
        assert!(matches!(
            ensure_status_change(&firstline, &ticket, TicketStatus::Escalated),
            Err(PolicyError::Validation(_))
        ));
    }

    #[test]
    fn unassigned_staff_cannot_change_status() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let other_staff = user_with_role(UserRole::Firstline);
        let ticket = assigned(ticket_of(&submitter), &firstline);

        assert!(matches!(
            ensure_status_change(&other_staff, &ticket, TicketStatus::Resolved),
            Err(PolicyError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_status_change(&submitter, &ticket, TicketStatus::Resolved),
            Err(PolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn resolved_is_terminal_except_for_admin() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let mut ticket = assigned(ticket_of(&submitter), &firstline);
        ticket.status = TicketStatus::Resolved;

        assert!(matches!(
            ensure_status_change(&firstline, &ticket, TicketStatus::InProgress),
            Err(PolicyError::Conflict(_))
        ));
        assert!(ensure_status_change(
            &user_with_role(UserRole::Admin),
            &ticket,
            TicketStatus::InProgress
        )
        .is_ok());
    }

    #[test]
    fn self_assign_claims_unassigned_matching_tier() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let ticket = ticket_of(&submitter);

        assert!(ensure_assign(&firstline, &ticket, &firstline, SupportLevel::Firstline).is_ok());
    }

    #[test]
    fn self_assign_denied_when_already_assigned() {
        let submitter = user_with_role(UserRole::User);
        let holder = user_with_role(UserRole::Firstline);
        let challenger = user_with_role(UserRole::Firstline);
        let ticket = assigned(ticket_of(&submitter), &holder);

        assert_eq!(
            ensure_assign(&challenger, &ticket, &challenger, SupportLevel::Firstline),
            Err(PolicyError::Conflict(
                "Ticket is already assigned. Only admin can reassign tickets"
            ))
        );

        // admin reassignment stays possible
        let admin = user_with_role(UserRole::Admin);
        assert!(ensure_assign(&admin, &ticket, &challenger, SupportLevel::Firstline).is_ok());
    }

    #[test]
    fn staff_cannot_assign_someone_else() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let colleague = user_with_role(UserRole::Firstline);
        let ticket = ticket_of(&submitter);

        assert!(matches!(
            ensure_assign(&firstline, &ticket, &colleague, SupportLevel::Firstline),
            Err(PolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn assignment_tier_must_match_assignee_role() {
        let submitter = user_with_role(UserRole::User);
        let admin = user_with_role(UserRole::Admin);
        let firstline = user_with_role(UserRole::Firstline);
        let ticket = ticket_of(&submitter);

        assert!(matches!(
            ensure_assign(&admin, &ticket, &firstline, SupportLevel::Secondline),
            Err(PolicyError::Validation(_))
        ));
    }

    #[test]
    fn secondline_cannot_claim_firstline_territory() {
        let submitter = user_with_role(UserRole::User);
        let secondline = user_with_role(UserRole::Secondline);
        let ticket = ticket_of(&submitter);

        assert!(matches!(
            ensure_assign(&secondline, &ticket, &secondline, SupportLevel::Secondline),
            Err(PolicyError::Conflict(_))
        ));
    }

    #[test]
    fn secondline_claims_escalated_ticket() {
        let submitter = user_with_role(UserRole::User);
        let secondline = user_with_role(UserRole::Secondline);
        let mut ticket = ticket_of(&submitter);
        ticket.status = TicketStatus::Escalated;
        ticket.support_level = Some(SupportLevel::Secondline);

        assert!(ensure_assign(&secondline, &ticket, &secondline, SupportLevel::Secondline).is_ok());
    }

    #[test]
    fn escalation_requires_the_handling_firstliner() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let bystander = user_with_role(UserRole::Firstline);
        let ticket = assigned(ticket_of(&submitter), &firstline);

        assert!(ensure_escalate(&firstline, &ticket).is_ok());
        assert!(ensure_escalate(&user_with_role(UserRole::Admin), &ticket).is_ok());
        assert!(matches!(
            ensure_escalate(&bystander, &ticket),
            Err(PolicyError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_escalate(&submitter, &ticket),
            Err(PolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn escalation_only_from_in_progress_and_only_once() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let secondline = user_with_role(UserRole::Secondline);

        let fresh = ticket_of(&submitter);
        assert!(matches!(
            ensure_escalate(&user_with_role(UserRole::Admin), &fresh),
            Err(PolicyError::Conflict(_))
        ));

        let mut escalated = assigned(ticket_of(&submitter), &secondline);
        escalated.status = TicketStatus::Escalated;
        assert!(matches!(
            ensure_escalate(&user_with_role(UserRole::Admin), &escalated),
            Err(PolicyError::Conflict(_))
        ));
        assert!(matches!(
            ensure_escalate(&secondline, &escalated),
            Err(PolicyError::Conflict(_))
        ));
    }

    #[test]
    fn comments_limited_to_submitter_assignee_admin() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let unrelated_staff = user_with_role(UserRole::Secondline);
        let ticket = assigned(ticket_of(&submitter), &firstline);

        assert!(ensure_comment(&submitter, &ticket).is_ok());
        assert!(ensure_comment(&firstline, &ticket).is_ok());
        assert!(ensure_comment(&user_with_role(UserRole::Admin), &ticket).is_ok());
        assert!(matches!(
            ensure_comment(&unrelated_staff, &ticket),
            Err(PolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn submitter_still_views_and_comments_after_resolution() {
        let submitter = user_with_role(UserRole::User);
        let secondline = user_with_role(UserRole::Secondline);
        let mut ticket = assigned(ticket_of(&submitter), &secondline);
        ticket.status = TicketStatus::Resolved;

        assert!(can_view(&submitter, &ticket));
        assert!(ensure_comment(&submitter, &ticket).is_ok());
        assert!(matches!(
            ensure_status_change(&submitter, &ticket, TicketStatus::InProgress),
            Err(PolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn delete_is_submitter_or_admin() {
        let submitter = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);
        let ticket = assigned(ticket_of(&submitter), &firstline);

        assert!(ensure_delete(&submitter, &ticket).is_ok());
        assert!(ensure_delete(&user_with_role(UserRole::Admin), &ticket).is_ok());
        assert!(matches!(
            ensure_delete(&firstline, &ticket),
            Err(PolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn list_scope_follows_role() {
        let admin = user_with_role(UserRole::Admin);
        let user = user_with_role(UserRole::User);
        let firstline = user_with_role(UserRole::Firstline);

        assert_eq!(list_scope(&admin), TicketScope::All);
        assert_eq!(list_scope(&user), TicketScope::Submitter(user.id));
        assert_eq!(
            list_scope(&firstline),
            TicketScope::Tier(SupportLevel::Firstline, firstline.id)
        );
    }

    #[test]
    fn resolution_note_names_the_tier() {
        assert_eq!(
            resolution_note(UserRole::Secondline),
            "Ticket marked as resolved by secondline support staff"
        );
        assert_eq!(
            resolution_note(UserRole::Admin),
            "Ticket marked as resolved by admin"
        );
    }
}
