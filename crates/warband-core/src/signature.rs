//! Canonical assignment signatures.
//!
//! The signature is the dedup and idempotence key for the role broadcast
//! protocol: the leader rebroadcasts until every peer has acknowledged the
//! *signature*, and followers acknowledge each distinct signature exactly
//! once. Object identity is meaningless across processes, so equality is
//! defined over a canonical serialization of the role-relevant fields.
//!
//! Member lists are sorted before serialization: two assignments that name
//! the same people in a different order are the same assignment.

use warband_types::{AgentName, Assignment, TargetId};

/// Compute the canonical signature of an assignment's role-relevant fields.
///
/// Deterministic across processes: field order is fixed by construction
/// and member lists are sorted. Two assignments with equal signatures are
/// identical for ack-tracking purposes.
pub fn signature_of(assignment: &Assignment) -> String {
    let mut crab: Vec<&str> = assignment.crab.iter().map(AgentName::as_str).collect();
    crab.sort_unstable();
    let mut monsterhunt: Vec<&str> = assignment
        .monsterhunt
        .iter()
        .map(AgentName::as_str)
        .collect();
    monsterhunt.sort_unstable();

    let canonical = serde_json::json!([
        assignment.mode.as_str(),
        crab,
        monsterhunt,
        assignment.hunt_target.as_ref().map(TargetId::as_str),
        assignment.world_event.as_ref().map(|e| e.name.as_str()),
        assignment.hunt_rally_point,
        assignment.focus_ally,
        assignment.regroup,
        assignment.task_key,
    ]);
    canonical.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use warband_types::AssignmentMode;

    #[test]
    fn member_order_does_not_change_the_signature() {
        let mut a = Assignment::empty(AssignmentMode::Default);
        a.monsterhunt = vec![AgentName::from("Wulfric"), AgentName::from("Aelric")];

        let mut b = a.clone();
        b.monsterhunt.reverse();

        assert_eq!(signature_of(&a), signature_of(&b));
    }

    #[test]
    fn role_changes_change_the_signature() {
        let a = Assignment::empty(AssignmentMode::Default);

        let mut b = a.clone();
        b.crab = vec![AgentName::from("Fletch")];
        assert_ne!(signature_of(&a), signature_of(&b));

        let mut c = a.clone();
        c.hunt_target = Some(TargetId::from("ogre"));
        assert_ne!(signature_of(&a), signature_of(&c));
    }

    #[test]
    fn mode_changes_change_the_signature() {
        let a = Assignment::empty(AssignmentMode::Default);
        let b = Assignment::empty(AssignmentMode::RegroupTracker);
        assert_ne!(signature_of(&a), signature_of(&b));
    }
}
