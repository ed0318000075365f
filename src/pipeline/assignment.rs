use crate::db::Database;
use crate::error::{CrmError, CrmResult};
use crate::models::Agent;

/// Round-robin choice: the agent after position `last`, wrapping around.
///
/// Returns the agent and the new cursor position. `last` may be -1 (nothing
/// assigned yet) or stale from a larger directory; both wrap correctly.
pub fn select_next_agent(agents: &[Agent], last: i64) -> CrmResult<(&Agent, i64)> {
    if agents.is_empty() {
        return Err(CrmError::NoEligibleAgents);
    }
    let len = agents.len() as i64;
    let next = (last + 1).rem_euclid(len);
    Ok((&agents[next as usize], next))
}

/// Pick the next agent and advance the stored cursor.
///
/// The cursor only moves through a compare-and-swap; if another writer moved
/// it first this fails with `CursorContention` and nothing is changed.
pub fn assign_next(db: &Database) -> CrmResult<Agent> {
    let agents = db.list_eligible_agents()?;
    let last = db.assignment_cursor()?;
    let (agent, next) = select_next_agent(&agents, last)?;

    if !db.compare_and_swap_cursor(last, next)? {
        return Err(CrmError::CursorContention { expected: last });
    }
    Ok(agent.clone())
}
