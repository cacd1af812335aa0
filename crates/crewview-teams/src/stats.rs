//! Summary counters over a set of teams.

use crate::types::{TaskStatus, Team, TeamStats};

/// Reduce teams into counters. Pure and deterministic.
///
/// A pending task with blockers counts in both `pending_tasks` and
/// `blocked_tasks`.
pub fn compute_stats(teams: &[Team]) -> TeamStats {
    let mut stats = TeamStats {
        total_teams: teams.len(),
        ..TeamStats::default()
    };

    for team in teams {
        stats.total_agents += team.member_count();
        stats.total_tasks += team.tasks.len();

        for task in &team.tasks {
            match task.status {
                TaskStatus::Pending => stats.pending_tasks += 1,
                TaskStatus::InProgress => stats.in_progress_tasks += 1,
                TaskStatus::Completed => stats.completed_tasks += 1,
                TaskStatus::Deleted => stats.deleted_tasks += 1,
                TaskStatus::Unknown => {}
            }
            if task.is_blocked() {
                stats.blocked_tasks += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Task;
    use serde_json::{Map, json};

    fn task(status: TaskStatus, blocked_by: &[&str]) -> Task {
        Task {
            id: "t".to_string(),
            subject: "s".to_string(),
            status,
            created_at: None,
            owner: None,
            blocked_by: blocked_by.iter().map(|s| s.to_string()).collect(),
            extra: Map::new(),
        }
    }

    fn team(name: &str, members: usize, tasks: Vec<Task>) -> Team {
        let members: Vec<_> = (0..members)
            .map(|i| json!({ "name": format!("m{i}"), "role": "worker" }))
            .collect();
        Team {
            name: name.to_string(),
            config: json!({ "members": members }),
            tasks,
            last_updated: String::new(),
        }
    }

    #[test]
    fn test_alpha_scenario() {
        let teams = vec![team(
            "alpha",
            2,
            vec![
                task(TaskStatus::Completed, &[]),
                task(TaskStatus::Completed, &[]),
                task(TaskStatus::InProgress, &[]),
            ],
        )];
        let stats = compute_stats(&teams);
        assert_eq!(stats.total_teams, 1);
        assert_eq!(stats.total_agents, 2);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.pending_tasks, 0);
    }

    #[test]
    fn test_blocked_overlays_pending() {
        let teams = vec![team(
            "b",
            0,
            vec![
                task(TaskStatus::Pending, &["1"]),
                task(TaskStatus::Pending, &[]),
                task(TaskStatus::Completed, &["1"]),
            ],
        )];
        let stats = compute_stats(&teams);
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.blocked_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
    }

    #[test]
    fn test_multiple_teams_and_idempotence() {
        let teams = vec![
            team("a", 3, vec![task(TaskStatus::Deleted, &[])]),
            team("b", 1, vec![task(TaskStatus::Pending, &[])]),
        ];
        let first = compute_stats(&teams);
        assert_eq!(first.total_teams, 2);
        assert_eq!(first.total_agents, 4);
        assert_eq!(first.deleted_tasks, 1);
        assert_eq!(first, compute_stats(&teams));
    }

    #[test]
    fn test_empty() {
        assert_eq!(compute_stats(&[]), TeamStats::default());
    }
}
