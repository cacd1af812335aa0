//! Messages pushed to WebSocket observers.

use crewview_teams::{AgentOutput, HistoryEntry, Team, TeamStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Full snapshot sent once to every new observer.
    InitialData {
        data: Vec<Team>,
        stats: TeamStats,
        #[serde(rename = "teamHistory")]
        team_history: Vec<HistoryEntry>,
        #[serde(rename = "agentOutputs")]
        agent_outputs: Vec<AgentOutput>,
    },
    TeamsUpdate {
        data: Vec<Team>,
        stats: TeamStats,
    },
    TaskUpdate {
        data: Vec<Team>,
        stats: TeamStats,
    },
    AgentOutputsUpdate {
        outputs: Vec<AgentOutput>,
    },
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::InitialData { .. } => "initial_data",
            WireMessage::TeamsUpdate { .. } => "teams_update",
            WireMessage::TaskUpdate { .. } => "task_update",
            WireMessage::AgentOutputsUpdate { .. } => "agent_outputs_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_data_shape() {
        let msg = WireMessage::InitialData {
            data: Vec::new(),
            stats: TeamStats::default(),
            team_history: Vec::new(),
            agent_outputs: Vec::new(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "initial_data");
        assert!(json["data"].is_array());
        assert!(json["teamHistory"].is_array());
        assert!(json["agentOutputs"].is_array());
        assert_eq!(json["stats"]["totalTeams"], 0);
    }

    #[test]
    fn test_update_type_tags() {
        let cases = vec![
            (
                WireMessage::TeamsUpdate {
                    data: Vec::new(),
                    stats: TeamStats::default(),
                },
                "teams_update",
            ),
            (
                WireMessage::TaskUpdate {
                    data: Vec::new(),
                    stats: TeamStats::default(),
                },
                "task_update",
            ),
            (
                WireMessage::AgentOutputsUpdate {
                    outputs: Vec::new(),
                },
                "agent_outputs_update",
            ),
        ];

        for (msg, tag) in cases {
            let json = serde_json::to_value(&msg).unwrap();
            assert_eq!(json["type"], tag);
            assert_eq!(msg.kind(), tag);
        }
    }
}
