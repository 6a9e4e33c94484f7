//! Financial goal tracking - one JSONB document array per participant.
//!
//! Goals nest sub-goals and sub-tasks. `completed_amount` is always derived
//! from the completed sub-tasks' amounts at read time; the stored value is a
//! cache, never the source of truth.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubGoal {
    #[serde(default)]
    pub sub_goal_id: String,
    pub sub_goal_name: String,
    #[serde(default)]
    pub sub_goal_description: Option<String>,
    #[serde(default)]
    pub sub_goal_amount: Option<f64>,
    #[serde(default)]
    pub sub_goal_completion_time: Option<String>,
    #[serde(default)]
    pub sub_goal_status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubTask {
    #[serde(default)]
    pub sub_task_id: String,
    pub sub_task_name: String,
    #[serde(default)]
    pub sub_task_description: Option<String>,
    #[serde(default)]
    pub sub_task_status: bool,
    #[serde(default)]
    pub sub_task_completion_time: Option<String>,
    #[serde(default)]
    pub sub_task_amount: Option<f64>,
}

/// One stored goal document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    #[serde(default)]
    pub goal_id: String,
    pub goal_name: String,
    #[serde(default)]
    pub goal_description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub expected_completion_time: Option<String>,
    #[serde(default)]
    pub target_amount: Option<f64>,
    #[serde(default)]
    pub completed_amount: f64,
    #[serde(default)]
    pub sub_goals: Vec<SubGoal>,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
}

impl Goal {
    /// Recompute `completed_amount` from completed sub-task amounts.
    pub fn refresh_completed_amount(&mut self) {
        self.completed_amount = self
            .sub_tasks
            .iter()
            .filter(|t| t.sub_task_status)
            .filter_map(|t| t.sub_task_amount)
            .sum();
    }

    /// (total, completed) sub-task counts.
    pub fn task_stats(&self) -> (usize, usize) {
        let total = self.sub_tasks.len();
        let completed = self.sub_tasks.iter().filter(|t| t.sub_task_status).count();
        (total, completed)
    }
}

/// Basic-info projection of a goal: sub-tasks reduced to counts.
#[derive(Debug, Serialize)]
pub struct GoalBasicInfo {
    #[serde(flatten)]
    pub goal: Goal,
    pub sub_task_num: usize,
    pub sub_task_completed_num: usize,
}

/// Goal attributes accepted from the client when replacing the list;
/// sub-goals and sub-tasks are managed through their own operations and
/// preserved across replacements.
#[derive(Debug, Clone, Deserialize)]
pub struct GoalPatch {
    #[serde(default)]
    pub goal_id: String,
    pub goal_name: String,
    #[serde(default)]
    pub goal_description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub expected_completion_time: Option<String>,
    #[serde(default)]
    pub target_amount: Option<f64>,
}

#[derive(Clone)]
pub struct GoalService {
    pool: PgPool,
}

impl GoalService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, user_id: Uuid) -> Result<Option<Vec<Goal>>> {
        let row: Option<Json<Vec<Goal>>> =
            sqlx::query_scalar("SELECT goals FROM goals WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|Json(goals)| goals))
    }

    async fn store(&self, user_id: Uuid, goals: &[Goal]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO goals (user_id, goals) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET goals = EXCLUDED.goals
            "#,
        )
        .bind(user_id)
        .bind(Json(goals))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All goals with freshly derived amounts and task counts.
    pub async fn list_basic(&self, user_id: Uuid) -> Result<Vec<GoalBasicInfo>> {
        let mut goals = self.load(user_id).await?.unwrap_or_default();
        let mut out = Vec::with_capacity(goals.len());
        for goal in &mut goals {
            goal.refresh_completed_amount();
            let (total, completed) = goal.task_stats();
            out.push(GoalBasicInfo {
                goal: goal.clone(),
                sub_task_num: total,
                sub_task_completed_num: completed,
            });
        }
        Ok(out)
    }

    /// One goal with full sub-goal/sub-task detail.
    pub async fn detail(&self, user_id: Uuid, goal_id: &str) -> Result<Option<Goal>> {
        let goals = self.load(user_id).await?.unwrap_or_default();
        Ok(goals.into_iter().find(|g| g.goal_id == goal_id).map(|mut g| {
            g.refresh_completed_amount();
            g
        }))
    }

    /// Replace the goal list from client-supplied basic attributes.
    ///
    /// Existing goals (matched by id) keep their sub-goals and sub-tasks;
    /// new goals get generated ids and empty children.
    pub async fn replace(&self, user_id: Uuid, patches: Vec<GoalPatch>) -> Result<()> {
        let existing = self.load(user_id).await?.unwrap_or_default();

        let goals: Vec<Goal> = patches
            .into_iter()
            .map(|p| {
                let goal_id = if p.goal_id.is_empty() {
                    Uuid::new_v4().to_string()
                } else {
                    p.goal_id
                };
                let previous = existing.iter().find(|g| g.goal_id == goal_id);
                let mut goal = Goal {
                    goal_id,
                    goal_name: p.goal_name,
                    goal_description: p.goal_description,
                    priority: p.priority,
                    expected_completion_time: p.expected_completion_time,
                    target_amount: p.target_amount,
                    completed_amount: 0.0,
                    sub_goals: previous.map(|g| g.sub_goals.clone()).unwrap_or_default(),
                    sub_tasks: previous.map(|g| g.sub_tasks.clone()).unwrap_or_default(),
                };
                goal.refresh_completed_amount();
                goal
            })
            .collect();

        self.store(user_id, &goals).await
    }

    /// Replace one goal's sub-goal list; `Ok(false)` when the goal is
    /// missing. Blank sub-goal ids are filled in.
    pub async fn update_sub_goals(
        &self,
        user_id: Uuid,
        goal_id: &str,
        mut sub_goals: Vec<SubGoal>,
    ) -> Result<bool> {
        let Some(mut goals) = self.load(user_id).await? else {
            return Ok(false);
        };
        let Some(goal) = goals.iter_mut().find(|g| g.goal_id == goal_id) else {
            return Ok(false);
        };
        for sg in &mut sub_goals {
            if sg.sub_goal_id.is_empty() {
                sg.sub_goal_id = Uuid::new_v4().to_string();
            }
        }
        goal.sub_goals = sub_goals;
        self.store(user_id, &goals).await?;
        Ok(true)
    }

    /// Replace one goal's sub-task list and re-derive its completed amount.
    pub async fn update_sub_tasks(
        &self,
        user_id: Uuid,
        goal_id: &str,
        mut sub_tasks: Vec<SubTask>,
    ) -> Result<bool> {
        let Some(mut goals) = self.load(user_id).await? else {
            return Ok(false);
        };
        let Some(goal) = goals.iter_mut().find(|g| g.goal_id == goal_id) else {
            return Ok(false);
        };
        for st in &mut sub_tasks {
            if st.sub_task_id.is_empty() {
                st.sub_task_id = Uuid::new_v4().to_string();
            }
        }
        goal.sub_tasks = sub_tasks;
        goal.refresh_completed_amount();
        self.store(user_id, &goals).await?;
        Ok(true)
    }

    /// Flip one sub-task's done flag; completed amount follows.
    pub async fn update_sub_task_status(
        &self,
        user_id: Uuid,
        goal_id: &str,
        sub_task_id: &str,
        done: bool,
    ) -> Result<bool> {
        let Some(mut goals) = self.load(user_id).await? else {
            return Ok(false);
        };
        let Some(goal) = goals.iter_mut().find(|g| g.goal_id == goal_id) else {
            return Ok(false);
        };
        let Some(task) = goal
            .sub_tasks
            .iter_mut()
            .find(|t| t.sub_task_id == sub_task_id)
        else {
            return Ok(false);
        };
        task.sub_task_status = done;
        goal.refresh_completed_amount();
        self.store(user_id, &goals).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, amount: f64, done: bool) -> SubTask {
        SubTask {
            sub_task_id: id.into(),
            sub_task_name: format!("task {id}"),
            sub_task_description: None,
            sub_task_status: done,
            sub_task_completion_time: None,
            sub_task_amount: Some(amount),
        }
    }

    fn goal_with_tasks(tasks: Vec<SubTask>) -> Goal {
        Goal {
            goal_id: "g1".into(),
            goal_name: "买房首付".into(),
            goal_description: None,
            priority: None,
            expected_completion_time: None,
            target_amount: Some(500_000.0),
            completed_amount: 0.0,
            sub_goals: Vec::new(),
            sub_tasks: tasks,
        }
    }

    #[test]
    fn completed_amount_derives_from_done_tasks() {
        let mut goal = goal_with_tasks(vec![
            task("t1", 1000.0, true),
            task("t2", 2000.0, false),
            task("t3", 500.0, true),
        ]);
        goal.refresh_completed_amount();
        assert_eq!(goal.completed_amount, 1500.0);
    }

    #[test]
    fn tasks_without_amount_count_as_zero() {
        let mut done_no_amount = task("t1", 0.0, true);
        done_no_amount.sub_task_amount = None;
        let mut goal = goal_with_tasks(vec![done_no_amount, task("t2", 750.0, true)]);
        goal.refresh_completed_amount();
        assert_eq!(goal.completed_amount, 750.0);
    }

    #[test]
    fn task_stats_counts_completed() {
        let goal = goal_with_tasks(vec![
            task("t1", 1.0, true),
            task("t2", 1.0, false),
            task("t3", 1.0, false),
        ]);
        assert_eq!(goal.task_stats(), (3, 1));
    }

    #[test]
    fn goal_documents_round_trip_through_json() {
        let goal = goal_with_tasks(vec![task("t1", 100.0, true)]);
        let value = serde_json::to_value(&goal).unwrap();
        let back: Goal = serde_json::from_value(value).unwrap();
        assert_eq!(back, goal);
    }

    #[test]
    fn sparse_documents_deserialize_with_defaults() {
        let goal: Goal =
            serde_json::from_value(serde_json::json!({"goal_name": "应急基金"})).unwrap();
        assert_eq!(goal.goal_id, "");
        assert_eq!(goal.completed_amount, 0.0);
        assert!(goal.sub_tasks.is_empty());
    }
}
