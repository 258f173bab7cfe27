use crate::error::{BoardError, FieldErrors};
use crate::task::{Direction, NewTask, OwnerId, Priority, Stage, Task, TaskId};
use chrono::NaiveDate;

/// A column as the view sees it: one stage and the task ids currently in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub stage: Stage,
    pub task_ids: Vec<TaskId>,
}

/// Groups tasks into the four stage columns by their status field.
///
/// Columns are never stored; they are recomputed from the task list, so a task
/// can only ever appear under the stage its status names.
pub fn project_columns(tasks: &[Task]) -> [Column; 4] {
    Stage::ALL.map(|stage| Column {
        stage,
        task_ids: tasks
            .iter()
            .filter(|t| t.status == stage)
            .map(|t| t.id.clone())
            .collect(),
    })
}

/// An optimistic move that has been applied locally and still needs the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub task_id: TaskId,
    pub from: Stage,
    pub to: Stage,
}

#[derive(Debug, Default)]
pub struct KanbanBoard {
    /// Canonical task list. Order within a stage is display order.
    tasks: Vec<Task>,
    /// Last state the backend confirmed. Restored when a write is rejected.
    confirmed: Vec<Task>,
    pub selected_stage: usize,
    pub selected_task: usize,
    /// Set while a resync is outstanding after a failed write.
    pub resyncing: bool,
    /// `false` until the first fetch lands.
    pub loaded: bool,
}

impl KanbanBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces local state with the backend's list. Duplicate ids keep the last copy.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        let mut deduped: Vec<Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            deduped.retain(|t| t.id != task.id);
            deduped.push(task);
        }
        self.confirmed = deduped.clone();
        self.tasks = deduped;
        self.resyncing = false;
        self.loaded = true;
        self.clamp_selection();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn get_tasks_by_status(&self, status: Stage) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    pub fn columns(&self) -> [Column; 4] {
        project_columns(&self.tasks)
    }

    pub fn selected_stage(&self) -> Stage {
        Stage::from_index(self.selected_stage).unwrap_or(Stage::Review)
    }

    pub fn selected(&self) -> Option<&Task> {
        self.get_tasks_by_status(self.selected_stage())
            .get(self.selected_task)
            .copied()
    }

    /// Appends a task confirmed by the backend to the end of its column.
    pub fn insert(&mut self, task: Task) {
        self.confirmed.retain(|t| t.id != task.id);
        self.confirmed.push(task.clone());
        self.tasks.retain(|t| t.id != task.id);
        self.tasks.push(task);
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| &t.id == id)?;
        let task = self.tasks.remove(index);
        self.clamp_selection();
        Some(task)
    }

    /// Applies a move locally and returns what the backend must be told.
    ///
    /// The task leaves `from` and is appended to the adjacent column. Moving past
    /// either end, or from a column the task is not in, changes nothing.
    pub fn begin_move(
        &mut self,
        id: &TaskId,
        from: Stage,
        direction: Direction,
    ) -> Result<PlannedMove, BoardError> {
        let index = self
            .tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| BoardError::UnknownTask(id.clone()))?;
        let actual = self.tasks[index].status;
        if actual != from {
            return Err(BoardError::WrongColumn {
                id: id.clone(),
                expected: from,
                actual,
            });
        }
        let to = from.step(direction).ok_or(BoardError::AtBoundary {
            stage: from,
            direction,
        })?;

        let mut task = self.tasks.remove(index);
        task.status = to;
        self.tasks.push(task);
        Ok(PlannedMove {
            task_id: id.clone(),
            from,
            to,
        })
    }

    /// The backend accepted a move; it becomes part of the confirmed state.
    pub fn confirm_move(&mut self, planned: &PlannedMove) {
        if let Some(index) = self.confirmed.iter().position(|t| t.id == planned.task_id) {
            let mut task = self.confirmed.remove(index);
            task.status = planned.to;
            self.confirmed.push(task);
        }
    }

    pub fn confirm_removal(&mut self, id: &TaskId) {
        self.confirmed.retain(|t| &t.id != id);
    }

    /// A write failed: drops every unconfirmed local change and waits for the next fetch.
    pub fn mark_stale(&mut self) {
        self.tasks = self.confirmed.clone();
        self.resyncing = true;
        self.clamp_selection();
    }

    pub fn select_stage(&mut self, delta: isize) {
        let next = (self.selected_stage as isize + delta).clamp(0, Stage::ALL.len() as isize - 1);
        self.selected_stage = next as usize;
        self.clamp_selection();
    }

    pub fn select_task(&mut self, delta: isize) {
        let count = self.get_tasks_by_status(self.selected_stage()).len();
        if count == 0 {
            self.selected_task = 0;
            return;
        }
        let next = (self.selected_task as isize + delta).clamp(0, count as isize - 1);
        self.selected_task = next as usize;
    }

    /// Keeps the selection on the moved task so repeated moves walk it across the board.
    pub fn follow(&mut self, id: &TaskId) {
        let Some(stage) = self.get(id).map(|t| t.status) else {
            return;
        };
        let row = self
            .get_tasks_by_status(stage)
            .iter()
            .position(|t| &t.id == id);
        self.selected_stage = stage.index();
        if let Some(row) = row {
            self.selected_task = row;
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.get_tasks_by_status(self.selected_stage()).len();
        self.selected_task = self.selected_task.min(count.saturating_sub(1));
    }
}

/// Raw task form input.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: String,
    pub stage: Option<Stage>,
}

impl TaskDraft {
    pub fn validate(&self, owner_id: OwnerId) -> Result<NewTask, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert("title", "Title is required");
        }

        let due = self.due_date.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(due, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.insert("due_date", "Use YYYY-MM-DD");
                    None
                }
            }
        };

        let priority = Priority::parse(&self.priority).unwrap_or_else(|| {
            errors.insert("priority", "Use low, medium or high");
            Priority::Medium
        });

        errors.into_result(NewTask {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            status: self.stage.unwrap_or(Stage::Review),
            due_date,
            priority,
            owner_id,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn task(id: &str, status: Stage) -> Task {
        Task {
            id: TaskId::from(id),
            title: format!("deal {id}"),
            description: String::new(),
            status,
            due_date: None,
            priority: Priority::Medium,
            owner_id: OwnerId(1),
        }
    }

    fn occurrences(board: &KanbanBoard, id: &TaskId) -> Vec<Stage> {
        board
            .columns()
            .iter()
            .filter(|c| c.task_ids.contains(id))
            .map(|c| c.stage)
            .collect()
    }

    #[test]
    fn every_interior_move_lands_in_exactly_one_column() {
        for from in Stage::ALL {
            for direction in [Direction::Forward, Direction::Backward] {
                let Some(target) = from.step(direction) else {
                    continue;
                };
                let mut board = KanbanBoard::new();
                board.replace_all(vec![task("a", from), task("b", target)]);

                let id = TaskId::from("a");
                let planned = board.begin_move(&id, from, direction).unwrap();

                assert_eq!(planned.to, target);
                assert_eq!(occurrences(&board, &id), vec![target]);
                let column = &board.columns()[target.index()];
                assert_eq!(column.task_ids.last(), Some(&id));
            }
        }
    }

    #[test]
    fn boundary_move_is_refused_and_changes_nothing() {
        let mut board = KanbanBoard::new();
        board.replace_all(vec![task("a", Stage::Review), task("z", Stage::AwaitingConfirmation)]);
        let before = board.tasks().to_vec();

        let err = board
            .begin_move(&TaskId::from("a"), Stage::Review, Direction::Backward)
            .unwrap_err();
        assert!(matches!(err, BoardError::AtBoundary { .. }));
        let err = board
            .begin_move(
                &TaskId::from("z"),
                Stage::AwaitingConfirmation,
                Direction::Forward,
            )
            .unwrap_err();
        assert!(matches!(err, BoardError::AtBoundary { .. }));
        assert_eq!(board.tasks(), before.as_slice());
    }

    #[test]
    fn move_from_wrong_column_is_refused() {
        let mut board = KanbanBoard::new();
        board.replace_all(vec![task("a", Stage::InContact)]);
        let err = board
            .begin_move(&TaskId::from("a"), Stage::Review, Direction::Forward)
            .unwrap_err();
        assert_eq!(
            err,
            BoardError::WrongColumn {
                id: TaskId::from("a"),
                expected: Stage::Review,
                actual: Stage::InContact,
            }
        );
    }

    #[test]
    fn resync_after_failed_move_matches_server() {
        let server = vec![task("a", Stage::Review), task("b", Stage::InContact)];
        let mut board = KanbanBoard::new();
        board.replace_all(server.clone());

        board
            .begin_move(&TaskId::from("a"), Stage::Review, Direction::Forward)
            .unwrap();
        board.mark_stale();
        board.replace_all(server.clone());

        assert!(!board.resyncing);
        assert_eq!(board.columns(), project_columns(&server));
        for t in &server {
            assert_eq!(occurrences(&board, &t.id), vec![t.status]);
        }
    }

    #[test]
    fn rejected_move_falls_back_to_confirmed_state() {
        let server = vec![
            task("a", Stage::Review),
            task("b", Stage::InContact),
            task("c", Stage::InContact),
        ];
        let mut board = KanbanBoard::new();
        board.replace_all(server.clone());

        let accepted = board
            .begin_move(&TaskId::from("a"), Stage::Review, Direction::Forward)
            .unwrap();
        board.confirm_move(&accepted);
        board
            .begin_move(&TaskId::from("b"), Stage::InContact, Direction::Forward)
            .unwrap();
        board.remove(&TaskId::from("c"));

        board.mark_stale();

        assert!(board.resyncing);
        assert_eq!(occurrences(&board, &TaskId::from("a")), vec![Stage::InContact]);
        assert_eq!(occurrences(&board, &TaskId::from("b")), vec![Stage::InContact]);
        assert_eq!(occurrences(&board, &TaskId::from("c")), vec![Stage::InContact]);
    }

    #[test]
    fn confirmed_removal_stays_removed_after_stale() {
        let mut board = KanbanBoard::new();
        board.replace_all(vec![task("a", Stage::Review), task("b", Stage::Review)]);
        let id = TaskId::from("a");
        board.remove(&id);
        board.confirm_removal(&id);

        board.mark_stale();
        assert!(board.get(&id).is_none());
        assert_eq!(board.tasks().len(), 1);
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let mut board = KanbanBoard::new();
        board.replace_all(vec![
            task("a", Stage::Review),
            task("a", Stage::FinishingTouches),
        ]);
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(occurrences(&board, &TaskId::from("a")), vec![Stage::FinishingTouches]);
    }

    #[test]
    fn remove_clears_task_and_column_entry() {
        let mut board = KanbanBoard::new();
        board.replace_all(vec![task("a", Stage::InContact), task("b", Stage::InContact)]);
        board.selected_stage = 1;
        board.selected_task = 1;

        let removed = board.remove(&TaskId::from("b")).unwrap();
        assert_eq!(removed.id, TaskId::from("b"));
        assert!(board.get(&TaskId::from("b")).is_none());
        assert!(occurrences(&board, &TaskId::from("b")).is_empty());
        assert_eq!(board.selected_task, 0);
    }

    #[test]
    fn follow_tracks_moved_task() {
        let mut board = KanbanBoard::new();
        board.replace_all(vec![task("a", Stage::Review), task("b", Stage::InContact)]);
        let id = TaskId::from("a");
        board.begin_move(&id, Stage::Review, Direction::Forward).unwrap();
        board.follow(&id);
        assert_eq!(board.selected_stage(), Stage::InContact);
        assert_eq!(board.selected().map(|t| &t.id), Some(&id));
    }

    #[test]
    fn blank_title_draft_is_rejected() {
        let draft = TaskDraft {
            title: "   \t".into(),
            ..TaskDraft::default()
        };
        let errors = draft.validate(OwnerId(1)).unwrap_err();
        assert!(errors.get("title").is_some());
    }

    #[test]
    fn draft_parses_due_date_and_stage() {
        let draft = TaskDraft {
            title: " Follow up ".into(),
            due_date: "2025-06-30".into(),
            priority: "high".into(),
            stage: Some(Stage::InContact),
            ..TaskDraft::default()
        };
        let new_task = draft.validate(OwnerId(9)).unwrap();
        assert_eq!(new_task.title, "Follow up");
        assert_eq!(new_task.status, Stage::InContact);
        assert_eq!(new_task.due_date, NaiveDate::from_ymd_opt(2025, 6, 30));
        assert_eq!(new_task.priority, Priority::High);
        assert_eq!(new_task.owner_id, OwnerId(9));

        let bad = TaskDraft {
            title: "x".into(),
            due_date: "30/06/2025".into(),
            ..TaskDraft::default()
        };
        assert!(bad.validate(OwnerId(9)).unwrap_err().get("due_date").is_some());
    }
}
