//! Task store
//!
//! Quadrant references are validated here for a clear error, and again inside
//! the store primitive that writes them, so a quadrant deleted in between is
//! still caught.

use crate::clock::{Clock, SharedClock};
use crate::error::{CoreError, CoreResult};
use crate::models::task::{NewTask, Task, TaskFilter, UpdateTask};
use crate::store::{QuadrantRepository, StoreError, TaskRepository};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<dyn TaskRepository>,
    quadrants: Arc<dyn QuadrantRepository>,
    clock: SharedClock,
}

/// Missing quadrants surface as [`CoreError::InvalidReference`]
fn reference_error(err: StoreError) -> CoreError {
    match err {
        StoreError::MissingQuadrant(quadrant_id) => CoreError::InvalidReference { quadrant_id },
        other => other.into(),
    }
}

impl TaskStore {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        quadrants: Arc<dyn QuadrantRepository>,
        clock: SharedClock,
    ) -> Self {
        Self {
            tasks,
            quadrants,
            clock,
        }
    }

    async fn ensure_quadrant(&self, quadrant_id: i64) -> CoreResult<()> {
        match self.quadrants.find_quadrant(quadrant_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::InvalidReference { quadrant_id }),
        }
    }

    pub async fn create(&self, new: NewTask) -> CoreResult<Task> {
        new.validate()?;
        self.ensure_quadrant(new.quadrant_id).await?;

        let task = self
            .tasks
            .insert_task(&new, self.clock.utc())
            .await
            .map_err(reference_error)?;
        info!(task_id = task.id, quadrant_id = task.quadrant_id, "Task created");
        Ok(task)
    }

    pub async fn get(&self, id: i64) -> CoreResult<Task> {
        self.tasks
            .find_task(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Task", id))
    }

    /// Visible tasks, ordered by id
    pub async fn list(&self, filter: TaskFilter) -> CoreResult<Vec<Task>> {
        if let Some(quadrant_id) = filter.quadrant_id {
            self.ensure_quadrant(quadrant_id).await?;
        }
        Ok(self.tasks.list_tasks(&filter).await?)
    }

    /// Partial update; a missing task is reported before a bad quadrant
    pub async fn update(&self, id: i64, update: UpdateTask) -> CoreResult<Task> {
        update.validate()?;
        if let Some(quadrant_id) = update.quadrant_id {
            self.get(id).await?;
            self.ensure_quadrant(quadrant_id).await?;
        }

        let task = self
            .tasks
            .update_task(id, &update, self.clock.utc())
            .await
            .map_err(reference_error)?
            .ok_or_else(|| CoreError::not_found("Task", id))?;
        info!(task_id = id, "Task updated");
        Ok(task)
    }

    pub async fn move_quadrant(&self, id: i64, quadrant_id: i64) -> CoreResult<Task> {
        self.update(id, UpdateTask::move_to(quadrant_id)).await
    }

    pub async fn toggle_completion(&self, id: i64, completed: bool) -> CoreResult<Task> {
        self.update(id, UpdateTask::completion(completed)).await
    }

    /// Soft delete; the row keeps its quadrant id
    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        if self.tasks.soft_delete_task(id, self.clock.utc()).await? {
            info!(task_id = id, "Task deleted");
            Ok(())
        } else {
            Err(CoreError::not_found("Task", id))
        }
    }
}
