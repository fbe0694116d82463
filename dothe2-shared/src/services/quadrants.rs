//! Quadrant registry
//!
//! Default quadrants are looked up like any other but are classified before
//! every mutation; only the custom variant is passed on to the store.

use crate::clock::{Clock, SharedClock};
use crate::error::{CoreError, CoreResult};
use crate::models::quadrant::{
    ClassifiedQuadrant, CustomQuadrant, NewQuadrant, Quadrant, UpdateQuadrant, DEFAULT_QUADRANTS,
};
use crate::store::{QuadrantDeletion, QuadrantRepository};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Clone)]
pub struct QuadrantRegistry {
    quadrants: Arc<dyn QuadrantRepository>,
    clock: SharedClock,
}

impl QuadrantRegistry {
    pub fn new(quadrants: Arc<dyn QuadrantRepository>, clock: SharedClock) -> Self {
        Self { quadrants, clock }
    }

    /// Creates the four default quadrants unless they already exist
    ///
    /// Returns the number of rows created: 4 on first run, 0 afterwards.
    pub async fn seed_defaults(&self) -> CoreResult<usize> {
        let created = self
            .quadrants
            .seed_default_quadrants(&DEFAULT_QUADRANTS, self.clock.utc())
            .await?;
        if created > 0 {
            info!(created, "Default quadrants seeded");
        } else {
            debug!("Default quadrants already present");
        }
        Ok(created)
    }

    pub async fn list(&self, include_default: bool) -> CoreResult<Vec<Quadrant>> {
        Ok(self.quadrants.list_quadrants(include_default).await?)
    }

    pub async fn get(&self, id: i64) -> CoreResult<Quadrant> {
        self.quadrants
            .find_quadrant(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Quadrant", id))
    }

    /// Creates a custom quadrant
    pub async fn create(&self, new: NewQuadrant) -> CoreResult<Quadrant> {
        new.validate()?;
        let quadrant = self
            .quadrants
            .insert_quadrant(&new, self.clock.utc())
            .await?;
        info!(quadrant_id = quadrant.id, "Quadrant created");
        Ok(quadrant)
    }

    /// Applies a partial update to a custom quadrant
    pub async fn update(&self, id: i64, update: UpdateQuadrant) -> CoreResult<Quadrant> {
        update.validate()?;
        let custom = self.load_custom(id, "Cannot modify default quadrant").await?;

        let updated = self
            .quadrants
            .update_custom_quadrant(&custom, &update, self.clock.utc())
            .await?
            .ok_or_else(|| CoreError::not_found("Quadrant", id))?;
        info!(quadrant_id = id, "Quadrant updated");
        Ok(updated)
    }

    /// Removes a custom quadrant no visible task refers to
    pub async fn delete(&self, id: i64) -> CoreResult<()> {
        let custom = self.load_custom(id, "Cannot delete default quadrant").await?;

        match self.quadrants.delete_custom_quadrant(&custom).await? {
            QuadrantDeletion::Deleted => {
                info!(quadrant_id = id, "Quadrant deleted");
                Ok(())
            }
            QuadrantDeletion::Missing => Err(CoreError::not_found("Quadrant", id)),
            QuadrantDeletion::InUse(count) => {
                debug!(quadrant_id = id, count, "Quadrant deletion blocked by tasks");
                Err(CoreError::Conflict { count })
            }
        }
    }

    async fn load_custom(&self, id: i64, refusal: &str) -> CoreResult<CustomQuadrant> {
        match self.get(id).await?.classify() {
            ClassifiedQuadrant::Custom(custom) => Ok(custom),
            ClassifiedQuadrant::Default(_) => Err(CoreError::Forbidden(refusal.to_string())),
        }
    }
}
