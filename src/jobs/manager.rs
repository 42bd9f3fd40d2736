//! Job queue and job lifecycle
//!
//! Jobs live in a generational arena; agents only keep the `JobId`, so a
//! job that was finished or deleted resolves to `None` rather than to a
//! reused slot. Open jobs sit in per-type buckets by priority. Jobs whose
//! inputs or tool are missing wait in the returned queue until `on_tick`
//! finds them workable again.

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{ColonyError, Result};
use crate::core::types::{AgentId, JobId, Position};
use crate::inventory::{ClaimOwner, Inventory};
use crate::jobs::job::{Job, JobCatalog, JobFlow, JobSpec, JobState};
use crate::pathfinding::Pathfinder;
use crate::util::PriorityQueue;
use crate::world::World;

pub const PRIORITY_LEVELS: usize = 10;

/// Vertical distance weight when ranking jobs by proximity
const Z_WEIGHT: i64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct JobSlot {
    generation: u32,
    job: Option<Job>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobManager {
    slots: Vec<JobSlot>,
    free_slots: Vec<u32>,
    /// job type -> priority -> open jobs
    buckets: BTreeMap<String, Vec<Vec<JobId>>>,
    returned: VecDeque<JobId>,
    #[serde(skip)]
    positions: AHashMap<Position, JobId>,
    catalog: JobCatalog,
}

impl JobManager {
    pub fn new(catalog: JobCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.catalog
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.job.as_ref())
    }

    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.job.as_mut())
    }

    pub fn job_at(&self, pos: Position) -> Option<JobId> {
        self.positions.get(&pos).copied()
    }

    pub fn has_job_at(&self, pos: Position) -> bool {
        self.positions.contains_key(&pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().filter_map(|s| s.job.as_ref())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn returned_count(&self) -> usize {
        self.returned.len()
    }

    // === Adding jobs ===

    pub fn add_job(&mut self, job_type: &str, pos: Position, priority: u8, silent: bool) -> Result<JobId> {
        self.add_job_with(JobSpec::new(job_type, pos).priority(priority).silent(silent))
    }

    pub fn add_job_with(&mut self, spec: JobSpec) -> Result<JobId> {
        let def = self
            .catalog
            .get(&spec.job_type)
            .ok_or_else(|| ColonyError::UnknownJobType(spec.job_type.clone()))?;
        // Haul jobs share their drop tile with the stockpile, so they are not
        // tracked by position
        let tracked = def.flow != JobFlow::Haul;
        if tracked && self.positions.contains_key(&spec.position) {
            return Err(ColonyError::JobPositionOccupied(spec.position));
        }

        let id = match self.free_slots.pop() {
            Some(index) => JobId::new(index, self.slots[index as usize].generation),
            None => {
                self.slots.push(JobSlot::default());
                JobId::new(self.slots.len() as u32 - 1, 0)
            }
        };
        let job = Job::from_spec(id, def, spec);
        let (job_type, priority, pos, silent) = (job.job_type.clone(), job.priority, job.position, job.silent);
        self.slots[id.index as usize].job = Some(job);

        if tracked {
            self.positions.insert(pos, id);
        }
        self.bucket_insert(&job_type, priority, id);
        if !silent {
            tracing::debug!("Added {} {} at {} prio {}", job_type, id, pos, priority);
        }
        Ok(id)
    }

    fn bucket_insert(&mut self, job_type: &str, priority: u8, id: JobId) {
        let bucket = self
            .buckets
            .entry(job_type.to_string())
            .or_insert_with(|| vec![Vec::new(); PRIORITY_LEVELS]);
        let level = &mut bucket[(priority as usize).min(PRIORITY_LEVELS - 1)];
        if !level.contains(&id) {
            level.push(id);
        }
    }

    fn bucket_remove(&mut self, job_type: &str, id: JobId) {
        if let Some(bucket) = self.buckets.get_mut(job_type) {
            for level in bucket.iter_mut() {
                level.retain(|j| *j != id);
            }
        }
    }

    fn in_bucket(&self, job_type: &str, priority: u8, id: JobId) -> bool {
        self.buckets
            .get(job_type)
            .and_then(|b| b.get(priority as usize))
            .map_or(false, |level| level.contains(&id))
    }

    // === Assignment ===

    /// Pick the best open job for an agent and assign it in the same call
    ///
    /// Skills are tried in the agent's order, then priority from 9 down to
    /// 0, then distance. Because the chosen job is marked worked before
    /// returning, a second agent asking in the same tick cannot get it.
    pub fn get_job(
        &mut self,
        skills: &[String],
        agent: AgentId,
        pos: Position,
        world: &World,
        inventory: &Inventory,
        pathfinder: &mut dyn Pathfinder,
    ) -> Option<JobId> {
        for skill in skills {
            let types: Vec<String> = self.catalog.types_for_skill(skill).to_vec();
            for priority in (0..PRIORITY_LEVELS).rev() {
                for job_type in &types {
                    if let Some(id) = self.pick_from_bucket(job_type, priority, agent, pos, world, inventory, pathfinder)
                    {
                        return Some(id);
                    }
                }
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn pick_from_bucket(
        &mut self,
        job_type: &str,
        priority: usize,
        agent: AgentId,
        pos: Position,
        world: &World,
        inventory: &Inventory,
        pathfinder: &mut dyn Pathfinder,
    ) -> Option<JobId> {
        let candidates: Vec<JobId> = self.buckets.get(job_type)?.get(priority)?.clone();

        let mut queue: PriorityQueue<JobId, (i64, i64)> = PriorityQueue::new();
        for id in candidates {
            let Some(job) = self.job(id) else {
                continue;
            };
            if job.is_worked || job.canceled {
                continue;
            }
            let dist = job.position.dist_square_weighted(&pos, Z_WEIGHT);
            // Trapping jobs go from the most enclosed tile outwards
            let enclosure = if job.may_trap {
                world.walkable_neighbors(job.position) as i64
            } else {
                0
            };
            queue.put(id, (enclosure, dist));
        }

        while let Some(id) = queue.get() {
            let available = match self.job(id) {
                Some(job) => required_items_available(job, inventory) && required_tool_exists(job, inventory),
                None => continue,
            };
            if !available {
                self.return_job(id);
                continue;
            }

            let Some(job) = self.job_mut(id) else {
                continue;
            };
            if !job.refresh_work_positions(|p| world.is_walkable_gnome(p)) {
                continue;
            }
            let reachable = job
                .possible_work_positions
                .iter()
                .any(|wp| pathfinder.check_connected(world, pos, *wp));
            if !reachable {
                continue;
            }

            job.is_worked = true;
            job.worked_by = Some(agent);
            job.state = JobState::Assigned(agent);
            tracing::debug!("{} takes {} {} at {}", agent, job.job_type, id, job.position);
            return Some(id);
        }
        None
    }

    /// Park a job in the returned queue until its inputs show up
    fn return_job(&mut self, id: JobId) {
        let Some(job) = self.job_mut(id) else {
            return;
        };
        job.component_missing = true;
        let job_type = job.job_type.clone();
        self.bucket_remove(&job_type, id);
        if !self.returned.contains(&id) {
            self.returned.push_back(id);
        }
    }

    // === State changes ===

    /// Mark a job as being worked; `ready` means all inputs are in place
    pub fn set_job_being_worked(&mut self, id: JobId, ready: bool) {
        if let Some(job) = self.job_mut(id) {
            job.is_worked = true;
            if ready {
                job.state = JobState::Worked;
            }
        }
    }

    pub fn mark_items_claimed(&mut self, id: JobId) {
        if let Some(job) = self.job_mut(id) {
            if matches!(job.state, JobState::Pending | JobState::Assigned(_)) {
                job.state = JobState::ItemsClaimed;
            }
        }
    }

    /// Flag a job so the agent working it aborts on its next tick
    pub fn set_aborted(&mut self, id: JobId, aborted: bool) {
        if let Some(job) = self.job_mut(id) {
            job.set_aborted(aborted);
        }
    }

    /// Remove a completed job and reopen the jobs around it
    pub fn finish_job(&mut self, id: JobId) -> Option<Job> {
        let pos = self.job(id)?.position;
        for neighbor in pos.all_neighbors() {
            let Some(other) = self.positions.get(&neighbor).copied() else {
                continue;
            };
            let reopen = match self.job(other) {
                Some(job) if !job.component_missing && !job.canceled => Some((job.job_type.clone(), job.priority)),
                _ => None,
            };
            if let Some((job_type, priority)) = reopen {
                self.bucket_insert(&job_type, priority, other);
            }
        }

        let mut job = self.remove_job(id)?;
        job.state = JobState::Finished;
        tracing::debug!("Finished {} {}", job.job_type, id);
        Some(job)
    }

    /// Return an aborted job to the queue, or drop it if it was canceled
    pub fn give_back_job(&mut self, id: JobId) {
        let Some(job) = self.job_mut(id) else {
            return;
        };
        if job.canceled || job.destroy_on_abort {
            job.is_worked = false;
            self.delete_job(id);
            return;
        }

        job.reset_assignment();
        job.state = JobState::Aborted;
        tracing::debug!("{} {} given back", job.job_type, id);
        self.return_job(id);
    }

    pub fn cancel_job(&mut self, pos: Position) {
        if let Some(id) = self.positions.get(&pos).copied() {
            self.delete_job(id);
        }
    }

    /// A job that is being worked is only flagged; its agent cleans up
    pub fn delete_job(&mut self, id: JobId) {
        let Some(job) = self.job_mut(id) else {
            return;
        };
        if job.is_worked {
            job.canceled = true;
            job.state = JobState::Canceled;
            return;
        }
        self.remove_job(id);
    }

    fn remove_job(&mut self, id: JobId) -> Option<Job> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let job = slot.job.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);

        if self.positions.get(&job.position) == Some(&id) {
            self.positions.remove(&job.position);
        }
        self.bucket_remove(&job.job_type, id);
        self.returned.retain(|j| *j != id);
        Some(job)
    }

    pub fn raise_prio(&mut self, pos: Position) {
        self.shift_prio(pos, 1);
    }

    pub fn lower_prio(&mut self, pos: Position) {
        self.shift_prio(pos, -1);
    }

    fn shift_prio(&mut self, pos: Position, delta: i8) {
        let Some(id) = self.positions.get(&pos).copied() else {
            return;
        };
        let Some(job) = self.job(id) else {
            return;
        };
        let old = job.priority;
        let new = (old as i8 + delta).clamp(0, PRIORITY_LEVELS as i8 - 1) as u8;
        if new == old {
            return;
        }
        let job_type = job.job_type.clone();
        if self.in_bucket(&job_type, old, id) {
            self.bucket_remove(&job_type, id);
            self.bucket_insert(&job_type, new, id);
        }
        if let Some(job) = self.job_mut(id) {
            job.priority = new;
        }
    }

    /// Requeue returned jobs that became workable
    pub fn on_tick(&mut self, world: &World, inventory: &Inventory) {
        let pending: Vec<JobId> = self.returned.drain(..).collect();
        for id in pending {
            let canceled = match self.job(id) {
                None => continue,
                Some(job) => job.canceled,
            };
            if canceled {
                self.delete_job(id);
                continue;
            }
            let ready = self
                .job_mut(id)
                .map_or(false, |job| job.refresh_work_positions(|p| world.is_walkable_gnome(p)));
            let ready = ready
                && self
                    .job(id)
                    .map_or(false, |j| required_tool_exists(j, inventory) && required_items_available(j, inventory));
            if !ready {
                self.returned.push_back(id);
                continue;
            }
            if let Some(job) = self.job_mut(id) {
                job.component_missing = false;
                job.state = JobState::Pending;
                let (job_type, priority) = (job.job_type.clone(), job.priority);
                self.bucket_insert(&job_type, priority, id);
            }
        }
    }

    /// Rebuild lookup tables after deserializing
    pub fn rebuild_index(&mut self) {
        self.catalog.rebuild_index();
        self.positions.clear();
        let tracked: Vec<(Position, JobId)> = self
            .iter()
            .filter(|j| j.flow != JobFlow::Haul)
            .map(|j| (j.position, j.id))
            .collect();
        self.positions.extend(tracked);
    }
}

/// Inputs for a job exist and are not held by anyone else
pub fn required_items_available(job: &Job, inventory: &Inventory) -> bool {
    if !job.items_to_haul.is_empty() {
        return job.items_to_haul.iter().all(|item| {
            inventory.contains(*item)
                && !inventory.is_picked_up(*item)
                && match inventory.is_in_job(*item) {
                    None => true,
                    Some(ClaimOwner::Job(owner)) => owner == job.id,
                    Some(ClaimOwner::Agent(_)) => false,
                }
        });
    }
    inventory.check_all_available(&job.required_items)
}

pub fn required_tool_exists(job: &Job, inventory: &Inventory) -> bool {
    match &job.required_tool {
        None => true,
        Some(tool) => inventory
            .get_closest_tool(job.position, &tool.item_sid, tool.level)
            .is_some(),
    }
}
