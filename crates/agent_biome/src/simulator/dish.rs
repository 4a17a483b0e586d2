//! Dish: a bounded occupancy grid that owns its organisms and loose items.
//!
//! Every organism in `organisms` has exactly one entry in `positions`, and the
//! cell at that position names it as occupant. All mutations keep the three
//! structures in step.

use std::collections::BTreeMap;

use crate::geometry::{GridPos, MOORE_OFFSETS};

use super::agent::{ObservedItem, ObservedNeighbor, Observation, SocialContext};
use super::error::{BehaviorError, InventoryError, PlacementError, Rejected};
use super::item::{take_by_id, Item};
use super::organism::Organism;
use super::types::{AgentId, DishId, Pulse, SliceNumber};

#[derive(Debug, Default)]
struct Cell {
    occupant: Option<AgentId>,
    items: Vec<Item>,
}

#[derive(Debug)]
pub struct Dish {
    id: DishId,
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    organisms: BTreeMap<AgentId, Organism>,
    positions: BTreeMap<AgentId, GridPos>,
    arrival_order: Vec<AgentId>,
}

impl Dish {
    pub fn new(id: impl Into<DishId>, width: u32, height: u32) -> Self {
        let total = width as usize * height as usize;
        let mut cells = Vec::with_capacity(total);
        cells.resize_with(total, Cell::default);
        Self {
            id: id.into(),
            width,
            height,
            cells,
            organisms: BTreeMap::new(),
            positions: BTreeMap::new(),
            arrival_order: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    fn cell(&self, pos: GridPos) -> Option<&Cell> {
        self.index(pos).and_then(|index| self.cells.get(index))
    }

    fn cell_mut(&mut self, pos: GridPos) -> Option<&mut Cell> {
        let index = self.index(pos)?;
        self.cells.get_mut(index)
    }

    fn out_of_bounds(&self, pos: GridPos) -> PlacementError {
        PlacementError::OutOfBounds {
            pos,
            width: self.width,
            height: self.height,
        }
    }

    // ========================================================================
    // Organisms
    // ========================================================================

    /// Place an organism. On failure the organism is handed back untouched.
    pub fn add_organism(
        &mut self,
        organism: Organism,
        pos: GridPos,
    ) -> Result<(), Rejected<Box<Organism>, PlacementError>> {
        if let Err(reason) = self.check_free(pos) {
            return Err(Rejected::new(reason, Box::new(organism)));
        }
        let agent_id = organism.agent_id().to_string();
        if self.organisms.contains_key(&agent_id) {
            return Err(Rejected::new(
                PlacementError::AlreadyPresent { agent_id },
                Box::new(organism),
            ));
        }
        if let Some(cell) = self.cell_mut(pos) {
            cell.occupant = Some(agent_id.clone());
        }
        self.positions.insert(agent_id.clone(), pos);
        self.arrival_order.push(agent_id.clone());
        self.organisms.insert(agent_id, organism);
        Ok(())
    }

    /// Remove an organism and its cell reference together.
    pub fn remove_organism(&mut self, agent_id: &str) -> Option<Organism> {
        let organism = self.organisms.remove(agent_id)?;
        if let Some(pos) = self.positions.remove(agent_id) {
            if let Some(cell) = self.cell_mut(pos) {
                if cell.occupant.as_deref() == Some(agent_id) {
                    cell.occupant = None;
                }
            }
        }
        self.arrival_order.retain(|id| id != agent_id);
        Some(organism)
    }

    pub fn organism_position(&self, agent_id: &str) -> Option<GridPos> {
        self.positions.get(agent_id).copied()
    }

    pub fn organism(&self, agent_id: &str) -> Option<&Organism> {
        self.organisms.get(agent_id)
    }

    pub fn organism_mut(&mut self, agent_id: &str) -> Option<&mut Organism> {
        self.organisms.get_mut(agent_id)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.organisms.contains_key(agent_id)
    }

    /// Organism ids in the order they entered the dish.
    pub fn organism_ids(&self) -> Vec<AgentId> {
        self.arrival_order.clone()
    }

    pub fn organisms(&self) -> impl Iterator<Item = &Organism> {
        self.arrival_order
            .iter()
            .filter_map(|agent_id| self.organisms.get(agent_id))
    }

    pub fn occupant_at(&self, pos: GridPos) -> Option<&str> {
        self.cell(pos).and_then(|cell| cell.occupant.as_deref())
    }

    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    /// Population divided by total cell count.
    pub fn density(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.population() as f64 / self.total_cells() as f64
    }

    /// First organism carrying `genome_id`. Several organisms may share a
    /// genome; `preferred_agent` wins when it matches.
    pub fn find_by_genome(&self, genome_id: &str, preferred_agent: &str) -> Option<AgentId> {
        if let Some(organism) = self.organisms.get(preferred_agent) {
            if organism.genome_id() == genome_id {
                return Some(preferred_agent.to_string());
            }
        }
        self.organisms()
            .find(|organism| organism.genome_id() == genome_id)
            .map(|organism| organism.agent_id().to_string())
    }

    // ========================================================================
    // Spatial Queries
    // ========================================================================

    fn check_free(&self, pos: GridPos) -> Result<(), PlacementError> {
        match self.cell(pos) {
            None => Err(self.out_of_bounds(pos)),
            Some(Cell {
                occupant: Some(occupant),
                ..
            }) => Err(PlacementError::Occupied {
                pos,
                occupant: occupant.clone(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Moore neighborhood of `pos` within Chebyshev `radius`, excluding `pos`
    /// itself, clipped to the grid, in row-major order.
    pub fn neighborhood(&self, pos: GridPos, radius: u32) -> Vec<(GridPos, Option<AgentId>)> {
        let mut cells = Vec::new();
        if self.width == 0 || self.height == 0 {
            return cells;
        }
        // Scan only the window that intersects the grid.
        let x_min = pos.x.saturating_sub(radius);
        let x_max = pos.x.saturating_add(radius).min(self.width - 1);
        let y_min = pos.y.saturating_sub(radius);
        let y_max = pos.y.saturating_add(radius).min(self.height - 1);
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let neighbor = GridPos::new(x, y);
                if neighbor == pos {
                    continue;
                }
                let occupant = self.occupant_at(neighbor).map(str::to_string);
                cells.push((neighbor, occupant));
            }
        }
        cells
    }

    pub fn neighbor_count(&self, pos: GridPos, radius: u32) -> usize {
        self.neighborhood(pos, radius)
            .iter()
            .filter(|(_, occupant)| occupant.is_some())
            .count()
    }

    /// First empty in-bounds cell around `pos`, scanning in Moore order.
    pub fn free_moore_cell(&self, pos: GridPos) -> Option<GridPos> {
        MOORE_OFFSETS
            .iter()
            .filter_map(|(dx, dy)| pos.offset(*dx, *dy))
            .find(|candidate| self.check_free(*candidate).is_ok())
    }

    /// Relocate an organism to an empty in-bounds cell.
    pub fn move_organism(&mut self, agent_id: &str, to: GridPos) -> Result<(), PlacementError> {
        let from = self
            .organism_position(agent_id)
            .ok_or_else(|| PlacementError::UnknownOrganism {
                agent_id: agent_id.to_string(),
            })?;
        self.check_free(to)?;
        if let Some(cell) = self.cell_mut(from) {
            cell.occupant = None;
        }
        if let Some(cell) = self.cell_mut(to) {
            cell.occupant = Some(agent_id.to_string());
        }
        self.positions.insert(agent_id.to_string(), to);
        Ok(())
    }

    pub fn social_context(
        &self,
        agent_id: &str,
        pulse: Pulse,
        slice: SliceNumber,
        radius: u32,
    ) -> Option<SocialContext> {
        let pos = self.organism_position(agent_id)?;
        Some(SocialContext {
            pulse,
            slice,
            neighbor_count: self.neighbor_count(pos, radius),
            population_density: self.density(),
        })
    }

    /// Everything an organism can perceive this slice.
    pub fn observe(&self, agent_id: &str, social: SocialContext) -> Option<Observation> {
        let pos = self.organism_position(agent_id)?;
        let organism = self.organisms.get(agent_id)?;
        let neighbors = self
            .neighborhood(pos, 1)
            .into_iter()
            .filter_map(|(neighbor_pos, occupant)| {
                let neighbor = self.organisms.get(occupant.as_deref()?)?;
                Some(ObservedNeighbor {
                    pos: neighbor_pos,
                    agent_id: neighbor.agent_id().to_string(),
                    genome_id: neighbor.genome_id().to_string(),
                    energy: neighbor.energy(),
                })
            })
            .collect();
        let items_here = self
            .items_at(pos)
            .iter()
            .map(|item| ObservedItem {
                item_id: item.id.clone(),
                name: item.name.clone(),
                weight: item.weight,
            })
            .collect();
        Some(Observation {
            state: organism.view(pos),
            social,
            neighbors,
            items_here,
        })
    }

    // ========================================================================
    // Items
    // ========================================================================

    pub fn add_item(&mut self, item: Item, pos: GridPos) -> Result<(), Rejected<Item, PlacementError>> {
        let reason = self.out_of_bounds(pos);
        match self.cell_mut(pos) {
            Some(cell) => {
                cell.items.push(item);
                Ok(())
            }
            None => Err(Rejected::new(reason, item)),
        }
    }

    /// Loose items at `pos`; empty when out of bounds.
    pub fn items_at(&self, pos: GridPos) -> &[Item] {
        self.cell(pos).map(|cell| cell.items.as_slice()).unwrap_or(&[])
    }

    pub fn take_item(&mut self, pos: GridPos, item_id: &str) -> Option<Item> {
        self.cell_mut(pos)
            .and_then(|cell| take_by_id(&mut cell.items, item_id))
    }

    /// Pick up an item from the organism's own cell into its appendage.
    pub fn grab_item(&mut self, agent_id: &str, item_id: &str) -> Result<(), BehaviorError> {
        let pos = self.position_of(agent_id)?;
        let item = self
            .take_item(pos, item_id)
            .ok_or_else(|| InventoryError::ItemNotFound {
                item_id: item_id.to_string(),
            })?;
        let held = match self.organisms.get_mut(agent_id) {
            Some(organism) => organism.hold(item),
            None => {
                self.put_back(pos, item);
                return Err(self.unknown(agent_id).into());
            }
        };
        if let Err(rejected) = held {
            let Rejected { reason, value } = rejected;
            self.put_back(pos, value);
            return Err(reason.into());
        }
        Ok(())
    }

    /// Put an item from the organism's appendage down on its cell.
    pub fn drop_item(&mut self, agent_id: &str, item_id: &str) -> Result<(), BehaviorError> {
        let pos = self.position_of(agent_id)?;
        let organism = self
            .organisms
            .get_mut(agent_id)
            .ok_or_else(|| PlacementError::UnknownOrganism {
                agent_id: agent_id.to_string(),
            })?;
        let item = organism.release(item_id)?;
        self.put_back(pos, item);
        Ok(())
    }

    fn put_back(&mut self, pos: GridPos, item: Item) {
        if let Some(cell) = self.cell_mut(pos) {
            cell.items.push(item);
        }
    }

    fn position_of(&self, agent_id: &str) -> Result<GridPos, PlacementError> {
        self.organism_position(agent_id)
            .ok_or_else(|| self.unknown(agent_id))
    }

    fn unknown(&self, agent_id: &str) -> PlacementError {
        PlacementError::UnknownOrganism {
            agent_id: agent_id.to_string(),
        }
    }

    // ========================================================================
    // Invariants
    // ========================================================================

    /// Organism map, position map and cell occupants all agree.
    pub fn is_consistent(&self) -> bool {
        if self.organisms.len() != self.positions.len()
            || self.arrival_order.len() != self.organisms.len()
        {
            return false;
        }
        for (agent_id, pos) in &self.positions {
            if !self.organisms.contains_key(agent_id) {
                return false;
            }
            if self.occupant_at(*pos) != Some(agent_id.as_str()) {
                return false;
            }
        }
        self.cells
            .iter()
            .filter_map(|cell| cell.occupant.as_ref())
            .all(|occupant| self.positions.contains_key(occupant))
    }
}
