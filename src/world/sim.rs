//! In-memory world for tests and the demo binary
//!
//! Implements the rules an AI player relies on in simplified form: node
//! ownership, objects, flags, roads, buildings, a command log and
//! notifications. Commands take effect immediately.

use std::collections::hash_map::Entry;
use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::types::{
    BuildingQuality, BuildingType, FrontierDistance, Inventory, InventorySetting,
    MilitarySettings, PlayerId, SeaId, ShipId, StockItem, ToolSettings, DISTRIBUTION_LEN,
};
use crate::map::grid::Grid;
use crate::map::point::{Direction, MapPoint, MapSize};
use crate::world::command::Command;
use crate::world::notify::{BuildingNoteKind, Note, NotificationBus, RoadNoteKind};
use crate::world::{
    AttackForce, BuildingInfo, FlagInfo, GameSettings, GameWorld, HarborPoint, MilitaryInfo,
    MilitarySighting, NodeObject, RoadInfo, ShipDirection, ShipInfo, SiteInfo,
    SubsurfaceResource, SurfaceResource, WarehouseInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Meadow,
    /// Walkable but nothing grows
    Desert,
    Mountain,
    Water,
}

impl Terrain {
    fn walkable(self) -> bool {
        self != Terrain::Water
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SimRoad {
    owner: PlayerId,
    start: MapPoint,
    route: Vec<Direction>,
}

/// Building or building site in the simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimBuilding {
    pub owner: PlayerId,
    pub kind: BuildingType,
    pub site: bool,
    pub has_worker: bool,
    pub productivity: u32,
    pub wares: u32,
    pub ordered_wares: bool,
    pub production_disabled: bool,
    pub frontier: FrontierDistance,
    pub troops: u32,
    pub strength: u32,
    pub troop_limits: [u32; 5],
    pub reserve: u32,
    pub gold_disabled: bool,
    pub new_built: bool,
    pub under_attack: bool,
    pub useless: bool,
    pub inventory: Inventory,
    pub settings: Vec<(StockItem, InventorySetting)>,
    pub expedition_active: bool,
    pub ship_mode: bool,
}

impl SimBuilding {
    fn new(owner: PlayerId, kind: BuildingType, site: bool) -> Self {
        let max = kind.max_soldiers();
        Self {
            owner,
            kind,
            site,
            has_worker: true,
            productivity: 100,
            wares: 0,
            ordered_wares: false,
            production_disabled: false,
            frontier: FrontierDistance::Far,
            troops: if kind.is_military() { 1 } else { 0 },
            strength: if kind.is_military() { 1 } else { 0 },
            troop_limits: [max; 5],
            reserve: 0,
            gold_disabled: false,
            new_built: false,
            under_attack: false,
            useless: false,
            inventory: Inventory::new(),
            settings: Vec::new(),
            expedition_active: false,
            ship_mode: false,
        }
    }

    pub fn setting(&self, item: StockItem) -> InventorySetting {
        self.settings
            .iter()
            .find(|(i, _)| *i == item)
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    fn set_setting(&mut self, item: StockItem, setting: InventorySetting) {
        match self.settings.iter_mut().find(|(i, _)| *i == item) {
            Some(slot) => slot.1 = setting,
            None => self.settings.push((item, setting)),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SimPlayer {
    military: MilitarySettings,
    tools: ToolSettings,
    distribution: Option<[u8; DISTRIBUTION_LEN]>,
    forbidden: Vec<BuildingType>,
    allies: Vec<PlayerId>,
    surrendered: bool,
}

/// Simplified world implementing [`GameWorld`]
#[derive(Debug)]
pub struct SimWorld {
    size: MapSize,
    terrain: Grid<Terrain>,
    owner: Grid<Option<PlayerId>>,
    objects: Grid<NodeObject>,
    subsurface: Grid<Option<SubsurfaceResource>>,
    fish: Grid<bool>,
    on_road: Grid<bool>,
    roads: Vec<SimRoad>,
    buildings: AHashMap<MapPoint, SimBuilding>,
    animals: Vec<MapPoint>,
    harbor_points: Vec<HarborPoint>,
    ships: Vec<(PlayerId, ShipInfo)>,
    sea_attackers: AHashMap<(PlayerId, SeaId), u32>,
    explorable: AHashSet<(ShipId, ShipDirection)>,
    hidden: AHashSet<(PlayerId, MapPoint)>,
    players: AHashMap<PlayerId, SimPlayer>,
    settings: GameSettings,
    bus: NotificationBus,
    log: Vec<(PlayerId, Command)>,
}

impl SimWorld {
    /// Open meadow, nobody owns anything
    pub fn new(width: u16, height: u16) -> Self {
        let size = MapSize::new(width, height);
        Self {
            size,
            terrain: Grid::new(size),
            owner: Grid::new(size),
            objects: Grid::new(size),
            subsurface: Grid::new(size),
            fish: Grid::new(size),
            on_road: Grid::new(size),
            roads: Vec::new(),
            buildings: AHashMap::new(),
            animals: Vec::new(),
            harbor_points: Vec::new(),
            ships: Vec::new(),
            sea_attackers: AHashMap::new(),
            explorable: AHashSet::new(),
            hidden: AHashSet::new(),
            players: AHashMap::new(),
            settings: GameSettings::default(),
            bus: NotificationBus::new(),
            log: Vec::new(),
        }
    }

    // === SCENARIO SETUP ===

    pub fn set_terrain(&mut self, pt: MapPoint, terrain: Terrain) {
        self.terrain[pt] = terrain;
    }

    pub fn claim(&mut self, player: PlayerId, center: MapPoint, radius: u32) {
        for pt in self.size.points_in_radius(center, radius) {
            self.owner[pt] = Some(player);
        }
    }

    pub fn set_owner(&mut self, pt: MapPoint, player: Option<PlayerId>) {
        self.owner[pt] = player;
    }

    pub fn place_tree(&mut self, pt: MapPoint) {
        self.objects[pt] = NodeObject::Tree { produces_wood: true };
    }

    pub fn place_granite(&mut self, pt: MapPoint) {
        self.objects[pt] = NodeObject::Granite;
    }

    pub fn clear_object(&mut self, pt: MapPoint) {
        self.objects[pt] = NodeObject::Nothing;
    }

    pub fn set_subsurface(&mut self, pt: MapPoint, res: Option<SubsurfaceResource>) {
        self.subsurface[pt] = res;
    }

    pub fn set_fish(&mut self, pt: MapPoint, fish: bool) {
        self.fish[pt] = fish;
    }

    pub fn add_animal(&mut self, pt: MapPoint) {
        self.animals.push(pt);
    }

    pub fn set_game_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    pub fn forbid(&mut self, player: PlayerId, kind: BuildingType) {
        self.player_mut(player).forbidden.push(kind);
    }

    pub fn set_allied(&mut self, a: PlayerId, b: PlayerId) {
        self.player_mut(a).allies.push(b);
        self.player_mut(b).allies.push(a);
    }

    pub fn set_visible(&mut self, player: PlayerId, pt: MapPoint, visible: bool) {
        if visible {
            self.hidden.remove(&(player, pt));
        } else {
            self.hidden.insert((player, pt));
        }
    }

    pub fn add_harbor_point(&mut self, pos: MapPoint, seas: Vec<SeaId>) {
        self.harbor_points.push(HarborPoint { pos, seas });
    }

    pub fn add_ship(&mut self, player: PlayerId, ship: ShipInfo) {
        self.ships.push((player, ship));
    }

    pub fn set_sea_attackers(&mut self, player: PlayerId, sea: SeaId, count: u32) {
        self.sea_attackers.insert((player, sea), count);
    }

    pub fn allow_exploration(&mut self, ship: ShipId, dir: ShipDirection) {
        self.explorable.insert((ship, dir));
    }

    /// Put a flag without any checks
    pub fn add_flag(&mut self, player: PlayerId, pt: MapPoint) {
        self.objects[pt] = NodeObject::Flag { owner: player };
    }

    /// Put a road without any checks; both ends become flags
    pub fn add_road(&mut self, player: PlayerId, start: MapPoint, route: Vec<Direction>) {
        let end = self.walk(start, &route);
        self.add_flag(player, start);
        self.add_flag(player, end);
        self.roads.push(SimRoad { owner: player, start, route });
        self.rebuild_road_index();
    }

    /// Put a finished building and its flag without any checks
    pub fn add_building(
        &mut self,
        player: PlayerId,
        pos: MapPoint,
        kind: BuildingType,
    ) -> &mut SimBuilding {
        self.put_building(player, pos, kind, false)
    }

    pub fn add_site(
        &mut self,
        player: PlayerId,
        pos: MapPoint,
        kind: BuildingType,
    ) -> &mut SimBuilding {
        self.put_building(player, pos, kind, true)
    }

    fn put_building(
        &mut self,
        player: PlayerId,
        pos: MapPoint,
        kind: BuildingType,
        site: bool,
    ) -> &mut SimBuilding {
        let flag = self.size.neighbor(pos, Direction::SouthEast);
        if !matches!(self.objects[flag], NodeObject::Flag { .. }) {
            self.add_flag(player, flag);
        }
        self.objects[pos] = if site {
            NodeObject::BuildingSite { owner: player, kind }
        } else {
            NodeObject::Building { owner: player, kind }
        };
        let building = SimBuilding::new(player, kind, site);
        match self.buildings.entry(pos) {
            Entry::Occupied(mut slot) => {
                slot.insert(building);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(building),
        }
    }

    pub fn building(&self, pos: MapPoint) -> Option<&SimBuilding> {
        self.buildings.get(&pos)
    }

    pub fn building_mut(&mut self, pos: MapPoint) -> Option<&mut SimBuilding> {
        self.buildings.get_mut(&pos)
    }

    /// Finish a building site and announce it
    pub fn complete_site(&mut self, pos: MapPoint) -> bool {
        let Some(bld) = self.buildings.get_mut(&pos) else {
            return false;
        };
        if !bld.site {
            return false;
        }
        bld.site = false;
        let (owner, kind) = (bld.owner, bld.kind);
        self.objects[pos] = NodeObject::Building { owner, kind };
        self.bus.publish(Note::Building {
            player: owner,
            pos,
            kind: BuildingNoteKind::Constructed,
            building: kind,
        });
        true
    }

    pub fn publish(&self, note: Note) {
        self.bus.publish(note);
    }

    // === INSPECTION ===

    pub fn commands(&self) -> &[(PlayerId, Command)] {
        &self.log
    }

    pub fn commands_of(&self, player: PlayerId) -> Vec<&Command> {
        self.log.iter().filter(|(p, _)| *p == player).map(|(_, c)| c).collect()
    }

    pub fn clear_commands(&mut self) {
        self.log.clear();
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn has_flag(&self, pt: MapPoint) -> bool {
        matches!(self.objects[pt], NodeObject::Flag { .. })
    }

    pub fn distribution(&self, player: PlayerId) -> Option<[u8; DISTRIBUTION_LEN]> {
        self.players.get(&player).and_then(|p| p.distribution)
    }

    pub fn has_surrendered(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.surrendered)
    }

    // === INTERNALS ===

    fn player_mut(&mut self, player: PlayerId) -> &mut SimPlayer {
        self.players.entry(player).or_default()
    }

    fn walk(&self, start: MapPoint, route: &[Direction]) -> MapPoint {
        route.iter().fold(start, |pt, &dir| self.size.neighbor(pt, dir))
    }

    fn road_end(&self, road: &SimRoad) -> MapPoint {
        self.walk(road.start, &road.route)
    }

    fn rebuild_road_index(&mut self) {
        self.on_road.clear();
        for road in &self.roads {
            let mut pt = road.start;
            for &dir in &road.route {
                pt = self.size.neighbor(pt, dir);
                self.on_road[pt] = true;
            }
            self.on_road[road.start] = true;
        }
    }

    /// Inner node of a road, flags excluded
    fn is_road_inner(&self, pt: MapPoint) -> bool {
        self.on_road[pt] && !self.has_flag(pt)
    }

    fn flag_placeable(&self, pt: MapPoint) -> bool {
        self.owner[pt].is_some()
            && self.terrain[pt].walkable()
            && self.objects[pt] == NodeObject::Nothing
            && !self.size.neighbors(pt).iter().any(|&n| self.has_flag(n))
    }

    fn bq_for(&self, pt: MapPoint) -> BuildingQuality {
        let Some(owner) = self.owner[pt] else {
            return BuildingQuality::Nothing;
        };
        let flag_ok = self.flag_placeable(pt);
        let se = self.size.neighbor(pt, Direction::SouthEast);
        let blocked_neighbor = Direction::ALL.iter().any(|&dir| {
            if dir == Direction::SouthEast {
                return false;
            }
            let n = self.size.neighbor(pt, dir);
            matches!(
                self.objects[n],
                NodeObject::Flag { .. }
                    | NodeObject::Building { .. }
                    | NodeObject::BuildingSite { .. }
            )
        });
        let se_ok = self.owner[se] == Some(owner)
            && self.terrain[se].walkable()
            && match self.objects[se] {
                NodeObject::Flag { owner: o } => o == owner,
                NodeObject::Nothing => self
                    .size
                    .neighbors(se)
                    .iter()
                    .all(|&n| !self.has_flag(n)),
                _ => false,
            };
        let building_ok = self.terrain[pt].walkable()
            && self.objects[pt] == NodeObject::Nothing
            && !self.on_road[pt]
            && !blocked_neighbor
            && se_ok;
        if !building_ok {
            return if flag_ok { BuildingQuality::Flag } else { BuildingQuality::Nothing };
        }
        if self.harbor_points.iter().any(|h| h.pos == pt) {
            return BuildingQuality::Harbor;
        }
        if self.terrain[pt] == Terrain::Mountain {
            return BuildingQuality::Mine;
        }
        let free = |p: MapPoint| {
            p == se
                || (self.objects[p] == NodeObject::Nothing
                    && self.owner[p] == Some(owner)
                    && self.terrain[p] != Terrain::Water
                    && self.terrain[p] != Terrain::Mountain
                    && !self.on_road[p])
        };
        let ring1 = self.size.neighbors(pt);
        if !ring1.iter().all(|&p| free(p)) {
            return BuildingQuality::Hut;
        }
        let ring2 = self.size.points_in_radius(pt, 2);
        if ring2.iter().all(|&p| p == pt || free(p)) {
            BuildingQuality::Castle
        } else {
            BuildingQuality::House
        }
    }

    fn place_flag(&mut self, player: PlayerId, pt: MapPoint) -> bool {
        if self.owner[pt] != Some(player) {
            return false;
        }
        if self.has_flag(pt) {
            return true;
        }
        let on_road = self.on_road[pt];
        if !on_road && !self.flag_placeable(pt) {
            return false;
        }
        if on_road {
            if self.size.neighbors(pt).iter().any(|&n| self.has_flag(n)) {
                return false;
            }
            self.split_road_at(pt);
        }
        self.objects[pt] = NodeObject::Flag { owner: player };
        self.rebuild_road_index();
        true
    }

    fn split_road_at(&mut self, pt: MapPoint) {
        let mut found = None;
        'roads: for (idx, road) in self.roads.iter().enumerate() {
            let mut cur = road.start;
            for (step, &dir) in road.route.iter().enumerate() {
                cur = self.size.neighbor(cur, dir);
                if cur == pt && step + 1 < road.route.len() {
                    found = Some((idx, step + 1));
                    break 'roads;
                }
            }
        }
        if let Some((idx, split)) = found {
            let road = self.roads.remove(idx);
            let first = SimRoad {
                owner: road.owner,
                start: road.start,
                route: road.route[..split].to_vec(),
            };
            let second =
                SimRoad { owner: road.owner, start: pt, route: road.route[split..].to_vec() };
            self.roads.push(first);
            self.roads.push(second);
        }
    }

    /// Roads touching the flag, with the direction they leave it
    fn roads_at(&self, flag: MapPoint) -> Vec<(usize, Direction)> {
        let mut result = Vec::new();
        for (idx, road) in self.roads.iter().enumerate() {
            if road.route.is_empty() {
                continue;
            }
            if road.start == flag {
                result.push((idx, road.route[0]));
            }
            if self.road_end(road) == flag {
                if let Some(&last) = road.route.last() {
                    result.push((idx, last.opposite()));
                }
            }
        }
        result
    }

    fn remove_building(&mut self, pos: MapPoint) {
        if let Some(bld) = self.buildings.remove(&pos) {
            self.objects[pos] = NodeObject::Nothing;
            self.bus.publish(Note::Building {
                player: bld.owner,
                pos,
                kind: BuildingNoteKind::Destroyed,
                building: bld.kind,
            });
        }
    }

    fn remove_flag(&mut self, pos: MapPoint) {
        let mut roads: Vec<usize> = self.roads_at(pos).into_iter().map(|(i, _)| i).collect();
        roads.sort_unstable();
        roads.dedup();
        for idx in roads.into_iter().rev() {
            self.roads.remove(idx);
        }
        let building = self.size.neighbor(pos, Direction::NorthWest);
        if self.objects[building].is_building_or_site() {
            self.remove_building(building);
        }
        self.objects[pos] = NodeObject::Nothing;
        self.rebuild_road_index();
    }

    fn build_road(&mut self, player: PlayerId, start: MapPoint, route: &[Direction]) -> bool {
        if route.is_empty() || self.objects[start] != (NodeObject::Flag { owner: player }) {
            return false;
        }
        if self.roads_at(start).iter().any(|&(_, d)| d == route[0]) {
            return false;
        }
        let mut cur = start;
        for (i, &dir) in route.iter().enumerate() {
            cur = self.size.neighbor(cur, dir);
            let last = i + 1 == route.len();
            if last {
                if self.objects[cur] != (NodeObject::Flag { owner: player }) || cur == start {
                    return false;
                }
                if self.roads_at(cur).iter().any(|&(_, d)| d == dir.opposite()) {
                    return false;
                }
            } else if !self.is_road_node_ok(cur)
                || self.objects[cur] != NodeObject::Nothing
                || self.owner[cur] != Some(player)
            {
                return false;
            }
        }
        self.roads.push(SimRoad { owner: player, start, route: route.to_vec() });
        self.rebuild_road_index();
        true
    }

    fn apply(&mut self, player: PlayerId, command: &Command) -> bool {
        match command {
            Command::SetBuildingSite { pos, kind } => {
                if !self.building_quality(player, *pos).permits(kind.size())
                    || !self.can_build(player, *kind)
                {
                    return false;
                }
                let flag = self.size.neighbor(*pos, Direction::SouthEast);
                if !self.place_flag(player, flag) {
                    return false;
                }
                self.add_site(player, *pos, *kind);
                true
            }
            Command::DestroyBuilding { pos } => match self.buildings.get(pos) {
                Some(bld) if bld.owner == player => {
                    self.remove_building(*pos);
                    true
                }
                _ => false,
            },
            Command::DestroyFlag { pos } => {
                if self.objects[*pos] != (NodeObject::Flag { owner: player }) {
                    return false;
                }
                self.remove_flag(*pos);
                true
            }
            Command::DestroyRoad { flag, dir } => {
                let found = self.roads_at(*flag).into_iter().find(|&(_, d)| d == *dir);
                match found {
                    Some((idx, _)) if self.roads[idx].owner == player => {
                        self.roads.remove(idx);
                        self.rebuild_road_index();
                        true
                    }
                    _ => false,
                }
            }
            Command::BuildRoad { start, route } => {
                let ok = self.build_road(player, *start, route);
                if let Some(&dir) = route.first() {
                    let kind = if ok {
                        RoadNoteKind::Constructed
                    } else {
                        RoadNoteKind::ConstructionFailed
                    };
                    self.bus.publish(Note::Road { player, pos: *start, kind, dir });
                }
                ok
            }
            Command::SetFlag { pos } => self.place_flag(player, *pos),
            Command::SetProductionEnabled { pos, enabled } => {
                self.with_own_building(player, *pos, |b| b.production_disabled = !enabled)
            }
            Command::SetCoinsAllowed { pos, enabled } => {
                self.with_own_building(player, *pos, |b| b.gold_disabled = !enabled)
            }
            Command::SetTroopLimit { pos, rank, limit } => {
                let rank = (*rank as usize).min(4);
                self.with_own_building(player, *pos, |b| b.troop_limits[rank] = *limit)
            }
            Command::ChangeReserve { pos, count, .. } => {
                self.with_own_building(player, *pos, |b| b.reserve = *count)
            }
            Command::SetInventorySetting { pos, item, setting } => {
                self.with_own_building(player, *pos, |b| b.set_setting(*item, *setting))
            }
            Command::StartStopExpedition { pos, start } => {
                self.with_own_building(player, *pos, |b| b.expedition_active = *start)
            }
            Command::SetShipYardMode { pos, ships } => {
                self.with_own_building(player, *pos, |b| b.ship_mode = *ships)
            }
            Command::ChangeDistribution(values) => {
                self.player_mut(player).distribution = Some(*values);
                true
            }
            Command::ChangeMilitary(settings) => {
                self.player_mut(player).military = *settings;
                true
            }
            Command::ChangeTools(settings) => {
                self.player_mut(player).tools = *settings;
                true
            }
            Command::Surrender => {
                self.player_mut(player).surrendered = true;
                true
            }
            Command::Attack { .. }
            | Command::SeaAttack { .. }
            | Command::FoundColony { .. }
            | Command::TravelToNextSpot { .. }
            | Command::CancelExpedition { .. }
            | Command::Chat { .. } => true,
        }
    }

    fn with_own_building(
        &mut self,
        player: PlayerId,
        pos: MapPoint,
        f: impl FnOnce(&mut SimBuilding),
    ) -> bool {
        match self.buildings.get_mut(&pos) {
            Some(bld) if bld.owner == player => {
                f(bld);
                true
            }
            _ => false,
        }
    }

    fn completed(&self, player: PlayerId) -> impl Iterator<Item = (&MapPoint, &SimBuilding)> + '_ {
        self.buildings
            .iter()
            .filter(move |(_, b)| b.owner == player && !b.site)
    }

    /// Sorted so query results don't depend on hash order
    fn sorted<T>(mut items: Vec<(MapPoint, T)>) -> Vec<T> {
        items.sort_by_key(|(pos, _)| (pos.y, pos.x));
        items.into_iter().map(|(_, item)| item).collect()
    }

    fn sighting(&self, pos: MapPoint, bld: &SimBuilding) -> MilitarySighting {
        MilitarySighting {
            pos,
            owner: bld.owner,
            kind: bld.kind,
            defenders: bld.troops,
            strength: bld.strength,
            new_built: bld.new_built,
            under_attack: bld.under_attack,
        }
    }

    fn is_garrisoned(bld: &SimBuilding) -> bool {
        !bld.site && (bld.kind.is_military() || bld.kind.is_warehouse())
    }
}

impl GameWorld for SimWorld {
    fn map_size(&self) -> MapSize {
        self.size
    }

    fn building_quality(&self, player: PlayerId, pt: MapPoint) -> BuildingQuality {
        if self.owner[pt] != Some(player) {
            return BuildingQuality::Nothing;
        }
        self.bq_for(pt)
    }

    fn building_quality_any_owner(&self, pt: MapPoint) -> BuildingQuality {
        self.bq_for(pt)
    }

    fn subsurface_resource(&self, pt: MapPoint) -> Option<SubsurfaceResource> {
        self.subsurface[pt]
    }

    fn surface_resource(&self, pt: MapPoint) -> SurfaceResource {
        match self.objects[pt] {
            NodeObject::Tree { produces_wood: true } => SurfaceResource::Wood,
            NodeObject::Granite => SurfaceResource::Stones,
            NodeObject::Nothing | NodeObject::Flag { .. } => SurfaceResource::Nothing,
            _ => SurfaceResource::Blocked,
        }
    }

    fn is_vital(&self, pt: MapPoint) -> bool {
        self.terrain[pt] == Terrain::Meadow
    }

    fn is_on_road(&self, pt: MapPoint) -> bool {
        self.on_road[pt]
    }

    fn is_road_node_ok(&self, pt: MapPoint) -> bool {
        self.terrain[pt].walkable()
            && matches!(self.objects[pt], NodeObject::Nothing | NodeObject::Flag { .. })
            && !self.is_road_inner(pt)
    }

    fn owner(&self, pt: MapPoint) -> Option<PlayerId> {
        self.owner[pt]
    }

    fn is_border(&self, player: PlayerId, pt: MapPoint) -> bool {
        self.owner[pt] == Some(player)
            && self
                .size
                .neighbors(pt)
                .iter()
                .any(|&n| self.owner[n] != Some(player))
    }

    fn is_visible(&self, player: PlayerId, pt: MapPoint) -> bool {
        !self.hidden.contains(&(player, pt))
    }

    fn has_fish(&self, pt: MapPoint) -> bool {
        self.fish[pt]
    }

    fn object_at(&self, pt: MapPoint) -> NodeObject {
        self.objects[pt]
    }

    fn flag(&self, pt: MapPoint) -> Option<FlagInfo> {
        let NodeObject::Flag { owner } = self.objects[pt] else {
            return None;
        };
        let mut routes: [Option<RoadInfo>; 6] = [None; 6];
        for (idx, dir) in self.roads_at(pt) {
            let road = &self.roads[idx];
            let end = self.road_end(road);
            let info = if road.start == pt && road.route[0] == dir {
                RoadInfo {
                    other_flag: end,
                    other_dir: road.route[road.route.len() - 1].opposite(),
                    length: road.route.len() as u32,
                }
            } else {
                RoadInfo {
                    other_flag: road.start,
                    other_dir: road.route[0],
                    length: road.route.len() as u32,
                }
            };
            routes[dir.index()] = Some(info);
        }
        Some(FlagInfo { pos: pt, owner, routes })
    }

    fn flags(&self, player: PlayerId) -> Vec<MapPoint> {
        self.objects
            .iter()
            .filter(|(_, o)| **o == NodeObject::Flag { owner: player })
            .map(|(pt, _)| pt)
            .collect()
    }

    fn road_route(&self, flag: MapPoint, dir: Direction) -> Option<Vec<Direction>> {
        let (idx, _) = self.roads_at(flag).into_iter().find(|&(_, d)| d == dir)?;
        let road = &self.roads[idx];
        if road.start == flag && road.route[0] == dir {
            Some(road.route.clone())
        } else {
            Some(road.route.iter().rev().map(|d| d.opposite()).collect())
        }
    }

    fn huntable_animals(&self, pt: MapPoint, radius: u32) -> Vec<MapPoint> {
        self.animals
            .iter()
            .copied()
            .filter(|&a| self.size.distance(pt, a) <= radius)
            .collect()
    }

    fn find_human_path(&self, from: MapPoint, to: MapPoint, max_len: u32) -> Option<u32> {
        let mut seen = AHashSet::new();
        seen.insert(from);
        let mut queue = VecDeque::from([(from, 0u32)]);
        while let Some((pt, dist)) = queue.pop_front() {
            if pt == to {
                return Some(dist);
            }
            if dist >= max_len {
                continue;
            }
            for n in self.size.neighbors(pt) {
                let passable = n == to
                    || (self.terrain[n].walkable()
                        && matches!(
                            self.objects[n],
                            NodeObject::Nothing | NodeObject::Flag { .. }
                        ));
                if passable && seen.insert(n) {
                    queue.push_back((n, dist + 1));
                }
            }
        }
        None
    }

    fn find_free_path_for_new_road(
        &self,
        player: PlayerId,
        from_flag: MapPoint,
        to_flag: MapPoint,
        max_len: u32,
    ) -> Option<Vec<Direction>> {
        let mut came_from: AHashMap<MapPoint, (MapPoint, Direction)> = AHashMap::new();
        let mut queue = VecDeque::from([(from_flag, 0u32)]);
        came_from.insert(from_flag, (from_flag, Direction::West));
        while let Some((pt, dist)) = queue.pop_front() {
            if pt == to_flag {
                let mut route = Vec::new();
                let mut cur = pt;
                while cur != from_flag {
                    let (prev, dir) = came_from[&cur];
                    route.push(dir);
                    cur = prev;
                }
                route.reverse();
                return Some(route);
            }
            if dist >= max_len {
                continue;
            }
            for dir in Direction::ALL {
                let n = self.size.neighbor(pt, dir);
                if came_from.contains_key(&n) {
                    continue;
                }
                let ok = n == to_flag
                    || (self.is_road_node_ok(n)
                        && self.objects[n] == NodeObject::Nothing
                        && self.owner[n] == Some(player));
                if ok {
                    came_from.insert(n, (pt, dir));
                    queue.push_back((n, dist + 1));
                }
            }
        }
        None
    }

    fn road_distance(
        &self,
        player: PlayerId,
        from_flag: MapPoint,
        to_flag: MapPoint,
        max_len: u32,
    ) -> Option<u32> {
        let mut best: AHashMap<MapPoint, u32> = AHashMap::new();
        best.insert(from_flag, 0);
        let mut queue = VecDeque::from([from_flag]);
        while let Some(pt) = queue.pop_front() {
            let dist = best[&pt];
            let Some(flag) = self.flag(pt) else {
                continue;
            };
            if flag.owner != player {
                continue;
            }
            for road in flag.routes.iter().flatten() {
                let next = dist + road.length;
                if next > max_len {
                    continue;
                }
                if best.get(&road.other_flag).map_or(true, |&d| next < d) {
                    best.insert(road.other_flag, next);
                    queue.push_back(road.other_flag);
                }
            }
        }
        best.get(&to_flag).copied()
    }

    fn buildings(&self, player: PlayerId) -> Vec<BuildingInfo> {
        let items = self
            .completed(player)
            .filter(|(_, b)| !b.kind.is_military() && !b.kind.is_warehouse())
            .map(|(&pos, b)| {
                (
                    pos,
                    BuildingInfo {
                        pos,
                        kind: b.kind,
                        has_worker: b.has_worker,
                        productivity: b.productivity,
                        wares: b.wares,
                        ordered_wares: b.ordered_wares,
                        production_disabled: b.production_disabled,
                    },
                )
            })
            .collect();
        Self::sorted(items)
    }

    fn building_sites(&self, player: PlayerId) -> Vec<SiteInfo> {
        let items = self
            .buildings
            .iter()
            .filter(|(_, b)| b.owner == player && b.site)
            .map(|(&pos, b)| (pos, SiteInfo { pos, kind: b.kind }))
            .collect();
        Self::sorted(items)
    }

    fn military_buildings(&self, player: PlayerId) -> Vec<MilitaryInfo> {
        let items = self
            .completed(player)
            .filter(|(_, b)| b.kind.is_military())
            .map(|(&pos, b)| {
                (
                    pos,
                    MilitaryInfo {
                        pos,
                        kind: b.kind,
                        frontier: b.frontier,
                        troops: b.troops,
                        troop_limits: b.troop_limits,
                        gold_disabled: b.gold_disabled,
                        new_built: b.new_built,
                        under_attack: b.under_attack,
                        useless: b.useless,
                        demolition_allowed: true,
                    },
                )
            })
            .collect();
        Self::sorted(items)
    }

    fn warehouses(&self, player: PlayerId) -> Vec<WarehouseInfo> {
        let items = self
            .completed(player)
            .filter(|(_, b)| b.kind.is_warehouse())
            .map(|(&pos, b)| {
                (
                    pos,
                    WarehouseInfo {
                        pos,
                        kind: b.kind,
                        inventory: b.inventory.clone(),
                        settings: b.settings.clone(),
                        expedition_active: b.expedition_active,
                    },
                )
            })
            .collect();
        Self::sorted(items)
    }

    fn military_buildings_near(&self, pt: MapPoint, radius: u32) -> Vec<MilitarySighting> {
        let items = self
            .buildings
            .iter()
            .filter(|&(&pos, b)| Self::is_garrisoned(b) && self.size.distance(pt, pos) <= radius)
            .map(|(&pos, b)| (pos, self.sighting(pos, b)))
            .collect();
        Self::sorted(items)
    }

    fn military_building_at(&self, pt: MapPoint) -> Option<MilitarySighting> {
        self.buildings
            .get(&pt)
            .filter(|b| Self::is_garrisoned(b))
            .map(|b| self.sighting(pt, b))
    }

    fn is_attackable(&self, player: PlayerId, other: PlayerId) -> bool {
        player != other
            && !self
                .players
                .get(&player)
                .is_some_and(|p| p.allies.contains(&other))
    }

    fn soldiers_for_attack(&self, from: MapPoint, _target: MapPoint) -> AttackForce {
        match self.buildings.get(&from) {
            Some(b) if b.kind.is_military() && !b.site && b.troops > 1 => {
                let soldiers = b.troops - 1;
                AttackForce { soldiers, strength: b.strength * soldiers / b.troops }
            }
            _ => AttackForce::default(),
        }
    }

    fn harbor_points(&self) -> Vec<HarborPoint> {
        self.harbor_points.clone()
    }

    fn is_harbor_point_free(&self, pos: MapPoint, player: PlayerId) -> bool {
        !self.objects[pos].is_building_or_site()
            && self.owner[pos].map_or(true, |o| o == player)
    }

    fn ships(&self, player: PlayerId) -> Vec<ShipInfo> {
        self.ships
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, s)| *s)
            .collect()
    }

    fn sea_attackers_at_sea(&self, player: PlayerId, sea: SeaId) -> u32 {
        self.sea_attackers.get(&(player, sea)).copied().unwrap_or(0)
    }

    fn filtered_seas_for_attack(
        &self,
        target: MapPoint,
        seas: &[SeaId],
        _player: PlayerId,
    ) -> Vec<SeaId> {
        let mut result: Vec<SeaId> = self
            .harbor_points
            .iter()
            .filter(|h| self.size.distance(h.pos, target) <= 12)
            .flat_map(|h| h.seas.iter().copied())
            .filter(|s| seas.contains(s))
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    fn soldiers_for_sea_attack(&self, player: PlayerId, target: MapPoint) -> AttackForce {
        let seas: Vec<SeaId> = self
            .sea_attackers
            .keys()
            .filter(|(p, _)| *p == player)
            .map(|&(_, s)| s)
            .collect();
        let soldiers = self
            .filtered_seas_for_attack(target, &seas, player)
            .iter()
            .map(|&s| self.sea_attackers_at_sea(player, s))
            .sum();
        AttackForce { soldiers, strength: soldiers }
    }

    fn is_exploration_direction_possible(&self, ship: ShipId, dir: ShipDirection) -> bool {
        self.explorable.contains(&(ship, dir))
    }

    fn inventory(&self, player: PlayerId) -> Inventory {
        let mut total = Inventory::new();
        for (_, b) in self.completed(player).filter(|(_, b)| b.kind.is_warehouse()) {
            total.merge(&b.inventory);
        }
        total
    }

    fn military_settings(&self, player: PlayerId) -> MilitarySettings {
        self.players.get(&player).map(|p| p.military).unwrap_or_default()
    }

    fn tool_settings(&self, player: PlayerId) -> ToolSettings {
        self.players.get(&player).map(|p| p.tools).unwrap_or_default()
    }

    fn game_settings(&self) -> GameSettings {
        self.settings
    }

    fn can_build(&self, player: PlayerId, kind: BuildingType) -> bool {
        !self
            .players
            .get(&player)
            .is_some_and(|p| p.forbidden.contains(&kind))
    }

    fn issue(&mut self, player: PlayerId, command: Command) -> bool {
        let accepted = self.apply(player, &command);
        self.log.push((player, command));
        accepted
    }

    fn notifications(&self) -> &NotificationBus {
        &self.bus
    }
}
