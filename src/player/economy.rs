//! Economy management: distribution, warehouse blocking, gathering,
//! tool and military settings, production throttling and expeditions

use ahash::AHashSet;
use tracing::{debug, trace};

use crate::core::types::{
    BuildingType, FrontierDistance, GoodType, Inventory, InventorySetting, Job, MilitarySettings,
    SeaId, StockItem, Tool, ToolSettings, DISTRIBUTION_BOARDS_METALWORKS,
    DISTRIBUTION_BOARDS_SHIPYARD, DISTRIBUTION_LEN,
};
use crate::map::point::{Direction, MapPoint};
use crate::player::AiPlayer;
use crate::world::{Command, GameWorld, WarehouseInfo};

/// Warehouses this close to a non-interior military building are at the front
const FRONTIER_WAREHOUSE_RADIUS: u32 = 12;
/// Road search limit when grouping warehouses
const WAREHOUSE_LINK_SEARCH: u32 = 500;
/// Helpers gathered at the upgrade warehouse
const GATHER_HELPERS: u32 = 50;

/// Goods gathered where soldiers are trained
const GATHER_GOODS: [GoodType; 3] = [GoodType::Beer, GoodType::Sword, GoodType::Shield];

impl AiPlayer {
    /// Default distribution: few boards for metalworks and shipyards
    pub(crate) fn init_distribution<W: GameWorld>(&self, world: &mut W) {
        let mut settings = [10u8; DISTRIBUTION_LEN];
        settings[DISTRIBUTION_BOARDS_METALWORKS] = 4;
        settings[DISTRIBUTION_BOARDS_SHIPYARD] = 2;
        world.issue(self.player, Command::ChangeDistribution(settings));
    }

    fn toggle_stop<W: GameWorld>(&self, world: &mut W, wh: &WarehouseInfo, item: StockItem) {
        let mut setting = wh.setting(item);
        setting.stop = !setting.stop;
        world.issue(self.player, Command::SetInventorySetting { pos: wh.pos, item, setting });
    }

    fn set_stop<W: GameWorld>(
        &self,
        world: &mut W,
        wh: &WarehouseInfo,
        item: StockItem,
        stop: bool,
    ) {
        if wh.setting(item).stop != stop {
            self.toggle_stop(world, wh, item);
        }
    }

    /// Warehouses split into groups connected over roads
    fn warehouse_groups<W: GameWorld>(
        &self,
        world: &W,
        warehouses: &[WarehouseInfo],
    ) -> Vec<Vec<usize>> {
        let size = world.map_size();
        let flag = |wh: &WarehouseInfo| size.neighbor(wh.pos, Direction::SouthEast);
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (idx, wh) in warehouses.iter().enumerate() {
            let joined = groups.iter_mut().find(|group| {
                let front = flag(&warehouses[group[0]]);
                world
                    .road_distance(self.player, flag(wh), front, WAREHOUSE_LINK_SEARCH)
                    .is_some()
            });
            match joined {
                Some(group) => group.push(idx),
                None => groups.push(vec![idx]),
            }
        }
        groups
    }

    /// Spread `good` by blocking warehouses holding more than `limit`
    ///
    /// Within each road-connected group, warehouses above the limit stop
    /// accepting the good while any other one is short. On maps with many
    /// harbors nothing is blocked.
    pub fn distribute_goods_by_blocking<W: GameWorld>(
        &mut self,
        world: &mut W,
        good: GoodType,
        limit: u32,
    ) {
        let warehouses = world.warehouses(self.player);
        let item = StockItem::Good(good);
        let harbors = warehouses.iter().filter(|wh| wh.is_harbor()).count();
        if harbors >= warehouses.len() / 2 {
            for wh in &warehouses {
                self.set_stop(world, wh, item, false);
            }
            return;
        }
        for group in self.warehouse_groups(world, &warehouses) {
            let all_stocked = group.iter().all(|&i| warehouses[i].inventory.good(good) > limit);
            for &i in &group {
                let wh = &warehouses[i];
                let block = !all_stocked && wh.inventory.good(good) > limit;
                self.set_stop(world, wh, item, block);
            }
        }
    }

    /// Keep a few top-rank soldiers in every frontier warehouse
    ///
    /// Without frontier warehouses the warehouse next to the upgrade
    /// building blocks them so they leave for the others.
    pub fn distribute_max_rank_soldiers_by_blocking<W: GameWorld>(
        &mut self,
        world: &mut W,
        limit: u32,
        upgrade_wh: MapPoint,
    ) {
        let warehouses = world.warehouses(self.player);
        if warehouses.is_empty() {
            return;
        }
        let rank = (world.game_settings().max_military_rank as usize).min(Job::SOLDIERS.len() - 1);
        let item = StockItem::People(Job::SOLDIERS[rank]);
        let stock = |wh: &WarehouseInfo| wh.inventory.people(Job::SOLDIERS[rank]);
        if warehouses.len() == 1 {
            self.set_stop(world, &warehouses[0], item, false);
            return;
        }

        let size = world.map_size();
        let frontier_mil: Vec<MapPoint> = world
            .military_buildings(self.player)
            .into_iter()
            .filter(|m| m.frontier != FrontierDistance::Far && !m.new_built)
            .map(|m| m.pos)
            .collect();
        let frontier: Vec<bool> = warehouses
            .iter()
            .map(|wh| {
                frontier_mil
                    .iter()
                    .any(|&m| size.distance(wh.pos, m) < FRONTIER_WAREHOUSE_RADIUS)
            })
            .collect();

        if frontier.iter().any(|&f| f) {
            let understaffed = warehouses
                .iter()
                .zip(&frontier)
                .any(|(wh, &f)| f && stock(wh) < limit);
            for (wh, &f) in warehouses.iter().zip(&frontier) {
                let block = !f || (understaffed && stock(wh) >= limit);
                self.set_stop(world, wh, item, block);
            }
        } else {
            let understaffed = warehouses
                .iter()
                .any(|wh| wh.pos != upgrade_wh && stock(wh) < limit);
            for wh in &warehouses {
                let block = if wh.pos == upgrade_wh {
                    true
                } else {
                    understaffed && stock(wh) >= limit
                };
                self.set_stop(world, wh, item, block);
            }
        }
    }

    /// Warehouse closest to the upgrade building, else the first one
    pub fn upgrade_building_warehouse<W: GameWorld>(&mut self, world: &W) -> Option<WarehouseInfo> {
        let mut warehouses = world.warehouses(self.player);
        if warehouses.is_empty() {
            return None;
        }
        let upgrade = self.update_upgrade_building(world);
        if let (Some(_), Some(pos)) = (upgrade, self.upgrade_bld_pos) {
            if warehouses.len() > 1 {
                let size = world.map_size();
                let flag = size.neighbor(pos, Direction::SouthEast);
                let closest = warehouses
                    .iter()
                    .enumerate()
                    .filter_map(|(i, wh)| {
                        let wh_flag = size.neighbor(wh.pos, Direction::SouthEast);
                        world
                            .road_distance(self.player, flag, wh_flag, WAREHOUSE_LINK_SEARCH)
                            .map(|d| (d, i))
                    })
                    .min();
                if let Some((_, i)) = closest {
                    return Some(warehouses.swap_remove(i));
                }
            }
        }
        Some(warehouses.swap_remove(0))
    }

    /// Gather beer, weapons, privates and helpers at `upgrade_wh` only
    pub fn set_gathering_for_upgrade_warehouse<W: GameWorld>(
        &mut self,
        world: &mut W,
        upgrade_wh: MapPoint,
    ) {
        let can_upgrade = world.game_settings().max_military_rank > 0;
        for wh in world.warehouses(self.player) {
            let mut items: Vec<StockItem> =
                GATHER_GOODS.iter().map(|&g| StockItem::Good(g)).collect();
            items.push(StockItem::People(Job::Private));
            if wh.pos != upgrade_wh {
                items.push(StockItem::People(Job::Helper));
                for item in items {
                    if wh.setting(item).collect {
                        let setting = InventorySetting::NONE;
                        world.issue(
                            self.player,
                            Command::SetInventorySetting { pos: wh.pos, item, setting },
                        );
                    }
                }
                continue;
            }
            for item in items {
                let wanted = match item {
                    StockItem::People(Job::Private) => can_upgrade,
                    _ => true,
                };
                if wanted && !wh.setting(item).collect {
                    let setting = InventorySetting::COLLECT;
                    world.issue(
                        self.player,
                        Command::SetInventorySetting { pos: wh.pos, item, setting },
                    );
                }
            }
            let helpers = StockItem::People(Job::Helper);
            let collect = wh.inventory.people(Job::Helper) < GATHER_HELPERS;
            if collect != wh.setting(helpers).collect {
                let setting =
                    if collect { InventorySetting::COLLECT } else { InventorySetting::NONE };
                world.issue(
                    self.player,
                    Command::SetInventorySetting { pos: wh.pos, item: helpers, setting },
                );
            }
        }
    }

    /// Priority for producing `tool`: 4 or 2 when workers lack it, else 0
    fn tool_priority(&self, inventory: &Inventory, tool: Tool) -> u8 {
        let good = tool.good();
        let mut available = inventory.good(good);
        let mut jobs: Vec<Job> = BuildingType::ALL
            .iter()
            .filter_map(|b| b.worker())
            .filter(|job| job.tool() == Some(tool))
            .collect();
        jobs.sort_unstable();
        jobs.dedup();
        for job in jobs {
            let needed: u32 = BuildingType::ALL
                .iter()
                .filter(|b| b.worker() == Some(job))
                .map(|&b| self.planner.buildings(b))
                .sum();
            let idle = inventory.people(job);
            if needed <= idle {
                continue;
            }
            let required = needed - idle;
            if required > available {
                return if inventory.good(good) == 0 { 4 } else { 2 };
            }
            available -= required;
        }
        0
    }

    /// Tool priorities from missing workers
    pub fn calc_tool_settings<W: GameWorld>(&self, world: &W) -> ToolSettings {
        let inventory = world.inventory(self.player);
        let mut settings = ToolSettings::default();
        let basic = [Tool::Axe, Tool::Saw, Tool::PickAxe, Tool::Crucible];
        for tool in basic {
            settings.0[tool as usize] = self.tool_priority(&inventory, tool);
        }
        let have = |good: GoodType, job: Job| inventory.good(good) + inventory.people(job);
        if have(GoodType::Saw, Job::Carpenter) < 2 {
            settings.0[Tool::Saw as usize] = 10;
        }
        if have(GoodType::Axe, Job::Woodcutter) < 2 {
            settings.0[Tool::Axe as usize] = 10;
        }
        if have(GoodType::PickAxe, Job::Stonemason) < 2 {
            settings.0[Tool::PickAxe as usize] = 7;
        }
        if basic.iter().all(|&t| settings.0[t as usize] == 0) {
            for tool in [
                Tool::Hammer,
                Tool::Scythe,
                Tool::Rollingpin,
                Tool::Shovel,
                Tool::Tongs,
                Tool::Cleaver,
                Tool::RodAndLine,
                Tool::Bow,
            ] {
                settings.0[tool as usize] = self.tool_priority(&inventory, tool);
            }
            for tool in [Tool::Hammer, Tool::Shovel, Tool::Tongs] {
                if inventory.good(tool.good()) == 0 {
                    settings.0[tool as usize] = settings.0[tool as usize].max(1);
                }
            }
            if inventory.good(GoodType::Axe) == 0 && inventory.people(Job::Woodcutter) < 12 {
                let axe = &mut settings.0[Tool::Axe as usize];
                *axe = if *axe == 0 { 4 } else { 7 };
            }
        }
        settings
    }

    /// Military settings for the current situation
    pub fn calc_military_settings<W: GameWorld>(&mut self, world: &W) -> MilitarySettings {
        let inventory = world.inventory(self.player);
        let has_mint = self.planner.buildings(BuildingType::Mint) > 0;
        let coins = inventory.good(GoodType::Coins) > 0
            || (inventory.good(GoodType::Gold) > 0
                && inventory.good(GoodType::Coal) > 0
                && has_mint);
        let upgrade = self.update_upgrade_building(world).is_some();
        let frontier = self.has_frontier_buildings(world);
        let sea = world.game_settings().sea_attack;
        MilitarySettings([
            10,
            if frontier { 5 } else { 0 },
            4,
            5,
            if upgrade && coins { 8 } else { 0 },
            self.calc_mil_settings(world),
            if sea { 8 } else { 0 },
            8,
        ])
    }

    /// Review tool and military settings, sending only real changes
    pub fn adjust_settings<W: GameWorld>(&mut self, world: &mut W) {
        if self.planner.buildings(BuildingType::Metalworks) > 0 {
            let tools = self.calc_tool_settings(world);
            if tools != world.tool_settings(self.player) {
                debug!(player = self.player.0, ?tools, "changing tool priorities");
                world.issue(self.player, Command::ChangeTools(tools));
            }
        }
        let settings = self.calc_military_settings(world);
        let current = world.military_settings(self.player);
        if [1, 4, 5, 6].iter().any(|&i| settings.0[i] != current.0[i]) {
            debug!(player = self.player.0, settings = ?settings.0, "changing military settings");
            world.issue(self.player, Command::ChangeMilitary(settings));
        }
    }

    /// Pause the only forester while the realm is still tiny
    pub fn check_forester<W: GameWorld>(&mut self, world: &mut W) {
        let foresters: Vec<_> = world
            .buildings(self.player)
            .into_iter()
            .filter(|b| b.kind == BuildingType::Forester)
            .collect();
        let Some(first) = foresters.first() else {
            return;
        };
        let tiny = foresters.len() < 2
            && world.military_buildings(self.player).len() < 3
            && world.building_sites(self.player).len() < 3;
        if tiny == !first.production_disabled {
            let toggle = Command::SetProductionEnabled { pos: first.pos, enabled: !tiny };
            world.issue(self.player, toggle);
        }
    }

    /// Granite mines only run while stones are short
    pub fn check_granite_mine<W: GameWorld>(&mut self, world: &mut W) {
        let warehouses = world.warehouses(self.player);
        let stones: u32 = warehouses.iter().map(|wh| wh.inventory.good(GoodType::Stones)).sum();
        let enable = stones < 100 || stones < 15 * warehouses.len() as u32;
        for mine in world.buildings(self.player) {
            if mine.kind == BuildingType::GraniteMine && mine.production_disabled == enable {
                trace!(player = self.player.0, pos = %mine.pos, enable, "granite mine toggled");
                let toggle = Command::SetProductionEnabled { pos: mine.pos, enabled: enable };
                world.issue(self.player, toggle);
            }
        }
    }

    /// Harbors prepare expeditions while free harbor spots exist; ships
    /// left waiting get instructions
    pub fn check_expeditions<W: GameWorld>(&mut self, world: &mut W) {
        for harbor in world.warehouses(self.player).into_iter().filter(|wh| wh.is_harbor()) {
            let relevant = self.harbor_pos_relevant(world, harbor.pos, true);
            if harbor.expedition_active != relevant {
                let command = Command::StartStopExpedition { pos: harbor.pos, start: relevant };
                world.issue(self.player, command);
            }
        }
        for ship in world.ships(self.player) {
            if ship.waiting_for_expedition {
                self.handle_expedition(world, &ship);
            }
        }
    }

    /// Whether a harbor at `pos` leads anywhere
    ///
    /// The spot must share a sea with another harbor spot. With
    /// `only_empty` that other spot must still be free for a colony.
    pub fn harbor_pos_relevant<W: GameWorld>(
        &self,
        world: &W,
        pos: MapPoint,
        only_empty: bool,
    ) -> bool {
        let points = world.harbor_points();
        let Some(spot) = points.iter().find(|h| h.pos == pos) else {
            return false;
        };
        points.iter().any(|other| {
            other.pos != pos
                && other.seas.iter().any(|sea| spot.seas.contains(sea))
                && (!only_empty || world.is_harbor_point_free(other.pos, self.player))
        })
    }

    /// Seas touched by at least two harbor spots
    pub fn num_relevant_seas<W: GameWorld>(&self, world: &W) -> usize {
        let mut once: AHashSet<SeaId> = AHashSet::new();
        let mut valid: AHashSet<SeaId> = AHashSet::new();
        for spot in world.harbor_points() {
            let seas: AHashSet<SeaId> = spot.seas.iter().copied().collect();
            for sea in seas {
                if !once.insert(sea) {
                    valid.insert(sea);
                }
            }
        }
        valid.len()
    }
}
