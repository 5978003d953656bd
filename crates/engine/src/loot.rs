use rand::Rng;
use serde::{Deserialize, Serialize};

/// A quantity of one item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemStack {
    pub item_id: i32,
    pub count: u32,
}

/// One loot table line: a set of candidate item ids, a count range, and the
/// chances controlling whether and how often the line fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableEntry {
    #[serde(default)]
    pub item_ids: Vec<i32>,
    #[serde(default = "one")]
    pub min_count: u32,
    #[serde(default = "one")]
    pub max_count: u32,
    #[serde(default = "full_probability")]
    pub probability: f32,
    #[serde(default = "unit_weight")]
    pub weight: f32,
    #[serde(default)]
    pub allow_multiple_rolls: bool,
}

fn one() -> u32 {
    1
}

fn full_probability() -> f32 {
    1.0
}

fn unit_weight() -> f32 {
    1.0
}

impl TableEntry {
    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<ItemStack> {
        if self.item_ids.is_empty() || self.probability <= rng.random_range(0.0..1.0) {
            return None;
        }
        let item_id = self.item_ids[rng.random_range(0..self.item_ids.len())];
        // Defs may carry an inverted count range; the lower bound wins.
        let count = rng.random_range(self.min_count..=self.max_count.max(self.min_count));
        Some(ItemStack { item_id, count })
    }
}

/// In fixed mode every entry is rolled exactly once. In random-roll mode a
/// roll count is drawn from `[min_rolls, max_rolls]` and each roll picks an
/// entry by weight; entries that disallow multiple rolls leave the pool
/// once picked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LootTable {
    #[serde(default)]
    pub entries: Vec<TableEntry>,
    #[serde(default)]
    pub random_rolls_enabled: bool,
    #[serde(default)]
    pub min_rolls: u32,
    #[serde(default)]
    pub max_rolls: u32,
}

impl LootTable {
    pub fn generate_loot<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<ItemStack> {
        let mut stacks: Vec<ItemStack> = Vec::new();
        if self.random_rolls_enabled {
            self.roll_weighted(rng, &mut stacks);
        } else {
            for entry in &self.entries {
                if let Some(stack) = entry.roll(rng) {
                    merge_stack(&mut stacks, stack);
                }
            }
        }
        stacks.retain(|stack| stack.count > 0);
        stacks
    }

    fn roll_weighted<R: Rng + ?Sized>(&self, rng: &mut R, stacks: &mut Vec<ItemStack>) {
        let mut banned = vec![false; self.entries.len()];
        let mut total_weight: f32 = self.entries.iter().map(|entry| entry.weight).sum();
        let roll_count = rng.random_range(self.min_rolls..=self.max_rolls.max(self.min_rolls));

        for _ in 0..roll_count {
            if total_weight <= 0.0 {
                break;
            }
            let picked = rng.random_range(0.0..total_weight);
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (index, entry) in self.entries.iter().enumerate() {
                if banned[index] {
                    continue;
                }
                cumulative += entry.weight;
                if picked < cumulative {
                    chosen = Some(index);
                    break;
                }
            }
            let Some(index) = chosen else {
                break;
            };
            let entry = &self.entries[index];
            if let Some(stack) = entry.roll(rng) {
                merge_stack(stacks, stack);
            }
            if !entry.allow_multiple_rolls {
                banned[index] = true;
                total_weight -= entry.weight;
            }
        }
    }
}

fn merge_stack(stacks: &mut Vec<ItemStack>, stack: ItemStack) {
    match stacks.iter_mut().find(|held| held.item_id == stack.item_id) {
        Some(held) => held.count += stack.count,
        None => stacks.push(stack),
    }
}
